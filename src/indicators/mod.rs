//! Indicator registry and the custom rolling-window indicators.
//!
//! Native indicators map to a runtime constructor call. Custom ones are embedded
//! as Python classes and mirrored here by [`CustomIndicator`] implementations.

pub mod impls;
pub mod registry;
pub mod source;
pub mod utils;

#[cfg(test)]
mod tests;

pub use impls::*;
pub use registry::{
    canonical_key, create_custom_indicator, effective_period, IndicatorFamily, IndicatorKind,
    IndicatorRegistration, IndicatorRegistry,
};
