use super::utils::PriceWindow;

/// Stateful rolling computation fed one price per bar.
pub trait CustomIndicator: Send + Sync {
    /// Observations needed before `value` is meaningful.
    fn warmup(&self) -> usize;
    /// Feed the latest price.
    fn update(&mut self, price: f64);
    /// Current value, `0.0` until ready.
    fn value(&self) -> f64;
    /// At least two prices observed.
    fn is_ready(&self) -> bool;
    /// Drop all observations.
    fn reset(&mut self);
}

/// Largest peak-to-trough decline inside the window.
pub struct MaxDrawdownIndicator {
    window: PriceWindow,
}

impl MaxDrawdownIndicator {
    pub fn new(period: usize) -> Self {
        Self {
            window: PriceWindow::new(period),
        }
    }
}

impl CustomIndicator for MaxDrawdownIndicator {
    fn warmup(&self) -> usize {
        2
    }

    fn update(&mut self, price: f64) {
        self.window.push(price);
    }

    fn value(&self) -> f64 {
        if !self.is_ready() {
            return 0.0;
        }
        let mut iter = self.window.iter();
        let Some(mut peak) = iter.next() else {
            return 0.0;
        };
        let mut max_dd: f64 = 0.0;
        for price in iter {
            if price > peak {
                peak = price;
            } else if peak > 0.0 {
                max_dd = max_dd.max((peak - price) / peak);
            }
        }
        max_dd
    }

    fn is_ready(&self) -> bool {
        self.window.len() >= self.warmup()
    }

    fn reset(&mut self) {
        self.window.clear();
    }
}

/// Decline of the latest price from the window's peak.
pub struct DrawdownIndicator {
    window: PriceWindow,
}

impl DrawdownIndicator {
    pub fn new(period: usize) -> Self {
        Self {
            window: PriceWindow::new(period),
        }
    }
}

impl CustomIndicator for DrawdownIndicator {
    fn warmup(&self) -> usize {
        2
    }

    fn update(&mut self, price: f64) {
        self.window.push(price);
    }

    fn value(&self) -> f64 {
        if !self.is_ready() {
            return 0.0;
        }
        match (self.window.max(), self.window.last()) {
            (Some(peak), Some(last)) if peak > 0.0 => (peak - last) / peak,
            _ => 0.0,
        }
    }

    fn is_ready(&self) -> bool {
        self.window.len() >= self.warmup()
    }

    fn reset(&mut self) {
        self.window.clear();
    }
}

/// Arithmetic mean of single-step returns over the window.
pub struct MovingAvgReturnIndicator {
    last_price: Option<f64>,
    returns: PriceWindow,
}

impl MovingAvgReturnIndicator {
    pub fn new(period: usize) -> Self {
        Self {
            last_price: None,
            returns: PriceWindow::new(period),
        }
    }
}

impl CustomIndicator for MovingAvgReturnIndicator {
    fn warmup(&self) -> usize {
        2
    }

    fn update(&mut self, price: f64) {
        if let Some(prev) = self.last_price {
            if prev > 0.0 {
                self.returns.push((price - prev) / prev);
            }
        }
        self.last_price = Some(price);
    }

    fn value(&self) -> f64 {
        self.returns.mean().unwrap_or(0.0)
    }

    fn is_ready(&self) -> bool {
        self.returns.len() + 1 >= self.warmup()
    }

    fn reset(&mut self) {
        self.last_price = None;
        self.returns.clear();
    }
}
