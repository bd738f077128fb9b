//! Fixed runtime helper methods appended to the generated algorithm class.

/// Gate every order on symbol registration, data in the current slice and a
/// positive last price.
pub const SECURITY_CHECK_HELPER: &str = r#"    def _is_security_ready_for_trading(self, symbol: str) -> bool:
        '''Check that a symbol is registered, has data in the current slice and a positive price'''
        if symbol not in self.Securities:
            return False
        current_slice = getattr(self, 'current_slice', None)
        if current_slice is None or not current_slice.contains_key(symbol):
            return False
        if current_slice[symbol] is None:
            return False
        return self.Securities[symbol].Price > 0"#;

/// Name of the helper recording crossing operands once per bar.
pub const TRACK_CROSS: &str = "_track_cross";

const TRACK_CROSS_HELPER: &str = r#"    def _track_cross(self, key: str, lhs: float, rhs: float) -> None:
        '''Shift this bar's crossing operands in, keeping the previous bar's pair'''
        state = self.__dict__.setdefault('_cross_state', {})
        previous = state.get(key, (None, None))[1]
        state[key] = (previous, (lhs, rhs))"#;

const CROSSES_ABOVE_HELPER: &str = r#"    def _crosses_above(self, key: str) -> bool:
        '''True on the bar where lhs moves from at-or-below rhs to above it'''
        previous, current = self.__dict__.get('_cross_state', {}).get(key, (None, None))
        if previous is None or current is None:
            return False
        return previous[0] <= previous[1] and current[0] > current[1]"#;

const CROSSES_BELOW_HELPER: &str = r#"    def _crosses_below(self, key: str) -> bool:
        '''True on the bar where lhs moves from at-or-above rhs to below it'''
        previous, current = self.__dict__.get('_cross_state', {}).get(key, (None, None))
        if previous is None or current is None:
            return False
        return previous[0] >= previous[1] and current[0] < current[1]"#;

/// Source of a named helper method, `None` for names without one.
pub fn helper_source(name: &str) -> Option<&'static str> {
    match name {
        TRACK_CROSS => Some(TRACK_CROSS_HELPER),
        "_crosses_above" => Some(CROSSES_ABOVE_HELPER),
        "_crosses_below" => Some(CROSSES_BELOW_HELPER),
        _ => None,
    }
}

/// Source of the requested helpers, in request order, blank-line separated.
pub fn helpers_source(names: &[String]) -> String {
    names
        .iter()
        .filter_map(|n| helper_source(n))
        .collect::<Vec<_>>()
        .join("\n\n")
}
