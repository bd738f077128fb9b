//! Textual rewrite of free-form `expression` nodes.
//!
//! Only two substitutions happen: indicator references such as `rsi_spy_14`
//! become attribute accesses (`self.spy_rsi_14`), and upper-case boolean
//! keywords are lowered. Nothing is parsed.

const INDICATOR_PREFIXES: [&str; 3] = ["rsi", "sma", "ema"];

/// Rewrite a free-form expression into runtime syntax.
///
/// `rsi_spy_14` style references become `self.spy_rsi_14`, and the uppercase
/// boolean keywords `AND`, `OR` and `NOT` become lowercase. Everything else is
/// passed through untouched; this is a substitution, not a parser.
pub fn process_expression(expr: &str) -> String {
    rewrite_indicator_refs(expr)
        .replace(" AND ", " and ")
        .replace(" OR ", " or ")
        .replace(" NOT ", " not ")
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn rewrite_indicator_refs(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len() + 16);
    let mut word = String::new();
    for c in expr.chars() {
        if is_word_char(c) {
            word.push(c);
            continue;
        }
        flush_word(&mut word, &mut out);
        out.push(c);
    }
    flush_word(&mut word, &mut out);
    out
}

fn flush_word(word: &mut String, out: &mut String) {
    if word.is_empty() {
        return;
    }
    match rewrite_word(word) {
        Some(rewritten) => out.push_str(&rewritten),
        None => out.push_str(word),
    }
    word.clear();
}

/// `<ind>_<symbol>_<digits>` -> `self.<symbol>_<ind>_<digits>`.
fn rewrite_word(word: &str) -> Option<String> {
    let (prefix, rest) = INDICATOR_PREFIXES
        .iter()
        .find_map(|p| word.strip_prefix(p).and_then(|r| r.strip_prefix('_')).map(|r| (*p, r)))?;
    let (symbol, period) = rest.rsplit_once('_')?;
    if symbol.is_empty() || period.is_empty() || !period.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("self.{symbol}_{prefix}_{period}"))
}
