//! Indented statement builder for emitted algorithm source.
//!
//! Code is collected as `(depth, text)` lines and rendered once. Depth 0 is the
//! body of an algorithm method, i.e. two indentation levels deep.

use serde_json::{Number, Value};

const INDENT: &str = "    ";
const BASE_DEPTH: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    depth: usize,
    text: String,
}

/// Ordered lines of generated statements, each with its own depth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    lines: Vec<Line>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push one statement at `depth`.
    pub fn line(&mut self, depth: usize, text: impl Into<String>) -> &mut Self {
        self.lines.push(Line {
            depth,
            text: text.into(),
        });
        self
    }

    /// Push `# text` at `depth`.
    pub fn comment(&mut self, depth: usize, text: impl AsRef<str>) -> &mut Self {
        self.line(depth, format!("# {}", text.as_ref()))
    }

    /// Push an empty separator line.
    pub fn blank(&mut self) -> &mut Self {
        self.line(0, String::new())
    }

    /// Append another block as is; depths are not shifted.
    pub fn append(&mut self, other: Block) -> &mut Self {
        self.lines.extend(other.lines);
        self
    }

    /// Emit `header` at `depth` followed by `body`, which must already sit at
    /// `depth + 1`. A body without statements gets a `pass` so the suite parses.
    pub fn suite(&mut self, depth: usize, header: impl Into<String>, body: Block) -> &mut Self {
        self.line(depth, header);
        let needs_pass = !body.has_statements();
        self.append(body);
        if needs_pass {
            self.line(depth + 1, "pass");
        }
        self
    }

    /// Join sibling blocks with one blank line between them, skipping empty ones.
    pub fn join(blocks: impl IntoIterator<Item = Block>) -> Block {
        let mut out = Block::new();
        for block in blocks.into_iter().filter(|b| !b.is_empty()) {
            if !out.is_empty() {
                out.blank();
            }
            out.append(block);
        }
        out
    }

    /// True when every line is blank.
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.text.trim().is_empty())
    }

    /// True when at least one line is neither blank nor a comment.
    pub fn has_statements(&self) -> bool {
        self.lines.iter().any(|l| {
            let t = l.text.trim();
            !t.is_empty() && !t.starts_with('#')
        })
    }

    /// Render with four-space indentation, offset by the method-body base depth.
    /// Blank lines carry no trailing whitespace.
    pub fn render(&self) -> String {
        self.lines
            .iter()
            .map(|l| {
                if l.text.is_empty() {
                    String::new()
                } else {
                    format!("{}{}", INDENT.repeat(l.depth + BASE_DEPTH), l.text)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Float literal in the runtime's repr: `100.0`, `0.5`, `0.3333333333333333`.
pub fn py_float(value: f64) -> String {
    if value.is_finite() {
        format!("{value:?}")
    } else {
        "0.0".to_string()
    }
}

/// Numeric literal keeping integer/float distinction of the source document.
pub fn py_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        py_float(n.as_f64().unwrap_or_default())
    }
}

/// Single-quoted string literal.
pub fn py_str(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Attribute-safe fragment: lowercase, every non-alphanumeric char becomes `_`.
pub fn py_ident(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Textual form of an argument value inside keys and attribute names.
/// Integral numbers print without a fractional part.
pub fn arg_token(value: &Value) -> String {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.as_i64().is_none() && n.as_u64().is_none() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => py_number(n),
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn render_applies_base_indent() {
        let mut b = Block::new();
        b.comment(0, "entry").line(1, "x = 1");
        assert_eq!(b.render(), "        # entry\n            x = 1");
    }

    #[test]
    fn suite_without_statements_gets_pass() {
        let mut body = Block::new();
        body.comment(1, "nothing to do");
        let mut b = Block::new();
        b.suite(0, "if ready:", body);
        assert_eq!(
            b.render(),
            "        if ready:\n            # nothing to do\n            pass"
        );
    }

    #[test]
    fn join_skips_empty_blocks() {
        let mut a = Block::new();
        a.line(0, "a()");
        let mut c = Block::new();
        c.line(0, "c()");
        let joined = Block::join(vec![a, Block::new(), c]);
        assert_eq!(joined.render(), "        a()\n\n        c()");
    }

    #[test]
    fn literal_formatting() {
        assert_eq!(py_float(100.0), "100.0");
        assert_eq!(py_float(1.0 / 3.0), "0.3333333333333333");
        assert_eq!(py_number(&Number::from(30)), "30");
        assert_eq!(py_str("it's"), "'it\\'s'");
        assert_eq!(py_ident("BRK.B"), "brk_b");
        assert_eq!(arg_token(&json!(14.0)), "14");
        assert_eq!(arg_token(&json!(2.5)), "2.5");
    }
}
