use std::fmt::{Debug, Display, Write};

/// Location of a token or AST node in the source text.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    /// 1-based line number.
    pub lineno: u32,
    /// 1-based column number.
    pub column: u32,
    /// Byte offset from the start of the input, counting from 0.
    pub offset: u32,
}

impl Debug for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}({})", self.lineno, self.column, self.offset)
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.lineno, self.column)
    }
}

/// Escapes a string for embedding in a double-quoted literal.
pub fn escape_str(value: &str) -> String {
    let mut ans = String::new();
    for c in value.chars() {
        match c {
            '\u{0008}' => ans.push_str("\\b"),
            '\u{000C}' => ans.push_str("\\f"),
            '\t' => ans.push_str("\\t"),
            '\r' => ans.push_str("\\r"),
            '\n' => ans.push_str("\\n"),
            '\\' => ans.push_str("\\\\"),
            '"' => ans.push_str("\\\""),
            _ => ans.push(c),
        }
    }
    ans
}

pub(crate) trait Join<Item: Display>: Iterator<Item = Item> {
    fn join(&mut self, sep: &str) -> String {
        if let Some(first) = self.next() {
            let (lb, _) = self.size_hint();
            let mut result = String::with_capacity(sep.len() * lb);
            write!(&mut result, "{}", first).unwrap();
            self.for_each(|i| {
                result.push_str(sep);
                write!(&mut result, "{}", i).unwrap();
            });
            result
        } else {
            String::new()
        }
    }
}

impl<T: Iterator<Item = Item>, Item: Display> Join<Item> for T {}
