use std::sync::LazyLock;

use regex::Regex;

// `getAge` and `isActive`, but not `getter` or `island`.
static ACCESSOR_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:get|is)(\p{Lu}.*)$").expect("valid accessor regex"));

/// Identifier quote characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentifierQuote {
    /// `` `name` `` (MySQL, MariaDB, SQLite)
    #[default]
    Backtick,
    /// `"name"` (ANSI, Postgres)
    DoubleQuote,
}

impl IdentifierQuote {
    pub fn char(&self) -> char {
        match self {
            Self::Backtick => '`',
            Self::DoubleQuote => '"',
        }
    }

    /// Wraps `ident` in quotes, doubling any embedded quote character.
    pub fn quote(&self, ident: &str) -> String {
        let q = self.char();
        let mut out = String::with_capacity(ident.len() + 2);
        out.push(q);
        for c in ident.chars() {
            if c == q {
                out.push(q);
            }
            out.push(c);
        }
        out.push(q);
        out
    }
}

/// Converts an accessor name to the column it reads: the `get`/`is` prefix
///  goes and the first remaining letter is lowercased.
///
/// `getAge` => `age`, `isActive` => `active`, `name` => `name`
pub fn column_name(accessor: &str) -> String {
    let stripped = match ACCESSOR_PREFIX.captures(accessor) {
        Some(caps) => caps.get(1).map_or(accessor, |m| m.as_str()),
        None => accessor,
    };
    let mut chars = stripped.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Renders a column reference, qualified with `table` when there is one.
pub fn qualify(
    table: Option<&str>,
    column: &str,
    quote: Option<IdentifierQuote>,
    out: &mut String,
) {
    fn push(out: &mut String, ident: &str, quote: Option<IdentifierQuote>) {
        match quote {
            Some(q) => out.push_str(&q.quote(ident)),
            None => out.push_str(ident),
        }
    }
    if let Some(table) = table {
        push(out, table, quote);
        out.push('.');
    }
    push(out, column, quote);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_name() {
        assert_eq!("age", column_name("getAge"));
        assert_eq!("lastName", column_name("getLastName"));
        assert_eq!("active", column_name("isActive"));
        assert_eq!("name", column_name("name"));
        assert_eq!("getter", column_name("getter"));
        assert_eq!("island", column_name("island"));
        assert_eq!("get", column_name("get"));
        assert_eq!("uRL", column_name("getURL"));
        assert_eq!("id", column_name("Id"));
        assert_eq!("", column_name(""));
    }

    #[test]
    fn test_quote() {
        assert_eq!("`age`", IdentifierQuote::Backtick.quote("age"));
        assert_eq!("`a``b`", IdentifierQuote::Backtick.quote("a`b"));
        assert_eq!(r#""a""b""#, IdentifierQuote::DoubleQuote.quote(r#"a"b"#));
    }

    #[test]
    fn test_qualify() {
        let render = |table, quote| {
            let mut s = String::new();
            qualify(table, "age", quote, &mut s);
            s
        };
        assert_eq!("age", render(None, None));
        assert_eq!("person.age", render(Some("person"), None));
        assert_eq!(
            "`person`.`age`",
            render(Some("person"), Some(IdentifierQuote::Backtick))
        );
        assert_eq!("`age`", render(None, Some(IdentifierQuote::Backtick)));
    }
}
