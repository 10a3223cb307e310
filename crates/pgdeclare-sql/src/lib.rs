//! Quoting helpers for the statements pgdeclare sends to Postgres.
//!
//! Declared names are spliced into DDL/DCL text (Postgres does not accept
//! bind parameters in `CREATE ROLE`, `GRANT`, ...), so every name goes
//! through [`Ident`] and every string value through [`Lit`].

use std::fmt;

/// Writes `'value'` with embedded single quotes doubled.
///
/// ```
/// use pgdeclare_sql::Lit;
/// assert_eq!(Lit("dev").to_string(), "'dev'");
/// assert_eq!(Lit("o'brien").to_string(), "'o''brien'");
/// ```
pub struct Lit<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> fmt::Display for Lit<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_delimited(f, self.0.as_ref(), '\'')
    }
}

/// Writes an identifier the way the server-side `quote_ident()` would:
/// bare when Postgres reads it back unchanged, double-quoted otherwise.
/// Names therefore render the same as they appear in catalog text such as
/// ACL entries.
///
/// ```
/// use pgdeclare_sql::Ident;
/// assert_eq!(Ident("dev_reader").to_string(), "dev_reader");
/// assert_eq!(Ident("user").to_string(), "\"user\"");
/// assert_eq!(Ident("Mixed").to_string(), "\"Mixed\"");
/// assert_eq!(Ident("a\"b").to_string(), "\"a\"\"b\"");
/// ```
pub struct Ident<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.0.as_ref();
        if needs_quoting(name) {
            write_delimited(f, name, '"')
        } else {
            f.write_str(name)
        }
    }
}

/// `quote` + `text` with every `quote` doubled + `quote`
fn write_delimited(f: &mut fmt::Formatter<'_>, text: &str, quote: char) -> fmt::Result {
    use fmt::Write;
    f.write_char(quote)?;
    for piece in text.split_inclusive(quote) {
        f.write_str(piece)?;
        if piece.ends_with(quote) {
            f.write_char(quote)?;
        }
    }
    f.write_char(quote)
}

/// A schema-qualified name, e.g. `log.bad_request`.
///
/// Each part is rendered through [`Ident`].
pub struct Qualified<'a>(pub Option<&'a str>, pub &'a str);

impl fmt::Display for Qualified<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(schema) => write!(f, "{}.{}", Ident(schema), Ident(self.1)),
            None => write!(f, "{}", Ident(self.1)),
        }
    }
}

pub fn escape_string(s: &str) -> String {
    Lit(s).to_string()
}

/// Quote `name` only when it needs quoting.
pub fn quote_ident(name: &str) -> String {
    Ident(name).to_string()
}

/// `a, "B", c`
pub fn join_idents<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for (i, name) in names.into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&quote_ident(name));
    }
    out
}

/// Undo [`quote_ident`]. Bare identifiers come back trimmed but otherwise
/// as-is.
pub fn unquote_ident(s: &str) -> String {
    let s = s.trim();
    match s.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
        Some(inner) => inner.replace("\"\"", "\""),
        None => s.to_string(),
    }
}

/// Whether `name` must be double-quoted to survive Postgres' identifier folding.
pub fn needs_quoting(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return true;
    };
    if !(first.is_ascii_lowercase() || first == '_') {
        return true;
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$') {
        return true;
    }
    is_reserved_keyword(name)
}

/// Reserved key words that cannot be used as bare identifiers.
///
/// See <https://www.postgresql.org/docs/current/sql-keywords-appendix.html>.
pub fn is_reserved_keyword(name: &str) -> bool {
    RESERVED_KEYWORDS.binary_search(&name).is_ok()
}

// Sorted for binary search.
const RESERVED_KEYWORDS: &[&str] = &[
    "all",
    "analyse",
    "analyze",
    "and",
    "any",
    "array",
    "as",
    "asc",
    "asymmetric",
    "authorization",
    "binary",
    "both",
    "case",
    "cast",
    "check",
    "collate",
    "collation",
    "column",
    "concurrently",
    "constraint",
    "create",
    "cross",
    "current_catalog",
    "current_date",
    "current_role",
    "current_schema",
    "current_time",
    "current_timestamp",
    "current_user",
    "default",
    "deferrable",
    "desc",
    "distinct",
    "do",
    "else",
    "end",
    "except",
    "false",
    "fetch",
    "for",
    "foreign",
    "freeze",
    "from",
    "full",
    "grant",
    "group",
    "having",
    "ilike",
    "in",
    "initially",
    "inner",
    "intersect",
    "into",
    "is",
    "isnull",
    "join",
    "lateral",
    "leading",
    "left",
    "like",
    "limit",
    "localtime",
    "localtimestamp",
    "natural",
    "not",
    "notnull",
    "null",
    "offset",
    "on",
    "only",
    "or",
    "order",
    "outer",
    "overlaps",
    "placing",
    "primary",
    "references",
    "returning",
    "right",
    "select",
    "session_user",
    "similar",
    "some",
    "symmetric",
    "system_user",
    "table",
    "tablesample",
    "then",
    "to",
    "trailing",
    "true",
    "union",
    "unique",
    "user",
    "using",
    "variadic",
    "verbose",
    "when",
    "where",
    "window",
    "with",
];

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn keywords_are_sorted() {
        let mut sorted = RESERVED_KEYWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, RESERVED_KEYWORDS);
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("dev"), "dev");
        assert_eq!(quote_ident("dev_reader2"), "dev_reader2");
        assert_eq!(quote_ident("order"), "\"order\"");
        assert_eq!(quote_ident("2fast"), "\"2fast\"");
        assert_eq!(quote_ident("has space"), "\"has space\"");
        assert_eq!(quote_ident(""), "\"\"");
    }

    #[test]
    fn test_qualified() {
        assert_eq!(format!("{}", Qualified(Some("log"), "bad_request")), "log.bad_request");
        assert_eq!(format!("{}", Qualified(None, "article")), "article");
        assert_eq!(format!("{}", Qualified(Some("Log"), "user")), "\"Log\".\"user\"");
    }

    #[test]
    fn test_join_idents() {
        assert_eq!(join_idents(["a", "user", "b"]), "a, \"user\", b");
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("s3cret"), "'s3cret'");
        assert_eq!(escape_string("o'clock"), "'o''clock'");
    }

    proptest! {
        #[test]
        fn quoting_round_trips(name in "[a-zA-Z_\" ][a-zA-Z0-9_\" $]{0,20}") {
            prop_assert_eq!(unquote_ident(&quote_ident(&name)), name);
        }
    }
}
