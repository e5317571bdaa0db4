//! Tag keys and the `name[,option...]` value syntax.

pub const DEFAULT_TAG: &str = "default";
pub const QUERY_TAG: &str = "query";
pub const PATH_TAG: &str = "path";
pub const HEADER_TAG: &str = "header";
pub const COOKIE_TAG: &str = "cookie";
pub const REQUEST_TAG: &str = "request";

/// Splits a raw tag value into its key and the options after the first comma.
///
/// ```
/// use micro_bind::parse_tag;
///
/// assert_eq!(parse_tag("names,comma-delimited"), ("names", "comma-delimited"));
/// assert_eq!(parse_tag("id"), ("id", ""));
/// ```
pub fn parse_tag(raw: &str) -> (&str, &str) {
    raw.split_once(',').unwrap_or((raw, ""))
}

/// Finds the delimiter option among comma separated tokens, the first recognized token wins.
///
/// Recognized: `comma-delimited`, `semicolon-delimited`, `pipe-delimited`, `space-delimited`,
/// `tab-delimited`, and `delimiter=<name>` / `delimiter:<name>` where `<name>` is one of
/// `space`, `comma`, `semicolon`, `pipe`, `tab`, a literal string, or empty for a comma.
/// Tokens are matched as written, so `delimiter= ` is a literal space.
pub fn resolve_delimiter(options: &str) -> Option<&str> {
    options.split(',').find_map(|token| match token {
        "comma-delimited" => Some(","),
        "semicolon-delimited" => Some(";"),
        "pipe-delimited" => Some("|"),
        "space-delimited" => Some(" "),
        "tab-delimited" => Some("\t"),
        other => other
            .strip_prefix("delimiter=")
            .or_else(|| other.strip_prefix("delimiter:"))
            .map(named_delimiter),
    })
}

fn named_delimiter(name: &str) -> &str {
    match name {
        "" | "comma" => ",",
        "space" => " ",
        "semicolon" => ";",
        "pipe" => "|",
        "tab" => "\t",
        literal => literal,
    }
}
