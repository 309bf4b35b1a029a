//! printf-style format string analysis.
//!
//! Works on the literal's source text, so escapes inside the body are
//! carried through untouched.

use crate::chain::ChainError;

/// A single Go string literal, `"..."` or `` `...` ``.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    pub delimiter: char,
    /// Source text between the delimiters.
    pub body: String,
}

impl StringLiteral {
    /// Parse `expr` as exactly one string literal. Concatenations,
    /// identifiers, and calls are rejected.
    pub fn parse(expr: &str) -> Option<Self> {
        let expr = expr.trim();
        let delimiter = expr.chars().next()?;
        if !matches!(delimiter, '"' | '`') || expr.len() < 2 || !expr.ends_with(delimiter) {
            return None;
        }
        let body = &expr[1..expr.len() - 1];

        match delimiter {
            '`' if !body.contains('`') => {}
            '"' => {
                let mut escaped = false;
                for byte in body.bytes() {
                    match byte {
                        _ if escaped => escaped = false,
                        b'\\' => escaped = true,
                        b'"' | b'\n' => return None,
                        _ => {}
                    }
                }
                if escaped {
                    return None;
                }
            }
            _ => return None,
        }

        Some(Self {
            delimiter,
            body: body.to_string(),
        })
    }

    pub fn render(&self) -> String {
        format!("{0}{1}{0}", self.delimiter, self.body)
    }

    /// The literal as a plain message: `%%` becomes `%`.
    pub fn unescape_percent(&self) -> Self {
        Self {
            delimiter: self.delimiter,
            body: self.body.replace("%%", "%"),
        }
    }
}

/// One conversion in a format string, e.g. `%-8s` or `%w`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verb {
    /// Byte range within the literal body.
    pub start: usize,
    pub end: usize,
    pub conversion: char,
}

impl Verb {
    /// `%w`, reserved for wrapping an underlying error.
    pub fn is_wrap(&self) -> bool {
        self.conversion == 'w'
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDirective {
    pub format_string: StringLiteral,
    pub verbs: Vec<Verb>,
}

impl FormatDirective {
    /// Parse the format argument of a format terminator.
    pub fn parse(expr: &str) -> Result<Self, ChainError> {
        let format_string = StringLiteral::parse(expr)
            .ok_or_else(|| ChainError::malformed_format(expr, "not a single string literal"))?;
        let verbs = scan_verbs(&format_string.body)
            .map_err(|message| ChainError::malformed_format(expr, message))?;
        Ok(Self {
            format_string,
            verbs,
        })
    }

    /// Index of the `%w` verb, if any. More than one is an error.
    pub fn wrap_index(&self) -> Result<Option<usize>, ChainError> {
        let mut wraps = self
            .verbs
            .iter()
            .enumerate()
            .filter(|(_, verb)| verb.is_wrap())
            .map(|(idx, _)| idx);
        let first = wraps.next();
        if wraps.next().is_some() {
            return Err(ChainError::malformed_format(
                &self.format_string.render(),
                "more than one %w verb",
            ));
        }
        Ok(first)
    }

    /// The format string with verb `idx` removed together with the
    /// separator that introduces it (`: `, ` - `, `, `, or a space).
    pub fn without_verb(&self, idx: usize) -> StringLiteral {
        let verb = self.verbs[idx];
        let body = &self.format_string.body;
        let prefix = strip_trailing_separator(&body[..verb.start]);
        let mut suffix = &body[verb.end..];
        if prefix.is_empty() {
            suffix = suffix.trim_start_matches(|c: char| is_separator(c) || c == ' ' || c == '\t');
        }

        StringLiteral {
            delimiter: self.format_string.delimiter,
            body: format!("{prefix}{suffix}"),
        }
    }
}

fn strip_trailing_separator(text: &str) -> &str {
    let trimmed = text.trim_end_matches(|c: char| c == ' ' || c == '\t');
    let trimmed = trimmed.strip_suffix(is_separator).unwrap_or(trimmed);
    trimmed.trim_end_matches(|c: char| c == ' ' || c == '\t')
}

fn is_separator(c: char) -> bool {
    matches!(c, ':' | '-' | ',' | ';')
}

fn scan_verbs(body: &str) -> Result<Vec<Verb>, &'static str> {
    let bytes = body.as_bytes();
    let mut verbs = Vec::new();
    let mut idx = 0;

    while idx < bytes.len() {
        if bytes[idx] != b'%' {
            idx += 1;
            continue;
        }
        let start = idx;
        idx += 1;

        if bytes.get(idx) == Some(&b'%') {
            idx += 1;
            continue;
        }
        while matches!(bytes.get(idx), Some(b'+' | b'-' | b'#' | b' ' | b'0')) {
            idx += 1;
        }
        idx = skip_number(bytes, idx)?;
        if bytes.get(idx) == Some(&b'.') {
            idx = skip_number(bytes, idx + 1)?;
        }
        if bytes.get(idx) == Some(&b'[') {
            return Err("explicit argument indexes are not supported");
        }

        match bytes.get(idx) {
            Some(byte) if byte.is_ascii_alphabetic() => {
                idx += 1;
                verbs.push(Verb {
                    start,
                    end: idx,
                    conversion: char::from(*byte),
                });
            }
            Some(_) => return Err("invalid verb"),
            None => return Err("dangling %"),
        }
    }

    Ok(verbs)
}

fn skip_number(bytes: &[u8], mut idx: usize) -> Result<usize, &'static str> {
    match bytes.get(idx) {
        Some(b'*') => return Err("`*` widths consume extra arguments"),
        Some(b'[') => return Err("explicit argument indexes are not supported"),
        _ => {}
    }
    while bytes.get(idx).is_some_and(u8::is_ascii_digit) {
        idx += 1;
    }
    Ok(idx)
}

/// True for expressions that are plainly not an error value.
pub fn is_literal_expr(expr: &str) -> bool {
    let expr = expr.trim();
    expr == "nil"
        || expr == "true"
        || expr == "false"
        || expr.starts_with(|c: char| matches!(c, '"' | '`' | '\''))
        || expr
            .strip_prefix('-')
            .unwrap_or(expr)
            .starts_with(|c: char| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_forms() {
        assert_eq!(
            StringLiteral::parse(r#""a \"b\"""#).unwrap().body,
            r#"a \"b\""#
        );
        assert_eq!(StringLiteral::parse("`raw %w`").unwrap().delimiter, '`');
        assert!(StringLiteral::parse(r#""a" + "b""#).is_none());
        assert!(StringLiteral::parse("msg").is_none());
        assert!(StringLiteral::parse(r#"""#).is_none());
        assert!(StringLiteral::parse(r#""trailing\""#).is_none());
    }

    #[test]
    fn verbs_with_flags_and_width() {
        let directive = FormatDirective::parse(r#""%-8s|%05.2f|%v %% %w""#).unwrap();
        let conversions: Vec<char> = directive.verbs.iter().map(|v| v.conversion).collect();
        assert_eq!(conversions, vec!['s', 'f', 'v', 'w']);
        assert_eq!(directive.wrap_index().unwrap(), Some(3));
    }

    #[test]
    fn unsupported_verbs() {
        assert!(FormatDirective::parse(r#""%*d""#).is_err());
        assert!(FormatDirective::parse(r#""%[1]d""#).is_err());
        assert!(FormatDirective::parse(r#""50%""#).is_err());
        assert!(FormatDirective::parse("name").is_err());
    }

    #[test]
    fn multiple_wraps() {
        let directive = FormatDirective::parse(r#""%w and %w""#).unwrap();
        assert!(matches!(
            directive.wrap_index(),
            Err(ChainError::MalformedFormat { .. })
        ));
    }

    #[test]
    fn strip_wrap_and_separator() {
        let cases = [
            (r#""save failed: %w""#, r#""save failed""#),
            (r#""save failed:%w""#, r#""save failed""#),
            (r#""save failed %w""#, r#""save failed""#),
            (r#""save failed - %w""#, r#""save failed""#),
            (r#""%w: while saving""#, r#""while saving""#),
            (r#""failed: %w (retrying)""#, r#""failed (retrying)""#),
        ];
        for (input, expected) in cases {
            let directive = FormatDirective::parse(input).unwrap();
            let idx = directive.wrap_index().unwrap().unwrap();
            assert_eq!(directive.without_verb(idx).render(), expected, "{input}");
        }
    }

    #[test]
    fn percent_unescape() {
        let literal = StringLiteral::parse(r#""100%% done""#).unwrap();
        assert_eq!(literal.unescape_percent().render(), r#""100% done""#);
    }

    #[test]
    fn literal_expressions() {
        assert!(is_literal_expr("nil"));
        assert!(is_literal_expr("\"text\""));
        assert!(is_literal_expr("-1"));
        assert!(!is_literal_expr("err"));
        assert!(!is_literal_expr("fmt.Errorf(\"x\")"));
    }
}
