use crate::chain::locator::{method_after_dot, skip_whitespace};
use crate::chain::{is_ident_byte, ChainError, ChainGrammar, SourceSpan};
use crate::scan::{contains_comment, find_matching_close};

/// One `.Name(args)` unit of a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSegment {
    pub method_name: String,
    /// Text between the outer parentheses, nested delimiters included.
    pub raw_args: String,
    /// Absolute offset of the segment's `.`
    pub start: usize,
    /// Absolute offset just past its closing paren
    pub end: usize,
}

/// A tokenized chain statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    /// Receiver expression before the anchor, e.g. `suite.logger`.
    pub anchor_prefix: String,
    /// Leading whitespace of the line holding the anchor.
    pub indent: String,
    /// The zero-argument anchor call; `None` for self-terminating profiles.
    pub anchor: Option<CallSegment>,
    /// Calls between anchor and terminator, in source order.
    pub segments: Vec<CallSegment>,
    pub terminator: CallSegment,
    /// `"\r\n"` when the anchor's line ends that way, else `"\n"`.
    pub line_ending: &'static str,
}

/// Split a located span into its call segments.
///
/// Only whitespace may separate segments; anything else (operators,
/// comments, a `.` not followed by `Name(`) is [`ChainError::MalformedChain`].
pub fn tokenize(
    content: &str,
    span: &SourceSpan<'_>,
    grammar: &ChainGrammar,
) -> Result<Chain, ChainError> {
    let text = span.text;
    let bytes = text.as_bytes();
    let mut calls = Vec::new();
    let mut pos = 0;

    loop {
        pos = skip_whitespace(bytes, pos);
        if pos >= bytes.len() {
            break;
        }
        if bytes[pos] != b'.' {
            return Err(ChainError::malformed_chain(
                span.start + pos,
                format!("expected `.` but found `{}`", char_at(text, pos)),
            ));
        }

        let (name, paren) = method_after_dot(text, pos + 1).ok_or_else(|| {
            ChainError::malformed_chain(span.start + pos, "`.` does not introduce a call")
        })?;
        let close = find_matching_close(text, paren + 1)
            .map_err(|_| ChainError::UnbalancedDelimiter {
                offset: span.start + paren,
            })?;

        let raw_args = &text[paren + 1..close];
        if contains_comment(raw_args) {
            return Err(ChainError::malformed_chain(
                span.start + paren,
                format!("comment inside arguments of `{name}`"),
            ));
        }

        calls.push(CallSegment {
            method_name: name.to_string(),
            raw_args: raw_args.to_string(),
            start: span.start + pos,
            end: span.start + close + 1,
        });
        pos = close + 1;
    }

    let mut calls = calls.into_iter();
    let anchor = if grammar.has_anchors() {
        let first = calls
            .next()
            .ok_or_else(|| ChainError::malformed_chain(span.start, "empty chain"))?;
        if !grammar.is_anchor(&first.method_name) || !first.raw_args.trim().is_empty() {
            return Err(ChainError::malformed_chain(
                first.start,
                format!("`{}` is not a zero-argument anchor", first.method_name),
            ));
        }
        Some(first)
    } else {
        None
    };

    let mut segments: Vec<CallSegment> = calls.collect();
    let terminator = segments
        .pop()
        .ok_or_else(|| ChainError::malformed_chain(span.start, "chain has no terminator"))?;
    if !grammar.is_terminator(&terminator.method_name) {
        return Err(ChainError::malformed_chain(
            terminator.start,
            format!("`{}` is not a terminator", terminator.method_name),
        ));
    }
    if anchor.is_none() && !segments.is_empty() {
        return Err(ChainError::malformed_chain(
            span.start,
            "unexpected calls before terminator",
        ));
    }

    Ok(Chain {
        anchor_prefix: receiver_before(content, span.start).to_string(),
        indent: line_indent(content, span.start).to_string(),
        anchor,
        segments,
        terminator,
        line_ending: line_ending(content, span.start),
    })
}

fn char_at(text: &str, pos: usize) -> char {
    text[pos..].chars().next().unwrap_or(' ')
}

/// Leading whitespace of the line containing `offset`.
pub fn line_indent(content: &str, offset: usize) -> &str {
    let line_start = content[..offset].rfind('\n').map_or(0, |idx| idx + 1);
    let line = &content[line_start..];
    let width = line
        .bytes()
        .take_while(|byte| *byte == b' ' || *byte == b'\t')
        .count();
    &line[..width]
}

fn line_ending(content: &str, offset: usize) -> &'static str {
    match content[offset..].find('\n') {
        Some(idx) if content[..offset + idx].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

/// Receiver expression ending at `offset`: identifiers, selectors, and
/// balanced call or index suffixes such as `s.logger` or `errors.NewError()`.
fn receiver_before(content: &str, offset: usize) -> &str {
    let bytes = content.as_bytes();
    let mut start = offset;
    while start > 0 {
        let byte = bytes[start - 1];
        if is_ident_byte(byte) || byte == b'.' {
            start -= 1;
        } else if byte == b')' || byte == b']' {
            match matching_open_before(bytes, start - 1) {
                Some(open) => start = open,
                None => break,
            }
        } else {
            break;
        }
    }
    content[start..offset].trim_start_matches('.')
}

fn matching_open_before(bytes: &[u8], close: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut idx = close + 1;
    while idx > 0 {
        idx -= 1;
        match bytes[idx] {
            b')' | b']' => depth += 1,
            b'(' | b'[' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            b'\n' => return None,
            _ => {}
        }
    }
    None
}
