use crate::chain::{is_ident_byte, ChainError, ChainGrammar};
use crate::scan::{find_matching_close, Scanner, Token};

/// A contiguous slice of the scanned content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan<'a> {
    /// Starting byte offset (inclusive)
    pub start: usize,
    /// Ending byte offset (exclusive)
    pub end: usize,
    /// `content[start..end]`
    pub text: &'a str,
}

impl<'a> SourceSpan<'a> {
    pub fn new(content: &'a str, start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self {
            start,
            end,
            text: &content[start..end],
        }
    }
}

/// One anchor occurrence that opened a candidate chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'a> {
    /// Offset of the `.` introducing the anchor call.
    pub anchor_start: usize,
    /// Offset just past the anchor match.
    pub anchor_end: usize,
    /// Span from the anchor's `.` to the terminator's closing paren.
    pub span: Result<SourceSpan<'a>, ChainError>,
}

/// Finds chain statements in document order.
///
/// Anchors inside string literals and comments are ignored. An anchor whose
/// chain is never terminated (end of input, `;`, a close below the anchor's
/// depth, or a newline that does not continue the chain) is silently
/// dropped: it is not a match. Unbalanced terminator arguments are reported
/// as a candidate carrying [`ChainError::UnbalancedDelimiter`].
///
/// After yielding a candidate the search resumes just past its anchor; call
/// [`StatementLocator::resume_at`] to skip over a span that was rewritten.
pub struct StatementLocator<'a, 'g> {
    content: &'a str,
    grammar: &'g ChainGrammar,
    cursor: Scanner<'a>,
    search_from: usize,
}

impl<'a, 'g> StatementLocator<'a, 'g> {
    pub fn new(content: &'a str, grammar: &'g ChainGrammar) -> Self {
        Self {
            content,
            grammar,
            cursor: Scanner::new(content),
            search_from: 0,
        }
    }

    /// Continue the search at `offset`. Never moves backwards.
    pub fn resume_at(&mut self, offset: usize) {
        self.search_from = self.search_from.max(offset);
    }

    fn scan_statement(
        &self,
        anchor_start: usize,
        anchor_end: usize,
    ) -> Option<Result<SourceSpan<'a>, ChainError>> {
        let content = self.content;

        if !self.grammar.has_anchors() {
            // The match ends just past the terminator's `(`.
            return Some(
                find_matching_close(content, anchor_end)
                    .map(|close| SourceSpan::new(content, anchor_start, close + 1)),
            );
        }

        let bytes = content.as_bytes();
        let mut last_code = b')';

        for event in Scanner::at(content, anchor_end) {
            if event.depth > 0 {
                continue;
            }
            match event.token {
                Token::Quoted => {}
                Token::Stray(_) | Token::Code(b';') => return None,
                Token::Open(byte) | Token::Close(byte) => last_code = byte,
                Token::Code(b'\n') => {
                    let continues = last_code == b'.'
                        || next_significant(bytes, event.offset + 1) == Some(b'.');
                    if !continues {
                        return None;
                    }
                }
                Token::Code(b'.') => {
                    if let Some((name, paren)) = method_after_dot(content, event.offset + 1) {
                        if self.grammar.is_terminator(name) {
                            return Some(
                                find_matching_close(content, paren + 1).map(|close| {
                                    SourceSpan::new(content, anchor_start, close + 1)
                                }),
                            );
                        }
                    }
                    last_code = b'.';
                }
                Token::Code(byte) if byte.is_ascii_whitespace() => {}
                Token::Code(byte) => last_code = byte,
            }
        }

        None
    }
}

impl<'a> Iterator for StatementLocator<'a, '_> {
    type Item = Candidate<'a>;

    fn next(&mut self) -> Option<Candidate<'a>> {
        loop {
            let found = self
                .grammar
                .anchor_pattern()
                .find_at(self.content, self.search_from)?;
            self.search_from = found.end();

            self.cursor.advance_to(found.start());
            if !self.cursor.in_code() {
                continue;
            }

            match self.scan_statement(found.start(), found.end()) {
                Some(span) => {
                    return Some(Candidate {
                        anchor_start: found.start(),
                        anchor_end: found.end(),
                        span,
                    })
                }
                None => {
                    tracing::trace!(offset = found.start(), "anchor without terminator");
                }
            }
        }
    }
}

/// Name of the method called after a `.`, with the offset of its `(`.
pub(crate) fn method_after_dot(content: &str, offset: usize) -> Option<(&str, usize)> {
    let bytes = content.as_bytes();
    let start = skip_whitespace(bytes, offset);
    let mut end = start;
    while end < bytes.len() && is_ident_byte(bytes[end]) {
        end += 1;
    }
    if end == start || bytes.get(end) != Some(&b'(') {
        return None;
    }
    Some((&content[start..end], end))
}

pub(crate) fn skip_whitespace(bytes: &[u8], mut offset: usize) -> usize {
    while offset < bytes.len() && bytes[offset].is_ascii_whitespace() {
        offset += 1;
    }
    offset
}

fn next_significant(bytes: &[u8], offset: usize) -> Option<u8> {
    bytes.get(skip_whitespace(bytes, offset)).copied()
}
