//! Delimiter-aware scanning over Go source text.
//!
//! [`Scanner`] walks a buffer byte by byte while tracking the stack of open
//! `()`, `{}`, `[]` delimiters and the lexical mode of the cursor (code,
//! string literal, rune literal, comment). Delimiters only count in code, so a
//! `)` inside `"a)b"` or `// )` never closes anything.
//!
//! Span acquisition in the rest of the crate is built on two operations:
//! [`find_matching_close`] and [`split_top_level`].

use crate::chain::ChainError;

/// Lexical mode of the scanner cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Code,
    /// Inside `"..."`, backslash escapes honoured.
    Interpreted,
    /// Inside `` `...` ``, no escapes.
    Raw,
    /// Inside `'...'`, backslash escapes honoured.
    Rune,
    LineComment,
    BlockComment,
}

/// Classification of one scanned byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Opening delimiter in code.
    Open(u8),
    /// Closing delimiter that matches the innermost open one.
    Close(u8),
    /// Closing delimiter with no matching opener.
    Stray(u8),
    /// Any other byte in code.
    Code(u8),
    /// Byte belonging to a literal or comment, including its quotes/markers.
    Quoted,
}

/// One scanned byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub offset: usize,
    pub token: Token,
    /// Nesting depth of the context the byte sits in. For `Open` and `Close`
    /// this is the depth outside the pair.
    pub depth: usize,
}

/// Forward-only byte scanner with delimiter and literal tracking.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    stack: Vec<u8>,
    mode: Mode,
    escaped: bool,
}

impl<'a> Scanner<'a> {
    /// Scanner positioned at the start of `text`, in code.
    pub fn new(text: &'a str) -> Self {
        Self::at(text, 0)
    }

    /// Scanner positioned at `offset`, assumed to be in code at depth zero.
    pub fn at(text: &'a str, offset: usize) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: offset.min(text.len()),
            stack: Vec::new(),
            mode: Mode::Code,
            escaped: false,
        }
    }

    /// Treat the cursor as already inside `opener`.
    pub fn inside(mut self, opener: u8) -> Self {
        self.stack.push(opener);
        self
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// True once every literal and comment opened so far has been closed.
    pub fn in_code(&self) -> bool {
        self.mode == Mode::Code
    }

    /// Consume bytes up to (not including) `offset`.
    pub fn advance_to(&mut self, offset: usize) {
        while self.pos < offset {
            if self.next().is_none() {
                break;
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn code_byte(&mut self, byte: u8) -> Token {
        match byte {
            b'(' | b'{' | b'[' => {
                self.stack.push(byte);
                Token::Open(byte)
            }
            b')' | b'}' | b']' => {
                if self.stack.last() == Some(&opener_for(byte)) {
                    self.stack.pop();
                    Token::Close(byte)
                } else {
                    Token::Stray(byte)
                }
            }
            b'"' => {
                self.mode = Mode::Interpreted;
                Token::Quoted
            }
            b'`' => {
                self.mode = Mode::Raw;
                Token::Quoted
            }
            b'\'' => {
                self.mode = Mode::Rune;
                Token::Quoted
            }
            b'/' if self.peek() == Some(b'/') => {
                self.pos += 1;
                self.mode = Mode::LineComment;
                Token::Quoted
            }
            b'/' if self.peek() == Some(b'*') => {
                self.pos += 1;
                self.mode = Mode::BlockComment;
                Token::Quoted
            }
            other => Token::Code(other),
        }
    }

    fn escaped_literal_byte(&mut self, byte: u8, close: u8) -> Token {
        if self.escaped {
            self.escaped = false;
            return Token::Quoted;
        }
        match byte {
            b'\\' => self.escaped = true,
            b'\n' => {
                // Unterminated literal: recover at end of line.
                self.mode = Mode::Code;
                return Token::Code(b'\n');
            }
            _ if byte == close => self.mode = Mode::Code,
            _ => {}
        }
        Token::Quoted
    }
}

impl Iterator for Scanner<'_> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        let offset = self.pos;
        let byte = *self.bytes.get(offset)?;
        self.pos += 1;
        let depth = self.stack.len();

        let token = match self.mode {
            Mode::Code => self.code_byte(byte),
            Mode::Interpreted => self.escaped_literal_byte(byte, b'"'),
            Mode::Rune => self.escaped_literal_byte(byte, b'\''),
            Mode::Raw => {
                if byte == b'`' {
                    self.mode = Mode::Code;
                }
                Token::Quoted
            }
            Mode::LineComment => {
                if byte == b'\n' {
                    self.mode = Mode::Code;
                    Token::Code(b'\n')
                } else {
                    Token::Quoted
                }
            }
            Mode::BlockComment => {
                if byte == b'*' && self.peek() == Some(b'/') {
                    self.pos += 1;
                    self.mode = Mode::Code;
                }
                Token::Quoted
            }
        };

        let depth = match token {
            Token::Close(_) => self.stack.len(),
            _ => depth,
        };

        Some(Event {
            offset,
            token,
            depth,
        })
    }
}

fn opener_for(close: u8) -> u8 {
    match close {
        b')' => b'(',
        b'}' => b'{',
        _ => b'[',
    }
}

pub fn is_open_delimiter(byte: u8) -> bool {
    matches!(byte, b'(' | b'{' | b'[')
}

/// Offset of the delimiter closing the one that ends just before `offset`.
///
/// `offset` must point immediately after an opening delimiter. Nested pairs,
/// string and rune literals, and comments are skipped.
pub fn find_matching_close(text: &str, offset: usize) -> Result<usize, ChainError> {
    let open_at = offset.saturating_sub(1);
    let opener = offset
        .checked_sub(1)
        .and_then(|idx| text.as_bytes().get(idx).copied())
        .filter(|byte| is_open_delimiter(*byte))
        .ok_or(ChainError::UnbalancedDelimiter { offset: open_at })?;

    let scanner = Scanner::at(text, offset).inside(opener);
    for event in scanner {
        match event.token {
            Token::Close(_) if event.depth == 0 => return Ok(event.offset),
            Token::Stray(_) => return Err(ChainError::UnbalancedDelimiter { offset: open_at }),
            _ => {}
        }
    }

    Err(ChainError::UnbalancedDelimiter { offset: open_at })
}

/// Split `text` on `separator` only at depth zero outside literals and comments.
///
/// Blank input yields no parts; otherwise the parts are returned untrimmed.
pub fn split_top_level(text: &str, separator: u8) -> Vec<&str> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut start = 0;
    for event in Scanner::new(text) {
        if event.token == Token::Code(separator) && event.depth == 0 {
            parts.push(&text[start..event.offset]);
            start = event.offset + 1;
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Comma-separated call arguments, trimmed, with a trailing empty argument
/// (Go's trailing comma) dropped.
pub fn split_arguments(raw_args: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = split_top_level(raw_args, b',')
        .into_iter()
        .map(str::trim)
        .collect();
    if parts.len() > 1 && parts.last().is_some_and(|last| last.is_empty()) {
        parts.pop();
    }
    parts
}

/// True if `text` contains a comment outside string literals.
pub fn contains_comment(text: &str) -> bool {
    let mut scanner = Scanner::new(text);
    while scanner.next().is_some() {
        if matches!(scanner.mode(), Mode::LineComment | Mode::BlockComment) {
            return true;
        }
    }
    false
}
