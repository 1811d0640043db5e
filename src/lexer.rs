//! Lexer for assembly source text.
//!
//! Source is lexed one line at a time: [`Lexer`] iterates the tokens of a
//! single line, yielding `Result<Token, AsmError>` so that a malformed token
//! does not stop the scan, and [`tokenize`] drains a line into its tokens and
//! errors. Every [`Token`] carries a [`Span`] with its column; line numbers
//! are stamped by the assembly driver afterwards.

#[allow(unused_imports)]
use alloc::format;
use alloc::string::String;
#[allow(unused_imports)]
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::error::{AsmError, Span};
use crate::ir::{Mnemonic, Register, RegisterClass};

// ─── Character classes ──────────────────────────────────────────────

#[inline]
fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n')
}

#[inline]
fn is_label_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

#[inline]
fn digit_value(c: u8) -> Option<u32> {
    match c {
        b'0'..=b'9' => Some(u32::from(c - b'0')),
        b'a'..=b'z' => Some(u32::from(c - b'a') + 10),
        b'A'..=b'Z' => Some(u32::from(c - b'A') + 10),
        _ => None,
    }
}

/// Whether `c` is a valid digit in `base` (2-36).
#[inline]
fn is_digit_in_base(c: u8, base: u32) -> bool {
    digit_value(c).is_some_and(|v| v < base)
}

// ─── Cursor ─────────────────────────────────────────────────────────

/// Forward-only view over the unconsumed remainder of one source line.
///
/// Position and column always move together, so spans derived from the
/// cursor point at the character that was actually being examined.
#[derive(Debug, Clone)]
pub struct Cursor<'src> {
    line: &'src str,
    pos: usize,
}

impl<'src> Cursor<'src> {
    /// A cursor at the start of `line`.
    #[must_use]
    pub fn new(line: &'src str) -> Self {
        Self { line, pos: 0 }
    }

    /// 1-based column of the next unconsumed character.
    #[must_use]
    pub fn col(&self) -> u32 {
        self.pos as u32 + 1
    }

    /// 0-based byte offset of the next unconsumed character.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// The unconsumed remainder of the line.
    #[must_use]
    pub fn rest(&self) -> &'src str {
        &self.line[self.pos..]
    }

    #[must_use]
    fn is_at_end(&self) -> bool {
        self.pos >= self.line.len()
    }

    fn peek(&self) -> Option<u8> {
        self.line.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<u8> {
        self.line.as_bytes().get(self.pos + n).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    /// Consume a maximal run of bytes satisfying `pred` and return it.
    ///
    /// Predicates only accept ASCII, so the returned slice always falls on
    /// character boundaries.
    fn eat_while(&mut self, pred: impl Fn(u8) -> bool) -> &'src str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += 1;
        }
        &self.line[start..self.pos]
    }

    fn text_range(&self, start: usize, end: usize) -> &'src str {
        &self.line[start..end]
    }
}

// ─── Number parsing ─────────────────────────────────────────────────

/// Parse a signed integer literal at the cursor.
///
/// Supports decimal, `0x`/`0X` hexadecimal, `0b`/`0B` binary, and
/// leading-zero octal forms, with an optional leading `-`. The scan accepts
/// any alphanumeric character as a digit candidate so that a character valid
/// in some larger base produces a precise "invalid digit for base N" error
/// rather than silently ending the literal; a character that is no digit in
/// any base (such as `.`) simply ends the literal. On success the cursor sits
/// immediately after the consumed digits; on an invalid-digit error it sits
/// immediately before the offending character.
///
/// Negation is applied after magnitude parsing, so `-2147483648` overflows.
///
/// # Errors
///
/// Returns [`AsmError::Syntax`] for empty input, a lone `-`, a digit invalid
/// for the detected base, or a value outside the 32-bit signed range.
///
/// # Examples
///
/// ```
/// use warp_asm::lexer::{parse_number, Cursor};
///
/// let mut cursor = Cursor::new("42.0abc");
/// assert_eq!(parse_number(&mut cursor).unwrap(), 42);
/// assert_eq!(cursor.rest(), ".0abc");
/// ```
pub fn parse_number(cursor: &mut Cursor<'_>) -> Result<i32, AsmError> {
    let start = cursor.offset();
    let start_col = cursor.col();

    if cursor.is_at_end() {
        return Err(AsmError::Syntax {
            msg: String::from("expected a number, found ''"),
            span: Span::new(0, start_col, start, 0),
        });
    }

    let negative = cursor.peek() == Some(b'-');
    if negative {
        cursor.bump();
        if cursor.is_at_end() {
            return Err(AsmError::Syntax {
                msg: String::from("expected a number, found '-'"),
                span: Span::new(0, start_col, start, 1),
            });
        }
    }

    let base = match (cursor.peek(), cursor.peek_at(1)) {
        (Some(b'0'), Some(b'x' | b'X')) => {
            cursor.advance(2);
            16
        }
        (Some(b'0'), Some(b'b' | b'B')) => {
            cursor.advance(2);
            2
        }
        // The leading zero stays in the digit run; it is a valid octal digit.
        (Some(b'0'), Some(_)) => 8,
        _ => 10,
    };

    let run_start = cursor.offset();
    let mut len = 0usize;
    while let Some(c) = cursor.peek_at(len) {
        if !c.is_ascii_alphanumeric() {
            break;
        }
        if !is_digit_in_base(c, base) {
            let failing = cursor.text_range(run_start, run_start + len + 1);
            let msg = format!(
                "failed to parse number '{}': invalid digit '{}' for base {}",
                failing, c as char, base
            );
            cursor.advance(len);
            return Err(AsmError::Syntax {
                msg,
                span: Span::new(0, cursor.col(), cursor.offset(), 1),
            });
        }
        len += 1;
    }

    let digits = cursor.text_range(run_start, run_start + len);
    cursor.advance(len);

    let magnitude = i32::from_str_radix(digits, base).map_err(|e| AsmError::Syntax {
        msg: format!("failed to parse number '{}': {}", digits, e),
        span: Span::new(0, start_col, start, cursor.offset() - start),
    })?;

    Ok(if negative { -magnitude } else { magnitude })
}

fn parse_register(word: &str) -> Result<Register, String> {
    if word.len() < 2 {
        return Err(format!("invalid register name: '{}'", word));
    }
    let (sigil, index_str) = word.split_at(1);
    let class = match sigil {
        "x" => RegisterClass::Vector,
        "s" => RegisterClass::Scalar,
        _ => return Err(format!("invalid register name: '{}'", word)),
    };
    // The full remainder must be the index; `x5z` is not register 5.
    let index = index_str
        .parse::<u32>()
        .map_err(|e| format!("failed to parse register number '{}': {}", index_str, e))?;
    Ok(Register { index, class })
}

// ─── Tokens ─────────────────────────────────────────────────────────

/// A token produced by the lexer.
///
/// Label text is borrowed from the source line; the parser copies it into
/// the owned IR.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'src> {
    /// Token classification and payload.
    pub kind: TokenKind<'src>,
    /// Source location (column only; the driver stamps the line).
    pub span: Span,
}

/// The type of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'src> {
    /// The `.blocks` directive keyword.
    Blocks,
    /// The `.warps` directive keyword.
    Warps,
    /// A catalog mnemonic, with any `s.` prefix resolved.
    Mnemonic(Mnemonic),
    /// A label definition (`name:`), without the colon.
    Label(&'src str),
    /// A reference to a label.
    LabelRef(&'src str),
    /// An integer literal.
    Immediate(i32),
    /// A register name (`x4`, `s31`).
    Register(Register),
    /// `,`
    Comma,
    /// `(`
    Lparen,
    /// `)`
    Rparen,
}

impl TokenKind<'_> {
    /// The name used when this token kind is *expected*, e.g. in
    /// "expected register, found 42".
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            TokenKind::Blocks => ".blocks",
            TokenKind::Warps => ".warps",
            TokenKind::Mnemonic(_) => "mnemonic",
            TokenKind::Label(_) => "label",
            TokenKind::LabelRef(_) => "label_ref",
            TokenKind::Immediate(_) => "immediate",
            TokenKind::Register(_) => "register",
            TokenKind::Comma => "','",
            TokenKind::Lparen => "'('",
            TokenKind::Rparen => "')'",
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TokenKind::Blocks => write!(f, ".blocks"),
            TokenKind::Warps => write!(f, ".warps"),
            TokenKind::Mnemonic(m) => write!(f, "{}", m),
            TokenKind::Label(name) | TokenKind::LabelRef(name) => write!(f, "{}", name),
            TokenKind::Immediate(value) => write!(f, "{}", value),
            TokenKind::Register(r) => write!(f, "{}", r),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Lparen => write!(f, "'('"),
            TokenKind::Rparen => write!(f, "')'"),
        }
    }
}

// ─── Lexer ──────────────────────────────────────────────────────────

/// Token iterator over one source line.
///
/// Yields `Ok(Token)` and `Err(AsmError)` items in source order and keeps
/// scanning after an error with the cursor wherever the failed sub-parser
/// left it, so one malformed token may cascade into further items. A `#`
/// comment ends the line.
#[derive(Debug)]
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    done: bool,
}

impl<'src> Lexer<'src> {
    /// A lexer over `line`.
    #[must_use]
    pub fn new(line: &'src str) -> Self {
        Self {
            cursor: Cursor::new(line),
            done: false,
        }
    }

    fn next_token(&mut self) -> Option<Result<Token<'src>, AsmError>> {
        if self.done {
            return None;
        }
        self.cursor.eat_while(is_whitespace);

        let c = self.cursor.peek()?;

        if c == b'#' {
            self.done = true;
            return None;
        }

        if c == b'-' || c.is_ascii_digit() {
            return Some(self.lex_number());
        }

        if c.is_ascii_alphabetic() {
            return Some(self.lex_keyword());
        }

        let start = self.cursor.offset();
        let col = self.cursor.col();
        match c {
            b'(' => {
                self.cursor.bump();
                Some(Ok(Token {
                    kind: TokenKind::Lparen,
                    span: Span::new(0, col, start, 1),
                }))
            }
            b')' => {
                self.cursor.bump();
                Some(Ok(Token {
                    kind: TokenKind::Rparen,
                    span: Span::new(0, col, start, 1),
                }))
            }
            b',' => {
                self.cursor.bump();
                Some(Ok(Token {
                    kind: TokenKind::Comma,
                    span: Span::new(0, col, start, 1),
                }))
            }
            b'.' => {
                self.cursor.bump();
                Some(self.lex_directive(col, start))
            }
            _ => {
                let ch = self.cursor.rest().chars().next().unwrap_or(c as char);
                self.cursor.advance(ch.len_utf8());
                Some(Err(AsmError::Syntax {
                    msg: format!("unexpected character '{}'", ch),
                    span: Span::new(0, col, start, ch.len_utf8()),
                }))
            }
        }
    }

    fn lex_number(&mut self) -> Result<Token<'src>, AsmError> {
        let start = self.cursor.offset();
        let col = self.cursor.col();
        let value = parse_number(&mut self.cursor)?;
        Ok(Token {
            kind: TokenKind::Immediate(value),
            span: Span::new(0, col, start, self.cursor.offset() - start),
        })
    }

    fn lex_keyword(&mut self) -> Result<Token<'src>, AsmError> {
        let start = self.cursor.offset();
        let col = self.cursor.col();
        let word = self
            .cursor
            .eat_while(|c| is_label_char(c) || c == b'.' || c == b':');
        let span = Span::new(0, col, start, word.len());

        if let Some(mnemonic) = Mnemonic::parse(word) {
            return Ok(Token {
                kind: TokenKind::Mnemonic(mnemonic),
                span,
            });
        }

        if let Some(name) = word.strip_suffix(':') {
            if name.bytes().all(is_label_char) {
                return Ok(Token {
                    kind: TokenKind::Label(name),
                    span,
                });
            }
        }

        // A failed register parse is only reported if nothing else matches;
        // `x5z` still classifies as a label reference below.
        let mut register_error = None;
        if matches!(word.as_bytes().first(), Some(b'x' | b's')) {
            match parse_register(word) {
                Ok(register) => {
                    return Ok(Token {
                        kind: TokenKind::Register(register),
                        span,
                    });
                }
                Err(msg) => register_error = Some(AsmError::Syntax { msg, span }),
            }
        }

        if word.bytes().all(is_label_char) {
            return Ok(Token {
                kind: TokenKind::LabelRef(word),
                span,
            });
        }

        if let Some(err) = register_error {
            return Err(err);
        }

        Err(AsmError::Syntax {
            msg: format!("unexpected keyword '{}'", word),
            span,
        })
    }

    fn lex_directive(&mut self, col: u32, start: usize) -> Result<Token<'src>, AsmError> {
        let name = self.cursor.eat_while(|c| c.is_ascii_alphabetic());
        match name {
            "blocks" => Ok(Token {
                kind: TokenKind::Blocks,
                span: Span::new(0, col, start, name.len() + 1),
            }),
            "warps" => Ok(Token {
                kind: TokenKind::Warps,
                span: Span::new(0, col, start, name.len() + 1),
            }),
            "" => Err(AsmError::Syntax {
                msg: String::from("expected a directive name after '.'"),
                span: Span::new(0, self.cursor.col(), self.cursor.offset(), 0),
            }),
            _ => Err(AsmError::Syntax {
                msg: format!("unknown directive '.{}'", name),
                span: Span::new(0, col + 1, start + 1, name.len()),
            }),
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Result<Token<'src>, AsmError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Tokenize one source line, splitting the results into tokens and errors.
#[must_use]
pub fn tokenize(line: &str) -> (Vec<Token<'_>>, Vec<AsmError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    for item in Lexer::new(line) {
        match item {
            Ok(token) => tokens.push(token),
            Err(err) => errors.push(err),
        }
    }
    (tokens, errors)
}
