//! Error types and source span tracking for diagnostics.

#[allow(unused_imports)]
use alloc::format;
use alloc::string::String;
#[allow(unused_imports)]
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

/// Source location for diagnostics.
///
/// Tracks the line, column, byte offset, and length of a token or construct
/// in the assembly source text. The lexer works one line at a time and leaves
/// `line` at 0; the assembly driver stamps the real line number via
/// [`AsmError::with_line`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    /// 1-based line number (0 until stamped by the driver).
    pub line: u32,
    /// 1-based column number.
    pub col: u32,
    /// 0-based byte offset within the source line.
    pub offset: usize,
    /// Byte length of the spanned region.
    pub len: usize,
}

impl Span {
    /// Create a new span.
    #[must_use]
    pub fn new(line: u32, col: u32, offset: usize, len: usize) -> Self {
        Self {
            line,
            col,
            offset,
            len,
        }
    }

    /// A dummy span for generated/internal constructs.
    #[must_use]
    pub fn dummy() -> Self {
        Self {
            line: 0,
            col: 0,
            offset: 0,
            len: 0,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Assembly error with source location and descriptive message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AsmError {
    /// Mnemonic is not in the instruction catalog, or has no parse rule.
    UnknownMnemonic {
        /// The mnemonic that was not recognized.
        mnemonic: String,
        /// Source location of the unknown mnemonic.
        span: Span,
    },

    /// Invalid operand combination for the instruction.
    InvalidOperands {
        /// Description of why the operands are invalid.
        detail: String,
        /// Source location of the offending operand.
        span: Span,
    },

    /// Immediate value exceeds the allowed range for its field.
    ImmediateOverflow {
        /// The immediate value that overflowed.
        value: i64,
        /// Minimum allowed value.
        min: i64,
        /// Maximum allowed value.
        max: i64,
        /// Source location of the instruction.
        span: Span,
    },

    /// Register index does not fit the 5-bit register field.
    RegisterOutOfRange {
        /// Textual form of the offending register (e.g. `x37`).
        register: String,
        /// Source location of the instruction.
        span: Span,
    },

    /// Opcode/funct value is not one of the legal codes for its field.
    IllegalEncoding {
        /// Field name (`opcode`, `funct3` or `funct7`).
        field: String,
        /// The rejected field value.
        value: u32,
        /// Source location of the instruction.
        span: Span,
    },

    /// Referenced label was never defined.
    UndefinedLabel {
        /// The undefined label name.
        label: String,
        /// Source location of the reference.
        span: Span,
    },

    /// Label was defined more than once.
    DuplicateLabel {
        /// The duplicated label name.
        label: String,
        /// Source location of the duplicate definition.
        span: Span,
        /// Source location of the first definition.
        first_span: Span,
    },

    /// A `.blocks`/`.warps` directive appeared more than once.
    DuplicateDirective {
        /// The directive keyword (e.g. `.blocks`).
        directive: String,
        /// Source location of the repeated directive.
        span: Span,
    },

    /// Syntax error during lexing or parsing.
    Syntax {
        /// The syntax error message.
        msg: String,
        /// Source location of the syntax error.
        span: Span,
    },

    /// Multiple errors collected during assembly.
    Multiple {
        /// The collected assembly errors.
        errors: Vec<AsmError>,
    },
}

impl AsmError {
    /// Collapse an error list: `None` when empty, the sole error when there
    /// is exactly one, [`AsmError::Multiple`] otherwise.
    #[must_use]
    pub fn from_errors(mut errors: Vec<AsmError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(AsmError::Multiple { errors }),
        }
    }

    /// Stamp a line number onto this error's span.
    ///
    /// The lexer and parser work on a single line and do not know its number;
    /// the assembly driver applies it afterwards. Recurses into
    /// [`AsmError::Multiple`].
    #[must_use]
    pub fn with_line(mut self, line: u32) -> Self {
        match &mut self {
            AsmError::UnknownMnemonic { span, .. }
            | AsmError::InvalidOperands { span, .. }
            | AsmError::ImmediateOverflow { span, .. }
            | AsmError::RegisterOutOfRange { span, .. }
            | AsmError::IllegalEncoding { span, .. }
            | AsmError::UndefinedLabel { span, .. }
            | AsmError::DuplicateLabel { span, .. }
            | AsmError::DuplicateDirective { span, .. }
            | AsmError::Syntax { span, .. } => span.line = line,
            AsmError::Multiple { errors } => {
                *errors = core::mem::take(errors)
                    .into_iter()
                    .map(|e| e.with_line(line))
                    .collect();
            }
        }
        self
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmError::UnknownMnemonic { mnemonic, span } => {
                write!(f, "{}: unknown mnemonic '{}'", span, mnemonic)
            }
            AsmError::InvalidOperands { detail, span } => {
                write!(f, "{}: invalid operand combination: {}", span, detail)
            }
            AsmError::ImmediateOverflow {
                value,
                min,
                max,
                span,
            } => {
                write!(
                    f,
                    "{}: immediate value {} out of range [{}..{}]",
                    span, value, min, max
                )
            }
            AsmError::RegisterOutOfRange { register, span } => {
                write!(
                    f,
                    "{}: register '{}' out of range (valid indices 0-31)",
                    span, register
                )
            }
            AsmError::IllegalEncoding { field, value, span } => {
                write!(f, "{}: illegal {} value {:#b}", span, field, value)
            }
            AsmError::UndefinedLabel { label, span } => {
                write!(f, "{}: undefined label '{}'", span, label)
            }
            AsmError::DuplicateLabel {
                label,
                span,
                first_span,
            } => {
                write!(
                    f,
                    "{}: duplicate label '{}' (first defined at {})",
                    span, label, first_span
                )
            }
            AsmError::DuplicateDirective { directive, span } => {
                write!(f, "{}: duplicate {} directive", span, directive)
            }
            AsmError::Syntax { msg, span } => {
                write!(f, "{}: {}", span, msg)
            }
            AsmError::Multiple { errors } => {
                for (i, e) in errors.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", e)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AsmError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_display() {
        let span = Span::new(3, 12, 11, 5);
        assert_eq!(format!("{}", span), "3:12");
    }

    #[test]
    fn span_dummy() {
        let span = Span::dummy();
        assert_eq!(span.line, 0);
        assert_eq!(span.col, 0);
    }

    #[test]
    fn error_unknown_mnemonic_display() {
        let err = AsmError::UnknownMnemonic {
            mnemonic: "beq".into(),
            span: Span::new(3, 12, 11, 3),
        };
        assert_eq!(format!("{}", err), "3:12: unknown mnemonic 'beq'");
    }

    #[test]
    fn error_syntax_display() {
        let err = AsmError::Syntax {
            msg: "unexpected character '!'".into(),
            span: Span::new(1, 5, 4, 1),
        };
        assert_eq!(format!("{}", err), "1:5: unexpected character '!'");
    }

    #[test]
    fn error_undefined_label_display() {
        let err = AsmError::UndefinedLabel {
            label: "my_label".into(),
            span: Span::new(10, 1, 0, 8),
        };
        assert_eq!(format!("{}", err), "10:1: undefined label 'my_label'");
    }

    #[test]
    fn error_immediate_overflow_display() {
        let err = AsmError::ImmediateOverflow {
            value: 4096,
            min: -2048,
            max: 4095,
            span: Span::new(5, 10, 9, 4),
        };
        assert_eq!(
            format!("{}", err),
            "5:10: immediate value 4096 out of range [-2048..4095]"
        );
    }

    #[test]
    fn error_register_out_of_range_display() {
        let err = AsmError::RegisterOutOfRange {
            register: "x37".into(),
            span: Span::new(2, 6, 5, 3),
        };
        assert_eq!(
            format!("{}", err),
            "2:6: register 'x37' out of range (valid indices 0-31)"
        );
    }

    #[test]
    fn error_duplicate_label_display() {
        let err = AsmError::DuplicateLabel {
            label: "loop".into(),
            span: Span::new(20, 1, 0, 4),
            first_span: Span::new(5, 1, 0, 4),
        };
        assert_eq!(
            format!("{}", err),
            "20:1: duplicate label 'loop' (first defined at 5:1)"
        );
    }

    #[test]
    fn error_duplicate_directive_display() {
        let err = AsmError::DuplicateDirective {
            directive: ".blocks".into(),
            span: Span::new(4, 1, 0, 7),
        };
        assert_eq!(format!("{}", err), "4:1: duplicate .blocks directive");
    }

    #[test]
    fn error_multiple_display() {
        let err = AsmError::Multiple {
            errors: vec![
                AsmError::Syntax {
                    msg: "err1".into(),
                    span: Span::new(1, 1, 0, 1),
                },
                AsmError::Syntax {
                    msg: "err2".into(),
                    span: Span::new(2, 1, 0, 1),
                },
            ],
        };
        let s = format!("{}", err);
        assert!(s.contains("err1"));
        assert!(s.contains("err2"));
    }

    #[test]
    fn with_line_stamps_span() {
        let err = AsmError::Syntax {
            msg: "x".into(),
            span: Span::new(0, 7, 6, 1),
        }
        .with_line(12);
        assert_eq!(format!("{}", err), "12:7: x");
    }

    #[test]
    fn with_line_recurses_into_multiple() {
        let err = AsmError::Multiple {
            errors: vec![AsmError::Syntax {
                msg: "x".into(),
                span: Span::new(0, 2, 1, 1),
            }],
        }
        .with_line(3);
        assert_eq!(format!("{}", err), "3:2: x");
    }
}
