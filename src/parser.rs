//! Token-to-IR parser for one source line.
//!
//! A line is either a `.blocks`/`.warps` directive, a standalone label, or an
//! instruction with an optional leading label. [`parse_line`] walks the token
//! slice produced by [`crate::lexer::tokenize`] and builds the matching
//! [`Line`], checking operand shape and register class as it goes. Immediate
//! range checking is left to the encoder, which knows each field's width.
//!
//! A line aborts at its first problem; accumulation across lines is the
//! driver's job.

use alloc::format;
use alloc::string::ToString;
use alloc::vec::Vec;

use crate::error::{AsmError, Span};
use crate::ir::{
    Instruction, JalrTarget, LabelDef, Line, Mnemonic, MnemonicName, Operands, Register,
    RegisterClass,
};
use crate::lexer::{Token, TokenKind};

/// Parse the tokens of a single source line into a [`Line`].
///
/// Spans in the returned value and in any errors carry line number `0`;
/// the caller stamps the real line via [`AsmError::with_line`] and by
/// tracking its own position in the source.
///
/// Blank lines tokenize to an empty slice and should be skipped by the
/// caller rather than passed here.
///
/// # Errors
///
/// Returns the problem that made the line unparseable: an unexpected or
/// missing token, a register of the wrong class, an out-of-range directive
/// count, or a mnemonic with no operand rule.
///
/// ```
/// use warp_asm::ir::Line;
/// use warp_asm::lexer::tokenize;
/// use warp_asm::parser::parse_line;
///
/// let (tokens, errors) = tokenize(".blocks 4");
/// assert!(errors.is_empty());
/// assert!(matches!(parse_line(&tokens), Ok(Line::Blocks(4, _))));
/// ```
pub fn parse_line<'src>(tokens: &[Token<'src>]) -> Result<Line, Vec<AsmError>> {
    let mut parser = Parser::new(tokens);
    match parser.parse_line() {
        Some(line) => Ok(line),
        None => Err(parser.errors),
    }
}

struct Parser<'a, 'src> {
    tokens: &'a [Token<'src>],
    pos: usize,
    errors: Vec<AsmError>,
}

impl<'a, 'src> Parser<'a, 'src> {
    fn new(tokens: &'a [Token<'src>]) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    #[inline]
    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos)
    }

    /// Consume and return the next token, if any.
    #[inline]
    fn advance(&mut self) -> Option<Token<'src>> {
        let token = self.tokens.get(self.pos)?.clone();
        self.pos += 1;
        Some(token)
    }

    /// Consume one token and run `extract` on it. Records an error and
    /// returns `None` on end of stream or when `extract` rejects the token.
    fn expect<T>(
        &mut self,
        expected: &str,
        extract: impl FnOnce(&Token<'src>) -> Option<T>,
    ) -> Option<T> {
        let token = match self.advance() {
            Some(token) => token,
            None => {
                self.errors.push(AsmError::Syntax {
                    msg: format!("unexpected end of stream: expected {}", expected),
                    span: Span::dummy(),
                });
                return None;
            }
        };
        if let Some(value) = extract(&token) {
            return Some(value);
        }
        self.errors.push(AsmError::Syntax {
            msg: format!("unexpected token: expected {}, found {}", expected, token),
            span: token.span,
        });
        None
    }

    fn expect_register(&mut self) -> Option<(Register, Span)> {
        self.expect("register", |token| match token.kind {
            TokenKind::Register(register) => Some((register, token.span)),
            _ => None,
        })
    }

    fn expect_immediate(&mut self) -> Option<(i32, Span)> {
        self.expect("immediate", |token| match token.kind {
            TokenKind::Immediate(value) => Some((value, token.span)),
            _ => None,
        })
    }

    /// `jalr` takes either a label reference or an `imm(rs1)` offset.
    fn expect_jalr_target(&mut self) -> Option<JalrTarget> {
        self.expect("label_ref or immediate", |token| match token.kind {
            TokenKind::LabelRef(name) => Some(JalrTarget::Label(name.to_string())),
            TokenKind::Immediate(value) => Some(JalrTarget::Immediate(value)),
            _ => None,
        })
    }

    fn expect_comma(&mut self) -> Option<()> {
        self.expect("','", |token| {
            matches!(token.kind, TokenKind::Comma).then_some(())
        })
    }

    fn expect_lparen(&mut self) -> Option<()> {
        self.expect("'('", |token| {
            matches!(token.kind, TokenKind::Lparen).then_some(())
        })
    }

    fn expect_rparen(&mut self) -> Option<()> {
        self.expect("')'", |token| {
            matches!(token.kind, TokenKind::Rparen).then_some(())
        })
    }

    /// Require `register` to belong to `expected`, recording an error at the
    /// register token's span otherwise.
    fn check_register_class(
        &mut self,
        register: Register,
        span: Span,
        expected: RegisterClass,
    ) -> Option<()> {
        if register.class == expected {
            Some(())
        } else {
            self.errors.push(AsmError::InvalidOperands {
                detail: format!("register '{}' should be {}", register, expected),
                span,
            });
            None
        }
    }

    fn parse_line(&mut self) -> Option<Line> {
        let mut token = self.peek()?.clone();

        if matches!(token.kind, TokenKind::Blocks | TokenKind::Warps) {
            self.advance();
            return self.parse_directive(&token);
        }

        let mut label = None;
        if let TokenKind::Label(name) = token.kind {
            self.advance();
            let def = LabelDef {
                name: name.to_string(),
                span: token.span,
            };
            match self.peek() {
                None => return Some(Line::Label(def)),
                Some(next) => {
                    label = Some(def);
                    token = next.clone();
                }
            }
        }

        if let TokenKind::Mnemonic(mnemonic) = token.kind {
            self.advance();
            let mut instruction = self.parse_instruction(mnemonic, token.span)?;
            instruction.label = label;
            if let Some(trailing) = self.peek().cloned() {
                self.errors.push(AsmError::Syntax {
                    msg: format!("unexpected token: expected end of line, found {}", trailing),
                    span: trailing.span,
                });
                return None;
            }
            return Some(Line::Instruction(instruction));
        }

        self.errors.push(AsmError::Syntax {
            msg: format!(
                "unexpected token: expected mnemonic or directive, found {}",
                token
            ),
            span: token.span,
        });
        None
    }

    /// `.blocks N` / `.warps N` with `N >= 1` and nothing after it.
    fn parse_directive(&mut self, token: &Token<'src>) -> Option<Line> {
        let directive = token.kind.description();
        let (value, value_span) = self.expect_immediate()?;

        let count = match u32::try_from(value) {
            Ok(count) if count >= 1 => count,
            _ => {
                self.errors.push(AsmError::Syntax {
                    msg: format!("invalid number of {}: '{}'", directive, value),
                    span: value_span,
                });
                return None;
            }
        };
        if let Some(trailing) = self.peek().cloned() {
            self.errors.push(AsmError::Syntax {
                msg: format!("unexpected token: expected end of line, found {}", trailing),
                span: trailing.span,
            });
            return None;
        }

        match token.kind {
            TokenKind::Blocks => Some(Line::Blocks(count, token.span)),
            _ => Some(Line::Warps(count, token.span)),
        }
    }

    fn parse_instruction(&mut self, mnemonic: Mnemonic, span: Span) -> Option<Instruction> {
        let name = mnemonic.name;

        if name == MnemonicName::Halt {
            // halt takes no operands; every operand field encodes as zero.
            return Some(Instruction {
                label: None,
                mnemonic,
                operands: Operands::Itype {
                    rd: Register::vector(0),
                    rs1: Register::vector(0),
                    imm12: 0,
                },
                span,
            });
        }
        if name.is_itype_arithmetic() {
            return self.parse_itype_arithmetic(mnemonic, span);
        }
        if name.is_rtype() {
            return self.parse_rtype(mnemonic, span);
        }
        if name.is_load() {
            return self.parse_load(mnemonic, span);
        }
        if name.is_store() {
            return self.parse_store(mnemonic, span);
        }
        if name.is_utype() {
            return self.parse_utype(mnemonic, span);
        }
        if name == MnemonicName::Jal {
            return self.parse_jal(mnemonic, span);
        }
        if name == MnemonicName::Jalr {
            return self.parse_jalr(mnemonic, span);
        }

        // Branch mnemonics lex but have no operand rule.
        self.errors.push(AsmError::UnknownMnemonic {
            mnemonic: mnemonic.to_string(),
            span,
        });
        None
    }

    /// `rd, rs1, imm12`. `sx.slti` reads a vector source into a scalar
    /// destination; everything else keeps both registers in the mnemonic's
    /// own class.
    fn parse_itype_arithmetic(&mut self, mnemonic: Mnemonic, span: Span) -> Option<Instruction> {
        let (rd, rd_span) = self.expect_register()?;
        self.expect_comma()?;
        let (rs1, rs1_span) = self.expect_register()?;
        self.expect_comma()?;
        let (imm12, _) = self.expect_immediate()?;

        if mnemonic.name == MnemonicName::SxSlti {
            self.check_register_class(rd, rd_span, RegisterClass::Scalar)?;
            self.check_register_class(rs1, rs1_span, RegisterClass::Vector)?;
        } else {
            let class = mnemonic.register_class();
            self.check_register_class(rd, rd_span, class)?;
            self.check_register_class(rs1, rs1_span, class)?;
        }

        Some(Instruction {
            label: None,
            mnemonic,
            operands: Operands::Itype { rd, rs1, imm12 },
            span,
        })
    }

    /// `rd, rs1, rs2`. `sx.slt` reads two vector sources into a scalar
    /// destination.
    fn parse_rtype(&mut self, mnemonic: Mnemonic, span: Span) -> Option<Instruction> {
        let (rd, rd_span) = self.expect_register()?;
        self.expect_comma()?;
        let (rs1, rs1_span) = self.expect_register()?;
        self.expect_comma()?;
        let (rs2, rs2_span) = self.expect_register()?;

        if mnemonic.name == MnemonicName::SxSlt {
            self.check_register_class(rd, rd_span, RegisterClass::Scalar)?;
            self.check_register_class(rs1, rs1_span, RegisterClass::Vector)?;
            self.check_register_class(rs2, rs2_span, RegisterClass::Vector)?;
        } else {
            let class = mnemonic.register_class();
            self.check_register_class(rd, rd_span, class)?;
            self.check_register_class(rs1, rs1_span, class)?;
            self.check_register_class(rs2, rs2_span, class)?;
        }

        Some(Instruction {
            label: None,
            mnemonic,
            operands: Operands::Rtype { rd, rs1, rs2 },
            span,
        })
    }

    /// `rd, imm12(rs1)`.
    fn parse_load(&mut self, mnemonic: Mnemonic, span: Span) -> Option<Instruction> {
        let (rd, rd_span) = self.expect_register()?;
        self.expect_comma()?;
        let (imm12, _) = self.expect_immediate()?;
        self.expect_lparen()?;
        let (rs1, rs1_span) = self.expect_register()?;
        self.expect_rparen()?;

        let class = mnemonic.register_class();
        self.check_register_class(rd, rd_span, class)?;
        self.check_register_class(rs1, rs1_span, class)?;

        Some(Instruction {
            label: None,
            mnemonic,
            operands: Operands::Itype { rd, rs1, imm12 },
            span,
        })
    }

    /// `rs2, imm12(rs1)`.
    fn parse_store(&mut self, mnemonic: Mnemonic, span: Span) -> Option<Instruction> {
        let (rs2, rs2_span) = self.expect_register()?;
        self.expect_comma()?;
        let (imm12, _) = self.expect_immediate()?;
        self.expect_lparen()?;
        let (rs1, rs1_span) = self.expect_register()?;
        self.expect_rparen()?;

        let class = mnemonic.register_class();
        self.check_register_class(rs1, rs1_span, class)?;
        self.check_register_class(rs2, rs2_span, class)?;

        Some(Instruction {
            label: None,
            mnemonic,
            operands: Operands::Stype { rs1, rs2, imm12 },
            span,
        })
    }

    /// `rd, imm20`.
    fn parse_utype(&mut self, mnemonic: Mnemonic, span: Span) -> Option<Instruction> {
        let (rd, rd_span) = self.expect_register()?;
        self.expect_comma()?;
        let (imm20, _) = self.expect_immediate()?;

        self.check_register_class(rd, rd_span, mnemonic.register_class())?;

        Some(Instruction {
            label: None,
            mnemonic,
            operands: Operands::Utype { rd, imm20 },
            span,
        })
    }

    /// `rd, imm`. The link register is not class-checked.
    fn parse_jal(&mut self, mnemonic: Mnemonic, span: Span) -> Option<Instruction> {
        let (rd, _) = self.expect_register()?;
        self.expect_comma()?;
        let (imm20, _) = self.expect_immediate()?;

        Some(Instruction {
            label: None,
            mnemonic,
            operands: Operands::Jtype { rd, imm20 },
            span,
        })
    }

    /// `rd, label` or `rd, imm12(rs1)`. The label form leaves `rs1` as `x0`
    /// and resolves the offset at encode time.
    fn parse_jalr(&mut self, mnemonic: Mnemonic, span: Span) -> Option<Instruction> {
        let (rd, _) = self.expect_register()?;
        self.expect_comma()?;
        let target = self.expect_jalr_target()?;

        let operands = match target {
            JalrTarget::Label(_) => Operands::Jalr {
                rd,
                rs1: Register::vector(0),
                target,
            },
            JalrTarget::Immediate(_) => {
                self.expect_lparen()?;
                let (rs1, _) = self.expect_register()?;
                self.expect_rparen()?;
                Operands::Jalr { rd, rs1, target }
            }
        };

        Some(Instruction {
            label: None,
            mnemonic,
            operands,
            span,
        })
    }
}
