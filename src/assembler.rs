//! Program assembly: source lines in, [`Program`] out.
//!
//! [`assemble_lines`] drives the lexer and parser over the source one line
//! at a time, folding directives, labels, and instructions into a
//! [`Program`] while collecting every error along the way. Assembly is
//! all-or-nothing: a single failing line fails the whole run, but reporting
//! is exhaustive rather than first-error-only. [`assemble_to_words`] chains
//! the encoder on top for text-to-machine-code in one call.
//!
//! Label addresses are instruction indices: a label maps to the instruction
//! it is attached to, or to the next instruction when it stands alone. The
//! first definition of a label wins; later ones are reported as duplicates.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::encoder::encode;
use crate::error::{AsmError, Span};
use crate::ir::{Instruction, LabelDef, Line, Program};
use crate::lexer::tokenize;
use crate::parser::parse_line;

/// Assemble an iterator of source lines into a [`Program`].
///
/// Lines are numbered from 1 in the order the iterator yields them. Blank
/// lines and pure comment lines are skipped; lines that fail to lex are
/// reported and not parsed further.
///
/// # Errors
///
/// Returns every problem found across the whole input, folded into a single
/// [`AsmError`] ([`AsmError::Multiple`] when there is more than one). No
/// partial program is ever produced.
pub fn assemble_lines<'a, I>(lines: I) -> Result<Program, AsmError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut builder = ProgramBuilder::new();
    for (index, line) in lines.into_iter().enumerate() {
        let line_nr = index as u32 + 1;
        let (tokens, lex_errors) = tokenize(line);
        if !lex_errors.is_empty() {
            builder
                .errors
                .extend(lex_errors.into_iter().map(|e| e.with_line(line_nr)));
            continue;
        }
        if tokens.is_empty() {
            continue;
        }
        match parse_line(&tokens) {
            Ok(parsed) => builder.visit(parsed, line_nr),
            Err(parse_errors) => builder
                .errors
                .extend(parse_errors.into_iter().map(|e| e.with_line(line_nr))),
        }
    }
    builder.finish()
}

/// Assemble a complete source text into a [`Program`].
///
/// # Errors
///
/// See [`assemble_lines`].
///
/// ```
/// use warp_asm::assembler::assemble;
///
/// let program = assemble(".blocks 2\n.warps 4\nmain: addi x5, x5, 87\nhalt").unwrap();
/// assert_eq!(program.blocks, 2);
/// assert_eq!(program.warps, 4);
/// assert_eq!(program.instructions.len(), 2);
/// assert_eq!(program.address_of("main"), Some(0));
/// ```
pub fn assemble(source: &str) -> Result<Program, AsmError> {
    assemble_lines(source.lines())
}

/// Assemble a complete source text straight to machine-code words.
///
/// # Errors
///
/// See [`assemble_lines`]; encoding failures (out-of-range immediates,
/// unresolved `jalr` labels) are reported the same way.
///
/// ```
/// use warp_asm::assembler::assemble_to_words;
///
/// let words = assemble_to_words("addi x5, x5, 87\nhalt").unwrap();
/// assert_eq!(words, vec![0x0572_8293, 0x0000_007F]);
/// ```
pub fn assemble_to_words(source: &str) -> Result<Vec<u32>, AsmError> {
    let program = assemble(source)?;
    encode(&program)
}

/// Accumulates program state across lines.
struct ProgramBuilder {
    blocks: Option<u32>,
    warps: Option<u32>,
    instructions: Vec<Instruction>,
    labels: BTreeMap<String, u32>,
    /// Where each label was first defined, for duplicate reports.
    label_spans: BTreeMap<String, Span>,
    errors: Vec<AsmError>,
}

impl ProgramBuilder {
    fn new() -> Self {
        Self {
            blocks: None,
            warps: None,
            instructions: Vec::new(),
            labels: BTreeMap::new(),
            label_spans: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    /// Fold one parsed line into the program, stamping `line_nr` onto its
    /// spans.
    fn visit(&mut self, line: Line, line_nr: u32) {
        match line {
            Line::Label(mut def) => {
                def.span.line = line_nr;
                let address = self.instructions.len() as u32;
                self.add_label(def, address);
            }
            Line::Instruction(mut instruction) => {
                instruction.span.line = line_nr;
                if let Some(def) = &mut instruction.label {
                    def.span.line = line_nr;
                }
                let attached = instruction.label.clone();
                let address = self.instructions.len() as u32;
                self.instructions.push(instruction);
                if let Some(def) = attached {
                    self.add_label(def, address);
                }
            }
            Line::Blocks(count, mut span) => {
                span.line = line_nr;
                if self.blocks.is_some() {
                    self.errors.push(AsmError::DuplicateDirective {
                        directive: ".blocks".to_string(),
                        span,
                    });
                }
                self.blocks = Some(count);
            }
            Line::Warps(count, mut span) => {
                span.line = line_nr;
                if self.warps.is_some() {
                    self.errors.push(AsmError::DuplicateDirective {
                        directive: ".warps".to_string(),
                        span,
                    });
                }
                self.warps = Some(count);
            }
        }
    }

    /// Register a label at `address`. The first definition wins; a repeat
    /// definition is recorded as an error and does not move the label.
    fn add_label(&mut self, def: LabelDef, address: u32) {
        if let Some(first_span) = self.label_spans.get(&def.name) {
            self.errors.push(AsmError::DuplicateLabel {
                label: def.name,
                span: def.span,
                first_span: *first_span,
            });
            return;
        }
        self.labels.insert(def.name.clone(), address);
        self.label_spans.insert(def.name, def.span);
    }

    fn finish(self) -> Result<Program, AsmError> {
        match AsmError::from_errors(self.errors) {
            None => Ok(Program {
                blocks: self.blocks.unwrap_or(1),
                warps: self.warps.unwrap_or(1),
                instructions: self.instructions,
                label_table: self.labels,
            }),
            Some(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn empty_source_gets_defaults() {
        let program = assemble("").unwrap();
        assert_eq!(program.blocks, 1);
        assert_eq!(program.warps, 1);
        assert!(program.instructions.is_empty());
        assert!(program.label_table.is_empty());
    }

    #[test]
    fn directives_override_defaults() {
        let program = assemble(".blocks 3").unwrap();
        assert_eq!(program.blocks, 3);
        assert_eq!(program.warps, 1);
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        let program = assemble("# kernel entry\n\n   \nhalt").unwrap();
        assert_eq!(program.instructions.len(), 1);
    }

    #[test]
    fn labels_map_to_instruction_indices() {
        let source = "start: addi x1, x1, 1\nloop:\naddi x2, x2, 2\nend: halt";
        let program = assemble(source).unwrap();
        assert_eq!(program.instructions.len(), 3);
        assert_eq!(program.address_of("start"), Some(0));
        assert_eq!(program.address_of("loop"), Some(1));
        assert_eq!(program.address_of("end"), Some(2));
        assert_eq!(program.address_of("absent"), None);
    }

    #[test]
    fn trailing_label_points_past_the_end() {
        let program = assemble("halt\ndone:").unwrap();
        assert_eq!(program.address_of("done"), Some(1));
    }

    #[test]
    fn duplicate_label_reports_both_sites() {
        let error = assemble("a: halt\na: halt").unwrap_err();
        assert_eq!(
            error.to_string(),
            "2:1: duplicate label 'a' (first defined at 1:1)"
        );
    }

    #[test]
    fn duplicate_directive_reported() {
        let error = assemble(".blocks 2\n.blocks 3").unwrap_err();
        assert_eq!(error.to_string(), "2:1: duplicate .blocks directive");
    }

    #[test]
    fn lexically_broken_lines_are_not_parsed() {
        let error = assemble("addi x1, x1, $").unwrap_err();
        assert_eq!(error.to_string(), "1:14: unexpected character '$'");
    }

    #[test]
    fn errors_accumulate_across_lines() {
        let error = assemble("addi x1, x1, $\nbogus x1\nhalt").unwrap_err();
        match error {
            AsmError::Multiple { errors } => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].to_string(), "1:14: unexpected character '$'");
                assert_eq!(
                    errors[1].to_string(),
                    "2:1: unexpected token: expected mnemonic or directive, found bogus"
                );
            }
            other => panic!("expected Multiple, got {:?}", other),
        }
    }

    #[test]
    fn assembly_is_all_or_nothing() {
        assert!(assemble("halt\nbeq x1, x2, 4").is_err());
    }

    #[test]
    fn line_numbers_stamp_parse_errors() {
        let error = assemble("# comment\nbeq x1, x2, 4").unwrap_err();
        assert_eq!(error.to_string(), "2:1: unknown mnemonic 'beq'");
    }

    #[test]
    fn words_resolve_forward_references() {
        let words = assemble_to_words("jalr x1, end\nhalt\nend: halt").unwrap();
        assert_eq!(words, vec![0x0020_00E7, 0x0000_007F, 0x0000_007F]);
    }

    #[test]
    fn instruction_spans_carry_their_line() {
        let program = assemble("halt\nhalt").unwrap();
        assert_eq!(program.instructions[0].span.line, 1);
        assert_eq!(program.instructions[1].span.line, 2);
    }

    #[test]
    fn encode_failures_flow_through_assemble_to_words() {
        let error = assemble_to_words("addi x1, x1, 4096").unwrap_err();
        assert_eq!(
            error.to_string(),
            "1:1: immediate value 4096 out of range [-2048..4095]"
        );
    }
}
