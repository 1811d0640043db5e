//! Bit-level encoding of parsed instructions into 32-bit words.
//!
//! Every mnemonic maps to a fixed [`Determinant`] (opcode, funct3, funct7).
//! [`InstructionBits`] packs operand fields at their RISC-V offsets,
//! validating each value against its field width. [`encode`] walks a
//! [`Program`] in order and produces one word per instruction, resolving
//! `jalr` label references through the program's label table.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::{AsmError, Span};
use crate::ir::{Instruction, JalrTarget, MnemonicName, Operands, Program, Register};

// ─── Field codes ────────────────────────────────────────────────────

/// Opcode constants. Bit 6 is the scalar/vector discriminator: the base
/// ALU/load/store opcodes leave it clear and gain it through
/// [`InstructionBits::make_scalar`], while jumps, branches, and the custom
/// opcodes carry it inherently.
pub mod opcode {
    /// `lui`
    pub const LUI: u32 = 0b0110111;
    /// `auipc`
    pub const AUIPC: u32 = 0b0010111;
    /// ALU I-type: `addi`, `slti`, `xori`, `ori`, `andi`, `slli`, `srli`, `srai`
    pub const ITYPE: u32 = 0b0010011;
    /// R-type: `add`, `sub`, `sll`, `slt`, `xor`, `srl`, `sra`, `or`, `and`
    pub const RTYPE: u32 = 0b0110011;
    /// Loads: `lb`, `lh`, `lw`
    pub const LOAD: u32 = 0b0000011;
    /// Stores: `sb`, `sh`, `sw`
    pub const STYPE: u32 = 0b0100011;
    /// `jal`
    pub const JTYPE: u32 = 0b1101111;
    /// `jalr`
    pub const JALR: u32 = 0b1100111;
    /// Branches: `beq`, `bne`, `blt`, `bge`
    pub const BTYPE: u32 = 0b1100011;
    /// `halt`
    pub const HALT: u32 = 0b1111111;
    /// `sx.slt`
    pub const SX_SLT: u32 = 0b1111110;
    /// `sx.slti`
    pub const SX_SLTI: u32 = 0b1111101;

    /// Every opcode a word may carry.
    pub const LEGAL: [u32; 12] = [
        LUI, AUIPC, ITYPE, RTYPE, LOAD, STYPE, JTYPE, JALR, BTYPE, HALT, SX_SLT, SX_SLTI,
    ];

    /// Whether bit 6, the scalar discriminator, is set.
    #[must_use]
    pub const fn is_scalar(opcode: u32) -> bool {
        opcode & (1 << 6) != 0
    }

    /// Whether bit 6, the scalar discriminator, is clear.
    #[must_use]
    pub const fn is_vector(opcode: u32) -> bool {
        !is_scalar(opcode)
    }

    /// The scalar rendition of `opcode` (bit 6 set).
    #[must_use]
    pub const fn to_scalar(opcode: u32) -> u32 {
        opcode | (1 << 6)
    }
}

/// Funct3 selector constants. Several mnemonics share a value; the opcode
/// (and for `srl`/`sra`, funct7) disambiguates.
pub mod funct3 {
    pub const ADDI: u32 = 0b000;
    pub const SLTI: u32 = 0b010;
    pub const XORI: u32 = 0b100;
    pub const ORI: u32 = 0b110;
    pub const ANDI: u32 = 0b111;
    pub const SLLI: u32 = 0b001;
    pub const SRLI: u32 = 0b101;
    pub const SRAI: u32 = 0b101;
    pub const ADD: u32 = 0b000;
    pub const SUB: u32 = 0b000;
    pub const SLL: u32 = 0b001;
    pub const SLT: u32 = 0b010;
    pub const XOR: u32 = 0b100;
    pub const SRL: u32 = 0b101;
    pub const SRA: u32 = 0b101;
    pub const OR: u32 = 0b110;
    pub const AND: u32 = 0b111;
    pub const LB: u32 = 0b000;
    pub const LH: u32 = 0b001;
    pub const LW: u32 = 0b010;
    pub const SB: u32 = 0b000;
    pub const SH: u32 = 0b001;
    pub const SW: u32 = 0b010;
    pub const JALR: u32 = 0b000;
    pub const BEQ: u32 = 0b000;
    pub const BNE: u32 = 0b001;
    pub const BLT: u32 = 0b100;
    pub const BGE: u32 = 0b101;

    /// The funct3 codes in use; `0b011` is unassigned.
    pub const LEGAL: [u32; 7] = [0b000, 0b001, 0b010, 0b100, 0b101, 0b110, 0b111];
}

/// Funct7 modifier constants. Only the arithmetic-shift/subtract bit is in
/// use.
pub mod funct7 {
    pub const SLLI: u32 = 0b0000000;
    pub const SRLI: u32 = 0b0000000;
    pub const SRAI: u32 = 0b0100000;
    pub const ADD: u32 = 0b0000000;
    pub const SUB: u32 = 0b0100000;
    pub const SLL: u32 = 0b0000000;
    pub const SLT: u32 = 0b0000000;
    pub const XOR: u32 = 0b0000000;
    pub const SRL: u32 = 0b0000000;
    pub const SRA: u32 = 0b0100000;
    pub const OR: u32 = 0b0000000;
    pub const AND: u32 = 0b0000000;

    /// The funct7 codes in use.
    pub const LEGAL: [u32; 2] = [0b0000000, 0b0100000];
}

// ─── Determinants ───────────────────────────────────────────────────

/// The fixed (opcode, funct3, funct7) triple identifying a mnemonic inside
/// the instruction word. Fields a format does not pack stay zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Determinant {
    /// Base opcode, before any scalar-bit adjustment.
    pub opcode: u32,
    /// Funct3 selector, or zero where the format has none.
    pub funct3: u32,
    /// Funct7 modifier, or zero where the format has none.
    pub funct7: u32,
}

const fn det(opcode: u32, funct3: u32, funct7: u32) -> Determinant {
    Determinant {
        opcode,
        funct3,
        funct7,
    }
}

/// Look up the encoding determinant for a mnemonic name.
#[must_use]
pub const fn determinant(name: MnemonicName) -> Determinant {
    match name {
        MnemonicName::Lui => det(opcode::LUI, 0, 0),
        MnemonicName::Auipc => det(opcode::AUIPC, 0, 0),
        MnemonicName::Addi => det(opcode::ITYPE, funct3::ADDI, 0),
        MnemonicName::Slti => det(opcode::ITYPE, funct3::SLTI, 0),
        MnemonicName::Xori => det(opcode::ITYPE, funct3::XORI, 0),
        MnemonicName::Ori => det(opcode::ITYPE, funct3::ORI, 0),
        MnemonicName::Andi => det(opcode::ITYPE, funct3::ANDI, 0),
        MnemonicName::Slli => det(opcode::ITYPE, funct3::SLLI, funct7::SLLI),
        MnemonicName::Srli => det(opcode::ITYPE, funct3::SRLI, funct7::SRLI),
        MnemonicName::Srai => det(opcode::ITYPE, funct3::SRAI, funct7::SRAI),
        MnemonicName::Add => det(opcode::RTYPE, funct3::ADD, funct7::ADD),
        MnemonicName::Sub => det(opcode::RTYPE, funct3::SUB, funct7::SUB),
        MnemonicName::Sll => det(opcode::RTYPE, funct3::SLL, funct7::SLL),
        MnemonicName::Slt => det(opcode::RTYPE, funct3::SLT, funct7::SLT),
        MnemonicName::Xor => det(opcode::RTYPE, funct3::XOR, funct7::XOR),
        MnemonicName::Srl => det(opcode::RTYPE, funct3::SRL, funct7::SRL),
        MnemonicName::Sra => det(opcode::RTYPE, funct3::SRA, funct7::SRA),
        MnemonicName::Or => det(opcode::RTYPE, funct3::OR, funct7::OR),
        MnemonicName::And => det(opcode::RTYPE, funct3::AND, funct7::AND),
        MnemonicName::Lb => det(opcode::LOAD, funct3::LB, 0),
        MnemonicName::Lh => det(opcode::LOAD, funct3::LH, 0),
        MnemonicName::Lw => det(opcode::LOAD, funct3::LW, 0),
        MnemonicName::Sb => det(opcode::STYPE, funct3::SB, 0),
        MnemonicName::Sh => det(opcode::STYPE, funct3::SH, 0),
        MnemonicName::Sw => det(opcode::STYPE, funct3::SW, 0),
        MnemonicName::Jal => det(opcode::JTYPE, 0, 0),
        MnemonicName::Jalr => det(opcode::JALR, funct3::JALR, 0),
        MnemonicName::Beq => det(opcode::BTYPE, funct3::BEQ, 0),
        MnemonicName::Bne => det(opcode::BTYPE, funct3::BNE, 0),
        MnemonicName::Blt => det(opcode::BTYPE, funct3::BLT, 0),
        MnemonicName::Bge => det(opcode::BTYPE, funct3::BGE, 0),
        MnemonicName::Halt => det(opcode::HALT, 0, 0),
        MnemonicName::SxSlt => det(opcode::SX_SLT, funct3::SLT, funct7::SLT),
        MnemonicName::SxSlti => det(opcode::SX_SLTI, funct3::SLTI, 0),
    }
}

// ─── Instruction word ───────────────────────────────────────────────

/// A 32-bit instruction word built up field by field.
///
/// Setters validate before merging: register indices must be below 32,
/// immediates must fit the field width (signed values are two's-complement
/// truncated into it), and opcode/funct codes must come from the legal sets.
/// Getters extract the raw field values back out.
///
/// ```
/// use warp_asm::encoder::InstructionBits;
///
/// let bits = InstructionBits::from(0x0572_8293);
/// assert_eq!(bits.opcode(), 0x13);
/// assert_eq!(bits.rd(), 5);
/// assert_eq!(bits.rs1(), 5);
/// assert_eq!(bits.imm12(), 87);
/// assert!(!bits.is_scalar());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstructionBits {
    word: u32,
}

impl InstructionBits {
    /// An all-zero word.
    #[must_use]
    pub const fn new() -> Self {
        Self { word: 0 }
    }

    /// The packed word value.
    #[must_use]
    pub const fn word(self) -> u32 {
        self.word
    }

    /// Merge an opcode into bits 6:0.
    ///
    /// # Errors
    ///
    /// Returns [`AsmError::IllegalEncoding`] if `opcode` is not in
    /// [`opcode::LEGAL`].
    pub fn set_opcode(&mut self, opcode: u32, span: Span) -> Result<(), AsmError> {
        if !self::opcode::LEGAL.contains(&opcode) {
            return Err(AsmError::IllegalEncoding {
                field: "opcode".to_string(),
                value: opcode,
                span,
            });
        }
        self.word |= opcode;
        Ok(())
    }

    /// Merge a destination register into bits 11:7.
    ///
    /// # Errors
    ///
    /// Returns [`AsmError::RegisterOutOfRange`] if the index is 32 or more.
    pub fn set_rd(&mut self, rd: Register, span: Span) -> Result<(), AsmError> {
        let index = checked_register(rd, span)?;
        self.word |= index << 7;
        Ok(())
    }

    /// Merge a funct3 selector into bits 14:12.
    ///
    /// # Errors
    ///
    /// Returns [`AsmError::IllegalEncoding`] if `funct3` is not in
    /// [`funct3::LEGAL`].
    pub fn set_funct3(&mut self, funct3: u32, span: Span) -> Result<(), AsmError> {
        if !self::funct3::LEGAL.contains(&funct3) {
            return Err(AsmError::IllegalEncoding {
                field: "funct3".to_string(),
                value: funct3,
                span,
            });
        }
        self.word |= funct3 << 12;
        Ok(())
    }

    /// Merge the first source register into bits 19:15.
    ///
    /// # Errors
    ///
    /// Returns [`AsmError::RegisterOutOfRange`] if the index is 32 or more.
    pub fn set_rs1(&mut self, rs1: Register, span: Span) -> Result<(), AsmError> {
        let index = checked_register(rs1, span)?;
        self.word |= index << 15;
        Ok(())
    }

    /// Merge the second source register into bits 24:20.
    ///
    /// # Errors
    ///
    /// Returns [`AsmError::RegisterOutOfRange`] if the index is 32 or more.
    pub fn set_rs2(&mut self, rs2: Register, span: Span) -> Result<(), AsmError> {
        let index = checked_register(rs2, span)?;
        self.word |= index << 20;
        Ok(())
    }

    /// Merge a funct7 modifier into bits 31:25.
    ///
    /// # Errors
    ///
    /// Returns [`AsmError::IllegalEncoding`] if `funct7` is not in
    /// [`funct7::LEGAL`].
    pub fn set_funct7(&mut self, funct7: u32, span: Span) -> Result<(), AsmError> {
        if !self::funct7::LEGAL.contains(&funct7) {
            return Err(AsmError::IllegalEncoding {
                field: "funct7".to_string(),
                value: funct7,
                span,
            });
        }
        self.word |= funct7 << 25;
        Ok(())
    }

    /// Merge a 12-bit immediate into bits 31:20 (the I-type position).
    ///
    /// # Errors
    ///
    /// Returns [`AsmError::ImmediateOverflow`] outside `-2048..=4095`.
    pub fn set_imm12(&mut self, value: i64, span: Span) -> Result<(), AsmError> {
        let field = immediate_field(value, 12, span)?;
        self.word |= field << 20;
        Ok(())
    }

    /// Merge a 12-bit immediate into the split S-type positions: bits 4:0 of
    /// the value land at bit 7 and bits 11:5 at bit 25, leaving the rs1/rs2
    /// fields clear.
    ///
    /// # Errors
    ///
    /// Returns [`AsmError::ImmediateOverflow`] outside `-2048..=4095`.
    pub fn set_imm12_split(&mut self, value: i64, span: Span) -> Result<(), AsmError> {
        let field = immediate_field(value, 12, span)?;
        self.word |= (field & 0x1F) << 7;
        self.word |= (field >> 5) << 25;
        Ok(())
    }

    /// Merge a 20-bit immediate into bits 31:12 (the U-type position).
    ///
    /// # Errors
    ///
    /// Returns [`AsmError::ImmediateOverflow`] outside `-524288..=1048575`.
    pub fn set_imm20(&mut self, value: i64, span: Span) -> Result<(), AsmError> {
        let field = immediate_field(value, 20, span)?;
        self.word |= field << 12;
        Ok(())
    }

    /// Merge a 21-bit jump offset in the scattered J-type layout: bit 31
    /// takes offset bit 20, bits 30:21 take offset bits 10:1, bit 20 takes
    /// offset bit 11, and bits 19:12 take offset bits 19:12. Offset bit 0 is
    /// discarded; jump targets are even.
    ///
    /// # Errors
    ///
    /// Returns [`AsmError::ImmediateOverflow`] outside `-1048576..=2097151`.
    pub fn set_imm21(&mut self, value: i64, span: Span) -> Result<(), AsmError> {
        let field = immediate_field(value, 21, span)?;
        self.word |= ((field >> 20) & 0x1) << 31;
        self.word |= ((field >> 1) & 0x3FF) << 21;
        self.word |= ((field >> 11) & 0x1) << 20;
        self.word |= field & 0xFF000;
        Ok(())
    }

    /// Set bit 6, marking the word as a scalar instruction.
    pub fn make_scalar(&mut self) {
        self.word |= 1 << 6;
    }

    /// Clear bit 6, marking the word as a vector instruction.
    pub fn make_vector(&mut self) {
        self.word &= !(1 << 6);
    }

    /// Bits 6:0.
    #[must_use]
    pub const fn opcode(self) -> u32 {
        self.word & 0x7F
    }

    /// Bits 11:7.
    #[must_use]
    pub const fn rd(self) -> u32 {
        (self.word >> 7) & 0x1F
    }

    /// Bits 14:12.
    #[must_use]
    pub const fn funct3(self) -> u32 {
        (self.word >> 12) & 0x7
    }

    /// Bits 19:15.
    #[must_use]
    pub const fn rs1(self) -> u32 {
        (self.word >> 15) & 0x1F
    }

    /// Bits 24:20.
    #[must_use]
    pub const fn rs2(self) -> u32 {
        (self.word >> 20) & 0x1F
    }

    /// Bits 31:25.
    #[must_use]
    pub const fn funct7(self) -> u32 {
        (self.word >> 25) & 0x7F
    }

    /// Bits 31:20, the raw I-type immediate field.
    #[must_use]
    pub const fn imm12(self) -> u32 {
        (self.word >> 20) & 0xFFF
    }

    /// Bits 31:12, the raw U-type immediate field.
    #[must_use]
    pub const fn imm20(self) -> u32 {
        (self.word >> 12) & 0xF_FFFF
    }

    /// Whether bit 6, the scalar discriminator, is set.
    #[must_use]
    pub const fn is_scalar(self) -> bool {
        self.word & (1 << 6) != 0
    }
}

impl From<u32> for InstructionBits {
    fn from(word: u32) -> Self {
        Self { word }
    }
}

impl From<InstructionBits> for u32 {
    fn from(bits: InstructionBits) -> Self {
        bits.word
    }
}

/// Register index, checked against the 32-register file.
fn checked_register(register: Register, span: Span) -> Result<u32, AsmError> {
    if register.index < 32 {
        Ok(register.index)
    } else {
        Err(AsmError::RegisterOutOfRange {
            register: register.to_string(),
            span,
        })
    }
}

/// Truncate `value` to a `width`-bit field after checking it against the
/// field's accepted range, which spans both signed and unsigned readings:
/// `-2^(width-1) ..= 2^width - 1`.
fn immediate_field(value: i64, width: u32, span: Span) -> Result<u32, AsmError> {
    let min = -(1i64 << (width - 1));
    let max = (1i64 << width) - 1;
    if value < min || value > max {
        return Err(AsmError::ImmediateOverflow {
            value,
            min,
            max,
            span,
        });
    }
    let mask = (1u32 << width) - 1;
    Ok((value as u32) & mask)
}

// ─── Encoding ───────────────────────────────────────────────────────

/// Encode a single instruction, resolving any `jalr` label target through
/// `labels` (label name → instruction address).
///
/// # Errors
///
/// Returns an error for a register index of 32 or more, an immediate outside
/// its field range, or a `jalr` label missing from `labels`.
pub fn encode_instruction(
    instruction: &Instruction,
    labels: &BTreeMap<String, u32>,
) -> Result<InstructionBits, AsmError> {
    let determinant = determinant(instruction.mnemonic.name);
    let span = instruction.span;
    let mut bits = InstructionBits::new();
    bits.set_opcode(determinant.opcode, span)?;

    match &instruction.operands {
        // I-type packing never includes funct7, so `srai` assembles to the
        // same word as `srli`.
        Operands::Itype { rd, rs1, imm12 } => {
            bits.set_funct3(determinant.funct3, span)?;
            bits.set_rd(*rd, span)?;
            bits.set_rs1(*rs1, span)?;
            bits.set_imm12(i64::from(*imm12), span)?;
        }
        Operands::Rtype { rd, rs1, rs2 } => {
            bits.set_funct3(determinant.funct3, span)?;
            bits.set_funct7(determinant.funct7, span)?;
            bits.set_rd(*rd, span)?;
            bits.set_rs1(*rs1, span)?;
            bits.set_rs2(*rs2, span)?;
        }
        Operands::Stype { rs1, rs2, imm12 } => {
            bits.set_funct3(determinant.funct3, span)?;
            bits.set_rs1(*rs1, span)?;
            bits.set_rs2(*rs2, span)?;
            bits.set_imm12_split(i64::from(*imm12), span)?;
        }
        Operands::Utype { rd, imm20 } => {
            bits.set_rd(*rd, span)?;
            bits.set_imm20(i64::from(*imm20), span)?;
        }
        Operands::Jtype { rd, imm20 } => {
            bits.set_rd(*rd, span)?;
            bits.set_imm21(i64::from(*imm20), span)?;
        }
        Operands::Jalr { rd, rs1, target } => {
            bits.set_funct3(determinant.funct3, span)?;
            bits.set_rd(*rd, span)?;
            bits.set_rs1(*rs1, span)?;
            let offset = match target {
                JalrTarget::Immediate(value) => i64::from(*value),
                JalrTarget::Label(name) => match labels.get(name) {
                    Some(&address) => i64::from(address),
                    None => {
                        return Err(AsmError::UndefinedLabel {
                            label: name.clone(),
                            span,
                        });
                    }
                },
            };
            bits.set_imm12(offset, span)?;
        }
    }

    if instruction.mnemonic.is_scalar() {
        bits.make_scalar();
    }
    Ok(bits)
}

/// Encode a whole program into one 32-bit word per instruction, in program
/// order.
///
/// Encoding is all-or-nothing but reporting is exhaustive: every failing
/// instruction contributes an error before the call returns.
///
/// # Errors
///
/// Returns the sole failure, or [`AsmError::Multiple`] when several
/// instructions fail.
///
/// ```
/// use warp_asm::encoder::encode;
/// use warp_asm::ir::{Line, Program};
/// use warp_asm::lexer::tokenize;
/// use warp_asm::parser::parse_line;
///
/// let (tokens, _) = tokenize("addi x5, x5, 87");
/// let Ok(Line::Instruction(instruction)) = parse_line(&tokens) else {
///     unreachable!()
/// };
/// let program = Program {
///     blocks: 1,
///     warps: 1,
///     instructions: vec![instruction],
///     label_table: Default::default(),
/// };
/// assert_eq!(encode(&program).unwrap(), vec![0x0572_8293]);
/// ```
pub fn encode(program: &Program) -> Result<Vec<u32>, AsmError> {
    let mut words = Vec::with_capacity(program.instructions.len());
    let mut errors = Vec::new();
    for instruction in &program.instructions {
        match encode_instruction(instruction, &program.label_table) {
            Ok(bits) => words.push(bits.word()),
            Err(error) => errors.push(error),
        }
    }
    match AsmError::from_errors(errors) {
        None => Ok(words),
        Some(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Line;
    use crate::lexer::tokenize;
    use crate::parser::parse_line;
    use alloc::vec;

    fn instruction(line: &str) -> Instruction {
        let (tokens, lex_errors) = tokenize(line);
        assert!(lex_errors.is_empty(), "lex errors: {:?}", lex_errors);
        match parse_line(&tokens) {
            Ok(Line::Instruction(instruction)) => instruction,
            other => panic!("expected instruction, got {:?}", other),
        }
    }

    fn word_of(line: &str) -> u32 {
        encode_instruction(&instruction(line), &BTreeMap::new())
            .unwrap()
            .word()
    }

    fn error_of(line: &str) -> AsmError {
        encode_instruction(&instruction(line), &BTreeMap::new()).unwrap_err()
    }

    #[test]
    fn determinants() {
        assert_eq!(
            determinant(MnemonicName::Addi),
            det(opcode::ITYPE, 0b000, 0)
        );
        assert_eq!(
            determinant(MnemonicName::Srai),
            det(opcode::ITYPE, 0b101, 0b0100000)
        );
        assert_eq!(
            determinant(MnemonicName::SxSlt),
            det(opcode::SX_SLT, 0b010, 0)
        );
        assert_eq!(determinant(MnemonicName::Jal), det(opcode::JTYPE, 0, 0));
        assert_eq!(determinant(MnemonicName::Halt), det(opcode::HALT, 0, 0));
    }

    #[test]
    fn scalar_opcode_predicates() {
        assert!(opcode::is_vector(opcode::ITYPE));
        assert!(opcode::is_scalar(opcode::JTYPE));
        assert!(opcode::is_scalar(opcode::to_scalar(opcode::ITYPE)));
    }

    #[test]
    fn itype_word() {
        assert_eq!(word_of("addi x5, x5, 87"), 0x0572_8293);
    }

    #[test]
    fn negative_immediates_truncate() {
        assert_eq!(word_of("addi x1, x1, -1"), 0xFFF0_8093);
        assert_eq!(word_of("lw x1, -4(x2)"), 0xFFC1_2083);
    }

    #[test]
    fn scalar_prefix_sets_bit_six() {
        assert_eq!(word_of("s.addi s1, s1, 1"), 0x0010_80D3);
        assert_eq!(word_of("s.lui s1, 1"), 0x0000_10F7);
    }

    #[test]
    fn halt_is_bare_opcode() {
        assert_eq!(word_of("halt"), 0x0000_007F);
    }

    #[test]
    fn rtype_words() {
        assert_eq!(word_of("add x1, x2, x3"), 0x0031_00B3);
        assert_eq!(word_of("sub x1, x2, x3"), 0x4031_00B3);
        assert_eq!(word_of("sra x1, x2, x3"), 0x4031_50B3);
    }

    #[test]
    fn itype_shifts_drop_funct7() {
        assert_eq!(word_of("srli x1, x2, 3"), 0x0031_5093);
        assert_eq!(word_of("srai x1, x2, 3"), word_of("srli x1, x2, 3"));
    }

    #[test]
    fn store_splits_the_immediate() {
        assert_eq!(word_of("sw x1, 8(x2)"), 0x0011_2423);
        assert_eq!(word_of("sw x1, -4(x2)"), 0xFE11_2E23);
    }

    #[test]
    fn utype_word() {
        assert_eq!(word_of("lui x1, 4096"), 0x0100_00B7);
    }

    #[test]
    fn jal_scrambles_the_offset() {
        assert_eq!(word_of("jal x1, 2048"), 0x0010_00EF);
        assert_eq!(word_of("jal x0, -2"), 0xFFFF_F06F);
    }

    #[test]
    fn jal_discards_offset_bit_zero() {
        assert_eq!(word_of("jal x0, 3"), word_of("jal x0, 2"));
        assert_eq!(word_of("jal x0, 2"), 0x0020_006F);
    }

    #[test]
    fn jalr_offset_word() {
        assert_eq!(word_of("jalr x1, 8(x2)"), 0x0081_00E7);
    }

    #[test]
    fn jalr_resolves_labels() {
        let mut labels = BTreeMap::new();
        labels.insert("mylabel".to_string(), 3);
        let bits = encode_instruction(&instruction("jalr x1, mylabel"), &labels).unwrap();
        assert_eq!(bits.word(), 0x0030_00E7);
    }

    #[test]
    fn jalr_unknown_label_is_an_error() {
        let error = error_of("jalr x1, mylabel");
        assert_eq!(error.to_string(), "0:1: undefined label 'mylabel'");
    }

    #[test]
    fn sx_words() {
        assert_eq!(word_of("sx.slt s0, x1, x2"), 0x0020_A07E);
        assert_eq!(word_of("sx.slti s1, x2, 7"), 0x0071_20FD);
    }

    #[test]
    fn imm12_range() {
        assert_eq!(word_of("addi x0, x0, 4095") >> 20, 0xFFF);
        assert_eq!(word_of("addi x0, x0, -2048") >> 20, 0x800);

        assert_eq!(
            error_of("addi x0, x0, 4096").to_string(),
            "0:1: immediate value 4096 out of range [-2048..4095]"
        );
        assert_eq!(
            error_of("addi x0, x0, -2049").to_string(),
            "0:1: immediate value -2049 out of range [-2048..4095]"
        );
    }

    #[test]
    fn imm20_range() {
        assert_eq!(word_of("lui x0, 1048575") >> 12, 0xF_FFFF);
        assert_eq!(word_of("lui x0, -524288") >> 12, 0x8_0000);
        assert_eq!(
            error_of("lui x0, -524289").to_string(),
            "0:1: immediate value -524289 out of range [-524288..1048575]"
        );
    }

    #[test]
    fn register_index_checked_at_encode_time() {
        let mut bits = InstructionBits::new();
        let error = bits.set_rd(Register::vector(33), Span::dummy()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "0:0: register 'x33' out of range (valid indices 0-31)"
        );
    }

    #[test]
    fn illegal_field_codes_rejected() {
        let mut bits = InstructionBits::new();
        let error = bits.set_funct3(0b011, Span::dummy()).unwrap_err();
        assert_eq!(error.to_string(), "0:0: illegal funct3 value 0b11");

        let error = bits.set_funct7(0b1, Span::dummy()).unwrap_err();
        assert_eq!(error.to_string(), "0:0: illegal funct7 value 0b1");

        let error = bits.set_opcode(0b1010101, Span::dummy()).unwrap_err();
        assert_eq!(error.to_string(), "0:0: illegal opcode value 0b1010101");
    }

    #[test]
    fn getters_invert_setters() {
        let bits = InstructionBits::from(0x0572_8293);
        assert_eq!(bits.opcode(), 0x13);
        assert_eq!(bits.rd(), 5);
        assert_eq!(bits.funct3(), 0);
        assert_eq!(bits.rs1(), 5);
        assert_eq!(bits.imm12(), 87);
        assert!(!bits.is_scalar());

        let mut bits = bits;
        bits.make_scalar();
        assert!(bits.is_scalar());
        bits.make_vector();
        assert!(!bits.is_scalar());
    }

    #[test]
    fn encode_collects_every_failure() {
        let program = Program {
            blocks: 1,
            warps: 1,
            instructions: vec![
                instruction("addi x1, x1, 1"),
                instruction("addi x1, x1, 9999"),
                instruction("jalr x1, nowhere"),
            ],
            label_table: BTreeMap::new(),
        };
        match encode(&program).unwrap_err() {
            AsmError::Multiple { errors } => assert_eq!(errors.len(), 2),
            other => panic!("expected Multiple, got {:?}", other),
        }
    }

    #[test]
    fn encode_preserves_program_order() {
        let program = Program {
            blocks: 1,
            warps: 1,
            instructions: vec![
                instruction("addi x5, x5, 87"),
                instruction("halt"),
            ],
            label_table: BTreeMap::new(),
        };
        assert_eq!(encode(&program).unwrap(), vec![0x0572_8293, 0x0000_007F]);
    }
}
