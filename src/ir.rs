//! Intermediate representation for the assembly pipeline.
//!
//! These types are the structured output of the parser and serve as input to
//! the encoder: registers, the mnemonic catalog, operand shapes, parsed
//! lines, and the assembled [`Program`].

use alloc::collections::BTreeMap;
#[allow(unused_imports)]
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::error::Span;

// ─── Registers ──────────────────────────────────────────────────────

/// Register class: per-lane vector state or per-warp scalar state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegisterClass {
    /// Vector registers `x0`-`x31`, one value per lane.
    Vector,
    /// Scalar registers `s0`-`s31`, one value per warp.
    Scalar,
}

impl fmt::Display for RegisterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterClass::Vector => write!(f, "vector"),
            RegisterClass::Scalar => write!(f, "scalar"),
        }
    }
}

/// A register operand.
///
/// The index is not range-checked at construction: malformed input must
/// surface as a reported encode error, not an unrepresentable state. The
/// encoder rejects indices ≥ 32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Register {
    /// Register index within its class.
    pub index: u32,
    /// Vector (`x`) or scalar (`s`) class.
    pub class: RegisterClass,
}

impl Register {
    /// A vector register `x<index>`.
    #[must_use]
    pub fn vector(index: u32) -> Self {
        Self {
            index,
            class: RegisterClass::Vector,
        }
    }

    /// A scalar register `s<index>`.
    #[must_use]
    pub fn scalar(index: u32) -> Self {
        Self {
            index,
            class: RegisterClass::Scalar,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.class {
            RegisterClass::Vector => write!(f, "x{}", self.index),
            RegisterClass::Scalar => write!(f, "s{}", self.index),
        }
    }
}

// ─── Mnemonics ──────────────────────────────────────────────────────

/// The instruction catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MnemonicName {
    // -- U-type --
    /// Load upper immediate.
    Lui,
    /// Add upper immediate to PC.
    Auipc,
    // -- I-type arithmetic --
    /// Add immediate.
    Addi,
    /// Set if less than immediate.
    Slti,
    /// Xor immediate.
    Xori,
    /// Or immediate.
    Ori,
    /// And immediate.
    Andi,
    /// Shift left logical immediate.
    Slli,
    /// Shift right logical immediate.
    Srli,
    /// Shift right arithmetic immediate.
    Srai,
    // -- R-type --
    /// Add.
    Add,
    /// Subtract.
    Sub,
    /// Shift left logical.
    Sll,
    /// Set if less than.
    Slt,
    /// Xor.
    Xor,
    /// Shift right logical.
    Srl,
    /// Shift right arithmetic.
    Sra,
    /// Or.
    Or,
    /// And.
    And,
    // -- Loads --
    /// Load byte.
    Lb,
    /// Load half-word.
    Lh,
    /// Load word.
    Lw,
    // -- Stores --
    /// Store byte.
    Sb,
    /// Store half-word.
    Sh,
    /// Store word.
    Sw,
    // -- Jumps --
    /// Jump and link.
    Jal,
    /// Jump and link register.
    Jalr,
    // -- Branches --
    /// Branch if equal.
    Beq,
    /// Branch if not equal.
    Bne,
    /// Branch if less than.
    Blt,
    /// Branch if greater or equal.
    Bge,
    // -- Custom --
    /// Stop the executing warp.
    Halt,
    /// Set scalar if vector less than vector.
    SxSlt,
    /// Set scalar if vector less than immediate.
    SxSlti,
}

impl MnemonicName {
    /// Look up a catalog name by its textual form (without any `s.` prefix).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "lui" => MnemonicName::Lui,
            "auipc" => MnemonicName::Auipc,
            "addi" => MnemonicName::Addi,
            "slti" => MnemonicName::Slti,
            "xori" => MnemonicName::Xori,
            "ori" => MnemonicName::Ori,
            "andi" => MnemonicName::Andi,
            "slli" => MnemonicName::Slli,
            "srli" => MnemonicName::Srli,
            "srai" => MnemonicName::Srai,
            "add" => MnemonicName::Add,
            "sub" => MnemonicName::Sub,
            "sll" => MnemonicName::Sll,
            "slt" => MnemonicName::Slt,
            "xor" => MnemonicName::Xor,
            "srl" => MnemonicName::Srl,
            "sra" => MnemonicName::Sra,
            "or" => MnemonicName::Or,
            "and" => MnemonicName::And,
            "lb" => MnemonicName::Lb,
            "lh" => MnemonicName::Lh,
            "lw" => MnemonicName::Lw,
            "sb" => MnemonicName::Sb,
            "sh" => MnemonicName::Sh,
            "sw" => MnemonicName::Sw,
            "jal" => MnemonicName::Jal,
            "jalr" => MnemonicName::Jalr,
            "beq" => MnemonicName::Beq,
            "bne" => MnemonicName::Bne,
            "blt" => MnemonicName::Blt,
            "bge" => MnemonicName::Bge,
            "halt" => MnemonicName::Halt,
            "sx.slt" => MnemonicName::SxSlt,
            "sx.slti" => MnemonicName::SxSlti,
            _ => return None,
        })
    }

    /// The textual form of the name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MnemonicName::Lui => "lui",
            MnemonicName::Auipc => "auipc",
            MnemonicName::Addi => "addi",
            MnemonicName::Slti => "slti",
            MnemonicName::Xori => "xori",
            MnemonicName::Ori => "ori",
            MnemonicName::Andi => "andi",
            MnemonicName::Slli => "slli",
            MnemonicName::Srli => "srli",
            MnemonicName::Srai => "srai",
            MnemonicName::Add => "add",
            MnemonicName::Sub => "sub",
            MnemonicName::Sll => "sll",
            MnemonicName::Slt => "slt",
            MnemonicName::Xor => "xor",
            MnemonicName::Srl => "srl",
            MnemonicName::Sra => "sra",
            MnemonicName::Or => "or",
            MnemonicName::And => "and",
            MnemonicName::Lb => "lb",
            MnemonicName::Lh => "lh",
            MnemonicName::Lw => "lw",
            MnemonicName::Sb => "sb",
            MnemonicName::Sh => "sh",
            MnemonicName::Sw => "sw",
            MnemonicName::Jal => "jal",
            MnemonicName::Jalr => "jalr",
            MnemonicName::Beq => "beq",
            MnemonicName::Bne => "bne",
            MnemonicName::Blt => "blt",
            MnemonicName::Bge => "bge",
            MnemonicName::Halt => "halt",
            MnemonicName::SxSlt => "sx.slt",
            MnemonicName::SxSlti => "sx.slti",
        }
    }

    /// I-type ALU shape: `rd, rs1, imm12`.
    #[must_use]
    pub fn is_itype_arithmetic(self) -> bool {
        matches!(
            self,
            MnemonicName::Addi
                | MnemonicName::Slti
                | MnemonicName::Xori
                | MnemonicName::Ori
                | MnemonicName::Andi
                | MnemonicName::Slli
                | MnemonicName::Srli
                | MnemonicName::Srai
                | MnemonicName::SxSlti
        )
    }

    /// R-type shape: `rd, rs1, rs2`.
    #[must_use]
    pub fn is_rtype(self) -> bool {
        matches!(
            self,
            MnemonicName::Add
                | MnemonicName::Sub
                | MnemonicName::Sll
                | MnemonicName::Slt
                | MnemonicName::Xor
                | MnemonicName::Srl
                | MnemonicName::Sra
                | MnemonicName::Or
                | MnemonicName::And
                | MnemonicName::SxSlt
        )
    }

    /// Load shape: `rd, imm12(rs1)`.
    #[must_use]
    pub fn is_load(self) -> bool {
        matches!(self, MnemonicName::Lb | MnemonicName::Lh | MnemonicName::Lw)
    }

    /// Store shape: `rs2, imm12(rs1)`.
    #[must_use]
    pub fn is_store(self) -> bool {
        matches!(self, MnemonicName::Sb | MnemonicName::Sh | MnemonicName::Sw)
    }

    /// U-type shape: `rd, imm20`.
    #[must_use]
    pub fn is_utype(self) -> bool {
        matches!(self, MnemonicName::Lui | MnemonicName::Auipc)
    }

    /// Conditional branch.
    #[must_use]
    pub fn is_branch(self) -> bool {
        matches!(
            self,
            MnemonicName::Beq | MnemonicName::Bne | MnemonicName::Blt | MnemonicName::Bge
        )
    }

    /// Unconditional jump.
    #[must_use]
    pub fn is_jump(self) -> bool {
        matches!(self, MnemonicName::Jal | MnemonicName::Jalr)
    }

    /// Mixed-class compare: scalar destination, vector sources.
    #[must_use]
    pub fn is_vector_scalar(self) -> bool {
        matches!(self, MnemonicName::SxSlt | MnemonicName::SxSlti)
    }
}

impl fmt::Display for MnemonicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mnemonic as written in the source: a catalog name plus an optional `s.`
/// prefix requesting the scalar encoding.
///
/// Equality compares the name and the *effective* scalar class, so `jal` and
/// `s.jal` are equal (jumps are scalar either way) while `addi` and `s.addi`
/// are not.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mnemonic {
    /// Catalog name.
    pub name: MnemonicName,
    /// Whether the source spelled an explicit `s.` prefix.
    pub has_s_prefix: bool,
}

impl Mnemonic {
    /// An unprefixed mnemonic.
    #[must_use]
    pub fn new(name: MnemonicName) -> Self {
        Self {
            name,
            has_s_prefix: false,
        }
    }

    /// An `s.`-prefixed mnemonic.
    #[must_use]
    pub fn prefixed(name: MnemonicName) -> Self {
        Self {
            name,
            has_s_prefix: true,
        }
    }

    /// Parse a source keyword, stripping an optional `s.` prefix.
    ///
    /// # Examples
    ///
    /// ```
    /// use warp_asm::ir::{Mnemonic, MnemonicName};
    ///
    /// let m = Mnemonic::parse("s.addi").unwrap();
    /// assert_eq!(m.name, MnemonicName::Addi);
    /// assert!(m.is_scalar());
    /// assert!(Mnemonic::parse("nop").is_none());
    /// ```
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text.strip_prefix("s.") {
            Some(rest) => Some(Self::prefixed(MnemonicName::parse(rest)?)),
            None => Some(Self::new(MnemonicName::parse(text)?)),
        }
    }

    /// Whether this mnemonic encodes with the scalar discriminator bit set.
    ///
    /// True for explicit `s.` prefixes, for the intrinsically
    /// scalar-destination `sx.*` compares, and for branches and jumps (which
    /// only exist in scalar form).
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.has_s_prefix
            || self.name.is_vector_scalar()
            || self.name.is_branch()
            || self.name.is_jump()
    }

    /// The register class this mnemonic's plain operands must have.
    #[must_use]
    pub fn register_class(&self) -> RegisterClass {
        if self.is_scalar() {
            RegisterClass::Scalar
        } else {
            RegisterClass::Vector
        }
    }
}

impl PartialEq for Mnemonic {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.is_scalar() == other.is_scalar()
    }
}

impl Eq for Mnemonic {}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_s_prefix {
            write!(f, "s.{}", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

// ─── Operands & instructions ────────────────────────────────────────

/// Jump target of a `jalr`: a literal offset or a label resolved against the
/// program's label table at encode time.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JalrTarget {
    /// Literal offset added to `rs1`.
    Immediate(i32),
    /// Label whose instruction address becomes the immediate (`rs1` is `x0`).
    Label(String),
}

/// Operand payload, keyed by instruction shape.
///
/// Loads share [`Operands::Itype`] with the ALU immediates; only their
/// surface syntax differs. `halt` carries a zeroed `Itype`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operands {
    /// `rd, rs1, imm12` (ALU) or `rd, imm12(rs1)` (loads).
    Itype {
        /// Destination register.
        rd: Register,
        /// First source register.
        rs1: Register,
        /// 12-bit immediate.
        imm12: i32,
    },
    /// `rd, rs1, rs2`.
    Rtype {
        /// Destination register.
        rd: Register,
        /// First source register.
        rs1: Register,
        /// Second source register.
        rs2: Register,
    },
    /// `rs2, imm12(rs1)` (stores).
    Stype {
        /// Base address register.
        rs1: Register,
        /// Source register holding the stored value.
        rs2: Register,
        /// 12-bit address offset.
        imm12: i32,
    },
    /// `rd, imm20` (`lui`/`auipc`).
    Utype {
        /// Destination register.
        rd: Register,
        /// 20-bit immediate.
        imm20: i32,
    },
    /// `rd, imm` (`jal`); validated against the 21-bit scrambled field at
    /// encode time.
    Jtype {
        /// Link register.
        rd: Register,
        /// Jump offset.
        imm20: i32,
    },
    /// `rd, label` or `rd, imm12(rs1)` (`jalr`).
    Jalr {
        /// Link register.
        rd: Register,
        /// Base register (`x0` for the label form).
        rs1: Register,
        /// Literal offset or label reference.
        target: JalrTarget,
    },
}

/// A label definition, standing alone or attached to an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LabelDef {
    /// Label name, without the trailing `:`.
    pub name: String,
    /// Source location of the definition.
    pub span: Span,
}

/// A parsed instruction before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instruction {
    /// Label attached on the same line, if any.
    pub label: Option<LabelDef>,
    /// The instruction mnemonic.
    pub mnemonic: Mnemonic,
    /// Shape-specific operands.
    pub operands: Operands,
    /// Source location of the mnemonic.
    pub span: Span,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.label {
            write!(f, "{}: ", label.name)?;
        }
        if self.mnemonic.name == MnemonicName::Halt {
            return write!(f, "{}", self.mnemonic);
        }
        write!(f, "{} ", self.mnemonic)?;
        match &self.operands {
            Operands::Itype { rd, rs1, imm12 } => {
                if self.mnemonic.name.is_load() {
                    write!(f, "{}, {}({})", rd, imm12, rs1)
                } else {
                    write!(f, "{}, {}, {}", rd, rs1, imm12)
                }
            }
            Operands::Rtype { rd, rs1, rs2 } => write!(f, "{}, {}, {}", rd, rs1, rs2),
            Operands::Stype { rs1, rs2, imm12 } => write!(f, "{}, {}({})", rs2, imm12, rs1),
            Operands::Utype { rd, imm20 } | Operands::Jtype { rd, imm20 } => {
                write!(f, "{}, {}", rd, imm20)
            }
            Operands::Jalr { rd, rs1, target } => match target {
                JalrTarget::Label(name) => write!(f, "{}, {}", rd, name),
                JalrTarget::Immediate(imm) => write!(f, "{}, {}({})", rd, imm, rs1),
            },
        }
    }
}

// ─── Lines & programs ───────────────────────────────────────────────

/// One parsed source line.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Line {
    /// A label on a line of its own.
    Label(LabelDef),
    /// A `.blocks` directive.
    Blocks(u32, Span),
    /// A `.warps` directive.
    Warps(u32, Span),
    /// An instruction (possibly with an attached label).
    Instruction(Instruction),
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Label(def) => write!(f, "{}:", def.name),
            Line::Blocks(count, _) => write!(f, ".blocks {}", count),
            Line::Warps(count, _) => write!(f, ".warps {}", count),
            Line::Instruction(instr) => write!(f, "{}", instr),
        }
    }
}

/// A fully assembled program: kernel dimensions, the instruction list, and
/// the resolved label table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Program {
    /// Number of blocks in the kernel grid (defaults to 1).
    pub blocks: u32,
    /// Number of warps per block (defaults to 1).
    pub warps: u32,
    /// Instructions in program order.
    pub instructions: Vec<Instruction>,
    /// Label name → 0-based instruction index.
    pub label_table: BTreeMap<String, u32>,
}

impl Program {
    /// Look up the instruction index a label resolves to.
    #[must_use]
    pub fn address_of(&self, label: &str) -> Option<u32> {
        self.label_table.get(label).copied()
    }
}
