//! # warp-asm: Pure Rust Assembler for a SIMT Vector/Scalar ISA
//!
//! `warp-asm` is a pure Rust, zero-C-dependency runtime assembler that turns
//! human-readable kernel assembly into 32-bit machine-code words for a
//! RISC-V-flavoured SIMT core with separate vector (`x0`-`x31`) and scalar
//! (`s0`-`s31`) register files.
//!
//! ## Quick Start
//!
//! ```rust
//! use warp_asm::assemble_to_words;
//!
//! let words = assemble_to_words("addi x5, x5, 87\nhalt").unwrap();
//! assert_eq!(words, vec![0x0572_8293, 0x0000_007F]);
//! ```
//!
//! ## Features
//!
//! - **Pure Rust**: no C/C++ FFI, no system assembler at runtime.
//! - **SIMT-aware**: vector and scalar register files, `s.`-prefixed scalar
//!   instruction forms, `sx.slt`/`sx.slti` cross-file compares, and
//!   `.blocks`/`.warps` kernel launch directives.
//! - **Runtime text parsing**: assemble from strings at runtime, with labels
//!   resolved to instruction indices in a single pass.
//! - **`no_std` + `alloc`**: embeddable in firmware, kernels, WASM.
//! - **Exhaustive diagnostics**: one run reports every error in the source,
//!   each carrying a line/column span.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]
// ─── Pedantic lint policy ───────────────────────────────────────────
// An instruction encoder intentionally performs many narrowing and
// sign-changing casts between integer widths (i32→i64, i64→u32, u32→usize)
// and uses dense binary/hex literals (0b0110011, 0xFF000). The lints below
// are expected and acceptable in this context.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::cast_possible_wrap,
    clippy::unreadable_literal,
    clippy::match_same_arms,
    clippy::wildcard_imports,
    clippy::enum_glob_use,
    clippy::semicolon_if_nothing_returned,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args,
    clippy::doc_markdown,
    clippy::similar_names,
    clippy::too_many_lines,
    clippy::single_match_else,
    clippy::manual_let_else,
    clippy::redundant_else,
    clippy::missing_errors_doc,
    clippy::needless_continue
)]

extern crate alloc;

/// Program assembly driver: lines in, [`Program`] or machine words out.
pub mod assembler;
/// Bit-exact instruction-word encoder (opcode/funct/register/immediate fields).
pub mod encoder;
/// Error types and source-span diagnostics.
pub mod error;
/// Intermediate representation: registers, mnemonics, operands, programs.
pub mod ir;
/// Zero-copy lexer (tokenizer) with span tracking.
pub mod lexer;
/// Token-to-IR parser for one source line.
pub mod parser;

// Re-exports
pub use assembler::{assemble, assemble_lines, assemble_to_words};
pub use encoder::{determinant, encode, encode_instruction, Determinant, InstructionBits};
pub use error::{AsmError, Span};
pub use ir::{
    Instruction, JalrTarget, LabelDef, Line, Mnemonic, MnemonicName, Operands, Program, Register,
    RegisterClass,
};
pub use lexer::{tokenize, Lexer, Token, TokenKind};
pub use parser::parse_line;
