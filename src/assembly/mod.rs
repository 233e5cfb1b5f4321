//! CIL instruction streams: representation, assembly and synthesis.
//!
//! This module carries the instruction layer of the weaver:
//!
//! - [`OpCode`] / [`Instruction`] / [`Operand`] - the instruction model,
//!   label-addressed so splices never invalidate branch targets
//! - [`MethodBody`] - instruction streams with locals, exception-handler
//!   regions and the splice operations the weaver performs
//! - [`InstructionAssembler`] / [`Snippet`] - fluent emission with live
//!   stack-depth tracking
//! - [`synth`] - the canonical injected sequences (guards, state stores,
//!   getter bodies, continuation wiring)

mod assembler;
mod body;
mod instruction;
mod opcode;
pub mod synth;

pub use assembler::{InstructionAssembler, Snippet};
pub use body::{ExceptionHandler, ExceptionHandlerKind, LocalVariable, MethodBody};
pub use instruction::{FlowType, Instruction, Operand, StackBehavior};
pub use opcode::OpCode;
