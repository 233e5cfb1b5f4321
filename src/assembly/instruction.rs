//! CIL instruction representation for label-addressed instruction streams.
//!
//! Instructions in this model carry a body-unique *label* instead of a byte
//! offset: the weaver splices sequences into streams it never re-encodes, and
//! labels keep every existing branch target and exception-handler range valid
//! across a splice. Byte layout is recomputed by whatever writes the module
//! back out.

use std::fmt;

use crate::assembly::opcode::OpCode;
use crate::metadata::token::Token;

/// How an instruction affects control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowType {
    /// Normal execution continues to next instruction
    Sequential,
    /// Conditional branch to another location
    ConditionalBranch,
    /// Always branches to another location (unconditional jump)
    UnconditionalBranch,
    /// Call to another method
    Call,
    /// Returns from current method
    Return,
    /// Exception throwing
    Throw,
    /// End of finally block
    EndFinally,
    /// Leave protected region (try/catch/finally)
    Leave,
}

/// Stack effect of an instruction: how many slots it pops and pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackBehavior {
    /// Number of items popped from stack
    pub pops: u8,
    /// Number of items pushed to stack
    pub pushes: u8,
}

impl StackBehavior {
    /// Net effect on stack depth (pushes - pops).
    #[must_use]
    pub fn net_effect(&self) -> i16 {
        i16::from(self.pushes) - i16::from(self.pops)
    }
}

/// An instruction operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// No operand present
    None,
    /// Immediate value (constant embedded in instruction)
    Immediate(i32),
    /// Branch target: the label of another instruction in the same body
    Target(u32),
    /// Metadata token reference
    Token(Token),
    /// Local variable index
    Local(u16),
    /// Method argument index
    Argument(u16),
}

/// A CIL instruction: body-unique label, opcode and operand.
#[derive(Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Identity of this instruction within its method body; branch targets
    /// and handler ranges refer to labels, which never change once assigned
    pub label: u32,
    /// The operation
    pub opcode: OpCode,
    /// The operand data for this instruction
    pub operand: Operand,
}

impl Instruction {
    /// Creates an instruction.
    #[must_use]
    pub fn new(label: u32, opcode: OpCode, operand: Operand) -> Self {
        Instruction {
            label,
            opcode,
            operand,
        }
    }

    /// Check if this instruction is a branch instruction.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(
            self.opcode.flow_type(),
            FlowType::ConditionalBranch | FlowType::UnconditionalBranch | FlowType::Leave
        )
    }

    /// Check if this instruction is a terminal instruction (ends a basic block).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.opcode.flow_type(),
            FlowType::ConditionalBranch
                | FlowType::UnconditionalBranch
                | FlowType::Return
                | FlowType::Throw
                | FlowType::Leave
        )
    }

    /// The branch target label, when this instruction has one.
    #[must_use]
    pub fn target(&self) -> Option<u32> {
        match &self.operand {
            Operand::Target(label) => Some(*label),
            _ => None,
        }
    }

    /// The metadata token operand, when this instruction has one.
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        match &self.operand {
            Operand::Token(token) => Some(*token),
            _ => None,
        }
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Label - encoding - mnemonic
        let (prefix, code) = self.opcode.encoding();
        write!(f, "L{:04} - ", self.label)?;
        if prefix != 0 {
            write!(f, "{prefix:02X}:")?;
        }
        write!(f, "{:02X} - {:<12}", code, self.opcode.mnemonic())?;

        match &self.operand {
            Operand::None => {}
            Operand::Immediate(value) => write!(f, " {value}")?,
            Operand::Target(label) => write!(f, " -> L{label:04}")?,
            Operand::Token(token) => write!(f, " token:0x{:08X}", token.value())?,
            Operand::Local(index) => write!(f, " local:{index}")?,
            Operand::Argument(index) => write!(f, " arg:{index}")?,
        }

        if self.opcode.flow_type() != FlowType::Sequential {
            write!(f, " | {:?}", self.opcode.flow_type())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_branch() {
        let br = Instruction::new(0, OpCode::BrS, Operand::Target(4));
        assert!(br.is_branch());

        let brfalse = Instruction::new(1, OpCode::BrfalseS, Operand::Target(4));
        assert!(brfalse.is_branch());

        let leave = Instruction::new(2, OpCode::LeaveS, Operand::Target(4));
        assert!(leave.is_branch());

        let add = Instruction::new(3, OpCode::Add, Operand::None);
        assert!(!add.is_branch());

        let call = Instruction::new(4, OpCode::Call, Operand::Token(Token::new(0x0A000001)));
        assert!(!call.is_branch());
    }

    #[test]
    fn test_is_terminal() {
        let ret = Instruction::new(0, OpCode::Ret, Operand::None);
        assert!(ret.is_terminal());

        let throw = Instruction::new(1, OpCode::Throw, Operand::None);
        assert!(throw.is_terminal());

        let br = Instruction::new(2, OpCode::Br, Operand::Target(9));
        assert!(br.is_terminal());

        let nop = Instruction::new(3, OpCode::Nop, Operand::None);
        assert!(!nop.is_terminal());

        let call = Instruction::new(4, OpCode::Callvirt, Operand::Token(Token::new(0x0A000001)));
        assert!(!call.is_terminal());
    }

    #[test]
    fn test_operand_accessors() {
        let br = Instruction::new(0, OpCode::BrfalseS, Operand::Target(7));
        assert_eq!(br.target(), Some(7));
        assert_eq!(br.token(), None);

        let call = Instruction::new(1, OpCode::Call, Operand::Token(Token::new(0x06000002)));
        assert_eq!(call.token(), Some(Token::new(0x06000002)));
        assert_eq!(call.target(), None);
    }

    #[test]
    fn test_debug_format() {
        let instruction = Instruction::new(3, OpCode::BrfalseS, Operand::Target(12));
        let rendered = format!("{instruction:?}");
        assert!(rendered.contains("L0003"));
        assert!(rendered.contains("brfalse.s"));
        assert!(rendered.contains("-> L0012"));
        assert!(rendered.contains("ConditionalBranch"));

        let ldftn = Instruction::new(0, OpCode::Ldftn, Operand::Token(Token::new(0x06000003)));
        let rendered = format!("{ldftn:?}");
        assert!(rendered.contains("FE:06"), "ldftn is a two-byte opcode: {rendered}");
        assert!(rendered.contains("token:0x06000003"));
    }

    #[test]
    fn test_stack_behavior_net_effect() {
        let behavior = StackBehavior { pops: 2, pushes: 1 };
        assert_eq!(behavior.net_effect(), -1);

        let behavior = StackBehavior { pops: 0, pushes: 1 };
        assert_eq!(behavior.net_effect(), 1);
    }
}
