//! The CIL opcode subset the weaver synthesizes or carries through bodies.
//!
//! Each opcode knows its ECMA-335 encoding, mnemonic, control-flow behavior
//! and — where the effect is fixed by the opcode alone — its stack behavior.
//! The call family (`call`, `callvirt`, `newobj`) and `ret` depend on the
//! callee or method signature, so their stack behavior is `None` and the
//! assembler receives explicit counts instead.

use crate::assembly::instruction::{FlowType, StackBehavior};

/// A CIL operation, ECMA-335 III.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// Do nothing
    Nop,
    /// Load argument 0 (`this` for instance methods)
    Ldarg0,
    /// Load argument 1
    Ldarg1,
    /// Load argument 2
    Ldarg2,
    /// Load argument 3
    Ldarg3,
    /// Load argument by index (short form)
    LdargS,
    /// Load local variable 0
    Ldloc0,
    /// Load local variable 1
    Ldloc1,
    /// Load local variable 2
    Ldloc2,
    /// Load local variable 3
    Ldloc3,
    /// Load local variable by index (short form)
    LdlocS,
    /// Store local variable 0
    Stloc0,
    /// Store local variable 1
    Stloc1,
    /// Store local variable 2
    Stloc2,
    /// Store local variable 3
    Stloc3,
    /// Store local variable by index (short form)
    StlocS,
    /// Push a null reference
    Ldnull,
    /// Push the constant 0
    LdcI40,
    /// Push the constant 1
    LdcI41,
    /// Push an 8-bit constant (short form)
    LdcI4S,
    /// Push a 32-bit constant
    LdcI4,
    /// Duplicate the top of stack
    Dup,
    /// Discard the top of stack
    Pop,
    /// Call a method
    Call,
    /// Return from the current method
    Ret,
    /// Unconditional branch (short form)
    BrS,
    /// Branch when the top of stack is false/null/zero (short form)
    BrfalseS,
    /// Branch when the top of stack is true/non-null/non-zero (short form)
    BrtrueS,
    /// Unconditional branch
    Br,
    /// Branch when the top of stack is false/null/zero
    Brfalse,
    /// Branch when the top of stack is true/non-null/non-zero
    Brtrue,
    /// Add the two topmost values
    Add,
    /// Call a method with virtual dispatch
    Callvirt,
    /// Push a user-string reference
    Ldstr,
    /// Allocate an object and call its constructor
    Newobj,
    /// Load an instance field
    Ldfld,
    /// Store an instance field
    Stfld,
    /// Throw the exception on top of the stack
    Throw,
    /// Exit a protected region
    Leave,
    /// Exit a protected region (short form)
    LeaveS,
    /// End of a finally handler
    Endfinally,
    /// Push a pointer to a method
    Ldftn,
}

impl OpCode {
    /// The instruction mnemonic, as rendered by ildasm.
    #[must_use]
    pub const fn mnemonic(&self) -> &'static str {
        match self {
            OpCode::Nop => "nop",
            OpCode::Ldarg0 => "ldarg.0",
            OpCode::Ldarg1 => "ldarg.1",
            OpCode::Ldarg2 => "ldarg.2",
            OpCode::Ldarg3 => "ldarg.3",
            OpCode::LdargS => "ldarg.s",
            OpCode::Ldloc0 => "ldloc.0",
            OpCode::Ldloc1 => "ldloc.1",
            OpCode::Ldloc2 => "ldloc.2",
            OpCode::Ldloc3 => "ldloc.3",
            OpCode::LdlocS => "ldloc.s",
            OpCode::Stloc0 => "stloc.0",
            OpCode::Stloc1 => "stloc.1",
            OpCode::Stloc2 => "stloc.2",
            OpCode::Stloc3 => "stloc.3",
            OpCode::StlocS => "stloc.s",
            OpCode::Ldnull => "ldnull",
            OpCode::LdcI40 => "ldc.i4.0",
            OpCode::LdcI41 => "ldc.i4.1",
            OpCode::LdcI4S => "ldc.i4.s",
            OpCode::LdcI4 => "ldc.i4",
            OpCode::Dup => "dup",
            OpCode::Pop => "pop",
            OpCode::Call => "call",
            OpCode::Ret => "ret",
            OpCode::BrS => "br.s",
            OpCode::BrfalseS => "brfalse.s",
            OpCode::BrtrueS => "brtrue.s",
            OpCode::Br => "br",
            OpCode::Brfalse => "brfalse",
            OpCode::Brtrue => "brtrue",
            OpCode::Add => "add",
            OpCode::Callvirt => "callvirt",
            OpCode::Ldstr => "ldstr",
            OpCode::Newobj => "newobj",
            OpCode::Ldfld => "ldfld",
            OpCode::Stfld => "stfld",
            OpCode::Throw => "throw",
            OpCode::Leave => "leave",
            OpCode::LeaveS => "leave.s",
            OpCode::Endfinally => "endfinally",
            OpCode::Ldftn => "ldftn",
        }
    }

    /// The ECMA-335 encoding of this opcode as a `(prefix, code)` pair;
    /// the prefix is 0 for single-byte opcodes.
    #[must_use]
    pub const fn encoding(&self) -> (u8, u8) {
        match self {
            OpCode::Nop => (0, 0x00),
            OpCode::Ldarg0 => (0, 0x02),
            OpCode::Ldarg1 => (0, 0x03),
            OpCode::Ldarg2 => (0, 0x04),
            OpCode::Ldarg3 => (0, 0x05),
            OpCode::LdargS => (0, 0x0E),
            OpCode::Ldloc0 => (0, 0x06),
            OpCode::Ldloc1 => (0, 0x07),
            OpCode::Ldloc2 => (0, 0x08),
            OpCode::Ldloc3 => (0, 0x09),
            OpCode::LdlocS => (0, 0x11),
            OpCode::Stloc0 => (0, 0x0A),
            OpCode::Stloc1 => (0, 0x0B),
            OpCode::Stloc2 => (0, 0x0C),
            OpCode::Stloc3 => (0, 0x0D),
            OpCode::StlocS => (0, 0x13),
            OpCode::Ldnull => (0, 0x14),
            OpCode::LdcI40 => (0, 0x16),
            OpCode::LdcI41 => (0, 0x17),
            OpCode::LdcI4S => (0, 0x1F),
            OpCode::LdcI4 => (0, 0x20),
            OpCode::Dup => (0, 0x25),
            OpCode::Pop => (0, 0x26),
            OpCode::Call => (0, 0x28),
            OpCode::Ret => (0, 0x2A),
            OpCode::BrS => (0, 0x2B),
            OpCode::BrfalseS => (0, 0x2C),
            OpCode::BrtrueS => (0, 0x2D),
            OpCode::Br => (0, 0x38),
            OpCode::Brfalse => (0, 0x39),
            OpCode::Brtrue => (0, 0x3A),
            OpCode::Add => (0, 0x58),
            OpCode::Callvirt => (0, 0x6F),
            OpCode::Ldstr => (0, 0x72),
            OpCode::Newobj => (0, 0x73),
            OpCode::Ldfld => (0, 0x7B),
            OpCode::Stfld => (0, 0x7D),
            OpCode::Throw => (0, 0x7A),
            OpCode::Leave => (0, 0xDD),
            OpCode::LeaveS => (0, 0xDE),
            OpCode::Endfinally => (0, 0xDC),
            OpCode::Ldftn => (0xFE, 0x06),
        }
    }

    /// How this opcode affects control flow.
    #[must_use]
    pub const fn flow_type(&self) -> FlowType {
        match self {
            OpCode::Call | OpCode::Callvirt | OpCode::Newobj => FlowType::Call,
            OpCode::Ret => FlowType::Return,
            OpCode::Br | OpCode::BrS => FlowType::UnconditionalBranch,
            OpCode::Brfalse | OpCode::BrfalseS | OpCode::Brtrue | OpCode::BrtrueS => {
                FlowType::ConditionalBranch
            }
            OpCode::Throw => FlowType::Throw,
            OpCode::Leave | OpCode::LeaveS => FlowType::Leave,
            OpCode::Endfinally => FlowType::EndFinally,
            _ => FlowType::Sequential,
        }
    }

    /// The fixed stack behavior of this opcode, or `None` when the effect
    /// depends on a signature (the call family and `ret`).
    #[must_use]
    pub const fn stack_behavior(&self) -> Option<StackBehavior> {
        match self {
            OpCode::Nop | OpCode::Endfinally => Some(StackBehavior { pops: 0, pushes: 0 }),
            OpCode::Br | OpCode::BrS | OpCode::Leave | OpCode::LeaveS => {
                Some(StackBehavior { pops: 0, pushes: 0 })
            }
            OpCode::Ldarg0
            | OpCode::Ldarg1
            | OpCode::Ldarg2
            | OpCode::Ldarg3
            | OpCode::LdargS
            | OpCode::Ldloc0
            | OpCode::Ldloc1
            | OpCode::Ldloc2
            | OpCode::Ldloc3
            | OpCode::LdlocS
            | OpCode::Ldnull
            | OpCode::LdcI40
            | OpCode::LdcI41
            | OpCode::LdcI4S
            | OpCode::LdcI4
            | OpCode::Ldstr
            | OpCode::Ldftn => Some(StackBehavior { pops: 0, pushes: 1 }),
            OpCode::Stloc0
            | OpCode::Stloc1
            | OpCode::Stloc2
            | OpCode::Stloc3
            | OpCode::StlocS
            | OpCode::Pop
            | OpCode::Throw
            | OpCode::Brfalse
            | OpCode::BrfalseS
            | OpCode::Brtrue
            | OpCode::BrtrueS => Some(StackBehavior { pops: 1, pushes: 0 }),
            OpCode::Dup => Some(StackBehavior { pops: 1, pushes: 2 }),
            OpCode::Ldfld => Some(StackBehavior { pops: 1, pushes: 1 }),
            OpCode::Stfld => Some(StackBehavior { pops: 2, pushes: 0 }),
            OpCode::Add => Some(StackBehavior { pops: 2, pushes: 1 }),
            OpCode::Call | OpCode::Callvirt | OpCode::Newobj | OpCode::Ret => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[OpCode] = &[
        OpCode::Nop,
        OpCode::Ldarg0,
        OpCode::Ldarg1,
        OpCode::Ldarg2,
        OpCode::Ldarg3,
        OpCode::LdargS,
        OpCode::Ldloc0,
        OpCode::Ldloc1,
        OpCode::Ldloc2,
        OpCode::Ldloc3,
        OpCode::LdlocS,
        OpCode::Stloc0,
        OpCode::Stloc1,
        OpCode::Stloc2,
        OpCode::Stloc3,
        OpCode::StlocS,
        OpCode::Ldnull,
        OpCode::LdcI40,
        OpCode::LdcI41,
        OpCode::LdcI4S,
        OpCode::LdcI4,
        OpCode::Dup,
        OpCode::Pop,
        OpCode::Call,
        OpCode::Ret,
        OpCode::BrS,
        OpCode::BrfalseS,
        OpCode::BrtrueS,
        OpCode::Br,
        OpCode::Brfalse,
        OpCode::Brtrue,
        OpCode::Add,
        OpCode::Callvirt,
        OpCode::Ldstr,
        OpCode::Newobj,
        OpCode::Ldfld,
        OpCode::Stfld,
        OpCode::Throw,
        OpCode::Leave,
        OpCode::LeaveS,
        OpCode::Endfinally,
        OpCode::Ldftn,
    ];

    #[test]
    fn test_encodings_are_unique() {
        for (i, a) in ALL.iter().enumerate() {
            for b in &ALL[i + 1..] {
                assert_ne!(
                    a.encoding(),
                    b.encoding(),
                    "{} and {} share an encoding",
                    a.mnemonic(),
                    b.mnemonic()
                );
            }
        }
    }

    #[test]
    fn test_well_known_encodings() {
        assert_eq!(OpCode::Ldarg0.encoding(), (0, 0x02));
        assert_eq!(OpCode::LdcI41.encoding(), (0, 0x17));
        assert_eq!(OpCode::Stfld.encoding(), (0, 0x7D));
        assert_eq!(OpCode::BrfalseS.encoding(), (0, 0x2C));
        assert_eq!(OpCode::Newobj.encoding(), (0, 0x73));
        assert_eq!(OpCode::Throw.encoding(), (0, 0x7A));
        assert_eq!(OpCode::Ret.encoding(), (0, 0x2A));
        assert_eq!(OpCode::Ldftn.encoding(), (0xFE, 0x06));
    }

    #[test]
    fn test_flow_types() {
        assert_eq!(OpCode::Nop.flow_type(), FlowType::Sequential);
        assert_eq!(OpCode::Call.flow_type(), FlowType::Call);
        assert_eq!(OpCode::Ret.flow_type(), FlowType::Return);
        assert_eq!(OpCode::BrS.flow_type(), FlowType::UnconditionalBranch);
        assert_eq!(OpCode::BrfalseS.flow_type(), FlowType::ConditionalBranch);
        assert_eq!(OpCode::Throw.flow_type(), FlowType::Throw);
        assert_eq!(OpCode::LeaveS.flow_type(), FlowType::Leave);
        assert_eq!(OpCode::Endfinally.flow_type(), FlowType::EndFinally);
    }

    #[test]
    fn test_stack_behavior() {
        assert_eq!(
            OpCode::Ldarg0.stack_behavior(),
            Some(StackBehavior { pops: 0, pushes: 1 })
        );
        assert_eq!(
            OpCode::Stfld.stack_behavior(),
            Some(StackBehavior { pops: 2, pushes: 0 })
        );
        assert_eq!(
            OpCode::BrfalseS.stack_behavior(),
            Some(StackBehavior { pops: 1, pushes: 0 })
        );

        // Signature-dependent opcodes expose no fixed behavior.
        assert_eq!(OpCode::Call.stack_behavior(), None);
        assert_eq!(OpCode::Newobj.stack_behavior(), None);
        assert_eq!(OpCode::Ret.stack_behavior(), None);
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(OpCode::LdcI41.mnemonic(), "ldc.i4.1");
        assert_eq!(OpCode::Callvirt.mnemonic(), "callvirt");
        assert_eq!(OpCode::Ldftn.mnemonic(), "ldftn");
        for opcode in ALL {
            assert!(!opcode.mnemonic().is_empty());
        }
    }
}
