//! Fluent instruction emission with live stack-depth tracking.
//!
//! The [`InstructionAssembler`] builds a [`Snippet`] — an ordered vector of
//! labeled instructions plus the stack peak the sequence reaches. Stack depth
//! is tracked per instruction as it is emitted: opcodes with a fixed effect
//! contribute automatically, while the call family takes explicit pop/push
//! counts derived from the callee signature.
//!
//! Forward branches inside a sequence use deferred labels: [`defer_label`]
//! allocates a label up front, [`bind`] attaches it to the next emitted
//! instruction, and [`finish`] refuses to produce a snippet while any
//! deferred label is still unbound. Branches may also target labels outside
//! the sequence (the splice site validates those).
//!
//! [`defer_label`]: InstructionAssembler::defer_label
//! [`bind`]: InstructionAssembler::bind
//! [`finish`]: InstructionAssembler::finish

use std::collections::HashSet;

use crate::assembly::instruction::{Instruction, Operand, StackBehavior};
use crate::assembly::opcode::OpCode;
use crate::metadata::token::Token;
use crate::Result;

/// An assembled instruction sequence, ready to splice into a method body.
#[derive(Debug, Clone)]
pub struct Snippet {
    /// The instructions, in execution order
    pub instructions: Vec<Instruction>,
    /// The greatest stack depth the sequence reaches, counted from the
    /// depth the assembler was started at
    pub stack_peak: u16,
    /// The first label value not used by this snippet
    pub(crate) next_label: u32,
}

impl Snippet {
    /// Number of instructions in the snippet.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// True when the snippet contains no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Emits CIL instructions one at a time, assigning labels and tracking the
/// evaluation-stack depth.
///
/// # Examples
///
/// ```rust
/// use dotweave::assembly::InstructionAssembler;
///
/// let mut asm = InstructionAssembler::new();
/// asm.ldarg(0)?.ldc_i4(1)?;
/// let snippet = asm.finish()?;
/// assert_eq!(snippet.len(), 2);
/// assert_eq!(snippet.stack_peak, 2);
/// # Ok::<(), dotweave::Error>(())
/// ```
#[derive(Debug)]
pub struct InstructionAssembler {
    instructions: Vec<Instruction>,
    next_label: u32,
    pending: Option<u32>,
    unbound: HashSet<u32>,
    depth: i32,
    peak: i32,
}

impl InstructionAssembler {
    /// Creates an assembler labeling instructions from 0, starting at stack
    /// depth 0.
    #[must_use]
    pub fn new() -> Self {
        InstructionAssembler::with_label_base(0)
    }

    /// Creates an assembler whose labels start at `base`. Splices into an
    /// existing body must start past the body's label watermark so labels
    /// stay body-unique.
    #[must_use]
    pub fn with_label_base(base: u32) -> Self {
        InstructionAssembler {
            instructions: Vec::new(),
            next_label: base,
            pending: None,
            unbound: HashSet::new(),
            depth: 0,
            peak: 0,
        }
    }

    /// Declares the stack depth at the point this sequence will execute.
    /// Sequences spliced mid-stream (after a value-producing instruction)
    /// start above depth zero.
    #[must_use]
    pub fn at_depth(mut self, depth: u16) -> Self {
        self.depth = i32::from(depth);
        self.peak = i32::from(depth);
        self
    }

    /// Allocates a label to be bound to a later instruction, for forward
    /// branches within the sequence.
    pub fn defer_label(&mut self) -> u32 {
        let label = self.next_label;
        self.next_label += 1;
        self.unbound.insert(label);
        label
    }

    /// Attaches a deferred label to the next emitted instruction.
    ///
    /// # Errors
    /// Fails when the label was not allocated by [`Self::defer_label`], was
    /// already bound, or another label is already waiting to be attached.
    pub fn bind(&mut self, label: u32) -> Result<&mut Self> {
        if self.pending.is_some() {
            return Err(malformed_body!("a label is already pending"));
        }
        if !self.unbound.remove(&label) {
            return Err(malformed_body!("label {} is not an unbound deferred label", label));
        }
        self.pending = Some(label);
        Ok(self)
    }

    fn track(&mut self, behavior: StackBehavior) -> Result<()> {
        self.depth -= i32::from(behavior.pops);
        if self.depth < 0 {
            return Err(malformed_body!(
                "evaluation stack underflow while assembling (depth {})",
                self.depth
            ));
        }
        self.depth += i32::from(behavior.pushes);
        self.peak = self.peak.max(self.depth);
        Ok(())
    }

    fn emit(&mut self, opcode: OpCode, operand: Operand, behavior: StackBehavior) -> Result<&mut Self> {
        self.track(behavior)?;
        let label = match self.pending.take() {
            Some(label) => label,
            None => {
                let label = self.next_label;
                self.next_label += 1;
                label
            }
        };
        self.instructions.push(Instruction::new(label, opcode, operand));
        Ok(self)
    }

    fn emit_fixed(&mut self, opcode: OpCode, operand: Operand) -> Result<&mut Self> {
        // The opcodes routed here all declare a fixed stack behavior.
        let behavior = opcode
            .stack_behavior()
            .ok_or_else(|| malformed_body!("{} has no fixed stack behavior", opcode.mnemonic()))?;
        self.emit(opcode, operand, behavior)
    }

    /// Emits `nop`.
    pub fn nop(&mut self) -> Result<&mut Self> {
        self.emit_fixed(OpCode::Nop, Operand::None)
    }

    /// Emits the shortest `ldarg` form for the given argument index.
    pub fn ldarg(&mut self, index: u16) -> Result<&mut Self> {
        match index {
            0 => self.emit_fixed(OpCode::Ldarg0, Operand::None),
            1 => self.emit_fixed(OpCode::Ldarg1, Operand::None),
            2 => self.emit_fixed(OpCode::Ldarg2, Operand::None),
            3 => self.emit_fixed(OpCode::Ldarg3, Operand::None),
            _ => self.emit_fixed(OpCode::LdargS, Operand::Argument(index)),
        }
    }

    /// Emits the shortest `ldloc` form for the given local index.
    pub fn ldloc(&mut self, index: u16) -> Result<&mut Self> {
        match index {
            0 => self.emit_fixed(OpCode::Ldloc0, Operand::None),
            1 => self.emit_fixed(OpCode::Ldloc1, Operand::None),
            2 => self.emit_fixed(OpCode::Ldloc2, Operand::None),
            3 => self.emit_fixed(OpCode::Ldloc3, Operand::None),
            _ => self.emit_fixed(OpCode::LdlocS, Operand::Local(index)),
        }
    }

    /// Emits the shortest `stloc` form for the given local index.
    pub fn stloc(&mut self, index: u16) -> Result<&mut Self> {
        match index {
            0 => self.emit_fixed(OpCode::Stloc0, Operand::None),
            1 => self.emit_fixed(OpCode::Stloc1, Operand::None),
            2 => self.emit_fixed(OpCode::Stloc2, Operand::None),
            3 => self.emit_fixed(OpCode::Stloc3, Operand::None),
            _ => self.emit_fixed(OpCode::StlocS, Operand::Local(index)),
        }
    }

    /// Emits `ldnull`.
    pub fn ldnull(&mut self) -> Result<&mut Self> {
        self.emit_fixed(OpCode::Ldnull, Operand::None)
    }

    /// Emits the shortest `ldc.i4` form for the given constant.
    pub fn ldc_i4(&mut self, value: i32) -> Result<&mut Self> {
        match value {
            0 => self.emit_fixed(OpCode::LdcI40, Operand::None),
            1 => self.emit_fixed(OpCode::LdcI41, Operand::None),
            -128..=127 => self.emit_fixed(OpCode::LdcI4S, Operand::Immediate(value)),
            _ => self.emit_fixed(OpCode::LdcI4, Operand::Immediate(value)),
        }
    }

    /// Emits `dup`.
    pub fn dup(&mut self) -> Result<&mut Self> {
        self.emit_fixed(OpCode::Dup, Operand::None)
    }

    /// Emits `pop`.
    pub fn pop(&mut self) -> Result<&mut Self> {
        self.emit_fixed(OpCode::Pop, Operand::None)
    }

    /// Emits `ldstr` with a user-string token.
    pub fn ldstr(&mut self, token: Token) -> Result<&mut Self> {
        self.emit_fixed(OpCode::Ldstr, Operand::Token(token))
    }

    /// Emits `add`.
    pub fn add(&mut self) -> Result<&mut Self> {
        self.emit_fixed(OpCode::Add, Operand::None)
    }

    /// Emits `call`. `pops` counts every consumed slot including `this`;
    /// `pushes` is 1 for value-returning callees, 0 otherwise.
    pub fn call(&mut self, method: Token, pops: u8, pushes: u8) -> Result<&mut Self> {
        self.emit(OpCode::Call, Operand::Token(method), StackBehavior { pops, pushes })
    }

    /// Emits `callvirt`. Counts as for [`Self::call`].
    pub fn callvirt(&mut self, method: Token, pops: u8, pushes: u8) -> Result<&mut Self> {
        self.emit(
            OpCode::Callvirt,
            Operand::Token(method),
            StackBehavior { pops, pushes },
        )
    }

    /// Emits `newobj` for a constructor taking `args` declared arguments;
    /// pops the arguments and pushes the constructed object.
    pub fn newobj(&mut self, ctor: Token, args: u8) -> Result<&mut Self> {
        self.emit(
            OpCode::Newobj,
            Operand::Token(ctor),
            StackBehavior { pops: args, pushes: 1 },
        )
    }

    /// Emits `ldfld`.
    pub fn ldfld(&mut self, field: Token) -> Result<&mut Self> {
        self.emit_fixed(OpCode::Ldfld, Operand::Token(field))
    }

    /// Emits `stfld`.
    pub fn stfld(&mut self, field: Token) -> Result<&mut Self> {
        self.emit_fixed(OpCode::Stfld, Operand::Token(field))
    }

    /// Emits `ldftn`.
    pub fn ldftn(&mut self, method: Token) -> Result<&mut Self> {
        self.emit_fixed(OpCode::Ldftn, Operand::Token(method))
    }

    /// Emits `ret`. The stack is considered empty afterwards; whether the
    /// method returns a value is the signature's concern.
    pub fn ret(&mut self) -> Result<&mut Self> {
        self.emit(OpCode::Ret, Operand::None, StackBehavior { pops: 0, pushes: 0 })?;
        self.depth = 0;
        Ok(self)
    }

    /// Emits `br.s` to the given label.
    pub fn br(&mut self, target: u32) -> Result<&mut Self> {
        self.emit_fixed(OpCode::BrS, Operand::Target(target))
    }

    /// Emits `brfalse.s` to the given label.
    pub fn brfalse(&mut self, target: u32) -> Result<&mut Self> {
        self.emit_fixed(OpCode::BrfalseS, Operand::Target(target))
    }

    /// Emits `brtrue.s` to the given label.
    pub fn brtrue(&mut self, target: u32) -> Result<&mut Self> {
        self.emit_fixed(OpCode::BrtrueS, Operand::Target(target))
    }

    /// Emits `throw`. The stack is considered empty afterwards.
    pub fn throw(&mut self) -> Result<&mut Self> {
        self.emit(OpCode::Throw, Operand::None, StackBehavior { pops: 1, pushes: 0 })?;
        self.depth = 0;
        Ok(self)
    }

    /// Emits `leave.s` to the given label.
    pub fn leave(&mut self, target: u32) -> Result<&mut Self> {
        self.emit_fixed(OpCode::LeaveS, Operand::Target(target))
    }

    /// Emits `endfinally`.
    pub fn endfinally(&mut self) -> Result<&mut Self> {
        self.emit_fixed(OpCode::Endfinally, Operand::None)
    }

    /// Completes the sequence.
    ///
    /// # Errors
    /// Fails when a deferred label was never bound to an instruction.
    pub fn finish(self) -> Result<Snippet> {
        if self.pending.is_some() || !self.unbound.is_empty() {
            return Err(malformed_body!(
                "{} deferred label(s) were never bound",
                self.unbound.len() + usize::from(self.pending.is_some())
            ));
        }

        Ok(Snippet {
            instructions: self.instructions,
            stack_peak: u16::try_from(self.peak.max(0)).unwrap_or(u16::MAX),
            next_label: self.next_label,
        })
    }
}

impl Default for InstructionAssembler {
    fn default() -> Self {
        InstructionAssembler::new()
    }
}
