//! Method bodies: label-addressed instruction streams with locals and
//! exception-handler regions, and the splice operations the weaver performs
//! on them.

use crate::assembly::assembler::{InstructionAssembler, Snippet};
use crate::assembly::instruction::{Instruction, Operand};
use crate::assembly::opcode::OpCode;
use crate::metadata::signatures::TypeSignature;
use crate::metadata::token::Token;
use crate::Result;

/// A local variable slot.
#[derive(Debug, Clone)]
pub struct LocalVariable {
    /// Variable name, for diagnostics
    pub name: String,
    /// Variable type
    pub signature: TypeSignature,
}

impl LocalVariable {
    /// Creates a local variable slot.
    #[must_use]
    pub fn new(name: impl Into<String>, signature: TypeSignature) -> Self {
        LocalVariable {
            name: name.into(),
            signature,
        }
    }
}

/// The kind of an exception-handler region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionHandlerKind {
    /// Catch handler for a specific exception type
    Catch,
    /// Filter handler
    Filter,
    /// Finally handler
    Finally,
    /// Fault handler
    Fault,
}

/// An exception-handler region. Ranges are expressed as labels of the first
/// and last instruction they cover, inclusive, so entry splices leave them
/// untouched.
#[derive(Debug, Clone)]
pub struct ExceptionHandler {
    /// Handler kind
    pub kind: ExceptionHandlerKind,
    /// Label of the first instruction of the protected range
    pub try_start: u32,
    /// Label of the last instruction of the protected range
    pub try_end: u32,
    /// Label of the first instruction of the handler
    pub handler_start: u32,
    /// Label of the last instruction of the handler
    pub handler_end: u32,
    /// Caught exception type, for catch handlers
    pub catch_type: Option<Token>,
}

/// Describes one method body: stack requirements, local variables, the
/// instruction stream and exception-handler regions.
///
/// Every instruction carries a body-unique label; the body tracks a label
/// watermark so spliced-in sequences never collide with existing identities.
#[derive(Debug, Clone, Default)]
pub struct MethodBody {
    /// Maximum number of items on the operand stack
    pub max_stack: u16,
    /// Flag, indicating to zero-initialize all local variables
    pub init_locals: bool,
    /// Local variable slots
    pub locals: Vec<LocalVariable>,
    /// The instruction stream, in execution order
    pub instructions: Vec<Instruction>,
    /// Exception-handler regions of this body
    pub exception_handlers: Vec<ExceptionHandler>,
    next_label: u32,
}

impl MethodBody {
    /// Creates an empty body.
    #[must_use]
    pub fn new() -> Self {
        MethodBody {
            init_locals: true,
            ..MethodBody::default()
        }
    }

    /// Builds a body by running the given closure against a fresh assembler.
    ///
    /// # Errors
    /// Propagates assembly failures from the closure.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dotweave::assembly::MethodBody;
    ///
    /// let body = MethodBody::build(|asm| {
    ///     asm.ldarg(0)?.ret()?;
    ///     Ok(())
    /// })?;
    /// assert_eq!(body.instructions.len(), 2);
    /// # Ok::<(), dotweave::Error>(())
    /// ```
    pub fn build(f: impl FnOnce(&mut InstructionAssembler) -> Result<()>) -> Result<Self> {
        let mut asm = InstructionAssembler::new();
        f(&mut asm)?;
        let snippet = asm.finish()?;

        let mut body = MethodBody::new();
        body.max_stack = snippet.stack_peak;
        body.next_label = snippet.next_label;
        body.instructions = snippet.instructions;
        Ok(body)
    }

    /// Creates an assembler positioned past this body's label watermark, for
    /// building a sequence to splice into it.
    #[must_use]
    pub fn assembler(&self) -> InstructionAssembler {
        InstructionAssembler::with_label_base(self.next_label)
    }

    /// The label of the first instruction, when the body is not empty.
    #[must_use]
    pub fn entry_label(&self) -> Option<u32> {
        self.instructions.first().map(|i| i.label)
    }

    /// The position of the final `ret` instruction, when one exists.
    #[must_use]
    pub fn final_return(&self) -> Option<usize> {
        self.instructions
            .iter()
            .rposition(|i| i.opcode == OpCode::Ret)
    }

    /// Finds an instruction by label.
    #[must_use]
    pub fn instruction(&self, label: u32) -> Option<&Instruction> {
        self.instructions.iter().find(|i| i.label == label)
    }

    /// Raises the recorded stack requirement to at least `depth`.
    pub fn ensure_max_stack(&mut self, depth: u16) {
        self.max_stack = self.max_stack.max(depth);
    }

    fn absorb(&mut self, snippet: Snippet, at: usize) -> Result<()> {
        let watermark = self.next_label;
        if snippet.instructions.iter().any(|i| i.label < watermark) {
            return Err(malformed_body!(
                "spliced sequence reuses labels below the body watermark {}",
                watermark
            ));
        }

        self.ensure_max_stack(snippet.stack_peak);
        self.next_label = self.next_label.max(snippet.next_label);
        self.instructions.splice(at..at, snippet.instructions);
        Ok(())
    }

    /// Splices a sequence in front of the current entry point. No existing
    /// instruction changes its label or relative order, so branch targets
    /// and handler ranges stay valid; only the entry point is displaced.
    ///
    /// # Errors
    /// Fails when the snippet's labels collide with the body's.
    pub fn prepend(&mut self, snippet: Snippet) -> Result<()> {
        self.absorb(snippet, 0)
    }

    /// Appends a sequence after the last instruction.
    ///
    /// # Errors
    /// Fails when the snippet's labels collide with the body's.
    pub fn append(&mut self, snippet: Snippet) -> Result<()> {
        self.absorb(snippet, self.instructions.len())
    }

    /// Splices a sequence immediately before the final `ret`.
    ///
    /// # Errors
    /// Fails when the body has no `ret` instruction or on label collision.
    pub fn insert_before_final_return(&mut self, snippet: Snippet) -> Result<()> {
        let at = self
            .final_return()
            .ok_or_else(|| malformed_body!("method body has no return instruction"))?;
        self.absorb(snippet, at)
    }

    /// Verifies that every branch target and every handler-range label
    /// resolves to an instruction of this body, and that labels are unique.
    ///
    /// # Errors
    /// Fails on a dangling target, a dangling handler label, or a duplicated
    /// label.
    pub fn validate_branch_targets(&self) -> Result<()> {
        let mut labels = std::collections::HashSet::with_capacity(self.instructions.len());
        for instruction in &self.instructions {
            if !labels.insert(instruction.label) {
                return Err(malformed_body!(
                    "label {} is assigned to more than one instruction",
                    instruction.label
                ));
            }
        }

        for instruction in &self.instructions {
            if let Operand::Target(target) = instruction.operand {
                if !labels.contains(&target) {
                    return Err(malformed_body!(
                        "branch at label {} targets unknown label {}",
                        instruction.label,
                        target
                    ));
                }
            }
        }

        for handler in &self.exception_handlers {
            for label in [
                handler.try_start,
                handler.try_end,
                handler.handler_start,
                handler.handler_end,
            ] {
                if !labels.contains(&label) {
                    return Err(malformed_body!(
                        "exception handler range refers to unknown label {}",
                        label
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> Token {
        Token::new(0x04000001)
    }

    fn simple_body() -> MethodBody {
        // ldarg.0; ldfld; ret
        MethodBody::build(|asm| {
            asm.ldarg(0)?.ldfld(field())?.ret()?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn test_build_records_stack_and_labels() {
        let body = simple_body();
        assert_eq!(body.max_stack, 1);
        assert_eq!(body.entry_label(), Some(0));
        assert_eq!(body.final_return(), Some(2));
        assert!(body.validate_branch_targets().is_ok());
    }

    #[test]
    fn test_prepend_keeps_existing_labels() {
        let mut body = simple_body();
        let original_labels: Vec<u32> = body.instructions.iter().map(|i| i.label).collect();
        let entry = body.entry_label().unwrap();

        let mut asm = body.assembler();
        asm.ldarg(0)
            .unwrap()
            .ldfld(field())
            .unwrap()
            .brfalse(entry)
            .unwrap();
        body.prepend(asm.finish().unwrap()).unwrap();

        // The original instructions follow the splice, labels untouched.
        let tail: Vec<u32> = body.instructions[3..].iter().map(|i| i.label).collect();
        assert_eq!(tail, original_labels);

        // The branch still resolves to the displaced entry point.
        assert!(body.validate_branch_targets().is_ok());
        assert_eq!(body.instructions[2].target(), Some(entry));
    }

    #[test]
    fn test_insert_before_final_return() {
        let mut body = MethodBody::build(|asm| {
            asm.nop()?.ret()?;
            Ok(())
        })
        .unwrap();

        let mut asm = body.assembler();
        asm.ldarg(0).unwrap().ldc_i4(1).unwrap().stfld(field()).unwrap();
        body.insert_before_final_return(asm.finish().unwrap()).unwrap();

        let opcodes: Vec<OpCode> = body.instructions.iter().map(|i| i.opcode).collect();
        assert_eq!(
            opcodes,
            vec![
                OpCode::Nop,
                OpCode::Ldarg0,
                OpCode::LdcI41,
                OpCode::Stfld,
                OpCode::Ret,
            ]
        );
        assert_eq!(body.max_stack, 2, "splice raised the stack requirement");
    }

    #[test]
    fn test_insert_before_final_return_requires_ret() {
        let mut body = MethodBody::build(|asm| {
            asm.nop()?;
            Ok(())
        })
        .unwrap();

        let mut asm = body.assembler();
        asm.nop().unwrap();
        assert!(body.insert_before_final_return(asm.finish().unwrap()).is_err());
    }

    #[test]
    fn test_label_collision_is_rejected() {
        let mut body = simple_body();

        // An assembler not positioned past the watermark produces colliding labels.
        let mut asm = InstructionAssembler::new();
        asm.nop().unwrap();
        assert!(body.prepend(asm.finish().unwrap()).is_err());
    }

    #[test]
    fn test_max_stack_never_decreases() {
        let mut body = MethodBody::build(|asm| {
            asm.ldarg(0)?.ldc_i4(1)?.add()?.ret()?;
            Ok(())
        })
        .unwrap();
        assert_eq!(body.max_stack, 2);

        let mut asm = body.assembler();
        asm.nop().unwrap();
        body.prepend(asm.finish().unwrap()).unwrap();
        assert_eq!(body.max_stack, 2);
    }

    #[test]
    fn test_validate_detects_dangling_target() {
        let body = MethodBody::build(|asm| {
            asm.brfalse(99)?.ret()?;
            Ok(())
        })
        .unwrap();
        assert!(body.validate_branch_targets().is_err());
    }

    #[test]
    fn test_validate_covers_handler_ranges() {
        let mut body = MethodBody::build(|asm| {
            asm.nop()?.leave(2)?;
            asm.nop()?;
            asm.endfinally()?;
            Ok(())
        })
        .unwrap();
        body.exception_handlers.push(ExceptionHandler {
            kind: ExceptionHandlerKind::Finally,
            try_start: 0,
            try_end: 1,
            handler_start: 2,
            handler_end: 3,
            catch_type: None,
        });
        assert!(body.validate_branch_targets().is_ok());

        body.exception_handlers[0].handler_end = 42;
        assert!(body.validate_branch_targets().is_err());
    }

    #[test]
    fn test_entry_splice_preserves_handler_ranges() {
        let mut body = MethodBody::build(|asm| {
            asm.nop()?.leave(2)?;
            asm.nop()?;
            asm.endfinally()?;
            asm.ret()?;
            Ok(())
        })
        .unwrap();
        body.exception_handlers.push(ExceptionHandler {
            kind: ExceptionHandlerKind::Finally,
            try_start: 0,
            try_end: 1,
            handler_start: 2,
            handler_end: 3,
            catch_type: None,
        });

        let mut asm = body.assembler();
        asm.nop().unwrap();
        body.prepend(asm.finish().unwrap()).unwrap();

        assert!(
            body.validate_branch_targets().is_ok(),
            "handler ranges must survive an entry splice"
        );
    }
}
