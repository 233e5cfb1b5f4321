//! Canonical instruction sequences for disposed-state weaving.
//!
//! These functions know *how* to build each injected sequence given resolved
//! references — never *which* types receive them. Each writes into an
//! [`InstructionAssembler`] the caller positioned for the destination body;
//! the caller owns label allocation, splicing and stack-requirement updates.

use crate::assembly::assembler::InstructionAssembler;
use crate::metadata::token::Token;
use crate::Result;

/// The disposed-state store: `load self; load true; store field`.
///
/// Spliced before the final return of a synchronous dispose method, and
/// forming the whole body of the asynchronous continuation.
pub fn set_disposed_state(asm: &mut InstructionAssembler, disposed_field: Token) -> Result<()> {
    asm.ldarg(0)?.ldc_i4(1)?.stfld(disposed_field)?;
    Ok(())
}

/// The guard prefix: read the disposed-state property; fall through to the
/// original body when false, otherwise throw the disposed error carrying
/// `context_name` before any original instruction executes.
///
/// `entry` is the label of the method's original first instruction; the
/// getter is invoked with virtual dispatch so the most-derived disposed
/// state answers.
pub fn disposed_guard(
    asm: &mut InstructionAssembler,
    entry: u32,
    is_disposed_getter: Token,
    context_name: Token,
    exception_ctor: Token,
) -> Result<()> {
    asm.ldarg(0)?
        .callvirt(is_disposed_getter, 1, 1)?
        .brfalse(entry)?
        .ldstr(context_name)?
        .newobj(exception_ctor, 1)?
        .throw()?;
    Ok(())
}

/// Getter body for a type that owns the backing field and has no disposed
/// ancestor: return the field.
pub fn getter_from_field(asm: &mut InstructionAssembler, disposed_field: Token) -> Result<()> {
    asm.ldarg(0)?.ldfld(disposed_field)?.ret()?;
    Ok(())
}

/// Getter body for a type that owns the backing field *and* descends from a
/// type exposing the disposed property: when the local field already reads
/// true, return true directly; otherwise delegate to the ancestor getter and
/// return its result.
pub fn getter_from_field_and_base(
    asm: &mut InstructionAssembler,
    disposed_field: Token,
    base_getter: Token,
) -> Result<()> {
    let l_true = asm.defer_label();
    asm.ldarg(0)?
        .ldfld(disposed_field)?
        .brtrue(l_true)?
        .ldarg(0)?
        .call(base_getter, 1, 1)?
        .ret()?;
    asm.bind(l_true)?.ldc_i4(1)?.ret()?;
    Ok(())
}

/// Getter body for a pure forwarding type (no field of its own): delegate
/// unconditionally to the ancestor getter.
pub fn getter_from_base(asm: &mut InstructionAssembler, base_getter: Token) -> Result<()> {
    asm.ldarg(0)?.call(base_getter, 1, 1)?.ret()?;
    Ok(())
}

/// Body of a synthesized dispose override: call the inherited dispose and
/// return. `returns_handle` is true for asynchronous disposal, where the
/// base call produces the pending-operation handle the override returns.
pub fn dispose_override(
    asm: &mut InstructionAssembler,
    base_dispose: Token,
    returns_handle: bool,
) -> Result<()> {
    asm.ldarg(0)?
        .call(base_dispose, 1, u8::from(returns_handle))?
        .ret()?;
    Ok(())
}

/// The continuation wiring spliced before the final return of an
/// asynchronous dispose method. Entry stack: the pending-operation handle
/// the method was about to return. Wraps the synthesized continuation in a
/// callback object, registers it on the handle, and leaves the registration's
/// resulting handle on the stack — so the state flip happens only after the
/// underlying asynchronous work completes, and callers await the
/// continuation-carrying handle.
pub fn continue_with_registration(
    asm: &mut InstructionAssembler,
    continuation_method: Token,
    action_ctor: Token,
    continue_with: Token,
) -> Result<()> {
    asm.ldarg(0)?
        .ldftn(continuation_method)?
        .newobj(action_ctor, 2)?
        .callvirt(continue_with, 2, 1)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::instruction::Operand;
    use crate::assembly::opcode::OpCode;

    fn tokens() -> (Token, Token, Token, Token) {
        (
            Token::new(0x04000001), // field
            Token::new(0x06000007), // getter / continuation
            Token::new(0x70000001), // user string
            Token::new(0x0A000001), // exception ctor
        )
    }

    #[test]
    fn test_set_disposed_state_shape() {
        let (field, _, _, _) = tokens();
        let mut asm = InstructionAssembler::new();
        set_disposed_state(&mut asm, field).unwrap();
        let snippet = asm.finish().unwrap();

        let opcodes: Vec<OpCode> = snippet.instructions.iter().map(|i| i.opcode).collect();
        assert_eq!(opcodes, vec![OpCode::Ldarg0, OpCode::LdcI41, OpCode::Stfld]);
        assert_eq!(snippet.instructions[2].token(), Some(field));
        assert_eq!(snippet.stack_peak, 2);
    }

    #[test]
    fn test_disposed_guard_shape() {
        let (_, getter, name, ctor) = tokens();
        let mut asm = InstructionAssembler::with_label_base(100);
        disposed_guard(&mut asm, 7, getter, name, ctor).unwrap();
        let snippet = asm.finish().unwrap();

        let opcodes: Vec<OpCode> = snippet.instructions.iter().map(|i| i.opcode).collect();
        assert_eq!(
            opcodes,
            vec![
                OpCode::Ldarg0,
                OpCode::Callvirt,
                OpCode::BrfalseS,
                OpCode::Ldstr,
                OpCode::Newobj,
                OpCode::Throw,
            ]
        );
        // Fall-through targets the original entry point.
        assert_eq!(snippet.instructions[2].operand, Operand::Target(7));
        assert_eq!(snippet.instructions[1].token(), Some(getter));
        assert_eq!(snippet.instructions[3].token(), Some(name));
        assert_eq!(snippet.instructions[4].token(), Some(ctor));
        assert_eq!(snippet.stack_peak, 1);
    }

    #[test]
    fn test_getter_from_field_shape() {
        let (field, _, _, _) = tokens();
        let mut asm = InstructionAssembler::new();
        getter_from_field(&mut asm, field).unwrap();
        let snippet = asm.finish().unwrap();

        let opcodes: Vec<OpCode> = snippet.instructions.iter().map(|i| i.opcode).collect();
        assert_eq!(opcodes, vec![OpCode::Ldarg0, OpCode::Ldfld, OpCode::Ret]);
    }

    #[test]
    fn test_getter_from_field_and_base_short_circuits() {
        let (field, getter, _, _) = tokens();
        let mut asm = InstructionAssembler::new();
        getter_from_field_and_base(&mut asm, field, getter).unwrap();
        let snippet = asm.finish().unwrap();

        let opcodes: Vec<OpCode> = snippet.instructions.iter().map(|i| i.opcode).collect();
        assert_eq!(
            opcodes,
            vec![
                OpCode::Ldarg0,
                OpCode::Ldfld,
                OpCode::BrtrueS,
                OpCode::Ldarg0,
                OpCode::Call,
                OpCode::Ret,
                OpCode::LdcI41,
                OpCode::Ret,
            ]
        );

        // The short-circuit branch lands on the load of `true`.
        let branch_target = snippet.instructions[2].target().unwrap();
        let target = snippet
            .instructions
            .iter()
            .find(|i| i.label == branch_target)
            .unwrap();
        assert_eq!(target.opcode, OpCode::LdcI41);

        // The base getter is chained without virtual dispatch.
        assert_eq!(snippet.instructions[4].token(), Some(getter));
    }

    #[test]
    fn test_getter_from_base_delegates() {
        let (_, getter, _, _) = tokens();
        let mut asm = InstructionAssembler::new();
        getter_from_base(&mut asm, getter).unwrap();
        let snippet = asm.finish().unwrap();

        let opcodes: Vec<OpCode> = snippet.instructions.iter().map(|i| i.opcode).collect();
        assert_eq!(opcodes, vec![OpCode::Ldarg0, OpCode::Call, OpCode::Ret]);
    }

    #[test]
    fn test_dispose_override_shapes() {
        let (_, base, _, _) = tokens();

        let mut asm = InstructionAssembler::new();
        dispose_override(&mut asm, base, false).unwrap();
        let sync = asm.finish().unwrap();
        let opcodes: Vec<OpCode> = sync.instructions.iter().map(|i| i.opcode).collect();
        assert_eq!(opcodes, vec![OpCode::Ldarg0, OpCode::Call, OpCode::Ret]);

        let mut asm = InstructionAssembler::new();
        dispose_override(&mut asm, base, true).unwrap();
        let with_handle = asm.finish().unwrap();
        assert_eq!(
            with_handle.stack_peak, 1,
            "the returned handle stays on the stack"
        );
    }

    #[test]
    fn test_continue_with_registration_shape() {
        let continuation = Token::new(0x06000009);
        let action_ctor = Token::new(0x0A000002);
        let continue_with = Token::new(0x0A000003);

        let mut asm = InstructionAssembler::new().at_depth(1);
        continue_with_registration(&mut asm, continuation, action_ctor, continue_with).unwrap();
        let snippet = asm.finish().unwrap();

        let opcodes: Vec<OpCode> = snippet.instructions.iter().map(|i| i.opcode).collect();
        assert_eq!(
            opcodes,
            vec![
                OpCode::Ldarg0,
                OpCode::Ldftn,
                OpCode::Newobj,
                OpCode::Callvirt,
            ]
        );
        assert_eq!(snippet.instructions[1].token(), Some(continuation));
        assert_eq!(snippet.instructions[2].token(), Some(action_ctor));
        assert_eq!(snippet.instructions[3].token(), Some(continue_with));
        assert_eq!(snippet.stack_peak, 3);
    }
}
