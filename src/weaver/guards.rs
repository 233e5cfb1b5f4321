//! Guard injection: disposed-state mutation in dispose methods and guard
//! prefixes on every other eligible public instance method.

use crate::analysis::TypeGraph;
use crate::assembly::synth;
use crate::metadata::attributes::CustomAttribute;
use crate::metadata::flags::MethodAttributes;
use crate::metadata::module::Module;
use crate::metadata::names;
use crate::metadata::signatures::TypeSignature;
use crate::metadata::token::Token;
use crate::metadata::typedef::{MethodDef, ParamDef};
use crate::weaver::context::WeaveContext;
use crate::weaver::DisposalKind;
use crate::{Error, Result};

/// Resolves the disposed-state getter a type's guards read: the type's own
/// property when it declares one, otherwise the nearest ancestor's.
///
/// # Errors
/// Returns [`Error::PropertyNotFound`] when neither exists.
pub(crate) fn resolve_disposed_getter(module: &Module, type_token: Token) -> Result<Token> {
    let ty = module
        .type_def(type_token)
        .ok_or(Error::TypeNotFound(type_token))?;

    if let Some(getter) = ty.property(names::DISPOSED_PROPERTY).and_then(|p| p.getter) {
        return Ok(getter);
    }

    TypeGraph::new(module)
        .nearest_ancestor_disposed_property(type_token)
        .map(|found| found.getter)
        .ok_or_else(|| Error::PropertyNotFound {
            type_name: ty.full_name(),
        })
}

/// Splices the state mutation into a type's dispose method.
///
/// Types owning a disposed-state field get the mutation; a pure forwarding
/// type's state lives in — and is flipped by — its ancestor, so its dispose
/// is left as plain delegation. Synchronous disposal stores the flag
/// immediately before the final return; asynchronous disposal registers a
/// synthesized continuation on the returned pending-operation handle, so the
/// flag flips only after the asynchronous work completes.
///
/// Returns whether a mutation was spliced.
pub(crate) fn inject_dispose_state_mutation(
    module: &mut Module,
    type_token: Token,
    kind: DisposalKind,
    ctx: &WeaveContext<'_>,
) -> Result<bool> {
    let (field, type_name) = {
        let ty = module
            .type_def(type_token)
            .ok_or(Error::TypeNotFound(type_token))?;
        (
            ty.field(names::DISPOSED_FIELD).map(|f| f.token),
            ty.full_name(),
        )
    };

    let Some(field) = field else {
        ctx.logger.debug(&format!(
            "'{type_name}' owns no disposed-state field; its ancestor chain flips the state"
        ));
        return Ok(false);
    };

    match kind {
        DisposalKind::Sync => {
            let body = dispose_body_mut(module, type_token, names::DISPOSE_METHOD)?;
            let mut asm = body.assembler();
            synth::set_disposed_state(&mut asm, field)?;
            body.insert_before_final_return(asm.finish()?)?;
        }
        DisposalKind::Async => {
            let continuation = create_continuation_method(module, type_token, field, ctx)?;
            let action_ctor = ctx.refs.action_of_task_ctor;
            let continue_with = ctx.refs.task_continue_with;

            let body = dispose_body_mut(module, type_token, names::DISPOSE_ASYNC_METHOD)?;
            // The pending-operation handle is on the stack at the splice point.
            let mut asm = body.assembler().at_depth(1);
            synth::continue_with_registration(&mut asm, continuation, action_ctor, continue_with)?;
            body.insert_before_final_return(asm.finish()?)?;
        }
    }

    ctx.logger
        .debug(&format!("spliced disposed-state mutation into '{type_name}'"));
    Ok(true)
}

fn dispose_body_mut<'m>(
    module: &'m mut Module,
    type_token: Token,
    method_name: &str,
) -> Result<&'m mut crate::assembly::MethodBody> {
    let ty = module
        .type_def_mut(type_token)
        .ok_or(Error::TypeNotFound(type_token))?;
    let type_name = ty.full_name();
    let method = ty
        .method_mut(method_name)
        .ok_or_else(|| malformed_body!("'{}' has no '{}' method to instrument", type_name, method_name))?;
    method
        .body
        .as_mut()
        .ok_or_else(|| malformed_body!("'{}.{}' has no body to instrument", type_name, method_name))
}

/// Synthesizes the private continuation method that flips the disposed flag
/// after asynchronous disposal completes.
fn create_continuation_method(
    module: &mut Module,
    type_token: Token,
    field: Token,
    ctx: &WeaveContext<'_>,
) -> Result<Token> {
    let body = crate::assembly::MethodBody::build(move |asm| {
        synth::set_disposed_state(asm, field)?;
        asm.ret()?;
        Ok(())
    })?;

    let mut method = MethodDef::new(
        names::DISPOSE_ASYNC_CONTINUATION,
        MethodAttributes::PRIVATE | MethodAttributes::HIDE_BY_SIG,
        TypeSignature::Void,
    );
    method.params.push(ParamDef::new(
        "completedTask",
        TypeSignature::Class(ctx.refs.task_type),
    ));
    method.body = Some(body);
    method
        .custom_attributes
        .push(CustomAttribute::compiler_generated(
            ctx.refs.compiler_generated_ctor,
        ));
    module.add_method(type_token, method)
}

fn is_guard_site(method: &MethodDef) -> bool {
    !method.flags.is_static()
        && method.flags.is_public()
        && !method.is_generated()
        && !method.is_dispose()
        && !method.is_constructor()
}

/// Prepends the disposed guard to every eligible public instance method of a
/// type: not static, not compiler-generated, not a dispose method, not a
/// constructor. The guard reads the resolved disposed-state getter and
/// throws before any original instruction when the instance is disposed.
///
/// Runs once per type per pass; the weaver never re-scans an instrumented
/// method.
///
/// Returns the number of methods guarded.
pub(crate) fn inject_guards(
    module: &mut Module,
    type_token: Token,
    ctx: &WeaveContext<'_>,
) -> Result<usize> {
    let getter = resolve_disposed_getter(module, type_token)?;

    let type_name = module
        .type_def(type_token)
        .ok_or(Error::TypeNotFound(type_token))?
        .full_name();
    let context_name = module.user_string(&type_name);

    let eligible: Vec<Token> = module
        .type_def(type_token)
        .ok_or(Error::TypeNotFound(type_token))?
        .methods
        .iter()
        .filter(|m| is_guard_site(m))
        .map(|m| m.token)
        .collect();

    let exception_ctor = ctx.refs.object_disposed_exception_ctor;
    let mut guarded = 0;

    for method_token in eligible {
        let ty = module
            .type_def_mut(type_token)
            .ok_or(Error::TypeNotFound(type_token))?;
        let method = ty
            .method_by_token_mut(method_token)
            .ok_or(Error::MethodNotFound(method_token))?;
        let Some(body) = method.body.as_mut() else {
            continue;
        };

        // A bodyless-but-present stream still needs somewhere to fall through to.
        if body.instructions.is_empty() {
            let mut asm = body.assembler();
            asm.ret()?;
            body.append(asm.finish()?)?;
        }

        let entry = body
            .entry_label()
            .ok_or_else(|| malformed_body!("method body unexpectedly empty"))?;
        let mut asm = body.assembler();
        synth::disposed_guard(&mut asm, entry, getter, context_name, exception_ctor)?;
        body.prepend(asm.finish()?)?;
        guarded += 1;
    }

    ctx.logger.debug(&format!(
        "guarded {guarded} method(s) on '{type_name}'"
    ));
    Ok(guarded)
}
