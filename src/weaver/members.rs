//! Member synthesis: the disposed-state field, the disposed-state property
//! chain, and dispose overrides for inheriting types.
//!
//! Every member synthesized here is tagged with the compiler-generated
//! marker so later phases (and any downstream tooling) recognize and skip it.

use crate::assembly::{synth, MethodBody};
use crate::metadata::attributes::CustomAttribute;
use crate::metadata::flags::{FieldAttributes, MethodAttributes, PropertyAttributes};
use crate::metadata::module::Module;
use crate::metadata::names;
use crate::metadata::signatures::TypeSignature;
use crate::metadata::token::Token;
use crate::metadata::typedef::{FieldDef, MethodDef, PropertyDef};
use crate::weaver::context::WeaveContext;
use crate::weaver::DisposalKind;
use crate::Result;

/// Creates the private boolean backing field on a type that stores its own
/// disposed state.
pub(crate) fn create_disposed_field(
    module: &mut Module,
    type_token: Token,
    ctx: &WeaveContext<'_>,
) -> Result<Token> {
    let mut field = FieldDef::new(
        names::DISPOSED_FIELD,
        FieldAttributes::PRIVATE,
        TypeSignature::Boolean,
    );
    field
        .custom_attributes
        .push(CustomAttribute::compiler_generated(
            ctx.refs.compiler_generated_ctor,
        ));
    module.add_field(type_token, field)
}

/// Creates the disposed-state property and its getter on a type.
///
/// The getter body depends on what the type has available:
/// - own field, no disposed ancestor: return the field;
/// - own field and a disposed ancestor: short-circuit to `true` on the local
///   field, else chain to the ancestor getter;
/// - no own field (pure forwarding type): delegate to the ancestor getter.
///
/// The getter overrides the ancestor's when one exists (slot reuse),
/// otherwise it opens a fresh virtual slot.
///
/// Returns the getter's method token.
pub(crate) fn create_disposed_property(
    module: &mut Module,
    type_token: Token,
    field: Option<Token>,
    base_getter: Option<Token>,
    ctx: &WeaveContext<'_>,
) -> Result<Token> {
    let body = match (field, base_getter) {
        (Some(field), Some(base)) => MethodBody::build(move |asm| {
            synth::getter_from_field_and_base(asm, field, base)
        })?,
        (Some(field), None) => {
            MethodBody::build(move |asm| synth::getter_from_field(asm, field))?
        }
        (None, Some(base)) => MethodBody::build(move |asm| synth::getter_from_base(asm, base))?,
        (None, None) => {
            return Err(malformed_body!(
                "disposed-state property needs a local field or an ancestor property"
            ))
        }
    };

    let mut flags = MethodAttributes::FAMILY
        | MethodAttributes::HIDE_BY_SIG
        | MethodAttributes::SPECIAL_NAME
        | MethodAttributes::VIRTUAL;
    if base_getter.is_none() {
        flags |= MethodAttributes::NEW_SLOT;
    }

    let mut getter = MethodDef::new(names::DISPOSED_PROPERTY_GETTER, flags, TypeSignature::Boolean);
    getter.body = Some(body);
    getter
        .custom_attributes
        .push(CustomAttribute::compiler_generated(
            ctx.refs.compiler_generated_ctor,
        ));
    let getter_token = module.add_method(type_token, getter)?;

    let mut property = PropertyDef::new(names::DISPOSED_PROPERTY, TypeSignature::Boolean);
    property.flags = PropertyAttributes::empty();
    property.getter = Some(getter_token);
    property
        .custom_attributes
        .push(CustomAttribute::compiler_generated(
            ctx.refs.compiler_generated_ctor,
        ));
    module.add_property(type_token, property)?;

    Ok(getter_token)
}

/// Creates a dispose override on a type that implements a disposal contract
/// but never declares the dispose method itself. The body delegates to the
/// inherited dispose; for asynchronous disposal it returns the resulting
/// pending-operation handle.
pub(crate) fn create_dispose_override(
    module: &mut Module,
    type_token: Token,
    kind: DisposalKind,
    base_dispose: Token,
    ctx: &WeaveContext<'_>,
) -> Result<Token> {
    let returns_handle = kind == DisposalKind::Async;
    let body =
        MethodBody::build(move |asm| synth::dispose_override(asm, base_dispose, returns_handle))?;

    let return_type = match kind {
        DisposalKind::Sync => TypeSignature::Void,
        DisposalKind::Async => TypeSignature::Class(ctx.refs.task_type),
    };

    let mut method = MethodDef::new(
        kind.method_name(),
        MethodAttributes::PUBLIC | MethodAttributes::HIDE_BY_SIG | MethodAttributes::VIRTUAL,
        return_type,
    );
    method.body = Some(body);
    method
        .custom_attributes
        .push(CustomAttribute::compiler_generated(
            ctx.refs.compiler_generated_ctor,
        ));
    module.add_method(type_token, method)
}
