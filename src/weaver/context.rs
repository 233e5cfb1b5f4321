//! Per-run weaving context: resolved well-known references and the log sinks.
//!
//! Everything the injected code needs from the outside world is resolved
//! exactly once, at the start of a run, into a [`WellKnownReferences`] value
//! that travels with the run — there is no process-wide import service, and
//! nothing survives between runs.

use crate::logging::WeaveLogger;
use crate::metadata::flags::MethodAttributes;
use crate::metadata::module::Module;
use crate::metadata::names;
use crate::metadata::signatures::{MethodSignature, TypeSignature};
use crate::metadata::token::Token;
use crate::{Error, Result};

/// The external references every weaving run needs, resolved once at setup.
#[derive(Debug, Clone)]
pub struct WellKnownReferences {
    /// `System.ObjectDisposedException::.ctor(string)`
    pub object_disposed_exception_ctor: Token,
    /// `CompilerGeneratedAttribute::.ctor()`, attached to every synthesized member
    pub compiler_generated_ctor: Token,
    /// `System.Threading.Tasks.Task`
    pub task_type: Token,
    /// `Task::ContinueWith(Action<Task>)`
    pub task_continue_with: Token,
    /// `Action<Task>::.ctor(object, native int)` on the constructed type
    pub action_of_task_ctor: Token,
}

impl WellKnownReferences {
    /// Resolves the well-known surface from the module's reference table.
    ///
    /// Member references missing on a present type are imported on demand;
    /// a missing *type* means the host environment does not reach the
    /// required assembly and resolution fails.
    ///
    /// # Errors
    /// Returns [`Error::UnknownReference`] naming the first reference that
    /// could not be resolved.
    pub fn resolve(module: &mut Module) -> Result<Self> {
        let exception = required_type(module, names::OBJECT_DISPOSED_EXCEPTION)?;
        let object_disposed_exception_ctor = module.references_mut().import_member(
            exception,
            names::CTOR,
            MethodSignature::instance(TypeSignature::Void, vec![TypeSignature::String]),
            ctor_flags(),
        );

        let generated = required_type(module, names::COMPILER_GENERATED_ATTRIBUTE)?;
        let compiler_generated_ctor = module.references_mut().import_member(
            generated,
            names::CTOR,
            MethodSignature::instance(TypeSignature::Void, vec![]),
            ctor_flags(),
        );

        let task_type = required_type(module, names::TASK)?;
        let action = required_type(module, names::ACTION_1)?;

        let action_ctor = module.references_mut().import_member(
            action,
            names::CTOR,
            MethodSignature::instance(
                TypeSignature::Void,
                vec![TypeSignature::Object, TypeSignature::IntPtr],
            ),
            ctor_flags(),
        );
        let action_of_task_ctor = module
            .references_mut()
            .make_host_instance_generic(action_ctor, &[TypeSignature::Class(task_type)])?;

        let task_continue_with = module.references_mut().import_member(
            task_type,
            names::CONTINUE_WITH,
            MethodSignature::instance(
                TypeSignature::Class(task_type),
                vec![TypeSignature::GenericInstance {
                    definition: action,
                    args: vec![TypeSignature::Class(task_type)],
                }],
            ),
            MethodAttributes::PUBLIC | MethodAttributes::HIDE_BY_SIG,
        );

        Ok(WellKnownReferences {
            object_disposed_exception_ctor,
            compiler_generated_ctor,
            task_type,
            task_continue_with,
            action_of_task_ctor,
        })
    }
}

fn required_type(module: &Module, full_name: &str) -> Result<Token> {
    module
        .references()
        .type_by_full_name(full_name)
        .map(|t| t.token)
        .ok_or_else(|| Error::UnknownReference(full_name.to_string()))
}

fn ctor_flags() -> MethodAttributes {
    MethodAttributes::PUBLIC
        | MethodAttributes::HIDE_BY_SIG
        | MethodAttributes::SPECIAL_NAME
        | MethodAttributes::RT_SPECIAL_NAME
}

/// Everything one weaving run carries between phases.
pub(crate) struct WeaveContext<'a> {
    /// Resolved well-known references
    pub refs: WellKnownReferences,
    /// Host log sinks
    pub logger: &'a WeaveLogger,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::builder::ModuleBuilder;
    use crate::metadata::token::TableId;

    #[test]
    fn test_resolve_from_core_references() {
        let mut module = ModuleBuilder::new("App.dll").with_core_references().build();
        let refs = WellKnownReferences::resolve(&mut module).expect("core surface must resolve");

        assert!(refs.object_disposed_exception_ctor.is_table(TableId::MemberRef));
        assert!(refs.compiler_generated_ctor.is_table(TableId::MemberRef));
        assert!(refs.task_type.is_table(TableId::TypeRef));
        assert!(refs.task_continue_with.is_table(TableId::MemberRef));

        // The callback constructor was re-declared on the constructed Action<Task>.
        let member = module.references().member(refs.action_of_task_ctor).unwrap();
        assert!(member.declaring.is_table(TableId::TypeSpec));
    }

    #[test]
    fn test_resolve_is_stable_across_calls() {
        let mut module = ModuleBuilder::new("App.dll").with_core_references().build();
        let first = WellKnownReferences::resolve(&mut module).unwrap();
        let second = WellKnownReferences::resolve(&mut module).unwrap();

        assert_eq!(
            first.object_disposed_exception_ctor,
            second.object_disposed_exception_ctor
        );
        assert_eq!(first.action_of_task_ctor, second.action_of_task_ctor);
        assert_eq!(first.task_continue_with, second.task_continue_with);
    }

    #[test]
    fn test_missing_reference_fails_with_name() {
        let mut module = ModuleBuilder::new("Bare.dll").build();
        match WellKnownReferences::resolve(&mut module) {
            Err(Error::UnknownReference(name)) => {
                assert_eq!(name, names::OBJECT_DISPOSED_EXCEPTION);
            }
            other => panic!("expected UnknownReference, got {other:?}"),
        }
    }
}
