//! The weaving pipeline: discovery, validation, member synthesis and guard
//! injection over one module.
//!
//! [`Weaver::execute`] drives the phases in a fixed order:
//!
//! ```text
//! Init -> Discover -> Validate -> SynthesizeMembers
//!      -> InjectDisposeMutation -> InjectGuards -> Done
//! ```
//!
//! `Validate` can instead reach the terminal `Failed` state; every fatal
//! condition aborts the whole run immediately. The weaver holds no rollback:
//! a failed run leaves the module for the host to discard.
//!
//! # Examples
//!
//! ```rust
//! use dotweave::{Weaver, WeaveLogger};
//! use dotweave::metadata::{ModuleBuilder, TypeDefBuilder, MethodDefBuilder, TypeSignature};
//!
//! let mut module = ModuleBuilder::new("App.dll").with_core_references().build();
//! let disposable = module.references().type_by_full_name("System.IDisposable").unwrap().token;
//! let ty = TypeDefBuilder::new("App", "Connection")
//!     .implements(disposable)
//!     .build(&mut module);
//! MethodDefBuilder::new("Dispose")
//!     .returns(TypeSignature::Void)
//!     .implementation(|asm| { asm.ret()?; Ok(()) })
//!     .build(&mut module, ty)?;
//!
//! let report = Weaver::new().execute(&mut module)?;
//! assert_eq!(report.discovered, 1);
//! # Ok::<(), dotweave::Error>(())
//! ```

mod context;
mod guards;
mod members;

pub use context::WellKnownReferences;
pub(crate) use context::WeaveContext;

use crate::analysis::TypeGraph;
use crate::logging::WeaveLogger;
use crate::metadata::module::Module;
use crate::metadata::names;
use crate::metadata::token::Token;
use crate::{Error, Result};

/// Which disposal contract a discovered type implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposalKind {
    /// The synchronous contract (`System.IDisposable`)
    Sync,
    /// The asynchronous contract (`IAsyncDisposable`)
    Async,
}

impl DisposalKind {
    /// Name of the dispose method this contract obliges.
    #[must_use]
    pub fn method_name(&self) -> &'static str {
        match self {
            DisposalKind::Sync => names::DISPOSE_METHOD,
            DisposalKind::Async => names::DISPOSE_ASYNC_METHOD,
        }
    }
}

/// The phases of one weaving pass. Transitions are strictly sequential and
/// non-resumable; `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum WeaverState {
    /// Resolving well-known references
    Init,
    /// Collecting candidate types
    Discover,
    /// Checking precondition invariants
    Validate,
    /// Creating fields, properties and dispose overrides
    SynthesizeMembers,
    /// Splicing state mutations into dispose methods
    InjectDisposeMutation,
    /// Prepending guards to public instance methods
    InjectGuards,
    /// All phases completed
    Done,
    /// Aborted by a fatal condition
    Failed,
}

/// Per-phase counts of what one weaving pass changed, surfaced to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeaveReport {
    /// Types discovered as weaving candidates
    pub discovered: usize,
    /// Disposed-state backing fields created
    pub fields_added: usize,
    /// Disposed-state properties created
    pub properties_added: usize,
    /// Dispose overrides synthesized
    pub overrides_added: usize,
    /// Dispose methods that received a state mutation
    pub dispose_mutations: usize,
    /// Methods that received a guard prefix
    pub methods_guarded: usize,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    type_token: Token,
    sync: bool,
    is_async: bool,
    depth: usize,
}

impl Candidate {
    fn kind(&self) -> DisposalKind {
        if self.sync {
            DisposalKind::Sync
        } else {
            DisposalKind::Async
        }
    }
}

/// The top-level driver of the weaving pipeline.
#[derive(Debug, Default)]
pub struct Weaver {
    logger: WeaveLogger,
}

impl Weaver {
    /// Creates a weaver with no-op log sinks.
    #[must_use]
    pub fn new() -> Self {
        Weaver {
            logger: WeaveLogger::new(),
        }
    }

    /// Creates a weaver reporting through the given log sinks.
    #[must_use]
    pub fn with_logger(logger: WeaveLogger) -> Self {
        Weaver { logger }
    }

    /// Runs all weaving phases over the module, mutating it in place.
    ///
    /// # Errors
    /// Any fatal condition from the taxonomy in [`crate::WeavingErrorCode`]
    /// aborts the run; the module may then be partially mutated and must be
    /// discarded by the host.
    pub fn execute(&self, module: &mut Module) -> Result<WeaveReport> {
        let mut state = WeaverState::Init;
        match self.run(module, &mut state) {
            Ok(report) => Ok(report),
            Err(error) => {
                self.logger
                    .error(&format!("weaving aborted during {state}: {error}"));
                state = WeaverState::Failed;
                self.logger.debug(&format!("entering phase {state}"));
                Err(error)
            }
        }
    }

    fn advance(&self, state: &mut WeaverState, next: WeaverState) {
        *state = next;
        self.logger.debug(&format!("entering phase {next}"));
    }

    fn run(&self, module: &mut Module, state: &mut WeaverState) -> Result<WeaveReport> {
        self.logger.debug("entry into dotweave Execute");

        let refs = WellKnownReferences::resolve(module)?;
        let ctx = WeaveContext {
            refs,
            logger: &self.logger,
        };

        self.advance(state, WeaverState::Discover);
        let candidates = discover(module);
        self.logger.info(&format!(
            "discovered {} disposable type(s) in '{}'",
            candidates.len(),
            module.name
        ));

        self.advance(state, WeaverState::Validate);
        validate(module, &candidates)?;

        let mut report = WeaveReport {
            discovered: candidates.len(),
            ..WeaveReport::default()
        };

        self.advance(state, WeaverState::SynthesizeMembers);
        for candidate in &candidates {
            synthesize_members(module, candidate, &ctx, &mut report)?;
        }

        self.advance(state, WeaverState::InjectDisposeMutation);
        for candidate in &candidates {
            if guards::inject_dispose_state_mutation(
                module,
                candidate.type_token,
                candidate.kind(),
                &ctx,
            )? {
                report.dispose_mutations += 1;
            }
        }

        self.advance(state, WeaverState::InjectGuards);
        for candidate in &candidates {
            report.methods_guarded += guards::inject_guards(module, candidate.type_token, &ctx)?;
        }

        self.advance(state, WeaverState::Done);
        self.logger.info(&format!(
            "dotweave executed successfully: {} type(s), {} guard(s)",
            report.discovered, report.methods_guarded
        ));
        Ok(report)
    }
}

/// Collects candidate types: concrete classes implementing a disposal
/// contract (directly or via ancestors), not skip-marked, not generated.
/// Candidates are ordered base-before-derived so property chains synthesize
/// top-down.
fn discover(module: &Module) -> Vec<Candidate> {
    let graph = TypeGraph::new(module);
    let mut candidates: Vec<Candidate> = module
        .types()
        .iter()
        .filter(|ty| ty.is_concrete_class() && !ty.has_skip_marker() && !ty.is_generated())
        .filter_map(|ty| {
            let sync = graph.implements_sync_disposal(ty.token);
            let is_async = graph.implements_async_disposal(ty.token);
            (sync || is_async).then_some(Candidate {
                type_token: ty.token,
                sync,
                is_async,
                depth: graph.inheritance_depth(ty.token),
            })
        })
        .collect();

    candidates.sort_by_key(|c| (c.depth, c.type_token.value()));
    candidates
}

/// Fails fast on precondition violations, before any mutation.
fn validate(module: &Module, candidates: &[Candidate]) -> Result<()> {
    let graph = TypeGraph::new(module);

    for candidate in candidates {
        let ty = module
            .type_def(candidate.type_token)
            .ok_or(Error::TypeNotFound(candidate.type_token))?;

        if candidate.sync && candidate.is_async {
            return Err(Error::ContainsBothInterfaces {
                type_name: ty.full_name(),
            });
        }

        if let Some(reason) = graph.own_disposed_field_incompatibility(candidate.type_token) {
            return Err(Error::IncompatibleExistingMember {
                type_name: ty.full_name(),
                member: names::DISPOSED_FIELD.to_string(),
                reason,
            });
        }

        if graph.has_own_disposed_property(candidate.type_token) {
            return Err(Error::IncompatibleExistingMember {
                type_name: ty.full_name(),
                member: names::DISPOSED_PROPERTY.to_string(),
                reason: "the weaver synthesizes this property".to_string(),
            });
        }
    }

    Ok(())
}

fn synthesize_members(
    module: &mut Module,
    candidate: &Candidate,
    ctx: &WeaveContext<'_>,
    report: &mut WeaveReport,
) -> Result<()> {
    let kind = candidate.kind();

    let (base_getter, own_field, has_own_dispose, base_dispose, type_name) = {
        let graph = TypeGraph::new(module);
        let ty = module
            .type_def(candidate.type_token)
            .ok_or(Error::TypeNotFound(candidate.type_token))?;
        let has_own_dispose = ty.method(kind.method_name()).is_some();
        (
            graph.nearest_ancestor_disposed_property(candidate.type_token),
            ty.field(names::DISPOSED_FIELD).map(|f| f.token),
            has_own_dispose,
            (!has_own_dispose)
                .then(|| graph.nearest_overridable_dispose(candidate.type_token, kind.method_name()))
                .flatten(),
            ty.full_name(),
        )
    };

    let field = match own_field {
        Some(token) => Some(token),
        None if base_getter.is_none() => {
            report.fields_added += 1;
            Some(members::create_disposed_field(module, candidate.type_token, ctx)?)
        }
        None => None,
    };

    members::create_disposed_property(
        module,
        candidate.type_token,
        field,
        base_getter.as_ref().map(|p| p.getter),
        ctx,
    )?;
    report.properties_added += 1;

    if !has_own_dispose {
        let base = base_dispose.ok_or_else(|| Error::BaseMethodNotFound {
            type_name: type_name.clone(),
            method: kind.method_name().to_string(),
        })?;
        members::create_dispose_override(module, candidate.type_token, kind, base.method, ctx)?;
        report.overrides_added += 1;
    }

    ctx.logger
        .debug(&format!("synthesized disposed-state members on '{type_name}'"));
    Ok(())
}
