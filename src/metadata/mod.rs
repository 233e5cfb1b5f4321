//! The in-memory module model the weaver mutates.
//!
//! This module implements the metadata object model for one compiled unit:
//! type definitions with their fields, properties and methods, a reference
//! table for everything the module uses from other assemblies, and the
//! user-string heap. The model is owned and mutable — the weaver receives it
//! from the host, transforms it in place, and hands it back; binary
//! encode/decode is the host's concern.
//!
//! # Key Types
//!
//! - [`Module`] - The mutation target, owning all definitions
//! - [`TypeDef`] / [`FieldDef`] / [`MethodDef`] / [`PropertyDef`] - Definitions
//! - [`ReferenceTable`] - External types, member references and type specs
//! - [`Token`] - Table-qualified row identity for every definition and reference
//! - [`builder`] - Fluent construction of input modules

pub mod attributes;
pub mod builder;
pub mod flags;
pub mod module;
pub mod references;
pub mod signatures;
pub mod token;
pub mod typedef;

pub use attributes::CustomAttribute;
pub use builder::{FieldBuilder, MethodDefBuilder, ModuleBuilder, TypeDefBuilder};
pub use flags::{FieldAttributes, MethodAttributes, PropertyAttributes, TypeAttributes};
pub use module::Module;
pub use references::{ExternalProperty, ExternalType, MemberRef, ReferenceTable, TypeSpec};
pub use signatures::{MethodSignature, TypeSignature};
pub use token::{TableId, Token};
pub use typedef::{FieldDef, MethodDef, ParamDef, PropertyDef, TypeDef};

/// Well-known member and type names the weaver matches against or synthesizes.
pub mod names {
    /// The private boolean backing field synthesized per disposable type.
    pub const DISPOSED_FIELD: &str = "isDisposed";
    /// The read-only property exposing disposed state.
    pub const DISPOSED_PROPERTY: &str = "IsDisposed";
    /// The getter method of [`DISPOSED_PROPERTY`].
    pub const DISPOSED_PROPERTY_GETTER: &str = "get_IsDisposed";
    /// The synchronous dispose method.
    pub const DISPOSE_METHOD: &str = "Dispose";
    /// The asynchronous dispose method.
    pub const DISPOSE_ASYNC_METHOD: &str = "DisposeAsync";
    /// The private continuation method synthesized for asynchronous disposal.
    pub const DISPOSE_ASYNC_CONTINUATION: &str = "<DisposeAsync>SetIsDisposed";
    /// Constructor member name.
    pub const CTOR: &str = ".ctor";
    /// Static (class) constructor member name.
    pub const CCTOR: &str = ".cctor";

    /// The synchronous disposal contract, matched by full name.
    pub const IDISPOSABLE: &str = "System.IDisposable";
    /// The asynchronous disposal contract, matched by simple name: the
    /// interface predates a canonical framework namespace, so host code may
    /// declare it anywhere.
    pub const IASYNC_DISPOSABLE: &str = "IAsyncDisposable";

    /// Root of every inheritance chain.
    pub const SYSTEM_OBJECT: &str = "System.Object";
    /// The exception thrown by injected guards.
    pub const OBJECT_DISPOSED_EXCEPTION: &str = "System.ObjectDisposedException";
    /// The pending-operation handle returned by asynchronous disposal.
    pub const TASK: &str = "System.Threading.Tasks.Task";
    /// The continuation-registration method on [`TASK`].
    pub const CONTINUE_WITH: &str = "ContinueWith";
    /// The open generic callback type used to wrap the continuation.
    pub const ACTION_1: &str = "System.Action`1";

    /// Marker attribute identifying compiler-produced members and types.
    pub const COMPILER_GENERATED_ATTRIBUTE: &str =
        "System.Runtime.CompilerServices.CompilerGeneratedAttribute";
    /// Alternate tool-generated marker attribute.
    pub const GENERATED_CODE_ATTRIBUTE: &str = "System.CodeDom.Compiler.GeneratedCodeAttribute";
    /// Per-type directive exempting a type from all weaving phases.
    pub const SKIP_DISPOSE_GUARD_ATTRIBUTE: &str = "DotWeave.SkipDisposeGuardAttribute";
}
