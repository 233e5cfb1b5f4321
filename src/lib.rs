// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]

//! # dotweave
//!
//! A compile-time CIL bytecode weaver that injects object-disposed guards into
//! .NET disposable types.
//!
//! Given a module model — type definitions, per-method CIL instruction streams
//! and a table of external references — `dotweave` rewrites every concrete
//! class implementing a disposal contract so that:
//!
//! - each instance tracks its own disposed state in a synthesized private
//!   boolean field, exposed through a read-only `IsDisposed` property that
//!   chains along the inheritance hierarchy,
//! - `Dispose` marks the instance disposed; `DisposeAsync` marks it disposed
//!   only after the returned `Task` completes, via a registered continuation,
//! - every other public instance method is prefixed with a guard that throws
//!   `ObjectDisposedException` when the instance is already disposed.
//!
//! ## Quick Start
//!
//! ```rust
//! use dotweave::prelude::*;
//!
//! // Assemble (or receive from the host) the module under transformation.
//! let mut module = ModuleBuilder::new("App.dll").with_core_references().build();
//! let disposable = module.references().type_by_full_name(names::IDISPOSABLE).unwrap().token;
//!
//! let connection = TypeDefBuilder::new("App", "Connection")
//!     .implements(disposable)
//!     .build(&mut module);
//! MethodDefBuilder::new("Dispose")
//!     .implementation(|asm| { asm.ret()?; Ok(()) })
//!     .build(&mut module, connection)?;
//!
//! // Weave.
//! let report = Weaver::new().execute(&mut module)?;
//! assert_eq!(report.discovered, 1);
//!
//! // The type now tracks and exposes its disposed state.
//! let woven = module.type_def(connection).unwrap();
//! assert!(woven.field(names::DISPOSED_FIELD).is_some());
//! assert!(woven.property(names::DISPOSED_PROPERTY).is_some());
//! # Ok::<(), dotweave::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `dotweave` is organized into several key modules:
//!
//! - [`metadata`] - The in-memory module model: type definitions, members,
//!   external references, tokens and attribute words
//! - [`assembly`] - The instruction layer: opcodes, label-addressed method
//!   bodies, the fluent assembler and the canonical injected sequences
//! - [`analysis`] - Type-graph analysis: disposal-contract classification and
//!   ancestor-chain resolution
//! - [`weaver`] - The pipeline itself: discovery, validation, member
//!   synthesis, state-mutation and guard injection
//! - [`prelude`] - Convenient re-exports of the common surface
//!
//! ## Failure Model
//!
//! Every fatal condition carries an enumerated [`WeavingErrorCode`] and aborts
//! the entire run before (validation) or during (injection) mutation; there is
//! no retry and no partial-output contract. The host surfaces the code and the
//! rendered message verbatim as a build failure and discards the module on
//! failure.
//!
//! ## Skip Directive
//!
//! Types marked with the `DotWeave.SkipDisposeGuardAttribute` custom attribute
//! are exempt from every transformation phase.

#[macro_use]
pub(crate) mod error;

pub(crate) mod logging;

/// Type graph analysis over the module's inheritance chains.
pub mod analysis;

/// CIL instruction streams: representation, assembly and synthesis.
pub mod assembly;

/// The in-memory module model the weaver mutates.
pub mod metadata;

/// Convenient re-exports of the most commonly used types and traits.
pub mod prelude;

/// The weaving pipeline: discovery, validation, synthesis and injection.
pub mod weaver;

/// `dotweave` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is
/// always [`Error`]. Used consistently throughout the crate for all fallible
/// operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `dotweave` Error type
///
/// The main error type for all operations in this crate. Weaving-rule
/// violations carry an enumerated [`WeavingErrorCode`] via [`Error::code`].
pub use error::Error;

/// Enumerated weaving failure codes surfaced to the host.
pub use error::WeavingErrorCode;

/// Host-injected debug/info/warning/error log sinks.
pub use logging::WeaveLogger;

/// The top-level driver of the weaving pipeline.
pub use weaver::{WeaveReport, Weaver};
