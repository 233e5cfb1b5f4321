//! Convenient re-exports of the most commonly used types and traits.
//!
//! This module provides a curated selection of the most frequently used types
//! from across the dotweave library, allowing for convenient glob imports.
//!
//! # Example
//!
//! ```rust
//! use dotweave::prelude::*;
//!
//! let mut module = ModuleBuilder::new("App.dll").with_core_references().build();
//! let report = Weaver::new().execute(&mut module)?;
//! assert_eq!(report.discovered, 0);
//! # Ok::<(), dotweave::Error>(())
//! ```

pub use crate::error::{Error, WeavingErrorCode};
pub use crate::logging::WeaveLogger;
pub use crate::Result;

pub use crate::metadata::{
    names, CustomAttribute, FieldAttributes, FieldBuilder, FieldDef, MemberRef, MethodAttributes,
    MethodDef, MethodDefBuilder, MethodSignature, Module, ModuleBuilder, ParamDef,
    PropertyAttributes, PropertyDef, ReferenceTable, TableId, Token, TypeAttributes, TypeDef,
    TypeDefBuilder, TypeSignature,
};

pub use crate::assembly::{
    FlowType, Instruction, InstructionAssembler, MethodBody, OpCode, Operand, Snippet,
};

pub use crate::analysis::TypeGraph;

pub use crate::weaver::{
    DisposalKind, WeaveReport, Weaver, WeaverState, WellKnownReferences,
};
