//! Type graph analysis: disposal-contract classification and ancestor-chain
//! resolution.
//!
//! The analyzer answers, for any type in the module: does it (or any
//! ancestor) implement the synchronous or asynchronous disposal contract;
//! does it own a disposed-state field or property of its own; which ancestor
//! exposes the nearest disposed-state property getter; which ancestor
//! declares the nearest overridable dispose method. See
//! [`TypeGraph`] for the operations.

mod typegraph;

pub use typegraph::{BaseDisposeMethod, BasePropertyGetter, TypeGraph};
