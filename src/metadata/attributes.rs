//! Custom attribute markers attached to types and members.
//!
//! The weaver only ever inspects attributes by their type name and attaches
//! the generated-code marker, so an attribute is represented by its
//! constructor token and the full name of its attribute type — no
//! constructor-argument blob is carried.

use crate::metadata::names;
use crate::metadata::token::Token;

/// A custom attribute instance: the constructor that would be invoked and the
/// full name of the attribute type it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomAttribute {
    /// Token of the attribute constructor (`MemberRef` or `MethodDef`)
    pub ctor: Token,
    /// Full name of the attribute type
    pub attribute_type: String,
}

impl CustomAttribute {
    /// Creates an attribute instance from a constructor token and the full
    /// name of its attribute type.
    #[must_use]
    pub fn new(ctor: Token, attribute_type: impl Into<String>) -> Self {
        CustomAttribute {
            ctor,
            attribute_type: attribute_type.into(),
        }
    }

    /// Creates the compiler-generated marker the weaver attaches to every
    /// member it synthesizes.
    #[must_use]
    pub fn compiler_generated(ctor: Token) -> Self {
        CustomAttribute::new(ctor, names::COMPILER_GENERATED_ATTRIBUTE)
    }

    /// The simple (unqualified) name of the attribute type.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        match self.attribute_type.rfind('.') {
            Some(index) => &self.attribute_type[index + 1..],
            None => &self.attribute_type,
        }
    }
}

/// Determines whether an attribute list marks its owner as generated by a
/// compiler or another tool.
///
/// Matches `CompilerGeneratedAttribute` and `GeneratedCodeAttribute` by
/// simple name, the way build tooling applies them from either the runtime
/// or the `System.CodeDom` namespace.
#[must_use]
pub fn is_generated(attributes: &[CustomAttribute]) -> bool {
    attributes.iter().any(|a| {
        let name = a.simple_name();
        name == "CompilerGeneratedAttribute" || name == "GeneratedCodeAttribute"
    })
}

/// Determines whether an attribute list carries the skip directive that
/// exempts a type from all weaving phases. Matched by full name.
#[must_use]
pub fn has_skip_marker(attributes: &[CustomAttribute]) -> bool {
    attributes
        .iter()
        .any(|a| a.attribute_type == names::SKIP_DISPOSE_GUARD_ATTRIBUTE)
}
