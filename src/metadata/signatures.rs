//! Type and method signatures for the shapes the weaver manipulates.
//!
//! This is a deliberately small signature model: the weaver only ever reads
//! and writes booleans, strings, object references, function pointers and
//! constructed generic instances of external types, so the full ECMA-335
//! signature grammar is not represented.

use std::fmt;

use crate::metadata::token::Token;

/// A type signature as used by fields, parameters, return types and
/// constructed generic arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSignature {
    /// No value (method return only)
    Void,
    /// `System.Boolean`
    Boolean,
    /// `System.Int32`
    I4,
    /// `System.String`
    String,
    /// `System.Object`
    Object,
    /// Native integer, the type of a loaded function pointer
    IntPtr,
    /// A class reference identified by a `TypeDef` or `TypeRef` token
    Class(Token),
    /// A generic instantiation of a class reference
    GenericInstance {
        /// Token of the open generic type (`TypeRef`)
        definition: Token,
        /// The generic arguments, in declaration order
        args: Vec<TypeSignature>,
    },
}

impl TypeSignature {
    /// Returns true for the void signature.
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, TypeSignature::Void)
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSignature::Void => f.write_str("void"),
            TypeSignature::Boolean => f.write_str("bool"),
            TypeSignature::I4 => f.write_str("int32"),
            TypeSignature::String => f.write_str("string"),
            TypeSignature::Object => f.write_str("object"),
            TypeSignature::IntPtr => f.write_str("native int"),
            TypeSignature::Class(token) => write!(f, "class {token}"),
            TypeSignature::GenericInstance { definition, args } => {
                write!(f, "class {definition}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
        }
    }
}

/// A method signature: calling convention (instance or static), return type
/// and parameter types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    /// Whether the method takes an implicit `this` argument
    pub has_this: bool,
    /// The return type
    pub return_type: TypeSignature,
    /// The declared parameter types, excluding `this`
    pub params: Vec<TypeSignature>,
}

impl MethodSignature {
    /// Builds an instance-method signature.
    #[must_use]
    pub fn instance(return_type: TypeSignature, params: Vec<TypeSignature>) -> Self {
        MethodSignature {
            has_this: true,
            return_type,
            params,
        }
    }

    /// Builds a static-method signature.
    #[must_use]
    pub fn static_method(return_type: TypeSignature, params: Vec<TypeSignature>) -> Self {
        MethodSignature {
            has_this: false,
            return_type,
            params,
        }
    }

    /// Number of stack slots an invocation pops: declared parameters plus
    /// `this` for instance methods.
    #[must_use]
    pub fn pop_count(&self) -> u8 {
        let declared = u8::try_from(self.params.len()).unwrap_or(u8::MAX);
        if self.has_this {
            declared.saturating_add(1)
        } else {
            declared
        }
    }

    /// Number of stack slots an invocation pushes: one unless the return type
    /// is void.
    #[must_use]
    pub fn push_count(&self) -> u8 {
        u8::from(!self.return_type.is_void())
    }
}
