//! Definitions owned by the module: types and their fields, methods,
//! properties and parameters.

use crate::assembly::MethodBody;
use crate::metadata::attributes::{self, CustomAttribute};
use crate::metadata::flags::{FieldAttributes, MethodAttributes, PropertyAttributes, TypeAttributes};
use crate::metadata::names;
use crate::metadata::signatures::TypeSignature;
use crate::metadata::token::Token;

/// A method parameter: name and type.
#[derive(Debug, Clone)]
pub struct ParamDef {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub signature: TypeSignature,
}

impl ParamDef {
    /// Creates a parameter definition.
    #[must_use]
    pub fn new(name: impl Into<String>, signature: TypeSignature) -> Self {
        ParamDef {
            name: name.into(),
            signature,
        }
    }
}

/// An instance or static field declared by a type.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Field token, assigned by the module on insertion
    pub token: Token,
    /// Field name
    pub name: String,
    /// Attribute word
    pub flags: FieldAttributes,
    /// Field type
    pub signature: TypeSignature,
    /// Attributes attached to the field
    pub custom_attributes: Vec<CustomAttribute>,
}

impl FieldDef {
    /// Creates a field definition; the token is assigned when the field is
    /// added to a module.
    #[must_use]
    pub fn new(name: impl Into<String>, flags: FieldAttributes, signature: TypeSignature) -> Self {
        FieldDef {
            token: Token::new(0),
            name: name.into(),
            flags,
            signature,
            custom_attributes: Vec::new(),
        }
    }

    /// True when the field is marked as compiler- or tool-generated.
    #[must_use]
    pub fn is_generated(&self) -> bool {
        attributes::is_generated(&self.custom_attributes)
    }
}

/// A method declared by a type, with its body when one exists.
#[derive(Debug, Clone)]
pub struct MethodDef {
    /// Method token, assigned by the module on insertion
    pub token: Token,
    /// Method name
    pub name: String,
    /// Attribute word
    pub flags: MethodAttributes,
    /// Return type
    pub return_type: TypeSignature,
    /// Declared parameters, excluding `this`
    pub params: Vec<ParamDef>,
    /// The method's instruction stream; absent for abstract methods
    pub body: Option<MethodBody>,
    /// Attributes attached to the method
    pub custom_attributes: Vec<CustomAttribute>,
}

impl MethodDef {
    /// Creates a method definition; the token is assigned when the method is
    /// added to a module.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        flags: MethodAttributes,
        return_type: TypeSignature,
    ) -> Self {
        MethodDef {
            token: Token::new(0),
            name: name.into(),
            flags,
            return_type,
            params: Vec::new(),
            body: None,
            custom_attributes: Vec::new(),
        }
    }

    /// True for instance and static constructors.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == names::CTOR || self.name == names::CCTOR
    }

    /// True for the synchronous or asynchronous dispose method.
    #[must_use]
    pub fn is_dispose(&self) -> bool {
        self.name == names::DISPOSE_METHOD || self.name == names::DISPOSE_ASYNC_METHOD
    }

    /// True when the method is marked as compiler- or tool-generated.
    #[must_use]
    pub fn is_generated(&self) -> bool {
        attributes::is_generated(&self.custom_attributes)
    }
}

/// A property declared by a type. The weaver only synthesizes read-only
/// properties, so no setter link is modeled.
#[derive(Debug, Clone)]
pub struct PropertyDef {
    /// Property token, assigned by the module on insertion
    pub token: Token,
    /// Property name
    pub name: String,
    /// Attribute word
    pub flags: PropertyAttributes,
    /// Property type
    pub property_type: TypeSignature,
    /// `MethodDef` token of the getter, when one exists
    pub getter: Option<Token>,
    /// Attributes attached to the property
    pub custom_attributes: Vec<CustomAttribute>,
}

impl PropertyDef {
    /// Creates a property definition; the token is assigned when the property
    /// is added to a module.
    #[must_use]
    pub fn new(name: impl Into<String>, property_type: TypeSignature) -> Self {
        PropertyDef {
            token: Token::new(0),
            name: name.into(),
            flags: PropertyAttributes::empty(),
            property_type,
            getter: None,
            custom_attributes: Vec::new(),
        }
    }
}

/// A type defined by the module: identity, inheritance links and members.
///
/// The base link and interface list hold `TypeDef` tokens for types defined
/// in the same module and `TypeRef` tokens for external types, so ancestor
/// walks cross module boundaries without special-casing.
#[derive(Debug, Clone)]
pub struct TypeDef {
    /// Type token, assigned by the module on insertion
    pub token: Token,
    /// Namespace of the type
    pub namespace: String,
    /// Simple name of the type
    pub name: String,
    /// Attribute word
    pub flags: TypeAttributes,
    /// Base type link; `None` only for chain roots
    pub base: Option<Token>,
    /// Directly implemented interfaces
    pub interfaces: Vec<Token>,
    /// Fields declared by this type
    pub fields: Vec<FieldDef>,
    /// Methods declared by this type
    pub methods: Vec<MethodDef>,
    /// Properties declared by this type
    pub properties: Vec<PropertyDef>,
    /// Attributes attached to the type
    pub custom_attributes: Vec<CustomAttribute>,
}

impl TypeDef {
    /// Creates a type definition; the token is assigned when the type is
    /// added to a module.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        flags: TypeAttributes,
    ) -> Self {
        TypeDef {
            token: Token::new(0),
            namespace: namespace.into(),
            name: name.into(),
            flags,
            base: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            custom_attributes: Vec::new(),
        }
    }

    /// The namespace-qualified name of the type.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// True for concrete class definitions (not interfaces, not abstract).
    #[must_use]
    pub fn is_concrete_class(&self) -> bool {
        !self.flags.is_interface() && !self.flags.is_abstract()
    }

    /// Finds a declared field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Finds a declared method by name. When overloads exist the first
    /// declaration wins; the members the weaver resolves this way are not
    /// overloaded.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Finds a declared method by name, mutably.
    pub fn method_mut(&mut self, name: &str) -> Option<&mut MethodDef> {
        self.methods.iter_mut().find(|m| m.name == name)
    }

    /// Finds a declared method by its token.
    #[must_use]
    pub fn method_by_token(&self, token: Token) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.token == token)
    }

    /// Finds a declared method by its token, mutably.
    pub fn method_by_token_mut(&mut self, token: Token) -> Option<&mut MethodDef> {
        self.methods.iter_mut().find(|m| m.token == token)
    }

    /// Finds a declared property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// True when the type carries the skip directive.
    #[must_use]
    pub fn has_skip_marker(&self) -> bool {
        attributes::has_skip_marker(&self.custom_attributes)
    }

    /// True when the type is marked as compiler- or tool-generated.
    #[must_use]
    pub fn is_generated(&self) -> bool {
        attributes::is_generated(&self.custom_attributes)
    }
}
