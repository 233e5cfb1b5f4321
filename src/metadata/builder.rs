//! Fluent construction of input modules.
//!
//! Hosts (and tests) assemble the module model through these builders before
//! handing it to the weaver. Each builder collects a definition and commits
//! it to a [`Module`] in `build`, receiving the module-assigned token back.
//!
//! # Examples
//!
//! ```rust
//! use dotweave::metadata::{ModuleBuilder, TypeDefBuilder, MethodDefBuilder, TypeSignature};
//!
//! let mut module = ModuleBuilder::new("App.dll").with_core_references().build();
//! let disposable = module.references().type_by_full_name("System.IDisposable").unwrap().token;
//!
//! let ty = TypeDefBuilder::new("App", "Connection")
//!     .implements(disposable)
//!     .build(&mut module);
//!
//! MethodDefBuilder::new("Dispose")
//!     .returns(TypeSignature::Void)
//!     .implementation(|asm| {
//!         asm.ret()?;
//!         Ok(())
//!     })
//!     .build(&mut module, ty)?;
//! # Ok::<(), dotweave::Error>(())
//! ```

use crate::assembly::{InstructionAssembler, MethodBody};
use crate::metadata::attributes::CustomAttribute;
use crate::metadata::flags::{FieldAttributes, MethodAttributes, TypeAttributes};
use crate::metadata::module::Module;
use crate::metadata::references::ReferenceTable;
use crate::metadata::signatures::TypeSignature;
use crate::metadata::token::Token;
use crate::metadata::typedef::{FieldDef, MethodDef, ParamDef, PropertyDef, TypeDef};
use crate::Result;

/// Type alias for method body implementation closures
type ImplementationFn = Box<dyn FnOnce(&mut InstructionAssembler) -> Result<()>>;

/// Builder for a [`Module`].
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    name: String,
    references: Option<ReferenceTable>,
}

impl ModuleBuilder {
    /// Starts a module with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        ModuleBuilder {
            name: name.into(),
            references: None,
        }
    }

    /// Seeds the module with the well-known framework reference surface
    /// ([`ReferenceTable::with_core`]).
    #[must_use]
    pub fn with_core_references(mut self) -> Self {
        self.references = Some(ReferenceTable::with_core());
        self
    }

    /// Uses the given reference table instead of an empty one.
    #[must_use]
    pub fn references(mut self, references: ReferenceTable) -> Self {
        self.references = Some(references);
        self
    }

    /// Produces the module.
    #[must_use]
    pub fn build(self) -> Module {
        Module::with_references(self.name, self.references.unwrap_or_default())
    }
}

/// Builder for a [`TypeDef`].
#[derive(Debug)]
pub struct TypeDefBuilder {
    namespace: String,
    name: String,
    flags: TypeAttributes,
    base: Option<Token>,
    interfaces: Vec<Token>,
    attributes: Vec<CustomAttribute>,
}

impl TypeDefBuilder {
    /// Starts a public concrete class definition.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        TypeDefBuilder {
            namespace: namespace.into(),
            name: name.into(),
            flags: TypeAttributes::PUBLIC | TypeAttributes::BEFORE_FIELD_INIT,
            base: None,
            interfaces: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Replaces the attribute word entirely.
    #[must_use]
    pub fn flags(mut self, flags: TypeAttributes) -> Self {
        self.flags = flags;
        self
    }

    /// Marks the type abstract.
    #[must_use]
    pub fn abstract_type(mut self) -> Self {
        self.flags |= TypeAttributes::ABSTRACT;
        self
    }

    /// Marks the type sealed.
    #[must_use]
    pub fn sealed(mut self) -> Self {
        self.flags |= TypeAttributes::SEALED;
        self
    }

    /// Marks the type as an interface.
    #[must_use]
    pub fn interface(mut self) -> Self {
        self.flags |= TypeAttributes::INTERFACE | TypeAttributes::ABSTRACT;
        self
    }

    /// Sets the base type (`TypeDef` or `TypeRef` token).
    #[must_use]
    pub fn base(mut self, base: Token) -> Self {
        self.base = Some(base);
        self
    }

    /// Adds a directly implemented interface.
    #[must_use]
    pub fn implements(mut self, interface: Token) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Attaches a custom attribute.
    #[must_use]
    pub fn attribute(mut self, attribute: CustomAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Commits the type to the module and returns its token.
    pub fn build(self, module: &mut Module) -> Token {
        let mut type_def = TypeDef::new(self.namespace, self.name, self.flags);
        type_def.base = self.base;
        type_def.interfaces = self.interfaces;
        type_def.custom_attributes = self.attributes;
        module.add_type(type_def)
    }
}

/// Builder for a [`FieldDef`].
#[derive(Debug)]
pub struct FieldBuilder {
    name: String,
    flags: FieldAttributes,
    signature: TypeSignature,
    attributes: Vec<CustomAttribute>,
}

impl FieldBuilder {
    /// Starts a private boolean instance field; adjust with the other
    /// methods as needed.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        FieldBuilder {
            name: name.into(),
            flags: FieldAttributes::PRIVATE,
            signature: TypeSignature::Boolean,
            attributes: Vec::new(),
        }
    }

    /// Replaces the attribute word entirely.
    #[must_use]
    pub fn flags(mut self, flags: FieldAttributes) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the field type.
    #[must_use]
    pub fn signature(mut self, signature: TypeSignature) -> Self {
        self.signature = signature;
        self
    }

    /// Attaches a custom attribute.
    #[must_use]
    pub fn attribute(mut self, attribute: CustomAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Commits the field to the given type and returns its token.
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeNotFound`] when the type token is unknown.
    pub fn build(self, module: &mut Module, type_token: Token) -> Result<Token> {
        let mut field = FieldDef::new(self.name, self.flags, self.signature);
        field.custom_attributes = self.attributes;
        module.add_field(type_token, field)
    }
}

/// Builder for a [`MethodDef`], including its body.
pub struct MethodDefBuilder {
    name: String,
    flags: MethodAttributes,
    return_type: TypeSignature,
    params: Vec<ParamDef>,
    attributes: Vec<CustomAttribute>,
    implementation: Option<ImplementationFn>,
}

impl MethodDefBuilder {
    /// Starts a public instance method returning void.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        MethodDefBuilder {
            name: name.into(),
            flags: MethodAttributes::PUBLIC | MethodAttributes::HIDE_BY_SIG,
            return_type: TypeSignature::Void,
            params: Vec::new(),
            attributes: Vec::new(),
            implementation: None,
        }
    }

    /// Replaces the attribute word entirely.
    #[must_use]
    pub fn flags(mut self, flags: MethodAttributes) -> Self {
        self.flags = flags;
        self
    }

    /// Makes the method virtual.
    #[must_use]
    pub fn virtual_method(mut self) -> Self {
        self.flags |= MethodAttributes::VIRTUAL;
        self
    }

    /// Makes the method virtual in a fresh vtable slot.
    #[must_use]
    pub fn virtual_new_slot(mut self) -> Self {
        self.flags |= MethodAttributes::VIRTUAL | MethodAttributes::NEW_SLOT;
        self
    }

    /// Makes the method static.
    #[must_use]
    pub fn static_method(mut self) -> Self {
        self.flags |= MethodAttributes::STATIC;
        self
    }

    /// Sets the member-access sub-field to private.
    #[must_use]
    pub fn private(mut self) -> Self {
        self.flags -= MethodAttributes::MEMBER_ACCESS_MASK;
        self.flags |= MethodAttributes::PRIVATE;
        self
    }

    /// Sets the return type.
    #[must_use]
    pub fn returns(mut self, return_type: TypeSignature) -> Self {
        self.return_type = return_type;
        self
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, signature: TypeSignature) -> Self {
        self.params.push(ParamDef::new(name, signature));
        self
    }

    /// Attaches a custom attribute.
    #[must_use]
    pub fn attribute(mut self, attribute: CustomAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Provides the method body as an assembler closure. Methods built
    /// without an implementation have no body (abstract or extern).
    #[must_use]
    pub fn implementation<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut InstructionAssembler) -> Result<()> + 'static,
    {
        self.implementation = Some(Box::new(f));
        self
    }

    /// Commits the method to the given type and returns its token.
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeNotFound`] when the type token is unknown,
    /// or an assembly error from the implementation closure.
    pub fn build(self, module: &mut Module, type_token: Token) -> Result<Token> {
        let mut method = MethodDef::new(self.name, self.flags, self.return_type);
        method.params = self.params;
        method.custom_attributes = self.attributes;
        if let Some(implementation) = self.implementation {
            method.body = Some(MethodBody::build(implementation)?);
        }
        module.add_method(type_token, method)
    }
}

impl std::fmt::Debug for MethodDefBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDefBuilder")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("return_type", &self.return_type)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Builds a read-only property backed by an existing getter method.
///
/// # Errors
/// Returns [`crate::Error::TypeNotFound`] when the type token is unknown.
pub fn build_property(
    module: &mut Module,
    type_token: Token,
    name: impl Into<String>,
    property_type: TypeSignature,
    getter: Token,
) -> Result<Token> {
    let mut property = PropertyDef::new(name, property_type);
    property.getter = Some(getter);
    module.add_property(type_token, property)
}
