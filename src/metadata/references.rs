//! External references: everything the module uses from other assemblies.
//!
//! The reference table is owned by the [`crate::metadata::Module`] and plays
//! the role of the resolved view over referenced assemblies: external types
//! (with as much of their shape as the host resolved — base links, interface
//! lists, members), member references, and constructed generic type specs.
//!
//! All import operations are find-or-add, so repeated imports of the same
//! reference return the same token. This is the per-run reference cache; no
//! ambient global import service exists.

use crate::metadata::flags::{MethodAttributes, TypeAttributes};
use crate::metadata::names;
use crate::metadata::signatures::{MethodSignature, TypeSignature};
use crate::metadata::token::{TableId, Token};
use crate::Result;

/// A property exposed by an external type, as far as the weaver needs it:
/// its name and the member reference of its getter.
#[derive(Debug, Clone)]
pub struct ExternalProperty {
    /// Property name
    pub name: String,
    /// `MemberRef` token of the getter
    pub getter: Token,
}

/// A type defined in another assembly, resolved to the shape the weaver
/// walks: identity, base link, implemented interfaces and known members.
#[derive(Debug, Clone)]
pub struct ExternalType {
    /// `TypeRef` token of this entry
    pub token: Token,
    /// Namespace of the type
    pub namespace: String,
    /// Simple name of the type
    pub name: String,
    /// Attribute word, as resolved by the host
    pub flags: TypeAttributes,
    /// `TypeRef` token of the base type, when resolved
    pub base: Option<Token>,
    /// Full names of the interfaces this type implements, when resolved
    pub interfaces: Vec<String>,
    /// `MemberRef` tokens of the methods known on this type
    pub methods: Vec<Token>,
    /// Properties known on this type
    pub properties: Vec<ExternalProperty>,
}

impl ExternalType {
    /// The namespace-qualified name of the type.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

/// A reference to a member of an external or constructed type.
#[derive(Debug, Clone)]
pub struct MemberRef {
    /// `MemberRef` token of this entry
    pub token: Token,
    /// Member name
    pub name: String,
    /// Declaring type: a `TypeRef` or `TypeSpec` token
    pub declaring: Token,
    /// The member's method signature
    pub signature: MethodSignature,
    /// Attribute word, as resolved by the host
    pub flags: MethodAttributes,
}

/// A constructed type signature registered in the module, used as the
/// declaring type of members on generic instantiations.
#[derive(Debug, Clone)]
pub struct TypeSpec {
    /// `TypeSpec` token of this entry
    pub token: Token,
    /// The constructed signature
    pub signature: TypeSignature,
}

/// The module's table of external types, member references and type specs.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    types: Vec<ExternalType>,
    members: Vec<MemberRef>,
    specs: Vec<TypeSpec>,
}

impl ReferenceTable {
    /// Creates an empty reference table.
    #[must_use]
    pub fn new() -> Self {
        ReferenceTable::default()
    }

    /// Creates a reference table seeded with the well-known framework surface
    /// a host module resolves for the weaver: `System.Object`, the disposal
    /// contracts, `ObjectDisposedException`, `Task` with `ContinueWith`,
    /// the open generic callback type, the generated-code markers and the
    /// skip directive.
    #[must_use]
    pub fn with_core() -> Self {
        let mut table = ReferenceTable::new();

        table.import_type("System", "Object");

        let disposable = table.import_type("System", "IDisposable");
        table.mark_interface(disposable);
        let async_disposable = table.import_type("System", "IAsyncDisposable");
        table.mark_interface(async_disposable);

        let exception = table.import_type("System", "ObjectDisposedException");
        table.import_member(
            exception,
            names::CTOR,
            MethodSignature::instance(TypeSignature::Void, vec![TypeSignature::String]),
            MethodAttributes::PUBLIC
                | MethodAttributes::HIDE_BY_SIG
                | MethodAttributes::SPECIAL_NAME
                | MethodAttributes::RT_SPECIAL_NAME,
        );

        let task = table.import_type("System.Threading.Tasks", "Task");
        let action = table.import_type("System", "Action`1");
        table.import_member(
            action,
            names::CTOR,
            MethodSignature::instance(
                TypeSignature::Void,
                vec![TypeSignature::Object, TypeSignature::IntPtr],
            ),
            MethodAttributes::PUBLIC
                | MethodAttributes::HIDE_BY_SIG
                | MethodAttributes::SPECIAL_NAME
                | MethodAttributes::RT_SPECIAL_NAME,
        );
        table.import_member(
            task,
            names::CONTINUE_WITH,
            MethodSignature::instance(
                TypeSignature::Class(task),
                vec![TypeSignature::GenericInstance {
                    definition: action,
                    args: vec![TypeSignature::Class(task)],
                }],
            ),
            MethodAttributes::PUBLIC | MethodAttributes::HIDE_BY_SIG,
        );

        let generated = table.import_type("System.Runtime.CompilerServices", "CompilerGeneratedAttribute");
        table.import_member(
            generated,
            names::CTOR,
            MethodSignature::instance(TypeSignature::Void, vec![]),
            MethodAttributes::PUBLIC
                | MethodAttributes::HIDE_BY_SIG
                | MethodAttributes::SPECIAL_NAME
                | MethodAttributes::RT_SPECIAL_NAME,
        );
        table.import_type("System.CodeDom.Compiler", "GeneratedCodeAttribute");

        let skip = table.import_type("DotWeave", "SkipDisposeGuardAttribute");
        table.import_member(
            skip,
            names::CTOR,
            MethodSignature::instance(TypeSignature::Void, vec![]),
            MethodAttributes::PUBLIC
                | MethodAttributes::HIDE_BY_SIG
                | MethodAttributes::SPECIAL_NAME
                | MethodAttributes::RT_SPECIAL_NAME,
        );

        table
    }

    /// Finds or adds an external type and returns its `TypeRef` token.
    pub fn import_type(&mut self, namespace: &str, name: &str) -> Token {
        if let Some(existing) = self
            .types
            .iter()
            .find(|t| t.namespace == namespace && t.name == name)
        {
            return existing.token;
        }

        let row = u32::try_from(self.types.len() + 1).unwrap_or(u32::MAX);
        let token = Token::from_table(TableId::TypeRef, row);
        self.types.push(ExternalType {
            token,
            namespace: namespace.to_string(),
            name: name.to_string(),
            flags: TypeAttributes::PUBLIC,
            base: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
        });
        token
    }

    fn mark_interface(&mut self, token: Token) {
        if let Some(ty) = self.external_type_mut(token) {
            ty.flags |= TypeAttributes::INTERFACE | TypeAttributes::ABSTRACT;
        }
    }

    /// Looks up an external type by token.
    #[must_use]
    pub fn external_type(&self, token: Token) -> Option<&ExternalType> {
        if !token.is_table(TableId::TypeRef) {
            return None;
        }
        self.types.get(token.row().checked_sub(1)? as usize)
    }

    /// Looks up an external type by token, mutably.
    pub fn external_type_mut(&mut self, token: Token) -> Option<&mut ExternalType> {
        if !token.is_table(TableId::TypeRef) {
            return None;
        }
        self.types.get_mut(token.row().checked_sub(1)? as usize)
    }

    /// Looks up an external type by its namespace-qualified name.
    #[must_use]
    pub fn type_by_full_name(&self, full_name: &str) -> Option<&ExternalType> {
        self.types.iter().find(|t| t.full_name() == full_name)
    }

    /// All external types known to the module.
    #[must_use]
    pub fn types(&self) -> &[ExternalType] {
        &self.types
    }

    /// Finds or adds a member reference on the given declaring type (a
    /// `TypeRef` or `TypeSpec` token) and returns its token.
    pub fn import_member(
        &mut self,
        declaring: Token,
        name: &str,
        signature: MethodSignature,
        flags: MethodAttributes,
    ) -> Token {
        if let Some(existing) = self
            .members
            .iter()
            .find(|m| m.declaring == declaring && m.name == name && m.signature == signature)
        {
            return existing.token;
        }

        let row = u32::try_from(self.members.len() + 1).unwrap_or(u32::MAX);
        let token = Token::from_table(TableId::MemberRef, row);
        self.members.push(MemberRef {
            token,
            name: name.to_string(),
            declaring,
            signature,
            flags,
        });

        if let Some(ty) = self.external_type_mut(declaring) {
            ty.methods.push(token);
        }
        token
    }

    /// Looks up a member reference by token.
    #[must_use]
    pub fn member(&self, token: Token) -> Option<&MemberRef> {
        if !token.is_table(TableId::MemberRef) {
            return None;
        }
        self.members.get(token.row().checked_sub(1)? as usize)
    }

    /// Finds a member reference by its declaring type's full name and the
    /// member name.
    #[must_use]
    pub fn find_member(&self, type_full_name: &str, member_name: &str) -> Option<&MemberRef> {
        let ty = self.type_by_full_name(type_full_name)?;
        ty.methods
            .iter()
            .filter_map(|token| self.member(*token))
            .find(|m| m.name == member_name)
    }

    /// Registers a property on an external type and returns the getter's
    /// member-reference token. Used by hosts that resolve already-woven base
    /// types from referenced assemblies.
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeNotFound`] when the type token is unknown.
    pub fn add_external_property(&mut self, type_token: Token, name: &str) -> Result<Token> {
        if self.external_type(type_token).is_none() {
            return Err(crate::Error::TypeNotFound(type_token));
        }

        let getter = self.import_member(
            type_token,
            &format!("get_{name}"),
            MethodSignature::instance(TypeSignature::Boolean, vec![]),
            MethodAttributes::FAMILY
                | MethodAttributes::HIDE_BY_SIG
                | MethodAttributes::SPECIAL_NAME
                | MethodAttributes::VIRTUAL,
        );

        let ty = self
            .external_type_mut(type_token)
            .ok_or(crate::Error::TypeNotFound(type_token))?;
        if !ty.properties.iter().any(|p| p.name == name) {
            ty.properties.push(ExternalProperty {
                name: name.to_string(),
                getter,
            });
        }
        Ok(getter)
    }

    /// Finds or adds a constructed type signature and returns its `TypeSpec`
    /// token.
    pub fn import_type_spec(&mut self, signature: TypeSignature) -> Token {
        if let Some(existing) = self.specs.iter().find(|s| s.signature == signature) {
            return existing.token;
        }

        let row = u32::try_from(self.specs.len() + 1).unwrap_or(u32::MAX);
        let token = Token::from_table(TableId::TypeSpec, row);
        self.specs.push(TypeSpec { token, signature });
        token
    }

    /// Looks up a type spec by token.
    #[must_use]
    pub fn type_spec(&self, token: Token) -> Option<&TypeSpec> {
        if !token.is_table(TableId::TypeSpec) {
            return None;
        }
        self.specs.get(token.row().checked_sub(1)? as usize)
    }

    /// Re-declares a member of an open generic type against an instantiation
    /// of that type, returning the member reference on the constructed type.
    ///
    /// The member keeps its name, signature and calling convention; only the
    /// declaring type changes to the generic instance.
    ///
    /// # Errors
    /// Returns [`crate::Error::MethodNotFound`] when the member token is
    /// unknown.
    pub fn make_host_instance_generic(
        &mut self,
        member: Token,
        args: &[TypeSignature],
    ) -> Result<Token> {
        let (name, declaring, signature, flags) = {
            let member = self
                .member(member)
                .ok_or(crate::Error::MethodNotFound(member))?;
            (
                member.name.clone(),
                member.declaring,
                member.signature.clone(),
                member.flags,
            )
        };

        let spec = self.import_type_spec(TypeSignature::GenericInstance {
            definition: declaring,
            args: args.to_vec(),
        });

        Ok(self.import_member(spec, &name, signature, flags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_type_is_idempotent() {
        let mut table = ReferenceTable::new();
        let first = table.import_type("System", "Object");
        let second = table.import_type("System", "Object");
        assert_eq!(first, second);
        assert_eq!(table.types().len(), 1);
        assert!(first.is_table(TableId::TypeRef));
    }

    #[test]
    fn test_import_member_is_idempotent() {
        let mut table = ReferenceTable::new();
        let exception = table.import_type("System", "ObjectDisposedException");
        let sig = MethodSignature::instance(TypeSignature::Void, vec![TypeSignature::String]);

        let first = table.import_member(exception, ".ctor", sig.clone(), MethodAttributes::PUBLIC);
        let second = table.import_member(exception, ".ctor", sig, MethodAttributes::PUBLIC);
        assert_eq!(first, second);

        let ty = table.external_type(exception).unwrap();
        assert_eq!(ty.methods.len(), 1);
    }

    #[test]
    fn test_find_member_by_full_name() {
        let table = ReferenceTable::with_core();
        let ctor = table
            .find_member("System.ObjectDisposedException", ".ctor")
            .expect("core table should carry the exception constructor");
        assert_eq!(ctor.signature.params, vec![TypeSignature::String]);
        assert!(ctor.signature.has_this);

        assert!(table.find_member("System.Missing", ".ctor").is_none());
    }

    #[test]
    fn test_with_core_surface() {
        let table = ReferenceTable::with_core();
        for full_name in [
            "System.Object",
            "System.IDisposable",
            "System.IAsyncDisposable",
            "System.ObjectDisposedException",
            "System.Threading.Tasks.Task",
            "System.Action`1",
            "System.Runtime.CompilerServices.CompilerGeneratedAttribute",
            "DotWeave.SkipDisposeGuardAttribute",
        ] {
            assert!(
                table.type_by_full_name(full_name).is_some(),
                "core table missing {full_name}"
            );
        }

        let disposable = table.type_by_full_name("System.IDisposable").unwrap();
        assert!(disposable.flags.is_interface());
    }

    #[test]
    fn test_make_host_instance_generic() {
        let mut table = ReferenceTable::with_core();
        let action_ctor = table
            .find_member("System.Action`1", ".ctor")
            .unwrap()
            .token;
        let task = table.type_by_full_name("System.Threading.Tasks.Task").unwrap().token;

        let instance_ctor = table
            .make_host_instance_generic(action_ctor, &[TypeSignature::Class(task)])
            .expect("instantiation should succeed");
        assert_ne!(instance_ctor, action_ctor);

        let member = table.member(instance_ctor).unwrap();
        assert!(member.declaring.is_table(TableId::TypeSpec));
        assert_eq!(member.name, ".ctor");

        let spec = table.type_spec(member.declaring).unwrap();
        match &spec.signature {
            TypeSignature::GenericInstance { args, .. } => {
                assert_eq!(args.as_slice(), [TypeSignature::Class(task)]);
            }
            other => panic!("expected generic instance, got {other:?}"),
        }

        // Instantiating twice yields the same member reference.
        let again = table
            .make_host_instance_generic(action_ctor, &[TypeSignature::Class(task)])
            .unwrap();
        assert_eq!(instance_ctor, again);
    }

    #[test]
    fn test_add_external_property() {
        let mut table = ReferenceTable::new();
        let base = table.import_type("Lib", "DisposableBase");
        let getter = table
            .add_external_property(base, "IsDisposed")
            .expect("property registration should succeed");

        let ty = table.external_type(base).unwrap();
        assert_eq!(ty.properties.len(), 1);
        assert_eq!(ty.properties[0].name, "IsDisposed");
        assert_eq!(ty.properties[0].getter, getter);

        let member = table.member(getter).unwrap();
        assert_eq!(member.name, "get_IsDisposed");
        assert!(member.flags.is_virtual());
    }

    #[test]
    fn test_unknown_tokens_resolve_to_none() {
        let table = ReferenceTable::new();
        assert!(table.external_type(Token::new(0x01000005)).is_none());
        assert!(table.member(Token::new(0x0A000005)).is_none());
        assert!(table.type_spec(Token::new(0x1B000005)).is_none());
        // Wrong table entirely
        assert!(table.external_type(Token::new(0x02000001)).is_none());
    }
}
