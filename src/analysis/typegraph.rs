//! Ancestor-chain analysis over the module's type graph.
//!
//! All resolution here is an explicit walk over base links — from the
//! most-derived type upward, crossing from module-owned definitions into the
//! external reference table when a chain leaves the module. Nothing is
//! cached: a [`TypeGraph`] is a cheap borrowing view, created fresh whenever
//! analysis is needed so answers never go stale across mutation.

use crate::metadata::flags::MethodAttributes;
use crate::metadata::module::Module;
use crate::metadata::names;
use crate::metadata::token::{TableId, Token};
use crate::metadata::typedef::TypeDef;

/// Ancestor walks stop after this many levels; real inheritance chains are
/// orders of magnitude shorter, so hitting the cap means a cyclic base link.
const MAX_CHAIN: usize = 256;

/// The resolved getter of a disposed-state property found on an ancestor.
#[derive(Debug, Clone)]
pub struct BasePropertyGetter {
    /// Token of the getter (`MethodDef` for module-owned ancestors,
    /// `MemberRef` for external ones)
    pub getter: Token,
    /// Full name of the ancestor declaring the property
    pub declaring_type: String,
}

/// An overridable dispose method found on an ancestor.
#[derive(Debug, Clone)]
pub struct BaseDisposeMethod {
    /// Token of the method (`MethodDef` or `MemberRef`)
    pub method: Token,
    /// Full name of the ancestor declaring the method
    pub declaring_type: String,
}

/// A borrowing analysis view over a [`Module`]'s type graph.
pub struct TypeGraph<'a> {
    module: &'a Module,
}

impl<'a> TypeGraph<'a> {
    /// Creates a view over the given module.
    #[must_use]
    pub fn new(module: &'a Module) -> Self {
        TypeGraph { module }
    }

    fn base_of(&self, token: Token) -> Option<Token> {
        match token.table_id() {
            Some(TableId::TypeDef) => self.module.type_def(token)?.base,
            Some(TableId::TypeRef) => self.module.references().external_type(token)?.base,
            _ => None,
        }
    }

    /// The ancestor chain of a type, most-derived first, excluding the type
    /// itself.
    fn ancestors(&self, token: Token) -> impl Iterator<Item = Token> + '_ {
        let mut current = self.base_of(token);
        let mut remaining = MAX_CHAIN;
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            let next = current?;
            current = self.base_of(next);
            Some(next)
        })
    }

    /// Full names of the interfaces a type declares directly.
    fn declared_interfaces(&self, token: Token) -> Vec<String> {
        match token.table_id() {
            Some(TableId::TypeDef) => match self.module.type_def(token) {
                Some(ty) => ty
                    .interfaces
                    .iter()
                    .filter_map(|i| self.module.type_full_name(*i))
                    .collect(),
                None => Vec::new(),
            },
            Some(TableId::TypeRef) => match self.module.references().external_type(token) {
                Some(ty) => ty.interfaces.clone(),
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    fn declares_contract(&self, token: Token, matches: impl Fn(&str) -> bool) -> bool {
        self.declared_interfaces(token).iter().any(|n| matches(n))
    }

    fn implements_contract(&self, token: Token, matches: impl Fn(&str) -> bool + Copy) -> bool {
        if self.declares_contract(token, matches) {
            return true;
        }
        self.ancestors(token)
            .any(|ancestor| self.declares_contract(ancestor, matches))
    }

    /// Whether the type, or any ancestor, declares the synchronous disposal
    /// contract. Matched by full name.
    #[must_use]
    pub fn implements_sync_disposal(&self, token: Token) -> bool {
        self.implements_contract(token, |name| name == names::IDISPOSABLE)
    }

    /// Whether the type, or any ancestor, declares the asynchronous disposal
    /// contract. Matched by simple name: the contract predates a canonical
    /// namespace, so host code may declare it anywhere.
    #[must_use]
    pub fn implements_async_disposal(&self, token: Token) -> bool {
        self.implements_contract(token, |name| simple_name(name) == names::IASYNC_DISPOSABLE)
    }

    /// Whether the type itself declares the disposed-state backing field.
    /// Ancestors are never consulted: a chain shares the nearest field
    /// through the property chain instead of duplicating it.
    #[must_use]
    pub fn has_own_disposed_field(&self, token: Token) -> bool {
        self.module
            .type_def(token)
            .is_some_and(|ty| ty.field(names::DISPOSED_FIELD).is_some())
    }

    /// When the type declares a disposed-state field the weaver cannot reuse,
    /// describes why. A reusable field is exactly a private instance boolean.
    #[must_use]
    pub fn own_disposed_field_incompatibility(&self, token: Token) -> Option<String> {
        let field = self.module.type_def(token)?.field(names::DISPOSED_FIELD)?;
        if field.signature != crate::metadata::signatures::TypeSignature::Boolean {
            return Some(format!("its type is '{}', expected 'bool'", field.signature));
        }
        if !field.flags.is_private() || field.flags.is_static() {
            return Some("it must be a private instance field".to_string());
        }
        None
    }

    /// Whether the type itself declares the disposed-state property.
    #[must_use]
    pub fn has_own_disposed_property(&self, token: Token) -> bool {
        self.module
            .type_def(token)
            .is_some_and(|ty| ty.property(names::DISPOSED_PROPERTY).is_some())
    }

    /// Walks strictly the ancestor chain (excluding the type itself) for the
    /// nearest disposed-state property and returns its getter.
    #[must_use]
    pub fn nearest_ancestor_disposed_property(&self, token: Token) -> Option<BasePropertyGetter> {
        for ancestor in self.ancestors(token) {
            match ancestor.table_id() {
                Some(TableId::TypeDef) => {
                    if let Some(ty) = self.module.type_def(ancestor) {
                        if let Some(property) = ty.property(names::DISPOSED_PROPERTY) {
                            if let Some(getter) = property.getter {
                                return Some(BasePropertyGetter {
                                    getter,
                                    declaring_type: ty.full_name(),
                                });
                            }
                        }
                    }
                }
                Some(TableId::TypeRef) => {
                    if let Some(ty) = self.module.references().external_type(ancestor) {
                        if let Some(property) = ty
                            .properties
                            .iter()
                            .find(|p| p.name == names::DISPOSED_PROPERTY)
                        {
                            return Some(BasePropertyGetter {
                                getter: property.getter,
                                declaring_type: ty.full_name(),
                            });
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Walks the ancestor chain for the nearest dispose-shaped method a
    /// derived type can override: virtual, non-final, non-private.
    #[must_use]
    pub fn nearest_overridable_dispose(
        &self,
        token: Token,
        method_name: &str,
    ) -> Option<BaseDisposeMethod> {
        let overridable = |flags: MethodAttributes| {
            flags.is_virtual() && !flags.is_final() && !flags.is_private()
        };

        for ancestor in self.ancestors(token) {
            match ancestor.table_id() {
                Some(TableId::TypeDef) => {
                    if let Some(ty) = self.module.type_def(ancestor) {
                        if let Some(method) =
                            ty.methods.iter().find(|m| m.name == method_name && overridable(m.flags))
                        {
                            return Some(BaseDisposeMethod {
                                method: method.token,
                                declaring_type: ty.full_name(),
                            });
                        }
                    }
                }
                Some(TableId::TypeRef) => {
                    if let Some(ty) = self.module.references().external_type(ancestor) {
                        let found = ty.methods.iter().find_map(|member_token| {
                            let member = self.module.references().member(*member_token)?;
                            (member.name == method_name && overridable(member.flags))
                                .then_some(member.token)
                        });
                        if let Some(method) = found {
                            return Some(BaseDisposeMethod {
                                method,
                                declaring_type: ty.full_name(),
                            });
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Number of ancestors above the type. Used to order processing
    /// base-before-derived.
    #[must_use]
    pub fn inheritance_depth(&self, token: Token) -> usize {
        self.ancestors(token).count()
    }

    /// Resolves a `TypeDef` token to its definition, for callers that mix
    /// analysis with member inspection.
    #[must_use]
    pub fn type_def(&self, token: Token) -> Option<&TypeDef> {
        self.module.type_def(token)
    }
}

fn simple_name(full_name: &str) -> &str {
    match full_name.rfind('.') {
        Some(index) => &full_name[index + 1..],
        None => full_name,
    }
}
