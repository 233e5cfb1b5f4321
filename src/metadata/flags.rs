//! ECMA-335 attribute words for types, fields, methods and properties.
//!
//! The numeric values follow ECMA-335 II.23.1. Visibility is a masked
//! sub-field rather than independent bits, so each flags type exposes
//! accessor helpers that compare against the mask instead of testing bits
//! directly.

use bitflags::bitflags;

bitflags! {
    /// Type definition attributes, ECMA-335 II.23.1.15.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TypeAttributes: u32 {
        /// Visibility sub-field mask
        const VISIBILITY_MASK = 0x0000_0007;
        /// Type is visible outside the assembly
        const PUBLIC = 0x0000_0001;
        /// Class semantics sub-field: type is an interface
        const INTERFACE = 0x0000_0020;
        /// Type cannot be instantiated
        const ABSTRACT = 0x0000_0080;
        /// Type cannot be extended
        const SEALED = 0x0000_0100;
        /// Name is special, interpreted by tooling
        const SPECIAL_NAME = 0x0000_0400;
        /// Initialize the type before first static field access
        const BEFORE_FIELD_INIT = 0x0010_0000;
    }
}

impl TypeAttributes {
    /// Returns true for interface definitions.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.contains(TypeAttributes::INTERFACE)
    }

    /// Returns true for abstract types.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.contains(TypeAttributes::ABSTRACT)
    }

    /// Returns true for sealed types.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.contains(TypeAttributes::SEALED)
    }
}

bitflags! {
    /// Field attributes, ECMA-335 II.23.1.5.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FieldAttributes: u16 {
        /// Accessibility sub-field mask
        const FIELD_ACCESS_MASK = 0x0007;
        /// Accessible only within the declaring type
        const PRIVATE = 0x0001;
        /// Accessible within the declaring type and subtypes
        const FAMILY = 0x0004;
        /// Accessible everywhere
        const PUBLIC = 0x0006;
        /// Field is per-type rather than per-instance
        const STATIC = 0x0010;
        /// Field can only be initialized, not written after init
        const INIT_ONLY = 0x0020;
        /// Name is special, interpreted by tooling
        const SPECIAL_NAME = 0x0200;
    }
}

impl FieldAttributes {
    fn access(&self) -> u16 {
        self.bits() & FieldAttributes::FIELD_ACCESS_MASK.bits()
    }

    /// Returns true when the accessibility sub-field is `private`.
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.access() == FieldAttributes::PRIVATE.bits()
    }

    /// Returns true when the accessibility sub-field is `public`.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.access() == FieldAttributes::PUBLIC.bits()
    }

    /// Returns true for static fields.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.contains(FieldAttributes::STATIC)
    }
}

bitflags! {
    /// Method attributes, ECMA-335 II.23.1.10.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodAttributes: u16 {
        /// Accessibility sub-field mask
        const MEMBER_ACCESS_MASK = 0x0007;
        /// Accessible only within the declaring type
        const PRIVATE = 0x0001;
        /// Accessible within the declaring type and subtypes
        const FAMILY = 0x0004;
        /// Accessible everywhere
        const PUBLIC = 0x0006;
        /// Method is per-type rather than per-instance
        const STATIC = 0x0010;
        /// Method cannot be overridden
        const FINAL = 0x0020;
        /// Method participates in virtual dispatch
        const VIRTUAL = 0x0040;
        /// Method hides by name and signature
        const HIDE_BY_SIG = 0x0080;
        /// Method gets a new vtable slot (the alternative, reuse-slot, is the
        /// absence of this bit)
        const NEW_SLOT = 0x0100;
        /// Method has no implementation in this type
        const ABSTRACT = 0x0400;
        /// Name is special, interpreted by tooling (accessors, operators)
        const SPECIAL_NAME = 0x0800;
        /// Name is special, interpreted by the runtime (constructors)
        const RT_SPECIAL_NAME = 0x1000;
    }
}

impl MethodAttributes {
    fn access(&self) -> u16 {
        self.bits() & MethodAttributes::MEMBER_ACCESS_MASK.bits()
    }

    /// Returns true when the accessibility sub-field is `private`.
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.access() == MethodAttributes::PRIVATE.bits()
    }

    /// Returns true when the accessibility sub-field is `family` (protected).
    #[must_use]
    pub fn is_family(&self) -> bool {
        self.access() == MethodAttributes::FAMILY.bits()
    }

    /// Returns true when the accessibility sub-field is `public`.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.access() == MethodAttributes::PUBLIC.bits()
    }

    /// Returns true for static methods.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.contains(MethodAttributes::STATIC)
    }

    /// Returns true for virtual methods.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.contains(MethodAttributes::VIRTUAL)
    }

    /// Returns true for final (sealed) methods.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.contains(MethodAttributes::FINAL)
    }

    /// Returns true for abstract methods.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.contains(MethodAttributes::ABSTRACT)
    }
}

bitflags! {
    /// Property attributes, ECMA-335 II.23.1.14.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PropertyAttributes: u16 {
        /// Name is special, interpreted by tooling
        const SPECIAL_NAME = 0x0200;
        /// Name is special, interpreted by the runtime
        const RT_SPECIAL_NAME = 0x0400;
        /// Property has a default value
        const HAS_DEFAULT = 0x1000;
    }
}
