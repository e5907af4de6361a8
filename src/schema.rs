//! Optional schema resolver adapter (C9).
//!
//! The DN and filter parsers produce a fully structural result without any
//! schema; a [`SchemaResolver`] is an optional, caller-supplied capability
//! that upgrades that structural result with semantic type information. Per
//! the two-stage model in the Design Notes, parsing never stores a resolver
//! inside the parsed value — it's passed in by reference at the point of
//! use and then forgotten.

/// Upgrades attribute types and values with schema-derived semantics.
///
/// Implementors typically back this with a loaded schema repository; the
/// codec itself never interprets attribute values and has no default
/// implementation beyond "every attribute is known" (see
/// [`PermissiveResolver`]).
pub trait SchemaResolver {
    /// Whether the schema defines this attribute type (by name or OID).
    fn knows_attribute(&self, attribute_type: &str) -> bool;

    /// The attribute's OID, if the schema canonicalizes names to OIDs.
    fn canonical_oid(&self, attribute_type: &str) -> Option<String> {
        let _ = attribute_type;
        None
    }

    /// Whether two values of this attribute are equal under its equality
    /// matching rule. Falls back to byte-exact comparison when the
    /// attribute's matching rule isn't modeled by this resolver.
    fn values_equal(&self, attribute_type: &str, a: &str, b: &str) -> bool {
        let _ = attribute_type;
        a == b
    }
}

/// A resolver that treats every attribute as known and every comparison as
/// byte-exact; useful as a default when no real schema is available but a
/// `&dyn SchemaResolver` is required by an API.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveResolver;

impl SchemaResolver for PermissiveResolver {
    fn knows_attribute(&self, _attribute_type: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissive_resolver_knows_everything() {
        let r = PermissiveResolver;
        assert!(r.knows_attribute("cn"));
        assert!(r.values_equal("cn", "Foo", "Foo"));
        assert!(!r.values_equal("cn", "Foo", "foo"));
    }
}
