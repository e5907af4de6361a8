//! Distinguished Name parsing and normalization ([RFC 4514]).
//!
//! [RFC 4514]: https://tools.ietf.org/html/rfc4514

mod parser;

use std::borrow::Cow;
use std::fmt;

pub use parser::DnError;

use crate::schema::SchemaResolver;

/// An attribute value inside an [`Ava`].
///
/// A value parsed from a `#HHHH...` hex string is [`Value::Binary`]; every
/// other value is UTF-8 text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Binary(Vec<u8>),
}

/// An attribute/value assertion: one `type=value` pair inside an RDN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ava {
    pub attribute_type: String,
    pub value: Value,
}

/// A Relative Distinguished Name: an unordered set of [`Ava`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rdn {
    pub avas: Vec<Ava>,
}

/// A parsed Distinguished Name.
///
/// Both the user-provided form (`raw`, byte-preserving) and the normalized
/// form (lower-cased attribute types, canonically escaped values, stable
/// separators) are retained. Equality and ordering are defined on the
/// normalized form only.
#[derive(Debug, Clone)]
pub struct Dn {
    rdns: Vec<Rdn>,
    raw: String,
    normalized: String,
}

impl Dn {
    /// Parses a DN string per RFC 4514, computing its normalized form
    /// eagerly so repeated comparisons don't re-normalize.
    pub fn parse(input: &str) -> Result<Dn, DnError> {
        let rdns = parser::parse_dn(input)?;
        let normalized = normalize(&rdns);
        Ok(Dn {
            rdns,
            raw: input.to_owned(),
            normalized,
        })
    }

    /// The sequence of RDNs, outermost (leftmost) first.
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// The exact string this DN was parsed from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The canonical normalized form: lower-cased attribute types, minimally
    /// re-escaped values, `,` between RDNs and `+` between AVAs.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Whether two DNs denote the same entry, comparing normalized forms.
    pub fn equals(&self, other: &Dn) -> bool {
        self.normalized == other.normalized
    }

    /// Whether two DNs denote the same entry under schema-aware comparison
    /// (§4.5): attribute types are canonicalized to their OID and values are
    /// compared with the schema's equality matching rule rather than
    /// byte-for-byte, so e.g. `cn=Foo ` and `CN=foo` can compare equal when
    /// `cn`'s matching rule collapses trailing space and case.
    pub fn equals_with_schema(&self, other: &Dn, resolver: &dyn SchemaResolver) -> bool {
        if self.rdns.len() != other.rdns.len() {
            return false;
        }
        self.rdns
            .iter()
            .zip(&other.rdns)
            .all(|(a, b)| rdns_match(a, b, resolver))
    }

    /// True for the zero-RDN DN, which is a valid name for the root entry.
    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }
}

fn canonical_attr(resolver: &dyn SchemaResolver, attribute_type: &str) -> String {
    resolver
        .canonical_oid(attribute_type)
        .unwrap_or_else(|| attribute_type.to_ascii_lowercase())
}

fn ava_value_string(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        Value::Binary(bytes) => Cow::Owned(
            bytes
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect::<String>(),
        ),
    }
}

fn rdns_match(a: &Rdn, b: &Rdn, resolver: &dyn SchemaResolver) -> bool {
    if a.avas.len() != b.avas.len() {
        return false;
    }
    let mut remaining: Vec<&Ava> = b.avas.iter().collect();
    'outer: for ava_a in &a.avas {
        let attr_a = canonical_attr(resolver, &ava_a.attribute_type);
        for (i, ava_b) in remaining.iter().enumerate() {
            if canonical_attr(resolver, &ava_b.attribute_type) == attr_a
                && resolver.values_equal(
                    &attr_a,
                    &ava_value_string(&ava_a.value),
                    &ava_value_string(&ava_b.value),
                )
            {
                remaining.remove(i);
                continue 'outer;
            }
        }
        return false;
    }
    remaining.is_empty()
}

impl PartialEq for Dn {
    fn eq(&self, other: &Dn) -> bool {
        self.equals(other)
    }
}

impl Eq for Dn {}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

const SPECIAL_CHARS: &[u8] = b",=+<>#;\\\"";

fn needs_value_escape(c: u8) -> bool {
    SPECIAL_CHARS.contains(&c)
}

#[inline]
fn xdigit(c: u8) -> u8 {
    c + if c < 10 { b'0' } else { b'a' - 10 }
}

/// Escapes a DN attribute value for normalized-form serialization: the nine
/// RFC 4514 special characters, plus a leading/trailing space and a leading
/// `#`, are backslash-escaped; everything else passes through unchanged.
fn escape_value(value: &str) -> Cow<'_, str> {
    let bytes = value.as_bytes();
    let mut output: Option<Vec<u8>> = None;
    let last = bytes.len().saturating_sub(1);
    for (i, &c) in bytes.iter().enumerate() {
        let escape = needs_value_escape(c)
            || (c == b' ' && (i == 0 || i == last))
            || (c == b'#' && i == 0);
        if escape {
            let out = output.get_or_insert_with(|| Vec::from(&bytes[..i]));
            out.push(b'\\');
            if c == b' ' || c == b'#' {
                out.push(c);
            } else {
                out.push(xdigit(c >> 4));
                out.push(xdigit(c & 0xF));
            }
        } else if let Some(out) = output.as_mut() {
            out.push(c);
        }
    }
    match output {
        // Safety: every pushed byte is either copied verbatim from the
        // UTF-8-valid input or is one of `\`, a hex digit, ' ' or '#', all
        // ASCII; no multi-byte sequence is ever split.
        Some(bytes) => Cow::Owned(unsafe { String::from_utf8_unchecked(bytes) }),
        None => Cow::Borrowed(value),
    }
}

fn normalize_ava(ava: &Ava) -> (String, String) {
    let attr = ava.attribute_type.to_ascii_lowercase();
    let value = match &ava.value {
        Value::String(s) => escape_value(s).into_owned(),
        Value::Binary(bytes) => {
            let mut s = String::with_capacity(1 + bytes.len() * 2);
            s.push('#');
            for &b in bytes {
                s.push(xdigit(b >> 4) as char);
                s.push(xdigit(b & 0xF) as char);
            }
            s
        }
    };
    (attr, value)
}

fn normalize(rdns: &[Rdn]) -> String {
    let mut out = String::new();
    for (i, rdn) in rdns.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let mut pairs: Vec<(String, String)> = rdn.avas.iter().map(normalize_ava).collect();
        pairs.sort();
        for (j, (attr, value)) in pairs.into_iter().enumerate() {
            if j > 0 {
                out.push('+');
            }
            out.push_str(&attr);
            out.push('=');
            out.push_str(&value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_dn_is_valid() {
        let dn = Dn::parse("").unwrap();
        assert!(dn.is_empty());
        assert_eq!(dn.normalized(), "");
    }

    #[test]
    fn normalization_lowercases_sorts_and_trims() {
        let dn = Dn::parse("CN = Sales + CN =   J. Smith , O = Widget Inc. , C = US").unwrap();
        assert_eq!(
            dn.normalized(),
            "cn=J. Smith+cn=Sales,o=Widget Inc.,c=US"
        );
    }

    #[test]
    fn idempotent_normalization() {
        let dn = Dn::parse("uid=akarasulu,dc=example,dc=com").unwrap();
        let renormalized = Dn::parse(dn.normalized()).unwrap();
        assert_eq!(dn.normalized(), renormalized.normalized());
    }

    struct TrimmingCaseFoldResolver;

    impl SchemaResolver for TrimmingCaseFoldResolver {
        fn knows_attribute(&self, _attribute_type: &str) -> bool {
            true
        }

        fn values_equal(&self, _attribute_type: &str, a: &str, b: &str) -> bool {
            a.trim().eq_ignore_ascii_case(b.trim())
        }
    }

    #[test]
    fn schema_aware_equality_collapses_case_and_trailing_space() {
        let a = Dn::parse("cn=Foo ,dc=example,dc=com").unwrap();
        let b = Dn::parse("CN=foo,dc=example,dc=com").unwrap();
        assert!(!a.equals(&b));
        assert!(a.equals_with_schema(&b, &TrimmingCaseFoldResolver));
    }

    #[test]
    fn semicolon_separator_normalizes_to_comma() {
        let dn = Dn::parse("dc=example;dc=com").unwrap();
        assert_eq!(dn.normalized(), "dc=example,dc=com");
    }
}
