//! Search filter parsing and serialization ([RFC 4515]).
//!
//! [RFC 4515]: https://tools.ietf.org/html/rfc4515

mod parser;

use std::borrow::Cow;

pub use parser::FilterError;

use crate::schema::SchemaResolver;

/// A parsed RFC 4515 search filter expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Equality(String, String),
    Substring {
        attr: String,
        initial: Option<String>,
        any: Vec<String>,
        final_: Option<String>,
    },
    Greater(String, String),
    Less(String, String),
    Approx(String, String),
    Presence(String),
    Extensible {
        attr: Option<String>,
        matching_rule: Option<String>,
        value: String,
        dn_attributes: bool,
    },
    /// Sentinel produced when schema resolution removes an unknown
    /// attribute; such a filter is unsatisfiable but not a parse error.
    Undefined,
}

impl Filter {
    /// Parses an RFC 4515 filter string.
    pub fn parse(input: &str) -> Result<Filter, FilterError> {
        parser::parse_filter_string(input)
    }

    /// Parses a filter, then replaces any leaf node referring to an attribute
    /// the schema doesn't know about with [`Filter::Undefined`], rather than
    /// failing the whole parse.
    pub fn parse_with_schema(
        input: &str,
        resolver: &dyn SchemaResolver,
    ) -> Result<Filter, FilterError> {
        let filter = Filter::parse(input)?;
        Ok(filter.resolve_schema(resolver))
    }

    fn resolve_schema(self, resolver: &dyn SchemaResolver) -> Filter {
        match self {
            Filter::And(children) => Filter::And(
                children
                    .into_iter()
                    .map(|c| c.resolve_schema(resolver))
                    .collect(),
            ),
            Filter::Or(children) => Filter::Or(
                children
                    .into_iter()
                    .map(|c| c.resolve_schema(resolver))
                    .collect(),
            ),
            Filter::Not(child) => Filter::Not(Box::new(child.resolve_schema(resolver))),
            Filter::Equality(attr, _)
            | Filter::Greater(attr, _)
            | Filter::Less(attr, _)
            | Filter::Approx(attr, _)
            | Filter::Presence(attr)
                if !resolver.knows_attribute(&attr) =>
            {
                Filter::Undefined
            }
            Filter::Substring { ref attr, .. } if !resolver.knows_attribute(attr) => {
                Filter::Undefined
            }
            other => other,
        }
    }

    /// Re-emits the filter in RFC 4515 prefix form.
    pub fn to_rfc4515(&self) -> String {
        let mut out = String::new();
        self.write_rfc4515(&mut out);
        out
    }

    fn write_rfc4515(&self, out: &mut String) {
        match self {
            Filter::And(children) => {
                out.push_str("(&");
                for c in children {
                    c.write_rfc4515(out);
                }
                out.push(')');
            }
            Filter::Or(children) => {
                out.push_str("(|");
                for c in children {
                    c.write_rfc4515(out);
                }
                out.push(')');
            }
            Filter::Not(child) => {
                out.push_str("(!");
                child.write_rfc4515(out);
                out.push(')');
            }
            Filter::Equality(attr, value) => {
                out.push('(');
                out.push_str(attr);
                out.push('=');
                out.push_str(&escape(value));
                out.push(')');
            }
            Filter::Substring {
                attr,
                initial,
                any,
                final_,
            } => {
                out.push('(');
                out.push_str(attr);
                out.push('=');
                if let Some(initial) = initial {
                    out.push_str(&escape(initial));
                }
                out.push('*');
                for a in any {
                    out.push_str(&escape(a));
                    out.push('*');
                }
                if let Some(final_) = final_ {
                    out.push_str(&escape(final_));
                }
                out.push(')');
            }
            Filter::Greater(attr, value) => {
                out.push('(');
                out.push_str(attr);
                out.push_str(">=");
                out.push_str(&escape(value));
                out.push(')');
            }
            Filter::Less(attr, value) => {
                out.push('(');
                out.push_str(attr);
                out.push_str("<=");
                out.push_str(&escape(value));
                out.push(')');
            }
            Filter::Approx(attr, value) => {
                out.push('(');
                out.push_str(attr);
                out.push_str("~=");
                out.push_str(&escape(value));
                out.push(')');
            }
            Filter::Presence(attr) => {
                out.push('(');
                out.push_str(attr);
                out.push_str("=*)");
            }
            Filter::Extensible {
                attr,
                matching_rule,
                value,
                dn_attributes,
            } => {
                out.push('(');
                if let Some(attr) = attr {
                    out.push_str(attr);
                }
                if *dn_attributes {
                    out.push_str(":dn");
                }
                if let Some(rule) = matching_rule {
                    out.push(':');
                    out.push_str(rule);
                }
                out.push_str(":=");
                out.push_str(&escape(value));
                out.push(')');
            }
            Filter::Undefined => out.push_str("(!(objectClass=*))"),
        }
    }
}

/// Escapes `\`, `*`, `(`, `)` and NUL in an assertion value per RFC 4515.
fn escape(value: &str) -> Cow<'_, str> {
    #[inline]
    fn needs_escape(c: u8) -> bool {
        matches!(c, b'\\' | b'*' | b'(' | b')' | 0)
    }
    #[inline]
    fn xdigit(c: u8) -> u8 {
        c + if c < 10 { b'0' } else { b'a' - 10 }
    }

    let bytes = value.as_bytes();
    let mut out: Option<Vec<u8>> = None;
    for (i, &c) in bytes.iter().enumerate() {
        if needs_escape(c) {
            let buf = out.get_or_insert_with(|| Vec::from(&bytes[..i]));
            buf.push(b'\\');
            buf.push(xdigit(c >> 4));
            buf.push(xdigit(c & 0xF));
        } else if let Some(buf) = out.as_mut() {
            buf.push(c);
        }
    }
    match out {
        // Safety: every pushed byte is either copied verbatim from the
        // UTF-8-valid input or is one of `\` and a hex digit, all ASCII; no
        // multi-byte sequence is ever split.
        Some(bytes) => Cow::Owned(unsafe { String::from_utf8_unchecked(bytes) }),
        None => Cow::Borrowed(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_is_not_substring() {
        let f = Filter::parse("(objectClass=*)").unwrap();
        assert_eq!(f, Filter::Presence("objectClass".to_owned()));
    }

    #[test]
    fn and_or_substring_roundtrips() {
        let input = "(&(objectClass=person)(|(cn=a*)(cn=b*)))";
        let f = Filter::parse(input).unwrap();
        let reemitted = f.to_rfc4515();
        let reparsed = Filter::parse(&reemitted).unwrap();
        assert_eq!(f, reparsed);
    }
}
