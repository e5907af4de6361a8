//! Standard control codecs shipped with the registry (§4.4).
//!
//! Grounded on the teacher's `controls_impl/` directory (OID constants and
//! payload shapes), reimplemented against [`ControlCodec`] instead of the
//! teacher's `lazy_static!` global map and `From<T> for RawControl`
//! conversions.

use std::any::Any;

use ldap_ber::{
    decode_boolean, encode_boolean, read_tlv, write_tlv, BerInteger, Identifier, TagClass,
};

use super::{ControlCodec, ControlRegistry};
use crate::error::{DecodeError, EncodeError};

pub const PAGED_RESULTS_OID: &str = "1.2.840.113556.1.4.319";
pub const MANAGE_DSA_IT_OID: &str = "2.16.840.1.113730.3.4.2";
pub const SUBENTRIES_OID: &str = "1.3.6.1.4.1.4203.1.10.1";
pub const PERSISTENT_SEARCH_OID: &str = "2.16.840.1.113730.3.4.3";
pub const ENTRY_CHANGE_OID: &str = "2.16.840.1.113730.3.4.7";
/// Microsoft's Tree Delete (cascading delete) control; the closest
/// documented match for the "Cascade" control named in the source.
pub const CASCADE_OID: &str = "1.2.840.113556.1.4.805";
pub const SORT_REQUEST_OID: &str = "1.2.840.113556.1.4.473";
pub const SORT_RESPONSE_OID: &str = "1.2.840.113556.1.4.474";
pub const PROXIED_AUTHORIZATION_OID: &str = "2.16.840.1.113730.3.4.18";

fn seq(tag_class: TagClass, constructed_tag: u8, body: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 6);
    write_tlv(
        &mut out,
        Identifier::new(tag_class, true, constructed_tag),
        body.len(),
    );
    out.extend_from_slice(&body);
    out
}

fn octet_string(tag: u8, class: TagClass, bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 6);
    write_tlv(&mut out, Identifier::new(class, false, tag), bytes.len());
    out.extend_from_slice(bytes);
    out
}

fn integer(tag: u8, class: TagClass, value: i64) -> Vec<u8> {
    let body = BerInteger::encode(value);
    let mut out = Vec::with_capacity(body.len() + 6);
    write_tlv(&mut out, Identifier::new(class, false, tag), body.len());
    out.extend_from_slice(&body);
    out
}

fn boolean(tag: u8, class: TagClass, value: bool) -> Vec<u8> {
    let body = encode_boolean(value);
    let mut out = Vec::with_capacity(3);
    write_tlv(&mut out, Identifier::new(class, false, tag), body.len());
    out.extend_from_slice(&body);
    out
}

fn unexpected(offset: usize) -> DecodeError {
    DecodeError::UnexpectedTag {
        offset,
        expected: 0,
        got: 0,
    }
}

/// Paged Results control ([RFC 2696](https://tools.ietf.org/html/rfc2696)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedResultsControl {
    pub size: i64,
    pub cookie: Vec<u8>,
}

pub struct PagedResultsCodec;

impl ControlCodec for PagedResultsCodec {
    fn oid(&self) -> &str {
        PAGED_RESULTS_OID
    }

    fn decode(&self, value: &[u8]) -> Result<Box<dyn Any + Send + Sync>, DecodeError> {
        let outer = read_tlv(value)?;
        let size_tlv = read_tlv(outer.body)?;
        let size = BerInteger::decode(size_tlv.body).ok_or_else(|| unexpected(0))?;
        let rest = &outer.body[size_tlv.encoded_len()..];
        let cookie_tlv = read_tlv(rest)?;
        Ok(Box::new(PagedResultsControl {
            size,
            cookie: cookie_tlv.body.to_vec(),
        }))
    }

    fn encode(&self, payload: &dyn Any) -> Result<Vec<u8>, EncodeError> {
        let p = payload
            .downcast_ref::<PagedResultsControl>()
            .ok_or_else(|| EncodeError::ValueOutOfRange("not a PagedResultsControl".into()))?;
        let mut body = integer(2, TagClass::Universal, p.size);
        body.extend_from_slice(&octet_string(4, TagClass::Universal, &p.cookie));
        Ok(seq(TagClass::Universal, 16, body))
    }
}

/// ManageDsaIT control ([RFC 3296](https://tools.ietf.org/html/rfc3296));
/// carries no value, only the `critical` flag matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManageDsaItControl;

pub struct ManageDsaItCodec;

impl ControlCodec for ManageDsaItCodec {
    fn oid(&self) -> &str {
        MANAGE_DSA_IT_OID
    }

    fn decode(&self, _value: &[u8]) -> Result<Box<dyn Any + Send + Sync>, DecodeError> {
        Ok(Box::new(ManageDsaItControl))
    }

    fn encode(&self, _payload: &dyn Any) -> Result<Vec<u8>, EncodeError> {
        Ok(Vec::new())
    }
}

/// Subentries control ([RFC 3672](https://tools.ietf.org/html/rfc3672)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubentriesControl(pub bool);

pub struct SubentriesCodec;

impl ControlCodec for SubentriesCodec {
    fn oid(&self) -> &str {
        SUBENTRIES_OID
    }

    fn decode(&self, value: &[u8]) -> Result<Box<dyn Any + Send + Sync>, DecodeError> {
        let tlv = read_tlv(value)?;
        let b = decode_boolean(tlv.body).ok_or_else(|| unexpected(0))?;
        Ok(Box::new(SubentriesControl(b)))
    }

    fn encode(&self, payload: &dyn Any) -> Result<Vec<u8>, EncodeError> {
        let p = payload
            .downcast_ref::<SubentriesControl>()
            .ok_or_else(|| EncodeError::ValueOutOfRange("not a SubentriesControl".into()))?;
        Ok(boolean(1, TagClass::Universal, p.0))
    }
}

/// Persistent Search control (draft-ietf-ldapext-psearch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistentSearchControl {
    pub change_types: i64,
    pub changes_only: bool,
    pub return_ecs: bool,
}

pub struct PersistentSearchCodec;

impl ControlCodec for PersistentSearchCodec {
    fn oid(&self) -> &str {
        PERSISTENT_SEARCH_OID
    }

    fn decode(&self, value: &[u8]) -> Result<Box<dyn Any + Send + Sync>, DecodeError> {
        let outer = read_tlv(value)?;
        let mut rest = outer.body;
        let ct_tlv = read_tlv(rest)?;
        let change_types = BerInteger::decode(ct_tlv.body).ok_or_else(|| unexpected(0))?;
        rest = &rest[ct_tlv.encoded_len()..];
        let co_tlv = read_tlv(rest)?;
        let changes_only = decode_boolean(co_tlv.body).ok_or_else(|| unexpected(0))?;
        rest = &rest[co_tlv.encoded_len()..];
        let ec_tlv = read_tlv(rest)?;
        let return_ecs = decode_boolean(ec_tlv.body).ok_or_else(|| unexpected(0))?;
        Ok(Box::new(PersistentSearchControl {
            change_types,
            changes_only,
            return_ecs,
        }))
    }

    fn encode(&self, payload: &dyn Any) -> Result<Vec<u8>, EncodeError> {
        let p = payload
            .downcast_ref::<PersistentSearchControl>()
            .ok_or_else(|| EncodeError::ValueOutOfRange("not a PersistentSearchControl".into()))?;
        let mut body = integer(2, TagClass::Universal, p.change_types);
        body.extend_from_slice(&boolean(1, TagClass::Universal, p.changes_only));
        body.extend_from_slice(&boolean(1, TagClass::Universal, p.return_ecs));
        Ok(seq(TagClass::Universal, 16, body))
    }
}

/// Entry Change Notification control, the response half of Persistent
/// Search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryChangeControl {
    pub change_type: i64,
    pub previous_dn: Option<String>,
    pub change_number: Option<i64>,
}

pub struct EntryChangeCodec;

impl ControlCodec for EntryChangeCodec {
    fn oid(&self) -> &str {
        ENTRY_CHANGE_OID
    }

    fn decode(&self, value: &[u8]) -> Result<Box<dyn Any + Send + Sync>, DecodeError> {
        let outer = read_tlv(value)?;
        let mut rest = outer.body;
        let ct_tlv = read_tlv(rest)?;
        let change_type = BerInteger::decode(ct_tlv.body).ok_or_else(|| unexpected(0))?;
        rest = &rest[ct_tlv.encoded_len()..];

        let mut previous_dn = None;
        let mut change_number = None;
        if !rest.is_empty() {
            let tlv = read_tlv(rest)?;
            if tlv.identifier.tag_number == 4 {
                previous_dn = Some(
                    std::str::from_utf8(tlv.body)
                        .map_err(|_| DecodeError::StringNotUtf8(0))?
                        .to_owned(),
                );
                rest = &rest[tlv.encoded_len()..];
            }
        }
        if !rest.is_empty() {
            let tlv = read_tlv(rest)?;
            change_number = BerInteger::decode(tlv.body);
        }

        Ok(Box::new(EntryChangeControl {
            change_type,
            previous_dn,
            change_number,
        }))
    }

    fn encode(&self, payload: &dyn Any) -> Result<Vec<u8>, EncodeError> {
        let p = payload
            .downcast_ref::<EntryChangeControl>()
            .ok_or_else(|| EncodeError::ValueOutOfRange("not an EntryChangeControl".into()))?;
        let mut body = integer(10, TagClass::Universal, p.change_type);
        if let Some(dn) = &p.previous_dn {
            body.extend_from_slice(&octet_string(4, TagClass::Universal, dn.as_bytes()));
        }
        if let Some(n) = p.change_number {
            body.extend_from_slice(&integer(2, TagClass::Universal, n));
        }
        Ok(seq(TagClass::Universal, 16, body))
    }
}

/// Tree Delete / "Cascade" control; no value, only `critical` matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeControl;

pub struct CascadeCodec;

impl ControlCodec for CascadeCodec {
    fn oid(&self) -> &str {
        CASCADE_OID
    }

    fn decode(&self, _value: &[u8]) -> Result<Box<dyn Any + Send + Sync>, DecodeError> {
        Ok(Box::new(CascadeControl))
    }

    fn encode(&self, _payload: &dyn Any) -> Result<Vec<u8>, EncodeError> {
        Ok(Vec::new())
    }
}

/// One sort key within a Sort Request control
/// ([RFC 2891](https://tools.ietf.org/html/rfc2891)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub attribute_type: String,
    pub ordering_rule: Option<String>,
    pub reverse_order: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortRequestControl(pub Vec<SortKey>);

pub struct SortRequestCodec;

impl ControlCodec for SortRequestCodec {
    fn oid(&self) -> &str {
        SORT_REQUEST_OID
    }

    fn decode(&self, value: &[u8]) -> Result<Box<dyn Any + Send + Sync>, DecodeError> {
        let outer = read_tlv(value)?;
        let mut rest = outer.body;
        let mut keys = Vec::new();
        while !rest.is_empty() {
            let key_tlv = read_tlv(rest)?;
            let mut inner = key_tlv.body;
            let attr_tlv = read_tlv(inner)?;
            let attribute_type = std::str::from_utf8(attr_tlv.body)
                .map_err(|_| DecodeError::StringNotUtf8(0))?
                .to_owned();
            inner = &inner[attr_tlv.encoded_len()..];

            let mut ordering_rule = None;
            let mut reverse_order = false;
            if !inner.is_empty() {
                let tlv = read_tlv(inner)?;
                if tlv.identifier.tag_number == 0 {
                    ordering_rule = Some(
                        std::str::from_utf8(tlv.body)
                            .map_err(|_| DecodeError::StringNotUtf8(0))?
                            .to_owned(),
                    );
                    inner = &inner[tlv.encoded_len()..];
                }
            }
            if !inner.is_empty() {
                let tlv = read_tlv(inner)?;
                if tlv.identifier.tag_number == 1 {
                    reverse_order = decode_boolean(tlv.body).ok_or_else(|| unexpected(0))?;
                }
            }

            keys.push(SortKey {
                attribute_type,
                ordering_rule,
                reverse_order,
            });
            rest = &rest[key_tlv.encoded_len()..];
        }
        Ok(Box::new(SortRequestControl(keys)))
    }

    fn encode(&self, payload: &dyn Any) -> Result<Vec<u8>, EncodeError> {
        let p = payload
            .downcast_ref::<SortRequestControl>()
            .ok_or_else(|| EncodeError::ValueOutOfRange("not a SortRequestControl".into()))?;
        let mut body = Vec::new();
        for key in &p.0 {
            let mut key_body = octet_string(4, TagClass::Universal, key.attribute_type.as_bytes());
            if let Some(rule) = &key.ordering_rule {
                key_body.extend_from_slice(&octet_string(
                    0,
                    TagClass::ContextSpecific,
                    rule.as_bytes(),
                ));
            }
            if key.reverse_order {
                key_body.extend_from_slice(&boolean(1, TagClass::ContextSpecific, true));
            }
            body.extend_from_slice(&seq(TagClass::Universal, 16, key_body));
        }
        Ok(seq(TagClass::Universal, 16, body))
    }
}

/// Sort Response control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortResponseControl {
    pub sort_result: i64,
    pub attribute_type: Option<String>,
}

pub struct SortResponseCodec;

impl ControlCodec for SortResponseCodec {
    fn oid(&self) -> &str {
        SORT_RESPONSE_OID
    }

    fn decode(&self, value: &[u8]) -> Result<Box<dyn Any + Send + Sync>, DecodeError> {
        let outer = read_tlv(value)?;
        let mut rest = outer.body;
        let result_tlv = read_tlv(rest)?;
        let sort_result = BerInteger::decode(result_tlv.body).ok_or_else(|| unexpected(0))?;
        rest = &rest[result_tlv.encoded_len()..];
        let mut attribute_type = None;
        if !rest.is_empty() {
            let tlv = read_tlv(rest)?;
            attribute_type = Some(
                std::str::from_utf8(tlv.body)
                    .map_err(|_| DecodeError::StringNotUtf8(0))?
                    .to_owned(),
            );
        }
        Ok(Box::new(SortResponseControl {
            sort_result,
            attribute_type,
        }))
    }

    fn encode(&self, payload: &dyn Any) -> Result<Vec<u8>, EncodeError> {
        let p = payload
            .downcast_ref::<SortResponseControl>()
            .ok_or_else(|| EncodeError::ValueOutOfRange("not a SortResponseControl".into()))?;
        let mut body = integer(10, TagClass::Universal, p.sort_result);
        if let Some(attr) = &p.attribute_type {
            body.extend_from_slice(&octet_string(0, TagClass::ContextSpecific, attr.as_bytes()));
        }
        Ok(seq(TagClass::Universal, 16, body))
    }
}

/// Proxied Authorization control
/// ([RFC 4370](https://tools.ietf.org/html/rfc4370)). Unlike the other
/// controls here, its value is the bare authzId string, not a SEQUENCE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxiedAuthorizationControl {
    pub authz_id: String,
}

pub struct ProxiedAuthorizationCodec;

impl ControlCodec for ProxiedAuthorizationCodec {
    fn oid(&self) -> &str {
        PROXIED_AUTHORIZATION_OID
    }

    fn decode(&self, value: &[u8]) -> Result<Box<dyn Any + Send + Sync>, DecodeError> {
        let authz_id = std::str::from_utf8(value)
            .map_err(|_| DecodeError::StringNotUtf8(0))?
            .to_owned();
        Ok(Box::new(ProxiedAuthorizationControl { authz_id }))
    }

    fn encode(&self, payload: &dyn Any) -> Result<Vec<u8>, EncodeError> {
        let p = payload
            .downcast_ref::<ProxiedAuthorizationControl>()
            .ok_or_else(|| {
                EncodeError::ValueOutOfRange("not a ProxiedAuthorizationControl".into())
            })?;
        Ok(p.authz_id.clone().into_bytes())
    }
}

/// Populates a freshly constructed registry with the standard codec set.
/// Takes a registry rather than returning one so [`ControlRegistry::new`]
/// stays the single place that constructs the `codecs` map.
pub(super) fn register_all(registry: &mut ControlRegistry) {
    registry.insert(Box::new(PagedResultsCodec));
    registry.insert(Box::new(ManageDsaItCodec));
    registry.insert(Box::new(SubentriesCodec));
    registry.insert(Box::new(PersistentSearchCodec));
    registry.insert(Box::new(EntryChangeCodec));
    registry.insert(Box::new(CascadeCodec));
    registry.insert(Box::new(SortRequestCodec));
    registry.insert(Box::new(SortResponseCodec));
    registry.insert(Box::new(ProxiedAuthorizationCodec));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paged_results_roundtrip() {
        let codec = PagedResultsCodec;
        let payload = PagedResultsControl {
            size: 10,
            cookie: vec![1, 2, 3],
        };
        let encoded = codec.encode(&payload).unwrap();
        let decoded = codec.decode(&encoded).unwrap();
        let decoded = decoded.downcast_ref::<PagedResultsControl>().unwrap();
        assert_eq!(decoded, &payload);
    }

    #[test]
    fn proxied_authorization_is_unwrapped() {
        let codec = ProxiedAuthorizationCodec;
        let payload = ProxiedAuthorizationControl {
            authz_id: "dn:cn=admin".to_owned(),
        };
        let encoded = codec.encode(&payload).unwrap();
        assert_eq!(encoded, b"dn:cn=admin");
    }
}
