//! BER wire form of [`Filter`] (RFC 4511 `Filter` CHOICE), as carried inside
//! `SearchRequest`. Distinct from the RFC 4515 textual form in `crate::filter`.

use ldap_ber::TagClass;

use super::wire::{self, Reader};
use crate::error::DecodeError;
use crate::filter::Filter;

const AND: u8 = 0;
const OR: u8 = 1;
const NOT: u8 = 2;
const EQUALITY_MATCH: u8 = 3;
const SUBSTRINGS: u8 = 4;
const GREATER_OR_EQUAL: u8 = 5;
const LESS_OR_EQUAL: u8 = 6;
const PRESENT: u8 = 7;
const APPROX_MATCH: u8 = 8;
const EXTENSIBLE_MATCH: u8 = 9;

const SUB_INITIAL: u8 = 0;
const SUB_ANY: u8 = 1;
const SUB_FINAL: u8 = 2;

const MATCHING_RULE: u8 = 1;
const MATCH_TYPE: u8 = 2;
const MATCH_VALUE: u8 = 3;
const DN_ATTRIBUTES: u8 = 4;

pub fn decode_filter(reader: &mut Reader<'_>) -> Result<Filter, DecodeError> {
    let offset = reader.offset();
    let tlv = reader.next_tlv()?;
    let tag = tlv.identifier.tag_number;
    match tag {
        AND | OR => {
            let mut inner = Reader::new(tlv.body, offset);
            let mut children = Vec::new();
            while !inner.is_empty() {
                children.push(decode_filter(&mut inner)?);
            }
            Ok(if tag == AND {
                Filter::And(children)
            } else {
                Filter::Or(children)
            })
        }
        NOT => {
            let mut inner = Reader::new(tlv.body, offset);
            let child = decode_filter(&mut inner)?;
            Ok(Filter::Not(Box::new(child)))
        }
        EQUALITY_MATCH | GREATER_OR_EQUAL | LESS_OR_EQUAL | APPROX_MATCH => {
            let (attr, value) = decode_ava(tlv.body, offset)?;
            Ok(match tag {
                EQUALITY_MATCH => Filter::Equality(attr, value),
                GREATER_OR_EQUAL => Filter::Greater(attr, value),
                LESS_OR_EQUAL => Filter::Less(attr, value),
                _ => Filter::Approx(attr, value),
            })
        }
        SUBSTRINGS => decode_substrings(tlv.body, offset),
        PRESENT => Ok(Filter::Presence(
            wire::read_utf8(&tlv, offset)?.to_owned(),
        )),
        EXTENSIBLE_MATCH => decode_extensible(tlv.body, offset),
        other => Err(DecodeError::UnexpectedTag {
            offset,
            expected: 0,
            got: other,
        }),
    }
}

fn decode_ava(body: &[u8], offset: usize) -> Result<(String, String), DecodeError> {
    let mut reader = Reader::new(body, offset);
    let off = reader.offset();
    let attr_tlv = reader.next_tlv()?;
    let attr = wire::read_utf8(&attr_tlv, off)?.to_owned();
    let off = reader.offset();
    let value_tlv = reader.next_tlv()?;
    let value = wire::read_utf8(&value_tlv, off)?.to_owned();
    Ok((attr, value))
}

fn decode_substrings(body: &[u8], offset: usize) -> Result<Filter, DecodeError> {
    let mut reader = Reader::new(body, offset);
    let off = reader.offset();
    let attr_tlv = reader.next_tlv()?;
    let attr = wire::read_utf8(&attr_tlv, off)?.to_owned();

    let off = reader.offset();
    let list_tlv = reader.next_tlv()?;
    let mut list = Reader::new(list_tlv.body, off);
    let mut initial = None;
    let mut any = Vec::new();
    let mut final_ = None;
    while !list.is_empty() {
        let off = list.offset();
        let tlv = list.next_tlv()?;
        let s = wire::read_utf8(&tlv, off)?.to_owned();
        match tlv.identifier.tag_number {
            SUB_INITIAL => initial = Some(s),
            SUB_ANY => any.push(s),
            SUB_FINAL => final_ = Some(s),
            other => {
                return Err(DecodeError::UnexpectedTag {
                    offset: off,
                    expected: 0,
                    got: other,
                })
            }
        }
    }
    Ok(Filter::Substring {
        attr,
        initial,
        any,
        final_,
    })
}

fn decode_extensible(body: &[u8], offset: usize) -> Result<Filter, DecodeError> {
    let mut reader = Reader::new(body, offset);
    let mut matching_rule = None;
    let mut attr = None;
    let mut value = None;
    let mut dn_attributes = false;
    while !reader.is_empty() {
        let off = reader.offset();
        let tlv = reader.next_tlv()?;
        match tlv.identifier.tag_number {
            MATCHING_RULE => matching_rule = Some(wire::read_utf8(&tlv, off)?.to_owned()),
            MATCH_TYPE => attr = Some(wire::read_utf8(&tlv, off)?.to_owned()),
            MATCH_VALUE => value = Some(wire::read_utf8(&tlv, off)?.to_owned()),
            DN_ATTRIBUTES => {
                dn_attributes = ldap_ber::decode_boolean(tlv.body)
                    .ok_or(DecodeError::IntegerOutOfRange(off))?
            }
            other => {
                return Err(DecodeError::UnexpectedTag {
                    offset: off,
                    expected: 0,
                    got: other,
                })
            }
        }
    }
    Ok(Filter::Extensible {
        attr,
        matching_rule,
        value: value.ok_or(DecodeError::Truncated(offset))?,
        dn_attributes,
    })
}

/// Bytes [`encode_filter`] would write for `filter`, tag and length octets of
/// every nested TLV included, computed without writing anything.
pub fn filter_length(filter: &Filter) -> usize {
    match filter {
        Filter::And(children) | Filter::Or(children) => {
            let body: usize = children.iter().map(filter_length).sum();
            wire::constructed_length(body)
        }
        Filter::Not(child) => wire::constructed_length(filter_length(child)),
        Filter::Equality(attr, value)
        | Filter::Greater(attr, value)
        | Filter::Less(attr, value)
        | Filter::Approx(attr, value) => {
            let body = wire::octets_length(attr.as_bytes()) + wire::octets_length(value.as_bytes());
            wire::constructed_length(body)
        }
        Filter::Presence(attr) => wire::octets_length(attr.as_bytes()),
        Filter::Substring {
            attr,
            initial,
            any,
            final_,
        } => {
            let list_body = initial.as_deref().map(|s| wire::octets_length(s.as_bytes())).unwrap_or(0)
                + any.iter().map(|a| wire::octets_length(a.as_bytes())).sum::<usize>()
                + final_.as_deref().map(|s| wire::octets_length(s.as_bytes())).unwrap_or(0);
            let body = wire::octets_length(attr.as_bytes()) + wire::constructed_length(list_body);
            wire::constructed_length(body)
        }
        Filter::Extensible {
            attr,
            matching_rule,
            value,
            dn_attributes,
        } => {
            let mut body = 0;
            if let Some(rule) = matching_rule {
                body += wire::octets_length(rule.as_bytes());
            }
            if let Some(attr) = attr {
                body += wire::octets_length(attr.as_bytes());
            }
            body += wire::octets_length(value.as_bytes());
            if *dn_attributes {
                body += wire::boolean_length();
            }
            wire::constructed_length(body)
        }
        Filter::Undefined => wire::constructed_length(wire::octets_length(b"objectClass")),
    }
}

pub fn encode_filter(filter: &Filter, buf: &mut Vec<u8>) {
    match filter {
        Filter::And(children) => encode_set(buf, AND, children),
        Filter::Or(children) => encode_set(buf, OR, children),
        Filter::Not(child) => {
            let mut body = Vec::with_capacity(filter_length(child));
            encode_filter(child, &mut body);
            wire::wrap_constructed(buf, TagClass::ContextSpecific, NOT, &body);
        }
        Filter::Equality(attr, value) => encode_ava(buf, EQUALITY_MATCH, attr, value),
        Filter::Greater(attr, value) => encode_ava(buf, GREATER_OR_EQUAL, attr, value),
        Filter::Less(attr, value) => encode_ava(buf, LESS_OR_EQUAL, attr, value),
        Filter::Approx(attr, value) => encode_ava(buf, APPROX_MATCH, attr, value),
        Filter::Presence(attr) => {
            wire::push_octets(buf, TagClass::ContextSpecific, PRESENT, attr.as_bytes())
        }
        Filter::Substring {
            attr,
            initial,
            any,
            final_,
        } => encode_substrings(buf, attr, initial, any, final_),
        Filter::Extensible {
            attr,
            matching_rule,
            value,
            dn_attributes,
        } => encode_extensible(buf, attr, matching_rule, value, *dn_attributes),
        Filter::Undefined => {
            // An unsatisfiable filter with no server-side encoding; emit the
            // canonical always-false form so a wire write never panics.
            let mut body = Vec::with_capacity(wire::octets_length(b"objectClass"));
            wire::push_octets(&mut body, TagClass::ContextSpecific, PRESENT, b"objectClass");
            wire::wrap_constructed(buf, TagClass::ContextSpecific, NOT, &body);
        }
    }
}

fn encode_set(buf: &mut Vec<u8>, tag: u8, children: &[Filter]) {
    let body_len: usize = children.iter().map(filter_length).sum();
    let mut body = Vec::with_capacity(body_len);
    for child in children {
        encode_filter(child, &mut body);
    }
    wire::wrap_constructed(buf, TagClass::ContextSpecific, tag, &body);
}

fn encode_ava(buf: &mut Vec<u8>, tag: u8, attr: &str, value: &str) {
    let body_len = wire::octets_length(attr.as_bytes()) + wire::octets_length(value.as_bytes());
    let mut body = Vec::with_capacity(body_len);
    wire::push_octets(&mut body, TagClass::Universal, 4, attr.as_bytes());
    wire::push_octets(&mut body, TagClass::Universal, 4, value.as_bytes());
    wire::wrap_constructed(buf, TagClass::ContextSpecific, tag, &body);
}

fn encode_substrings(
    buf: &mut Vec<u8>,
    attr: &str,
    initial: &Option<String>,
    any: &[String],
    final_: &Option<String>,
) {
    let list_len = initial.as_deref().map(|s| wire::octets_length(s.as_bytes())).unwrap_or(0)
        + any.iter().map(|a| wire::octets_length(a.as_bytes())).sum::<usize>()
        + final_.as_deref().map(|s| wire::octets_length(s.as_bytes())).unwrap_or(0);
    let mut body = Vec::with_capacity(
        wire::octets_length(attr.as_bytes()) + wire::constructed_length(list_len),
    );
    wire::push_octets(&mut body, TagClass::Universal, 4, attr.as_bytes());
    let mut list = Vec::with_capacity(list_len);
    if let Some(initial) = initial {
        wire::push_octets(&mut list, TagClass::ContextSpecific, SUB_INITIAL, initial.as_bytes());
    }
    for a in any {
        wire::push_octets(&mut list, TagClass::ContextSpecific, SUB_ANY, a.as_bytes());
    }
    if let Some(final_) = final_ {
        wire::push_octets(&mut list, TagClass::ContextSpecific, SUB_FINAL, final_.as_bytes());
    }
    wire::wrap_constructed(&mut body, TagClass::Universal, 16, &list);
    wire::wrap_constructed(buf, TagClass::ContextSpecific, SUBSTRINGS, &body);
}

fn encode_extensible(
    buf: &mut Vec<u8>,
    attr: &Option<String>,
    matching_rule: &Option<String>,
    value: &str,
    dn_attributes: bool,
) {
    let body_len = matching_rule.as_deref().map(|r| wire::octets_length(r.as_bytes())).unwrap_or(0)
        + attr.as_deref().map(|a| wire::octets_length(a.as_bytes())).unwrap_or(0)
        + wire::octets_length(value.as_bytes())
        + if dn_attributes { wire::boolean_length() } else { 0 };
    let mut body = Vec::with_capacity(body_len);
    if let Some(rule) = matching_rule {
        wire::push_octets(&mut body, TagClass::ContextSpecific, MATCHING_RULE, rule.as_bytes());
    }
    if let Some(attr) = attr {
        wire::push_octets(&mut body, TagClass::ContextSpecific, MATCH_TYPE, attr.as_bytes());
    }
    wire::push_octets(&mut body, TagClass::ContextSpecific, MATCH_VALUE, value.as_bytes());
    if dn_attributes {
        wire::push_boolean(&mut body, TagClass::ContextSpecific, DN_ATTRIBUTES, true);
    }
    wire::wrap_constructed(buf, TagClass::ContextSpecific, EXTENSIBLE_MATCH, &body);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_filter_roundtrips_through_wire() {
        let filter = Filter::Equality("cn".to_owned(), "admin".to_owned());
        let mut buf = Vec::new();
        encode_filter(&filter, &mut buf);
        let mut reader = Reader::new(&buf, 0);
        let decoded = decode_filter(&mut reader).unwrap();
        assert_eq!(decoded, filter);
    }

    #[test]
    fn presence_filter_roundtrips_through_wire() {
        let filter = Filter::Presence("objectClass".to_owned());
        let mut buf = Vec::new();
        encode_filter(&filter, &mut buf);
        let mut reader = Reader::new(&buf, 0);
        let decoded = decode_filter(&mut reader).unwrap();
        assert_eq!(decoded, filter);
    }
}
