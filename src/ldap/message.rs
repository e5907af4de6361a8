//! The typed message model (C4): one variant per LDAP operation, plus the
//! pure `encode`/`decode` pair for each. Grounded on the teacher's
//! per-operation files (`bind.rs`, `search.rs`, `add.rs`, `delete.rs`,
//! `modify.rs`, `modifydn.rs`, `compare.rs`, `abandon.rs`, `extended.rs`),
//! generalized from its decorator-object encoders into plain functions over
//! an explicit tag-and-body model (Design Notes §9).

use indexmap::IndexMap;
use ldap_ber::TagClass;

use super::filter_wire::{decode_filter, encode_filter, filter_length};
use super::result::LdapResult;
use super::wire::{self, Reader};
use crate::controls::Control;
use crate::error::{DecodeError, LimitKind};
use crate::filter::Filter;
use crate::limits::DecodeLimits;

const BIND_REQUEST: u8 = 0;
const BIND_RESPONSE: u8 = 1;
const UNBIND_REQUEST: u8 = 2;
const SEARCH_REQUEST: u8 = 3;
const SEARCH_RESULT_ENTRY: u8 = 4;
const SEARCH_RESULT_DONE: u8 = 5;
const MODIFY_REQUEST: u8 = 6;
const MODIFY_RESPONSE: u8 = 7;
const ADD_REQUEST: u8 = 8;
const ADD_RESPONSE: u8 = 9;
const DELETE_REQUEST: u8 = 10;
const DELETE_RESPONSE: u8 = 11;
const MODIFY_DN_REQUEST: u8 = 12;
const MODIFY_DN_RESPONSE: u8 = 13;
const COMPARE_REQUEST: u8 = 14;
const COMPARE_RESPONSE: u8 = 15;
const ABANDON_REQUEST: u8 = 16;
const SEARCH_RESULT_REFERENCE: u8 = 19;
const EXTENDED_REQUEST: u8 = 23;
const EXTENDED_RESPONSE: u8 = 24;
const INTERMEDIATE_RESPONSE: u8 = 25;

const AUTH_SIMPLE: u8 = 0;
const AUTH_SASL: u8 = 3;

/// One `type` / `values` pair as carried by Add, Modify and SearchResultEntry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialAttribute {
    pub attribute_type: String,
    pub values: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    BaseObject = 0,
    SingleLevel = 1,
    WholeSubtree = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerefAliases {
    Never = 0,
    InSearching = 1,
    FindingBaseObj = 2,
    Always = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModOp {
    Add = 0,
    Delete = 1,
    Replace = 2,
    Increment = 3,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChoice {
    Simple(Vec<u8>),
    Sasl {
        mechanism: String,
        credentials: Option<Vec<u8>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindRequest {
    pub version: i64,
    pub name: String,
    pub auth: AuthChoice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindResponse {
    pub result: LdapResult,
    pub server_sasl_creds: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub base_object: String,
    pub scope: Scope,
    pub deref_aliases: DerefAliases,
    pub size_limit: i64,
    pub time_limit: i64,
    pub types_only: bool,
    pub filter: Filter,
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResultEntry {
    pub object_name: String,
    pub attributes: Vec<PartialAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyRequest {
    pub object: String,
    pub changes: Vec<(ModOp, PartialAttribute)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRequest {
    pub entry: String,
    pub attributes: Vec<PartialAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyDnRequest {
    pub entry: String,
    pub new_rdn: String,
    pub delete_old_rdn: bool,
    pub new_superior: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareRequest {
    pub entry: String,
    pub attribute_desc: String,
    pub assertion_value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedRequest {
    pub request_name: String,
    pub request_value: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedResponse {
    pub result: LdapResult,
    pub response_name: Option<String>,
    pub response_value: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntermediateResponse {
    pub name: Option<String>,
    pub value: Option<Vec<u8>>,
}

/// The single protocol operation carried by one [`Message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolOp {
    BindRequest(BindRequest),
    BindResponse(BindResponse),
    UnbindRequest,
    SearchRequest(SearchRequest),
    SearchResultEntry(SearchResultEntry),
    SearchResultDone(LdapResult),
    SearchResultReference(Vec<String>),
    ModifyRequest(ModifyRequest),
    ModifyResponse(LdapResult),
    AddRequest(AddRequest),
    AddResponse(LdapResult),
    DeleteRequest(String),
    DeleteResponse(LdapResult),
    ModifyDnRequest(ModifyDnRequest),
    ModifyDnResponse(LdapResult),
    CompareRequest(CompareRequest),
    CompareResponse(LdapResult),
    AbandonRequest(i64),
    ExtendedRequest(ExtendedRequest),
    ExtendedResponse(ExtendedResponse),
    IntermediateResponse(IntermediateResponse),
}

/// One decoded or to-be-encoded `LDAPMessage` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub op: ProtocolOp,
    pub controls: IndexMap<String, Control>,
}

fn read_partial_attribute(
    reader: &mut Reader<'_>,
    limits: &DecodeLimits,
) -> Result<PartialAttribute, DecodeError> {
    let offset = reader.offset();
    let tlv = reader.next_tlv()?;
    wire::expect_tag(&tlv, TagClass::Universal, true, 16, offset)?;
    let mut inner = Reader::new(tlv.body, offset);

    let off = inner.offset();
    let type_tlv = inner.next_tlv()?;
    let attribute_type = wire::read_utf8(&type_tlv, off)?.to_owned();

    let off = inner.offset();
    let set_tlv = inner.next_tlv()?;
    wire::expect_tag(&set_tlv, TagClass::Universal, true, 17, off)?;
    let mut values_reader = Reader::new(set_tlv.body, off);
    let mut values = Vec::new();
    while !values_reader.is_empty() {
        if values.len() >= limits.max_values_per_attribute {
            return Err(DecodeError::LimitExceeded {
                kind: LimitKind::ValuesPerAttribute,
            });
        }
        let value_tlv = values_reader.next_tlv()?;
        values.push(value_tlv.body.to_vec());
    }

    Ok(PartialAttribute {
        attribute_type,
        values,
    })
}

fn partial_attribute_length(attr: &PartialAttribute) -> usize {
    let set_body: usize = attr.values.iter().map(|v| wire::octets_length(v)).sum();
    let body = wire::octets_length(attr.attribute_type.as_bytes()) + wire::constructed_length(set_body);
    wire::constructed_length(body)
}

fn write_partial_attribute(buf: &mut Vec<u8>, attr: &PartialAttribute) {
    let set_len: usize = attr.values.iter().map(|v| wire::octets_length(v)).sum();
    let mut body = Vec::with_capacity(wire::octets_length(attr.attribute_type.as_bytes()) + wire::constructed_length(set_len));
    wire::push_octets(
        &mut body,
        TagClass::Universal,
        4,
        attr.attribute_type.as_bytes(),
    );
    let mut set_body = Vec::with_capacity(set_len);
    for value in &attr.values {
        wire::push_octets(&mut set_body, TagClass::Universal, 4, value);
    }
    wire::wrap_constructed(&mut body, TagClass::Universal, 17, &set_body);
    wire::wrap_constructed(buf, TagClass::Universal, 16, &body);
}

fn decode_bind_request(body: &[u8], offset: usize) -> Result<ProtocolOp, DecodeError> {
    let mut reader = Reader::new(body, offset);
    let off = reader.offset();
    let version_tlv = reader.next_tlv()?;
    let version = wire::read_integer(&version_tlv, off)?;

    let off = reader.offset();
    let name_tlv = reader.next_tlv()?;
    let name = wire::read_utf8(&name_tlv, off)?.to_owned();

    let off = reader.offset();
    let auth_tlv = reader.next_tlv()?;
    let auth = match auth_tlv.identifier.tag_number {
        AUTH_SIMPLE => AuthChoice::Simple(auth_tlv.body.to_vec()),
        AUTH_SASL => {
            let mut sasl = Reader::new(auth_tlv.body, off);
            let off = sasl.offset();
            let mech_tlv = sasl.next_tlv()?;
            let mechanism = wire::read_utf8(&mech_tlv, off)?.to_owned();
            let credentials = if !sasl.is_empty() {
                Some(sasl.next_tlv()?.body.to_vec())
            } else {
                None
            };
            AuthChoice::Sasl {
                mechanism,
                credentials,
            }
        }
        other => {
            return Err(DecodeError::UnexpectedTag {
                offset: off,
                expected: AUTH_SIMPLE,
                got: other,
            })
        }
    };

    Ok(ProtocolOp::BindRequest(BindRequest {
        version,
        name,
        auth,
    }))
}

fn auth_choice_length(auth: &AuthChoice) -> usize {
    match auth {
        AuthChoice::Simple(creds) => wire::octets_length(creds),
        AuthChoice::Sasl {
            mechanism,
            credentials,
        } => {
            let sasl_body = wire::octets_length(mechanism.as_bytes())
                + credentials.as_deref().map(wire::octets_length).unwrap_or(0);
            wire::constructed_length(sasl_body)
        }
    }
}

fn bind_request_length(req: &BindRequest) -> usize {
    let body = wire::integer_length(req.version)
        + wire::octets_length(req.name.as_bytes())
        + auth_choice_length(&req.auth);
    wire::constructed_length(body)
}

fn write_bind_request(buf: &mut Vec<u8>, req: &BindRequest) {
    let mut body = Vec::with_capacity(bind_request_length(req));
    wire::push_integer(&mut body, TagClass::Universal, 2, req.version);
    wire::push_octets(&mut body, TagClass::Universal, 4, req.name.as_bytes());
    match &req.auth {
        AuthChoice::Simple(creds) => {
            wire::push_octets(&mut body, TagClass::ContextSpecific, AUTH_SIMPLE, creds)
        }
        AuthChoice::Sasl {
            mechanism,
            credentials,
        } => {
            let sasl_len = wire::octets_length(mechanism.as_bytes())
                + credentials.as_deref().map(wire::octets_length).unwrap_or(0);
            let mut sasl_body = Vec::with_capacity(sasl_len);
            wire::push_octets(
                &mut sasl_body,
                TagClass::Universal,
                4,
                mechanism.as_bytes(),
            );
            if let Some(creds) = credentials {
                wire::push_octets(&mut sasl_body, TagClass::Universal, 4, creds);
            }
            wire::wrap_constructed(&mut body, TagClass::ContextSpecific, AUTH_SASL, &sasl_body);
        }
    }
    wire::wrap_constructed(buf, TagClass::Application, BIND_REQUEST, &body);
}

fn decode_bind_response(body: &[u8], offset: usize) -> Result<ProtocolOp, DecodeError> {
    let mut reader = Reader::new(body, offset);
    let result = LdapResult::read_fields(&mut reader)?;
    let server_sasl_creds = if !reader.is_empty() {
        Some(reader.next_tlv()?.body.to_vec())
    } else {
        None
    };
    Ok(ProtocolOp::BindResponse(BindResponse {
        result,
        server_sasl_creds,
    }))
}

fn bind_response_length(resp: &BindResponse) -> usize {
    let body = resp.result.fields_length()
        + resp.server_sasl_creds.as_deref().map(wire::octets_length).unwrap_or(0);
    wire::constructed_length(body)
}

fn write_bind_response(buf: &mut Vec<u8>, resp: &BindResponse) {
    let mut body = Vec::with_capacity(bind_response_length(resp));
    resp.result.write_fields(&mut body);
    if let Some(creds) = &resp.server_sasl_creds {
        wire::push_octets(&mut body, TagClass::ContextSpecific, 7, creds);
    }
    wire::wrap_constructed(buf, TagClass::Application, BIND_RESPONSE, &body);
}

fn decode_search_request(body: &[u8], offset: usize) -> Result<ProtocolOp, DecodeError> {
    let mut reader = Reader::new(body, offset);

    let off = reader.offset();
    let base_tlv = reader.next_tlv()?;
    let base_object = wire::read_utf8(&base_tlv, off)?.to_owned();

    let off = reader.offset();
    let scope_tlv = reader.next_tlv()?;
    let scope = match wire::read_integer(&scope_tlv, off)? {
        0 => Scope::BaseObject,
        1 => Scope::SingleLevel,
        2 => Scope::WholeSubtree,
        _ => return Err(DecodeError::IntegerOutOfRange(off)),
    };

    let off = reader.offset();
    let deref_tlv = reader.next_tlv()?;
    let deref_aliases = match wire::read_integer(&deref_tlv, off)? {
        0 => DerefAliases::Never,
        1 => DerefAliases::InSearching,
        2 => DerefAliases::FindingBaseObj,
        3 => DerefAliases::Always,
        _ => return Err(DecodeError::IntegerOutOfRange(off)),
    };

    let off = reader.offset();
    let size_tlv = reader.next_tlv()?;
    let size_limit = wire::read_integer(&size_tlv, off)?;

    let off = reader.offset();
    let time_tlv = reader.next_tlv()?;
    let time_limit = wire::read_integer(&time_tlv, off)?;

    let off = reader.offset();
    let types_only_tlv = reader.next_tlv()?;
    let types_only =
        ldap_ber::decode_boolean(types_only_tlv.body).ok_or(DecodeError::IntegerOutOfRange(off))?;

    let filter = decode_filter(&mut reader)?;

    let off = reader.offset();
    let attrs_tlv = reader.next_tlv()?;
    wire::expect_tag(&attrs_tlv, TagClass::Universal, true, 16, off)?;
    let mut attrs_reader = Reader::new(attrs_tlv.body, off);
    let mut attributes = Vec::new();
    while !attrs_reader.is_empty() {
        let off = attrs_reader.offset();
        let tlv = attrs_reader.next_tlv()?;
        attributes.push(wire::read_utf8(&tlv, off)?.to_owned());
    }

    Ok(ProtocolOp::SearchRequest(SearchRequest {
        base_object,
        scope,
        deref_aliases,
        size_limit,
        time_limit,
        types_only,
        filter,
        attributes,
    }))
}

fn search_request_length(req: &SearchRequest) -> usize {
    let attrs_body: usize = req.attributes.iter().map(|a| wire::octets_length(a.as_bytes())).sum();
    let body = wire::octets_length(req.base_object.as_bytes())
        + wire::integer_length(req.scope as i64)
        + wire::integer_length(req.deref_aliases as i64)
        + wire::integer_length(req.size_limit)
        + wire::integer_length(req.time_limit)
        + wire::boolean_length()
        + filter_length(&req.filter)
        + wire::constructed_length(attrs_body);
    wire::constructed_length(body)
}

fn write_search_request(buf: &mut Vec<u8>, req: &SearchRequest) {
    let mut body = Vec::with_capacity(search_request_length(req));
    wire::push_octets(
        &mut body,
        TagClass::Universal,
        4,
        req.base_object.as_bytes(),
    );
    wire::push_integer(&mut body, TagClass::Universal, 10, req.scope as i64);
    wire::push_integer(
        &mut body,
        TagClass::Universal,
        10,
        req.deref_aliases as i64,
    );
    wire::push_integer(&mut body, TagClass::Universal, 2, req.size_limit);
    wire::push_integer(&mut body, TagClass::Universal, 2, req.time_limit);
    wire::push_boolean(&mut body, TagClass::Universal, 1, req.types_only);
    encode_filter(&req.filter, &mut body);
    let attrs_len: usize = req.attributes.iter().map(|a| wire::octets_length(a.as_bytes())).sum();
    let mut attrs_body = Vec::with_capacity(attrs_len);
    for attr in &req.attributes {
        wire::push_octets(&mut attrs_body, TagClass::Universal, 4, attr.as_bytes());
    }
    wire::wrap_constructed(&mut body, TagClass::Universal, 16, &attrs_body);
    wire::wrap_constructed(buf, TagClass::Application, SEARCH_REQUEST, &body);
}

fn decode_search_result_entry(
    body: &[u8],
    offset: usize,
    limits: &DecodeLimits,
) -> Result<ProtocolOp, DecodeError> {
    let mut reader = Reader::new(body, offset);
    let off = reader.offset();
    let dn_tlv = reader.next_tlv()?;
    let object_name = wire::read_utf8(&dn_tlv, off)?.to_owned();

    let off = reader.offset();
    let attrs_tlv = reader.next_tlv()?;
    wire::expect_tag(&attrs_tlv, TagClass::Universal, true, 16, off)?;
    let mut attrs_reader = Reader::new(attrs_tlv.body, off);
    let mut attributes = Vec::new();
    while !attrs_reader.is_empty() {
        if attributes.len() >= limits.max_attributes_per_entry {
            return Err(DecodeError::LimitExceeded {
                kind: LimitKind::AttributesPerEntry,
            });
        }
        attributes.push(read_partial_attribute(&mut attrs_reader, limits)?);
    }

    Ok(ProtocolOp::SearchResultEntry(SearchResultEntry {
        object_name,
        attributes,
    }))
}

fn search_result_entry_length(entry: &SearchResultEntry) -> usize {
    let attrs_body: usize = entry.attributes.iter().map(partial_attribute_length).sum();
    let body = wire::octets_length(entry.object_name.as_bytes()) + wire::constructed_length(attrs_body);
    wire::constructed_length(body)
}

fn write_search_result_entry(buf: &mut Vec<u8>, entry: &SearchResultEntry) {
    let mut body = Vec::with_capacity(search_result_entry_length(entry));
    wire::push_octets(&mut body, TagClass::Universal, 4, entry.object_name.as_bytes());
    let attrs_len: usize = entry.attributes.iter().map(partial_attribute_length).sum();
    let mut attrs_body = Vec::with_capacity(attrs_len);
    for attr in &entry.attributes {
        write_partial_attribute(&mut attrs_body, attr);
    }
    wire::wrap_constructed(&mut body, TagClass::Universal, 16, &attrs_body);
    wire::wrap_constructed(buf, TagClass::Application, SEARCH_RESULT_ENTRY, &body);
}

fn decode_search_result_reference(body: &[u8], offset: usize) -> Result<ProtocolOp, DecodeError> {
    let mut reader = Reader::new(body, offset);
    let mut urls = Vec::new();
    while !reader.is_empty() {
        let off = reader.offset();
        let tlv = reader.next_tlv()?;
        urls.push(wire::read_utf8(&tlv, off)?.to_owned());
    }
    Ok(ProtocolOp::SearchResultReference(urls))
}

fn search_result_reference_length(urls: &[String]) -> usize {
    let body: usize = urls.iter().map(|u| wire::octets_length(u.as_bytes())).sum();
    wire::constructed_length(body)
}

fn write_search_result_reference(buf: &mut Vec<u8>, urls: &[String]) {
    let body_len: usize = urls.iter().map(|u| wire::octets_length(u.as_bytes())).sum();
    let mut body = Vec::with_capacity(body_len);
    for url in urls {
        wire::push_octets(&mut body, TagClass::Universal, 4, url.as_bytes());
    }
    wire::wrap_constructed(buf, TagClass::Application, SEARCH_RESULT_REFERENCE, &body);
}

fn decode_modify_request(
    body: &[u8],
    offset: usize,
    limits: &DecodeLimits,
) -> Result<ProtocolOp, DecodeError> {
    let mut reader = Reader::new(body, offset);
    let off = reader.offset();
    let dn_tlv = reader.next_tlv()?;
    let object = wire::read_utf8(&dn_tlv, off)?.to_owned();

    let off = reader.offset();
    let changes_tlv = reader.next_tlv()?;
    wire::expect_tag(&changes_tlv, TagClass::Universal, true, 16, off)?;
    let mut changes_reader = Reader::new(changes_tlv.body, off);
    let mut changes = Vec::new();
    while !changes_reader.is_empty() {
        if changes.len() >= limits.max_attributes_per_entry {
            return Err(DecodeError::LimitExceeded {
                kind: LimitKind::AttributesPerEntry,
            });
        }
        let off = changes_reader.offset();
        let change_tlv = changes_reader.next_tlv()?;
        wire::expect_tag(&change_tlv, TagClass::Universal, true, 16, off)?;
        let mut inner = Reader::new(change_tlv.body, off);
        let off = inner.offset();
        let op_tlv = inner.next_tlv()?;
        let operation = match wire::read_integer(&op_tlv, off)? {
            0 => ModOp::Add,
            1 => ModOp::Delete,
            2 => ModOp::Replace,
            3 => ModOp::Increment,
            _ => return Err(DecodeError::IntegerOutOfRange(off)),
        };
        let modification = read_partial_attribute(&mut inner, limits)?;
        changes.push((operation, modification));
    }

    Ok(ProtocolOp::ModifyRequest(ModifyRequest { object, changes }))
}

fn change_length(op: ModOp, attr: &PartialAttribute) -> usize {
    wire::constructed_length(wire::integer_length(op as i64) + partial_attribute_length(attr))
}

fn modify_request_length(req: &ModifyRequest) -> usize {
    let changes_body: usize = req
        .changes
        .iter()
        .map(|(op, attr)| change_length(*op, attr))
        .sum();
    let body = wire::octets_length(req.object.as_bytes()) + wire::constructed_length(changes_body);
    wire::constructed_length(body)
}

fn write_modify_request(buf: &mut Vec<u8>, req: &ModifyRequest) {
    let mut body = Vec::with_capacity(modify_request_length(req));
    wire::push_octets(&mut body, TagClass::Universal, 4, req.object.as_bytes());
    let changes_len: usize = req
        .changes
        .iter()
        .map(|(op, attr)| change_length(*op, attr))
        .sum();
    let mut changes_body = Vec::with_capacity(changes_len);
    for (op, attr) in &req.changes {
        let change_len = wire::integer_length(*op as i64) + partial_attribute_length(attr);
        let mut change_body = Vec::with_capacity(change_len);
        wire::push_integer(&mut change_body, TagClass::Universal, 10, *op as i64);
        write_partial_attribute(&mut change_body, attr);
        wire::wrap_constructed(&mut changes_body, TagClass::Universal, 16, &change_body);
    }
    wire::wrap_constructed(&mut body, TagClass::Universal, 16, &changes_body);
    wire::wrap_constructed(buf, TagClass::Application, MODIFY_REQUEST, &body);
}

fn decode_add_request(
    body: &[u8],
    offset: usize,
    limits: &DecodeLimits,
) -> Result<ProtocolOp, DecodeError> {
    let mut reader = Reader::new(body, offset);
    let off = reader.offset();
    let dn_tlv = reader.next_tlv()?;
    let entry = wire::read_utf8(&dn_tlv, off)?.to_owned();

    let off = reader.offset();
    let attrs_tlv = reader.next_tlv()?;
    wire::expect_tag(&attrs_tlv, TagClass::Universal, true, 16, off)?;
    let mut attrs_reader = Reader::new(attrs_tlv.body, off);
    let mut attributes = Vec::new();
    while !attrs_reader.is_empty() {
        if attributes.len() >= limits.max_attributes_per_entry {
            return Err(DecodeError::LimitExceeded {
                kind: LimitKind::AttributesPerEntry,
            });
        }
        attributes.push(read_partial_attribute(&mut attrs_reader, limits)?);
    }

    Ok(ProtocolOp::AddRequest(AddRequest { entry, attributes }))
}

fn add_request_length(req: &AddRequest) -> usize {
    let attrs_body: usize = req.attributes.iter().map(partial_attribute_length).sum();
    let body = wire::octets_length(req.entry.as_bytes()) + wire::constructed_length(attrs_body);
    wire::constructed_length(body)
}

fn write_add_request(buf: &mut Vec<u8>, req: &AddRequest) {
    let mut body = Vec::with_capacity(add_request_length(req));
    wire::push_octets(&mut body, TagClass::Universal, 4, req.entry.as_bytes());
    let attrs_len: usize = req.attributes.iter().map(partial_attribute_length).sum();
    let mut attrs_body = Vec::with_capacity(attrs_len);
    for attr in &req.attributes {
        write_partial_attribute(&mut attrs_body, attr);
    }
    wire::wrap_constructed(&mut body, TagClass::Universal, 16, &attrs_body);
    wire::wrap_constructed(buf, TagClass::Application, ADD_REQUEST, &body);
}

fn decode_modify_dn_request(body: &[u8], offset: usize) -> Result<ProtocolOp, DecodeError> {
    let mut reader = Reader::new(body, offset);
    let off = reader.offset();
    let entry_tlv = reader.next_tlv()?;
    let entry = wire::read_utf8(&entry_tlv, off)?.to_owned();

    let off = reader.offset();
    let rdn_tlv = reader.next_tlv()?;
    let new_rdn = wire::read_utf8(&rdn_tlv, off)?.to_owned();

    let off = reader.offset();
    let del_tlv = reader.next_tlv()?;
    let delete_old_rdn =
        ldap_ber::decode_boolean(del_tlv.body).ok_or(DecodeError::IntegerOutOfRange(off))?;

    let new_superior = if !reader.is_empty() {
        let off = reader.offset();
        let tlv = reader.next_tlv()?;
        Some(wire::read_utf8(&tlv, off)?.to_owned())
    } else {
        None
    };

    Ok(ProtocolOp::ModifyDnRequest(ModifyDnRequest {
        entry,
        new_rdn,
        delete_old_rdn,
        new_superior,
    }))
}

fn modify_dn_request_length(req: &ModifyDnRequest) -> usize {
    let body = wire::octets_length(req.entry.as_bytes())
        + wire::octets_length(req.new_rdn.as_bytes())
        + wire::boolean_length()
        + req.new_superior.as_deref().map(|s| wire::octets_length(s.as_bytes())).unwrap_or(0);
    wire::constructed_length(body)
}

fn write_modify_dn_request(buf: &mut Vec<u8>, req: &ModifyDnRequest) {
    let mut body = Vec::with_capacity(modify_dn_request_length(req));
    wire::push_octets(&mut body, TagClass::Universal, 4, req.entry.as_bytes());
    wire::push_octets(&mut body, TagClass::Universal, 4, req.new_rdn.as_bytes());
    wire::push_boolean(&mut body, TagClass::Universal, 1, req.delete_old_rdn);
    if let Some(superior) = &req.new_superior {
        wire::push_octets(&mut body, TagClass::ContextSpecific, 0, superior.as_bytes());
    }
    wire::wrap_constructed(buf, TagClass::Application, MODIFY_DN_REQUEST, &body);
}

fn decode_compare_request(body: &[u8], offset: usize) -> Result<ProtocolOp, DecodeError> {
    let mut reader = Reader::new(body, offset);
    let off = reader.offset();
    let dn_tlv = reader.next_tlv()?;
    let entry = wire::read_utf8(&dn_tlv, off)?.to_owned();

    let off = reader.offset();
    let ava_tlv = reader.next_tlv()?;
    wire::expect_tag(&ava_tlv, TagClass::Universal, true, 16, off)?;
    let mut ava_reader = Reader::new(ava_tlv.body, off);
    let off = ava_reader.offset();
    let attr_tlv = ava_reader.next_tlv()?;
    let attribute_desc = wire::read_utf8(&attr_tlv, off)?.to_owned();
    let value_tlv = ava_reader.next_tlv()?;
    let assertion_value = value_tlv.body.to_vec();

    Ok(ProtocolOp::CompareRequest(CompareRequest {
        entry,
        attribute_desc,
        assertion_value,
    }))
}

fn compare_request_length(req: &CompareRequest) -> usize {
    let ava_body =
        wire::octets_length(req.attribute_desc.as_bytes()) + wire::octets_length(&req.assertion_value);
    let body = wire::octets_length(req.entry.as_bytes()) + wire::constructed_length(ava_body);
    wire::constructed_length(body)
}

fn write_compare_request(buf: &mut Vec<u8>, req: &CompareRequest) {
    let mut body = Vec::with_capacity(compare_request_length(req));
    wire::push_octets(&mut body, TagClass::Universal, 4, req.entry.as_bytes());
    let ava_len =
        wire::octets_length(req.attribute_desc.as_bytes()) + wire::octets_length(&req.assertion_value);
    let mut ava_body = Vec::with_capacity(ava_len);
    wire::push_octets(
        &mut ava_body,
        TagClass::Universal,
        4,
        req.attribute_desc.as_bytes(),
    );
    wire::push_octets(&mut ava_body, TagClass::Universal, 4, &req.assertion_value);
    wire::wrap_constructed(&mut body, TagClass::Universal, 16, &ava_body);
    wire::wrap_constructed(buf, TagClass::Application, COMPARE_REQUEST, &body);
}

fn decode_extended_request(body: &[u8], offset: usize) -> Result<ProtocolOp, DecodeError> {
    let mut reader = Reader::new(body, offset);
    let off = reader.offset();
    let name_tlv = reader.next_tlv()?;
    let request_name = wire::read_utf8(&name_tlv, off)?.to_owned();
    let request_value = if !reader.is_empty() {
        Some(reader.next_tlv()?.body.to_vec())
    } else {
        None
    };
    Ok(ProtocolOp::ExtendedRequest(ExtendedRequest {
        request_name,
        request_value,
    }))
}

fn extended_request_length(req: &ExtendedRequest) -> usize {
    wire::constructed_length(
        wire::octets_length(req.request_name.as_bytes())
            + req.request_value.as_deref().map(wire::octets_length).unwrap_or(0),
    )
}

fn write_extended_request(buf: &mut Vec<u8>, req: &ExtendedRequest) {
    let mut body = Vec::with_capacity(extended_request_length(req));
    wire::push_octets(
        &mut body,
        TagClass::ContextSpecific,
        0,
        req.request_name.as_bytes(),
    );
    if let Some(value) = &req.request_value {
        wire::push_octets(&mut body, TagClass::ContextSpecific, 1, value);
    }
    wire::wrap_constructed(buf, TagClass::Application, EXTENDED_REQUEST, &body);
}

fn decode_extended_response(body: &[u8], offset: usize) -> Result<ProtocolOp, DecodeError> {
    let mut reader = Reader::new(body, offset);
    let result = LdapResult::read_fields(&mut reader)?;
    let mut response_name = None;
    let mut response_value = None;
    while !reader.is_empty() {
        let off = reader.offset();
        let tlv = reader.next_tlv()?;
        match tlv.identifier.tag_number {
            10 => response_name = Some(wire::read_utf8(&tlv, off)?.to_owned()),
            11 => response_value = Some(tlv.body.to_vec()),
            other => {
                return Err(DecodeError::UnexpectedTag {
                    offset: off,
                    expected: 10,
                    got: other,
                })
            }
        }
    }
    Ok(ProtocolOp::ExtendedResponse(ExtendedResponse {
        result,
        response_name,
        response_value,
    }))
}

fn extended_response_length(resp: &ExtendedResponse) -> usize {
    let body = resp.result.fields_length()
        + resp.response_name.as_deref().map(|n| wire::octets_length(n.as_bytes())).unwrap_or(0)
        + resp.response_value.as_deref().map(wire::octets_length).unwrap_or(0);
    wire::constructed_length(body)
}

fn write_extended_response(buf: &mut Vec<u8>, resp: &ExtendedResponse) {
    let mut body = Vec::with_capacity(extended_response_length(resp));
    resp.result.write_fields(&mut body);
    if let Some(name) = &resp.response_name {
        wire::push_octets(&mut body, TagClass::ContextSpecific, 10, name.as_bytes());
    }
    if let Some(value) = &resp.response_value {
        wire::push_octets(&mut body, TagClass::ContextSpecific, 11, value);
    }
    wire::wrap_constructed(buf, TagClass::Application, EXTENDED_RESPONSE, &body);
}

fn decode_intermediate_response(body: &[u8], offset: usize) -> Result<ProtocolOp, DecodeError> {
    let mut reader = Reader::new(body, offset);
    let mut name = None;
    let mut value = None;
    while !reader.is_empty() {
        let off = reader.offset();
        let tlv = reader.next_tlv()?;
        match tlv.identifier.tag_number {
            0 => name = Some(wire::read_utf8(&tlv, off)?.to_owned()),
            1 => value = Some(tlv.body.to_vec()),
            other => {
                return Err(DecodeError::UnexpectedTag {
                    offset: off,
                    expected: 0,
                    got: other,
                })
            }
        }
    }
    Ok(ProtocolOp::IntermediateResponse(IntermediateResponse {
        name,
        value,
    }))
}

fn intermediate_response_length(resp: &IntermediateResponse) -> usize {
    let body = resp.name.as_deref().map(|n| wire::octets_length(n.as_bytes())).unwrap_or(0)
        + resp.value.as_deref().map(wire::octets_length).unwrap_or(0);
    wire::constructed_length(body)
}

fn write_intermediate_response(buf: &mut Vec<u8>, resp: &IntermediateResponse) {
    let mut body = Vec::with_capacity(intermediate_response_length(resp));
    if let Some(name) = &resp.name {
        wire::push_octets(&mut body, TagClass::ContextSpecific, 0, name.as_bytes());
    }
    if let Some(value) = &resp.value {
        wire::push_octets(&mut body, TagClass::ContextSpecific, 1, value);
    }
    wire::wrap_constructed(buf, TagClass::Application, INTERMEDIATE_RESPONSE, &body);
}

fn decode_simple_result(
    body: &[u8],
    offset: usize,
) -> Result<LdapResult, DecodeError> {
    let mut reader = Reader::new(body, offset);
    LdapResult::read_fields(&mut reader)
}

pub(super) fn decode_protocol_op(
    tlv: &ldap_ber::Tlv<'_>,
    offset: usize,
    limits: &DecodeLimits,
) -> Result<ProtocolOp, DecodeError> {
    match tlv.identifier.tag_number {
        BIND_REQUEST => decode_bind_request(tlv.body, offset),
        BIND_RESPONSE => decode_bind_response(tlv.body, offset),
        UNBIND_REQUEST => Ok(ProtocolOp::UnbindRequest),
        SEARCH_REQUEST => decode_search_request(tlv.body, offset),
        SEARCH_RESULT_ENTRY => decode_search_result_entry(tlv.body, offset, limits),
        SEARCH_RESULT_DONE => decode_simple_result(tlv.body, offset).map(ProtocolOp::SearchResultDone),
        SEARCH_RESULT_REFERENCE => decode_search_result_reference(tlv.body, offset),
        MODIFY_REQUEST => decode_modify_request(tlv.body, offset, limits),
        MODIFY_RESPONSE => decode_simple_result(tlv.body, offset).map(ProtocolOp::ModifyResponse),
        ADD_REQUEST => decode_add_request(tlv.body, offset, limits),
        ADD_RESPONSE => decode_simple_result(tlv.body, offset).map(ProtocolOp::AddResponse),
        DELETE_REQUEST => Ok(ProtocolOp::DeleteRequest(
            wire::read_utf8(tlv, offset)?.to_owned(),
        )),
        DELETE_RESPONSE => decode_simple_result(tlv.body, offset).map(ProtocolOp::DeleteResponse),
        MODIFY_DN_REQUEST => decode_modify_dn_request(tlv.body, offset),
        MODIFY_DN_RESPONSE => {
            decode_simple_result(tlv.body, offset).map(ProtocolOp::ModifyDnResponse)
        }
        COMPARE_REQUEST => decode_compare_request(tlv.body, offset),
        COMPARE_RESPONSE => decode_simple_result(tlv.body, offset).map(ProtocolOp::CompareResponse),
        ABANDON_REQUEST => Ok(ProtocolOp::AbandonRequest(wire::read_integer(tlv, offset)?)),
        EXTENDED_REQUEST => decode_extended_request(tlv.body, offset),
        EXTENDED_RESPONSE => decode_extended_response(tlv.body, offset),
        INTERMEDIATE_RESPONSE => decode_intermediate_response(tlv.body, offset),
        other => Err(DecodeError::UnknownProtocolOp { tag: other, offset }),
    }
}

fn simple_result_length(result: &LdapResult) -> usize {
    wire::constructed_length(result.fields_length())
}

fn write_simple_result(buf: &mut Vec<u8>, result: &LdapResult, tag: u8) {
    let mut body = Vec::with_capacity(result.fields_length());
    result.write_fields(&mut body);
    wire::wrap_constructed(buf, TagClass::Application, tag, &body);
}

/// Bytes [`encode_protocol_op`] would write for `op`, without writing
/// anything. Mirrors the `write_*`/`*_length` pairing one level up: every
/// `ProtocolOp` variant dispatches to its own pre-sizing counterpart so a
/// caller (ultimately [`super::encode::encode`]) can allocate its output
/// buffer exactly once.
pub(super) fn compute_length(op: &ProtocolOp) -> usize {
    match op {
        ProtocolOp::BindRequest(req) => bind_request_length(req),
        ProtocolOp::BindResponse(resp) => bind_response_length(resp),
        ProtocolOp::UnbindRequest => wire::empty_length(),
        ProtocolOp::SearchRequest(req) => search_request_length(req),
        ProtocolOp::SearchResultEntry(entry) => search_result_entry_length(entry),
        ProtocolOp::SearchResultDone(result) => simple_result_length(result),
        ProtocolOp::SearchResultReference(urls) => search_result_reference_length(urls),
        ProtocolOp::ModifyRequest(req) => modify_request_length(req),
        ProtocolOp::ModifyResponse(result) => simple_result_length(result),
        ProtocolOp::AddRequest(req) => add_request_length(req),
        ProtocolOp::AddResponse(result) => simple_result_length(result),
        ProtocolOp::DeleteRequest(dn) => wire::octets_length(dn.as_bytes()),
        ProtocolOp::DeleteResponse(result) => simple_result_length(result),
        ProtocolOp::ModifyDnRequest(req) => modify_dn_request_length(req),
        ProtocolOp::ModifyDnResponse(result) => simple_result_length(result),
        ProtocolOp::CompareRequest(req) => compare_request_length(req),
        ProtocolOp::CompareResponse(result) => simple_result_length(result),
        ProtocolOp::AbandonRequest(id) => wire::integer_length(*id),
        ProtocolOp::ExtendedRequest(req) => extended_request_length(req),
        ProtocolOp::ExtendedResponse(resp) => extended_response_length(resp),
        ProtocolOp::IntermediateResponse(resp) => intermediate_response_length(resp),
    }
}

pub(super) fn encode_protocol_op(op: &ProtocolOp, buf: &mut Vec<u8>) {
    match op {
        ProtocolOp::BindRequest(req) => write_bind_request(buf, req),
        ProtocolOp::BindResponse(resp) => write_bind_response(buf, resp),
        ProtocolOp::UnbindRequest => {
            wire::write_tlv_empty(buf, TagClass::Application, UNBIND_REQUEST)
        }
        ProtocolOp::SearchRequest(req) => write_search_request(buf, req),
        ProtocolOp::SearchResultEntry(entry) => write_search_result_entry(buf, entry),
        ProtocolOp::SearchResultDone(result) => write_simple_result(buf, result, SEARCH_RESULT_DONE),
        ProtocolOp::SearchResultReference(urls) => write_search_result_reference(buf, urls),
        ProtocolOp::ModifyRequest(req) => write_modify_request(buf, req),
        ProtocolOp::ModifyResponse(result) => write_simple_result(buf, result, MODIFY_RESPONSE),
        ProtocolOp::AddRequest(req) => write_add_request(buf, req),
        ProtocolOp::AddResponse(result) => write_simple_result(buf, result, ADD_RESPONSE),
        ProtocolOp::DeleteRequest(dn) => {
            wire::push_octets(buf, TagClass::Application, DELETE_REQUEST, dn.as_bytes())
        }
        ProtocolOp::DeleteResponse(result) => write_simple_result(buf, result, DELETE_RESPONSE),
        ProtocolOp::ModifyDnRequest(req) => write_modify_dn_request(buf, req),
        ProtocolOp::ModifyDnResponse(result) => write_simple_result(buf, result, MODIFY_DN_RESPONSE),
        ProtocolOp::CompareRequest(req) => write_compare_request(buf, req),
        ProtocolOp::CompareResponse(result) => write_simple_result(buf, result, COMPARE_RESPONSE),
        ProtocolOp::AbandonRequest(id) => {
            wire::push_integer(buf, TagClass::Application, ABANDON_REQUEST, *id)
        }
        ProtocolOp::ExtendedRequest(req) => write_extended_request(buf, req),
        ProtocolOp::ExtendedResponse(resp) => write_extended_response(buf, resp),
        ProtocolOp::IntermediateResponse(resp) => write_intermediate_response(buf, resp),
    }
}
