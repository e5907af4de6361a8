//! Shared BER plumbing for the LDAP message grammar (C2/C3).
//!
//! A thin layer over `ldap_ber`: a `Reader` walks a fully buffered PDU body
//! TLV by TLV (a struct-of-slices cursor, not a mutable `Position` object
//! passed by reference, per the Design Notes), and a handful of `push_*`
//! helpers append one TLV's bytes to an output `Vec<u8>` for the two-pass
//! length-then-write encoder (§4.1/§4.3).

use ldap_ber::{read_tlv, write_tlv, BerInteger, Identifier, TagClass};

use crate::error::DecodeError;

/// Reads sibling TLVs out of one already-delimited body slice.
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    data: &'a [u8],
    base_offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8], base_offset: usize) -> Reader<'a> {
        Reader { data, base_offset }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn offset(&self) -> usize {
        self.base_offset
    }

    /// Reads the next TLV, advancing past it.
    pub fn next_tlv(&mut self) -> Result<ldap_ber::Tlv<'a>, DecodeError> {
        let tlv = read_tlv(self.data).map_err(|e| match e {
            ldap_ber::BerReadError::NeedMoreData(_) => DecodeError::Truncated(self.base_offset),
            other => DecodeError::InvalidLength {
                offset: self.base_offset,
                source: other,
            },
        })?;
        let consumed = tlv.encoded_len();
        self.data = &self.data[consumed..];
        self.base_offset += consumed;
        Ok(tlv)
    }

    pub fn peek_tag(&self) -> Option<u8> {
        self.data.first().copied()
    }
}

pub fn expect_tag(
    tlv: &ldap_ber::Tlv<'_>,
    class: TagClass,
    constructed: bool,
    tag_number: u8,
    offset: usize,
) -> Result<(), DecodeError> {
    let want = Identifier::new(class, constructed, tag_number);
    if tlv.identifier.to_byte() != want.to_byte() {
        return Err(DecodeError::UnexpectedTag {
            offset,
            expected: want.to_byte(),
            got: tlv.identifier.to_byte(),
        });
    }
    Ok(())
}

pub fn read_integer(tlv: &ldap_ber::Tlv<'_>, offset: usize) -> Result<i64, DecodeError> {
    BerInteger::decode(tlv.body).ok_or(DecodeError::IntegerOutOfRange(offset))
}

pub fn read_utf8<'a>(tlv: &ldap_ber::Tlv<'a>, offset: usize) -> Result<&'a str, DecodeError> {
    std::str::from_utf8(tlv.body).map_err(|_| DecodeError::StringNotUtf8(offset))
}

/// Appends an INTEGER/ENUMERATED TLV with the given (possibly implicit) tag.
pub fn push_integer(buf: &mut Vec<u8>, class: TagClass, tag_number: u8, value: i64) {
    let body = BerInteger::encode(value);
    write_tlv(buf, Identifier::new(class, false, tag_number), body.len());
    buf.extend_from_slice(&body);
}

/// Appends an OCTET STRING TLV with the given (possibly implicit) tag.
pub fn push_octets(buf: &mut Vec<u8>, class: TagClass, tag_number: u8, value: &[u8]) {
    write_tlv(buf, Identifier::new(class, false, tag_number), value.len());
    buf.extend_from_slice(value);
}

/// Appends a BOOLEAN TLV with the given (possibly implicit) tag.
pub fn push_boolean(buf: &mut Vec<u8>, class: TagClass, tag_number: u8, value: bool) {
    let body = ldap_ber::encode_boolean(value);
    write_tlv(buf, Identifier::new(class, false, tag_number), body.len());
    buf.extend_from_slice(&body);
}

/// Appends a zero-length primitive TLV, used for the UnbindRequest op which
/// is declared `[APPLICATION 2] NULL` in RFC 4511's grammar.
pub fn write_tlv_empty(buf: &mut Vec<u8>, class: TagClass, tag_number: u8) {
    write_tlv(buf, Identifier::new(class, false, tag_number), 0);
}

/// Wraps `body` in a constructed TLV with the given (possibly implicit) tag.
pub fn wrap_constructed(out: &mut Vec<u8>, class: TagClass, tag_number: u8, body: &[u8]) {
    write_tlv(out, Identifier::new(class, true, tag_number), body.len());
    out.extend_from_slice(body);
}

/// Builds a constructed TLV's bytes from its already-encoded body.
pub fn constructed(class: TagClass, tag_number: u8, body: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 6);
    wrap_constructed(&mut out, class, tag_number, &body);
    out
}

// The `*_length` family below mirrors the `push_*`/`wrap_constructed` family
// above one-for-one: each returns the number of bytes its counterpart would
// write, tag and length octets included, without writing anything. Callers
// use these to size a body buffer exactly before filling it in, per §4.1/§4.3's
// two-pass (compute-then-write) model — the class/tag number never affects a
// TLV's length for LDAP's single-octet tag numbers, so only the payload
// matters here.

/// Bytes an INTEGER/ENUMERATED TLV encoding `value` would occupy.
pub fn integer_length(value: i64) -> usize {
    ldap_ber::encoded_length(BerInteger::encoded_len(value))
}

/// Bytes an OCTET STRING TLV wrapping `value` would occupy.
pub fn octets_length(value: &[u8]) -> usize {
    ldap_ber::encoded_length(value.len())
}

/// Bytes a BOOLEAN TLV would occupy.
pub fn boolean_length() -> usize {
    ldap_ber::encoded_length(1)
}

/// Bytes a zero-length primitive TLV (e.g. UnbindRequest's NULL) would occupy.
pub fn empty_length() -> usize {
    ldap_ber::encoded_length(0)
}

/// Bytes a constructed TLV wrapping a `body_len`-byte body would occupy.
pub fn constructed_length(body_len: usize) -> usize {
    ldap_ber::encoded_length(body_len)
}
