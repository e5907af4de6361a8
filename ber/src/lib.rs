//! Minimal BER (Basic Encoding Rules) primitives for the LDAP subset of ASN.1.
//!
//! This crate only implements what RFC 4511 actually uses: definite-length
//! tag/length/value framing, two's-complement INTEGER/ENUMERATED, BOOLEAN and
//! OCTET STRING, plus the constructed SEQUENCE/SET/CHOICE framing needed to
//! walk a message tree. It does not attempt to be a general ASN.1 toolkit.

mod error;
pub use error::{BerLengthError, BerReadError};

mod identifier;
pub use identifier::{Identifier, TagClass};

mod length;
pub use length::{BerLength, BerLengthEncoder};

mod integer;
pub use integer::BerInteger;

mod primitive;
pub use primitive::{decode_boolean, encode_boolean};

mod tlv;
pub use tlv::{encoded_length, read_tlv, write_tlv, Tlv};
