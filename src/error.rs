use thiserror::Error;

use ldap_ber::BerReadError;

/// Failure to decode an LDAP PDU from its BER wire form.
///
/// Every variant that can occur mid-stream carries the byte offset (relative
/// to the start of the current PDU) at which the problem was detected.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unexpected end of input at offset {0}")]
    Truncated(usize),
    #[error("length frame overrun at offset {offset}")]
    LengthOverrun { offset: usize },
    #[error("invalid BER length at offset {offset}: {source}")]
    InvalidLength {
        offset: usize,
        #[source]
        source: BerReadError,
    },
    #[error("unknown protocol operation tag 0x{tag:02x} at offset {offset}")]
    UnknownProtocolOp { tag: u8, offset: usize },
    #[error("unexpected tag at offset {offset}: expected 0x{expected:02x}, got 0x{got:02x}")]
    UnexpectedTag {
        offset: usize,
        expected: u8,
        got: u8,
    },
    #[error("integer value out of range at offset {0}")]
    IntegerOutOfRange(usize),
    #[error("string is not valid UTF-8 at offset {0}")]
    StringNotUtf8(usize),
    #[error("duplicate control OID {oid} in one message")]
    DuplicateControl { oid: String },
    #[error("limit exceeded: {kind}")]
    LimitExceeded { kind: LimitKind },
}

/// Which configured limit (see [`crate::limits::DecodeLimits`]) was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LimitKind {
    #[error("PDU size")]
    PduSize,
    #[error("attributes per entry")]
    AttributesPerEntry,
    #[error("values per attribute")]
    ValuesPerAttribute,
}

/// Failure to encode a [`crate::ldap::Message`] to its BER wire form.
///
/// Per spec, every encode error is in principle avoidable by the caller
/// (values are checked before being written), so these are closer to
/// programmer-error reports than recoverable conditions.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("output buffer too small: needed {needed}, had {available}")]
    BufferTooSmall { needed: usize, available: usize },
    #[error("value out of range: {0}")]
    ValueOutOfRange(String),
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(i64),
    #[error("failed writing encoded message: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BerReadError> for DecodeError {
    fn from(source: BerReadError) -> DecodeError {
        DecodeError::InvalidLength { offset: 0, source }
    }
}
