use crate::error::BerReadError;
use crate::identifier::Identifier;
use crate::length::{BerLength, BerLengthEncoder};

/// A single decoded tag-length-value unit, borrowing its payload from the
/// input buffer.
#[derive(Debug, Clone, Copy)]
pub struct Tlv<'a> {
    pub identifier: Identifier,
    pub body: &'a [u8],
    encoded_len: usize,
}

impl<'a> Tlv<'a> {
    #[inline]
    pub fn encoded_len(&self) -> usize {
        self.encoded_len
    }
}

/// Reads one TLV from `data`. Returns the TLV and does not itself recurse into
/// constructed content; callers re-invoke `read_tlv` on `body` to descend.
pub fn read_tlv(data: &[u8]) -> Result<Tlv<'_>, BerReadError> {
    if data.is_empty() {
        return Err(BerReadError::NeedMoreData(1));
    }
    let identifier = Identifier::from_byte(data[0]);
    let length = BerLength::parse(&data[1..]).map_err(|e| match e {
        crate::error::BerLengthError::NeedMoreData(n) => BerReadError::NeedMoreData(n),
        other => BerReadError::Length(other),
    })?;

    let header_len = 1 + length.encoded_len();
    let value_len = length.value() as usize;
    let total_len = header_len + value_len;
    if data.len() < total_len {
        return Err(BerReadError::NeedMoreData(total_len - data.len()));
    }

    Ok(Tlv {
        identifier,
        body: &data[header_len..total_len],
        encoded_len: total_len,
    })
}

/// Writes the identifier and length octets for a TLV whose payload is
/// `payload_len` bytes; the caller appends the payload itself immediately
/// afterward.
pub fn write_tlv(buf: &mut Vec<u8>, identifier: Identifier, payload_len: usize) {
    buf.push(identifier.to_byte());
    let mut len_enc = BerLengthEncoder::default();
    buf.extend_from_slice(len_enc.encode(payload_len));
}

/// Total octets (tag + length + payload) a TLV with a `payload_len`-byte
/// payload occupies on the wire, in shortest length form. Lets a caller
/// precompute an outer envelope's size without first materializing the
/// payload bytes.
#[inline]
pub fn encoded_length(payload_len: usize) -> usize {
    1 + crate::length::encoded_length_octets(payload_len) + payload_len
}

#[cfg(test)]
mod encoded_length_tests {
    use super::*;
    use crate::identifier::TagClass;

    #[test]
    fn matches_actual_written_size() {
        for payload_len in [0, 1, 127, 128, 300, 70_000] {
            let mut buf = Vec::new();
            write_tlv(&mut buf, Identifier::new(TagClass::Universal, false, 4), payload_len);
            assert_eq!(encoded_length(payload_len), buf.len() + payload_len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::TagClass;

    #[test]
    fn read_and_write_roundtrip() {
        let mut buf = Vec::new();
        write_tlv(&mut buf, Identifier::new(TagClass::Universal, false, 2), 1);
        buf.push(0x05);

        let tlv = read_tlv(&buf).unwrap();
        assert_eq!(tlv.body, &[0x05]);
        assert_eq!(tlv.encoded_len(), 3);
    }

    #[test]
    fn truncated_body_asks_for_more() {
        let buf = [0x30, 0x05, 0x01];
        match read_tlv(&buf) {
            Err(BerReadError::NeedMoreData(n)) => assert_eq!(n, 3),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
