/// BER INTEGER / ENUMERATED content octets: two's-complement, shortest form.
pub struct BerInteger;

impl BerInteger {
    /// Decode the value octets of an INTEGER/ENUMERATED TLV body.
    ///
    /// Accepts any valid two's-complement encoding, not only the shortest
    /// form, so that non-canonical but well-formed peers still decode.
    pub fn decode(body: &[u8]) -> Option<i64> {
        if body.is_empty() || body.len() > 8 {
            return None;
        }
        let negative = body[0] & 0x80 != 0;
        let mut value: i64 = if negative { -1 } else { 0 };
        for &b in body {
            value = (value << 8) | b as i64;
        }
        Some(value)
    }

    /// Encode `value` into the shortest unambiguous two's-complement form.
    pub fn encode(value: i64) -> Vec<u8> {
        if value == 0 {
            return vec![0];
        }
        let bytes = value.to_be_bytes();
        bytes[8 - Self::encoded_len(value)..].to_vec()
    }

    /// Byte length `encode` would produce for `value`, without allocating.
    /// Lets a caller precompute an INTEGER TLV's size ahead of writing it.
    pub fn encoded_len(value: i64) -> usize {
        if value == 0 {
            return 1;
        }
        let bytes = value.to_be_bytes();
        let mut start = 0;
        while start < 7 {
            let b = bytes[start];
            let next = bytes[start + 1];
            // Strip a redundant leading byte only if the next byte's sign bit
            // already encodes the same sign.
            let redundant = (b == 0x00 && next & 0x80 == 0) || (b == 0xFF && next & 0x80 != 0);
            if !redundant {
                break;
            }
            start += 1;
        }
        8 - start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_small_values() {
        for v in [0i64, 1, -1, 127, 128, -128, -129, 255, 256, -256, i32::MAX as i64, i32::MIN as i64] {
            let enc = BerInteger::encode(v);
            assert_eq!(BerInteger::decode(&enc), Some(v), "value {v}");
        }
    }

    #[test]
    fn encoded_len_matches_encode() {
        for v in [0i64, 1, -1, 127, 128, -128, -129, 255, 256, -256, i64::MAX, i64::MIN] {
            assert_eq!(BerInteger::encoded_len(v), BerInteger::encode(v).len(), "value {v}");
        }
    }

    #[test]
    fn known_encodings() {
        assert_eq!(BerInteger::encode(3), vec![0x03]);
        assert_eq!(BerInteger::encode(2), vec![0x02]);
        assert_eq!(BerInteger::encode(-2), vec![0xFE]);
        assert_eq!(BerInteger::encode(128), vec![0x00, 0x80]);
        assert_eq!(BerInteger::decode(&[0x02]), Some(2));
        assert_eq!(BerInteger::decode(&[0x82]), Some(-126));
    }
}
