/// Decodes a BER BOOLEAN body octet. Per X.690, any non-zero octet is TRUE.
pub fn decode_boolean(body: &[u8]) -> Option<bool> {
    match body {
        [b] => Some(*b != 0),
        _ => None,
    }
}

/// Encodes a BOOLEAN body octet, canonicalizing TRUE to 0xFF as BER requires.
pub fn encode_boolean(value: bool) -> [u8; 1] {
    [if value { 0xFF } else { 0x00 }]
}
