//! Public encode entry point (C3): turns a [`Message`] into its BER wire form.

use std::io::Write;

use super::envelope::{encode_message, message_length};
use super::message::Message;
use crate::error::EncodeError;

/// Bytes [`encode`] would write for `msg`. Exposes the length-precomputation
/// pass on its own so a caller can size a pooled buffer or check a PDU against
/// a size limit before paying for the write pass.
pub fn compute_length(msg: &Message) -> usize {
    message_length(msg)
}

/// Encodes `msg` and writes the resulting bytes to `out`.
///
/// The encoder walks `msg` once to compute its exact wire length, allocates
/// a buffer of that size, then fills it in bottom-up without reallocating,
/// and writes the result in a single call, so a buffered or vectored `Write`
/// impl won't see partial writes mid-structure.
pub fn encode(msg: &Message, out: &mut impl Write) -> Result<(), EncodeError> {
    let mut buf = Vec::with_capacity(compute_length(msg));
    encode_message(msg, &mut buf);
    out.write_all(&buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldap::message::ProtocolOp;
    use crate::ldap::Message;
    use indexmap::IndexMap;

    #[test]
    fn encode_writes_full_pdu() {
        let msg = Message {
            id: 1,
            op: ProtocolOp::UnbindRequest,
            controls: IndexMap::new(),
        };
        let mut out = Vec::new();
        encode(&msg, &mut out).unwrap();
        assert_eq!(out, vec![0x30, 0x05, 0x02, 0x01, 0x01, 0x42, 0x00]);
    }

    #[test]
    fn compute_length_matches_actual_encoded_length() {
        let msg = Message {
            id: 7,
            op: ProtocolOp::UnbindRequest,
            controls: IndexMap::new(),
        };
        let mut out = Vec::new();
        encode(&msg, &mut out).unwrap();
        assert_eq!(compute_length(&msg), out.len());
    }
}
