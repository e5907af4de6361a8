//! Streaming decoder (C3): accumulates bytes until one full `LDAPMessage` TLV
//! is available, then runs a single recursive-descent parse over it.
//!
//! Grounded on bytedance-g3's `LdapMessageReceiver`, which uses the same
//! grow-buffer-then-parse-whole-frame shape rather than a literal per-field
//! resumable state machine: BER's definite-length framing means the full
//! message size is known as soon as the outer SEQUENCE header is readable,
//! so there's nothing to gain from suspending mid-field.

use bytes::{Buf, BytesMut};
use ldap_ber::{read_tlv, BerReadError};

use super::envelope::decode_message;
use super::message::Message;
use crate::controls::ControlRegistry;
use crate::error::{DecodeError, LimitKind};
use crate::limits::DecodeLimits;

/// Incrementally assembles `LDAPMessage`s out of a byte stream.
///
/// Bytes handed to [`feed`](Decoder::feed) are appended to an internal
/// buffer; as soon as a complete PDU is present at the front of that buffer
/// it's parsed and returned, and its bytes are dropped from the buffer.
#[derive(Debug)]
pub struct Decoder {
    buf: BytesMut,
    limits: DecodeLimits,
    registry: ControlRegistry,
}

impl Decoder {
    /// Builds a decoder over the given control registry and decode limits.
    /// The registry is never mutated after this point; per §5 it outlives
    /// every message the decoder produces, and [`registry`](Self::registry)
    /// lets a caller resolve a message's controls into typed payloads
    /// (§4.4) without threading the registry through separately.
    pub fn new(registry: ControlRegistry, limits: DecodeLimits) -> Decoder {
        Decoder {
            buf: BytesMut::new(),
            limits,
            registry,
        }
    }

    /// The control registry this decoder resolves controls against.
    pub fn registry(&self) -> &ControlRegistry {
        &self.registry
    }

    /// Appends `bytes` to the internal buffer and attempts to extract one
    /// complete message. Returns `Ok(None)` when more input is needed, and
    /// can be called again with further bytes without losing progress.
    ///
    /// Only ever returns at most one message per call; a caller feeding a
    /// buffer that contains several concatenated PDUs should call `feed(&[])`
    /// in a loop afterward to drain the rest.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Option<Message>, DecodeError> {
        self.buf.extend_from_slice(bytes);

        match read_tlv(&self.buf) {
            Ok(tlv) => {
                let total_len = tlv.encoded_len();
                if total_len > self.limits.max_pdu_size {
                    self.buf.clear();
                    let err = DecodeError::LimitExceeded {
                        kind: LimitKind::PduSize,
                    };
                    log::debug!("decode failed: {err}");
                    return Err(err);
                }
                let pdu = self.buf.split_to(total_len);
                let message = decode_message(&pdu, &self.limits).map_err(|err| {
                    log::debug!("decode failed: {err}");
                    err
                })?;
                log::trace!("decoded message id {} ({} bytes)", message.id, total_len);
                Ok(Some(message))
            }
            Err(BerReadError::NeedMoreData(more)) => {
                if self.buf.len() + more > self.limits.max_pdu_size {
                    self.buf.clear();
                    let err = DecodeError::LimitExceeded {
                        kind: LimitKind::PduSize,
                    };
                    log::debug!("decode failed: {err}");
                    return Err(err);
                }
                Ok(None)
            }
            Err(other) => {
                self.buf.clear();
                let err = DecodeError::InvalidLength {
                    offset: 0,
                    source: other,
                };
                log::debug!("decode failed: {err}");
                Err(err)
            }
        }
    }

    /// Number of bytes currently buffered but not yet part of a complete PDU.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldap::message::{AuthChoice, BindRequest, ProtocolOp};
    use crate::ldap::{encode, Message};
    use indexmap::IndexMap;

    fn sample_message() -> Message {
        Message {
            id: 7,
            op: ProtocolOp::BindRequest(BindRequest {
                version: 3,
                name: "cn=admin,dc=example,dc=com".to_owned(),
                auth: AuthChoice::Simple(b"secret".to_vec()),
            }),
            controls: IndexMap::new(),
        }
    }

    #[test]
    fn feeds_byte_by_byte() {
        let msg = sample_message();
        let mut bytes = Vec::new();
        encode(&msg, &mut bytes).unwrap();

        let mut decoder = Decoder::new(ControlRegistry::new(), DecodeLimits::default());
        let mut decoded = None;
        for &b in &bytes {
            decoded = decoder.feed(&[b]).unwrap();
        }
        assert_eq!(decoded, Some(msg));
    }

    #[test]
    fn rejects_oversized_pdu() {
        let limits = DecodeLimits {
            max_pdu_size: 4,
            ..DecodeLimits::default()
        };
        let mut decoder = Decoder::new(ControlRegistry::new(), limits);
        // A SEQUENCE header declaring a 100-byte body, far past the limit.
        let header = [0x30, 0x64];
        match decoder.feed(&header) {
            Err(DecodeError::LimitExceeded {
                kind: LimitKind::PduSize,
            }) => {}
            other => panic!("expected limit error, got {other:?}"),
        }
    }
}
