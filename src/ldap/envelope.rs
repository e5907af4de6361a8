//! The outer `LDAPMessage` envelope: `messageId`, the `protocolOp` CHOICE,
//! and the optional `[0] Controls` list.
//!
//! `Control` itself (`controlType`, `criticality` DEFAULT FALSE, `controlValue`
//! OPTIONAL) needs careful handling here: criticality is omitted on the wire
//! entirely when false, and an absent `controlValue` must stay distinguishable
//! from a present-but-empty one.

use indexmap::IndexMap;
use ldap_ber::{Identifier, TagClass};

use super::message::{compute_length, decode_protocol_op, encode_protocol_op, Message, ProtocolOp};
use super::wire::{self, Reader};
use crate::controls::Control;
use crate::error::DecodeError;
use crate::limits::DecodeLimits;

const CONTROLS_TAG: u8 = 0;
const BOOLEAN_TAG: u8 = 1;
const OCTET_STRING_TAG: u8 = 4;

fn decode_control(reader: &mut Reader<'_>) -> Result<Control, DecodeError> {
    let offset = reader.offset();
    let tlv = reader.next_tlv()?;
    wire::expect_tag(&tlv, TagClass::Universal, true, 16, offset)?;
    let mut inner = Reader::new(tlv.body, offset);

    let off = inner.offset();
    let oid_tlv = inner.next_tlv()?;
    let oid = wire::read_utf8(&oid_tlv, off)?.to_owned();

    let mut critical = false;
    let mut value = None;

    if inner.peek_tag() == Some(Identifier::new(TagClass::Universal, false, BOOLEAN_TAG).to_byte())
    {
        let off = inner.offset();
        let crit_tlv = inner.next_tlv()?;
        critical = ldap_ber::decode_boolean(crit_tlv.body)
            .ok_or(DecodeError::IntegerOutOfRange(off))?;
    }

    if !inner.is_empty() {
        let off = inner.offset();
        let value_tlv = inner.next_tlv()?;
        wire::expect_tag(&value_tlv, TagClass::Universal, false, OCTET_STRING_TAG, off)?;
        value = Some(value_tlv.body.to_vec());
    }

    Ok(Control {
        oid,
        critical,
        value,
    })
}

/// Bytes [`encode_control`] would write for `control`.
fn control_length(control: &Control) -> usize {
    let mut body = wire::octets_length(control.oid.as_bytes());
    if control.critical {
        body += wire::boolean_length();
    }
    if let Some(value) = &control.value {
        body += wire::octets_length(value);
    }
    wire::constructed_length(body)
}

fn encode_control(buf: &mut Vec<u8>, control: &Control) {
    let mut body = Vec::with_capacity(control_length(control));
    wire::push_octets(&mut body, TagClass::Universal, OCTET_STRING_TAG, control.oid.as_bytes());
    if control.critical {
        wire::push_boolean(&mut body, TagClass::Universal, BOOLEAN_TAG, true);
    }
    if let Some(value) = &control.value {
        wire::push_octets(&mut body, TagClass::Universal, OCTET_STRING_TAG, value);
    }
    wire::wrap_constructed(buf, TagClass::Universal, 16, &body);
}

/// Decodes one complete `LDAPMessage` from an already fully-buffered PDU,
/// `body` being the envelope's own SEQUENCE TLV (tag and length included).
pub fn decode_message(body: &[u8], limits: &DecodeLimits) -> Result<Message, DecodeError> {
    let mut outer = Reader::new(body, 0);
    let offset = outer.offset();
    let envelope_tlv = outer.next_tlv()?;
    wire::expect_tag(&envelope_tlv, TagClass::Universal, true, 16, offset)?;
    let mut reader = Reader::new(envelope_tlv.body, offset);

    let offset = reader.offset();
    let id_tlv = reader.next_tlv()?;
    let id = wire::read_integer(&id_tlv, offset)?;

    let offset = reader.offset();
    let op_tlv = reader.next_tlv()?;
    let op = decode_protocol_op(&op_tlv, offset, limits)?;

    let mut controls = IndexMap::new();
    if reader.peek_tag()
        == Some(Identifier::new(TagClass::ContextSpecific, true, CONTROLS_TAG).to_byte())
    {
        let offset = reader.offset();
        let controls_tlv = reader.next_tlv()?;
        let mut controls_reader = Reader::new(controls_tlv.body, offset);
        while !controls_reader.is_empty() {
            let control = decode_control(&mut controls_reader)?;
            if controls.contains_key(&control.oid) {
                return Err(DecodeError::DuplicateControl { oid: control.oid });
            }
            controls.insert(control.oid.clone(), control);
        }
    }

    if !reader.is_empty() {
        return Err(DecodeError::LengthOverrun {
            offset: reader.offset(),
        });
    }

    Ok(Message { id, op, controls })
}

/// Bytes [`encode_message`] would write for `msg`, envelope SEQUENCE
/// included, computed without writing anything. Satisfies the emitter's
/// precompute-then-write contract: callers size their output buffer from
/// this instead of letting it reallocate while filling in.
pub fn message_length(msg: &Message) -> usize {
    let mut body = wire::integer_length(msg.id) + compute_length(&msg.op);
    if !msg.controls.is_empty() {
        let controls_body: usize = msg.controls.values().map(control_length).sum();
        body += wire::constructed_length(controls_body);
    }
    wire::constructed_length(body)
}

/// Encodes one `LDAPMessage`, including its trailing controls list if any.
pub fn encode_message(msg: &Message, buf: &mut Vec<u8>) {
    let mut body = Vec::with_capacity(message_length(msg));
    wire::push_integer(&mut body, TagClass::Universal, 2, msg.id);
    encode_protocol_op(&msg.op, &mut body);
    if !msg.controls.is_empty() {
        let controls_len: usize = msg.controls.values().map(control_length).sum();
        let mut controls_body = Vec::with_capacity(controls_len);
        for control in msg.controls.values() {
            encode_control(&mut controls_body, control);
        }
        wire::wrap_constructed(&mut body, TagClass::ContextSpecific, CONTROLS_TAG, &controls_body);
    }
    wire::wrap_constructed(buf, TagClass::Universal, 16, &body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldap::message::{AuthChoice, BindRequest};

    #[test]
    fn control_with_default_criticality_omits_boolean() {
        let control = Control {
            oid: "2.16.840.1.113730.3.4.2".to_owned(),
            critical: false,
            value: None,
        };
        let mut buf = Vec::new();
        encode_control(&mut buf, &control);
        // SEQUENCE { OCTET STRING oid } only: no BOOLEAN, no second OCTET STRING.
        let mut reader = Reader::new(&buf, 0);
        let decoded = decode_control(&mut reader).unwrap();
        assert_eq!(decoded, control);
        assert!(!buf.windows(1).any(|w| w == [0x01]));
    }

    #[test]
    fn control_distinguishes_absent_from_empty_value() {
        let with_empty = Control {
            oid: "1.1".to_owned(),
            critical: false,
            value: Some(Vec::new()),
        };
        let mut buf = Vec::new();
        encode_control(&mut buf, &with_empty);
        let mut reader = Reader::new(&buf, 0);
        let decoded = decode_control(&mut reader).unwrap();
        assert_eq!(decoded.value, Some(Vec::new()));

        let without = Control {
            oid: "1.1".to_owned(),
            critical: false,
            value: None,
        };
        let mut buf2 = Vec::new();
        encode_control(&mut buf2, &without);
        let mut reader2 = Reader::new(&buf2, 0);
        let decoded2 = decode_control(&mut reader2).unwrap();
        assert_eq!(decoded2.value, None);
    }

    #[test]
    fn message_roundtrips_with_no_controls() {
        let msg = Message {
            id: 1,
            op: ProtocolOp::BindRequest(BindRequest {
                version: 3,
                name: String::new(),
                auth: AuthChoice::Simple(Vec::new()),
            }),
            controls: IndexMap::new(),
        };
        let mut buf = Vec::new();
        encode_message(&msg, &mut buf);
        let decoded = decode_message(&buf, &DecodeLimits::default()).unwrap();
        assert_eq!(decoded, msg);
    }
}
