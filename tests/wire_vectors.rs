//! Byte-exact wire vectors covering one scenario per PDU shape: a primitive
//! APPLICATION-tagged request, a response carrying a control with an
//! implicit-default BOOLEAN and an absent `controlValue`, and a response
//! carrying a referral.

use hex_literal::hex;
use indexmap::IndexMap;

use ldap_codec::controls::{Control, ControlRegistry, ManageDsaItControl};
use ldap_codec::ldap::{encode, AuthChoice, BindRequest, Message, ProtocolOp};
use ldap_codec::limits::DecodeLimits;
use ldap_codec::{Dn, Filter};

fn decode_one(bytes: &[u8]) -> Message {
    let mut decoder =
        ldap_codec::ldap::Decoder::new(ControlRegistry::with_standard_controls(), DecodeLimits::default());
    decoder
        .feed(bytes)
        .expect("decode should succeed")
        .expect("one complete message")
}

fn encode_to_vec(msg: &Message) -> Vec<u8> {
    let mut out = Vec::new();
    encode(msg, &mut out).unwrap();
    out
}

#[test]
fn scenario_a_abandon_request_roundtrips() {
    let bytes = hex!("30 06 02 01 03 50 01 02");
    let msg = decode_one(&bytes);
    assert_eq!(msg.id, 3);
    assert_eq!(msg.op, ProtocolOp::AbandonRequest(2));
    assert!(msg.controls.is_empty());
    assert_eq!(encode_to_vec(&msg), bytes);
}

#[test]
fn scenario_b_bind_request_with_paged_results_control() {
    let bytes = hex!(
        "30 50 02 01 01 60 2E 02 01 03 04 1F 75 69 64 3D"
        "61 6B 61 72 61 73 75 6C 75 2C 64 63 3D 65 78 61"
        "6D 70 6C 65 2C 64 63 3D 63 6F 6D 80 08 70 61 73"
        "73 77 6F 72 64 A0 1B 30 19 04 17 32 2E 31 36 2E"
        "38 34 30 2E 31 2E 31 31 33 37 33 30 2E 33 2E 34"
        "2E 32"
    );
    let msg = decode_one(&bytes);
    assert_eq!(msg.id, 1);
    match &msg.op {
        ProtocolOp::BindRequest(BindRequest { version, name, auth }) => {
            assert_eq!(*version, 3);
            assert_eq!(name, "uid=akarasulu,dc=example,dc=com");
            assert_eq!(auth, &AuthChoice::Simple(b"password".to_vec()));
        }
        other => panic!("expected BindRequest, got {other:?}"),
    }
    assert_eq!(msg.controls.len(), 1);
    let control = msg.controls.get("2.16.840.1.113730.3.4.2").unwrap();
    assert_eq!(
        control,
        &Control {
            oid: "2.16.840.1.113730.3.4.2".to_owned(),
            critical: false,
            value: None,
        }
    );
    assert_eq!(encode_to_vec(&msg), bytes);

    let registry = ControlRegistry::with_standard_controls();
    let payload = registry
        .decode_payload(control)
        .expect("OID is registered")
        .expect("empty value decodes");
    assert_eq!(
        payload.downcast_ref::<ManageDsaItControl>(),
        Some(&ManageDsaItControl)
    );
}

#[test]
fn scenario_c_delete_response_with_referral() {
    let bytes = hex!(
        "30 18 02 01 01 6B 13 0A 01 0A 04 00 04 00 A3 0A"
        "04 08 6C 64 61 70 3A 2F 2F 2F"
    );
    let msg = decode_one(&bytes);
    assert_eq!(msg.id, 1);
    match &msg.op {
        ProtocolOp::DeleteResponse(result) => {
            assert_eq!(result.result_code.code(), 10);
            assert_eq!(result.matched_dn, "");
            assert_eq!(result.diagnostic_message, "");
            assert_eq!(result.referral, Some(vec!["ldap:///".to_owned()]));
        }
        other => panic!("expected DeleteResponse, got {other:?}"),
    }
    assert_eq!(encode_to_vec(&msg), bytes);
}

#[test]
fn scenario_d_dn_normalization() {
    let dn = Dn::parse("CN = Sales + CN =   J. Smith , O = Widget Inc. , C = US").unwrap();
    assert_eq!(dn.normalized(), "cn=J. Smith+cn=Sales,o=Widget Inc.,c=US");
}

#[test]
fn scenario_e_filter_roundtrip() {
    let input = "(&(objectClass=person)(|(cn=a*)(cn=b*)))";
    let filter = Filter::parse(input).unwrap();
    assert_eq!(filter.to_rfc4515(), input);
}

#[test]
fn scenario_f_bind_request_length_precompute() {
    // version (1+1+1) + DN TLV (1+1+8) + simple auth TLV (1+1+8) = 23 bytes
    // of BindRequest body; wrapped in its own APPLICATION TLV (+2), plus the
    // messageID TLV (3 bytes) and the outer SEQUENCE header (+2): 23+2+3+2=30.
    let msg = Message {
        id: 1,
        op: ProtocolOp::BindRequest(BindRequest {
            version: 3,
            name: "cn=admin".to_owned(),
            auth: AuthChoice::Simple(b"password".to_vec()),
        }),
        controls: IndexMap::new(),
    };
    assert_eq!(ldap_codec::compute_length(&msg), 30);
    let bytes = encode_to_vec(&msg);
    assert_eq!(bytes.len(), 30);
    assert_eq!(decode_one(&bytes), msg);
}
