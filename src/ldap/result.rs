//! `LdapResult`, the common response tail attached to every response PDU,
//! and the RFC 4511 Appendix A.1 result code table.
//!
//! Grounded on the teacher's `src/result.rs`, which carries the same field
//! layout and the same result-code name table (`LdapResult` there).

use ldap_ber::TagClass;

use super::wire::{self, Reader};
use crate::error::DecodeError;

/// An RFC 4511 Appendix A.1 result code. Codes this crate doesn't name are
/// preserved losslessly as `Other(n)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Success,
    OperationsError,
    ProtocolError,
    TimeLimitExceeded,
    SizeLimitExceeded,
    CompareFalse,
    CompareTrue,
    AuthMethodNotSupported,
    StrongerAuthRequired,
    Referral,
    AdminLimitExceeded,
    UnavailableCriticalExtension,
    ConfidentialityRequired,
    SaslBindInProgress,
    NoSuchAttribute,
    UndefinedAttributeType,
    InappropriateMatching,
    ConstraintViolation,
    AttributeOrValueExists,
    InvalidAttributeSyntax,
    NoSuchObject,
    AliasProblem,
    InvalidDnSyntax,
    AliasDereferencingProblem,
    InappropriateAuthentication,
    InvalidCredentials,
    InsufficientAccessRights,
    Busy,
    Unavailable,
    UnwillingToPerform,
    LoopDetect,
    NamingViolation,
    ObjectClassViolation,
    NotAllowedOnNonLeaf,
    NotAllowedOnRdn,
    EntryAlreadyExists,
    ObjectClassModsProhibited,
    AffectsMultipleDsas,
    Other(i64),
}

impl ResultCode {
    pub fn code(self) -> i64 {
        match self {
            ResultCode::Success => 0,
            ResultCode::OperationsError => 1,
            ResultCode::ProtocolError => 2,
            ResultCode::TimeLimitExceeded => 3,
            ResultCode::SizeLimitExceeded => 4,
            ResultCode::CompareFalse => 5,
            ResultCode::CompareTrue => 6,
            ResultCode::AuthMethodNotSupported => 7,
            ResultCode::StrongerAuthRequired => 8,
            ResultCode::Referral => 10,
            ResultCode::AdminLimitExceeded => 11,
            ResultCode::UnavailableCriticalExtension => 12,
            ResultCode::ConfidentialityRequired => 13,
            ResultCode::SaslBindInProgress => 14,
            ResultCode::NoSuchAttribute => 16,
            ResultCode::UndefinedAttributeType => 17,
            ResultCode::InappropriateMatching => 18,
            ResultCode::ConstraintViolation => 19,
            ResultCode::AttributeOrValueExists => 20,
            ResultCode::InvalidAttributeSyntax => 21,
            ResultCode::NoSuchObject => 32,
            ResultCode::AliasProblem => 33,
            ResultCode::InvalidDnSyntax => 34,
            ResultCode::AliasDereferencingProblem => 36,
            ResultCode::InappropriateAuthentication => 48,
            ResultCode::InvalidCredentials => 49,
            ResultCode::InsufficientAccessRights => 50,
            ResultCode::Busy => 51,
            ResultCode::Unavailable => 52,
            ResultCode::UnwillingToPerform => 53,
            ResultCode::LoopDetect => 54,
            ResultCode::NamingViolation => 64,
            ResultCode::ObjectClassViolation => 65,
            ResultCode::NotAllowedOnNonLeaf => 66,
            ResultCode::NotAllowedOnRdn => 67,
            ResultCode::EntryAlreadyExists => 68,
            ResultCode::ObjectClassModsProhibited => 69,
            ResultCode::AffectsMultipleDsas => 71,
            ResultCode::Other(n) => n,
        }
    }

    pub fn from_code(n: i64) -> ResultCode {
        match n {
            0 => ResultCode::Success,
            1 => ResultCode::OperationsError,
            2 => ResultCode::ProtocolError,
            3 => ResultCode::TimeLimitExceeded,
            4 => ResultCode::SizeLimitExceeded,
            5 => ResultCode::CompareFalse,
            6 => ResultCode::CompareTrue,
            7 => ResultCode::AuthMethodNotSupported,
            8 => ResultCode::StrongerAuthRequired,
            10 => ResultCode::Referral,
            11 => ResultCode::AdminLimitExceeded,
            12 => ResultCode::UnavailableCriticalExtension,
            13 => ResultCode::ConfidentialityRequired,
            14 => ResultCode::SaslBindInProgress,
            16 => ResultCode::NoSuchAttribute,
            17 => ResultCode::UndefinedAttributeType,
            18 => ResultCode::InappropriateMatching,
            19 => ResultCode::ConstraintViolation,
            20 => ResultCode::AttributeOrValueExists,
            21 => ResultCode::InvalidAttributeSyntax,
            32 => ResultCode::NoSuchObject,
            33 => ResultCode::AliasProblem,
            34 => ResultCode::InvalidDnSyntax,
            36 => ResultCode::AliasDereferencingProblem,
            48 => ResultCode::InappropriateAuthentication,
            49 => ResultCode::InvalidCredentials,
            50 => ResultCode::InsufficientAccessRights,
            51 => ResultCode::Busy,
            52 => ResultCode::Unavailable,
            53 => ResultCode::UnwillingToPerform,
            54 => ResultCode::LoopDetect,
            64 => ResultCode::NamingViolation,
            65 => ResultCode::ObjectClassViolation,
            66 => ResultCode::NotAllowedOnNonLeaf,
            67 => ResultCode::NotAllowedOnRdn,
            68 => ResultCode::EntryAlreadyExists,
            69 => ResultCode::ObjectClassModsProhibited,
            71 => ResultCode::AffectsMultipleDsas,
            other => ResultCode::Other(other),
        }
    }
}

/// The common result structure attached to every LDAP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapResult {
    pub result_code: ResultCode,
    pub matched_dn: String,
    pub diagnostic_message: String,
    pub referral: Option<Vec<String>>,
}

impl LdapResult {
    pub fn success() -> LdapResult {
        LdapResult {
            result_code: ResultCode::Success,
            matched_dn: String::new(),
            diagnostic_message: String::new(),
            referral: None,
        }
    }

    /// Reads the four `LdapResult` fields directly out of `reader`; these
    /// fields are not themselves wrapped in their own SEQUENCE tag, they sit
    /// inline inside whichever response op tag encloses them.
    pub(super) fn read_fields(reader: &mut Reader<'_>) -> Result<LdapResult, DecodeError> {
        let offset = reader.offset();
        let code_tlv = reader.next_tlv()?;
        wire::expect_tag(&code_tlv, TagClass::Universal, false, 10, offset)?;
        let result_code = ResultCode::from_code(wire::read_integer(&code_tlv, offset)?);

        let offset = reader.offset();
        let matched_tlv = reader.next_tlv()?;
        wire::expect_tag(&matched_tlv, TagClass::Universal, false, 4, offset)?;
        let matched_dn = wire::read_utf8(&matched_tlv, offset)?.to_owned();

        let offset = reader.offset();
        let diag_tlv = reader.next_tlv()?;
        wire::expect_tag(&diag_tlv, TagClass::Universal, false, 4, offset)?;
        let diagnostic_message = wire::read_utf8(&diag_tlv, offset)?.to_owned();

        let mut referral = None;
        if reader.peek_tag() == Some(0xA3) {
            let ref_tlv = reader.next_tlv()?;
            let mut inner = Reader::new(ref_tlv.body, reader.offset());
            let mut urls = Vec::new();
            while !inner.is_empty() {
                let off = inner.offset();
                let url_tlv = inner.next_tlv()?;
                urls.push(wire::read_utf8(&url_tlv, off)?.to_owned());
            }
            referral = Some(urls);
        }

        Ok(LdapResult {
            result_code,
            matched_dn,
            diagnostic_message,
            referral,
        })
    }

    /// Bytes [`write_fields`](Self::write_fields) would produce for this
    /// result, computed without writing anything (§4.3's length-computation
    /// half of the emit routine).
    pub(super) fn fields_length(&self) -> usize {
        let mut len = wire::integer_length(self.result_code.code())
            + wire::octets_length(self.matched_dn.as_bytes())
            + wire::octets_length(self.diagnostic_message.as_bytes());
        if let Some(referral) = &self.referral {
            let body: usize = referral.iter().map(|url| wire::octets_length(url.as_bytes())).sum();
            len += wire::constructed_length(body);
        }
        len
    }

    pub(super) fn write_fields(&self, buf: &mut Vec<u8>) {
        wire::push_integer(buf, TagClass::Universal, 10, self.result_code.code());
        wire::push_octets(buf, TagClass::Universal, 4, self.matched_dn.as_bytes());
        wire::push_octets(
            buf,
            TagClass::Universal,
            4,
            self.diagnostic_message.as_bytes(),
        );
        if let Some(referral) = &self.referral {
            let body_len = referral.iter().map(|url| wire::octets_length(url.as_bytes())).sum();
            let mut body = Vec::with_capacity(body_len);
            for url in referral {
                wire::push_octets(&mut body, TagClass::Universal, 4, url.as_bytes());
            }
            wire::wrap_constructed(buf, TagClass::ContextSpecific, 3, &body);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_roundtrips_through_other() {
        assert_eq!(ResultCode::from_code(999).code(), 999);
        assert_eq!(ResultCode::from_code(0), ResultCode::Success);
    }
}
