use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Error)]
pub enum BerLengthError {
    #[error("need {0} more byte(s)")]
    NeedMoreData(usize),
    #[error("indefinite length is not allowed in LDAP BER")]
    Indefinite,
    #[error("length encoded in more than 4 length octets")]
    TooLong,
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum BerReadError {
    #[error("need {0} more byte(s)")]
    NeedMoreData(usize),
    #[error("invalid length: {0}")]
    Length(#[from] BerLengthError),
    #[error("declared length overruns the available data")]
    Truncated,
    #[error("identifier octet does not match the expected tag")]
    UnexpectedTag,
}
