//! LDAP v3 BER codec, DN normalizer and search filter parser.
//!
//! This crate is a pure codec: it turns bytes into typed LDAP messages and
//! back, parses and normalizes Distinguished Names, and parses and
//! serializes search filters. It does not open sockets, run an event loop,
//! or otherwise act as a client or server; wiring a [`ldap::Decoder`] and
//! [`ldap::encode`] up to actual I/O is left to the caller.

pub mod controls;
pub mod dn;
pub mod error;
pub mod filter;
pub mod ldap;
pub mod limits;
pub mod schema;

pub use controls::ControlRegistry;
pub use dn::Dn;
pub use error::{DecodeError, EncodeError};
pub use filter::Filter;
pub use ldap::{compute_length, Decoder, Message};
pub use limits::DecodeLimits;
