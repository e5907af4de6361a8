//! The typed LDAP message model and its BER codec (C2/C3).
//!
//! This module owns everything that's specific to the `LDAPMessage` grammar:
//! the envelope (`messageId`, `protocolOp`, controls), the per-operation
//! payload types, the `Filter` CHOICE's wire form, and the streaming
//! decoder/encoder pair that the rest of the crate is built around.

mod decode;
mod encode;
mod envelope;
mod filter_wire;
mod message;
mod result;
mod wire;

pub use decode::Decoder;
pub use encode::{compute_length, encode};
pub use message::{
    AddRequest, AuthChoice, BindRequest, BindResponse, CompareRequest, DerefAliases,
    ExtendedRequest, ExtendedResponse, IntermediateResponse, Message, ModOp, ModifyDnRequest,
    ModifyRequest, PartialAttribute, ProtocolOp, Scope, SearchRequest, SearchResultEntry,
};
pub use result::{LdapResult, ResultCode};
