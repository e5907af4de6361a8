//! Control registry (C5): OID-keyed factories for typed control payloads.
//!
//! Replaces the teacher's OSGi-style dynamic factory discovery and
//! `lazy_static!` global map with an explicit, non-global registry value that
//! the application populates once at startup (Design Notes §9).

mod standard;

use std::any::Any;
use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

use crate::error::{DecodeError, EncodeError};

pub use standard::{
    CascadeControl, EntryChangeControl, ManageDsaItControl, PagedResultsControl,
    PersistentSearchControl, ProxiedAuthorizationControl, SortKey, SortRequestControl,
    SortResponseControl, SubentriesControl,
};

/// Returned by [`ControlRegistry::register`] once the registry has been
/// [`ControlRegistry::finish`]ed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("control registry is already initialized")]
pub struct AlreadyInitialized;

/// A control as carried on the wire: an OID, a criticality flag, and an
/// opaque value. [`Message`](crate::ldap::Message) owns its controls and
/// preserves their on-wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub oid: String,
    pub critical: bool,
    pub value: Option<Vec<u8>>,
}

/// A control whose OID the registry didn't recognize: the raw value is kept
/// opaque rather than discarded.
pub type OpaqueControl = Control;

/// Capability for one control OID: decode its value into a typed payload,
/// and encode a typed payload back into wire bytes.
///
/// Implementations downcast the `&dyn Any` they receive to their own payload
/// type; callers are expected to know which payload type corresponds to a
/// given OID (typically by constructing it via the same codec).
pub trait ControlCodec: Send + Sync {
    fn oid(&self) -> &str;
    fn decode(&self, value: &[u8]) -> Result<Box<dyn Any + Send + Sync>, DecodeError>;
    fn encode(&self, payload: &dyn Any) -> Result<Vec<u8>, EncodeError>;
}

impl fmt::Debug for dyn ControlCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlCodec").field("oid", &self.oid()).finish()
    }
}

/// Maps control OIDs to [`ControlCodec`] implementations.
///
/// Entries are registered at startup via [`register`](Self::register); once
/// [`finish`](Self::finish) has been called, further registration attempts
/// return [`AlreadyInitialized`] rather than silently mutating shared state
/// that decoders may already be reading from.
pub struct ControlRegistry {
    codecs: IndexMap<String, Box<dyn ControlCodec>>,
    initialized: bool,
}

impl ControlRegistry {
    /// An empty registry with no codecs installed.
    pub fn new() -> ControlRegistry {
        ControlRegistry {
            codecs: IndexMap::new(),
            initialized: false,
        }
    }

    /// A registry pre-populated with the standard codec set from §4.4:
    /// Paged Results, Sort Request/Response, ManageDsaIT, Subentries,
    /// Persistent Search, Entry Change Notification, Cascade (tree delete),
    /// and Proxied Authorization.
    pub fn with_standard_controls() -> ControlRegistry {
        let mut registry = ControlRegistry::new();
        standard::register_all(&mut registry);
        registry
    }

    /// Registers a codec under its own OID. Fails if the registry has
    /// already been [`finish`](Self::finish)ed.
    pub fn register(&mut self, codec: Box<dyn ControlCodec>) -> Result<(), AlreadyInitialized> {
        if self.initialized {
            return Err(AlreadyInitialized);
        }
        self.insert(codec);
        Ok(())
    }

    /// Inserts a codec unconditionally, bypassing the `initialized` check.
    /// Used for bulk registration into a registry known to be fresh, where
    /// the fallibility of [`register`](Self::register) has no use.
    fn insert(&mut self, codec: Box<dyn ControlCodec>) {
        log::debug!("registering control codec for OID {}", codec.oid());
        self.codecs.insert(codec.oid().to_owned(), codec);
    }

    /// Freezes the registry against further registration. A [`Decoder`]
    /// built from a registry typically calls this once setup is complete.
    ///
    /// [`Decoder`]: crate::ldap::Decoder
    pub fn finish(mut self) -> ControlRegistry {
        self.initialized = true;
        self
    }

    pub fn get(&self, oid: &str) -> Option<&dyn ControlCodec> {
        self.codecs.get(oid).map(|b| b.as_ref())
    }

    /// Resolves a wire [`Control`] into a typed payload via its OID, per C5's
    /// decode half. `None` means the OID has no registered codec; the caller
    /// falls back to treating it as an opaque control (§4.4).
    pub fn decode_payload(
        &self,
        control: &Control,
    ) -> Option<Result<Box<dyn Any + Send + Sync>, DecodeError>> {
        let codec = self.get(&control.oid)?;
        let value = control.value.as_deref().unwrap_or(&[]);
        Some(codec.decode(value))
    }

    /// Serializes a typed payload into `controlValue` bytes via its OID's
    /// codec, per C5's encode half. Returns `None` if `oid` has no registered
    /// codec.
    pub fn encode_payload(
        &self,
        oid: &str,
        payload: &dyn Any,
    ) -> Option<Result<Vec<u8>, EncodeError>> {
        let codec = self.get(oid)?;
        Some(codec.encode(payload))
    }
}

impl Default for ControlRegistry {
    fn default() -> ControlRegistry {
        ControlRegistry::new()
    }
}

impl fmt::Debug for ControlRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlRegistry")
            .field("oids", &self.codecs.keys().collect::<Vec<_>>())
            .field("initialized", &self.initialized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_after_finish_fails() {
        let registry = ControlRegistry::new().finish();
        let mut registry = registry;
        let err = registry.register(Box::new(standard::ManageDsaItCodec));
        assert_eq!(err, Err(AlreadyInitialized));
    }

    #[test]
    fn standard_controls_are_preregistered() {
        let registry = ControlRegistry::with_standard_controls();
        assert!(registry.get(standard::MANAGE_DSA_IT_OID).is_some());
        assert!(registry.get(standard::PAGED_RESULTS_OID).is_some());
    }
}
