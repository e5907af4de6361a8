/// Caller-configurable bounds on decoded PDUs.
///
/// Constructed directly (field literals or [`DecodeLimits::default`]); there
/// is no mutable builder, since the whole value is cheap to construct in one
/// step and never needs incremental mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Largest permitted outer `LDAPMessage` length, in bytes.
    pub max_pdu_size: usize,
    /// Largest permitted number of attributes in one `SearchResultEntry`.
    pub max_attributes_per_entry: usize,
    /// Largest permitted number of values for one attribute.
    pub max_values_per_attribute: usize,
}

impl Default for DecodeLimits {
    fn default() -> DecodeLimits {
        DecodeLimits {
            max_pdu_size: 16 * 1024 * 1024,
            max_attributes_per_entry: 1024,
            max_values_per_attribute: 1024,
        }
    }
}
