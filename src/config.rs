//! Decode/encode configuration (spec.md §6, SPEC_FULL.md §S3).

/// Options threaded through a decode pass. Builder-style setters follow the
/// teacher's settings-struct convention rather than a derive-heavy config
/// crate, since the surface here is small and stable.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Protocol revision reported by the peer; gates block-info and
    /// custom-serialization headers via `ProtocolFeature`.
    pub client_version: u64,
    /// Decode `Enum8`/`Enum16` columns to their raw integer instead of
    /// resolving member names.
    pub enum_as_number: bool,
    /// Decode `Map` columns as `Value::Array` of 2-tuples instead of
    /// `Value::Map`, preserving duplicate keys unconditionally.
    pub map_as_array: bool,
    /// Minimum number of bytes the streaming driver requests per chunk
    /// before attempting another block decode.
    pub min_buffer_size: usize,
    /// Emit `tracing::debug!` on every block attempt, not just on
    /// underflow/resume; intended for test harnesses, not production.
    pub debug: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            client_version: 0,
            enum_as_number: false,
            map_as_array: false,
            min_buffer_size: 4096,
            debug: false,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client_version(mut self, version: u64) -> Self {
        self.client_version = version;
        self
    }

    pub fn with_enum_as_number(mut self, value: bool) -> Self {
        self.enum_as_number = value;
        self
    }

    pub fn with_map_as_array(mut self, value: bool) -> Self {
        self.map_as_array = value;
        self
    }

    pub fn with_min_buffer_size(mut self, value: usize) -> Self {
        self.min_buffer_size = value;
        self
    }

    pub fn with_debug(mut self, value: bool) -> Self {
        self.debug = value;
        self
    }
}

/// Encode-time options. Smaller surface than `DecodeOptions`: encode has no
/// enum/map rendering choice, since the caller already hands over typed
/// `Column`s.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    pub client_version: u64,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { client_version: 0 }
    }
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client_version(mut self, version: u64) -> Self {
        self.client_version = version;
        self
    }
}

/// Centralizes the two protocol-revision thresholds spec.md §6/§9 leaves as
/// an open question, so they're tunable from one place instead of scattered
/// magic numbers through the block/stream codec.
pub struct ProtocolFeature;

impl ProtocolFeature {
    /// Minimum client revision that carries a block-info header (§4.H).
    pub const BLOCK_INFO_REVISION: u64 = 54_451;
    /// Minimum client revision that carries a per-column custom
    /// serialization-kind byte (§4.G, LowCardinality/sparse).
    pub const CUSTOM_SERIALIZATION_REVISION: u64 = 54_454;

    pub fn supports_block_info(client_version: u64) -> bool {
        client_version >= Self::BLOCK_INFO_REVISION
    }

    pub fn supports_custom_serialization(client_version: u64) -> bool {
        client_version >= Self::CUSTOM_SERIALIZATION_REVISION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_thresholds_are_monotonic() {
        assert!(!ProtocolFeature::supports_block_info(0));
        assert!(ProtocolFeature::supports_block_info(ProtocolFeature::BLOCK_INFO_REVISION));
        assert!(!ProtocolFeature::supports_custom_serialization(
            ProtocolFeature::BLOCK_INFO_REVISION
        ));
        assert!(ProtocolFeature::supports_custom_serialization(
            ProtocolFeature::CUSTOM_SERIALIZATION_REVISION
        ));
    }
}
