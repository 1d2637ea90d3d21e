use thiserror::Error;

/// Errors returned by [`crate::Store`]. The geometry errors are only produced by
/// [`crate::Store::new`], everything else can show up on any load or save. Marked as
/// non-exhaustive to allow for future additions without breaking the API.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// Chunks must hold at least one byte.
    #[error("invalid chunk size")]
    InvalidChunkSize,

    /// The config region needs at least one chunk and must not exceed the device.
    #[error("invalid config region")]
    InvalidConfigRegion,

    /// The encoded config record does not fit into a single chunk.
    #[error("config record larger than a chunk")]
    RecordTooLarge,

    /// The encoded tip record does not fit into a single chunk.
    #[error("tip record larger than a chunk")]
    TipTooLarge,

    /// The transport reports less capacity than `chunks * chunk_size`.
    #[error("device smaller than geometry")]
    DeviceTooSmall,

    /// The transport failed or timed out, or a chunk outside the device was addressed.
    #[error("device i/o error")]
    IoError,

    /// The data was read but its checksum doesn't match. Never written slots end up here too.
    #[error("checksum mismatch")]
    ChecksumError,

    /// The tip index is not below [`crate::Store::total_tip_slots`].
    #[error("tip index out of range")]
    IndexError,

    /// The config log was not initialized successfully. Call [`crate::Store::initialize`] again.
    #[error("config log not writable")]
    NotWritable,
}
