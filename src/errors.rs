use thiserror::Error;

use crate::code::AssetCode;

/// Errors that can arise while registering, loading, selecting or syncing tool modes.
#[derive(Debug, Error)]
pub enum ToolModeError {
    /// A mode code was registered twice.
    #[error("tool mode '{0}' is already registered")]
    DuplicateRegistration(AssetCode),

    /// A mode was requested that has no registered constructor.
    #[error("don't know how to instantiate tool mode '{0}'; did you forget to register it?")]
    UnknownModeCode(AssetCode),

    /// A group was requested that was never registered.
    #[error("don't know how to instantiate tool mode group '{0}'; did you forget to register it?")]
    UnknownGroup(AssetCode),

    /// A selection write was attempted on the authoritative side.
    #[error("tool mode selection must originate from the observing side")]
    InvalidSide,

    /// A string could not be parsed as a `domain:path` code.
    #[error("invalid code: {0}")]
    InvalidCode(String),

    /// A UI index did not map to a visible mode.
    #[error("selection index {index} out of range ({visible} visible modes)")]
    SelectionOutOfRange { index: usize, visible: usize },

    /// A mode rejected its configuration blob.
    #[error("error initializing tool mode '{code}': {reason}")]
    ModeInit { code: AssetCode, reason: String },

    /// A sync frame failed length, checksum or payload validation.
    #[error("malformed sync frame: {0}")]
    MalformedFrame(String),

    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around JSON parsing errors for asset files.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, asset reads).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },
}
