use thiserror::Error;

/// Engine-level errors using thiserror for structured error handling.
///
/// These errors represent domain-specific failures on the control path.
/// None of them is fatal: the engine stays usable after any reported
/// failure, and the render path never sees an error (a bus is only
/// connected after a successful bind).

/// Errors produced by an asset source while loading PCM data.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("asset not found: {0}")]
    AssetNotFound(String),

    #[error("unsupported format for asset {asset}: {reason}")]
    UnsupportedFormat { asset: String, reason: String },

    #[error("failed to read asset {asset}")]
    ReadFailed {
        asset: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Errors reported by engine playback operations.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("all {0} effect buses are busy")]
    PoolExhausted(usize),

    #[error("no sound loaded on the target bus")]
    NothingLoaded,
}

/// Result alias for engine control-path operations
pub type EngineResult<T> = Result<T, EngineError>;
