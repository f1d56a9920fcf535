use thiserror::Error;

/// Errors produced while encoding or decoding dynamic values.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("type `{0}` is not registered in the runtime type registry")]
    UnknownType(String),
    #[error("failed to SCALE-decode value as `{type_name}`: {source}")]
    Decode {
        type_name: String,
        source: codec::Error,
    },
    #[error("value conversion failed: {0}")]
    Conversion(#[from] serde_json::Error),
}
