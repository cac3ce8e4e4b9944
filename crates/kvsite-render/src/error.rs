use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid namespace binding {name:?}: {reason}")]
    InvalidNamespace { name: String, reason: &'static str },

    #[error("failed to encode {field}: {source}")]
    Encoding {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid manifest: {0}")]
    Manifest(#[from] kvsite_types::TypeError),

    #[error("template placeholder {0} was not filled")]
    UnfilledPlaceholder(&'static str),
}

pub type RenderResult<T> = Result<T, RenderError>;
