use crate::envelope::ErrorParameters;

/// Core error type for the wiregram workspace.
///
/// Adapter crates map their specific failures into this type so the feed
/// loop and the call helpers can tell retryable failures from terminal ones.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    /// Network-level failure. The same call can be repeated at the same
    /// cursor without losing data.
    #[error("transport error: {0}")]
    Transport(String),

    /// The platform answered `ok=false`.
    #[error("api error {code}: {}", .description.as_deref().unwrap_or("no description"))]
    Api {
        code: i64,
        description: Option<String>,
        parameters: ErrorParameters,
    },

    /// A wire object did not match any expected schema.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// An application handler failed while processing an update. Isolated
    /// per handler and per update; never aborts siblings or the feed.
    #[error("handler error: {0}")]
    Handler(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Structural decode failure: a wire value did not have the shape the
/// schema requires. Returned as a value, never raised mid-decode for
/// ordinary control flow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("expected {expected}, found {found}")]
    Shape {
        expected: &'static str,
        found: &'static str,
    },

    #[error("missing required field `{0}`")]
    Missing(String),

    #[error("field `{key}`: expected {expected}, found {found}")]
    Field {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("unknown family `{0}`")]
    UnknownFamily(String),

    #[error("unknown variant `{family}.{variant}`")]
    UnknownVariant { family: String, variant: String },
}
