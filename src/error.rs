#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller asked for a tile that does not exist. Never retried.
    #[error("invalid tile path: {path}: {reason}")]
    BadRequest { path: String, reason: String },

    /// The data source cannot be reached. The pool retries lazily on
    /// the next request, not this one.
    #[error("cannot connect to {target}: {source}")]
    Unavailable {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    /// The backend rejected or failed the rendered query.
    #[error("tile query failed: {source}")]
    QueryFailed {
        #[source]
        source: sqlx::Error,
    },

    /// A query resolved to no row at all. ST_AsMVT aggregation always
    /// yields a row per layer, so a missing row means the query is
    /// fundamentally broken, not that the tile is empty.
    #[error("tile query returned no row")]
    EmptyCursor,

    /// Malformed source configuration. A startup-time concern.
    #[error("invalid tile source: {0}")]
    Descriptor(String),

    #[error("invalid YAML in server config")]
    Config(#[from] serde_yaml::Error),

    #[error("cannot read server config")]
    ConfigIo(#[from] std::io::Error),
}

impl Error {
    pub fn bad_request(path: &str, reason: impl ToString) -> Error {
        Error::BadRequest {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}