use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClvError {
    #[error("Missing required components: {}", .missing.join(", "))]
    MissingDependency { missing: Vec<String> },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Scorer '{scorer}' has no model loaded")]
    ModelUnavailable { scorer: String },

    #[error("Computation failed in {stage}: {reason}")]
    Computation { stage: &'static str, reason: String },

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Route not found: {path}")]
    RouteNotFound { path: String },

    #[error("Method {method} not allowed on {path}")]
    MethodNotAllowed { method: String, path: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ClvResult<T> = Result<T, ClvError>;
