use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A prebuilt resource (index, corpus, model files) could not be loaded.
    #[error("Failed to load {resource}: {message}")]
    ResourceLoad { resource: String, message: String },

    /// A remote or compute-bound collaborator failed while serving a turn.
    #[error("Upstream service '{service}' failed: {message}")]
    Upstream { service: String, message: String },

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    pub fn resource_load(resource: impl Into<String>, message: impl ToString) -> Self {
        Self::ResourceLoad { resource: resource.into(), message: message.to_string() }
    }

    pub fn upstream(service: impl Into<String>, message: impl ToString) -> Self {
        Self::Upstream { service: service.into(), message: message.to_string() }
    }

    /// True for failures of an external collaborator during a turn.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
