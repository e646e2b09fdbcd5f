use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid knowledge entry: {0}")]
    InvalidEntry(String),

    #[error("Knowledge source error: {0}")]
    KnowledgeSource(String),

    #[error("Index format error: {0}")]
    IndexFormat(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector index unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, Error>;
