use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,

    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    #[error(transparent)]
    Mcp(#[from] mcp::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
