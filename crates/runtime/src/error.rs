use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Model(#[from] crate::model::ModelError),

    #[error(transparent)]
    Tool(#[from] crate::tools::ToolError),

    #[error(transparent)]
    Mcp(#[from] mcp::Error),
}
