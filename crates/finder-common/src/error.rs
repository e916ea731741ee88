/// Error types shared by the finder binaries.
///
/// Catalog failures are recoverable from the caller's point of view: the web front end logs
/// them and renders an empty result, the MCP server reports them as tool errors.
use crate::catalog::CatalogError;

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
