use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Hyper error: {0}")]
    HyperError(#[from] hyper::Error),
    #[error("Http error: {0}")]
    HttpError(#[from] hyper::http::Error),
    #[error("Invalid header")]
    InvalidHeader,
    #[error("The fixture server task failed: {0}")]
    JoinError(#[from] tokio::task::JoinError),
    #[error("Request validation failed: {0}")]
    RequestValidation(String),
}
