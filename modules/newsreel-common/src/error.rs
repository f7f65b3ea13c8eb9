use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewsreelError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not ready: no thread index has been published yet")]
    NotReady,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("annotation error: {0}")]
    Annotation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
