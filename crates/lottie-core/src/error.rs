use thiserror::Error;

#[derive(Error, Debug)]
pub enum LottieError {
    #[error("Invalid animation document: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Unknown trim mode `{0}`, expected `simultaneous` or `individual`")]
    InvalidTrimMode(String),
}

pub type Result<T> = std::result::Result<T, LottieError>;
