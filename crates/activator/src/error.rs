#[derive(Debug, thiserror::Error)]
pub enum ActivatorError {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Dial(#[from] dial::DialError),

    #[error(transparent)]
    Prerequisites(#[from] dial_pppd::PrerequisiteError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ActivatorResult<T> = Result<T, ActivatorError>;
