pub type PosevidResult<T> = Result<T, PosevidError>;

#[derive(thiserror::Error, Debug)]
pub enum PosevidError {
    /// Input file missing, unreadable, or structurally wrong.
    #[error("input error: {0}")]
    Input(String),

    /// Output stream could not be opened, written, or finalized.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Configuration values that cannot be rendered or encoded.
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PosevidError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
