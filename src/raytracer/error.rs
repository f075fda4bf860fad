#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("empty render target ({width}x{height})")]
    EmptyImage { width: usize, height: usize },

    #[error("invalid parameters: {0}")]
    Params(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    pub fn params<T: ToString>(msg: T) -> Self {
        RenderError::Params(msg.to_string())
    }
}
