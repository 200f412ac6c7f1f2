pub type ThumbResult<T> = Result<T, ThumbError>;

/// Internal failure kinds of the render pipeline.
///
/// Only [`crate::Renderer::try_render`] exposes these; [`crate::Renderer::render`] folds every
/// kind into the configured default thumbnail path.
#[derive(thiserror::Error, Debug)]
pub enum ThumbError {
    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("font error: {0}")]
    Font(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("persist error: {0}")]
    Persist(String),

    #[error("invalid track id: {0:?}")]
    InvalidTrackId(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ThumbError {
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn font(msg: impl Into<String>) -> Self {
        Self::Font(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn persist(msg: impl Into<String>) -> Self {
        Self::Persist(msg.into())
    }

    pub fn invalid_track_id(id: impl Into<String>) -> Self {
        Self::InvalidTrackId(id.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
