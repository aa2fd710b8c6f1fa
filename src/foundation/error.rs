/// Result alias used across the crate.
pub type FramepipeResult<T> = Result<T, FramepipeError>;

/// Errors surfaced by the encoding pipeline.
///
/// The variants follow the life of a session: `Validation`/`Config` before anything is spawned,
/// `Setup` while launching the encoder, `Transport` while streaming frames and `Shutdown` while
/// joining the encoder process.
#[derive(thiserror::Error, Debug)]
pub enum FramepipeError {
    /// A request or frame was rejected before touching the encoder.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// The pipe could not be created or the encoder could not be launched.
    #[error("setup error: {0}")]
    Setup(String),

    /// A frame write failed or was short; the byte stream is no longer in sync.
    #[error("transport error: {context}: {source}")]
    Transport {
        /// What was being written.
        context: String,
        /// Underlying pipe error.
        #[source]
        source: std::io::Error,
    },

    /// Waiting for the encoder failed or it exited unsuccessfully.
    #[error("shutdown error: {message}")]
    Shutdown {
        /// Human readable description.
        message: String,
        /// Encoder exit code, when the process exited normally.
        code: Option<i32>,
    },

    /// Anything else.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FramepipeError {
    /// Build a [`FramepipeError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FramepipeError::Config`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`FramepipeError::Setup`].
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup(msg.into())
    }

    /// Build a [`FramepipeError::Transport`].
    pub fn transport(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Transport {
            context: context.into(),
            source,
        }
    }

    /// Build a [`FramepipeError::Shutdown`].
    pub fn shutdown(msg: impl Into<String>, code: Option<i32>) -> Self {
        Self::Shutdown {
            message: msg.into(),
            code,
        }
    }

    /// Return `true` when a transport error was caused by the encoder closing its input.
    pub fn is_broken_pipe(&self) -> bool {
        matches!(
            self,
            Self::Transport { source, .. } if source.kind() == std::io::ErrorKind::BrokenPipe
        )
    }
}
