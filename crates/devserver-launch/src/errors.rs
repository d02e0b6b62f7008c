use devserver_config::ConfigError;
use thiserror::Error;

/// Failure reported by a launcher.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The launcher refused the configuration; the message is shown as-is.
    #[error("{0}")]
    Rejected(String),

    #[error("dev server exited with {}", exit_label(.code))]
    Exited { code: Option<i32> },

    #[error("missing dependency: {0}")]
    MissingDependency(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl LaunchError {
    pub fn is_user_fixable(&self) -> bool {
        matches!(self, LaunchError::Rejected(_) | LaunchError::Exited { .. })
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Outcome of a failed [`crate::RunAdapter::execute`].
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Execution(LaunchError),

    #[error("dev server launch failed unexpectedly: {0}")]
    Tool(LaunchError),
}

impl RunError {
    pub fn is_user_fixable(&self) -> bool {
        !matches!(self, RunError::Tool(_))
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_user_fixable() { 1 } else { 2 }
    }
}

impl From<LaunchError> for RunError {
    fn from(err: LaunchError) -> Self {
        if err.is_user_fixable() {
            RunError::Execution(err)
        } else {
            RunError::Tool(err)
        }
    }
}
