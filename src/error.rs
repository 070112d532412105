/// Failure reported by a generation collaborator.
///
/// `code` is the HTTP status (or the `code` of an operation error) and
/// `status` the provider's canonical status string such as `NOT_FOUND`,
/// when either is known.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", display_generation_error(.code, .status, .message))]
pub struct GenerationError {
    pub code: Option<u16>,
    pub status: Option<String>,
    pub message: String,
}

impl GenerationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            status: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        let code = err.status().map(|s| s.as_u16());
        // The url would leak operation names into the message text.
        let err = err.without_url();
        Self {
            code,
            status: None,
            message: format!("request failed: {err}"),
        }
    }
}

fn display_generation_error(code: &Option<u16>, status: &Option<String>, message: &str) -> String {
    match (code, status) {
        (Some(code), Some(status)) => format!("{code} {status}: {message}"),
        (Some(code), None) => format!("{code}: {message}"),
        (None, Some(status)) => format!("{status}: {message}"),
        (None, None) => message.to_owned(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("input text is empty")]
    EmptyInput,

    #[error("analysis request failed: {0}")]
    Provider(#[from] GenerationError),

    #[error("analysis response is invalid: {0}")]
    InvalidResponse(String),
}
