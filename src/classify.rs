//! Classification of video generation failures.
//!
//! The provider signals "this key cannot use this model" by reporting the
//! model as a missing entity. There is no dedicated error code for it, so the
//! rules below are a heuristic over the status code, the canonical status and
//! the message text. Keep every rule in [`ErrorClassifier`] so the pipeline
//! never inspects error text itself.

use crate::error::GenerationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The credential cannot reach the requested model or resource.
    AccessDenied,
    /// Anything else; handled as a per-scene failure.
    Transient,
}

#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    codes: Vec<u16>,
    statuses: Vec<String>,
    message_tokens: Vec<String>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self {
            codes: vec![404],
            statuses: vec!["NOT_FOUND".to_owned()],
            message_tokens: vec![
                "Requested entity was not found".to_owned(),
                "NOT_FOUND".to_owned(),
            ],
        }
    }
}

impl ErrorClassifier {
    /// A classifier with no rules; everything is transient.
    pub fn empty() -> Self {
        Self {
            codes: Vec::new(),
            statuses: Vec::new(),
            message_tokens: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.codes.push(code);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.statuses.push(status.into());
        self
    }

    pub fn with_message_token(mut self, token: impl Into<String>) -> Self {
        self.message_tokens.push(token.into());
        self
    }

    pub fn classify(&self, err: &GenerationError) -> FailureClass {
        if err.code.is_some_and(|code| self.codes.contains(&code)) {
            return FailureClass::AccessDenied;
        }

        if let Some(status) = err.status.as_deref()
            && self
                .statuses
                .iter()
                .any(|s| s.eq_ignore_ascii_case(status.trim()))
        {
            return FailureClass::AccessDenied;
        }

        if self
            .message_tokens
            .iter()
            .any(|token| err.message.contains(token.as_str()))
        {
            return FailureClass::AccessDenied;
        }

        FailureClass::Transient
    }
}
