use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::provider::CredentialBroker;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
const FALLBACK_API_KEY_ENV: &str = "API_KEY";

/// The process-wide API key plus the "please pick another key" request flag.
///
/// Hosts surface `selection_requested` to the user (a banner in the app, a
/// stderr hint in the CLI) and call [`CredentialStore::select`] once a new
/// key is provided.
#[derive(Debug, Default)]
pub struct CredentialStore {
    api_key: RwLock<Option<String>>,
    selection_requested: AtomicBool,
}

impl CredentialStore {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: RwLock::new(normalize(api_key)),
            selection_requested: AtomicBool::new(false),
        }
    }

    pub fn from_env() -> Self {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .or_else(|| std::env::var(FALLBACK_API_KEY_ENV).ok());
        Self::new(api_key)
    }

    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn select(&self, api_key: &str) -> anyhow::Result<()> {
        let Some(api_key) = normalize(Some(api_key.to_owned())) else {
            anyhow::bail!("api key is empty");
        };
        *self
            .api_key
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(api_key);
        self.selection_requested.store(false, Ordering::SeqCst);
        tracing::info!("api key selected");
        Ok(())
    }

    pub fn selection_requested(&self) -> bool {
        self.selection_requested.load(Ordering::SeqCst)
    }
}

impl CredentialBroker for CredentialStore {
    fn has_credential(&self) -> bool {
        self.api_key().is_some()
    }

    fn request_credential(&self) {
        self.selection_requested.store(true, Ordering::SeqCst);
        tracing::warn!(
            env = API_KEY_ENV,
            "api key re-selection requested; provide a key from a paid Google Cloud project"
        );
    }
}

fn normalize(api_key: Option<String>) -> Option<String> {
    api_key
        .map(|k| k.trim().to_owned())
        .filter(|k| !k.is_empty())
}
