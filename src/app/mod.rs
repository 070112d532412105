//! HTTP host for the pipeline: a JSON API over one [`Session`] plus the
//! credential store the web UI drives.

pub mod routes;

use std::sync::Arc;

use crate::credentials::CredentialStore;
use crate::pipeline::Session;

pub use routes::router;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
    pub credentials: Arc<CredentialStore>,
}
