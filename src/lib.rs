//! Upskill - skill-domain chat client with a persisted bookshelf
//!
//! Talks to a remote assistant endpoint and post-processes its replies:
//! - Announces persona changes when the user switches skill domain
//! - Mines quoted book titles and cue-introduced resource links
//! - Keeps a deduplicated, persisted bookshelf of recommended books

pub mod app;
pub mod bookshelf;
pub mod config;
pub mod domain;
pub mod extract;
pub mod postprocess;
pub mod session;
pub mod store;
pub mod transport;

pub use app::{AppEvent, AppState, Author};
pub use bookshelf::{AddOutcome, Book, Bookshelf, ShelfFilter};
pub use domain::SkillDomain;
pub use extract::{Recommendation, Resource, UNKNOWN_AUTHOR};
pub use postprocess::{PostProcessor, ProcessedReply};
pub use session::SessionState;
pub use store::{FileStore, KeyValueStore, MemoryStore, SharedStore};
pub use transport::{ChatRequest, ChatTransport, HttpTransport};

use std::path::PathBuf;
use std::time::Duration;

/// Default chat endpoint of the upskill assistant server
pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/api/chat";

/// Default timeout for a single chat request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for Upskill
#[derive(Debug, Clone, PartialEq)]
pub struct UpskillConfig {
    /// URL the chat requests are POSTed to
    pub endpoint: String,

    /// Directory holding the persisted store
    pub data_dir: PathBuf,

    /// Skill domain active at startup
    pub initial_domain: SkillDomain,

    /// Timeout for one chat request
    pub request_timeout: Duration,
}

impl UpskillConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            data_dir,
            initial_domain: SkillDomain::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        self.data_dir = data_dir;
        self
    }

    pub fn with_initial_domain(mut self, domain: SkillDomain) -> Self {
        self.initial_domain = domain;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Result type for Upskill operations
pub type Result<T> = std::result::Result<T, UpskillError>;

/// Errors that can occur in Upskill
#[derive(Debug, thiserror::Error)]
pub enum UpskillError {
    #[error("{0}")]
    Transport(String),

    #[error("Malformed server response: {0}")]
    Payload(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
