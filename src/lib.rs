//! Manages preview deployments of pull requests: removes deployments which are not used by any
//! open pull request and keeps a single "deployment ready" comment on each pull request.
pub mod cleanup;
pub mod comment;
pub mod config;
pub mod error;
pub mod github;
pub mod now;

pub use cleanup::{cleanup, DeletionResult};
pub use comment::{sync_comment, CommentSyncResult};
pub use config::Config;
pub use error::{ConfigError, Error, TransportError};
