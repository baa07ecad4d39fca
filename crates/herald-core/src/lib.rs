//! Core types, configuration, and error handling for Herald.
//!
//! This crate provides the shared foundation used by the other Herald crates:
//! - [`HeraldError`]: unified error type using `thiserror` and `miette`
//! - [`HeraldConfig`]: configuration loaded from `.herald.toml` and the environment
//! - Shared run data: [`PullRequestRef`], [`Iteration`], [`ChangedFile`],
//!   [`FileSnapshotPair`], [`InlineComment`], [`ReviewSummary`], [`PullRequestMeta`]

mod config;
mod error;
mod types;

pub use config::{AzureConfig, HeraldConfig, LlmConfig, ReviewConfig, SlackConfig};
pub use error::{BoxError, HeraldError};
pub use types::{
    ChangeKind, ChangedFile, FileSnapshotPair, InlineComment, Iteration, OutputFormat,
    PullRequestMeta, PullRequestRef, RepositoryInfo, ReviewSummary, Reviewer,
};

/// A convenience `Result` type for Herald operations.
pub type Result<T> = std::result::Result<T, HeraldError>;
