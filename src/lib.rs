//! # isy - codebase context for LLM chats
//!
//! isy turns a project directory into a single, line-numbered context
//! document that can be handed to a chat model, and keeps hashed snapshots
//! of the working tree ("branches") so a coding session always starts from a
//! known state.
//!
//! ## Overview
//!
//! - A `.isycontext` manifest lists gitignore-style patterns; every regular
//!   file below the project root matching one of them is selected.
//! - The context document carries project metadata, a tree of the selected
//!   files and each file's content with `N: ` line prefixes.
//! - A directory fingerprint is a SHA-256 over the contents of all files in
//!   a tree, in file-name order, skipping the `.isy` state folder.
//! - Branch snapshots are plain copies of the tree under `.isy/branches/<id>`,
//!   reused only while their fingerprint matches the working tree.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use isy::context::ContextBuilder;
//! use isy::paths::IsyPaths;
//! use isy::types::ProjectInfo;
//!
//! # fn main() -> isy::Result<()> {
//! let paths = IsyPaths::new(".");
//! let info = ProjectInfo::new("my-project", "A web service");
//!
//! let report = ContextBuilder::new(paths.root(), paths.manifest(), info).build()?;
//! println!("{} files, {} bytes", report.merged_count(), report.size());
//! # Ok(())
//! # }
//! ```
//!
//! ### Branch Snapshots
//!
//! ```rust,no_run
//! use isy::branch::BranchSelector;
//! use isy::paths::IsyPaths;
//! use isy::IsyError;
//!
//! # fn main() -> isy::Result<()> {
//! let selector = BranchSelector::for_project(&IsyPaths::new("."));
//! match selector.select(Some("a1b2c3d4e5")) {
//!     Ok(selection) => println!("on {}", selection.path().display()),
//!     Err(IsyError::DriftDetected { branch, .. }) => eprintln!("{} drifted", branch),
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`pattern`]: manifest parsing and path matching
//! - [`context`]: file selection and context document assembly
//! - [`tree`]: rendering of the selected files as a tree
//! - [`fingerprint`]: content hash of a directory
//! - [`copy`]: recursive copy of a directory
//! - [`branch`]: snapshot selection and drift detection
//! - [`chat`], [`responses`], [`session`]: chat endpoint, structured answers
//!   and interactive sessions
//! - [`edit`]: applying code modification steps
//! - [`config`], [`usage`], [`init`], [`paths`]: project state on disk
//! - [`prompt`]: terminal questions and answers
//! - [`tokens`]: token counts for a chat model
//! - [`error`]: error types and handling

pub mod branch;
pub mod chat;
pub mod config;
pub mod context;
pub mod copy;
pub mod edit;
pub mod error;
pub mod fingerprint;
pub mod init;
pub mod paths;
pub mod pattern;
pub mod prompt;
pub mod responses;
pub mod session;
pub mod tokens;
pub mod tree;
pub mod types;
pub mod usage;

mod utils;

pub use branch::BranchSelector;
pub use chat::{ChatClient, OpenAiClient};
pub use config::Config;
pub use context::{build_context, ContextBuilder};
pub use copy::copy_tree;
pub use error::{IsyError, Result};
pub use fingerprint::fingerprint;
pub use paths::IsyPaths;
pub use pattern::PatternSet;
pub use session::ChatSession;
pub use tokens::count_tokens;
pub use types::*;
pub use usage::UsageLedger;
pub use utils::{format_bytes, normalize_path};
