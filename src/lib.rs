//! Revu - interactive AI code review in the terminal
//!
//! Streams a model's review of a diff into a terminal session, with
//! follow-up chat, per-file context pruning, search, copy and cancellation.

// Allow certain clippy warnings that are either stylistic or from external dependencies
#![allow(clippy::uninlined_format_args)] // Style preference
#![allow(clippy::format_push_string)] // Performance improvement but stylistic
#![allow(clippy::future_not_send)] // From Rig framework internals, can't fix
#![allow(clippy::return_self_not_must_use)] // Builder pattern is clear enough
#![allow(clippy::items_after_statements)] // Locally-scoped use statements are fine

pub mod backend;
pub mod cli;
pub mod config;
pub mod context;
pub mod headless;
pub mod instruction_presets;
pub mod logger;
pub mod providers;
pub mod runner;
pub mod snapshot;
pub mod store;
pub mod stream;
pub mod studio;
pub mod summarizer;
pub mod tokens;
pub mod ui;

// Re-export important structs and functions for easier testing
pub use backend::Backend;
pub use config::Config;
pub use context::ReviewContext;
pub use headless::run_simple;
pub use providers::{Provider, ProviderConfig};
pub use studio::{RunOptions, run};
