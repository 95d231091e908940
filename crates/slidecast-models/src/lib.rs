//! Shared data models for Slidecast.
//!
//! This crate provides Serde-serializable types for:
//! - Narration scripts and their validation
//! - Per-job render progress
//! - Job identifiers

pub mod job;
pub mod progress;
pub mod script;

pub use job::JobId;
pub use progress::{RenderProgress, RenderStatus};
pub use script::{script_json_schema, Script, ScriptDecodeError, Section};
