//! Business logic services.

pub mod chat;
pub mod content;
pub mod heuristic;
pub mod jobs;
pub mod render;

pub use chat::ChatContentGenerator;
pub use content::{content_generator, ContentError, ContentGenerator};
pub use heuristic::HeuristicContentGenerator;
pub use jobs::{JobRegistry, JobView, OutputClaim};
pub use render::{RenderPipeline, RENDER_ABORTED_MESSAGE};
