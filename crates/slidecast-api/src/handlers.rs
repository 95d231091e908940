//! Request handlers.

pub mod generate;
pub mod health;
pub mod index;
pub mod jobs;
pub mod progress;
pub mod video;

pub use generate::*;
pub use health::*;
pub use index::*;
pub use jobs::*;
pub use progress::*;
