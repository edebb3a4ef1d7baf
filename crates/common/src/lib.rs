//! Splitview Common Library
//!
//! Shared types and the preview pipeline for the Splitview experiment
//! platform: style policy, document abstraction, variant applicator, preview
//! frame controller and operator controls.

pub mod applicator;
pub mod control;
pub mod dom;
pub mod error;
pub mod message;
pub mod preview;
pub mod style;
pub mod types;

// Re-export commonly used types
pub use applicator::{ApplyReport, VariantApplicator};
pub use control::{random_color, ControlPanel};
pub use dom::{Document, MemoryDocument, NodeId, STABLE_ID_ATTR};
pub use error::{Error, Result};
pub use message::{FrameMessage, MessageSink};
pub use preview::{FrameState, PreviewFrame, PreviewSession};
pub use style::StylePolicy;
pub use types::*;

/// Splitview version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
