//! Splitview Web Service
//!
//! Serves experiment configuration and the tracking script, accepts tracking
//! events and proxies page extraction requests for the preview tooling.

pub mod config;
pub mod error;
pub mod extraction;
pub mod registry;
pub mod server;
pub mod static_files;
pub mod tracking;

pub use config::WebConfig;
pub use error::{ApiError, FieldError};
pub use extraction::{HttpExtractor, PageExtractor, PageSnapshot};
pub use registry::ExperimentRegistry;
pub use server::WebServer;
pub use static_files::StaticFiles;
pub use tracking::{HttpTracker, LogTracker, MemoryTracker, TrackingService};
