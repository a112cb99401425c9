//! Headless weft backend.
//!
//! Mounts surfaces into plain in-memory view trees. Useful for tests and for running weft
//! without a platform UI.

pub mod backend;
mod host;

pub use backend::{HeadlessBackend, HeadlessError, HeadlessView, HeadlessViewRef};
pub use host::HeadlessHost;
