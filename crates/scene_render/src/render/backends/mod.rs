//! Backend implementations for the render module
//!
//! Only the headless recording backend ships with the crate. A graphics API
//! backend implements [`GpuDevice`](crate::render::GpuDevice) and
//! [`RenderBackend`](crate::render::RenderBackend) the same way.

/// Headless backend recording every call
pub mod recording;

pub use recording::{BackendCall, RasterState, RecordingBackend};
