//! # Rendering System
//!
//! Frame orchestration over an API-neutral backend. Each frame the
//! [`RenderManager`] runs a shadow pass from the directional light, then a
//! main pass (optionally redirected to a render target) that builds, sorts
//! and flushes the [`RenderQueue`].
//!
//! ## Architecture
//!
//! - **RenderManager**: Top-level frame coordinator and pass state machine
//! - **RenderQueue / RenderCommand**: Flat, sortable draw list rebuilt every frame
//! - **LightAggregator**: Packs active lights into one fixed-size upload
//! - **RenderBackend / GpuDevice**: Contracts a graphics API implements
//! - **RecordingBackend**: Headless backend that records every call
//!
//! The manager never talks to a graphics API directly. Everything goes
//! through the backend trait object injected at construction, so a second
//! backend can be swapped in without touching orchestration.

pub mod api;
pub mod backends;
pub mod command;
pub mod lighting;
pub mod manager;
pub mod render_queue;
pub mod stats;
pub mod target;

pub use api::{
    BufferHandle, BufferUsage, GpuDevice, RenderBackend, RenderTargetHandle, ShaderBindMode,
    ShaderHandle, TextureHandle,
};
pub use backends::{BackendCall, RasterState, RecordingBackend};
pub use command::{MaterialRef, RenderCommand, ShaderRef};
pub use lighting::{LightAggregator, LightArrayBuffer, ShadowMatrices, MAX_LIGHTS};
pub use manager::RenderManager;
pub use render_queue::RenderQueue;
pub use stats::FrameStats;
pub use target::{RenderTarget, Viewport};

use thiserror::Error;

/// # Rendering Errors
///
/// Failures surfaced by resource creation and by the GPU provider. Frame
/// orchestration itself never returns these; it logs and skips instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Renderer initialization failed during setup
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// A rendering operation failed during execution
    #[error("Rendering failed: {0}")]
    RenderingFailed(String),

    /// Resource creation or management failed
    ///
    /// Occurs when GPU resources (buffers, shaders) cannot be created,
    /// typically due to memory constraints or invalid data.
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),

    /// The backend or its device does not exist yet
    #[error("Render device not ready")]
    DeviceNotReady,

    /// Geometry streams are missing or inconsistent with the requested layout
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A mesh was created without a material while no default is registered
    #[error("No material given and no default material registered")]
    MissingDefaultMaterial,

    /// An id no longer refers to a live object of the expected kind
    #[error("Unknown handle: {0}")]
    UnknownHandle(String),

    /// A parent link would create a cycle or link an entity to itself
    #[error("Invalid hierarchy: {0}")]
    InvalidHierarchy(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
