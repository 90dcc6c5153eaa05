//! Public rendering API
//!
//! This module contains the contracts a graphics backend implements: pass
//! control and binding ([`RenderBackend`]) plus resource creation
//! ([`GpuDevice`]), together with the opaque handles they exchange.

pub mod render_backend;

// Re-export commonly used types
pub use render_backend::{
    BackendResult, BufferHandle, BufferUsage, GpuDevice, RenderBackend, RenderTargetHandle,
    ShaderBindMode, ShaderHandle, TextureHandle,
};
