//! # Scene Render
//!
//! A backend-neutral real-time 3D rendering pipeline. It turns a scene of
//! meshes, lights and cameras into an ordered sequence of draw calls: a
//! shadow-map pass from the directional light, then a main pass that is
//! optionally redirected into an offscreen render target.
//!
//! ## Features
//!
//! - **Object registry**: arena-backed entities, materials, shaders and surfaces
//! - **Render queue**: per-frame draw list sorted to minimize state changes
//! - **Shadow mapping**: light view/projection derivation and a depth-only pass
//! - **Render-to-texture**: main pass into a target from its own camera
//! - **Backend contract**: any graphics API plugs in behind two traits
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_render::prelude::*;
//!
//! let config = RendererConfig::default();
//! let mut manager = RenderManager::new(Box::new(RecordingBackend::new(config.clone())), config);
//! let mut registry = ObjectRegistry::new();
//!
//! let camera = registry.create_camera();
//! manager.set_camera(Some(camera));
//! manager.render_scene(&mut registry);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod render;
pub mod resources;
pub mod scene;

/// Common imports for renderer users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, RendererConfig},
        foundation::math::{Mat4, Quat, Transform, Vec3},
        render::{
            BackendCall, FrameStats, GpuDevice, RecordingBackend, RenderBackend, RenderError,
            RenderManager, RenderResult, RenderTarget, RenderTargetHandle, ShaderHandle, TextureHandle,
            Viewport,
        },
        resources::{
            BlendMode, MaterialId, ShaderId, ShaderSource, SurfaceId, TextureIndexPool, TexturePool,
            VertexFlags,
        },
        scene::{CollisionMode, EntityId, LayerMask, LightType, ObjectRegistry},
    };
}
