//! GPU-facing resources owned by the object registry
//!
//! Shaders, materials and surfaces are addressed by arena ids. Ids of
//! removed objects stop resolving instead of dangling.

pub mod material;
pub mod shader;
pub mod surface;
pub mod texture_pool;

pub use material::{BlendMode, Material, MaterialData, MaterialFlags, TextureSlots};
pub use shader::{Shader, ShaderSource, VertexFlags};
pub use surface::{Surface, SurfaceGpuBuffer, VertexStream};
pub use texture_pool::{TextureIndexPool, TexturePool, FLAT_NORMAL_SLOT, NEUTRAL_ORM_SLOT, WHITE_TEXTURE_SLOT};

slotmap::new_key_type! {
    /// Id of a material in the object registry
    pub struct MaterialId;

    /// Id of a shader in the object registry
    pub struct ShaderId;

    /// Id of a surface in the object registry
    pub struct SurfaceId;
}
