//! Per-frame counters

/// What the last `render_scene` call did
///
/// Reset at the start of every frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Draws issued by the shadow pass
    pub shadow_draws: u32,
    /// Draws issued by the main pass
    pub draws: u32,
    /// Shader program binds in the main pass
    pub shader_binds: u32,
    /// Material binds in the main pass
    pub material_binds: u32,
    /// Entity constant uploads in the main pass
    pub transform_uploads: u32,
    /// Entity constant rebinds without upload in the main pass
    pub transform_rebinds: u32,
    /// Commands dropped because a referenced object was missing
    pub skipped_draws: u32,
    /// Active, visible meshes rejected by the camera's cull mask
    pub culled_meshes: u32,
}
