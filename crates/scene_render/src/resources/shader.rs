//! Shader programs and the vertex layouts they consume

use std::path::Path;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::render::api::ShaderHandle;
use crate::resources::MaterialId;

bitflags! {
    /// Vertex streams a shader reads
    ///
    /// Decides which surface arrays must be present and uploaded.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct VertexFlags: u32 {
        /// Object-space position
        const POSITION = 1 << 0;
        /// Vertex normal
        const NORMAL = 1 << 1;
        /// Vertex color
        const COLOR = 1 << 2;
        /// First UV channel
        const TEX0 = 1 << 3;
        /// Second UV channel
        const TEX1 = 1 << 4;
        /// Tangent with handedness in w
        const TANGENT = 1 << 5;
        /// Four bone indices
        const BONE_INDICES = 1 << 6;
        /// Four bone weights
        const BONE_WEIGHTS = 1 << 7;

        /// Layout of a typical lit, textured, normal-mapped shader
        const STANDARD = Self::POSITION.bits() | Self::NORMAL.bits() | Self::TEX0.bits() | Self::TANGENT.bits();
        /// Layout of a skinned shader
        const SKINNED = Self::STANDARD.bits() | Self::BONE_INDICES.bits() | Self::BONE_WEIGHTS.bits();
    }
}

/// # Shader Source
///
/// The two stage sources and entry points handed to the shader provider,
/// plus the vertex layout the compiled program expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderSource {
    /// Path of the vertex stage source
    pub vertex_path: String,
    /// Entry point of the vertex stage
    pub vertex_entry: String,
    /// Path of the pixel stage source
    pub pixel_path: String,
    /// Entry point of the pixel stage
    pub pixel_entry: String,
    /// Vertex streams the program reads
    pub vertex_flags: VertexFlags,
}

impl ShaderSource {
    /// Create a shader source description with `main` entry points
    pub fn new(vertex_path: impl Into<String>, pixel_path: impl Into<String>, vertex_flags: VertexFlags) -> Self {
        Self {
            vertex_path: vertex_path.into(),
            vertex_entry: "main".to_string(),
            pixel_path: pixel_path.into(),
            pixel_entry: "main".to_string(),
            vertex_flags,
        }
    }

    /// Override the stage entry points
    pub fn with_entry_points(mut self, vertex_entry: impl Into<String>, pixel_entry: impl Into<String>) -> Self {
        self.vertex_entry = vertex_entry.into();
        self.pixel_entry = pixel_entry.into();
        self
    }

    /// Create shader source with automatic path resolution
    ///
    /// Tries the common shader locations so hosts can be started from
    /// different working directories.
    pub fn with_path_resolution(vertex_file: &str, pixel_file: &str, vertex_flags: VertexFlags) -> Self {
        let shader_dirs = [
            "shaders/",
            "resources/shaders/",
            "../shaders/",
            "./",
        ];

        let mut vertex_path = None;
        let mut pixel_path = None;

        for dir in &shader_dirs {
            let vertex_test = format!("{dir}{vertex_file}");
            let pixel_test = format!("{dir}{pixel_file}");

            if vertex_path.is_none() && Path::new(&vertex_test).exists() {
                vertex_path = Some(vertex_test);
            }
            if pixel_path.is_none() && Path::new(&pixel_test).exists() {
                pixel_path = Some(pixel_test);
            }

            if vertex_path.is_some() && pixel_path.is_some() {
                break;
            }
        }

        Self::new(
            vertex_path.unwrap_or_else(|| format!("shaders/{vertex_file}")),
            pixel_path.unwrap_or_else(|| format!("shaders/{pixel_file}")),
            vertex_flags,
        )
    }

    /// Check that both stages name a source and an entry point
    pub fn validate(&self) -> Result<(), String> {
        if self.vertex_path.is_empty() || self.vertex_entry.is_empty() {
            return Err("vertex stage needs a source path and an entry point".to_string());
        }
        if self.pixel_path.is_empty() || self.pixel_entry.is_empty() {
            return Err("pixel stage needs a source path and an entry point".to_string());
        }
        if !self.vertex_flags.contains(VertexFlags::POSITION) {
            return Err("vertex layout must contain POSITION".to_string());
        }
        Ok(())
    }
}

/// A compiled shader registered with the object registry
#[derive(Debug, Clone)]
pub struct Shader {
    handle: ShaderHandle,
    vertex_flags: VertexFlags,
    sort_id: u32,
    pub(crate) materials: Vec<MaterialId>,
    /// Debug name
    pub name: Option<String>,
}

impl Shader {
    pub(crate) fn new(handle: ShaderHandle, vertex_flags: VertexFlags, sort_id: u32) -> Self {
        Self {
            handle,
            vertex_flags,
            sort_id,
            materials: Vec::new(),
            name: None,
        }
    }

    /// Backend program handle
    pub const fn handle(&self) -> ShaderHandle {
        self.handle
    }

    /// Vertex streams the program reads
    pub const fn vertex_flags(&self) -> VertexFlags {
        self.vertex_flags
    }

    /// Creation-order serial used for queue sorting
    pub const fn sort_id(&self) -> u32 {
        self.sort_id
    }

    /// Materials currently drawn with this shader
    pub fn materials(&self) -> &[MaterialId] {
        &self.materials
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_layout_contains_tangents() {
        assert!(VertexFlags::STANDARD.contains(VertexFlags::TANGENT));
        assert!(VertexFlags::SKINNED.contains(VertexFlags::STANDARD | VertexFlags::BONE_WEIGHTS));
    }

    #[test]
    fn test_source_validation() {
        let source = ShaderSource::new("lit.vs", "lit.ps", VertexFlags::STANDARD);
        assert!(source.validate().is_ok());

        let no_entry = source.clone().with_entry_points("", "main");
        assert!(no_entry.validate().is_err());

        let no_position = ShaderSource::new("lit.vs", "lit.ps", VertexFlags::NORMAL);
        assert!(no_position.validate().is_err());
    }

    #[test]
    fn test_path_resolution_falls_back_to_shader_dir() {
        let source = ShaderSource::with_path_resolution("missing_vs.hlsl", "missing_ps.hlsl", VertexFlags::POSITION);
        assert_eq!(source.vertex_path, "shaders/missing_vs.hlsl");
        assert_eq!(source.pixel_path, "shaders/missing_ps.hlsl");
    }
}
