//! Material definitions and the GPU constant block they upload
//!
//! A material is a constant block plus four texture pool indices. Setters
//! clamp values to the ranges the shaders expect and keep the feature flags
//! in step with the assigned textures, so the block can be uploaded as-is.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

use crate::resources::texture_pool::{FLAT_NORMAL_SLOT, NEUTRAL_ORM_SLOT, WHITE_TEXTURE_SLOT};
use crate::resources::ShaderId;

bitflags! {
    /// Shader feature switches stored in the material block
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MaterialFlags: u32 {
        /// Discard pixels below the alpha cutoff
        const ALPHA_TEST = 1 << 0;
        /// Render both faces
        const DOUBLE_SIDED = 1 << 1;
        /// Skip lighting
        const UNLIT = 1 << 2;
        /// Sample the normal map
        const USE_NORMAL_MAP = 1 << 3;
        /// Sample the occlusion/roughness/metallic map
        const USE_ORM_MAP = 1 << 4;
        /// Add the emissive term
        const USE_EMISSIVE = 1 << 5;
    }
}

/// How the decal texture is combined with the albedo in the pixel shader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum BlendMode {
    /// Decal ignored
    #[default]
    Off = 0,
    /// albedo * decal
    Multiply = 1,
    /// albedo * decal * 2
    Multiply2x = 2,
    /// albedo + decal
    Additive = 3,
    /// Interpolate by the decal alpha
    AlphaLerp = 4,
    /// Modulate by the decal luminance
    Luminance = 5,
}

impl BlendMode {
    /// Value written to the constant block
    #[allow(clippy::cast_precision_loss)]
    pub const fn shader_value(self) -> f32 {
        self as u32 as f32
    }
}

/// Material constant block
///
/// Layout matches a 16-byte aligned shader constant buffer: four `float4`
/// colors followed by three `float4` scalar groups.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialData {
    /// RGBA base color
    pub base_color: [f32; 4],
    /// RGB specular color
    pub specular_color: [f32; 4],
    /// RGB emissive color, intensity in w
    pub emissive_color: [f32; 4],
    /// UV tiling in xy, UV offset in zw
    pub uv_tiling_offset: [f32; 4],
    /// Metalness 0..1
    pub metallic: f32,
    /// Roughness 0..1
    pub roughness: f32,
    /// Normal map strength 0..2
    pub normal_scale: f32,
    /// Ambient occlusion strength 0..1
    pub occlusion_strength: f32,
    /// Blinn-Phong exponent
    pub shininess: f32,
    /// Opacity 0..1, below 1 routes draws to the transparent queue
    pub transparency: f32,
    /// Alpha test threshold
    pub alpha_cutoff: f32,
    /// 1 when shadows darken this material
    pub receive_shadows: f32,
    /// Decal [`BlendMode`] as float
    pub blend_mode: f32,
    /// Decal blend weight 0..1
    pub blend_factor: f32,
    /// [`MaterialFlags`] bits
    pub flags: u32,
    /// Padding to 16 bytes
    pub _padding: f32,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            specular_color: [1.0, 1.0, 1.0, 1.0],
            emissive_color: [0.0, 0.0, 0.0, 0.0],
            uv_tiling_offset: [1.0, 1.0, 0.0, 0.0],
            metallic: 0.0,
            roughness: 1.0,
            normal_scale: 1.0,
            occlusion_strength: 1.0,
            shininess: 32.0,
            transparency: 1.0,
            alpha_cutoff: 0.5,
            receive_shadows: 1.0,
            blend_mode: BlendMode::Off.shader_value(),
            blend_factor: 1.0,
            flags: 0,
            _padding: 0.0,
        }
    }
}

/// Texture pool indices a material samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureSlots {
    /// Albedo texture
    pub albedo: u32,
    /// Tangent-space normal map
    pub normal: u32,
    /// Occlusion/roughness/metallic map
    pub orm: u32,
    /// Decal texture blended over the albedo
    pub decal: u32,
}

impl Default for TextureSlots {
    fn default() -> Self {
        Self {
            albedo: WHITE_TEXTURE_SLOT,
            normal: FLAT_NORMAL_SLOT,
            orm: NEUTRAL_ORM_SLOT,
            decal: WHITE_TEXTURE_SLOT,
        }
    }
}

/// A material registered with the object registry
#[derive(Debug, Clone)]
pub struct Material {
    data: MaterialData,
    textures: TextureSlots,
    blend_mode: BlendMode,
    cast_shadows: bool,
    sort_id: u32,
    pub(crate) shader: Option<ShaderId>,
    /// Debug name
    pub name: Option<String>,
}

impl Material {
    pub(crate) fn new(sort_id: u32) -> Self {
        Self {
            data: MaterialData::default(),
            textures: TextureSlots::default(),
            blend_mode: BlendMode::Off,
            cast_shadows: true,
            sort_id,
            shader: None,
            name: None,
        }
    }

    /// Constant block as uploaded
    pub const fn data(&self) -> &MaterialData {
        &self.data
    }

    /// Texture pool indices
    pub const fn textures(&self) -> &TextureSlots {
        &self.textures
    }

    /// Shader the material is drawn with
    pub const fn shader(&self) -> Option<ShaderId> {
        self.shader
    }

    /// Creation-order serial used for queue sorting
    pub const fn sort_id(&self) -> u32 {
        self.sort_id
    }

    /// Feature flags
    pub const fn flags(&self) -> MaterialFlags {
        MaterialFlags::from_bits_truncate(self.data.flags)
    }

    fn set_flag(&mut self, flag: MaterialFlags, enabled: bool) {
        let mut flags = self.flags();
        flags.set(flag, enabled);
        self.data.flags = flags.bits();
    }

    // Colors

    /// Set the RGBA base color
    pub fn set_base_color(&mut self, color: [f32; 4]) {
        self.data.base_color = color.map(|c| c.clamp(0.0, 1.0));
    }

    /// Set the RGB specular color
    pub fn set_specular_color(&mut self, r: f32, g: f32, b: f32) {
        self.data.specular_color = [r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0), 1.0];
    }

    /// Set the emissive color and its intensity
    ///
    /// A positive intensity enables the emissive term.
    pub fn set_emissive(&mut self, r: f32, g: f32, b: f32, intensity: f32) {
        let intensity = intensity.max(0.0);
        self.data.emissive_color = [r.max(0.0), g.max(0.0), b.max(0.0), intensity];
        self.set_flag(MaterialFlags::USE_EMISSIVE, intensity > 0.0);
    }

    // Surface response

    /// Set the Blinn-Phong exponent
    pub fn set_shininess(&mut self, shininess: f32) {
        self.data.shininess = shininess.clamp(1.0, 256.0);
    }

    /// Set opacity; values below 1 make the material transparent
    pub fn set_transparency(&mut self, transparency: f32) {
        self.data.transparency = transparency.clamp(0.0, 1.0);
    }

    /// Whether draws with this material go through the transparent queue
    pub fn is_transparent(&self) -> bool {
        self.data.transparency < 1.0
    }

    /// Set metalness
    pub fn set_metallic(&mut self, metallic: f32) {
        self.data.metallic = metallic.clamp(0.0, 1.0);
    }

    /// Set roughness
    pub fn set_roughness(&mut self, roughness: f32) {
        self.data.roughness = roughness.clamp(0.0, 1.0);
    }

    /// Set normal map strength
    pub fn set_normal_scale(&mut self, scale: f32) {
        self.data.normal_scale = scale.clamp(0.0, 2.0);
    }

    /// Set ambient occlusion strength
    pub fn set_occlusion_strength(&mut self, strength: f32) {
        self.data.occlusion_strength = strength.clamp(0.0, 1.0);
    }

    /// Set UV tiling and offset
    pub fn set_uv_transform(&mut self, tiling: [f32; 2], offset: [f32; 2]) {
        self.data.uv_tiling_offset = [tiling[0], tiling[1], offset[0], offset[1]];
    }

    /// Set the alpha test threshold
    pub fn set_alpha_cutoff(&mut self, cutoff: f32) {
        self.data.alpha_cutoff = cutoff.clamp(0.0, 1.0);
    }

    // Feature switches

    /// Enable alpha testing
    pub fn set_alpha_test(&mut self, enabled: bool) {
        self.set_flag(MaterialFlags::ALPHA_TEST, enabled);
    }

    /// Render both faces
    pub fn set_double_sided(&mut self, enabled: bool) {
        self.set_flag(MaterialFlags::DOUBLE_SIDED, enabled);
    }

    /// Skip lighting
    pub fn set_unlit(&mut self, enabled: bool) {
        self.set_flag(MaterialFlags::UNLIT, enabled);
    }

    /// Decal blend mode
    pub const fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// Set the decal blend mode
    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
        self.data.blend_mode = mode.shader_value();
    }

    /// Set the decal blend weight
    pub fn set_blend_factor(&mut self, factor: f32) {
        self.data.blend_factor = factor.clamp(0.0, 1.0);
    }

    // Shadows

    /// Whether surfaces with this material are drawn into the shadow map
    pub const fn cast_shadows(&self) -> bool {
        self.cast_shadows
    }

    /// Enable or disable shadow casting
    pub fn set_cast_shadows(&mut self, enabled: bool) {
        self.cast_shadows = enabled;
    }

    /// Whether the shadow map darkens this material
    pub fn receive_shadows(&self) -> bool {
        self.data.receive_shadows > 0.5
    }

    /// Enable or disable shadow receiving
    pub fn set_receive_shadows(&mut self, enabled: bool) {
        self.data.receive_shadows = if enabled { 1.0 } else { 0.0 };
    }

    // Textures

    /// Set the albedo pool index
    pub fn set_albedo_index(&mut self, index: u32) {
        self.textures.albedo = index;
    }

    /// Set the normal map pool index
    ///
    /// Any index other than the flat-normal fallback enables normal mapping.
    pub fn set_normal_index(&mut self, index: u32) {
        self.textures.normal = index;
        self.set_flag(MaterialFlags::USE_NORMAL_MAP, index != FLAT_NORMAL_SLOT);
    }

    /// Set the occlusion/roughness/metallic pool index
    ///
    /// Any index other than the neutral fallback enables ORM sampling.
    pub fn set_orm_index(&mut self, index: u32) {
        self.textures.orm = index;
        self.set_flag(MaterialFlags::USE_ORM_MAP, index != NEUTRAL_ORM_SLOT);
    }

    /// Set the decal pool index
    pub fn set_decal_index(&mut self, index: u32) {
        self.textures.decal = index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_block_is_16_byte_multiple() {
        assert_eq!(std::mem::size_of::<MaterialData>() % 16, 0);
        assert_eq!(bytemuck::bytes_of(&MaterialData::default()).len(), 112);
    }

    #[test]
    fn test_defaults_render_without_textures() {
        let material = Material::new(0);
        assert_eq!(material.textures().albedo, WHITE_TEXTURE_SLOT);
        assert_eq!(material.textures().normal, FLAT_NORMAL_SLOT);
        assert_eq!(material.textures().orm, NEUTRAL_ORM_SLOT);
        assert_eq!(material.textures().decal, WHITE_TEXTURE_SLOT);
        assert!(material.flags().is_empty());
        assert!(material.cast_shadows());
        assert!(material.receive_shadows());
        assert!(!material.is_transparent());
        assert_eq!(material.data().shininess, 32.0);
    }

    #[test]
    fn test_texture_indices_toggle_feature_flags() {
        let mut material = Material::new(0);
        material.set_normal_index(5);
        material.set_orm_index(6);
        assert!(material.flags().contains(MaterialFlags::USE_NORMAL_MAP | MaterialFlags::USE_ORM_MAP));

        material.set_normal_index(FLAT_NORMAL_SLOT);
        assert!(!material.flags().contains(MaterialFlags::USE_NORMAL_MAP));
        assert!(material.flags().contains(MaterialFlags::USE_ORM_MAP));
    }

    #[test]
    fn test_setters_clamp() {
        let mut material = Material::new(0);
        material.set_transparency(1.5);
        material.set_metallic(-1.0);
        material.set_normal_scale(3.0);
        assert_eq!(material.data().transparency, 1.0);
        assert_eq!(material.data().metallic, 0.0);
        assert_eq!(material.data().normal_scale, 2.0);

        material.set_transparency(0.4);
        assert!(material.is_transparent());
    }

    #[test]
    fn test_emissive_intensity_controls_flag() {
        let mut material = Material::new(0);
        material.set_emissive(1.0, 0.5, 0.0, 2.0);
        assert!(material.flags().contains(MaterialFlags::USE_EMISSIVE));
        assert_eq!(material.data().emissive_color, [1.0, 0.5, 0.0, 2.0]);

        material.set_emissive(1.0, 0.5, 0.0, 0.0);
        assert!(!material.flags().contains(MaterialFlags::USE_EMISSIVE));
    }

    #[test]
    fn test_blend_mode_written_to_block() {
        let mut material = Material::new(0);
        material.set_blend_mode(BlendMode::Multiply2x);
        assert_eq!(material.blend_mode(), BlendMode::Multiply2x);
        assert_eq!(material.data().blend_mode, 2.0);
    }
}
