//! Configuration system
//!
//! Renderer settings are plain serde structs that can be loaded from and
//! saved to TOML or RON files. The format is picked from the file extension.

pub use serde::{Serialize, Deserialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Values that parse but cannot be used together
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// # Renderer Configuration
///
/// Frame-level switches and the binding slots the backend uses for its
/// constant buffers and shadow resources. The render manager reads the
/// shadow switch; backends read the slots and the shadow map size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Master switch for the shadow pass
    pub shadows_enabled: bool,
    /// Edge length of the square shadow depth target in texels
    pub shadow_map_size: u32,
    /// Pixel-stage slot for the shadow map and its comparison sampler
    pub shadow_texture_slot: u32,
    /// Vertex-stage constant slot of the shadow matrix buffer
    pub shadow_matrix_slot: u32,
    /// Constant slot of the per-frame light array (vertex and pixel stages)
    pub light_buffer_slot: u32,
    /// Constant slot of the per-mesh entity constants
    pub entity_buffer_slot: u32,
    /// Constant slot of the per-material constants
    pub material_buffer_slot: u32,
    /// Constant slot of the skinning bone palette
    pub bone_buffer_slot: u32,
    /// Clear color of the main and render-to-texture passes
    pub clear_color: [f32; 4],
    /// Dump the queue layout at debug level whenever its shader count changes
    pub log_queue_changes: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            shadows_enabled: true,
            shadow_map_size: 2048,
            shadow_texture_slot: 7,
            shadow_matrix_slot: 3,
            light_buffer_slot: 1,
            entity_buffer_slot: 0,
            material_buffer_slot: 2,
            bone_buffer_slot: 4,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            log_queue_changes: true,
        }
    }
}

impl Config for RendererConfig {}

impl RendererConfig {
    /// Disable or enable the shadow pass
    pub fn with_shadows(mut self, enabled: bool) -> Self {
        self.shadows_enabled = enabled;
        self
    }

    /// Set the shadow map resolution
    pub fn with_shadow_map_size(mut self, size: u32) -> Self {
        self.shadow_map_size = size;
        self
    }

    /// Set the clear color
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Check that the settings can be used by a backend
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shadow_map_size == 0 {
            return Err(ConfigError::Invalid("shadow_map_size must be non-zero".to_string()));
        }

        let constant_slots = [
            ("entity_buffer_slot", self.entity_buffer_slot),
            ("light_buffer_slot", self.light_buffer_slot),
            ("material_buffer_slot", self.material_buffer_slot),
            ("shadow_matrix_slot", self.shadow_matrix_slot),
            ("bone_buffer_slot", self.bone_buffer_slot),
        ];
        for (i, (name, slot)) in constant_slots.iter().enumerate() {
            if let Some((other, _)) = constant_slots[i + 1..].iter().find(|(_, s)| s == slot) {
                return Err(ConfigError::Invalid(format!(
                    "{name} and {other} share constant slot {slot}"
                )));
            }
        }

        Ok(())
    }
}
