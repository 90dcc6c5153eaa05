//! Render layers
//!
//! Every entity belongs to one or more layers; a camera draws a mesh only
//! when the mesh's layers overlap the camera's cull mask.

use bitflags::bitflags;

bitflags! {
    /// 32-bit render layer set
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LayerMask: u32 {
        /// Regular scene geometry
        const DEFAULT = 1 << 0;
        /// Interface elements
        const UI = 1 << 1;
        /// Geometry drawn into reflections
        const REFLECTION = 1 << 2;
        /// Shadow-only proxies
        const SHADOW = 1 << 3;
        /// Effects
        const FX = 1 << 4;
        /// User layer
        const LAYER_5 = 1 << 5;
        /// User layer
        const LAYER_6 = 1 << 6;
        /// User layer
        const LAYER_7 = 1 << 7;
        /// Every layer
        const ALL = 0xFFFF_FFFF;
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl LayerMask {
    /// Whether an entity on `layers` is seen through this cull mask
    pub const fn sees(self, layers: Self) -> bool {
        self.intersects(layers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_except_default_hides_default_layer() {
        let cull = LayerMask::ALL & !LayerMask::DEFAULT;
        assert!(!cull.sees(LayerMask::DEFAULT));
        assert!(cull.sees(LayerMask::UI));
        assert!(cull.sees(LayerMask::DEFAULT | LayerMask::FX));
    }

    #[test]
    fn test_custom_high_layers_are_kept() {
        let custom = LayerMask::from_bits_retain(1 << 20);
        assert!(LayerMask::ALL.sees(custom));
        assert!(!LayerMask::DEFAULT.sees(custom));
    }
}
