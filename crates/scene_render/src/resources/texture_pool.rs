//! Texture pool contract and an in-memory implementation
//!
//! Materials refer to textures by stable pool index rather than by handle,
//! so a material's constant block never has to change when a texture view
//! is recreated. The first three slots always hold 1x1 fallbacks:
//!
//! | slot | content | used for |
//! |------|---------|----------|
//! | 0 | white `(255, 255, 255, 255)` | albedo, decal |
//! | 1 | flat normal `(128, 128, 255)` | normal map |
//! | 2 | neutral ORM `(255, 255, 0)` | occlusion/roughness/metallic |

use std::collections::HashMap;

use crate::render::api::TextureHandle;

/// Pool index of the white fallback texture
pub const WHITE_TEXTURE_SLOT: u32 = 0;

/// Pool index of the flat tangent-space normal fallback
pub const FLAT_NORMAL_SLOT: u32 = 1;

/// Pool index of the neutral occlusion/roughness/metallic fallback
pub const NEUTRAL_ORM_SLOT: u32 = 2;

/// Stable-index texture storage consumed by backends when binding materials
pub trait TexturePool {
    /// Index of `texture`, adding it on first use
    ///
    /// Invalid handles resolve to [`WHITE_TEXTURE_SLOT`].
    fn get_or_add(&mut self, texture: TextureHandle) -> u32;

    /// Handle stored at `index`
    fn get(&self, index: u32) -> Option<TextureHandle>;

    /// Index of the white fallback
    fn white_index(&self) -> u32 {
        WHITE_TEXTURE_SLOT
    }

    /// Index of the flat-normal fallback
    fn flat_normal_index(&self) -> u32 {
        FLAT_NORMAL_SLOT
    }

    /// Index of the neutral ORM fallback
    fn orm_index(&self) -> u32 {
        NEUTRAL_ORM_SLOT
    }

    /// Number of textures including the fallbacks
    fn len(&self) -> usize;

    /// Whether the pool is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory [`TexturePool`] deduplicating by handle
#[derive(Debug, Clone)]
pub struct TextureIndexPool {
    textures: Vec<TextureHandle>,
    index_by_handle: HashMap<TextureHandle, u32>,
}

impl TextureIndexPool {
    /// Create a pool seeded with the three fallback textures
    pub fn with_defaults(white: TextureHandle, flat_normal: TextureHandle, neutral_orm: TextureHandle) -> Self {
        let mut pool = Self {
            textures: Vec::with_capacity(16),
            index_by_handle: HashMap::new(),
        };
        for handle in [white, flat_normal, neutral_orm] {
            pool.push(handle);
        }
        pool
    }

    /// Index of `texture` if it has been added
    pub fn index_of(&self, texture: TextureHandle) -> Option<u32> {
        self.index_by_handle.get(&texture).copied()
    }

    fn push(&mut self, texture: TextureHandle) -> u32 {
        let index = u32::try_from(self.textures.len()).unwrap_or(u32::MAX);
        self.textures.push(texture);
        self.index_by_handle.entry(texture).or_insert(index);
        index
    }
}

impl TexturePool for TextureIndexPool {
    fn get_or_add(&mut self, texture: TextureHandle) -> u32 {
        if !texture.is_valid() {
            return WHITE_TEXTURE_SLOT;
        }
        if let Some(index) = self.index_of(texture) {
            return index;
        }
        let index = self.push(texture);
        log::trace!("Texture {:?} added to pool at index {}", texture, index);
        index
    }

    fn get(&self, index: u32) -> Option<TextureHandle> {
        self.textures.get(index as usize).copied()
    }

    fn len(&self) -> usize {
        self.textures.len()
    }
}
