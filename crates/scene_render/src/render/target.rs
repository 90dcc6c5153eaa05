//! Viewports and offscreen render targets

use crate::render::api::RenderTargetHandle;

/// API-neutral viewport rectangle with a depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge in pixels
    pub x: f32,
    /// Top edge in pixels
    pub y: f32,
    /// Width in pixels
    pub width: f32,
    /// Height in pixels
    pub height: f32,
    /// Depth mapped to the near plane
    pub min_depth: f32,
    /// Depth mapped to the far plane
    pub max_depth: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

impl Viewport {
    /// Full-surface viewport of the given size
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Width over height, or 1 for a degenerate viewport
    pub fn aspect_ratio(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

/// Offscreen color target the main pass can be redirected to
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTarget {
    /// Backend handle of the color texture
    pub handle: RenderTargetHandle,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Clear color applied when the pass begins
    pub clear_color: [f32; 4],
}

impl RenderTarget {
    /// Target cleared to opaque black
    pub fn new(handle: RenderTargetHandle, width: u32, height: u32) -> Self {
        Self {
            handle,
            width,
            height,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    /// Viewport covering the whole target
    #[allow(clippy::cast_precision_loss)]
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width as f32, self.height as f32)
    }
}
