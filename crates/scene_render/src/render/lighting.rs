//! Per-frame light aggregation
//!
//! Packs every active light of the registry into one fixed-capacity block
//! that the backend uploads once per frame and binds to both shader stages.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{utils, Mat4};
use crate::render::api::RenderBackend;
use crate::scene::{LightRecord, ObjectRegistry};

/// Maximum number of lights in the per-frame light buffer
pub const MAX_LIGHTS: usize = 32;

/// Shader-visible light array
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightArrayBuffer {
    /// Packed lights; entries past `light_count` are zeroed
    pub lights: [LightRecord; MAX_LIGHTS],
    /// Number of valid entries
    pub light_count: u32,
    /// Pads the block to a 16-byte multiple
    pub _padding: [u32; 3],
}

impl Default for LightArrayBuffer {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl LightArrayBuffer {
    /// Valid entries
    pub fn active(&self) -> &[LightRecord] {
        let count = (self.light_count as usize).min(MAX_LIGHTS);
        &self.lights[..count]
    }
}

/// Light view and projection for the shadow pass
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShadowMatrices {
    /// World to light space
    pub view: [[f32; 4]; 4],
    /// Light space to clip
    pub projection: [[f32; 4]; 4],
}

impl ShadowMatrices {
    /// Pack a view/projection pair into GPU layout
    pub fn new(view: &Mat4, projection: &Mat4) -> Self {
        Self {
            view: utils::to_gpu(view),
            projection: utils::to_gpu(projection),
        }
    }
}

/// Collects active lights into a [`LightArrayBuffer`] and uploads it
#[derive(Debug, Default)]
pub struct LightAggregator {
    buffer: LightArrayBuffer,
    truncation_reported: bool,
}

impl LightAggregator {
    /// Create an aggregator with an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the light array from the registry and upload it
    ///
    /// Lights past [`MAX_LIGHTS`] are dropped. Returns the number of lights
    /// packed.
    pub fn update(&mut self, registry: &ObjectRegistry, backend: &mut dyn RenderBackend) -> usize {
        self.buffer = LightArrayBuffer::default();

        let mut count = 0;
        let mut dropped = 0;
        for &id in registry.lights() {
            let Some(entity) = registry.entity(id) else {
                continue;
            };
            if !entity.is_active() {
                continue;
            }
            let Some(light) = entity.as_light() else {
                continue;
            };

            if count < MAX_LIGHTS {
                self.buffer.lights[count] = light.record();
                count += 1;
            } else {
                dropped += 1;
            }
        }

        if dropped > 0 && !self.truncation_reported {
            log::debug!("Light buffer full: {} lights over the limit of {} ignored", dropped, MAX_LIGHTS);
        }
        // Report again the next time the buffer overflows after fitting
        self.truncation_reported = dropped > 0;

        // count <= MAX_LIGHTS
        self.buffer.light_count = count as u32;
        backend.upload_light_array(&self.buffer);
        count
    }

    /// Buffer built by the last update
    pub const fn buffer(&self) -> &LightArrayBuffer {
        &self.buffer
    }
}
