use std::collections::HashMap;

use crate::foundation::math::next_pow2;
use crate::texture::{Texture, TextureId, TextureSource};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct PoolKey {
    w: u32,
    h: u32,
    antialias: bool,
}

impl PoolKey {
    fn of(source: &TextureSource) -> Self {
        Self {
            w: source.pixel_width,
            h: source.pixel_height,
            antialias: source.antialias,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TexturePoolStats {
    /// Backing allocations created since the pool was built.
    pub allocated: u64,
    /// Successful `get_optimal_texture` calls.
    pub acquired: u64,
    /// `return_texture` calls.
    pub returned: u64,
    /// Textures currently sitting in free lists.
    pub retained: usize,
}

impl TexturePoolStats {
    /// Textures handed out and not yet returned.
    pub fn outstanding(&self) -> u64 {
        self.acquired.saturating_sub(self.returned)
    }
}

struct Bucket {
    key: PoolKey,
    free: Vec<Texture>,
}

/// Reuse pool for offscreen render targets.
///
/// Keyed by `(po2 width, po2 height, antialias)`. Requests are rounded up to power-of-two pixel
/// sizes so differently sized filter passes share backing allocations; the logical frame of a
/// handed-out texture is rewritten to the exact requested size.
///
/// Each renderer owns its own pool. Returning a texture the pool did not hand out, or returning
/// one twice, is a caller bug and panics.
pub struct TexturePool {
    stats: TexturePoolStats,
    bucket_idx_by_key: HashMap<PoolKey, usize>,
    buckets: Vec<Bucket>,
    key_by_texture: HashMap<TextureId, PoolKey>,
}

impl Default for TexturePool {
    fn default() -> Self {
        Self::new()
    }
}

impl TexturePool {
    pub fn new() -> Self {
        Self {
            stats: TexturePoolStats::default(),
            bucket_idx_by_key: HashMap::new(),
            buckets: Vec::new(),
            key_by_texture: HashMap::new(),
        }
    }

    pub fn stats(&self) -> TexturePoolStats {
        self.stats
    }

    /// True while `texture` is handed out by this pool.
    pub fn is_outstanding(&self, texture: &Texture) -> bool {
        self.key_by_texture.contains_key(&texture.id())
    }

    /// Hand out a texture whose logical frame is exactly `width x height` at `resolution`.
    ///
    /// The backing store is `next_pow2(ceil(width * resolution))` by
    /// `next_pow2(ceil(height * resolution))` device pixels.
    pub fn get_optimal_texture(
        &mut self,
        width: f64,
        height: f64,
        resolution: f64,
        antialias: bool,
    ) -> Texture {
        let resolution = if resolution.is_finite() && resolution > 0.0 {
            resolution
        } else {
            1.0
        };
        let po2_w = next_pow2(((width * resolution) - 1e-6).ceil().max(0.0) as u32);
        let po2_h = next_pow2(((height * resolution) - 1e-6).ceil().max(0.0) as u32);
        let key = PoolKey {
            w: po2_w,
            h: po2_h,
            antialias,
        };

        let reused = match self.bucket_idx_by_key.get(&key) {
            Some(&bi) => self.buckets[bi].free.pop(),
            None => None,
        };

        let mut texture = match reused {
            Some(t) => {
                self.stats.retained = self.stats.retained.saturating_sub(1);
                t
            }
            None => {
                self.stats.allocated = self.stats.allocated.saturating_add(1);
                tracing::debug!(
                    width = po2_w,
                    height = po2_h,
                    antialias,
                    "texture pool allocation"
                );
                Texture::with_source(TextureSource {
                    pixel_width: po2_w,
                    pixel_height: po2_h,
                    resolution,
                    antialias,
                })
            }
        };

        texture.source.resolution = resolution;
        texture.frame = kurbo::Rect::new(0.0, 0.0, width.max(0.0), height.max(0.0));

        self.key_by_texture.insert(texture.id(), key);
        self.stats.acquired = self.stats.acquired.saturating_add(1);
        texture
    }

    /// Same as [`TexturePool::get_optimal_texture`] with `texture`'s own frame size and
    /// resolution.
    pub fn get_same_size_texture(&mut self, texture: &Texture, antialias: bool) -> Texture {
        self.get_optimal_texture(
            texture.width(),
            texture.height(),
            texture.resolution(),
            antialias,
        )
    }

    /// Put a texture back on the free list it was handed out from.
    pub fn return_texture(&mut self, texture: Texture) {
        let Some(key) = self.key_by_texture.remove(&texture.id()) else {
            panic!(
                "texture {:?} returned to a pool that does not own it (double return?)",
                texture.id()
            );
        };

        let bi = match self.bucket_idx_by_key.get(&key).copied() {
            Some(i) => i,
            None => {
                let i = self.buckets.len();
                self.buckets.push(Bucket {
                    key,
                    free: Vec::new(),
                });
                self.bucket_idx_by_key.insert(key, i);
                i
            }
        };
        debug_assert_eq!(self.buckets[bi].key, PoolKey::of(&texture.source));

        self.buckets[bi].free.push(texture);
        self.stats.returned = self.stats.returned.saturating_add(1);
        self.stats.retained = self.stats.retained.saturating_add(1);
    }

    /// Empty every free list.
    ///
    /// With `destroy` the drained textures are handed back so the owner can release their
    /// backend storage; without it they are simply forgotten. Outstanding textures are not
    /// affected and may still be returned later.
    pub fn clear(&mut self, destroy: bool) -> Vec<Texture> {
        let drained: Vec<Texture> = self
            .buckets
            .drain(..)
            .flat_map(|b| b.free.into_iter())
            .collect();
        self.bucket_idx_by_key.clear();
        self.stats.retained = 0;
        tracing::debug!(count = drained.len(), destroy, "texture pool cleared");
        if destroy { drained } else { Vec::new() }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/texture/pool.rs"]
mod tests;
