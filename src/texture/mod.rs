//! Offscreen texture handles and the power-of-two reuse pool.
//!
//! A [`Texture`] is a cheap handle: the pixel storage it names lives in a render backend and is
//! keyed by [`TextureId`]. The id identifies one backing allocation for its whole life, so a
//! texture returned to the pool and handed out again keeps its id while its logical frame is
//! rewritten.

pub mod pool;

use std::sync::atomic::{AtomicU64, Ordering};

use crate::foundation::core::{Rect, Size};
use crate::foundation::error::{FxError, FxResult};
use crate::foundation::math::ceil_px;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one backing allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(pub u64);

impl TextureId {
    pub(crate) fn next() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Backing store description.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureSource {
    /// Allocated width in device pixels.
    pub pixel_width: u32,
    /// Allocated height in device pixels.
    pub pixel_height: u32,
    /// Device pixels per logical unit.
    pub resolution: f64,
    pub antialias: bool,
}

impl TextureSource {
    /// Allocated width in logical units.
    pub fn width(&self) -> f64 {
        f64::from(self.pixel_width) / self.resolution
    }

    /// Allocated height in logical units.
    pub fn height(&self) -> f64 {
        f64::from(self.pixel_height) / self.resolution
    }
}

/// Handle to a backend texture plus the logical sub-rectangle consumers should see.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    id: TextureId,
    pub source: TextureSource,
    /// Logical frame within the source, in logical units.
    pub frame: Rect,
}

impl Texture {
    /// Describe a new standalone texture of `pixel_width x pixel_height` device pixels.
    ///
    /// The backend allocates storage lazily on first use (bind, upload or copy).
    pub fn new(pixel_width: u32, pixel_height: u32, resolution: f64) -> FxResult<Self> {
        if pixel_width == 0 || pixel_height == 0 {
            return Err(FxError::validation("texture dimensions must be > 0"));
        }
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(FxError::validation("texture resolution must be finite and > 0"));
        }
        let source = TextureSource {
            pixel_width,
            pixel_height,
            resolution,
            antialias: false,
        };
        Ok(Self {
            id: TextureId::next(),
            frame: Rect::new(0.0, 0.0, source.width(), source.height()),
            source,
        })
    }

    pub(crate) fn with_source(source: TextureSource) -> Self {
        Self {
            id: TextureId::next(),
            frame: Rect::new(0.0, 0.0, source.width(), source.height()),
            source,
        }
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    /// Logical frame width.
    pub fn width(&self) -> f64 {
        self.frame.width()
    }

    /// Logical frame height.
    pub fn height(&self) -> f64 {
        self.frame.height()
    }

    pub fn size(&self) -> Size {
        self.frame.size()
    }

    pub fn resolution(&self) -> f64 {
        self.source.resolution
    }

    /// Device-pixel size covered by the logical frame, clamped to the backing store.
    pub fn frame_pixel_size(&self) -> (u32, u32) {
        let res = self.source.resolution;
        (
            ceil_px(self.frame.width(), res).min(self.source.pixel_width),
            ceil_px(self.frame.height(), res).min(self.source.pixel_height),
        )
    }
}
