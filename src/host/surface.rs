use slotmap::{SlotMap, new_key_type};

use crate::foundation::{
    core::{MAX_SURFACE_DIMENSION, Offset, SurfaceUsage, bits_per_pixel, row_pitch},
    error::{GlintError, GlintResult},
};

new_key_type! {
    /// Stable handle to a host surface.
    pub struct SurfaceId;
}

/// What a surface is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Off-screen pixel buffer.
    Pixmap,
    /// Window whose pixels live in `pixmap`, translated by `origin`.
    Window {
        /// Backing pixmap.
        pixmap: SurfaceId,
        /// Window position inside the backing pixmap.
        origin: Offset,
    },
}

/// Host-side surface header plus optional CPU pixel storage.
#[derive(Clone, Debug)]
pub struct Surface {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel depth in bits.
    pub depth: u8,
    /// Storage bits per pixel.
    pub bits_per_pixel: u32,
    /// Row pitch in bytes.
    pub pitch: u32,
    /// Allocation hint given at creation.
    pub usage: SurfaceUsage,
    /// Pixmap or window.
    pub kind: SurfaceKind,
    /// CPU pixels. `None` when the pixels live elsewhere (e.g. on the GPU).
    pub data: Option<Vec<u8>>,
    refcnt: u32,
}

impl Surface {
    /// Outstanding references; the surface is freed when this reaches zero.
    pub fn refcnt(&self) -> u32 {
        self.refcnt
    }
}

/// Counters for the software store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct SoftwareStats {
    /// Surfaces created.
    pub created: u64,
    /// Surfaces freed.
    pub freed: u64,
    /// Header rewrites.
    pub header_updates: u64,
}

/// Pure-CPU surface allocator and the arena every host surface lives in.
#[derive(Default)]
pub struct SoftwareStore {
    surfaces: SlotMap<SurfaceId, Surface>,
    stats: SoftwareStats,
}

impl SoftwareStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a CPU-backed pixmap with one reference.
    pub fn create(
        &mut self,
        width: u32,
        height: u32,
        depth: u8,
        usage: SurfaceUsage,
    ) -> GlintResult<SurfaceId> {
        if width > MAX_SURFACE_DIMENSION || height > MAX_SURFACE_DIMENSION {
            return Err(GlintError::host(format!(
                "surface {width}x{height} exceeds {MAX_SURFACE_DIMENSION}"
            )));
        }
        let bpp = bits_per_pixel(depth);
        let pitch = row_pitch(width, bpp);
        let len = (pitch as usize).saturating_mul(height as usize);
        let data = (len > 0).then(|| vec![0u8; len]);

        self.stats.created += 1;
        Ok(self.surfaces.insert(Surface {
            width,
            height,
            depth,
            bits_per_pixel: bpp,
            pitch,
            usage,
            kind: SurfaceKind::Pixmap,
            data,
            refcnt: 1,
        }))
    }

    /// Create a window backed by `pixmap`. The window shares the pixmap's geometry.
    pub fn create_window(&mut self, pixmap: SurfaceId, origin: Offset) -> GlintResult<SurfaceId> {
        let backing = self
            .surfaces
            .get(pixmap)
            .ok_or_else(|| GlintError::host("window backing pixmap does not exist"))?;
        let window = Surface {
            width: backing.width,
            height: backing.height,
            depth: backing.depth,
            bits_per_pixel: backing.bits_per_pixel,
            pitch: backing.pitch,
            usage: SurfaceUsage::Normal,
            kind: SurfaceKind::Window { pixmap, origin },
            data: None,
            refcnt: 1,
        };
        self.stats.created += 1;
        Ok(self.surfaces.insert(window))
    }

    /// Add a reference.
    pub fn reference(&mut self, id: SurfaceId) -> GlintResult<u32> {
        let s = self
            .surfaces
            .get_mut(id)
            .ok_or_else(|| GlintError::host("reference to unknown surface"))?;
        s.refcnt = s.refcnt.saturating_add(1);
        Ok(s.refcnt)
    }

    /// Drop a reference. Returns `true` when this freed the surface.
    pub fn destroy(&mut self, id: SurfaceId) -> bool {
        let Some(s) = self.surfaces.get_mut(id) else {
            return false;
        };
        if s.refcnt > 1 {
            s.refcnt -= 1;
            return false;
        }
        self.surfaces.remove(id);
        self.stats.freed += 1;
        true
    }

    /// Rewrite a surface header. A zero `pitch` is recomputed from the width.
    pub fn modify_header(
        &mut self,
        id: SurfaceId,
        width: u32,
        height: u32,
        pitch: u32,
        data: Option<Vec<u8>>,
    ) -> GlintResult<()> {
        let s = self
            .surfaces
            .get_mut(id)
            .ok_or_else(|| GlintError::host("header update on unknown surface"))?;
        s.width = width;
        s.height = height;
        s.pitch = if pitch == 0 {
            row_pitch(width, s.bits_per_pixel)
        } else {
            pitch
        };
        s.data = data;
        self.stats.header_updates += 1;
        Ok(())
    }

    /// Look up a surface.
    pub fn get(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(id)
    }

    /// Whether `id` is still alive.
    pub fn contains(&self, id: SurfaceId) -> bool {
        self.surfaces.contains_key(id)
    }

    /// Live surfaces.
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// `true` when no surfaces are alive.
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Counters.
    pub fn stats(&self) -> SoftwareStats {
        self.stats
    }
}

#[cfg(test)]
#[path = "../../tests/unit/host/surface.rs"]
mod tests;
