use slotmap::SecondaryMap;

use crate::{
    accel::pool::{RenderTarget, TargetPool},
    foundation::{
        core::Tick,
        error::{GlintError, GlintResult},
    },
    gpu::{GpuDevice, RawTarget},
    host::surface::SurfaceId,
};

/// How a surface's pixels are stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackingKind {
    /// Pixels live in a GPU texture that is also a render target.
    Texture,
    /// Pixels live in a pooled render target (short-lived intermediates).
    PooledTarget,
    /// Pixels live in CPU memory only.
    Software,
}

/// Per-surface state for a surface the backend has touched.
#[derive(Debug)]
pub struct Binding {
    surface: SurfaceId,
    screen: u32,
    kind: BackingKind,
    target: Option<RenderTarget>,
}

impl Binding {
    /// Surface this record belongs to.
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// Screen whose context owns this record.
    pub fn screen(&self) -> u32 {
        self.screen
    }

    /// Backing-store tag.
    pub fn kind(&self) -> BackingKind {
        self.kind
    }

    /// Bound render target, if any.
    pub fn target(&self) -> Option<&RenderTarget> {
        self.target.as_ref()
    }

    /// `true` when GPU rendering into this surface is possible.
    pub fn is_accelerated(&self) -> bool {
        self.kind != BackingKind::Software && self.target.is_some()
    }

    pub(crate) fn target_mut(&mut self) -> Option<&mut RenderTarget> {
        self.target.as_mut()
    }
}

/// Side table from surface identity to [`Binding`]. Records are inserted on first touch and
/// erased when the surface is destroyed.
pub struct SurfaceRegistry {
    screen: u32,
    bindings: SecondaryMap<SurfaceId, Binding>,
    max_bindings: Option<usize>,
}

impl SurfaceRegistry {
    /// Registry for `screen`. `max_bindings` caps the number of live records.
    pub fn new(screen: u32, max_bindings: Option<usize>) -> Self {
        Self {
            screen,
            bindings: SecondaryMap::new(),
            max_bindings,
        }
    }

    /// Record for `surface`, creating a software-tagged one on first touch.
    pub fn get_or_create(&mut self, surface: SurfaceId) -> GlintResult<&mut Binding> {
        if !self.bindings.contains_key(surface) {
            if let Some(max) = self.max_bindings
                && self.bindings.len() >= max
            {
                return Err(GlintError::allocation_failure(format!(
                    "binding table full ({max} records)"
                )));
            }
            self.bindings.insert(
                surface,
                Binding {
                    surface,
                    screen: self.screen,
                    kind: BackingKind::Software,
                    target: None,
                },
            );
        }
        self.bindings
            .get_mut(surface)
            .ok_or_else(|| GlintError::allocation_failure("binding vanished after insert"))
    }

    /// Record for `surface`, if it exists.
    pub fn get(&self, surface: SurfaceId) -> Option<&Binding> {
        self.bindings.get(surface)
    }

    pub(crate) fn get_mut(&mut self, surface: SurfaceId) -> Option<&mut Binding> {
        self.bindings.get_mut(surface)
    }

    /// Set the backing-store tag, creating the record if needed.
    pub fn set_kind(&mut self, surface: SurfaceId, kind: BackingKind) -> GlintResult<()> {
        self.get_or_create(surface)?.kind = kind;
        Ok(())
    }

    /// Bind `target` to `surface`. A previously bound target is detached first and handed back
    /// to the pool, which either idles it or destroys it.
    pub fn attach(
        &mut self,
        surface: SurfaceId,
        target: RenderTarget,
        pool: &mut TargetPool,
        device: &mut dyn GpuDevice,
        now: Tick,
    ) -> GlintResult<()> {
        if let Some(old) = self.detach(surface) {
            tracing::trace!(raw = old.raw().0, "replacing bound render target");
            pool.release(device, old, now);
        }
        match self.get_or_create(surface) {
            Ok(binding) => {
                binding.target = Some(target);
                Ok(())
            }
            Err(e) => {
                pool.release(device, target, now);
                Err(e)
            }
        }
    }

    /// Take the bound target away from `surface`, leaving the record in place.
    pub fn detach(&mut self, surface: SurfaceId) -> Option<RenderTarget> {
        self.bindings.get_mut(surface)?.target.take()
    }

    /// Erase the record for `surface` and give its target back to the pool.
    ///
    /// Returns `false` if the surface had no record.
    pub fn destroy(
        &mut self,
        surface: SurfaceId,
        pool: &mut TargetPool,
        device: &mut dyn GpuDevice,
        now: Tick,
    ) -> bool {
        let Some(binding) = self.bindings.remove(surface) else {
            return false;
        };
        if let Some(target) = binding.target {
            pool.release(device, target, now);
        }
        true
    }

    /// Erase every record, handing targets back to the pool. Returns how many records there were.
    pub fn drain(&mut self, pool: &mut TargetPool, device: &mut dyn GpuDevice, now: Tick) -> usize {
        let n = self.bindings.len();
        for (_, binding) in self.bindings.drain() {
            if let Some(target) = binding.target {
                pool.release(device, target, now);
            }
        }
        n
    }

    /// Surface currently holding `raw`, if any.
    pub fn owner_of(&self, raw: RawTarget) -> Option<SurfaceId> {
        self.bindings
            .iter()
            .find(|(_, b)| b.target.as_ref().is_some_and(|t| t.raw() == raw))
            .map(|(id, _)| id)
    }

    /// Live records.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// `true` with no records.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Records with a bound target.
    pub fn attached_count(&self) -> usize {
        self.bindings.values().filter(|b| b.target.is_some()).count()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/accel/registry.rs"]
mod tests;
