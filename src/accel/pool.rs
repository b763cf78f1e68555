use std::collections::HashMap;

use crate::{
    foundation::{
        core::{SurfaceUsage, Tick, bits_per_pixel},
        error::{GlintError, GlintResult},
    },
    gpu::{GpuDevice, RawTarget, TargetDesc, TextureId, caps::Capabilities},
};

/// Who may reclaim a render target once its surface lets go of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetOrigin {
    /// Allocated by the pool; goes back to the idle list on release.
    Pooled,
    /// Wraps a texture created elsewhere; destroyed outright on release.
    External(TextureId),
}

/// A GPU render target. Move-only: it is held by exactly one of the pool's idle list or one
/// surface binding at any time.
#[derive(Debug)]
pub struct RenderTarget {
    raw: RawTarget,
    width: u32,
    height: u32,
    depth: u8,
    origin: TargetOrigin,
}

impl RenderTarget {
    /// Device-side name.
    pub fn raw(&self) -> RawTarget {
        self.raw
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel depth.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Pool-managed or surface-owned.
    pub fn origin(&self) -> TargetOrigin {
        self.origin
    }

    /// `true` if the pool may reuse this target.
    pub fn is_pooled(&self) -> bool {
        self.origin == TargetOrigin::Pooled
    }

    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn key(&self) -> TargetKey {
        TargetKey {
            w: self.width,
            h: self.height,
            depth: self.depth,
        }
    }
}

/// Pool configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOpts {
    /// Idle targets older than this many ticks are destroyed by [`TargetPool::expire`].
    pub retention_ticks: u64,
    /// Maximum bytes retained across all buckets.
    pub max_pool_bytes: usize,
    /// Maximum number of idle targets per `(w, h, depth)` bucket.
    pub max_targets_per_bucket: usize,
}

impl Default for PoolOpts {
    fn default() -> Self {
        Self {
            retention_ticks: 100,
            max_pool_bytes: 256 * 1024 * 1024,
            max_targets_per_bucket: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TargetKey {
    w: u32,
    h: u32,
    depth: u8,
}

impl TargetKey {
    fn byte_len(self) -> usize {
        let px = (self.w as usize).saturating_mul(self.h as usize);
        px.saturating_mul(bits_per_pixel(self.depth).div_ceil(8) as usize)
    }
}

/// Pool counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PoolStats {
    /// Targets currently idle.
    pub idle_targets: usize,
    /// Bytes held by idle targets.
    pub idle_bytes: usize,
    /// Fresh device allocations.
    pub allocated: u64,
    /// Acquisitions served from the idle list.
    pub reused: u64,
    /// Targets returned to the idle list.
    pub released: u64,
    /// Idle targets destroyed by expiry.
    pub expired: u64,
    /// Pooled targets destroyed on release because a cap was hit.
    pub dropped_on_release: u64,
    /// Surface-owned targets destroyed on release.
    pub destroyed_owned: u64,
}

struct IdleTarget {
    target: RenderTarget,
    last_used: Tick,
}

struct Bucket {
    key: TargetKey,
    idle: Vec<IdleTarget>,
}

/// Size/depth keyed cache of GPU render targets with tick-based expiry.
pub struct TargetPool {
    opts: PoolOpts,
    max_target_size: u32,
    supported_depths: Vec<u8>,
    stats: PoolStats,

    bucket_idx_by_key: HashMap<TargetKey, usize>,
    buckets: Vec<Bucket>,
}

impl TargetPool {
    /// Pool bounded by the device limits in `caps`.
    pub fn new(opts: PoolOpts, caps: &Capabilities) -> Self {
        Self {
            opts,
            max_target_size: caps.max_target_size,
            supported_depths: caps.supported_depths.clone(),
            stats: PoolStats::default(),
            bucket_idx_by_key: HashMap::new(),
            buckets: Vec::new(),
        }
    }

    /// Counters.
    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Idle targets across all buckets.
    pub fn idle_count(&self) -> usize {
        self.stats.idle_targets
    }

    /// Configuration.
    pub fn opts(&self) -> PoolOpts {
        self.opts
    }

    /// Hand out a render target, reusing an idle one of the same geometry when possible.
    ///
    /// Failures are per-surface and recoverable: the caller falls back to software.
    pub fn acquire(
        &mut self,
        device: &mut dyn GpuDevice,
        width: u32,
        height: u32,
        depth: u8,
        usage: SurfaceUsage,
    ) -> GlintResult<RenderTarget> {
        if usage == SurfaceUsage::Cpu || !self.supported_depths.contains(&depth) {
            return Err(GlintError::unsupported_format(format!(
                "depth {depth} with usage {usage:?} has no render-target format"
            )));
        }
        if width > self.max_target_size || height > self.max_target_size {
            return Err(GlintError::out_of_resources(format!(
                "{width}x{height} exceeds max render-target size {}",
                self.max_target_size
            )));
        }

        let key = TargetKey {
            w: width,
            h: height,
            depth,
        };
        if let Some(&bi) = self.bucket_idx_by_key.get(&key)
            && let Some(idle) = self.buckets[bi].idle.pop()
        {
            self.stats.idle_targets = self.stats.idle_targets.saturating_sub(1);
            self.stats.idle_bytes = self.stats.idle_bytes.saturating_sub(key.byte_len());
            self.stats.reused = self.stats.reused.saturating_add(1);
            tracing::trace!(raw = idle.target.raw.0, width, height, depth, "reusing idle target");
            return Ok(idle.target);
        }

        let desc = TargetDesc {
            width,
            height,
            depth,
        };
        let raw = device.create_render_target(desc).map_err(|e| {
            if e.is_recoverable() {
                e
            } else {
                GlintError::out_of_resources(format!("render-target allocation failed: {e}"))
            }
        })?;
        self.stats.allocated = self.stats.allocated.saturating_add(1);
        Ok(RenderTarget {
            raw,
            width,
            height,
            depth,
            origin: TargetOrigin::Pooled,
        })
    }

    /// Wrap an externally created texture. The result is surface-owned and never pooled.
    pub fn wrap_texture(
        &mut self,
        device: &mut dyn GpuDevice,
        texture: TextureId,
        width: u32,
        height: u32,
        depth: u8,
    ) -> GlintResult<RenderTarget> {
        let raw = device.bind_texture(
            texture,
            TargetDesc {
                width,
                height,
                depth,
            },
        )?;
        Ok(RenderTarget {
            raw,
            width,
            height,
            depth,
            origin: TargetOrigin::External(texture),
        })
    }

    /// Take ownership of a target its surface no longer needs.
    ///
    /// Pooled targets become idle as of `now`; surface-owned targets are destroyed.
    pub fn release(&mut self, device: &mut dyn GpuDevice, target: RenderTarget, now: Tick) {
        if !target.is_pooled() {
            device.destroy_render_target(target.raw);
            self.stats.destroyed_owned = self.stats.destroyed_owned.saturating_add(1);
            return;
        }

        let key = target.key();
        let bytes = key.byte_len();
        if self.opts.max_pool_bytes == 0
            || self.opts.max_targets_per_bucket == 0
            || self.stats.idle_bytes.saturating_add(bytes) > self.opts.max_pool_bytes
        {
            self.drop_on_release(device, target);
            return;
        }

        let bi = match self.bucket_idx_by_key.get(&key).copied() {
            Some(i) => i,
            None => {
                let i = self.buckets.len();
                self.buckets.push(Bucket {
                    key,
                    idle: Vec::new(),
                });
                self.bucket_idx_by_key.insert(key, i);
                i
            }
        };

        if self.buckets[bi].idle.len() >= self.opts.max_targets_per_bucket {
            self.drop_on_release(device, target);
            return;
        }

        self.buckets[bi].idle.push(IdleTarget {
            target,
            last_used: now,
        });
        self.stats.idle_targets = self.stats.idle_targets.saturating_add(1);
        self.stats.idle_bytes = self.stats.idle_bytes.saturating_add(bytes);
        self.stats.released = self.stats.released.saturating_add(1);
    }

    /// Destroy idle targets unused for longer than the retention window. Returns how many.
    ///
    /// Only the idle list is scanned; targets owned by surfaces are never visible here.
    pub fn expire(&mut self, device: &mut dyn GpuDevice, now: Tick) -> usize {
        let retention = self.opts.retention_ticks;
        let mut expired = 0usize;
        let mut freed_bytes = 0usize;
        for bucket in &mut self.buckets {
            let bytes = bucket.key.byte_len();
            bucket.idle.retain(|idle| {
                if now.since(idle.last_used) > retention {
                    device.destroy_render_target(idle.target.raw);
                    expired += 1;
                    freed_bytes += bytes;
                    false
                } else {
                    true
                }
            });
        }
        if expired > 0 {
            self.buckets.retain(|b| !b.idle.is_empty());
            self.bucket_idx_by_key = self
                .buckets
                .iter()
                .enumerate()
                .map(|(i, b)| (b.key, i))
                .collect();
            self.stats.idle_targets = self.stats.idle_targets.saturating_sub(expired);
            self.stats.idle_bytes = self.stats.idle_bytes.saturating_sub(freed_bytes);
            self.stats.expired = self.stats.expired.saturating_add(expired as u64);
            tracing::debug!(expired, tick = now.0, "expired idle render targets");
        }
        expired
    }

    /// Destroy every idle target.
    pub fn drain(&mut self, device: &mut dyn GpuDevice) -> usize {
        let mut n = 0usize;
        for bucket in &mut self.buckets {
            for idle in bucket.idle.drain(..) {
                device.destroy_render_target(idle.target.raw);
                n += 1;
            }
        }
        self.buckets.clear();
        self.bucket_idx_by_key.clear();
        self.stats.idle_targets = 0;
        self.stats.idle_bytes = 0;
        n
    }

    fn drop_on_release(&mut self, device: &mut dyn GpuDevice, target: RenderTarget) {
        device.destroy_render_target(target.raw);
        self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/accel/pool.rs"]
mod tests;
