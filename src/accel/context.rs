use std::{cell::RefCell, rc::Rc};

use crate::{
    accel::{
        Accelerator, ResourceInit,
        hooks::SavedHandlers,
        lifecycle::LifecycleState,
        pool::{PoolStats, TargetPool},
        registry::{BackingKind, SurfaceRegistry},
    },
    config::InitFlags,
    foundation::{
        core::Tick,
        error::{GlintError, GlintResult},
    },
    gpu::{GpuDevice, RawTarget, caps::Capabilities},
    host::{Screen, dispatch::Op, event_loop::TickToken, privates::PrivateKey, surface::SurfaceId},
};

/// Screen private slot holding the backend context.
pub(crate) const SCREEN_KEY: PrivateKey = PrivateKey("glint.screen");

/// Backend counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct BackendStats {
    /// Surfaces created with a bound render target.
    pub gpu_surfaces: u64,
    /// Surface requests served by the software path.
    pub software_surfaces: u64,
    /// Rendering calls completed on the GPU.
    pub accelerated_calls: u64,
    /// Rendering calls handed to the previous handler.
    pub fallback_calls: u64,
    /// Non-rendering calls passed straight through.
    pub passthrough_calls: u64,
    /// Per-frame ticks run.
    pub ticks: u64,
    /// Ticks whose finish reported a device failure.
    pub gpu_failures: u64,
}

/// Everything the backend knows about one screen. Exactly one per managed screen; reachable
/// from the screen's private side table.
pub(crate) struct Context {
    pub(crate) screen: u32,
    pub(crate) state: LifecycleState,
    pub(crate) flags: InitFlags,
    pub(crate) caps: Capabilities,
    pub(crate) y_inverted: bool,
    pub(crate) debug_level: i32,
    pub(crate) tick: Tick,
    pub(crate) device: Box<dyn GpuDevice>,
    pub(crate) pool: TargetPool,
    pub(crate) registry: SurfaceRegistry,
    pub(crate) saved: SavedHandlers,
    pub(crate) root_surface: Option<SurfaceId>,
    pub(crate) root_target: Option<RawTarget>,
    pub(crate) accelerator: Box<dyn Accelerator>,
    pub(crate) initializers: Vec<Box<dyn ResourceInit>>,
    pub(crate) tick_token: Option<TickToken>,
    pub(crate) gpu_lost: bool,
    pub(crate) stats: BackendStats,
}

pub(crate) type SharedContext = Rc<RefCell<Context>>;

/// Context attached to `screen`, or `InvalidState` if the backend is not active there.
pub(crate) fn context(screen: &Screen) -> GlintResult<SharedContext> {
    screen
        .privates
        .get::<RefCell<Context>>(SCREEN_KEY)
        .ok_or_else(|| GlintError::invalid_state("backend is not initialized on this screen"))
}

/// Render-target summary for inspection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct TargetInfo {
    /// Device-side name.
    pub raw: RawTarget,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel depth.
    pub depth: u8,
    /// Whether the pool may reuse it.
    pub pooled: bool,
}

/// Binding summary for inspection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct BindingInfo {
    /// Backing-store tag.
    pub kind: BackingKind,
    /// Bound target.
    pub target: Option<TargetInfo>,
}

/// Handle to the backend active on a screen.
///
/// Cheap to clone. Holding one does not keep the backend installed: after teardown every query
/// reports the torn-down state.
#[derive(Clone)]
pub struct Backend {
    pub(crate) ctx: SharedContext,
}

impl Backend {
    /// The backend active on `screen`, if any.
    pub fn of(screen: &Screen) -> Option<Backend> {
        context(screen).ok().map(|ctx| Backend { ctx })
    }

    /// Lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.ctx.borrow().state
    }

    /// Flags the backend was initialized with.
    pub fn flags(&self) -> InitFlags {
        self.ctx.borrow().flags
    }

    /// Negotiated capabilities.
    pub fn capabilities(&self) -> Capabilities {
        self.ctx.borrow().caps.clone()
    }

    /// Current tick.
    pub fn tick(&self) -> Tick {
        self.ctx.borrow().tick
    }

    /// Whether render targets use a bottom-up Y axis.
    pub fn is_y_inverted(&self) -> bool {
        self.ctx.borrow().y_inverted
    }

    /// Effective debug level.
    pub fn debug_level(&self) -> i32 {
        self.ctx.borrow().debug_level
    }

    /// Whether a tick saw the device fail. Rendering then stays on the software path.
    pub fn is_gpu_lost(&self) -> bool {
        self.ctx.borrow().gpu_lost
    }

    /// Binding summary for `surface`; `None` if the backend never touched it.
    pub fn binding(&self, surface: SurfaceId) -> Option<BindingInfo> {
        let ctx = self.ctx.borrow();
        let b = ctx.registry.get(surface)?;
        Some(BindingInfo {
            kind: b.kind(),
            target: b.target().map(|t| TargetInfo {
                raw: t.raw(),
                width: t.width(),
                height: t.height(),
                depth: t.depth(),
                pooled: t.is_pooled(),
            }),
        })
    }

    /// Surfaces with a binding record.
    pub fn bound_surfaces(&self) -> usize {
        self.ctx.borrow().registry.len()
    }

    /// Front-buffer render target.
    pub fn root_target(&self) -> Option<RawTarget> {
        self.ctx.borrow().root_target
    }

    /// Operations currently intercepted, in installation order.
    pub fn intercepted_ops(&self) -> Vec<Op> {
        self.ctx.borrow().saved.ops()
    }

    /// Pool counters.
    pub fn pool_stats(&self) -> PoolStats {
        self.ctx.borrow().pool.stats()
    }

    /// Backend counters.
    pub fn stats(&self) -> BackendStats {
        self.ctx.borrow().stats
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.ctx.try_borrow() {
            Ok(ctx) => f
                .debug_struct("Backend")
                .field("screen", &ctx.screen)
                .field("state", &ctx.state)
                .field("flags", &ctx.flags)
                .field("tick", &ctx.tick)
                .finish(),
            Err(_) => f.write_str("Backend { <busy> }"),
        }
    }
}
