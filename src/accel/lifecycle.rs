use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use crate::{
    accel::{
        Accelerator, NoAcceleration, ResourceInit,
        context::{Backend, BackendStats, Context, SCREEN_KEY, context},
        hooks::{self, SavedHandlers},
        pool::{PoolOpts, TargetPool},
        registry::SurfaceRegistry,
    },
    config::{GlintOpts, InitFlags},
    foundation::{
        core::Tick,
        error::{GlintError, GlintResult},
    },
    gpu::{GpuDevice, caps},
    host::{
        Screen,
        dispatch::{Op, OpCall},
        event_loop::TickHandler,
    },
};

/// Where a screen's backend is in its life.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// No backend on the screen.
    #[default]
    Uninitialized,
    /// Checking configuration and device capabilities. Nothing is installed yet.
    Negotiating,
    /// Hooks installed, tick registered.
    Active,
    /// Undoing activation.
    TearingDown,
}

impl LifecycleState {
    /// Whether `self -> to` is a legal step.
    pub fn can_become(self, to: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, to),
            (Uninitialized, Negotiating)
                | (Negotiating, Active)
                | (Negotiating, Uninitialized)
                | (Active, TearingDown)
                | (TearingDown, Uninitialized)
        )
    }

    fn advance(&mut self, to: LifecycleState) -> GlintResult<()> {
        if !self.can_become(to) {
            return Err(GlintError::invalid_state(format!(
                "illegal lifecycle transition {self:?} -> {to:?}"
            )));
        }
        tracing::debug!(from = ?*self, ?to, "lifecycle transition");
        *self = to;
        Ok(())
    }
}

/// Configures and activates the backend on a screen.
pub struct GlintBuilder {
    device: Box<dyn GpuDevice>,
    flags: u32,
    opts: GlintOpts,
    accelerator: Box<dyn Accelerator>,
    initializers: Vec<Box<dyn ResourceInit>>,
}

impl GlintBuilder {
    /// Builder over `device` with no flags, default options and no accelerator.
    pub fn new(device: Box<dyn GpuDevice>) -> Self {
        Self {
            device,
            flags: 0,
            opts: GlintOpts::default(),
            accelerator: Box::new(NoAcceleration),
            initializers: Vec::new(),
        }
    }

    /// Raw flag bits. Unknown bits fail [`GlintBuilder::init`].
    pub fn flags(mut self, bits: u32) -> Self {
        self.flags = bits;
        self
    }

    /// Tunables.
    pub fn opts(mut self, opts: GlintOpts) -> Self {
        self.opts = opts;
        self
    }

    /// GPU implementation of rendering operations.
    pub fn accelerator(mut self, accelerator: Box<dyn Accelerator>) -> Self {
        self.accelerator = accelerator;
        self
    }

    /// Append a resource initializer. Initializers run in the order added.
    pub fn initializer(mut self, init: Box<dyn ResourceInit>) -> Self {
        self.initializers.push(init);
        self
    }

    /// Negotiate with the device and activate the backend on `screen`.
    ///
    /// On failure the screen is left exactly as it was: no private, no hooks, no tick handler.
    #[tracing::instrument(skip_all, fields(screen = screen.index(), flags = self.flags))]
    pub fn init(self, screen: &mut Screen) -> GlintResult<Backend> {
        let GlintBuilder {
            mut device,
            flags,
            opts,
            accelerator,
            mut initializers,
        } = self;

        if screen.privates.contains(SCREEN_KEY) {
            return Err(GlintError::invalid_state(
                "backend is already active on this screen",
            ));
        }

        let mut state = LifecycleState::Uninitialized;
        state.advance(LifecycleState::Negotiating)?;

        let flags = InitFlags::from_raw(flags)?;
        opts.validate()?;
        let caps = caps::negotiate(device.as_ref(), &opts)?;
        tracing::info!(
            version = %caps.version,
            flavor = ?caps.flavor,
            max_target_size = caps.max_target_size,
            "device accepted"
        );

        for i in 0..initializers.len() {
            if let Err(e) = initializers[i].init(device.as_mut(), &caps) {
                tracing::warn!(
                    initializer = initializers[i].name(),
                    error = %e,
                    "resource initializer failed"
                );
                fini_all(&mut initializers[..i], device.as_mut());
                return Err(e);
            }
        }

        let debug_level = opts.resolve_debug_level();
        let pool = TargetPool::new(
            PoolOpts {
                retention_ticks: opts.retention_ticks,
                max_pool_bytes: opts.max_pool_bytes,
                max_targets_per_bucket: opts.max_targets_per_bucket,
            },
            &caps,
        );
        let ctx = Rc::new(RefCell::new(Context {
            screen: screen.index(),
            state,
            flags,
            y_inverted: flags.contains(InitFlags::INVERTED_Y_AXIS),
            debug_level,
            tick: Tick::default(),
            pool,
            registry: SurfaceRegistry::new(screen.index(), opts.max_bindings),
            saved: SavedHandlers::default(),
            root_surface: None,
            root_target: None,
            accelerator,
            initializers,
            tick_token: None,
            gpu_lost: false,
            stats: BackendStats::default(),
            caps,
            device,
        }));

        let hook = TickHook {
            ctx: Rc::downgrade(&ctx),
        };
        let Some(token) = screen.event_loop.register(Box::new(hook)) else {
            let mut guard = ctx.borrow_mut();
            let c: &mut Context = &mut guard;
            fini_all(&mut c.initializers, c.device.as_mut());
            return Err(GlintError::host("event loop refused the tick handler"));
        };

        screen.privates.set(SCREEN_KEY, Rc::clone(&ctx));
        {
            let mut c = ctx.borrow_mut();
            c.tick_token = Some(token);
            let installed = hooks::install(&mut screen.ops, &mut c.saved, &hooks::families(flags));
            c.state.advance(LifecycleState::Active)?;
            tracing::info!(installed, debug_level, "backend active");
        }

        Ok(Backend { ctx })
    }
}

fn fini_all(initializers: &mut [Box<dyn ResourceInit>], device: &mut dyn GpuDevice) {
    for init in initializers.iter_mut().rev() {
        tracing::debug!(initializer = init.name(), "finalizing");
        init.fini(device);
    }
}

/// Tear the backend down on `screen`.
///
/// Restores every intercepted handler, releases all render targets and the context, then, when
/// screen hooks were installed, hands the close on to the handler that was active before ours
/// and returns its result.
#[tracing::instrument(skip_all, fields(screen = screen.index()))]
pub fn close_screen(screen: &mut Screen) -> GlintResult<bool> {
    let ctx = context(screen)?;
    let (prior_close, chain) = {
        let mut guard = ctx.borrow_mut();
        let c: &mut Context = &mut guard;
        c.state.advance(LifecycleState::TearingDown)?;

        let prior_close = c.saved.prior(Op::CloseScreen);
        let restored = hooks::restore(&mut screen.ops, &mut c.saved);
        debug_assert!(c.saved.is_empty());

        if let Some(token) = c.tick_token.take()
            && !screen.event_loop.unregister(token)
        {
            tracing::warn!("tick handler was already unregistered");
        }

        let now = c.tick;
        let bindings = c.registry.drain(&mut c.pool, c.device.as_mut(), now);
        let idle = c.pool.drain(c.device.as_mut());
        c.root_surface = None;
        c.root_target = None;
        fini_all(&mut c.initializers, c.device.as_mut());
        c.initializers.clear();

        c.state.advance(LifecycleState::Uninitialized)?;
        tracing::info!(restored, bindings, idle, "backend torn down");
        (prior_close, c.flags.contains(InitFlags::USE_SCREEN))
    };
    screen.privates.remove(SCREEN_KEY);

    match prior_close {
        Some(prior) if chain => Ok(prior.call(screen, &OpCall::CloseScreen)?.flag()),
        _ => Ok(true),
    }
}

/// Per-frame synchronization: advance the tick, flush and wait for the device, expire idle
/// render targets.
pub fn block_handler(screen: &mut Screen) -> GlintResult<()> {
    let ctx = context(screen)?;
    let mut guard = ctx.try_borrow_mut().map_err(|_| {
        GlintError::invalid_state("backend is busy; tick requested from inside a dispatch")
    })?;
    run_tick(&mut guard);
    Ok(())
}

/// Lifecycle state of the backend on `screen`.
pub fn lifecycle_state(screen: &Screen) -> LifecycleState {
    Backend::of(screen)
        .map(|b| b.state())
        .unwrap_or(LifecycleState::Uninitialized)
}

fn run_tick(c: &mut Context) {
    c.tick = c.tick.next();
    c.device.flush();
    if let Err(e) = c.device.finish() {
        if !c.gpu_lost {
            tracing::error!(tick = c.tick.0, error = %e, "device failed to finish; rendering stays on software");
        }
        c.gpu_lost = true;
        c.stats.gpu_failures += 1;
    }
    c.pool.expire(c.device.as_mut(), c.tick);
    c.stats.ticks += 1;
    if c.debug_level >= 2 {
        tracing::trace!(tick = c.tick.0, idle = c.pool.idle_count(), "tick");
    }
}

/// Event-loop registration driving [`block_handler`]'s work. Holds the context weakly so the
/// loop never keeps a torn-down backend alive.
struct TickHook {
    ctx: Weak<RefCell<Context>>,
}

impl TickHandler for TickHook {
    fn block(&mut self) {
        let Some(ctx) = self.ctx.upgrade() else {
            return;
        };
        match ctx.try_borrow_mut() {
            Ok(mut guard) => run_tick(&mut guard),
            Err(_) => tracing::warn!("skipping tick: backend is busy"),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/accel/lifecycle.rs"]
mod tests;
