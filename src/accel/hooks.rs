//! Interposition on the screen's dispatch table.
//!
//! Installing pushes one of our handlers on top of each selected operation's chain and records
//! the handler that was active before it. Our handlers delegate through that recorded handler,
//! never straight to the host's base implementation, so stacks of several backends compose.
//! Restoring removes our handlers in reverse installation order.

use std::rc::Rc;

use crate::{
    accel::{
        TargetView,
        context::{Context, SharedContext, context},
        lifecycle, surface,
    },
    config::InitFlags,
    foundation::error::{GlintError, GlintResult},
    host::{
        Screen,
        dispatch::{Handler, Op, OpCall, OpFamily, OpHandler, OpReply, OpTable, same_handler},
    },
};

struct SavedEntry {
    op: Op,
    prior: Handler,
    ours: Handler,
}

/// Handlers we displaced, in installation order.
#[derive(Default)]
pub(crate) struct SavedHandlers {
    entries: Vec<SavedEntry>,
}

impl SavedHandlers {
    /// Handler that was active for `op` right before ours.
    pub(crate) fn prior(&self, op: Op) -> Option<Handler> {
        self.entries
            .iter()
            .find(|e| e.op == op)
            .map(|e| Rc::clone(&e.prior))
    }

    pub(crate) fn is_installed(&self, op: Op) -> bool {
        self.entries.iter().any(|e| e.op == op)
    }

    /// Whether `hook` is our live handler for `op`, as opposed to one left behind by an
    /// earlier activation.
    fn is_current(&self, op: Op, hook: &GlintHook) -> bool {
        self.entries
            .iter()
            .any(|e| e.op == op && std::ptr::addr_eq(Rc::as_ptr(&e.ours), hook as *const GlintHook))
    }

    pub(crate) fn ops(&self) -> Vec<Op> {
        self.entries.iter().map(|e| e.op).collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Operation families selected by `flags`. Picture lifetime is always intercepted.
pub(crate) fn families(flags: InitFlags) -> Vec<OpFamily> {
    let mut out = Vec::with_capacity(3);
    if flags.contains(InitFlags::USE_SCREEN) {
        out.push(OpFamily::Screen);
    }
    if flags.contains(InitFlags::USE_COMPOSITING) {
        out.push(OpFamily::Compositing);
    }
    out.push(OpFamily::Picture);
    out
}

/// Push our handler onto every operation of `families`. Operations already intercepted are
/// left alone, so repeated installs are harmless.
pub(crate) fn install(table: &mut OpTable, saved: &mut SavedHandlers, families: &[OpFamily]) -> usize {
    let mut installed = 0;
    for &family in families {
        for op in Op::of_family(family) {
            if saved.is_installed(op) {
                continue;
            }
            let Some(prior) = table.active(op) else {
                tracing::warn!(?op, "no handler to interpose on");
                continue;
            };
            let ours: Handler = Rc::new(GlintHook {
                op,
                prior: Rc::clone(&prior),
            });
            table.push(op, Rc::clone(&ours));
            saved.entries.push(SavedEntry { op, prior, ours });
            installed += 1;
        }
    }
    installed
}

/// Remove our handlers, last installed first. Returns how many were removed.
pub(crate) fn restore(table: &mut OpTable, saved: &mut SavedHandlers) -> usize {
    let mut restored = 0;
    for entry in saved.entries.drain(..).rev() {
        let on_top = table
            .active(entry.op)
            .is_some_and(|h| same_handler(&h, &entry.ours));
        if !table.remove(entry.op, &entry.ours) {
            tracing::warn!(op = ?entry.op, "our handler was already gone");
            continue;
        }
        if !on_top {
            tracing::warn!(
                op = ?entry.op,
                "a later handler was stacked above ours; unlinking ours from the middle"
            );
        }
        restored += 1;
    }
    restored
}

/// Call the handler that was active for `call`'s operation before ours.
pub(crate) fn call_prior(
    screen: &mut Screen,
    ctx: &SharedContext,
    call: &OpCall,
) -> GlintResult<OpReply> {
    let op = call.op();
    let prior = ctx
        .borrow()
        .saved
        .prior(op)
        .ok_or_else(|| GlintError::invalid_state(format!("{op:?} is not intercepted")))?;
    prior.call(screen, call)
}

fn is_rendering(op: Op) -> bool {
    matches!(
        op,
        Op::GetSpans
            | Op::GetImage
            | Op::CopyWindow
            | Op::Composite
            | Op::Trapezoids
            | Op::Glyphs
            | Op::Triangles
            | Op::AddTraps
    )
}

/// Our entry in the dispatch table for one operation.
///
/// Keeps the handler it displaced: a handler stacked above ours may still call it after
/// teardown, and it then forwards straight down the chain.
struct GlintHook {
    op: Op,
    prior: Handler,
}

impl GlintHook {
    fn is_live(&self, screen: &Screen) -> bool {
        context(screen).is_ok_and(|ctx| ctx.borrow().saved.is_current(self.op, self))
    }
}

impl OpHandler for GlintHook {
    fn name(&self) -> &str {
        "glint"
    }

    fn call(&self, screen: &mut Screen, call: &OpCall) -> GlintResult<OpReply> {
        debug_assert_eq!(call.op(), self.op);
        if !self.is_live(screen) {
            tracing::trace!(op = ?self.op, "detached handler forwarding to its prior");
            return self.prior.call(screen, call);
        }
        match *call {
            OpCall::CloseScreen => lifecycle::close_screen(screen).map(OpReply::Flag),
            OpCall::CreateSurface(req) => surface::create_surface(screen, req).map(OpReply::Surface),
            OpCall::DestroySurface(id) => surface::destroy_surface(screen, id).map(OpReply::Flag),
            _ => render_or_delegate(screen, call),
        }
    }
}

fn render_or_delegate(screen: &mut Screen, call: &OpCall) -> GlintResult<OpReply> {
    let ctx = context(screen)?;
    let op = call.op();

    if !is_rendering(op) {
        let mut c = ctx.borrow_mut();
        c.stats.passthrough_calls += 1;
        if c.debug_level >= 2 {
            tracing::debug!(?op, "passing through");
        }
        drop(c);
        return call_prior(screen, &ctx, call);
    }

    let accelerated = {
        let mut guard = ctx.borrow_mut();
        let c: &mut Context = &mut guard;
        let views = gpu_views(screen, c, call);
        let done = match views {
            Some(views) if !c.gpu_lost => {
                c.accelerator
                    .accelerate(c.device.as_mut(), call, &views, c.y_inverted)
            }
            _ => false,
        };
        if done {
            c.stats.accelerated_calls += 1;
        } else {
            c.stats.fallback_calls += 1;
            if c.debug_level >= 1 {
                tracing::debug!(?op, "falling back to previous handler");
            }
        }
        done
    };

    if accelerated {
        Ok(OpReply::Done)
    } else {
        call_prior(screen, &ctx, call)
    }
}

/// Render targets for every surface `call` touches, or `None` if any of them is not GPU-bound.
fn gpu_views(screen: &Screen, c: &Context, call: &OpCall) -> Option<Vec<TargetView>> {
    let surfaces = call.surfaces();
    if surfaces.is_empty() {
        return None;
    }
    let mut views = Vec::with_capacity(surfaces.len());
    for drawable in surfaces {
        let (pixmap, origin) = surface::drawable_pixmap(screen, drawable)?;
        let binding = c.registry.get(pixmap)?;
        if !binding.is_accelerated() {
            return None;
        }
        let target = binding.target()?;
        views.push(TargetView {
            surface: drawable,
            raw: target.raw(),
            width: target.width(),
            height: target.height(),
            depth: target.depth(),
            offset: origin,
        });
    }
    Some(views)
}

#[cfg(test)]
#[path = "../../tests/unit/accel/hooks.rs"]
mod tests;
