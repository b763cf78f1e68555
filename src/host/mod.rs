//! Host windowing-system collaborators.
//!
//! These are the pieces the accelerated backend plugs into: a surface arena with a software
//! allocator, a per-operation dispatch table, an event loop with block/wakeup handlers, and a
//! per-screen private side table. They are deliberately small; only their boundaries matter to
//! the backend.

/// Per-operation dispatch table.
pub mod dispatch;
/// Block/wakeup handler registration.
pub mod event_loop;
/// Opaque per-object side table.
pub mod privates;
/// Surface arena and software allocator.
pub mod surface;

use std::rc::Rc;

use crate::{
    foundation::{
        core::{Offset, SurfaceUsage},
        error::{GlintError, GlintResult},
    },
    host::{
        dispatch::{OpCall, OpReply, OpTable, SoftwareOps, SurfaceRequest},
        event_loop::EventLoop,
        privates::Privates,
        surface::{SoftwareStore, Surface, SurfaceId},
    },
};

/// One managed display.
pub struct Screen {
    index: u32,
    pub(crate) surfaces: SoftwareStore,
    pub(crate) ops: OpTable,
    pub(crate) privates: Privates,
    pub(crate) event_loop: EventLoop,
    pub(crate) closed: bool,
    pub(crate) software_calls: u64,
}

impl Screen {
    /// Fresh screen whose dispatch table holds only the software implementation.
    pub fn new(index: u32) -> Self {
        Self {
            index,
            surfaces: SoftwareStore::new(),
            ops: OpTable::with_base(Rc::new(SoftwareOps)),
            privates: Privates::default(),
            event_loop: EventLoop::default(),
            closed: false,
            software_calls: 0,
        }
    }

    /// Screen number.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Route `call` to the active handler for its operation.
    pub fn dispatch(&mut self, call: OpCall) -> GlintResult<OpReply> {
        let op = call.op();
        let handler = self
            .ops
            .active(op)
            .ok_or_else(|| GlintError::host(format!("no handler installed for {op:?}")))?;
        handler.call(self, &call)
    }

    /// Allocate a surface through the dispatch table.
    pub fn create_surface(
        &mut self,
        width: u32,
        height: u32,
        depth: u8,
        usage: SurfaceUsage,
    ) -> GlintResult<Option<SurfaceId>> {
        let reply = self.dispatch(OpCall::CreateSurface(SurfaceRequest {
            width,
            height,
            depth,
            usage,
        }))?;
        Ok(reply.surface())
    }

    /// Drop one reference to a surface through the dispatch table.
    pub fn destroy_surface(&mut self, id: SurfaceId) -> GlintResult<bool> {
        Ok(self.dispatch(OpCall::DestroySurface(id))?.flag())
    }

    /// Create a window backed by `pixmap`.
    pub fn create_window(&mut self, pixmap: SurfaceId, origin: Offset) -> GlintResult<SurfaceId> {
        self.surfaces.create_window(pixmap, origin)
    }

    /// Add a reference to a surface.
    pub fn reference_surface(&mut self, id: SurfaceId) -> GlintResult<u32> {
        self.surfaces.reference(id)
    }

    /// Shut the screen down through the dispatch table.
    pub fn close(&mut self) -> GlintResult<bool> {
        Ok(self.dispatch(OpCall::CloseScreen)?.flag())
    }

    /// Run one event-loop iteration.
    pub fn run_event_loop_once(&mut self) {
        self.event_loop.run_once();
    }

    /// Look up a surface.
    pub fn surface(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(id)
    }

    /// Software allocator and surface arena.
    pub fn surfaces(&self) -> &SoftwareStore {
        &self.surfaces
    }

    /// Mutable software allocator.
    pub fn surfaces_mut(&mut self) -> &mut SoftwareStore {
        &mut self.surfaces
    }

    /// Dispatch table.
    pub fn ops(&self) -> &OpTable {
        &self.ops
    }

    /// Mutable dispatch table, for components that interpose on operations.
    pub fn ops_mut(&mut self) -> &mut OpTable {
        &mut self.ops
    }

    /// Screen private side table.
    pub fn privates(&self) -> &Privates {
        &self.privates
    }

    /// Event loop.
    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    /// Mutable event loop.
    pub fn event_loop_mut(&mut self) -> &mut EventLoop {
        &mut self.event_loop
    }

    /// Whether the base close handler has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Calls that reached the software implementation of a rendering operation.
    pub fn software_calls(&self) -> u64 {
        self.software_calls
    }
}

#[cfg(test)]
#[path = "../../tests/unit/host/screen.rs"]
mod tests;
