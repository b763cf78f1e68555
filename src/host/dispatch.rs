use std::rc::Rc;

use smallvec::{SmallVec, smallvec};

use crate::{
    foundation::{core::SurfaceUsage, error::GlintResult},
    host::{Screen, surface::SurfaceId},
};

/// Family an operation belongs to. Each family is intercepted as a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpFamily {
    /// Core surface operations.
    Screen,
    /// Compositing operations.
    Compositing,
    /// Picture lifetime operations.
    Picture,
}

macro_rules! ops {
    ($($(#[$doc:meta])* $name:ident => $family:ident,)*) => {
        /// Name of one entry in the screen's dispatch table.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Op {
            $($(#[$doc])* $name,)*
        }

        impl Op {
            /// Every operation, in table order.
            pub const ALL: &'static [Op] = &[$(Op::$name,)*];

            /// Family this operation belongs to.
            pub fn family(self) -> OpFamily {
                match self {
                    $(Op::$name => OpFamily::$family,)*
                }
            }
        }
    };
}

ops! {
    /// Final shutdown of the screen.
    CloseScreen => Screen,
    /// Graphics-context creation.
    CreateGc => Screen,
    /// Surface allocation.
    CreateSurface => Screen,
    /// Surface reference drop.
    DestroySurface => Screen,
    /// Span readback.
    GetSpans => Screen,
    /// Image readback.
    GetImage => Screen,
    /// Window attribute change.
    ChangeWindowAttributes => Screen,
    /// Window content move.
    CopyWindow => Screen,
    /// Bitmap to clip-region conversion.
    BitmapToRegion => Screen,
    /// Porter-Duff composite.
    Composite => Compositing,
    /// Trapezoid rasterization.
    Trapezoids => Compositing,
    /// Glyph run rendering.
    Glyphs => Compositing,
    /// Triangle rasterization.
    Triangles => Compositing,
    /// Trapezoid accumulation into an alpha picture.
    AddTraps => Compositing,
    /// Glyph cache eviction.
    UnrealizeGlyph => Compositing,
    /// Picture creation.
    CreatePicture => Picture,
    /// Picture destruction.
    DestroyPicture => Picture,
}

impl Op {
    /// Operations of `family`, in table order.
    pub fn of_family(family: OpFamily) -> impl Iterator<Item = Op> {
        Op::ALL.iter().copied().filter(move |op| op.family() == family)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Parameters of a surface allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceRequest {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel depth in bits.
    pub depth: u8,
    /// Allocation hint.
    pub usage: SurfaceUsage,
}

/// One call through the dispatch table.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum OpCall {
    CloseScreen,
    CreateGc { drawable: SurfaceId },
    CreateSurface(SurfaceRequest),
    DestroySurface(SurfaceId),
    GetSpans { drawable: SurfaceId, y: i32, width: u32 },
    GetImage { drawable: SurfaceId, x: i32, y: i32, width: u32, height: u32 },
    ChangeWindowAttributes { window: SurfaceId },
    CopyWindow { window: SurfaceId, dx: i32, dy: i32 },
    BitmapToRegion { bitmap: SurfaceId },
    Composite { src: SurfaceId, mask: Option<SurfaceId>, dst: SurfaceId },
    Trapezoids { src: SurfaceId, dst: SurfaceId },
    Glyphs { src: SurfaceId, dst: SurfaceId },
    Triangles { src: SurfaceId, dst: SurfaceId },
    AddTraps { dst: SurfaceId },
    UnrealizeGlyph { glyph: u32 },
    CreatePicture { drawable: SurfaceId },
    DestroyPicture { drawable: SurfaceId },
}

impl OpCall {
    /// Table entry this call dispatches through.
    pub fn op(&self) -> Op {
        match self {
            OpCall::CloseScreen => Op::CloseScreen,
            OpCall::CreateGc { .. } => Op::CreateGc,
            OpCall::CreateSurface(_) => Op::CreateSurface,
            OpCall::DestroySurface(_) => Op::DestroySurface,
            OpCall::GetSpans { .. } => Op::GetSpans,
            OpCall::GetImage { .. } => Op::GetImage,
            OpCall::ChangeWindowAttributes { .. } => Op::ChangeWindowAttributes,
            OpCall::CopyWindow { .. } => Op::CopyWindow,
            OpCall::BitmapToRegion { .. } => Op::BitmapToRegion,
            OpCall::Composite { .. } => Op::Composite,
            OpCall::Trapezoids { .. } => Op::Trapezoids,
            OpCall::Glyphs { .. } => Op::Glyphs,
            OpCall::Triangles { .. } => Op::Triangles,
            OpCall::AddTraps { .. } => Op::AddTraps,
            OpCall::UnrealizeGlyph { .. } => Op::UnrealizeGlyph,
            OpCall::CreatePicture { .. } => Op::CreatePicture,
            OpCall::DestroyPicture { .. } => Op::DestroyPicture,
        }
    }

    /// Surfaces this call reads or writes.
    pub fn surfaces(&self) -> SmallVec<[SurfaceId; 3]> {
        match *self {
            OpCall::CloseScreen | OpCall::CreateSurface(_) | OpCall::UnrealizeGlyph { .. } => {
                SmallVec::new()
            }
            OpCall::DestroySurface(s) => smallvec![s],
            OpCall::CreateGc { drawable }
            | OpCall::GetSpans { drawable, .. }
            | OpCall::GetImage { drawable, .. }
            | OpCall::CreatePicture { drawable }
            | OpCall::DestroyPicture { drawable } => smallvec![drawable],
            OpCall::ChangeWindowAttributes { window } | OpCall::CopyWindow { window, .. } => {
                smallvec![window]
            }
            OpCall::BitmapToRegion { bitmap } => smallvec![bitmap],
            OpCall::Composite { src, mask, dst } => {
                let mut v: SmallVec<[SurfaceId; 3]> = smallvec![src];
                v.extend(mask);
                v.push(dst);
                v
            }
            OpCall::Trapezoids { src, dst }
            | OpCall::Glyphs { src, dst }
            | OpCall::Triangles { src, dst } => smallvec![src, dst],
            OpCall::AddTraps { dst } => smallvec![dst],
        }
    }
}

/// Result of a dispatched call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpReply {
    /// The call completed with nothing to report.
    Done,
    /// Boolean outcome (close-screen success, destroy-freed).
    Flag(bool),
    /// Surface allocation result; `None` when the host refused the request.
    Surface(Option<SurfaceId>),
}

impl OpReply {
    /// Surface carried by a `Surface` reply.
    pub fn surface(self) -> Option<SurfaceId> {
        match self {
            OpReply::Surface(s) => s,
            _ => None,
        }
    }

    /// Boolean carried by a `Flag` reply; other replies count as success.
    pub fn flag(self) -> bool {
        match self {
            OpReply::Flag(b) => b,
            OpReply::Done => true,
            OpReply::Surface(s) => s.is_some(),
        }
    }
}

/// A handler installed in the dispatch table.
///
/// Handlers that refine existing behavior keep the handler they replaced and call through it;
/// they never assume it is the host's base implementation.
pub trait OpHandler {
    /// Diagnostic name.
    fn name(&self) -> &str;

    /// Handle `call`.
    fn call(&self, screen: &mut Screen, call: &OpCall) -> GlintResult<OpReply>;
}

/// Shared handle to an installed handler. Identity is pointer identity.
pub type Handler = Rc<dyn OpHandler>;

/// Pointer identity of two handlers.
pub fn same_handler(a: &Handler, b: &Handler) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Per-operation chains of handlers. The top of each chain is the active handler.
pub struct OpTable {
    chains: Vec<SmallVec<[Handler; 4]>>,
}

impl OpTable {
    /// Table with `base` as the bottom (and active) handler of every chain.
    pub fn with_base(base: Handler) -> Self {
        Self {
            chains: Op::ALL.iter().map(|_| smallvec![Rc::clone(&base)]).collect(),
        }
    }

    /// The active handler for `op`.
    pub fn active(&self, op: Op) -> Option<Handler> {
        self.chains[op.index()].last().cloned()
    }

    /// Make `handler` the active handler for `op`.
    pub fn push(&mut self, op: Op, handler: Handler) {
        self.chains[op.index()].push(handler);
    }

    /// Remove `handler` from the chain for `op`, wherever it sits.
    ///
    /// Returns `false` if it was not in the chain.
    pub fn remove(&mut self, op: Op, handler: &Handler) -> bool {
        let chain = &mut self.chains[op.index()];
        match chain.iter().rposition(|h| same_handler(h, handler)) {
            Some(pos) => {
                chain.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Number of handlers stacked on `op`.
    pub fn depth(&self, op: Op) -> usize {
        self.chains[op.index()].len()
    }

    /// Capture the identity of every installed handler.
    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            chains: self.chains.iter().map(|c| c.to_vec()).collect(),
        }
    }
}

/// Point-in-time copy of a dispatch table, compared by handler identity.
#[derive(Clone)]
pub struct TableSnapshot {
    chains: Vec<Vec<Handler>>,
}

impl TableSnapshot {
    /// Operations whose chain differs from `other`.
    pub fn diff(&self, other: &TableSnapshot) -> Vec<Op> {
        Op::ALL
            .iter()
            .copied()
            .filter(|op| {
                let (a, b) = (&self.chains[op.index()], &other.chains[op.index()]);
                a.len() != b.len() || a.iter().zip(b).any(|(x, y)| !same_handler(x, y))
            })
            .collect()
    }
}

impl PartialEq for TableSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.diff(other).is_empty()
    }
}

impl std::fmt::Debug for TableSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut m = f.debug_map();
        for op in Op::ALL {
            let names: Vec<&str> = self.chains[op.index()].iter().map(|h| h.name()).collect();
            m.entry(op, &names);
        }
        m.finish()
    }
}

/// The host's own implementation of every operation: CPU storage, CPU rendering.
pub struct SoftwareOps;

impl OpHandler for SoftwareOps {
    fn name(&self) -> &str {
        "software"
    }

    fn call(&self, screen: &mut Screen, call: &OpCall) -> GlintResult<OpReply> {
        match *call {
            OpCall::CloseScreen => {
                screen.closed = true;
                Ok(OpReply::Flag(true))
            }
            OpCall::CreateSurface(req) => {
                let id = screen
                    .surfaces
                    .create(req.width, req.height, req.depth, req.usage)
                    .ok();
                Ok(OpReply::Surface(id))
            }
            OpCall::DestroySurface(id) => Ok(OpReply::Flag(screen.surfaces.destroy(id))),
            _ => {
                screen.software_calls += 1;
                Ok(OpReply::Done)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/host/dispatch.rs"]
mod tests;
