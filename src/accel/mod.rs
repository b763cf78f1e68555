//! The accelerated backend: render-target pool, surface bindings, dispatch interception, and the
//! lifecycle that ties them to a screen.

/// Per-screen context record and the public [`Backend`](context::Backend) handle.
pub mod context;
pub(crate) mod hooks;
/// Initialization, teardown and the per-frame tick.
pub mod lifecycle;
/// Render-target pool.
pub mod pool;
/// Surface binding registry.
pub mod registry;
/// Surface creation policy and binding helpers.
pub mod surface;

use crate::{
    foundation::{core::Offset, error::GlintResult},
    gpu::{GpuDevice, RawTarget, caps::Capabilities},
    host::{dispatch::OpCall, surface::SurfaceId},
};

/// A GPU-bound surface as seen by an [`Accelerator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetView {
    /// Surface named in the call (a window or a pixmap).
    pub surface: SurfaceId,
    /// Render target holding its pixels.
    pub raw: RawTarget,
    /// Target width.
    pub width: u32,
    /// Target height.
    pub height: u32,
    /// Target depth.
    pub depth: u8,
    /// Translation from surface coordinates into the target.
    pub offset: Offset,
}

/// Carries out rendering operations on the GPU.
///
/// Asked only when every surface in the call is GPU-bound. Returning `false` sends the call
/// down the handler chain to the software path.
pub trait Accelerator {
    /// Try to execute `call`. `targets` follow the order of [`OpCall::surfaces`].
    fn accelerate(
        &mut self,
        device: &mut dyn GpuDevice,
        call: &OpCall,
        targets: &[TargetView],
        y_inverted: bool,
    ) -> bool;
}

/// Declines everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAcceleration;

impl Accelerator for NoAcceleration {
    fn accelerate(&mut self, _: &mut dyn GpuDevice, _: &OpCall, _: &[TargetView], _: bool) -> bool {
        false
    }
}

/// Device-side resources (shader programs, glyph caches, ...) set up at activation.
pub trait ResourceInit {
    /// Diagnostic name.
    fn name(&self) -> &str;

    /// Create resources. A failure aborts initialization.
    fn init(&mut self, device: &mut dyn GpuDevice, caps: &Capabilities) -> GlintResult<()>;

    /// Release what `init` created.
    fn fini(&mut self, device: &mut dyn GpuDevice);
}

pub use context::{Backend, BackendStats, BindingInfo, TargetInfo};
pub use lifecycle::{GlintBuilder, LifecycleState, block_handler, close_screen, lifecycle_state};
pub use pool::{PoolOpts, PoolStats, RenderTarget, TargetOrigin, TargetPool};
pub use registry::{BackingKind, Binding, SurfaceRegistry};
pub use surface::{
    create_surface, destroy_surface, drawable_pixmap, set_screen_surface, set_surface_texture,
    set_surface_type,
};
