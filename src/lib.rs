//! GPU render-target binding and dispatch interception for a display server's drawing surfaces.
//!
//! A [`GlintBuilder`] negotiates with a [`gpu::GpuDevice`], then interposes on a
//! [`host::Screen`]'s dispatch table. Surfaces the device can hold get a pooled or texture-backed
//! render target; everything else, and every failure along the way, falls through to the
//! handler that was installed before.

#![forbid(unsafe_code)]

pub mod accel;
pub mod config;
pub(crate) mod foundation;
pub mod gpu;
pub mod host;
pub mod sim;

pub use accel::{
    Accelerator, Backend, BackendStats, BackingKind, BindingInfo, GlintBuilder, LifecycleState,
    NoAcceleration, PoolStats, ResourceInit, TargetView, block_handler, close_screen,
    drawable_pixmap, lifecycle_state, set_screen_surface, set_surface_texture, set_surface_type,
};
pub use config::{DEBUG_ENV_VAR, GlintOpts, InitFlags};
pub use foundation::core::{
    MAX_SURFACE_DIMENSION, Offset, SurfaceUsage, Tick, bits_per_pixel, row_pitch,
};
pub use foundation::error::{GlintError, GlintResult};
pub use gpu::{
    GlFlavor, GpuDevice, GpuParam, GpuVersion, RawTarget, TargetDesc, TextureId,
    caps::Capabilities,
    headless::{HeadlessDevice, HeadlessProbe, HeadlessSpec},
};
pub use host::{
    Screen,
    dispatch::{Op, OpCall, OpFamily, OpReply, SurfaceRequest},
    surface::SurfaceId,
};
