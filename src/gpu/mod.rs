//! GPU dispatch/capability boundary.
//!
//! The core never talks to a graphics API directly. Everything it needs (version and extension
//! queries, integer limits, flush/finish, render-target allocation) goes through [`GpuDevice`].

/// Capability negotiation against a [`GpuDevice`].
pub mod caps;
/// In-memory device used by tests and the CLI.
pub mod headless;
/// `wgpu`-backed device.
#[cfg(feature = "gpu")]
pub mod wgpu_device;

use crate::foundation::error::GlintResult;

/// API flavor of the active context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlFlavor {
    /// Desktop OpenGL (or an equivalent full-featured API).
    Desktop,
    /// OpenGL ES 2.0 class API.
    Es2,
}

/// `major.minor` version reported by the device.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct GpuVersion {
    /// Major version.
    pub major: u16,
    /// Minor version.
    pub minor: u16,
}

impl GpuVersion {
    /// Construct a version.
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl std::fmt::Display for GpuVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Integer parameters queryable with [`GpuDevice::get_integer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GpuParam {
    /// Largest width/height of a render target.
    MaxRenderbufferSize,
    /// Largest width/height of a 2D texture.
    MaxTextureSize,
}

/// Device-side render-target name.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct RawTarget(pub u64);

/// Device-side texture name created outside this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TextureId(pub u64);

/// Requested render-target geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetDesc {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel depth in bits.
    pub depth: u8,
}

/// The GPU function set and capability queries of the active context.
///
/// Calls occur on the host's event-processing thread only.
pub trait GpuDevice {
    /// Context version.
    fn version(&self) -> GpuVersion;

    /// Context flavor.
    fn flavor(&self) -> GlFlavor;

    /// Whether the named extension is exposed.
    fn has_extension(&self, name: &str) -> bool;

    /// Integer limit query.
    fn get_integer(&self, param: GpuParam) -> i64;

    /// Submit pending commands without waiting.
    fn flush(&mut self);

    /// Block until all submitted work has completed.
    fn finish(&mut self) -> GlintResult<()>;

    /// Allocate a fresh render target with its own backing texture.
    fn create_render_target(&mut self, desc: TargetDesc) -> GlintResult<RawTarget>;

    /// Wrap an existing texture as a render target.
    fn bind_texture(&mut self, texture: TextureId, desc: TargetDesc) -> GlintResult<RawTarget>;

    /// Release a render target. The backing texture goes with it unless it was bound from outside.
    fn destroy_render_target(&mut self, target: RawTarget);
}
