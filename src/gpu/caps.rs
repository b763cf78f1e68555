use crate::{
    config::GlintOpts,
    foundation::error::{GlintError, GlintResult},
    gpu::{GlFlavor, GpuDevice, GpuParam, GpuVersion},
};

/// Minimum desktop version.
pub const MIN_DESKTOP_VERSION: GpuVersion = GpuVersion::new(1, 3);
/// Minimum ES version.
pub const MIN_ES_VERSION: GpuVersion = GpuVersion::new(2, 0);
/// ES contexts cannot read back BGRA without this.
pub const EXT_BGRA8888: &str = "GL_EXT_texture_format_BGRA8888";
/// Row-order inversion on readback.
pub const EXT_PACK_INVERT: &str = "GL_MESA_pack_invert";
/// Render-target to render-target blits.
pub const EXT_FRAMEBUFFER_BLIT: &str = "GL_EXT_framebuffer_blit";

/// Depths that map to a render-target format.
pub const SUPPORTED_DEPTHS: [u8; 6] = [8, 15, 16, 24, 30, 32];

/// Snapshot of what the device can do, taken once at initialization.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Capabilities {
    /// Context version.
    pub version: GpuVersion,
    /// Context flavor.
    pub flavor: GlFlavor,
    /// Largest render-target dimension.
    pub max_target_size: u32,
    /// Depths accepted for render targets.
    pub supported_depths: Vec<u8>,
    /// Readback can flip rows in hardware.
    pub has_pack_invert: bool,
    /// Target-to-target blits are available.
    pub has_framebuffer_blit: bool,
}

impl Capabilities {
    /// `true` if both dimensions fit in a render target.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        width <= self.max_target_size && height <= self.max_target_size
    }

    /// `true` if `depth` has a render-target format.
    pub fn supports_depth(&self, depth: u8) -> bool {
        self.supported_depths.contains(&depth)
    }
}

/// Query `device` and check it against the minimum requirements.
///
/// Pure with respect to the host: a failure here leaves nothing behind.
pub fn negotiate(device: &dyn GpuDevice, opts: &GlintOpts) -> GlintResult<Capabilities> {
    let version = device.version();
    let flavor = device.flavor();

    let (min, label) = match flavor {
        GlFlavor::Desktop => (MIN_DESKTOP_VERSION, "OpenGL"),
        GlFlavor::Es2 => (MIN_ES_VERSION, "OpenGL ES"),
    };
    if version < min {
        return Err(GlintError::unsupported_backend(format!(
            "{label} {min} or later required, device reports {version}"
        )));
    }

    if flavor == GlFlavor::Es2 && !device.has_extension(EXT_BGRA8888) {
        return Err(GlintError::unsupported_backend(format!(
            "{EXT_BGRA8888} required"
        )));
    }

    if let Some(missing) = opts
        .required_extensions
        .iter()
        .find(|ext| !device.has_extension(ext))
    {
        return Err(GlintError::unsupported_backend(format!(
            "{missing} required"
        )));
    }

    let raw_max = device.get_integer(GpuParam::MaxRenderbufferSize);
    if raw_max <= 0 {
        return Err(GlintError::unsupported_backend(format!(
            "device reports no usable render-target size ({raw_max})"
        )));
    }
    let max_target_size = u32::try_from(raw_max).unwrap_or(u32::MAX);

    Ok(Capabilities {
        version,
        flavor,
        max_target_size,
        supported_depths: SUPPORTED_DEPTHS.to_vec(),
        has_pack_invert: device.has_extension(EXT_PACK_INVERT),
        has_framebuffer_blit: device.has_extension(EXT_FRAMEBUFFER_BLIT),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/gpu/caps.rs"]
mod tests;
