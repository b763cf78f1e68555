//! Initialization flags and tunables.

use crate::foundation::error::{GlintError, GlintResult};

/// Environment variable consulted for the debug level when none is configured.
pub const DEBUG_ENV_VAR: &str = "GLINT_DEBUG";

bitflags::bitflags! {
    /// Initialization flags. Each hook flag independently gates one family of intercepted
    /// operations.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
    pub struct InitFlags: u32 {
        /// Intercept the core surface operations (create/destroy, spans, images, close).
        const USE_SCREEN = 1 << 0;
        /// Intercept the compositing operations (composite, glyphs, trapezoids, ...).
        const USE_COMPOSITING = 1 << 1;
        /// Render targets use a bottom-up Y axis.
        const INVERTED_Y_AXIS = 1 << 2;
    }
}

impl InitFlags {
    /// Validate a raw flag word. Any bit outside the recognized set is a configuration error.
    pub fn from_raw(bits: u32) -> GlintResult<Self> {
        Self::from_bits(bits).ok_or_else(|| {
            GlintError::invalid_configuration(format!(
                "invalid flags {bits:#x} (unrecognized bits {:#x})",
                bits & !Self::all().bits()
            ))
        })
    }
}

/// Tunables for one managed screen.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlintOpts {
    /// Idle render targets older than this many ticks are destroyed.
    pub retention_ticks: u64,
    /// Maximum bytes retained across all idle buckets.
    pub max_pool_bytes: usize,
    /// Maximum idle targets retained per `(width, height, depth)` bucket. Zero disables pooling.
    pub max_targets_per_bucket: usize,
    /// Diagnostic verbosity. `None` reads [`DEBUG_ENV_VAR`].
    pub debug_level: Option<i32>,
    /// Extensions demanded in addition to the flavor's baseline requirements.
    pub required_extensions: Vec<String>,
    /// Cap on live binding records. `None` is unbounded.
    pub max_bindings: Option<usize>,
}

impl Default for GlintOpts {
    fn default() -> Self {
        Self {
            retention_ticks: 100,
            max_pool_bytes: 256 * 1024 * 1024,
            max_targets_per_bucket: 8,
            debug_level: None,
            required_extensions: Vec::new(),
            max_bindings: None,
        }
    }
}

impl GlintOpts {
    /// Reject option combinations that cannot work.
    pub fn validate(&self) -> GlintResult<()> {
        if self.retention_ticks == 0 {
            return Err(GlintError::invalid_configuration(
                "retention_ticks must be >= 1",
            ));
        }
        if self.required_extensions.iter().any(|e| e.trim().is_empty()) {
            return Err(GlintError::invalid_configuration(
                "required_extensions must not contain empty names",
            ));
        }
        Ok(())
    }

    /// Effective debug level: the configured one, else the environment, else 0.
    pub fn resolve_debug_level(&self) -> i32 {
        if let Some(level) = self.debug_level {
            return level;
        }
        std::env::var(DEBUG_ENV_VAR)
            .ok()
            .and_then(|v| parse_debug_level(&v))
            .unwrap_or(0)
    }
}

/// Parse a leading decimal integer, tolerating trailing garbage (`"2abc"` is 2).
pub(crate) fn parse_debug_level(raw: &str) -> Option<i32> {
    let s = raw.trim_start();
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..end].parse::<i32>().ok()
}

#[cfg(test)]
#[path = "../tests/unit/config/config.rs"]
mod tests;
