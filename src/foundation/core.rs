/// Largest width or height the host accepts for any surface.
pub const MAX_SURFACE_DIMENSION: u32 = 32767;

/// Event-loop iteration counter used to age idle render targets.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Tick(pub u64);

impl Tick {
    /// The following tick.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Number of ticks elapsed since `earlier` (zero if `earlier` is in the future).
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Allocation hint passed with every surface creation request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceUsage {
    /// Ordinary client surface.
    #[default]
    Normal,
    /// Short-lived intermediate (e.g. an off-screen compositing target).
    Scratch,
    /// Backing store for a redirected window.
    BackingStore,
    /// Glyph cache atlas.
    GlyphCache,
    /// Caller insists on CPU storage; never accelerated.
    Cpu,
}

/// Translation from drawable coordinates into its backing surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Offset {
    /// Horizontal translation in pixels.
    pub dx: i32,
    /// Vertical translation in pixels.
    pub dy: i32,
}

impl Offset {
    /// No translation.
    pub const ZERO: Offset = Offset { dx: 0, dy: 0 };
}

/// Storage bits per pixel for a pixel depth, following the usual 1/8/16/32 padding.
pub fn bits_per_pixel(depth: u8) -> u32 {
    match depth {
        0 | 1 => 1,
        2..=8 => 8,
        9..=16 => 16,
        _ => 32,
    }
}

/// Row pitch in bytes, padded to a 4-byte boundary.
pub fn row_pitch(width: u32, bits_per_pixel: u32) -> u32 {
    let bytes = (u64::from(width) * u64::from(bits_per_pixel)).div_ceil(8);
    let padded = (bytes + 3) & !3;
    u32::try_from(padded).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
