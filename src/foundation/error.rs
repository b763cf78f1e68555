/// Convenience result type used across Glint.
pub type GlintResult<T> = Result<T, GlintError>;

/// Top-level error taxonomy.
///
/// Initialization and teardown errors reach the caller. The per-surface kinds
/// (`OutOfResources`, `UnsupportedFormat`, `AllocationFailure`) are absorbed by the surface
/// creation path and turned into a software surface instead.
#[derive(thiserror::Error, Debug)]
pub enum GlintError {
    /// Unrecognized initialization flags or invalid options.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The GPU version or extension set is below the minimum requirement.
    #[error("unsupported backend: {0}")]
    UnsupportedBackend(String),

    /// A render target exceeds the device limits or the device ran out of memory.
    #[error("out of resources: {0}")]
    OutOfResources(String),

    /// The requested pixel depth has no render-target format.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Per-surface bookkeeping could not be allocated.
    #[error("allocation failure: {0}")]
    AllocationFailure(String),

    /// A lifecycle operation was called in the wrong state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A host collaborator refused a request.
    #[error("host error: {0}")]
    Host(String),

    /// The device reported a failure outside the render-target allocation path.
    #[error("gpu error: {0}")]
    Gpu(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GlintError {
    /// Build a [`GlintError::InvalidConfiguration`] value.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Build a [`GlintError::UnsupportedBackend`] value.
    pub fn unsupported_backend(msg: impl Into<String>) -> Self {
        Self::UnsupportedBackend(msg.into())
    }

    /// Build a [`GlintError::OutOfResources`] value.
    pub fn out_of_resources(msg: impl Into<String>) -> Self {
        Self::OutOfResources(msg.into())
    }

    /// Build a [`GlintError::UnsupportedFormat`] value.
    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    /// Build a [`GlintError::AllocationFailure`] value.
    pub fn allocation_failure(msg: impl Into<String>) -> Self {
        Self::AllocationFailure(msg.into())
    }

    /// Build a [`GlintError::InvalidState`] value.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Build a [`GlintError::Host`] value.
    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host(msg.into())
    }

    /// Build a [`GlintError::Gpu`] value.
    pub fn gpu(msg: impl Into<String>) -> Self {
        Self::Gpu(msg.into())
    }

    /// `true` for per-surface conditions that fall back to a software surface.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::OutOfResources(_) | Self::UnsupportedFormat(_) | Self::AllocationFailure(_)
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
