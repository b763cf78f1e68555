use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        GlintError::invalid_configuration("x")
            .to_string()
            .contains("invalid configuration:")
    );
    assert!(
        GlintError::unsupported_backend("x")
            .to_string()
            .contains("unsupported backend:")
    );
    assert!(
        GlintError::out_of_resources("x")
            .to_string()
            .contains("out of resources:")
    );
    assert!(
        GlintError::unsupported_format("x")
            .to_string()
            .contains("unsupported format:")
    );
    assert!(GlintError::host("x").to_string().contains("host error:"));
}

#[test]
fn only_per_surface_errors_are_recoverable() {
    assert!(GlintError::out_of_resources("x").is_recoverable());
    assert!(GlintError::unsupported_format("x").is_recoverable());
    assert!(GlintError::allocation_failure("x").is_recoverable());
    assert!(!GlintError::invalid_configuration("x").is_recoverable());
    assert!(!GlintError::unsupported_backend("x").is_recoverable());
    assert!(!GlintError::gpu("x").is_recoverable());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = GlintError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
