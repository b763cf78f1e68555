use super::*;
use crate::gpu::headless::{HeadlessDevice, HeadlessSpec};

fn device(spec: HeadlessSpec) -> HeadlessDevice {
    HeadlessDevice::new(spec)
}

#[test]
fn desktop_device_negotiates_limits_and_optional_extensions() {
    let dev = device(HeadlessSpec {
        max_renderbuffer_size: 4096,
        ..HeadlessSpec::default()
    });
    let caps = negotiate(&dev, &GlintOpts::default()).unwrap();
    assert_eq!(caps.max_target_size, 4096);
    assert!(caps.has_pack_invert);
    assert!(caps.has_framebuffer_blit);
    assert!(caps.fits(4096, 1));
    assert!(!caps.fits(4097, 1));
    assert!(caps.supports_depth(24));
    assert!(!caps.supports_depth(1));
}

#[test]
fn old_desktop_version_is_rejected() {
    let dev = device(HeadlessSpec {
        version: GpuVersion::new(1, 2),
        ..HeadlessSpec::default()
    });
    let err = negotiate(&dev, &GlintOpts::default()).unwrap_err();
    assert!(matches!(err, GlintError::UnsupportedBackend(_)));
    assert!(err.to_string().contains("1.3"));
}

#[test]
fn es2_requires_bgra_extension() {
    let mut spec = HeadlessSpec {
        version: GpuVersion::new(2, 0),
        flavor: GlFlavor::Es2,
        extensions: vec![],
        ..HeadlessSpec::default()
    };
    let err = negotiate(&device(spec.clone()), &GlintOpts::default()).unwrap_err();
    assert!(err.to_string().contains(EXT_BGRA8888));

    spec.extensions.push(EXT_BGRA8888.to_string());
    let caps = negotiate(&device(spec), &GlintOpts::default()).unwrap();
    assert_eq!(caps.flavor, GlFlavor::Es2);
    assert!(!caps.has_pack_invert);
}

#[test]
fn extra_required_extensions_are_enforced() {
    let opts = GlintOpts {
        required_extensions: vec!["GL_ARB_fancy".into()],
        ..GlintOpts::default()
    };
    let err = negotiate(&device(HeadlessSpec::default()), &opts).unwrap_err();
    assert!(err.to_string().contains("GL_ARB_fancy"));
}

#[test]
fn zero_target_size_is_unsupported() {
    let dev = HeadlessDevice::with_max_size(0);
    assert!(matches!(
        negotiate(&dev, &GlintOpts::default()),
        Err(GlintError::UnsupportedBackend(_))
    ));
}
