use super::*;

fn desc(w: u32, h: u32) -> TargetDesc {
    TargetDesc {
        width: w,
        height: h,
        depth: 24,
    }
}

#[test]
fn allocation_and_destruction_are_tracked() {
    let mut dev = HeadlessDevice::with_max_size(64);
    let probe = dev.probe();

    let a = dev.create_render_target(desc(8, 8)).unwrap();
    let b = dev.bind_texture(TextureId(77), desc(4, 4)).unwrap();
    assert_ne!(a, b);
    assert_eq!(probe.live_targets(), 2);
    assert_eq!(probe.texture_of(b), Some(TextureId(77)));
    assert_eq!(probe.desc_of(a), Some(desc(8, 8)));

    dev.destroy_render_target(a);
    assert!(!probe.is_live(a));
    assert!(probe.is_live(b));
    assert_eq!(probe.created(), 1);
    assert_eq!(probe.bound(), 1);
    assert_eq!(probe.destroyed(), 1);
}

#[test]
fn oversize_and_budget_fail_as_out_of_resources() {
    let mut dev = HeadlessDevice::new(HeadlessSpec {
        max_renderbuffer_size: 16,
        target_budget: Some(1),
        ..HeadlessSpec::default()
    });
    assert!(matches!(
        dev.create_render_target(desc(32, 8)),
        Err(GlintError::OutOfResources(_))
    ));
    dev.create_render_target(desc(8, 8)).unwrap();
    assert!(matches!(
        dev.create_render_target(desc(8, 8)),
        Err(GlintError::OutOfResources(_))
    ));
}

#[test]
fn finish_can_simulate_device_loss() {
    let mut dev = HeadlessDevice::new(HeadlessSpec {
        fail_finish: true,
        ..HeadlessSpec::default()
    });
    dev.flush();
    assert!(matches!(dev.finish(), Err(GlintError::Gpu(_))));
    assert_eq!(dev.probe().calls(), vec!["flush", "finish"]);
}

#[test]
fn spec_loads_from_json() {
    let spec: HeadlessSpec = serde_json::from_str(
        r#"{ "version": { "major": 2, "minor": 0 }, "flavor": "es2", "max_renderbuffer_size": 64 }"#,
    )
    .unwrap();
    assert_eq!(spec.flavor, GlFlavor::Es2);
    assert_eq!(spec.max_renderbuffer_size, 64);
    assert_eq!(spec.max_texture_size, 8192);
}
