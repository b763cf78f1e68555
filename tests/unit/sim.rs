use super::*;
use crate::gpu::headless::{HeadlessDevice, HeadlessSpec};

fn small_device() -> Box<HeadlessDevice> {
    Box::new(HeadlessDevice::new(HeadlessSpec {
        max_renderbuffer_size: 64,
        max_texture_size: 64,
        ..HeadlessSpec::default()
    }))
}

#[test]
fn scenario_json_parses_with_defaults() {
    let s: Scenario = serde_json::from_str(
        r#"{
            "steps": [
                {"create": {"name": "a", "width": 4, "height": 4}},
                {"tick": {"count": 2}},
                {"destroy": {"name": "a"}}
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(s.flags, 0b011);
    assert_eq!(s.opts, GlintOpts::default());
    assert_eq!(
        s.steps[0],
        Step::Create {
            name: "a".to_string(),
            width: 4,
            height: 4,
            depth: 24,
            usage: SurfaceUsage::Normal,
        }
    );
    assert!(serde_json::from_str::<Scenario>(r#"{"steps": [], "bogus": 1}"#).is_err());
}

#[test]
fn run_reports_per_surface_backing() {
    let scenario: Scenario = serde_json::from_str(
        r#"{
            "steps": [
                {"create": {"name": "big", "width": 100, "height": 100}},
                {"create": {"name": "small", "width": 32, "height": 32}},
                {"create": {"name": "tmp", "width": 8, "height": 8, "usage": "scratch"}},
                {"composite": {"src": "small", "dst": "big"}},
                {"destroy": {"name": "tmp"}},
                {"tick": {"count": 3}}
            ]
        }"#,
    )
    .unwrap();

    let report = run(small_device(), &scenario).unwrap();
    assert_eq!(report.state, LifecycleState::Active);
    assert!(report.closed);

    let big = &report.surfaces["big"];
    assert!(big.alive && big.kind.is_none() && !big.accelerated);
    let small = &report.surfaces["small"];
    assert_eq!(small.kind, Some(BackingKind::Texture));
    assert!(small.accelerated);
    assert!(!report.surfaces["tmp"].alive);

    assert_eq!(report.backend.gpu_surfaces, 2);
    assert_eq!(report.backend.software_surfaces, 1);
    assert_eq!(report.backend.fallback_calls, 1);
    assert_eq!(report.backend.ticks, 3);
    assert_eq!(report.software_calls, 1);
    assert_eq!(report.pool.idle_targets, 1);
}

#[test]
fn unknown_surface_name_is_an_error() {
    let scenario = Scenario {
        flags: 0b011,
        opts: GlintOpts::default(),
        steps: vec![Step::Destroy {
            name: "ghost".to_string(),
        }],
    };
    let err = run(small_device(), &scenario).unwrap_err();
    assert!(matches!(err, GlintError::InvalidConfiguration(_)));
}

#[test]
fn invalid_flags_fail_the_run() {
    let scenario = Scenario {
        flags: 0x40,
        opts: GlintOpts::default(),
        steps: Vec::new(),
    };
    assert!(matches!(
        run(small_device(), &scenario),
        Err(GlintError::InvalidConfiguration(_))
    ));
}
