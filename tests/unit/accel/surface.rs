use super::*;
use crate::{
    accel::{Backend, lifecycle::GlintBuilder},
    config::{GlintOpts, InitFlags},
    gpu::headless::{HeadlessDevice, HeadlessProbe, HeadlessSpec},
};

fn active(spec: HeadlessSpec, opts: GlintOpts) -> (Screen, Backend, HeadlessProbe) {
    let dev = HeadlessDevice::new(spec);
    let probe = dev.probe();
    let mut screen = Screen::new(0);
    let backend = GlintBuilder::new(Box::new(dev))
        .flags((InitFlags::USE_SCREEN | InitFlags::USE_COMPOSITING).bits())
        .opts(opts)
        .init(&mut screen)
        .unwrap();
    (screen, backend, probe)
}

fn limited(max: i64) -> HeadlessSpec {
    HeadlessSpec {
        max_renderbuffer_size: max,
        max_texture_size: max,
        ..HeadlessSpec::default()
    }
}

fn make(screen: &mut Screen, w: u32, h: u32, depth: u8, usage: SurfaceUsage) -> SurfaceId {
    screen.create_surface(w, h, depth, usage).unwrap().unwrap()
}

#[test]
fn feasible_surface_is_texture_backed() {
    let (mut screen, backend, probe) = active(limited(64), GlintOpts::default());
    let id = make(&mut screen, 32, 20, 24, SurfaceUsage::Normal);

    let b = backend.binding(id).unwrap();
    assert_eq!(b.kind, BackingKind::Texture);
    let t = b.target.unwrap();
    assert_eq!((t.width, t.height, t.depth), (32, 20, 24));
    assert!(t.pooled);

    let s = screen.surface(id).unwrap();
    assert_eq!((s.width, s.height), (32, 20));
    assert_eq!(s.pitch, row_pitch(32, 32));
    assert!(s.data.is_none());
    assert_eq!(probe.created(), 1);
    assert_eq!(backend.stats().gpu_surfaces, 1);
}

#[test]
fn oversized_surface_is_software_and_untracked() {
    let (mut screen, backend, probe) = active(limited(64), GlintOpts::default());
    let id = make(&mut screen, 100, 100, 24, SurfaceUsage::Normal);

    assert!(backend.binding(id).is_none());
    let s = screen.surface(id).unwrap();
    assert_eq!((s.width, s.height), (100, 100));
    assert!(s.data.is_some());
    assert_eq!(probe.created(), 0);
    assert_eq!(backend.stats().software_surfaces, 1);
    assert_eq!(backend.bound_surfaces(), 0);
}

#[test]
fn unsupported_depth_and_cpu_usage_stay_in_software() {
    let (mut screen, backend, probe) = active(HeadlessSpec::default(), GlintOpts::default());
    let odd = make(&mut screen, 16, 16, 12, SurfaceUsage::Normal);
    let cpu = make(&mut screen, 16, 16, 24, SurfaceUsage::Cpu);
    assert!(backend.binding(odd).is_none());
    assert!(backend.binding(cpu).is_none());
    assert_eq!(probe.created(), 0);
}

#[test]
fn scratch_surfaces_use_pooled_targets() {
    let (mut screen, backend, _) = active(HeadlessSpec::default(), GlintOpts::default());
    let id = make(&mut screen, 16, 16, 32, SurfaceUsage::Scratch);
    assert_eq!(backend.binding(id).unwrap().kind, BackingKind::PooledTarget);
}

#[test]
fn zero_sized_surface_gets_record_without_target() {
    let (mut screen, backend, probe) = active(HeadlessSpec::default(), GlintOpts::default());
    let id = make(&mut screen, 0, 10, 24, SurfaceUsage::Normal);
    let b = backend.binding(id).unwrap();
    assert_eq!(b.kind, BackingKind::Texture);
    assert!(b.target.is_none());
    assert_eq!(probe.created(), 0);
}

#[test]
fn host_limit_yields_no_surface() {
    let (mut screen, _, _) = active(HeadlessSpec::default(), GlintOpts::default());
    let before = screen.surfaces().len();
    let r = screen
        .create_surface(MAX_SURFACE_DIMENSION + 1, 4, 24, SurfaceUsage::Normal)
        .unwrap();
    assert!(r.is_none());
    assert_eq!(screen.surfaces().len(), before);
}

#[test]
fn device_exhaustion_falls_back_without_half_bound_surface() {
    let spec = HeadlessSpec {
        target_budget: Some(1),
        ..HeadlessSpec::default()
    };
    let (mut screen, backend, probe) = active(spec, GlintOpts::default());
    let a = make(&mut screen, 16, 16, 24, SurfaceUsage::Normal);
    let b = make(&mut screen, 16, 16, 24, SurfaceUsage::Normal);

    assert!(backend.binding(a).is_some());
    assert!(backend.binding(b).is_none());
    assert!(screen.surface(b).unwrap().data.is_some());
    assert_eq!(screen.surfaces().len(), 2);
    assert_eq!(probe.live_targets(), 1);
    assert_eq!(backend.bound_surfaces(), 1);
}

#[test]
fn full_binding_table_falls_back() {
    let opts = GlintOpts {
        max_bindings: Some(1),
        ..GlintOpts::default()
    };
    let (mut screen, backend, probe) = active(HeadlessSpec::default(), opts);
    make(&mut screen, 8, 8, 24, SurfaceUsage::Normal);
    let b = make(&mut screen, 8, 8, 24, SurfaceUsage::Normal);
    assert!(backend.binding(b).is_none());
    assert_eq!(screen.surfaces().len(), 2);
    assert_eq!(probe.created(), 1);
}

#[test]
fn binding_survives_until_last_reference() {
    let (mut screen, backend, _) = active(HeadlessSpec::default(), GlintOpts::default());
    let id = make(&mut screen, 16, 16, 24, SurfaceUsage::Normal);
    screen.reference_surface(id).unwrap();

    assert!(!screen.destroy_surface(id).unwrap());
    assert!(backend.binding(id).is_some());
    assert_eq!(backend.pool_stats().idle_targets, 0);

    assert!(screen.destroy_surface(id).unwrap());
    assert!(backend.binding(id).is_none());
    assert!(!screen.surfaces().contains(id));
    assert_eq!(backend.pool_stats().idle_targets, 1);
}

#[test]
fn released_targets_are_reused() {
    let (mut screen, backend, probe) = active(HeadlessSpec::default(), GlintOpts::default());
    let a = make(&mut screen, 32, 32, 24, SurfaceUsage::Normal);
    screen.destroy_surface(a).unwrap();
    let b = make(&mut screen, 32, 32, 24, SurfaceUsage::Normal);

    assert_eq!(probe.created(), 1);
    assert_eq!(backend.pool_stats().reused, 1);
    assert!(backend.binding(b).unwrap().target.is_some());
}

#[test]
fn external_texture_replaces_pooled_target() {
    let (mut screen, backend, probe) = active(HeadlessSpec::default(), GlintOpts::default());
    let id = make(&mut screen, 16, 16, 24, SurfaceUsage::Normal);

    set_surface_texture(&mut screen, id, TextureId(7)).unwrap();
    let t = backend.binding(id).unwrap().target.unwrap();
    assert!(!t.pooled);
    assert_eq!(probe.texture_of(t.raw), Some(TextureId(7)));
    assert_eq!(probe.bound(), 1);
    assert_eq!(backend.pool_stats().idle_targets, 1);

    screen.destroy_surface(id).unwrap();
    assert!(!probe.is_live(t.raw));
    assert_eq!(backend.pool_stats().idle_targets, 1);
    assert_eq!(backend.pool_stats().destroyed_owned, 1);
}

#[test]
fn front_buffer_tracks_surface_geometry() {
    let (mut screen, backend, _) = active(HeadlessSpec::default(), GlintOpts::default());
    let id = make(&mut screen, 32, 32, 24, SurfaceUsage::Normal);
    let pitch = screen.surface(id).unwrap().pitch;
    screen
        .surfaces_mut()
        .modify_header(id, 48, 40, pitch, None)
        .unwrap();

    set_screen_surface(&mut screen, id).unwrap();
    let t = backend.binding(id).unwrap().target.unwrap();
    assert_eq!((t.width, t.height), (48, 40));
    assert_eq!(backend.root_target(), Some(t.raw));

    screen.destroy_surface(id).unwrap();
    assert_eq!(backend.root_target(), None);
}

#[test]
fn front_buffer_needs_a_render_target() {
    let (mut screen, backend, _) = active(limited(64), GlintOpts::default());
    let id = make(&mut screen, 100, 100, 24, SurfaceUsage::Normal);
    assert!(matches!(
        set_screen_surface(&mut screen, id),
        Err(GlintError::InvalidState(_))
    ));
    assert_eq!(backend.root_target(), None);
}

#[test]
fn converting_to_software_releases_target_and_restores_pixels() {
    let (mut screen, backend, _) = active(HeadlessSpec::default(), GlintOpts::default());
    let id = make(&mut screen, 10, 4, 24, SurfaceUsage::Normal);

    set_surface_type(&mut screen, id, BackingKind::Software).unwrap();
    assert!(backend.binding(id).is_none());
    assert_eq!(backend.pool_stats().idle_targets, 1);
    let s = screen.surface(id).unwrap();
    assert_eq!(s.data.as_ref().map(Vec::len), Some(40 * 4));

    set_surface_type(&mut screen, id, BackingKind::PooledTarget).unwrap();
    let b = backend.binding(id).unwrap();
    assert_eq!(b.kind, BackingKind::PooledTarget);
    assert!(b.target.is_none());
}

#[test]
fn drawables_resolve_to_backing_pixmap() {
    let (mut screen, _, _) = active(HeadlessSpec::default(), GlintOpts::default());
    let pixmap = make(&mut screen, 64, 64, 24, SurfaceUsage::Normal);
    let window = screen
        .create_window(pixmap, Offset { dx: -3, dy: 9 })
        .unwrap();

    assert_eq!(drawable_pixmap(&screen, pixmap), Some((pixmap, Offset::ZERO)));
    assert_eq!(
        drawable_pixmap(&screen, window),
        Some((pixmap, Offset { dx: -3, dy: 9 }))
    );

    screen.destroy_surface(window).unwrap();
    assert_eq!(drawable_pixmap(&screen, window), None);
}
