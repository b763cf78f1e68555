use std::cell::RefCell;

use super::*;
use crate::{
    accel::{Accelerator, Backend, lifecycle::GlintBuilder},
    foundation::core::{Offset, SurfaceUsage},
    gpu::{
        GpuDevice,
        headless::{HeadlessDevice, HeadlessSpec},
    },
    host::{dispatch::SoftwareOps, surface::SurfaceId},
};

struct Named(&'static str);

impl OpHandler for Named {
    fn name(&self) -> &str {
        self.0
    }

    fn call(&self, _: &mut Screen, _: &OpCall) -> GlintResult<OpReply> {
        Ok(OpReply::Done)
    }
}

fn base_table() -> OpTable {
    OpTable::with_base(Rc::new(SoftwareOps))
}

#[test]
fn install_then_restore_is_identity() {
    let mut table = base_table();
    let before = table.snapshot();
    let mut saved = SavedHandlers::default();

    let n = install(&mut table, &mut saved, &families(InitFlags::all()));
    assert_eq!(n, Op::ALL.len());
    assert_eq!(table.snapshot().diff(&before).len(), Op::ALL.len());

    assert_eq!(restore(&mut table, &mut saved), n);
    assert_eq!(table.snapshot(), before);
    assert!(saved.is_empty());
}

#[test]
fn install_is_idempotent() {
    let mut table = base_table();
    let mut saved = SavedHandlers::default();
    let fams = families(InitFlags::USE_COMPOSITING);
    let first = install(&mut table, &mut saved, &fams);
    assert!(first > 0);
    assert_eq!(install(&mut table, &mut saved, &fams), 0);
    assert_eq!(table.depth(Op::Composite), 2);
}

#[test]
fn flags_gate_families_independently() {
    assert_eq!(families(InitFlags::empty()), vec![OpFamily::Picture]);
    assert_eq!(
        families(InitFlags::USE_SCREEN),
        vec![OpFamily::Screen, OpFamily::Picture]
    );
    assert_eq!(
        families(InitFlags::USE_COMPOSITING | InitFlags::INVERTED_Y_AXIS),
        vec![OpFamily::Compositing, OpFamily::Picture]
    );

    let mut table = base_table();
    let mut saved = SavedHandlers::default();
    install(&mut table, &mut saved, &families(InitFlags::empty()));
    assert!(saved.is_installed(Op::CreatePicture));
    assert!(!saved.is_installed(Op::Composite));
    assert!(!saved.is_installed(Op::CloseScreen));
    assert_eq!(table.depth(Op::Composite), 1);
}

#[test]
fn prior_is_the_handler_we_displaced() {
    let mut table = base_table();
    let earlier: Handler = Rc::new(Named("earlier"));
    table.push(Op::Composite, Rc::clone(&earlier));

    let mut saved = SavedHandlers::default();
    install(&mut table, &mut saved, &[OpFamily::Compositing]);
    let prior = saved.prior(Op::Composite).unwrap();
    assert!(same_handler(&prior, &earlier));
    assert_eq!(table.active(Op::Composite).unwrap().name(), "glint");

    restore(&mut table, &mut saved);
    assert!(same_handler(&table.active(Op::Composite).unwrap(), &earlier));
}

#[test]
fn restore_unlinks_ours_from_beneath_a_later_handler() {
    let mut table = base_table();
    let mut saved = SavedHandlers::default();
    install(&mut table, &mut saved, &[OpFamily::Compositing]);

    let later: Handler = Rc::new(Named("later"));
    table.push(Op::Composite, Rc::clone(&later));
    restore(&mut table, &mut saved);

    assert_eq!(table.depth(Op::Composite), 2);
    assert!(same_handler(&table.active(Op::Composite).unwrap(), &later));
    assert_eq!(table.depth(Op::Glyphs), 1);
}

#[derive(Clone, Default)]
struct Recorder {
    seen: Rc<RefCell<Vec<Vec<TargetView>>>>,
    accept: bool,
}

impl Accelerator for Recorder {
    fn accelerate(
        &mut self,
        _: &mut dyn GpuDevice,
        _: &OpCall,
        targets: &[TargetView],
        _: bool,
    ) -> bool {
        self.seen.borrow_mut().push(targets.to_vec());
        self.accept
    }
}

fn active(spec: HeadlessSpec, rec: &Recorder) -> (Screen, Backend) {
    let mut screen = Screen::new(0);
    let backend = GlintBuilder::new(Box::new(HeadlessDevice::new(spec)))
        .flags((InitFlags::USE_SCREEN | InitFlags::USE_COMPOSITING).bits())
        .accelerator(Box::new(rec.clone()))
        .init(&mut screen)
        .unwrap();
    (screen, backend)
}

fn surface(screen: &mut Screen, w: u32) -> SurfaceId {
    screen
        .create_surface(w, w, 24, SurfaceUsage::Normal)
        .unwrap()
        .unwrap()
}

#[test]
fn gpu_bound_composite_goes_to_accelerator() {
    let rec = Recorder {
        accept: true,
        ..Recorder::default()
    };
    let (mut screen, backend) = active(HeadlessSpec::default(), &rec);
    let src = surface(&mut screen, 16);
    let dst = surface(&mut screen, 32);

    let reply = screen
        .dispatch(OpCall::Composite {
            src,
            mask: None,
            dst,
        })
        .unwrap();
    assert_eq!(reply, OpReply::Done);
    assert_eq!(screen.software_calls(), 0);
    assert_eq!(backend.stats().accelerated_calls, 1);

    let seen = rec.seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].len(), 2);
    assert_eq!(seen[0][1].width, 32);
    assert_eq!(seen[0][0].surface, src);
}

#[test]
fn declined_composite_falls_back_through_prior() {
    let rec = Recorder::default();
    let (mut screen, backend) = active(HeadlessSpec::default(), &rec);
    let src = surface(&mut screen, 16);
    let dst = surface(&mut screen, 16);

    screen
        .dispatch(OpCall::Composite {
            src,
            mask: None,
            dst,
        })
        .unwrap();
    assert_eq!(rec.seen.borrow().len(), 1);
    assert_eq!(screen.software_calls(), 1);
    assert_eq!(backend.stats().fallback_calls, 1);
}

#[test]
fn software_surface_never_reaches_accelerator() {
    let rec = Recorder {
        accept: true,
        ..Recorder::default()
    };
    let (mut screen, backend) = active(HeadlessSpec::default(), &rec);
    let gpu = surface(&mut screen, 16);
    let cpu = screen
        .create_surface(16, 16, 24, SurfaceUsage::Cpu)
        .unwrap()
        .unwrap();

    screen
        .dispatch(OpCall::Trapezoids { src: cpu, dst: gpu })
        .unwrap();
    assert!(rec.seen.borrow().is_empty());
    assert_eq!(screen.software_calls(), 1);
    assert_eq!(backend.stats().fallback_calls, 1);
}

#[test]
fn lost_device_forces_software() {
    let rec = Recorder {
        accept: true,
        ..Recorder::default()
    };
    let spec = HeadlessSpec {
        fail_finish: true,
        ..HeadlessSpec::default()
    };
    let (mut screen, backend) = active(spec, &rec);
    let s = surface(&mut screen, 16);
    crate::accel::lifecycle::block_handler(&mut screen).unwrap();
    assert!(backend.is_gpu_lost());

    screen
        .dispatch(OpCall::GetSpans {
            drawable: s,
            y: 0,
            width: 16,
        })
        .unwrap();
    assert!(rec.seen.borrow().is_empty());
    assert_eq!(screen.software_calls(), 1);
}

#[test]
fn non_rendering_ops_pass_through() {
    let rec = Recorder {
        accept: true,
        ..Recorder::default()
    };
    let (mut screen, backend) = active(HeadlessSpec::default(), &rec);
    let s = surface(&mut screen, 8);

    screen.dispatch(OpCall::CreatePicture { drawable: s }).unwrap();
    screen.dispatch(OpCall::UnrealizeGlyph { glyph: 3 }).unwrap();
    assert!(rec.seen.borrow().is_empty());
    assert_eq!(screen.software_calls(), 2);
    assert_eq!(backend.stats().passthrough_calls, 2);
}

#[test]
fn window_views_carry_origin_offset() {
    let rec = Recorder {
        accept: true,
        ..Recorder::default()
    };
    let (mut screen, backend) = active(HeadlessSpec::default(), &rec);
    let pixmap = surface(&mut screen, 64);
    let window = screen
        .create_window(pixmap, Offset { dx: 5, dy: 6 })
        .unwrap();

    screen
        .dispatch(OpCall::CopyWindow {
            window,
            dx: 1,
            dy: 1,
        })
        .unwrap();
    let seen = rec.seen.borrow();
    let view = seen[0][0];
    assert_eq!(view.surface, window);
    assert_eq!(view.offset, Offset { dx: 5, dy: 6 });
    assert_eq!(
        Some(view.raw),
        backend.binding(pixmap).and_then(|b| b.target).map(|t| t.raw)
    );
}
