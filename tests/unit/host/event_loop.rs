use super::*;
use std::{cell::RefCell, rc::Rc};

struct Recorder {
    tag: &'static str,
    log: Rc<RefCell<Vec<String>>>,
}

impl TickHandler for Recorder {
    fn block(&mut self) {
        self.log.borrow_mut().push(format!("{}:block", self.tag));
    }

    fn wakeup(&mut self) {
        self.log.borrow_mut().push(format!("{}:wakeup", self.tag));
    }
}

#[test]
fn run_once_blocks_all_then_wakes_all() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut el = EventLoop::default();
    for tag in ["a", "b"] {
        el.register(Box::new(Recorder {
            tag,
            log: Rc::clone(&log),
        }))
        .unwrap();
    }
    el.run_once();
    assert_eq!(
        *log.borrow(),
        vec!["a:block", "b:block", "a:wakeup", "b:wakeup"]
    );
    assert_eq!(el.iterations(), 1);
}

#[test]
fn capacity_limits_registration_and_unregister_frees_slot() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut el = EventLoop::with_capacity(1);
    let t = el
        .register(Box::new(Recorder {
            tag: "a",
            log: Rc::clone(&log),
        }))
        .unwrap();
    assert!(el
        .register(Box::new(Recorder {
            tag: "b",
            log: Rc::clone(&log),
        }))
        .is_none());
    assert!(el.unregister(t));
    assert!(!el.unregister(t));
    assert!(el.is_empty());
}
