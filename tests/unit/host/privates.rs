use super::*;

const A: PrivateKey = PrivateKey("a");
const B: PrivateKey = PrivateKey("b");

#[test]
fn typed_lookup() {
    let mut p = Privates::default();
    p.set(A, Rc::new(7u32));
    assert_eq!(p.get::<u32>(A).as_deref(), Some(&7));
    assert!(p.get::<String>(A).is_none());
    assert!(p.get::<u32>(B).is_none());
    assert_eq!(p.len(), 1);
}

#[test]
fn set_replaces_and_remove_clears() {
    let mut p = Privates::default();
    p.set(A, Rc::new("x".to_string()));
    p.set(A, Rc::new(1i64));
    assert!(p.get::<String>(A).is_none());
    assert_eq!(p.get::<i64>(A).as_deref(), Some(&1));

    assert!(p.remove(A));
    assert!(!p.remove(A));
    assert!(!p.contains(A));
    assert!(p.is_empty());
}
