use super::*;

#[test]
fn same_seed_same_sequence() {
    let mut a = Rng64::new(123);
    let mut b = Rng64::new(123);
    for _ in 0..10 {
        assert_eq!(a.next_u64(), b.next_u64());
    }
}

#[test]
fn ranges_stay_in_bounds() {
    let mut rng = Rng64::new(7);
    for _ in 0..1000 {
        let v = rng.range_f64(10.0, 250.0);
        assert!((10.0..=250.0).contains(&v));
        let u = rng.next_f64_01();
        assert!((0.0..1.0).contains(&u));
    }
    assert_eq!(rng.range_f64(5.0, 5.0), 5.0);
    assert_eq!(rng.range_f64(9.0, 3.0), 9.0);
}

#[test]
fn pick_handles_empty_and_covers_items() {
    let mut rng = Rng64::new(99);
    let empty: [u8; 0] = [];
    assert!(rng.pick(&empty).is_none());

    let items = [1, 2, 3];
    let mut seen = [false; 3];
    for _ in 0..200 {
        let v = *rng.pick(&items).unwrap();
        seen[v - 1] = true;
    }
    assert_eq!(seen, [true; 3]);
}
