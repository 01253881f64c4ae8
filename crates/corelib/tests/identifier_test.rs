//! Property tests for identifier-space arithmetic.
//!
//! # Test Strategy
//!
//! 1. **Ring relation**: `is_between` against a modular-arithmetic model
//! 2. **Order**: `greater_than` is a strict total order
//! 3. **Finger targets**: `finger_target(id, row) == id + 2^row (mod 2^N)`

use corelib::Identifier;
use proptest::prelude::*;

fn id32(v: u32) -> Identifier {
    Identifier::from_le_bytes(&v.to_le_bytes(), 32)
}

/// Clockwise-arc membership computed with plain integer arithmetic.
fn model_between(x: u32, a: u32, b: u32, end_inclusive: bool) -> bool {
    if x == a {
        return false;
    }
    if x == b {
        return end_inclusive;
    }
    let span = match b.wrapping_sub(a) {
        0 => 1u64 << 32,
        d => d as u64,
    };
    (x.wrapping_sub(a) as u64) < span
}

// ============================================================================
// Ring relation
// ============================================================================

proptest! {
    #[test]
    fn prop_is_between_matches_model(x: u32, a: u32, b: u32, end_inclusive: bool) {
        prop_assert_eq!(
            id32(x).is_between(&id32(a), &id32(b), end_inclusive),
            model_between(x, a, b, end_inclusive)
        );
    }

    #[test]
    fn prop_inclusive_and_exclusive_differ_only_at_end(x: u32, a: u32, b: u32) {
        let (x, a, b) = (id32(x), id32(a), id32(b));
        let inclusive = x.is_between(&a, &b, true);
        let exclusive = x.is_between(&a, &b, false);
        if x == b && x != a {
            prop_assert!(inclusive);
            prop_assert!(!exclusive);
        } else {
            prop_assert_eq!(inclusive, exclusive);
        }
    }

    #[test]
    fn prop_start_is_never_between(a: u32, b: u32, end_inclusive: bool) {
        prop_assert!(!id32(a).is_between(&id32(a), &id32(b), end_inclusive));
    }

    #[test]
    fn prop_point_sits_in_exactly_one_half(x: u32, a: u32, b: u32) {
        // Two distinct points split the ring into (a, b] and (b, a].
        prop_assume!(a != b && x != a && x != b);
        let (x, a, b) = (id32(x), id32(a), id32(b));
        prop_assert_ne!(x.is_between(&a, &b, true), x.is_between(&b, &a, true));
    }
}

// ============================================================================
// Order
// ============================================================================

proptest! {
    #[test]
    fn prop_greater_than_is_strict(a: u32, b: u32) {
        let (ia, ib) = (id32(a), id32(b));
        if a == b {
            prop_assert!(!ia.greater_than(&ib));
            prop_assert!(!ib.greater_than(&ia));
        } else {
            prop_assert!(ia.greater_than(&ib) ^ ib.greater_than(&ia));
            prop_assert_eq!(ia.greater_than(&ib), a > b);
        }
    }
}

// ============================================================================
// Finger targets
// ============================================================================

proptest! {
    #[test]
    fn prop_finger_target_adds_power_of_two(v: u32, row in 0usize..32) {
        let expected = v.wrapping_add(1u32 << row);
        prop_assert_eq!(id32(v).finger_target(row), id32(expected));
    }

    #[test]
    fn prop_finger_offsets_grow_with_row(v: u32) {
        let base = id32(v);
        let mut last = 0u64;
        for row in 0..32 {
            let target = base.finger_target(row);
            let bytes: [u8; 4] = target.as_bytes().try_into().expect("4 bytes");
            let offset = u32::from_le_bytes(bytes).wrapping_sub(v) as u64;
            prop_assert!(offset > last);
            last = offset;
        }
    }
}

#[test]
fn test_row_zero_increments_with_carry() {
    let one = Identifier::from_le_bytes(&[0b0000_0001], 8);
    assert_eq!(one.finger_target(0), Identifier::from_le_bytes(&[0b0000_0010], 8));
    let three = Identifier::from_le_bytes(&[0b0000_0011], 8);
    assert_eq!(three.finger_target(0), Identifier::from_le_bytes(&[0b0000_0100], 8));
}
