//! Power2Round, Decompose and hint arithmetic per FIPS 204.
//!
//! `decompose` supports both low-order ranges used by the three parameter
//! sets: γ₂ = (q-1)/32 (ML-DSA-65/87) and γ₂ = (q-1)/88 (ML-DSA-44).

use crate::params::common::{D, Q};

/// Split a ∈ [0, q) into (a0, a1) with a = a1·2^d + a0 and
/// a0 ∈ (-2^(d-1), 2^(d-1)].
pub fn power2round(a: i32) -> (i32, i32) {
	let a1 = (a + (1 << (D - 1)) - 1) >> D;
	(a - (a1 << D), a1)
}

/// Split a ∈ [0, q) into (a0, a1) with a = a1·2γ₂ + a0 and
/// a0 ∈ (-γ₂, γ₂], except a ≡ -1 (mod 2γ₂) which maps to a1 = 0.
pub fn decompose(a: i32, gamma2: i32) -> (i32, i32) {
	let mut a1 = (a + 127) >> 7;
	if gamma2 == (Q - 1) / 32 {
		a1 = (a1 * 1025 + (1 << 21)) >> 22;
		a1 &= 15;
	} else {
		a1 = (a1 * 11275 + (1 << 23)) >> 24;
		a1 ^= ((43 - a1) >> 31) & a1;
	}
	let mut a0 = a - a1 * 2 * gamma2;
	a0 -= (((Q - 1) / 2 - a0) >> 31) & Q;
	(a0, a1)
}

/// Hint bit telling the verifier whether adding `a0` (centered) to the
/// commitment flips its high part `a1`.
pub fn make_hint(a0: i32, a1: i32, gamma2: i32) -> i32 {
	if a0 > gamma2 || a0 < -gamma2 || (a0 == -gamma2 && a1 != 0) {
		1
	} else {
		0
	}
}

/// Recover the high part of a ∈ [0, q) using the hint bit.
pub fn use_hint(a: i32, hint: i32, gamma2: i32) -> i32 {
	let (a0, a1) = decompose(a, gamma2);
	if hint == 0 {
		return a1;
	}
	if gamma2 == (Q - 1) / 32 {
		if a0 > 0 {
			(a1 + 1) & 15
		} else {
			(a1 - 1) & 15
		}
	} else if a0 > 0 {
		if a1 == 43 {
			0
		} else {
			a1 + 1
		}
	} else if a1 == 0 {
		43
	} else {
		a1 - 1
	}
}
