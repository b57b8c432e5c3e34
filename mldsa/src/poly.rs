//! Ring elements of R_q = Z_q[X]/(X^256+1) and runtime-length vectors.
//!
//! A [`Poly`] stores 256 coefficients as `i32`. Most routines keep
//! coefficients in the unsigned range [0, q); sampling produces small
//! centered values which callers normalize before any NTT work. The
//! representation (coefficient vs NTT domain) is tracked by the caller and
//! never mixed implicitly.

use zeroize::Zeroize;

use crate::params::common::{N, Q};

/// One polynomial of R_q.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Poly {
	/// The 256 coefficients.
	pub coeffs: [i32; N],
}

impl Default for Poly {
	fn default() -> Self {
		Self { coeffs: [0i32; N] }
	}
}

impl Zeroize for Poly {
	fn zeroize(&mut self) {
		self.coeffs.zeroize();
	}
}

impl core::fmt::Debug for Poly {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		write!(f, "Poly({}, {}, {}, ...)", self.coeffs[0], self.coeffs[1], self.coeffs[2])
	}
}

impl Poly {
	/// The zero polynomial.
	pub fn zero() -> Self {
		Self::default()
	}

	/// Coefficient-wise addition, no reduction.
	pub fn add_assign(&mut self, other: &Poly) {
		for (c, o) in self.coeffs.iter_mut().zip(other.coeffs.iter()) {
			*c += *o;
		}
	}

	/// Coefficient-wise subtraction, no reduction.
	pub fn sub_assign(&mut self, other: &Poly) {
		for (c, o) in self.coeffs.iter_mut().zip(other.coeffs.iter()) {
			*c -= *o;
		}
	}

	/// Reduce every coefficient to [0, q). Accepts any `i32` input.
	pub fn normalize(&mut self) {
		for c in self.coeffs.iter_mut() {
			*c = mod_q_i32(*c);
		}
	}

	/// Map coefficients from [0, q) to the centered range
	/// [-(q-1)/2, (q-1)/2].
	pub fn center(&mut self) {
		let half = Q / 2;
		for c in self.coeffs.iter_mut() {
			if *c > half {
				*c -= Q;
			}
		}
	}

	/// True if any centered coefficient has absolute value ≥ `bound`.
	///
	/// Coefficients may be given in either [0, q) or centered form.
	pub fn norm_exceeds(&self, bound: i32) -> bool {
		let half = Q / 2;
		self.coeffs.iter().any(|&c| {
			let centered = if c > half { c - Q } else { c };
			centered.abs() >= bound
		})
	}
}

/// A runtime-length vector of polynomials (length k or l of the level).
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PolyVec {
	/// The component polynomials.
	pub vec: Vec<Poly>,
}

impl Zeroize for PolyVec {
	fn zeroize(&mut self) {
		for p in self.vec.iter_mut() {
			p.zeroize();
		}
	}
}

impl PolyVec {
	/// A zero vector of `len` polynomials.
	pub fn zero(len: usize) -> Self {
		Self { vec: vec![Poly::zero(); len] }
	}

	/// Number of component polynomials.
	pub fn len(&self) -> usize {
		self.vec.len()
	}

	/// True if the vector has no components.
	pub fn is_empty(&self) -> bool {
		self.vec.is_empty()
	}

	/// Component-wise addition, no reduction.
	pub fn add_assign(&mut self, other: &PolyVec) {
		for (p, o) in self.vec.iter_mut().zip(other.vec.iter()) {
			p.add_assign(o);
		}
	}

	/// Component-wise subtraction, no reduction.
	pub fn sub_assign(&mut self, other: &PolyVec) {
		for (p, o) in self.vec.iter_mut().zip(other.vec.iter()) {
			p.sub_assign(o);
		}
	}

	/// Component-wise addition followed by reduction to [0, q).
	///
	/// Inputs must individually be in [0, q) so the `i32` sum cannot
	/// overflow.
	pub fn add_assign_mod_q(&mut self, other: &PolyVec) {
		for (p, o) in self.vec.iter_mut().zip(other.vec.iter()) {
			for (c, oc) in p.coeffs.iter_mut().zip(o.coeffs.iter()) {
				let sum = *c as i64 + *oc as i64;
				*c = (sum % Q as i64) as i32;
			}
		}
	}

	/// Reduce every coefficient to [0, q).
	pub fn normalize(&mut self) {
		for p in self.vec.iter_mut() {
			p.normalize();
		}
	}

	/// True if any centered coefficient has absolute value ≥ `bound`.
	pub fn norm_exceeds(&self, bound: i32) -> bool {
		self.vec.iter().any(|p| p.norm_exceeds(bound))
	}
}

/// Reduce x to a value ≤ 2q using 2²³ = 2¹³ - 1 (mod q).
#[inline]
pub fn reduce_le2q(x: u32) -> u32 {
	let x1 = x >> 23;
	let x2 = x & 0x7F_FFFF;
	x2.wrapping_add(x1 << 13).wrapping_sub(x1)
}

/// For 0 ≤ x < 2q, return x mod q branchlessly.
#[inline]
pub fn le2q_mod_q(x: u32) -> u32 {
	let r = x.wrapping_sub(Q as u32);
	let mask = ((r as i32) >> 31) as u32;
	r.wrapping_add(mask & Q as u32)
}

/// Return x mod q for any u32.
#[inline]
pub fn mod_q(x: u32) -> u32 {
	le2q_mod_q(reduce_le2q(x))
}

/// Return c mod q in [0, q) for any i32 with |c| < 2³¹ - q.
#[inline]
pub fn mod_q_i32(c: i32) -> i32 {
	let r = c % Q;
	if r < 0 {
		r + Q
	} else {
		r
	}
}
