//! Continuous hyperball masking for the rejection-free signing rounds.
//!
//! Each party masks its response share with a vector drawn uniformly from a
//! hyperball of calibrated radius. Sampling happens in floating point over a
//! SHAKE-256 stream: draw Gaussians via Box-Muller, record the squared norm,
//! scale the s1 block by nu, then normalize the whole vector to the target
//! radius.

use sha3::digest::XofReader;
use zeroize::Zeroize;

use permafrost_mldsa::params::common::{N, Q};
use permafrost_mldsa::shake::shake256_xof;
use permafrost_mldsa::{Poly, PolyVec};

/// Floating-point vector holding the concatenated (s1, s2) coefficient
/// blocks of one masked response.
#[derive(Clone)]
pub(crate) struct FVec {
	data: Box<[f64]>,
	/// Number of leading entries belonging to the s1 block (N * l).
	s1_coeffs: usize,
}

impl FVec {
	/// Create a zero vector shaped for `l` s1 polynomials and `k` s2
	/// polynomials.
	pub(crate) fn new(l: usize, k: usize) -> Self {
		let size = N * (l + k);
		Self { data: vec![0.0f64; size].into_boxed_slice(), s1_coeffs: N * l }
	}

	/// Sample this vector uniformly from the hyperball of the given radius.
	///
	/// The stream is SHAKE-256("H" || rhop || nonce), so both signing rounds
	/// and tests can regenerate the exact same mask from the per-iteration
	/// seed.
	pub(crate) fn sample_hyperball(&mut self, radius: f64, nu: f64, rhop: &[u8; 64], nonce: u16) {
		use std::f64::consts::PI;

		let size = self.data.len();
		let mut samples = vec![0.0f64; size + 2];

		let mut reader = shake256_xof(&[b"H", rhop, &nonce.to_le_bytes()]);
		let mut buf = vec![0u8; (size + 2) * 8];
		reader.read(&mut buf);

		let mut sq = 0.0f64;
		for i in (0..size + 2).step_by(2) {
			let u1 = u64::from_le_bytes(buf[i * 8..(i + 1) * 8].try_into().unwrap_or([0; 8]));
			let u2 = u64::from_le_bytes(buf[(i + 1) * 8..(i + 2) * 8].try_into().unwrap_or([0; 8]));

			// Top 53 bits give an exactly representable uniform in [0, 1).
			let f1 = ((u1 >> 11) as f64) * (1.0 / 9007199254740992.0);
			let f2 = ((u2 >> 11) as f64) * (1.0 / 9007199254740992.0);
			let f1 = if f1 <= 0.0 { f64::MIN_POSITIVE } else { f1 };

			let r = (-2.0 * f1.ln()).sqrt();
			let z1 = r * (2.0 * PI * f2).cos();
			let z2 = r * (2.0 * PI * f2).sin();

			samples[i] = z1;
			sq += z1 * z1;
			samples[i + 1] = z2;
			sq += z2 * z2;

			// Scale the s1 block by nu after accumulating the squared norm.
			if i < self.s1_coeffs {
				samples[i] *= nu;
				samples[i + 1] *= nu;
			}
		}

		let factor = radius / sq.sqrt();
		for (dst, src) in self.data.iter_mut().zip(samples.iter()) {
			*dst = src * factor;
		}
		samples.zeroize();
	}

	/// Add another vector of the same shape.
	pub(crate) fn add(&mut self, other: &FVec) {
		for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
			*a += b;
		}
	}

	/// Round back to integer polynomial vectors with centered coefficients
	/// in [-q/2, q/2].
	pub(crate) fn round(&self) -> (PolyVec, PolyVec) {
		let l = self.s1_coeffs / N;
		let k = (self.data.len() - self.s1_coeffs) / N;
		let mut s1 = PolyVec::zero(l);
		let mut s2 = PolyVec::zero(k);

		let round_block = |data: &[f64], out: &mut PolyVec| {
			for (i, p) in out.vec.iter_mut().enumerate() {
				for (j, c) in p.coeffs.iter_mut().enumerate() {
					let u = data[i * N + j].round() as i64;
					let mut reduced = (u % Q as i64) as i32;
					if reduced > Q / 2 {
						reduced -= Q;
					} else if reduced < -(Q / 2) {
						reduced += Q;
					}
					*c = reduced;
				}
			}
		};
		round_block(&self.data[..self.s1_coeffs], &mut s1);
		round_block(&self.data[self.s1_coeffs..], &mut s2);
		(s1, s2)
	}

	/// Build a vector from integer polynomial vectors, centering each
	/// coefficient from [0, q) into [-q/2, q/2].
	pub(crate) fn from_polyvecs(s1: &PolyVec, s2: &PolyVec) -> Self {
		let mut out = Self::new(s1.len(), s2.len());

		let center = |p: &Poly, dst: &mut [f64]| {
			for (d, &c) in dst.iter_mut().zip(p.coeffs.iter()) {
				let mut u = c + Q / 2;
				let t = u - Q;
				u = t + ((t >> 31) & Q);
				*d = (u - Q / 2) as f64;
			}
		};
		for (i, p) in s1.vec.iter().enumerate() {
			center(p, &mut out.data[i * N..(i + 1) * N]);
		}
		let base = out.s1_coeffs;
		for (i, p) in s2.vec.iter().enumerate() {
			center(p, &mut out.data[base + i * N..base + (i + 1) * N]);
		}
		out
	}

	/// Whether the nu-weighted norm of this vector exceeds `r`.
	///
	/// The s1 block counts with weight 1/nu² so the check matches the
	/// distribution the mask was drawn from.
	pub(crate) fn exceeds(&self, r: f64, nu: f64) -> bool {
		let mut sq = 0.0f64;
		for (i, &val) in self.data.iter().enumerate() {
			if i < self.s1_coeffs {
				sq += (val * val) / (nu * nu);
			} else {
				sq += val * val;
			}
		}
		sq > r * r
	}
}

impl Zeroize for FVec {
	fn zeroize(&mut self) {
		self.data.zeroize();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sampling_is_deterministic() {
		let rhop = [9u8; 64];
		let mut a = FVec::new(4, 4);
		let mut b = FVec::new(4, 4);
		a.sample_hyperball(1000.0, 3.0, &rhop, 7);
		b.sample_hyperball(1000.0, 3.0, &rhop, 7);
		assert_eq!(a.data, b.data);

		let mut c = FVec::new(4, 4);
		c.sample_hyperball(1000.0, 3.0, &rhop, 8);
		assert_ne!(a.data, c.data);
	}

	#[test]
	fn sample_lies_on_weighted_sphere() {
		// After normalization the nu-weighted norm equals the radius up to
		// the two extra Box-Muller slots dropped from the tail.
		let rhop = [1u8; 64];
		let mut v = FVec::new(4, 4);
		v.sample_hyperball(250_000.0, 3.0, &rhop, 0);
		assert!(!v.exceeds(250_000.0 * 1.001, 3.0));
		assert!(v.exceeds(200_000.0, 3.0));
	}

	#[test]
	fn round_centers_coefficients() {
		let mut v = FVec::new(2, 3);
		v.data[0] = 4.6;
		v.data[1] = -4.6;
		v.data[2 * N] = (Q as f64) + 2.0;
		let (s1, s2) = v.round();
		assert_eq!(s1.len(), 2);
		assert_eq!(s2.len(), 3);
		assert_eq!(s1.vec[0].coeffs[0], 5);
		assert_eq!(s1.vec[0].coeffs[1], -5);
		assert_eq!(s2.vec[0].coeffs[0], 2);
	}

	#[test]
	fn from_polyvecs_roundtrip() {
		let mut s1 = PolyVec::zero(2);
		let mut s2 = PolyVec::zero(2);
		s1.vec[0].coeffs[0] = 5;
		s1.vec[1].coeffs[1] = Q - 3; // centered -3
		s2.vec[1].coeffs[2] = Q / 2;
		let v = FVec::from_polyvecs(&s1, &s2);
		let (r1, r2) = v.round();
		assert_eq!(r1.vec[0].coeffs[0], 5);
		assert_eq!(r1.vec[1].coeffs[1], -3);
		assert_eq!(r2.vec[1].coeffs[2], Q / 2);
	}

	#[test]
	fn addition_is_componentwise() {
		let rhop = [3u8; 64];
		let mut a = FVec::new(2, 2);
		a.sample_hyperball(100.0, 3.0, &rhop, 1);
		let before = a.data[0];
		let b = a.clone();
		a.add(&b);
		assert_eq!(a.data[0], before * 2.0);
	}
}
