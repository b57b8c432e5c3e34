//! Byte codecs for polynomials, public keys and signatures.
//!
//! All packers use the FIPS 204 little-endian bit order: coefficient i
//! occupies bits [i·w, (i+1)·w) of the output, least significant bit first.

use crate::errors::CodecError;
use crate::params::common::{N, POLY_Q_SIZE, POLY_T1_SIZE, Q, Q_BITS, SEED_SIZE};
use crate::params::ParamSet;
use crate::poly::{Poly, PolyVec};

fn pack_coeffs(out: &mut [u8], p: &Poly, bits: usize, map: impl Fn(i32) -> u32) {
	debug_assert_eq!(out.len(), N * bits / 8);
	let mut acc = 0u64;
	let mut acc_bits = 0usize;
	let mut idx = 0usize;
	for &c in p.coeffs.iter() {
		acc |= (map(c) as u64) << acc_bits;
		acc_bits += bits;
		while acc_bits >= 8 {
			out[idx] = acc as u8;
			idx += 1;
			acc >>= 8;
			acc_bits -= 8;
		}
	}
}

fn unpack_coeffs(input: &[u8], bits: usize, map: impl Fn(u32) -> i32) -> Poly {
	debug_assert_eq!(input.len(), N * bits / 8);
	let mask = (1u64 << bits) - 1;
	let mut acc = 0u64;
	let mut acc_bits = 0usize;
	let mut idx = 0usize;
	let mut p = Poly::zero();
	for c in p.coeffs.iter_mut() {
		while acc_bits < bits {
			acc |= (input[idx] as u64) << acc_bits;
			idx += 1;
			acc_bits += 8;
		}
		*c = map((acc & mask) as u32);
		acc >>= bits;
		acc_bits -= bits;
	}
	p
}

/// Pack one polynomial at 23 bits per coefficient. Coefficients must be
/// in [0, q).
pub fn pack_poly_q(p: &Poly) -> [u8; POLY_Q_SIZE] {
	let mut out = [0u8; POLY_Q_SIZE];
	pack_coeffs(&mut out, p, Q_BITS, |c| c as u32);
	out
}

/// Unpack one 23-bit polynomial, rejecting any coefficient ≥ q.
pub fn unpack_poly_q(bytes: &[u8]) -> Result<Poly, CodecError> {
	if bytes.len() != POLY_Q_SIZE {
		return Err(CodecError::InvalidLength { expected: POLY_Q_SIZE, actual: bytes.len() });
	}
	let p = unpack_coeffs(bytes, Q_BITS, |t| t as i32);
	if p.coeffs.iter().any(|&c| c >= Q) {
		return Err(CodecError::CoefficientOutOfRange);
	}
	Ok(p)
}

/// Pack a vector of polynomials at 23 bits per coefficient.
pub fn pack_polyvec_q(v: &PolyVec) -> Vec<u8> {
	let mut out = Vec::with_capacity(v.len() * POLY_Q_SIZE);
	for p in v.vec.iter() {
		out.extend_from_slice(&pack_poly_q(p));
	}
	out
}

/// Unpack a vector of `len` 23-bit polynomials.
pub fn unpack_polyvec_q(bytes: &[u8], len: usize) -> Result<PolyVec, CodecError> {
	if bytes.len() != len * POLY_Q_SIZE {
		return Err(CodecError::InvalidLength {
			expected: len * POLY_Q_SIZE,
			actual: bytes.len(),
		});
	}
	let mut v = PolyVec { vec: Vec::with_capacity(len) };
	for chunk in bytes.chunks_exact(POLY_Q_SIZE) {
		v.vec.push(unpack_poly_q(chunk)?);
	}
	Ok(v)
}

/// Pack t1 at 10 bits per coefficient.
pub fn pack_t1(t1: &PolyVec) -> Vec<u8> {
	let mut out = vec![0u8; t1.len() * POLY_T1_SIZE];
	for (p, chunk) in t1.vec.iter().zip(out.chunks_exact_mut(POLY_T1_SIZE)) {
		pack_coeffs(chunk, p, 10, |c| c as u32);
	}
	out
}

/// Unpack t1 from `k` 10-bit polynomials. All bit patterns are valid.
pub fn unpack_t1(bytes: &[u8], k: usize) -> Result<PolyVec, CodecError> {
	if bytes.len() != k * POLY_T1_SIZE {
		return Err(CodecError::InvalidLength {
			expected: k * POLY_T1_SIZE,
			actual: bytes.len(),
		});
	}
	let mut v = PolyVec { vec: Vec::with_capacity(k) };
	for chunk in bytes.chunks_exact(POLY_T1_SIZE) {
		v.vec.push(unpack_coeffs(chunk, 10, |t| t as i32));
	}
	Ok(v)
}

/// Pack z at γ₁-width (gamma1_bits + 1 bits), encoding γ₁ - z.
/// Coefficients must be centered with |z| < γ₁.
pub fn pack_z(z: &PolyVec, ps: &ParamSet) -> Vec<u8> {
	let gamma1 = ps.gamma1();
	let bits = ps.gamma1_bits + 1;
	let mut out = vec![0u8; z.len() * ps.poly_z_size()];
	for (p, chunk) in z.vec.iter().zip(out.chunks_exact_mut(ps.poly_z_size())) {
		pack_coeffs(chunk, p, bits, |c| (gamma1 - c) as u32);
	}
	out
}

/// Unpack z into centered coefficients in (-γ₁, γ₁]. All bit patterns are
/// valid for this width.
pub fn unpack_z(bytes: &[u8], ps: &ParamSet) -> Result<PolyVec, CodecError> {
	let expected = ps.l * ps.poly_z_size();
	if bytes.len() != expected {
		return Err(CodecError::InvalidLength { expected, actual: bytes.len() });
	}
	let gamma1 = ps.gamma1();
	let bits = ps.gamma1_bits + 1;
	let mut v = PolyVec { vec: Vec::with_capacity(ps.l) };
	for chunk in bytes.chunks_exact(ps.poly_z_size()) {
		v.vec.push(unpack_coeffs(chunk, bits, |t| gamma1 - t as i32));
	}
	Ok(v)
}

/// W1Encode: pack the high-bits vector at 4 (γ₂ = (q-1)/32) or 6
/// (γ₂ = (q-1)/88) bits per coefficient.
pub fn pack_w1(w1: &PolyVec, ps: &ParamSet) -> Vec<u8> {
	let bits = ps.poly_w1_size() * 8 / N;
	let mut out = vec![0u8; w1.len() * ps.poly_w1_size()];
	for (p, chunk) in w1.vec.iter().zip(out.chunks_exact_mut(ps.poly_w1_size())) {
		pack_coeffs(chunk, p, bits, |c| c as u32);
	}
	out
}

/// Pack a public key as ρ ‖ t1.
pub fn pack_pk(rho: &[u8; SEED_SIZE], t1: &PolyVec, ps: &ParamSet) -> Vec<u8> {
	debug_assert_eq!(t1.len(), ps.k);
	let mut out = Vec::with_capacity(ps.public_key_size());
	out.extend_from_slice(rho);
	out.extend_from_slice(&pack_t1(t1));
	out
}

/// Unpack a public key into (ρ, t1).
pub fn unpack_pk(bytes: &[u8], ps: &ParamSet) -> Result<([u8; SEED_SIZE], PolyVec), CodecError> {
	if bytes.len() != ps.public_key_size() {
		return Err(CodecError::InvalidLength {
			expected: ps.public_key_size(),
			actual: bytes.len(),
		});
	}
	let mut rho = [0u8; SEED_SIZE];
	rho.copy_from_slice(&bytes[..SEED_SIZE]);
	let t1 = unpack_t1(&bytes[SEED_SIZE..], ps.k)?;
	Ok((rho, t1))
}

/// Pack a signature as c̃ ‖ z ‖ HintBitPack(h).
///
/// The hint vector must hold 0/1 coefficients with total weight ≤ ω.
pub fn pack_signature(c_tilde: &[u8], z: &PolyVec, hint: &PolyVec, ps: &ParamSet) -> Vec<u8> {
	debug_assert_eq!(c_tilde.len(), ps.c_tilde_size);
	let mut out = Vec::with_capacity(ps.signature_size());
	out.extend_from_slice(c_tilde);
	out.extend_from_slice(&pack_z(z, ps));

	// HintBitPack: ω position bytes then k cumulative counts.
	let base = out.len();
	out.resize(base + ps.omega + ps.k, 0u8);
	let mut off = 0usize;
	for (i, p) in hint.vec.iter().enumerate() {
		for (j, &h) in p.coeffs.iter().enumerate() {
			if h != 0 {
				out[base + off] = j as u8;
				off += 1;
			}
		}
		out[base + ps.omega + i] = off as u8;
	}
	out
}

/// Unpack and validate a signature, returning (c̃, z, h).
///
/// The hint encoding is checked strictly: counts must be non-decreasing and
/// bounded by ω, positions strictly increasing within each polynomial, and
/// all unused position bytes zero. z comes back centered.
pub fn unpack_signature(
	bytes: &[u8],
	ps: &ParamSet,
) -> Result<(Vec<u8>, PolyVec, PolyVec), CodecError> {
	if bytes.len() != ps.signature_size() {
		return Err(CodecError::InvalidLength {
			expected: ps.signature_size(),
			actual: bytes.len(),
		});
	}
	let c_tilde = bytes[..ps.c_tilde_size].to_vec();
	let z_end = ps.c_tilde_size + ps.l * ps.poly_z_size();
	let z = unpack_z(&bytes[ps.c_tilde_size..z_end], ps)?;

	let hint_bytes = &bytes[z_end..];
	let mut hint = PolyVec::zero(ps.k);
	let mut off = 0usize;
	for i in 0..ps.k {
		let count = hint_bytes[ps.omega + i] as usize;
		if count < off || count > ps.omega {
			return Err(CodecError::InvalidHint);
		}
		for j in off..count {
			let pos = hint_bytes[j] as usize;
			// Positions must be strictly increasing inside a polynomial.
			if j > off && pos <= hint_bytes[j - 1] as usize {
				return Err(CodecError::InvalidHint);
			}
			hint.vec[i].coeffs[pos] = 1;
		}
		off = count;
	}
	if hint_bytes[off..ps.omega].iter().any(|&b| b != 0) {
		return Err(CodecError::InvalidHint);
	}
	Ok((c_tilde, z, hint))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::params::{MLDSA44, MLDSA65, MLDSA87};
	use rand::{Rng, SeedableRng};

	fn random_poly_q(rng: &mut impl Rng) -> Poly {
		let mut p = Poly::zero();
		for c in p.coeffs.iter_mut() {
			*c = rng.gen_range(0..Q);
		}
		p
	}

	#[test]
	fn poly_q_roundtrip() {
		let mut rng = rand::rngs::StdRng::seed_from_u64(1);
		let p = random_poly_q(&mut rng);
		let packed = pack_poly_q(&p);
		assert_eq!(unpack_poly_q(&packed).unwrap(), p);
	}

	#[test]
	fn poly_q_rejects_out_of_range() {
		let mut p = Poly::zero();
		p.coeffs[0] = Q; // one past the modulus
		let packed = pack_poly_q(&p);
		assert_eq!(unpack_poly_q(&packed), Err(CodecError::CoefficientOutOfRange));
	}

	#[test]
	fn polyvec_q_roundtrip_and_lengths() {
		let mut rng = rand::rngs::StdRng::seed_from_u64(2);
		let v = PolyVec { vec: (0..3).map(|_| random_poly_q(&mut rng)).collect() };
		let packed = pack_polyvec_q(&v);
		assert_eq!(packed.len(), 3 * POLY_Q_SIZE);
		assert_eq!(unpack_polyvec_q(&packed, 3).unwrap(), v);
		assert!(unpack_polyvec_q(&packed, 4).is_err());
	}

	#[test]
	fn t1_roundtrip() {
		let mut rng = rand::rngs::StdRng::seed_from_u64(3);
		let mut t1 = PolyVec::zero(6);
		for p in t1.vec.iter_mut() {
			for c in p.coeffs.iter_mut() {
				*c = rng.gen_range(0..1 << 10);
			}
		}
		assert_eq!(unpack_t1(&pack_t1(&t1), 6).unwrap(), t1);
	}

	#[test]
	fn z_roundtrip_all_levels() {
		let mut rng = rand::rngs::StdRng::seed_from_u64(4);
		for ps in [&MLDSA44, &MLDSA65, &MLDSA87] {
			let gamma1 = ps.gamma1();
			let mut z = PolyVec::zero(ps.l);
			for p in z.vec.iter_mut() {
				for c in p.coeffs.iter_mut() {
					*c = rng.gen_range(-(gamma1 - 1)..=gamma1);
				}
			}
			let packed = pack_z(&z, ps);
			assert_eq!(packed.len(), ps.l * ps.poly_z_size());
			assert_eq!(unpack_z(&packed, ps).unwrap(), z);
		}
	}

	#[test]
	fn signature_roundtrip() {
		let mut rng = rand::rngs::StdRng::seed_from_u64(5);
		let ps = &MLDSA65;
		let c_tilde = vec![0xC5u8; ps.c_tilde_size];
		let mut z = PolyVec::zero(ps.l);
		for p in z.vec.iter_mut() {
			for c in p.coeffs.iter_mut() {
				*c = rng.gen_range(-(ps.gamma1() - 1)..ps.gamma1());
			}
		}
		let mut hint = PolyVec::zero(ps.k);
		hint.vec[0].coeffs[3] = 1;
		hint.vec[0].coeffs[200] = 1;
		hint.vec[4].coeffs[17] = 1;

		let sig = pack_signature(&c_tilde, &z, &hint, ps);
		assert_eq!(sig.len(), ps.signature_size());
		let (c2, z2, h2) = unpack_signature(&sig, ps).unwrap();
		assert_eq!(c2, c_tilde);
		assert_eq!(z2, z);
		assert_eq!(h2, hint);
	}

	#[test]
	fn signature_rejects_malformed_hints() {
		let ps = &MLDSA44;
		let sig = pack_signature(
			&vec![0u8; ps.c_tilde_size],
			&PolyVec::zero(ps.l),
			&PolyVec::zero(ps.k),
			ps,
		);

		// Non-zero byte in the unused position area.
		let mut bad = sig.clone();
		let hint_base = ps.c_tilde_size + ps.l * ps.poly_z_size();
		bad[hint_base + 5] = 9;
		assert_eq!(unpack_signature(&bad, ps), Err(CodecError::InvalidHint));

		// Decreasing cumulative counts.
		let mut bad = sig.clone();
		bad[hint_base] = 3;
		bad[hint_base + 1] = 5;
		bad[hint_base + ps.omega] = 2;
		bad[hint_base + ps.omega + 1] = 1;
		assert_eq!(unpack_signature(&bad, ps), Err(CodecError::InvalidHint));

		// Count above ω.
		let mut bad = sig;
		bad[hint_base + ps.omega + ps.k - 1] = (ps.omega + 1) as u8;
		assert_eq!(unpack_signature(&bad, ps), Err(CodecError::InvalidHint));
	}
}
