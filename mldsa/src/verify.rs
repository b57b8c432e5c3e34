//! Standard ML-DSA signature verification (FIPS 204, ML-DSA.Verify).

use crate::ntt::{inv_ntt, mat_vec_mul, mul_hat, ntt};
use crate::packing::{pack_w1, unpack_pk, unpack_signature};
use crate::params::common::{D, MU_SIZE, TR_SIZE};
use crate::params::SecurityLevel;
use crate::poly::{Poly, PolyVec};
use crate::rounding::use_hint;
use crate::sampling::{expand_matrix, sample_in_ball};
use crate::shake::shake256;

/// Hash a packed public key to tr.
pub fn compute_tr(pk: &[u8]) -> [u8; TR_SIZE] {
	let mut tr = [0u8; TR_SIZE];
	shake256(&mut tr, &[pk]);
	tr
}

/// The message representative μ = H(tr ‖ 0 ‖ |ctx| ‖ ctx ‖ msg).
///
/// Returns `None` when the context string exceeds 255 bytes, which FIPS 204
/// forbids.
pub fn compute_mu(tr: &[u8; TR_SIZE], ctx: &[u8], msg: &[u8]) -> Option<[u8; MU_SIZE]> {
	if ctx.len() > 255 {
		return None;
	}
	let mut mu = [0u8; MU_SIZE];
	shake256(&mut mu, &[tr, &[0u8, ctx.len() as u8], ctx, msg]);
	Some(mu)
}

/// Verify a pure ML-DSA signature over `msg` with context string `ctx`.
///
/// Any malformed input (wrong lengths, out-of-range coefficients, invalid
/// hint encoding, oversized context) verifies as false.
pub fn verify(level: SecurityLevel, pk: &[u8], msg: &[u8], ctx: &[u8], sig: &[u8]) -> bool {
	let ps = level.params();

	let (rho, t1) = match unpack_pk(pk, ps) {
		Ok(parts) => parts,
		Err(_) => return false,
	};
	let (c_tilde, z, hint) = match unpack_signature(sig, ps) {
		Ok(parts) => parts,
		Err(_) => return false,
	};
	if z.norm_exceeds(ps.gamma1() - ps.beta()) {
		return false;
	}

	let tr = compute_tr(pk);
	let mu = match compute_mu(&tr, ctx, msg) {
		Some(mu) => mu,
		None => return false,
	};

	let mut c = sample_in_ball(&c_tilde, ps.tau);
	ntt(&mut c);

	let a = expand_matrix(&rho, ps.k, ps.l);
	let mut z_hat = z;
	z_hat.normalize();
	for p in z_hat.vec.iter_mut() {
		ntt(p);
	}
	let az = mat_vec_mul(&a, &z_hat);

	// w' = Az - c·t1·2^d, all in the NTT domain before the single inverse.
	let mut w1 = PolyVec::zero(ps.k);
	let mut ct1 = Poly::zero();
	for i in 0..ps.k {
		let mut t1_shifted = t1.vec[i];
		for coeff in t1_shifted.coeffs.iter_mut() {
			*coeff <<= D;
		}
		ntt(&mut t1_shifted);
		mul_hat(&mut ct1, &c, &t1_shifted);

		let w = &mut w1.vec[i];
		for (dst, (&az_c, &ct_c)) in
			w.coeffs.iter_mut().zip(az.vec[i].coeffs.iter().zip(ct1.coeffs.iter()))
		{
			// Both inputs are ≤ 2q; keep the difference non-negative and
			// back inside the inverse-transform input range.
			let diff = (az_c + 2 * crate::params::common::Q - ct_c) as u32;
			*dst = crate::poly::reduce_le2q(diff) as i32;
		}
		inv_ntt(w);
	}
	w1.normalize();

	for (wp, hp) in w1.vec.iter_mut().zip(hint.vec.iter()) {
		for (c, &h) in wp.coeffs.iter_mut().zip(hp.coeffs.iter()) {
			*c = use_hint(*c, h, ps.gamma2);
		}
	}

	let mut c_check = vec![0u8; ps.c_tilde_size];
	shake256(&mut c_check, &[&mu, &pack_w1(&w1, ps)]);
	c_check == c_tilde
}
