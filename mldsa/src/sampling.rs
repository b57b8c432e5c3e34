//! Rejection sampling of ring elements from extendable-output hashes.

use sha3::digest::XofReader;

use crate::params::common::{N, Q};
use crate::poly::{Poly, PolyVec};
use crate::shake::{shake128_xof, shake256_xof};

/// Sample a uniform ring element directly in the NTT domain from
/// SHAKE-128(rho ‖ nonce), three bytes per 23-bit candidate, rejecting
/// candidates ≥ q. This is RejNTTPoly from FIPS 204.
pub fn rej_ntt_poly(rho: &[u8; 32], nonce: u16) -> Poly {
	let mut reader = shake128_xof(&[rho, &nonce.to_le_bytes()]);
	let mut p = Poly::zero();
	let mut buf = [0u8; 168]; // one SHAKE-128 rate block
	let mut idx = buf.len();

	let mut i = 0;
	while i < N {
		if idx + 3 > buf.len() {
			reader.read(&mut buf);
			idx = 0;
		}
		let t = buf[idx] as u32 | (buf[idx + 1] as u32) << 8 | ((buf[idx + 2] & 0x7F) as u32) << 16;
		idx += 3;
		if t < Q as u32 {
			p.coeffs[i] = t as i32;
			i += 1;
		}
	}
	p
}

/// Expand the public matrix A ∈ R_q^{k×l} from ρ, row by row, with the
/// FIPS 204 nonce layout (i << 8) + j. Entries are in the NTT domain.
pub fn expand_matrix(rho: &[u8; 32], k: usize, l: usize) -> Vec<PolyVec> {
	(0..k)
		.map(|i| PolyVec {
			vec: (0..l).map(|j| rej_ntt_poly(rho, ((i as u16) << 8) + j as u16)).collect(),
		})
		.collect()
}

/// Sample a polynomial with coefficients in [-η, η] from
/// SHAKE-256(seed ‖ nonce), nibble-wise. η = 2 uses the mod-5 reduction of
/// nibbles below 15; η = 4 accepts nibbles below 9 directly. This is
/// RejBoundedPoly from FIPS 204 (66-byte absorbed input).
pub fn rej_bounded_poly(seed: &[u8; 64], nonce: u16, eta: i32) -> Poly {
	debug_assert!(eta == 2 || eta == 4);
	let mut reader = shake256_xof(&[seed, &nonce.to_le_bytes()]);
	let mut p = Poly::zero();
	let mut buf = [0u8; 136]; // one SHAKE-256 rate block
	let mut idx = buf.len();
	let mut nibbles = [0i32; 2];

	let mut i = 0;
	while i < N {
		if idx >= buf.len() {
			reader.read(&mut buf);
			idx = 0;
		}
		nibbles[0] = (buf[idx] & 0x0F) as i32;
		nibbles[1] = (buf[idx] >> 4) as i32;
		idx += 1;

		for &t in &nibbles {
			if i >= N {
				break;
			}
			if eta == 2 {
				if t < 15 {
					let t = t - ((205 * t) >> 10) * 5;
					p.coeffs[i] = eta - t;
					i += 1;
				}
			} else if t < 9 {
				p.coeffs[i] = eta - t;
				i += 1;
			}
		}
	}
	p
}

/// Sample the sparse challenge polynomial with exactly `tau` coefficients
/// in {-1, 1} via the FIPS 204 in-place Fisher-Yates shuffle over
/// SHAKE-256(c̃).
pub fn sample_in_ball(c_tilde: &[u8], tau: usize) -> Poly {
	let mut reader = shake256_xof(&[c_tilde]);
	let mut signs_bytes = [0u8; 8];
	reader.read(&mut signs_bytes);
	let mut signs = u64::from_le_bytes(signs_bytes);

	let mut p = Poly::zero();
	let mut byte = [0u8; 1];
	for i in (N - tau)..N {
		let j = loop {
			reader.read(&mut byte);
			if byte[0] as usize <= i {
				break byte[0] as usize;
			}
		};
		p.coeffs[i] = p.coeffs[j];
		p.coeffs[j] = 1 - 2 * (signs & 1) as i32;
		signs >>= 1;
	}
	p
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn uniform_coefficients_in_range() {
		let rho = [7u8; 32];
		let p = rej_ntt_poly(&rho, 0);
		assert!(p.coeffs.iter().all(|&c| (0..Q).contains(&c)));
		// Different nonces give different polynomials.
		assert_ne!(p, rej_ntt_poly(&rho, 1));
	}

	#[test]
	fn matrix_shape() {
		let a = expand_matrix(&[1u8; 32], 6, 5);
		assert_eq!(a.len(), 6);
		assert!(a.iter().all(|row| row.len() == 5));
		assert_ne!(a[0].vec[0], a[0].vec[1]);
		assert_ne!(a[0].vec[0], a[1].vec[0]);
	}

	#[test]
	fn bounded_coefficients_within_eta() {
		let seed = [42u8; 64];
		for eta in [2, 4] {
			let p = rej_bounded_poly(&seed, 3, eta);
			assert!(p.coeffs.iter().all(|&c| c.abs() <= eta), "eta = {}", eta);
		}
	}

	#[test]
	fn bounded_sampling_is_deterministic() {
		let seed = [9u8; 64];
		assert_eq!(rej_bounded_poly(&seed, 5, 2), rej_bounded_poly(&seed, 5, 2));
		assert_ne!(rej_bounded_poly(&seed, 5, 2), rej_bounded_poly(&seed, 6, 2));
	}

	#[test]
	fn challenge_weight_is_tau() {
		for tau in [39usize, 49, 60] {
			let c = sample_in_ball(&[0xAB; 32], tau);
			let nonzero = c.coeffs.iter().filter(|&&x| x != 0).count();
			assert_eq!(nonzero, tau);
			assert!(c.coeffs.iter().all(|&x| x == 0 || x == 1 || x == -1));
		}
	}
}
