//! Trusted dealer key generation.
//!
//! A dealer derives the full key material deterministically from a single
//! seed and hands each party its share table. The dealer must be trusted
//! not to retain the shares or the seed after distribution.

use sha3::digest::XofReader;

use permafrost_mldsa::ntt::{inv_ntt, mat_vec_mul, ntt};
use permafrost_mldsa::packing::pack_pk;
use permafrost_mldsa::params::common::SEED_SIZE;
use permafrost_mldsa::rounding::power2round;
use permafrost_mldsa::sampling::{expand_matrix, rej_bounded_poly};
use permafrost_mldsa::shake::shake256_xof;
use permafrost_mldsa::verify::compute_tr;
use permafrost_mldsa::PolyVec;

use crate::config::ThresholdConfig;
use crate::error::ThresholdResult;
use crate::keys::{PrivateKeyShare, PublicKey, SecretShareData};
use crate::share_table::ShareTable;
use crate::sharing::{all_subsets, share_subset_size};

/// Generate threshold keys using a trusted dealer.
///
/// Derives a public key and one private key share per party from a single
/// seed. Generation is fully deterministic: the same seed and configuration
/// always produce the same key material.
///
/// The caller has access to all shares and must be trusted to:
///
/// 1. Use a cryptographically secure random seed
/// 2. Securely distribute each share to its respective party
/// 3. Delete all shares and the seed after distribution
///
/// Returns `(public_key, shares)` where `shares[i]` belongs to party `i`.
pub fn generate_with_dealer(
	seed: &[u8; SEED_SIZE],
	config: &ThresholdConfig,
) -> ThresholdResult<(PublicKey, Vec<PrivateKeyShare>)> {
	let ps = config.param_set();
	let parties = config.total_parties();

	// One deterministic SHAKE-256 stream drives all key material: first
	// rho, then the per-party key seeds, then one 64-byte seed per share
	// subset in ascending mask order.
	let mut stream = shake256_xof(&[seed, &[ps.k as u8, ps.l as u8]]);

	let mut rho = [0u8; SEED_SIZE];
	stream.read(&mut rho);

	let mut party_keys = Vec::with_capacity(parties as usize);
	for _ in 0..parties {
		let mut key = [0u8; 32];
		stream.read(&mut key);
		party_keys.push(key);
	}

	let mut s1_total = PolyVec::zero(ps.l);
	let mut s2_total = PolyVec::zero(ps.k);
	let mut subset_shares: Vec<(u16, SecretShareData)> = Vec::new();

	for mask in all_subsets(parties, share_subset_size(config)) {
		let mut share_seed = [0u8; 64];
		stream.read(&mut share_seed);

		let s1 = PolyVec {
			vec: (0..ps.l).map(|j| rej_bounded_poly(&share_seed, j as u16, ps.eta)).collect(),
		};
		let s2 = PolyVec {
			vec: (0..ps.k)
				.map(|j| rej_bounded_poly(&share_seed, (ps.l + j) as u16, ps.eta))
				.collect(),
		};

		s1_total.add_assign(&s1);
		s2_total.add_assign(&s2);
		subset_shares.push((mask, SecretShareData::new(s1, s2)));
	}

	s1_total.normalize();
	s2_total.normalize();

	// t = A*s1 + s2
	let a = expand_matrix(&rho, ps.k, ps.l);
	let mut s1_hat = s1_total;
	for p in s1_hat.vec.iter_mut() {
		ntt(p);
	}
	let mut t = mat_vec_mul(&a, &s1_hat);
	for p in t.vec.iter_mut() {
		inv_ntt(p);
	}
	t.add_assign(&s2_total);
	t.normalize();

	let mut t1 = PolyVec::zero(ps.k);
	for (dst, src) in t1.vec.iter_mut().zip(t.vec.iter()) {
		for (d, &s) in dst.coeffs.iter_mut().zip(src.coeffs.iter()) {
			let (_t0, high) = power2round(s);
			*d = high;
		}
	}

	let pk_bytes = pack_pk(&rho, &t1, ps);
	let tr = compute_tr(&pk_bytes);
	let public_key = PublicKey::new(config.level(), pk_bytes, tr);

	let mut private_keys = Vec::with_capacity(parties as usize);
	for party_id in 0..parties {
		let mut table = ShareTable::new();
		for (mask, share) in subset_shares.iter() {
			if mask & (1 << party_id) != 0 {
				table.insert(*mask, share.clone());
			}
		}
		private_keys.push(PrivateKeyShare::new(
			party_id,
			parties,
			config.threshold(),
			config.level(),
			party_keys[party_id as usize],
			rho,
			tr,
			table,
		));
	}

	Ok((public_key, private_keys))
}
