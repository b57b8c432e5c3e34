//! Additive secret sharing over signer subsets.
//!
//! The secret key is split into one additive share per subset of n - t + 1
//! parties; a party holds the shares of every subset it belongs to. Share
//! recovery for a signing set uses hardcoded per-(t, n) combination patterns
//! instead of Lagrange interpolation, which avoids the coefficient explosion
//! that general interpolation over R_q would cause.

use permafrost_mldsa::params::common::Q;
use permafrost_mldsa::PolyVec;

use crate::config::ThresholdConfig;
use crate::error::{ThresholdError, ThresholdResult};
use crate::keys::SecretShareData;
use crate::share_table::ShareTable;

/// All subsets of `{0, .., n-1}` with exactly `size` members, as bitmasks in
/// ascending order.
///
/// Uses Gosper's hack to step through same-popcount masks.
pub(crate) fn all_subsets(n: u8, size: u8) -> Vec<u16> {
	if size == 0 || size > n {
		return Vec::new();
	}
	let limit = 1u32 << n;
	let mut masks = Vec::new();
	let mut v = (1u32 << size) - 1;
	while v < limit {
		masks.push(v as u16);
		let c = v & v.wrapping_neg();
		let r = v + c;
		v = (((r ^ v) >> 2) / c) | r;
	}
	masks
}

/// The share-subset size for a (t, n) group.
pub(crate) fn share_subset_size(config: &ThresholdConfig) -> u8 {
	config.total_parties() - config.threshold() + 1
}

/// The subsets whose shares `party_id` holds, in ascending mask order.
pub(crate) fn subsets_for_party(party_id: u8, config: &ThresholdConfig) -> Vec<u16> {
	let bit = 1u16 << party_id;
	all_subsets(config.total_parties(), share_subset_size(config))
		.into_iter()
		.filter(|mask| mask & bit != 0)
		.collect()
}

/// Hardcoded share-combination patterns for each supported (t, n) shape.
///
/// Row i lists the canonical subset masks the i-th active signer sums so
/// that the t active parties jointly reconstruct the full secret with every
/// share counted exactly once. Masks are written for the canonical active
/// set {0, .., t-1}; `recover_share` permutes them onto the real one.
pub(crate) fn sharing_patterns(t: u8, n: u8) -> ThresholdResult<&'static [&'static [u16]]> {
	let patterns: &'static [&'static [u16]] = match (t, n) {
		(2, 2) => &[&[3]],
		(2, 3) => &[&[3, 5], &[6]],
		(2, 4) => &[&[11, 13], &[7, 14]],
		(3, 3) => &[&[7]],
		(3, 4) => &[&[3, 9], &[6, 10], &[12, 5]],
		(2, 5) => &[&[27, 29, 23], &[30, 15]],
		(3, 5) => &[&[25, 11, 19, 13], &[7, 14, 22, 26], &[28, 21]],
		(4, 4) => &[&[15]],
		(4, 5) => &[&[3, 9, 17], &[6, 10, 18], &[12, 5, 20], &[24]],
		(5, 5) => &[&[31]],
		(2, 6) => &[&[61, 47, 55], &[62, 31, 59]],
		(3, 6) => &[
			&[27, 23, 43, 57, 39],
			&[51, 58, 46, 30, 54],
			&[45, 53, 29, 15, 60],
		],
		(4, 6) => &[
			&[19, 13, 35, 7, 49],
			&[42, 26, 38, 50, 22],
			&[52, 21, 44, 28, 37],
			&[25, 11, 14, 56, 41],
		],
		(5, 6) => &[
			&[3, 5, 33],
			&[6, 10, 34],
			&[12, 20, 36],
			&[9, 24, 40],
			&[48, 17, 18],
		],
		(6, 6) => &[&[63]],
		_ => {
			return Err(ThresholdError::InvalidParameters {
				threshold: t,
				parties: n,
				reason: "no sharing pattern for this shape",
			})
		},
	};
	Ok(patterns)
}

/// Check that `active` is a valid signing set: exactly t distinct in-range
/// party ids in strictly ascending order.
pub(crate) fn validate_active_set(active: &[u8], config: &ThresholdConfig) -> ThresholdResult<()> {
	if active.len() != config.threshold() as usize {
		return Err(ThresholdError::WrongActiveSetSize {
			provided: active.len(),
			required: config.threshold(),
		});
	}
	for (i, &p) in active.iter().enumerate() {
		if p >= config.total_parties() {
			return Err(ThresholdError::InvalidPartyId {
				party_id: p,
				max_id: config.total_parties() - 1,
			});
		}
		if i > 0 && active[i - 1] >= p {
			return Err(ThresholdError::InvalidParameters {
				threshold: config.threshold(),
				parties: config.total_parties(),
				reason: "active set must be strictly ascending without duplicates",
			});
		}
	}
	Ok(())
}

fn accumulate(dst: &mut PolyVec, src: &PolyVec) {
	for (d, s) in dst.vec.iter_mut().zip(src.vec.iter()) {
		for (dc, &sc) in d.coeffs.iter_mut().zip(s.coeffs.iter()) {
			// Inputs are reduced below q, a handful of additions cannot
			// overflow i32.
			*dc = dc.wrapping_add(sc);
		}
	}
}

fn reduce_polyvec(pv: &mut PolyVec) {
	for p in pv.vec.iter_mut() {
		for c in p.coeffs.iter_mut() {
			*c = (*c as i64).rem_euclid(Q as i64) as i32;
		}
	}
}

/// Recover this party's additive contribution to the full secret for one
/// signing set.
///
/// Returns (s1, s2) in the NTT domain with coefficients in [0, q). The t
/// recovered contributions across the active set sum to the dealer's full
/// (s1, s2), with every canonical share counted exactly once.
pub(crate) fn recover_share(
	shares: &ShareTable<SecretShareData>,
	party_id: u8,
	active: &[u8],
	config: &ThresholdConfig,
) -> ThresholdResult<(PolyVec, PolyVec)> {
	validate_active_set(active, config)?;
	let position = active
		.iter()
		.position(|&p| p == party_id)
		.ok_or(ThresholdError::InvalidPartyId { party_id, max_id: config.total_parties() - 1 })?;

	// With t = n there is a single share per party, held under the
	// full-group mask. Use it directly.
	if config.threshold() == config.total_parties() {
		let mask = active.iter().fold(0u16, |acc, &p| acc | (1 << p));
		let share = shares
			.get(mask)
			.ok_or(ThresholdError::DkgMissingContribution { party_id, mask })?;
		return Ok((share.s1_hat.clone(), share.s2_hat.clone()));
	}

	let patterns = sharing_patterns(config.threshold(), config.total_parties())?;

	// Permutation mapping the canonical active set {0, .., t-1} onto the
	// real one: active parties first in order, then the inactive ones.
	let n = config.total_parties();
	let t = config.threshold() as usize;
	let mut perm = vec![0u8; n as usize];
	let mut i1 = 0;
	let mut i2 = t;
	for j in 0..n {
		if active.contains(&j) {
			perm[i1] = j;
			i1 += 1;
		} else {
			perm[i2] = j;
			i2 += 1;
		}
	}

	let ps = config.param_set();
	let mut s1 = PolyVec::zero(ps.l);
	let mut s2 = PolyVec::zero(ps.k);
	for &pattern_mask in patterns[position] {
		let mut mask = 0u16;
		for i in 0..n {
			if pattern_mask & (1 << i) != 0 {
				mask |= 1 << perm[i as usize];
			}
		}
		let share = shares
			.get(mask)
			.ok_or(ThresholdError::DkgMissingContribution { party_id, mask })?;
		accumulate(&mut s1, &share.s1_hat);
		accumulate(&mut s2, &share.s2_hat);
	}
	reduce_polyvec(&mut s1);
	reduce_polyvec(&mut s2);
	Ok((s1, s2))
}

#[cfg(test)]
mod tests {
	use super::*;
	use permafrost_mldsa::SecurityLevel;

	fn config(t: u8, n: u8) -> ThresholdConfig {
		ThresholdConfig::new(t, n, SecurityLevel::MlDsa87).unwrap()
	}

	#[test]
	fn gosper_enumeration_is_ascending_and_complete() {
		let masks = all_subsets(5, 3);
		assert_eq!(masks.len(), 10);
		assert!(masks.windows(2).all(|w| w[0] < w[1]));
		assert!(masks.iter().all(|m| m.count_ones() == 3));
		assert_eq!(masks[0], 0b00111);
		assert_eq!(*masks.last().unwrap(), 0b11100);
	}

	#[test]
	fn party_subsets_contain_the_party() {
		let cfg = config(3, 5);
		for party in 0..5u8 {
			let subsets = subsets_for_party(party, &cfg);
			// C(4, 2) subsets of size 3 containing a fixed element.
			assert_eq!(subsets.len(), 6);
			assert!(subsets.iter().all(|m| m & (1 << party) != 0));
		}
	}

	#[test]
	fn patterns_cover_every_shape() {
		for n in 2..=6u8 {
			for t in 2..=n {
				let patterns = sharing_patterns(t, n).unwrap();
				assert_eq!(patterns.len(), if t == n { 1 } else { t as usize });
			}
		}
		assert!(sharing_patterns(1, 3).is_err());
	}

	#[test]
	fn patterns_partition_all_subsets() {
		// For the canonical active set, each pattern row must use distinct
		// masks and together cover every share subset exactly once.
		for n in 2..=6u8 {
			for t in 2..=n {
				if t == n {
					continue;
				}
				let patterns = sharing_patterns(t, n).unwrap();
				let mut seen: Vec<u16> = patterns.iter().flat_map(|row| row.iter().copied()).collect();
				seen.sort_unstable();
				let mut expected = all_subsets(n, n - t + 1);
				expected.sort_unstable();
				assert_eq!(seen, expected, "t={} n={}", t, n);
			}
		}
	}

	#[test]
	fn active_set_validation() {
		let cfg = config(3, 5);
		assert!(validate_active_set(&[0, 2, 4], &cfg).is_ok());
		assert!(matches!(
			validate_active_set(&[0, 2], &cfg),
			Err(ThresholdError::WrongActiveSetSize { provided: 2, required: 3 })
		));
		assert!(validate_active_set(&[0, 2, 2], &cfg).is_err());
		assert!(validate_active_set(&[2, 0, 4], &cfg).is_err());
		assert!(matches!(
			validate_active_set(&[0, 2, 5], &cfg),
			Err(ThresholdError::InvalidPartyId { party_id: 5, .. })
		));
	}

	#[test]
	fn recovery_is_deterministic_and_sums_to_the_full_secret() {
		let cfg = ThresholdConfig::new(2, 3, SecurityLevel::MlDsa44).unwrap();
		let (_, shares) = crate::keygen::generate_with_dealer(&[21u8; 32], &cfg).unwrap();

		let (a1, _) = recover_share(shares[0].shares(), 0, &[0, 1], &cfg).unwrap();
		let (b1, _) = recover_share(shares[0].shares(), 0, &[0, 1], &cfg).unwrap();
		assert_eq!(a1, b1);

		// Every active set reconstructs the same full secret.
		let sum = |active: &[u8]| {
			let mut s1 = PolyVec::zero(cfg.param_set().l);
			for &id in active {
				let (part, _) =
					recover_share(shares[id as usize].shares(), id, active, &cfg).unwrap();
				s1.add_assign_mod_q(&part);
			}
			s1
		};
		assert_eq!(sum(&[0, 1]), sum(&[1, 2]));
		assert_eq!(sum(&[0, 1]), sum(&[0, 2]));
	}

	#[test]
	fn recovery_fails_for_inactive_party() {
		let cfg = config(2, 3);
		let table = ShareTable::new();
		assert!(recover_share(&table, 2, &[0, 1], &cfg).is_err());
	}
}
