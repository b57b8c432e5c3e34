//! Core three-round signing operations and the public combine step.
//!
//! Round 1 commits to per-iteration masked nonces, round 2 aggregates the
//! revealed commitments and fixes the message hash, round 3 releases masked
//! response shares. `combine_signature` is public-data only: anyone holding
//! the round 2/3 transcript can assemble the standard ML-DSA signature.

use zeroize::Zeroize;

use permafrost_mldsa::ntt::{inv_ntt, mat_vec_mul, mul_hat, ntt};
use permafrost_mldsa::packing::{
	pack_polyvec_q, pack_signature, pack_w1, unpack_pk, unpack_polyvec_q,
};
use permafrost_mldsa::params::common::{D, MU_SIZE, Q, TR_SIZE};
use permafrost_mldsa::poly::reduce_le2q;
use permafrost_mldsa::rounding::decompose;
use permafrost_mldsa::sampling::{expand_matrix, sample_in_ball};
use permafrost_mldsa::shake::shake256;
use permafrost_mldsa::verify::compute_mu;
use permafrost_mldsa::{Poly, PolyVec};

use crate::broadcast::{Round2Broadcast, Round3Broadcast, Signature};
use crate::config::ThresholdConfig;
use crate::error::{validate_context, ThresholdError, ThresholdResult};
use crate::hyperball::FVec;
use crate::keys::{PrivateKeyShare, PublicKey};
use crate::session::SessionId;
use crate::sharing::{recover_share, validate_active_set};

/// Internal state after round 1 completes.
pub(crate) struct Round1Data {
	/// One masked commitment w per iteration, k polynomials in [0, q).
	pub(crate) w_commitments: Vec<PolyVec>,
	/// The hyperball masks, kept for reuse in round 3.
	pub(crate) hyperball_samples: Vec<FVec>,
	/// The commitment hash broadcast in round 1.
	pub(crate) commitment_hash: [u8; 32],
}

impl Zeroize for Round1Data {
	fn zeroize(&mut self) {
		for w in self.w_commitments.iter_mut() {
			w.zeroize();
		}
		self.w_commitments.clear();
		for s in self.hyperball_samples.iter_mut() {
			s.zeroize();
		}
		self.hyperball_samples.clear();
		self.commitment_hash.zeroize();
	}
}

/// Internal state after round 2 completes.
#[derive(Clone)]
pub(crate) struct Round2Data {
	/// Message hash μ.
	pub(crate) mu: [u8; MU_SIZE],
	/// Aggregated w values for all iterations.
	pub(crate) w_aggregated: Vec<PolyVec>,
	/// Active party bitmask.
	pub(crate) active_mask: u8,
}

impl Zeroize for Round2Data {
	fn zeroize(&mut self) {
		self.mu.zeroize();
		for w in self.w_aggregated.iter_mut() {
			w.zeroize();
		}
		self.w_aggregated.clear();
		self.active_mask = 0;
	}
}

/// Generate the round 1 commitment data.
///
/// Every iteration gets its own hyperball mask derived from `seed`, and the
/// commitment hash binds tr, the session id and the party id, so a
/// commitment cannot be replayed across sessions or attributed to another
/// signer.
pub(crate) fn generate_round1(
	private_key: &PrivateKeyShare,
	config: &ThresholdConfig,
	session: &SessionId,
	seed: &[u8; 32],
) -> ThresholdResult<Round1Data> {
	let ps = config.param_set();
	let tp = config.threshold_params();
	let iterations = config.k_iterations() as usize;

	let a = expand_matrix(private_key.rho(), ps.k, ps.l);

	let mut w_commitments = Vec::with_capacity(iterations);
	let mut hyperball_samples = Vec::with_capacity(iterations);
	for iter in 0..iterations {
		let mut iter_seed = *seed;
		iter_seed[0] ^= iter as u8;
		iter_seed[31] ^= (iter >> 8) as u8;
		let mut iter_rho_prime = [0u8; 64];
		shake256(&mut iter_rho_prime, &[&iter_seed, b"rho_prime", &[iter as u8]]);
		iter_seed.zeroize();

		let mut mask = FVec::new(ps.l, ps.k);
		mask.sample_hyperball(tp.r_prime, tp.nu, &iter_rho_prime, iter as u16);
		iter_rho_prime.zeroize();

		let (y, e) = mask.round();
		hyperball_samples.push(mask);

		let mut y_hat = y;
		for p in y_hat.vec.iter_mut() {
			ntt(p);
		}
		let mut w = mat_vec_mul(&a, &y_hat);
		for p in w.vec.iter_mut() {
			inv_ntt(p);
		}
		w.add_assign(&e);
		w.normalize();
		y_hat.zeroize();

		w_commitments.push(w);
	}

	let mut w_packed = Vec::with_capacity(iterations * ps.commitment_size());
	for w in w_commitments.iter() {
		w_packed.extend_from_slice(&pack_polyvec_q(w));
	}
	let mut commitment_hash = [0u8; 32];
	shake256(
		&mut commitment_hash,
		&[private_key.tr(), session.as_bytes(), &[private_key.party_id()], &w_packed],
	);

	Ok(Round1Data { w_commitments, hyperball_samples, commitment_hash })
}

/// Pack the round 1 commitments for the round 2 reveal broadcast.
pub(crate) fn pack_round1_commitment(round1: &Round1Data) -> Vec<u8> {
	let mut buf = Vec::new();
	for w in round1.w_commitments.iter() {
		buf.extend_from_slice(&pack_polyvec_q(w));
	}
	buf
}

/// Unpack one party's revealed commitments, strictly checking the length
/// and coefficient ranges.
pub(crate) fn unpack_commitments(
	data: &[u8],
	config: &ThresholdConfig,
) -> ThresholdResult<Vec<PolyVec>> {
	let ps = config.param_set();
	let iterations = config.k_iterations() as usize;
	let expected = iterations * ps.commitment_size();
	if data.len() != expected {
		return Err(ThresholdError::InvalidCommitmentSize { expected, actual: data.len() });
	}
	let mut out = Vec::with_capacity(iterations);
	for chunk in data.chunks_exact(ps.commitment_size()) {
		out.push(unpack_polyvec_q(chunk, ps.k)?);
	}
	Ok(out)
}

/// Recompute a peer's commitment hash from its revealed commitment bytes.
pub(crate) fn commitment_hash_for(
	tr: &[u8; TR_SIZE],
	session: &SessionId,
	party_id: u8,
	commitment_data: &[u8],
) -> [u8; 32] {
	let mut hash = [0u8; 32];
	shake256(&mut hash, &[tr, session.as_bytes(), &[party_id], commitment_data]);
	hash
}

/// Process round 2: aggregate the revealed commitments and fix μ.
///
/// `other_party_ids[i]` must be the sender of `other_commitments[i]`. The
/// active set is this party plus the senders and must have exactly t
/// members.
pub(crate) fn process_round2(
	private_key: &PrivateKeyShare,
	config: &ThresholdConfig,
	round1: &Round1Data,
	message: &[u8],
	context: &[u8],
	other_party_ids: &[u8],
	other_commitments: &[Vec<u8>],
) -> ThresholdResult<Round2Data> {
	validate_context(context)?;
	if other_party_ids.len() != other_commitments.len()
		|| other_party_ids.len() + 1 != config.threshold() as usize
	{
		return Err(ThresholdError::WrongActiveSetSize {
			provided: other_party_ids.len() + 1,
			required: config.threshold(),
		});
	}

	let mut active: Vec<u8> = other_party_ids.to_vec();
	active.push(private_key.party_id());
	active.sort_unstable();
	validate_active_set(&active, config)?;
	let active_mask = active.iter().fold(0u8, |acc, &p| acc | (1 << p));

	let mut w_aggregated = round1.w_commitments.clone();
	for commitment_data in other_commitments {
		let ws = unpack_commitments(commitment_data, config)?;
		for (acc, w) in w_aggregated.iter_mut().zip(ws.iter()) {
			acc.add_assign_mod_q(w);
		}
	}

	let mu = compute_mu(private_key.tr(), context, message)
		.ok_or(ThresholdError::ContextTooLong { length: context.len() })?;

	Ok(Round2Data { mu, w_aggregated, active_mask })
}

/// The per-iteration challenge c in the NTT domain, derived from μ and the
/// high bits of the aggregated commitment.
fn challenge_ntt(mu: &[u8; MU_SIZE], w1: &PolyVec, config: &ThresholdConfig) -> (Vec<u8>, Poly) {
	let ps = config.param_set();
	let mut c_tilde = vec![0u8; ps.c_tilde_size];
	shake256(&mut c_tilde, &[mu, &pack_w1(w1, ps)]);
	let mut c = sample_in_ball(&c_tilde, ps.tau);
	ntt(&mut c);
	(c_tilde, c)
}

fn decompose_polyvec(w: &PolyVec, gamma2: i32) -> (PolyVec, PolyVec) {
	let mut w0 = PolyVec::zero(w.len());
	let mut w1 = PolyVec::zero(w.len());
	for ((src, dst0), dst1) in w.vec.iter().zip(w0.vec.iter_mut()).zip(w1.vec.iter_mut()) {
		for ((s, d0), d1) in
			src.coeffs.iter().zip(dst0.coeffs.iter_mut()).zip(dst1.coeffs.iter_mut())
		{
			let (a0, a1) = decompose(*s, gamma2);
			*d0 = a0;
			*d1 = a1;
		}
	}
	(w0, w1)
}

/// Multiply `v_hat` componentwise by the challenge and return the result in
/// [0, q) in the coefficient domain.
fn challenge_times(v_hat: &PolyVec, c_hat: &Poly) -> PolyVec {
	let mut out = PolyVec::zero(v_hat.len());
	for (dst, src) in out.vec.iter_mut().zip(v_hat.vec.iter()) {
		mul_hat(dst, c_hat, src);
		inv_ntt(dst);
	}
	out.normalize();
	out
}

/// Generate the round 3 masked response shares.
///
/// Iterations whose masked response falls outside the rejection bound emit
/// the zero vector instead of being skipped, so every party broadcasts the
/// same wire size and a rejected iteration is detectable by the combiner.
pub(crate) fn generate_round3_response(
	private_key: &PrivateKeyShare,
	config: &ThresholdConfig,
	round1: &Round1Data,
	round2: &Round2Data,
) -> ThresholdResult<Vec<PolyVec>> {
	let ps = config.param_set();
	let tp = config.threshold_params();

	let active: Vec<u8> =
		(0..config.total_parties()).filter(|i| round2.active_mask & (1 << i) != 0).collect();
	let (s1_hat, s2_hat) =
		recover_share(private_key.shares(), private_key.party_id(), &active, config)?;

	let iterations = config.k_iterations() as usize;
	let mut responses = vec![PolyVec::zero(ps.l); iterations];
	for i in 0..iterations {
		let (_w0, w1) = decompose_polyvec(&round2.w_aggregated[i], ps.gamma2);
		let (_c_tilde, c_hat) = challenge_ntt(&round2.mu, &w1, config);

		let z = challenge_times(&s1_hat, &c_hat);
		let y = challenge_times(&s2_hat, &c_hat);

		let mut zf = FVec::from_polyvecs(&z, &y);
		zf.add(&round1.hyperball_samples[i]);

		// Rounding runs on every iteration, accepted or not, so the work
		// per iteration does not depend on the rejection outcome.
		let rejected = zf.exceeds(tp.r, tp.nu);
		let (mut z_out, mut y_out) = zf.round();
		z_out.normalize();
		y_out.zeroize();
		zf.zeroize();
		if rejected {
			// Rejected: the zero share stays in place.
			z_out.zeroize();
		} else {
			responses[i] = z_out;
		}
	}
	Ok(responses)
}

/// Pack round 3 responses for broadcast, full 23-bit coefficients.
pub(crate) fn pack_responses(responses: &[PolyVec]) -> Vec<u8> {
	let mut buf = Vec::new();
	for z in responses {
		buf.extend_from_slice(&pack_polyvec_q(z));
	}
	buf
}

/// Unpack one party's responses, strictly checking length and ranges.
pub(crate) fn unpack_responses(
	data: &[u8],
	config: &ThresholdConfig,
) -> ThresholdResult<Vec<PolyVec>> {
	let ps = config.param_set();
	let iterations = config.k_iterations() as usize;
	let expected = iterations * ps.response_size();
	if data.len() != expected {
		return Err(ThresholdError::InvalidResponseSize { expected, actual: data.len() });
	}
	let mut out = Vec::with_capacity(iterations);
	for chunk in data.chunks_exact(ps.response_size()) {
		out.push(unpack_polyvec_q(chunk, ps.l)?);
	}
	Ok(out)
}

/// Hint bit from the normalized low part z0 = (w0 + f) mod q in [0, q).
fn hint_from_normalized(z0: i32, r1: i32, gamma2: i32) -> i32 {
	if z0 <= gamma2 || z0 > Q - gamma2 || (z0 == Q - gamma2 && r1 == 0) {
		0
	} else {
		1
	}
}

/// Combine the aggregated transcript into a standard ML-DSA signature.
///
/// Pure public-data computation: needs only the public key, the message,
/// the aggregated commitments and every active party's responses. Tries the
/// iterations in order and returns the first that passes all checks;
/// otherwise the whole attempt failed and signing restarts from round 1.
pub(crate) fn combine_signature(
	public_key: &PublicKey,
	config: &ThresholdConfig,
	message: &[u8],
	context: &[u8],
	w_aggregated: &[PolyVec],
	all_responses: &[Vec<PolyVec>],
) -> ThresholdResult<Vec<u8>> {
	validate_context(context)?;
	let ps = config.param_set();
	let iterations = config.k_iterations() as usize;

	// Aggregate the responses per iteration.
	let mut z_aggregated = vec![PolyVec::zero(ps.l); iterations];
	for party_responses in all_responses {
		if party_responses.len() != iterations {
			return Err(ThresholdError::InvalidResponseSize {
				expected: iterations,
				actual: party_responses.len(),
			});
		}
		for (acc, z) in z_aggregated.iter_mut().zip(party_responses.iter()) {
			acc.add_assign_mod_q(z);
		}
	}

	let mu = compute_mu(public_key.tr(), context, message)
		.ok_or(ThresholdError::ContextTooLong { length: context.len() })?;
	let (rho, t1) = unpack_pk(public_key.as_bytes(), ps)?;
	let a = expand_matrix(&rho, ps.k, ps.l);

	for i in 0..iterations.min(w_aggregated.len()) {
		let (w0, w1) = decompose_polyvec(&w_aggregated[i], ps.gamma2);

		if z_aggregated[i].norm_exceeds(ps.gamma1() - ps.beta()) {
			continue;
		}

		let mut z_hat = z_aggregated[i].clone();
		for p in z_hat.vec.iter_mut() {
			p.center();
			ntt(p);
		}
		let az = mat_vec_mul(&a, &z_hat);

		let (c_tilde, c_hat) = challenge_ntt(&mu, &w1, config);

		// Az - c*t1*2^d, then back to the coefficient domain.
		let mut az2dct1 = PolyVec::zero(ps.k);
		let mut ct1 = Poly::zero();
		for j in 0..ps.k {
			let mut t1_shifted = t1.vec[j];
			for coeff in t1_shifted.coeffs.iter_mut() {
				*coeff <<= D;
			}
			ntt(&mut t1_shifted);
			mul_hat(&mut ct1, &c_hat, &t1_shifted);

			let dst = &mut az2dct1.vec[j];
			for (d, (&az_c, &ct_c)) in
				dst.coeffs.iter_mut().zip(az.vec[j].coeffs.iter().zip(ct1.coeffs.iter()))
			{
				let diff = (az_c + 2 * Q - ct_c) as u32;
				*d = reduce_le2q(diff) as i32;
			}
			inv_ntt(dst);
		}
		az2dct1.normalize();

		// f = (Az - c*t1*2^d) - w, must stay below gamma2.
		let mut f = az2dct1;
		f.sub_assign(&w_aggregated[i]);
		f.normalize();
		if f.norm_exceeds(ps.gamma2) {
			continue;
		}

		// Hints recover w1 from the public quantities.
		let mut hint = PolyVec::zero(ps.k);
		let mut hint_pop = 0usize;
		for j in 0..ps.k {
			for idx in 0..256 {
				let z0 = permafrost_mldsa::poly::mod_q_i32(
					w0.vec[j].coeffs[idx] + f.vec[j].coeffs[idx],
				);
				let h = hint_from_normalized(z0, w1.vec[j].coeffs[idx], ps.gamma2);
				hint.vec[j].coeffs[idx] = h;
				hint_pop += h as usize;
			}
		}
		if hint_pop > ps.omega {
			continue;
		}

		let mut z_centered = z_aggregated[i].clone();
		for p in z_centered.vec.iter_mut() {
			p.center();
		}
		return Ok(pack_signature(&c_tilde, &z_centered, &hint, ps));
	}

	Err(ThresholdError::CombinationFailed)
}

/// Combine a full broadcast transcript into the final signature.
///
/// Needs no private state: any observer holding every active party's round 2
/// and round 3 broadcasts can assemble the signature. `round2` fixes the
/// active set and must hold exactly one broadcast per active party, with a
/// matching response in `round3`. Returns
/// [`ThresholdError::CombinationFailed`] when no iteration passes the public
/// checks; the signing parties then restart from round 1.
pub fn combine(
	public_key: &PublicKey,
	config: &ThresholdConfig,
	message: &[u8],
	context: &[u8],
	round2: &[Round2Broadcast],
	round3: &[Round3Broadcast],
) -> ThresholdResult<Signature> {
	if public_key.level() != config.level() {
		return Err(ThresholdError::InvalidParameters {
			threshold: config.threshold(),
			parties: config.total_parties(),
			reason: "public key security level does not match the configuration",
		});
	}

	let mut active: Vec<u8> = Vec::with_capacity(round2.len());
	for r2 in round2 {
		if active.contains(&r2.party_id) {
			return Err(ThresholdError::DuplicateBroadcast { party_id: r2.party_id });
		}
		active.push(r2.party_id);
	}
	active.sort_unstable();
	validate_active_set(&active, config)?;

	let ps = config.param_set();
	let iterations = config.k_iterations() as usize;
	let mut w_aggregated = vec![PolyVec::zero(ps.k); iterations];
	for r2 in round2 {
		let ws = unpack_commitments(&r2.commitment_data, config)?;
		for (acc, w) in w_aggregated.iter_mut().zip(ws.iter()) {
			acc.add_assign_mod_q(w);
		}
	}

	let mut all_responses = Vec::with_capacity(active.len());
	for &party_id in active.iter() {
		let mut found = None;
		for r3 in round3.iter().filter(|r3| r3.party_id == party_id) {
			if found.is_some() {
				return Err(ThresholdError::DuplicateBroadcast { party_id });
			}
			found = Some(r3);
		}
		let r3 = found.ok_or(ThresholdError::MissingBroadcast { party_id })?;
		all_responses.push(unpack_responses(&r3.response, config)?);
	}

	let bytes =
		combine_signature(public_key, config, message, context, &w_aggregated, &all_responses)?;
	Ok(Signature::from_vec(bytes))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::keygen::generate_with_dealer;
	use permafrost_mldsa::SecurityLevel;

	fn setup() -> (ThresholdConfig, PublicKey, Vec<PrivateKeyShare>) {
		let config = ThresholdConfig::new(2, 3, SecurityLevel::MlDsa44).unwrap();
		let (pk, shares) = generate_with_dealer(&[5u8; 32], &config).unwrap();
		(config, pk, shares)
	}

	#[test]
	fn round1_is_deterministic_in_the_seed() {
		let (config, _pk, shares) = setup();
		let session = SessionId::from_bytes([1u8; 32]);
		let a = generate_round1(&shares[0], &config, &session, &[9u8; 32]).unwrap();
		let b = generate_round1(&shares[0], &config, &session, &[9u8; 32]).unwrap();
		assert_eq!(a.commitment_hash, b.commitment_hash);
		assert_eq!(a.w_commitments, b.w_commitments);

		let c = generate_round1(&shares[0], &config, &session, &[10u8; 32]).unwrap();
		assert_ne!(a.commitment_hash, c.commitment_hash);
	}

	#[test]
	fn commitment_hash_binds_session_and_party() {
		let (config, _pk, shares) = setup();
		let s1 = SessionId::from_bytes([1u8; 32]);
		let s2 = SessionId::from_bytes([2u8; 32]);
		let r1 = generate_round1(&shares[0], &config, &s1, &[9u8; 32]).unwrap();
		let r2 = generate_round1(&shares[0], &config, &s2, &[9u8; 32]).unwrap();
		assert_ne!(r1.commitment_hash, r2.commitment_hash);

		let data = pack_round1_commitment(&r1);
		let recomputed = commitment_hash_for(shares[0].tr(), &s1, 0, &data);
		assert_eq!(recomputed, r1.commitment_hash);
		assert_ne!(commitment_hash_for(shares[0].tr(), &s1, 1, &data), r1.commitment_hash);
	}

	#[test]
	fn commitment_pack_roundtrip() {
		let (config, _pk, shares) = setup();
		let session = SessionId::from_bytes([3u8; 32]);
		let r1 = generate_round1(&shares[1], &config, &session, &[4u8; 32]).unwrap();
		let packed = pack_round1_commitment(&r1);
		assert_eq!(packed.len(), config.commitment_wire_size());
		let ws = unpack_commitments(&packed, &config).unwrap();
		assert_eq!(ws, r1.w_commitments);

		assert!(matches!(
			unpack_commitments(&packed[1..], &config),
			Err(ThresholdError::InvalidCommitmentSize { .. })
		));
	}

	#[test]
	fn round2_rejects_wrong_active_set_size() {
		let (config, _pk, shares) = setup();
		let session = SessionId::from_bytes([8u8; 32]);
		let r1 = generate_round1(&shares[0], &config, &session, &[1u8; 32]).unwrap();
		let err = process_round2(&shares[0], &config, &r1, b"m", b"", &[], &[]).err().unwrap();
		assert!(matches!(err, ThresholdError::WrongActiveSetSize { provided: 1, required: 2 }));
	}

	#[test]
	fn round3_emits_one_full_response_per_iteration() {
		let (config, _pk, shares) = setup();
		let session = SessionId::from_bytes([6u8; 32]);
		let r1a = generate_round1(&shares[0], &config, &session, &[2u8; 32]).unwrap();
		let r1b = generate_round1(&shares[1], &config, &session, &[3u8; 32]).unwrap();
		let r2 = process_round2(
			&shares[0],
			&config,
			&r1a,
			b"m",
			b"",
			&[1],
			&[pack_round1_commitment(&r1b)],
		)
		.unwrap();

		// Rejected iterations go through the same rounding step and leave a
		// zero share; accepted ones carry reduced coefficients. Either way
		// the response has the full fixed shape.
		let responses = generate_round3_response(&shares[0], &config, &r1a, &r2).unwrap();
		assert_eq!(responses.len(), config.k_iterations() as usize);
		for z in &responses {
			assert_eq!(z.len(), config.param_set().l);
			assert!(z.vec.iter().all(|p| p.coeffs.iter().all(|&c| c >= 0 && c < Q)));
		}
	}

	#[test]
	fn response_pack_roundtrip_strictness() {
		let (config, _pk, _shares) = setup();
		let ps = config.param_set();
		let iterations = config.k_iterations() as usize;
		let responses = vec![PolyVec::zero(ps.l); iterations];
		let packed = pack_responses(&responses);
		assert_eq!(packed.len(), config.response_wire_size());
		let back = unpack_responses(&packed, &config).unwrap();
		assert_eq!(back, responses);

		assert!(matches!(
			unpack_responses(&packed[..packed.len() - 1], &config),
			Err(ThresholdError::InvalidResponseSize { .. })
		));
	}

	#[test]
	fn normalized_hint_matches_centered_hint() {
		use permafrost_mldsa::rounding::make_hint;
		let gamma2 = SecurityLevel::MlDsa44.params().gamma2;
		// Compare the two hint formulations over a stepped range of low
		// parts and both w1 cases.
		for f in (-gamma2 - 50..=gamma2 + 50).step_by(37) {
			for r1 in [0, 1] {
				let z0 = permafrost_mldsa::poly::mod_q_i32(f);
				let expected = make_hint(f, r1, gamma2);
				assert_eq!(
					hint_from_normalized(z0, r1, gamma2),
					expected,
					"f = {} r1 = {}",
					f,
					r1
				);
			}
		}
	}
}
