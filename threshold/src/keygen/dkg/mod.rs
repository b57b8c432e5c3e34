//! Distributed key generation without a trusted dealer.
//!
//! The protocol runs in four phases, driven per party by a typed state
//! machine: each transition consumes the current state, so phases cannot be
//! replayed or reordered.
//!
//! 1. **Commit**: each party broadcasts hash commitments to a matrix-seed
//!    contribution and to one entropy value per share subset it belongs to.
//! 2. **Reveal**: the matrix-seed contributions are opened publicly and
//!    aggregated into ρ; the per-subset entropy is opened privately to the
//!    subset's holders, who derive the subset's secret share from it. A
//!    mismatch against a phase 1 commitment aborts the run.
//! 3. **Mask pieces**: for each subset, one deterministic generator computes
//!    the subset's public contribution w = A·s1 + s2 and splits it into
//!    uniform additive pieces, one per party, keeping the residual.
//! 4. **Aggregate**: every party broadcasts the sum of pieces addressed to
//!    it; the sums combine into t, and with ρ that fixes the public key.
//!
//! No party ever sees a share of a subset it does not belong to, and the
//! pieces of phase 3 are individually uniform, so the transcript reveals
//! nothing beyond the public key.
//!
//! # Usage
//!
//! ```ignore
//! use permafrost_threshold::keygen::dkg;
//! use permafrost_threshold::{SessionId, ThresholdConfig};
//! use permafrost_mldsa::SecurityLevel;
//! use rand::rngs::OsRng;
//!
//! let config = ThresholdConfig::new(2, 3, SecurityLevel::MlDsa44)?;
//! let session = SessionId::from_bytes(agreed_session_bytes);
//!
//! let (state, commit) = dkg::start(&config, my_party_id, session, &mut OsRng)?;
//! // broadcast `commit`, collect the others' commits ...
//! let (state, reveal, openings) = state.receive_commitments(&other_commits)?;
//! // broadcast `reveal`, send each opening privately, collect ...
//! let (state, pieces) = state.receive_reveals(&mut OsRng, &other_reveals, &my_openings)?;
//! // send each piece privately, collect the pieces addressed to me ...
//! let (state, aggregate) = state.receive_pieces(&my_pieces)?;
//! // broadcast `aggregate`, collect the others' ...
//! let output = state.receive_aggregates(&other_aggregates)?;
//! ```

mod protocol;
mod types;

pub use protocol::{start, DkgAggregated, DkgCommitted, DkgMasked, DkgRevealed};
pub use types::{
	DkgOutput, Phase1Broadcast, Phase2Broadcast, Phase2Private, Phase3Message, Phase4Broadcast,
};

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::ThresholdConfig;
	use crate::error::ThresholdError;
	use crate::session::SessionId;
	use permafrost_mldsa::ntt::{inv_ntt, mat_vec_mul};
	use permafrost_mldsa::packing::pack_pk;
	use permafrost_mldsa::rounding::power2round;
	use permafrost_mldsa::sampling::expand_matrix;
	use permafrost_mldsa::shake::shake256;
	use permafrost_mldsa::{PolyVec, SecurityLevel};
	use rand::rngs::StdRng;
	use rand::SeedableRng;

	/// Drive a full DKG for every party in process and return the session
	/// together with the outputs.
	fn run_dkg(config: &ThresholdConfig, rng_seed: u64) -> (SessionId, Vec<DkgOutput>) {
		let n = config.total_parties() as usize;
		let mut rng = StdRng::seed_from_u64(rng_seed);
		let session = SessionId::random(&mut rng);

		let mut states1 = Vec::new();
		let mut commits = Vec::new();
		for id in 0..n as u8 {
			let (state, commit) = start(config, id, session, &mut rng).unwrap();
			states1.push(state);
			commits.push(commit);
		}

		let mut states2 = Vec::new();
		let mut reveals = Vec::new();
		let mut openings: Vec<Vec<Phase2Private>> = vec![Vec::new(); n];
		for (id, state) in states1.into_iter().enumerate() {
			let others: Vec<Phase1Broadcast> =
				commits.iter().filter(|c| c.party_id as usize != id).cloned().collect();
			let (state, reveal, private) = state.receive_commitments(&others).unwrap();
			states2.push(state);
			reveals.push(reveal);
			for (to, msg) in private {
				openings[to as usize].push(msg);
			}
		}

		let mut states3 = Vec::new();
		let mut pieces: Vec<Vec<Phase3Message>> = vec![Vec::new(); n];
		for (id, state) in states2.into_iter().enumerate() {
			let others: Vec<Phase2Broadcast> =
				reveals.iter().filter(|r| r.party_id as usize != id).cloned().collect();
			let (state, sent) =
				state.receive_reveals(&mut rng, &others, &openings[id]).unwrap();
			states3.push(state);
			for (to, msg) in sent {
				pieces[to as usize].push(msg);
			}
		}

		let mut states4 = Vec::new();
		let mut aggregates = Vec::new();
		for (id, state) in states3.into_iter().enumerate() {
			let (state, aggregate) = state.receive_pieces(&pieces[id]).unwrap();
			states4.push(state);
			aggregates.push(aggregate);
		}

		let outputs = states4
			.into_iter()
			.enumerate()
			.map(|(id, state)| {
				let others: Vec<Phase4Broadcast> = aggregates
					.iter()
					.filter(|a| a.party_id as usize != id)
					.cloned()
					.collect();
				state.receive_aggregates(&others).unwrap()
			})
			.collect();
		(session, outputs)
	}

	#[test]
	fn all_parties_agree_on_the_public_key() {
		let config = ThresholdConfig::new(2, 3, SecurityLevel::MlDsa44).unwrap();
		let (_, outputs) = run_dkg(&config, 11);
		let pk = outputs[0].public_key.as_bytes().to_vec();
		assert_eq!(pk.len(), config.param_set().public_key_size());
		for output in &outputs {
			assert_eq!(output.public_key.as_bytes(), &pk[..]);
		}
		for (id, output) in outputs.iter().enumerate() {
			assert_eq!(output.private_share.party_id(), id as u8);
			// Size-2 subsets of 3 parties containing this party: C(2, 1).
			assert_eq!(output.private_share.shares().len(), 2);
		}
	}

	#[test]
	fn different_runs_give_different_keys() {
		let config = ThresholdConfig::new(2, 2, SecurityLevel::MlDsa44).unwrap();
		let (_, a) = run_dkg(&config, 1);
		let (_, b) = run_dkg(&config, 2);
		assert_ne!(a[0].public_key.as_bytes(), b[0].public_key.as_bytes());
	}

	#[test]
	fn tampered_rho_reveal_is_rejected() {
		let config = ThresholdConfig::new(2, 2, SecurityLevel::MlDsa44).unwrap();
		let mut rng = StdRng::seed_from_u64(5);
		let session = SessionId::random(&mut rng);

		let (state0, commit0) = start(&config, 0, session, &mut rng).unwrap();
		let (state1, commit1) = start(&config, 1, session, &mut rng).unwrap();
		let (state0, _reveal0, _openings0) =
			state0.receive_commitments(&[commit1.clone()]).unwrap();
		let (_state1, mut reveal1, openings1) = state1.receive_commitments(&[commit0]).unwrap();

		reveal1.rho[0] ^= 1;
		let to_me: Vec<Phase2Private> =
			openings1.into_iter().map(|(_, msg)| msg).collect();
		let err = state0.receive_reveals(&mut rng, &[reveal1], &to_me).err().unwrap();
		assert!(matches!(err, ThresholdError::DkgCommitmentMismatch { party_id: 1 }));
	}

	#[test]
	fn missing_opening_is_reported() {
		let config = ThresholdConfig::new(2, 3, SecurityLevel::MlDsa44).unwrap();
		let mut rng = StdRng::seed_from_u64(9);
		let session = SessionId::random(&mut rng);

		let (state0, commit0) = start(&config, 0, session, &mut rng).unwrap();
		let (state1, commit1) = start(&config, 1, session, &mut rng).unwrap();
		let (state2, commit2) = start(&config, 2, session, &mut rng).unwrap();
		let (state0, _reveal0, _) =
			state0.receive_commitments(&[commit1.clone(), commit2.clone()]).unwrap();
		let (_state1, reveal1, _openings1) =
			state1.receive_commitments(&[commit0.clone(), commit2]).unwrap();
		let (_state2, reveal2, openings2) =
			state2.receive_commitments(&[commit0, commit1]).unwrap();

		// Party 0 gets party 2's opening for their shared subset, but party
		// 1 withholds its opening for subset {0, 1}.
		let from2: Vec<Phase2Private> = openings2
			.into_iter()
			.filter(|(to, _)| *to == 0)
			.map(|(_, msg)| msg)
			.collect();
		let err = state0.receive_reveals(&mut rng, &[reveal1, reveal2], &from2).err().unwrap();
		assert!(matches!(
			err,
			ThresholdError::DkgMissingContribution { party_id: 1, mask: 0b011 }
		));
	}

	#[test]
	fn duplicate_commitment_is_rejected() {
		let config = ThresholdConfig::new(2, 3, SecurityLevel::MlDsa44).unwrap();
		let mut rng = StdRng::seed_from_u64(3);
		let session = SessionId::random(&mut rng);

		let (state0, _commit0) = start(&config, 0, session, &mut rng).unwrap();
		let (_s1, commit1) = start(&config, 1, session, &mut rng).unwrap();
		let err = state0
			.receive_commitments(&[commit1.clone(), commit1])
			.err()
			.unwrap();
		assert!(matches!(err, ThresholdError::DuplicateBroadcast { party_id: 1 }));
	}

	#[test]
	fn signing_key_is_fresh_local_randomness() {
		let config = ThresholdConfig::new(2, 2, SecurityLevel::MlDsa44).unwrap();
		let (session, outputs) = run_dkg(&config, 41);
		let rho: [u8; 32] = outputs[0].public_key.as_bytes()[..32].try_into().unwrap();

		// The key seed must not be computable from the public transcript.
		for output in &outputs {
			let mut derived = [0u8; 32];
			shake256(
				&mut derived,
				&[b"DKG-KEY", &rho, session.as_bytes(), &[output.private_share.party_id()]],
			);
			assert_ne!(output.private_share.key(), &derived);
			assert_ne!(output.private_share.key(), &[0u8; 32]);
		}
		assert_ne!(outputs[0].private_share.key(), outputs[1].private_share.key());
	}

	#[test]
	fn aggregates_cancel_the_masks() {
		let config = ThresholdConfig::new(2, 3, SecurityLevel::MlDsa44).unwrap();
		let (_, outputs) = run_dkg(&config, 21);
		let ps = config.param_set();

		// Rebuild t from the recovered secrets and compare against the
		// public key the aggregates produced.
		let active = [0u8, 1];
		let mut s1_hat = PolyVec::zero(ps.l);
		let mut s2_hat = PolyVec::zero(ps.k);
		for &id in active.iter() {
			let (p1, p2) = crate::sharing::recover_share(
				outputs[id as usize].private_share.shares(),
				id,
				&active,
				&config,
			)
			.unwrap();
			s1_hat.add_assign_mod_q(&p1);
			s2_hat.add_assign_mod_q(&p2);
		}

		let rho: [u8; 32] = outputs[0].public_key.as_bytes()[..32].try_into().unwrap();
		let a = expand_matrix(&rho, ps.k, ps.l);
		let mut t = mat_vec_mul(&a, &s1_hat);
		for p in t.vec.iter_mut() {
			inv_ntt(p);
		}
		let mut s2 = s2_hat;
		for p in s2.vec.iter_mut() {
			inv_ntt(p);
		}
		t.add_assign(&s2);
		t.normalize();

		let mut t1 = PolyVec::zero(ps.k);
		for (dst, src) in t1.vec.iter_mut().zip(t.vec.iter()) {
			for (d, &s) in dst.coeffs.iter_mut().zip(src.coeffs.iter()) {
				let (_t0, high) = power2round(s);
				*d = high;
			}
		}
		let pk_bytes = pack_pk(&rho, &t1, ps);
		assert_eq!(&pk_bytes[..], outputs[0].public_key.as_bytes());
	}

	#[test]
	fn parties_hold_only_their_own_subsets() {
		let config = ThresholdConfig::new(2, 3, SecurityLevel::MlDsa44).unwrap();
		let (_, outputs) = run_dkg(&config, 31);
		for output in &outputs {
			let id = output.private_share.party_id();
			let expected = crate::sharing::subsets_for_party(id, &config);
			let held: Vec<u16> = output.private_share.shares().masks().collect();
			assert_eq!(held, expected);
		}
	}
}
