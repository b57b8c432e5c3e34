//! The four-phase distributed key generation state machine.
//!
//! Each party drives one [`start`] call and four typed transitions. The
//! type system enforces phase order: every transition consumes the previous
//! state and returns the next one together with the messages to send.
//!
//! Phase 1 commits to per-party randomness, phase 2 opens the commitments
//! (matrix seed publicly, per-subset entropy only to the subset's holders),
//! phase 3 distributes uniform additive pieces of each masked subset
//! commitment, and phase 4 aggregates the pieces into the public key.
//! Any commitment mismatch aborts the run; restart with a fresh session id.

use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

use permafrost_mldsa::ntt::{inv_ntt, mat_vec_mul};
use permafrost_mldsa::packing::pack_pk;
use permafrost_mldsa::params::common::{Q, SEED_SIZE};
use permafrost_mldsa::rounding::power2round;
use permafrost_mldsa::sampling::{expand_matrix, rej_bounded_poly};
use permafrost_mldsa::shake::shake256;
use permafrost_mldsa::verify::compute_tr;
use permafrost_mldsa::PolyVec;

use crate::config::ThresholdConfig;
use crate::error::{ThresholdError, ThresholdResult};
use crate::keys::{PrivateKeyShare, PublicKey, SecretShareData};
use crate::session::SessionId;
use crate::share_table::ShareTable;
use crate::sharing::{all_subsets, share_subset_size, subsets_for_party};

use super::types::{
	DkgOutput, Phase1Broadcast, Phase2Broadcast, Phase2Private, Phase3Message, Phase4Broadcast,
};

fn commit_rho(session: &SessionId, party_id: u8, rho: &[u8; 32]) -> [u8; 32] {
	let mut out = [0u8; 32];
	shake256(&mut out, &[b"DKG-RHO-COMMIT", session.as_bytes(), &[party_id], rho]);
	out
}

fn commit_entropy(session: &SessionId, mask: u16, party_id: u8, entropy: &[u8; 32]) -> [u8; 32] {
	let mut out = [0u8; 32];
	shake256(
		&mut out,
		&[b"DKG-BSEED-COMMIT", session.as_bytes(), &mask.to_le_bytes(), &[party_id], entropy],
	);
	out
}

fn ct_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
	a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Deterministic generator assignment: for each subset mask in ascending
/// order, pick the least-loaded holder, breaking ties with a hash of the
/// aggregated matrix seed so every party agrees.
fn assign_generators(config: &ThresholdConfig, rho: &[u8; 32]) -> Vec<(u16, u8)> {
	let n = config.total_parties();
	let mut loads = vec![0u32; n as usize];
	let mut out = Vec::new();
	for mask in all_subsets(n, share_subset_size(config)) {
		let holders: Vec<u8> = (0..n).filter(|i| mask & (1 << i) != 0).collect();
		let min_load = holders.iter().map(|&h| loads[h as usize]).min().unwrap_or(0);
		let tied: Vec<u8> =
			holders.into_iter().filter(|&h| loads[h as usize] == min_load).collect();
		let pick = if tied.len() == 1 {
			tied[0]
		} else {
			let mut buf = [0u8; 8];
			shake256(&mut buf, &[b"DKG-GEN", rho, &mask.to_le_bytes()]);
			tied[(u64::from_le_bytes(buf) % tied.len() as u64) as usize]
		};
		loads[pick as usize] += 1;
		out.push((mask, pick));
	}
	out
}

/// Sample a uniform polynomial vector mod q by rejection on 23-bit
/// candidates from the caller's rng.
fn random_polyvec_mod_q<R: RngCore + CryptoRng>(rng: &mut R, len: usize) -> PolyVec {
	let mut pv = PolyVec::zero(len);
	for p in pv.vec.iter_mut() {
		for c in p.coeffs.iter_mut() {
			*c = loop {
				let candidate = rng.next_u32() & 0x7F_FFFF;
				if candidate < Q as u32 {
					break candidate as i32;
				}
			};
		}
	}
	pv
}

fn check_polyvec_mod_q(pv: &PolyVec, len: usize) -> ThresholdResult<()> {
	if pv.len() != len {
		return Err(ThresholdError::Codec(permafrost_mldsa::CodecError::InvalidLength {
			expected: len,
			actual: pv.len(),
		}));
	}
	for p in pv.vec.iter() {
		if p.coeffs.iter().any(|&c| c < 0 || c >= Q) {
			return Err(ThresholdError::Codec(
				permafrost_mldsa::CodecError::CoefficientOutOfRange,
			));
		}
	}
	Ok(())
}

/// Index `items` by sender id: every party except `me` must appear exactly
/// once.
fn index_by_party<'a, T>(
	items: &'a [T],
	n: u8,
	me: u8,
	id_of: impl Fn(&T) -> u8,
) -> ThresholdResult<Vec<Option<&'a T>>> {
	let mut slots: Vec<Option<&T>> = vec![None; n as usize];
	for item in items {
		let id = id_of(item);
		if id >= n || id == me {
			return Err(ThresholdError::InvalidPartyId { party_id: id, max_id: n - 1 });
		}
		if slots[id as usize].replace(item).is_some() {
			return Err(ThresholdError::DuplicateBroadcast { party_id: id });
		}
	}
	for id in 0..n {
		if id != me && slots[id as usize].is_none() {
			return Err(ThresholdError::MissingBroadcast { party_id: id });
		}
	}
	Ok(slots)
}

/// Begin a DKG run.
///
/// Draws this party's randomness and returns the phase 1 state together
/// with the commitment broadcast to send to every other party.
pub fn start<R: RngCore + CryptoRng>(
	config: &ThresholdConfig,
	party_id: u8,
	session: SessionId,
	rng: &mut R,
) -> ThresholdResult<(DkgCommitted, Phase1Broadcast)> {
	let n = config.total_parties();
	if party_id >= n {
		return Err(ThresholdError::InvalidPartyId { party_id, max_id: n - 1 });
	}

	let mut rho_mine = [0u8; 32];
	rng.fill_bytes(&mut rho_mine);

	// The per-party signing key seed never leaves this party; it is fresh
	// local randomness, not derivable from the transcript.
	let mut signing_key = [0u8; 32];
	rng.fill_bytes(&mut signing_key);

	let mut entropies = Vec::new();
	let mut seed_commitments = Vec::new();
	for mask in subsets_for_party(party_id, config) {
		let mut entropy = [0u8; 32];
		rng.fill_bytes(&mut entropy);
		seed_commitments.push((mask, commit_entropy(&session, mask, party_id, &entropy)));
		entropies.push((mask, entropy));
	}

	let broadcast = Phase1Broadcast {
		party_id,
		rho_commitment: commit_rho(&session, party_id, &rho_mine),
		seed_commitments,
	};
	let state =
		DkgCommitted { config: *config, party_id, session, rho_mine, signing_key, entropies };
	Ok((state, broadcast))
}

/// Phase 1 complete: this party has committed and waits for the other
/// commitments.
pub struct DkgCommitted {
	config: ThresholdConfig,
	party_id: u8,
	session: SessionId,
	rho_mine: [u8; 32],
	signing_key: [u8; 32],
	entropies: Vec<(u16, [u8; 32])>,
}

impl DkgCommitted {
	/// Process the other parties' phase 1 commitments.
	///
	/// Returns the reveal broadcast plus one private opening per (mask,
	/// holder) pair this party shares a subset with.
	pub fn receive_commitments(
		mut self,
		others: &[Phase1Broadcast],
	) -> ThresholdResult<(DkgRevealed, Phase2Broadcast, Vec<(u8, Phase2Private)>)> {
		let n = self.config.total_parties();
		let me = self.party_id;
		let indexed = index_by_party(others, n, me, |b| b.party_id)?;

		// Every party must commit for exactly the subsets it belongs to.
		let mut commitments: Vec<Phase1Broadcast> = Vec::with_capacity(n as usize);
		for id in 0..n {
			if id == me {
				commitments.push(Phase1Broadcast {
					party_id: me,
					rho_commitment: commit_rho(&self.session, me, &self.rho_mine),
					seed_commitments: self
						.entropies
						.iter()
						.map(|(mask, e)| (*mask, commit_entropy(&self.session, *mask, me, e)))
						.collect(),
				});
				continue;
			}
			let b = indexed[id as usize].ok_or(ThresholdError::MissingBroadcast { party_id: id })?;
			let expected = subsets_for_party(id, &self.config);
			let provided: Vec<u16> = b.seed_commitments.iter().map(|(m, _)| *m).collect();
			if provided != expected {
				let missing =
					expected.iter().find(|m| !provided.contains(m)).copied().unwrap_or(0);
				return Err(ThresholdError::DkgMissingContribution { party_id: id, mask: missing });
			}
			commitments.push(b.clone());
		}

		let reveal = Phase2Broadcast { party_id: me, rho: self.rho_mine };
		let mut privates = Vec::new();
		for (mask, entropy) in self.entropies.iter() {
			for holder in (0..n).filter(|i| *i != me && mask & (1 << i) != 0) {
				privates.push((holder, Phase2Private { from: me, mask: *mask, entropy: *entropy }));
			}
		}

		let state = DkgRevealed {
			config: self.config,
			party_id: me,
			session: self.session,
			rho_mine: self.rho_mine,
			signing_key: self.signing_key,
			entropies: std::mem::take(&mut self.entropies),
			commitments,
		};
		Ok((state, reveal, privates))
	}
}

impl Drop for DkgCommitted {
	fn drop(&mut self) {
		self.rho_mine.zeroize();
		self.signing_key.zeroize();
		for (_, e) in self.entropies.iter_mut() {
			e.zeroize();
		}
	}
}

/// Phase 2 sent: waiting for the other parties' openings.
pub struct DkgRevealed {
	config: ThresholdConfig,
	party_id: u8,
	session: SessionId,
	rho_mine: [u8; 32],
	signing_key: [u8; 32],
	entropies: Vec<(u16, [u8; 32])>,
	commitments: Vec<Phase1Broadcast>,
}

impl DkgRevealed {
	/// Verify the openings, derive this party's secret shares, and produce
	/// the masked commitment pieces for the subsets this party generates.
	///
	/// `rng` supplies the uniform splitting randomness for phase 3. Returns
	/// the next state and the private pieces, each addressed to one party.
	pub fn receive_reveals<R: RngCore + CryptoRng>(
		mut self,
		rng: &mut R,
		broadcasts: &[Phase2Broadcast],
		privates: &[Phase2Private],
	) -> ThresholdResult<(DkgMasked, Vec<(u8, Phase3Message)>)> {
		let ps = self.config.param_set();
		let n = self.config.total_parties();
		let me = self.party_id;

		// Verify the matrix-seed openings and aggregate rho.
		let indexed = index_by_party(broadcasts, n, me, |b| b.party_id)?;
		let mut rho_parts: Vec<[u8; 32]> = Vec::with_capacity(n as usize);
		for id in 0..n {
			let rho_j = if id == me {
				self.rho_mine
			} else {
				let b =
					indexed[id as usize].ok_or(ThresholdError::MissingBroadcast { party_id: id })?;
				if !ct_eq(&commit_rho(&self.session, id, &b.rho), &self.commitments[id as usize].rho_commitment)
				{
					return Err(ThresholdError::DkgCommitmentMismatch { party_id: id });
				}
				b.rho
			};
			rho_parts.push(rho_j);
		}
		let mut rho = [0u8; SEED_SIZE];
		{
			let mut parts: Vec<&[u8]> = vec![b"DKG-RHO-AGG", self.session.as_bytes()];
			for part in rho_parts.iter() {
				parts.push(part);
			}
			shake256(&mut rho, &parts);
		}

		// Verify the entropy openings for each subset this party holds and
		// derive the subset seeds.
		let mut shares: ShareTable<SecretShareData> = ShareTable::new();
		for (mask, my_entropy) in self.entropies.iter() {
			let holders: Vec<u8> = (0..n).filter(|i| mask & (1 << i) != 0).collect();
			let mut openings: Vec<[u8; 32]> = Vec::with_capacity(holders.len());
			for &holder in holders.iter() {
				if holder == me {
					openings.push(*my_entropy);
					continue;
				}
				let opening = privates
					.iter()
					.find(|p| p.from == holder && p.mask == *mask)
					.ok_or(ThresholdError::DkgMissingContribution { party_id: holder, mask: *mask })?;
				let expected = self.commitments[holder as usize]
					.seed_commitments
					.iter()
					.find(|(m, _)| m == mask)
					.map(|(_, c)| *c)
					.ok_or(ThresholdError::DkgMissingContribution { party_id: holder, mask: *mask })?;
				if !ct_eq(&commit_entropy(&self.session, *mask, holder, &opening.entropy), &expected)
				{
					return Err(ThresholdError::DkgCommitmentMismatch { party_id: holder });
				}
				openings.push(opening.entropy);
			}

			let mut seed = [0u8; 64];
			{
				let mut parts: Vec<&[u8]> = vec![b"DKG-BSEED", self.session.as_bytes()];
				let mask_bytes = mask.to_le_bytes();
				parts.push(&mask_bytes);
				for opening in openings.iter() {
					parts.push(opening);
				}
				shake256(&mut seed, &parts);
			}

			let s1 = PolyVec {
				vec: (0..ps.l).map(|j| rej_bounded_poly(&seed, j as u16, ps.eta)).collect(),
			};
			let s2 = PolyVec {
				vec: (0..ps.k)
					.map(|j| rej_bounded_poly(&seed, (ps.l + j) as u16, ps.eta))
					.collect(),
			};
			seed.zeroize();
			shares.insert(*mask, SecretShareData::new(s1, s2));
		}

		// Compute and split the masked commitment w = A*s1 + s2 for every
		// subset this party generates.
		let generators = assign_generators(&self.config, &rho);
		let a = expand_matrix(&rho, ps.k, ps.l);
		let mut residual_sum = PolyVec::zero(ps.k);
		let mut messages = Vec::new();
		let mut expected_pieces = Vec::new();
		for (mask, generator) in generators.iter() {
			if *generator != me {
				expected_pieces.push((*generator, *mask));
				continue;
			}
			let share = shares
				.get(*mask)
				.ok_or(ThresholdError::DkgMissingContribution { party_id: me, mask: *mask })?;

			let mut w = mat_vec_mul(&a, &share.s1_hat);
			for p in w.vec.iter_mut() {
				inv_ntt(p);
			}
			w.add_assign(&share.s2);
			w.normalize();

			// Split w into uniform pieces; the residual stays here so the
			// pieces reveal nothing individually.
			for to in (0..n).filter(|i| *i != me) {
				let piece = random_polyvec_mod_q(rng, ps.k);
				for (wp, pp) in w.vec.iter_mut().zip(piece.vec.iter()) {
					for (wc, &pc) in wp.coeffs.iter_mut().zip(pp.coeffs.iter()) {
						*wc = (*wc as i64 - pc as i64).rem_euclid(Q as i64) as i32;
					}
				}
				messages.push((to, Phase3Message { from: me, mask: *mask, piece }));
			}
			residual_sum.add_assign_mod_q(&w);
		}

		let state = DkgMasked {
			config: self.config,
			party_id: me,
			rho,
			signing_key: self.signing_key,
			shares,
			residual_sum,
			expected_pieces,
		};
		Ok((state, messages))
	}
}

impl Drop for DkgRevealed {
	fn drop(&mut self) {
		self.rho_mine.zeroize();
		self.signing_key.zeroize();
		for (_, e) in self.entropies.iter_mut() {
			e.zeroize();
		}
	}
}

/// Phase 3 sent: waiting for the pieces addressed to this party.
pub struct DkgMasked {
	config: ThresholdConfig,
	party_id: u8,
	rho: [u8; SEED_SIZE],
	signing_key: [u8; 32],
	shares: ShareTable<SecretShareData>,
	residual_sum: PolyVec,
	expected_pieces: Vec<(u8, u16)>,
}

impl DkgMasked {
	/// Absorb the pieces addressed to this party and produce the phase 4
	/// aggregate broadcast.
	pub fn receive_pieces(
		mut self,
		pieces: &[Phase3Message],
	) -> ThresholdResult<(DkgAggregated, Phase4Broadcast)> {
		let ps = self.config.param_set();
		let mut aggregate = std::mem::take(&mut self.residual_sum);

		for (from, mask) in self.expected_pieces.iter() {
			let mut found = None;
			for piece in pieces.iter().filter(|p| p.from == *from && p.mask == *mask) {
				if found.is_some() {
					return Err(ThresholdError::DuplicateBroadcast { party_id: *from });
				}
				found = Some(piece);
			}
			let piece = found
				.ok_or(ThresholdError::DkgMissingContribution { party_id: *from, mask: *mask })?;
			check_polyvec_mod_q(&piece.piece, ps.k)?;
			aggregate.add_assign_mod_q(&piece.piece);
		}

		let broadcast = Phase4Broadcast { party_id: self.party_id, aggregate: aggregate.clone() };
		let state = DkgAggregated {
			config: self.config,
			party_id: self.party_id,
			rho: self.rho,
			signing_key: self.signing_key,
			shares: std::mem::take(&mut self.shares),
			aggregate,
		};
		Ok((state, broadcast))
	}
}

impl Drop for DkgMasked {
	fn drop(&mut self) {
		self.signing_key.zeroize();
		self.shares.zeroize();
	}
}

/// Phase 4 sent: waiting for the other aggregates to finish the run.
pub struct DkgAggregated {
	config: ThresholdConfig,
	party_id: u8,
	rho: [u8; SEED_SIZE],
	signing_key: [u8; 32],
	shares: ShareTable<SecretShareData>,
	aggregate: PolyVec,
}

impl DkgAggregated {
	/// Combine every party's aggregate into t, derive the public key, and
	/// assemble this party's private share.
	pub fn receive_aggregates(
		mut self,
		others: &[Phase4Broadcast],
	) -> ThresholdResult<DkgOutput> {
		let ps = self.config.param_set();
		let n = self.config.total_parties();
		let me = self.party_id;
		let indexed = index_by_party(others, n, me, |b| b.party_id)?;

		let mut t = std::mem::take(&mut self.aggregate);
		for id in 0..n {
			if id == me {
				continue;
			}
			let b = indexed[id as usize].ok_or(ThresholdError::MissingBroadcast { party_id: id })?;
			check_polyvec_mod_q(&b.aggregate, ps.k)?;
			t.add_assign_mod_q(&b.aggregate);
		}

		let mut t1 = PolyVec::zero(ps.k);
		for (dst, src) in t1.vec.iter_mut().zip(t.vec.iter()) {
			for (d, &s) in dst.coeffs.iter_mut().zip(src.coeffs.iter()) {
				let (_t0, high) = power2round(s);
				*d = high;
			}
		}

		let pk_bytes = pack_pk(&self.rho, &t1, ps);
		let tr = compute_tr(&pk_bytes);
		let public_key = PublicKey::new(self.config.level(), pk_bytes, tr);

		let private_share = PrivateKeyShare::new(
			me,
			n,
			self.config.threshold(),
			self.config.level(),
			self.signing_key,
			self.rho,
			tr,
			std::mem::take(&mut self.shares),
		);
		Ok(DkgOutput { public_key, private_share })
	}
}

impl Drop for DkgAggregated {
	fn drop(&mut self) {
		self.signing_key.zeroize();
		self.shares.zeroize();
	}
}
