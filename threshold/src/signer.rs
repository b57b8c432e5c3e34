//! Per-party driver for the three-round signing protocol.
//!
//! Each participating party wraps its private key share in a
//! [`ThresholdSigner`] and walks the rounds in order, broadcasting the
//! returned message after each step.
//!
//! # Example
//!
//! ```ignore
//! use permafrost_threshold::{
//!     generate_with_dealer, SessionId, ThresholdConfig, ThresholdSigner,
//! };
//!
//! let config = ThresholdConfig::new(2, 3, level)?;
//! let (public_key, shares) = generate_with_dealer(&seed, &config)?;
//!
//! let mut signer = ThresholdSigner::new(shares[0].clone(), public_key.clone(), config)?;
//!
//! let r1 = signer.round1_commit(&mut rng, session)?;
//! // ... broadcast r1, collect the other active parties' round 1 ...
//! let r2 = signer.round2_reveal(message, context, &other_r1)?;
//! // ... broadcast r2, collect the others' round 2 ...
//! let r3 = signer.round3_respond(&other_r2)?;
//! // ... broadcast r3, collect the others' round 3 ...
//! let signature = signer.combine(&other_r3)?;
//! ```

use rand_core::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use permafrost_mldsa::shake::shake256;
use permafrost_mldsa::PolyVec;

use crate::broadcast::{Round1Broadcast, Round2Broadcast, Round3Broadcast, Signature};
use crate::config::{ThresholdConfig, MAX_SIGN_ATTEMPTS};
use crate::error::{ThresholdError, ThresholdResult};
use crate::keys::{PrivateKeyShare, PublicKey};
use crate::session::SessionId;
use crate::signing::{
	combine_signature, commitment_hash_for, generate_round1, generate_round3_response,
	pack_responses, pack_round1_commitment, process_round2, unpack_responses, Round1Data,
	Round2Data,
};

/// A threshold signer for a single party.
///
/// Holds the private key share and the in-flight protocol state. The only
/// values that should ever leave the process are the broadcast messages the
/// round methods return.
///
/// Rounds must be called in order; calling one out of turn returns
/// [`ThresholdError::InvalidState`] without disturbing the state. Before
/// using any peer's revealed commitments, round 3 checks them against the
/// hashes received in round 1 and aborts with
/// [`ThresholdError::CommitmentMismatch`] on any deviation.
///
/// All secret state is zeroized on [`reset`](Self::reset) and on drop.
pub struct ThresholdSigner {
	config: ThresholdConfig,
	public_key: PublicKey,
	private_key: PrivateKeyShare,
	state: SignerState,
	attempts: u32,
}

enum SignerState {
	/// Ready to start a new signing session.
	Fresh,
	/// Round 1 complete, waiting for the peers' commitment hashes.
	AfterRound1 { session: SessionId, round1_data: Round1Data },
	/// Round 2 complete, waiting for the peers' reveals.
	AfterRound2 {
		session: SessionId,
		round1_data: Round1Data,
		peer_hashes: Vec<(u8, [u8; 32])>,
		message: Vec<u8>,
		context: Vec<u8>,
	},
	/// Round 3 complete, ready to combine.
	AfterRound3 {
		round2_data: Round2Data,
		my_responses: Vec<PolyVec>,
		peer_ids: Vec<u8>,
		message: Vec<u8>,
		context: Vec<u8>,
	},
}

impl Default for SignerState {
	fn default() -> Self {
		SignerState::Fresh
	}
}

/// Constant-time 32-byte hash comparison.
fn hashes_match(a: &[u8; 32], b: &[u8; 32]) -> bool {
	a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl ThresholdSigner {
	/// Create a signer from a private key share and the group public key.
	///
	/// The share's (t, n) shape and security level must match the
	/// configuration and the public key.
	pub fn new(
		private_key: PrivateKeyShare,
		public_key: PublicKey,
		config: ThresholdConfig,
	) -> ThresholdResult<Self> {
		if private_key.threshold() != config.threshold()
			|| private_key.total_parties() != config.total_parties()
		{
			return Err(ThresholdError::InvalidParameters {
				threshold: config.threshold(),
				parties: config.total_parties(),
				reason: "private key share was generated for a different group shape",
			});
		}
		if private_key.level() != config.level() || public_key.level() != config.level() {
			return Err(ThresholdError::InvalidParameters {
				threshold: config.threshold(),
				parties: config.total_parties(),
				reason: "key material security level does not match the configuration",
			});
		}
		Ok(Self { config, public_key, private_key, state: SignerState::Fresh, attempts: 0 })
	}

	/// This party's ID.
	pub fn party_id(&self) -> u8 {
		self.private_key.party_id()
	}

	/// The threshold configuration.
	pub fn config(&self) -> &ThresholdConfig {
		&self.config
	}

	/// The group public key.
	pub fn public_key(&self) -> &PublicKey {
		&self.public_key
	}

	/// Round 1: commit to this session's masked nonces.
	///
	/// The nonce seed mixes the share's long-term key seed, the session ID
	/// and fresh randomness, so even a weak RNG never repeats a nonce across
	/// sessions. Broadcast the returned message to the other active parties.
	///
	/// A signer allows at most [`MAX_SIGN_ATTEMPTS`] sessions over its
	/// lifetime; past that every call returns
	/// [`ThresholdError::SigningExhausted`].
	///
	/// Transitions `Fresh` to `AfterRound1`.
	pub fn round1_commit<R: RngCore + CryptoRng>(
		&mut self,
		rng: &mut R,
		session: SessionId,
	) -> ThresholdResult<Round1Broadcast> {
		if !matches!(self.state, SignerState::Fresh) {
			return Err(ThresholdError::InvalidState {
				current: self.state_name(),
				expected: "Fresh",
			});
		}
		if self.attempts >= MAX_SIGN_ATTEMPTS {
			return Err(ThresholdError::SigningExhausted { attempts: self.attempts });
		}
		self.attempts += 1;

		let mut entropy = [0u8; 32];
		rng.fill_bytes(&mut entropy);
		let mut seed = [0u8; 32];
		shake256(&mut seed, &[self.private_key.key(), session.as_bytes(), &entropy]);
		entropy.zeroize();

		let round1_data = generate_round1(&self.private_key, &self.config, &session, &seed)?;
		seed.zeroize();

		let broadcast = Round1Broadcast {
			party_id: self.private_key.party_id(),
			commitment_hash: round1_data.commitment_hash,
		};
		self.state = SignerState::AfterRound1 { session, round1_data };
		Ok(broadcast)
	}

	/// Round 2: record the peers' hashes and reveal our commitments.
	///
	/// `other_round1` must hold exactly one broadcast from each of the other
	/// t - 1 active parties. Their hashes are stored and checked against the
	/// reveals in round 3.
	///
	/// Transitions `AfterRound1` to `AfterRound2`.
	pub fn round2_reveal(
		&mut self,
		message: &[u8],
		context: &[u8],
		other_round1: &[Round1Broadcast],
	) -> ThresholdResult<Round2Broadcast> {
		let (session, round1_data) = match std::mem::take(&mut self.state) {
			SignerState::AfterRound1 { session, round1_data } => (session, round1_data),
			other => {
				self.state = other;
				return Err(ThresholdError::InvalidState {
					current: self.state_name(),
					expected: "AfterRound1",
				});
			},
		};

		let mut peer_hashes: Vec<(u8, [u8; 32])> = Vec::with_capacity(other_round1.len());
		for r1 in other_round1 {
			if r1.party_id >= self.config.total_parties()
				|| r1.party_id == self.private_key.party_id()
			{
				self.state = SignerState::AfterRound1 { session, round1_data };
				return Err(ThresholdError::InvalidPartyId {
					party_id: r1.party_id,
					max_id: self.config.total_parties() - 1,
				});
			}
			if peer_hashes.iter().any(|(id, _)| *id == r1.party_id) {
				self.state = SignerState::AfterRound1 { session, round1_data };
				return Err(ThresholdError::DuplicateBroadcast { party_id: r1.party_id });
			}
			peer_hashes.push((r1.party_id, r1.commitment_hash));
		}
		if peer_hashes.len() + 1 != self.config.threshold() as usize {
			self.state = SignerState::AfterRound1 { session, round1_data };
			return Err(ThresholdError::WrongActiveSetSize {
				provided: peer_hashes.len() + 1,
				required: self.config.threshold(),
			});
		}

		let commitment_data = pack_round1_commitment(&round1_data);
		let broadcast =
			Round2Broadcast { party_id: self.private_key.party_id(), commitment_data };

		self.state = SignerState::AfterRound2 {
			session,
			round1_data,
			peer_hashes,
			message: message.to_vec(),
			context: context.to_vec(),
		};
		Ok(broadcast)
	}

	/// Round 3: verify the peers' reveals and compute our response shares.
	///
	/// Each reveal is rehashed and compared against the hash stored in
	/// round 2; any mismatch aborts with
	/// [`ThresholdError::CommitmentMismatch`] before the secret share is
	/// touched.
	///
	/// Transitions `AfterRound2` to `AfterRound3`.
	pub fn round3_respond(
		&mut self,
		other_round2: &[Round2Broadcast],
	) -> ThresholdResult<Round3Broadcast> {
		let (session, round1_data, peer_hashes, message, context) =
			match std::mem::take(&mut self.state) {
				SignerState::AfterRound2 { session, round1_data, peer_hashes, message, context } =>
					(session, round1_data, peer_hashes, message, context),
				other => {
					self.state = other;
					return Err(ThresholdError::InvalidState {
						current: self.state_name(),
						expected: "AfterRound2",
					});
				},
			};

		let result = Self::respond_inner(
			&self.private_key,
			&self.public_key,
			&self.config,
			&session,
			&round1_data,
			&peer_hashes,
			&message,
			&context,
			other_round2,
		);
		match result {
			Ok((round2_data, my_responses, broadcast)) => {
				let peer_ids = peer_hashes.iter().map(|(id, _)| *id).collect();
				self.state = SignerState::AfterRound3 {
					round2_data,
					my_responses,
					peer_ids,
					message,
					context,
				};
				Ok(broadcast)
			},
			Err(e) => {
				self.state = SignerState::AfterRound2 {
					session,
					round1_data,
					peer_hashes,
					message,
					context,
				};
				Err(e)
			},
		}
	}

	#[allow(clippy::too_many_arguments)]
	fn respond_inner(
		private_key: &PrivateKeyShare,
		public_key: &PublicKey,
		config: &ThresholdConfig,
		session: &SessionId,
		round1_data: &Round1Data,
		peer_hashes: &[(u8, [u8; 32])],
		message: &[u8],
		context: &[u8],
		other_round2: &[Round2Broadcast],
	) -> ThresholdResult<(Round2Data, Vec<PolyVec>, Round3Broadcast)> {
		let mut other_party_ids = Vec::with_capacity(peer_hashes.len());
		let mut other_commitments = Vec::with_capacity(peer_hashes.len());
		for &(peer_id, expected_hash) in peer_hashes {
			let mut found = None;
			for r2 in other_round2.iter().filter(|r2| r2.party_id == peer_id) {
				if found.is_some() {
					return Err(ThresholdError::DuplicateBroadcast { party_id: peer_id });
				}
				found = Some(r2);
			}
			let r2 = found.ok_or(ThresholdError::MissingBroadcast { party_id: peer_id })?;

			let actual =
				commitment_hash_for(public_key.tr(), session, peer_id, &r2.commitment_data);
			if !hashes_match(&expected_hash, &actual) {
				return Err(ThresholdError::CommitmentMismatch { party_id: peer_id });
			}
			other_party_ids.push(peer_id);
			other_commitments.push(r2.commitment_data.clone());
		}

		let round2_data = process_round2(
			private_key,
			config,
			round1_data,
			message,
			context,
			&other_party_ids,
			&other_commitments,
		)?;
		let my_responses = generate_round3_response(private_key, config, round1_data, &round2_data)?;

		let broadcast = Round3Broadcast {
			party_id: private_key.party_id(),
			response: pack_responses(&my_responses),
		};
		Ok((round2_data, my_responses, broadcast))
	}

	/// Combine the round 3 broadcasts into the final signature.
	///
	/// `other_round3` must hold exactly one broadcast from each of the other
	/// active parties; this signer's own response is taken from its state.
	/// Returns [`ThresholdError::CombinationFailed`] when no iteration
	/// passed the public checks, in which case the whole protocol restarts
	/// from round 1 with a fresh session.
	pub fn combine(&self, other_round3: &[Round3Broadcast]) -> ThresholdResult<Signature> {
		let (round2_data, my_responses, peer_ids, message, context) = match &self.state {
			SignerState::AfterRound3 { round2_data, my_responses, peer_ids, message, context } =>
				(round2_data, my_responses, peer_ids, message, context),
			_ => {
				return Err(ThresholdError::InvalidState {
					current: self.state_name(),
					expected: "AfterRound3",
				});
			},
		};

		let mut all_responses: Vec<Vec<PolyVec>> = Vec::with_capacity(peer_ids.len() + 1);
		all_responses.push(my_responses.clone());
		for &peer_id in peer_ids {
			let mut found = None;
			for r3 in other_round3.iter().filter(|r3| r3.party_id == peer_id) {
				if found.is_some() {
					return Err(ThresholdError::DuplicateBroadcast { party_id: peer_id });
				}
				found = Some(r3);
			}
			let r3 = found.ok_or(ThresholdError::MissingBroadcast { party_id: peer_id })?;
			all_responses.push(unpack_responses(&r3.response, &self.config)?);
		}

		let signature_bytes = combine_signature(
			&self.public_key,
			&self.config,
			message,
			context,
			&round2_data.w_aggregated,
			&all_responses,
		)?;
		Ok(Signature::from_vec(signature_bytes))
	}

	/// Abort the in-flight session and return to `Fresh`.
	///
	/// Zeroizes all per-session secret state. Call after a completed or
	/// failed session before starting the next one. The lifetime attempt
	/// counter is not reset; use a new signer for a new signing job.
	pub fn reset(&mut self) {
		match &mut self.state {
			SignerState::Fresh => {},
			SignerState::AfterRound1 { round1_data, .. } => {
				round1_data.zeroize();
			},
			SignerState::AfterRound2 { round1_data, message, context, .. } => {
				round1_data.zeroize();
				message.zeroize();
				context.zeroize();
			},
			SignerState::AfterRound3 { round2_data, my_responses, message, context, .. } => {
				round2_data.zeroize();
				for r in my_responses.iter_mut() {
					r.zeroize();
				}
				message.zeroize();
				context.zeroize();
			},
		}
		self.state = SignerState::Fresh;
	}

	fn state_name(&self) -> &'static str {
		match &self.state {
			SignerState::Fresh => "Fresh",
			SignerState::AfterRound1 { .. } => "AfterRound1",
			SignerState::AfterRound2 { .. } => "AfterRound2",
			SignerState::AfterRound3 { .. } => "AfterRound3",
		}
	}
}

impl Drop for ThresholdSigner {
	fn drop(&mut self) {
		self.reset();
	}
}

impl ZeroizeOnDrop for ThresholdSigner {}
