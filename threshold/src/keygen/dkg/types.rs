//! Message and output types for the distributed key generation protocol.

use permafrost_mldsa::PolyVec;
use zeroize::Zeroize;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::keys::{PrivateKeyShare, PublicKey};

/// Phase 1 broadcast: hash commitments to this party's randomness.
///
/// `seed_commitments` holds one commitment per share subset this party
/// belongs to, in ascending mask order.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Phase1Broadcast {
	/// Sender's party ID.
	pub party_id: u8,
	/// Commitment to the sender's matrix-seed contribution.
	pub rho_commitment: [u8; 32],
	/// Commitments to the sender's per-subset entropy, keyed by mask.
	pub seed_commitments: Vec<(u16, [u8; 32])>,
}

/// Phase 2 broadcast: reveal of the matrix-seed contribution.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Phase2Broadcast {
	/// Sender's party ID.
	pub party_id: u8,
	/// The matrix-seed contribution committed to in phase 1.
	pub rho: [u8; 32],
}

/// Phase 2 private message: opens one per-subset entropy commitment.
///
/// Sent only to the other holders of `mask`; parties outside the subset
/// never learn the entropy.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Phase2Private {
	/// Sender's party ID.
	pub from: u8,
	/// Subset mask this entropy contributes to.
	pub mask: u16,
	/// The entropy committed to in phase 1.
	pub entropy: [u8; 32],
}

impl Zeroize for Phase2Private {
	fn zeroize(&mut self) {
		self.entropy.zeroize();
	}
}

/// Phase 3 private message: one additive piece of a masked subset
/// commitment, addressed to a single party.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Phase3Message {
	/// The generator that produced this piece.
	pub from: u8,
	/// Subset mask whose commitment the piece belongs to.
	pub mask: u16,
	/// Uniform additive piece of w^mask, k polynomials mod q.
	#[cfg_attr(feature = "serde", serde(with = "crate::serde_helpers::serde_poly_vec"))]
	pub piece: PolyVec,
}

/// Phase 4 broadcast: a party's aggregate of every piece addressed to it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Phase4Broadcast {
	/// Sender's party ID.
	pub party_id: u8,
	/// Sum of all pieces addressed to the sender, k polynomials mod q.
	#[cfg_attr(feature = "serde", serde(with = "crate::serde_helpers::serde_poly_vec"))]
	pub aggregate: PolyVec,
}

/// Final output of a successful DKG run.
#[derive(Clone, Debug)]
pub struct DkgOutput {
	/// The group public key, identical at every party.
	pub public_key: PublicKey,
	/// This party's private key share.
	pub private_share: PrivateKeyShare,
}
