//! Broadcast message types for the threshold signing protocol.
//!
//! These are the only values that ever leave a party during signing. In a
//! distributed setting each party serializes them (with serde when the
//! feature is enabled) and sends them over its transport.
//!
//! ```text
//! Round 1: Round1Broadcast (commitment hash)
//! Round 2: Round2Broadcast (commitment reveal)
//! Round 3: Round3Broadcast (masked response shares)
//! ```
//!
//! After round 3 anyone holding the broadcasts can combine them into a
//! [`Signature`].

use permafrost_mldsa::SecurityLevel;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Round 1 broadcast: hash commitment to this party's masked nonces.
///
/// Only the hash goes out in round 1, so no party can pick its nonces as a
/// function of anyone else's. The hash also binds the session ID and the
/// sender, which rules out cross-session replay.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Round1Broadcast {
	/// Sender's party ID.
	pub party_id: u8,
	/// SHAKE-256 hash of the sender's packed commitments.
	pub commitment_hash: [u8; 32],
}

/// Round 2 broadcast: the commitments behind the round 1 hash.
///
/// `commitment_data` holds one packed w vector per signing iteration,
/// 23 bits per coefficient. Receivers recompute the round 1 hash from it
/// before using any of the values.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Round2Broadcast {
	/// Sender's party ID.
	pub party_id: u8,
	/// Packed commitment polynomials for every iteration.
	pub commitment_data: Vec<u8>,
}

/// Round 3 broadcast: the sender's masked response shares.
///
/// One packed z vector per iteration; an iteration the sender rejected is
/// carried as the zero vector so the wire size never varies.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Round3Broadcast {
	/// Sender's party ID.
	pub party_id: u8,
	/// Packed response polynomials for every iteration.
	pub response: Vec<u8>,
}

/// A completed threshold signature.
///
/// Byte-identical to a standard ML-DSA signature at the same security
/// level: verifiers need no knowledge of the threshold scheme. Verify with
/// [`crate::verify_signature`] or any FIPS 204 implementation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Signature {
	bytes: Vec<u8>,
}

impl Signature {
	/// Parse a signature, checking the length for the given level.
	///
	/// Returns `None` when the length does not match the level's signature
	/// size.
	pub fn from_bytes(level: SecurityLevel, bytes: &[u8]) -> Option<Self> {
		if bytes.len() != level.params().signature_size() {
			return None;
		}
		Some(Self { bytes: bytes.to_vec() })
	}

	pub(crate) fn from_vec(bytes: Vec<u8>) -> Self {
		Self { bytes }
	}

	/// The signature bytes in standard ML-DSA format.
	pub fn as_bytes(&self) -> &[u8] {
		&self.bytes
	}

	/// Consume the signature, returning the bytes.
	pub fn into_bytes(self) -> Vec<u8> {
		self.bytes
	}
}

impl AsRef<[u8]> for Signature {
	fn as_ref(&self) -> &[u8] {
		&self.bytes
	}
}
