//! Session identifiers scoping one DKG or signing attempt.

use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Size of a session identifier in bytes.
pub const SESSION_ID_SIZE: usize = 32;

/// A 32-byte identifier scoping one protocol run.
///
/// Every commitment and derived hash binds the session id, so messages from
/// one run can never be replayed into another. Aborted runs must restart
/// with a fresh id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionId([u8; SESSION_ID_SIZE]);

impl SessionId {
	/// Draw a fresh random session id.
	pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
		let mut bytes = [0u8; SESSION_ID_SIZE];
		rng.fill_bytes(&mut bytes);
		Self(bytes)
	}

	/// Build a session id from agreed-upon bytes.
	pub fn from_bytes(bytes: [u8; SESSION_ID_SIZE]) -> Self {
		Self(bytes)
	}

	/// The raw identifier bytes.
	pub fn as_bytes(&self) -> &[u8; SESSION_ID_SIZE] {
		&self.0
	}
}

impl Zeroize for SessionId {
	fn zeroize(&mut self) {
		self.0.zeroize();
	}
}
