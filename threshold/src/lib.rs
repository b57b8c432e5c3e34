//! # Threshold ML-DSA
//!
//! Threshold signing for ML-DSA (FIPS 204): a t-of-n group of parties
//! jointly produces signatures that are byte-identical to standard ML-DSA,
//! so verifiers need no knowledge of the threshold scheme. All three
//! security levels (ML-DSA-44, -65 and -87) are supported for group shapes
//! with 2 ≤ t ≤ n ≤ 6 and calibrated constants.
//!
//! ## Key generation
//!
//! Keys come from either a trusted dealer
//! ([`generate_with_dealer`]) or the four-phase distributed protocol in
//! [`keygen::dkg`], where no single party ever holds the full key.
//!
//! ## Signing
//!
//! Signing is an interactive three-round protocol driven per party by a
//! [`ThresholdSigner`]:
//!
//! 1. **Commit**: broadcast a hash commitment to masked nonces.
//! 2. **Reveal**: broadcast the nonce commitments behind the hash.
//! 3. **Respond**: verify the reveals, broadcast masked response shares.
//!
//! Any holder of the broadcasts can then combine them into a [`Signature`],
//! either through [`ThresholdSigner::combine`] or, without any private
//! state, through the free [`combine`] function. A combine failure is
//! expected occasionally; the protocol restarts from round 1 with a fresh
//! [`SessionId`] (see [`MAX_SIGN_ATTEMPTS`]).
//!
//! ## Warning
//!
//! **This implementation has not undergone security review and should not
//! be used in production systems.**

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod broadcast;
pub mod config;
pub mod error;
mod hyperball;
pub mod keygen;
pub mod keys;
#[cfg(feature = "serde")]
mod serde_helpers;
pub mod session;
mod share_table;
mod sharing;
pub mod signer;
mod signing;

pub use broadcast::{Round1Broadcast, Round2Broadcast, Round3Broadcast, Signature};
pub use config::{ThresholdConfig, ThresholdParams, MAX_SIGN_ATTEMPTS};
pub use error::{ThresholdError, ThresholdResult, MAX_PARTIES, MIN_THRESHOLD};
pub use keygen::generate_with_dealer;
pub use keys::{PrivateKeyShare, PublicKey};
pub use session::{SessionId, SESSION_ID_SIZE};
pub use signer::ThresholdSigner;
pub use signing::combine;

pub use permafrost_mldsa::SecurityLevel;

/// Verify a threshold signature against the group public key.
///
/// Standard ML-DSA verification; any FIPS 204 verifier accepts the same
/// bytes.
pub fn verify_signature(
	public_key: &PublicKey,
	message: &[u8],
	context: &[u8],
	signature: &Signature,
) -> bool {
	permafrost_mldsa::verify::verify(
		public_key.level(),
		public_key.as_bytes(),
		message,
		context,
		signature.as_bytes(),
	)
}
