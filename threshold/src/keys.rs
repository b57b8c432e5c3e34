//! Key types for threshold ML-DSA.
//!
//! This module defines the public key and private key share types used in
//! threshold signing. The private key share is intentionally opaque to
//! prevent accidental exposure of secret material.

use permafrost_mldsa::ntt::ntt;
use permafrost_mldsa::params::common::{Q, TR_SIZE};
use permafrost_mldsa::verify::compute_tr;
use permafrost_mldsa::{PolyVec, SecurityLevel};
use zeroize::{Zeroize, ZeroizeOnDrop};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "serde")]
use crate::serde_helpers::{serde_byte_array, serde_poly_vec, serde_share_table};

use crate::error::{ThresholdError, ThresholdResult};
use crate::share_table::ShareTable;

/// Public key for threshold ML-DSA.
///
/// This key is shared among all parties and is used for signature
/// verification. It can be freely distributed, there is no secret material
/// here. The packed bytes are a standard ML-DSA public key for the group's
/// security level, usable by any FIPS 204 verifier.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PublicKey {
	/// Security level of the key.
	level: SecurityLevel,
	/// Packed public key bytes (standard ML-DSA format for the level).
	bytes: Vec<u8>,
	/// Public key hash (TR), used in signing.
	#[cfg_attr(feature = "serde", serde(with = "serde_byte_array"))]
	tr: [u8; TR_SIZE],
}

impl PublicKey {
	/// Create a new public key from its components.
	pub(crate) fn new(level: SecurityLevel, bytes: Vec<u8>, tr: [u8; TR_SIZE]) -> Self {
		Self { level, bytes, tr }
	}

	/// Get the packed public key bytes.
	pub fn as_bytes(&self) -> &[u8] {
		&self.bytes
	}

	/// Get the public key hash (TR).
	pub fn tr(&self) -> &[u8; TR_SIZE] {
		&self.tr
	}

	/// Get the security level.
	pub fn level(&self) -> SecurityLevel {
		self.level
	}

	/// Create a public key from packed bytes at the given level.
	///
	/// This recomputes the TR hash from the public key bytes.
	pub fn from_bytes(level: SecurityLevel, bytes: &[u8]) -> ThresholdResult<Self> {
		let expected = level.params().public_key_size();
		if bytes.len() != expected {
			return Err(ThresholdError::Codec(permafrost_mldsa::CodecError::InvalidLength {
				expected,
				actual: bytes.len(),
			}));
		}
		let tr = compute_tr(bytes);
		Ok(Self { level, bytes: bytes.to_vec(), tr })
	}
}

/// Internal secret share data for a specific signer subset.
///
/// Kept in both the coefficient and the NTT domain: recovery and signing
/// consume the NTT forms, the coefficient forms drive key generation.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub(crate) struct SecretShareData {
	/// Share of s1 (L polynomials).
	#[cfg_attr(feature = "serde", serde(with = "serde_poly_vec"))]
	pub(crate) s1: PolyVec,
	/// Share of s2 (K polynomials).
	#[cfg_attr(feature = "serde", serde(with = "serde_poly_vec"))]
	pub(crate) s2: PolyVec,
	/// NTT form of s1, coefficients in [0, q).
	#[cfg_attr(feature = "serde", serde(with = "serde_poly_vec"))]
	pub(crate) s1_hat: PolyVec,
	/// NTT form of s2, coefficients in [0, q).
	#[cfg_attr(feature = "serde", serde(with = "serde_poly_vec"))]
	pub(crate) s2_hat: PolyVec,
}

fn ntt_mod_q(pv: &PolyVec) -> PolyVec {
	let mut out = pv.clone();
	out.normalize();
	for p in out.vec.iter_mut() {
		ntt(p);
	}
	for p in out.vec.iter_mut() {
		for c in p.coeffs.iter_mut() {
			*c = (*c as i64).rem_euclid(Q as i64) as i32;
		}
	}
	out
}

impl SecretShareData {
	/// Build a share, caching the NTT forms alongside the coefficients.
	pub(crate) fn new(s1: PolyVec, s2: PolyVec) -> Self {
		let s1_hat = ntt_mod_q(&s1);
		let s2_hat = ntt_mod_q(&s2);
		Self { s1, s2, s1_hat, s2_hat }
	}
}

impl Zeroize for SecretShareData {
	fn zeroize(&mut self) {
		self.s1.zeroize();
		self.s2.zeroize();
		self.s1_hat.zeroize();
		self.s2_hat.zeroize();
	}
}

/// Private key share for one party in the threshold scheme.
///
/// **This contains secret material and MUST be kept confidential.**
///
/// Each party holds one share. The share is intentionally opaque, the
/// internal secret values cannot be read through the public API.
///
/// # Security
///
/// - Never transmit this over an insecure channel
/// - Never log or print this value
/// - Store securely (encrypted at rest)
/// - The `Zeroize` trait ensures memory is cleared on drop
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrivateKeyShare {
	/// Party identifier (0 to n-1).
	party_id: u8,
	/// Total number of parties.
	total_parties: u8,
	/// Threshold value.
	threshold: u8,
	/// Security level of the group key.
	level: SecurityLevel,
	/// Per-party key seed, used to derive per-signature randomness.
	key: [u8; 32],
	/// Public matrix seed rho (same as in the public key).
	rho: [u8; 32],
	/// Hash of the public key, bound into every signing hash.
	#[cfg_attr(feature = "serde", serde(with = "serde_byte_array"))]
	tr: [u8; TR_SIZE],
	/// Secret shares held by this party, keyed by signer-subset bitmask.
	#[cfg_attr(feature = "serde", serde(with = "serde_share_table"))]
	shares: ShareTable<SecretShareData>,
}

impl PrivateKeyShare {
	/// Create a new private key share.
	pub(crate) fn new(
		party_id: u8,
		total_parties: u8,
		threshold: u8,
		level: SecurityLevel,
		key: [u8; 32],
		rho: [u8; 32],
		tr: [u8; TR_SIZE],
		shares: ShareTable<SecretShareData>,
	) -> Self {
		Self { party_id, total_parties, threshold, level, key, rho, tr, shares }
	}

	/// Get this party's ID.
	pub fn party_id(&self) -> u8 {
		self.party_id
	}

	/// Get the total number of parties.
	pub fn total_parties(&self) -> u8 {
		self.total_parties
	}

	/// Get the threshold value.
	pub fn threshold(&self) -> u8 {
		self.threshold
	}

	/// Get the security level.
	pub fn level(&self) -> SecurityLevel {
		self.level
	}

	/// Get the matrix seed rho (for internal use).
	pub(crate) fn rho(&self) -> &[u8; 32] {
		&self.rho
	}

	/// Get the public key hash TR (for internal use).
	pub(crate) fn tr(&self) -> &[u8; TR_SIZE] {
		&self.tr
	}

	/// Get the per-party key seed (for internal use).
	pub(crate) fn key(&self) -> &[u8; 32] {
		&self.key
	}

	/// Get the secret share table (for internal use).
	pub(crate) fn shares(&self) -> &ShareTable<SecretShareData> {
		&self.shares
	}
}

impl Zeroize for PrivateKeyShare {
	fn zeroize(&mut self) {
		self.party_id.zeroize();
		self.total_parties.zeroize();
		self.threshold.zeroize();
		self.key.zeroize();
		self.rho.zeroize();
		self.tr.zeroize();
		self.shares.zeroize();
	}
}

impl ZeroizeOnDrop for PrivateKeyShare {}

impl std::fmt::Debug for PrivateKeyShare {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PrivateKeyShare")
			.field("party_id", &self.party_id)
			.field("total_parties", &self.total_parties)
			.field("threshold", &self.threshold)
			.field("level", &self.level)
			.field("key", &"[REDACTED]")
			.field("shares", &format!("{} subsets", self.shares.len()))
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn public_key_roundtrip() {
		let level = SecurityLevel::MlDsa44;
		let bytes = vec![0x42u8; level.params().public_key_size()];
		let pk = PublicKey::from_bytes(level, &bytes).unwrap();
		assert_eq!(pk.as_bytes(), &bytes[..]);
		assert_eq!(pk.tr(), &compute_tr(&bytes));
	}

	#[test]
	fn public_key_invalid_length() {
		assert!(PublicKey::from_bytes(SecurityLevel::MlDsa87, &[0u8; 100]).is_err());
	}

	#[test]
	fn share_data_caches_reduced_ntt_forms() {
		let mut s1 = PolyVec::zero(2);
		s1.vec[0].coeffs[0] = -2;
		s1.vec[1].coeffs[5] = 2;
		let share = SecretShareData::new(s1.clone(), PolyVec::zero(3));
		assert_eq!(share.s1, s1);
		assert_eq!(share.s1_hat.len(), 2);
		assert_eq!(share.s2_hat.len(), 3);
		assert!(share
			.s1_hat
			.vec
			.iter()
			.all(|p| p.coeffs.iter().all(|&c| c >= 0 && c < Q)));

		// The cached form agrees with a direct transform of the share.
		let mut direct = s1;
		direct.normalize();
		for p in direct.vec.iter_mut() {
			ntt(p);
		}
		for (cached, raw) in share.s1_hat.vec.iter().zip(direct.vec.iter()) {
			for (&c, &r) in cached.coeffs.iter().zip(raw.coeffs.iter()) {
				assert_eq!(c, (r as i64).rem_euclid(Q as i64) as i32);
			}
		}
	}

	#[test]
	fn private_key_debug_redacts_secrets() {
		let share = PrivateKeyShare::new(
			0,
			3,
			2,
			SecurityLevel::MlDsa44,
			[0x42u8; 32],
			[0u8; 32],
			[0u8; TR_SIZE],
			ShareTable::new(),
		);
		let debug_str = format!("{:?}", share);
		assert!(debug_str.contains("REDACTED"));
		assert!(!debug_str.contains("42"));
	}

	#[test]
	fn private_key_zeroize() {
		let mut share = PrivateKeyShare::new(
			0,
			3,
			2,
			SecurityLevel::MlDsa44,
			[0x42u8; 32],
			[0x43u8; 32],
			[0x44u8; TR_SIZE],
			ShareTable::new(),
		);
		share.zeroize();
		assert_eq!(share.key, [0u8; 32]);
		assert_eq!(share.rho, [0u8; 32]);
		assert_eq!(share.tr, [0u8; TR_SIZE]);
	}
}
