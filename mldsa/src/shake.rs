//! Thin SHAKE-128/256 helpers over the `sha3` crate.
//!
//! Every extendable-output hash in the scheme goes through these wrappers so
//! absorb order is explicit at the call site.

use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::{Shake128, Shake256};

/// Absorb `parts` in order into SHAKE-256 and fill `out`.
pub fn shake256(out: &mut [u8], parts: &[&[u8]]) {
	let mut reader = shake256_xof(parts);
	reader.read(out);
}

/// Absorb `parts` in order into SHAKE-256 and return the squeeze reader.
pub fn shake256_xof(parts: &[&[u8]]) -> impl XofReader {
	let mut hasher = Shake256::default();
	for part in parts {
		hasher.update(part);
	}
	hasher.finalize_xof()
}

/// Absorb `parts` in order into SHAKE-128 and return the squeeze reader.
pub fn shake128_xof(parts: &[&[u8]]) -> impl XofReader {
	let mut hasher = Shake128::default();
	for part in parts {
		hasher.update(part);
	}
	hasher.finalize_xof()
}
