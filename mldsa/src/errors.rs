//! Error type for the byte codecs.

use core::fmt;

/// Errors raised while decoding packed polynomials, keys or signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
	/// A packed coefficient decoded to a value outside [0, q).
	CoefficientOutOfRange,
	/// The hint encoding violates the FIPS 204 validity rules.
	InvalidHint,
	/// The input buffer has the wrong length for this parameter set.
	InvalidLength {
		/// Expected byte length.
		expected: usize,
		/// Actual byte length.
		actual: usize,
	},
}

impl fmt::Display for CodecError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CodecError::CoefficientOutOfRange => {
				write!(f, "packed coefficient out of range [0, q)")
			},
			CodecError::InvalidHint => write!(f, "malformed hint encoding"),
			CodecError::InvalidLength { expected, actual } => {
				write!(f, "invalid buffer length: expected {}, got {}", expected, actual)
			},
		}
	}
}

impl std::error::Error for CodecError {}
