//! Error types for threshold ML-DSA operations.

use core::fmt;

use permafrost_mldsa::CodecError;

/// Result type for threshold operations.
pub type ThresholdResult<T> = Result<T, ThresholdError>;

/// Error types for threshold operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThresholdError {
	/// Invalid threshold parameters (t, n).
	InvalidParameters {
		/// Threshold value.
		threshold: u8,
		/// Total number of parties.
		parties: u8,
		/// Description of the validation error.
		reason: &'static str,
	},
	/// The (t, n) pair has no calibrated constants at this security level.
	UnsupportedParameterSet {
		/// Threshold value.
		threshold: u8,
		/// Total number of parties.
		parties: u8,
		/// Security level name.
		level: &'static str,
	},
	/// Invalid party ID.
	InvalidPartyId {
		/// The invalid party ID.
		party_id: u8,
		/// Maximum valid party ID.
		max_id: u8,
	},
	/// The active signer set does not have exactly t members.
	WrongActiveSetSize {
		/// Number of parties provided.
		provided: usize,
		/// Required threshold.
		required: u8,
	},
	/// A revealed commitment does not match the hash broadcast in round 1.
	CommitmentMismatch {
		/// Party ID whose reveal failed verification.
		party_id: u8,
	},
	/// Invalid commitment size.
	InvalidCommitmentSize {
		/// Expected size.
		expected: usize,
		/// Actual size.
		actual: usize,
	},
	/// Invalid response size.
	InvalidResponseSize {
		/// Expected size.
		expected: usize,
		/// Actual size.
		actual: usize,
	},
	/// Context too long (must be ≤ 255 bytes).
	ContextTooLong {
		/// Length provided.
		length: usize,
	},
	/// No iteration passed the public checks in the combine step.
	CombinationFailed,
	/// A packed polynomial failed to decode.
	Codec(CodecError),
	/// Invalid state for the requested operation.
	InvalidState {
		/// Current state description.
		current: &'static str,
		/// Expected state description.
		expected: &'static str,
	},
	/// Missing broadcast or private message from a party.
	MissingBroadcast {
		/// Party ID that is missing.
		party_id: u8,
	},
	/// Duplicate broadcast from a party.
	DuplicateBroadcast {
		/// Party ID that sent the duplicate.
		party_id: u8,
	},
	/// Signing gave up after the maximum number of full protocol attempts.
	SigningExhausted {
		/// Attempts made before giving up.
		attempts: u32,
	},
	/// DKG commitment hash mismatch.
	DkgCommitmentMismatch {
		/// Party ID with mismatched commitment.
		party_id: u8,
	},
	/// DKG contribution missing for a bitmask this party must hold.
	DkgMissingContribution {
		/// Party ID whose contribution is missing.
		party_id: u8,
		/// Bitmask the contribution was expected for.
		mask: u16,
	},
}

impl fmt::Display for ThresholdError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ThresholdError::InvalidParameters { threshold, parties, reason } => {
				write!(
					f,
					"Invalid threshold parameters: t={}, n={}, reason: {}",
					threshold, parties, reason
				)
			},
			ThresholdError::UnsupportedParameterSet { threshold, parties, level } => {
				write!(f, "No calibrated parameters for {}-of-{} at {}", threshold, parties, level)
			},
			ThresholdError::InvalidPartyId { party_id, max_id } => {
				write!(f, "Invalid party ID: {} (max: {})", party_id, max_id)
			},
			ThresholdError::WrongActiveSetSize { provided, required } => {
				write!(f, "Active signer set has {} parties, need exactly {}", provided, required)
			},
			ThresholdError::CommitmentMismatch { party_id } => {
				write!(f, "Commitment verification failed for party {}", party_id)
			},
			ThresholdError::InvalidCommitmentSize { expected, actual } => {
				write!(f, "Invalid commitment size: expected {}, got {}", expected, actual)
			},
			ThresholdError::InvalidResponseSize { expected, actual } => {
				write!(f, "Invalid response size: expected {}, got {}", expected, actual)
			},
			ThresholdError::ContextTooLong { length } => {
				write!(f, "Context too long: {} bytes (max: 255)", length)
			},
			ThresholdError::CombinationFailed => {
				write!(f, "Signature combination failed, retry from round 1")
			},
			ThresholdError::Codec(e) => write!(f, "Codec error: {}", e),
			ThresholdError::InvalidState { current, expected } => {
				write!(f, "Invalid signer state: currently {}, expected {}", current, expected)
			},
			ThresholdError::MissingBroadcast { party_id } => {
				write!(f, "Missing message from party {}", party_id)
			},
			ThresholdError::DuplicateBroadcast { party_id } => {
				write!(f, "Duplicate message from party {}", party_id)
			},
			ThresholdError::SigningExhausted { attempts } => {
				write!(f, "Could not produce a signature after {} attempts", attempts)
			},
			ThresholdError::DkgCommitmentMismatch { party_id } => {
				write!(f, "DKG commitment mismatch for party {}", party_id)
			},
			ThresholdError::DkgMissingContribution { party_id, mask } => {
				write!(f, "DKG contribution from party {} missing for subset {:#08b}", party_id, mask)
			},
		}
	}
}

impl std::error::Error for ThresholdError {}

impl From<CodecError> for ThresholdError {
	fn from(e: CodecError) -> Self {
		ThresholdError::Codec(e)
	}
}

/// Maximum number of parties supported by the threshold scheme.
pub const MAX_PARTIES: u8 = 6;

/// Minimum threshold value.
pub const MIN_THRESHOLD: u8 = 2;

/// Validate threshold parameters.
pub fn validate_threshold_params(t: u8, n: u8) -> ThresholdResult<()> {
	if t < MIN_THRESHOLD {
		return Err(ThresholdError::InvalidParameters {
			threshold: t,
			parties: n,
			reason: "threshold must be at least 2",
		});
	}

	if n > MAX_PARTIES {
		return Err(ThresholdError::InvalidParameters {
			threshold: t,
			parties: n,
			reason: "too many parties (max 6)",
		});
	}

	if t > n {
		return Err(ThresholdError::InvalidParameters {
			threshold: t,
			parties: n,
			reason: "threshold cannot exceed number of parties",
		});
	}

	Ok(())
}

/// Validate context length for ML-DSA.
pub fn validate_context(ctx: &[u8]) -> ThresholdResult<()> {
	if ctx.len() > 255 {
		return Err(ThresholdError::ContextTooLong { length: ctx.len() });
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn valid_threshold_params() {
		assert!(validate_threshold_params(2, 3).is_ok());
		assert!(validate_threshold_params(3, 5).is_ok());
		assert!(validate_threshold_params(6, 6).is_ok());
	}

	#[test]
	fn invalid_threshold_params() {
		// Threshold too small
		assert!(validate_threshold_params(1, 3).is_err());

		// Too many parties
		assert!(validate_threshold_params(3, 7).is_err());

		// Threshold exceeds parties
		assert!(validate_threshold_params(5, 3).is_err());
	}

	#[test]
	fn context_length_limits() {
		assert!(validate_context(b"").is_ok());
		assert!(validate_context(&[0u8; 255]).is_ok());
		assert!(validate_context(&[0u8; 256]).is_err());
	}
}
