//! Threshold configuration and the calibrated per-(t, n, level) constants.

use permafrost_mldsa::{ParamSet, SecurityLevel};

use crate::error::{validate_threshold_params, ThresholdError, ThresholdResult};

/// Maximum number of full round1-to-combine attempts before signing fails.
pub const MAX_SIGN_ATTEMPTS: u32 = 500;

/// Calibrated constants for one (t, n, level) combination.
///
/// `r` bounds the rejection check on a party's masked response, `r_prime` is
/// the hyperball sampling radius, and `k_iterations` parallel attempts per
/// round give the protocol a high per-round success probability. The values
/// are empirically derived; unlisted combinations are unsupported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdParams {
	/// Number of parallel signing attempts per protocol round.
	pub k_iterations: u32,
	/// Scaling factor applied to the s1 block of hyperball samples.
	pub nu: f64,
	/// Rejection bound on the masked response norm.
	pub r: f64,
	/// Hyperball sampling radius.
	pub r_prime: f64,
}

const NU: f64 = 3.0;

const fn entry(k_iterations: u32, r: f64, r_prime: f64) -> ThresholdParams {
	ThresholdParams { k_iterations, nu: NU, r, r_prime }
}

fn lookup_params(t: u8, n: u8, level: SecurityLevel) -> Option<ThresholdParams> {
	let p = match level {
		SecurityLevel::MlDsa44 => match (t, n) {
			(2, 2) => entry(2, 252_778.0, 252_833.0),
			(2, 3) => entry(3, 310_060.0, 310_138.0),
			(3, 3) => entry(4, 246_490.0, 246_546.0),
			(3, 5) => entry(14, 282_800.0, 282_912.0),
			(4, 5) => entry(30, 259_427.0, 259_526.0),
			(4, 6) => entry(74, 268_705.0, 268_831.0),
			(5, 6) => entry(100, 250_590.0, 250_686.0),
			(6, 6) => entry(37, 219_245.0, 219_301.0),
			_ => return None,
		},
		SecurityLevel::MlDsa65 => match (t, n) {
			(2, 2) => entry(2, 344_000.0, 344_080.0),
			(2, 3) => entry(3, 421_700.0, 421_810.0),
			(3, 3) => entry(4, 335_200.0, 335_290.0),
			(3, 5) => entry(14, 384_600.0, 384_750.0),
			(5, 6) => entry(100, 340_700.0, 340_830.0),
			(6, 6) => entry(37, 298_000.0, 298_080.0),
			_ => return None,
		},
		SecurityLevel::MlDsa87 => match (t, n) {
			(2, 2) => entry(3, 503_119.0, 503_192.0),
			(2, 3) => entry(4, 631_601.0, 631_703.0),
			(3, 3) => entry(6, 483_107.0, 483_180.0),
			(2, 4) => entry(4, 632_903.0, 633_006.0),
			(3, 4) => entry(11, 551_752.0, 551_854.0),
			(4, 4) => entry(14, 487_958.0, 488_031.0),
			(2, 5) => entry(5, 607_694.0, 607_820.0),
			(3, 5) => entry(26, 577_400.0, 577_546.0),
			(4, 5) => entry(70, 518_384.0, 518_510.0),
			(5, 5) => entry(35, 468_214.0, 468_287.0),
			(2, 6) => entry(5, 665_106.0, 665_232.0),
			(3, 6) => entry(39, 577_541.0, 577_704.0),
			(4, 6) => entry(208, 517_689.0, 517_853.0),
			(5, 6) => entry(295, 479_692.0, 479_819.0),
			(6, 6) => entry(87, 424_124.0, 424_197.0),
			_ => return None,
		},
	};
	Some(p)
}

/// Configuration for one threshold signing group.
///
/// Immutable once constructed; carries the (t, n) shape, the ML-DSA security
/// level, and the calibrated signing constants for that combination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdConfig {
	threshold: u8,
	parties: u8,
	level: SecurityLevel,
	params: ThresholdParams,
}

impl ThresholdConfig {
	/// Create a configuration for t-of-n signing at the given level.
	///
	/// Fails when 2 ≤ t ≤ n ≤ 6 does not hold or when no calibrated
	/// constants exist for the combination at this level.
	pub fn new(t: u8, n: u8, level: SecurityLevel) -> ThresholdResult<Self> {
		validate_threshold_params(t, n)?;
		let params = lookup_params(t, n, level).ok_or(ThresholdError::UnsupportedParameterSet {
			threshold: t,
			parties: n,
			level: level.params().name,
		})?;
		Ok(Self { threshold: t, parties: n, level, params })
	}

	/// The threshold t.
	pub fn threshold(&self) -> u8 {
		self.threshold
	}

	/// The total number of parties n.
	pub fn total_parties(&self) -> u8 {
		self.parties
	}

	/// The security level.
	pub fn level(&self) -> SecurityLevel {
		self.level
	}

	/// The ML-DSA parameter set for this level.
	pub fn param_set(&self) -> &'static ParamSet {
		self.level.params()
	}

	/// The calibrated threshold constants.
	pub fn threshold_params(&self) -> &ThresholdParams {
		&self.params
	}

	/// Number of parallel signing attempts per round.
	pub fn k_iterations(&self) -> u32 {
		self.params.k_iterations
	}

	/// Wire size of one party's round-2 commitment reveal.
	pub fn commitment_wire_size(&self) -> usize {
		self.params.k_iterations as usize * self.param_set().commitment_size()
	}

	/// Wire size of one party's round-3 response.
	pub fn response_wire_size(&self) -> usize {
		self.params.k_iterations as usize * self.param_set().response_size()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn level_87_supports_all_shapes() {
		for n in 2..=6u8 {
			for t in 2..=n {
				let config = ThresholdConfig::new(t, n, SecurityLevel::MlDsa87).unwrap();
				assert!(config.k_iterations() >= 2);
				assert_eq!(config.threshold_params().nu, 3.0);
			}
		}
	}

	#[test]
	fn lower_levels_reject_uncalibrated_shapes() {
		assert!(ThresholdConfig::new(2, 3, SecurityLevel::MlDsa44).is_ok());
		assert!(matches!(
			ThresholdConfig::new(2, 4, SecurityLevel::MlDsa44),
			Err(ThresholdError::UnsupportedParameterSet { .. })
		));
		assert!(matches!(
			ThresholdConfig::new(4, 5, SecurityLevel::MlDsa65),
			Err(ThresholdError::UnsupportedParameterSet { .. })
		));
	}

	#[test]
	fn shape_validation_comes_first() {
		assert!(matches!(
			ThresholdConfig::new(1, 3, SecurityLevel::MlDsa87),
			Err(ThresholdError::InvalidParameters { .. })
		));
		assert!(ThresholdConfig::new(3, 7, SecurityLevel::MlDsa87).is_err());
	}

	#[test]
	fn wire_sizes_scale_with_iterations() {
		let config = ThresholdConfig::new(2, 3, SecurityLevel::MlDsa44).unwrap();
		// 3 iterations, k = l = 4 polynomials of 736 bytes.
		assert_eq!(config.commitment_wire_size(), 3 * 4 * 736);
		assert_eq!(config.response_wire_size(), 3 * 4 * 736);
	}
}
