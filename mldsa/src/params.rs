//! Parameter sets for the three ML-DSA security levels.

/// Constants shared by every ML-DSA variant.
pub mod common {
	/// Ring dimension.
	pub const N: usize = 256;

	/// Modulus q = 2²³ - 2¹³ + 1.
	pub const Q: i32 = 8_380_417;

	/// Number of bits in q.
	pub const Q_BITS: usize = 23;

	/// Dropped bits in Power2Round.
	pub const D: usize = 13;

	/// Size of key-generation seeds.
	pub const SEED_SIZE: usize = 32;

	/// Size of the public key hash tr.
	pub const TR_SIZE: usize = 64;

	/// Size of the message digest μ.
	pub const MU_SIZE: usize = 64;

	/// Size of one t1 polynomial packed at 10 bits per coefficient.
	pub const POLY_T1_SIZE: usize = 320;

	/// Size of one full-range polynomial packed at 23 bits per coefficient.
	pub const POLY_Q_SIZE: usize = (N * Q_BITS) / 8;
}

/// Security level selector, named after the FIPS 204 parameter sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SecurityLevel {
	/// ML-DSA-44 (NIST category 2).
	MlDsa44,
	/// ML-DSA-65 (NIST category 3).
	MlDsa65,
	/// ML-DSA-87 (NIST category 5).
	MlDsa87,
}

impl SecurityLevel {
	/// The full parameter set for this level.
	pub fn params(self) -> &'static ParamSet {
		match self {
			SecurityLevel::MlDsa44 => &MLDSA44,
			SecurityLevel::MlDsa65 => &MLDSA65,
			SecurityLevel::MlDsa87 => &MLDSA87,
		}
	}
}

/// One ML-DSA parameter set, per FIPS 204 table 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSet {
	/// Parameter set name.
	pub name: &'static str,
	/// Rows of the matrix A (length of t, w and s2).
	pub k: usize,
	/// Columns of the matrix A (length of y, z and s1).
	pub l: usize,
	/// Secret coefficient bound η.
	pub eta: i32,
	/// Number of ±1 coefficients in the challenge.
	pub tau: usize,
	/// Maximum hint weight ω.
	pub omega: usize,
	/// γ₁ = 2^gamma1_bits.
	pub gamma1_bits: usize,
	/// Low-order rounding range γ₂.
	pub gamma2: i32,
	/// Size of the challenge hash c̃ in bytes.
	pub c_tilde_size: usize,
}

impl ParamSet {
	/// γ₁, the response coefficient range.
	pub const fn gamma1(&self) -> i32 {
		1 << self.gamma1_bits
	}

	/// β = τ·η, the maximum coefficient of c·s.
	pub const fn beta(&self) -> i32 {
		self.tau as i32 * self.eta
	}

	/// Size of one z polynomial packed at γ₁-width (gamma1_bits + 1 bits).
	pub const fn poly_z_size(&self) -> usize {
		(self.gamma1_bits + 1) * common::N / 8
	}

	/// Size of one w1 polynomial in the W1Encode layout.
	pub const fn poly_w1_size(&self) -> usize {
		if self.gamma2 == (common::Q - 1) / 32 {
			common::N / 2 // 4 bits per coefficient
		} else {
			common::N * 6 / 8 // 6 bits per coefficient
		}
	}

	/// Packed public key size: ρ plus k t1 polynomials.
	pub const fn public_key_size(&self) -> usize {
		common::SEED_SIZE + common::POLY_T1_SIZE * self.k
	}

	/// Packed signature size: c̃, l z polynomials, and the hint encoding.
	pub const fn signature_size(&self) -> usize {
		self.c_tilde_size + self.l * self.poly_z_size() + self.omega + self.k
	}

	/// Size of one party's per-iteration commitment (k polynomials, 23-bit).
	pub const fn commitment_size(&self) -> usize {
		self.k * common::POLY_Q_SIZE
	}

	/// Size of one party's per-iteration response (l polynomials, 23-bit).
	pub const fn response_size(&self) -> usize {
		self.l * common::POLY_Q_SIZE
	}
}

/// ML-DSA-44 parameters.
pub static MLDSA44: ParamSet = ParamSet {
	name: "ML-DSA-44",
	k: 4,
	l: 4,
	eta: 2,
	tau: 39,
	omega: 80,
	gamma1_bits: 17,
	gamma2: (common::Q - 1) / 88,
	c_tilde_size: 32,
};

/// ML-DSA-65 parameters.
pub static MLDSA65: ParamSet = ParamSet {
	name: "ML-DSA-65",
	k: 6,
	l: 5,
	eta: 4,
	tau: 49,
	omega: 55,
	gamma1_bits: 19,
	gamma2: (common::Q - 1) / 32,
	c_tilde_size: 48,
};

/// ML-DSA-87 parameters.
pub static MLDSA87: ParamSet = ParamSet {
	name: "ML-DSA-87",
	k: 8,
	l: 7,
	eta: 2,
	tau: 60,
	omega: 75,
	gamma1_bits: 19,
	gamma2: (common::Q - 1) / 32,
	c_tilde_size: 64,
};

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fips204_sizes() {
		assert_eq!(MLDSA44.public_key_size(), 1312);
		assert_eq!(MLDSA65.public_key_size(), 1952);
		assert_eq!(MLDSA87.public_key_size(), 2592);

		assert_eq!(MLDSA44.signature_size(), 2420);
		assert_eq!(MLDSA65.signature_size(), 3309);
		assert_eq!(MLDSA87.signature_size(), 4627);
	}

	#[test]
	fn derived_constants() {
		assert_eq!(MLDSA44.gamma1(), 131072);
		assert_eq!(MLDSA44.gamma2, 95232);
		assert_eq!(MLDSA44.beta(), 78);
		assert_eq!(MLDSA44.poly_z_size(), 576);
		assert_eq!(MLDSA44.poly_w1_size(), 192);

		assert_eq!(MLDSA65.beta(), 196);
		assert_eq!(MLDSA87.gamma1(), 524288);
		assert_eq!(MLDSA87.gamma2, 261888);
		assert_eq!(MLDSA87.poly_w1_size(), 128);
		assert_eq!(MLDSA87.poly_z_size(), 640);
	}

	#[test]
	fn commitment_sizes_use_full_width_packing() {
		assert_eq!(common::POLY_Q_SIZE, 736);
		assert_eq!(MLDSA44.commitment_size(), 4 * 736);
		assert_eq!(MLDSA87.response_size(), 7 * 736);
	}
}
