//! Serde helpers for large arrays, polynomial vectors, and share tables.
//!
//! Serde only supports arrays up to 32 elements by default. These helpers
//! provide serialization for larger fixed-size arrays and for the protocol's
//! polynomial containers.

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Serde support for fixed-size byte arrays larger than 32 bytes.
#[cfg(feature = "serde")]
pub mod serde_byte_array {
	use super::*;

	pub fn serialize<S, const N: usize>(arr: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		arr.as_slice().serialize(serializer)
	}

	pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
	where
		D: Deserializer<'de>,
	{
		let vec: Vec<u8> = Vec::deserialize(deserializer)?;
		if vec.len() != N {
			return Err(serde::de::Error::custom(format!(
				"expected {} bytes, got {}",
				N,
				vec.len()
			)));
		}
		let mut arr = [0u8; N];
		arr.copy_from_slice(&vec);
		Ok(arr)
	}
}

/// Serde support for `PolyVec` (serialized as `Vec<Vec<i32>>`).
#[cfg(feature = "serde")]
pub mod serde_poly_vec {
	use super::*;
	use permafrost_mldsa::{Poly, PolyVec};

	pub fn serialize<S>(pv: &PolyVec, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let vec_of_vecs: Vec<Vec<i32>> = pv.vec.iter().map(|p| p.coeffs.to_vec()).collect();
		vec_of_vecs.serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<PolyVec, D::Error>
	where
		D: Deserializer<'de>,
	{
		let vec_of_vecs: Vec<Vec<i32>> = Vec::deserialize(deserializer)?;
		let polys = vec_of_vecs
			.into_iter()
			.map(|v| {
				if v.len() != 256 {
					return Err(serde::de::Error::custom(format!(
						"expected 256 coefficients, got {}",
						v.len()
					)));
				}
				let mut p = Poly::zero();
				p.coeffs.copy_from_slice(&v);
				Ok(p)
			})
			.collect::<Result<Vec<Poly>, D::Error>>()?;
		Ok(PolyVec { vec: polys })
	}
}

/// Serde support for `ShareTable<T>` (serialized as `Vec<(u16, T)>`).
#[cfg(feature = "serde")]
pub mod serde_share_table {
	use super::*;
	use crate::share_table::ShareTable;

	pub fn serialize<S, T>(table: &ShareTable<T>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
		T: Serialize,
	{
		let vec: Vec<(u16, &T)> = table.iter().collect();
		vec.serialize(serializer)
	}

	pub fn deserialize<'de, D, T>(deserializer: D) -> Result<ShareTable<T>, D::Error>
	where
		D: Deserializer<'de>,
		T: Deserialize<'de>,
	{
		let vec: Vec<(u16, T)> = Vec::deserialize(deserializer)?;
		let mut table = ShareTable::new();
		for (mask, value) in vec {
			if mask >= 64 {
				return Err(serde::de::Error::custom(format!(
					"subset mask {} out of range",
					mask
				)));
			}
			if table.insert(mask, value).is_some() {
				return Err(serde::de::Error::custom(format!(
					"duplicate subset mask {}",
					mask
				)));
			}
		}
		Ok(table)
	}
}
