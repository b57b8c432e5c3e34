//! Fixed-capacity table keyed by signer-subset bitmask.
//!
//! With at most 6 parties every subset mask fits in 6 bits, so a flat array
//! of 64 slots replaces a hash map. Iteration order is the ascending mask
//! order the rest of the protocol relies on, with no per-lookup hashing and
//! no allocator churn in the hot path.

use zeroize::Zeroize;

/// Number of addressable subset masks for up to 6 parties.
const TABLE_SLOTS: usize = 64;

/// A map from subset bitmask to a per-subset value.
///
/// Masks above 63 are rejected by `insert` and absent for `get`.
#[derive(Clone)]
pub struct ShareTable<T> {
	slots: Box<[Option<T>; TABLE_SLOTS]>,
	len: usize,
}

impl<T> ShareTable<T> {
	/// Create an empty table.
	pub fn new() -> Self {
		Self { slots: Box::new(core::array::from_fn(|_| None)), len: 0 }
	}

	/// Number of entries stored.
	pub fn len(&self) -> usize {
		self.len
	}

	/// Whether the table holds no entries.
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Store `value` under `mask`, replacing any previous entry.
	///
	/// Returns the replaced value if one was present, `None` otherwise.
	/// Out-of-range masks are ignored and the value is dropped.
	pub fn insert(&mut self, mask: u16, value: T) -> Option<T> {
		let slot = match self.slots.get_mut(mask as usize) {
			Some(slot) => slot,
			None => return None,
		};
		let previous = slot.replace(value);
		if previous.is_none() {
			self.len += 1;
		}
		previous
	}

	/// Look up the entry for `mask`.
	pub fn get(&self, mask: u16) -> Option<&T> {
		self.slots.get(mask as usize).and_then(Option::as_ref)
	}

	/// Whether an entry exists for `mask`.
	pub fn contains(&self, mask: u16) -> bool {
		self.get(mask).is_some()
	}

	/// Iterate over `(mask, value)` pairs in ascending mask order.
	pub fn iter(&self) -> impl Iterator<Item = (u16, &T)> {
		self.slots
			.iter()
			.enumerate()
			.filter_map(|(mask, slot)| slot.as_ref().map(|v| (mask as u16, v)))
	}

	/// Iterate over the stored masks in ascending order.
	pub fn masks(&self) -> impl Iterator<Item = u16> + '_ {
		self.iter().map(|(mask, _)| mask)
	}
}

impl<T> Default for ShareTable<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Zeroize> Zeroize for ShareTable<T> {
	fn zeroize(&mut self) {
		for slot in self.slots.iter_mut() {
			if let Some(value) = slot.as_mut() {
				value.zeroize();
			}
			*slot = None;
		}
		self.len = 0;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn insert_and_lookup() {
		let mut table = ShareTable::new();
		assert!(table.is_empty());
		assert_eq!(table.insert(0b011, 7u32), None);
		assert_eq!(table.insert(0b101, 9u32), None);
		assert_eq!(table.len(), 2);
		assert_eq!(table.get(0b011), Some(&7));
		assert_eq!(table.get(0b100), None);
		assert!(table.contains(0b101));
	}

	#[test]
	fn replace_keeps_len() {
		let mut table = ShareTable::new();
		table.insert(5, 1u8);
		assert_eq!(table.insert(5, 2u8), Some(1));
		assert_eq!(table.len(), 1);
		assert_eq!(table.get(5), Some(&2));
	}

	#[test]
	fn iterates_in_ascending_mask_order() {
		let mut table = ShareTable::new();
		table.insert(0b110, 'c');
		table.insert(0b011, 'a');
		table.insert(0b101, 'b');
		let masks: Vec<u16> = table.masks().collect();
		assert_eq!(masks, vec![0b011, 0b101, 0b110]);
	}

	#[test]
	fn out_of_range_mask_rejected() {
		let mut table = ShareTable::new();
		assert_eq!(table.insert(64, 1u8), None);
		assert_eq!(table.len(), 0);
		assert_eq!(table.get(64), None);
	}

	#[test]
	fn zeroize_clears_entries() {
		let mut table = ShareTable::new();
		table.insert(3, [1u8; 4]);
		table.zeroize();
		assert!(table.is_empty());
		assert_eq!(table.get(3), None);
	}
}
