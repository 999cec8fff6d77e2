use std::fmt::Debug;
use std::hash::Hash;
use std::ops::Deref;

use crate::reactive::Version;

/// A value stored next to its `fxhash`. The hash doubles as the version
/// observers compare against.
pub struct Hashed<T> {
	pub value: T,
	pub hash: u64,
}

impl<T> Hashed<T> {
	pub fn new(value: T) -> Self
	where
		T: Hash,
	{
		let hash = fxhash::hash64(&value);
		Self { value, hash }
	}

	/// Recompute the hash after an in-place edit. Returns `true` if it moved.
	pub fn rehash(&mut self) -> bool
	where
		T: Hash,
	{
		let hash = fxhash::hash64(&self.value);
		let changed = hash != self.hash;
		self.hash = hash;
		changed
	}

	pub fn version(&self) -> Version {
		Version::Hash(self.hash)
	}
}

impl<T> Deref for Hashed<T> {
	type Target = T;
	fn deref(&self) -> &Self::Target {
		&self.value
	}
}

impl<T> Debug for Hashed<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.value.fmt(f)
	}
}
