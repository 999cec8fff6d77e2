use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use crate::reactive::addr::RcAddr;
use crate::reactive::{Derived, Observable, Version};

/// Everything a derivation read during its last evaluation, together
/// with the version it saw.
#[derive(Default)]
pub struct Dependencies {
	based_on: BTreeMap<RcAddr<dyn Observable>, Version>,
}

impl Dependencies {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.based_on.len()
	}

	pub fn is_empty(&self) -> bool {
		self.based_on.is_empty()
	}

	/// Unsubscribe `parent` from every observable and forget them.
	pub fn release(&mut self, parent: &Weak<dyn Derived>) {
		for (item, _) in std::mem::take(&mut self.based_on) {
			item.not_used_by(parent)
		}
	}

	pub fn based_on(&mut self, observable: Rc<dyn Observable>, version: Version) {
		self.based_on.insert(RcAddr::new(observable), version);
	}

	pub fn are_valid(&self) -> bool {
		self.based_on
			.iter()
			.all(|(base, version)| base.update() == *version)
	}

	pub fn swap(&mut self, next: Dependencies, parent: &Weak<dyn Derived>) {
		let prev = std::mem::replace(&mut self.based_on, next.based_on);

		prev.keys()
			.filter(|k| !self.based_on.contains_key(k))
			.for_each(|k| k.not_used_by(parent));
	}
}
