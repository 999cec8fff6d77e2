use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::reactive::dependencies::Dependencies;
use crate::reactive::{Derived, Observable, Version};

/// Tracking context handed to a derivation while it runs. Every tracked
/// read records itself here and subscribes `parent` to the source.
pub struct Evaluation {
	dependencies: RefCell<Dependencies>,
	parent: Weak<dyn Derived>,
}

impl AsRef<Evaluation> for Evaluation {
	fn as_ref(&self) -> &Evaluation {
		self
	}
}

impl Evaluation {
	pub fn new(parent: Weak<dyn Derived>) -> Self {
		Evaluation {
			parent,
			dependencies: RefCell::new(Dependencies::new()),
		}
	}

	pub(crate) fn track(&self, observable: Rc<dyn Observable>, version: Version) {
		observable.used_by(self.parent.clone());
		self.dependencies
			.borrow_mut()
			.based_on(observable, version);
	}

	pub fn take(self) -> Dependencies {
		self.dependencies.into_inner()
	}
}
