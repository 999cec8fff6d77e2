mod addr;
mod batch;
mod computed;
mod dependencies;
mod evaluation;
mod hashed;
mod reaction;
mod var;

use std::cell::Cell;
use std::rc::{Rc, Weak};

pub use batch::{batch, in_batch};
pub use computed::Computed;
pub use dependencies::Dependencies;
pub use evaluation::Evaluation;
pub use hashed::Hashed;
pub use reaction::{Reaction, Reactive};
pub use var::Var;

pub trait Derived: 'static {
	fn invalidate(self: Rc<Self>, invalid: Invalid);
}

pub trait Observable: 'static {
	/// This function is called when we want
	/// this observable to recompute itself.
	fn update(&self) -> Version;

	/// This function should return the current
	/// computed version.
	fn version(&self) -> Version;

	/// Notify this observable that `derived` started
	/// to listen.
	fn used_by(&self, derived: Weak<dyn Derived>);

	/// Notify this observable that `derived` stopped
	/// to listen.
	fn not_used_by(&self, derived: &Weak<dyn Derived>);
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum State {
	Valid,
	Invalid(Invalid),
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Invalid {
	Maybe,
	Definitely,
}

impl State {
	/// Merge an incoming invalidation into the current state. Returns `true`
	/// when the node just left the valid state and its dependents must hear it.
	pub(crate) fn invalidate(&mut self, invalid: Invalid) -> bool {
		match *self {
			State::Valid => {
				*self = State::Invalid(invalid);
				true
			}
			State::Invalid(Invalid::Maybe) if invalid == Invalid::Definitely => {
				*self = State::Invalid(Invalid::Definitely);
				false
			}
			State::Invalid(_) => false,
		}
	}
}

/// Marks a node `Invalid(Definitely)` if its function unwinds, so the next
/// read runs it again instead of trusting a half-finished evaluation.
pub(crate) struct InvalidOnUnwind<'a>(pub(crate) &'a Cell<State>);

impl Drop for InvalidOnUnwind<'_> {
	fn drop(&mut self) {
		if std::thread::panicking() {
			self.0.set(State::Invalid(Invalid::Definitely));
		}
	}
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Version {
	Hash(u64),
}
