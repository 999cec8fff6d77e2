use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::reactive::batch::{batch_run, enqueue, in_batch};
use crate::reactive::dependencies::Dependencies;
use crate::reactive::{Derived, Evaluation, Invalid, State};

pub trait Reactive {
	fn update(&self);
}

/// A side effect that re-runs whenever something it read has changed.
///
/// Re-runs are queued by the batch that caused the change and happen when
/// the outermost batch ends. Dropping the last handle or calling
/// [`Reaction::dispose`] unsubscribes it from everything it read.
#[derive(Clone)]
pub struct Reaction {
	body: Rc<ReactionBody>,
}

struct ReactionBody {
	name: &'static str,
	state: Cell<State>,
	disposed: Cell<bool>,
	inner: RefCell<ReactionInner>,
	this: Weak<ReactionBody>,
}

struct ReactionInner {
	func: Box<dyn Fn(&Evaluation)>,
	dependencies: Dependencies,
}

impl Drop for ReactionBody {
	fn drop(&mut self) {
		let parent = self.this.clone() as Weak<dyn Derived>;
		self.inner.get_mut().dependencies.release(&parent)
	}
}

impl Reaction {
	#[must_use]
	pub fn new(func: Box<dyn Fn(&Evaluation)>) -> Self {
		Self::new_with_name("<unnamed>", func)
	}

	#[must_use]
	pub fn new_with_name(name: &'static str, func: Box<dyn Fn(&Evaluation)>) -> Self {
		Reaction {
			body: Rc::new_cyclic(|this| ReactionBody {
				name,
				state: Cell::new(State::Invalid(Invalid::Definitely)),
				disposed: Cell::new(false),
				inner: RefCell::new(ReactionInner {
					func,
					dependencies: Dependencies::new(),
				}),
				this: this.clone(),
			}),
		}
	}

	/// Create the reaction and run it once, synchronously.
	#[must_use]
	pub fn subscribe(name: &'static str, func: Box<dyn Fn(&Evaluation)>) -> Self {
		let reaction = Self::new_with_name(name, func);
		reaction.update();
		reaction
	}

	pub fn update(&self) {
		self.body.update();
	}

	pub fn name(&self) -> &'static str {
		self.body.name
	}

	/// Unsubscribe from every dependency. Returns `false` if the reaction
	/// was already disposed. Safe to call from inside the reaction itself;
	/// the release then happens as soon as the current run returns.
	pub fn dispose(&self) -> bool {
		if self.body.disposed.replace(true) {
			return false;
		}

		if let Ok(mut inner) = self.body.inner.try_borrow_mut() {
			let parent = self.body.this.clone() as Weak<dyn Derived>;
			inner.dependencies.release(&parent);
			inner.func = Box::new(|_: &Evaluation| {});
		}

		true
	}

	pub fn is_disposed(&self) -> bool {
		self.body.disposed.get()
	}

	pub fn dependency_count(&self) -> usize {
		self.body
			.inner
			.try_borrow()
			.map(|inner| inner.dependencies.len())
			.unwrap_or_default()
	}

	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}
}

impl Reactive for ReactionBody {
	fn update(&self) {
		if self.disposed.get() {
			return;
		}

		let is_valid = match self.state.get() {
			State::Valid => true,
			State::Invalid(Invalid::Definitely) => false,
			State::Invalid(Invalid::Maybe) => self
				.inner
				.try_borrow()
				.map(|inner| inner.dependencies.are_valid())
				.unwrap_or(false),
		};

		if is_valid {
			self.state.set(State::Valid);
			return;
		}

		let Ok(mut inner) = self.inner.try_borrow_mut() else {
			tracing::warn!(reaction = self.name, "reaction is already running");
			return;
		};

		let parent = self.this.clone() as Weak<dyn Derived>;
		let eval = Evaluation::new(parent.clone());
		self.state.set(State::Valid);
		(inner.func)(&eval);

		if self.disposed.get() {
			eval.take().release(&parent);
			inner.dependencies.release(&parent);
			inner.func = Box::new(|_: &Evaluation| {});
		} else {
			inner.dependencies.swap(eval.take(), &parent);
		}
	}
}

impl Derived for ReactionBody {
	fn invalidate(self: Rc<Self>, invalid: Invalid) {
		if self.disposed.get() {
			return;
		}

		let mut state = self.state.get();
		let fresh = state.invalidate(invalid);
		self.state.set(state);

		if fresh {
			enqueue(Rc::downgrade(&self) as Weak<dyn Reactive>);
			if !in_batch() {
				batch_run();
			}
		}
	}
}

impl std::fmt::Debug for Reaction {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Reaction")
			.field("name", &self.body.name)
			.field("disposed", &self.body.disposed.get())
			.finish()
	}
}
