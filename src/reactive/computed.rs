use std::cell::{Cell, Ref, RefCell};
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::{Rc, Weak};

use crate::reactive::addr::WeakAddr;
use crate::reactive::dependencies::Dependencies;
use crate::reactive::{
	Derived, Evaluation, Hashed, Invalid, InvalidOnUnwind, Observable, State, Version,
};

/// A cached derivation. The function runs once on construction and then
/// again only when something it read has changed and the value is asked for.
pub struct Computed<T>
where
	T: Hash + 'static,
{
	body: Rc<ComputedBody<T>>,
}

impl<T> Clone for Computed<T>
where
	T: Hash + 'static,
{
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

struct ComputedBody<T>
where
	T: Hash + 'static,
{
	value: RefCell<Hashed<T>>,
	state: Cell<State>,
	used_by: RefCell<BTreeSet<WeakAddr<dyn Derived>>>,
	inner: RefCell<ComputedInner<T>>,
	this: Weak<ComputedBody<T>>,
}

struct ComputedInner<T> {
	func: Box<dyn Fn(&Evaluation) -> T>,
	dependencies: Dependencies,
}

impl<T> Drop for ComputedBody<T>
where
	T: Hash + 'static,
{
	fn drop(&mut self) {
		let parent = self.this.clone() as Weak<dyn Derived>;
		self.inner.get_mut().dependencies.release(&parent);
	}
}

impl<T> Computed<T>
where
	T: Hash + 'static,
{
	pub fn new(func: Box<dyn Fn(&Evaluation) -> T>) -> Self {
		Computed {
			body: Rc::new_cyclic(|this: &Weak<ComputedBody<T>>| {
				let eval = Evaluation::new(this.clone() as Weak<dyn Derived>);
				let value = func(&eval);
				ComputedBody {
					value: RefCell::new(Hashed::new(value)),
					state: Cell::new(State::Valid),
					used_by: RefCell::new(BTreeSet::new()),
					inner: RefCell::new(ComputedInner {
						func,
						dependencies: eval.take(),
					}),
					this: this.clone(),
				}
			}),
		}
	}

	#[inline]
	pub fn get_once(&self) -> Ref<'_, T> {
		self.body.refresh();
		Ref::map(self.body.value.borrow(), |v| &v.value)
	}

	pub fn get(&self, eval: &impl AsRef<Evaluation>) -> Ref<'_, T> {
		self.body.refresh();
		let value = self.body.value.borrow();
		eval.as_ref()
			.track(self.body.clone() as Rc<dyn Observable>, value.version());
		Ref::map(value, |v| &v.value)
	}

	pub fn is_valid(&self) -> bool {
		self.body.state.get() == State::Valid
	}

	/// Number of live derivations and reactions reading this value.
	pub fn observer_count(&self) -> usize {
		self.body
			.used_by
			.borrow()
			.iter()
			.filter(|d| d.strong_count() > 0)
			.count()
	}

	pub fn dependency_count(&self) -> usize {
		self.body.inner.borrow().dependencies.len()
	}

	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}
}

impl<T> ComputedBody<T>
where
	T: Hash + 'static,
{
	fn refresh(&self) {
		let is_valid = match self.state.get() {
			State::Valid => true,
			State::Invalid(Invalid::Definitely) => false,
			State::Invalid(Invalid::Maybe) => self.inner.borrow().dependencies.are_valid(),
		};

		if is_valid {
			self.state.set(State::Valid);
			return;
		}

		let Ok(mut inner) = self.inner.try_borrow_mut() else {
			tracing::warn!("computed value read while it is being evaluated");
			return;
		};
		let parent = self.this.clone() as Weak<dyn Derived>;
		let eval = Evaluation::new(parent.clone());
		self.state.set(State::Valid);
		let _guard = InvalidOnUnwind(&self.state);
		let value = (inner.func)(&eval);
		inner.dependencies.swap(eval.take(), &parent);
		drop(inner);

		// A reader may still hold the previous value. Keep it and stay
		// invalid so the next read evaluates again.
		match self.value.try_borrow_mut() {
			Ok(mut slot) => *slot = Hashed::new(value),
			Err(_) => {
				tracing::warn!("computed value is borrowed, deferring the store");
				self.state.set(State::Invalid(Invalid::Definitely));
			}
		}
	}
}

impl<T> Observable for ComputedBody<T>
where
	T: Hash + 'static,
{
	fn update(&self) -> Version {
		self.refresh();
		self.version()
	}

	fn version(&self) -> Version {
		self.value.borrow().version()
	}

	fn used_by(&self, derived: Weak<dyn Derived>) {
		self.used_by.borrow_mut().insert(WeakAddr::new(derived));
	}

	fn not_used_by(&self, derived: &Weak<dyn Derived>) {
		self.used_by
			.borrow_mut()
			.remove(&WeakAddr::new(derived.clone()));
	}
}

impl<T> Derived for ComputedBody<T>
where
	T: Hash + 'static,
{
	fn invalidate(self: Rc<Self>, invalid: Invalid) {
		let mut state = self.state.get();
		let propagate = state.invalidate(invalid);
		self.state.set(state);
		if !propagate {
			return;
		}

		let live: Vec<Rc<dyn Derived>> = self
			.used_by
			.borrow()
			.iter()
			.filter_map(|d| d.upgrade())
			.collect();

		for item in live {
			item.invalidate(Invalid::Maybe);
		}
	}
}

impl<T> Debug for Computed<T>
where
	T: Hash + Debug + 'static,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.get_once().fmt(f)
	}
}
