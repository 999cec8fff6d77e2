use std::cell::{Ref, RefCell};
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::{Rc, Weak};

use crate::reactive::addr::WeakAddr;
use crate::reactive::batch::batch;
use crate::reactive::{Computed, Derived, Evaluation, Hashed, Invalid, Observable, Version};

/// A mutable source of truth. Writes that change the value's hash
/// invalidate every derivation that read it.
pub struct Var<T> {
	body: Rc<VarBody<T>>,
}

struct VarBody<T> {
	value: RefCell<Hashed<T>>,
	used_by: RefCell<BTreeSet<WeakAddr<dyn Derived>>>,
}

impl<T> Clone for Var<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> Default for Var<T>
where
	T: Default + Hash + 'static,
{
	fn default() -> Self {
		Var::new(Default::default())
	}
}

impl<T> Var<T>
where
	T: 'static,
{
	pub fn new(value: T) -> Self
	where
		T: Hash,
	{
		Var {
			body: Rc::new(VarBody {
				value: RefCell::new(Hashed::new(value)),
				used_by: RefCell::new(BTreeSet::new()),
			}),
		}
	}

	pub fn map<F, R>(&self, func: F) -> Computed<R>
	where
		F: Fn(&T) -> R + 'static,
		R: Hash + 'static,
	{
		let this = self.clone();
		Computed::new(Box::new(move |ev: &Evaluation| {
			let value = this.get(ev);
			func(&value)
		}))
	}

	/// Tracked read: the running derivation will be invalidated by the
	/// next change.
	pub fn get(&self, eval: &impl AsRef<Evaluation>) -> Ref<'_, T> {
		let value = self.body.value.borrow();
		eval.as_ref()
			.track(self.body.clone() as Rc<dyn Observable>, value.version());
		Ref::map(value, |v| &v.value)
	}

	#[inline]
	pub fn get_once(&self) -> Ref<'_, T> {
		Ref::map(self.body.value.borrow(), |v| &v.value)
	}

	#[inline]
	pub fn set(&self, value: T)
	where
		T: Hash,
	{
		let _ = self.replace(value);
	}

	pub fn replace(&self, value: T) -> T
	where
		T: Hash,
	{
		let next = Hashed::new(value);
		let hash = next.hash;
		let prev = std::mem::replace(&mut *self.body.value.borrow_mut(), next);
		if prev.hash != hash {
			self.body.invalidate();
		}
		prev.value
	}

	pub fn update(&self, func: impl FnOnce(&mut T))
	where
		T: Hash,
	{
		let changed = {
			let mut value = self.body.value.borrow_mut();
			func(&mut value.value);
			value.rehash()
		};
		if changed {
			self.body.invalidate();
		}
	}

	/// Number of live derivations currently subscribed to this value.
	pub fn observer_count(&self) -> usize {
		self.body
			.used_by
			.borrow()
			.iter()
			.filter(|d| d.strong_count() > 0)
			.count()
	}

	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}
}

impl<T> VarBody<T> {
	fn invalidate(&self) {
		let live: Vec<Rc<dyn Derived>> = {
			let mut used_by = self.used_by.borrow_mut();
			used_by.retain(|d| d.strong_count() > 0);
			used_by.iter().filter_map(|d| d.upgrade()).collect()
		};

		batch(|| {
			for item in live {
				item.invalidate(Invalid::Definitely)
			}
		});
	}
}

impl<T: 'static> Observable for VarBody<T> {
	fn version(&self) -> Version {
		self.value.borrow().version()
	}

	fn update(&self) -> Version {
		self.version()
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

impl<T> Hash for Var<T>
where
	T: Hash,
{
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		state.write_u64(self.body.value.borrow().hash);
	}
}

impl<T> Debug for Var<T>
where
	T: 'static + Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.get_once().fmt(f)
	}
}
