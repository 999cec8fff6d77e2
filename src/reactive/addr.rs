use std::cmp::Ordering;
use std::ops::Deref;
use std::rc::{Rc, Weak};

/// Pointers that can be ordered by the address of their allocation.
pub trait Address {
	fn addr(&self) -> *const ();
}

impl<T: ?Sized> Address for Rc<T> {
	fn addr(&self) -> *const () {
		Rc::as_ptr(self) as *const ()
	}
}

impl<T: ?Sized> Address for Weak<T> {
	fn addr(&self) -> *const () {
		Weak::as_ptr(self) as *const ()
	}
}

/// Compares by allocation address only. Vtable metadata of `dyn` pointers
/// is dropped so two handles to the same node always compare equal.
pub struct ByAddr<P: Address> {
	ptr: P,
}

impl<P: Address> ByAddr<P> {
	pub fn new(ptr: P) -> Self {
		ByAddr { ptr }
	}
}

impl<P: Address> Deref for ByAddr<P> {
	type Target = P;
	fn deref(&self) -> &Self::Target {
		&self.ptr
	}
}

impl<P: Address> PartialEq for ByAddr<P> {
	fn eq(&self, other: &Self) -> bool {
		self.ptr.addr() == other.ptr.addr()
	}
}

impl<P: Address> Eq for ByAddr<P> {}

impl<P: Address> Ord for ByAddr<P> {
	fn cmp(&self, other: &Self) -> Ordering {
		self.ptr.addr().cmp(&other.ptr.addr())
	}
}

impl<P: Address> PartialOrd for ByAddr<P> {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

pub type RcAddr<T> = ByAddr<Rc<T>>;
pub type WeakAddr<T> = ByAddr<Weak<T>>;
