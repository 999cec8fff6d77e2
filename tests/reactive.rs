use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use mockall::predicate;
use observe_table::macros::enclose;
use observe_table::reactive::{batch, in_batch, Evaluation, Reaction, Var};
use observe_table::{computed, reaction};

use crate::mock::{SharedMock, Spy};

#[test]
fn diamond_runs_once_per_batch() {
	let base = Var::new(1u64);
	let double = base.map(|v| v * 2);
	let triple = base.map(|v| v * 3);

	let mock = SharedMock::new();
	mock.get()
		.expect_trigger()
		.with(predicate::eq(5))
		.times(1)
		.return_const(());

	let _sum = reaction!("sum" (double, triple, mock) cx => {
		mock.get().trigger(*double.get(cx) + *triple.get(cx));
	});
	mock.get().checkpoint();

	mock.get()
		.expect_trigger()
		.with(predicate::eq(20))
		.times(1)
		.return_const(());

	batch(|| {
		base.set(2);
		base.set(3);
		base.set(4);
	});
	mock.get().checkpoint();

	// Leaves and returns within one batch: both branches recompute to the
	// same versions, so the reaction stays put.
	mock.get().expect_trigger().times(0).return_const(());
	batch(|| {
		base.set(5);
		base.set(4);
	});
	assert_eq!(*double.get_once(), 8);
	mock.get().checkpoint();
}

#[test]
fn computed_recovers_after_a_panicking_run() {
	let input = Var::new(0u64);
	let checked = computed!((input) cx => {
		let value = *input.get(cx);
		if value == 1 {
			panic!("odd input rejected");
		}
		value
	});
	assert_eq!(*checked.get_once(), 0);

	let failed = catch_unwind(AssertUnwindSafe(|| {
		input.set(1);
		*checked.get_once()
	}));
	assert!(failed.is_err());
	assert!(!checked.is_valid());

	input.set(2);
	assert_eq!(*checked.get_once(), 2);
	assert!(checked.is_valid());
}

#[test]
fn check_invalidation() {
	let a = Var::new(10u64);

	let mock = SharedMock::new();
	mock.get().expect_trigger().times(1).return_const(());

	let _r = reaction!("watch" (a, mock) cx => {
		mock.get().trigger(*a.get(cx));
	});

	mock.get().checkpoint();

	// Same value, same hash: nothing runs.
	mock.get().expect_trigger().times(0).return_const(());
	a.set(10);
	mock.get().checkpoint();

	mock.get()
		.expect_trigger()
		.with(predicate::eq(11))
		.times(1)
		.return_const(());
	a.set(11);
	mock.get().checkpoint();
}

#[test]
fn unchanged_derivation_stops_propagation() {
	let a = Var::new(1u64);
	let parity = a.map(|v| v % 2);

	let runs = Rc::new(Cell::new(0));
	let _r = reaction!("parity" (parity, runs) cx => {
		let _ = *parity.get(cx);
		runs.set(runs.get() + 1);
	});
	assert_eq!(runs.get(), 1);

	a.set(3);
	assert_eq!(runs.get(), 1);
	assert_eq!(*parity.get_once(), 1);

	a.set(4);
	assert_eq!(runs.get(), 2);
	assert_eq!(*parity.get_once(), 0);
}

#[test]
fn computed_macro_tracks_clones() {
	let a = Var::new(2u64);
	let b = Var::new(3u64);
	let product = computed!((a, b) cx => *a.get(cx) * *b.get(cx));

	assert_eq!(*product.get_once(), 6);
	assert_eq!(product.dependency_count(), 2);

	b.set(5);
	assert!(!product.is_valid());
	assert_eq!(*product.get_once(), 10);
	assert!(product.is_valid());
}

#[test]
fn writes_outside_a_batch_flush_immediately() {
	let a = Var::new(0u64);
	let seen = Rc::new(RefCell::new(Vec::new()));

	let _r = reaction!("seen" (a, seen) cx => {
		seen.borrow_mut().push(*a.get(cx));
	});

	assert!(!in_batch());
	a.set(1);
	a.set(2);
	assert_eq!(*seen.borrow(), vec![0, 1, 2]);
}

#[test]
fn nested_batches_flush_once_at_the_root() {
	let a = Var::new(0u64);
	let runs = Rc::new(Cell::new(0));

	let _r = reaction!("runs" (a, runs) cx => {
		let _ = *a.get(cx);
		runs.set(runs.get() + 1);
	});

	batch(|| {
		a.set(1);
		batch(|| {
			assert!(in_batch());
			a.set(2);
		});
		assert_eq!(runs.get(), 1);
		a.set(3);
	});

	assert!(!in_batch());
	assert_eq!(runs.get(), 2);
	assert_eq!(*a.get_once(), 3);
}

#[test]
fn reaction_may_write_what_another_reads() {
	let a = Var::new(1u64);
	let b = Var::new(0u64);
	let last = Rc::new(Cell::new(0));

	let _double = reaction!("double" (a, b) cx => {
		b.set(*a.get(cx) * 2);
	});
	let _watch = reaction!("watch" (b, last) cx => {
		last.set(*b.get(cx));
	});
	assert_eq!(last.get(), 2);

	a.set(21);
	assert_eq!(*b.get_once(), 42);
	assert_eq!(last.get(), 42);
}

#[test]
fn dispose_releases_dependencies() {
	let a = Var::new(0u64);
	let mapped = a.map(|v| v + 1);
	assert_eq!(a.observer_count(), 1);

	let r = reaction!("disposable" (mapped) cx => {
		let _ = *mapped.get(cx);
	});
	assert_eq!(mapped.observer_count(), 1);
	assert_eq!(r.dependency_count(), 1);

	assert!(r.dispose());
	assert!(!r.dispose());
	assert!(r.is_disposed());
	assert_eq!(mapped.observer_count(), 0);
	assert_eq!(r.dependency_count(), 0);

	drop(mapped);
	assert_eq!(a.observer_count(), 0);
}

#[test]
fn dropping_a_reaction_releases_dependencies() {
	let a = Var::new(0u64);
	let r = reaction!("dropped" (a) cx => {
		let _ = *a.get(cx);
	});
	assert_eq!(a.observer_count(), 1);

	drop(r);
	assert_eq!(a.observer_count(), 0);

	// A write after the drop reaches nobody.
	a.set(1);
}

#[test]
fn reaction_can_dispose_itself() {
	let a = Var::new(0u64);
	let runs = Rc::new(Cell::new(0));
	let slot: Rc<RefCell<Option<Reaction>>> = Rc::new(RefCell::new(None));

	let r = Reaction::subscribe(
		"self-disposing",
		Box::new(enclose!((a, runs, slot) move |cx: &Evaluation| {
			runs.set(runs.get() + 1);
			if *a.get(cx) > 0 {
				if let Some(r) = slot.borrow().as_ref() {
					r.dispose();
				}
			}
		})),
	);
	*slot.borrow_mut() = Some(r.clone());

	a.set(1);
	assert_eq!(runs.get(), 2);
	assert!(r.is_disposed());
	assert_eq!(a.observer_count(), 0);

	a.set(2);
	assert_eq!(runs.get(), 2);
}

#[test]
fn swapped_dependencies_are_released() {
	let flag = Var::new(true);
	let left = Var::new(1u64);
	let right = Var::new(2u64);

	let picked = computed!((flag, left, right) cx => {
		if *flag.get(cx) {
			*left.get(cx)
		} else {
			*right.get(cx)
		}
	});
	assert_eq!(left.observer_count(), 1);
	assert_eq!(right.observer_count(), 0);

	flag.set(false);
	assert_eq!(*picked.get_once(), 2);
	assert_eq!(left.observer_count(), 0);
	assert_eq!(right.observer_count(), 1);
}
