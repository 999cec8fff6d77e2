use std::cell::{Cell, RefCell};
use std::rc::Weak;

use crate::reactive::reaction::Reactive;

thread_local! {
	static STARTED: Cell<bool> = const { Cell::new(false) };
	static FLUSHING: Cell<bool> = const { Cell::new(false) };
	static CHANGED: RefCell<Vec<Weak<dyn Reactive>>> = const { RefCell::new(Vec::new()) };
}

pub fn in_batch() -> bool {
	STARTED.with(|s| s.get())
}

/// Run `func` with invalidations collected instead of acted upon. The
/// outermost batch flushes pending reactions once `func` returns.
pub fn batch<R>(func: impl FnOnce() -> R) -> R {
	let guard = BatchGuard::start();
	let result = func();
	if guard.is_root {
		drop(guard);
		batch_run();
	}
	result
}

pub(crate) fn enqueue(reactive: Weak<dyn Reactive>) {
	CHANGED.with(|c| c.borrow_mut().push(reactive));
}

/// Drain the changed queue until no reaction is left pending. Writes made
/// by a running reaction land in the same queue and are picked up by this
/// loop, so a nested call is a no-op.
pub(crate) fn batch_run() {
	let Some(_flushing) = FlushGuard::start() else {
		return;
	};

	loop {
		let changed = CHANGED.with(|c| std::mem::take(&mut *c.borrow_mut()));
		if changed.is_empty() {
			break;
		}

		tracing::trace!(count = changed.len(), "running reactions");
		for reaction in changed {
			if let Some(reactive) = reaction.upgrade() {
				reactive.update();
			}
		}
	}
}

struct BatchGuard {
	is_root: bool,
}

impl BatchGuard {
	fn start() -> Self {
		let is_root = STARTED.with(|s| !s.replace(true));
		BatchGuard { is_root }
	}
}

impl Drop for BatchGuard {
	fn drop(&mut self) {
		if self.is_root {
			STARTED.with(|s| s.set(false));
		}
	}
}

struct FlushGuard;

impl FlushGuard {
	fn start() -> Option<Self> {
		if FLUSHING.with(|f| f.replace(true)) {
			None
		} else {
			Some(FlushGuard)
		}
	}
}

impl Drop for FlushGuard {
	fn drop(&mut self) {
		FLUSHING.with(|f| f.set(false));
	}
}
