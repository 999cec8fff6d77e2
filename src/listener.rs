//! Bridges per-cell change signals to a single consumer callback.
//!
//! A [`CellUpdateListener`] owns one outer reaction that watches the cell
//! plane, plus one inner reaction per cell. When the plane is rebuilt, every
//! inner reaction is disposed before any new one is created, so a coordinate
//! is never watched twice.

use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use enclose::enclose;

use crate::plane::{CellKey, CellPlane};
use crate::reactive::{Computed, Evaluation, Reaction};
use crate::scheduler::Scheduler;

/// Receives cell notifications.
pub trait CellSink {
	fn cell_changed(&self, col: usize, row: usize);

	/// The plane was rebuilt after a structural change and now has the
	/// given shape. Every coordinate may refer to a different cell.
	fn plane_rebuilt(&self, _columns: usize, _rows: usize) {}
}

impl<F> CellSink for F
where
	F: Fn(usize, usize),
{
	fn cell_changed(&self, col: usize, row: usize) {
		self(col, row)
	}
}

pub struct CellUpdateListener {
	inner: Rc<ListenerInner>,
}

struct ListenerInner {
	plane: Computed<CellPlane>,
	scheduler: Rc<dyn Scheduler>,
	sink: Rc<dyn CellSink>,
	outer: RefCell<Option<Reaction>>,
	cells: RefCell<Vec<Reaction>>,
	attached: Cell<bool>,
	rebuilds: Cell<usize>,
	disposed: Cell<bool>,
}

impl CellUpdateListener {
	/// Subscribe to every cell of the current plane right away, and to the
	/// plane itself for later rebuilds.
	pub fn new(
		plane: Computed<CellPlane>,
		scheduler: Rc<dyn Scheduler>,
		sink: Rc<dyn CellSink>,
	) -> Self {
		let inner = Rc::new(ListenerInner {
			plane,
			scheduler,
			sink,
			outer: RefCell::new(None),
			cells: RefCell::new(Vec::new()),
			attached: Cell::new(false),
			rebuilds: Cell::new(0),
			disposed: Cell::new(false),
		});

		let weak = Rc::downgrade(&inner);
		let outer = Reaction::new_with_name(
			"cell-plane",
			Box::new(move |ev: &Evaluation| {
				if let Some(inner) = weak.upgrade() {
					inner.attach(ev);
				}
			}),
		);
		*inner.outer.borrow_mut() = Some(outer.clone());
		outer.update();

		CellUpdateListener { inner }
	}

	/// Number of live per-cell subscriptions.
	pub fn subscription_count(&self) -> usize {
		self.inner.cells.borrow().len()
	}

	/// How many times the inner subscriptions were rebuilt after the
	/// initial attach.
	pub fn rebuild_count(&self) -> usize {
		self.inner.rebuilds.get()
	}

	pub fn is_disposed(&self) -> bool {
		self.inner.disposed.get()
	}

	/// Tear down every subscription. Idempotent, and safe to call from
	/// inside a notification.
	pub fn dispose(&self) {
		if self.inner.disposed.replace(true) {
			return;
		}

		if let Some(outer) = self.inner.outer.borrow_mut().take() {
			outer.dispose();
		}
		let cells = self.inner.cells.take();
		let count = cells.len();
		for cell in &cells {
			cell.dispose();
		}
		drop(cells);

		tracing::debug!(subscriptions = count, "cell listener disposed");
	}
}

impl Drop for CellUpdateListener {
	fn drop(&mut self) {
		self.dispose();
	}
}

impl ListenerInner {
	fn attach(self: &Rc<Self>, ev: &Evaluation) {
		if self.disposed.get() {
			return;
		}

		// No plane borrow past this block: sinks may rebuild the plane.
		let (generation, columns, rows, cells) = {
			let plane = self.plane.get(ev);
			let cells: Vec<(CellKey, Computed<String>)> =
				plane.iter().map(|(key, cell)| (key, cell.clone())).collect();
			(plane.generation(), plane.columns(), plane.rows(), cells)
		};

		let is_rebuild = self.attached.replace(true);
		let previous = self.cells.take();
		for cell in &previous {
			cell.dispose();
		}
		drop(previous);

		let weak = Rc::downgrade(self);
		let subscriptions: Vec<Reaction> = cells
			.into_iter()
			.map(|(key, cell)| {
				let fired = Cell::new(false);
				Reaction::subscribe(
					"cell",
					Box::new(enclose!((weak) move |ev: &Evaluation| {
						let _ = cell.get(ev);
						if !fired.replace(true) {
							return;
						}
						if let Some(inner) = weak.upgrade() {
							inner.schedule(key);
						}
					})),
				)
			})
			.collect();

		tracing::debug!(
			generation,
			subscriptions = subscriptions.len(),
			rebuild = is_rebuild,
			"cell subscriptions attached"
		);
		*self.cells.borrow_mut() = subscriptions;

		if is_rebuild {
			self.rebuilds.set(self.rebuilds.get() + 1);
			self.scheduler.schedule(Box::new(move || {
				if let Some(inner) = weak.upgrade() {
					inner.rebuilt(generation, columns, rows);
				}
			}));
		}
	}

	fn schedule(self: &Rc<Self>, key: CellKey) {
		let weak = Rc::downgrade(self);
		self.scheduler.schedule(Box::new(move || {
			if let Some(inner) = weak.upgrade() {
				inner.notify(key);
			}
		}));
	}

	fn rebuilt(&self, generation: u64, columns: usize, rows: usize) {
		if self.disposed.get() {
			tracing::trace!(generation, "dropping rebuild notice after dispose");
			return;
		}

		let sink = self.sink.clone();
		if catch_unwind(AssertUnwindSafe(|| sink.plane_rebuilt(columns, rows))).is_err() {
			tracing::error!(generation, "plane rebuild handler panicked");
		}
	}

	/// Deliver one notification. The sink runs isolated: a panic is logged
	/// and does not reach the reactive graph or later notifications.
	fn notify(&self, key: CellKey) {
		if self.disposed.get() {
			tracing::trace!(%key, "dropping notification after dispose");
			return;
		}

		let CellKey { col, row } = key;
		tracing::trace!(col, row, "cell changed");
		let sink = self.sink.clone();
		if catch_unwind(AssertUnwindSafe(|| sink.cell_changed(col, row))).is_err() {
			tracing::error!(col, row, "cell update handler panicked");
		}
	}
}
