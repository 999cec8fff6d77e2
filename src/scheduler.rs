//! Deferred delivery of cell notifications.
//!
//! A firing cell subscription never calls the consumer directly; it hands a
//! [`Task`] to a [`Scheduler`] so the reactive graph can settle first. The
//! scheduler is injected, which keeps delivery deterministic in tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

pub type Task = Box<dyn FnOnce()>;

pub trait Scheduler {
	fn schedule(&self, task: Task);
}

/// Runs every task inline, at the moment it is scheduled.
#[derive(Clone, Copy, Debug, Default)]
pub struct Immediate;

impl Scheduler for Immediate {
	fn schedule(&self, task: Task) {
		task()
	}
}

/// FIFO queue drained explicitly by its owner.
///
/// Tasks are never merged: scheduling the same notification twice runs it
/// twice.
#[derive(Clone, Default)]
pub struct TaskQueue {
	tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl TaskQueue {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.tasks.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.tasks.borrow().is_empty()
	}

	/// Run the oldest pending task. Returns `false` if there was none.
	pub fn run_once(&self) -> bool {
		let task = self.tasks.borrow_mut().pop_front();
		match task {
			Some(task) => {
				task();
				true
			}
			None => false,
		}
	}

	/// Run tasks until the queue is empty, including ones scheduled by the
	/// tasks themselves. Returns how many ran.
	pub fn run_until_idle(&self) -> usize {
		let mut count = 0;
		while self.run_once() {
			count += 1;
		}
		count
	}

	/// Drop every pending task without running it.
	pub fn clear(&self) -> usize {
		let tasks = std::mem::take(&mut *self.tasks.borrow_mut());
		tasks.len()
	}
}

impl Scheduler for TaskQueue {
	fn schedule(&self, task: Task) {
		self.tasks.borrow_mut().push_back(task);
	}
}

/// Defers tasks to the host's microtask queue.
#[cfg(target_arch = "wasm32")]
#[derive(Clone, Copy, Debug, Default)]
pub struct Microtask;

#[cfg(target_arch = "wasm32")]
impl Scheduler for Microtask {
	fn schedule(&self, task: Task) {
		crate::microtask::queue(task)
	}
}

/// The scheduler a table uses when none is configured.
pub fn default_scheduler() -> Rc<dyn Scheduler> {
	#[cfg(target_arch = "wasm32")]
	{
		Rc::new(Microtask)
	}

	#[cfg(not(target_arch = "wasm32"))]
	{
		Rc::new(Immediate)
	}
}
