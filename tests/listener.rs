use std::cell::{Cell, RefCell};
use std::rc::Rc;

use mockall::predicate;
use observe_table::reactive::{batch, Var};
use observe_table::{cell_plane, CellSink, CellUpdateListener, TaskQueue};

use crate::mock::{SharedMock, Spy};
use crate::{columns, init_tracing, people, person, Calls};

fn listen(rows: &observe_table::Rows, queue: &TaskQueue, calls: &Calls) -> CellUpdateListener {
	let plane = cell_plane(Var::new(columns()), rows.clone());
	CellUpdateListener::new(plane, Rc::new(queue.clone()), Rc::new(calls.recorder()))
}

#[test]
fn attach_subscribes_every_cell_without_notifying() {
	init_tracing();
	let rows = people();
	let queue = TaskQueue::new();
	let calls = Calls::default();

	let listener = listen(&rows, &queue, &calls);
	assert_eq!(listener.subscription_count(), 6);
	assert_eq!(listener.rebuild_count(), 0);
	assert!(queue.is_empty());
	assert!(calls.take().is_empty());
}

#[test]
fn a_value_change_notifies_exactly_its_cell() {
	let rows = people();
	let queue = TaskQueue::new();
	let mock = SharedMock::new();

	let plane = cell_plane(Var::new(columns()), rows.clone());
	let sink = {
		let mock = mock.clone();
		move |col: usize, row: usize| mock.get().cell(col, row)
	};
	let _listener = CellUpdateListener::new(plane, Rc::new(queue.clone()), Rc::new(sink));

	for row in 0..3 {
		mock.get()
			.expect_cell()
			.with(predicate::eq(1), predicate::eq(row))
			.times(1)
			.return_const(());

		rows.row(row).expect("row").set("age", 50 + row as i32);
		assert_eq!(queue.len(), 1);
		queue.run_until_idle();

		mock.get().checkpoint();
	}
}

#[test]
fn notifications_wait_for_the_scheduler() {
	let rows = people();
	let queue = TaskQueue::new();
	let calls = Calls::default();
	let _listener = listen(&rows, &queue, &calls);

	rows.row(0).expect("row").set("name", "ann");
	assert!(calls.take().is_empty());

	queue.run_until_idle();
	assert_eq!(calls.take(), vec![(0, 0)]);
}

#[test]
fn each_firing_is_delivered() {
	let rows = people();
	let queue = TaskQueue::new();
	let calls = Calls::default();
	let _listener = listen(&rows, &queue, &calls);

	let carol = rows.row(2).expect("row");
	carol.set("age", 1);
	carol.set("age", 2);
	assert_eq!(queue.run_until_idle(), 2);
	assert_eq!(calls.take(), vec![(1, 2), (1, 2)]);

	batch(|| {
		carol.set("age", 3);
		carol.set("age", 4);
	});
	queue.run_until_idle();
	assert_eq!(calls.take(), vec![(1, 2)]);
}

#[test]
fn writes_that_keep_the_value_are_silent() {
	let rows = people();
	let queue = TaskQueue::new();
	let calls = Calls::default();
	let _listener = listen(&rows, &queue, &calls);

	rows.row(0).expect("row").set("age", 30);
	assert!(queue.is_empty());

	// Different stored value, same displayed text.
	rows.row(0).expect("row").set("age", "30");
	assert!(queue.is_empty());
}

#[derive(Default)]
struct Ordered {
	events: RefCell<Vec<String>>,
}

impl CellSink for Ordered {
	fn cell_changed(&self, col: usize, row: usize) {
		self.events.borrow_mut().push(format!("cell {col},{row}"));
	}

	fn plane_rebuilt(&self, columns: usize, rows: usize) {
		self.events
			.borrow_mut()
			.push(format!("rebuilt {columns}x{rows}"));
	}
}

#[test]
fn structural_change_rebuilds_subscriptions() {
	let rows = people();
	let queue = TaskQueue::new();
	let sink = Rc::new(Ordered::default());
	let plane = cell_plane(Var::new(columns()), rows.clone());
	let listener = CellUpdateListener::new(plane, Rc::new(queue.clone()), sink.clone());

	let alice = rows.row(0).expect("alice");
	rows.remove(0);
	assert_eq!(listener.subscription_count(), 4);
	assert_eq!(listener.rebuild_count(), 1);
	assert_eq!(alice.observer_count("age"), 0);
	assert_eq!(queue.len(), 1);
	assert!(sink.events.borrow().is_empty());

	// Writes to a removed row reach nobody.
	alice.set("age", 1);
	assert_eq!(queue.len(), 1);

	rows.row(0).expect("bob").set("age", 26);
	queue.run_until_idle();
	assert_eq!(
		*sink.events.borrow(),
		vec!["rebuilt 2x2".to_owned(), "cell 1,0".to_owned()]
	);

	rows.insert(1, person("zed", 70));
	assert_eq!(listener.subscription_count(), 6);
	rows.row(2).expect("carol").set("age", 42);
	queue.run_until_idle();
	assert_eq!(sink.events.borrow().last().map(String::as_str), Some("cell 1,2"));
}

/// Reads the plane again from inside the rebuild notice.
struct Rereading {
	plane: observe_table::reactive::Computed<observe_table::CellPlane>,
	rows: observe_table::Rows,
	seen: RefCell<Vec<(usize, usize)>>,
}

impl CellSink for Rereading {
	fn cell_changed(&self, _col: usize, _row: usize) {}

	fn plane_rebuilt(&self, columns: usize, rows: usize) {
		if self.seen.borrow().is_empty() {
			self.rows.push(person("eve", 33));
		}
		let plane = self.plane.get_once();
		self.seen.borrow_mut().push((columns, rows));
		assert_eq!(plane.rows(), self.rows.len());
	}
}

#[test]
fn rebuild_notice_may_change_and_reread_the_plane() {
	let rows = people();
	let plane = cell_plane(Var::new(columns()), rows.clone());
	let sink = Rc::new(Rereading {
		plane: plane.clone(),
		rows: rows.clone(),
		seen: RefCell::new(Vec::new()),
	});
	let listener = CellUpdateListener::new(
		plane.clone(),
		Rc::new(observe_table::Immediate),
		sink.clone(),
	);

	rows.push(person("dave", 19));
	assert_eq!(*sink.seen.borrow(), vec![(2, 4), (2, 5)]);
	assert_eq!(listener.rebuild_count(), 2);
	assert_eq!(listener.subscription_count(), 10);
	assert!(plane.is_valid());
}

#[test]
fn rebuild_notice_is_dropped_after_dispose() {
	let rows = people();
	let queue = TaskQueue::new();
	let sink = Rc::new(Ordered::default());
	let plane = cell_plane(Var::new(columns()), rows.clone());
	let listener = CellUpdateListener::new(plane, Rc::new(queue.clone()), sink.clone());

	rows.push(person("dave", 19));
	assert_eq!(queue.len(), 1);
	listener.dispose();
	queue.run_until_idle();
	assert!(sink.events.borrow().is_empty());
}

#[test]
fn panicking_sink_does_not_block_other_cells() {
	let rows = people();
	let queue = TaskQueue::new();
	let delivered = Rc::new(RefCell::new(Vec::new()));

	let sink = {
		let delivered = delivered.clone();
		move |col: usize, row: usize| {
			if row == 0 {
				panic!("renderer failed for row 0");
			}
			delivered.borrow_mut().push((col, row));
		}
	};
	let plane = cell_plane(Var::new(columns()), rows.clone());
	let listener = CellUpdateListener::new(plane, Rc::new(queue.clone()), Rc::new(sink));

	rows.row(0).expect("row").set("age", 1);
	rows.row(1).expect("row").set("age", 2);
	assert_eq!(queue.run_until_idle(), 2);
	assert_eq!(*delivered.borrow(), vec![(1, 1)]);

	// The graph still works after the panic.
	rows.row(0).expect("row").set("name", "x");
	rows.row(2).expect("row").set("name", "y");
	queue.run_until_idle();
	assert_eq!(*delivered.borrow(), vec![(1, 1), (0, 2)]);
	assert_eq!(listener.subscription_count(), 6);
}

#[test]
fn dispose_stops_delivery() {
	let rows = people();
	let queue = TaskQueue::new();
	let calls = Calls::default();
	let listener = listen(&rows, &queue, &calls);

	let bob = rows.row(1).expect("bob");
	bob.set("age", 1);
	assert_eq!(queue.len(), 1);

	listener.dispose();
	listener.dispose();
	assert!(listener.is_disposed());
	assert_eq!(listener.subscription_count(), 0);

	// Scheduled before dispose, delivered after: dropped.
	queue.run_until_idle();
	assert!(calls.take().is_empty());

	bob.set("age", 2);
	rows.push(person("late", 1));
	assert!(queue.is_empty());
}

#[test]
fn drop_disposes() {
	let rows = people();
	let queue = TaskQueue::new();
	let calls = Calls::default();

	let listener = listen(&rows, &queue, &calls);
	assert_eq!(rows.observer_count(), 1);
	drop(listener);
	assert_eq!(rows.observer_count(), 0);
	assert_eq!(rows.row(0).expect("row").observer_count("name"), 0);
}

#[test]
fn dispose_from_inside_a_notification() {
	let rows = people();
	let slot: Rc<RefCell<Option<CellUpdateListener>>> = Rc::new(RefCell::new(None));
	let fired = Rc::new(Cell::new(0));

	let sink = {
		let slot = slot.clone();
		let fired = fired.clone();
		move |_col: usize, _row: usize| {
			fired.set(fired.get() + 1);
			let listener = slot.borrow_mut().take();
			if let Some(listener) = listener {
				listener.dispose();
			}
		}
	};
	let plane = cell_plane(Var::new(columns()), rows.clone());
	let listener =
		CellUpdateListener::new(plane, Rc::new(observe_table::Immediate), Rc::new(sink));
	*slot.borrow_mut() = Some(listener);

	rows.row(0).expect("row").set("age", 5);
	assert_eq!(fired.get(), 1);
	assert!(slot.borrow().is_none());
	assert_eq!(rows.observer_count(), 0);

	rows.row(1).expect("row").set("age", 6);
	assert_eq!(fired.get(), 1);
}
