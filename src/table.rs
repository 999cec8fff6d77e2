//! The table model: one façade over a table's columns, rows and the derived
//! grid state.
//!
//! Coordinates taken by [`TableModel::get_cell_data`] and
//! [`TableModel::set_cell_data`] are data coordinates: the row index is the
//! position in [`Rows`]. Sorting never reorders the rows; it is a
//! [`DisplayOrder`] applied where the model talks to the grid renderer
//! ([`TableModel::get_cells`], row actions and change notifications).

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use enclose::enclose;

use crate::error::TableError;
use crate::field::{Field, FIELD_LIMIT};
use crate::listener::{CellSink, CellUpdateListener};
use crate::plane::{
	cell_plane, column_meta, header_cells, CellKey, CellPlane, ColumnMeta, HeaderCells,
};
use crate::reactive::{Computed, Evaluation, Reaction, Var};
use crate::record::{Record, Rows, Value};
use crate::scheduler::{default_scheduler, Scheduler};

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SortDirection {
	Asc,
	Desc,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SortConfig {
	pub field_id: String,
	pub direction: SortDirection,
}

impl SortConfig {
	pub fn new(field_id: impl Into<String>, direction: SortDirection) -> Self {
		SortConfig {
			field_id: field_id.into(),
			direction,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PinSide {
	Top,
	Bottom,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PinnedRows {
	pub top: Vec<usize>,
	pub bottom: Vec<usize>,
}

impl PinnedRows {
	/// Put `row` on `side`, taking it off the other side. Pinning twice
	/// keeps one entry.
	fn pin(&mut self, row: usize, side: PinSide) {
		let other = match side {
			PinSide::Top => PinSide::Bottom,
			PinSide::Bottom => PinSide::Top,
		};
		self.side_mut(other).retain(|r| *r != row);

		let rows = self.side_mut(side);
		if !rows.contains(&row) {
			rows.push(row);
		}
	}

	/// Replay the entries through [`PinnedRows::pin`], top first, so each
	/// row appears once. A row listed on both sides ends up at the bottom.
	fn normalized(self) -> Self {
		let mut pinned = PinnedRows::default();
		for row in self.top {
			pinned.pin(row, PinSide::Top);
		}
		for row in self.bottom {
			pinned.pin(row, PinSide::Bottom);
		}
		pinned
	}

	fn side_mut(&mut self, side: PinSide) -> &mut Vec<usize> {
		match side {
			PinSide::Top => &mut self.top,
			PinSide::Bottom => &mut self.bottom,
		}
	}
}

/// Mapping between display rows and data rows under the active sort.
/// Empty means identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DisplayOrder {
	to_data: Vec<usize>,
	to_display: Vec<usize>,
}

impl DisplayOrder {
	fn from_permutation(to_data: Vec<usize>) -> Self {
		if to_data.iter().enumerate().all(|(display, data)| display == *data) {
			return DisplayOrder::default();
		}

		let mut to_display = vec![0; to_data.len()];
		for (display, data) in to_data.iter().enumerate() {
			to_display[*data] = display;
		}
		DisplayOrder {
			to_data,
			to_display,
		}
	}

	pub fn is_identity(&self) -> bool {
		self.to_data.is_empty()
	}

	pub fn data_index(&self, display: usize) -> usize {
		self.to_data.get(display).copied().unwrap_or(display)
	}

	pub fn display_index(&self, data: usize) -> usize {
		self.to_display.get(data).copied().unwrap_or(data)
	}
}

/// Which region of the grid a [`TableModel::get_cells`] call is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridPlane {
	Grid,
	FrozenRowsStart,
	FrozenColsEnd,
	FixedStartEnd,
}

/// Inclusive cell range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridRange {
	pub start: CellKey,
	pub end: CellKey,
}

impl GridRange {
	pub fn new(start: CellKey, end: CellKey) -> Self {
		GridRange { start, end }
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Accessory {
	ColumnSettings { field_id: String },
	RowMenu { row: usize },
	AddColumn { disabled: bool },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GridCell {
	pub value: String,
	pub readonly: bool,
	pub resize_handle: bool,
	pub accessory: Option<Accessory>,
}

pub type GridCells = BTreeMap<CellKey, GridCell>;

/// The virtualized grid the model repaints.
pub trait GridRenderer {
	/// Repaint one display coordinate if it is currently on screen.
	fn update_if_within_bounds(&self, cell: CellKey);

	/// Repaint everything on screen.
	fn update_cells(&self, _force_all: bool) {}
}

impl<F> GridRenderer for F
where
	F: Fn(usize, usize),
{
	fn update_if_within_bounds(&self, cell: CellKey) {
		self(cell.col, cell.row)
	}
}

#[derive(Default)]
struct TableHooks {
	on_insert_row: Option<Box<dyn Fn(usize)>>,
	on_delete_row: Option<Box<dyn Fn(usize, Record)>>,
	on_delete_column: Option<Box<dyn Fn(&str)>>,
	on_row_order_changed: Option<Box<dyn Fn()>>,
}

/// Initial state and callbacks for a [`TableModel`].
#[derive(Default)]
pub struct TableOptions {
	sorting: Option<SortConfig>,
	pinned_rows: PinnedRows,
	row_selection: Vec<usize>,
	scheduler: Option<Rc<dyn Scheduler>>,
	hooks: TableHooks,
}

impl TableOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn sorting(mut self, sorting: SortConfig) -> Self {
		self.sorting = Some(sorting);
		self
	}

	pub fn pinned_rows(mut self, pinned_rows: PinnedRows) -> Self {
		self.pinned_rows = pinned_rows;
		self
	}

	pub fn row_selection(mut self, row_selection: Vec<usize>) -> Self {
		self.row_selection = row_selection;
		self
	}

	/// Where cell notifications are delivered. Defaults to the host
	/// microtask queue on wasm and inline delivery elsewhere.
	pub fn scheduler(mut self, scheduler: Rc<dyn Scheduler>) -> Self {
		self.scheduler = Some(scheduler);
		self
	}

	/// Called with the data index a new row should be inserted at.
	pub fn on_insert_row(mut self, func: impl Fn(usize) + 'static) -> Self {
		self.hooks.on_insert_row = Some(Box::new(func));
		self
	}

	/// Called with the data index and the row the user asked to delete.
	pub fn on_delete_row(mut self, func: impl Fn(usize, Record) + 'static) -> Self {
		self.hooks.on_delete_row = Some(Box::new(func));
		self
	}

	pub fn on_delete_column(mut self, func: impl Fn(&str) + 'static) -> Self {
		self.hooks.on_delete_column = Some(Box::new(func));
		self
	}

	pub fn on_row_order_changed(mut self, func: impl Fn() + 'static) -> Self {
		self.hooks.on_row_order_changed = Some(Box::new(func));
		self
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
	Created,
	Open,
	Disposed,
}

struct TableViews {
	header: Computed<HeaderCells>,
	column_meta: Computed<ColumnMeta>,
	display_order: Computed<DisplayOrder>,
	plane: Computed<CellPlane>,
	listener: CellUpdateListener,
	row_order: Reaction,
	// Scheduled repaints hold a weak handle and skip once the views are gone.
	live: Rc<()>,
}

pub struct TableModel {
	id: String,
	fields: Var<Vec<Field>>,
	rows: Rows,
	sorting: Var<Option<SortConfig>>,
	pinned_rows: RefCell<PinnedRows>,
	row_selection: RefCell<Vec<usize>>,
	scheduler: Rc<dyn Scheduler>,
	hooks: Rc<TableHooks>,
	lifecycle: Cell<Lifecycle>,
	views: RefCell<Option<TableViews>>,
}

impl TableModel {
	pub fn new(fields: Vec<Field>, rows: Rows, options: TableOptions) -> Self {
		let TableOptions {
			sorting,
			pinned_rows,
			mut row_selection,
			scheduler,
			hooks,
		} = options;

		let mut seen = Vec::with_capacity(row_selection.len());
		row_selection.retain(|row| {
			let fresh = !seen.contains(row);
			seen.push(*row);
			fresh
		});

		TableModel {
			id: format!("table-model-{}", NEXT_ID.fetch_add(1, AtomicOrdering::Relaxed)),
			fields: Var::new(fields),
			rows,
			sorting: Var::new(sorting),
			pinned_rows: RefCell::new(pinned_rows.normalized()),
			row_selection: RefCell::new(row_selection),
			scheduler: scheduler.unwrap_or_else(default_scheduler),
			hooks: Rc::new(hooks),
			lifecycle: Cell::new(Lifecycle::Created),
			views: RefCell::new(None),
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	//
	// Lifecycle
	//

	/// Build the derived views and start forwarding cell changes to
	/// `renderer`. A model opens once.
	pub fn open(&self, renderer: Rc<dyn GridRenderer>) -> Result<(), TableError> {
		match self.lifecycle.get() {
			Lifecycle::Created => {}
			Lifecycle::Open => {
				tracing::warn!(table = %self.id, "table model opened twice");
				return Err(TableError::AlreadyOpen(self.id.clone()));
			}
			Lifecycle::Disposed => {
				tracing::warn!(table = %self.id, "table model opened after dispose");
				return Err(TableError::Disposed(self.id.clone()));
			}
		}
		self.lifecycle.set(Lifecycle::Open);

		let header = header_cells(self.fields.clone());
		let column_meta = column_meta(self.fields.clone());
		let display_order = display_order(
			self.fields.clone(),
			self.rows.clone(),
			self.sorting.clone(),
		);
		let plane = cell_plane(self.fields.clone(), self.rows.clone());

		let sink = Rc::new(RendererSink {
			renderer: renderer.clone(),
			display_order: display_order.clone(),
		});
		let listener = CellUpdateListener::new(plane.clone(), self.scheduler.clone(), sink);
		let live = Rc::new(());
		let row_order = row_order_watcher(
			display_order.clone(),
			Rc::downgrade(&live),
			renderer,
			self.scheduler.clone(),
			self.hooks.clone(),
		);

		tracing::debug!(
			table = %self.id,
			subscriptions = listener.subscription_count(),
			"table model opened"
		);

		*self.views.borrow_mut() = Some(TableViews {
			header,
			column_meta,
			display_order,
			plane,
			listener,
			row_order,
			live,
		});

		Ok(())
	}

	/// Release every subscription. Afterwards every operation is a no-op.
	pub fn dispose(&self) {
		if self.lifecycle.replace(Lifecycle::Disposed) == Lifecycle::Disposed {
			return;
		}

		let views = self.views.borrow_mut().take();
		if let Some(views) = views {
			views.listener.dispose();
			views.row_order.dispose();
			drop(views.live);
		}

		tracing::debug!(table = %self.id, "table model disposed");
	}

	pub fn is_open(&self) -> bool {
		self.lifecycle.get() == Lifecycle::Open
	}

	pub fn is_disposed(&self) -> bool {
		self.lifecycle.get() == Lifecycle::Disposed
	}

	//
	// Derived views
	//

	pub fn header_cells(&self) -> Option<Computed<HeaderCells>> {
		self.views.borrow().as_ref().map(|v| v.header.clone())
	}

	pub fn column_meta(&self) -> Option<Computed<ColumnMeta>> {
		self.views.borrow().as_ref().map(|v| v.column_meta.clone())
	}

	pub fn plane(&self) -> Option<Computed<CellPlane>> {
		self.views.borrow().as_ref().map(|v| v.plane.clone())
	}

	pub fn display_order(&self) -> DisplayOrder {
		let order = self.views.borrow().as_ref().map(|v| v.display_order.clone());
		order
			.map(|order| order.get_once().clone())
			.unwrap_or_default()
	}

	pub fn data_index(&self, display_row: usize) -> usize {
		self.display_order().data_index(display_row)
	}

	pub fn display_index(&self, data_row: usize) -> usize {
		self.display_order().display_index(data_row)
	}

	/// Live per-cell subscriptions; zero unless open.
	pub fn subscription_count(&self) -> usize {
		self.views
			.borrow()
			.as_ref()
			.map(|v| v.listener.subscription_count())
			.unwrap_or_default()
	}

	pub fn rebuild_count(&self) -> usize {
		self.views
			.borrow()
			.as_ref()
			.map(|v| v.listener.rebuild_count())
			.unwrap_or_default()
	}

	//
	// Get cells
	//

	/// Cells of one grid region for the visible `range`, keyed by display
	/// coordinate. Empty unless the model is open.
	pub fn get_cells(&self, range: GridRange, plane: GridPlane) -> GridCells {
		if !self.is_open() {
			return GridCells::new();
		}

		match plane {
			GridPlane::Grid => self.main_grid_cells(range),
			GridPlane::FrozenRowsStart => self.header_grid_cells(range),
			GridPlane::FrozenColsEnd => self.action_column_cells(range),
			GridPlane::FixedStartEnd => self.new_column_cell(),
		}
	}

	fn main_grid_cells(&self, range: GridRange) -> GridCells {
		let mut values = GridCells::new();
		let Some(plane) = self.plane() else {
			return values;
		};
		let order = self.display_order();
		let plane = plane.get_once();

		for row in range.start.row..=range.end.row {
			if row >= plane.rows() {
				break;
			}
			let data_row = order.data_index(row);
			for col in range.start.col..=range.end.col {
				if col >= plane.columns() {
					break;
				}
				let Some(cell) = plane.get(CellKey::new(col, data_row)) else {
					continue;
				};
				let value = cell.get_once().clone();
				values.insert(
					CellKey::new(col, row),
					GridCell {
						value,
						..GridCell::default()
					},
				);
			}
		}

		values
	}

	fn header_grid_cells(&self, range: GridRange) -> GridCells {
		let mut values = GridCells::new();
		let Some(header) = self.header_cells() else {
			return values;
		};
		if range.start.col > range.end.col {
			return values;
		}

		for (col, cell) in header.get_once().range(range.start.col..=range.end.col) {
			values.insert(
				CellKey::new(*col, 0),
				GridCell {
					value: cell.value.clone(),
					readonly: cell.readonly,
					resize_handle: cell.resizable,
					accessory: Some(Accessory::ColumnSettings {
						field_id: cell.field_id.clone(),
					}),
				},
			);
		}

		values
	}

	fn action_column_cells(&self, range: GridRange) -> GridCells {
		let rows = self.rows.len();
		(range.start.row..=range.end.row)
			.take_while(|row| *row < rows)
			.map(|row| {
				let cell = GridCell {
					readonly: true,
					accessory: Some(Accessory::RowMenu { row }),
					..GridCell::default()
				};
				(CellKey::new(0, row), cell)
			})
			.collect()
	}

	fn new_column_cell(&self) -> GridCells {
		let disabled = self.column_count() >= FIELD_LIMIT;
		let mut values = GridCells::new();
		values.insert(
			CellKey::new(0, 0),
			GridCell {
				readonly: true,
				accessory: Some(Accessory::AddColumn { disabled }),
				..GridCell::default()
			},
		);
		values
	}

	//
	// Data
	//

	pub fn rows(&self) -> Rows {
		self.rows.clone()
	}

	/// Replace the row sequence. A structural change.
	pub fn set_rows(&self, rows: Vec<Record>) {
		if self.is_disposed() {
			return;
		}
		self.rows.replace(rows);
	}

	pub fn row_count(&self) -> usize {
		if self.is_disposed() {
			return 0;
		}
		self.rows.len()
	}

	pub fn column_count(&self) -> usize {
		if self.is_disposed() {
			return 0;
		}
		self.fields.get_once().len()
	}

	/// Ask the row owner to insert a row before `display_row`, or at the end.
	pub fn insert_row(&self, display_row: Option<usize>) {
		if self.is_disposed() {
			return;
		}
		let index = match display_row {
			Some(row) => self.data_index(row),
			None => self.rows.len(),
		};
		if let Some(func) = &self.hooks.on_insert_row {
			func(index);
		}
	}

	/// Ask the row owner to delete the row shown at `display_row`.
	pub fn delete_row(&self, display_row: usize) {
		if self.is_disposed() {
			return;
		}
		let index = self.data_index(display_row);
		let Some(record) = self.rows.row(index) else {
			return;
		};
		if let Some(func) = &self.hooks.on_delete_row {
			func(index, record);
		}
	}

	fn field_at(&self, col: usize) -> Option<Field> {
		self.fields.get_once().get(col).cloned()
	}

	/// Value at a data coordinate formatted for editing. `None` when the
	/// coordinate is out of bounds or the model is disposed; an absent
	/// property reads as the empty string.
	pub fn get_cell_data(&self, col: usize, row: usize) -> Option<String> {
		if self.is_disposed() {
			return None;
		}
		let field = self.field_at(col)?;
		let record = self.rows.row(row)?;
		Some(field.kind().format_for_editing(&field.read_once(&record)))
	}

	/// Parse `value` for the column's kind and write it to the row. Out of
	/// bounds coordinates are ignored.
	pub fn set_cell_data(&self, col: usize, row: usize, value: impl Into<Value>) {
		if self.is_disposed() {
			return;
		}
		let (Some(field), Some(record)) = (self.field_at(col), self.rows.row(row)) else {
			tracing::trace!(col, row, "set_cell_data out of bounds");
			return;
		};
		let value = field.kind().parse_value(value.into());
		record.set_path(field.path(), value);
	}

	//
	// Columns
	//

	pub fn fields(&self) -> Vec<Field> {
		self.fields.get_once().clone()
	}

	pub fn field(&self, field_id: &str) -> Option<Field> {
		self.fields
			.get_once()
			.iter()
			.find(|f| f.id() == field_id)
			.cloned()
	}

	fn position(&self, field_id: &str) -> Option<usize> {
		self.fields.get_once().iter().position(|f| f.id() == field_id)
	}

	/// Insert a column at `index`, or append it. Rejected past
	/// [`FIELD_LIMIT`] or when the id is taken.
	pub fn add_column(&self, field: Field, index: Option<usize>) -> bool {
		if self.is_disposed() {
			return false;
		}
		if self.position(field.id()).is_some() {
			tracing::warn!(table = %self.id, field = field.id(), "column id already in use");
			return false;
		}
		if self.column_count() >= FIELD_LIMIT {
			tracing::warn!(table = %self.id, limit = FIELD_LIMIT, "column limit reached");
			return false;
		}

		self.fields.update(|fields| {
			let index = index.unwrap_or(fields.len()).min(fields.len());
			fields.insert(index, field);
		});
		true
	}

	/// Remove a column by id. Clears the sort if it was on this column.
	pub fn delete_column(&self, field_id: &str) -> Option<Field> {
		if self.is_disposed() {
			return None;
		}
		let index = self.position(field_id)?;

		let sorted_here = self
			.sorting
			.get_once()
			.as_ref()
			.is_some_and(|sort| sort.field_id == field_id);
		if sorted_here {
			self.clear_sort();
		}

		let mut removed = None;
		self.fields.update(|fields| removed = Some(fields.remove(index)));

		if let Some(func) = &self.hooks.on_delete_column {
			func(field_id);
		}
		removed
	}

	pub fn move_column(&self, field_id: &str, new_index: usize) {
		if self.is_disposed() {
			return;
		}
		let Some(index) = self.position(field_id) else {
			return;
		};

		self.fields.update(|fields| {
			let field = fields.remove(index);
			let new_index = new_index.min(fields.len());
			fields.insert(new_index, field);
		});
	}

	/// Resize a column; negative widths clamp to zero. Does not touch the
	/// cell plane.
	pub fn set_column_width(&self, col: usize, width: i64) {
		if self.is_disposed() {
			return;
		}
		if let Some(field) = self.field_at(col) {
			field.set_width(width.clamp(0, i64::from(u32::MAX)) as u32);
		}
	}

	//
	// Sorting
	//

	pub fn sorting(&self) -> Option<SortConfig> {
		if self.is_disposed() {
			return None;
		}
		self.sorting.get_once().clone()
	}

	pub fn set_sort(&self, field_id: &str, direction: SortDirection) {
		if self.is_disposed() {
			return;
		}
		self.sorting.set(Some(SortConfig::new(field_id, direction)));
	}

	pub fn clear_sort(&self) {
		if self.is_disposed() {
			return;
		}
		self.sorting.set(None);
	}

	//
	// Pinning
	//

	pub fn pinned_rows(&self) -> PinnedRows {
		if self.is_disposed() {
			return PinnedRows::default();
		}
		self.pinned_rows.borrow().clone()
	}

	/// Pin a row to one side. A row pinned to the other side moves.
	pub fn pin_row(&self, row: usize, side: PinSide) {
		if self.is_disposed() {
			return;
		}
		self.pinned_rows.borrow_mut().pin(row, side);
	}

	pub fn unpin_row(&self, row: usize) {
		if self.is_disposed() {
			return;
		}
		let mut pinned = self.pinned_rows.borrow_mut();
		pinned.top.retain(|r| *r != row);
		pinned.bottom.retain(|r| *r != row);
	}

	//
	// Selection
	//

	pub fn row_selection(&self) -> Vec<usize> {
		if self.is_disposed() {
			return Vec::new();
		}
		self.row_selection.borrow().clone()
	}

	pub fn is_row_selected(&self, row: usize) -> bool {
		!self.is_disposed() && self.row_selection.borrow().contains(&row)
	}

	pub fn select_row(&self, row: usize) {
		if self.is_disposed() {
			return;
		}
		let mut selection = self.row_selection.borrow_mut();
		if !selection.contains(&row) {
			selection.push(row);
		}
	}

	pub fn deselect_row(&self, row: usize) {
		if self.is_disposed() {
			return;
		}
		self.row_selection.borrow_mut().retain(|r| *r != row);
	}

	pub fn deselect_all_rows(&self) {
		if self.is_disposed() {
			return;
		}
		self.row_selection.borrow_mut().clear();
	}
}

impl Drop for TableModel {
	fn drop(&mut self) {
		self.dispose();
	}
}

impl std::fmt::Debug for TableModel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TableModel")
			.field("id", &self.id)
			.field("lifecycle", &self.lifecycle.get())
			.field("columns", &self.fields.get_once().len())
			.field("rows", &self.rows.len())
			.finish()
	}
}

/// Forwards cell notifications to the renderer in display coordinates.
struct RendererSink {
	renderer: Rc<dyn GridRenderer>,
	display_order: Computed<DisplayOrder>,
}

impl CellSink for RendererSink {
	fn cell_changed(&self, col: usize, row: usize) {
		let row = self.display_order.get_once().display_index(row);
		self.renderer.update_if_within_bounds(CellKey::new(col, row));
	}

	fn plane_rebuilt(&self, _columns: usize, _rows: usize) {
		self.renderer.update_cells(true);
	}
}

/// Display order under the current sort. Empty values sort last in both
/// directions; ties keep data order.
fn display_order(
	fields: Var<Vec<Field>>,
	rows: Rows,
	sorting: Var<Option<SortConfig>>,
) -> Computed<DisplayOrder> {
	Computed::new(Box::new(move |ev: &Evaluation| {
		let Some(sort) = sorting.get(ev).clone() else {
			return DisplayOrder::default();
		};
		let field = fields
			.get(ev)
			.iter()
			.find(|f| f.id() == sort.field_id)
			.cloned();
		let Some(field) = field else {
			return DisplayOrder::default();
		};

		let mut keyed: Vec<(usize, Value)> = rows
			.get(ev)
			.iter()
			.enumerate()
			.map(|(index, record)| (index, field.read(record, ev)))
			.collect();

		keyed.sort_by(|(_, a), (_, b)| match (a.is_empty(), b.is_empty()) {
			(true, true) => Ordering::Equal,
			(true, false) => Ordering::Greater,
			(false, true) => Ordering::Less,
			(false, false) => match sort.direction {
				SortDirection::Asc => a.sort_cmp(b),
				SortDirection::Desc => a.sort_cmp(b).reverse(),
			},
		});

		DisplayOrder::from_permutation(keyed.into_iter().map(|(index, _)| index).collect())
	}))
}

/// Repaints the whole grid when the display order changes, which is when
/// every display coordinate may point at a different row.
fn row_order_watcher(
	display_order: Computed<DisplayOrder>,
	live: Weak<()>,
	renderer: Rc<dyn GridRenderer>,
	scheduler: Rc<dyn Scheduler>,
	hooks: Rc<TableHooks>,
) -> Reaction {
	let first = Cell::new(true);
	Reaction::subscribe(
		"row-order",
		Box::new(move |ev: &Evaluation| {
			let _ = display_order.get(ev);
			if first.replace(false) {
				return;
			}

			scheduler.schedule(Box::new(enclose!((live, renderer, hooks) move || {
				if live.upgrade().is_none() {
					tracing::trace!("dropping row order repaint after dispose");
					return;
				}
				let result = catch_unwind(AssertUnwindSafe(|| {
					renderer.update_cells(true);
					if let Some(func) = &hooks.on_row_order_changed {
						func();
					}
				}));
				if result.is_err() {
					tracing::error!("row order handler panicked");
				}
			})));
		}),
	)
}
