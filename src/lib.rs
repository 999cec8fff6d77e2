//! Reactive cell plane for virtualized table grids.
//!
//! A [`TableModel`] maps a live row sequence onto `(column, row)` cells and
//! tells a [`GridRenderer`] exactly which cell to repaint when a row property
//! changes. Structural changes (columns added, moved or removed; rows
//! inserted, removed or reordered) rebuild the [`CellPlane`] and every cell
//! subscription with it.
//!
//! Change tracking is built on the small observable core in [`reactive`]:
//! [`Var`](reactive::Var) sources, cached [`Computed`](reactive::Computed)
//! derivations and [`Reaction`](reactive::Reaction) effects.

pub mod macros;
pub mod reactive;

mod error;
mod field;
mod listener;
mod microtask;
mod plane;
mod record;
mod scheduler;
mod table;

pub use error::TableError;
pub use field::{Field, FieldKind, FieldPath, DEFAULT_COLUMN_WIDTH, FIELD_LIMIT};
pub use listener::{CellSink, CellUpdateListener};
pub use plane::{
	cell_plane, column_meta, header_cells, AxisMeta, CellKey, CellPlane, ColumnMeta, HeaderCell,
	HeaderCells, ACTION_COLUMN_WIDTH,
};
pub use record::{format_number, Record, Rows, Value};
#[cfg(target_arch = "wasm32")]
pub use scheduler::Microtask;
pub use scheduler::{default_scheduler, Immediate, Scheduler, Task, TaskQueue};
pub use table::{
	Accessory, DisplayOrder, GridCell, GridCells, GridPlane, GridRange, GridRenderer, PinSide,
	PinnedRows, SortConfig, SortDirection, TableModel, TableOptions,
};
