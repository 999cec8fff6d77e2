//! The reactive cell plane and the derived header and column views.
//!
//! [`cell_plane`] reads only the column list and the row sequence. Each cell
//! gets its own [`Computed`] that captures its field and row and reads just
//! that property, so value edits recompute one cell and leave the plane alone.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use enclose::enclose;
use fxhash::FxHashMap;

use crate::error::TableError;
use crate::field::Field;
use crate::reactive::{Computed, Evaluation, Var};
use crate::record::Rows;

/// Width of the frozen row-action column.
pub const ACTION_COLUMN_WIDTH: u32 = 40;

static GENERATION: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
	pub col: usize,
	pub row: usize,
}

impl CellKey {
	pub fn new(col: usize, row: usize) -> Self {
		CellKey { col, row }
	}
}

impl fmt::Display for CellKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{},{}", self.col, self.row)
	}
}

impl FromStr for CellKey {
	type Err = TableError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let invalid = || TableError::InvalidCellKey(s.to_owned());
		let (col, row) = s.split_once(',').ok_or_else(invalid)?;
		Ok(CellKey {
			col: col.trim().parse().map_err(|_| invalid())?,
			row: row.trim().parse().map_err(|_| invalid())?,
		})
	}
}

impl From<(usize, usize)> for CellKey {
	fn from((col, row): (usize, usize)) -> Self {
		CellKey { col, row }
	}
}

/// One cell derivation per in-bounds coordinate for a fixed table shape.
///
/// Every rebuild gets a fresh generation, and the generation is the plane's
/// version: observers see a new plane exactly when it was rebuilt.
pub struct CellPlane {
	generation: u64,
	columns: usize,
	rows: usize,
	cells: FxHashMap<CellKey, Computed<String>>,
}

impl CellPlane {
	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn columns(&self) -> usize {
		self.columns
	}

	pub fn rows(&self) -> usize {
		self.rows
	}

	pub fn len(&self) -> usize {
		self.cells.len()
	}

	pub fn is_empty(&self) -> bool {
		self.cells.is_empty()
	}

	pub fn contains(&self, key: CellKey) -> bool {
		key.col < self.columns && key.row < self.rows
	}

	pub fn get(&self, key: CellKey) -> Option<&Computed<String>> {
		self.cells.get(&key)
	}

	pub fn iter(&self) -> impl Iterator<Item = (CellKey, &Computed<String>)> {
		self.cells.iter().map(|(key, cell)| (*key, cell))
	}
}

impl Hash for CellPlane {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.generation.hash(state);
	}
}

impl fmt::Debug for CellPlane {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CellPlane")
			.field("generation", &self.generation)
			.field("columns", &self.columns)
			.field("rows", &self.rows)
			.finish()
	}
}

pub fn cell_plane(fields: Var<Vec<Field>>, rows: Rows) -> Computed<CellPlane> {
	Computed::new(Box::new(move |ev: &Evaluation| {
		let fields = fields.get(ev);
		let rows = rows.get(ev);

		let mut cells = FxHashMap::default();
		cells.reserve(fields.len() * rows.len());
		for (row_index, record) in rows.iter().enumerate() {
			for (col_index, field) in fields.iter().enumerate() {
				let cell = Computed::new(Box::new(enclose!((field, record) move |ev: &Evaluation| {
					field.display(&record, ev)
				})));
				cells.insert(CellKey::new(col_index, row_index), cell);
			}
		}

		let generation = GENERATION.fetch_add(1, Ordering::Relaxed) + 1;
		tracing::debug!(
			generation,
			columns = fields.len(),
			rows = rows.len(),
			"cell plane built"
		);

		CellPlane {
			generation,
			columns: fields.len(),
			rows: rows.len(),
			cells,
		}
	}))
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HeaderCell {
	pub value: String,
	pub field_id: String,
	pub resizable: bool,
	pub readonly: bool,
}

pub type HeaderCells = BTreeMap<usize, HeaderCell>;

pub fn header_cells(fields: Var<Vec<Field>>) -> Computed<HeaderCells> {
	Computed::new(Box::new(move |ev: &Evaluation| {
		fields
			.get(ev)
			.iter()
			.enumerate()
			.map(|(index, field)| {
				let cell = HeaderCell {
					value: field.title(ev),
					field_id: field.id().to_owned(),
					resizable: field.resizable(),
					readonly: true,
				};
				(index, cell)
			})
			.collect()
	}))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AxisMeta {
	pub size: u32,
	pub resizable: bool,
}

/// Column sizes for the grid body and the frozen action column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ColumnMeta {
	pub grid: BTreeMap<usize, AxisMeta>,
	pub frozen_cols_end: BTreeMap<usize, AxisMeta>,
}

pub fn column_meta(fields: Var<Vec<Field>>) -> Computed<ColumnMeta> {
	Computed::new(Box::new(move |ev: &Evaluation| {
		let grid = fields
			.get(ev)
			.iter()
			.enumerate()
			.map(|(index, field)| {
				let meta = AxisMeta {
					size: field.width(ev),
					resizable: field.resizable(),
				};
				(index, meta)
			})
			.collect();

		let mut frozen_cols_end = BTreeMap::new();
		frozen_cols_end.insert(
			0,
			AxisMeta {
				size: ACTION_COLUMN_WIDTH,
				resizable: false,
			},
		);

		ColumnMeta {
			grid,
			frozen_cols_end,
		}
	}))
}
