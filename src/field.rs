//! Column definitions and value formatting.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use smallvec::SmallVec;

use crate::reactive::{Evaluation, Var};
use crate::record::{Record, Value};

pub const DEFAULT_COLUMN_WIDTH: u32 = 256;

/// Maximum number of columns a table accepts.
pub const FIELD_LIMIT: usize = 32;

/// Dotted property path, e.g. `address.city`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
	segments: SmallVec<[String; 2]>,
}

impl FieldPath {
	pub fn new(path: &str) -> Self {
		FieldPath {
			segments: path
				.split('.')
				.filter(|s| !s.is_empty())
				.map(str::to_owned)
				.collect(),
		}
	}

	pub fn segments(&self) -> &[String] {
		&self.segments
	}

	pub fn is_empty(&self) -> bool {
		self.segments.is_empty()
	}
}

impl fmt::Display for FieldPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.segments.join("."))
	}
}

impl From<&str> for FieldPath {
	fn from(path: &str) -> Self {
		FieldPath::new(path)
	}
}

impl From<String> for FieldPath {
	fn from(path: String) -> Self {
		FieldPath::new(&path)
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FieldKind {
	#[default]
	Text,
	Number,
	Boolean,
	Currency {
		decimals: u8,
	},
	/// The property holds another object; `path` picks the value shown.
	Reference {
		path: Option<FieldPath>,
	},
}

impl FieldKind {
	pub fn format_for_display(&self, value: &Value) -> String {
		match (self, value) {
			(FieldKind::Currency { decimals }, Value::Number(n)) if n.is_finite() => {
				format!("{:.*}", usize::from(*decimals), n)
			}
			(_, value) => value.to_string(),
		}
	}

	/// Text placed in a cell editor. Unlike display, currency keeps full
	/// precision.
	pub fn format_for_editing(&self, value: &Value) -> String {
		value.to_string()
	}

	/// Coerce editor input to the column's type. Input that does not parse
	/// is kept as text.
	pub fn parse_value(&self, value: Value) -> Value {
		let Value::Text(text) = value else {
			return value;
		};

		match self {
			FieldKind::Number | FieldKind::Currency { .. } => {
				let trimmed = text.trim();
				if trimmed.is_empty() {
					Value::Null
				} else {
					trimmed
						.parse::<f64>()
						.map(Value::Number)
						.unwrap_or(Value::Text(text))
				}
			}
			FieldKind::Boolean => match text.trim().to_ascii_lowercase().as_str() {
				"" => Value::Null,
				"true" => Value::Bool(true),
				"false" => Value::Bool(false),
				_ => Value::Text(text),
			},
			FieldKind::Text | FieldKind::Reference { .. } => Value::Text(text),
		}
	}
}

/// A column: stable id, the path it reads on each row, its kind, and the
/// presentation state (label, width) that can change without reshaping the
/// table.
///
/// `Field` is a shared handle. Only `id`, `path` and `kind` take part in its
/// hash, so resizing or relabeling never invalidates the cell plane.
#[derive(Clone)]
pub struct Field {
	body: Rc<FieldBody>,
}

#[derive(Clone)]
struct FieldBody {
	id: String,
	path: FieldPath,
	kind: FieldKind,
	label: Var<Option<String>>,
	width: Var<u32>,
	resizable: bool,
}

impl Field {
	pub fn new(id: impl Into<String>, path: impl Into<FieldPath>) -> Self {
		Field {
			body: Rc::new(FieldBody {
				id: id.into(),
				path: path.into(),
				kind: FieldKind::default(),
				label: Var::new(None),
				width: Var::new(DEFAULT_COLUMN_WIDTH),
				resizable: true,
			}),
		}
	}

	pub fn with_kind(self, kind: FieldKind) -> Self {
		Field {
			body: Rc::new(FieldBody {
				kind,
				..self.body.as_ref().clone()
			}),
		}
	}

	pub fn with_label(self, label: impl Into<String>) -> Self {
		self.body.label.set(Some(label.into()));
		self
	}

	pub fn with_width(self, width: u32) -> Self {
		self.body.width.set(width);
		self
	}

	pub fn with_resizable(self, resizable: bool) -> Self {
		Field {
			body: Rc::new(FieldBody {
				resizable,
				..self.body.as_ref().clone()
			}),
		}
	}

	pub fn id(&self) -> &str {
		&self.body.id
	}

	pub fn path(&self) -> &FieldPath {
		&self.body.path
	}

	pub fn kind(&self) -> &FieldKind {
		&self.body.kind
	}

	pub fn resizable(&self) -> bool {
		self.body.resizable
	}

	/// Header text: the label, or the path when there is none.
	pub fn title(&self, eval: &impl AsRef<Evaluation>) -> String {
		match &*self.body.label.get(eval) {
			Some(label) => label.clone(),
			None => self.body.path.to_string(),
		}
	}

	pub fn title_once(&self) -> String {
		match &*self.body.label.get_once() {
			Some(label) => label.clone(),
			None => self.body.path.to_string(),
		}
	}

	pub fn set_label(&self, label: Option<String>) {
		self.body.label.set(label);
	}

	pub fn width(&self, eval: &impl AsRef<Evaluation>) -> u32 {
		*self.body.width.get(eval)
	}

	pub fn width_once(&self) -> u32 {
		*self.body.width.get_once()
	}

	pub fn set_width(&self, width: u32) {
		self.body.width.set(width);
	}

	/// Tracked read of this column's value on `record`, following the
	/// reference path for reference columns.
	pub fn read(&self, record: &Record, eval: &impl AsRef<Evaluation>) -> Value {
		let value = record.get_path(&self.body.path, eval);
		match (&self.body.kind, value) {
			(FieldKind::Reference { path: Some(path) }, Value::Object(target)) => {
				target.get_path(path, eval)
			}
			(_, value) => value,
		}
	}

	pub fn read_once(&self, record: &Record) -> Value {
		let value = record.get_path_once(&self.body.path);
		match (&self.body.kind, value) {
			(FieldKind::Reference { path: Some(path) }, Value::Object(target)) => {
				target.get_path_once(path)
			}
			(_, value) => value,
		}
	}

	pub fn display(&self, record: &Record, eval: &impl AsRef<Evaluation>) -> String {
		self.body.kind.format_for_display(&self.read(record, eval))
	}

	pub fn ptr_eq(&self, other: &Field) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}
}

impl Hash for Field {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.body.id.hash(state);
		self.body.path.hash(state);
		self.body.kind.hash(state);
	}
}

impl fmt::Debug for Field {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Field")
			.field("id", &self.body.id)
			.field("path", &self.body.path)
			.field("kind", &self.body.kind)
			.field("width", &self.width_once())
			.finish()
	}
}
