//! Row objects and the row sequence a table reads from.
//!
//! Every property of a [`Record`] is its own [`Var`], so a cell derivation
//! that reads one property is invalidated by writes to that property only.
//! [`Rows`] versions the sequence by length and row identity: inserting,
//! removing, reordering or replacing rows changes it, editing a row does not.

use std::cell::{Ref, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use fxhash::FxHashMap;

use crate::field::FieldPath;
use crate::reactive::{Evaluation, Var};

#[derive(Clone, Debug, Default)]
pub enum Value {
	#[default]
	Null,
	Bool(bool),
	Number(f64),
	Text(String),
	Object(Record),
}

impl Value {
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// Null and the empty string. Empty values sort after everything else.
	pub fn is_empty(&self) -> bool {
		match self {
			Value::Null => true,
			Value::Text(text) => text.is_empty(),
			_ => false,
		}
	}

	pub fn as_number(&self) -> Option<f64> {
		match self {
			Value::Number(n) => Some(*n),
			_ => None,
		}
	}

	pub fn as_text(&self) -> Option<&str> {
		match self {
			Value::Text(text) => Some(text),
			_ => None,
		}
	}

	pub fn as_record(&self) -> Option<&Record> {
		match self {
			Value::Object(record) => Some(record),
			_ => None,
		}
	}

	fn rank(&self) -> u8 {
		match self {
			Value::Bool(_) => 0,
			Value::Number(_) => 1,
			Value::Text(_) => 2,
			Value::Object(_) => 3,
			Value::Null => 4,
		}
	}

	/// Total order used for sorting: booleans, numbers, text, objects, null.
	pub fn sort_cmp(&self, other: &Value) -> Ordering {
		match (self, other) {
			(Value::Bool(a), Value::Bool(b)) => a.cmp(b),
			(Value::Number(a), Value::Number(b)) => a.total_cmp(b),
			(Value::Text(a), Value::Text(b)) => a.cmp(b),
			_ => self.rank().cmp(&other.rank()),
		}
	}
}

/// Render a number without a trailing `.0`. Non-finite numbers render empty.
pub fn format_number(n: f64) -> String {
	if !n.is_finite() {
		return String::new();
	}

	if n.fract() == 0.0 && n.abs() < 1e15 {
		format!("{}", n as i64)
	} else {
		format!("{n}")
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null | Value::Object(_) => Ok(()),
			Value::Bool(b) => write!(f, "{b}"),
			Value::Number(n) => f.write_str(&format_number(*n)),
			Value::Text(text) => f.write_str(text),
		}
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Number(a), Value::Number(b)) => a == b,
			(Value::Text(a), Value::Text(b)) => a == b,
			(Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
			_ => false,
		}
	}
}

impl Hash for Value {
	fn hash<H: Hasher>(&self, state: &mut H) {
		std::mem::discriminant(self).hash(state);
		match self {
			Value::Null => {}
			Value::Bool(b) => b.hash(state),
			Value::Number(n) => n.to_bits().hash(state),
			Value::Text(text) => text.hash(state),
			Value::Object(record) => record.hash(state),
		}
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Value::Bool(value)
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Value::Number(value)
	}
}

impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Value::Number(value.into())
	}
}

impl From<u32> for Value {
	fn from(value: u32) -> Self {
		Value::Number(value.into())
	}
}

impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Value::Number(value as f64)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::Text(value.to_owned())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Value::Text(value)
	}
}

impl From<Record> for Value {
	fn from(value: Record) -> Self {
		Value::Object(value)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map(Into::into).unwrap_or_default()
	}
}

/// A shared row object with free-form reactive properties.
///
/// Cloning a record clones the handle; both handles see the same properties.
#[derive(Clone, Default)]
pub struct Record {
	props: Rc<RefCell<FxHashMap<String, Var<Value>>>>,
}

impl Record {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder-style `set`.
	pub fn with(self, key: &str, value: impl Into<Value>) -> Self {
		self.set(key, value);
		self
	}

	fn property(&self, key: &str) -> Var<Value> {
		self.props
			.borrow_mut()
			.entry(key.to_owned())
			.or_default()
			.clone()
	}

	/// Tracked read. Reading a missing property creates it as `Null`, so a
	/// later write reaches the reader.
	pub fn get(&self, key: &str, eval: &impl AsRef<Evaluation>) -> Value {
		let property = self.property(key);
		let value = property.get(eval).clone();
		value
	}

	pub fn get_once(&self, key: &str) -> Value {
		let property = self.props.borrow().get(key).cloned();
		property
			.map(|p| p.get_once().clone())
			.unwrap_or_default()
	}

	pub fn set(&self, key: &str, value: impl Into<Value>) {
		let value = value.into();
		let property = self.props.borrow().get(key).cloned();
		match property {
			Some(property) => property.set(value),
			None => {
				self.props
					.borrow_mut()
					.insert(key.to_owned(), Var::new(value));
			}
		}
	}

	pub fn contains(&self, key: &str) -> bool {
		self.props.borrow().contains_key(key)
	}

	pub fn keys(&self) -> Vec<String> {
		let mut keys: Vec<String> = self.props.borrow().keys().cloned().collect();
		keys.sort();
		keys
	}

	pub fn get_path(&self, path: &FieldPath, eval: &impl AsRef<Evaluation>) -> Value {
		let Some((last, parents)) = path.segments().split_last() else {
			return Value::Null;
		};

		let mut current = self.clone();
		for segment in parents {
			match current.get(segment, eval) {
				Value::Object(next) => current = next,
				_ => return Value::Null,
			}
		}
		current.get(last, eval)
	}

	pub fn get_path_once(&self, path: &FieldPath) -> Value {
		let Some((last, parents)) = path.segments().split_last() else {
			return Value::Null;
		};

		let mut current = self.clone();
		for segment in parents {
			match current.get_once(segment) {
				Value::Object(next) => current = next,
				_ => return Value::Null,
			}
		}
		current.get_once(last)
	}

	/// Write through a dotted path, creating intermediate objects as needed.
	pub fn set_path(&self, path: &FieldPath, value: impl Into<Value>) {
		let Some((last, parents)) = path.segments().split_last() else {
			return;
		};

		let mut current = self.clone();
		for segment in parents {
			current = match current.get_once(segment) {
				Value::Object(next) => next,
				_ => {
					let next = Record::new();
					current.set(segment, next.clone());
					next
				}
			};
		}
		current.set(last, value);
	}

	/// Live derivations subscribed to one property.
	pub fn observer_count(&self, key: &str) -> usize {
		self.props
			.borrow()
			.get(key)
			.map(Var::observer_count)
			.unwrap_or_default()
	}

	pub fn ptr_eq(&self, other: &Record) -> bool {
		Rc::ptr_eq(&self.props, &other.props)
	}
}

impl Hash for Record {
	fn hash<H: Hasher>(&self, state: &mut H) {
		(Rc::as_ptr(&self.props) as usize).hash(state)
	}
}

impl PartialEq for Record {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl Eq for Record {}

impl fmt::Debug for Record {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut map = f.debug_map();
		for key in self.keys() {
			map.entry(&key, &self.get_once(&key));
		}
		map.finish()
	}
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Record {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let record = Record::new();
		for (key, value) in iter {
			record.set(key.as_ref(), value);
		}
		record
	}
}

/// The ordered, shared row sequence. Owned by whoever feeds the table;
/// the table only reads its shape and the properties of its rows.
#[derive(Clone, Default)]
pub struct Rows {
	rows: Var<Vec<Record>>,
}

impl Rows {
	pub fn new(rows: Vec<Record>) -> Self {
		Rows {
			rows: Var::new(rows),
		}
	}

	pub fn get(&self, eval: &impl AsRef<Evaluation>) -> Ref<'_, Vec<Record>> {
		self.rows.get(eval)
	}

	pub fn snapshot(&self) -> Vec<Record> {
		self.rows.get_once().clone()
	}

	pub fn len(&self) -> usize {
		self.rows.get_once().len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.get_once().is_empty()
	}

	pub fn row(&self, index: usize) -> Option<Record> {
		self.rows.get_once().get(index).cloned()
	}

	pub fn push(&self, row: Record) {
		self.rows.update(|rows| rows.push(row));
	}

	/// Insert at `index`, or at the end when `index` is past it.
	pub fn insert(&self, index: usize, row: Record) {
		self.rows.update(|rows| {
			let index = index.min(rows.len());
			rows.insert(index, row);
		});
	}

	pub fn remove(&self, index: usize) -> Option<Record> {
		let mut removed = None;
		self.rows.update(|rows| {
			if index < rows.len() {
				removed = Some(rows.remove(index));
			}
		});
		removed
	}

	/// Move a row to a new position. Reordering is a structural change.
	pub fn move_row(&self, from: usize, to: usize) -> bool {
		let mut moved = false;
		self.rows.update(|rows| {
			if from < rows.len() {
				let row = rows.remove(from);
				rows.insert(to.min(rows.len()), row);
				moved = true;
			}
		});
		moved
	}

	pub fn replace(&self, rows: Vec<Record>) {
		self.rows.set(rows);
	}

	/// Live derivations subscribed to the sequence itself.
	pub fn observer_count(&self) -> usize {
		self.rows.observer_count()
	}
}

impl FromIterator<Record> for Rows {
	fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
		Rows::new(iter.into_iter().collect())
	}
}

impl fmt::Debug for Rows {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.rows.get_once().iter()).finish()
	}
}
