/// Misuse of a table model or a malformed cell key.
///
/// Out-of-bounds coordinates and unknown column ids are not errors: the
/// operations that take them quietly do nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
	/// `open` was called on a model that is already open.
	#[error("table model `{0}` is already open")]
	AlreadyOpen(String),

	/// The model was disposed and cannot be reopened.
	#[error("table model `{0}` has been disposed")]
	Disposed(String),

	/// A cell key did not have the `col,row` form.
	#[error("invalid cell key `{0}`")]
	InvalidCellKey(String),
}
