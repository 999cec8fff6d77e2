use observe_table::reactive::Var;
use observe_table::{
	cell_plane, column_meta, header_cells, CellKey, Field, TableError, ACTION_COLUMN_WIDTH,
	DEFAULT_COLUMN_WIDTH,
};

use crate::{columns, people, person};

#[test]
fn cell_keys_round_trip_through_text() {
	let key = CellKey::new(3, 7);
	assert_eq!(key.to_string(), "3,7");
	assert_eq!("3,7".parse::<CellKey>(), Ok(key));
	assert_eq!(" 3 , 7 ".parse::<CellKey>(), Ok(key));
	assert_eq!(CellKey::from((3, 7)), key);

	for bad in ["", "3", "3;7", "a,7", "3,-1"] {
		assert_eq!(
			bad.parse::<CellKey>(),
			Err(TableError::InvalidCellKey(bad.to_owned()))
		);
	}
}

#[test]
fn plane_covers_every_in_bounds_coordinate() {
	let plane = cell_plane(Var::new(columns()), people());
	let plane = plane.get_once();

	assert_eq!(plane.columns(), 2);
	assert_eq!(plane.rows(), 3);
	assert_eq!(plane.len(), 6);
	for col in 0..2 {
		for row in 0..3 {
			assert!(plane.contains(CellKey::new(col, row)));
		}
	}
	assert!(!plane.contains(CellKey::new(2, 0)));
	assert!(!plane.contains(CellKey::new(0, 3)));

	let age = plane.get(CellKey::new(1, 2)).expect("cell (1,2)");
	assert_eq!(*age.get_once(), "41");
}

#[test]
fn value_edits_keep_the_plane() {
	let rows = people();
	let plane = cell_plane(Var::new(columns()), rows.clone());
	let generation = plane.get_once().generation();

	rows.row(1).expect("row 1").set("age", 99);
	assert_eq!(plane.get_once().generation(), generation);

	let cell = plane.get_once().get(CellKey::new(1, 1)).cloned().expect("cell");
	assert_eq!(*cell.get_once(), "99");
}

#[test]
fn cells_read_only_their_own_property() {
	let rows = people();
	let plane = cell_plane(Var::new(columns()), rows.clone());

	let bob = rows.row(1).expect("bob");
	assert_eq!(bob.observer_count("name"), 1);
	assert_eq!(bob.observer_count("age"), 1);

	bob.set("name", "robert");
	let plane = plane.get_once();
	let age = plane.get(CellKey::new(1, 1)).expect("cell");
	let name = plane.get(CellKey::new(0, 1)).expect("cell");
	assert!(age.is_valid());
	assert!(!name.is_valid());
	assert_eq!(*name.get_once(), "robert");
}

#[test]
fn structural_changes_rebuild_the_plane() {
	let fields = Var::new(columns());
	let rows = people();
	let plane = cell_plane(fields.clone(), rows.clone());
	let first = plane.get_once().generation();

	rows.push(person("dave", 19));
	let second = plane.get_once().generation();
	assert_ne!(first, second);
	assert_eq!(plane.get_once().rows(), 4);

	fields.update(|fields| fields.reverse());
	let third = plane.get_once().generation();
	assert_ne!(second, third);
	assert_eq!(
		*plane
			.get_once()
			.get(CellKey::new(0, 3))
			.expect("cell")
			.get_once(),
		"19"
	);
}

#[test]
fn rebuilt_planes_release_old_cells() {
	let rows = people();
	let plane = cell_plane(Var::new(columns()), rows.clone());
	let alice = rows.row(0).expect("alice");
	assert_eq!(alice.observer_count("age"), 1);

	rows.remove(0);
	let _ = plane.get_once();
	assert_eq!(alice.observer_count("age"), 0);
}

#[test]
fn presentation_changes_do_not_rebuild() {
	let fields = Var::new(columns());
	let plane = cell_plane(fields.clone(), people());
	let header = header_cells(fields.clone());
	let meta = column_meta(fields.clone());
	let generation = plane.get_once().generation();

	assert_eq!(header.get_once()[&0].value, "Name");
	assert_eq!(header.get_once()[&1].value, "age");
	assert_eq!(meta.get_once().grid[&1].size, DEFAULT_COLUMN_WIDTH);
	assert_eq!(meta.get_once().frozen_cols_end[&0].size, ACTION_COLUMN_WIDTH);
	assert!(!meta.get_once().frozen_cols_end[&0].resizable);

	let age: Field = fields.get_once()[1].clone();
	age.set_width(120);
	age.set_label(Some("Age".to_owned()));

	assert_eq!(meta.get_once().grid[&1].size, 120);
	assert_eq!(header.get_once()[&1].value, "Age");
	assert_eq!(plane.get_once().generation(), generation);
}
