use declite_core::{
    Column, DiffOptions, Error, Operation, Schema, SqlValue, Table,
};
use declite_sqlite::{Database, DatabaseOptions};

fn open() -> Database {
    Database::in_memory(DatabaseOptions::default()).expect("in-memory database should open")
}

fn int_pk(name: &str) -> Column {
    Column::new(name, "INTEGER").primary_key().build().unwrap()
}

fn text(name: &str) -> Column {
    Column::new(name, "TEXT").build().unwrap()
}

fn text_not_null(name: &str) -> Column {
    Column::new(name, "TEXT").required().build().unwrap()
}

fn integer(name: &str) -> Column {
    Column::new(name, "INTEGER").build().unwrap()
}

fn single_table(columns: Vec<Column>) -> Schema {
    Schema::new(vec![Table::new("t", columns, Vec::new()).unwrap()]).unwrap()
}

/// Migrating a second time must be a no-op: the second diff is empty.
fn assert_converged(db: &mut Database, declared: &Schema) {
    let remaining = db
        .diff(declared, &DiffOptions::default())
        .expect("diff after migrate should succeed");
    assert!(
        remaining.is_empty(),
        "second diff must be empty, got {remaining:?}"
    );
}

#[test]
fn scenario_add_column() {
    let mut db = open();
    let v1 = single_table(vec![int_pk("a"), text("b")]);
    db.migrate(&v1, &DiffOptions::default()).expect("v1 migrates");
    db.execute(
        "INSERT INTO t (a, b) VALUES (1, 'x')",
        &[],
    )
    .expect("seed row inserts");

    let v2 = single_table(vec![int_pk("a"), text("b"), integer("c")]);
    let ops = db.diff(&v2, &DiffOptions::default()).expect("diff succeeds");
    assert_eq!(ops.len(), 1);
    assert!(matches!(&ops[0], Operation::AddColumn { column, .. } if column.name() == "c"));

    db.apply_diff(&ops).expect("add column applies");

    let live = db.introspect().expect("introspection succeeds");
    let names = live.get("t").unwrap().column_names().collect::<Vec<_>>();
    assert_eq!(names, ["a", "b", "c"]);

    let rows = db.execute("SELECT * FROM t", &[]).expect("select succeeds");
    assert_eq!(
        rows,
        vec![vec![
            SqlValue::Integer(1),
            SqlValue::Text("x".to_string()),
            SqlValue::Null,
        ]]
    );
    assert_converged(&mut db, &v2);
}

#[test]
fn scenario_rename_column_with_detection_on() {
    let mut db = open();
    let v1 = single_table(vec![int_pk("a"), text_not_null("name")]);
    db.migrate(&v1, &DiffOptions::default()).expect("v1 migrates");
    db.execute("INSERT INTO t (a, name) VALUES (1, 'x')", &[])
        .expect("seed row inserts");

    let v2 = single_table(vec![int_pk("a"), text_not_null("legal_name")]);
    let ops = db.diff(&v2, &DiffOptions::default()).expect("diff succeeds");
    assert_eq!(
        ops,
        vec![Operation::RenameColumn {
            table: "t".to_string(),
            from: "name".to_string(),
            to: "legal_name".to_string(),
        }]
    );

    db.apply_diff(&ops).expect("rename applies");
    let rows = db
        .execute("SELECT a, legal_name FROM t", &[])
        .expect("select succeeds");
    assert_eq!(
        rows,
        vec![vec![SqlValue::Integer(1), SqlValue::Text("x".to_string())]]
    );
    assert_converged(&mut db, &v2);
}

#[test]
fn scenario_rename_detection_off_drops_and_adds() {
    let mut db = open();
    let v1 = single_table(vec![int_pk("a"), text_not_null("name")]);
    db.migrate(&v1, &DiffOptions::default()).expect("v1 migrates");
    db.execute("INSERT INTO t (a, name) VALUES (1, 'x')", &[])
        .expect("seed row inserts");

    let options = DiffOptions {
        detect_renaming: false,
        ..DiffOptions::default()
    };
    let v2 = single_table(vec![int_pk("a"), text_not_null("legal_name")]);
    let ops = db.diff(&v2, &options).expect("diff succeeds");
    assert_eq!(ops.len(), 2);
    assert!(matches!(&ops[0], Operation::DropColumn { column, .. } if column == "name"));
    assert!(matches!(&ops[1], Operation::AddColumn { column, .. } if column.name() == "legal_name"));

    db.apply_diff(&ops).expect("drop+add applies");

    // The row survives but the old column's data is gone.
    let rows = db
        .execute("SELECT a, legal_name FROM t", &[])
        .expect("select succeeds");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], SqlValue::Integer(1));
    assert_ne!(rows[0][1], SqlValue::Text("x".to_string()));
    assert_converged(&mut db, &v2);
}

#[test]
fn scenario_reorder_columns() {
    let mut db = open();
    let v1 = single_table(vec![int_pk("a"), text("b"), integer("c")]);
    db.migrate(&v1, &DiffOptions::default()).expect("v1 migrates");
    db.execute("INSERT INTO t (a, b, c) VALUES (1, 'x', 7)", &[])
        .expect("seed row inserts");

    let v2 = single_table(vec![int_pk("a"), integer("c"), text("b")]);
    let ops = db.diff(&v2, &DiffOptions::default()).expect("diff succeeds");
    assert_eq!(
        ops,
        vec![Operation::ReorderColumns {
            table: "t".to_string(),
            order: vec!["a".to_string(), "c".to_string(), "b".to_string()],
        }]
    );

    db.apply_diff(&ops).expect("reorder applies");

    let live = db.introspect().expect("introspection succeeds");
    let names = live.get("t").unwrap().column_names().collect::<Vec<_>>();
    assert_eq!(names, ["a", "c", "b"]);

    let rows = db.execute("SELECT * FROM t", &[]).expect("select succeeds");
    assert_eq!(
        rows,
        vec![vec![
            SqlValue::Integer(1),
            SqlValue::Integer(7),
            SqlValue::Text("x".to_string()),
        ]]
    );
    assert_converged(&mut db, &v2);
}

#[test]
fn scenario_drop_table_and_create_table() {
    let mut db = open();
    let v1 = Schema::new(vec![
        Table::new("old", vec![integer("x")], Vec::new()).unwrap(),
    ])
    .unwrap();
    db.migrate(&v1, &DiffOptions::default()).expect("v1 migrates");

    let v2 = Schema::new(vec![
        Table::new("new", vec![text("y")], Vec::new()).unwrap(),
    ])
    .unwrap();
    let ops = db.diff(&v2, &DiffOptions::default()).expect("diff succeeds");
    assert_eq!(ops.len(), 2);
    assert!(matches!(&ops[0], Operation::CreateTable(table) if table.name() == "new"));
    assert!(matches!(&ops[1], Operation::DropTable { table } if table == "old"));

    db.apply_diff(&ops).expect("create+drop applies");

    let live = db.introspect().expect("introspection succeeds");
    assert!(live.get("old").is_none());
    assert!(live.get("new").is_some());
    let rows = db
        .execute("SELECT * FROM new", &[])
        .expect("select succeeds");
    assert!(rows.is_empty());
    assert_converged(&mut db, &v2);
}

#[test]
fn scenario_ambiguous_rename_falls_back_to_drop_and_add() {
    let mut db = open();
    let v1 = single_table(vec![int_pk("a"), text("x"), text("y")]);
    db.migrate(&v1, &DiffOptions::default()).expect("v1 migrates");

    let v2 = single_table(vec![int_pk("a"), text("x"), text("z")]);
    let ops = db.diff(&v2, &DiffOptions::default()).expect("diff succeeds");
    assert_eq!(ops.len(), 2);
    assert!(matches!(&ops[0], Operation::DropColumn { column, .. } if column == "y"));
    assert!(matches!(&ops[1], Operation::AddColumn { column, .. } if column.name() == "z"));

    db.apply_diff(&ops).expect("drop+add applies");
    assert_converged(&mut db, &v2);
}

#[test]
fn scenario_ambiguous_rename_fails_in_strict_mode() {
    let mut db = open();
    let v1 = single_table(vec![int_pk("a"), text("x"), text("y")]);
    db.migrate(&v1, &DiffOptions::default()).expect("v1 migrates");

    let v2 = single_table(vec![int_pk("a"), text("x"), text("z")]);
    let options = DiffOptions {
        strict: true,
        ..DiffOptions::default()
    };
    let error = db.diff(&v2, &options).unwrap_err();
    assert!(matches!(error, Error::Diff(_)));
}

#[test]
fn migrate_is_idempotent_across_every_operation_kind() {
    let mut db = open();
    let v1 = Schema::new(vec![
        Table::new(
            "t",
            vec![int_pk("a"), text("b"), text_not_null("old"), integer("gone")],
            Vec::new(),
        )
        .unwrap(),
        Table::new("obsolete", vec![integer("x")], Vec::new()).unwrap(),
    ])
    .unwrap();
    db.migrate(&v1, &DiffOptions::default()).expect("v1 migrates");
    db.execute(
        "INSERT INTO t (a, b, old, gone) VALUES (1, 'keep', 'r', 9)",
        &[],
    )
    .expect("seed row inserts");

    let v2 = Schema::new(vec![
        Table::new(
            "t",
            vec![
                int_pk("a"),
                integer("b"),
                text_not_null("renamed"),
                text("fresh"),
            ],
            Vec::new(),
        )
        .unwrap(),
        Table::new("brand_new", vec![int_pk("id")], Vec::new()).unwrap(),
    ])
    .unwrap();

    db.migrate(&v2, &DiffOptions::default()).expect("v2 migrates");
    assert_converged(&mut db, &v2);

    let live = db.introspect().expect("introspection succeeds");
    assert_eq!(live.get("t").unwrap(), v2.get("t").unwrap());
    assert!(live.get("obsolete").is_none());
    assert!(live.get("brand_new").is_some());

    let rows = db
        .execute("SELECT a, renamed FROM t", &[])
        .expect("select succeeds");
    assert_eq!(
        rows,
        vec![vec![SqlValue::Integer(1), SqlValue::Text("r".to_string())]]
    );
}
