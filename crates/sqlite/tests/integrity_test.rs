use declite_core::{
    Column, DiffOptions, Error, IntegrityError, OnDelete, Operation, Schema, SqlValue, Table,
};
use declite_sqlite::{Database, DatabaseOptions};

fn blog_schema() -> Schema {
    Schema::new(vec![
        Table::new(
            "users",
            vec![
                Column::new("id", "INTEGER").primary_key().build().unwrap(),
                Column::new("name", "TEXT").required().build().unwrap(),
            ],
            Vec::new(),
        )
        .unwrap(),
        Table::new(
            "posts",
            vec![
                Column::new("id", "INTEGER").primary_key().build().unwrap(),
                Column::new("author", "INTEGER")
                    .required()
                    .references("users", OnDelete::Cascade)
                    .build()
                    .unwrap(),
            ],
            Vec::new(),
        )
        .unwrap(),
    ])
    .unwrap()
}

fn seed(db: &mut Database) {
    db.migrate(&blog_schema(), &DiffOptions::default())
        .expect("blog schema migrates");
    db.execute("INSERT INTO users (id, name) VALUES (1, 'ada')", &[])
        .expect("user inserts");
    db.execute("INSERT INTO posts (id, author) VALUES (10, 1)", &[])
        .expect("post inserts");
}

#[test]
fn dropping_a_referenced_table_surfaces_an_integrity_violation() {
    let mut db =
        Database::in_memory(DatabaseOptions::default()).expect("in-memory database should open");
    seed(&mut db);

    let without_users = Schema::new(vec![blog_schema().get("posts").unwrap().clone()]).unwrap();
    let error = db
        .migrate(&without_users, &DiffOptions::default())
        .unwrap_err();

    match error {
        Error::Integrity(IntegrityError { violations }) => {
            assert!(!violations.is_empty());
            assert_eq!(violations[0].table, "posts");
            assert_eq!(violations[0].parent, "users");
            assert_eq!(violations[0].rowid, Some(10));
        }
        other => panic!("expected an integrity error, got {other:?}"),
    }
}

#[test]
fn rebuilding_a_referenced_table_keeps_children_valid() {
    let mut db =
        Database::in_memory(DatabaseOptions::default()).expect("in-memory database should open");
    seed(&mut db);

    // Reordering forces a full rebuild of the parent while a child points
    // at it; enforcement is off for the duration and re-checked at the end.
    db.apply_diff(&[Operation::ReorderColumns {
        table: "users".to_string(),
        order: vec!["name".to_string(), "id".to_string()],
    }])
    .expect("parent rebuild applies");

    let rows = db
        .execute(
            "SELECT users.name FROM posts JOIN users ON users.id = posts.author",
            &[],
        )
        .expect("join succeeds");
    assert_eq!(rows, vec![vec![SqlValue::Text("ada".to_string())]]);
}

#[test]
fn enforcement_pragma_is_restored_after_a_migration() {
    let mut db =
        Database::in_memory(DatabaseOptions::default()).expect("in-memory database should open");
    seed(&mut db);

    // With enforcement back on, an orphaning insert must fail.
    let error = db
        .execute("INSERT INTO posts (id, author) VALUES (11, 99)", &[])
        .unwrap_err();
    assert!(matches!(error, Error::Execution(_)));
}

#[test]
fn enforcement_stays_off_when_opened_that_way() {
    let mut db = Database::in_memory(DatabaseOptions {
        enforce_foreign_keys: false,
        ..DatabaseOptions::default()
    })
    .expect("in-memory database should open");
    seed(&mut db);

    db.execute("INSERT INTO posts (id, author) VALUES (11, 99)", &[])
        .expect("orphan insert is allowed without enforcement");
}
