// Catalog queries against sqlite_master. ORDER BY rowid keeps table order
// equal to creation order, which is what foreign-key-safe creation needs.

pub(crate) const TABLE_DEFINITIONS_QUERY: &str = "\
SELECT name, sql FROM sqlite_master \
WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
ORDER BY rowid";

pub(crate) const TABLE_DEFINITION_QUERY: &str = "\
SELECT sql FROM sqlite_master \
WHERE type = 'table' AND name = :name";

pub(crate) const OBJECT_EXISTS_QUERY: &str = "\
SELECT name FROM sqlite_master WHERE name = :name";

// Auto-created index rows (UNIQUE and PRIMARY KEY constraints) carry a NULL
// sql column and must not be replayed after a rebuild.
pub(crate) const TABLE_INDEX_TRIGGER_QUERY: &str = "\
SELECT sql FROM sqlite_master \
WHERE type IN ('index', 'trigger') AND tbl_name = :name AND sql IS NOT NULL \
ORDER BY rowid";

pub(crate) const SERVER_VERSION_QUERY: &str = "SELECT sqlite_version()";

pub(crate) const FOREIGN_KEY_CHECK_QUERY: &str = "PRAGMA foreign_key_check";
