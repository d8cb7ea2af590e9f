//! Convenience macro for defining migration lists.

/// Build a `Vec<Migration>` from `(version, idx, name, sql)` tuples.
///
/// # Example
///
/// ```
/// use trackway::migrations;
///
/// let migrations = migrations![
///     (1, 0, "create users", "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)"),
///     (2, 0, "add email", "ALTER TABLE users ADD COLUMN email TEXT"),
/// ];
/// assert_eq!(migrations.len(), 2);
/// assert_eq!(migrations[1].name, "add email");
/// ```
#[macro_export]
macro_rules! migrations {
    ($(($version:expr, $idx:expr, $name:expr, $sql:expr)),* $(,)?) => {
        vec![$($crate::Migration::new($name, $version, $idx, $sql)),*]
    };
}
