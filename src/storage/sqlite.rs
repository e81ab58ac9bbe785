//! SQLite storage implementation

use std::path::{Path, PathBuf};
use rusqlite::{Connection, OpenFlags, OptionalExtension, Params};
use crate::record::Row;
use crate::{Error, Result};
use super::schema;

/// Handle to the on-disk trip store.
///
/// The handle only remembers where the store lives and which table holds
/// the trips. Every unit of work opens its own connection through
/// [`RideStore::connect`] and drops it when done.
#[derive(Debug, Clone)]
pub struct RideStore {
    path: PathBuf,
    table: String,
}

impl RideStore {
    /// Open a store file (creates the file and trip table if missing)
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_table(path, schema::DEFAULT_TABLE)
    }

    /// Open a store whose trip table has a non-default name
    pub fn open_table(path: &Path, table: &str) -> Result<Self> {
        Self::open_with_schema(path, table, &schema::create_table_sql(table))
    }

    /// Open a store, creating `table` with `create_sql` when it is absent.
    ///
    /// Views left behind by a previous run are dropped. An existing table is
    /// never recreated or altered.
    pub fn open_with_schema(path: &Path, table: &str, create_sql: &str) -> Result<Self> {
        let open_err = |source| Error::StoreOpen {
            path: path.display().to_string(),
            source,
        };

        let conn = Connection::open(path).map_err(open_err)?;

        // Views go first: a leftover view may hold the trip table's name.
        let dropped = drop_views(&conn).map_err(open_err)?;
        if dropped > 0 {
            tracing::debug!("Cleared {} leftover views", dropped);
        }

        if base_table_exists(&conn, table) {
            tracing::debug!("Table {} present in {}", table, path.display());
        } else {
            tracing::info!("No {} table in {}, initializing", table, path.display());
            conn.execute_batch(create_sql).map_err(open_err)?;
            for stmt in schema::create_index_sql(table) {
                conn.execute(&stmt, []).map_err(open_err)?;
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            table: table.to_string(),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the trip table
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Acquire a connection for one unit of work.
    ///
    /// Only `open` may create the file; a store deleted since then fails here.
    pub fn connect(&self) -> Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Ok(Connection::open_with_flags(&self.path, flags)?)
    }

    /// Check whether a table or view with this name exists
    pub fn table_exists(&self, name: &str) -> bool {
        match self.connect() {
            Ok(conn) => table_exists(&conn, name),
            Err(_) => false,
        }
    }

    /// Run a query and return each result as a name-keyed row
    pub fn query<P: Params>(&self, sql: &str, params: P) -> Result<Vec<Row>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, Row::from_sql)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Fetch one trip by its key
    pub fn find_trip(&self, trip_id: i64) -> Result<Option<Row>> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1",
            schema::quote_ident(&self.table),
            schema::quote_ident(schema::KEY_COLUMN),
        );
        conn.query_row(&sql, [trip_id], Row::from_sql)
            .optional()
            .map_err(Into::into)
    }

    /// Count all trips
    pub fn count_trips(&self) -> Result<usize> {
        let conn = self.connect()?;
        let sql = format!("SELECT COUNT(*) FROM {}", schema::quote_ident(&self.table));
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== View Operations ==========

    /// Create a view over the trips imported from one report file
    pub fn create_file_view(&self, name: &str, file_name: &str) -> Result<()> {
        let filter = format!("\"FileName\" = {}", schema::quote_literal(file_name));
        self.create_view(name, &filter)
    }

    /// Create a view over trips whose checkout datetime falls in `[start, end]`.
    ///
    /// Bounds compare as text, so they must use the zero-padded
    /// `YYYY-MM-DD HH:MM:SS` layout to select what they look like they select.
    pub fn create_checkout_range_view(&self, name: &str, start: &str, end: &str) -> Result<()> {
        let filter = format!(
            "\"CheckoutDateTime\" BETWEEN {} AND {}",
            schema::quote_literal(start),
            schema::quote_literal(end),
        );
        self.create_view(name, &filter)
    }

    fn create_view(&self, name: &str, filter: &str) -> Result<()> {
        let conn = self.connect()?;
        let sql = format!(
            "CREATE VIEW {} AS SELECT * FROM {} WHERE {}",
            schema::quote_ident(name),
            schema::quote_ident(&self.table),
            filter,
        );
        conn.execute(&sql, [])?;
        tracing::debug!("Created view {}", name);
        Ok(())
    }

    /// Names of all views currently defined
    pub fn list_views(&self) -> Result<Vec<String>> {
        let conn = self.connect()?;
        Ok(view_names(&conn)?)
    }

    /// Drop every view, leaving base tables alone. Returns how many were dropped.
    pub fn drop_temporary_views(&self) -> Result<usize> {
        let conn = self.connect()?;
        Ok(drop_views(&conn)?)
    }
}

/// Check whether a table or view exists on this connection.
///
/// Lookup failures count as "absent".
pub fn table_exists(conn: &Connection, name: &str) -> bool {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
        [name],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
    .unwrap_or(false)
}

/// Like [`table_exists`], but a view of that name does not count
fn base_table_exists(conn: &Connection, name: &str) -> bool {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
    .unwrap_or(false)
}

fn view_names(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'view' ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

fn drop_views(conn: &Connection) -> rusqlite::Result<usize> {
    let names = view_names(conn)?;
    for name in &names {
        conn.execute(&format!("DROP VIEW IF EXISTS {}", schema::quote_ident(name)), [])?;
        tracing::debug!("Dropped view {}", name);
    }
    Ok(names.len())
}
