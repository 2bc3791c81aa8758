//! DuckDB storage for published reference snapshots.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use arrow::datatypes::{DataType, Schema};
use arrow::record_batch::RecordBatch;
use duckdb::{Connection, OptionalExt, Transaction, params};
use riskref_core::{
    CatalogSink, DerivedRows, ReferenceSnapshot, SinkError, SinkTransaction, SnapshotId,
    TableKind, derived,
};
use tracing::{debug, info};

use crate::{StoreError, to_record_batch};

const SNAPSHOTS_DDL: &str = "CREATE TABLE IF NOT EXISTS reference_snapshots (
    id BIGINT PRIMARY KEY,
    version VARCHAR NOT NULL UNIQUE,
    created_at VARCHAR NOT NULL,
    description VARCHAR NOT NULL,
    source_payload VARCHAR NOT NULL,
    active BOOLEAN NOT NULL
)";

/// One row of `reference_snapshots`, without the embedded source payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub id: SnapshotId,
    pub version: String,
    pub created_at: String,
    pub description: String,
    pub active: bool,
}

/// DuckDB store holding every published version side by side.
///
/// `reference_snapshots` carries one row per version; the six derived tables
/// carry a `snapshot_id` column pointing back at it. Writes go through
/// [`CatalogSink::begin`], which wraps a DuckDB transaction.
///
/// Use [`open`](Self::open) for in-memory and [`open_persistent`](Self::open_persistent)
/// for file-backed storage. Both create missing tables.
pub struct DuckStore {
    conn: Connection,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_schema(conn)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::with_schema(conn)
    }

    fn with_schema(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SNAPSHOTS_DDL)?;
        for kind in TableKind::ALL {
            let ddl = create_table_sql(kind.table_name(), &derived::schema_for(kind))?;
            conn.execute_batch(&ddl)?;
        }
        debug!("catalog tables ready");
        Ok(Self { conn })
    }

    // ── Snapshots ──

    /// Every stored snapshot, ordered by id.
    pub fn snapshots(&self) -> Result<Vec<SnapshotInfo>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, version, created_at, description, active
             FROM reference_snapshots ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SnapshotInfo {
                id: SnapshotId(row.get(0)?),
                version: row.get(1)?,
                created_at: row.get(2)?,
                description: row.get(3)?,
                active: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Id of the snapshot stored for `version`.
    pub fn snapshot_id(&self, version: &str) -> Result<SnapshotId, StoreError> {
        find_snapshot(&self.conn, version)?
            .ok_or_else(|| StoreError::SnapshotNotFound(version.to_string()))
    }

    /// The full snapshot envelope for `version`, source payload included.
    pub fn load_snapshot(&self, version: &str) -> Result<ReferenceSnapshot, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT version, created_at, description, source_payload, active
                 FROM reference_snapshots WHERE version = ?",
                [version],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, bool>(4)?,
                    ))
                },
            )
            .optional()?;
        let (version_col, created_at, description, payload, active) =
            row.ok_or_else(|| StoreError::SnapshotNotFound(version.to_string()))?;
        Ok(ReferenceSnapshot {
            version: version_col,
            created_at,
            description,
            source_payload: serde_json::from_str(&payload)?,
            active,
        })
    }

    // ── Counts ──

    /// Number of rows each derived table holds for `snapshot`.
    pub fn row_counts(
        &self,
        snapshot: SnapshotId,
    ) -> Result<BTreeMap<TableKind, usize>, StoreError> {
        TableKind::ALL
            .into_iter()
            .map(|kind| Ok((kind, self.count_rows(kind, snapshot)?)))
            .collect()
    }

    fn count_rows(&self, kind: TableKind, snapshot: SnapshotId) -> Result<usize, StoreError> {
        let sql = format!(
            "SELECT count(*)::BIGINT AS cnt FROM {} WHERE snapshot_id = {}",
            kind.table_name(),
            snapshot.0
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        let batch = batches.first().ok_or(StoreError::NoResults)?;
        let col = batch
            .column(0)
            .as_any()
            .downcast_ref::<arrow::array::Int64Array>()
            .ok_or_else(|| StoreError::Other("count column not i64".into()))?;
        Ok(col.value(0) as usize)
    }

    // ── Export ──

    /// Write each derived table of `snapshot` to `<dir>/<table>.parquet`.
    pub fn export_parquet(
        &self,
        snapshot: SnapshotId,
        dir: &Path,
    ) -> Result<Vec<PathBuf>, StoreError> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(TableKind::ALL.len());
        for kind in TableKind::ALL {
            let path = dir.join(format!("{}.parquet", kind.table_name()));
            let sql = format!(
                "COPY (SELECT * FROM {} WHERE snapshot_id = {}) TO '{}' (FORMAT PARQUET)",
                kind.table_name(),
                snapshot.0,
                path.display().to_string().replace('\'', "''")
            );
            self.conn.execute_batch(&sql)?;
            debug!(table = %kind, path = %path.display(), "exported table");
            written.push(path);
        }
        info!(snapshot_id = snapshot.0, dir = %dir.display(), "exported snapshot to parquet");
        Ok(written)
    }

    // ── Escape hatch ──

    /// Execute arbitrary SQL and return Arrow RecordBatches.
    pub fn query_arrow(&self, sql: &str) -> Result<Vec<RecordBatch>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        Ok(batches)
    }
}

/// A DuckDB transaction; dropping it without commit rolls back.
pub struct DuckTransaction<'a> {
    tx: Transaction<'a>,
}

impl CatalogSink for DuckStore {
    type Transaction<'a>
        = DuckTransaction<'a>
    where
        Self: 'a;

    fn begin(&mut self) -> Result<Self::Transaction<'_>, SinkError> {
        let tx = self.conn.transaction().map_err(StoreError::from)?;
        Ok(DuckTransaction { tx })
    }
}

impl DuckTransaction<'_> {
    fn upsert(&self, snapshot: &ReferenceSnapshot) -> Result<SnapshotId, StoreError> {
        let payload = serde_json::to_string(&snapshot.source_payload)?;
        if let Some(id) = find_snapshot(&self.tx, &snapshot.version)? {
            self.tx.execute(
                "UPDATE reference_snapshots
                 SET created_at = ?, description = ?, source_payload = ?, active = ?
                 WHERE id = ?",
                params![
                    snapshot.created_at,
                    snapshot.description,
                    payload,
                    snapshot.active,
                    id.0
                ],
            )?;
            debug!(version = %snapshot.version, snapshot_id = id.0, "updated snapshot");
            return Ok(id);
        }

        let next: i64 = self.tx.query_row(
            "SELECT coalesce(max(id), 0) + 1 FROM reference_snapshots",
            [],
            |row| row.get(0),
        )?;
        self.tx.execute(
            "INSERT INTO reference_snapshots
             (id, version, created_at, description, source_payload, active)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                next,
                snapshot.version,
                snapshot.created_at,
                snapshot.description,
                payload,
                snapshot.active
            ],
        )?;
        debug!(version = %snapshot.version, snapshot_id = next, "created snapshot");
        Ok(SnapshotId(next))
    }

    fn exists(&self, snapshot: SnapshotId) -> Result<bool, StoreError> {
        let count: i64 = self.tx.query_row(
            "SELECT count(*) FROM reference_snapshots WHERE id = ?",
            [snapshot.0],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn delete(&self, snapshot: SnapshotId, kind: TableKind) -> Result<usize, StoreError> {
        let sql = format!("DELETE FROM {} WHERE snapshot_id = ?", kind.table_name());
        Ok(self.tx.execute(&sql, [snapshot.0])?)
    }

    fn append(&self, snapshot: SnapshotId, rows: DerivedRows<'_>) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let batch = to_record_batch(snapshot, rows)?;
        let mut appender = self.tx.appender(rows.kind().table_name())?;
        appender.append_record_batch(batch)?;
        appender.flush()?;
        Ok(rows.len())
    }
}

impl SinkTransaction for DuckTransaction<'_> {
    fn upsert_snapshot(&mut self, snapshot: &ReferenceSnapshot) -> Result<SnapshotId, SinkError> {
        Ok(self.upsert(snapshot)?)
    }

    fn delete_derived_rows(
        &mut self,
        snapshot: SnapshotId,
        kind: TableKind,
    ) -> Result<usize, SinkError> {
        if !self.exists(snapshot)? {
            return Err(SinkError::UnknownSnapshot(snapshot));
        }
        Ok(self.delete(snapshot, kind)?)
    }

    fn insert_many(
        &mut self,
        snapshot: SnapshotId,
        rows: DerivedRows<'_>,
    ) -> Result<usize, SinkError> {
        if !self.exists(snapshot)? {
            return Err(SinkError::UnknownSnapshot(snapshot));
        }
        Ok(self.append(snapshot, rows)?)
    }

    fn commit(self) -> Result<(), SinkError> {
        self.tx.commit().map_err(StoreError::from)?;
        Ok(())
    }
}

fn find_snapshot(conn: &Connection, version: &str) -> Result<Option<SnapshotId>, StoreError> {
    let id = conn
        .query_row(
            "SELECT id FROM reference_snapshots WHERE version = ?",
            [version],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(id.map(SnapshotId))
}

/// `CREATE TABLE IF NOT EXISTS` statement for an Arrow schema.
fn create_table_sql(table: &str, schema: &Schema) -> Result<String, StoreError> {
    let columns = schema
        .fields()
        .iter()
        .map(|field| {
            let sql_type = match field.data_type() {
                DataType::Utf8 => "VARCHAR",
                DataType::Int64 => "BIGINT",
                DataType::Int32 => "INTEGER",
                DataType::Float64 => "DOUBLE",
                DataType::Boolean => "BOOLEAN",
                other => {
                    return Err(StoreError::Other(format!(
                        "unsupported column type {other} for {table}.{}",
                        field.name()
                    )));
                }
            };
            let null = if field.is_nullable() { "" } else { " NOT NULL" };
            Ok(format!("{} {sql_type}{null}", field.name()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {table} ({})",
        columns.join(", ")
    ))
}
