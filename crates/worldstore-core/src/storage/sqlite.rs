//! SQLite Store Implementation
//!
//! The component host: statement table, chunk/index sync engine, cascading
//! delete engine, world registry, and the write-scope transaction
//! coordinator.
//!
//! Uses separate reader/writer connections for interior mutability. All
//! methods take `&self`, making `Store` `Send + Sync` so callers can share
//! an `Arc<Store>` without an outer mutex. The full-text and vector indexes
//! are mutated only through write scopes; nothing else in the crate touches
//! them.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::model::{
    Chunk, IngestSummary, ParseTermKindError, Quad, SearchHit, Statement, Term, TermKind, World,
    WorldStats,
};
use crate::search::{
    reciprocal_rank_fusion, sanitize_fts5_query, FusionConfig, VectorIndex, VectorIndexConfig,
    DEFAULT_DIMENSIONS,
};
use crate::skolem::Skolemizer;

use super::codec::{
    decode_embedding, decode_graph, decode_node, decode_object, encode_embedding, encode_graph,
    encode_node, encode_object,
};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Store error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Lookup by id/graph required a row that does not exist
    #[error("not found: {0}")]
    NotFound(String),
    /// A write would violate a structural invariant (other than the
    /// deliberately idempotent statement uniqueness constraint)
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    /// Invalid configuration (non-positive RRF constant, dimension mismatch)
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A write scope failed and was rolled back; carries the cause
    #[error("transaction aborted: {source}")]
    TransactionAborted {
        /// The failure that aborted the scope
        #[source]
        source: Box<StoreError>,
    },
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Initialization or infrastructure error
    #[error("initialization error: {0}")]
    Init(String),
}

/// Store result type
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Wrap a scope failure without double-wrapping nested scopes.
    fn aborted(source: StoreError) -> Self {
        match source {
            wrapped @ StoreError::TransactionAborted { .. } => wrapped,
            other => StoreError::TransactionAborted {
                source: Box::new(other),
            },
        }
    }

    /// Underlying cause of an aborted write scope, or the error itself.
    pub fn cause(&self) -> &StoreError {
        match self {
            StoreError::TransactionAborted { source } => source.cause(),
            other => other,
        }
    }

    /// Whether retrying the same input can succeed. Storage-level faults
    /// are retryable; invariant violations need corrected input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.cause(),
            StoreError::Database(_) | StoreError::Io(_)
        )
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Store configuration, validated at [`Store::open`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Embedding dimensionality every attached vector must match.
    pub vector_dimensions: usize,
    /// Hybrid-search fusion tunables.
    pub fusion: FusionConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            vector_dimensions: DEFAULT_DIMENSIONS,
            fusion: FusionConfig::default(),
        }
    }
}

// ============================================================================
// INDEX INTEGRITY
// ============================================================================

/// Snapshot of index/table agreement, for diagnostics and tests.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexIntegrityReport {
    /// Rows in the chunk table.
    pub chunks: usize,
    /// Rows in the full-text index.
    pub fts_entries: usize,
    /// Vectors across all world indexes.
    pub vectors: usize,
    /// Whether the full-text index mirrors the chunk table exactly and the
    /// vector indexes mirror the embedded chunks exactly.
    pub in_sync: bool,
}

// ============================================================================
// WRITE SCOPE
// ============================================================================

/// Staged mutation to a world's vector index. Applied under the index lock
/// just before COMMIT; `prev` is the pre-image used to unwind on failure.
#[derive(Debug)]
enum VectorOp {
    Upsert {
        chunk_id: i64,
        vector: Vec<f32>,
        prev: Option<Vec<f32>>,
    },
    Remove {
        chunk_id: i64,
        prev: Option<Vec<f32>>,
    },
}

/// Mutation scope handed to write-path internals: the open SQLite
/// transaction plus the vector ops staged alongside it.
struct WriteScope<'a> {
    tx: &'a rusqlite::Transaction<'a>,
    vector_ops: Vec<VectorOp>,
}

// ============================================================================
// STORE
// ============================================================================

/// Statement & chunk store.
pub struct Store {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    config: StoreConfig,
    /// One HNSW index per world; similarity search never crosses worlds.
    vector_indexes: Mutex<HashMap<String, VectorIndex>>,
    /// World ids of committed write scopes, for external cache invalidation.
    invalidations: broadcast::Sender<String>,
}

impl Store {
    /// Apply PRAGMAs and optional encryption to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        // Apply encryption key if SQLCipher is enabled and key is provided
        #[cfg(feature = "encryption")]
        {
            if let Ok(key) = std::env::var("WORLDSTORE_ENCRYPTION_KEY") {
                if !key.is_empty() {
                    conn.pragma_update(None, "key", &key)?;
                }
            }
        }

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        Ok(())
    }

    /// Open (or create) a store.
    ///
    /// With no explicit path the database lives in the platform data
    /// directory. Configuration is validated here so misconfiguration
    /// surfaces at startup, not on first search.
    pub fn open(db_path: Option<PathBuf>, config: StoreConfig) -> Result<Self> {
        if config.vector_dimensions == 0 {
            return Err(StoreError::InvalidConfiguration(
                "vector dimensionality must be positive".to_string(),
            ));
        }
        if config.fusion.k <= 0.0 {
            return Err(StoreError::InvalidConfiguration(format!(
                "RRF constant must be positive, got {}",
                config.fusion.k
            )));
        }

        let path = match db_path {
            Some(p) => p,
            None => {
                let proj_dirs = ProjectDirs::from("com", "worldstore", "core").ok_or_else(|| {
                    StoreError::Init("Could not determine project directories".to_string())
                })?;

                let data_dir = proj_dirs.data_dir();
                std::fs::create_dir_all(data_dir)?;
                // Restrict directory permissions to owner-only on Unix
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let perms = std::fs::Permissions::from_mode(0o700);
                    let _ = std::fs::set_permissions(data_dir, perms);
                }
                data_dir.join("worldstore.db")
            }
        };

        let writer_conn = Connection::open(&path)?;

        // Restrict database file permissions to owner-only on Unix
        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        let (invalidations, _) = broadcast::channel(64);

        let store = Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            config,
            vector_indexes: Mutex::new(HashMap::new()),
            invalidations,
        };

        store.load_embeddings_into_indexes()?;

        tracing::info!(path = %path.display(), "opened statement store");
        Ok(store)
    }

    /// Rebuild the per-world vector indexes from persisted embeddings.
    fn load_embeddings_into_indexes(&self) -> Result<()> {
        let rows: Vec<(i64, String, Vec<u8>)> = {
            let reader = self.reader()?;
            let mut stmt = reader.prepare(
                "SELECT chunk_id, world_id, embedding FROM chunks WHERE embedding IS NOT NULL",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let mut indexes = self.vector_indexes()?;
        for (chunk_id, world_id, bytes) in rows {
            let Some(vector) = decode_embedding(&bytes) else {
                tracing::warn!(chunk_id, "skipping torn embedding blob");
                continue;
            };
            let index = Self::world_index(&mut indexes, &world_id, &self.config)?;
            if let Err(e) = index.upsert(chunk_id, &vector) {
                tracing::warn!(chunk_id, "failed to load embedding: {}", e);
            }
        }

        Ok(())
    }

    /// Subscribe to the invalidation signal. Every committed write scope
    /// publishes its world id so external caches (e.g. a hydrated query
    /// engine) can discard and rebuild lazily.
    pub fn subscribe_invalidations(&self) -> broadcast::Receiver<String> {
        self.invalidations.subscribe()
    }

    // ------------------------------------------------------------------
    // Lock helpers
    // ------------------------------------------------------------------

    fn reader(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.reader
            .lock()
            .map_err(|_| StoreError::Init("Reader lock poisoned".into()))
    }

    fn vector_indexes(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, VectorIndex>>> {
        self.vector_indexes
            .lock()
            .map_err(|_| StoreError::Init("Vector index lock poisoned".into()))
    }

    fn world_index<'a>(
        indexes: &'a mut HashMap<String, VectorIndex>,
        world_id: &str,
        config: &StoreConfig,
    ) -> Result<&'a mut VectorIndex> {
        match indexes.entry(world_id.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let index = VectorIndex::with_config(VectorIndexConfig::with_dimensions(
                    config.vector_dimensions,
                ))
                .map_err(|e| StoreError::Init(format!("failed to create vector index: {e}")))?;
                Ok(entry.insert(index))
            }
        }
    }

    // ------------------------------------------------------------------
    // Transaction coordinator
    // ------------------------------------------------------------------

    /// Run `work` in an all-or-nothing write scope.
    ///
    /// The SQLite transaction covers the statement table, the chunk table,
    /// and the full-text index. Vector ops are staged by `work` and applied
    /// under the index lock just before COMMIT with their pre-images; a
    /// failure on either side unwinds both, so no observable point exposes
    /// a half-applied scope. On success the world id is published on the
    /// invalidation channel.
    fn with_write_scope<T>(
        &self,
        world_id: &str,
        work: impl FnOnce(&mut WriteScope<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StoreError::Init("Writer lock poisoned".into()))?;
        let tx = writer
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| StoreError::aborted(e.into()))?;

        let mut scope = WriteScope {
            tx: &tx,
            vector_ops: Vec::new(),
        };
        let value = match work(&mut scope) {
            Ok(value) => value,
            // Dropping the transaction rolls back everything `work` did.
            Err(e) => return Err(StoreError::aborted(e)),
        };
        let vector_ops = scope.vector_ops;

        let mut indexes = self.vector_indexes()?;
        let index = Self::world_index(&mut indexes, world_id, &self.config)
            .map_err(StoreError::aborted)?;

        let applied = Self::apply_vector_ops(index, &vector_ops).map_err(StoreError::aborted)?;

        if let Err(e) = tx.commit() {
            Self::undo_vector_ops(index, &applied);
            return Err(StoreError::aborted(e.into()));
        }
        drop(indexes);
        drop(writer);

        let _ = self.invalidations.send(world_id.to_string());
        Ok(value)
    }

    /// Apply staged vector ops, unwinding on the first failure.
    fn apply_vector_ops<'a>(
        index: &mut VectorIndex,
        ops: &'a [VectorOp],
    ) -> Result<Vec<&'a VectorOp>> {
        let mut applied: Vec<&VectorOp> = Vec::with_capacity(ops.len());
        for op in ops {
            let result = match op {
                VectorOp::Upsert {
                    chunk_id, vector, ..
                } => index.upsert(*chunk_id, vector),
                VectorOp::Remove { chunk_id, .. } => index.remove(*chunk_id).map(|_| ()),
            };
            match result {
                Ok(()) => applied.push(op),
                Err(e) => {
                    Self::undo_vector_ops(index, &applied);
                    return Err(StoreError::Init(format!("vector index write failed: {e}")));
                }
            }
        }
        Ok(applied)
    }

    /// Restore pre-images for already-applied vector ops, newest first.
    fn undo_vector_ops(index: &mut VectorIndex, applied: &[&VectorOp]) {
        for op in applied.iter().rev() {
            let (VectorOp::Upsert { chunk_id, prev, .. } | VectorOp::Remove { chunk_id, prev }) =
                op;
            let result = match prev {
                Some(vector) => index.upsert(*chunk_id, vector),
                None => index.remove(*chunk_id).map(|_| ()),
            };
            if let Err(e) = result {
                tracing::warn!(chunk_id, "failed to undo vector op: {}", e);
            }
        }
    }

    // ------------------------------------------------------------------
    // World registry
    // ------------------------------------------------------------------

    /// Create a new world.
    pub fn create_world(
        &self,
        account_id: &str,
        name: &str,
        description: Option<&str>,
        is_public: bool,
    ) -> Result<World> {
        let world_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        self.with_write_scope(&world_id, |scope| {
            scope.tx.execute(
                "INSERT INTO worlds (
                    world_id, account_id, name, description,
                    created_at, updated_at, deleted_at, is_public
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7)",
                params![
                    world_id,
                    account_id,
                    name,
                    description,
                    now,
                    now,
                    is_public as i64
                ],
            )?;
            Ok(())
        })?;

        self.world(&world_id)?
            .ok_or_else(|| StoreError::NotFound(format!("world {world_id}")))
    }

    /// Look up a world by id (retired worlds included).
    pub fn world(&self, world_id: &str) -> Result<Option<World>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare("SELECT * FROM worlds WHERE world_id = ?1")?;
        let world = stmt
            .query_row(params![world_id], |row| Self::row_to_world(row))
            .optional()?;
        Ok(world)
    }

    /// Live worlds owned by an account, newest first.
    pub fn worlds_for_account(&self, account_id: &str) -> Result<Vec<World>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT * FROM worlds
             WHERE account_id = ?1 AND deleted_at IS NULL
             ORDER BY created_at DESC",
        )?;
        let worlds = stmt
            .query_map(params![account_id], |row| Self::row_to_world(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(worlds)
    }

    /// Update world metadata. Bumps `updated_at`.
    ///
    /// `None` leaves a field unchanged; `Some(None)` for the description
    /// clears it.
    pub fn update_world(
        &self,
        world_id: &str,
        name: Option<&str>,
        description: Option<Option<&str>>,
        is_public: Option<bool>,
    ) -> Result<World> {
        let now = Utc::now().to_rfc3339();
        self.with_write_scope(world_id, |scope| {
            Self::require_live_world(scope.tx, world_id)?;
            if let Some(name) = name {
                scope.tx.execute(
                    "UPDATE worlds SET name = ?1 WHERE world_id = ?2",
                    params![name, world_id],
                )?;
            }
            if let Some(description) = description {
                scope.tx.execute(
                    "UPDATE worlds SET description = ?1 WHERE world_id = ?2",
                    params![description, world_id],
                )?;
            }
            if let Some(is_public) = is_public {
                scope.tx.execute(
                    "UPDATE worlds SET is_public = ?1 WHERE world_id = ?2",
                    params![is_public as i64, world_id],
                )?;
            }
            scope.tx.execute(
                "UPDATE worlds SET updated_at = ?1 WHERE world_id = ?2",
                params![now, world_id],
            )?;
            Ok(())
        })?;

        self.world(world_id)?
            .ok_or_else(|| StoreError::NotFound(format!("world {world_id}")))
    }

    /// Soft-delete a world. Rows remain until a separate reclamation pass.
    pub fn retire_world(&self, world_id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.with_write_scope(world_id, |scope| {
            Self::require_live_world(scope.tx, world_id)?;
            scope.tx.execute(
                "UPDATE worlds SET deleted_at = ?1, updated_at = ?1 WHERE world_id = ?2",
                params![now, world_id],
            )?;
            Ok(())
        })
    }

    /// Per-world row counts.
    pub fn world_stats(&self, world_id: &str) -> Result<WorldStats> {
        let reader = self.reader()?;
        let statements: i64 = reader.query_row(
            "SELECT COUNT(*) FROM statements WHERE world_id = ?1",
            params![world_id],
            |row| row.get(0),
        )?;
        let chunks: i64 = reader.query_row(
            "SELECT COUNT(*) FROM chunks WHERE world_id = ?1",
            params![world_id],
            |row| row.get(0),
        )?;
        let chunks_with_embeddings: i64 = reader.query_row(
            "SELECT COUNT(*) FROM chunks WHERE world_id = ?1 AND embedding IS NOT NULL",
            params![world_id],
            |row| row.get(0),
        )?;
        Ok(WorldStats {
            statements,
            chunks,
            chunks_with_embeddings,
        })
    }

    /// NotFound unless the world exists and is not retired.
    fn require_live_world(conn: &Connection, world_id: &str) -> Result<()> {
        let deleted_at: Option<Option<String>> = conn
            .query_row(
                "SELECT deleted_at FROM worlds WHERE world_id = ?1",
                params![world_id],
                |row| row.get(0),
            )
            .optional()?;
        match deleted_at {
            None => Err(StoreError::NotFound(format!("world {world_id}"))),
            Some(Some(_)) => Err(StoreError::NotFound(format!("world {world_id} is retired"))),
            Some(None) => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------------

    /// Ingest a batch of quads into a world.
    ///
    /// Blank-node labels are skolemized with one map for the whole batch,
    /// so repeated references to the same label resolve to the same URI.
    /// Duplicate statements are skipped and counted, never an error. A
    /// chunk is derived for every literal object and indexed in the same
    /// scope; a quad embedding with the wrong dimensionality aborts the
    /// whole batch.
    pub fn insert_quads(&self, world_id: &str, quads: &[Quad]) -> Result<IngestSummary> {
        let dims = self.config.vector_dimensions;
        self.with_write_scope(world_id, |scope| {
            Self::require_live_world(scope.tx, world_id)?;

            let mut skolemizer = Skolemizer::new();
            let mut summary = IngestSummary::default();

            for quad in quads {
                let subject = Self::skolemized(&quad.subject, &mut skolemizer);
                let predicate = Self::skolemized(&quad.predicate, &mut skolemizer);
                let object = Self::skolemized(&quad.object, &mut skolemizer);
                let graph = Self::skolemized(&quad.graph, &mut skolemizer);

                let subject_value = encode_node(&subject, "subject")?;
                let predicate_value = encode_node(&predicate, "predicate")?;
                let graph_value = encode_graph(&graph)?;
                let object_enc = encode_object(&object);

                let changed = scope.tx.execute(
                    "INSERT OR IGNORE INTO statements (
                        world_id, subject, predicate, object, graph,
                        term_type, object_language, object_datatype
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        world_id,
                        subject_value,
                        predicate_value,
                        object_enc.value,
                        graph_value,
                        object_enc.kind.to_string(),
                        object_enc.language,
                        object_enc.datatype
                    ],
                )?;

                if changed == 0 {
                    summary.duplicates += 1;
                    continue;
                }
                summary.inserted += 1;
                let statement_id = scope.tx.last_insert_rowid();

                if object_enc.kind == TermKind::Literal {
                    Self::insert_chunk_tx(
                        scope,
                        world_id,
                        statement_id,
                        &object_enc.value,
                        quad.embedding.as_deref(),
                        dims,
                    )?;
                    summary.chunks_created += 1;
                }
            }

            tracing::debug!(
                world_id,
                inserted = summary.inserted,
                duplicates = summary.duplicates,
                chunks = summary.chunks_created,
                "ingested quad batch"
            );
            Ok(summary)
        })
    }

    /// Rewrite blank-node labels through the batch skolemizer. Non-blank
    /// terms pass through unchanged.
    fn skolemized(term: &Term, skolemizer: &mut Skolemizer) -> Term {
        match term {
            Term::BlankNode { value } => Term::BlankNode {
                value: skolemizer.resolve(value),
            },
            other => other.clone(),
        }
    }

    /// Insert a chunk row with its full-text entry and staged vector op.
    fn insert_chunk_tx(
        scope: &mut WriteScope<'_>,
        world_id: &str,
        statement_id: i64,
        content: &str,
        embedding: Option<&[f32]>,
        dims: usize,
    ) -> Result<i64> {
        if let Some(vector) = embedding {
            if vector.len() != dims {
                return Err(StoreError::InvalidConfiguration(format!(
                    "embedding dimensionality {} does not match configured {}",
                    vector.len(),
                    dims
                )));
            }
        }

        scope.tx.execute(
            "INSERT INTO chunks (world_id, statement_id, content, embedding)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                world_id,
                statement_id,
                content,
                embedding.map(encode_embedding)
            ],
        )?;
        let chunk_id = scope.tx.last_insert_rowid();

        scope.tx.execute(
            "INSERT INTO chunk_fts (rowid, content) VALUES (?1, ?2)",
            params![chunk_id, content],
        )?;

        if let Some(vector) = embedding {
            scope.vector_ops.push(VectorOp::Upsert {
                chunk_id,
                vector: vector.to_vec(),
                prev: None,
            });
        }

        Ok(chunk_id)
    }

    // ------------------------------------------------------------------
    // Statement reads
    // ------------------------------------------------------------------

    /// Look up a statement by textual id.
    ///
    /// An unparseable or absent id yields `Ok(None)`, never an error, so
    /// callers can probe speculatively.
    pub fn statement(&self, world_id: &str, id: &str) -> Result<Option<Statement>> {
        let Ok(statement_id) = id.trim().parse::<i64>() else {
            return Ok(None);
        };
        let reader = self.reader()?;
        let mut stmt = reader
            .prepare("SELECT * FROM statements WHERE world_id = ?1 AND statement_id = ?2")?;
        let statement = stmt
            .query_row(params![world_id, statement_id], |row| {
                Self::row_to_statement(row)
            })
            .optional()?;
        Ok(statement)
    }

    /// Statements in one graph, ordered by ascending statement id.
    ///
    /// The order is shard-stable across runs but carries no semantic
    /// meaning.
    pub fn statements_by_graph(&self, world_id: &str, graph: &Term) -> Result<Vec<Statement>> {
        let graph_value = encode_graph(graph)?;
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT * FROM statements
             WHERE world_id = ?1 AND graph = ?2
             ORDER BY statement_id ASC",
        )?;
        let statements = stmt
            .query_map(params![world_id, graph_value], |row| {
                Self::row_to_statement(row)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(statements)
    }

    /// Complete, ordered enumeration of a live world's statements.
    ///
    /// This is the hydration contract for the external graph-query engine:
    /// enough to rebuild its in-memory graph on world wake.
    pub fn world_statements(&self, world_id: &str) -> Result<Vec<Statement>> {
        let reader = self.reader()?;
        Self::require_live_world(&reader, world_id)?;
        let mut stmt = reader.prepare(
            "SELECT * FROM statements WHERE world_id = ?1 ORDER BY statement_id ASC",
        )?;
        let statements = stmt
            .query_map(params![world_id], |row| Self::row_to_statement(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(statements)
    }

    // ------------------------------------------------------------------
    // Chunk reads & mutations
    // ------------------------------------------------------------------

    /// Look up a chunk by id.
    pub fn chunk(&self, world_id: &str, chunk_id: i64) -> Result<Option<Chunk>> {
        let reader = self.reader()?;
        let mut stmt =
            reader.prepare("SELECT * FROM chunks WHERE world_id = ?1 AND chunk_id = ?2")?;
        let chunk = stmt
            .query_row(params![world_id, chunk_id], |row| Self::row_to_chunk(row))
            .optional()?;
        Ok(chunk)
    }

    /// Chunks derived from one statement.
    pub fn chunks_for_statement(
        &self,
        world_id: &str,
        statement_id: i64,
    ) -> Result<Vec<Chunk>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT * FROM chunks
             WHERE world_id = ?1 AND statement_id = ?2
             ORDER BY chunk_id ASC",
        )?;
        let chunks = stmt
            .query_map(params![world_id, statement_id], |row| {
                Self::row_to_chunk(row)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(chunks)
    }

    /// Replace a chunk's content, reindexing it in the same scope.
    ///
    /// FTS5 has no partial update, so the index entry is deleted and
    /// reinserted, never mutated in place.
    pub fn update_chunk_content(
        &self,
        world_id: &str,
        chunk_id: i64,
        content: &str,
    ) -> Result<()> {
        self.with_write_scope(world_id, |scope| {
            let exists: Option<i64> = scope
                .tx
                .query_row(
                    "SELECT chunk_id FROM chunks WHERE world_id = ?1 AND chunk_id = ?2",
                    params![world_id, chunk_id],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                return Err(StoreError::NotFound(format!("chunk {chunk_id}")));
            }

            scope.tx.execute(
                "UPDATE chunks SET content = ?1 WHERE chunk_id = ?2",
                params![content, chunk_id],
            )?;
            scope.tx.execute(
                "DELETE FROM chunk_fts WHERE rowid = ?1",
                params![chunk_id],
            )?;
            scope.tx.execute(
                "INSERT INTO chunk_fts (rowid, content) VALUES (?1, ?2)",
                params![chunk_id, content],
            )?;
            Ok(())
        })
    }

    /// Attach a pre-computed embedding to a chunk.
    ///
    /// The store never computes embeddings; the vector arrives from the
    /// external embedding function and must match the configured
    /// dimensionality.
    pub fn attach_embedding(
        &self,
        world_id: &str,
        chunk_id: i64,
        vector: &[f32],
    ) -> Result<()> {
        if vector.len() != self.config.vector_dimensions {
            return Err(StoreError::InvalidConfiguration(format!(
                "embedding dimensionality {} does not match configured {}",
                vector.len(),
                self.config.vector_dimensions
            )));
        }

        self.with_write_scope(world_id, |scope| {
            let prev: Option<Option<Vec<u8>>> = scope
                .tx
                .query_row(
                    "SELECT embedding FROM chunks WHERE world_id = ?1 AND chunk_id = ?2",
                    params![world_id, chunk_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(prev_bytes) = prev else {
                return Err(StoreError::NotFound(format!("chunk {chunk_id}")));
            };

            scope.tx.execute(
                "UPDATE chunks SET embedding = ?1 WHERE chunk_id = ?2",
                params![encode_embedding(vector), chunk_id],
            )?;
            scope.vector_ops.push(VectorOp::Upsert {
                chunk_id,
                vector: vector.to_vec(),
                prev: prev_bytes.as_deref().and_then(decode_embedding),
            });
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Deletion (with blank-node cascade)
    // ------------------------------------------------------------------

    /// Delete one statement, cascading through dependent blank nodes.
    /// Returns whether the statement existed.
    pub fn delete_statement(&self, world_id: &str, statement_id: i64) -> Result<bool> {
        self.with_write_scope(world_id, |scope| {
            let row: Option<(String, String)> = scope
                .tx
                .query_row(
                    "SELECT object, term_type FROM statements
                     WHERE world_id = ?1 AND statement_id = ?2",
                    params![world_id, statement_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let Some((object, term_type)) = row else {
                return Ok(false);
            };

            Self::delete_statement_row_tx(scope, statement_id)?;
            if term_type == TermKind::BlankNode.to_string() {
                Self::cascade_from_tx(scope, world_id, vec![object])?;
            }
            Ok(true)
        })
    }

    /// Delete all statements in one graph, with cascade. Returns the total
    /// number of statements removed, cascade included.
    pub fn delete_by_graph(&self, world_id: &str, graph: &Term) -> Result<u64> {
        let graph_value = encode_graph(graph)?;
        self.with_write_scope(world_id, |scope| {
            let rows: Vec<(i64, String, String)> = {
                let mut stmt = scope.tx.prepare(
                    "SELECT statement_id, object, term_type FROM statements
                     WHERE world_id = ?1 AND graph = ?2",
                )?;
                let rows = stmt
                    .query_map(params![world_id, graph_value], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            };
            Self::delete_rows_and_cascade_tx(scope, world_id, rows)
        })
    }

    /// Delete all statements with one subject, with cascade. Returns the
    /// total number of statements removed, cascade included.
    pub fn delete_by_subject(&self, world_id: &str, subject: &Term) -> Result<u64> {
        let subject_value = encode_node(subject, "subject")?;
        self.with_write_scope(world_id, |scope| {
            let rows: Vec<(i64, String, String)> = {
                let mut stmt = scope.tx.prepare(
                    "SELECT statement_id, object, term_type FROM statements
                     WHERE world_id = ?1 AND subject = ?2",
                )?;
                let rows = stmt
                    .query_map(params![world_id, subject_value], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            };
            Self::delete_rows_and_cascade_tx(scope, world_id, rows)
        })
    }

    /// Delete a pre-selected set of statement rows, then cascade from any
    /// blank-node objects they referenced.
    fn delete_rows_and_cascade_tx(
        scope: &mut WriteScope<'_>,
        world_id: &str,
        rows: Vec<(i64, String, String)>,
    ) -> Result<u64> {
        let blank_tag = TermKind::BlankNode.to_string();
        let mut deleted = 0u64;
        let mut seeds = Vec::new();

        for (statement_id, object, term_type) in rows {
            Self::delete_statement_row_tx(scope, statement_id)?;
            deleted += 1;
            if term_type == blank_tag {
                seeds.push(object);
            }
        }

        deleted += Self::cascade_from_tx(scope, world_id, seeds)?;
        Ok(deleted)
    }

    /// Worklist-driven cascade: for every blank node discovered as a
    /// deleted object, delete the statements where it is the subject,
    /// collecting newly orphaned blank nodes until the worklist drains.
    /// The visited set makes cyclic blank-node chains terminate.
    fn cascade_from_tx(
        scope: &mut WriteScope<'_>,
        world_id: &str,
        seeds: Vec<String>,
    ) -> Result<u64> {
        let blank_tag = TermKind::BlankNode.to_string();
        let mut worklist: VecDeque<String> = seeds.into();
        let mut visited: HashSet<String> = HashSet::new();
        let mut deleted = 0u64;

        while let Some(blank) = worklist.pop_front() {
            if !visited.insert(blank.clone()) {
                continue;
            }

            let rows: Vec<(i64, String, String)> = {
                let mut stmt = scope.tx.prepare(
                    "SELECT statement_id, object, term_type FROM statements
                     WHERE world_id = ?1 AND subject = ?2",
                )?;
                let rows = stmt
                    .query_map(params![world_id, blank], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            };

            for (statement_id, object, term_type) in rows {
                Self::delete_statement_row_tx(scope, statement_id)?;
                deleted += 1;
                if term_type == blank_tag {
                    worklist.push_back(object);
                }
            }
        }

        if deleted > 0 {
            tracing::debug!(world_id, deleted, "cascade removed dependent statements");
        }
        Ok(deleted)
    }

    /// Delete one statement row together with its dependent chunks and
    /// their full-text/vector entries, all in the current scope.
    fn delete_statement_row_tx(scope: &mut WriteScope<'_>, statement_id: i64) -> Result<()> {
        let chunks: Vec<(i64, Option<Vec<u8>>)> = {
            let mut stmt = scope
                .tx
                .prepare("SELECT chunk_id, embedding FROM chunks WHERE statement_id = ?1")?;
            let chunks = stmt
                .query_map(params![statement_id], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            chunks
        };

        for (chunk_id, embedding) in chunks {
            scope.tx.execute(
                "DELETE FROM chunk_fts WHERE rowid = ?1",
                params![chunk_id],
            )?;
            scope
                .tx
                .execute("DELETE FROM chunks WHERE chunk_id = ?1", params![chunk_id])?;
            if let Some(prev) = embedding.as_deref().and_then(decode_embedding) {
                scope.vector_ops.push(VectorOp::Remove {
                    chunk_id,
                    prev: Some(prev),
                });
            }
        }

        scope.tx.execute(
            "DELETE FROM statements WHERE statement_id = ?1",
            params![statement_id],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Hybrid search
    // ------------------------------------------------------------------

    /// Hybrid chunk search: full-text and vector rankings fused with RRF.
    ///
    /// `k` is the RRF smoothing constant and must be positive. Without a
    /// query vector the ranking is keyword-only; a chunk absent from one
    /// list simply contributes nothing from that source. Results are
    /// ordered by descending fused score, ties broken by ascending chunk
    /// id.
    pub fn search_chunks(
        &self,
        world_id: &str,
        query_text: &str,
        query_vector: Option<&[f32]>,
        k: f32,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        if k <= 0.0 {
            return Err(StoreError::InvalidConfiguration(format!(
                "RRF constant must be positive, got {k}"
            )));
        }
        if let Some(vector) = query_vector {
            if vector.len() != self.config.vector_dimensions {
                return Err(StoreError::InvalidConfiguration(format!(
                    "query vector dimensionality {} does not match configured {}",
                    vector.len(),
                    self.config.vector_dimensions
                )));
            }
        }
        if limit == 0 {
            return Ok(vec![]);
        }

        let fetch = self.config.fusion.effective_source_limit(limit);

        let keyword_ranked = self.keyword_ranked_chunks(world_id, query_text, fetch)?;

        let vector_ranked: Vec<i64> = match query_vector {
            Some(vector) => {
                let indexes = self.vector_indexes()?;
                match indexes.get(world_id) {
                    Some(index) => index
                        .search(vector, fetch)
                        .map_err(|e| StoreError::Init(format!("vector search failed: {e}")))?
                        .into_iter()
                        .map(|(chunk_id, _)| chunk_id)
                        .collect(),
                    None => vec![],
                }
            }
            None => vec![],
        };

        let fused = reciprocal_rank_fusion(&keyword_ranked, &vector_ranked, k);

        let reader = self.reader()?;
        let mut hits = Vec::with_capacity(limit.min(fused.len()));
        for (chunk_id, score) in fused.into_iter().take(limit) {
            let statement_id: Option<Option<i64>> = reader
                .query_row(
                    "SELECT statement_id FROM chunks WHERE world_id = ?1 AND chunk_id = ?2",
                    params![world_id, chunk_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(statement_id) = statement_id else {
                continue;
            };
            hits.push(SearchHit {
                chunk_id,
                statement_id,
                score,
            });
        }
        Ok(hits)
    }

    /// Chunk ids ranked by FTS5 relevance (best first) within one world.
    fn keyword_ranked_chunks(
        &self,
        world_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<i64>> {
        let sanitized = sanitize_fts5_query(query);
        if sanitized.is_empty() {
            return Ok(vec![]);
        }

        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT f.rowid FROM chunk_fts f
             JOIN chunks c ON c.chunk_id = f.rowid
             WHERE c.world_id = ?1 AND chunk_fts MATCH ?2
             ORDER BY rank
             LIMIT ?3",
        )?;
        let ids = stmt
            .query_map(params![world_id, sanitized, limit as i64], |row| {
                row.get(0)
            })?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Compare the chunk table against the full-text and vector indexes.
    ///
    /// `in_sync` holds exactly when the FTS rowid set equals the chunk id
    /// set and the vector key set equals the embedded chunk id set — the
    /// zero-drift invariant.
    pub fn index_integrity(&self) -> Result<IndexIntegrityReport> {
        let (chunk_ids, embedded_ids, fts_ids) = {
            let reader = self.reader()?;
            let chunk_ids: HashSet<i64> = {
                let mut stmt = reader.prepare("SELECT chunk_id FROM chunks")?;
                stmt.query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<_>>()?
            };
            let embedded_ids: HashSet<i64> = {
                let mut stmt =
                    reader.prepare("SELECT chunk_id FROM chunks WHERE embedding IS NOT NULL")?;
                stmt.query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<_>>()?
            };
            let fts_ids: HashSet<i64> = {
                let mut stmt = reader.prepare("SELECT rowid FROM chunk_fts")?;
                stmt.query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<_>>()?
            };
            (chunk_ids, embedded_ids, fts_ids)
        };

        let vector_ids: HashSet<i64> = self
            .vector_indexes()?
            .values()
            .flat_map(|index| index.chunk_ids())
            .collect();

        Ok(IndexIntegrityReport {
            chunks: chunk_ids.len(),
            fts_entries: fts_ids.len(),
            vectors: vector_ids.len(),
            in_sync: fts_ids == chunk_ids && vector_ids == embedded_ids,
        })
    }

    // ------------------------------------------------------------------
    // Row mapping
    // ------------------------------------------------------------------

    /// Parse RFC3339 timestamp
    fn parse_timestamp(value: &str, field_name: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("Invalid {} timestamp '{}': {}", field_name, value, e),
                    )),
                )
            })
    }

    /// Convert a row to a Statement
    fn row_to_statement(row: &rusqlite::Row) -> rusqlite::Result<Statement> {
        let term_type: String = row.get("term_type")?;
        let kind: TermKind = term_type.parse().map_err(|e: ParseTermKindError| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;
        let language: String = row.get("object_language")?;
        let datatype: String = row.get("object_datatype")?;

        Ok(Statement {
            id: row.get("statement_id")?,
            world_id: row.get("world_id")?,
            subject: decode_node(row.get("subject")?),
            predicate: decode_node(row.get("predicate")?),
            object: decode_object(row.get("object")?, kind, &language, &datatype),
            graph: decode_graph(row.get("graph")?),
        })
    }

    /// Convert a row to a Chunk
    fn row_to_chunk(row: &rusqlite::Row) -> rusqlite::Result<Chunk> {
        let embedding: Option<Vec<u8>> = row.get("embedding")?;
        Ok(Chunk {
            id: row.get("chunk_id")?,
            world_id: row.get("world_id")?,
            statement_id: row.get("statement_id")?,
            content: row.get("content")?,
            embedding: embedding.as_deref().and_then(decode_embedding),
        })
    }

    /// Convert a row to a World
    fn row_to_world(row: &rusqlite::Row) -> rusqlite::Result<World> {
        let created_at: String = row.get("created_at")?;
        let updated_at: String = row.get("updated_at")?;
        let deleted_at: Option<String> = row.get("deleted_at")?;

        let created_at = Self::parse_timestamp(&created_at, "created_at")?;
        let updated_at = Self::parse_timestamp(&updated_at, "updated_at")?;
        // A torn deleted_at must not silently resurrect a retired world.
        let deleted_at = match deleted_at {
            Some(s) => Some(Self::parse_timestamp(&s, "deleted_at")?),
            None => None,
        };

        Ok(World {
            world_id: row.get("world_id")?,
            account_id: row.get("account_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            created_at,
            updated_at,
            deleted_at,
            is_public: row.get::<_, i64>("is_public")? != 0,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
