//! SQLite persistence for document metadata and page text.
//!
//! Schema:
//!
//! ```text
//! documents        (id, filename UNIQUE, title, author, subject, keywords,
//!                   creation_date, modification_date, producer, created_at)
//! selectable_pages (id, document_id → documents.id, page_number, text, encoding, created_at)
//! ocr_pages        (id, document_id → documents.id, page_number, text, created_at)
//! ```
//!
//! The page kind is the table a row lives in. A connection is opened per
//! logical operation and foreign keys are switched on for each one, so a page
//! row can never reference a missing document.

use crate::error::PipelineError;
use crate::output::{DocumentMetadata, PageKind, PageText};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Row id of a document.
pub type DocumentId = i64;

/// Durable store for documents and their pages.
pub trait DocumentStore {
    /// Create tables and indexes if they do not exist. Idempotent.
    fn ensure_schema(&self) -> Result<(), PipelineError>;

    /// Insert the record unless its filename is already present; either way
    /// return the filename's id. Existing records are never updated.
    fn upsert_metadata(&self, metadata: &DocumentMetadata) -> Result<DocumentId, PipelineError>;

    /// Append one page row.
    fn insert_page(&self, document_id: DocumentId, page: &PageText) -> Result<(), PipelineError>;

    /// Delete the document's rows of `kind` and insert the `pages` of that
    /// kind, in one transaction. Returns the number of rows inserted.
    fn replace_pages(
        &self,
        document_id: DocumentId,
        kind: PageKind,
        pages: &[PageText],
    ) -> Result<usize, PipelineError>;

    fn lookup_document_id(&self, filename: &str) -> Result<Option<DocumentId>, PipelineError>;

    fn get_metadata(&self, filename: &str) -> Result<Option<DocumentMetadata>, PipelineError>;

    /// Stored pages of `kind`, ordered by page number then insertion.
    fn pages(&self, document_id: DocumentId, kind: PageKind) -> Result<Vec<PageText>, PipelineError>;

    fn document_count(&self) -> Result<usize, PipelineError>;
}

/// SQLite-backed [`DocumentStore`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open (creating if necessary) the database at `db_path` and ensure the schema.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let store = Self {
            db_path: db_path.as_ref().to_path_buf(),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection, PipelineError> {
        let conn = Connection::open(&self.db_path).map_err(PipelineError::store("connect"))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(PipelineError::store("connect"))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(PipelineError::store("connect"))?;
        Ok(conn)
    }
}

fn table(kind: PageKind) -> &'static str {
    match kind {
        PageKind::Selectable => "selectable_pages",
        PageKind::Ocr => "ocr_pages",
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn insert_page_with(
    conn: &Connection,
    document_id: DocumentId,
    page: &PageText,
) -> rusqlite::Result<()> {
    match page.kind {
        PageKind::Selectable => conn.execute(
            "INSERT INTO selectable_pages (document_id, page_number, text, encoding, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![document_id, page.page_num as i64, page.text, page.encoding, now()],
        )?,
        PageKind::Ocr => conn.execute(
            "INSERT INTO ocr_pages (document_id, page_number, text, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![document_id, page.page_num as i64, page.text, now()],
        )?,
    };
    Ok(())
}

impl DocumentStore for SqliteStore {
    fn ensure_schema(&self) -> Result<(), PipelineError> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                subject TEXT NOT NULL,
                keywords TEXT NOT NULL,
                creation_date TEXT NOT NULL,
                modification_date TEXT NOT NULL,
                producer TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS selectable_pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id INTEGER NOT NULL,
                page_number INTEGER NOT NULL CHECK (page_number >= 1),
                text TEXT,
                encoding TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (document_id) REFERENCES documents(id)
            );

            CREATE TABLE IF NOT EXISTS ocr_pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id INTEGER NOT NULL,
                page_number INTEGER NOT NULL CHECK (page_number >= 1),
                text TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (document_id) REFERENCES documents(id)
            );

            CREATE INDEX IF NOT EXISTS idx_selectable_pages_document
                ON selectable_pages(document_id, page_number);
            CREATE INDEX IF NOT EXISTS idx_ocr_pages_document
                ON ocr_pages(document_id, page_number);
            "#,
        )
        .map_err(PipelineError::store("ensure_schema"))?;
        debug!("Schema ready at {}", self.db_path.display());
        Ok(())
    }

    fn upsert_metadata(&self, m: &DocumentMetadata) -> Result<DocumentId, PipelineError> {
        let conn = self.connect()?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO documents
                    (filename, title, author, subject, keywords,
                     creation_date, modification_date, producer, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    m.filename,
                    m.title,
                    m.author,
                    m.subject,
                    m.keywords,
                    m.creation_date,
                    m.modification_date,
                    m.producer,
                    now()
                ],
            )
            .map_err(PipelineError::store("upsert_metadata"))?;

        let id: DocumentId = conn
            .query_row(
                "SELECT id FROM documents WHERE filename = ?1",
                params![m.filename],
                |row| row.get(0),
            )
            .map_err(PipelineError::store("upsert_metadata"))?;

        if inserted > 0 {
            info!("Stored metadata for {} (id {})", m.filename, id);
        } else {
            debug!("Metadata for {} already present (id {})", m.filename, id);
        }
        Ok(id)
    }

    fn insert_page(&self, document_id: DocumentId, page: &PageText) -> Result<(), PipelineError> {
        let conn = self.connect()?;
        insert_page_with(&conn, document_id, page).map_err(PipelineError::store("insert_page"))
    }

    fn replace_pages(
        &self,
        document_id: DocumentId,
        kind: PageKind,
        pages: &[PageText],
    ) -> Result<usize, PipelineError> {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction()
            .map_err(PipelineError::store("replace_pages"))?;

        let removed = tx
            .execute(
                &format!("DELETE FROM {} WHERE document_id = ?1", table(kind)),
                params![document_id],
            )
            .map_err(PipelineError::store("replace_pages"))?;
        let mut inserted = 0;
        for page in pages.iter().filter(|p| p.kind == kind) {
            insert_page_with(&tx, document_id, page)
                .map_err(PipelineError::store("replace_pages"))?;
            inserted += 1;
        }
        tx.commit().map_err(PipelineError::store("replace_pages"))?;

        debug!(
            "Replaced {} {} rows with {} for document {}",
            removed, kind, inserted, document_id
        );
        Ok(inserted)
    }

    fn lookup_document_id(&self, filename: &str) -> Result<Option<DocumentId>, PipelineError> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT id FROM documents WHERE filename = ?1",
            params![filename],
            |row| row.get(0),
        )
        .optional()
        .map_err(PipelineError::store("lookup_document_id"))
    }

    fn get_metadata(&self, filename: &str) -> Result<Option<DocumentMetadata>, PipelineError> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT filename, title, author, subject, keywords,
                    creation_date, modification_date, producer
             FROM documents WHERE filename = ?1",
            params![filename],
            |row| {
                Ok(DocumentMetadata {
                    filename: row.get(0)?,
                    title: row.get(1)?,
                    author: row.get(2)?,
                    subject: row.get(3)?,
                    keywords: row.get(4)?,
                    creation_date: row.get(5)?,
                    modification_date: row.get(6)?,
                    producer: row.get(7)?,
                })
            },
        )
        .optional()
        .map_err(PipelineError::store("get_metadata"))
    }

    fn pages(&self, document_id: DocumentId, kind: PageKind) -> Result<Vec<PageText>, PipelineError> {
        let conn = self.connect()?;
        let encoding_col = match kind {
            PageKind::Selectable => "encoding",
            PageKind::Ocr => "NULL",
        };
        let sql = format!(
            "SELECT page_number, text, {} FROM {} WHERE document_id = ?1 ORDER BY page_number, id",
            encoding_col,
            table(kind)
        );
        let mut stmt = conn.prepare(&sql).map_err(PipelineError::store("pages"))?;
        let rows = stmt
            .query_map(params![document_id], |row| {
                let page_num: i64 = row.get(0)?;
                Ok(PageText {
                    page_num: page_num as usize,
                    kind,
                    text: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    encoding: row.get(2)?,
                })
            })
            .map_err(PipelineError::store("pages"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(PipelineError::store("pages"))?;
        Ok(rows)
    }

    fn document_count(&self) -> Result<usize, PipelineError> {
        let conn = self.connect()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(PipelineError::store("document_count"))?;
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("test.db")).unwrap();
        (store, dir)
    }

    fn page(n: usize, kind: PageKind, text: &str) -> PageText {
        PageText {
            page_num: n,
            kind,
            text: text.to_string(),
            encoding: match kind {
                PageKind::Selectable => Some("utf-8".to_string()),
                PageKind::Ocr => None,
            },
        }
    }

    #[test]
    fn ensure_schema_is_idempotent() {
        let (store, _dir) = store();
        store.ensure_schema().unwrap();
        store.ensure_schema().unwrap();
        assert_eq!(store.document_count().unwrap(), 0);
    }

    #[test]
    fn upsert_is_insert_if_absent() {
        let (store, _dir) = store();
        let mut meta = DocumentMetadata::unknown("sample.pdf");
        meta.title = "First".into();
        let id1 = store.upsert_metadata(&meta).unwrap();

        meta.title = "Second".into();
        let id2 = store.upsert_metadata(&meta).unwrap();

        assert_eq!(id1, id2);
        assert_eq!(store.document_count().unwrap(), 1);
        let stored = store.get_metadata("sample.pdf").unwrap().unwrap();
        assert_eq!(stored.title, "First", "existing metadata must never be updated");
    }

    #[test]
    fn lookup_missing_is_none() {
        let (store, _dir) = store();
        assert_eq!(store.lookup_document_id("nope.pdf").unwrap(), None);
        assert!(store.get_metadata("nope.pdf").unwrap().is_none());
    }

    #[test]
    fn insert_page_requires_parent_document() {
        let (store, _dir) = store();
        let err = store
            .insert_page(42, &page(1, PageKind::Selectable, "orphan"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Store { operation: "insert_page", .. }));
    }

    #[test]
    fn insert_page_appends() {
        let (store, _dir) = store();
        let id = store.upsert_metadata(&DocumentMetadata::unknown("a.pdf")).unwrap();
        store.insert_page(id, &page(1, PageKind::Ocr, "x")).unwrap();
        store.insert_page(id, &page(1, PageKind::Ocr, "x")).unwrap();
        assert_eq!(store.pages(id, PageKind::Ocr).unwrap().len(), 2);
        assert!(store.pages(id, PageKind::Selectable).unwrap().is_empty());
    }

    #[test]
    fn replace_pages_only_touches_one_kind() {
        let (store, _dir) = store();
        let id = store.upsert_metadata(&DocumentMetadata::unknown("a.pdf")).unwrap();
        store.insert_page(id, &page(1, PageKind::Selectable, "old")).unwrap();
        store.insert_page(id, &page(1, PageKind::Ocr, "scan")).unwrap();

        let inserted = store
            .replace_pages(
                id,
                PageKind::Selectable,
                &[
                    page(1, PageKind::Selectable, "new"),
                    page(2, PageKind::Ocr, "ignored"),
                    page(2, PageKind::Selectable, "two"),
                ],
            )
            .unwrap();
        assert_eq!(inserted, 2);

        let selectable = store.pages(id, PageKind::Selectable).unwrap();
        assert_eq!(
            selectable.iter().map(|p| p.text.as_str()).collect::<Vec<_>>(),
            vec!["new", "two"]
        );
        assert_eq!(selectable[0].encoding.as_deref(), Some("utf-8"));
        assert_eq!(store.pages(id, PageKind::Ocr).unwrap().len(), 1);
    }

    #[test]
    fn page_numbers_below_one_are_rejected() {
        let (store, _dir) = store();
        let id = store.upsert_metadata(&DocumentMetadata::unknown("a.pdf")).unwrap();
        assert!(store.insert_page(id, &page(0, PageKind::Ocr, "x")).is_err());
    }
}
