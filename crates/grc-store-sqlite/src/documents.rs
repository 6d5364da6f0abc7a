// crates/grc-store-sqlite/src/documents.rs
// ============================================================================
// Module: Document Queries
// Description: Documents, numbered versions, publication, acknowledgements.
// Purpose: Persist policy documents and who has read which version.
// Dependencies: grc-core, rusqlite, time
// ============================================================================

//! ## Overview
//! Version numbers are assigned as `MAX(version_number) + 1` inside the insert
//! transaction; the unique `(document_id, version_number)` index backs that
//! up. Publication archives every other published version of the document,
//! publishes the chosen one, and repoints the document in one transaction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use grc_core::ActivatedControlId;
use grc_core::ControlLibraryId;
use grc_core::Document;
use grc_core::DocumentControlView;
use grc_core::DocumentDetail;
use grc_core::DocumentId;
use grc_core::DocumentVersion;
use grc_core::DocumentVersionId;
use grc_core::DocumentVersionStatus;
use grc_core::NewDocument;
use grc_core::NewDocumentVersion;
use grc_core::UserId;
use grc_core::dates::normalize_instant;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use time::OffsetDateTime;

use crate::store::SqliteGrcStore;
use crate::store::SqliteStoreError;
use crate::store::count_column;
use crate::store::db_error;
use crate::store::label_column;
use crate::store::new_id;
use crate::store::require_changed;
use crate::store::require_row;
use crate::store::timestamp_column;
use crate::store::timestamp_param;

// ============================================================================
// SECTION: Row Decoding
// ============================================================================

/// Column list shared by document queries.
const DOCUMENT_COLUMNS: &str =
    "id, title, category, owner_id, published_version_id, created_at, updated_at";

/// Column list shared by version queries, aliased `v`.
const VERSION_COLUMNS: &str = "v.id, v.document_id, v.version_number, v.body_content, \
                               v.change_description, v.status, v.created_by_user_id, \
                               v.created_at, (SELECT COUNT(*) FROM document_read_acknowledgements a \
                               WHERE a.document_version_id = v.id)";

/// Decodes a document row.
fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: DocumentId::new(row.get::<_, String>(0)?),
        title: row.get(1)?,
        category: row.get(2)?,
        owner_id: row.get::<_, Option<String>>(3)?.map(UserId::new),
        published_version_id: row.get::<_, Option<String>>(4)?.map(DocumentVersionId::new),
        created_at: timestamp_column(row, 5)?,
        updated_at: timestamp_column(row, 6)?,
    })
}

/// Decodes a version row.
fn version_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentVersion> {
    Ok(DocumentVersion {
        id: DocumentVersionId::new(row.get::<_, String>(0)?),
        document_id: DocumentId::new(row.get::<_, String>(1)?),
        version_number: row.get(2)?,
        body_content: row.get(3)?,
        change_description: row.get(4)?,
        status: label_column(row, 5, DocumentVersionStatus::parse)?,
        created_by_user_id: UserId::new(row.get::<_, String>(6)?),
        created_at: timestamp_column(row, 7)?,
        acknowledgement_count: count_column(row, 8)?,
    })
}

/// Loads a document on an open connection.
fn load_document(conn: &Connection, document_id: &DocumentId) -> Result<Document, SqliteStoreError> {
    let document = conn
        .query_row(
            &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"),
            params![document_id.as_str()],
            document_from_row,
        )
        .optional()
        .map_err(db_error)?;
    require_row(document, "document")
}

/// Loads a version on an open connection.
fn load_version(
    conn: &Connection,
    version_id: &DocumentVersionId,
) -> Result<DocumentVersion, SqliteStoreError> {
    let version = conn
        .query_row(
            &format!("SELECT {VERSION_COLUMNS} FROM document_versions v WHERE v.id = ?1"),
            params![version_id.as_str()],
            version_from_row,
        )
        .optional()
        .map_err(db_error)?;
    require_row(version, "document version")
}

// ============================================================================
// SECTION: Queries
// ============================================================================

impl SqliteGrcStore {
    /// Creates a document with no versions.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] for blank fields and
    /// [`SqliteStoreError`] when the owner does not exist.
    pub fn create_document(
        &self,
        request: &NewDocument,
        now: OffsetDateTime,
    ) -> Result<Document, SqliteStoreError> {
        request.validate()?;
        let now = normalize_instant(now);
        let document = Document {
            id: DocumentId::new(new_id()),
            title: request.title.trim().to_string(),
            category: request.category.trim().to_string(),
            owner_id: Some(UserId::new(request.owner_id.trim())),
            published_version_id: None,
            created_at: now,
            updated_at: now,
        };
        let stamp = timestamp_param(now)?;
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO documents (id, title, category, owner_id, published_version_id,
                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?5)",
                params![
                    document.id.as_str(),
                    document.title,
                    document.category,
                    document.owner_id.as_ref().map(UserId::as_str),
                    stamp
                ],
            )
            .map_err(db_error)?;
            Ok(())
        })?;
        Ok(document)
    }

    /// Lists documents newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn list_documents(&self) -> Result<Vec<Document>, SqliteStoreError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY created_at DESC, id"
                ))
                .map_err(db_error)?;
            let rows = stmt.query_map(params![], document_from_row).map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
    }

    /// Loads a document with its versions, highest number first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids.
    pub fn get_document(&self, document_id: &DocumentId) -> Result<DocumentDetail, SqliteStoreError> {
        self.with_connection(|conn| {
            let document = load_document(conn, document_id)?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {VERSION_COLUMNS} FROM document_versions v
                     WHERE v.document_id = ?1
                     ORDER BY v.version_number DESC"
                ))
                .map_err(db_error)?;
            let rows =
                stmt.query_map(params![document_id.as_str()], version_from_row).map_err(db_error)?;
            let versions = rows.collect::<Result<Vec<_>, _>>().map_err(db_error)?;
            Ok(DocumentDetail { document, versions })
        })
    }

    /// Adds a draft version numbered one past the document's highest.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown documents and
    /// [`SqliteStoreError::Invalid`] for a blank body.
    pub fn create_document_version(
        &self,
        document_id: &DocumentId,
        author: &UserId,
        request: &NewDocumentVersion,
        now: OffsetDateTime,
    ) -> Result<DocumentVersion, SqliteStoreError> {
        request.validate()?;
        let now = normalize_instant(now);
        let stamp = timestamp_param(now)?;
        self.with_transaction(|tx| {
            load_document(tx, document_id)?;
            let version_number: u32 = tx
                .query_row(
                    "SELECT COALESCE(MAX(version_number), 0) + 1 FROM document_versions
                     WHERE document_id = ?1",
                    params![document_id.as_str()],
                    |row| row.get(0),
                )
                .map_err(db_error)?;
            let version = DocumentVersion {
                id: DocumentVersionId::new(new_id()),
                document_id: document_id.clone(),
                version_number,
                body_content: request.body_content.clone(),
                change_description: request
                    .change_description
                    .clone()
                    .filter(|text| !text.trim().is_empty()),
                status: DocumentVersionStatus::Draft,
                created_by_user_id: author.clone(),
                created_at: now,
                acknowledgement_count: 0,
            };
            tx.execute(
                "INSERT INTO document_versions (id, document_id, version_number, body_content,
                    change_description, status, created_by_user_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    version.id.as_str(),
                    document_id.as_str(),
                    version.version_number,
                    version.body_content,
                    version.change_description,
                    version.status.as_str(),
                    author.as_str(),
                    stamp
                ],
            )
            .map_err(db_error)?;
            Ok(version)
        })
    }

    /// Publishes a version, archiving the one previously in force.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] when the document is unknown or
    /// the version does not belong to it.
    pub fn publish_document_version(
        &self,
        document_id: &DocumentId,
        version_id: &DocumentVersionId,
        now: OffsetDateTime,
    ) -> Result<DocumentVersion, SqliteStoreError> {
        let stamp = timestamp_param(normalize_instant(now))?;
        self.with_transaction(|tx| {
            load_document(tx, document_id)?;
            let version = load_version(tx, version_id)?;
            if version.document_id != *document_id {
                return Err(SqliteStoreError::NotFound("document version not found".to_string()));
            }
            tx.execute(
                "UPDATE document_versions SET status = ?3
                 WHERE document_id = ?1 AND status = ?4 AND id <> ?2",
                params![
                    document_id.as_str(),
                    version_id.as_str(),
                    DocumentVersionStatus::Archived.as_str(),
                    DocumentVersionStatus::Published.as_str()
                ],
            )
            .map_err(db_error)?;
            tx.execute(
                "UPDATE document_versions SET status = ?2 WHERE id = ?1",
                params![version_id.as_str(), DocumentVersionStatus::Published.as_str()],
            )
            .map_err(db_error)?;
            tx.execute(
                "UPDATE documents SET published_version_id = ?2, updated_at = ?3 WHERE id = ?1",
                params![document_id.as_str(), version_id.as_str(), stamp],
            )
            .map_err(db_error)?;
            load_version(tx, version_id)
        })
    }

    /// Records that `user_id` read a version; repeats are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown versions.
    pub fn acknowledge_document_version(
        &self,
        version_id: &DocumentVersionId,
        user_id: &UserId,
        now: OffsetDateTime,
    ) -> Result<(), SqliteStoreError> {
        let stamp = timestamp_param(normalize_instant(now))?;
        self.with_transaction(|tx| {
            load_version(tx, version_id)?;
            tx.execute(
                "INSERT INTO document_read_acknowledgements (document_version_id, user_id,
                    acknowledged_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (document_version_id, user_id) DO NOTHING",
                params![version_id.as_str(), user_id.as_str(), stamp],
            )
            .map_err(db_error)?;
            Ok(())
        })
    }

    /// Maps a document to an activated control; repeats are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when either id does not exist.
    pub fn map_document_control(
        &self,
        document_id: &DocumentId,
        control_id: &ActivatedControlId,
        now: OffsetDateTime,
    ) -> Result<(), SqliteStoreError> {
        let stamp = timestamp_param(now)?;
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO document_control_mappings (document_id, activated_control_id,
                    created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (document_id, activated_control_id) DO NOTHING",
                params![document_id.as_str(), control_id.as_str(), stamp],
            )
            .map_err(db_error)?;
            Ok(())
        })
    }

    /// Removes a document to control mapping.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] when the mapping does not exist.
    pub fn unmap_document_control(
        &self,
        document_id: &DocumentId,
        control_id: &ActivatedControlId,
    ) -> Result<(), SqliteStoreError> {
        self.with_connection(|conn| {
            let changed = conn
                .execute(
                    "DELETE FROM document_control_mappings
                     WHERE document_id = ?1 AND activated_control_id = ?2",
                    params![document_id.as_str(), control_id.as_str()],
                )
                .map_err(db_error)?;
            require_changed(changed, "mapping")
        })
    }

    /// Lists the controls a document supports.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown documents.
    pub fn list_document_controls(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<DocumentControlView>, SqliteStoreError> {
        self.with_connection(|conn| {
            load_document(conn, document_id)?;
            let mut stmt = conn
                .prepare(
                    "SELECT m.activated_control_id, ac.control_library_id, cl.name
                     FROM document_control_mappings m
                     JOIN activated_controls ac ON ac.id = m.activated_control_id
                     JOIN control_library cl ON cl.id = ac.control_library_id
                     WHERE m.document_id = ?1
                     ORDER BY ac.control_library_id",
                )
                .map_err(db_error)?;
            let rows = stmt
                .query_map(params![document_id.as_str()], |row| {
                    Ok(DocumentControlView {
                        activated_control_id: ActivatedControlId::new(row.get::<_, String>(0)?),
                        control_library_id: ControlLibraryId::new(row.get::<_, String>(1)?),
                        control_name: row.get(2)?,
                    })
                })
                .map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
    }
}
