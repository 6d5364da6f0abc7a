// crates/grc-store-sqlite/src/tickets.rs
// ============================================================================
// Module: Ticket Queries
// Description: Ticket numbering, listing, updates, and comments.
// Purpose: Persist internal and external tickets.
// Dependencies: grc-core, rusqlite, time
// ============================================================================

//! ## Overview
//! Sequential ticket numbers are assigned as `MAX(sequential_id) + 1` inside
//! the insert transaction; the unique index on the column backs that up.

// ============================================================================
// SECTION: Imports
// ============================================================================

use grc_core::ActivatedControlId;
use grc_core::AssetId;
use grc_core::CommentId;
use grc_core::DocumentId;
use grc_core::NewComment;
use grc_core::NewExternalTicket;
use grc_core::NewInternalTicket;
use grc_core::Ticket;
use grc_core::TicketComment;
use grc_core::TicketId;
use grc_core::TicketStatus;
use grc_core::TicketType;
use grc_core::TicketUpdate;
use grc_core::UserId;
use grc_core::dates::normalize_instant;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::Transaction;
use rusqlite::params;
use time::OffsetDateTime;

use crate::store::SqliteGrcStore;
use crate::store::SqliteStoreError;
use crate::store::db_error;
use crate::store::label_column;
use crate::store::new_id;
use crate::store::optional_timestamp_column;
use crate::store::require_row;
use crate::store::timestamp_column;
use crate::store::timestamp_param;

// ============================================================================
// SECTION: Row Decoding
// ============================================================================

/// Column list shared by ticket queries.
const TICKET_COLUMNS: &str = "id, sequential_id, ticket_type, title, description, status, category,
    created_by_id, assigned_to_user_id, external_customer_ref, activated_control_id, document_id,
    asset_id, created_at, updated_at, resolved_at";

/// Decodes a ticket row selected with [`TICKET_COLUMNS`].
fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: TicketId::new(row.get::<_, String>(0)?),
        sequential_id: row.get(1)?,
        ticket_type: label_column(row, 2, TicketType::parse)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status: label_column(row, 5, TicketStatus::parse)?,
        category: row.get(6)?,
        created_by_id: row.get::<_, Option<String>>(7)?.map(UserId::new),
        assigned_to_user_id: row.get::<_, Option<String>>(8)?.map(UserId::new),
        external_customer_ref: row.get(9)?,
        activated_control_id: row.get::<_, Option<String>>(10)?.map(ActivatedControlId::new),
        document_id: row.get::<_, Option<String>>(11)?.map(DocumentId::new),
        asset_id: row.get::<_, Option<String>>(12)?.map(AssetId::new),
        created_at: timestamp_column(row, 13)?,
        updated_at: timestamp_column(row, 14)?,
        resolved_at: optional_timestamp_column(row, 15)?,
    })
}

/// Decodes a comment row joined with the author name.
fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<TicketComment> {
    Ok(TicketComment {
        id: CommentId::new(row.get::<_, String>(0)?),
        ticket_id: TicketId::new(row.get::<_, String>(1)?),
        user_id: UserId::new(row.get::<_, String>(2)?),
        author_name: row.get(3)?,
        body: row.get(4)?,
        is_internal_note: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
    })
}

/// Loads a ticket inside an open transaction.
fn load_ticket(tx: &Transaction<'_>, ticket_id: &str) -> Result<Ticket, SqliteStoreError> {
    let ticket = tx
        .query_row(
            &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1"),
            params![ticket_id],
            ticket_from_row,
        )
        .optional()
        .map_err(db_error)?;
    require_row(ticket, "ticket")
}

/// Inserts a ticket with the next sequential number and returns it.
fn insert_ticket(tx: &Transaction<'_>, mut ticket: Ticket) -> Result<Ticket, SqliteStoreError> {
    let next: i64 = tx
        .query_row("SELECT COALESCE(MAX(sequential_id), 0) + 1 FROM tickets", params![], |row| {
            row.get(0)
        })
        .map_err(db_error)?;
    ticket.sequential_id = next;
    let created_at = timestamp_param(ticket.created_at)?;
    tx.execute(
        "INSERT INTO tickets (id, sequential_id, ticket_type, title, description, status, category,
            created_by_id, assigned_to_user_id, external_customer_ref, activated_control_id,
            document_id, asset_id, created_at, updated_at, resolved_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14, NULL)",
        params![
            ticket.id.as_str(),
            ticket.sequential_id,
            ticket.ticket_type.as_str(),
            ticket.title,
            ticket.description,
            ticket.status.as_str(),
            ticket.category,
            ticket.created_by_id.as_ref().map(UserId::as_str),
            ticket.assigned_to_user_id.as_ref().map(UserId::as_str),
            ticket.external_customer_ref,
            ticket.activated_control_id.as_ref().map(ActivatedControlId::as_str),
            ticket.document_id.as_ref().map(DocumentId::as_str),
            ticket.asset_id.as_ref().map(AssetId::as_str),
            created_at
        ],
    )
    .map_err(db_error)?;
    Ok(ticket)
}

/// Trims optional text, dropping blanks.
fn clean(value: Option<&String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

// ============================================================================
// SECTION: Queries
// ============================================================================

impl SqliteGrcStore {
    /// Creates an internal ticket raised by `creator`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when a linked id does not exist or on
    /// engine failures.
    pub fn create_internal_ticket(
        &self,
        creator: &UserId,
        request: &NewInternalTicket,
        now: OffsetDateTime,
    ) -> Result<Ticket, SqliteStoreError> {
        let now = normalize_instant(now);
        let ticket = Ticket {
            id: TicketId::new(new_id()),
            sequential_id: 0,
            ticket_type: TicketType::Internal,
            title: request.title.trim().to_string(),
            description: clean(request.description.as_ref()),
            status: TicketStatus::New,
            category: clean(request.category.as_ref()),
            created_by_id: Some(creator.clone()),
            assigned_to_user_id: None,
            external_customer_ref: None,
            activated_control_id: request.activated_control_id.clone(),
            document_id: request.document_id.clone().filter(|id| !id.is_blank()),
            asset_id: request.asset_id.clone(),
            created_at: now,
            updated_at: now,
            resolved_at: None,
        };
        self.with_transaction(|tx| insert_ticket(tx, ticket))
    }

    /// Creates an external ticket with no creating user.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn create_external_ticket(
        &self,
        request: &NewExternalTicket,
        now: OffsetDateTime,
    ) -> Result<Ticket, SqliteStoreError> {
        let now = normalize_instant(now);
        let ticket = Ticket {
            id: TicketId::new(new_id()),
            sequential_id: 0,
            ticket_type: TicketType::External,
            title: request.title.trim().to_string(),
            description: clean(request.description.as_ref()),
            status: TicketStatus::New,
            category: clean(request.category.as_ref()),
            created_by_id: None,
            assigned_to_user_id: None,
            external_customer_ref: Some(request.external_customer_ref.trim().to_string()),
            activated_control_id: None,
            document_id: None,
            asset_id: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        };
        self.with_transaction(|tx| insert_ticket(tx, ticket))
    }

    /// Lists tickets newest first, optionally filtered by origin.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn list_tickets(
        &self,
        ticket_type: Option<TicketType>,
    ) -> Result<Vec<Ticket>, SqliteStoreError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {TICKET_COLUMNS} FROM tickets
                     WHERE (?1 IS NULL OR ticket_type = ?1)
                     ORDER BY created_at DESC, sequential_id DESC"
                ))
                .map_err(db_error)?;
            let rows = stmt
                .query_map(params![ticket_type.map(TicketType::as_str)], ticket_from_row)
                .map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
    }

    /// Lists external tickets for a customer reference, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn list_tickets_by_customer(
        &self,
        customer_ref: &str,
    ) -> Result<Vec<Ticket>, SqliteStoreError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {TICKET_COLUMNS} FROM tickets
                     WHERE ticket_type = 'external' AND external_customer_ref = ?1
                     ORDER BY created_at DESC, sequential_id DESC"
                ))
                .map_err(db_error)?;
            let rows =
                stmt.query_map(params![customer_ref.trim()], ticket_from_row).map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
    }

    /// Loads one ticket.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids.
    pub fn get_ticket(&self, ticket_id: &TicketId) -> Result<Ticket, SqliteStoreError> {
        self.with_connection(|conn| {
            let ticket = conn
                .query_row(
                    &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1"),
                    params![ticket_id.as_str()],
                    ticket_from_row,
                )
                .optional()
                .map_err(db_error)?;
            require_row(ticket, "ticket")
        })
    }

    /// Lists a ticket's comments oldest first, optionally hiding internal notes.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn list_comments(
        &self,
        ticket_id: &TicketId,
        include_internal: bool,
    ) -> Result<Vec<TicketComment>, SqliteStoreError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT c.id, c.ticket_id, c.user_id, u.name, c.body, c.is_internal_note,
                        c.created_at
                     FROM ticket_comments c JOIN users u ON u.id = c.user_id
                     WHERE c.ticket_id = ?1 AND (?2 OR c.is_internal_note = 0)
                     ORDER BY c.created_at ASC, c.rowid ASC",
                )
                .map_err(db_error)?;
            let rows = stmt
                .query_map(params![ticket_id.as_str(), include_internal], comment_from_row)
                .map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
    }

    /// Appends a comment to a ticket.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] when the ticket does not exist.
    pub fn add_comment(
        &self,
        ticket_id: &TicketId,
        author: &UserId,
        request: &NewComment,
        now: OffsetDateTime,
    ) -> Result<TicketComment, SqliteStoreError> {
        let now = normalize_instant(now);
        let created_at = timestamp_param(now)?;
        self.with_transaction(|tx| {
            load_ticket(tx, ticket_id.as_str())?;
            let id = CommentId::new(new_id());
            tx.execute(
                "INSERT INTO ticket_comments (id, ticket_id, user_id, body, is_internal_note, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.as_str(),
                    ticket_id.as_str(),
                    author.as_str(),
                    request.body.trim(),
                    request.is_internal_note,
                    created_at
                ],
            )
            .map_err(db_error)?;
            tx.execute(
                "UPDATE tickets SET updated_at = ?2 WHERE id = ?1",
                params![ticket_id.as_str(), created_at],
            )
            .map_err(db_error)?;
            let author_name: String = tx
                .query_row("SELECT name FROM users WHERE id = ?1", params![author.as_str()], |row| {
                    row.get(0)
                })
                .map_err(db_error)?;
            Ok(TicketComment {
                id,
                ticket_id: ticket_id.clone(),
                user_id: author.clone(),
                author_name,
                body: request.body.trim().to_string(),
                is_internal_note: request.is_internal_note,
                created_at: now,
            })
        })
    }

    /// Applies an admin update; moving to `resolved` stamps `resolved_at`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids.
    pub fn update_ticket(
        &self,
        ticket_id: &TicketId,
        update: &TicketUpdate,
        now: OffsetDateTime,
    ) -> Result<Ticket, SqliteStoreError> {
        let now = normalize_instant(now);
        self.with_transaction(|tx| {
            let mut ticket = load_ticket(tx, ticket_id.as_str())?;
            if let Some(status) = update.status {
                if status == TicketStatus::Resolved && ticket.status != TicketStatus::Resolved {
                    ticket.resolved_at = Some(now);
                }
                ticket.status = status;
            }
            if let Some(assignee) = &update.assigned_to_user_id {
                ticket.assigned_to_user_id = Some(assignee.clone()).filter(|id| !id.is_blank());
            }
            if let Some(category) = &update.category {
                ticket.category = clean(Some(category));
            }
            ticket.updated_at = now;
            let resolved_at = ticket.resolved_at.map(timestamp_param).transpose()?;
            tx.execute(
                "UPDATE tickets SET status = ?2, assigned_to_user_id = ?3, category = ?4,
                    updated_at = ?5, resolved_at = ?6
                 WHERE id = ?1",
                params![
                    ticket_id.as_str(),
                    ticket.status.as_str(),
                    ticket.assigned_to_user_id.as_ref().map(UserId::as_str),
                    ticket.category,
                    timestamp_param(now)?,
                    resolved_at
                ],
            )
            .map_err(db_error)?;
            Ok(ticket)
        })
    }
}
