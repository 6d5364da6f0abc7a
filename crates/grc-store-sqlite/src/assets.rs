// crates/grc-store-sqlite/src/assets.rs
// ============================================================================
// Module: Asset Queries
// Description: Asset inventory CRUD, control mappings, and breakdowns.
// Purpose: Persist assets and the controls that cover them.
// Dependencies: grc-core, rusqlite, time
// ============================================================================

//! ## Overview
//! Partial updates are read-modify-write inside one transaction. Deleting an
//! asset cascades to its control mappings and clears ticket links.

// ============================================================================
// SECTION: Imports
// ============================================================================

use grc_core::ActivatedControlId;
use grc_core::Asset;
use grc_core::AssetBreakdown;
use grc_core::AssetControlView;
use grc_core::AssetId;
use grc_core::AssetStatus;
use grc_core::AssetUpdate;
use grc_core::ControlLibraryId;
use grc_core::CountBucket;
use grc_core::NewAsset;
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

/// Column list shared by asset queries.
const ASSET_COLUMNS: &str =
    "id, name, description, asset_type, owner_id, status, created_at, updated_at";

/// Decodes an asset row.
fn asset_from_row(row: &Row<'_>) -> rusqlite::Result<Asset> {
    Ok(Asset {
        id: AssetId::new(row.get::<_, String>(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        asset_type: row.get(3)?,
        owner_id: UserId::new(row.get::<_, String>(4)?),
        status: label_column(row, 5, AssetStatus::parse)?,
        created_at: timestamp_column(row, 6)?,
        updated_at: timestamp_column(row, 7)?,
    })
}

/// Loads an asset on an open connection.
fn load_asset(conn: &Connection, asset_id: &AssetId) -> Result<Asset, SqliteStoreError> {
    let asset = conn
        .query_row(
            &format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = ?1"),
            params![asset_id.as_str()],
            asset_from_row,
        )
        .optional()
        .map_err(db_error)?;
    require_row(asset, "asset")
}

/// Runs a `label, count` grouping query.
fn buckets(conn: &Connection, sql: &str) -> Result<Vec<CountBucket>, SqliteStoreError> {
    let mut stmt = conn.prepare(sql).map_err(db_error)?;
    let rows = stmt
        .query_map(params![], |row| {
            Ok(CountBucket {
                label: row.get(0)?,
                count: count_column(row, 1)?,
            })
        })
        .map_err(db_error)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
}

// ============================================================================
// SECTION: Queries
// ============================================================================

impl SqliteGrcStore {
    /// Creates an active asset.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the owner does not exist or on
    /// engine failures.
    pub fn create_asset(
        &self,
        request: &NewAsset,
        now: OffsetDateTime,
    ) -> Result<Asset, SqliteStoreError> {
        let now = normalize_instant(now);
        let asset = Asset {
            id: AssetId::new(new_id()),
            name: request.name.trim().to_string(),
            description: request.description.clone().filter(|text| !text.trim().is_empty()),
            asset_type: request.asset_type.trim().to_string(),
            owner_id: UserId::new(request.owner_id.trim()),
            status: AssetStatus::Active,
            created_at: now,
            updated_at: now,
        };
        let stamp = timestamp_param(now)?;
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO assets (id, name, description, asset_type, owner_id, status, created_at,
                    updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    asset.id.as_str(),
                    asset.name,
                    asset.description,
                    asset.asset_type,
                    asset.owner_id.as_str(),
                    asset.status.as_str(),
                    stamp
                ],
            )
            .map_err(db_error)?;
            Ok(())
        })?;
        Ok(asset)
    }

    /// Lists assets ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn list_assets(&self) -> Result<Vec<Asset>, SqliteStoreError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT {ASSET_COLUMNS} FROM assets ORDER BY name, id"))
                .map_err(db_error)?;
            let rows = stmt.query_map(params![], asset_from_row).map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
    }

    /// Loads one asset.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids.
    pub fn get_asset(&self, asset_id: &AssetId) -> Result<Asset, SqliteStoreError> {
        self.with_connection(|conn| load_asset(conn, asset_id))
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids.
    pub fn update_asset(
        &self,
        asset_id: &AssetId,
        update: &AssetUpdate,
        now: OffsetDateTime,
    ) -> Result<Asset, SqliteStoreError> {
        let now = normalize_instant(now);
        let stamp = timestamp_param(now)?;
        self.with_transaction(|tx| {
            let mut asset = load_asset(tx, asset_id)?;
            if let Some(name) = &update.name {
                asset.name = name.trim().to_string();
            }
            if let Some(description) = &update.description {
                asset.description = Some(description.clone()).filter(|text| !text.trim().is_empty());
            }
            if let Some(asset_type) = &update.asset_type {
                asset.asset_type = asset_type.trim().to_string();
            }
            if let Some(owner_id) = &update.owner_id {
                asset.owner_id = owner_id.clone();
            }
            if let Some(status) = update.status {
                asset.status = status;
            }
            asset.updated_at = now;
            tx.execute(
                "UPDATE assets SET name = ?2, description = ?3, asset_type = ?4, owner_id = ?5,
                    status = ?6, updated_at = ?7
                 WHERE id = ?1",
                params![
                    asset_id.as_str(),
                    asset.name,
                    asset.description,
                    asset.asset_type,
                    asset.owner_id.as_str(),
                    asset.status.as_str(),
                    stamp
                ],
            )
            .map_err(db_error)?;
            Ok(asset)
        })
    }

    /// Deletes an asset and its control mappings.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids.
    pub fn delete_asset(&self, asset_id: &AssetId) -> Result<(), SqliteStoreError> {
        self.with_connection(|conn| {
            let changed = conn
                .execute("DELETE FROM assets WHERE id = ?1", params![asset_id.as_str()])
                .map_err(db_error)?;
            require_changed(changed, "asset")
        })
    }

    /// Maps an asset to an activated control; re-mapping updates the type.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when either id does not exist.
    pub fn map_asset_control(
        &self,
        asset_id: &AssetId,
        control_id: &ActivatedControlId,
        mapping_type: &str,
        now: OffsetDateTime,
    ) -> Result<(), SqliteStoreError> {
        let stamp = timestamp_param(now)?;
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO asset_control_mappings (asset_id, activated_control_id, mapping_type,
                    created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (asset_id, activated_control_id)
                 DO UPDATE SET mapping_type = excluded.mapping_type",
                params![asset_id.as_str(), control_id.as_str(), mapping_type, stamp],
            )
            .map_err(db_error)?;
            Ok(())
        })
    }

    /// Removes an asset to control mapping.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] when the mapping does not exist.
    pub fn unmap_asset_control(
        &self,
        asset_id: &AssetId,
        control_id: &ActivatedControlId,
    ) -> Result<(), SqliteStoreError> {
        self.with_connection(|conn| {
            let changed = conn
                .execute(
                    "DELETE FROM asset_control_mappings
                     WHERE asset_id = ?1 AND activated_control_id = ?2",
                    params![asset_id.as_str(), control_id.as_str()],
                )
                .map_err(db_error)?;
            require_changed(changed, "mapping")
        })
    }

    /// Lists the controls mapped to an asset.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown assets.
    pub fn list_asset_controls(
        &self,
        asset_id: &AssetId,
    ) -> Result<Vec<AssetControlView>, SqliteStoreError> {
        self.with_connection(|conn| {
            load_asset(conn, asset_id)?;
            let mut stmt = conn
                .prepare(
                    "SELECT m.activated_control_id, ac.control_library_id, cl.name, m.mapping_type
                     FROM asset_control_mappings m
                     JOIN activated_controls ac ON ac.id = m.activated_control_id
                     JOIN control_library cl ON cl.id = ac.control_library_id
                     WHERE m.asset_id = ?1
                     ORDER BY ac.control_library_id",
                )
                .map_err(db_error)?;
            let rows = stmt
                .query_map(params![asset_id.as_str()], |row| {
                    Ok(AssetControlView {
                        activated_control_id: ActivatedControlId::new(row.get::<_, String>(0)?),
                        control_library_id: ControlLibraryId::new(row.get::<_, String>(1)?),
                        control_name: row.get(2)?,
                        mapping_type: row.get(3)?,
                    })
                })
                .map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
    }

    /// Counts assets by type and by status.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn asset_breakdown(&self) -> Result<AssetBreakdown, SqliteStoreError> {
        self.with_connection(|conn| {
            Ok(AssetBreakdown {
                by_type: buckets(
                    conn,
                    "SELECT asset_type, COUNT(*) FROM assets GROUP BY asset_type
                     ORDER BY COUNT(*) DESC, asset_type",
                )?,
                by_status: buckets(
                    conn,
                    "SELECT status, COUNT(*) FROM assets GROUP BY status
                     ORDER BY COUNT(*) DESC, status",
                )?,
            })
        })
    }
}
