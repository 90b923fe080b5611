use crate::sqlite_column;
use crate::sqlite_persistence::{open_versioned_db, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use super::marketplace_store::MarketplaceStore;
use super::models::{Listing, ListingStatus, MarketplaceCounts};

/// V 0
const LISTING_TABLE_V_0: Table = Table {
    name: "listing",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("seller_id", &SqlType::Integer, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text, non_null = true),
        sqlite_column!("skill", &SqlType::Text, non_null = true),
        sqlite_column!(
            "price_cents",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        sqlite_column!("moderation_note", &SqlType::Text),
        sqlite_column!("reviewer_id", &SqlType::Integer),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("reviewed_at", &SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[
        ("idx_listing_status", "status"),
        ("idx_listing_seller_id", "seller_id"),
    ],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[LISTING_TABLE_V_0],
    migration: None,
}];

const LISTING_COLUMNS: &str = "id, seller_id, title, description, skill, price_cents, status, moderation_note, reviewer_id, created, reviewed_at";

fn listing_from_row(row: &Row) -> rusqlite::Result<Listing> {
    let status_name: String = row.get(6)?;
    let status = ListingStatus::from_str(&status_name).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Text,
            format!("Unknown listing status {}", status_name).into(),
        )
    })?;
    Ok(Listing {
        id: row.get(0)?,
        seller_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        skill: row.get(4)?,
        price_cents: row.get(5)?,
        status,
        moderation_note: row.get(7)?,
        reviewer_id: row.get(8)?,
        created: row.get(9)?,
        reviewed_at: row.get(10)?,
    })
}

#[derive(Clone)]
pub struct SqliteMarketplaceStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMarketplaceStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned_db(db_path, VERSIONED_SCHEMAS)?;
        Ok(SqliteMarketplaceStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl MarketplaceStore for SqliteMarketplaceStore {
    fn create_listing(&self, listing: &Listing) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                LISTING_TABLE_V_0.name, LISTING_COLUMNS
            ),
            params![
                listing.id,
                listing.seller_id,
                listing.title,
                listing.description,
                listing.skill,
                listing.price_cents,
                listing.status.as_str(),
                listing.moderation_note,
                listing.reviewer_id,
                listing.created,
                listing.reviewed_at,
            ],
        )
        .with_context(|| format!("Failed to create listing {}", listing.id))?;
        Ok(())
    }

    fn get_listing(&self, listing_id: &str) -> Result<Option<Listing>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE id = ?1",
                    LISTING_COLUMNS, LISTING_TABLE_V_0.name
                ),
                params![listing_id],
                listing_from_row,
            )
            .optional()?)
    }

    fn list_by_status(&self, status: ListingStatus, skill: Option<&str>) -> Result<Vec<Listing>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE status = ?1 AND (?2 IS NULL OR skill = ?2 COLLATE NOCASE)
             ORDER BY created DESC, rowid DESC",
            LISTING_COLUMNS, LISTING_TABLE_V_0.name
        ))?;
        let listings = stmt
            .query_map(params![status.as_str(), skill], listing_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(listings)
    }

    fn list_by_seller(&self, seller_id: usize) -> Result<Vec<Listing>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE seller_id = ?1 ORDER BY created DESC, rowid DESC",
            LISTING_COLUMNS, LISTING_TABLE_V_0.name
        ))?;
        let listings = stmt
            .query_map(params![seller_id], listing_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(listings)
    }

    fn review_listing(
        &self,
        listing_id: &str,
        status: ListingStatus,
        reviewer_id: usize,
        note: Option<&str>,
        reviewed_at: i64,
    ) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET status = ?1, reviewer_id = ?2, moderation_note = ?3, reviewed_at = ?4
                 WHERE id = ?5 AND status = 'pending'",
                LISTING_TABLE_V_0.name
            ),
            params![status.as_str(), reviewer_id, note, reviewed_at, listing_id],
        )?;
        Ok(updated > 0)
    }

    fn delete_listing(&self, listing_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", LISTING_TABLE_V_0.name),
            params![listing_id],
        )?;
        Ok(deleted > 0)
    }

    fn count(&self) -> Result<MarketplaceCounts> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT status, COUNT(*) FROM {} GROUP BY status",
            LISTING_TABLE_V_0.name
        ))?;
        let mut rows = stmt.query([])?;
        let mut counts = MarketplaceCounts::default();
        while let Some(row) = rows.next()? {
            let status: String = row.get(0)?;
            let count: usize = row.get(1)?;
            match ListingStatus::from_str(&status) {
                Some(ListingStatus::Pending) => counts.pending = count,
                Some(ListingStatus::Approved) => counts.approved = count,
                Some(ListingStatus::Rejected) => counts.rejected = count,
                None => {}
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite_persistence::now_secs;
    use tempfile::TempDir;

    fn create_tmp_store() -> (SqliteMarketplaceStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteMarketplaceStore::new(temp_dir.path().join("marketplace.db")).unwrap();
        (store, temp_dir)
    }

    fn listing(id: &str, seller_id: usize, skill: &str) -> Listing {
        Listing {
            id: id.to_string(),
            seller_id,
            title: format!("Lessons {}", id),
            description: String::new(),
            skill: skill.to_string(),
            price_cents: 1500,
            status: ListingStatus::Pending,
            moderation_note: None,
            reviewer_id: None,
            created: now_secs(),
            reviewed_at: None,
        }
    }

    #[test]
    fn only_pending_listings_are_reviewed() {
        let (store, _dir) = create_tmp_store();
        store.create_listing(&listing("l1", 1, "Guitar")).unwrap();

        assert!(store
            .review_listing("l1", ListingStatus::Approved, 9, Some("ok"), now_secs())
            .unwrap());
        assert!(!store
            .review_listing("l1", ListingStatus::Rejected, 9, None, now_secs())
            .unwrap());
        assert!(!store
            .review_listing("missing", ListingStatus::Approved, 9, None, now_secs())
            .unwrap());

        let reviewed = store.get_listing("l1").unwrap().unwrap();
        assert_eq!(reviewed.status, ListingStatus::Approved);
        assert_eq!(reviewed.reviewer_id, Some(9));
        assert_eq!(reviewed.moderation_note.as_deref(), Some("ok"));
    }

    #[test]
    fn lists_by_status_and_skill() {
        let (store, _dir) = create_tmp_store();
        store.create_listing(&listing("l1", 1, "Guitar")).unwrap();
        store.create_listing(&listing("l2", 1, "Piano")).unwrap();
        store.create_listing(&listing("l3", 2, "guitar")).unwrap();
        for id in ["l1", "l3"] {
            store
                .review_listing(id, ListingStatus::Approved, 9, None, now_secs())
                .unwrap();
        }

        assert_eq!(
            store
                .list_by_status(ListingStatus::Approved, Some("GUITAR"))
                .unwrap()
                .len(),
            2
        );
        assert_eq!(
            store
                .list_by_status(ListingStatus::Approved, Some("piano"))
                .unwrap()
                .len(),
            0
        );
        assert_eq!(
            store.list_by_status(ListingStatus::Pending, None).unwrap()[0].id,
            "l2"
        );
        assert_eq!(store.list_by_seller(1).unwrap().len(), 2);

        let counts = store.count().unwrap();
        assert_eq!(counts.approved, 2);
        assert_eq!(counts.pending, 1);
        assert!(store.delete_listing("l2").unwrap());
        assert_eq!(store.count().unwrap().pending, 0);
    }
}
