//! SQLite implementation of the store traits.
//!
//! This is the primary storage backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use liteboard_core::{
    ContentId, ContentIdSet, GrantId, GrantKey, GrantRecord, NewGrant, NewShareToken,
    ShareToken, ShareTokenId, UserId,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{ApplyOutcome, GrantChange, GrantFilter, GrantStore, ShareTokenStore};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the locked connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Task(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

/// Raw grant columns, decoded outside the rusqlite row callback.
type GrantRow = (i64, i64, String, String, Vec<u8>, i64);

const GRANT_COLUMNS: &str = "id, user_id, content_type, action, content_ids, version";

fn read_grant_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<GrantRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn decode_grant(row: GrantRow) -> Result<GrantRecord> {
    let (id, user_id, content_type, action, content_ids, version) = row;
    Ok(GrantRecord {
        id: GrantId(id),
        user_id: UserId(user_id),
        content_type: content_type
            .parse()
            .map_err(|e| StoreError::InvalidData(format!("grant {}: {}", id, e)))?,
        action: action
            .parse()
            .map_err(|e| StoreError::InvalidData(format!("grant {}: {}", id, e)))?,
        content_ids: ContentIdSet::decode(&content_ids)?,
        version: u64::try_from(version)
            .map_err(|_| StoreError::InvalidData(format!("grant {}: negative version", id)))?,
    })
}

type TokenRow = (i64, String, i64, String, i64, i64);

fn read_token_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TokenRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn decode_token(row: TokenRow) -> Result<ShareToken> {
    let (id, token, project_id, level, created_at, expires_at) = row;
    Ok(ShareToken {
        id: ShareTokenId(id),
        token,
        project_id: ContentId(project_id),
        permission_level: level
            .parse()
            .map_err(|e| StoreError::InvalidData(format!("share token {}: {}", id, e)))?,
        created_at,
        expires_at,
    })
}

fn insert_grant_row(conn: &Connection, grant: &NewGrant) -> Result<GrantId> {
    let blob = grant.content_ids.encode()?;
    conn.execute(
        "INSERT INTO grants (user_id, content_type, action, content_ids, version)
         VALUES (?1, ?2, ?3, ?4, 1)",
        params![
            grant.user_id.get(),
            grant.content_type.as_str(),
            grant.action.as_str(),
            blob,
        ],
    )?;
    Ok(GrantId(conn.last_insert_rowid()))
}

fn key_exists(conn: &Connection, key: GrantKey) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM grants
         WHERE user_id = ?1 AND content_type = ?2 AND action = ?3)",
        params![
            key.user_id.get(),
            key.content_type.as_str(),
            key.action.as_str()
        ],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn to_sql_version(version: u64) -> Result<i64> {
    i64::try_from(version).map_err(|_| StoreError::InvalidData("version out of range".into()))
}

/// Apply one change inside an open transaction. Returns false on a failed predicate.
fn apply_change(tx: &Transaction<'_>, change: &GrantChange) -> Result<bool> {
    match change {
        GrantChange::Insert(grant) => {
            if key_exists(tx, grant.key())? {
                return Ok(false);
            }
            insert_grant_row(tx, grant)?;
            Ok(true)
        }
        GrantChange::Update {
            id,
            expected_version,
            content_ids,
        } => {
            let blob = content_ids.encode()?;
            let rows = tx.execute(
                "UPDATE grants SET content_ids = ?1, version = version + 1
                 WHERE id = ?2 AND version = ?3",
                params![blob, id.get(), to_sql_version(*expected_version)?],
            )?;
            Ok(rows == 1)
        }
        GrantChange::Delete {
            id,
            expected_version,
        } => {
            let rows = tx.execute(
                "DELETE FROM grants WHERE id = ?1 AND version = ?2",
                params![id.get(), to_sql_version(*expected_version)?],
            )?;
            Ok(rows == 1)
        }
    }
}

#[async_trait]
impl GrantStore for SqliteStore {
    async fn query_grants(&self, filter: &GrantFilter) -> Result<Vec<GrantRecord>> {
        let filter = *filter;

        self.run(move |conn| {
            // NULL parameters disable the corresponding filter
            let sql = format!(
                "SELECT {} FROM grants
                 WHERE (?1 IS NULL OR user_id = ?1)
                   AND (?2 IS NULL OR content_type = ?2)
                   AND (?3 IS NULL OR action = ?3)
                 ORDER BY id",
                GRANT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![
                        filter.user_id.map(|u| u.get()),
                        filter.content_type.map(|t| t.as_str()),
                        filter.action.map(|a| a.as_str()),
                    ],
                    read_grant_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter().map(decode_grant).collect()
        })
        .await
    }

    async fn get_grant(&self, id: GrantId) -> Result<Option<GrantRecord>> {
        self.run(move |conn| {
            let sql = format!("SELECT {} FROM grants WHERE id = ?1", GRANT_COLUMNS);
            let row = conn
                .query_row(&sql, params![id.get()], read_grant_row)
                .optional()?;
            row.map(decode_grant).transpose()
        })
        .await
    }

    async fn insert_grant(&self, grant: &NewGrant) -> Result<GrantId> {
        let grant = grant.clone();
        self.run(move |conn| insert_grant_row(conn, &grant)).await
    }

    async fn update_content_ids(&self, id: GrantId, content_ids: &ContentIdSet) -> Result<()> {
        let blob = content_ids.encode()?;

        self.run(move |conn| {
            let rows = conn.execute(
                "UPDATE grants SET content_ids = ?1, version = version + 1 WHERE id = ?2",
                params![blob, id.get()],
            )?;
            if rows == 0 {
                return Err(StoreError::NotFound(format!("grant {}", id)));
            }
            Ok(())
        })
        .await
    }

    async fn delete_grant(&self, id: GrantId) -> Result<()> {
        self.run(move |conn| {
            conn.execute("DELETE FROM grants WHERE id = ?1", params![id.get()])?;
            Ok(())
        })
        .await
    }

    async fn apply_grant_changes(&self, changes: &[GrantChange]) -> Result<ApplyOutcome> {
        let changes = changes.to_vec();

        self.run(move |conn| {
            let tx = conn.transaction()?;
            for change in &changes {
                if !apply_change(&tx, change)? {
                    tx.rollback()?;
                    return Ok(ApplyOutcome::Conflict);
                }
            }
            tx.commit()?;
            Ok(ApplyOutcome::Applied)
        })
        .await
    }
}

#[async_trait]
impl ShareTokenStore for SqliteStore {
    async fn insert_share_token(&self, token: &NewShareToken) -> Result<ShareTokenId> {
        let token = token.clone();

        self.run(move |conn| {
            let tx = conn.transaction()?;
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM share_tokens WHERE token = ?1)",
                params![token.token],
                |row| row.get(0),
            )?;
            if exists {
                return Err(StoreError::InvalidData("duplicate share token value".into()));
            }

            tx.execute(
                "INSERT INTO share_tokens
                    (token, project_id, permission_level, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    token.token,
                    token.project_id.get(),
                    token.permission_level.as_str(),
                    token.created_at,
                    token.expires_at,
                ],
            )?;
            let id = ShareTokenId(tx.last_insert_rowid());
            tx.commit()?;
            Ok(id)
        })
        .await
    }

    async fn get_share_token(&self, token: &str) -> Result<Option<ShareToken>> {
        let token = token.to_string();

        self.run(move |conn| {
            let row = conn
                .query_row(
                    "SELECT id, token, project_id, permission_level, created_at, expires_at
                     FROM share_tokens WHERE token = ?1",
                    params![token],
                    read_token_row,
                )
                .optional()?;
            row.map(decode_token).transpose()
        })
        .await
    }

    async fn share_tokens_for_project(&self, project_id: ContentId) -> Result<Vec<ShareToken>> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, token, project_id, permission_level, created_at, expires_at
                 FROM share_tokens WHERE project_id = ?1 ORDER BY id",
            )?;
            let rows = stmt
                .query_map(params![project_id.get()], read_token_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter().map(decode_token).collect()
        })
        .await
    }

    async fn delete_share_token(&self, id: ShareTokenId) -> Result<bool> {
        self.run(move |conn| {
            let rows = conn.execute("DELETE FROM share_tokens WHERE id = ?1", params![id.get()])?;
            Ok(rows > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liteboard_core::{Action, ContentType, ShareLevel};

    fn new_grant(user: i64, action: Action, ids: &[i64]) -> NewGrant {
        NewGrant::new(
            GrantKey::new(UserId(user), ContentType::Project, action),
            ids.iter().copied().map(ContentId).collect(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_query_grants() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .insert_grant(&new_grant(1, Action::Read, &[3, 1]))
            .await
            .unwrap();
        store
            .insert_grant(&new_grant(2, Action::Admin, &[1]))
            .await
            .unwrap();

        let all = store.query_grants(&GrantFilter::new()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].id < all[1].id);

        let mine = store
            .query_grants(&GrantFilter::new().user(UserId(1)))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].action, Action::Read);
        assert!(mine[0].covers(ContentId(3)));
        assert_eq!(mine[0].version, 1);
    }

    #[tokio::test]
    async fn test_update_missing_grant_is_not_found() {
        let store = SqliteStore::open_memory().unwrap();
        let result = store
            .update_content_ids(GrantId(42), &ContentIdSet::new())
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));

        // Deleting a missing row is fine
        store.delete_grant(GrantId(42)).await.unwrap();
    }

    #[tokio::test]
    async fn test_batch_applies_and_bumps_versions() {
        let store = SqliteStore::open_memory().unwrap();
        let id = store
            .insert_grant(&new_grant(1, Action::Read, &[1]))
            .await
            .unwrap();

        let changes = vec![
            GrantChange::Update {
                id,
                expected_version: 1,
                content_ids: ContentIdSet::single(ContentId(2)),
            },
            GrantChange::Insert(new_grant(1, Action::Write, &[2])),
        ];
        let outcome = store.apply_grant_changes(&changes).await.unwrap();
        assert_eq!(outcome, ApplyOutcome::Applied);

        let grant = store.get_grant(id).await.unwrap().unwrap();
        assert_eq!(grant.version, 2);
        assert!(grant.covers(ContentId(2)));
        assert_eq!(
            store.query_grants(&GrantFilter::new()).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn test_batch_conflict_rolls_back() {
        let store = SqliteStore::open_memory().unwrap();
        let id = store
            .insert_grant(&new_grant(1, Action::Read, &[1]))
            .await
            .unwrap();

        // First change would succeed, the duplicate-key insert must undo it
        let changes = vec![
            GrantChange::Update {
                id,
                expected_version: 1,
                content_ids: ContentIdSet::new(),
            },
            GrantChange::Insert(new_grant(1, Action::Read, &[5])),
        ];
        let outcome = store.apply_grant_changes(&changes).await.unwrap();
        assert_eq!(outcome, ApplyOutcome::Conflict);

        let grant = store.get_grant(id).await.unwrap().unwrap();
        assert_eq!(grant.version, 1);
        assert!(grant.covers(ContentId(1)));
    }

    #[tokio::test]
    async fn test_share_tokens() {
        let store = SqliteStore::open_memory().unwrap();
        let token = NewShareToken {
            token: "tok".into(),
            project_id: ContentId(9),
            permission_level: ShareLevel::Read,
            created_at: 100,
            expires_at: 200,
        };
        let id = store.insert_share_token(&token).await.unwrap();
        assert!(matches!(
            store.insert_share_token(&token).await,
            Err(StoreError::InvalidData(_))
        ));

        let found = store.get_share_token("tok").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.permission_level, ShareLevel::Read);
        assert_eq!(found.expires_at, 200);

        assert!(store
            .share_tokens_for_project(ContentId(1))
            .await
            .unwrap()
            .is_empty());
        assert!(store.delete_share_token(id).await.unwrap());
        assert!(store.get_share_token("tok").await.unwrap().is_none());
    }
}
