use async_trait::async_trait;
use diesel::dsl::sql;
use diesel::expression::SqlLiteral;
use diesel::sql_types::Datetime;
use rocket_db_pools::diesel::prelude::*;
use rocket_db_pools::diesel::scoped_futures::ScopedFutureExt;
use rocket_db_pools::diesel::MysqlPool;
use rocket_db_pools::Database;
use tokio::sync::broadcast;
use tracing::debug;

use super::{generate_id, RemoteCollection};
use crate::error::CollectionError;
use crate::models::{EntryRow, GuestEntry, NewEntry};
use crate::schema::guest_entries;

#[derive(Database)]
#[database("guestbook")]
pub struct Db(MysqlPool);

impl Db {
    pub fn pool(&self) -> MysqlPool {
        self.0.clone()
    }
}

/// Guest entries in the `guest_entries` table. The database stamps
/// `submitted_at` in UTC; `seq` breaks ties between rows written in the
/// same microsecond.
pub struct MysqlCollection {
    pool: MysqlPool,
    changes: broadcast::Sender<()>,
}

impl MysqlCollection {
    pub fn new(pool: MysqlPool) -> Self {
        let (changes, _) = broadcast::channel(16);
        MysqlCollection { pool, changes }
    }
}

fn query_err(e: impl std::fmt::Display) -> CollectionError {
    CollectionError::Query(e.to_string())
}

impl From<diesel::result::Error> for CollectionError {
    fn from(e: diesel::result::Error) -> Self {
        query_err(e)
    }
}

/// Server clock in UTC, independent of the session `time_zone`.
fn utc_now() -> SqlLiteral<Datetime> {
    sql::<Datetime>("UTC_TIMESTAMP(6)")
}

#[async_trait]
impl RemoteCollection for MysqlCollection {
    async fn append(&self, entry: NewEntry) -> Result<GuestEntry, CollectionError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CollectionError::Unavailable(e.to_string()))?;

        let new_id = generate_id();
        // insert and read-back commit together or not at all
        let stored = conn
            .transaction::<_, CollectionError, _>(|conn| {
                async move {
                    diesel::insert_into(guest_entries::table)
                        .values((
                            guest_entries::id.eq(&new_id),
                            guest_entries::name.eq(&entry.name),
                            guest_entries::message.eq(&entry.message),
                            guest_entries::attendance.eq(entry.attendance.as_str()),
                            guest_entries::submitted_at.eq(utc_now()),
                        ))
                        .execute(conn)
                        .await?;

                    let row: EntryRow = guest_entries::table
                        .filter(guest_entries::id.eq(&new_id))
                        .select(EntryRow::as_select())
                        .first(conn)
                        .await?;
                    GuestEntry::try_from(row)
                }
                .scope_boxed()
            })
            .await?;

        debug!(id = %stored.id, "guest entry stored");
        let _ = self.changes.send(());
        Ok(stored)
    }

    async fn list(&self, limit: Option<usize>) -> Result<Vec<GuestEntry>, CollectionError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CollectionError::Unavailable(e.to_string()))?;

        let mut query = guest_entries::table
            .order((guest_entries::submitted_at.desc(), guest_entries::seq.desc()))
            .select(EntryRow::as_select())
            .into_boxed();
        if let Some(n) = limit {
            query = query.limit(i64::try_from(n).unwrap_or(i64::MAX));
        }

        let rows: Vec<EntryRow> = query.load(&mut conn).await.map_err(query_err)?;
        rows.into_iter().map(GuestEntry::try_from).collect()
    }

    fn changes(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::mysql::Mysql;

    #[test]
    fn stamp_ignores_session_time_zone() {
        let insert = diesel::insert_into(guest_entries::table).values((
            guest_entries::id.eq("abc"),
            guest_entries::submitted_at.eq(utc_now()),
        ));
        let rendered = diesel::debug_query::<Mysql, _>(&insert).to_string();
        assert!(rendered.contains("UTC_TIMESTAMP(6)"), "{rendered}");
        assert!(!rendered.contains("CURRENT_TIMESTAMP"), "{rendered}");
    }

    #[test]
    fn diesel_errors_become_query_failures() {
        let err = CollectionError::from(diesel::result::Error::NotFound);
        assert!(matches!(err, CollectionError::Query(_)));
    }
}
