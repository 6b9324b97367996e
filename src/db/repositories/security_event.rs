use anyhow::Result;
use chrono::{Duration, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{prelude::*, security_events};

pub struct SecurityEventRepository {
    conn: DatabaseConnection,
}

impl SecurityEventRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Appends one event row, stamped with the current time.
    pub async fn record(
        &self,
        kind: &str,
        severity: &str,
        message: &str,
        details: Option<String>,
    ) -> Result<()> {
        let row = security_events::ActiveModel {
            kind: Set(kind.to_owned()),
            severity: Set(severity.to_owned()),
            message: Set(message.to_owned()),
            details: Set(details),
            recorded_at: Set(Utc::now()),
            ..Default::default()
        };
        SecurityEvents::insert(row).exec(&self.conn).await?;
        Ok(())
    }

    /// Fetches one page of events, newest first, optionally narrowed by
    /// severity (exact) and kind (substring). Returns the page together
    /// with the total page count. Pages are 1-based.
    pub async fn page(
        &self,
        page: u64,
        per_page: u64,
        severity: Option<&str>,
        kind: Option<&str>,
    ) -> Result<(Vec<security_events::Model>, u64)> {
        let mut query =
            SecurityEvents::find().order_by_desc(security_events::Column::RecordedAt);
        if let Some(severity) = severity {
            query = query.filter(security_events::Column::Severity.eq(severity));
        }
        if let Some(kind) = kind {
            query = query.filter(security_events::Column::Kind.contains(kind));
        }

        let paginator = query.paginate(&self.conn, per_page);
        let pages = paginator.num_pages().await?;
        let events = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((events, pages))
    }

    /// Deletes every event older than the retention window and reports
    /// how many rows went away.
    pub async fn prune(&self, older_than_days: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(older_than_days);
        let deleted = SecurityEvents::delete_many()
            .filter(security_events::Column::RecordedAt.lt(cutoff))
            .exec(&self.conn)
            .await?;

        Ok(deleted.rows_affected)
    }
}
