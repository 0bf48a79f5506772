use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Row, params};

use super::models::{LogRecord, NewSite, Site, SiteOverview, format_timestamp};
use crate::monitoring::types::{ProbeResult, ProbeStatus};
use crate::pool::{LibsqlManager, LibsqlPool};
use crate::{Error, Result};

const SITE_COLUMNS: &str = "id, url, check_interval, expected_text, enabled";

/// Read/write contract between the engine, the serving surface and storage
#[async_trait]
pub trait Database: Send + Sync {
    /// Sites the scheduler probes this cycle
    async fn get_enabled_sites(&self) -> Result<Vec<Site>>;

    /// Append one log record for a probe
    async fn save_result(&self, result: &ProbeResult) -> Result<i64>;

    /// Register a new site, enabled
    async fn add_site(&self, site: &NewSite) -> Result<Site>;

    async fn get_site(&self, id: i64) -> Result<Option<Site>>;

    /// All sites ordered by URL
    async fn list_sites(&self) -> Result<Vec<Site>>;

    /// All sites with their latest probe and uptime ratio
    async fn list_site_overviews(&self) -> Result<Vec<SiteOverview>>;

    async fn set_site_enabled(&self, id: i64, enabled: bool) -> Result<Site>;

    /// Flip the enabled flag
    async fn toggle_site(&self, id: i64) -> Result<Site>;

    /// Remove a site together with its log records
    async fn delete_site(&self, id: i64) -> Result<()>;

    /// Log records newer than `since`, oldest first
    async fn get_logs_since(&self, site_id: i64, since: DateTime<Utc>) -> Result<Vec<LogRecord>>;

    /// Latest log records, newest first
    async fn get_recent_results(&self, site_id: i64, limit: usize) -> Result<Vec<LogRecord>>;
}

/// LibSQL database implementation
pub struct DatabaseImpl {
    pool: LibsqlPool,
}

impl DatabaseImpl {
    /// Create a new database instance from a pool
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    /// Get a connection from the pool
    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>> {
        Ok(self.pool.get().await?)
    }
}

fn site_from_row(row: &Row) -> Result<Site> {
    Ok(Site {
        id: row.get(0)?,
        url: row.get(1)?,
        check_interval: row.get::<Option<i64>>(2)?.unwrap_or(60).max(0) as u64,
        expected_text: row.get(3)?,
        enabled: row.get::<Option<i64>>(4)?.unwrap_or(1) != 0,
    })
}

fn log_from_row(row: &Row) -> Result<LogRecord> {
    Ok(LogRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        status: ProbeStatus::from_i64(row.get::<Option<i64>>(2)?.unwrap_or(0)),
        response_time: row.get(3)?,
        timestamp: row.get::<Option<String>>(4)?.unwrap_or_default(),
    })
}

#[async_trait]
impl Database for DatabaseImpl {
    async fn get_enabled_sites(&self) -> Result<Vec<Site>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(&format!("SELECT {SITE_COLUMNS} FROM sites WHERE enabled = 1 ORDER BY id"), ())
            .await?;

        let mut sites = Vec::new();
        while let Some(row) = rows.next().await? {
            sites.push(site_from_row(&row)?);
        }
        Ok(sites)
    }

    async fn save_result(&self, result: &ProbeResult) -> Result<i64> {
        let conn = self.get_conn().await?;

        conn.execute(
            "INSERT INTO logs (site_id, status, response_time, timestamp) VALUES (?, ?, ?, ?)",
            params![
                result.site_id,
                result.status.as_i64(),
                result.response_time.map(|elapsed| elapsed.as_secs_f64()),
                format_timestamp(result.timestamp)
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn add_site(&self, site: &NewSite) -> Result<Site> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO sites (url, check_interval, expected_text, enabled) VALUES (?, ?, ?, 1)",
            params![site.url.clone(), site.check_interval as i64, site.expected_text.clone()],
        )
        .await?;

        Ok(Site {
            id: conn.last_insert_rowid(),
            url: site.url.clone(),
            check_interval: site.check_interval,
            expected_text: site.expected_text.clone(),
            enabled: true,
        })
    }

    async fn get_site(&self, id: i64) -> Result<Option<Site>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(&format!("SELECT {SITE_COLUMNS} FROM sites WHERE id = ?"), params![id])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(site_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_sites(&self) -> Result<Vec<Site>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(&format!("SELECT {SITE_COLUMNS} FROM sites ORDER BY url"), ())
            .await?;

        let mut sites = Vec::new();
        while let Some(row) = rows.next().await? {
            sites.push(site_from_row(&row)?);
        }
        Ok(sites)
    }

    async fn list_site_overviews(&self) -> Result<Vec<SiteOverview>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT
                    s.id, s.url, s.check_interval, s.expected_text, s.enabled,
                    l.status, l.response_time, l.timestamp,
                    (SELECT COUNT(*) FROM logs WHERE site_id = s.id AND status = 1) * 100.0 /
                    NULLIF((SELECT COUNT(*) FROM logs WHERE site_id = s.id), 0) AS uptime_percent
                FROM sites s
                LEFT JOIN logs l ON l.id = (
                    SELECT id FROM logs WHERE site_id = s.id ORDER BY timestamp DESC, id DESC LIMIT 1
                )
                ORDER BY s.url",
                (),
            )
            .await?;

        let mut overviews = Vec::new();
        while let Some(row) = rows.next().await? {
            overviews.push(SiteOverview {
                site: site_from_row(&row)?,
                status: row.get::<Option<i64>>(5)?.map(ProbeStatus::from_i64),
                response_time: row.get(6)?,
                timestamp: row.get(7)?,
                uptime_percent: row.get(8)?,
            });
        }
        Ok(overviews)
    }

    async fn set_site_enabled(&self, id: i64, enabled: bool) -> Result<Site> {
        let conn = self.get_conn().await?;
        let changed = conn
            .execute(
                "UPDATE sites SET enabled = ? WHERE id = ?",
                params![if enabled { 1 } else { 0 }, id],
            )
            .await?;
        drop(conn);

        if changed == 0 {
            return Err(Error::NotFound(id));
        }
        self.get_site(id).await?.ok_or(Error::NotFound(id))
    }

    async fn toggle_site(&self, id: i64) -> Result<Site> {
        let site = self.get_site(id).await?.ok_or(Error::NotFound(id))?;
        self.set_site_enabled(id, !site.enabled).await
    }

    async fn delete_site(&self, id: i64) -> Result<()> {
        let conn = self.get_conn().await?;

        // foreign_keys is off by default in SQLite, so the cascade is done by hand
        conn.execute("DELETE FROM logs WHERE site_id = ?", params![id]).await?;
        let deleted = conn.execute("DELETE FROM sites WHERE id = ?", params![id]).await?;

        if deleted == 0 {
            return Err(Error::NotFound(id));
        }
        Ok(())
    }

    async fn get_logs_since(&self, site_id: i64, since: DateTime<Utc>) -> Result<Vec<LogRecord>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT id, site_id, status, response_time, timestamp FROM logs
                WHERE site_id = ? AND timestamp > ?
                ORDER BY timestamp, id",
                params![site_id, format_timestamp(since)],
            )
            .await?;

        let mut logs = Vec::new();
        while let Some(row) = rows.next().await? {
            logs.push(log_from_row(&row)?);
        }
        Ok(logs)
    }

    async fn get_recent_results(&self, site_id: i64, limit: usize) -> Result<Vec<LogRecord>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT id, site_id, status, response_time, timestamp FROM logs
                WHERE site_id = ?
                ORDER BY timestamp DESC, id DESC LIMIT ?",
                params![site_id, limit as i64],
            )
            .await?;

        let mut logs = Vec::new();
        while let Some(row) = rows.next().await? {
            logs.push(log_from_row(&row)?);
        }
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_database;
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;

    fn new_site(url: &str, expected_text: Option<&str>) -> NewSite {
        NewSite {
            url: url.to_string(),
            check_interval: 60,
            expected_text: expected_text.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_register_and_list_enabled() -> anyhow::Result<()> {
        let (database, _dir) = create_test_database().await?;

        let a = database.add_site(&new_site("https://a.example", None)).await?;
        let b = database.add_site(&new_site("https://b.example", Some("Welcome"))).await?;
        assert!(a.enabled && b.enabled);

        let enabled = database.get_enabled_sites().await?;
        assert_eq!(enabled, vec![a.clone(), b.clone()]);

        let toggled = database.toggle_site(a.id).await?;
        assert!(!toggled.enabled);
        assert_eq!(database.get_enabled_sites().await?, vec![b]);
        Ok(())
    }

    #[tokio::test]
    async fn test_disabled_site_keeps_history_until_deleted() -> anyhow::Result<()> {
        let (database, _dir) = create_test_database().await?;
        let site = database.add_site(&new_site("https://a.example", None)).await?;

        let result = ProbeResult::success(site.id, site.url.clone(), Duration::from_millis(120));
        database.save_result(&result).await?;
        database.set_site_enabled(site.id, false).await?;

        assert!(database.get_enabled_sites().await?.is_empty());
        assert_eq!(database.get_recent_results(site.id, 10).await?.len(), 1);

        database.delete_site(site.id).await?;
        assert!(database.get_site(site.id).await?.is_none());
        assert!(database.get_recent_results(site.id, 10).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_site_is_not_found() -> anyhow::Result<()> {
        let (database, _dir) = create_test_database().await?;
        assert!(matches!(database.toggle_site(42).await, Err(Error::NotFound(42))));
        assert!(matches!(database.delete_site(42).await, Err(Error::NotFound(42))));
        Ok(())
    }

    #[tokio::test]
    async fn test_logs_are_ordered_and_windowed() -> anyhow::Result<()> {
        let (database, _dir) = create_test_database().await?;
        let site = database.add_site(&new_site("https://a.example", None)).await?;

        let mut old = ProbeResult::success(site.id, site.url.clone(), Duration::from_millis(100));
        old.timestamp = Utc::now() - ChronoDuration::days(10);
        database.save_result(&old).await?;

        let mut first = ProbeResult::failure(
            site.id,
            site.url.clone(),
            crate::Error::NetworkFault("refused".into()),
        );
        first.timestamp = Utc::now() - ChronoDuration::minutes(2);
        database.save_result(&first).await?;

        let second = ProbeResult::success(site.id, site.url.clone(), Duration::from_millis(300));
        database.save_result(&second).await?;

        let logs = database.get_logs_since(site.id, Utc::now() - ChronoDuration::days(7)).await?;
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].status, ProbeStatus::Down);
        assert_eq!(logs[0].response_time, None);
        assert_eq!(logs[1].status, ProbeStatus::Up);
        assert!(logs[0].timestamp < logs[1].timestamp);
        Ok(())
    }

    #[tokio::test]
    async fn test_overview_reports_latest_status_and_uptime() -> anyhow::Result<()> {
        let (database, _dir) = create_test_database().await?;
        let site = database.add_site(&new_site("https://a.example", None)).await?;
        let idle = database.add_site(&new_site("https://b.example", None)).await?;

        let mut up = ProbeResult::success(site.id, site.url.clone(), Duration::from_millis(100));
        up.timestamp = Utc::now() - ChronoDuration::minutes(1);
        database.save_result(&up).await?;
        database
            .save_result(&ProbeResult::failure(
                site.id,
                site.url.clone(),
                crate::Error::NetworkFault("timed out".into()),
            ))
            .await?;

        let overviews = database.list_site_overviews().await?;
        assert_eq!(overviews.len(), 2);

        let checked = &overviews[0];
        assert_eq!(checked.site.id, site.id);
        assert_eq!(checked.status, Some(ProbeStatus::Down));
        assert_eq!(checked.uptime_percent, Some(50.0));

        let unchecked = &overviews[1];
        assert_eq!(unchecked.site.id, idle.id);
        assert_eq!(unchecked.status, None);
        assert_eq!(unchecked.uptime_percent, None);
        Ok(())
    }
}
