use std::path::Path;

use rusqlite::{params, params_from_iter, Connection};
use thiserror::Error;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS temperature_readings (
    timestamp TEXT NOT NULL,
    state TEXT CHECK(state IN ('heat', 'cool', 'off')) NOT NULL,
    temperature INTEGER NOT NULL,
    set_point INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_timestamp ON temperature_readings(timestamp);
CREATE INDEX IF NOT EXISTS idx_state ON temperature_readings(state);
CREATE VIEW IF NOT EXISTS avg_temp_by_state AS
    SELECT state, AVG(temperature) AS avg_temp
    FROM temperature_readings
    GROUP BY state;
";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Could not open reading database")]
    Open(#[source] rusqlite::Error),
    #[error("Could not append reading")]
    Append(#[source] rusqlite::Error),
    #[error("Could not query readings")]
    Query(#[source] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reading {
    pub timestamp: String,
    pub state: String,
    pub temperature: i32,
    pub set_point: i32,
}

#[derive(Clone, Debug, Default)]
pub struct ReadingFilter {
    pub since: Option<String>,
    pub until: Option<String>,
    pub state: Option<String>,
}

/// Append-only log of periodic readings, one sqlite connection owned by the
/// caller and closed on drop.
pub struct ReadingLog {
    conn: Connection,
}

impl ReadingLog {
    pub fn open(path: &Path) -> Result<ReadingLog> {
        let conn = Connection::open(path).map_err(StorageError::Open)?;
        conn.execute_batch(SCHEMA).map_err(StorageError::Open)?;
        Ok(ReadingLog { conn })
    }

    pub fn append(
        &self,
        timestamp: &str,
        state: &str,
        temperature: i32,
        set_point: i32,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO temperature_readings VALUES (?1, ?2, ?3, ?4)",
                params![timestamp, state, temperature, set_point],
            )
            .map_err(StorageError::Append)?;
        Ok(())
    }

    pub fn query(&self, filter: &ReadingFilter) -> Result<Vec<Reading>> {
        let mut sql = String::from(
            "SELECT timestamp, state, temperature, set_point FROM temperature_readings WHERE 1=1",
        );
        let mut args = Vec::new();
        if let Some(since) = &filter.since {
            sql.push_str(" AND timestamp >= ?");
            args.push(since.clone());
        }
        if let Some(until) = &filter.until {
            sql.push_str(" AND timestamp <= ?");
            args.push(until.clone());
        }
        if let Some(state) = &filter.state {
            sql.push_str(" AND state = ?");
            args.push(state.clone());
        }

        let mut statement = self.conn.prepare(&sql).map_err(StorageError::Query)?;
        let result = statement
            .query_map(params_from_iter(args), |row| {
                Ok(Reading {
                    timestamp: row.get(0)?,
                    state: row.get(1)?,
                    temperature: row.get(2)?,
                    set_point: row.get(3)?,
                })
            })
            .map_err(StorageError::Query)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::Query);
        result
    }

    /// Average recorded temperature per mode, via the `avg_temp_by_state`
    /// view.
    pub fn average_by_state(&self) -> Result<Vec<(String, f64)>> {
        let mut statement = self
            .conn
            .prepare("SELECT state, avg_temp FROM avg_temp_by_state ORDER BY state")
            .map_err(StorageError::Query)?;
        let result = statement
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(StorageError::Query)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::Query);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_log() -> ReadingLog {
        ReadingLog::open(Path::new(":memory:")).unwrap()
    }

    #[test]
    fn appended_readings_come_back() {
        let log = memory_log();
        log.append("2025-08-01 12:00:00", "heat", 68, 70).unwrap();
        log.append("2025-08-01 12:00:30", "heat", 69, 70).unwrap();

        let rows = log.query(&ReadingFilter::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            Reading {
                timestamp: "2025-08-01 12:00:00".into(),
                state: "heat".into(),
                temperature: 68,
                set_point: 70,
            }
        );
    }

    #[test]
    fn unknown_state_labels_are_rejected() {
        let log = memory_log();
        let result = log.append("2025-08-01 12:00:00", "fan", 68, 70);
        assert!(result.is_err());
        assert!(log.query(&ReadingFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn filters_by_state() {
        let log = memory_log();
        log.append("2025-08-01 12:00:00", "heat", 68, 70).unwrap();
        log.append("2025-08-01 12:00:30", "cool", 76, 70).unwrap();
        log.append("2025-08-01 12:01:00", "off", 72, 70).unwrap();

        let filter = ReadingFilter {
            state: Some("cool".into()),
            ..Default::default()
        };
        let rows = log.query(&filter).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].state, "cool");
    }

    #[test]
    fn filters_by_timestamp_range() {
        let log = memory_log();
        log.append("2025-08-01 12:00:00", "heat", 68, 70).unwrap();
        log.append("2025-08-01 12:00:30", "heat", 69, 70).unwrap();
        log.append("2025-08-01 12:01:00", "heat", 70, 70).unwrap();

        let filter = ReadingFilter {
            since: Some("2025-08-01 12:00:30".into()),
            until: Some("2025-08-01 12:00:30".into()),
            ..Default::default()
        };
        let rows = log.query(&filter).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].temperature, 69);
    }

    #[test]
    fn averages_group_by_state() {
        let log = memory_log();
        log.append("2025-08-01 12:00:00", "heat", 60, 70).unwrap();
        log.append("2025-08-01 12:00:30", "heat", 70, 70).unwrap();
        log.append("2025-08-01 12:01:00", "cool", 80, 70).unwrap();

        let averages = log.average_by_state().unwrap();
        assert_eq!(averages, vec![("cool".to_string(), 80.0), ("heat".to_string(), 65.0)]);
    }

    #[test]
    fn negative_set_points_round_trip() {
        let log = memory_log();
        log.append("2025-08-01 12:00:00", "off", 0, -5).unwrap();
        let rows = log.query(&ReadingFilter::default()).unwrap();
        assert_eq!(rows[0].set_point, -5);
    }
}
