use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// SQLite registry of vehicles that have entered the lot.
///
/// Plates are the primary key, so the first entry for a plate is the one
/// kept. Lookups ignore case; listings are ordered by plate.
pub struct VehicleRegistry {
    conn: Mutex<Connection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vehicle {
    pub plate: String,
    pub slot: u32,
    pub entry_ms: i64,
    /// RFC 3339 rendering of `entry_ms` (UTC).
    pub entry_time: String,
}

impl VehicleRegistry {
    /// Open (or create) the registry database. Creates the parent directory.
    pub fn open(path: &Path) -> Result<Self, RegistryError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| RegistryError::CreateDir(parent.display().to_string(), e))?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS vehicles (
                plate    TEXT    PRIMARY KEY,
                slot     INTEGER NOT NULL,
                entry_ms INTEGER NOT NULL
            );",
        )?;

        info!(path = path.display().to_string(), "vehicle registry opened");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Record an entry. Returns false when the plate is already registered.
    pub fn park(&self, plate: &str, slot: u32, entry_ms: i64) -> Result<bool, RegistryError> {
        let conn = self.conn.lock().map_err(|_| RegistryError::Poisoned)?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO vehicles (plate, slot, entry_ms) VALUES (?1, ?2, ?3)",
            params![plate, slot, entry_ms],
        )?;
        debug!(plate, slot, entry_ms, inserted = changed > 0, "vehicle entry");
        Ok(changed > 0)
    }

    pub fn search(&self, plate: &str) -> Result<Option<Vehicle>, RegistryError> {
        let conn = self.conn.lock().map_err(|_| RegistryError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT plate, slot, entry_ms FROM vehicles
             WHERE plate = ?1 COLLATE NOCASE
             ORDER BY plate LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![plate], row_to_vehicle)?;
        Ok(rows.next().transpose()?)
    }

    pub fn list(&self) -> Result<Vec<Vehicle>, RegistryError> {
        let conn = self.conn.lock().map_err(|_| RegistryError::Poisoned)?;
        let mut stmt =
            conn.prepare("SELECT plate, slot, entry_ms FROM vehicles ORDER BY plate ASC")?;
        let rows = stmt.query_map([], row_to_vehicle)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn row_to_vehicle(row: &rusqlite::Row<'_>) -> rusqlite::Result<Vehicle> {
    let entry_ms: i64 = row.get(2)?;
    Ok(Vehicle {
        plate: row.get(0)?,
        slot: row.get(1)?,
        entry_ms,
        entry_time: chrono::DateTime::from_timestamp_millis(entry_ms)
            .map(|t| t.to_rfc3339())
            .unwrap_or_default(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to create registry directory {0}: {1}")]
    CreateDir(String, std::io::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("registry lock poisoned")]
    Poisoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, VehicleRegistry) {
        let tmp = tempfile::tempdir().unwrap();
        let registry = VehicleRegistry::open(&tmp.path().join("db/vehicles.db")).unwrap();
        (tmp, registry)
    }

    #[test]
    fn duplicate_plate_keeps_first_entry() {
        let (_tmp, registry) = open_temp();
        assert!(registry.park("AB12CD", 1, 1_000).unwrap());
        assert!(!registry.park("AB12CD", 2, 2_000).unwrap());

        let vehicle = registry.search("AB12CD").unwrap().unwrap();
        assert_eq!(vehicle.slot, 1);
        assert_eq!(vehicle.entry_ms, 1_000);
    }

    #[test]
    fn search_ignores_case() {
        let (_tmp, registry) = open_temp();
        registry.park("AB12CD", 3, 0).unwrap();
        let vehicle = registry.search("ab12cd").unwrap().unwrap();
        assert_eq!(vehicle.plate, "AB12CD");
        assert!(registry.search("XY99").unwrap().is_none());
    }

    #[test]
    fn list_is_ordered_by_plate() {
        let (_tmp, registry) = open_temp();
        registry.park("MM22", 1, 0).unwrap();
        registry.park("AA11", 2, 0).unwrap();
        registry.park("ZZ33", 3, 0).unwrap();

        let plates: Vec<_> = registry.list().unwrap().into_iter().map(|v| v.plate).collect();
        assert_eq!(plates, ["AA11", "MM22", "ZZ33"]);
    }

    #[test]
    fn entry_time_is_rfc3339() {
        let (_tmp, registry) = open_temp();
        registry.park("AB12", 1, 0).unwrap();
        let vehicle = registry.search("AB12").unwrap().unwrap();
        assert_eq!(vehicle.entry_time, "1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn entries_survive_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("vehicles.db");
        VehicleRegistry::open(&path).unwrap().park("AB12", 1, 5).unwrap();

        let reopened = VehicleRegistry::open(&path).unwrap();
        assert_eq!(reopened.list().unwrap().len(), 1);
    }
}
