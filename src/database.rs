use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::path::Path;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{AthleteProfile, DateRange, PersonalBest, TrainingLog, WorkoutKind, WorkoutRecord};
use crate::store::TrainingStore;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-backed training store
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create or open a database at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::with_connection(conn)
    }

    /// Private in-memory database, mostly for tests and dry runs
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema with tables and indexes
    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS athletes (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                max_heart_rate INTEGER,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS workouts (
                id TEXT PRIMARY KEY,
                athlete_id TEXT NOT NULL,
                date DATE NOT NULL,
                workout_type TEXT NOT NULL,
                distance_km TEXT,
                actual_time TEXT,
                rpe INTEGER,
                avg_heart_rate INTEGER,
                max_heart_rate INTEGER,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,

                FOREIGN KEY (athlete_id) REFERENCES athletes (id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS personal_bests (
                id TEXT PRIMARY KEY,
                athlete_id TEXT NOT NULL,
                distance TEXT NOT NULL,
                time TEXT NOT NULL,
                achieved_date DATE NOT NULL,

                FOREIGN KEY (athlete_id) REFERENCES athletes (id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_workouts_athlete_date ON workouts (athlete_id, date);
            CREATE INDEX IF NOT EXISTS idx_personal_bests_athlete_date ON personal_bests (athlete_id, achieved_date);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_personal_bests_record
                ON personal_bests (athlete_id, distance, achieved_date);
            "#,
        )?;

        Ok(())
    }

    /// Insert or update an athlete profile
    pub fn upsert_athlete(&self, athlete: &AthleteProfile) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO athletes (id, name, max_heart_rate) VALUES (?1, ?2, ?3)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                max_heart_rate = excluded.max_heart_rate,
                updated_at = CURRENT_TIMESTAMP
            "#,
            params![athlete.id, athlete.name, athlete.max_heart_rate],
        )?;
        Ok(())
    }

    /// Load an athlete profile by ID
    pub fn load_athlete(&self, athlete_id: &str) -> Result<Option<AthleteProfile>, StoreError> {
        let athlete = self
            .conn
            .query_row(
                "SELECT id, name, max_heart_rate FROM athletes WHERE id = ?1",
                params![athlete_id],
                |row| {
                    Ok(AthleteProfile {
                        id: row.get("id")?,
                        name: row.get("name")?,
                        max_heart_rate: row.get("max_heart_rate")?,
                    })
                },
            )
            .optional()?;

        Ok(athlete)
    }

    /// Store (or replace) a workout for an athlete
    pub fn store_workout(&self, athlete_id: &str, workout: &WorkoutRecord) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO workouts (
                id, athlete_id, date, workout_type, distance_km, actual_time,
                rpe, avg_heart_rate, max_heart_rate
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                workout.id,
                athlete_id,
                workout.date.format(DATE_FORMAT).to_string(),
                workout.workout_kind.as_str(),
                workout.distance_km.map(|d| d.to_string()),
                workout.actual_time,
                workout.perceived_effort,
                workout.avg_heart_rate,
                workout.max_heart_rate,
            ],
        )?;
        Ok(())
    }

    /// Record a personal best, returning its ID
    ///
    /// A record is keyed by athlete, distance and date; storing it again
    /// updates the time and keeps the original ID.
    pub fn store_personal_best(
        &self,
        athlete_id: &str,
        personal_best: &PersonalBest,
    ) -> Result<String, StoreError> {
        let id = self.conn.query_row(
            r#"
            INSERT INTO personal_bests (id, athlete_id, distance, time, achieved_date)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (athlete_id, distance, achieved_date) DO UPDATE SET
                time = excluded.time
            RETURNING id
            "#,
            params![
                Uuid::new_v4().to_string(),
                athlete_id,
                personal_best.distance,
                personal_best.time,
                personal_best.achieved_date.format(DATE_FORMAT).to_string(),
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Load a whole training log in one transaction, returning the workout count
    pub fn import_log(&self, log: &TrainingLog) -> Result<usize, StoreError> {
        let tx = self.conn.unchecked_transaction()?;

        self.upsert_athlete(&log.athlete)?;
        for workout in &log.workouts {
            self.store_workout(&log.athlete.id, workout)?;
        }
        for personal_best in &log.personal_bests {
            self.store_personal_best(&log.athlete.id, personal_best)?;
        }

        tx.commit()?;
        tracing::info!(
            athlete = %log.athlete.id,
            workouts = log.workouts.len(),
            personal_bests = log.personal_bests.len(),
            "Imported training log"
        );
        Ok(log.workouts.len())
    }

    fn parse_date(field: &str, value: String) -> Result<NaiveDate, StoreError> {
        NaiveDate::parse_from_str(&value, DATE_FORMAT)
            .map_err(|_| StoreError::InvalidValue {
                field: field.to_string(),
                value,
            })
    }
}

/// Workout columns as read from SQLite, before validation
struct WorkoutRow {
    id: String,
    date: String,
    workout_type: String,
    distance_km: Option<String>,
    actual_time: Option<String>,
    rpe: Option<u8>,
    avg_heart_rate: Option<u16>,
    max_heart_rate: Option<u16>,
}

impl WorkoutRow {
    fn into_record(self) -> Result<WorkoutRecord, StoreError> {
        let distance_km = self
            .distance_km
            .map(|d| {
                d.parse::<Decimal>().map_err(|_| StoreError::InvalidValue {
                    field: "workouts.distance_km".to_string(),
                    value: d,
                })
            })
            .transpose()?;

        Ok(WorkoutRecord {
            id: self.id,
            date: Database::parse_date("workouts.date", self.date)?,
            distance_km,
            actual_time: self.actual_time,
            perceived_effort: self.rpe,
            workout_kind: WorkoutKind::from(self.workout_type.as_str()),
            avg_heart_rate: self.avg_heart_rate,
            max_heart_rate: self.max_heart_rate,
        })
    }
}

impl TrainingStore for Database {
    #[tracing::instrument(skip(self))]
    fn fetch_workouts(&self, user_id: &str, range: DateRange) -> Result<Vec<WorkoutRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, date, workout_type, distance_km, actual_time, rpe, avg_heart_rate, max_heart_rate
            FROM workouts
            WHERE athlete_id = ?1 AND date BETWEEN ?2 AND ?3
            ORDER BY date ASC, created_at ASC
            "#,
        )?;

        let rows = stmt.query_map(
            params![
                user_id,
                range.start.format(DATE_FORMAT).to_string(),
                range.end.format(DATE_FORMAT).to_string(),
            ],
            |row| {
                Ok(WorkoutRow {
                    id: row.get("id")?,
                    date: row.get("date")?,
                    workout_type: row.get("workout_type")?,
                    distance_km: row.get("distance_km")?,
                    actual_time: row.get("actual_time")?,
                    rpe: row.get("rpe")?,
                    avg_heart_rate: row.get("avg_heart_rate")?,
                    max_heart_rate: row.get("max_heart_rate")?,
                })
            },
        )?;

        let workouts = rows
            .map(|row| row.map_err(StoreError::from).and_then(WorkoutRow::into_record))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(count = workouts.len(), "Fetched workouts");
        Ok(workouts)
    }

    fn fetch_user_max_heart_rate(&self, user_id: &str) -> Result<Option<u16>, StoreError> {
        let max_hr: Option<Option<u16>> = self
            .conn
            .query_row(
                "SELECT max_heart_rate FROM athletes WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(max_hr.flatten())
    }

    #[tracing::instrument(skip(self))]
    fn fetch_recent_personal_bests(
        &self,
        user_id: &str,
        range: DateRange,
    ) -> Result<Vec<PersonalBest>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT distance, time, achieved_date
            FROM personal_bests
            WHERE athlete_id = ?1 AND achieved_date BETWEEN ?2 AND ?3
            ORDER BY achieved_date DESC
            "#,
        )?;

        let rows = stmt.query_map(
            params![
                user_id,
                range.start.format(DATE_FORMAT).to_string(),
                range.end.format(DATE_FORMAT).to_string(),
            ],
            |row| {
                Ok((
                    row.get::<_, String>("distance")?,
                    row.get::<_, String>("time")?,
                    row.get::<_, String>("achieved_date")?,
                ))
            },
        )?;

        rows.map(|row| -> Result<PersonalBest, StoreError> {
            let (distance, time, achieved_date) = row?;
            Ok(PersonalBest {
                distance,
                time,
                achieved_date: Self::parse_date("personal_bests.achieved_date", achieved_date)?,
            })
        })
        .collect()
    }
}
