//! `SQLite`-backed appointment persistence.
//!
//! All operations run on the connection's single worker, so the
//! check-and-set in [`AppointmentStore::create_if_slot_free`] cannot race a
//! concurrent insert.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::OptionalExtension;
use thiserror::Error;
use tokio_rusqlite::Connection;

use super::record::{Appointment, AppointmentId, AppointmentPatch, NewAppointment};

/// Errors produced by the appointment store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// No appointment with the requested id.
    #[error("appointment not found")]
    NotFound,
    /// The requested slot already holds a booking.
    #[error("slot already booked: {0}")]
    SlotTaken(String),
    /// A stored timestamp could not be interpreted.
    #[error("invalid stored timestamp")]
    InvalidTimestamp,
}

/// Convenience result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Boxed future type for store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// CRUD surface over persisted appointments.
///
/// Uniqueness of `(doctor, date, time)` is only enforced by
/// [`Self::create_if_slot_free`]; the plain [`Self::create`] path accepts
/// conflicting bookings.
pub trait AppointmentStore: Send + Sync {
    /// Insert a new appointment unconditionally.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn create(&self, fields: NewAppointment) -> StoreFuture<'_, StoreResult<Appointment>>;

    /// Insert only when the `(doctor, date, time)` slot is still free.
    ///
    /// # Errors
    /// Returns [`StoreError::SlotTaken`] when the slot is occupied, or an
    /// error if storage access fails.
    fn create_if_slot_free(
        &self,
        fields: NewAppointment,
    ) -> StoreFuture<'_, StoreResult<Appointment>>;

    /// All appointments, newest-created first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn list(&self) -> StoreFuture<'_, StoreResult<Vec<Appointment>>>;

    /// Appointment by id.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the id is absent.
    fn get(&self, id: AppointmentId) -> StoreFuture<'_, StoreResult<Appointment>>;

    /// Merge the provided fields into an existing appointment.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the id is absent.
    fn update(
        &self,
        id: AppointmentId,
        patch: AppointmentPatch,
    ) -> StoreFuture<'_, StoreResult<Appointment>>;

    /// Remove an appointment.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the id is absent.
    fn delete(&self, id: AppointmentId) -> StoreFuture<'_, StoreResult<()>>;
}

/// Row tuple as read from the appointments table.
type AppointmentRow = (
    AppointmentId,
    String,
    String,
    String,
    String,
    String,
    i64,
    i64,
);

/// `SQLite` implementation of appointment storage.
pub struct SqliteAppointmentStore {
    conn: Connection,
}

impl SqliteAppointmentStore {
    /// Initialize the store over an open connection.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub async fn new(conn: Connection) -> StoreResult<Self> {
        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS appointments (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    contact TEXT NOT NULL,
                    doctor TEXT NOT NULL,
                    date TEXT NOT NULL,
                    time TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_appointments_created
                    ON appointments (created_at DESC);",
            )?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Open the database at a filesystem path and initialize the store.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub async fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path).await?;
        Self::new(conn).await
    }

    async fn insert(&self, fields: NewAppointment, exclusive_slot: bool) -> StoreResult<Appointment> {
        let id = AppointmentId::new();
        let now = Utc::now();
        let created_millis = now.timestamp_millis();
        let slot_label = fields.slot_label();
        let record = Appointment {
            id,
            name: fields.name.clone(),
            contact: fields.contact.clone(),
            doctor: fields.doctor.clone(),
            date: fields.date.clone(),
            time: fields.time.clone(),
            created_at: now,
            updated_at: now,
        };

        let inserted = self
            .conn
            .call(move |conn| {
                if exclusive_slot {
                    let taken: Option<i64> = conn
                        .query_row(
                            "SELECT 1 FROM appointments
                             WHERE doctor = ?1 AND date = ?2 AND time = ?3",
                            rusqlite::params![fields.doctor, fields.date, fields.time],
                            |row| row.get(0),
                        )
                        .optional()?;
                    if taken.is_some() {
                        return Ok(false);
                    }
                }

                conn.execute(
                    "INSERT INTO appointments
                     (id, name, contact, doctor, date, time, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    rusqlite::params![
                        id,
                        fields.name,
                        fields.contact,
                        fields.doctor,
                        fields.date,
                        fields.time,
                        created_millis,
                        created_millis
                    ],
                )?;
                Ok(true)
            })
            .await?;

        if !inserted {
            return Err(StoreError::SlotTaken(slot_label));
        }

        Ok(record)
    }
}

impl AppointmentStore for SqliteAppointmentStore {
    fn create(&self, fields: NewAppointment) -> StoreFuture<'_, StoreResult<Appointment>> {
        Box::pin(async move { self.insert(fields, false).await })
    }

    fn create_if_slot_free(
        &self,
        fields: NewAppointment,
    ) -> StoreFuture<'_, StoreResult<Appointment>> {
        Box::pin(async move { self.insert(fields, true).await })
    }

    fn list(&self) -> StoreFuture<'_, StoreResult<Vec<Appointment>>> {
        Box::pin(async move {
            let rows = self
                .conn
                .call(|conn| {
                    let mut stmt = conn.prepare(
                        "SELECT id, name, contact, doctor, date, time, created_at, updated_at
                         FROM appointments
                         ORDER BY created_at DESC, rowid DESC",
                    )?;
                    let rows = stmt
                        .query_map([], read_row)?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;

            rows.into_iter().map(row_to_appointment).collect()
        })
    }

    fn get(&self, id: AppointmentId) -> StoreFuture<'_, StoreResult<Appointment>> {
        Box::pin(async move {
            let row = self
                .conn
                .call(move |conn| {
                    let row = conn
                        .query_row(
                            "SELECT id, name, contact, doctor, date, time, created_at, updated_at
                             FROM appointments
                             WHERE id = ?1",
                            rusqlite::params![id],
                            read_row,
                        )
                        .optional()?;
                    Ok(row)
                })
                .await?;

            row.map(row_to_appointment)
                .transpose()?
                .ok_or(StoreError::NotFound)
        })
    }

    fn update(
        &self,
        id: AppointmentId,
        patch: AppointmentPatch,
    ) -> StoreFuture<'_, StoreResult<Appointment>> {
        Box::pin(async move {
            let updated_millis = Utc::now().timestamp_millis();
            let row = self
                .conn
                .call(move |conn| {
                    let existing = conn
                        .query_row(
                            "SELECT id, name, contact, doctor, date, time, created_at, updated_at
                             FROM appointments
                             WHERE id = ?1",
                            rusqlite::params![id],
                            read_row,
                        )
                        .optional()?;

                    let Some((id, name, contact, doctor, date, time, created, _)) = existing
                    else {
                        return Ok(None);
                    };

                    let name = patch.name.unwrap_or(name);
                    let contact = patch.contact.unwrap_or(contact);
                    let doctor = patch.doctor.unwrap_or(doctor);
                    let date = patch.date.unwrap_or(date);
                    let time = patch.time.unwrap_or(time);

                    conn.execute(
                        "UPDATE appointments
                         SET name = ?2, contact = ?3, doctor = ?4, date = ?5, time = ?6,
                             updated_at = ?7
                         WHERE id = ?1",
                        rusqlite::params![id, name, contact, doctor, date, time, updated_millis],
                    )?;

                    Ok(Some((id, name, contact, doctor, date, time, created, updated_millis)))
                })
                .await?;

            row.map(row_to_appointment)
                .transpose()?
                .ok_or(StoreError::NotFound)
        })
    }

    fn delete(&self, id: AppointmentId) -> StoreFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let removed = self
                .conn
                .call(move |conn| {
                    let removed =
                        conn.execute("DELETE FROM appointments WHERE id = ?1", rusqlite::params![id])?;
                    Ok(removed)
                })
                .await?;

            if removed == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AppointmentRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn row_to_appointment(row: AppointmentRow) -> StoreResult<Appointment> {
    let (id, name, contact, doctor, date, time, created, updated) = row;
    Ok(Appointment {
        id,
        name,
        contact,
        doctor,
        date,
        time,
        created_at: millis_to_datetime(created)?,
        updated_at: millis_to_datetime(updated)?,
    })
}

fn millis_to_datetime(millis: i64) -> StoreResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or(StoreError::InvalidTimestamp)
}
