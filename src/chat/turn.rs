//! The conversational turn processor.
//!
//! One turn: ground the utterance with the currently booked slots, ask the
//! reasoning service, decode its decision, apply at most one side effect,
//! and record the exchange in the session's history.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::appointments::record::NewAppointment;
use crate::appointments::store::{AppointmentStore, StoreError};
use crate::chat::decision::{BookingFields, TurnCommand, TurnDecision};
use crate::chat::history::{ChatTurn, SessionRegistry, seed_history};
use crate::llm::gemini::{ChatModel, ModelError};

/// Errors that fail a turn outright.
///
/// Booking-insert failures are deliberately absent: they are logged and
/// swallowed, and the turn still returns the prepared reply.
#[derive(Debug, Error)]
pub enum TurnError {
    /// The reasoning-service call failed.
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    /// Reading booked appointments failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience result alias for turn processing.
pub type TurnResult<T> = Result<T, TurnError>;

/// Processes user utterances against per-session conversation state.
pub struct TurnProcessor {
    model: Arc<dyn ChatModel>,
    store: Arc<dyn AppointmentStore>,
    sessions: SessionRegistry,
}

impl TurnProcessor {
    /// Create a processor over the given model and store.
    #[must_use]
    pub fn new(model: Arc<dyn ChatModel>, store: Arc<dyn AppointmentStore>) -> Self {
        Self {
            model,
            store,
            sessions: SessionRegistry::new(),
        }
    }

    /// Run one turn for the given session.
    ///
    /// The session is locked for the whole turn, so concurrent turns against
    /// the same session are serialized. The utterance sent to the model and
    /// the utterance recorded in history are the same augmented text.
    ///
    /// # Errors
    /// Returns an error if the reasoning service or the appointment read
    /// fails.
    pub async fn process(&self, session_id: &str, utterance: &str) -> TurnResult<TurnDecision> {
        let session = self.sessions.session(session_id);
        let mut history = session.lock().await;

        let booked = self.booked_slots().await?;
        let augmented = format!(
            "{utterance} The doctor is already booked on the following dates and times: {}.",
            booked.join(",")
        );

        let raw = self.model.send(history.clone(), augmented.clone()).await?;
        let decision = TurnDecision::parse(&raw);

        if let TurnCommand::Book(fields) = &decision.command {
            self.book(fields).await;
        }

        if decision.command == TurnCommand::EndConversation {
            info!(session_id, "conversation ended, resetting history");
            *history = seed_history();
        } else {
            history.push(ChatTurn::user(augmented));
            history.push(ChatTurn::model(decision.reply.clone()));
        }

        Ok(decision)
    }

    /// Snapshot of a session's history, for diagnostics.
    #[must_use]
    pub async fn history_snapshot(&self, session_id: &str) -> Vec<ChatTurn> {
        self.sessions.session(session_id).lock().await.clone()
    }

    async fn booked_slots(&self) -> TurnResult<Vec<String>> {
        let appointments = self.store.list().await?;
        Ok(appointments
            .iter()
            .map(|a| format!("{} {}", date_portion(&a.date), a.time))
            .collect())
    }

    async fn book(&self, fields: &BookingFields) {
        let fields = NewAppointment {
            name: fields.name.clone(),
            contact: fields.contact.clone(),
            doctor: fields.doctor.clone(),
            date: fields.date.clone(),
            time: fields.time.clone(),
        };

        match self.store.create_if_slot_free(fields).await {
            Ok(appointment) => info!(id = %appointment.id, "appointment created"),
            Err(err) => warn!("error saving appointment: {err}"),
        }
    }
}

/// Date text before any `T` separator, as stored.
fn date_portion(date: &str) -> &str {
    date.split('T').next().unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use tokio_rusqlite::Connection;

    use crate::appointments::record::{Appointment, AppointmentId, AppointmentPatch};
    use crate::appointments::store::{SqliteAppointmentStore, StoreFuture, StoreResult};
    use crate::chat::history::DEFAULT_SESSION;

    use super::*;

    /// Model stub returning a fixed raw reply.
    struct ScriptedModel {
        raw: String,
    }

    impl ScriptedModel {
        fn new(raw: &str) -> Self {
            Self {
                raw: raw.to_string(),
            }
        }
    }

    impl ChatModel for ScriptedModel {
        fn send(
            &self,
            _history: Vec<ChatTurn>,
            _utterance: String,
        ) -> crate::llm::gemini::ModelFuture<'_, crate::llm::gemini::ModelResult<String>> {
            Box::pin(async move { Ok(self.raw.clone()) })
        }
    }

    /// Store stub whose inserts always fail.
    struct FailingStore;

    impl AppointmentStore for FailingStore {
        fn create(&self, _fields: NewAppointment) -> StoreFuture<'_, StoreResult<Appointment>> {
            Box::pin(async { Err(StoreError::NotFound) })
        }

        fn create_if_slot_free(
            &self,
            fields: NewAppointment,
        ) -> StoreFuture<'_, StoreResult<Appointment>> {
            Box::pin(async move { Err(StoreError::SlotTaken(fields.slot_label())) })
        }

        fn list(&self) -> StoreFuture<'_, StoreResult<Vec<Appointment>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn get(&self, _id: AppointmentId) -> StoreFuture<'_, StoreResult<Appointment>> {
            Box::pin(async { Err(StoreError::NotFound) })
        }

        fn update(
            &self,
            _id: AppointmentId,
            _patch: AppointmentPatch,
        ) -> StoreFuture<'_, StoreResult<Appointment>> {
            Box::pin(async { Err(StoreError::NotFound) })
        }

        fn delete(&self, _id: AppointmentId) -> StoreFuture<'_, StoreResult<()>> {
            Box::pin(async { Err(StoreError::NotFound) })
        }
    }

    async fn memory_store() -> Arc<SqliteAppointmentStore> {
        let conn = Connection::open_in_memory().await.unwrap();
        Arc::new(SqliteAppointmentStore::new(conn).await.unwrap())
    }

    fn processor(raw: &str, store: Arc<dyn AppointmentStore>) -> TurnProcessor {
        TurnProcessor::new(Arc::new(ScriptedModel::new(raw)), store)
    }

    #[tokio::test]
    async fn test_wellformed_reply_passes_through_without_booking() {
        let store = memory_store().await;
        let turns = processor(
            r#"{"reply":"What is your name?","query":null}"#,
            store.clone(),
        );

        let decision = turns
            .process(DEFAULT_SESSION, "I want to book an appointment")
            .await
            .unwrap();

        assert_eq!(decision.reply, "What is your name?");
        assert_eq!(decision.query, serde_json::Value::Null);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_booking_query_creates_one_verbatim_record() {
        let store = memory_store().await;
        let raw = r#"{"reply":"Booked!","query":{"name":"Jane Doe","contact":"9876543210","doctor":"surgeon","date":"2025-06-10","time":"4:00 PM"}}"#;
        let turns = processor(raw, store.clone());

        let decision = turns.process(DEFAULT_SESSION, "yes, confirm").await.unwrap();
        assert_eq!(decision.reply, "Booked!");

        let appointments = store.list().await.unwrap();
        assert_eq!(appointments.len(), 1);
        assert_eq!(appointments[0].name, "Jane Doe");
        assert_eq!(appointments[0].contact, "9876543210");
        assert_eq!(appointments[0].doctor, "surgeon");
        assert_eq!(appointments[0].date, "2025-06-10");
        assert_eq!(appointments[0].time, "4:00 PM");
    }

    #[tokio::test]
    async fn test_booking_insert_failure_does_not_fail_the_turn() {
        let raw = r#"{"reply":"Booked!","query":{"name":"Jane Doe","contact":"9876543210","doctor":"surgeon","date":"2025-06-10","time":"4:00 PM"}}"#;
        let turns = processor(raw, Arc::new(FailingStore));

        let decision = turns.process(DEFAULT_SESSION, "yes, confirm").await.unwrap();
        assert_eq!(decision.reply, "Booked!");
    }

    #[tokio::test]
    async fn test_end_resets_history_to_seed() {
        let store = memory_store().await;
        let turns = processor(r#"{"reply":"Goodbye!","query":"END"}"#, store.clone());

        let decision = turns.process(DEFAULT_SESSION, "yes, end it").await.unwrap();
        assert_eq!(decision.reply, "Goodbye!");
        assert_eq!(turns.history_snapshot(DEFAULT_SESSION).await, seed_history());

        // Resetting twice in a row yields the same template both times.
        turns.process(DEFAULT_SESSION, "end again").await.unwrap();
        assert_eq!(turns.history_snapshot(DEFAULT_SESSION).await, seed_history());
    }

    #[tokio::test]
    async fn test_normal_turn_records_augmented_utterance() {
        let store = memory_store().await;
        store
            .create(NewAppointment {
                name: "Prior".to_string(),
                contact: "9876543210".to_string(),
                doctor: "surgeon".to_string(),
                date: "2025-06-09".to_string(),
                time: "4:00 PM".to_string(),
            })
            .await
            .unwrap();

        let turns = processor(r#"{"reply":"What day?","query":null}"#, store.clone());
        turns.process(DEFAULT_SESSION, "book me in").await.unwrap();

        let history = turns.history_snapshot(DEFAULT_SESSION).await;
        assert_eq!(history.len(), 4);
        let user_entry = &history[2];
        assert!(user_entry.text.starts_with("book me in"));
        assert!(user_entry.text.contains("already booked"));
        assert!(user_entry.text.contains("2025-06-09 4:00 PM"));
        assert_eq!(history[3].text, "What day?");
    }

    #[tokio::test]
    async fn test_plain_text_reply_degrades_gracefully() {
        let store = memory_store().await;
        let turns = processor("Please visit a hospital for that.", store.clone());

        let decision = turns.process(DEFAULT_SESSION, "my knee hurts").await.unwrap();
        assert_eq!(decision.reply, "Please visit a hospital for that.");
        assert_eq!(decision.query, serde_json::Value::Null);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_history() {
        let store = memory_store().await;
        let turns = processor(r#"{"reply":"What day?","query":null}"#, store);

        turns.process("booth-a", "book me in").await.unwrap();

        assert_eq!(turns.history_snapshot("booth-a").await.len(), 4);
        assert_eq!(turns.history_snapshot("booth-b").await, seed_history());
    }

    #[test]
    fn test_date_portion_strips_time_suffix() {
        assert_eq!(date_portion("2025-06-10T00:00:00.000Z"), "2025-06-10");
        assert_eq!(date_portion("2025-06-10"), "2025-06-10");
    }
}
