//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::appointments::store::AppointmentStore;
use crate::chat::turn::TurnProcessor;

/// Shared application state.
pub struct AppState {
    /// Conversational turn processor.
    pub turns: TurnProcessor,
    /// Appointment persistence, shared with the turn processor.
    pub store: Arc<dyn AppointmentStore>,
}

impl AppState {
    /// Assemble state from its parts.
    #[must_use]
    pub fn new(turns: TurnProcessor, store: Arc<dyn AppointmentStore>) -> Arc<Self> {
        Arc::new(Self { turns, store })
    }
}
