//! Conversational appointment-booking backend for a clinic kiosk.
//!
//! Proxies kiosk utterances to a generative-text service, decodes the
//! model's JSON decision into a turn command, and persists confirmed
//! bookings in `SQLite`.

// Strict discipline: no unsafe, everything public documented, no
// unwrap/expect outside tests.
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Appointment records and persistence.
pub mod appointments;
/// Conversation state, instructions, and the turn processor.
pub mod chat;
/// Environment-driven configuration.
pub mod config;
/// Reasoning-service clients.
pub mod llm;
/// HTTP server and API routes.
pub mod server;
/// Bookable display time slots.
pub mod slots;
/// Entry helpers to start the desk agent.
pub mod start_desk_agent;
