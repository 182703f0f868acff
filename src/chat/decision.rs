//! Decoding of raw model output into a turn decision.
//!
//! The reasoning service is asked for JSON but not trusted to produce it.
//! Decoding degrades in tiers and never fails: the worst malformed output
//! becomes a plain-text reply with no side effect.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Conversation-ending sentinel the model places in `query`.
const END_SENTINEL: &str = "END";

/// Booking fields carried by a confirmed booking query.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct BookingFields {
    /// Patient name.
    pub name: String,
    /// Patient contact number.
    pub contact: String,
    /// Doctor label, e.g. `"surgeon"`.
    pub doctor: String,
    /// Date in `YYYY-MM-DD` form.
    pub date: String,
    /// Display time, e.g. `"4:00 PM"`.
    pub time: String,
}

/// Side effect a decision asks for.
///
/// The raw `query` field mixes a string sentinel and an object payload; it is
/// decoded exactly once into this union and never re-inspected downstream.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TurnCommand {
    /// Keep the conversation going.
    Continue,
    /// Reset the conversation to its seed.
    EndConversation,
    /// Persist a confirmed booking.
    Book(BookingFields),
}

impl TurnCommand {
    /// Decode the untrusted `query` value into a command.
    ///
    /// Non-null shapes matching neither branch are ignored with a warning;
    /// they must not fail the turn.
    #[must_use]
    pub fn from_query(query: &Value) -> Self {
        match query {
            Value::Null => Self::Continue,
            Value::String(s) if s == END_SENTINEL => Self::EndConversation,
            Value::Object(_) => match BookingFields::deserialize(query.clone()) {
                Ok(fields) => Self::Book(fields),
                Err(err) => {
                    warn!("booking query is missing fields, ignoring: {err}");
                    Self::Continue
                }
            },
            other => {
                warn!("unrecognized query shape, ignoring: {other}");
                Self::Continue
            }
        }
    }
}

/// Decision derived from one model reply.
#[derive(Clone, Debug)]
pub struct TurnDecision {
    /// Text shown or spoken to the user.
    pub reply: String,
    /// Raw `query` value, echoed verbatim to the caller.
    pub query: Value,
    /// Decoded side effect.
    pub command: TurnCommand,
}

#[derive(Deserialize)]
struct RawDecision {
    reply: String,
    #[serde(default)]
    query: Value,
}

impl TurnDecision {
    /// Decode raw model text.
    ///
    /// Tries the whole text as JSON, then the span from the first `{` to the
    /// last `}` when the model wrapped its JSON in prose, then falls back to
    /// treating the entire text as a plain reply with no query.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let decoded = serde_json::from_str::<RawDecision>(raw).ok().or_else(|| {
            embedded_object(raw).and_then(|span| serde_json::from_str(span).ok())
        });

        let Some(RawDecision { reply, query }) = decoded else {
            return Self {
                reply: raw.to_string(),
                query: Value::Null,
                command: TurnCommand::Continue,
            };
        };

        let command = TurnCommand::from_query(&query);
        Self {
            reply,
            query,
            command,
        }
    }
}

/// Span from the first `{` to the last `}`, if any.
fn embedded_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}
