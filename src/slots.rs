//! Bookable time-of-day slots shown by the kiosk's booking form.

use serde::Serialize;

/// First bookable hour (24-hour clock).
const OPENING_HOUR: u32 = 9;
/// Last bookable hour; the top of this hour is still included.
const CLOSING_HOUR: u32 = 17;

/// A slot start time rendered in both clock formats.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TimeSlot {
    /// 24-hour form, e.g. `"09:30"`.
    pub time24: String,
    /// 12-hour form, e.g. `"9:30 AM"`.
    pub time12: String,
}

/// Half-hour slot start times from opening until the top of the closing hour.
///
/// Pure and deterministic; the booking policy itself lives in the
/// conversation instructions, not here.
#[must_use]
pub fn business_hour_slots() -> Vec<TimeSlot> {
    let mut slots = Vec::new();
    for hour in OPENING_HOUR..=CLOSING_HOUR {
        for minute in [0_u32, 30] {
            if hour == CLOSING_HOUR && minute == 30 {
                continue;
            }
            let hour12 = if hour % 12 == 0 { 12 } else { hour % 12 };
            let meridiem = if hour < 12 { "AM" } else { "PM" };
            slots.push(TimeSlot {
                time24: format!("{hour:02}:{minute:02}"),
                time12: format!("{hour12}:{minute:02} {meridiem}"),
            });
        }
    }
    slots
}
