//! Weekly availability schedules (days, slots) and slot occupancy rules

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// `"HH:MM"` serialization for slot times, matching the stored document format
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_time(&s).map_err(serde::de::Error::custom)
    }
}

/// Parse a wall-clock time in `HH:MM` (or `HH:MM:SS`) form
pub fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| format!("Invalid time '{}', expected HH:MM", s))
}

// ---------------------------------------------------------------------------
// Weekday
// ---------------------------------------------------------------------------

/// Day-of-week key used in availability documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }

    /// Weekday key for a calendar date
    pub fn from_date(date: NaiveDate) -> Self {
        match date.weekday() {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// A bookable time interval within a day's schedule
///
/// `booking` is only ever populated on sport-field slots; service slots
/// carry occupancy alone.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub is_booked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking: Option<Uuid>,
}

impl Slot {
    /// Overlap against `[start, end)`:
    /// slot start inside the range, slot end inside `(start, end]`, or the
    /// slot spanning the whole range.
    fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        (self.start_time >= start && self.start_time < end)
            || (self.end_time > start && self.end_time <= end)
            || (self.start_time <= start && self.end_time >= end)
    }
}

// ---------------------------------------------------------------------------
// DayAvailability
// ---------------------------------------------------------------------------

/// One weekday's configured slot sequence
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DayAvailability {
    pub day: Weekday,
    pub slots: Vec<Slot>,
}

impl DayAvailability {
    /// Service semantics: a slot with this exact start time exists and is free
    pub fn slot_free(&self, start: NaiveTime) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.start_time == start && !slot.is_booked)
    }

    /// Field semantics: no booked slot overlaps `[start, end)`
    pub fn range_free(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.slots
            .iter()
            .all(|slot| !(slot.overlaps(start, end) && slot.is_booked))
    }

    /// Mark the slot with this exact start time as booked.
    ///
    /// Returns `false` when no such slot exists or it is already booked, so
    /// a lost race surfaces instead of silently overwriting occupancy.
    pub fn book_slot(&mut self, start: NaiveTime) -> bool {
        match self
            .slots
            .iter_mut()
            .find(|slot| slot.start_time == start)
        {
            Some(slot) if !slot.is_booked => {
                slot.is_booked = true;
                true
            }
            _ => false,
        }
    }

    /// Mark every slot overlapping `[start, end)` as booked by `booking_id`.
    ///
    /// Refuses (returns `false`, touching nothing) when the range is not
    /// free or no slot overlaps it.
    pub fn book_range(&mut self, start: NaiveTime, end: NaiveTime, booking_id: Uuid) -> bool {
        if !self.range_free(start, end) {
            return false;
        }

        let mut booked = 0;
        for slot in self.slots.iter_mut().filter(|s| s.overlaps(start, end)) {
            slot.is_booked = true;
            slot.booking = Some(booking_id);
            booked += 1;
        }
        booked > 0
    }

    /// Release the slot with this exact start time
    pub fn release_slot(&mut self, start: NaiveTime) -> bool {
        match self
            .slots
            .iter_mut()
            .find(|slot| slot.start_time == start)
        {
            Some(slot) => {
                slot.is_booked = false;
                slot.booking = None;
                true
            }
            None => false,
        }
    }

    /// Release every slot overlapping `[start, end)`, clearing booking refs
    pub fn release_range(&mut self, start: NaiveTime, end: NaiveTime) -> usize {
        let mut released = 0;
        for slot in self.slots.iter_mut().filter(|s| s.overlaps(start, end)) {
            slot.is_booked = false;
            slot.booking = None;
            released += 1;
        }
        released
    }
}

/// Find a weekday's configured availability within a resource's schedule
pub fn day_for(week: &[DayAvailability], day: Weekday) -> Option<&DayAvailability> {
    week.iter().find(|d| d.day == day)
}

/// Mutable counterpart of [`day_for`]
pub fn day_for_mut(week: &mut [DayAvailability], day: Weekday) -> Option<&mut DayAvailability> {
    week.iter_mut().find(|d| d.day == day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        parse_time(s).unwrap()
    }

    fn slot(start: &str, end: &str, booked: bool) -> Slot {
        Slot {
            start_time: t(start),
            end_time: t(end),
            is_booked: booked,
            booking: None,
        }
    }

    fn field_day() -> DayAvailability {
        DayAvailability {
            day: Weekday::Monday,
            slots: vec![
                slot("09:00", "10:00", false),
                slot("10:00", "11:00", true),
                slot("11:00", "12:00", false),
            ],
        }
    }

    #[test]
    fn weekday_from_date() {
        // 2025-06-02 is a Monday
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        assert_eq!(Weekday::from_date(date), Weekday::Monday);
        assert_eq!(Weekday::from_date(date.succ_opt().unwrap()), Weekday::Tuesday);
    }

    #[test]
    fn range_overlapping_a_booked_slot_is_not_free() {
        let day = field_day();
        assert!(!day.range_free(t("10:30"), t("11:30")));
    }

    #[test]
    fn range_adjacent_to_a_booked_slot_is_free() {
        let day = field_day();
        assert!(day.range_free(t("11:00"), t("12:00")));
    }

    #[test]
    fn range_spanning_a_booked_slot_is_not_free() {
        let day = field_day();
        assert!(!day.range_free(t("09:30"), t("11:30")));
    }

    #[test]
    fn slot_free_requires_exact_start_match() {
        let day = field_day();
        assert!(day.slot_free(t("09:00")));
        // A time inside a free slot does not match; point semantics only
        assert!(!day.slot_free(t("09:30")));
        assert!(!day.slot_free(t("10:00")));
    }

    #[test]
    fn book_slot_rejects_double_commit() {
        let mut day = field_day();
        assert!(day.book_slot(t("09:00")));
        assert!(!day.book_slot(t("09:00")));
        assert!(!day.slot_free(t("09:00")));
    }

    #[test]
    fn book_range_marks_all_overlapping_slots() {
        let mut day = DayAvailability {
            day: Weekday::Monday,
            slots: vec![
                slot("09:00", "10:00", false),
                slot("10:00", "11:00", false),
                slot("11:00", "12:00", false),
            ],
        };
        let id = Uuid::new_v4();
        assert!(day.book_range(t("09:00"), t("11:00"), id));
        assert!(day.slots[0].is_booked);
        assert!(day.slots[1].is_booked);
        assert!(!day.slots[2].is_booked);
        assert_eq!(day.slots[0].booking, Some(id));
        assert_eq!(day.slots[1].booking, Some(id));
        assert_eq!(day.slots[2].booking, None);
    }

    #[test]
    fn book_range_rejects_occupied_range_without_mutating() {
        let mut day = field_day();
        let before: Vec<bool> = day.slots.iter().map(|s| s.is_booked).collect();
        assert!(!day.book_range(t("09:30"), t("10:30"), Uuid::new_v4()));
        let after: Vec<bool> = day.slots.iter().map(|s| s.is_booked).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn release_range_clears_occupancy_and_booking_refs() {
        let mut day = DayAvailability {
            day: Weekday::Monday,
            slots: vec![slot("10:00", "11:00", false), slot("11:00", "12:00", false)],
        };
        let id = Uuid::new_v4();
        assert!(day.book_range(t("10:00"), t("12:00"), id));
        assert_eq!(day.release_range(t("10:00"), t("12:00")), 2);
        assert!(day.range_free(t("10:00"), t("12:00")));
        assert!(day.slots.iter().all(|s| s.booking.is_none()));
    }

    #[test]
    fn release_then_rebook_succeeds() {
        let mut day = field_day();
        assert!(day.book_slot(t("09:00")));
        assert!(day.release_slot(t("09:00")));
        assert!(day.slot_free(t("09:00")));
        assert!(day.book_slot(t("09:00")));
    }

    #[test]
    fn day_lookup_by_weekday() {
        let week = vec![field_day()];
        assert!(day_for(&week, Weekday::Monday).is_some());
        assert!(day_for(&week, Weekday::Tuesday).is_none());
    }

    #[test]
    fn slot_times_serialize_as_hhmm() {
        let s = slot("09:00", "10:00", false);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["startTime"], "09:00");
        assert_eq!(json["endTime"], "10:00");
        assert_eq!(json["isBooked"], false);

        let parsed: Slot = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.start_time, t("09:00"));
    }
}
