use chrono::{Datelike, Local, NaiveDateTime};

/// Current local wall-clock time, offset dropped to match parsed tracker dates.
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Count weekdays (Mon-Fri) after `start`'s date up to and including `end`'s date.
///
/// Time of day is ignored. Returns 0 when `end` is before `start`.
pub fn business_days_between(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    if end < start {
        return 0;
    }

    let span = (end.date() - start.date()).num_days();
    let full_weeks = span / 7;
    let remainder = span % 7;

    // Whole weeks always contribute five weekdays; only the tail needs checking.
    let start_weekday = i64::from(start.weekday().num_days_from_monday());
    let tail = (1..=remainder)
        .filter(|offset| (start_weekday + offset) % 7 < 5)
        .count() as i64;

    full_weeks * 5 + tail
}

pub fn business_days_elapsed(start: NaiveDateTime) -> i64 {
    business_days_between(start, now())
}

/// Plain calendar-date difference, never negative.
pub fn calendar_days_between(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    (end.date() - start.date()).num_days().max(0)
}

/// Render `end - start` as `"{d}d {h}h {m}m"`, floored to whole minutes.
pub fn format_elapsed(start: NaiveDateTime, end: NaiveDateTime) -> String {
    let delta = end.signed_duration_since(start);
    if delta.num_seconds() < 0 {
        return "0d 0h 0m".to_string();
    }

    let total_minutes = delta.num_minutes();
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes % (24 * 60)) / 60;
    let minutes = total_minutes % 60;
    format!("{}d {}h {}m", days, hours, minutes)
}
