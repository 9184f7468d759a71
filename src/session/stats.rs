//! Pure aggregation over the session history, feeding the analytics views.
//! Output ordering is deterministic so the same history always renders the
//! same dashboard.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};

use super::SessionRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatBucket {
    pub label: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayTotal {
    pub date: NaiveDate,
    pub label: String,
    pub minutes: u64,
}

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}

fn weekday_abbrev(day: Weekday) -> &'static str {
    &weekday_name(day)[..3]
}

fn buckets_from(map: BTreeMap<String, u64>) -> Vec<StatBucket> {
    map.into_iter()
        .map(|(label, value)| StatBucket { label, value })
        .collect()
}

/// Total focused minutes per category, alphabetical.
pub fn minutes_by_category(sessions: &[SessionRecord]) -> Vec<StatBucket> {
    let mut totals = BTreeMap::new();
    for session in sessions {
        *totals.entry(session.category.clone()).or_insert(0) +=
            u64::from(session.duration_minutes);
    }
    buckets_from(totals)
}

/// Number of sessions per category, alphabetical.
pub fn sessions_by_category(sessions: &[SessionRecord]) -> Vec<StatBucket> {
    let mut counts = BTreeMap::new();
    for session in sessions {
        *counts.entry(session.category.clone()).or_insert(0) += 1;
    }
    buckets_from(counts)
}

/// Total focused minutes per weekday, Sunday first, skipping empty days.
pub fn minutes_by_weekday(sessions: &[SessionRecord]) -> Vec<StatBucket> {
    let mut totals: BTreeMap<usize, u64> = BTreeMap::new();
    for session in sessions {
        let index = session.start_time.weekday().num_days_from_sunday() as usize;
        *totals.entry(index).or_insert(0) += u64::from(session.duration_minutes);
    }
    totals
        .into_iter()
        .map(|(index, value)| StatBucket {
            label: weekday_name(WEEKDAYS[index]).to_owned(),
            value,
        })
        .collect()
}

/// Minutes grouped by session length: short (<30), medium (30-60), long (>60).
pub fn minutes_by_length(sessions: &[SessionRecord]) -> Vec<StatBucket> {
    let bins = ["Short (<30)", "Medium (30-60)", "Long (>60)"];
    let mut totals = [0u64; 3];
    for session in sessions {
        let bin = if session.duration_minutes < 30 {
            0
        } else if session.duration_minutes < 60 {
            1
        } else {
            2
        };
        totals[bin] += u64::from(session.duration_minutes);
    }
    bins.iter()
        .zip(totals)
        .filter(|(_, total)| *total > 0)
        .map(|(label, value)| StatBucket {
            label: (*label).to_owned(),
            value,
        })
        .collect()
}

/// Daily totals for the seven days ending at `now`, oldest first, zero-filled.
pub fn last_seven_days(sessions: &[SessionRecord], now: DateTime<Utc>) -> Vec<DayTotal> {
    let today = now.date_naive();
    (0..7)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let minutes = sessions
                .iter()
                .filter(|session| session.start_time.date_naive() == date)
                .map(|session| u64::from(session.duration_minutes))
                .sum();
            DayTotal {
                date,
                label: weekday_abbrev(date.weekday()).to_owned(),
                minutes,
            }
        })
        .collect()
}
