use crate::models::{HabitRecord, ProgressDay, Statistics};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeMap;

pub fn build_statistics(habits: &[HabitRecord]) -> Statistics {
    let total = habits.len();
    let completed = habits.iter().filter(|habit| habit.completed).count();
    let percent_complete = if total == 0 {
        0
    } else {
        (completed as f64 * 100.0 / total as f64).round() as u32
    };

    Statistics {
        total,
        completed,
        pending: total - completed,
        percent_complete,
    }
}

/// Habits split by whether they carry a target date. Dated habits are grouped
/// per day in ascending date order; both sides keep insertion order within.
#[derive(Debug, Default)]
pub struct Planner<'a> {
    pub scheduled: Vec<(NaiveDate, Vec<&'a HabitRecord>)>,
    pub unscheduled: Vec<&'a HabitRecord>,
}

pub fn build_planner(habits: &[HabitRecord]) -> Planner<'_> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&HabitRecord>> = BTreeMap::new();
    let mut unscheduled = Vec::new();

    for habit in habits {
        match habit.target_date {
            Some(date) => by_date.entry(date).or_default().push(habit),
            None => unscheduled.push(habit),
        }
    }

    Planner {
        scheduled: by_date.into_iter().collect(),
        unscheduled,
    }
}

/// Completed habits per day from backend progress entries, oldest first.
/// Entries either carry a `completados` count or are single marks with a
/// `cumplido` flag. Entries without a `fecha` are skipped.
pub fn progress_by_day(entries: &[Value]) -> Vec<ProgressDay> {
    let mut by_date: BTreeMap<String, u64> = BTreeMap::new();
    for entry in entries {
        let Some(date) = entry.get("fecha").and_then(Value::as_str) else {
            continue;
        };
        let completed = match entry.get("completados").and_then(Value::as_u64) {
            Some(count) => count,
            None => u64::from(entry.get("cumplido").and_then(Value::as_bool).unwrap_or(false)),
        };
        *by_date.entry(date.to_string()).or_default() += completed;
    }

    by_date
        .into_iter()
        .map(|(date, completed)| ProgressDay { date, completed })
        .collect()
}
