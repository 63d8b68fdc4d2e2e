use std::cmp::Ordering;

use crate::models::{FilterCriteria, RankedStudent, StudentRecord};

/// Filters `records` by year and search text, orders them by total score and
/// numbers the result from 1. The input slice is never touched.
pub fn compute_ranking<'a>(
    records: &'a [StudentRecord],
    criteria: &FilterCriteria,
) -> Vec<RankedStudent<'a>> {
    let needle = criteria.search.to_lowercase();

    let mut kept: Vec<&StudentRecord> = records
        .iter()
        .filter(|record| criteria.year.matches(record.year))
        .filter(|record| matches_search(record, &needle))
        .collect();

    kept.sort_by(|a, b| compare_for_rank(a, b));

    kept.into_iter()
        .enumerate()
        .map(|(index, student)| RankedStudent {
            rank: index + 1,
            student,
        })
        .collect()
}

/// `needle` must already be lowercase.
pub fn matches_search(record: &StudentRecord, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }

    [
        record.full_name.as_deref(),
        record.roll_number.as_deref(),
        record.department.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Higher score first; ties fall back to name (missing names last), then id.
pub fn compare_for_rank(a: &StudentRecord, b: &StudentRecord) -> Ordering {
    b.total_score()
        .cmp(&a.total_score())
        .then_with(|| compare_names(a.full_name.as_deref(), b.full_name.as_deref()))
        .then_with(|| a.id.cmp(&b.id))
}

fn compare_names(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
