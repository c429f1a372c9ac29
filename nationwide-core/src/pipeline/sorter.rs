//! Ordering of the output buffer by state, city, year, make, model

use super::projector::ProjectedRow;
use std::cmp::Ordering;

/// Lexicographic comparison on (state, city, year text, make, model)
pub fn compare_rows(a: &ProjectedRow, b: &ProjectedRow) -> Ordering {
    a.state
        .cmp(&b.state)
        .then_with(|| a.city.cmp(&b.city))
        .then_with(|| a.year.cmp(&b.year))
        .then_with(|| a.make.cmp(&b.make))
        .then_with(|| a.model.cmp(&b.model))
}

pub fn sort_rows(rows: &mut [ProjectedRow]) {
    rows.sort_by(compare_rows);
}
