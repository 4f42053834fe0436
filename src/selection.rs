// src/selection.rs

//! Operator id selections such as `"1,3,5-7"`.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use crate::errors::SimonError;
use crate::types::TaskId;

/// Widest `a-b` range accepted in one token.
pub const MAX_RANGE_SPAN: usize = 10_000;

/// Parsed selection: valid ids in input order (deduplicated) plus one error
/// per rejected token.
#[derive(Debug, Default)]
pub struct Selection {
    pub ids: Vec<TaskId>,
    pub rejected: Vec<SimonError>,
}

/// Parse a comma-separated list of ids and inclusive `a-b` ranges.
///
/// Bad tokens are collected in [`Selection::rejected`] instead of failing the
/// whole selection.
pub fn parse_selection(input: &str) -> Selection {
    let mut selection = Selection::default();
    let mut seen = HashSet::new();

    for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match parse_token(token) {
            Ok(ids) => selection.ids.extend(ids.filter(|id| seen.insert(*id))),
            Err(err) => selection.rejected.push(err),
        }
    }

    selection
}

fn parse_token(token: &str) -> Result<RangeInclusive<TaskId>, SimonError> {
    let invalid = || SimonError::InvalidSelection(format!("'{token}' is not an id or an id range"));

    match token.split_once('-') {
        Some((start, end)) => {
            let start: TaskId = start.trim().parse().map_err(|_| invalid())?;
            let end: TaskId = end.trim().parse().map_err(|_| invalid())?;
            if start > end {
                return Err(SimonError::InvalidSelection(format!(
                    "range '{token}' is reversed"
                )));
            }
            if end - start >= MAX_RANGE_SPAN {
                return Err(SimonError::InvalidSelection(format!(
                    "range '{token}' spans more than {MAX_RANGE_SPAN} ids"
                )));
            }
            Ok(start..=end)
        }
        None => {
            let id: TaskId = token.parse().map_err(|_| invalid())?;
            Ok(id..=id)
        }
    }
}
