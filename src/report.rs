#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Aggregated results of a grading run.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::score::ScoreRecord;

/// Score records in execution order: non-isolated checks first, then
/// isolated ones. Records are only ever appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Records, in the order the checks ran.
    records: Vec<ScoreRecord>,
}

impl Report {
    /// Appends a record.
    pub fn push(&mut self, record: ScoreRecord) {
        self.records.push(record);
    }

    /// Records in execution order.
    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    /// Finds the record of the check called `name`.
    pub fn get(&self, name: &str) -> Option<&ScoreRecord> {
        self.records.iter().find(|r| r.check_name() == name)
    }

    /// `(sum of scores, sum of maxima)`, widened so large budgets cannot
    /// overflow.
    pub fn total(&self) -> (u64, u64) {
        self.records.iter().fold((0, 0), |(score, max), r| {
            (score + u64::from(r.score()), max + u64::from(r.max_score()))
        })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no check ran.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for record in &self.records {
            writeln!(f, "{record}")?;
        }
        Ok(())
    }
}

impl IntoIterator for Report {
    type IntoIter = std::vec::IntoIter<ScoreRecord>;
    type Item = ScoreRecord;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
