use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stop::{StopField, StopRecord};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BookError {
    #[error("No stop with sequence {0}")]
    UnknownSequence(String),
    #[error("Unknown stop field: {0}")]
    UnknownField(String),
}

/// What happened when a batch of recognized stops was appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendSummary {
    pub added: usize,
    /// Sequences in the batch that were already present in the book.
    pub colliding_sequences: Vec<String>,
}

impl AppendSummary {
    /// Nothing was recognized; the page should be re-photographed.
    pub fn is_empty(&self) -> bool {
        self.added == 0
    }
}

/// The stops accumulated over one editing session, in upload order.
///
/// Batches are concatenated as-is. Sequences are never renumbered; collisions
/// between batches are reported so the caller can decide what to do.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteBook {
    stops: Vec<StopRecord>,
}

impl RouteBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stops(&self) -> &[StopRecord] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn into_stops(self) -> Vec<StopRecord> {
        self.stops
    }

    pub fn append_batch(&mut self, batch: Vec<StopRecord>) -> AppendSummary {
        let existing: HashSet<&str> = self.stops.iter().map(|s| s.sequence.as_str()).collect();
        let mut colliding: Vec<String> = Vec::new();
        for stop in &batch {
            if existing.contains(stop.sequence.as_str()) && !colliding.contains(&stop.sequence) {
                colliding.push(stop.sequence.clone());
            }
        }

        if !colliding.is_empty() {
            tracing::warn!(
                "Appended batch reuses {} existing sequence number(s): {}",
                colliding.len(),
                colliding.join(", ")
            );
        }

        let added = batch.len();
        self.stops.extend(batch);
        tracing::debug!("Route book now holds {} stops", self.stops.len());

        AppendSummary { added, colliding_sequences: colliding }
    }

    /// Append an empty stop numbered after the current last position.
    pub fn add_stop(&mut self) -> &StopRecord {
        let seq = (self.stops.len() + 1).to_string();
        self.stops.push(StopRecord::blank(seq));
        &self.stops[self.stops.len() - 1]
    }

    /// Remove every stop carrying `sequence`. Returns how many were removed.
    pub fn delete_stop(&mut self, sequence: &str) -> Result<usize, BookError> {
        let before = self.stops.len();
        self.stops.retain(|s| s.sequence != sequence);
        match before - self.stops.len() {
            0 => Err(BookError::UnknownSequence(sequence.to_string())),
            n => Ok(n),
        }
    }

    /// Set `field` on every stop carrying `sequence`. Returns how many changed.
    pub fn update_stop(
        &mut self,
        sequence: &str,
        field: StopField,
        value: &str,
    ) -> Result<usize, BookError> {
        let mut n = 0;
        for stop in self.stops.iter_mut().filter(|s| s.sequence == sequence) {
            stop.set(field, value);
            n += 1;
        }
        if n == 0 {
            return Err(BookError::UnknownSequence(sequence.to_string()));
        }
        Ok(n)
    }

    /// Like [`update_stop`](Self::update_stop) but with the field given by name.
    pub fn update_stop_named(
        &mut self,
        sequence: &str,
        field: &str,
        value: &str,
    ) -> Result<usize, BookError> {
        let field: StopField = field
            .parse()
            .map_err(|_| BookError::UnknownField(field.to_string()))?;
        self.update_stop(sequence, field, value)
    }

    pub fn search(&self, term: &str) -> Vec<&StopRecord> {
        self.stops.iter().filter(|s| s.matches(term)).collect()
    }

    /// Sequences that occur more than once, in order of first appearance.
    pub fn duplicate_sequences(&self) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for s in &self.stops {
            *counts.entry(s.sequence.as_str()).or_default() += 1;
        }
        let mut seen = HashSet::new();
        self.stops
            .iter()
            .map(|s| s.sequence.as_str())
            .filter(|seq| counts[seq] > 1 && seen.insert(*seq))
            .map(str::to_string)
            .collect()
    }
}

impl FromIterator<StopRecord> for RouteBook {
    fn from_iter<I: IntoIterator<Item = StopRecord>>(iter: I) -> Self {
        RouteBook { stops: iter.into_iter().collect() }
    }
}
