use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Origin {
    A,
    B,
}

impl Origin {
    /// Source tag by id prefix: ids starting with `a` come from source A, anything else from B.
    pub fn from_id(id: &str) -> Self {
        if id.starts_with('a') {
            Origin::A
        } else {
            Origin::B
        }
    }

    /// The source a record is compared against.
    pub fn opposite(self) -> Self {
        match self {
            Origin::A => Origin::B,
            Origin::B => Origin::A,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::A => write!(f, "A"),
            Origin::B => write!(f, "B"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: String,
    pub name: String,
    pub surname: String,
    pub town: String,
    pub postal_code: String,
    pub origin: Origin,
}

impl Record {
    pub fn new(id: &str, name: &str, surname: &str, town: &str, postal_code: &str) -> Self {
        Record {
            id: id.to_string(),
            name: name.to_string(),
            surname: surname.to_string(),
            town: town.to_string(),
            postal_code: postal_code.to_string(),
            origin: Origin::from_id(id),
        }
    }

    /// Ground-truth entity number embedded in the id: `a123_1` -> `123`, `b456` -> `456`.
    pub fn ground_truth_id(&self) -> &str {
        let start = self.id.char_indices().nth(1).map(|(i, _)| i).unwrap_or(self.id.len());
        match self.id.find('_') {
            Some(pos) if pos > 0 => &self.id[start.min(pos)..pos],
            _ => &self.id[start..],
        }
    }

    pub fn same_entity(&self, other: &Record) -> bool {
        self.ground_truth_id() == other.ground_truth_id()
    }
}

/// A detected true-positive pair, `existing` being the record already held by the block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchEvent {
    pub score: f64,
    pub existing_id: String,
    pub existing_surname: String,
    pub existing_name: String,
    pub incoming_id: String,
    pub incoming_surname: String,
    pub incoming_name: String,
}

impl MatchEvent {
    pub fn new(existing: &Record, incoming: &Record, score: f64) -> Self {
        MatchEvent {
            score,
            existing_id: existing.id.clone(),
            existing_surname: existing.surname.clone(),
            existing_name: existing.name.clone(),
            incoming_id: incoming.id.clone(),
            incoming_surname: incoming.surname.clone(),
            incoming_name: incoming.name.clone(),
        }
    }
}

impl fmt::Display for MatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MATCH (Score: {:.2}): {} ({}, {}) <-> {} ({}, {})",
            self.score,
            self.existing_id, self.existing_surname, self.existing_name,
            self.incoming_id, self.incoming_surname, self.incoming_name
        )
    }
}

/// Match counts produced by a single insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutResult {
    pub true_positives: u64,
    pub false_positives: u64,
}

impl PutResult {
    pub fn accrue(&mut self, other: PutResult) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
    }
}
