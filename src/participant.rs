// src/participant.rs
//
// Participant metadata and the parity counterbalancing rule.

use serde::{Deserialize, Serialize};

use crate::config::BLOCKS_PER_SESSION;
use crate::error::{ExperimentError, Result};
use crate::types::BlockType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Man,
    Woman,
    Other,
    Undisclosed,
}

impl Gender {
    pub const ALL: [Gender; 4] = [Gender::Man, Gender::Woman, Gender::Other, Gender::Undisclosed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Man => "man",
            Gender::Woman => "woman",
            Gender::Other => "other",
            Gender::Undisclosed => "undisclosed",
        }
    }

    pub fn parse(s: &str) -> Option<Gender> {
        match s.trim().to_ascii_lowercase().as_str() {
            "man" | "m" | "male" => Some(Gender::Man),
            "woman" | "w" | "f" | "female" => Some(Gender::Woman),
            "other" | "x" => Some(Gender::Other),
            "undisclosed" | "" | "-" | "prefer not to say" => Some(Gender::Undisclosed),
            _ => None,
        }
    }
}

/// Validated participant metadata, attached to every result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub number: u32,
    pub gender: Gender,
    pub age: u32,
    pub color_blind: Option<bool>,
}

impl ParticipantInfo {
    /// Validate raw dialog fields: number and age must be plain digits.
    pub fn parse(number: &str, gender: &str, age: &str, color_blind: Option<bool>) -> Result<Self> {
        let number = parse_numeric("participant number", number)?;
        let age = parse_numeric("age", age)?;
        let gender = Gender::parse(gender)
            .ok_or_else(|| ExperimentError::InvalidMetadata(format!("unknown gender {gender:?}")))?;
        Ok(Self {
            number,
            gender,
            age,
            color_blind,
        })
    }

    /// Framing order for this participant: even numbers start congruent.
    pub fn block_order(&self) -> [BlockType; BLOCKS_PER_SESSION] {
        block_order(self.number)
    }
}

fn parse_numeric(field: &str, raw: &str) -> Result<u32> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(ExperimentError::InvalidMetadata(format!(
            "{field} must be numeric (got {raw:?})"
        )));
    }
    raw.parse()
        .map_err(|_| ExperimentError::InvalidMetadata(format!("{field} out of range: {raw}")))
}

/// Counterbalancing rule; a fixed function of the participant number.
pub fn block_order(participant_number: u32) -> [BlockType; BLOCKS_PER_SESSION] {
    if participant_number % 2 == 0 {
        [BlockType::Congruent, BlockType::Incongruent]
    } else {
        [BlockType::Incongruent, BlockType::Congruent]
    }
}

/// Collaborator that collects participant metadata (dialog box, CLI, ...).
///
/// Implementations must only return once number and age are numeric.
pub trait MetadataSource {
    fn collect(&mut self) -> Result<ParticipantInfo>;
}

/// Metadata that is already known (CLI flags, tests).
#[derive(Debug, Clone)]
pub struct FixedMetadata(pub ParticipantInfo);

impl MetadataSource for FixedMetadata {
    fn collect(&mut self) -> Result<ParticipantInfo> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_selects_first_block() {
        assert_eq!(block_order(4)[0], BlockType::Congruent);
        assert_eq!(block_order(7)[0], BlockType::Incongruent);
        assert_eq!(block_order(7)[1], BlockType::Congruent);
    }

    #[test]
    fn numeric_fields_are_required() {
        assert!(ParticipantInfo::parse("12", "woman", "23", None).is_ok());
        assert!(matches!(
            ParticipantInfo::parse("12a", "woman", "23", None),
            Err(ExperimentError::InvalidMetadata(_))
        ));
        assert!(ParticipantInfo::parse("12", "woman", "-3", None).is_err());
        assert!(ParticipantInfo::parse("", "man", "30", None).is_err());
    }
}
