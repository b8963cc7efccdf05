//! Sorcerer rank - the fixed, ordered grading scale

use serde::{Deserialize, Serialize};

/// Sorcerer grade, strongest first. Declaration order is the sort order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rank {
    SpecialGrade,
    #[serde(rename = "GRADE_1")]
    Grade1,
    #[serde(rename = "SEMI_GRADE_1")]
    SemiGrade1,
    #[serde(rename = "GRADE_2")]
    Grade2,
    #[serde(rename = "SEMI_GRADE_2")]
    SemiGrade2,
    #[serde(rename = "GRADE_3")]
    Grade3,
    #[serde(rename = "GRADE_4")]
    Grade4,
    #[default]
    NonSorcerer,
}

impl Rank {
    pub const ALL: [Rank; 8] = [
        Rank::SpecialGrade,
        Rank::Grade1,
        Rank::SemiGrade1,
        Rank::Grade2,
        Rank::SemiGrade2,
        Rank::Grade3,
        Rank::Grade4,
        Rank::NonSorcerer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::SpecialGrade => "SPECIAL_GRADE",
            Rank::Grade1 => "GRADE_1",
            Rank::SemiGrade1 => "SEMI_GRADE_1",
            Rank::Grade2 => "GRADE_2",
            Rank::SemiGrade2 => "SEMI_GRADE_2",
            Rank::Grade3 => "GRADE_3",
            Rank::Grade4 => "GRADE_4",
            Rank::NonSorcerer => "NON_SORCERER",
        }
    }

    /// Case-insensitive parse of the wire name
    pub fn parse(value: &str) -> Option<Self> {
        let upper = value.trim().to_uppercase();
        Self::ALL.into_iter().find(|rank| rank.as_str() == upper)
    }

    /// Position in the grading scale, used as the storage encoding
    pub fn ordinal(&self) -> i64 {
        *self as i64
    }

    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Rank::parse("special_grade"), Some(Rank::SpecialGrade));
        assert_eq!(Rank::parse("Grade_1"), Some(Rank::Grade1));
        assert_eq!(Rank::parse("GRADE_7"), None);
    }

    #[test]
    fn test_ordinal_matches_declaration_order() {
        for (i, rank) in Rank::ALL.iter().enumerate() {
            assert_eq!(rank.ordinal(), i as i64);
            assert_eq!(Rank::from_ordinal(i as i64), Some(*rank));
        }
        assert!(Rank::SpecialGrade < Rank::NonSorcerer);
        assert_eq!(Rank::from_ordinal(99), None);
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&Rank::SemiGrade2).unwrap();
        assert_eq!(json, "\"SEMI_GRADE_2\"");
    }
}
