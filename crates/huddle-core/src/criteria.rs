// Feedback criteria, the rating vocabulary, and per-submission score cards.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// Criterion
// ---------------------------------------------------------------------------

/// How a criterion is rated on the feedback form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CriterionKind {
    /// Three-level rating: `+`, `+/-`, `-`.
    Qualitative,
    /// Checkbox rating: `yes` or `no`.
    YesNo,
}

/// One of the ten fixed feedback criteria, in form and export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Criterion {
    Communicate,
    Hustle,
    Ownership,
    Improve,
    Conscientious,
    Attitudes,
    Support,
    GetIt,
    WantIt,
    Capacity,
}

impl Criterion {
    pub const COUNT: usize = 10;

    /// All criteria in canonical order.
    pub const ALL: [Criterion; Criterion::COUNT] = [
        Criterion::Communicate,
        Criterion::Hustle,
        Criterion::Ownership,
        Criterion::Improve,
        Criterion::Conscientious,
        Criterion::Attitudes,
        Criterion::Support,
        Criterion::GetIt,
        Criterion::WantIt,
        Criterion::Capacity,
    ];

    /// Human-readable label used in CSV headers and live payloads.
    pub fn label(self) -> &'static str {
        match self {
            Criterion::Communicate => "Communicate",
            Criterion::Hustle => "Hustle",
            Criterion::Ownership => "Ownership",
            Criterion::Improve => "Improve",
            Criterion::Conscientious => "Conscientious",
            Criterion::Attitudes => "Attitudes",
            Criterion::Support => "Support",
            Criterion::GetIt => "Get It",
            Criterion::WantIt => "Want It",
            Criterion::Capacity => "Capacity",
        }
    }

    /// Form field name carrying this criterion's rating.
    pub fn field_name(self) -> &'static str {
        match self {
            Criterion::Communicate => "communicate",
            Criterion::Hustle => "hustle",
            Criterion::Ownership => "ownership",
            Criterion::Improve => "improve",
            Criterion::Conscientious => "conscientious",
            Criterion::Attitudes => "attitudes",
            Criterion::Support => "support",
            Criterion::GetIt => "get_it",
            Criterion::WantIt => "want_it",
            Criterion::Capacity => "capacity",
        }
    }

    pub fn kind(self) -> CriterionKind {
        match self {
            Criterion::GetIt | Criterion::WantIt | Criterion::Capacity => CriterionKind::YesNo,
            _ => CriterionKind::Qualitative,
        }
    }

    /// Position of this criterion in [`Criterion::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Map a textual rating to its numeric score.
    ///
    /// Qualitative: `+` = 10, `+/-` = 5, `-` = 0.
    /// Yes/no: `yes` = 10, `no` = 0 (case-insensitive).
    /// Anything else yields `None`.
    pub fn score(self, raw: &str) -> Option<f64> {
        let raw = raw.trim();
        match self.kind() {
            CriterionKind::Qualitative => match raw {
                "+" => Some(10.0),
                "+/-" => Some(5.0),
                "-" => Some(0.0),
                _ => None,
            },
            CriterionKind::YesNo => {
                if raw.eq_ignore_ascii_case("yes") {
                    Some(10.0)
                } else if raw.eq_ignore_ascii_case("no") {
                    Some(0.0)
                } else {
                    None
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Raw ratings (form input)
// ---------------------------------------------------------------------------

/// Textual ratings as submitted, before scoring. Criteria with no entry are
/// treated as unrated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRatings {
    values: HashMap<Criterion, String>,
}

impl RawRatings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, criterion: Criterion, value: impl Into<String>) -> Self {
        self.set(criterion, value);
        self
    }

    pub fn set(&mut self, criterion: Criterion, value: impl Into<String>) {
        self.values.insert(criterion, value.into());
    }

    pub fn get(&self, criterion: Criterion) -> Option<&str> {
        self.values.get(&criterion).map(String::as_str)
    }

    /// Build ratings from submitted form fields.
    ///
    /// Qualitative criteria take the field value verbatim. Yes/no criteria
    /// follow checkbox semantics: a present, non-blank field means "yes"
    /// unless its value is literally "no". Absent or blank fields mean "no".
    pub fn from_form(fields: &HashMap<String, String>) -> Self {
        let mut ratings = Self::new();
        for criterion in Criterion::ALL {
            let field = fields.get(criterion.field_name());
            match criterion.kind() {
                CriterionKind::Qualitative => {
                    if let Some(value) = field {
                        ratings.set(criterion, value.clone());
                    }
                }
                CriterionKind::YesNo => {
                    let checked = field.is_some_and(|v| {
                        let v = v.trim();
                        !v.is_empty() && !v.eq_ignore_ascii_case("no")
                    });
                    ratings.set(criterion, if checked { "yes" } else { "no" });
                }
            }
        }
        ratings
    }

    /// Score every criterion. Unrated or unrecognized values become `None`.
    pub fn score_card(&self) -> ScoreCard {
        let mut scores = [None; Criterion::COUNT];
        for criterion in Criterion::ALL {
            scores[criterion.index()] = self.get(criterion).and_then(|raw| criterion.score(raw));
        }
        ScoreCard(scores)
    }

    /// Criteria whose value is present but not part of the rating vocabulary,
    /// or missing entirely.
    pub fn unrecognized(&self) -> Vec<Criterion> {
        Criterion::ALL
            .into_iter()
            .filter(|c| self.get(*c).and_then(|raw| c.score(raw)).is_none())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Score cards and submissions
// ---------------------------------------------------------------------------

/// Numeric scores for all ten criteria, indexed by [`Criterion::index`].
///
/// Serializes as a JSON object keyed by criterion label, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreCard(pub [Option<f64>; Criterion::COUNT]);

impl ScoreCard {
    pub fn get(&self, criterion: Criterion) -> Option<f64> {
        self.0[criterion.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Criterion, Option<f64>)> + '_ {
        Criterion::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}

impl Serialize for ScoreCard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Criterion::COUNT))?;
        for (criterion, score) in self.iter() {
            map.serialize_entry(criterion.label(), &score)?;
        }
        map.end()
    }
}

/// One recorded feedback form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub scores: ScoreCard,
    pub submitted_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(scores: ScoreCard) -> Self {
        Self {
            scores,
            submitted_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualitative_vocabulary_maps_to_scores() {
        assert_eq!(Criterion::Hustle.score("+"), Some(10.0));
        assert_eq!(Criterion::Hustle.score("+/-"), Some(5.0));
        assert_eq!(Criterion::Hustle.score("-"), Some(0.0));
        assert_eq!(Criterion::Hustle.score(" + "), Some(10.0));
    }

    #[test]
    fn yes_no_vocabulary_is_case_insensitive() {
        assert_eq!(Criterion::GetIt.score("Yes"), Some(10.0));
        assert_eq!(Criterion::WantIt.score("no"), Some(0.0));
        assert_eq!(Criterion::Capacity.score("NO"), Some(0.0));
    }

    #[test]
    fn unrecognized_values_score_as_none() {
        assert_eq!(Criterion::Support.score("yes"), None);
        assert_eq!(Criterion::GetIt.score("+"), None);
        assert_eq!(Criterion::Communicate.score(""), None);
    }

    #[test]
    fn criteria_order_matches_index() {
        for (i, c) in Criterion::ALL.into_iter().enumerate() {
            assert_eq!(c.index(), i);
        }
        assert_eq!(
            Criterion::ALL.iter().filter(|c| c.kind() == CriterionKind::YesNo).count(),
            3
        );
    }

    #[test]
    fn from_form_applies_checkbox_semantics() {
        let mut fields = HashMap::new();
        fields.insert("communicate".to_string(), "+".to_string());
        fields.insert("hustle".to_string(), "+/-".to_string());
        fields.insert("get_it".to_string(), "on".to_string());
        fields.insert("want_it".to_string(), "no".to_string());
        fields.insert("capacity".to_string(), "  ".to_string());

        let ratings = RawRatings::from_form(&fields);
        assert_eq!(ratings.get(Criterion::Communicate), Some("+"));
        assert_eq!(ratings.get(Criterion::Ownership), None);
        assert_eq!(ratings.get(Criterion::GetIt), Some("yes"));
        assert_eq!(ratings.get(Criterion::WantIt), Some("no"));
        assert_eq!(ratings.get(Criterion::Capacity), Some("no"));

        let card = ratings.score_card();
        assert_eq!(card.get(Criterion::Communicate), Some(10.0));
        assert_eq!(card.get(Criterion::Hustle), Some(5.0));
        assert_eq!(card.get(Criterion::Ownership), None);
        assert_eq!(card.get(Criterion::GetIt), Some(10.0));
        assert_eq!(card.get(Criterion::Capacity), Some(0.0));
    }

    #[test]
    fn empty_checkbox_value_counts_as_no() {
        let mut fields = HashMap::new();
        fields.insert("get_it".to_string(), String::new());

        let ratings = RawRatings::from_form(&fields);
        assert_eq!(ratings.get(Criterion::GetIt), Some("no"));
        assert_eq!(ratings.score_card().get(Criterion::GetIt), Some(0.0));
    }

    #[test]
    fn unrecognized_lists_missing_and_bad_values() {
        let ratings = RawRatings::new()
            .with(Criterion::Communicate, "+")
            .with(Criterion::Hustle, "great");
        let bad = ratings.unrecognized();
        assert!(!bad.contains(&Criterion::Communicate));
        assert!(bad.contains(&Criterion::Hustle));
        assert!(bad.contains(&Criterion::Capacity));
        assert_eq!(bad.len(), 9);
    }

    #[test]
    fn score_card_serializes_in_label_order() {
        let card = RawRatings::new()
            .with(Criterion::Communicate, "+")
            .with(Criterion::GetIt, "yes")
            .score_card();
        let json = serde_json::to_string(&card).unwrap();
        assert!(json.starts_with(r#"{"Communicate":10.0,"Hustle":null"#));
        assert!(json.contains(r#""Get It":10.0"#));
        assert!(json.ends_with(r#""Capacity":null}"#));
    }
}
