//! Attempt scores with two fractional digits.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Upper bound of the scoring scale.
pub const MAX_SCORE: u32 = 10;

/// A score on the 0..=10 scale, stored in hundredths.
///
/// Serializes as a JSON number (`6.67`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Score(u32);

impl Score {
    pub const ZERO: Score = Score(0);

    pub fn from_hundredths(hundredths: u32) -> Self {
        Self(hundredths)
    }

    pub fn hundredths(&self) -> u32 {
        self.0
    }

    /// `correct / total * 10`, rounded half-up to two decimals. Zero when
    /// `total` is zero.
    pub fn from_ratio(correct: usize, total: usize) -> Self {
        if total == 0 {
            return Self::ZERO;
        }
        let correct = correct.min(total) as u64;
        let total = total as u64;
        let scale = u64::from(MAX_SCORE) * 100;
        Self(((2 * correct * scale + total) / (2 * total)) as u32)
    }

    /// Rounds `value` half-up to hundredths. `None` for negative or
    /// non-finite input.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let hundredths = (value * 100.0).round();
        if hundredths > f64::from(u32::MAX) {
            return None;
        }
        Some(Self(hundredths as u32))
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Score::from_f64(value).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid score {value}: must be a non-negative number"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_of_three_rounds_half_up() {
        let score = Score::from_ratio(2, 3);
        assert_eq!(score.hundredths(), 667);
        assert_eq!(score.to_string(), "6.67");
    }

    #[test]
    fn test_exact_ratios() {
        assert_eq!(Score::from_ratio(0, 4), Score::ZERO);
        assert_eq!(Score::from_ratio(1, 4).to_string(), "2.50");
        assert_eq!(Score::from_ratio(4, 4).to_string(), "10.00");
    }

    #[test]
    fn test_rounding_boundary() {
        // 1/8 * 10 = 1.25 exactly, 1/3 * 10 = 3.333.. rounds down
        assert_eq!(Score::from_ratio(1, 8).hundredths(), 125);
        assert_eq!(Score::from_ratio(1, 3).hundredths(), 333);
        // 1/16 * 10 = 0.625 rounds up
        assert_eq!(Score::from_ratio(1, 16).hundredths(), 63);
    }

    #[test]
    fn test_no_answers_scores_zero() {
        assert_eq!(Score::from_ratio(0, 0), Score::ZERO);
    }

    #[test]
    fn test_json_number() {
        let json = serde_json::to_string(&Score::from_ratio(2, 3)).unwrap();
        assert_eq!(json, "6.67");

        let parsed: Score = serde_json::from_str("6.67").unwrap();
        assert_eq!(parsed.hundredths(), 667);
        let parsed: Score = serde_json::from_str("7").unwrap();
        assert_eq!(parsed.hundredths(), 700);
    }

    #[test]
    fn test_rejects_negative() {
        assert!(Score::from_f64(-1.0).is_none());
        assert!(Score::from_f64(f64::NAN).is_none());
        assert!(serde_json::from_str::<Score>("-0.5").is_err());
    }
}
