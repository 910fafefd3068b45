use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wagering scheme: how many finishing positions are predicted and whether order matters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WagerType {
    Win,
    Quinella,
    Wide,
    Exacta,
    TrioBox,
    TrioExact,
}

impl WagerType {
    pub const ALL: [WagerType; 6] = [
        WagerType::Win,
        WagerType::Quinella,
        WagerType::Wide,
        WagerType::Exacta,
        WagerType::TrioBox,
        WagerType::TrioExact,
    ];

    /// Number of positions a row selects
    pub fn arity(self) -> usize {
        match self {
            WagerType::Win => 1,
            WagerType::Quinella | WagerType::Wide | WagerType::Exacta => 2,
            WagerType::TrioBox | WagerType::TrioExact => 3,
        }
    }

    /// Whether the order of selectors matters
    pub fn ordered(self) -> bool {
        matches!(
            self,
            WagerType::Win | WagerType::Exacta | WagerType::TrioExact
        )
    }

    /// Number of fixed positions iterated through the axis dropdown
    pub fn axis_arity(self) -> usize {
        if self.arity() == 3 {
            1
        } else {
            0
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WagerType::Win => "win",
            WagerType::Quinella => "quinella",
            WagerType::Wide => "wide",
            WagerType::Exacta => "exacta",
            WagerType::TrioBox => "trio_box",
            WagerType::TrioExact => "trio_exact",
        }
    }

    /// Closed-form relation size for a fully rendered field of `field_size`
    ///
    /// `C(N, k)` for unordered types, `N!/(N-k)!` for ordered ones.
    ///
    /// # Examples
    /// ```
    /// use racedriver::WagerType;
    /// assert_eq!(WagerType::Quinella.combination_count(8), 28);
    /// assert_eq!(WagerType::TrioExact.combination_count(8), 336);
    /// ```
    pub fn combination_count(self, field_size: usize) -> usize {
        let k = self.arity();
        if field_size < k {
            return 0;
        }

        let permutations: usize = (0..k).map(|i| field_size - i).product();
        if self.ordered() {
            permutations
        } else {
            let k_factorial: usize = (1..=k).product();
            permutations / k_factorial
        }
    }
}

impl fmt::Display for WagerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WagerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        WagerType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown wager type: {}", s))
    }
}

/// One row exactly as read from an odds grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub selectors: Vec<u8>,
    pub odds: f64,
}

impl RawRow {
    pub fn new(selectors: Vec<u8>, odds: f64) -> Self {
        Self { selectors, odds }
    }

    /// True when no selector appears twice
    pub fn is_distinct(&self) -> bool {
        self.selectors
            .iter()
            .enumerate()
            .all(|(i, s)| !self.selectors[i + 1..].contains(s))
    }
}

/// Extractor output for one bet type, before normalization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawExtraction {
    pub wager_type: WagerType,
    pub field_size: usize,
    pub rows: Vec<RawRow>,
    pub extracted_at: DateTime<Utc>,
}

/// Canonical odds row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsRow {
    pub selectors: Vec<u8>,
    pub odds: f64,
}

/// Complete, sorted odds relation for one race and one bet type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OddsRelation {
    pub wager_type: WagerType,
    pub field_size: usize,
    pub rows: Vec<OddsRow>,
}

impl OddsRelation {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Odds for a selection; unordered types accept any selector order
    pub fn get(&self, selectors: &[u8]) -> Option<f64> {
        let mut key = selectors.to_vec();
        if !self.wager_type.ordered() {
            key.sort_unstable();
        }
        self.rows
            .binary_search_by(|row| row.selectors.as_slice().cmp(key.as_slice()))
            .ok()
            .map(|idx| self.rows[idx].odds)
    }
}

/// A single wager instruction, consumed once by submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WagerRequest {
    pub wager_type: WagerType,
    pub selections: Vec<u8>,
    pub amount: u32,
}

impl WagerRequest {
    pub fn new(wager_type: WagerType, selections: Vec<u8>, amount: u32) -> Self {
        Self {
            wager_type,
            selections,
            amount,
        }
    }
}

impl fmt::Display for WagerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let combo: Vec<String> = self.selections.iter().map(|s| s.to_string()).collect();
        write!(f, "{} {} x{}", self.wager_type, combo.join("-"), self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_and_order() {
        assert_eq!(WagerType::Win.arity(), 1);
        assert_eq!(WagerType::Quinella.arity(), 2);
        assert_eq!(WagerType::TrioBox.arity(), 3);
        assert!(WagerType::Exacta.ordered());
        assert!(!WagerType::Wide.ordered());
        assert!(!WagerType::TrioBox.ordered());
        assert_eq!(WagerType::TrioExact.axis_arity(), 1);
        assert_eq!(WagerType::Exacta.axis_arity(), 0);
    }

    #[test]
    fn test_combination_counts_field_of_eight() {
        assert_eq!(WagerType::Win.combination_count(8), 8);
        assert_eq!(WagerType::Quinella.combination_count(8), 28);
        assert_eq!(WagerType::Wide.combination_count(8), 28);
        assert_eq!(WagerType::Exacta.combination_count(8), 56);
        assert_eq!(WagerType::TrioBox.combination_count(8), 56);
        assert_eq!(WagerType::TrioExact.combination_count(8), 336);
    }

    #[test]
    fn test_combination_count_small_field() {
        assert_eq!(WagerType::TrioBox.combination_count(2), 0);
        assert_eq!(WagerType::Exacta.combination_count(2), 2);
        assert_eq!(WagerType::TrioExact.combination_count(6), 120);
    }

    #[test]
    fn test_wager_type_parse() {
        assert_eq!("trio_box".parse::<WagerType>(), Ok(WagerType::TrioBox));
        assert_eq!("Trio-Exact".parse::<WagerType>(), Ok(WagerType::TrioExact));
        assert!("bracket".parse::<WagerType>().is_err());
    }

    #[test]
    fn test_wager_type_serde() {
        let json = serde_json::to_string(&WagerType::TrioExact).unwrap();
        assert_eq!(json, "\"trio_exact\"");
        let parsed: WagerType = serde_json::from_str("\"quinella\"").unwrap();
        assert_eq!(parsed, WagerType::Quinella);
    }

    #[test]
    fn test_raw_row_distinct() {
        assert!(RawRow::new(vec![1, 2, 3], 5.0).is_distinct());
        assert!(!RawRow::new(vec![1, 2, 1], 5.0).is_distinct());
        assert!(!RawRow::new(vec![4, 4], 5.0).is_distinct());
    }

    #[test]
    fn test_relation_get_unordered_any_order() {
        let relation = OddsRelation {
            wager_type: WagerType::Quinella,
            field_size: 3,
            rows: vec![
                OddsRow { selectors: vec![1, 2], odds: 3.1 },
                OddsRow { selectors: vec![1, 3], odds: 4.2 },
                OddsRow { selectors: vec![2, 3], odds: 9.9 },
            ],
        };
        assert_eq!(relation.get(&[2, 1]), Some(3.1));
        assert_eq!(relation.get(&[3, 2]), Some(9.9));
        assert_eq!(relation.get(&[1, 4]), None);
    }

    #[test]
    fn test_wager_request_display() {
        let req = WagerRequest::new(WagerType::Exacta, vec![3, 1], 200);
        assert_eq!(req.to_string(), "exacta 3-1 x200");
    }
}
