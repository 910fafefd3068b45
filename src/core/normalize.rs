//! Combination normalizer
//!
//! Turns raw grid rows into a complete, order-defined odds relation:
//!
//! 1. unordered types: sort each row's selectors (canonical form)
//! 2. group by canonical tuple; every member of a group must carry the same odds
//! 3. drop rows whose selectors repeat a runner
//! 4. sort rows by selector tuple
//!
//! The result must hold exactly `WagerType::combination_count(N)` rows.
//! Disagreeing mirrors and short relations are errors, never averaged or padded.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::{validate_field_size, validate_selector, DriverError};
use crate::models::{OddsRelation, OddsRow, RawExtraction, RawRow, WagerType};

/// Odds read from the same rendered text compare equal; the slack only absorbs float noise
const ODDS_TOLERANCE: f64 = 1e-9;

/// Canonicalize, deduplicate and sort rows (steps 1-4)
pub fn canonicalize(wager_type: WagerType, rows: &[RawRow]) -> Result<Vec<OddsRow>, DriverError> {
    let mut groups: BTreeMap<Vec<u8>, f64> = BTreeMap::new();

    for row in rows {
        if row.selectors.len() != wager_type.arity() {
            return Err(DriverError::Input(format!(
                "{} row {:?} has {} selectors, expected {}",
                wager_type,
                row.selectors,
                row.selectors.len(),
                wager_type.arity()
            )));
        }

        let mut key = row.selectors.clone();
        if !wager_type.ordered() {
            key.sort_unstable();
        }

        match groups.get(&key) {
            Some(&existing) if (existing - row.odds).abs() > ODDS_TOLERANCE => {
                return Err(DriverError::DataConsistency {
                    selectors: key,
                    first: existing,
                    second: row.odds,
                });
            }
            Some(_) => {}
            None => {
                groups.insert(key, row.odds);
            }
        }
    }

    let mut result = Vec::with_capacity(groups.len());
    for (selectors, odds) in groups {
        let row = OddsRow { selectors, odds };
        if !is_pairwise_distinct(&row.selectors) {
            warn!("Dropping {} row with repeated runner {:?}", wager_type, row.selectors);
            continue;
        }
        result.push(row);
    }

    // BTreeMap iteration already yields ascending tuples
    debug_assert!(result.windows(2).all(|w| w[0].selectors < w[1].selectors));
    Ok(result)
}

/// Normalize one raw extraction and check it against the closed-form count
pub fn normalize(raw: &RawExtraction) -> Result<OddsRelation, DriverError> {
    normalize_rows(raw.wager_type, raw.field_size, &raw.rows)
}

/// Normalize rows for a field of `field_size` runners
pub fn normalize_rows(
    wager_type: WagerType,
    field_size: usize,
    rows: &[RawRow],
) -> Result<OddsRelation, DriverError> {
    validate_field_size(field_size)?;
    for row in rows {
        for &selector in &row.selectors {
            validate_selector(selector, field_size)?;
        }
        if !row.odds.is_finite() || row.odds <= 0.0 {
            return Err(DriverError::Input(format!(
                "{} row {:?} has non-positive odds {}",
                wager_type, row.selectors, row.odds
            )));
        }
    }

    let canonical = canonicalize(wager_type, rows)?;

    let expected = wager_type.combination_count(field_size);
    if canonical.len() != expected {
        return Err(DriverError::IncompleteRelation {
            wager_type,
            expected,
            actual: canonical.len(),
        });
    }

    debug!(
        "Normalized {} raw {} rows into {}",
        rows.len(),
        wager_type,
        canonical.len()
    );

    Ok(OddsRelation {
        wager_type,
        field_size,
        rows: canonical,
    })
}

fn is_pairwise_distinct(selectors: &[u8]) -> bool {
    selectors
        .iter()
        .enumerate()
        .all(|(i, s)| !selectors[i + 1..].contains(s))
}
