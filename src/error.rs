//! Driver error taxonomy and input validation helpers

use std::time::Duration;
use thiserror::Error;

use crate::browser::BrowserError;
use crate::models::WagerType;

/// Lowest field size the odds grids can render
pub const MIN_FIELD_SIZE: usize = 2;
/// Highest field size the odds grids can render
pub const MAX_FIELD_SIZE: usize = 18;
/// Races per course card
pub const MAX_RACE_NO: u8 = 12;

/// Driver errors
#[derive(Debug, Error)]
pub enum DriverError {
    /// Transition invoked from a state where it is not defined
    #[error("invalid transition: cannot {action} from {state}")]
    State { action: &'static str, state: String },

    /// Element not visible within the deadline
    #[error("timed out after {timeout:?} waiting for {target}")]
    Timeout { target: String, timeout: Duration },

    /// Out-of-range argument or malformed request batch
    #[error("invalid input: {0}")]
    Input(String),

    /// Mirrored cells disagree for the same canonical combination
    #[error("inconsistent odds for {selectors:?}: {first} vs {second}")]
    DataConsistency {
        selectors: Vec<u8>,
        first: f64,
        second: f64,
    },

    /// Relation smaller (or larger) than the closed-form count
    ///
    /// Only as strong as the field size it is checked against; pair grids
    /// infer N from their own labels unless the extractor is given it.
    #[error("incomplete {wager_type} relation: expected {expected} rows, got {actual}")]
    IncompleteRelation {
        wager_type: WagerType,
        expected: usize,
        actual: usize,
    },

    /// No layout entry exists for this bet type on the current surface
    #[error("bet type {0} is not supported by the configured layout")]
    UnsupportedBetType(WagerType),

    /// Grid markup could not be interpreted
    #[error("failed to parse markup: {0}")]
    Parse(String),

    /// Browser failure other than a timeout
    #[error("browser error: {0}")]
    Browser(BrowserError),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Extraction of one bet type failed
    #[error("{wager_type} extraction failed{}: {source}", axis_suffix(.axis))]
    Extraction {
        wager_type: WagerType,
        axis: Option<u8>,
        #[source]
        source: Box<DriverError>,
    },
}

fn axis_suffix(axis: &Option<u8>) -> String {
    match axis {
        Some(axis) => format!(" at axis {}", axis),
        None => String::new(),
    }
}

impl DriverError {
    /// Wrap an error with the bet type (and axis) being extracted
    pub fn extraction(wager_type: WagerType, axis: Option<u8>, source: DriverError) -> Self {
        DriverError::Extraction {
            wager_type,
            axis,
            source: Box::new(source),
        }
    }

    /// The underlying error, unwrapping extraction context
    pub fn root(&self) -> &DriverError {
        match self {
            DriverError::Extraction { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), DriverError::Timeout { .. })
    }
}

impl From<BrowserError> for DriverError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::Timeout { locator, timeout } => DriverError::Timeout {
                target: locator,
                timeout,
            },
            other => DriverError::Browser(other),
        }
    }
}

/// Validate a race number on the course card
pub fn validate_race_no(race_no: u8) -> Result<(), DriverError> {
    if !(1..=MAX_RACE_NO).contains(&race_no) {
        return Err(DriverError::Input(format!(
            "Race number must be between 1 and {}, got {}",
            MAX_RACE_NO, race_no
        )));
    }
    Ok(())
}

/// Validate the number of competitors in a race
pub fn validate_field_size(field_size: usize) -> Result<(), DriverError> {
    if !(MIN_FIELD_SIZE..=MAX_FIELD_SIZE).contains(&field_size) {
        return Err(DriverError::Input(format!(
            "Field size must be between {} and {}, got {}",
            MIN_FIELD_SIZE, MAX_FIELD_SIZE, field_size
        )));
    }
    Ok(())
}

/// Validate a position selector against the field size
pub fn validate_selector(selector: u8, field_size: usize) -> Result<(), DriverError> {
    if selector == 0 || selector as usize > field_size {
        return Err(DriverError::Input(format!(
            "Selector must be between 1 and {}, got {}",
            field_size, selector
        )));
    }
    Ok(())
}

/// Validate a wager amount
pub fn validate_amount(amount: u32) -> Result<(), DriverError> {
    if amount == 0 {
        return Err(DriverError::Input(
            "Wager amount must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_race_no_valid() {
        for i in 1..=12 {
            assert!(validate_race_no(i).is_ok());
        }
    }

    #[test]
    fn test_validate_race_no_invalid() {
        assert!(validate_race_no(0).is_err());
        assert!(validate_race_no(13).is_err());
    }

    #[test]
    fn test_validate_field_size() {
        assert!(validate_field_size(2).is_ok());
        assert!(validate_field_size(18).is_ok());
        assert!(validate_field_size(1).is_err());
        assert!(validate_field_size(19).is_err());
    }

    #[test]
    fn test_validate_selector() {
        assert!(validate_selector(1, 6).is_ok());
        assert!(validate_selector(6, 6).is_ok());
        assert!(validate_selector(0, 6).is_err());
        assert!(validate_selector(7, 6).is_err());
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(100).is_ok());
        assert!(validate_amount(0).is_err());
    }

    #[test]
    fn test_browser_timeout_maps_to_timeout() {
        let err: DriverError = BrowserError::Timeout {
            locator: "css:.grid".to_string(),
            timeout: Duration::from_secs(10),
        }
        .into();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_extraction_root_and_display() {
        let err = DriverError::extraction(
            WagerType::TrioExact,
            Some(4),
            DriverError::Timeout {
                target: "css:.grid".to_string(),
                timeout: Duration::from_secs(1),
            },
        );
        assert!(err.is_timeout());
        let msg = err.to_string();
        assert!(msg.contains("trio_exact"));
        assert!(msg.contains("axis 4"));
    }

    #[test]
    fn test_error_display() {
        let err = DriverError::Input("test error".to_string());
        assert!(err.to_string().contains("invalid input"));
    }
}
