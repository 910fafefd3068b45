//! Race-betting UI driver
//!
//! This library provides:
//! - A navigation state machine over a browser session (overview, course, race)
//! - Odds extraction for every supported bet type, including axis-driven trio grids
//! - Normalization of raw grid rows into complete, ordered odds relations
//! - Sequential wager submission with abort-on-failure reporting
//!
//! The browser itself is a trait; any WebDriver binding can sit behind [`Browser`].

pub mod browser;
pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod scraper;
pub mod session;
pub mod submission;

#[cfg(test)]
mod testkit;

pub use browser::{Browser, BrowserError, ElementHandle, Locator, OptionChoice};
pub use config::{DriverConfig, LayoutTable, LocatorMap, SessionConfig};
pub use error::DriverError;
pub use models::{OddsRelation, OddsRow, RawExtraction, RawRow, WagerRequest, WagerType};
pub use session::{Session, SessionState};
pub use submission::{BatchOutcome, FailedWager, SubmitStep, SubmittedWager, WagerSubmitter};

pub type Result<T> = std::result::Result<T, DriverError>;
