//! Bet-type table extraction
//!
//! `grid` turns rendered markup into labelled cells; `extractor` drives the
//! session through tabs and axis dropdowns and collects raw rows.
//!
//! # Example
//!
//! ```no_run
//! use racedriver::scraper::OddsExtractor;
//! use racedriver::{Browser, Session, WagerType};
//!
//! async fn exacta<B: Browser>(session: &mut Session<B>) -> racedriver::Result<usize> {
//!     let relation = OddsExtractor::new(session)
//!         .extract_relation(WagerType::Exacta)
//!         .await?;
//!     Ok(relation.len())
//! }
//! ```

pub mod extractor;
pub mod grid;

pub use extractor::{grid_rows, win_rows, OddsExtractor};
pub use grid::{
    parse_axis_options, parse_odds_grid, parse_odds_text, parse_position_label, parse_win_table,
    AxisOption, GridCell, OddsGrid, WinEntry,
};
