//! UI-driven odds extraction for one bet type at a time

use chrono::Utc;
use tracing::{debug, info, warn};

use super::grid::{parse_axis_options, parse_odds_grid, parse_win_table, OddsGrid, WinEntry};
use crate::browser::{Browser, OptionChoice};
use crate::core::normalize::normalize;
use crate::error::{validate_field_size, DriverError};
use crate::models::{OddsRelation, RawExtraction, RawRow, WagerType};
use crate::session::Session;

/// Reads raw odds rows from a session that has a race open
///
/// Without a known field size, pair grids report the number of labels they
/// render; a render missing one runner's whole row and column then reads as a
/// complete relation over N-1 runners. [`OddsExtractor::with_field_size`]
/// pins N so such a render fails as `IncompleteRelation`.
pub struct OddsExtractor<'s, B: Browser> {
    session: &'s mut Session<B>,
    field_size: Option<usize>,
}

impl<'s, B: Browser> OddsExtractor<'s, B> {
    pub fn new(session: &'s mut Session<B>) -> Self {
        Self {
            session,
            field_size: None,
        }
    }

    /// Use a field size known from outside the odds render (race card, entry list)
    pub fn with_field_size(mut self, field_size: usize) -> Result<Self, DriverError> {
        validate_field_size(field_size)?;
        self.field_size = Some(field_size);
        Ok(self)
    }

    /// Extract and normalize the odds relation of one bet type
    pub async fn extract_relation(
        &mut self,
        wager_type: WagerType,
    ) -> Result<OddsRelation, DriverError> {
        let raw = self.extract(wager_type).await?;
        normalize(&raw).map_err(|e| DriverError::extraction(wager_type, None, e))
    }

    /// Extract the raw, pre-normalization rows of one bet type
    ///
    /// Unsupported types and calls outside `RaceDetail` fail before any UI
    /// interaction; any later failure is wrapped with the bet type and axis.
    pub async fn extract(&mut self, wager_type: WagerType) -> Result<RawExtraction, DriverError> {
        self.session.config().layout.entry(wager_type)?;
        self.session.require_race_detail("extract odds")?;

        info!("Extracting {} odds", wager_type);

        self.session
            .select_bet_type(wager_type)
            .await
            .map_err(|e| DriverError::extraction(wager_type, None, e))?;

        let (rendered, rows) = match wager_type.arity() {
            1 => self.read_win().await,
            2 => self.read_pair_grid(wager_type).await,
            _ => self.read_axis_grids(wager_type).await,
        }?;

        let field_size = match self.field_size {
            Some(known) if known != rendered => {
                warn!(
                    "{} render shows {} runners, field has {}",
                    wager_type, rendered, known
                );
                known
            }
            Some(known) => known,
            None => rendered,
        };

        info!(
            "Read {} raw {} rows for a field of {}",
            rows.len(),
            wager_type,
            field_size
        );

        Ok(RawExtraction {
            wager_type,
            field_size,
            rows,
            extracted_at: Utc::now(),
        })
    }

    async fn read_grid_markup(&mut self) -> Result<String, DriverError> {
        let (browser, config) = self.session.split();
        let grid = browser
            .wait_visible(&config.locators.odds_grid, config.session.timeout())
            .await?;
        Ok(browser.read_markup(&grid).await?)
    }

    /// Flat table: position -> odds
    async fn read_win(&mut self) -> Result<(usize, Vec<RawRow>), DriverError> {
        let wrap = |e| DriverError::extraction(WagerType::Win, None, e);

        let markup = self.read_grid_markup().await.map_err(wrap)?;
        let entries = parse_win_table(&markup).map_err(wrap)?;
        validate_field_size(entries.len()).map_err(wrap)?;

        Ok((entries.len(), win_rows(&entries)))
    }

    /// One grid: rows = second position, columns = first position
    async fn read_pair_grid(
        &mut self,
        wager_type: WagerType,
    ) -> Result<(usize, Vec<RawRow>), DriverError> {
        let wrap = |e| DriverError::extraction(wager_type, None, e);

        let markup = self.read_grid_markup().await.map_err(wrap)?;
        let grid = parse_odds_grid(&markup).map_err(wrap)?;
        let field_size = grid.labels().len();
        validate_field_size(field_size).map_err(wrap)?;

        Ok((field_size, grid_rows(&grid, None)))
    }

    /// One grid per axis value: rows = third position, columns = second position
    async fn read_axis_grids(
        &mut self,
        wager_type: WagerType,
    ) -> Result<(usize, Vec<RawRow>), DriverError> {
        let timeout = self.session.config().session.timeout();
        let settle = self.session.config().session.settle_interval();

        let options = {
            let (browser, config) = self.session.split();
            let dropdown = browser
                .wait_visible(&config.locators.axis_dropdown, timeout)
                .await
                .map_err(|e| DriverError::extraction(wager_type, None, e.into()))?;
            let markup = browser
                .read_markup(&dropdown)
                .await
                .map_err(|e| DriverError::extraction(wager_type, None, e.into()))?;
            parse_axis_options(&markup)
                .map_err(|e| DriverError::extraction(wager_type, None, e))?
        };

        let field_size = options.len();
        validate_field_size(field_size)
            .map_err(|e| DriverError::extraction(wager_type, None, e))?;

        let mut rows: Vec<RawRow> = Vec::new();
        for (idx, option) in options.iter().enumerate() {
            let axis = option.position;
            let wrap = |e| DriverError::extraction(wager_type, Some(axis), e);

            self.session.set_axis(axis).map_err(wrap)?;

            if idx > 0 {
                // The previous handle died with the last re-render
                let (browser, config) = self.session.split();
                let dropdown = browser
                    .wait_visible(&config.locators.axis_dropdown, timeout)
                    .await
                    .map_err(|e| wrap(e.into()))?;
                browser
                    .select_option(&dropdown, &OptionChoice::Value(option.value.clone()))
                    .await
                    .map_err(|e| wrap(e.into()))?;
            }

            tokio::time::sleep(settle).await;

            let markup = self.read_grid_markup().await.map_err(wrap)?;
            let grid = parse_odds_grid(&markup).map_err(wrap)?;

            let before = rows.len();
            rows.extend(grid_rows(&grid, Some(axis)));
            debug!("Axis {}: {} rows", axis, rows.len() - before);
        }

        Ok((field_size, rows))
    }
}

/// Rows of a flat WIN table; withdrawn runners carry no odds and yield no row
pub fn win_rows(entries: &[WinEntry]) -> Vec<RawRow> {
    entries
        .iter()
        .filter_map(|e| e.odds.map(|odds| RawRow::new(vec![e.position], odds)))
        .collect()
}

/// Rows of one rendered matrix as `[column, row]`, or `[axis, column, row]`
/// when the grid belongs to an axis value
pub fn grid_rows(grid: &OddsGrid, axis: Option<u8>) -> Vec<RawRow> {
    grid.cells
        .iter()
        .map(|cell| {
            let selectors = match axis {
                Some(axis) => vec![axis, cell.column, cell.row],
                None => vec![cell.column, cell.row],
            };
            RawRow::new(selectors, cell.odds)
        })
        .filter(keep_cell)
        .collect()
}

/// Cells pairing a runner with itself are structurally empty
fn keep_cell(row: &RawRow) -> bool {
    if row.is_distinct() {
        true
    } else {
        debug!("Skipping structurally empty cell {:?}", row.selectors);
        false
    }
}
