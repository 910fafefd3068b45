//! Odds grid markup parser
//!
//! Reads the outer HTML of a rendered odds panel. Three shapes are understood:
//!
//! - matrix grids: the first row holds column position labels (after a corner
//!   cell), every following row starts with its row position label and holds
//!   one odds cell per column. A panel may contain several such tables.
//! - the flat WIN table: one row per runner with a number and an odds column.
//! - the axis dropdown: one `<option>` per runner, placeholders ignored.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::error::{DriverError, MAX_FIELD_SIZE};

/// One populated matrix cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub row: u8,
    pub column: u8,
    pub odds: f64,
}

/// Parsed matrix grid
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OddsGrid {
    pub column_labels: Vec<u8>,
    pub row_labels: Vec<u8>,
    pub cells: Vec<GridCell>,
}

impl OddsGrid {
    /// Every position label seen in headers or row labels
    pub fn labels(&self) -> BTreeSet<u8> {
        self.column_labels
            .iter()
            .chain(self.row_labels.iter())
            .copied()
            .collect()
    }
}

/// One runner of the WIN table; `odds` is `None` for scratched runners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WinEntry {
    pub position: u8,
    pub odds: Option<f64>,
}

/// One selectable axis value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisOption {
    pub position: u8,
    /// `value` attribute used to select the option
    pub value: String,
}

fn selector(css: &str) -> Result<Selector, DriverError> {
    Selector::parse(css).map_err(|e| DriverError::Parse(e.to_string()))
}

fn label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").expect("label pattern is valid"))
}

fn text_of(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Direct `th`/`td` children of a row, ignoring nested tables
fn cells_of<'a>(row: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| matches!(e.value().name(), "th" | "td"))
        .collect()
}

/// Rows belonging to `table` itself, not to tables nested in its cells
fn rows_of<'a>(table: &ElementRef<'a>, tr: &Selector) -> Vec<ElementRef<'a>> {
    table
        .select(tr)
        .filter(|row| {
            row.ancestors()
                .filter_map(ElementRef::wrap)
                .find(|e| e.value().name() == "table")
                .map(|owner| owner.id() == table.id())
                .unwrap_or(false)
        })
        .collect()
}

/// First integer in the text, if it is a valid position number
pub fn parse_position_label(text: &str) -> Option<u8> {
    let digits = label_pattern().find(text)?;
    let position: u8 = digits.as_str().parse().ok()?;
    if (1..=MAX_FIELD_SIZE as u8).contains(&position) {
        Some(position)
    } else {
        None
    }
}

/// Parse an odds cell; empty, dashed, scratched or non-positive cells are unpopulated
pub fn parse_odds_text(text: &str) -> Option<f64> {
    let cleaned = text
        .replace(',', "")
        .replace("欠場", "")
        .replace("取消", "")
        .trim()
        .to_string();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '-' || c == '.') {
        return None;
    }

    let value = cleaned.parse::<f64>().ok()?;
    if value.is_finite() && value > 0.0 {
        Some(value)
    } else {
        None
    }
}

/// Parse every matrix table in the panel markup
pub fn parse_odds_grid(html: &str) -> Result<OddsGrid, DriverError> {
    let fragment = Html::parse_fragment(html);
    let table_selector = selector("table")?;
    let tr_selector = selector("tr")?;

    let mut grid = OddsGrid::default();
    let mut tables = 0;

    for table in fragment.select(&table_selector) {
        let rows = rows_of(&table, &tr_selector);
        let Some((header, body)) = rows.split_first() else {
            continue;
        };
        tables += 1;

        // Columns without a position label (popularity, blanks) keep their slot
        let columns: Vec<Option<u8>> = cells_of(header)
            .iter()
            .skip(1)
            .map(|cell| parse_position_label(&text_of(cell)))
            .collect();

        for column in columns.iter().flatten() {
            if !grid.column_labels.contains(column) {
                grid.column_labels.push(*column);
            }
        }

        for row in body {
            let cells = cells_of(row);
            let Some((label_cell, odds_cells)) = cells.split_first() else {
                continue;
            };
            let Some(row_label) = parse_position_label(&text_of(label_cell)) else {
                continue;
            };

            if !grid.row_labels.contains(&row_label) {
                grid.row_labels.push(row_label);
            }

            for (column, cell) in columns.iter().zip(odds_cells) {
                if let (Some(column), Some(odds)) = (column, parse_odds_text(&text_of(cell))) {
                    grid.cells.push(GridCell {
                        row: row_label,
                        column: *column,
                        odds,
                    });
                }
            }
        }
    }

    if tables == 0 {
        return Err(DriverError::Parse(
            "no odds table found in grid markup".to_string(),
        ));
    }

    Ok(grid)
}

fn header_index(headers: &[String], needles: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let lower = h.to_lowercase();
        needles.iter().any(|n| lower.contains(n))
    })
}

/// Runner-number headers, matched exactly
const NUMBER_HEADERS: [&str; 7] = ["no", "no.", "#", "番号", "馬番", "車番", "艇番"];

/// Column holding the runner number
///
/// Exact runner-number headers win; otherwise a header with "番" that is not a
/// frame/bracket number (`枠番`); otherwise the first column.
fn number_column(headers: &[String]) -> usize {
    let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    normalized
        .iter()
        .position(|h| NUMBER_HEADERS.contains(&h.as_str()))
        .or_else(|| {
            normalized
                .iter()
                .position(|h| h.contains('番') && !h.contains('枠'))
        })
        .unwrap_or(0)
}

/// Parse the flat WIN table
///
/// The odds column is the header mentioning "odds"/"オッズ" (else the last
/// column); see [`number_column`] for the runner-number column.
pub fn parse_win_table(html: &str) -> Result<Vec<WinEntry>, DriverError> {
    let fragment = Html::parse_fragment(html);
    let table_selector = selector("table")?;
    let tr_selector = selector("tr")?;

    let table = fragment
        .select(&table_selector)
        .next()
        .ok_or_else(|| DriverError::Parse("no WIN table found in markup".to_string()))?;

    let rows = rows_of(&table, &tr_selector);
    let Some((header, body)) = rows.split_first() else {
        return Err(DriverError::Parse("WIN table has no rows".to_string()));
    };

    let headers: Vec<String> = cells_of(header).iter().map(text_of).collect();
    let odds_idx = header_index(&headers, &["odds", "オッズ"])
        .unwrap_or_else(|| headers.len().saturating_sub(1));
    let number_idx = number_column(&headers);

    let mut entries: Vec<WinEntry> = Vec::new();
    for row in body {
        let cells = cells_of(row);
        let Some(position) = cells
            .get(number_idx)
            .and_then(|c| parse_position_label(&text_of(c)))
        else {
            continue;
        };
        if entries.iter().any(|e| e.position == position) {
            continue;
        }
        let odds = cells.get(odds_idx).and_then(|c| parse_odds_text(&text_of(c)));
        entries.push(WinEntry { position, odds });
    }

    Ok(entries)
}

/// Parse the axis dropdown's options in rendered order
pub fn parse_axis_options(html: &str) -> Result<Vec<AxisOption>, DriverError> {
    let fragment = Html::parse_fragment(html);
    let option_selector = selector("option")?;

    let mut options: Vec<AxisOption> = Vec::new();
    for option in fragment.select(&option_selector) {
        let value = option
            .value()
            .attr("value")
            .unwrap_or("")
            .trim()
            .to_string();
        let position =
            parse_position_label(&text_of(&option)).or_else(|| parse_position_label(&value));

        if let Some(position) = position {
            if options.iter().any(|o| o.position == position) {
                continue;
            }
            let value = if value.is_empty() {
                position.to_string()
            } else {
                value
            };
            options.push(AxisOption { position, value });
        }
    }

    if options.is_empty() {
        return Err(DriverError::Parse(
            "axis dropdown has no selectable options".to_string(),
        ));
    }

    Ok(options)
}
