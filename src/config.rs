//! Driver configuration: session timing, locator map and bet-type layout
//!
//! Loaded from TOML. Locators are owned entirely by the configuration; the
//! library never embeds a site-specific selector.
//!
//! ```toml
//! [session]
//! timeout_secs = 10
//! settle_ms = 200
//!
//! [locators]
//! entry_url = "https://example.invalid/odds"
//! course_links = { css = "ul.courses a" }
//! # ...
//!
//! [layout.exacta]
//! tab = 1
//! sub_tab = 0
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::browser::Locator;
use crate::error::DriverError;
use crate::models::WagerType;

/// Session timing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Deadline for every visibility wait, in seconds
    pub timeout_secs: u64,
    /// Pause after re-selecting the axis dropdown, in milliseconds
    pub settle_ms: u64,
    /// Hint for the browser binding; this crate does not launch browsers itself
    pub headless: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            settle_ms: 200,
            headless: true,
        }
    }
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Buttons for each finishing position, one element per competitor in field order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionButtons {
    pub first: Locator,
    pub second: Locator,
    pub third: Locator,
}

impl PositionButtons {
    /// Locator for the zero-based position slot
    pub fn slot(&self, position: usize) -> Option<&Locator> {
        match position {
            0 => Some(&self.first),
            1 => Some(&self.second),
            2 => Some(&self.third),
            _ => None,
        }
    }
}

/// Logical UI roles mapped to concrete locators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatorMap {
    pub entry_url: String,
    pub course_links: Locator,
    pub race_links: Locator,
    /// Rendered once a race is open
    pub race_panel: Locator,
    pub bet_type_tabs: Locator,
    pub sub_tabs: Locator,
    pub axis_dropdown: Locator,
    pub odds_grid: Locator,
    pub position_buttons: PositionButtons,
    pub amount_field: Locator,
    pub confirm_button: Locator,
    #[serde(default)]
    pub reset_button: Option<Locator>,
}

/// Tab placement of one bet type as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSpec {
    pub tab: usize,
    #[serde(default)]
    pub sub_tab: Option<usize>,
}

/// Validated layout entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutEntry {
    pub tab_index: usize,
    pub sub_tab_index: Option<usize>,
    pub arity: usize,
    pub ordered: bool,
}

impl LayoutEntry {
    fn from_spec(wager_type: WagerType, spec: LayoutSpec) -> Self {
        Self {
            tab_index: spec.tab,
            sub_tab_index: spec.sub_tab,
            arity: wager_type.arity(),
            ordered: wager_type.ordered(),
        }
    }
}

/// Enum-indexed bet-type layout; a missing entry means the surface lacks that type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutTable {
    entries: [Option<LayoutEntry>; 6],
}

fn slot_of(wager_type: WagerType) -> usize {
    match wager_type {
        WagerType::Win => 0,
        WagerType::Quinella => 1,
        WagerType::Wide => 2,
        WagerType::Exacta => 3,
        WagerType::TrioBox => 4,
        WagerType::TrioExact => 5,
    }
}

impl LayoutTable {
    /// Build and validate the table; two types may never share a tab position
    pub fn new(specs: &BTreeMap<WagerType, LayoutSpec>) -> Result<Self, DriverError> {
        let mut entries = [None; 6];

        for (&wager_type, spec) in specs {
            for (&other_type, other) in specs.range(..wager_type) {
                let clash = spec.tab == other.tab
                    && (spec.sub_tab == other.sub_tab
                        || spec.sub_tab.is_none()
                        || other.sub_tab.is_none());
                if clash {
                    return Err(DriverError::Config(format!(
                        "{} and {} both map to tab {}",
                        other_type, wager_type, spec.tab
                    )));
                }
            }

            entries[slot_of(wager_type)] = Some(LayoutEntry::from_spec(wager_type, *spec));
        }

        Ok(Self { entries })
    }

    /// Layout entry for a type, or `UnsupportedBetType`
    pub fn entry(&self, wager_type: WagerType) -> Result<LayoutEntry, DriverError> {
        self.entries[slot_of(wager_type)].ok_or(DriverError::UnsupportedBetType(wager_type))
    }

    pub fn supports(&self, wager_type: WagerType) -> bool {
        self.entries[slot_of(wager_type)].is_some()
    }

    /// Supported types with their entries, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (WagerType, LayoutEntry)> + '_ {
        WagerType::ALL
            .into_iter()
            .filter_map(move |t| self.entries[slot_of(t)].map(|e| (t, e)))
    }
}

/// Ordered types share one parent tab, unordered pairs another, trio box its own
pub fn default_layout_specs() -> BTreeMap<WagerType, LayoutSpec> {
    BTreeMap::from([
        (WagerType::Win, LayoutSpec { tab: 0, sub_tab: None }),
        (WagerType::Exacta, LayoutSpec { tab: 1, sub_tab: Some(0) }),
        (WagerType::TrioExact, LayoutSpec { tab: 1, sub_tab: Some(1) }),
        (WagerType::Quinella, LayoutSpec { tab: 2, sub_tab: Some(0) }),
        (WagerType::Wide, LayoutSpec { tab: 2, sub_tab: Some(1) }),
        (WagerType::TrioBox, LayoutSpec { tab: 3, sub_tab: None }),
    ])
}

impl Default for LayoutTable {
    fn default() -> Self {
        let mut entries = [None; 6];
        for (wager_type, spec) in default_layout_specs() {
            entries[slot_of(wager_type)] = Some(LayoutEntry::from_spec(wager_type, spec));
        }
        Self { entries }
    }
}

#[derive(Debug, Deserialize)]
struct DriverConfigFile {
    #[serde(default)]
    session: SessionConfig,
    locators: LocatorMap,
    #[serde(default)]
    layout: Option<BTreeMap<WagerType, LayoutSpec>>,
}

/// Complete driver configuration
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub session: SessionConfig,
    pub locators: LocatorMap,
    pub layout: LayoutTable,
}

impl DriverConfig {
    pub fn new(session: SessionConfig, locators: LocatorMap, layout: LayoutTable) -> Self {
        Self {
            session,
            locators,
            layout,
        }
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, DriverError> {
        let file: DriverConfigFile =
            toml::from_str(content).map_err(|e| DriverError::Config(e.to_string()))?;

        let layout = match file.layout {
            Some(specs) => LayoutTable::new(&specs)?,
            None => LayoutTable::new(&default_layout_specs())?,
        };

        if file.session.timeout_secs == 0 {
            return Err(DriverError::Config(
                "session.timeout_secs must be positive".to_string(),
            ));
        }

        Ok(Self {
            session: file.session,
            locators: file.locators,
            layout,
        })
    }

    /// Load from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DriverError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| DriverError::Config(format!("failed to read {:?}: {}", path, e)))?;
        Self::from_toml_str(&content)
    }
}
