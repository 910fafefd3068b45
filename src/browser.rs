//! Browser capability contract
//!
//! Every component drives the remote UI through [`Browser`] and never through a
//! concrete WebDriver binding. Implementations own the actual tab; handles
//! returned by the wait calls are only valid until the next re-render, so
//! callers re-fetch them instead of caching.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Browser-level failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BrowserError {
    #[error("timed out after {timeout:?} waiting for {locator}")]
    Timeout { locator: String, timeout: Duration },

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("stale element reference: {0}")]
    StaleElement(String),

    #[error("driver failure: {0}")]
    Driver(String),
}

/// How an element is addressed on the page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    Css(String),
    Xpath(String),
    Id(String),
    ClassName(String),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(v) => write!(f, "css:{}", v),
            Locator::Xpath(v) => write!(f, "xpath:{}", v),
            Locator::Id(v) => write!(f, "id:{}", v),
            Locator::ClassName(v) => write!(f, "class:{}", v),
        }
    }
}

/// Opaque reference to a rendered element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Dropdown option to pick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionChoice {
    Index(usize),
    Value(String),
}

/// Minimal capability set of a single browser tab
#[async_trait]
pub trait Browser: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Wait until the first element matching `locator` is visible
    async fn wait_visible(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ElementHandle, BrowserError>;

    /// Wait until every element matching `locator` is visible
    async fn wait_all_visible(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Vec<ElementHandle>, BrowserError>;

    async fn click(&mut self, element: &ElementHandle) -> Result<(), BrowserError>;

    async fn select_option(
        &mut self,
        element: &ElementHandle,
        choice: &OptionChoice,
    ) -> Result<(), BrowserError>;

    async fn enter_text(&mut self, element: &ElementHandle, text: &str)
        -> Result<(), BrowserError>;

    async fn clear(&mut self, element: &ElementHandle) -> Result<(), BrowserError>;

    /// Outer HTML of the element
    async fn read_markup(&mut self, element: &ElementHandle) -> Result<String, BrowserError>;
}
