//! Navigation state machine over one browser tab
//!
//! `Unstarted --enter()--> Overview --select_course(idx)--> CourseSelected
//! --select_race(n)--> RaceDetail`. Every transition blocks until its target
//! element is visible and leaves the state untouched when it fails.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::browser::{Browser, BrowserError, ElementHandle, Locator};
use crate::config::{DriverConfig, LayoutEntry};
use crate::error::{validate_race_no, DriverError};
use crate::models::WagerType;

/// Position within the interactive UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Unstarted,
    Overview,
    CourseSelected {
        course: usize,
    },
    RaceDetail {
        course: usize,
        race: u8,
        /// Axis currently rendered by a three-position extraction
        axis: Option<u8>,
    },
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unstarted => write!(f, "Unstarted"),
            SessionState::Overview => write!(f, "Overview"),
            SessionState::CourseSelected { course } => {
                write!(f, "CourseSelected(course {})", course)
            }
            SessionState::RaceDetail { course, race, .. } => {
                write!(f, "RaceDetail(course {}, race {})", course, race)
            }
        }
    }
}

/// One browser session and its navigation state
///
/// All operations take `&mut self`; a session is never shared between
/// concurrent workflows.
pub struct Session<B: Browser> {
    browser: B,
    config: DriverConfig,
    state: SessionState,
}

impl<B: Browser> Session<B> {
    pub fn new(browser: B, config: DriverConfig) -> Self {
        Self {
            browser,
            config,
            state: SessionState::Unstarted,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    /// End the session and hand back the browser
    pub fn into_browser(self) -> B {
        self.browser
    }

    /// Open the entry page and wait for the course overview
    pub async fn enter(&mut self) -> Result<(), DriverError> {
        if self.state != SessionState::Unstarted {
            return Err(self.invalid("enter"));
        }

        let timeout = self.config.session.timeout();
        let locators = &self.config.locators;

        info!("Opening {}", locators.entry_url);
        self.browser.navigate(&locators.entry_url).await?;
        self.browser
            .wait_visible(&locators.course_links, timeout)
            .await?;

        self.state = SessionState::Overview;
        Ok(())
    }

    /// Open the course at `course` (zero-based, in rendered order)
    pub async fn select_course(&mut self, course: usize) -> Result<(), DriverError> {
        if self.state != SessionState::Overview {
            return Err(self.invalid("select a course"));
        }

        let timeout = self.config.session.timeout();
        let locators = &self.config.locators;

        let links = self
            .browser
            .wait_all_visible(&locators.course_links, timeout)
            .await?;
        let link = links.get(course).ok_or_else(|| {
            DriverError::Input(format!(
                "Course index {} out of range, {} courses rendered",
                course,
                links.len()
            ))
        })?;

        self.browser.click(link).await?;
        self.browser.wait_visible(&locators.race_links, timeout).await?;

        info!("Selected course {}", course);
        self.state = SessionState::CourseSelected { course };
        Ok(())
    }

    /// Open race `race_no` (1-12) of the selected course
    pub async fn select_race(&mut self, race_no: u8) -> Result<(), DriverError> {
        let SessionState::CourseSelected { course } = self.state else {
            return Err(self.invalid("select a race"));
        };
        validate_race_no(race_no)?;

        let timeout = self.config.session.timeout();
        let locators = &self.config.locators;

        let buttons = self
            .browser
            .wait_all_visible(&locators.race_links, timeout)
            .await?;
        let button = buttons.get(usize::from(race_no) - 1).ok_or_else(|| {
            DriverError::Input(format!(
                "Race {} not offered, {} races rendered",
                race_no,
                buttons.len()
            ))
        })?;

        self.browser.click(button).await?;
        self.browser.wait_visible(&locators.race_panel, timeout).await?;

        info!("Selected race {} at course {}", race_no, course);
        self.state = SessionState::RaceDetail {
            course,
            race: race_no,
            axis: None,
        };
        Ok(())
    }

    /// Whether odds are published for the open race
    ///
    /// Waits up to the configured timeout for the bet-type navigation; a
    /// timeout means no odds, any other browser failure is an error.
    pub async fn odds_available(&mut self) -> Result<bool, DriverError> {
        self.require_race_detail("check odds availability")?;

        let timeout = self.config.session.timeout();
        match self
            .browser
            .wait_visible(&self.config.locators.bet_type_tabs, timeout)
            .await
        {
            Ok(_) => Ok(true),
            Err(BrowserError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Click the parent tab and sub-tab of a bet type
    pub(crate) async fn select_bet_type(
        &mut self,
        wager_type: WagerType,
    ) -> Result<LayoutEntry, DriverError> {
        self.require_race_detail("select a bet type")?;
        let entry = self.config.layout.entry(wager_type)?;
        let locators = &self.config.locators;

        click_nth(
            &mut self.browser,
            &locators.bet_type_tabs,
            entry.tab_index,
            self.config.session.timeout(),
        )
        .await?;

        if let Some(sub_tab) = entry.sub_tab_index {
            click_nth(
                &mut self.browser,
                &locators.sub_tabs,
                sub_tab,
                self.config.session.timeout(),
            )
            .await?;
        }

        debug!(
            "Opened {} tab {} / sub-tab {:?}",
            wager_type, entry.tab_index, entry.sub_tab_index
        );
        Ok(entry)
    }

    /// Record the axis currently rendered
    pub(crate) fn set_axis(&mut self, value: u8) -> Result<(), DriverError> {
        if let SessionState::RaceDetail { axis, .. } = &mut self.state {
            *axis = Some(value);
            return Ok(());
        }
        Err(self.invalid("set the extraction axis"))
    }

    pub(crate) fn require_race_detail(&self, action: &'static str) -> Result<(), DriverError> {
        match self.state {
            SessionState::RaceDetail { .. } => Ok(()),
            _ => Err(self.invalid(action)),
        }
    }

    /// Browser and configuration borrowed together
    pub(crate) fn split(&mut self) -> (&mut B, &DriverConfig) {
        (&mut self.browser, &self.config)
    }

    fn invalid(&self, action: &'static str) -> DriverError {
        DriverError::State {
            action,
            state: self.state.to_string(),
        }
    }
}

/// Wait for all elements matching `locator` and click the one at `index`
pub(crate) async fn click_nth<B: Browser>(
    browser: &mut B,
    locator: &Locator,
    index: usize,
    timeout: std::time::Duration,
) -> Result<ElementHandle, DriverError> {
    let elements = browser.wait_all_visible(locator, timeout).await?;
    let element = elements
        .get(index)
        .cloned()
        .ok_or_else(|| BrowserError::ElementNotFound(format!("{}[{}]", locator, index)))?;
    browser.click(&element).await?;
    Ok(element)
}
