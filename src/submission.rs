//! Wager submission orchestrator
//!
//! Drives a validated batch through the voting panel of an open race. Each
//! confirm is a real commitment: nothing is retried, a failing row stops the
//! batch, and the caller receives exactly which rows were sent.
//!
//! There is no read-back after confirm. A processed row means every
//! prerequisite step finished without a timeout before confirm was clicked,
//! not that the site accepted the wager.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

use crate::browser::Browser;
use crate::config::{LayoutTable, LocatorMap};
use crate::error::{validate_amount, validate_selector, DriverError, MAX_FIELD_SIZE};
use crate::models::{WagerRequest, WagerType};
use crate::session::{click_nth, Session};

/// UI step of a single row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitStep {
    SelectTab,
    Reset,
    SelectPosition { slot: usize },
    EnterAmount,
    Confirm,
}

impl fmt::Display for SubmitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitStep::SelectTab => write!(f, "select tab"),
            SubmitStep::Reset => write!(f, "reset"),
            SubmitStep::SelectPosition { slot } => write!(f, "select position {}", slot + 1),
            SubmitStep::EnterAmount => write!(f, "enter amount"),
            SubmitStep::Confirm => write!(f, "confirm"),
        }
    }
}

/// Row whose confirm was invoked
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedWager {
    pub request: WagerRequest,
    /// Reset, selections and amount entry all finished before confirm
    pub prerequisites_completed: bool,
    pub confirmed_at: DateTime<Utc>,
}

/// Row that stopped the batch
#[derive(Debug)]
pub struct FailedWager {
    pub request: WagerRequest,
    pub step: SubmitStep,
    pub error: DriverError,
}

impl FailedWager {
    /// Whether the failure happened on the confirm click itself, in which case
    /// the site may or may not have registered the wager
    pub fn reached_confirm(&self) -> bool {
        self.step == SubmitStep::Confirm
    }
}

/// Result of one batch
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub processed: Vec<SubmittedWager>,
    pub failed_row: Option<FailedWager>,
    pub remaining: Vec<WagerRequest>,
    /// The caller's stop check ended the batch between rows
    pub cancelled: bool,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed_row.is_none() && self.remaining.is_empty() && !self.cancelled
    }

    pub fn total_amount(&self) -> u64 {
        self.processed
            .iter()
            .map(|w| u64::from(w.request.amount))
            .sum()
    }
}

/// Group a batch by wager type in order of first appearance, caller order within groups
pub fn group_by_type(batch: Vec<WagerRequest>) -> Vec<(WagerType, Vec<WagerRequest>)> {
    let mut groups: Vec<(WagerType, Vec<WagerRequest>)> = Vec::new();
    for request in batch {
        match groups.iter_mut().find(|(t, _)| *t == request.wager_type) {
            Some((_, rows)) => rows.push(request),
            None => groups.push((request.wager_type, vec![request])),
        }
    }
    groups
}

/// Check every request before any UI interaction
pub fn validate_request(request: &WagerRequest, layout: &LayoutTable) -> Result<(), DriverError> {
    layout.entry(request.wager_type)?;

    let arity = request.wager_type.arity();
    if request.selections.len() != arity {
        return Err(DriverError::Input(format!(
            "{} needs {} selections, got {} in {}",
            request.wager_type,
            arity,
            request.selections.len(),
            request
        )));
    }

    for &selection in &request.selections {
        validate_selector(selection, MAX_FIELD_SIZE)?;
    }

    let unique: HashSet<u8> = request.selections.iter().copied().collect();
    if unique.len() != request.selections.len() {
        return Err(DriverError::Input(format!(
            "Selections repeat a runner in {}",
            request
        )));
    }

    validate_amount(request.amount)
}

/// Validate a whole batch and return it grouped
pub fn validate_batch(
    batch: Vec<WagerRequest>,
    layout: &LayoutTable,
) -> Result<Vec<(WagerType, Vec<WagerRequest>)>, DriverError> {
    for request in &batch {
        validate_request(request, layout)?;
    }
    Ok(group_by_type(batch))
}

/// Submits wager batches through a session with a race open
pub struct WagerSubmitter<'s, B: Browser> {
    session: &'s mut Session<B>,
}

impl<'s, B: Browser> WagerSubmitter<'s, B> {
    pub fn new(session: &'s mut Session<B>) -> Self {
        Self { session }
    }

    /// Submit every row of the batch
    pub async fn submit(&mut self, batch: Vec<WagerRequest>) -> Result<BatchOutcome, DriverError> {
        self.submit_until(batch, || false).await
    }

    /// Submit rows until `stop` returns true; it is consulted before each row
    ///
    /// Returns `Err` only when the batch is rejected before any UI interaction
    /// (malformed row, unsupported type, no race open).
    pub async fn submit_until<F>(
        &mut self,
        batch: Vec<WagerRequest>,
        mut stop: F,
    ) -> Result<BatchOutcome, DriverError>
    where
        F: FnMut() -> bool,
    {
        let groups = validate_batch(batch, &self.session.config().layout)?;
        self.session.require_race_detail("submit wagers")?;

        let total: usize = groups.iter().map(|(_, rows)| rows.len()).sum();
        info!("Submitting {} wagers in {} groups", total, groups.len());

        let locators = self.session.config().locators.clone();
        let mut outcome = BatchOutcome::default();
        let mut open_type: Option<WagerType> = None;
        let mut pending = groups.into_iter().flat_map(|(_, rows)| rows);

        while let Some(request) = pending.next() {
            if stop() {
                info!("Batch stopped by caller before {}", request);
                outcome.cancelled = true;
                outcome.remaining = std::iter::once(request).chain(pending).collect();
                break;
            }

            let result = if open_type == Some(request.wager_type) {
                self.place(&request, &locators).await
            } else {
                match self.session.select_bet_type(request.wager_type).await {
                    Ok(_) => {
                        open_type = Some(request.wager_type);
                        self.place(&request, &locators).await
                    }
                    Err(error) => Err((SubmitStep::SelectTab, error)),
                }
            };

            match result {
                Ok(confirmed_at) => {
                    info!("Confirmed {}", request);
                    outcome.processed.push(SubmittedWager {
                        request,
                        prerequisites_completed: true,
                        confirmed_at,
                    });
                }
                Err((step, error)) => {
                    warn!("Aborting batch at {} during {}: {}", request, step, error);
                    outcome.failed_row = Some(FailedWager {
                        request,
                        step,
                        error,
                    });
                    outcome.remaining = pending.collect();
                    break;
                }
            }
        }

        Ok(outcome)
    }

    /// Reset, select positions, enter the amount and confirm one row
    async fn place(
        &mut self,
        request: &WagerRequest,
        locators: &LocatorMap,
    ) -> Result<DateTime<Utc>, (SubmitStep, DriverError)> {
        let (browser, config) = self.session.split();
        let timeout = config.session.timeout();

        // Residual selections and amount from any earlier row are never trusted
        if let Some(reset) = &locators.reset_button {
            let button = browser
                .wait_visible(reset, timeout)
                .await
                .map_err(failed_at(SubmitStep::Reset))?;
            browser
                .click(&button)
                .await
                .map_err(failed_at(SubmitStep::Reset))?;
        }
        let amount_field = browser
            .wait_visible(&locators.amount_field, timeout)
            .await
            .map_err(failed_at(SubmitStep::Reset))?;
        browser
            .clear(&amount_field)
            .await
            .map_err(failed_at(SubmitStep::Reset))?;

        for (slot, &selection) in request.selections.iter().enumerate() {
            let step = SubmitStep::SelectPosition { slot };
            let locator = locators.position_buttons.slot(slot).ok_or_else(|| {
                (
                    step,
                    DriverError::Input(format!("no position slot {}", slot + 1)),
                )
            })?;
            click_nth(browser, locator, usize::from(selection) - 1, timeout)
                .await
                .map_err(failed_at(step))?;
            debug!("Selected {} for position {}", selection, slot + 1);
        }

        let amount_field = browser
            .wait_visible(&locators.amount_field, timeout)
            .await
            .map_err(failed_at(SubmitStep::EnterAmount))?;
        browser
            .enter_text(&amount_field, &request.amount.to_string())
            .await
            .map_err(failed_at(SubmitStep::EnterAmount))?;

        let confirm = browser
            .wait_visible(&locators.confirm_button, timeout)
            .await
            .map_err(failed_at(SubmitStep::Confirm))?;
        browser
            .click(&confirm)
            .await
            .map_err(failed_at(SubmitStep::Confirm))?;

        Ok(Utc::now())
    }
}

fn failed_at<E: Into<DriverError>>(
    step: SubmitStep,
) -> impl FnOnce(E) -> (SubmitStep, DriverError) {
    move |e| (step, e.into())
}
