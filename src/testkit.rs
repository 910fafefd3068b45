//! Scripted in-memory browser and markup builders for unit tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::browser::{Browser, BrowserError, ElementHandle, Locator, OptionChoice};
use crate::config::{DriverConfig, LayoutTable, LocatorMap, PositionButtons, SessionConfig};

/// Browser call recorded by [`FakeBrowser`]
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Action {
    Navigate(String),
    Wait(String),
    Click(String),
    Select(String, OptionChoice),
    EnterText(String, String),
    Clear(String),
    ReadMarkup(String),
}

/// In-memory page: locators resolve to fixed element ids, markup is static
/// except for the odds grid, which is swapped when the axis dropdown changes.
#[derive(Debug, Default)]
pub(crate) struct FakeBrowser {
    elements: HashMap<Locator, Vec<ElementHandle>>,
    hidden: HashSet<Locator>,
    markup: HashMap<String, String>,
    axis_pages: HashMap<String, String>,
    grid: Option<(Locator, String)>,
    fail_clicks: HashMap<String, usize>,
    click_counts: HashMap<String, usize>,
    pub actions: Vec<Action>,
}

impl FakeBrowser {
    pub fn with_elements(mut self, locator: Locator, ids: &[String]) -> Self {
        self.elements
            .insert(locator, ids.iter().map(ElementHandle::new).collect());
        self
    }

    pub fn set_markup(&mut self, id: &str, html: String) {
        self.markup.insert(id.to_string(), html);
    }

    pub fn hide(&mut self, locator: &Locator) {
        self.hidden.insert(locator.clone());
    }

    /// Grid markup per dropdown option value; unknown values hide the grid
    pub fn set_axis_pages(&mut self, pages: Vec<(String, String)>) {
        let grid_locator = test_config().locators.odds_grid;
        self.grid = Some((grid_locator, "grid".to_string()));
        self.axis_pages = pages.into_iter().collect();
    }

    /// Fail the `nth` (1-based) click on element `id`
    pub fn fail_click(&mut self, id: &str, nth: usize) {
        self.fail_clicks.insert(id.to_string(), nth);
    }

    pub fn clicks(&self) -> Vec<&str> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                Action::Click(id) => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }

    fn visible(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<&Vec<ElementHandle>, BrowserError> {
        match self.elements.get(locator) {
            Some(elements) if !elements.is_empty() && !self.hidden.contains(locator) => {
                Ok(elements)
            }
            _ => Err(BrowserError::Timeout {
                locator: locator.to_string(),
                timeout,
            }),
        }
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.actions.push(Action::Navigate(url.to_string()));
        Ok(())
    }

    async fn wait_visible(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ElementHandle, BrowserError> {
        self.actions.push(Action::Wait(locator.to_string()));
        let first = self.visible(locator, timeout)?[0].clone();
        Ok(first)
    }

    async fn wait_all_visible(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Vec<ElementHandle>, BrowserError> {
        self.actions.push(Action::Wait(locator.to_string()));
        Ok(self.visible(locator, timeout)?.clone())
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), BrowserError> {
        let count = self
            .click_counts
            .entry(element.id().to_string())
            .or_insert(0);
        *count += 1;
        let count = *count;
        if self.fail_clicks.get(element.id()) == Some(&count) {
            return Err(BrowserError::Timeout {
                locator: element.id().to_string(),
                timeout: Duration::from_secs(1),
            });
        }
        self.actions.push(Action::Click(element.id().to_string()));
        Ok(())
    }

    async fn select_option(
        &mut self,
        element: &ElementHandle,
        choice: &OptionChoice,
    ) -> Result<(), BrowserError> {
        self.actions
            .push(Action::Select(element.id().to_string(), choice.clone()));

        if let (Some((locator, grid_id)), OptionChoice::Value(value)) = (&self.grid, choice) {
            match self.axis_pages.get(value) {
                Some(page) => {
                    self.markup.insert(grid_id.clone(), page.clone());
                    self.hidden.remove(locator);
                }
                None => {
                    self.hidden.insert(locator.clone());
                }
            }
        }
        Ok(())
    }

    async fn enter_text(
        &mut self,
        element: &ElementHandle,
        text: &str,
    ) -> Result<(), BrowserError> {
        self.actions
            .push(Action::EnterText(element.id().to_string(), text.to_string()));
        Ok(())
    }

    async fn clear(&mut self, element: &ElementHandle) -> Result<(), BrowserError> {
        self.actions.push(Action::Clear(element.id().to_string()));
        Ok(())
    }

    async fn read_markup(&mut self, element: &ElementHandle) -> Result<String, BrowserError> {
        self.actions.push(Action::ReadMarkup(element.id().to_string()));
        self.markup
            .get(element.id())
            .cloned()
            .ok_or_else(|| BrowserError::ElementNotFound(element.id().to_string()))
    }
}

pub(crate) fn test_locators() -> LocatorMap {
    LocatorMap {
        entry_url: "https://example.invalid/odds".to_string(),
        course_links: Locator::Css("a.course".into()),
        race_links: Locator::Css("button.race".into()),
        race_panel: Locator::Id("race_panel".into()),
        bet_type_tabs: Locator::Css("nav.types button".into()),
        sub_tabs: Locator::Css("nav.sub button".into()),
        axis_dropdown: Locator::Id("axis".into()),
        odds_grid: Locator::Css("div.grid".into()),
        position_buttons: PositionButtons {
            first: Locator::Css(".first button".into()),
            second: Locator::Css(".second button".into()),
            third: Locator::Css(".third button".into()),
        },
        amount_field: Locator::Css("input.amount".into()),
        confirm_button: Locator::Css("button.confirm".into()),
        reset_button: Some(Locator::Css("button.reset".into())),
    }
}

pub(crate) fn test_config() -> DriverConfig {
    DriverConfig::new(
        SessionConfig {
            timeout_secs: 1,
            settle_ms: 0,
            headless: true,
        },
        test_locators(),
        LayoutTable::default(),
    )
}

fn ids(prefix: &str, range: impl Iterator<Item = usize>) -> Vec<String> {
    range.map(|i| format!("{}-{}", prefix, i)).collect()
}

/// Fully rendered site with three courses, twelve races and `field_size` runners
pub(crate) fn fake_site(field_size: usize) -> FakeBrowser {
    let l = test_locators();
    FakeBrowser::default()
        .with_elements(l.course_links, &ids("course", 0..3))
        .with_elements(l.race_links, &ids("race", 1..13))
        .with_elements(l.race_panel, &["panel".to_string()])
        .with_elements(l.bet_type_tabs, &ids("tab", 0..4))
        .with_elements(l.sub_tabs, &ids("sub", 0..2))
        .with_elements(l.axis_dropdown, &["axis".to_string()])
        .with_elements(l.odds_grid, &["grid".to_string()])
        .with_elements(l.position_buttons.first, &ids("first", 1..field_size + 1))
        .with_elements(l.position_buttons.second, &ids("second", 1..field_size + 1))
        .with_elements(l.position_buttons.third, &ids("third", 1..field_size + 1))
        .with_elements(l.amount_field, &["amount".to_string()])
        .with_elements(l.confirm_button, &["confirm".to_string()])
        .with_elements(l.reset_button.unwrap(), &["reset".to_string()])
}

/// Odds matrix: header row of column labels, one body row per row label
pub(crate) fn matrix_html(
    columns: &[u8],
    rows: &[u8],
    odds: impl Fn(u8, u8) -> Option<f64>,
) -> String {
    let mut html = String::from("<div class=\"grid\"><table><thead><tr><th></th>");
    for c in columns {
        html.push_str(&format!("<th>{}</th>", c));
    }
    html.push_str("</tr></thead><tbody>");
    for &r in rows {
        html.push_str(&format!("<tr><th>{}</th>", r));
        for &c in columns {
            match odds(r, c) {
                Some(v) => html.push_str(&format!("<td>{:.1}</td>", v)),
                None => html.push_str("<td>-</td>"),
            }
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table></div>");
    html
}

/// Flat WIN table with number, name and odds columns
pub(crate) fn win_html(entries: &[(u8, Option<f64>)]) -> String {
    let mut html = String::from(
        "<div class=\"grid\"><table><tr><th>No</th><th>Name</th><th>Odds</th></tr>",
    );
    for (no, odds) in entries {
        let cell = odds.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "取消".to_string());
        html.push_str(&format!(
            "<tr><td>{}</td><td>Runner {}</td><td>{}</td></tr>",
            no, no, cell
        ));
    }
    html.push_str("</table></div>");
    html
}

/// Axis dropdown with a placeholder and one option per runner
pub(crate) fn dropdown_html(field_size: u8) -> String {
    let mut html = String::from("<select id=\"axis\"><option value=\"\">--</option>");
    for i in 1..=field_size {
        html.push_str(&format!("<option value=\"{}\">{}</option>", i, i));
    }
    html.push_str("</select>");
    html
}
