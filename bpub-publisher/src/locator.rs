//! Ranked element lookup
//!
//! A [`Locator`] names one UI affordance and carries an ordered list of
//! lookup strategies. Strategies are tried in sequence and the first one
//! that matches anything wins. Call sites never hold raw selector lists.

use crate::driver::{EditorDriver, ElementHandle, Selector};
use crate::error::DriverError;

/// Named, ordered list of lookup strategies for one affordance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    name: String,
    strategies: Vec<Selector>,
}

impl Locator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strategies: Vec::new(),
        }
    }

    /// Append a CSS strategy
    pub fn css(mut self, selector: impl Into<String>) -> Self {
        self.strategies.push(Selector::css(selector));
        self
    }

    /// Append an XPath strategy
    pub fn xpath(mut self, selector: impl Into<String>) -> Self {
        self.strategies.push(Selector::xpath(selector));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategies(&self) -> &[Selector] {
        &self.strategies
    }

    /// First element matched by the highest-ranked strategy that matches
    pub async fn locate<D: EditorDriver + ?Sized>(
        &self,
        driver: &mut D,
    ) -> Result<Option<ElementHandle>, DriverError> {
        Ok(self.locate_all(driver).await?.into_iter().next())
    }

    /// All elements matched by the highest-ranked strategy that matches
    pub async fn locate_all<D: EditorDriver + ?Sized>(
        &self,
        driver: &mut D,
    ) -> Result<Vec<ElementHandle>, DriverError> {
        for selector in &self.strategies {
            match driver.find_all(selector).await {
                Ok(found) if !found.is_empty() => {
                    tracing::trace!(locator = %self.name, strategy = %selector, "Located");
                    return Ok(found);
                }
                Ok(_) => {}
                // Invalid selector or transient lookup failure: try the next strategy
                Err(e) if !e.is_session_fatal() => {
                    tracing::debug!(
                        locator = %self.name,
                        strategy = %selector,
                        error = %e,
                        "Lookup strategy failed"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Vec::new())
    }
}
