//! Click-intercept escalation.
//!
//! A located element can still refuse a pointer click: a cookie banner
//! overlays it, a sticky header absorbs the hit, a styled wrapper sits on
//! top of a visually-hidden input. This ladder is tried rung by rung,
//! terminal on the first success:
//!
//!   label click -> script click -> ancestor click -> proximity click
//!   -> scroll-then-click
//!
//! Each rung swallows its own failure and the next rung runs; if every
//! rung fails the caller surfaces the original click error.

use anyhow::Result;
use std::sync::Arc;

use crate::driver::traits::{BrowserDriver, ElementRef, WaitCondition};
use crate::utils::Config;

use super::locator::Strategy;

/// Tags that commonly own the real click handler.
const CLICKABLE_TAGS: &[&str] = &["label", "button", "a", "div"];

/// Form controls a `<label for=…>` may be wired to.
const INPUT_LIKE_TAGS: &[&str] = &["input", "textarea", "select"];

pub struct ClickInterceptResolver {
    driver: Arc<dyn BrowserDriver>,
    config: Config,
}

impl ClickInterceptResolver {
    pub fn new(driver: Arc<dyn BrowserDriver>, config: Config) -> Self {
        Self { driver, config }
    }

    /// Run the ladder for an element whose direct click was intercepted.
    /// Returns `true` as soon as one rung lands a click; `false` when the
    /// ladder is exhausted.
    pub async fn resolve(&self, element: &ElementRef) -> Result<bool> {
        if rung("label-probe", self.label_probe(element).await) {
            return Ok(true);
        }
        if rung("script-click", self.script_click(element).await) {
            return Ok(true);
        }
        if rung("ancestor-click", self.ancestor_click(element).await) {
            return Ok(true);
        }
        if rung("proximity-click", self.proximity_click(element).await) {
            return Ok(true);
        }
        if rung("scroll-then-click", self.scroll_then_click(element).await) {
            return Ok(true);
        }

        log::warn!("click intercept ladder exhausted for <{}>", element.tag);
        Ok(false)
    }

    /// Click the `<label>` wired to the control instead. Only meaningful
    /// for form controls.
    async fn label_probe(&self, element: &ElementRef) -> Result<bool> {
        if !INPUT_LIKE_TAGS.contains(&element.tag.as_str()) {
            return Ok(false);
        }

        for attr in ["id", "name"] {
            let Some(value) = self.driver.attribute(element, attr).await? else {
                continue;
            };
            if value.is_empty() {
                continue;
            }

            let strategy = Strategy::xpath(format!("//label[@for='{}']", value));
            if let Some(label) = self
                .driver
                .find(&strategy, WaitCondition::Clickable, self.config.probe_timeout_ms)
                .await?
            {
                if self.driver.click(&label).await.is_ok() {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Invoke the DOM click directly, skipping pointer-geometry checks.
    async fn script_click(&self, element: &ElementRef) -> Result<bool> {
        self.driver.script_click(element).await?;
        Ok(true)
    }

    /// The styled wrapper often owns the handler: walk up a few levels and
    /// click the first clickable ancestor.
    async fn ancestor_click(&self, element: &ElementRef) -> Result<bool> {
        let mut current = element.clone();
        for _ in 0..self.config.max_ancestor_levels {
            let Some(parent) = self.driver.parent(&current).await? else {
                return Ok(false);
            };
            if CLICKABLE_TAGS.contains(&parent.tag.as_str())
                && self.driver.click(&parent).await.is_ok()
            {
                return Ok(true);
            }
            current = parent;
        }
        Ok(false)
    }

    /// Find a clickable element whose box origin sits within the proximity
    /// threshold of the target's and click that instead.
    async fn proximity_click(&self, element: &ElementRef) -> Result<bool> {
        let Some(target_box) = self.driver.bounding_box(element).await? else {
            return Ok(false);
        };

        for tag in CLICKABLE_TAGS {
            let strategy = Strategy::xpath(format!("//{}", tag));
            for candidate in self.driver.query_all(&strategy).await? {
                if candidate.id == element.id {
                    continue;
                }
                let Some(candidate_box) = self.driver.bounding_box(&candidate).await? else {
                    continue;
                };
                let dx = candidate_box.x - target_box.x;
                let dy = candidate_box.y - target_box.y;
                if (dx * dx + dy * dy).sqrt() <= self.config.proximity_threshold_px
                    && self.driver.click(&candidate).await.is_ok()
                {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// The element may simply be out of the viewport: center it and retry
    /// the direct click once.
    async fn scroll_then_click(&self, element: &ElementRef) -> Result<bool> {
        self.driver.scroll_into_view(element).await?;
        self.driver.click(element).await?;
        Ok(true)
    }
}

/// A rung's own failure never aborts the ladder; it just moves on.
fn rung(name: &str, outcome: Result<bool>) -> bool {
    match outcome {
        Ok(true) => {
            log::info!("intercepted click recovered via {}", name);
            true
        }
        Ok(false) => {
            log::debug!("intercept rung {} did not apply", name);
            false
        }
        Err(e) => {
            log::debug!("intercept rung {} failed: {:#}", name, e);
            false
        }
    }
}
