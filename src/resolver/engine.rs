//! The resolver: original locator, then cache, then candidates.
//!
//! Tier order is deliberate. The exact locator under a generous wait is
//! the common case and costs one round-trip; the cached strategy is one
//! more; only then does the engine pay for candidate generation and a
//! probe per candidate. Probes run strictly sequentially; the browser
//! session does not tolerate concurrent command dispatch.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use crate::driver::traits::{BrowserDriver, ElementRef, WaitCondition};
use crate::parser::types::{Action, Locator, LocatorKind};
use crate::utils::Config;

use super::cache::StrategyCache;
use super::candidates::build_candidates;
use super::locator::Strategy;
use super::ResolveError;

/// Map an action onto its natural wait condition.
pub fn wait_condition_for(action: Action) -> WaitCondition {
    match action {
        Action::Click => WaitCondition::Clickable,
        Action::WaitForElementVisible => WaitCondition::Visible,
        _ => WaitCondition::Present,
    }
}

/// Per-run adaptive resolver. Owns the strategy cache for its lifetime;
/// one instance per browser session, used sequentially.
pub struct Resolver {
    driver: Arc<dyn BrowserDriver>,
    cache: StrategyCache,
    config: Config,
}

impl Resolver {
    pub fn new(driver: Arc<dyn BrowserDriver>, config: Config) -> Self {
        Self {
            driver,
            cache: StrategyCache::new(),
            config,
        }
    }

    /// Turn a locator into a live element handle.
    ///
    /// `Ok(None)` means every tier was exhausted; the caller converts that
    /// into the step's domain failure. `Err` is reserved for driver
    /// failures and configuration errors, never for plain absence.
    pub async fn resolve(
        &mut self,
        action: Action,
        locator: &Locator,
        input_value: Option<&str>,
    ) -> Result<Option<ElementRef>> {
        match action {
            Action::Goto | Action::WaitForRedirect => {
                return Err(ResolveError::UnsupportedAction(action).into());
            }
            _ => {}
        }
        if locator.kind == LocatorKind::Url {
            return Err(ResolveError::UnsupportedLocatorKind(locator.kind).into());
        }

        let condition = wait_condition_for(action);

        // Tier 1: the locator as recorded, full wait. A hit here is the
        // happy path, not a fallback, so nothing is cached.
        let original = Strategy::from_locator(locator);
        if let Some(element) = self
            .driver
            .find(&original, condition, self.config.primary_timeout_ms)
            .await?
        {
            return Ok(Some(element));
        }

        log::info!("locator failed, entering fallback: {} {}", action, locator);

        // Tier 2: the strategy that worked last time, short probe.
        if let Some(cached) = self.cache.get(action, locator).cloned() {
            log::debug!("trying cached strategy: {}", cached);
            match self
                .driver
                .find(&cached, condition, self.config.probe_timeout_ms)
                .await?
            {
                Some(element) => {
                    log::info!("cached strategy resolved {}: {}", locator, cached);
                    return Ok(Some(element));
                }
                None => {
                    log::debug!("cached strategy failed: {}", cached);
                    self.cache.evict(action, locator);
                }
            }
        }

        // Tier 3: synthesized candidates, in priority order.
        let candidates = build_candidates(locator, action, input_value);
        log::debug!("generated {} candidates for {}", candidates.len(), locator);

        let last_index = candidates.len().saturating_sub(1);
        for (index, strategy) in candidates.iter().enumerate() {
            if index > 0 && self.config.fallback_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.fallback_delay_ms)).await;
            }

            match self
                .driver
                .find(strategy, condition, self.config.probe_timeout_ms)
                .await?
            {
                Some(element) => {
                    if index < last_index {
                        self.cache.put(action, locator.clone(), strategy.clone());
                    } else {
                        // The most desperate fallback is the likeliest
                        // coincidental match; it is never remembered.
                        log::debug!("not caching last-resort strategy: {}", strategy);
                    }
                    log::info!("fallback resolved {} via {}", locator, strategy);
                    return Ok(Some(element));
                }
                None => continue,
            }
        }

        log::warn!("all strategies exhausted for {} {}", action, locator);
        Ok(None)
    }

    /// Cached strategy for a key, if present. Exposed for the runner's
    /// diagnostics and for tests.
    pub fn cached_strategy(&self, action: Action, locator: &Locator) -> Option<&Strategy> {
        self.cache.get(action, locator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::traits::Rect;
    use crate::parser::types::LocatorKind;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    /// Scripted driver: a fixed set of strategy expressions "exist" on the
    /// page; every find call is recorded.
    #[derive(Default)]
    struct FakeDriver {
        present: Mutex<Vec<String>>,
        finds: Mutex<Vec<String>>,
    }

    impl FakeDriver {
        fn with_present(values: &[&str]) -> Self {
            Self {
                present: Mutex::new(values.iter().map(|s| s.to_string()).collect()),
                finds: Mutex::new(Vec::new()),
            }
        }

        fn find_count(&self) -> usize {
            self.finds.lock().unwrap().len()
        }

        fn set_present(&self, values: &[&str]) {
            *self.present.lock().unwrap() = values.iter().map(|s| s.to_string()).collect();
        }
    }

    #[async_trait]
    impl BrowserDriver for FakeDriver {
        async fn goto(&self, _url: &str) -> Result<()> {
            Ok(())
        }

        async fn current_url(&self) -> Result<String> {
            Ok("https://example.com/".to_string())
        }

        async fn find(
            &self,
            strategy: &Strategy,
            _condition: WaitCondition,
            _timeout_ms: u64,
        ) -> Result<Option<ElementRef>> {
            self.finds.lock().unwrap().push(strategy.value.clone());
            let present = self.present.lock().unwrap();
            if present.iter().any(|p| p == &strategy.value) {
                Ok(Some(ElementRef {
                    id: 1,
                    tag: "a".to_string(),
                }))
            } else {
                Ok(None)
            }
        }

        async fn query_all(&self, _strategy: &Strategy) -> Result<Vec<ElementRef>> {
            Ok(Vec::new())
        }

        async fn click(&self, _element: &ElementRef) -> Result<()> {
            Ok(())
        }

        async fn fill(&self, _element: &ElementRef, _value: &str) -> Result<()> {
            Ok(())
        }

        async fn select_option(&self, _element: &ElementRef, _value: &str) -> Result<()> {
            Ok(())
        }

        async fn script_click(&self, _element: &ElementRef) -> Result<()> {
            Ok(())
        }

        async fn attribute(&self, _element: &ElementRef, _name: &str) -> Result<Option<String>> {
            Ok(None)
        }

        async fn bounding_box(&self, _element: &ElementRef) -> Result<Option<Rect>> {
            Ok(None)
        }

        async fn parent(&self, _element: &ElementRef) -> Result<Option<ElementRef>> {
            Ok(None)
        }

        async fn scroll_into_view(&self, _element: &ElementRef) -> Result<()> {
            Ok(())
        }

        async fn screenshot(&self, _path: &Path) -> Result<()> {
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    fn fast_config() -> Config {
        Config {
            primary_timeout_ms: 0,
            probe_timeout_ms: 0,
            fallback_delay_ms: 0,
            ..Config::default()
        }
    }

    fn resolver_with(driver: Arc<FakeDriver>) -> Resolver {
        Resolver::new(driver, fast_config())
    }

    #[tokio::test]
    async fn test_happy_path_is_single_probe_and_uncached() {
        let driver = Arc::new(FakeDriver::with_present(&["//button[@id='go']"]));
        let mut resolver = resolver_with(driver.clone());
        let locator = Locator::new(LocatorKind::Xpath, "//button[@id='go']");

        let element = resolver
            .resolve(Action::Click, &locator, None)
            .await
            .unwrap();

        assert!(element.is_some());
        assert_eq!(driver.find_count(), 1);
        assert!(resolver.cached_strategy(Action::Click, &locator).is_none());
    }

    #[tokio::test]
    async fn test_fallback_success_is_cached_and_reused() {
        // The recorded button is gone; a cross-field candidate matches.
        let winning = "//button[@name='go']";
        let driver = Arc::new(FakeDriver::with_present(&[winning]));
        let mut resolver = resolver_with(driver.clone());
        let locator = Locator::new(LocatorKind::Xpath, "//button[@id='go']");

        let element = resolver
            .resolve(Action::Click, &locator, None)
            .await
            .unwrap();
        assert!(element.is_some());
        assert_eq!(
            resolver
                .cached_strategy(Action::Click, &locator)
                .unwrap()
                .value,
            winning
        );

        // Second resolution: original fails, the cached strategy is tried
        // before any candidate generation.
        let probes_before = driver.find_count();
        let element = resolver
            .resolve(Action::Click, &locator, None)
            .await
            .unwrap();
        assert!(element.is_some());
        assert_eq!(driver.find_count() - probes_before, 2);

        let probes: Vec<String> = driver.finds.lock().unwrap().clone();
        assert_eq!(probes[probes_before], "//button[@id='go']");
        assert_eq!(probes[probes_before + 1], winning);
    }

    #[tokio::test]
    async fn test_failed_cache_entry_is_evicted() {
        let winning = "//button[@name='go']";
        let driver = Arc::new(FakeDriver::with_present(&[winning]));
        let mut resolver = resolver_with(driver.clone());
        let locator = Locator::new(LocatorKind::Xpath, "//button[@id='go']");

        resolver
            .resolve(Action::Click, &locator, None)
            .await
            .unwrap();
        assert!(resolver.cached_strategy(Action::Click, &locator).is_some());

        // The page changed again; nothing matches now.
        driver.set_present(&[]);
        let element = resolver
            .resolve(Action::Click, &locator, None)
            .await
            .unwrap();

        assert!(element.is_none());
        assert!(
            resolver.cached_strategy(Action::Click, &locator).is_none(),
            "failed cache entry must not persist"
        );
    }

    #[tokio::test]
    async fn test_catch_all_success_is_never_cached() {
        let locator = Locator::new(LocatorKind::Xpath, "//button[@id='submitBtn']");
        let candidates = build_candidates(&locator, Action::Click, None);
        let catch_all = candidates.last().unwrap().value.clone();
        assert!(catch_all.starts_with("//*["));

        let driver = Arc::new(FakeDriver::with_present(&[&catch_all]));
        let mut resolver = resolver_with(driver);

        let element = resolver
            .resolve(Action::Click, &locator, None)
            .await
            .unwrap();

        assert!(element.is_some());
        assert!(
            resolver.cached_strategy(Action::Click, &locator).is_none(),
            "catch-all strategy must never be cached"
        );
    }

    #[tokio::test]
    async fn test_submit_btn_tag_substitution_scenario() {
        // Recorded //button[@id='submitBtn'] against a page whose real
        // markup is <a id="submit-btn">: the live expression that matches
        // is the tag-substituted token-AND anchor candidate.
        let locator = Locator::new(LocatorKind::Xpath, "//button[@id='submitBtn']");
        let candidates = build_candidates(&locator, Action::Click, None);
        let winning_candidate = candidates
            .iter()
            .find(|s| {
                s.value.starts_with("//a[")
                    && s.value.contains("translate(@id")
                    && s.value.contains("'submit'")
                    && s.value.contains("'btn'")
            })
            .expect("anchor token candidate must be generated")
            .clone();

        let driver = Arc::new(FakeDriver::with_present(&[&winning_candidate.value]));
        let mut resolver = resolver_with(driver);

        let element = resolver
            .resolve(Action::Click, &locator, None)
            .await
            .unwrap();
        assert!(element.is_some());

        // The winning (non-catch-all) strategy is retrievable from cache.
        assert_eq!(
            resolver.cached_strategy(Action::Click, &locator),
            Some(&winning_candidate)
        );
    }

    #[tokio::test]
    async fn test_navigation_actions_are_rejected() {
        let driver = Arc::new(FakeDriver::default());
        let mut resolver = resolver_with(driver.clone());
        let locator = Locator::new(LocatorKind::Url, "https://example.com");

        let err = resolver
            .resolve(Action::Goto, &locator, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not resolve"));

        let err = resolver
            .resolve(Action::Click, &locator, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot be queried"));

        // Config errors must not trigger any probing.
        assert_eq!(driver.find_count(), 0);
    }
}
