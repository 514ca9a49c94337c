use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::events::{ConsoleEventListener, EventEmitter, TestEvent};
use super::state::{CaseState, RunSummary, SessionState, StepState};
use crate::driver::traits::{BrowserDriver, ClickIntercepted, ElementRef, WaitCondition};
use crate::parser::types::{Action, Locator, LocatorKind, TestCase, TestStep};
use crate::parser::parse_suite_file;
use crate::report;
use crate::resolver::engine::wait_condition_for;
use crate::resolver::locator::{ParsedLocator, Strategy};
use crate::resolver::navigation::{derive_url_candidates, normalize_goto_url};
use crate::resolver::{ClickInterceptResolver, ResolveError, Resolver};
use crate::utils::Config;

pub struct StepExecutor {
    driver: Arc<dyn BrowserDriver>,
    resolver: Resolver,
    intercept: ClickInterceptResolver,
    config: Config,
    session: SessionState,
    emitter: EventEmitter,
    output_dir: PathBuf,
    continue_on_failure: bool,
    snapshot_enabled: bool,
    report_enabled: bool,
}

impl StepExecutor {
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        output_dir: &Path,
        config: Config,
        continue_on_failure: bool,
        snapshot: bool,
        report: bool,
    ) -> Self {
        let (emitter, receiver) = EventEmitter::new();

        // Console listener prints events in the background
        tokio::spawn(ConsoleEventListener::listen(receiver));

        let _ = std::fs::create_dir_all(output_dir);

        let session_id = Uuid::new_v4().to_string();
        emitter.emit(TestEvent::SessionStarted {
            session_id: session_id.clone(),
        });

        let mut session = SessionState::new(&session_id);
        session.start();

        Self {
            resolver: Resolver::new(driver.clone(), config.clone()),
            intercept: ClickInterceptResolver::new(driver.clone(), config.clone()),
            driver,
            config,
            session,
            emitter,
            output_dir: output_dir.to_path_buf(),
            continue_on_failure,
            snapshot_enabled: snapshot,
            report_enabled: report,
        }
    }

    /// Run every test case of a suite file.
    pub async fn run_file(&mut self, path: &Path) -> Result<()> {
        let suite = parse_suite_file(path)?;
        let suite_path = path.display().to_string();

        for case in &suite {
            self.run_case(case, &suite_path).await;
        }
        Ok(())
    }

    /// Run a single test case. A failing step fails the case; the session
    /// always continues with the next case.
    pub async fn run_case(&mut self, case: &TestCase, suite_path: &str) {
        let step_states: Vec<StepState> = case
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| StepState::new(i, &step.display_name()))
            .collect();
        let mut case_state = CaseState::new(&case.test_name, suite_path, step_states);

        self.emitter.emit(TestEvent::CaseStarted {
            case_name: case.test_name.clone(),
            step_count: case.steps.len(),
        });
        case_state.start();

        for (i, step) in case.steps.iter().enumerate() {
            case_state.current_index = i;
            case_state.steps[i].start();
            self.emitter.emit(TestEvent::StepStarted {
                index: i,
                step: step.display_name(),
            });

            let next_step = case.steps.get(i + 1);
            match self.execute_step(step, next_step).await {
                Ok(()) => {
                    case_state.steps[i].pass();
                    self.emitter.emit(TestEvent::StepPassed {
                        index: i,
                        duration_ms: case_state.steps[i].duration_ms.unwrap_or(0),
                    });
                }
                Err(e) => {
                    let error_msg = format!("{:#}", e);

                    if self.snapshot_enabled {
                        let screenshot =
                            self.capture_failure_screenshot(&case.test_name).await;
                        case_state.steps[i].screenshot_path = screenshot;
                    }

                    case_state.steps[i].fail(error_msg.clone());
                    case_state.error = Some(error_msg.clone());
                    self.emitter.emit(TestEvent::StepFailed {
                        index: i,
                        error: error_msg,
                        duration_ms: case_state.steps[i].duration_ms.unwrap_or(0),
                    });

                    if !self.continue_on_failure {
                        case_state.current_index = i + 1;
                        case_state.skip_remaining("Previous step failed");
                        for skipped in &case_state.steps[i + 1..] {
                            self.emitter.emit(TestEvent::StepSkipped {
                                index: skipped.index,
                                reason: "Previous step failed".to_string(),
                            });
                        }
                        break;
                    }
                }
            }
        }

        case_state.finish();
        self.emitter.emit(TestEvent::CaseFinished {
            case_name: case_state.case_name.clone(),
            status: case_state.status.clone(),
            duration_ms: case_state.total_duration_ms,
        });
        self.session.add_case(case_state);
    }

    /// Finish the session: emit the summary, write report artifacts and
    /// release the browser.
    pub async fn finish(&mut self) -> Result<RunSummary> {
        self.session.finish();
        let summary = self.session.summary();

        self.emitter.emit(TestEvent::SessionFinished {
            summary: summary.clone(),
        });
        // Give the console listener a beat to drain
        tokio::time::sleep(Duration::from_millis(300)).await;

        if self.report_enabled {
            let results = report::types::TestResults {
                session_id: self.session.session_id.clone(),
                cases: self.session.to_report().cases,
                summary: summary.clone(),
                generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            };
            report::json::write_report(&results, &self.output_dir)?;
            report::junit::write_report(&results, &self.output_dir)?;
        }

        self.driver.close().await.ok();
        Ok(summary)
    }

    async fn execute_step(&mut self, step: &TestStep, next: Option<&TestStep>) -> Result<()> {
        match step.action {
            Action::Goto => {
                let url = normalize_goto_url(&step.locator.value);
                self.driver.goto(&url).await
            }

            Action::Input => {
                let element = self.resolve_required(step).await?;
                let value = step.input_value.as_deref().unwrap_or_default();
                self.driver.fill(&element, value).await
            }

            Action::Click => self.execute_click(step, next).await,

            Action::Select => self.execute_select(step).await,

            Action::WaitForElementVisible => {
                self.resolve_required(step).await?;
                Ok(())
            }

            Action::WaitForRedirect => self.wait_for_redirect(&step.locator.value).await,
        }
    }

    /// Resolve the step's element or classify its absence.
    async fn resolve_required(&mut self, step: &TestStep) -> Result<ElementRef> {
        let resolved = self
            .resolver
            .resolve(step.action, &step.locator, step.input_value.as_deref())
            .await?;

        match resolved {
            Some(element) => Ok(element),
            None => Err(self.classify_absence(step.action, &step.locator).await.into()),
        }
    }

    /// Distinguish "nothing there" from "there, but never interactable".
    async fn classify_absence(&self, action: Action, locator: &Locator) -> ResolveError {
        if wait_condition_for(action) != WaitCondition::Present {
            let original = Strategy::from_locator(locator);
            let present = self
                .driver
                .find(&original, WaitCondition::Present, 0)
                .await
                .ok()
                .flatten();
            if present.is_some() {
                return match action {
                    Action::WaitForElementVisible => ResolveError::NotVisible {
                        locator: locator.clone(),
                    },
                    _ => ResolveError::NotClickable {
                        locator: locator.clone(),
                    },
                };
            }
        }
        ResolveError::NotFound {
            action,
            locator: locator.clone(),
        }
    }

    async fn execute_click(&mut self, step: &TestStep, next: Option<&TestStep>) -> Result<()> {
        let resolved = self
            .resolver
            .resolve(Action::Click, &step.locator, None)
            .await?;

        match resolved {
            Some(element) => self.click_with_escalation(&element, &step.locator).await,
            None => self.link_navigation_fallback(step, next).await,
        }
    }

    /// Direct click; on interception, run the escalation ladder.
    async fn click_with_escalation(
        &mut self,
        element: &ElementRef,
        locator: &Locator,
    ) -> Result<()> {
        match self.driver.click(element).await {
            Ok(()) => Ok(()),
            Err(e) if e.downcast_ref::<ClickIntercepted>().is_some() => {
                self.emitter.emit(TestEvent::Log {
                    message: format!("Click intercepted on {}, escalating", locator),
                });
                if self.intercept.resolve(element).await? {
                    Ok(())
                } else {
                    Err(ResolveError::Intercepted {
                        locator: locator.clone(),
                        reason: e.to_string(),
                    }
                    .into())
                }
            }
            Err(e) => Err(e),
        }
    }

    /// An anchor that cannot be located can still be honored by navigating
    /// to where the link would have gone.
    async fn link_navigation_fallback(
        &mut self,
        step: &TestStep,
        next: Option<&TestStep>,
    ) -> Result<()> {
        let parsed = ParsedLocator::parse(&step.locator);
        let is_anchor = matches!(
            step.locator.kind,
            LocatorKind::LinkText | LocatorKind::PartialLinkText
        ) || parsed.tag.as_deref() == Some("a");

        if !is_anchor {
            return Err(self
                .classify_absence(Action::Click, &step.locator)
                .await
                .into());
        }

        // Next-step hint: an upcoming redirect-wait names the destination.
        if let Some(next) = next {
            if next.action == Action::WaitForRedirect {
                let target = normalize_goto_url(&next.locator.value);
                self.emitter.emit(TestEvent::Log {
                    message: format!("Link not found, navigating directly to {}", target),
                });
                return self.driver.goto(&target).await;
            }
        }

        // Otherwise derive ranked URL candidates from the href fragment.
        if let Some(href) = parsed.attribute("href") {
            let current = self.driver.current_url().await.ok();
            for url in derive_url_candidates(href, current.as_deref()) {
                self.emitter.emit(TestEvent::Log {
                    message: format!("Trying direct navigation: {}", url),
                });
                if self.driver.goto(&url).await.is_ok() {
                    return Ok(());
                }
            }
        }

        Err(ResolveError::NotFound {
            action: Action::Click,
            locator: step.locator.clone(),
        }
        .into())
    }

    async fn execute_select(&mut self, step: &TestStep) -> Result<()> {
        let element = self.resolve_required(step).await?;

        if element.tag == "select" {
            let Some(value) = step.input_value.as_deref() else {
                bail!("select step for {} is missing input_value", step.locator);
            };
            self.driver.select_option(&element, value).await
        } else {
            // A radio input or custom widget stood in for the <select>.
            self.click_with_escalation(&element, &step.locator).await
        }
    }

    /// Poll the page URL until it matches the expected redirect target.
    async fn wait_for_redirect(&self, expected: &str) -> Result<()> {
        let expected = normalize_goto_url(expected);
        let started = Instant::now();

        loop {
            let current = self.driver.current_url().await?;
            if urls_match(&current, &expected) {
                return Ok(());
            }
            if started.elapsed().as_millis() >= self.config.primary_timeout_ms as u128 {
                bail!(
                    "URL did not redirect to {} after {}ms. Current URL: {}",
                    expected,
                    self.config.primary_timeout_ms,
                    current
                );
            }
            tokio::time::sleep(Duration::from_millis(
                self.config.redirect_poll_interval_ms,
            ))
            .await;
        }
    }

    async fn capture_failure_screenshot(&self, case_name: &str) -> Option<String> {
        let filename = format!("{}_failure.png", case_name.replace(' ', "_"));
        let path = self.output_dir.join(&filename);

        match self.driver.screenshot(&path).await {
            Ok(()) => {
                self.emitter.emit(TestEvent::Log {
                    message: format!("Saved failure screenshot: {}", path.display()),
                });
                Some(filename)
            }
            Err(e) => {
                log::warn!("failed to capture screenshot: {:#}", e);
                None
            }
        }
    }

    /// Per-case results so far. Used by the runner's closing summary.
    pub fn session(&self) -> &SessionState {
        &self.session
    }
}

/// Compare URLs ignoring a trailing slash.
fn urls_match(current: &str, expected: &str) -> bool {
    current.trim_end_matches('/') == expected.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::traits::Rect;
    use crate::parser::types::Locator;
    use crate::runner::state::{CaseStatus, StepStatus};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted driver for executor-level flows.
    #[derive(Default)]
    struct FakeDriver {
        /// Strategy values that resolve to an element, with the tag.
        present: Mutex<Vec<(String, String)>>,
        gotos: Mutex<Vec<String>>,
        clicks: Mutex<Vec<u64>>,
        script_clicks: Mutex<Vec<u64>>,
        fills: Mutex<Vec<String>>,
        current_url: Mutex<String>,
        /// Whether pointer clicks are intercepted.
        intercept_clicks: bool,
    }

    #[async_trait]
    impl BrowserDriver for FakeDriver {
        async fn goto(&self, url: &str) -> Result<()> {
            self.gotos.lock().unwrap().push(url.to_string());
            *self.current_url.lock().unwrap() = url.to_string();
            Ok(())
        }

        async fn current_url(&self) -> Result<String> {
            Ok(self.current_url.lock().unwrap().clone())
        }

        async fn find(
            &self,
            strategy: &Strategy,
            _condition: WaitCondition,
            _timeout_ms: u64,
        ) -> Result<Option<ElementRef>> {
            let present = self.present.lock().unwrap();
            Ok(present
                .iter()
                .find(|(value, _)| value == &strategy.value)
                .map(|(_, tag)| ElementRef {
                    id: 1,
                    tag: tag.clone(),
                }))
        }

        async fn query_all(&self, _strategy: &Strategy) -> Result<Vec<ElementRef>> {
            Ok(Vec::new())
        }

        async fn click(&self, element: &ElementRef) -> Result<()> {
            if self.intercept_clicks {
                return Err(anyhow::Error::new(ClickIntercepted(
                    "overlay intercepts pointer events".to_string(),
                )));
            }
            self.clicks.lock().unwrap().push(element.id);
            Ok(())
        }

        async fn fill(&self, _element: &ElementRef, value: &str) -> Result<()> {
            self.fills.lock().unwrap().push(value.to_string());
            Ok(())
        }

        async fn select_option(&self, _element: &ElementRef, _value: &str) -> Result<()> {
            Ok(())
        }

        async fn script_click(&self, element: &ElementRef) -> Result<()> {
            self.script_clicks.lock().unwrap().push(element.id);
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
            Err(anyhow!("no display in tests"))
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    fn executor_with(driver: Arc<FakeDriver>) -> StepExecutor {
        let config = Config {
            primary_timeout_ms: 0,
            probe_timeout_ms: 0,
            fallback_delay_ms: 0,
            redirect_poll_interval_ms: 1,
            ..Config::default()
        };
        let output = std::env::temp_dir().join("adapt-tester-executor-tests");
        StepExecutor::new(driver, &output, config, false, false, false)
    }

    fn step(action: Action, kind: LocatorKind, value: &str) -> TestStep {
        TestStep {
            action,
            locator: Locator::new(kind, value),
            input_value: None,
        }
    }

    #[tokio::test]
    async fn test_goto_normalizes_scheme() {
        let driver = Arc::new(FakeDriver::default());
        let mut executor = executor_with(driver.clone());

        let goto = step(Action::Goto, LocatorKind::Url, "example.com/login");
        executor.execute_step(&goto, None).await.unwrap();

        assert_eq!(
            driver.gotos.lock().unwrap().as_slice(),
            ["https://example.com/login"]
        );
    }

    #[tokio::test]
    async fn test_input_fills_resolved_element() {
        let driver = Arc::new(FakeDriver::default());
        driver
            .present
            .lock()
            .unwrap()
            .push(("//input[@name='email']".to_string(), "input".to_string()));
        let mut executor = executor_with(driver.clone());

        let mut input = step(Action::Input, LocatorKind::Xpath, "//input[@name='email']");
        input.input_value = Some("user@outlook.com".to_string());
        executor.execute_step(&input, None).await.unwrap();

        assert_eq!(
            driver.fills.lock().unwrap().as_slice(),
            ["user@outlook.com"]
        );
    }

    #[tokio::test]
    async fn test_intercepted_click_recovers_via_script_click() {
        let driver = Arc::new(FakeDriver {
            intercept_clicks: true,
            ..FakeDriver::default()
        });
        driver
            .present
            .lock()
            .unwrap()
            .push(("//button[@id='go']".to_string(), "button".to_string()));
        let mut executor = executor_with(driver.clone());

        let click = step(Action::Click, LocatorKind::Xpath, "//button[@id='go']");
        executor.execute_step(&click, None).await.unwrap();

        // Pointer click never landed; the ladder's script click did.
        assert!(driver.clicks.lock().unwrap().is_empty());
        assert_eq!(driver.script_clicks.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_link_fallback_uses_next_redirect_hint() {
        let driver = Arc::new(FakeDriver::default());
        let mut executor = executor_with(driver.clone());

        let click = step(
            Action::Click,
            LocatorKind::Xpath,
            "//a[@href='/pricing']",
        );
        let redirect = step(
            Action::WaitForRedirect,
            LocatorKind::Url,
            "https://example.com/pricing",
        );
        executor.execute_step(&click, Some(&redirect)).await.unwrap();

        assert_eq!(
            driver.gotos.lock().unwrap().as_slice(),
            ["https://example.com/pricing"]
        );
    }

    #[tokio::test]
    async fn test_link_fallback_derives_urls_from_href() {
        let driver = Arc::new(FakeDriver::default());
        *driver.current_url.lock().unwrap() = "https://app.example.com/home".to_string();
        let mut executor = executor_with(driver.clone());

        let click = step(Action::Click, LocatorKind::Xpath, "//a[@href='/pricing']");
        executor.execute_step(&click, None).await.unwrap();

        // First derived candidate wins: current origin + path.
        assert_eq!(
            driver.gotos.lock().unwrap().first().unwrap(),
            "https://app.example.com/pricing"
        );
    }

    #[tokio::test]
    async fn test_missing_button_is_not_found_error() {
        let driver = Arc::new(FakeDriver::default());
        let mut executor = executor_with(driver);

        let click = step(Action::Click, LocatorKind::Xpath, "//button[@id='nope']");
        let err = executor.execute_step(&click, None).await.unwrap_err();
        assert!(err.to_string().contains("no element found"));
    }

    #[tokio::test]
    async fn test_wait_for_redirect_matches_with_trailing_slash() {
        let driver = Arc::new(FakeDriver::default());
        *driver.current_url.lock().unwrap() = "https://example.com/dash/".to_string();
        let mut executor = executor_with(driver);

        let wait = step(
            Action::WaitForRedirect,
            LocatorKind::Url,
            "https://example.com/dash",
        );
        executor.execute_step(&wait, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_redirect_times_out_with_current_url() {
        let driver = Arc::new(FakeDriver::default());
        *driver.current_url.lock().unwrap() = "https://example.com/start".to_string();
        let mut executor = executor_with(driver);

        let wait = step(
            Action::WaitForRedirect,
            LocatorKind::Url,
            "https://example.com/done",
        );
        let err = executor.execute_step(&wait, None).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("did not redirect"));
        assert!(message.contains("https://example.com/start"));
    }

    #[tokio::test]
    async fn test_failed_step_skips_remaining_in_case() {
        let driver = Arc::new(FakeDriver::default());
        let mut executor = executor_with(driver);

        let case = TestCase {
            test_name: "Broken case".to_string(),
            steps: vec![
                step(Action::Click, LocatorKind::Xpath, "//button[@id='gone']"),
                step(Action::Goto, LocatorKind::Url, "https://example.com"),
            ],
        };
        executor.run_case(&case, "suite.json").await;

        let state = &executor.session().cases[0];
        assert_eq!(state.status, CaseStatus::Failed);
        assert!(matches!(state.steps[0].status, StepStatus::Failed { .. }));
        assert!(matches!(state.steps[1].status, StepStatus::Skipped { .. }));
    }

    #[test]
    fn test_urls_match() {
        assert!(urls_match("https://a.com/x/", "https://a.com/x"));
        assert!(!urls_match("https://a.com/x", "https://a.com/y"));
    }
}
