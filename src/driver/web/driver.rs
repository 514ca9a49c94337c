//! Web driver implementation using Playwright.
//!
//! Element lookups run as injected JavaScript so that presence, visibility
//! and clickability checks happen in one page round-trip. Every located
//! element is pinned to its canonical absolute xpath; the registry maps
//! opaque handle ids to those paths, and later operations re-target the
//! element through them.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use playwright::api::{Browser, BrowserContext, Page, Viewport};
use playwright::Playwright;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::driver::traits::{
    BrowserDriver, ClickIntercepted, ElementRef, Rect, WaitCondition,
};
use crate::parser::types::LocatorKind;
use crate::resolver::locator::{sanitize_xpath_value, Strategy};

/// Web browser type
#[derive(Debug, Clone, Copy, Default)]
pub enum BrowserType {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

/// Web driver configuration
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    pub browser_type: BrowserType,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        let headless = std::env::var("ADAPT_HEADLESS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            browser_type: BrowserType::Chromium,
            headless,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// Registry entry for a located element.
#[derive(Debug, Clone)]
struct StoredElement {
    /// Canonical absolute xpath, e.g. `/html/body[1]/div[2]/button[1]`.
    path: String,
}

/// Web driver backed by Playwright.
pub struct WebDriver {
    #[allow(dead_code)]
    playwright: Arc<Playwright>,
    browser: Arc<Browser>,
    #[allow(dead_code)]
    context: Arc<BrowserContext>,
    page: Arc<Mutex<Page>>,
    elements: Mutex<HashMap<u64, StoredElement>>,
    next_id: AtomicU64,
}

impl WebDriver {
    /// Launch a browser and open a fresh page.
    pub async fn new(config: WebDriverConfig) -> Result<Self> {
        let playwright = Playwright::initialize()
            .await
            .context("Failed to initialize Playwright")?;

        let browser = match config.browser_type {
            BrowserType::Chromium => {
                playwright
                    .chromium()
                    .launcher()
                    .headless(config.headless)
                    .launch()
                    .await?
            }
            BrowserType::Firefox => {
                playwright
                    .firefox()
                    .launcher()
                    .headless(config.headless)
                    .launch()
                    .await?
            }
            BrowserType::Webkit => {
                playwright
                    .webkit()
                    .launcher()
                    .headless(config.headless)
                    .launch()
                    .await?
            }
        };

        let context = browser.context_builder().build().await?;
        let page = context.new_page().await?;

        page.set_viewport_size(Viewport {
            width: config.viewport_width as i32,
            height: config.viewport_height as i32,
        })
        .await?;

        Ok(Self {
            playwright: Arc::new(playwright),
            browser: Arc::new(browser),
            context: Arc::new(context),
            page: Arc::new(Mutex::new(page)),
            elements: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    async fn register(&self, path: String, tag: String) -> ElementRef {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.elements
            .lock()
            .await
            .insert(id, StoredElement { path });
        ElementRef { id, tag }
    }

    async fn stored_path(&self, element: &ElementRef) -> Result<String> {
        self.elements
            .lock()
            .await
            .get(&element.id)
            .map(|s| s.path.clone())
            .ok_or_else(|| anyhow!("Unknown element handle: {}", element.id))
    }

    /// One JS-side lookup of the first element matching the query under
    /// the wait condition. Returns `{ tag, path }` or null.
    async fn probe(
        &self,
        strategy: &Strategy,
        condition: WaitCondition,
    ) -> Result<Option<(String, String)>> {
        let (lang, query) = to_query(strategy);
        let js = format!(
            r#"
            () => {{
                {FIND_HELPERS}
                const matches = {lookup};
                const required = {condition};
                for (const el of matches) {{
                    if (required === 'present') return describe(el);
                    if (!isVisible(el)) continue;
                    if (required === 'visible') return describe(el);
                    if (!el.disabled) return describe(el);
                }}
                return null;
            }}
            "#,
            FIND_HELPERS = FIND_HELPERS,
            lookup = match lang {
                QueryLang::Xpath => format!("byXPath({})", js_string(&query)),
                QueryLang::Css => format!("byCss({})", js_string(&query)),
            },
            condition = js_string(condition_name(condition)),
        );

        let page = self.page.lock().await;
        let value: serde_json::Value = page.evaluate(&js, ()).await?;
        drop(page);

        let Some(obj) = value.as_object() else {
            return Ok(None);
        };
        let tag = obj.get("tag").and_then(|v| v.as_str()).unwrap_or_default();
        let path = obj.get("path").and_then(|v| v.as_str()).unwrap_or_default();
        if tag.is_empty() || path.is_empty() {
            return Ok(None);
        }
        Ok(Some((tag.to_string(), path.to_string())))
    }

    /// Evaluate JS against a registered element. The script body receives
    /// `el` and must return a JSON-serializable value.
    async fn eval_on_element(
        &self,
        element: &ElementRef,
        body: &str,
    ) -> Result<serde_json::Value> {
        let path = self.stored_path(element).await?;
        let js = format!(
            r#"
            () => {{
                {FIND_HELPERS}
                const matches = byXPath({path});
                if (matches.length === 0) return null;
                const el = matches[0];
                return ({body})(el);
            }}
            "#,
            FIND_HELPERS = FIND_HELPERS,
            path = js_string(&path),
            body = body,
        );

        let page = self.page.lock().await;
        let value: serde_json::Value = page.evaluate(&js, ()).await?;
        Ok(value)
    }
}

#[async_trait]
impl BrowserDriver for WebDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        let page = self.page.lock().await;
        page.goto_builder(url)
            .goto()
            .await
            .with_context(|| format!("Failed to navigate to {}", url))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let page = self.page.lock().await;
        let url: String = page.evaluate("() => window.location.href", ()).await?;
        Ok(url)
    }

    async fn find(
        &self,
        strategy: &Strategy,
        condition: WaitCondition,
        timeout_ms: u64,
    ) -> Result<Option<ElementRef>> {
        let started = Instant::now();
        loop {
            if let Some((tag, path)) = self.probe(strategy, condition).await? {
                return Ok(Some(self.register(path, tag).await));
            }
            if started.elapsed().as_millis() >= timeout_ms as u128 {
                return Ok(None);
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn query_all(&self, strategy: &Strategy) -> Result<Vec<ElementRef>> {
        let (lang, query) = to_query(strategy);
        let js = format!(
            r#"
            () => {{
                {FIND_HELPERS}
                return {lookup}.map(describe);
            }}
            "#,
            FIND_HELPERS = FIND_HELPERS,
            lookup = match lang {
                QueryLang::Xpath => format!("byXPath({})", js_string(&query)),
                QueryLang::Css => format!("byCss({})", js_string(&query)),
            },
        );

        let page = self.page.lock().await;
        let value: serde_json::Value = page.evaluate(&js, ()).await?;
        drop(page);

        let mut out = Vec::new();
        if let Some(items) = value.as_array() {
            for item in items {
                let tag = item.get("tag").and_then(|v| v.as_str()).unwrap_or_default();
                let path = item.get("path").and_then(|v| v.as_str()).unwrap_or_default();
                if !tag.is_empty() && !path.is_empty() {
                    out.push(self.register(path.to_string(), tag.to_string()).await);
                }
            }
        }
        Ok(out)
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        let path = self.stored_path(element).await?;
        let selector = format!("xpath={}", path);

        let page = self.page.lock().await;
        match page.click_builder(&selector).click().await {
            Ok(()) => Ok(()),
            Err(e) => {
                let message = format!("{:?}", e);
                if message.contains("intercept") || message.contains("pointer events") {
                    Err(anyhow::Error::new(ClickIntercepted(message)))
                } else {
                    Err(anyhow!("Failed to click {}: {}", selector, message))
                }
            }
        }
    }

    async fn fill(&self, element: &ElementRef, value: &str) -> Result<()> {
        let path = self.stored_path(element).await?;
        let selector = format!("xpath={}", path);

        let page = self.page.lock().await;
        let handle = page
            .query_selector(&selector)
            .await?
            .ok_or_else(|| anyhow!("Element vanished before input: {}", selector))?;
        handle.fill_builder(value).fill().await?;
        Ok(())
    }

    async fn select_option(&self, element: &ElementRef, value: &str) -> Result<()> {
        let body = format!(
            r#"el => {{
                const wanted = {value};
                for (const option of el.options || []) {{
                    if (option.value === wanted || option.label === wanted ||
                        option.text.trim() === wanted) {{
                        el.value = option.value;
                        el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                        el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                        return true;
                    }}
                }}
                return false;
            }}"#,
            value = js_string(value),
        );

        let result = self.eval_on_element(element, &body).await?;
        if result.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(anyhow!("No option matching '{}' in <{}>", value, element.tag))
        }
    }

    async fn script_click(&self, element: &ElementRef) -> Result<()> {
        let result = self
            .eval_on_element(element, "el => { el.click(); return true; }")
            .await?;
        if result.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(anyhow!("Element vanished before script click"))
        }
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        let body = format!("el => el.getAttribute({})", js_string(name));
        let result = self.eval_on_element(element, &body).await?;
        Ok(result.as_str().map(|s| s.to_string()))
    }

    async fn bounding_box(&self, element: &ElementRef) -> Result<Option<Rect>> {
        let path = self.stored_path(element).await?;
        let selector = format!("xpath={}", path);

        let page = self.page.lock().await;
        let Some(handle) = page.query_selector(&selector).await? else {
            return Ok(None);
        };
        let rect = handle.bounding_box().await?.map(|b| Rect {
            x: b.x,
            y: b.y,
            width: b.width,
            height: b.height,
        });
        Ok(rect)
    }

    async fn parent(&self, element: &ElementRef) -> Result<Option<ElementRef>> {
        let path = self.stored_path(element).await?;
        let Some(parent_path) = parent_path(&path) else {
            return Ok(None);
        };

        let js = format!(
            r#"
            () => {{
                {FIND_HELPERS}
                const matches = byXPath({path});
                return matches.length > 0 ? describe(matches[0]) : null;
            }}
            "#,
            FIND_HELPERS = FIND_HELPERS,
            path = js_string(&parent_path),
        );

        let page = self.page.lock().await;
        let value: serde_json::Value = page.evaluate(&js, ()).await?;
        drop(page);

        let Some(obj) = value.as_object() else {
            return Ok(None);
        };
        let tag = obj.get("tag").and_then(|v| v.as_str()).unwrap_or_default();
        if tag.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.register(parent_path, tag.to_string()).await))
    }

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<()> {
        self.eval_on_element(
            element,
            "el => { el.scrollIntoView({ block: 'center', inline: 'center' }); return true; }",
        )
        .await?;
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let page = self.page.lock().await;
        page.screenshot_builder()
            .path(path.to_path_buf())
            .screenshot()
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}

/// Query language a strategy resolves through.
enum QueryLang {
    Xpath,
    Css,
}

/// Convert a strategy into a browser-executable query. Everything except
/// raw CSS funnels through xpath so one evaluation path serves all kinds.
fn to_query(strategy: &Strategy) -> (QueryLang, String) {
    match strategy.kind {
        LocatorKind::Xpath => (QueryLang::Xpath, strategy.value.clone()),
        LocatorKind::Css => (QueryLang::Css, strategy.value.clone()),
        LocatorKind::Id => (
            QueryLang::Xpath,
            format!("//*[@id={}]", sanitize_xpath_value(&strategy.value)),
        ),
        LocatorKind::Name => (
            QueryLang::Xpath,
            format!("//*[@name={}]", sanitize_xpath_value(&strategy.value)),
        ),
        LocatorKind::Class => (
            QueryLang::Xpath,
            format!(
                "//*[contains(concat(' ', normalize-space(@class), ' '), {})]",
                sanitize_xpath_value(&format!(" {} ", strategy.value))
            ),
        ),
        LocatorKind::LinkText => (
            QueryLang::Xpath,
            format!(
                "//a[normalize-space(text())={}]",
                sanitize_xpath_value(&strategy.value)
            ),
        ),
        LocatorKind::PartialLinkText => (
            QueryLang::Xpath,
            format!(
                "//a[contains(text(), {})]",
                sanitize_xpath_value(&strategy.value)
            ),
        ),
        LocatorKind::Tag => (QueryLang::Xpath, format!("//{}", strategy.value)),
        // Url never reaches the driver; the resolver rejects it first.
        LocatorKind::Url => (QueryLang::Css, String::new()),
    }
}

/// JSON-quote a value as a JS string literal.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn condition_name(condition: WaitCondition) -> &'static str {
    match condition {
        WaitCondition::Present => "present",
        WaitCondition::Visible => "visible",
        WaitCondition::Clickable => "clickable",
    }
}

/// Drop the last step of a canonical path. `/html/body[1]` -> `/html`;
/// `/html` has no element parent worth walking to.
fn parent_path(path: &str) -> Option<String> {
    let (head, _) = path.rsplit_once('/')?;
    if head.is_empty() {
        return None;
    }
    Some(head.to_string())
}

/// Shared JS helpers injected into every evaluation.
const FIND_HELPERS: &str = r#"
                const byXPath = (expr) => {
                    const out = [];
                    try {
                        const res = document.evaluate(
                            expr, document, null,
                            XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
                        for (let i = 0; i < res.snapshotLength; i++) {
                            const node = res.snapshotItem(i);
                            if (node && node.nodeType === 1) out.push(node);
                        }
                    } catch (e) {}
                    return out;
                };
                const byCss = (sel) => {
                    try {
                        return Array.from(document.querySelectorAll(sel));
                    } catch (e) {
                        return [];
                    }
                };
                const isVisible = (el) => {
                    if (!el.isConnected) return false;
                    const style = window.getComputedStyle(el);
                    if (style.display === 'none' || style.visibility === 'hidden' ||
                        style.opacity === '0') return false;
                    const rect = el.getBoundingClientRect();
                    return rect.width > 0 && rect.height > 0;
                };
                const pathOf = (el) => {
                    const parts = [];
                    while (el && el.nodeType === 1 && el !== document.documentElement) {
                        let index = 1;
                        let sibling = el.previousElementSibling;
                        while (sibling) {
                            if (sibling.tagName === el.tagName) index++;
                            sibling = sibling.previousElementSibling;
                        }
                        parts.unshift(el.tagName.toLowerCase() + '[' + index + ']');
                        el = el.parentElement;
                    }
                    return '/html/' + parts.join('/');
                };
                const describe = (el) => ({
                    tag: el.tagName.toLowerCase(),
                    path: pathOf(el)
                });
"#;
