use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

use crate::resolver::locator::Strategy;

/// Wait condition for element queries.
///
/// `Present` only requires the node to exist in the DOM; `Visible` adds
/// rendered visibility; `Clickable` adds hit-testability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    Present,
    Visible,
    Clickable,
}

/// Opaque handle to a located element.
///
/// The driver owns the mapping from `id` to its internal element handle;
/// callers only ever pass the reference back. `tag` is captured at lookup
/// time since the intercept ladder branches on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub id: u64,
    pub tag: String,
}

/// Element bounding box in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Typed marker for the "element obscured" click failure.
///
/// The driver attaches this to the error chain when a pointer click is
/// absorbed by an overlay; the runner downcasts for it to decide whether
/// the escalation ladder applies.
#[derive(Debug, thiserror::Error)]
#[error("click intercepted: {0}")]
pub struct ClickIntercepted(pub String);

/// Browser control capability consumed by the resolver and the runner.
///
/// One implementation wraps a real browser session; tests substitute
/// scripted fakes. All methods are sequential-use: the underlying session
/// is not safe for concurrent command dispatch.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate the page to an absolute URL.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Current page URL.
    async fn current_url(&self) -> Result<String>;

    /// Wait up to `timeout_ms` for an element matching `strategy` under
    /// `condition`. `Ok(None)` means the wait expired; absence is a
    /// result here, not an error.
    async fn find(
        &self,
        strategy: &Strategy,
        condition: WaitCondition,
        timeout_ms: u64,
    ) -> Result<Option<ElementRef>>;

    /// All elements currently matching `strategy`, without waiting.
    async fn query_all(&self, strategy: &Strategy) -> Result<Vec<ElementRef>>;

    /// Dispatch a pointer click on the element.
    async fn click(&self, element: &ElementRef) -> Result<()>;

    /// Clear the element and type `value` into it.
    async fn fill(&self, element: &ElementRef, value: &str) -> Result<()>;

    /// Choose an option of a native `<select>` by value or label.
    async fn select_option(&self, element: &ElementRef, value: &str) -> Result<()>;

    /// Invoke the element's DOM `click()` directly, bypassing
    /// pointer-geometry checks.
    async fn script_click(&self, element: &ElementRef) -> Result<()>;

    /// Read an attribute off the element.
    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>>;

    /// Bounding box, if the element is rendered.
    async fn bounding_box(&self, element: &ElementRef) -> Result<Option<Rect>>;

    /// Parent element, if any.
    async fn parent(&self, element: &ElementRef) -> Result<Option<ElementRef>>;

    /// Scroll the element into view, centered.
    async fn scroll_into_view(&self, element: &ElementRef) -> Result<()>;

    /// Save a screenshot of the current viewport.
    async fn screenshot(&self, path: &Path) -> Result<()>;

    /// Close the browser session.
    async fn close(&self) -> Result<()>;
}
