//! Adaptive element resolution.
//!
//! Markup drifts between the moment a test is recorded and the moment it
//! runs: ids get renamed, buttons become anchors, casing changes. This
//! module turns a symbolic locator into a live element handle anyway:
//! original locator first, then the last strategy that worked, then a
//! prioritized list of synthesized alternatives. A located element that
//! refuses a direct click gets its own escalation ladder.

pub mod cache;
pub mod candidates;
pub mod engine;
pub mod intercept;
pub mod locator;
pub mod navigation;
pub mod variations;

pub use cache::StrategyCache;
pub use candidates::build_candidates;
pub use engine::Resolver;
pub use intercept::ClickInterceptResolver;
pub use locator::Strategy;

use thiserror::Error;

use crate::parser::types::{Action, Locator, LocatorKind};

/// Failure taxonomy for element interaction.
///
/// `NotFound`/`NotVisible`/`NotClickable`/`Intercepted` are transient
/// environment conditions, surfaced only after every fallback ladder is
/// exhausted. `UnsupportedAction`/`UnsupportedLocatorKind` are
/// configuration errors and fail immediately, with no fallback.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no element found for {action} {locator}")]
    NotFound { action: Action, locator: Locator },

    #[error("element {locator} never became visible")]
    NotVisible { locator: Locator },

    #[error("element {locator} never became clickable")]
    NotClickable { locator: Locator },

    #[error("click on {locator} stayed intercepted after escalation: {reason}")]
    Intercepted { locator: Locator, reason: String },

    #[error("action {0} does not resolve a DOM element")]
    UnsupportedAction(Action),

    #[error("locator kind {0} cannot be queried against the DOM")]
    UnsupportedLocatorKind(LocatorKind),
}
