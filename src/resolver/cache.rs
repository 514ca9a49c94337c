//! Strategy cache: remember what worked last time.
//!
//! Candidate generation plus multi-strategy probing costs many live-DOM
//! round-trips; a remembered hit costs one. Entries live for the owning
//! resolver's lifetime only and are evicted the moment they fail; a
//! stale strategy is never trusted twice.

use std::collections::HashMap;

use crate::parser::types::{Action, Locator};

use super::locator::Strategy;

#[derive(Debug, Default)]
pub struct StrategyCache {
    entries: HashMap<(Action, Locator), Strategy>,
}

impl StrategyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last strategy that succeeded for this key, if any.
    pub fn get(&self, action: Action, locator: &Locator) -> Option<&Strategy> {
        self.entries.get(&(action, locator.clone()))
    }

    /// Record a strategy that just succeeded for this key.
    pub fn put(&mut self, action: Action, locator: Locator, strategy: Strategy) {
        log::debug!("caching strategy for {} {}: {}", action, locator, strategy);
        self.entries.insert((action, locator), strategy);
    }

    /// Drop the entry for this key after it failed.
    pub fn evict(&mut self, action: Action, locator: &Locator) {
        if self.entries.remove(&(action, locator.clone())).is_some() {
            log::debug!("evicted cached strategy for {} {}", action, locator);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::types::LocatorKind;

    fn locator() -> Locator {
        Locator::new(LocatorKind::Xpath, "//button[@id='go']")
    }

    #[test]
    fn test_put_get_evict() {
        let mut cache = StrategyCache::new();
        let strategy = Strategy::xpath("//a[@id='go']");

        assert!(cache.get(Action::Click, &locator()).is_none());

        cache.put(Action::Click, locator(), strategy.clone());
        assert_eq!(cache.get(Action::Click, &locator()), Some(&strategy));

        cache.evict(Action::Click, &locator());
        assert!(cache.get(Action::Click, &locator()).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_key_includes_action() {
        let mut cache = StrategyCache::new();
        cache.put(Action::Click, locator(), Strategy::xpath("//a[@id='go']"));

        // Same locator under a different action is a different key.
        assert!(cache.get(Action::WaitForElementVisible, &locator()).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_put_overwrites() {
        let mut cache = StrategyCache::new();
        cache.put(Action::Click, locator(), Strategy::xpath("//a[@id='go']"));
        cache.put(Action::Click, locator(), Strategy::xpath("//div[@id='go']"));

        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get(Action::Click, &locator()).unwrap().value,
            "//div[@id='go']"
        );
    }
}
