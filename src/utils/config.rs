/// Engine timing and threshold configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Wait budget for the original locator (the happy path).
    pub primary_timeout_ms: u64,

    /// Wait budget for each cached-strategy or candidate probe.
    pub probe_timeout_ms: u64,

    /// Pause between candidate probes, tolerating animations and
    /// transitions settling.
    pub fallback_delay_ms: u64,

    /// Poll interval while waiting for a redirect.
    pub redirect_poll_interval_ms: u64,

    /// How many parent levels the intercept ladder walks up.
    pub max_ancestor_levels: u32,

    /// Bounding-box origin distance under which a clickable neighbor is
    /// treated as the intended target.
    pub proximity_threshold_px: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            primary_timeout_ms: 10_000,
            probe_timeout_ms: 500,
            fallback_delay_ms: 500,
            redirect_poll_interval_ms: 500,
            max_ancestor_levels: 5,
            proximity_threshold_px: 50.0,
        }
    }
}
