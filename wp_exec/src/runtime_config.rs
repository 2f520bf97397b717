//! # Runtime Configuration
//!
//! Live-tunable parameters of the updater. The configuration is held as an immutable snapshot
//! which is swapped wholesale on every reconfiguration. Readers take a snapshot and keep using it
//! for as long as they need, so a reconfiguration arriving mid-tick is seen on the next tick.
//!
//! Side effects of a change are left to the readers: the scheduler keeps its own snapshot and
//! diffs it against the latest one to decide when to recompute its tick period.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, RwLock,
};

use comms_if::ctrl::Config;
use log::info;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Which fields differ between two configurations.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ConfigChanges {
    pub tick_rate: bool,
    pub window_length: bool,
    pub default_speed: bool,
}

pub struct RuntimeConfig {
    current: RwLock<Arc<Config>>,

    /// Set permanently on the first reconfiguration, after which the live values are
    /// authoritative over the initial ones.
    received: AtomicBool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ConfigChanges {
    pub fn between(old: &Config, new: &Config) -> Self {
        Self {
            tick_rate: old.tick_rate_hz != new.tick_rate_hz,
            window_length: old.window_length != new.window_length,
            default_speed: old.default_speed_ms != new.default_speed_ms,
        }
    }

    pub fn any(&self) -> bool {
        self.tick_rate || self.window_length || self.default_speed
    }
}

impl RuntimeConfig {
    /// Create a new configuration holding the initial values.
    pub fn new(initial: Config) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
            received: AtomicBool::new(false),
        }
    }

    /// Apply a reconfiguration request.
    ///
    /// All fields are replaced whether or not they changed. The accepted configuration is
    /// returned so it can be echoed back to the requester.
    pub fn apply(&self, new: Config) -> Config {
        if !self.received.swap(true, Ordering::SeqCst) {
            info!("First reconfiguration received, live configuration now in use");
        }

        info!("Received reconfiguration {:?}", new);

        let old = {
            let mut current = self
                .current
                .write()
                .expect("RuntimeConfig: config lock poisoned");
            std::mem::replace(&mut *current, Arc::new(new))
        };

        let changes = ConfigChanges::between(&old, &new);

        if changes.tick_rate {
            info!(
                "Adjusting tick rate from {} Hz to {} Hz",
                old.tick_rate_hz, new.tick_rate_hz
            );
        }
        if changes.default_speed {
            info!(
                "Adjusting default speed from {} m/s to {} m/s",
                old.default_speed_ms, new.default_speed_ms
            );
        }
        if changes.window_length {
            info!(
                "Adjusting window length from {} to {} points",
                old.window_length, new.window_length
            );
        }

        new
    }

    /// Get the latest configuration snapshot.
    pub fn snapshot(&self) -> Arc<Config> {
        self.current
            .read()
            .expect("RuntimeConfig: config lock poisoned")
            .clone()
    }

    /// True once any reconfiguration has been applied.
    pub fn received(&self) -> bool {
        self.received.load(Ordering::SeqCst)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_apply() {
        let rc = RuntimeConfig::default();
        assert!(!rc.received());

        let before = rc.snapshot();
        assert_eq!(*before, Config::default());

        let new = Config {
            tick_rate_hz: 10.0,
            ..Config::default()
        };
        assert_eq!(rc.apply(new), new);
        assert!(rc.received());

        // Old snapshots are unaffected by the swap
        assert_eq!(before.tick_rate_hz, 3.0);
        assert_eq!(rc.snapshot().tick_rate_hz, 10.0);

        // Reapplying the same values still counts as received and still overwrites
        assert_eq!(rc.apply(new), new);
        assert!(rc.received());
    }

    #[test]
    fn test_changes() {
        let old = Config::default();

        assert!(!ConfigChanges::between(&old, &old).any());

        let new = Config {
            window_length: 3,
            default_speed_ms: 5.0,
            ..old
        };
        assert_eq!(
            ConfigChanges::between(&old, &new),
            ConfigChanges {
                tick_rate: false,
                window_length: true,
                default_speed: true
            }
        );
    }
}
