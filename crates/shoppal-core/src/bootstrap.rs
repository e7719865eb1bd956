//! One-shot startup work.

use std::sync::atomic::{AtomicBool, Ordering};

/// A flag that lets exactly one caller through.
///
/// Lifecycle: unfired at process start, fired by the first successful
/// [`OnceGate::try_fire`], and only cleared again by [`OnceGate::reset`]
/// (which exists for tests; a real run never calls it).
#[derive(Debug)]
pub struct OnceGate {
    fired: AtomicBool,
}

impl OnceGate {
    pub const fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
        }
    }

    /// Returns `true` for the first caller only.
    pub fn try_fire(&self) -> bool {
        self.fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.fired.store(false, Ordering::Release);
    }
}

impl Default for OnceGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Guards the empty "nudge" sent when the chat first opens, so the agent
/// greets the user exactly once per process.
pub static STARTUP_GREETING: OnceGate = OnceGate::new();
