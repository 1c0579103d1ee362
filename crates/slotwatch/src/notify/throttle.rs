//! Notification throttling.
//!
//! After `quota` availability messages the session sends one snooze message
//! and then stays quiet until it is restarted.

use crate::types::DeliveryWindow;

/// Availability messages allowed per session before snoozing.
pub const DEFAULT_QUOTA: u32 = 5;

/// A message the throttler decided to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// `n` windows are on offer (always at least 1).
    WindowsAvailable(usize),
    /// Quota reached; no more messages until restart.
    Snoozing,
}

impl Notification {
    /// Message body for the recipient.
    pub fn message(&self) -> String {
        match self {
            Notification::WindowsAvailable(1) => {
                "There is 1 delivery window available".to_string()
            }
            Notification::WindowsAvailable(n) => {
                format!("There are {n} delivery windows available")
            }
            Notification::Snoozing => {
                "Snoozing notifications until restart. Restart the watch to resume".to_string()
            }
        }
    }
}

/// Per-session notification counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleState {
    quota: u32,
    sent: u32,
    snoozed: bool,
}

impl ThrottleState {
    pub fn new(quota: u32) -> Self {
        Self {
            quota,
            sent: 0,
            snoozed: false,
        }
    }

    pub fn quota(&self) -> u32 {
        self.quota
    }

    /// Availability messages sent so far.
    pub fn sent(&self) -> u32 {
        self.sent
    }

    pub fn is_snoozed(&self) -> bool {
        self.snoozed
    }

    /// Decide what, if anything, to send for the latest result.
    pub fn observe(self, windows: &[DeliveryWindow]) -> (Option<Notification>, Self) {
        if windows.is_empty() || self.snoozed {
            return (None, self);
        }
        if self.sent < self.quota {
            let next = Self {
                sent: self.sent + 1,
                ..self
            };
            return (Some(Notification::WindowsAvailable(windows.len())), next);
        }
        let next = Self {
            snoozed: true,
            ..self
        };
        (Some(Notification::Snoozing), next)
    }

    /// Fresh counters with the same quota.
    pub fn reset(self) -> Self {
        Self::new(self.quota)
    }
}

impl Default for ThrottleState {
    fn default() -> Self {
        Self::new(DEFAULT_QUOTA)
    }
}
