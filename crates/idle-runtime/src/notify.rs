//! User-facing notifications pushed out of the engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long non-sticky notifications stay on screen.
pub const AUTO_DISMISS_AFTER: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Default,
    Error,
    Boost,
    LevelUp,
}

impl Severity {
    /// Sticky notifications stay until dismissed.
    pub fn is_sticky(self) -> bool {
        self == Severity::LevelUp
    }

    pub fn auto_dismiss_after(self) -> Option<Duration> {
        (!self.is_sticky()).then_some(AUTO_DISMISS_AFTER)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl Notification {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
            details: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Error)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }

    pub fn with_details<I, T>(mut self, details: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.details.extend(details.into_iter().map(Into::into));
        self
    }

    /// Emit the notification on the tracing stream.
    pub fn log(&self) {
        match self.severity {
            Severity::Error => warn!(details = ?self.details, "{}", self.message),
            Severity::LevelUp | Severity::Boost => info!(details = ?self.details, "{}", self.message),
            Severity::Default => debug!(details = ?self.details, "{}", self.message),
        }
    }
}

/// Receiver of forwarded notifications, such as a toast list or a console.
///
/// Notifications are already logged when raised, so sinks only render them.
pub trait Notifier {
    fn notify(&mut self, n: Notification);
}

impl Notifier for Vec<Notification> {
    fn notify(&mut self, n: Notification) {
        self.push(n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_level_ups_are_sticky() {
        assert!(Severity::LevelUp.is_sticky());
        assert_eq!(Severity::LevelUp.auto_dismiss_after(), None);
        for s in [Severity::Default, Severity::Error, Severity::Boost] {
            assert_eq!(s.auto_dismiss_after(), Some(Duration::from_secs(3)));
        }
    }

    #[test]
    fn severity_wire_names() {
        assert_eq!(serde_json::to_string(&Severity::LevelUp).unwrap(), "\"level-up\"");
        let n = Notification::new("hi", Severity::Boost).with_detail("x2");
        let v = serde_json::to_value(&n).unwrap();
        assert_eq!(v["severity"], "boost");
        assert_eq!(v["details"][0], "x2");
        let plain = serde_json::to_value(Notification::error("bad")).unwrap();
        assert!(plain.get("details").is_none());
    }
}
