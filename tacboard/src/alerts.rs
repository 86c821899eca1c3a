use log::*;
use std::fmt;
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Info,
    Success,
    Loading,
    Validation,
    Error,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "ok"),
            Self::Loading => write!(f, "loading"),
            Self::Validation => write!(f, "invalid"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
    expires_at: Instant,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Toast-style notices that dismiss themselves after a fixed time
#[derive(Debug)]
pub struct AlertCenter {
    alerts: Vec<Alert>,
    auto_dismiss: Duration,
}

impl AlertCenter {
    pub fn new(auto_dismiss: Duration) -> Self {
        Self {
            alerts: vec![],
            auto_dismiss,
        }
    }

    pub fn push(&mut self, kind: AlertKind, message: impl Into<String>, now: Instant) {
        let message = message.into();
        match kind {
            AlertKind::Error => error!("{message}"),
            AlertKind::Validation => warn!("{message}"),
            AlertKind::Info | AlertKind::Success | AlertKind::Loading => info!("{message}"),
        }
        // A loading notice is done with as soon as anything else is shown
        self.alerts.retain(|a| a.kind != AlertKind::Loading);
        self.alerts.push(Alert {
            kind,
            message,
            expires_at: now + self.auto_dismiss,
        });
    }

    /// Drops expired alerts and returns the rest, oldest first
    pub fn active(&mut self, now: Instant) -> &[Alert] {
        self.alerts.retain(|a| a.expires_at > now);
        &self.alerts
    }

    pub fn dismiss_all(&mut self) {
        self.alerts.clear();
    }
}
