use std::fmt;

/// Operator-facing notifications raised by background work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alarm {
    HostJoined { addr: String, version: String },
    UpdateAvailable { current: String, latest: String },
}

impl fmt::Display for Alarm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alarm::HostJoined { addr, version } => {
                write!(f, "worker {} joined (version {})", addr, version)
            }
            Alarm::UpdateAvailable { current, latest } => {
                write!(f, "version {} available (running {})", latest, current)
            }
        }
    }
}

pub trait AlarmSink: Send + Sync {
    fn notify(&self, alarm: Alarm);
}

#[derive(Debug, Clone, Default)]
pub struct LogAlarm;

impl AlarmSink for LogAlarm {
    fn notify(&self, alarm: Alarm) {
        tracing::warn!(%alarm, "alarm");
    }
}
