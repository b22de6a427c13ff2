//! Tracing capture — a `tracing` layer that keeps emitted records for
//! assertions.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Registry;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// One captured tracing event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRecord {
    /// Severity of the event.
    pub level: Level,
    /// The event's message.
    pub message: String,
    /// Every other field, rendered as `name=value`.
    pub fields: Vec<String>,
}

impl fmt::Display for CapturedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.level, self.message)?;
        for field in &self.fields {
            write!(f, " {field}")?;
        }
        Ok(())
    }
}

/// Captures every tracing event emitted while installed as the thread's
/// default subscriber.
///
/// ```ignore
/// let capture = LogCapture::new();
/// let _guard = capture.set_default();
/// // ... code under test ...
/// assert_eq!(capture.warnings().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    records: Arc<Mutex<Vec<CapturedRecord>>>,
}

impl LogCapture {
    /// Creates an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the capture as the default subscriber for the current thread
    /// until the returned guard is dropped.
    #[must_use]
    pub fn set_default(&self) -> DefaultGuard {
        tracing::subscriber::set_default(Registry::default().with(self.clone()))
    }

    /// Every captured record, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<CapturedRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Captured records at `level`, rendered with their fields.
    #[must_use]
    pub fn at_level(&self, level: Level) -> Vec<String> {
        self.records()
            .iter()
            .filter(|record| record.level == level)
            .map(ToString::to_string)
            .collect()
    }

    /// Captured `warn` records, rendered with their fields.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.at_level(Level::WARN)
    }

    /// Captured `error` records, rendered with their fields.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.at_level(Level::ERROR)
    }
}

impl<S> Layer<S> for LogCapture
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CapturedRecord {
                level: *event.metadata().level(),
                message: visitor.message,
                fields: visitor.fields,
            });
    }
}

#[derive(Default)]
struct RecordVisitor {
    message: String,
    fields: Vec<String>,
}

impl Visit for RecordVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={value:?}", field.name()));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            value.clone_into(&mut self.message);
        } else {
            self.fields.push(format!("{}={value}", field.name()));
        }
    }
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::LogCapture;

    #[test]
    fn test_captures_level_message_and_fields() {
        // Arrange
        let capture = LogCapture::new();
        let _guard = capture.set_default();

        // Act
        tracing::warn!(event_type = %"OrderPlaced", queued = 0, "no handlers");
        tracing::debug!("ignored by warnings()");

        // Assert
        let records = capture.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].level, Level::WARN);
        assert_eq!(
            capture.warnings(),
            vec!["WARN no handlers event_type=OrderPlaced queued=0"]
        );
    }

    #[test]
    fn test_capture_ends_when_the_guard_is_dropped() {
        let capture = LogCapture::new();
        {
            let _guard = capture.set_default();
            tracing::error!("inside");
        }

        tracing::error!("outside");

        assert_eq!(capture.errors().len(), 1);
    }
}
