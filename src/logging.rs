//! Unified logging for configuration messages.
//!
//! Every message goes to `tracing`, tagged with the logger name and the
//! message identifier. An optional caller sink also receives the structured
//! [`Message`], which lets embedders and tests react to specific entries.

use crate::messages::{Level, Message};
use std::sync::Arc;

/// Callback receiving every message that passes the level filter.
pub type MessageSink = Arc<dyn Fn(&Message) + Send + Sync>;

/// Convert a message level to the tracing level it is emitted at.
pub fn level_to_tracing(level: Level) -> tracing::Level {
    match level {
        Level::Trace => tracing::Level::TRACE,
        Level::Information => tracing::Level::INFO,
        Level::Warning => tracing::Level::WARN,
        Level::Error => tracing::Level::ERROR,
    }
}

/// Logger used by the orchestrator.
///
/// Outputs to:
/// 1. tracing - always
/// 2. the caller sink - if one is set
#[derive(Clone)]
pub struct Logger {
    sink: Option<MessageSink>,
    min_level: Level,
    name: Option<String>,
}

impl Logger {
    pub fn new() -> Self {
        Self {
            sink: None,
            min_level: Level::Trace,
            name: None,
        }
    }

    /// Forward every logged message to the given callback.
    pub fn with_sink(mut self, sink: impl Fn(&Message) + Send + Sync + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Drop messages below `level`.
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn has_name(&self) -> bool {
        self.name.is_some()
    }

    /// Log a message to all configured endpoints.
    pub fn log(&self, message: &Message) {
        if message.level < self.min_level {
            return;
        }

        let name = self.name.as_deref().unwrap_or("confinode");
        let id = message.id();
        match message.level {
            Level::Error => tracing::error!(logger = %name, message_id = id, "{}", message),
            Level::Warning => tracing::warn!(logger = %name, message_id = id, "{}", message),
            Level::Information => tracing::info!(logger = %name, message_id = id, "{}", message),
            Level::Trace => tracing::trace!(logger = %name, message_id = id, "{}", message),
        }

        if let Some(ref sink) = self.sink {
            sink(message);
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::MessageContent;
    use std::sync::Mutex;

    #[test]
    fn test_level_to_tracing() {
        assert_eq!(level_to_tracing(Level::Trace), tracing::Level::TRACE);
        assert_eq!(level_to_tracing(Level::Information), tracing::Level::INFO);
        assert_eq!(level_to_tracing(Level::Warning), tracing::Level::WARN);
        assert_eq!(level_to_tracing(Level::Error), tracing::Level::ERROR);
    }

    #[test]
    fn test_sink_respects_filter() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let collected = seen.clone();
        let logger = Logger::new()
            .with_name("app")
            .with_min_level(Level::Information)
            .with_sink(move |message| collected.lock().unwrap().push(message.id()));

        logger.log(&Message::trace(MessageContent::LoadedFromCache));
        logger.log(&Message::new(
            Level::Information,
            MessageContent::LoadedConfiguration("/tmp/app.json".into()),
        ));

        logger.log(&Message::failure(crate::error::ConfinodeError::BadExtends));

        assert_eq!(*seen.lock().unwrap(), vec!["loadedConfiguration", "badExtends"]);
        assert!(logger.has_name());
    }
}
