//! Host-injected log sinks for the weaving pipeline.
//!
//! The weaver does not own a logging framework. Instead the host injects plain
//! string-consuming callbacks (the same contract an MSBuild-style build task
//! exposes), and the weaver reports phase transitions and per-type activity
//! through them. All sinks default to no-ops, so a [`WeaveLogger`] is always
//! safe to call.
//!
//! # Examples
//!
//! ```rust
//! use dotweave::WeaveLogger;
//!
//! let logger = WeaveLogger::new()
//!     .with_info(|message| println!("weaver: {message}"))
//!     .with_error(|message| eprintln!("weaver error: {message}"));
//!
//! logger.info("starting weaving pass");
//! ```

use std::fmt;

/// A boxed string-consuming callback used as a log sink.
type LogSink = Box<dyn Fn(&str) + Send + Sync>;

fn noop() -> LogSink {
    Box::new(|_| {})
}

/// Debug/info/warning/error sinks injected by the host.
///
/// Each sink is an independent callback; unset sinks discard their messages.
/// The logger is a thin side-channel: nothing in the transformation logic
/// depends on it.
pub struct WeaveLogger {
    debug: LogSink,
    info: LogSink,
    warning: LogSink,
    error: LogSink,
}

impl WeaveLogger {
    /// Creates a logger whose sinks all discard their messages.
    #[must_use]
    pub fn new() -> Self {
        WeaveLogger {
            debug: noop(),
            info: noop(),
            warning: noop(),
            error: noop(),
        }
    }

    /// Replaces the debug sink.
    #[must_use]
    pub fn with_debug(mut self, sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.debug = Box::new(sink);
        self
    }

    /// Replaces the info sink.
    #[must_use]
    pub fn with_info(mut self, sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.info = Box::new(sink);
        self
    }

    /// Replaces the warning sink.
    #[must_use]
    pub fn with_warning(mut self, sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.warning = Box::new(sink);
        self
    }

    /// Replaces the error sink.
    #[must_use]
    pub fn with_error(mut self, sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.error = Box::new(sink);
        self
    }

    /// Sends a message to the debug sink.
    pub fn debug(&self, message: &str) {
        (self.debug)(message);
    }

    /// Sends a message to the info sink.
    pub fn info(&self, message: &str) {
        (self.info)(message);
    }

    /// Sends a message to the warning sink.
    pub fn warning(&self, message: &str) {
        (self.warning)(message);
    }

    /// Sends a message to the error sink.
    pub fn error(&self, message: &str) {
        (self.error)(message);
    }
}

impl Default for WeaveLogger {
    fn default() -> Self {
        WeaveLogger::new()
    }
}

impl fmt::Debug for WeaveLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeaveLogger")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_default_sinks_are_noops() {
        let logger = WeaveLogger::new();
        logger.debug("d");
        logger.info("i");
        logger.warning("w");
        logger.error("e");
    }

    #[test]
    fn test_sinks_receive_messages() {
        let received = Arc::new(Mutex::new(Vec::new()));

        let sink = {
            let received = received.clone();
            move |message: &str| received.lock().unwrap().push(message.to_string())
        };

        let logger = WeaveLogger::new().with_debug(sink);
        logger.debug("first");
        logger.debug("second");
        logger.info("not captured");

        let messages = received.lock().unwrap();
        assert_eq!(messages.as_slice(), ["first", "second"]);
    }

    #[test]
    fn test_independent_sinks() {
        let infos = Arc::new(Mutex::new(0usize));
        let errors = Arc::new(Mutex::new(0usize));

        let logger = WeaveLogger::new()
            .with_info({
                let infos = infos.clone();
                move |_| *infos.lock().unwrap() += 1
            })
            .with_error({
                let errors = errors.clone();
                move |_| *errors.lock().unwrap() += 1
            });

        logger.info("a");
        logger.info("b");
        logger.error("c");

        assert_eq!(*infos.lock().unwrap(), 2);
        assert_eq!(*errors.lock().unwrap(), 1);
    }
}
