// SPDX-License-Identifier: MIT OR Apache-2.0

//! A logger that tags records with the ambient correlation.

use std::sync::Arc;

use logwise::{LogRecord, Logger};

use crate::correlation::Correlation;

/**
A [`Logger`] that appends the current [`Correlation`] to every record, then
forwards the record to an inner logger.

The correlation is read on the thread that submits the record, at the time it is
submitted, so records emitted under [`Correlation::scope`] or under a snapshot
carrying a correlation pick it up automatically. Records submitted with no
correlation are forwarded unchanged. Ambient state is never modified.

The trailing fields look like this:

```text
 trace_id=4bf92f3577b34da6a3ce929d0e0e4736 span_id=00f067aa0ba902b7 trace_flags=01
```

```rust
use ambient::CorrelatedLogger;
use ambient::correlation::{Correlation, SpanId, TraceId};
use logwise::{InMemoryLogger, Level, LogRecord, Logger};
use std::sync::Arc;

let memory = Arc::new(InMemoryLogger::new());
let logger = CorrelatedLogger::new(memory.clone());

Correlation::new(TraceId(1), SpanId(2)).scope(|| {
    let mut record = LogRecord::new(Level::Info);
    record.log("hello");
    logger.finish_log_record(record);
});
assert!(memory.drain_logs().contains("hello trace_id=00000000000000000000000000000001 span_id=0000000000000002"));
```
*/
#[derive(Debug, Clone)]
pub struct CorrelatedLogger {
    inner: Arc<dyn Logger>,
}

impl CorrelatedLogger {
    pub fn new(inner: Arc<dyn Logger>) -> Self {
        Self { inner }
    }

    fn annotate(record: &mut LogRecord) {
        if let Some(c) = Correlation::current() {
            record.log_owned(format!(
                " trace_id={} span_id={} trace_flags={}",
                c.trace_id, c.span_id, c.flags
            ));
        }
    }
}

impl Logger for CorrelatedLogger {
    fn finish_log_record(&self, mut record: LogRecord) {
        Self::annotate(&mut record);
        self.inner.finish_log_record(record);
    }

    fn finish_log_record_async<'s>(
        &'s self,
        mut record: LogRecord,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 's>> {
        //read now; the future may be polled somewhere else
        Self::annotate(&mut record);
        self.inner.finish_log_record_async(record)
    }

    fn prepare_to_die(&self) {
        self.inner.prepare_to_die();
    }
}

/// Wraps every global logger in a [`CorrelatedLogger`].
///
/// Call this once during startup. Calling it again wraps the loggers a second
/// time and the fields are appended twice.
pub fn install_correlated_loggers() {
    let wrapped = logwise::global_loggers()
        .into_iter()
        .map(|logger| Arc::new(CorrelatedLogger::new(logger)) as Arc<dyn Logger>)
        .collect();
    logwise::set_global_loggers(wrapped);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::{SpanId, TraceFlags, TraceId};
    use logwise::{InMemoryLogger, Level};

    fn record(text: &str) -> LogRecord {
        let mut record = LogRecord::new(Level::Info);
        record.log(text);
        record
    }

    #[test]
    fn uncorrelated_records_pass_through() {
        let memory = Arc::new(InMemoryLogger::new());
        let logger = CorrelatedLogger::new(memory.clone());
        logger.finish_log_record(record("plain"));
        assert_eq!(memory.drain_logs(), "plain");
    }

    #[test]
    fn fields_are_appended() {
        let memory = Arc::new(InMemoryLogger::new());
        let logger = CorrelatedLogger::new(memory.clone());
        let c = Correlation::new(TraceId(0xabc), SpanId(0xdef)).with_flags(TraceFlags::SAMPLED);
        c.scope(|| logger.finish_log_record(record("tagged")));
        assert_eq!(
            memory.drain_logs(),
            "tagged trace_id=00000000000000000000000000000abc span_id=0000000000000def trace_flags=01"
        );
    }

    #[test]
    fn async_path_reads_at_submission() {
        let memory = Arc::new(InMemoryLogger::new());
        let logger = CorrelatedLogger::new(memory.clone());
        let fut = Correlation::new(TraceId(5), SpanId(6)).scope(|| logger.finish_log_record_async(record("later")));
        // polled after the scope has ended
        test_executors::spin_on(fut);
        let logs = memory.drain_logs();
        assert!(logs.starts_with("later trace_id="), "{logs}");
        assert!(logs.contains("span_id=0000000000000006"), "{logs}");
    }
}
