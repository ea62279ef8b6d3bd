//! The rule consumer: a single thread draining the result store to the sink.
//!
//! Writes the formatted header on startup, then emits every published rule
//! exactly once, in publication order, as soon as it arrives. On
//! termination it performs a final drain and flushes. Sink errors do not
//! touch the mining loop; they travel back to the driver through the join
//! handle, carrying the sink with them so the driver can keep using it.

use std::io::Write;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::assistant::MiningAssistant;
use crate::error::SinkError;
use crate::results::ResultStore;

/// The boxed output stream rules are written to.
pub type RuleSink = Box<dyn Write + Send>;

/// Spawn the consumer thread.
///
/// The thread returns the sink on success so the driver can reclaim it.
pub fn spawn(
    assistant: Arc<dyn MiningAssistant>,
    store: Arc<ResultStore>,
    sink: RuleSink,
) -> JoinHandle<Result<RuleSink, SinkError>> {
    std::thread::spawn(move || run(assistant, store, sink))
}

fn run(
    assistant: Arc<dyn MiningAssistant>,
    store: Arc<ResultStore>,
    mut sink: RuleSink,
) -> Result<RuleSink, SinkError> {
    sink.write_all(assistant.header().as_bytes())?;
    let mut consumed = 0;
    loop {
        let drained = store.wait_new(consumed);
        for rule in &drained.rules {
            writeln!(sink, "{}", assistant.format(rule))?;
        }
        consumed += drained.rules.len();
        if drained.done {
            sink.flush()?;
            tracing::debug!(rules = consumed, "consumer drained and terminated");
            return Ok(sink);
        }
    }
}
