use tokio::sync::mpsc;
use tracing::debug;

/// Notifications the correlation layer sends to whatever presents it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrelationEvent {
    /// Highlighted source line changed; `None` clears the highlight
    CorrelatedSourceLineChanged(Option<u32>),
    /// Parsing an entry's disassembly failed. Other entries are unaffected.
    DisassemblyLoadFailed {
        file: String,
        entry: String,
        reason: String,
    },
    /// The live-register report could not be used; disassembly still shows
    LiveRegistersUnavailable {
        file: String,
        entry: String,
        reason: String,
    },
}

pub type EventSender = mpsc::UnboundedSender<CorrelationEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<CorrelationEvent>;

/// Create a sender/receiver pair for correlation events
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Send if anyone is listening. A dropped receiver is not an error.
pub(crate) fn emit(sender: Option<&EventSender>, event: CorrelationEvent) {
    if let Some(sender) = sender {
        if sender.send(event).is_err() {
            debug!("Correlation event receiver dropped");
        }
    }
}
