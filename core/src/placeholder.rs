use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::debug;

/// Hints shown in the empty input, in display order
pub const TIPS: [&str; 8] = [
    "How long have the symptoms been going on?",
    "Did the patient describe any triggers?",
    "What tests were ordered?",
    "Any concerns about side effects?",
    "Has it worsened recently?",
    "Any recent travel or exposures?",
    "What follow-up was recommended?",
    "What medications are being used?",
];

/// Cursor over [`TIPS`] that wraps around
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderRotator {
    index: usize,
}

impl PlaceholderRotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &'static str {
        TIPS[self.index]
    }

    pub fn advance(&mut self) -> &'static str {
        self.index = (self.index + 1) % TIPS.len();
        self.current()
    }
}

/// Background task advancing the placeholder on a fixed period.
///
/// Starts at the first hint. Dropping the ticker stops the task.
#[derive(Debug)]
pub struct PlaceholderTicker {
    rx: watch::Receiver<&'static str>,
    handle: JoinHandle<()>,
}

impl PlaceholderTicker {
    pub fn start(period: Duration) -> Self {
        // tokio intervals reject a zero period
        let period = period.max(Duration::from_millis(1));
        let (tx, rx) = watch::channel(TIPS[0]);

        let handle = tokio::spawn(async move {
            let mut rotator = PlaceholderRotator::new();
            let mut ticks = interval_at(Instant::now() + period, period);
            loop {
                ticks.tick().await;
                let hint = rotator.advance();
                if tx.send(hint).is_err() {
                    break;
                }
            }
        });
        debug!("Placeholder ticker started ({:?})", period);

        Self { rx, handle }
    }

    pub fn current(&self) -> &'static str {
        *self.rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<&'static str> {
        self.rx.clone()
    }

    pub fn stop(self) {}
}

impl Drop for PlaceholderTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
