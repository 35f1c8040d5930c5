//! Progress reporting for runs and batches.
//!
//! Consumers implement [`ProgressSink`] (or pass a closure) and receive
//! `(percent, label)` pairs. Within one run the percentage never decreases.

use log::info;

// ============================================================================
// Stages
// ============================================================================

/// Pipeline states, in the only order they can occur.
///
/// `Intercepted` is skipped entirely when no eavesdropper is simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Init,
    Prepared,
    Transmitted,
    Intercepted,
    Measured,
    Reconciled,
    Classified,
    Complete,
}

impl Stage {
    pub fn percent(self) -> u8 {
        match self {
            Stage::Init => 0,
            Stage::Prepared => 15,
            Stage::Transmitted => 30,
            Stage::Intercepted => 45,
            Stage::Measured => 60,
            Stage::Reconciled => 75,
            Stage::Classified => 90,
            Stage::Complete => 100,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Init => "Initializing simulation",
            Stage::Prepared => "Alice prepared qubits",
            Stage::Transmitted => "Qubits sent over quantum channel",
            Stage::Intercepted => "Eve intercepted and resent qubits",
            Stage::Measured => "Bob measured qubits",
            Stage::Reconciled => "Bases reconciled and key extracted",
            Stage::Classified => "Security level classified",
            Stage::Complete => "Simulation complete",
        }
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Trait for consuming progress notifications
pub trait ProgressSink {
    fn progress(&mut self, percent: u8, label: &str);
}

impl<F> ProgressSink for F
where
    F: FnMut(u8, &str),
{
    fn progress(&mut self, percent: u8, label: &str) {
        self(percent, label)
    }
}

/// Discards everything
pub struct NoOpSink;

impl ProgressSink for NoOpSink {
    #[inline(always)]
    fn progress(&mut self, _percent: u8, _label: &str) {}
}

/// Forwards progress to the `log` facade at info level
pub struct LoggingProgressSink {
    prefix: String,
}

impl LoggingProgressSink {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl ProgressSink for LoggingProgressSink {
    fn progress(&mut self, percent: u8, label: &str) {
        info!("{}{:>3}% {}", self.prefix, percent, label);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub percent: u8,
    pub label: String,
}

/// Collects events in memory for later inspection
#[derive(Debug, Default)]
pub struct CollectorSink {
    pub events: Vec<ProgressEvent>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn into_events(self) -> Vec<ProgressEvent> {
        self.events
    }

    pub fn is_monotonic(&self) -> bool {
        self.events.windows(2).all(|w| w[0].percent <= w[1].percent)
    }
}

impl ProgressSink for CollectorSink {
    fn progress(&mut self, percent: u8, label: &str) {
        self.events.push(ProgressEvent {
            percent,
            label: label.to_string(),
        });
    }
}

/// Combines multiple sinks
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Box<dyn ProgressSink>>,
}

impl MultiSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(&mut self, sink: Box<dyn ProgressSink>) {
        self.sinks.push(sink);
    }
}

impl ProgressSink for MultiSink {
    fn progress(&mut self, percent: u8, label: &str) {
        for sink in &mut self.sinks {
            sink.progress(percent, label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_percentages_increase() {
        let stages = [
            Stage::Init,
            Stage::Prepared,
            Stage::Transmitted,
            Stage::Intercepted,
            Stage::Measured,
            Stage::Reconciled,
            Stage::Classified,
            Stage::Complete,
        ];
        for w in stages.windows(2) {
            assert!(w[0] < w[1]);
            assert!(w[0].percent() < w[1].percent());
        }
        assert_eq!(Stage::Init.percent(), 0);
        assert_eq!(Stage::Complete.percent(), 100);
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |p: u8, l: &str| seen.push((p, l.to_string()));
            sink.progress(15, "x");
            sink.progress(30, "y");
        }
        assert_eq!(seen, vec![(15, "x".to_string()), (30, "y".to_string())]);
    }

    #[test]
    fn test_collector_monotonic_check() {
        let mut c = CollectorSink::new();
        c.progress(0, "a");
        c.progress(50, "b");
        assert!(c.is_monotonic());
        c.progress(40, "c");
        assert!(!c.is_monotonic());
        assert_eq!(c.into_events().len(), 3);
    }

    #[test]
    fn test_multi_sink_fans_out() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let count = Rc::new(RefCell::new(0));
        let mut multi = MultiSink::new();
        for _ in 0..3 {
            let count = Rc::clone(&count);
            multi.add_sink(Box::new(move |_p: u8, _l: &str| *count.borrow_mut() += 1));
        }
        multi.progress(10, "tick");
        assert_eq!(*count.borrow(), 3);
    }
}
