//! Timing information attached to every mounting transaction.

use std::time::{Duration, Instant};

/// Timestamps of the phases of one commit.
#[derive(Debug, Clone, Default)]
pub struct TransactionTelemetry {
    commit_start: Option<Instant>,
    commit_end: Option<Instant>,
    diff_start: Option<Instant>,
    diff_end: Option<Instant>,
    layout_start: Option<Instant>,
    layout_end: Option<Instant>,
    number_of_mutations: usize,
}

impl TransactionTelemetry {
    pub fn new() -> TransactionTelemetry {
        TransactionTelemetry::default()
    }

    pub fn will_commit(&mut self) {
        self.commit_start = Some(Instant::now());
    }

    pub fn did_commit(&mut self) {
        self.commit_end = Some(Instant::now());
    }

    pub fn will_diff(&mut self) {
        self.diff_start = Some(Instant::now());
    }

    pub fn did_diff(&mut self) {
        self.diff_end = Some(Instant::now());
    }

    pub fn will_layout(&mut self) {
        self.layout_start = Some(Instant::now());
    }

    pub fn did_layout(&mut self) {
        self.layout_end = Some(Instant::now());
    }

    pub fn set_number_of_mutations(&mut self, number_of_mutations: usize) {
        self.number_of_mutations = number_of_mutations;
    }

    pub fn number_of_mutations(&self) -> usize {
        self.number_of_mutations
    }

    pub fn commit_start(&self) -> Option<Instant> {
        self.commit_start
    }

    pub fn commit_end(&self) -> Option<Instant> {
        self.commit_end
    }

    pub fn commit_duration(&self) -> Option<Duration> {
        Some(self.commit_end?.duration_since(self.commit_start?))
    }

    pub fn diff_duration(&self) -> Option<Duration> {
        Some(self.diff_end?.duration_since(self.diff_start?))
    }

    /// Duration of the layout pass; `None` if the commit did not lay out.
    pub fn layout_duration(&self) -> Option<Duration> {
        Some(self.layout_end?.duration_since(self.layout_start?))
    }
}

#[test]
fn test_telemetry_durations() {
    let mut telemetry = TransactionTelemetry::new();
    assert_eq!(telemetry.commit_duration(), None);

    telemetry.will_commit();
    telemetry.will_diff();
    telemetry.did_diff();
    telemetry.did_commit();
    telemetry.set_number_of_mutations(3);

    let commit = telemetry.commit_duration().expect("commit should be timed");
    let diff = telemetry.diff_duration().expect("diff should be timed");
    assert!(diff <= commit, "the diff happens during the commit");
    assert_eq!(telemetry.layout_duration(), None, "there was no layout pass");
    assert_eq!(telemetry.number_of_mutations(), 3);
}
