//! Per-candidate trace of the cascade, for debugging filter configuration.
//!
//! The orchestrator reports every noteworthy step to an optional
//! [`CandidateObserver`]. Each event carries the flags known so far, so a
//! consumer can write it out as one flat row.

use serde::Serialize;

use crate::types::{Candidate, RejectReason};

/// Step at which a trace event was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TraceStage {
    /// Raw candidate seen, before any filter.
    Listed,
    /// Static document retrieved.
    Fetched,
    /// Identity pattern missed on the static page; decision deferred.
    PatternPending,
    Rejected(RejectReason),
    Accepted,
    /// The provider returned an empty page.
    NoResults,
}

impl TraceStage {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Listed => "listed",
            Self::Fetched => "fetched",
            Self::PatternPending => "pattern_no_match_yet",
            Self::Rejected(reason) => reason.code(),
            Self::Accepted => "accepted",
            Self::NoResults => "cse_no_results",
        }
    }
}

/// Snapshot of one candidate at one step.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub query: String,
    pub url: String,
    pub title: String,
    pub domain: String,
    pub passed_domain: Option<bool>,
    pub passed_url_regex: Option<bool>,
    pub fetched: bool,
    pub matched_pattern: Option<bool>,
    pub used_js: bool,
    pub price: Option<f64>,
    pub stage: TraceStage,
}

impl TraceEvent {
    pub fn listed(query: &str, candidate: &Candidate, domain: &str) -> Self {
        Self {
            query: query.to_string(),
            url: candidate.url.clone(),
            title: candidate.title.clone(),
            domain: domain.to_string(),
            passed_domain: None,
            passed_url_regex: None,
            fetched: false,
            matched_pattern: None,
            used_js: false,
            price: None,
            stage: TraceStage::Listed,
        }
    }

    pub fn no_results(query: &str) -> Self {
        Self {
            query: query.to_string(),
            url: String::new(),
            title: String::new(),
            domain: String::new(),
            passed_domain: None,
            passed_url_regex: None,
            fetched: false,
            matched_pattern: None,
            used_js: false,
            price: None,
            stage: TraceStage::NoResults,
        }
    }

    /// Reason code written to the `filtered_out_reason` column.
    pub fn reason(&self) -> &'static str {
        self.stage.code()
    }
}

/// Receives trace events as candidates move through the cascade.
pub trait CandidateObserver: Send + Sync {
    fn observe(&self, event: &TraceEvent);
}

/// Observer that records events in memory.
#[derive(Default)]
pub struct TraceLog {
    events: std::sync::Mutex<Vec<TraceEvent>>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Reason codes of every recorded event, in order.
    pub fn reasons(&self) -> Vec<&'static str> {
        self.events().iter().map(TraceEvent::reason).collect()
    }
}

impl CandidateObserver for TraceLog {
    fn observe(&self, event: &TraceEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_codes() {
        assert_eq!(TraceStage::PatternPending.code(), "pattern_no_match_yet");
        assert_eq!(
            TraceStage::Rejected(RejectReason::DomainNotAllowed).code(),
            "domain_not_whitelisted"
        );
        assert_eq!(TraceStage::NoResults.code(), "cse_no_results");
    }

    #[test]
    fn test_trace_log_records_in_order() {
        let log = TraceLog::new();
        let c = Candidate::new("https://a.pl/1", "A");
        let mut e = TraceEvent::listed("q", &c, "a.pl");
        log.observe(&e);
        e.stage = TraceStage::Accepted;
        log.observe(&e);
        assert_eq!(log.reasons(), vec!["listed", "accepted"]);
    }
}
