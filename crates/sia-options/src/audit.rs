// crates/sia-options/src/audit.rs
// ============================================================================
// Module: Resolution Audit Logging
// Description: Structured audit events for configuration resolution.
// Purpose: Record source fallbacks and resolution outcomes as JSON lines.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Resolution runs once at agent startup, so the interesting facts are which
//! configuration source won and why the others were skipped. Events are
//! emitted as single JSON lines and routed through a [`ResolutionAuditSink`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Resolution stage that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStage {
    /// Primary account configuration.
    AccountConfig,
    /// Access-profile configuration.
    AccessProfile,
    /// Final options resolution.
    Options,
}

/// Outcome recorded for a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// The stage produced a value from its preferred source.
    Resolved,
    /// The preferred source failed and a fallback was attempted.
    Fallback,
    /// The stage failed.
    Rejected,
}

/// Resolution audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Stage that produced the event.
    pub stage: ResolutionStage,
    /// Stage outcome.
    pub outcome: ResolutionOutcome,
    /// Human-readable detail, usually the triggering error.
    pub detail: Option<String>,
}

impl ResolutionAuditEvent {
    /// Config file could not be used; falling back to instance metadata.
    #[must_use]
    pub fn config_fallback(detail: impl Into<String>) -> Self {
        Self::new("config_fallback", ResolutionStage::AccountConfig, ResolutionOutcome::Fallback)
            .with_detail(detail)
    }

    /// Access-profile file could not be used; falling back to instance metadata.
    #[must_use]
    pub fn profile_fallback(detail: impl Into<String>) -> Self {
        Self::new("profile_fallback", ResolutionStage::AccessProfile, ResolutionOutcome::Fallback)
            .with_detail(detail)
    }

    /// Options resolved for the named identity.
    #[must_use]
    pub fn options_resolved(name: impl Into<String>) -> Self {
        Self::new("options_resolved", ResolutionStage::Options, ResolutionOutcome::Resolved)
            .with_detail(name)
    }

    /// A stage failed without a usable fallback.
    #[must_use]
    pub fn options_rejected(stage: ResolutionStage, detail: impl Into<String>) -> Self {
        Self::new("options_rejected", stage, ResolutionOutcome::Rejected).with_detail(detail)
    }

    /// Builds an event stamped with the current time.
    fn new(event: &'static str, stage: ResolutionStage, outcome: ResolutionOutcome) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            stage,
            outcome,
            detail: None,
        }
    }

    /// Attaches a detail string.
    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for resolution events.
pub trait ResolutionAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &ResolutionAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl ResolutionAuditSink for StderrAuditSink {
    fn record(&self, event: &ResolutionAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// Append-only log handle.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ResolutionAuditSink for FileAuditSink {
    fn record(&self, event: &ResolutionAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl ResolutionAuditSink for NoopAuditSink {
    fn record(&self, _event: &ResolutionAuditEvent) {}
}

/// Audit sink that keeps events in memory.
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<ResolutionAuditEvent>>,
}

impl MemoryAuditSink {
    /// Returns the recorded event identifiers in arrival order.
    #[must_use]
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .map(|events| events.iter().map(|event| event.event).collect())
            .unwrap_or_default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<ResolutionAuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl ResolutionAuditSink for MemoryAuditSink {
    fn record(&self, event: &ResolutionAuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
