// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Aeromesh Team

//! Structured notice sink for warnings and diagnostics
//!
//! Engines never print; they record notices on an explicit `Reporter` passed
//! into each call, and the host routes them to a console, log, or UI panel.

use serde::{Deserialize, Serialize};

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A single structured notice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

/// Collects notices emitted during an engine call.
#[derive(Debug, Default)]
pub struct Reporter {
    notices: Vec<Notice>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    fn push(&mut self, severity: Severity, message: impl Into<String>) {
        self.notices.push(Notice {
            severity,
            message: message.into(),
        });
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn warning_count(&self) -> usize {
        self.notices
            .iter()
            .filter(|n| n.severity == Severity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.notices.iter().any(|n| n.severity == Severity::Error)
    }

    /// Drain all collected notices, leaving the reporter empty.
    pub fn take(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}
