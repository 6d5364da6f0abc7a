// crates/grc-core/src/dashboard.rs
// ============================================================================
// Module: Dashboard Aggregates
// Description: Summary counters shown on the dashboard and in digests.
// Purpose: Keep compliance-rate arithmetic in one place.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The dashboard and the digest emails report the same counters. The
//! dashboard percentage is a float; digest emails use a whole-number rate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::dsr::percentage;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Control counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlStats {
    /// Catalog entries.
    pub total: u64,
    /// Active controls.
    pub activated: u64,
    /// Active controls whose latest evidence is compliant.
    pub compliant: u64,
    /// Active controls whose latest evidence is non-compliant.
    pub non_compliant: u64,
    /// Active controls past their due date.
    pub overdue: u64,
    /// `compliant / activated * 100`.
    pub compliance_percentage: f64,
}

impl ControlStats {
    /// Builds the counters and derives the percentage.
    #[must_use]
    pub fn new(total: u64, activated: u64, compliant: u64, non_compliant: u64, overdue: u64) -> Self {
        Self {
            total,
            activated,
            compliant,
            non_compliant,
            overdue,
            compliance_percentage: percentage(compliant, activated),
        }
    }

    /// Returns the whole-number compliance rate used in digests.
    #[must_use]
    pub const fn compliance_rate(&self) -> u64 {
        compliance_rate(self.compliant, self.activated)
    }
}

/// Ticket counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketStats {
    /// All tickets.
    pub total: u64,
    /// Tickets in `new` or `in_progress`.
    pub open: u64,
    /// Tickets resolved since the first of the month.
    pub resolved_this_month: u64,
}

/// Asset counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetStats {
    /// Active assets.
    pub total: u64,
}

/// Dashboard payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// Control counters.
    pub controls: ControlStats,
    /// Ticket counters.
    pub tickets: TicketStats,
    /// Asset counters.
    pub assets: AssetStats,
}

/// Seven-day activity used by the weekly digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyStats {
    /// Active controls.
    pub total_controls: u64,
    /// Whole-number compliance rate.
    pub compliance_rate: u64,
    /// Active controls past due.
    pub overdue_controls: u64,
    /// Evidence rows in the window.
    pub evidence_submissions: u64,
    /// Tickets resolved in the window.
    pub tickets_resolved: u64,
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns `compliant * 100 / total` rounded down, or 0 when `total` is zero.
#[must_use]
pub const fn compliance_rate(compliant: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    compliant.saturating_mul(100) / total
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compliance_rate_rounds_down() {
        assert_eq!(compliance_rate(2, 3), 66);
        assert_eq!(compliance_rate(0, 0), 0);
        let stats = ControlStats::new(61, 4, 1, 1, 0);
        assert!((stats.compliance_percentage - 25.0).abs() < f64::EPSILON);
        assert_eq!(stats.compliance_rate(), 25);
    }
}
