//! Quantity conflict resolution between a client cart and the stored cart.
//!
//! Duplicated merges upstream show up as runaway quantities, so every value
//! above the ceiling is treated as suspect. Two suspect values compare equal
//! (both clamp to the ceiling) and reset to a single unit. Taking the max or
//! the sum of both sides is never correct here: either one lets a retried
//! merge grow the cart on every pass.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{ProductId, VariantKey};

/// Default ceiling above which a quantity is considered corrupted.
pub const MAX_REASONABLE_QTY: u32 = 10;

/// Why a resolution picked the quantity it did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionReason {
    NoConflict,
    ResetBothSuspicious,
    RejectedSuspiciousLocal,
    RejectedSuspiciousDatabase,
    RecentLocalActivity,
    DatabaseIsTruth,
}

impl ResolutionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoConflict => "no_conflict",
            Self::ResetBothSuspicious => "reset_both_suspicious",
            Self::RejectedSuspiciousLocal => "rejected_suspicious_local",
            Self::RejectedSuspiciousDatabase => "rejected_suspicious_database",
            Self::RecentLocalActivity => "recent_local_activity",
            Self::DatabaseIsTruth => "database_is_truth",
        }
    }
}

impl std::fmt::Display for ResolutionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub quantity: u32,
    pub reason: ResolutionReason,
}

impl Resolution {
    const fn new(quantity: u32, reason: ResolutionReason) -> Self { Self { quantity, reason } }
    pub fn is_conflict(&self) -> bool { self.reason != ResolutionReason::NoConflict }
}

/// The resolution table, parameterized by its suspicion ceiling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolutionPolicy {
    ceiling: u32,
}

impl Default for ResolutionPolicy {
    fn default() -> Self { Self { ceiling: MAX_REASONABLE_QTY } }
}

impl ResolutionPolicy {
    /// A ceiling of zero would mark every quantity suspicious; it is raised to one.
    pub fn with_ceiling(ceiling: u32) -> Self { Self { ceiling: ceiling.max(1) } }

    pub fn ceiling(&self) -> u32 { self.ceiling }

    pub fn is_suspicious(&self, quantity: u32) -> bool { quantity > self.ceiling }

    pub fn clamp(&self, quantity: u32) -> u32 { quantity.min(self.ceiling) }

    pub fn resolve(&self, local: u32, persisted: u32) -> Resolution {
        use ResolutionReason::*;

        match (self.is_suspicious(local), self.is_suspicious(persisted)) {
            (true, true) => Resolution::new(1, ResetBothSuspicious),
            (true, false) => Resolution::new(persisted, RejectedSuspiciousLocal),
            (false, true) => Resolution::new(local, RejectedSuspiciousDatabase),
            (false, false) => match local.abs_diff(persisted) {
                0 => Resolution::new(local, NoConflict),
                1 => Resolution::new(local, RecentLocalActivity),
                _ => Resolution::new(persisted, DatabaseIsTruth),
            },
        }
    }
}

/// A slot where the client and the stored cart disagreed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConflict {
    pub product_id: ProductId,
    #[serde(flatten)]
    pub variant: VariantKey,
    pub local_quantity: u32,
    /// Absent when the slot was new and the local quantity had to be clamped.
    pub persisted_quantity: Option<u32>,
    pub resolved_quantity: u32,
    pub reason: ResolutionReason,
}
