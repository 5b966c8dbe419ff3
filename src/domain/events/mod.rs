//! Domain events
//!
//! Emitted after each cart state transition. Sinks must not block: the
//! service calls `emit` inline on the request path.

use serde::Serialize;

use crate::domain::aggregates::RejectionRecord;
use crate::domain::resolver::MergeConflict;
use crate::domain::value_objects::{LineItemId, ProductId, UserId, VariantKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteCause {
    AddToCart,
    SetQuantity,
    SyncMigrated,
    SyncResolved,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    SlotWritten {
        user_id: UserId,
        line_item_id: LineItemId,
        product_id: ProductId,
        variant: VariantKey,
        previous_quantity: Option<u32>,
        quantity: u32,
        cause: WriteCause,
    },
    ItemRemoved { user_id: UserId, line_item_id: LineItemId },
    CartCleared { user_id: UserId, removed: u64 },
    ConflictResolved { user_id: UserId, conflict: MergeConflict },
    ItemRejected { user_id: UserId, rejection: RejectionRecord },
    SyncCompleted { user_id: UserId, merged: usize, conflicts: usize, rejected: usize },
}

impl CartEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SlotWritten { .. } => "slot_written",
            Self::ItemRemoved { .. } => "item_removed",
            Self::CartCleared { .. } => "cart_cleared",
            Self::ConflictResolved { .. } => "conflict_resolved",
            Self::ItemRejected { .. } => "item_rejected",
            Self::SyncCompleted { .. } => "sync_completed",
        }
    }

    pub fn user_id(&self) -> &UserId {
        match self {
            Self::SlotWritten { user_id, .. }
            | Self::ItemRemoved { user_id, .. }
            | Self::CartCleared { user_id, .. }
            | Self::ConflictResolved { user_id, .. }
            | Self::ItemRejected { user_id, .. }
            | Self::SyncCompleted { user_id, .. } => user_id,
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &CartEvent);
}

/// Writes every event as a structured log line under the `cart_events` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &CartEvent) {
        match event {
            CartEvent::SlotWritten { user_id, product_id, variant, previous_quantity, quantity, cause, .. } => {
                tracing::info!(target: "cart_events", %user_id, %product_id, %variant, ?previous_quantity, quantity, ?cause, "slot written");
            }
            CartEvent::ItemRemoved { user_id, line_item_id } => {
                tracing::info!(target: "cart_events", %user_id, %line_item_id, "item removed");
            }
            CartEvent::CartCleared { user_id, removed } => {
                tracing::info!(target: "cart_events", %user_id, removed, "cart cleared");
            }
            CartEvent::ConflictResolved { user_id, conflict } => {
                tracing::info!(
                    target: "cart_events",
                    %user_id,
                    product_id = %conflict.product_id,
                    local = conflict.local_quantity,
                    persisted = ?conflict.persisted_quantity,
                    resolved = conflict.resolved_quantity,
                    reason = %conflict.reason,
                    "conflict resolved"
                );
            }
            CartEvent::ItemRejected { user_id, rejection } => {
                tracing::warn!(
                    target: "cart_events",
                    %user_id,
                    product_id = %rejection.product_id,
                    reason = ?rejection.reason,
                    detail = %rejection.detail,
                    "item rejected"
                );
            }
            CartEvent::SyncCompleted { user_id, merged, conflicts, rejected } => {
                tracing::info!(target: "cart_events", %user_id, merged, conflicts, rejected, "sync completed");
            }
        }
    }
}
