//! Reconciling a client-held cart with the stored cart.
//!
//! Each local item is applied on its own: a catalog problem rejects that
//! item only, while a store failure aborts the pass. Every slot write
//! replaces the quantity, so a pass interrupted half-way can simply be run
//! again.

use std::collections::HashMap;

use serde::Serialize;
use tracing::instrument;

use super::{label, CartService};
use crate::domain::aggregates::{CartLineItem, LocalCartItem, RejectionReason, RejectionRecord};
use crate::domain::events::{CartEvent, WriteCause};
use crate::domain::ports::CatalogError;
use crate::domain::resolver::{MergeConflict, ResolutionReason};
use crate::domain::value_objects::{LineItemId, ProductId, UserId, VariantKey};
use crate::Result;

/// Where a line of the merged cart came from during this pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineSource {
    /// Created from the client cart.
    LocalMigrated,
    /// Existed and was rewritten with a resolved quantity.
    Resolved,
    /// Left as stored.
    Persisted,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MergedLine {
    #[serde(flatten)]
    pub item: CartLineItem,
    pub source: LineSource,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// The user's whole cart after the pass.
    pub merged: Vec<MergedLine>,
    pub conflicts: Vec<MergeConflict>,
    pub rejected: Vec<RejectionRecord>,
}

impl SyncReport {
    pub fn line(&self, product: ProductId, variant: &VariantKey) -> Option<&MergedLine> {
        self.merged.iter().find(|l| l.item.occupies(product, variant))
    }
}

impl CartService {
    /// Merge `local_items` into the stored cart of `user`.
    #[instrument(skip(self, local_items), fields(user_id = %user, local_items = local_items.len()))]
    pub async fn sync(&self, user: &UserId, local_items: &[LocalCartItem]) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let mut sources: HashMap<LineItemId, LineSource> = HashMap::new();

        for local in local_items {
            if let Some((id, source)) = self.sync_item(user, local, &mut report).await? {
                let entry = sources.entry(id).or_insert(source);
                if *entry == LineSource::Persisted {
                    *entry = source;
                }
            }
        }

        report.merged = self
            .store
            .list(user)
            .await?
            .into_iter()
            .map(|item| {
                let source = sources.get(&item.id).copied().unwrap_or(LineSource::Persisted);
                MergedLine { item, source }
            })
            .collect();

        tracing::info!(
            merged = report.merged.len(),
            conflicts = report.conflicts.len(),
            rejected = report.rejected.len(),
            "cart sync finished"
        );
        self.emit(CartEvent::SyncCompleted {
            user_id: user.clone(),
            merged: report.merged.len(),
            conflicts: report.conflicts.len(),
            rejected: report.rejected.len(),
        });
        Ok(report)
    }

    async fn sync_item(
        &self,
        user: &UserId,
        local: &LocalCartItem,
        report: &mut SyncReport,
    ) -> Result<Option<(LineItemId, LineSource)>> {
        let variant = local.variant();
        let Some(quantity) = local.positive_quantity() else {
            let rejection = RejectionRecord {
                product_id: local.product_id,
                variant,
                product_name: local.snapshot_name().map(str::to_string),
                reason: RejectionReason::InvalidQuantity,
                detail: format!("quantity {} is not a positive count", local.quantity),
            };
            self.reject(user, report, rejection);
            return Ok(None);
        };

        let Some(existing) = self.store.find_slot(user, local.product_id, &variant).await? else {
            let clamped = self.policy.clamp(quantity);
            if clamped < quantity {
                let conflict = MergeConflict {
                    product_id: local.product_id,
                    variant: variant.clone(),
                    local_quantity: quantity,
                    persisted_quantity: None,
                    resolved_quantity: clamped,
                    reason: ResolutionReason::RejectedSuspiciousLocal,
                };
                self.record_conflict(user, report, conflict);
            }
            if let Some(rejection) = self.check_stock(local, &variant, clamped).await {
                self.reject(user, report, rejection);
                return Ok(None);
            }
            let item = self.store.upsert_slot(user, local.product_id, &variant, clamped).await?;
            self.emit(CartEvent::SlotWritten {
                user_id: user.clone(),
                line_item_id: item.id,
                product_id: item.product_id,
                variant,
                previous_quantity: None,
                quantity: item.quantity,
                cause: WriteCause::SyncMigrated,
            });
            return Ok(Some((item.id, LineSource::LocalMigrated)));
        };

        let resolution = self.policy.resolve(quantity, existing.quantity);
        if resolution.is_conflict() {
            let conflict = MergeConflict {
                product_id: local.product_id,
                variant: variant.clone(),
                local_quantity: quantity,
                persisted_quantity: Some(existing.quantity),
                resolved_quantity: resolution.quantity,
                reason: resolution.reason,
            };
            self.record_conflict(user, report, conflict);
        }

        if let Some(rejection) = self.check_stock(local, &variant, resolution.quantity).await {
            self.reject(user, report, rejection);
            return Ok(Some((existing.id, LineSource::Persisted)));
        }
        if resolution.quantity == existing.quantity {
            return Ok(Some((existing.id, LineSource::Persisted)));
        }

        let item = self.store.upsert_slot(user, local.product_id, &variant, resolution.quantity).await?;
        self.emit(CartEvent::SlotWritten {
            user_id: user.clone(),
            line_item_id: item.id,
            product_id: item.product_id,
            variant,
            previous_quantity: Some(existing.quantity),
            quantity: item.quantity,
            cause: WriteCause::SyncResolved,
        });
        Ok(Some((item.id, LineSource::Resolved)))
    }

    /// `None` when `quantity` of the item can be fulfilled.
    async fn check_stock(&self, local: &LocalCartItem, variant: &VariantKey, quantity: u32) -> Option<RejectionRecord> {
        let fallback_name = || local.snapshot_name().map(str::to_string);
        let rejection = |product_name: Option<String>, reason, detail: String| RejectionRecord {
            product_id: local.product_id,
            variant: variant.clone(),
            product_name,
            reason,
            detail,
        };

        match self.stock.get_stock(local.product_id).await {
            Ok(stock) if !stock.is_active => Some(rejection(
                Some(stock.name.clone()),
                RejectionReason::ProductUnavailable,
                format!("{} is no longer available", label(&stock.name, variant)),
            )),
            Ok(stock) if stock.available < quantity => Some(rejection(
                Some(stock.name.clone()),
                RejectionReason::InsufficientStock,
                format!(
                    "insufficient stock for {}: {} available, {} requested",
                    label(&stock.name, variant),
                    stock.available,
                    quantity
                ),
            )),
            Ok(_) => None,
            Err(CatalogError::NotFound(id)) => Some(rejection(
                fallback_name(),
                RejectionReason::ProductUnavailable,
                format!("product {id} no longer exists"),
            )),
            Err(CatalogError::Unavailable(msg)) => Some(rejection(
                fallback_name(),
                RejectionReason::CatalogUnavailable,
                format!("stock could not be checked: {msg}"),
            )),
        }
    }

    fn record_conflict(&self, user: &UserId, report: &mut SyncReport, conflict: MergeConflict) {
        self.emit(CartEvent::ConflictResolved { user_id: user.clone(), conflict: conflict.clone() });
        report.conflicts.push(conflict);
    }

    fn reject(&self, user: &UserId, report: &mut SyncReport, rejection: RejectionRecord) {
        self.emit(CartEvent::ItemRejected { user_id: user.clone(), rejection: rejection.clone() });
        report.rejected.push(rejection);
    }
}
