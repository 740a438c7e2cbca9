//! Production batch models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{ProductType, ProductionPlan};

/// A production run of a fixed planned quantity of one product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    pub batch_reference: String,
    pub product_id: Uuid,
    pub product_type: ProductType,
    pub quantity_to_produce: u32,
    pub sizes_breakdown: ProductionPlan,
    pub status: BatchStatus,
    pub deduction_mode: DeductionMode,
    pub total_materials_cost: Decimal,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<Uuid>,
}

/// A batch rule refused a state change or a stock deduction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BatchRuleError {
    #[error("batch is {0} and accepts no further changes")]
    Closed(BatchStatus),

    #[error("cannot move from {from} to {to}")]
    InvalidTransition { from: BatchStatus, to: BatchStatus },

    #[error("stock was already deducted ({})", .0.as_str())]
    AlreadyDeducted(DeductionMode),
}

/// Batch lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Planifie,
    EnCours,
    Termine,
    Cancelled,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Planifie => "planifie",
            BatchStatus::EnCours => "en_cours",
            BatchStatus::Termine => "termine",
            BatchStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Termine | BatchStatus::Cancelled)
    }

    /// Transitions only move forward; nothing leaves `termine` or `cancelled`
    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        use BatchStatus::*;
        matches!(
            (self, next),
            (Planifie, EnCours)
                | (Planifie, Termine)
                | (EnCours, Termine)
                | (Planifie, Cancelled)
                | (EnCours, Cancelled)
        )
    }

    /// Like [`can_transition_to`](Self::can_transition_to), with the reason for a refusal
    pub fn ensure_transition(&self, next: BatchStatus) -> Result<(), BatchRuleError> {
        if self.is_terminal() {
            return Err(BatchRuleError::Closed(*self));
        }
        if !self.can_transition_to(next) {
            return Err(BatchRuleError::InvalidTransition { from: *self, to: next });
        }
        Ok(())
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = crate::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planifie" => Ok(BatchStatus::Planifie),
            "en_cours" => Ok(BatchStatus::EnCours),
            "termine" => Ok(BatchStatus::Termine),
            "cancelled" => Ok(BatchStatus::Cancelled),
            other => Err(crate::ParseEnumError::new("status", other)),
        }
    }
}

/// How (and whether) stock has been deducted for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionMode {
    /// Requirements were deducted when the batch was started
    AtCreation,
    /// Nothing deducted yet; waiting for actual consumed quantities
    Deferred,
    /// Deducted afterwards from actually consumed quantities
    ActualQuantities,
}

impl DeductionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeductionMode::AtCreation => "at_creation",
            DeductionMode::Deferred => "deferred",
            DeductionMode::ActualQuantities => "actual_quantities",
        }
    }

    /// Mode a batch starts in
    pub fn at_start(deduct_stock: bool) -> Self {
        if deduct_stock {
            DeductionMode::AtCreation
        } else {
            DeductionMode::Deferred
        }
    }

    pub fn has_deducted(&self) -> bool {
        !matches!(self, DeductionMode::Deferred)
    }

    /// Where the quantities returned on cancellation come from
    pub fn restore_source(&self) -> RestoreSource {
        match self {
            DeductionMode::AtCreation => RestoreSource::CurrentConfiguration,
            DeductionMode::ActualQuantities => RestoreSource::RecordedUsage,
            DeductionMode::Deferred => RestoreSource::Nothing,
        }
    }
}

/// Basis for the stock given back when a batch is cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSource {
    /// Recompute the stored plan against the product's configuration as it is now
    CurrentConfiguration,
    /// Sum the usage rows recorded when stock was deducted
    RecordedUsage,
    Nothing,
}

/// Actual consumed quantities may be deducted once, for a batch that is not cancelled
/// and whose stock has not been deducted yet.
pub fn ensure_actual_deduction_allowed(status: BatchStatus, mode: DeductionMode) -> Result<(), BatchRuleError> {
    if status == BatchStatus::Cancelled {
        return Err(BatchRuleError::Closed(status));
    }
    if mode.has_deducted() {
        return Err(BatchRuleError::AlreadyDeducted(mode));
    }
    Ok(())
}

impl std::str::FromStr for DeductionMode {
    type Err = crate::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "at_creation" => Ok(DeductionMode::AtCreation),
            "deferred" => Ok(DeductionMode::Deferred),
            "actual_quantities" => Ok(DeductionMode::ActualQuantities),
            other => Err(crate::ParseEnumError::new("deduction_mode", other)),
        }
    }
}

/// Quantity of a material actually deducted for a batch, linked to its ledger row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMaterialUsage {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub material_id: Uuid,
    pub material_name: String,
    pub quantity_used: Decimal,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
    pub transaction_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Build a batch reference: `<prefix>-YYYYMMDD-<suffix>`
///
/// The suffix is upper-cased and trimmed to six characters.
pub fn generate_batch_reference(prefix: &str, date: NaiveDate, suffix: &str) -> String {
    let suffix: String = suffix
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(6)
        .collect::<String>()
        .to_ascii_uppercase();
    format!("{}-{}-{}", prefix, date.format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_only() {
        use BatchStatus::*;
        assert!(Planifie.can_transition_to(EnCours));
        assert!(EnCours.can_transition_to(Termine));
        assert!(EnCours.can_transition_to(Cancelled));
        assert!(!Termine.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Planifie));
        assert!(!Cancelled.can_transition_to(Cancelled));
        assert!(!EnCours.can_transition_to(Planifie));
    }

    #[test]
    fn closed_batches_report_their_status() {
        use BatchStatus::*;
        assert_eq!(Termine.ensure_transition(Cancelled), Err(BatchRuleError::Closed(Termine)));
        assert_eq!(Cancelled.ensure_transition(EnCours), Err(BatchRuleError::Closed(Cancelled)));
        assert_eq!(
            EnCours.ensure_transition(Planifie),
            Err(BatchRuleError::InvalidTransition { from: EnCours, to: Planifie })
        );
        assert_eq!(Planifie.ensure_transition(Cancelled), Ok(()));
    }

    #[test]
    fn actual_deduction_only_once_and_not_after_cancel() {
        use BatchStatus::*;
        use DeductionMode::*;
        assert_eq!(ensure_actual_deduction_allowed(Planifie, Deferred), Ok(()));
        assert_eq!(ensure_actual_deduction_allowed(Termine, Deferred), Ok(()));
        assert_eq!(
            ensure_actual_deduction_allowed(Cancelled, Deferred),
            Err(BatchRuleError::Closed(Cancelled))
        );
        assert_eq!(
            ensure_actual_deduction_allowed(EnCours, AtCreation),
            Err(BatchRuleError::AlreadyDeducted(AtCreation))
        );
        assert_eq!(
            ensure_actual_deduction_allowed(Termine, ActualQuantities),
            Err(BatchRuleError::AlreadyDeducted(ActualQuantities))
        );
    }

    #[test]
    fn restore_source_follows_mode() {
        assert_eq!(DeductionMode::at_start(true), DeductionMode::AtCreation);
        assert_eq!(DeductionMode::at_start(false), DeductionMode::Deferred);
        assert_eq!(DeductionMode::AtCreation.restore_source(), RestoreSource::CurrentConfiguration);
        assert_eq!(DeductionMode::ActualQuantities.restore_source(), RestoreSource::RecordedUsage);
        assert_eq!(DeductionMode::Deferred.restore_source(), RestoreSource::Nothing);
    }

    #[test]
    fn reference_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            generate_batch_reference("BATCH", date, "a1b2-c3d4e5"),
            "BATCH-20240307-A1B2C3"
        );
        assert_eq!(
            generate_batch_reference("BATCH-ST", date, "ff00aa99"),
            "BATCH-ST-20240307-FF00AA"
        );
    }

    #[test]
    fn status_serializes_as_stored_label() {
        assert_eq!(serde_json::to_string(&BatchStatus::EnCours).unwrap(), "\"en_cours\"");
        assert_eq!("termine".parse::<BatchStatus>().unwrap(), BatchStatus::Termine);
    }
}
