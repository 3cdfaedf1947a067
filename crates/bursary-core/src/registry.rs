//! Registry items — specific needs a student lists with a price.
//!
//! An item is fundable partially by one or more donations. Its
//! `funded_status` is a pure function of `amount_funded` vs `price`
//! (see [`crate::ledger::funded_status`]) and is recomputed inside the
//! same transaction as every funding write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::money::Cents;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FundedStatus {
  Needed,
  Partial,
  Funded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryItem {
  pub item_id:       Uuid,
  pub student_id:    Uuid,
  pub name:          String,
  pub description:   String,
  pub price:         Cents,
  /// Sum of completed sponsorships; maintained only by the ledger.
  pub amount_funded: Cents,
  pub funded_status: FundedStatus,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::PlatformStore::add_registry_item`].
#[derive(Debug, Clone)]
pub struct NewRegistryItem {
  pub student_id:  Uuid,
  pub name:        String,
  pub description: String,
  pub price:       Cents,
}

/// Patch for [`crate::store::PlatformStore::update_registry_item`]. `None`
/// fields are left unchanged. A price below the amount already funded is
/// rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryItemUpdate {
  pub name:        Option<String>,
  pub description: Option<String>,
  pub price:       Option<Cents>,
}
