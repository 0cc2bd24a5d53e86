//! Loyalty points and referral rewards.
//!
//! All state lives in Shopify: point balances and referral bookkeeping in
//! customer metafields, program membership in customer tags, and per-unit
//! rewards in product metafields.

pub mod metafields;
pub mod points;
pub mod reconciler;
pub mod referral;
pub mod snapshot;
pub mod tags;

pub use reconciler::{
    CommissionOutcome, CustomerOutcome, OrderOutcome, ReconcileError, Reconciler, RewardOutcome,
};
pub use referral::{ReferralCode, resolve_referrer};
pub use snapshot::ReferralSnapshot;
