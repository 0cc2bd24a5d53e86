//! Reward decisions for order and customer events.
//!
//! Each operation is a sequence of independent Admin API calls with no
//! transaction around them. The referral reward claims the customer
//! (`referral_rewarded` tag) before granting anything, so a failure midway
//! loses a reward instead of paying it twice. Lost rewards are logged at
//! ERROR with both customer ids.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::metafields::{
    self, COMMISSION_NAMESPACE, LOYALTY_NAMESPACE, POINTS_KEY, REFERRAL_NAMESPACE, REFERRER_KEY,
    REWARDED_COUNT_KEY,
};
use super::points::{
    LineItemTotals, REFERRAL_REWARD_CAP, REFERRAL_REWARD_POINTS, order_points,
};
use super::referral::{code_from_note, issue_referral_code, resolve_referrer};
use super::tags::{AFFILIATE, REFERRAL_REWARDED, REFERRER_PREFIX, TagSet};
use crate::error::msg;
use crate::shopify::{AdminApi, Customer, LineItem, MetafieldOwner, ShopifyError};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to fetch customer {customer_id}: {source}")]
    FetchCustomer {
        customer_id: u64,
        #[source]
        source: ShopifyError,
    },

    #[error("failed to read metafields of product {product_id}: {source}")]
    ProductMetafields {
        product_id: u64,
        #[source]
        source: ShopifyError,
    },

    #[error("failed to update points of customer {customer_id}: {source}")]
    UpdatePoints {
        customer_id: u64,
        #[source]
        source: ShopifyError,
    },

    #[error("referral processing failed: {0}")]
    Referral(#[from] ShopifyError),
}

impl ReconcileError {
    /// Plain-text body for the 500 response.
    pub fn response_message(&self) -> &'static str {
        match self {
            ReconcileError::FetchCustomer { .. } => msg::FETCH_ERROR,
            ReconcileError::ProductMetafields { .. } => msg::PRODUCT_FETCH_ERROR,
            ReconcileError::UpdatePoints { .. } => msg::POINT_UPDATE_ERROR,
            ReconcileError::Referral(_) => msg::REFERRAL_ERROR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewardOutcome {
    Granted {
        referrer_id: u64,
        referrer_points: i64,
        rewarded_count: i64,
    },
    NotVerified,
    AlreadyRewarded,
    NoReferralCode,
    ReferrerNotFound,
    CapReached {
        referrer_id: u64,
    },
}

impl RewardOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            RewardOutcome::Granted { .. } => "Referral reward granted",
            RewardOutcome::NotVerified | RewardOutcome::AlreadyRewarded => msg::NO_ACTION_NEEDED,
            RewardOutcome::NoReferralCode => "No referral code",
            RewardOutcome::ReferrerNotFound => "Referrer not found",
            RewardOutcome::CapReached { .. } => "Referral cap reached",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOutcome {
    NotVerified,
    Processed {
        points_added: i64,
        /// New balance, or `None` when nothing was written.
        balance: Option<i64>,
        /// `None` when the reward attempt failed (already logged).
        referral: Option<RewardOutcome>,
    },
}

impl OrderOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            OrderOutcome::NotVerified => msg::NOT_VERIFIED,
            OrderOutcome::Processed { .. } => msg::ORDER_PROCESSED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommissionOutcome {
    NotVerified,
    Processed {
        customer_points: i64,
        commission: i64,
        /// Referrer credited with `commission`, if any.
        referrer_id: Option<u64>,
    },
}

impl CommissionOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            CommissionOutcome::NotVerified => msg::NOT_VERIFIED,
            CommissionOutcome::Processed { .. } => msg::FULFILLMENT_PROCESSED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerOutcome {
    NotVerified,
    Reward(RewardOutcome),
}

impl CustomerOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            CustomerOutcome::NotVerified => msg::NO_ACTION_NEEDED,
            CustomerOutcome::Reward(outcome) => outcome.message(),
        }
    }
}

#[derive(Clone)]
pub struct Reconciler {
    api: Arc<dyn AdminApi>,
}

impl Reconciler {
    pub fn new(api: Arc<dyn AdminApi>) -> Self {
        Self { api }
    }

    async fn fetch_customer(&self, customer_id: u64) -> Result<Customer, ReconcileError> {
        self.api
            .get_customer(customer_id)
            .await
            .map_err(|source| ReconcileError::FetchCustomer {
                customer_id,
                source,
            })
    }

    async fn add_points(&self, customer_id: u64, points: i64) -> Result<i64, ReconcileError> {
        metafields::add_integer(
            self.api.as_ref(),
            MetafieldOwner::Customer(customer_id),
            LOYALTY_NAMESPACE,
            POINTS_KEY,
            points,
        )
        .await
        .map_err(|source| ReconcileError::UpdatePoints {
            customer_id,
            source,
        })
    }

    /// `orders/create`: order points, plus the one-time referral reward.
    pub async fn order_created(
        &self,
        customer_id: u64,
        total: f64,
    ) -> Result<OrderOutcome, ReconcileError> {
        let customer = self.fetch_customer(customer_id).await?;
        let tags = TagSet::parse(&customer.tags);
        if !tags.is_age_verified() {
            tracing::debug!("Order for unverified customer {}, skipping", customer_id);
            return Ok(OrderOutcome::NotVerified);
        }

        let referral = match self.grant_referral_reward(&customer).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!("Referral reward for customer {} failed: {}", customer_id, e);
                None
            }
        };

        let points = order_points(total, tags.has_prefix(REFERRER_PREFIX));
        let balance = if points > 0 {
            let balance = self.add_points(customer_id, points).await?;
            tracing::info!(
                "Added {} order points to customer {} (balance {})",
                points,
                customer_id,
                balance
            );
            Some(balance)
        } else {
            tracing::debug!("Order total {} earns no points for customer {}", total, customer_id);
            None
        };

        Ok(OrderOutcome::Processed {
            points_added: points,
            balance,
            referral,
        })
    }

    /// `customers/update`: issue the customer's own referral code, then try
    /// the referral reward.
    pub async fn customer_updated(
        &self,
        customer_id: u64,
    ) -> Result<CustomerOutcome, ReconcileError> {
        let customer = self.fetch_customer(customer_id).await?;
        if !TagSet::parse(&customer.tags).is_age_verified() {
            tracing::debug!("Customer {} is not verified, skipping", customer_id);
            return Ok(CustomerOutcome::NotVerified);
        }

        match issue_referral_code(self.api.as_ref(), &customer).await {
            Ok(issuance) if issuance.changed() => {
                tracing::info!(
                    "Issued referral code {} to customer {} (metafield {:?}, tagged {})",
                    issuance.code,
                    customer_id,
                    issuance.metafield,
                    issuance.tagged
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(
                    "Failed to issue referral code to customer {}: {}",
                    customer_id,
                    e
                );
            }
        }

        let outcome = self.grant_referral_reward(&customer).await?;
        Ok(CustomerOutcome::Reward(outcome))
    }

    /// Grant the one-time reward to whoever referred `customer`.
    pub async fn grant_referral_reward(
        &self,
        customer: &Customer,
    ) -> Result<RewardOutcome, ShopifyError> {
        let tags = TagSet::parse(&customer.tags);
        if !tags.is_age_verified() {
            return Ok(RewardOutcome::NotVerified);
        }
        if tags.is_referral_rewarded() {
            tracing::debug!("Customer {} already rewarded a referrer", customer.id);
            return Ok(RewardOutcome::AlreadyRewarded);
        }
        let Some(code) = code_from_note(customer.note()) else {
            return Ok(RewardOutcome::NoReferralCode);
        };

        let api = self.api.as_ref();
        let Some(referrer) = resolve_referrer(api, &code.to_string(), Some(customer.id)).await?
        else {
            tracing::debug!("No referrer for code {} on customer {}", code, customer.id);
            return Ok(RewardOutcome::ReferrerNotFound);
        };
        let referrer_owner = MetafieldOwner::Customer(referrer.id);

        let referrer_fields = api.metafields(referrer_owner).await?;
        let rewarded = metafields::integer_value(
            &referrer_fields,
            REFERRAL_NAMESPACE,
            REWARDED_COUNT_KEY,
        );
        if rewarded >= REFERRAL_REWARD_CAP {
            tracing::debug!(
                "Referrer {} reached the reward cap ({} rewards)",
                referrer.id,
                rewarded
            );
            return Ok(RewardOutcome::CapReached {
                referrer_id: referrer.id,
            });
        }

        // Claim: re-read so a concurrent delivery's tag write is seen.
        let fresh = api.get_customer(customer.id).await?;
        let Some(claimed) = TagSet::parse(&fresh.tags).with(REFERRAL_REWARDED) else {
            tracing::debug!("Customer {} was claimed concurrently", customer.id);
            return Ok(RewardOutcome::AlreadyRewarded);
        };
        api.update_customer_tags(customer.id, &claimed.to_string())
            .await?;

        let referrer_points = metafields::add_integer(
            api,
            referrer_owner,
            LOYALTY_NAMESPACE,
            POINTS_KEY,
            REFERRAL_REWARD_POINTS,
        )
        .await
        .inspect_err(|e| {
            tracing::error!(
                "Lost referral reward: customer {} claimed but referrer {} not credited: {}",
                customer.id,
                referrer.id,
                e
            );
        })?;

        let rewarded_count = metafields::add_integer(
            api,
            referrer_owner,
            REFERRAL_NAMESPACE,
            REWARDED_COUNT_KEY,
            1,
        )
        .await
        .inspect_err(|e| {
            tracing::error!(
                "Referrer {} credited for customer {} but rewarded_count not incremented: {}",
                referrer.id,
                customer.id,
                e
            );
        })?;

        tracing::info!(
            "Referral reward granted: referrer {} now has {} points ({} rewards), referred customer {}",
            referrer.id,
            referrer_points,
            rewarded_count,
            customer.id
        );

        Ok(RewardOutcome::Granted {
            referrer_id: referrer.id,
            referrer_points,
            rewarded_count,
        })
    }

    /// `orders/fulfilled`: per-product points to the buyer and per-product
    /// commission to an affiliate referrer.
    pub async fn order_fulfilled(
        &self,
        customer_id: u64,
        line_items: &[LineItem],
    ) -> Result<CommissionOutcome, ReconcileError> {
        let customer = self.fetch_customer(customer_id).await?;
        if !TagSet::parse(&customer.tags).is_age_verified() {
            tracing::debug!("Fulfillment for unverified customer {}, skipping", customer_id);
            return Ok(CommissionOutcome::NotVerified);
        }

        let totals = self.line_item_totals(line_items).await?;
        let customer_points = totals.loyalty_points();
        let commission = totals.commission_points();

        if customer_points > 0 {
            let balance = self.add_points(customer_id, customer_points).await?;
            tracing::info!(
                "Added {} product points to customer {} (balance {})",
                customer_points,
                customer_id,
                balance
            );
        }

        let mut credited = None;
        if commission > 0
            && let Some(referrer) = self.affiliate_referrer(&customer).await?
        {
            let balance = self.add_points(referrer.id, commission).await?;
            tracing::info!(
                "Added {} commission points to affiliate {} for customer {} (balance {})",
                commission,
                referrer.id,
                customer_id,
                balance
            );
            credited = Some(referrer.id);
        }

        Ok(CommissionOutcome::Processed {
            customer_points,
            commission,
            referrer_id: credited,
        })
    }

    async fn line_item_totals(
        &self,
        line_items: &[LineItem],
    ) -> Result<LineItemTotals, ReconcileError> {
        let mut per_unit: HashMap<u64, (f64, f64)> = HashMap::new();
        let mut totals = LineItemTotals::default();

        for item in line_items {
            let Some(product_id) = item.product_id else {
                continue;
            };
            let (loyalty, commission) = match per_unit.get(&product_id) {
                Some(values) => *values,
                None => {
                    let fields = self
                        .api
                        .metafields(MetafieldOwner::Product(product_id))
                        .await
                        .map_err(|source| ReconcileError::ProductMetafields {
                            product_id,
                            source,
                        })?;
                    let values = (
                        metafields::decimal_value(&fields, LOYALTY_NAMESPACE, POINTS_KEY),
                        metafields::decimal_value(&fields, COMMISSION_NAMESPACE, REFERRER_KEY),
                    );
                    per_unit.insert(product_id, values);
                    values
                }
            };
            totals.add(loyalty, commission, item.quantity);
        }

        Ok(totals)
    }

    /// The buyer's referrer, if it exists and is tagged `affiliate`.
    async fn affiliate_referrer(
        &self,
        customer: &Customer,
    ) -> Result<Option<Customer>, ReconcileError> {
        let Some(code) = code_from_note(customer.note()) else {
            return Ok(None);
        };
        let referrer =
            resolve_referrer(self.api.as_ref(), &code.to_string(), Some(customer.id)).await?;

        Ok(referrer.filter(|r| {
            let affiliate = TagSet::parse(&r.tags).contains(AFFILIATE);
            if !affiliate {
                tracing::debug!("Referrer {} is not an affiliate, no commission", r.id);
            }
            affiliate
        }))
    }
}
