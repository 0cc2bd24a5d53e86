//! Point arithmetic. All results are floored to whole points.

/// One point per this many units of order currency.
pub const ORDER_POINTS_DIVISOR: f64 = 50.0;

/// Order bonus for customers carrying a `referrer-*` tag.
pub const REFERRER_BONUS_PERCENT: i64 = 5;

/// Points granted to a referrer per rewarded referral.
pub const REFERRAL_REWARD_POINTS: i64 = 10;

/// Maximum referral rewards a single referrer can collect.
pub const REFERRAL_REWARD_CAP: i64 = 5;

/// Parse an order's `total_price`. Rejects negatives, NaN and infinities.
pub fn parse_order_total(raw: &str) -> Option<f64> {
    let total: f64 = raw.trim().parse().ok()?;
    (total.is_finite() && total >= 0.0).then_some(total)
}

/// Points earned for an order total, including the referrer-tag bonus.
pub fn order_points(total: f64, has_referrer_tag: bool) -> i64 {
    let base = floor_points(total / ORDER_POINTS_DIVISOR);
    if has_referrer_tag {
        base.saturating_add(base.saturating_mul(REFERRER_BONUS_PERCENT) / 100)
    } else {
        base
    }
}

/// Floor a fractional point total; negative and non-finite totals give 0.
pub fn floor_points(value: f64) -> i64 {
    if value.is_finite() && value > 0.0 {
        value.floor() as i64
    } else {
        0
    }
}

/// Per-unit product rewards accumulated across an order's line items.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineItemTotals {
    pub loyalty: f64,
    pub commission: f64,
}

impl LineItemTotals {
    pub fn add(&mut self, loyalty_per_unit: f64, commission_per_unit: f64, quantity: u32) {
        let quantity = f64::from(quantity);
        self.loyalty += loyalty_per_unit * quantity;
        self.commission += commission_per_unit * quantity;
    }

    pub fn loyalty_points(&self) -> i64 {
        floor_points(self.loyalty)
    }

    pub fn commission_points(&self) -> i64 {
        floor_points(self.commission)
    }
}
