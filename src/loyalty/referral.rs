//! Referral codes.
//!
//! A referral code is the referrer's own customer id in decimal. A code is
//! issued when a customer is verified: the `referral.code` metafield is set
//! to the id and the customer is tagged `referrer-<id>`. Either marker proves
//! issuance when resolving.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::metafields::{self, CODE_KEY, REFERRAL_NAMESPACE, Upsert};
use super::tags::{TagSet, referrer_tag};
use crate::shopify::{AdminApi, Customer, MetafieldOwner, ShopifyError};

static NOTE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ref:(\d+)").expect("Invalid referral note regex"));

/// A syntactically valid referral code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReferralCode(u64);

impl ReferralCode {
    /// Accepts only the canonical decimal form: digits, no leading zero.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if raw.len() > 1 && raw.starts_with('0') {
            return None;
        }
        raw.parse().ok().map(ReferralCode)
    }

    pub fn for_customer(customer_id: u64) -> Self {
        ReferralCode(customer_id)
    }

    /// Id of the customer who owns this code.
    pub fn customer_id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReferralCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// First `ref:<digits>` code embedded in a customer note.
pub fn code_from_note(note: &str) -> Option<ReferralCode> {
    NOTE_CODE
        .captures(note)
        .and_then(|caps| caps.get(1))
        .and_then(|m| ReferralCode::parse(m.as_str()))
}

/// Find the customer that owns `code`.
///
/// Returns `Ok(None)` for malformed codes, self-referrals, unknown ids and
/// customers that were never issued a code. Other API failures propagate.
pub async fn resolve_referrer(
    api: &dyn AdminApi,
    code: &str,
    exclude_id: Option<u64>,
) -> Result<Option<Customer>, ShopifyError> {
    let Some(code) = ReferralCode::parse(code) else {
        tracing::debug!("Referral code {:?} is not numeric", code);
        return Ok(None);
    };
    let referrer_id = code.customer_id();

    if exclude_id == Some(referrer_id) {
        tracing::debug!("Ignoring self-referral by customer {}", referrer_id);
        return Ok(None);
    }

    let customer = match api.get_customer(referrer_id).await {
        Ok(customer) => customer,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e),
    };

    if TagSet::parse(&customer.tags).contains(&referrer_tag(referrer_id)) {
        return Ok(Some(customer));
    }

    let fields = api
        .metafields(MetafieldOwner::Customer(referrer_id))
        .await?;
    let issued = metafields::find(&fields, REFERRAL_NAMESPACE, CODE_KEY)
        .is_some_and(|f| f.value.trim() == code.to_string());

    if issued {
        Ok(Some(customer))
    } else {
        tracing::debug!("Customer {} was never issued a referral code", referrer_id);
        Ok(None)
    }
}

/// What issuing a code changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Issuance {
    pub code: ReferralCode,
    pub metafield: Upsert,
    pub tagged: bool,
}

impl Issuance {
    pub fn changed(&self) -> bool {
        self.tagged || self.metafield != Upsert::Unchanged
    }
}

/// Make sure `customer` carries its own referral code, as both the
/// `referral.code` metafield and the `referrer-<id>` tag. Writes only what
/// is missing or wrong.
pub async fn issue_referral_code(
    api: &dyn AdminApi,
    customer: &Customer,
) -> Result<Issuance, ShopifyError> {
    let code = ReferralCode::for_customer(customer.id);
    let owner = MetafieldOwner::Customer(customer.id);

    let fields = api.metafields(owner).await?;
    let metafield = metafields::ensure_text(
        api,
        owner,
        &fields,
        REFERRAL_NAMESPACE,
        CODE_KEY,
        &code.to_string(),
    )
    .await?;

    let tagged = match TagSet::parse(&customer.tags).with(&referrer_tag(customer.id)) {
        Some(tags) => {
            api.update_customer_tags(customer.id, &tags.to_string())
                .await?;
            true
        }
        None => false,
    };

    Ok(Issuance {
        code,
        metafield,
        tagged,
    })
}
