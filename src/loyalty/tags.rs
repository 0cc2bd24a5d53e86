use std::fmt;

pub const AGE_VERIFIED: &str = "age_verified";
pub const REFERRAL_REWARDED: &str = "referral_rewarded";
pub const AFFILIATE: &str = "affiliate";
pub const REFERRER_PREFIX: &str = "referrer-";

/// Tag for a customer whose referral code has been issued.
pub fn referrer_tag(customer_id: u64) -> String {
    format!("{}{}", REFERRER_PREFIX, customer_id)
}

/// A customer's tags, parsed from Shopify's comma-separated string.
///
/// Order is preserved so rewriting the tag string only appends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(Vec<String>);

impl TagSet {
    pub fn parse(raw: &str) -> Self {
        TagSet(
            raw.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.iter().any(|t| t.starts_with(prefix))
    }

    pub fn is_age_verified(&self) -> bool {
        self.contains(AGE_VERIFIED)
    }

    pub fn is_referral_rewarded(&self) -> bool {
        self.contains(REFERRAL_REWARDED)
    }

    /// Copy with `tag` appended, or `None` if it is already present.
    pub fn with(&self, tag: &str) -> Option<TagSet> {
        if self.contains(tag) {
            return None;
        }
        let mut tags = self.0.clone();
        tags.push(tag.to_string());
        Some(TagSet(tags))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}
