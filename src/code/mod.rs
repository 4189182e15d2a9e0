use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ident::{CampaignId, PromoCodeId, VisitorId};
use crate::utils::chrono_datetime_option_as_bson_datetime;

pub mod db;

/// One distributable code. Created in bulk with its campaign and mutated
/// exactly once, from unclaimed to claimed; the claim update is conditional
/// on `claimed_by` still being null.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PromoCode {
    #[serde(rename = "_id")]
    pub id: PromoCodeId,
    pub campaign_id: CampaignId,
    pub value: String,
    pub claimed_by: Option<VisitorId>,
    #[serde(with = "chrono_datetime_option_as_bson_datetime")]
    pub claimed_at: Option<DateTime<Utc>>,
    pub verification_identity: Option<String>,
}

impl PromoCode {
    pub fn unclaimed(campaign_id: CampaignId, value: String) -> PromoCode {
        PromoCode {
            id: PromoCodeId::new(),
            campaign_id,
            value,
            claimed_by: None,
            claimed_at: None,
            verification_identity: None,
        }
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed_by.is_some()
    }
}
