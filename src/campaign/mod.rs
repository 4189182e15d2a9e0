use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ident::CampaignId;
use crate::utils::chrono_datetime_option_as_bson_datetime;

pub mod db;
pub mod endpoints;
pub mod manager;

/// A batch of promo codes distributed under one claim link and one
/// management link. Immutable after creation; removed by the retention
/// sweep together with its codes.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Campaign {
    #[serde(rename = "_id")]
    pub id: CampaignId,
    pub admin_key: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_option_as_bson_datetime")]
    pub expires_at: Option<DateTime<Utc>>,
    pub require_engagement_proof: bool,
    pub proof_source_url: Option<String>,
}

impl Campaign {
    /// The compound secret granting access to stats and admin claims.
    pub fn management_slug(&self) -> String {
        format!("{}-{}", self.id, self.admin_key)
    }
}

/// Splits a management slug into its campaign id and admin key. Campaign
/// ids are alphanumeric, so the first `-` is unambiguous.
pub fn parse_management_slug(slug: &str) -> Option<(CampaignId, String)> {
    let (id, key) = slug.split_once('-')?;
    let campaign_id = id.parse().ok()?;
    if key.is_empty() {
        return None;
    }

    Some((campaign_id, key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::generate_admin_key;

    #[test]
    fn management_slug_round_trips() {
        let campaign_id = CampaignId::generate();
        let admin_key = generate_admin_key();
        let slug = format!("{}-{}", campaign_id, admin_key);

        let (parsed_id, parsed_key) = parse_management_slug(&slug).unwrap();

        assert_eq!(parsed_id, campaign_id);
        assert_eq!(parsed_key, admin_key);
    }

    #[test]
    fn management_slug_rejects_malformed_input() {
        assert!(parse_management_slug("no separator").is_none());
        assert!(parse_management_slug("abc123-").is_none());
        assert!(parse_management_slug("-key").is_none());
    }
}
