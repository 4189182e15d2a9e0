use chrono::{DateTime, Duration, Utc};

use crate::code::PromoCode;
use crate::database::Database;
use crate::error::Error;
use crate::gate::thread::is_thread_url;
use crate::ident::{generate_admin_key, CampaignId};
use crate::utils::parse_codes;

use super::Campaign;

const MAX_CODES_PER_CAMPAIGN: usize = 10_000;

/// Campaigns and their codes are swept this long after creation.
const RETENTION_DAYS: i64 = 30;

#[derive(Clone, Debug)]
pub struct CreateCampaign {
    pub codes: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub require_engagement_proof: bool,
    pub proof_source_url: Option<String>,
}

#[tracing::instrument(skip(db, request))]
pub async fn create_campaign(
    db: &dyn Database,
    request: CreateCampaign,
) -> Result<(Campaign, usize), Error> {
    let values = parse_codes(&request.codes);
    if values.is_empty() {
        return Err(Error::NoCodesProvided);
    }
    if values.len() > MAX_CODES_PER_CAMPAIGN {
        return Err(Error::TooManyCodes {
            count: values.len(),
            maximum: MAX_CODES_PER_CAMPAIGN,
        });
    }

    if request.require_engagement_proof {
        let url = request.proof_source_url.as_deref().unwrap_or("");
        if !is_thread_url(url) {
            return Err(Error::InvalidProofSourceUrl {
                url: url.to_string(),
            });
        }
    }

    let campaign = Campaign {
        id: CampaignId::generate(),
        admin_key: generate_admin_key(),
        created_at: Utc::now(),
        expires_at: request.expires_at,
        require_engagement_proof: request.require_engagement_proof,
        proof_source_url: request.proof_source_url,
    };

    db.campaigns().insert_campaign(&campaign).await?;

    let codes: Vec<PromoCode> = values
        .into_iter()
        .map(|value| PromoCode::unclaimed(campaign.id.clone(), value))
        .collect();

    if let Err(err) = db.codes().insert_codes(&codes).await {
        // Roll the half-created campaign back so no code-less campaign
        // leaks out; the original failure is what the caller sees.
        tracing::error!(campaign_id = %campaign.id, error = ?err, "code insertion failed, rolling back campaign");
        if let Err(rollback_err) = db
            .campaigns()
            .delete_campaigns(std::slice::from_ref(&campaign.id))
            .await
        {
            tracing::error!(campaign_id = %campaign.id, error = ?rollback_err, "campaign rollback failed");
        }
        return Err(err);
    }

    Ok((campaign, codes.len()))
}

#[tracing::instrument(skip(db))]
pub async fn get_campaign_by_id(
    db: &dyn Database,
    campaign_id: &CampaignId,
) -> Result<Campaign, Error> {
    db.campaigns()
        .fetch_campaign_by_id(campaign_id)
        .await?
        .ok_or_else(|| Error::CampaignNotFound {
            campaign_id: campaign_id.clone(),
        })
}

/// Resolves a management slug and returns the campaign with all its codes,
/// claimed and unclaimed, for the stats view.
#[tracing::instrument(skip(db, slug))]
pub async fn manage_campaign(
    db: &dyn Database,
    slug: &str,
) -> Result<(Campaign, Vec<PromoCode>), Error> {
    let campaign = crate::claim::manager::resolve_management_slug(db, slug).await?;
    let codes = db.codes().fetch_codes_by_campaign(&campaign.id).await?;

    Ok((campaign, codes))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CleanupOutcome {
    pub deleted_campaigns: u64,
    pub deleted_codes: u64,
}

/// Retention sweep: campaigns older than the window disappear together
/// with their codes. Codes go first so a failure cannot orphan them.
#[tracing::instrument(skip(db))]
pub async fn cleanup_campaigns(
    db: &dyn Database,
    now: DateTime<Utc>,
) -> Result<CleanupOutcome, Error> {
    let cutoff = now - Duration::days(RETENTION_DAYS);
    let stale = db
        .campaigns()
        .fetch_campaigns_created_before(cutoff)
        .await?;

    if stale.is_empty() {
        return Ok(CleanupOutcome {
            deleted_campaigns: 0,
            deleted_codes: 0,
        });
    }

    let campaign_ids: Vec<CampaignId> = stale.into_iter().map(|campaign| campaign.id).collect();

    let deleted_codes = db.codes().delete_codes_by_campaigns(&campaign_ids).await?;
    let deleted_campaigns = db.campaigns().delete_campaigns(&campaign_ids).await?;

    tracing::info!(deleted_campaigns, deleted_codes, "retention sweep finished");

    Ok(CleanupOutcome {
        deleted_campaigns,
        deleted_codes,
    })
}
