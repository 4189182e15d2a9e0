use actix_web::web::{Data, Json, Path};
use actix_web::{get, post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::code::PromoCode;
use crate::config::Config;
use crate::database::MongoDatabase;
use crate::error::Error;
use crate::ident::{CampaignId, PromoCodeId, VisitorId};

use super::manager::{self, CreateCampaign};
use super::Campaign;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignBody {
    pub codes: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub require_engagement_proof: bool,
    #[serde(default)]
    pub proof_source_url: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignResponseBody {
    pub campaign_id: CampaignId,
    pub claim_url: String,
    pub manage_url: String,
    pub total_codes: usize,
}

#[post("/campaigns")]
#[tracing::instrument(skip_all)]
pub async fn create_campaign(
    db: Data<MongoDatabase>,
    config: Data<Config>,
    body: Json<CreateCampaignBody>,
) -> Result<Json<CreateCampaignResponseBody>, Error> {
    let body = body.into_inner();

    let (campaign, total_codes) = manager::create_campaign(
        db.get_ref(),
        CreateCampaign {
            codes: body.codes,
            expires_at: body.expires_at,
            require_engagement_proof: body.require_engagement_proof,
            proof_source_url: body.proof_source_url,
        },
    )
    .await?;

    Ok(Json(CreateCampaignResponseBody {
        claim_url: format!("{}/claim/{}", config.base_url, campaign.id),
        manage_url: format!("{}/manage/{}", config.base_url, campaign.management_slug()),
        campaign_id: campaign.id,
        total_codes,
    }))
}

/// Public subset of a campaign, enough for the claim page to know whether
/// it must ask for an engagement proof.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignInfoBody {
    pub require_engagement_proof: bool,
    pub proof_source_url: Option<String>,
}

#[get("/campaigns/{campaign_id}/info")]
#[tracing::instrument(skip(db))]
pub async fn get_campaign_info(
    db: Data<MongoDatabase>,
    params: Path<CampaignId>,
) -> Result<Json<CampaignInfoBody>, Error> {
    let campaign_id = params.into_inner();

    let campaign = manager::get_campaign_by_id(db.get_ref(), &campaign_id).await?;

    Ok(Json(CampaignInfoBody {
        require_engagement_proof: campaign.require_engagement_proof,
        proof_source_url: campaign.proof_source_url,
    }))
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementBody {
    pub stats: CampaignStatsBody,
    pub codes: Vec<ManagedCodeBody>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignStatsBody {
    pub campaign_id: CampaignId,
    pub total_codes: usize,
    pub claimed_codes: usize,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedCodeBody {
    pub id: PromoCodeId,
    pub value: String,
    /// Hashed identity only; the raw address and user-agent never leave
    /// the fingerprint function.
    pub claimed_by: Option<VisitorId>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub verification_identity: Option<String>,
}

impl ManagementBody {
    pub fn render(campaign: &Campaign, codes: Vec<PromoCode>) -> ManagementBody {
        let claimed_codes = codes.iter().filter(|code| code.is_claimed()).count();

        ManagementBody {
            stats: CampaignStatsBody {
                campaign_id: campaign.id.clone(),
                total_codes: codes.len(),
                claimed_codes,
                created_at: campaign.created_at,
                expires_at: campaign.expires_at,
            },
            codes: codes
                .into_iter()
                .map(|code| ManagedCodeBody {
                    id: code.id,
                    value: code.value,
                    claimed_by: code.claimed_by,
                    claimed_at: code.claimed_at,
                    verification_identity: code.verification_identity,
                })
                .collect(),
        }
    }
}

#[get("/manage/{slug}")]
#[tracing::instrument(skip_all)]
pub async fn get_campaign_management(
    db: Data<MongoDatabase>,
    params: Path<String>,
) -> Result<Json<ManagementBody>, Error> {
    let slug = params.into_inner();

    let (campaign, codes) = manager::manage_campaign(db.get_ref(), &slug).await?;

    Ok(Json(ManagementBody::render(&campaign, codes)))
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupBody {
    pub deleted_campaigns: u64,
    pub deleted_codes: u64,
}

#[post("/cleanup")]
#[tracing::instrument(skip(db))]
pub async fn cleanup_campaigns(db: Data<MongoDatabase>) -> Result<Json<CleanupBody>, Error> {
    let outcome = manager::cleanup_campaigns(db.get_ref(), Utc::now()).await?;

    Ok(Json(CleanupBody {
        deleted_campaigns: outcome.deleted_campaigns,
        deleted_codes: outcome.deleted_codes,
    }))
}
