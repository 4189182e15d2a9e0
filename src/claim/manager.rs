use chrono::Utc;

use crate::campaign::{parse_management_slug, Campaign};
use crate::database::Database;
use crate::error::Error;
use crate::gate::thread::ThreadFetcher;
use crate::gate::{self, GateContext};
use crate::ident::{CampaignId, VisitorId};

/// How many times a claim re-selects after losing the conditional update to
/// a concurrent request. Exhausted retries report the same outcome as an
/// empty campaign; the two are indistinguishable to the caller anyway.
const MAX_CLAIM_ATTEMPTS: usize = 3;

/// The claim state machine. Per (campaign, visitor) the externally visible
/// states are unclaimed and claimed; the transition happens through a
/// single conditional update and so appears atomic to every observer.
///
/// 1. missing campaign rejects;
/// 2. the gate rejects without mutating anything;
/// 3. a visitor that already holds a code gets the same code back
///    (idempotent re-fetch);
/// 4. otherwise some unclaimed code is reserved via the compare-and-set in
///    `PromoCodeStore::claim_code`, retrying on a lost race.
#[tracing::instrument(skip(db, fetcher, context))]
pub async fn attempt_claim(
    db: &dyn Database,
    fetcher: &dyn ThreadFetcher,
    campaign_id: &CampaignId,
    visitor: &VisitorId,
    context: &GateContext,
) -> Result<String, Error> {
    let campaign = db
        .campaigns()
        .fetch_campaign_by_id(campaign_id)
        .await?
        .ok_or_else(|| Error::CampaignNotFound {
            campaign_id: campaign_id.clone(),
        })?;

    gate::evaluate(&campaign, context, fetcher, Utc::now()).await?;

    if let Some(existing) = db
        .codes()
        .fetch_code_by_claimant(campaign_id, visitor)
        .await?
    {
        return Ok(existing.value);
    }

    // A handle has only been checked against the thread when the campaign
    // demands proof; an unchecked handle must not be persisted as one.
    let verification_identity = if campaign.require_engagement_proof {
        context.external_handle.as_deref()
    } else {
        None
    };
    allocate(db, campaign_id, visitor, verification_identity).await
}

/// Privileged claim through the management slug: no gate, no idempotent
/// re-fetch. Every call consumes one more code under the admin sentinel.
#[tracing::instrument(skip(db, slug))]
pub async fn admin_claim(db: &dyn Database, slug: &str) -> Result<String, Error> {
    let campaign = resolve_management_slug(db, slug).await?;

    allocate(db, &campaign.id, &VisitorId::admin(), Some("admin")).await
}

pub async fn resolve_management_slug(db: &dyn Database, slug: &str) -> Result<Campaign, Error> {
    let (campaign_id, admin_key) =
        parse_management_slug(slug).ok_or(Error::ManagementLinkNotFound)?;

    db.campaigns()
        .fetch_campaign_by_id_and_key(&campaign_id, &admin_key)
        .await?
        .ok_or(Error::ManagementLinkNotFound)
}

/// Selects an unclaimed code and tries to win the conditional update on it.
/// Losing the race on a row means another request claimed it between the
/// read and the write; a loser re-selects rather than reporting a spurious
/// conflict. The value is returned only after the claim is durably written.
async fn allocate(
    db: &dyn Database,
    campaign_id: &CampaignId,
    claimant: &VisitorId,
    verification_identity: Option<&str>,
) -> Result<String, Error> {
    for attempt in 0..MAX_CLAIM_ATTEMPTS {
        let code = match db.codes().fetch_available_code(campaign_id).await? {
            Some(code) => code,
            None => {
                return Err(Error::CodesExhausted {
                    campaign_id: campaign_id.clone(),
                })
            }
        };

        let now = Utc::now();
        if db
            .codes()
            .claim_code(&code.id, claimant, now, verification_identity)
            .await?
        {
            return Ok(code.value);
        }

        tracing::debug!(code_id = %code.id, attempt, "lost claim race, reselecting");
    }

    Err(Error::CodesExhausted {
        campaign_id: campaign_id.clone(),
    })
}
