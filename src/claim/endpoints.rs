use actix_web::web::{Data, Json, Path};
use actix_web::{post, HttpRequest};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::database::MongoDatabase;
use crate::error::Error;
use crate::gate::thread::RedditFetcher;
use crate::gate::verify::{HumanVerifier, RecaptchaVerifier};
use crate::gate::GateContext;
use crate::ident::{CampaignId, VisitorId};
use crate::limit::{MemoryRateLimiter, RateLimiter};
use crate::utils::{client_address, user_agent};

use super::manager;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimBody {
    pub human_verification_token: String,
    pub external_handle: Option<String>,
    pub secret_phrase: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ClaimResponseBody {
    pub code: String,
}

#[post("/claim/{campaign_id}")]
#[tracing::instrument(skip_all)]
pub async fn claim_code(
    db: Data<MongoDatabase>,
    verifier: Data<RecaptchaVerifier>,
    fetcher: Data<RedditFetcher>,
    limiter: Data<MemoryRateLimiter>,
    request: HttpRequest,
    params: Path<CampaignId>,
    body: Json<ClaimBody>,
) -> Result<Json<ClaimResponseBody>, Error> {
    let campaign_id = params.into_inner();
    let body = body.into_inner();

    let address = client_address(&request);
    if !limiter.admit(&address, Utc::now()) {
        return Err(Error::RateLimited);
    }

    let visitor = VisitorId::derive(&address, &user_agent(&request));
    let human_verified = verifier.verify(&body.human_verification_token).await?;

    let context = GateContext {
        human_verified,
        external_handle: body.external_handle,
        secret_phrase: body.secret_phrase,
    };

    let code = manager::attempt_claim(
        db.get_ref(),
        fetcher.get_ref(),
        &campaign_id,
        &visitor,
        &context,
    )
    .await?;

    Ok(Json(ClaimResponseBody { code }))
}

#[post("/manage/{slug}/claim-code")]
#[tracing::instrument(skip_all)]
pub async fn admin_claim_code(
    db: Data<MongoDatabase>,
    params: Path<String>,
) -> Result<Json<ClaimResponseBody>, Error> {
    let slug = params.into_inner();

    let code = manager::admin_claim(db.get_ref(), &slug).await?;

    Ok(Json(ClaimResponseBody { code }))
}
