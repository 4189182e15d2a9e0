use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson;

use crate::database::MongoPromoCodeStore;
use crate::error::Error;
use crate::ident::{CampaignId, PromoCodeId, VisitorId};

use super::PromoCode;

#[async_trait]
pub trait PromoCodeStore: Send + Sync {
    async fn insert_codes(&self, codes: &[PromoCode]) -> Result<(), Error>;

    async fn fetch_code_by_claimant(
        &self,
        campaign_id: &CampaignId,
        claimant: &VisitorId,
    ) -> Result<Option<PromoCode>, Error>;

    async fn fetch_available_code(
        &self,
        campaign_id: &CampaignId,
    ) -> Result<Option<PromoCode>, Error>;

    /// Conditionally transitions a code from unclaimed to claimed. Returns
    /// false when the code was no longer unclaimed at mutation time, i.e.
    /// another request won the race on this row.
    async fn claim_code(
        &self,
        code_id: &PromoCodeId,
        claimant: &VisitorId,
        claimed_at: DateTime<Utc>,
        verification_identity: Option<&str>,
    ) -> Result<bool, Error>;

    async fn fetch_codes_by_campaign(
        &self,
        campaign_id: &CampaignId,
    ) -> Result<Vec<PromoCode>, Error>;

    async fn delete_codes_by_campaigns(&self, campaign_ids: &[CampaignId])
        -> Result<u64, Error>;
}

#[async_trait]
impl PromoCodeStore for MongoPromoCodeStore {
    #[tracing::instrument(skip(self, codes))]
    async fn insert_codes(&self, codes: &[PromoCode]) -> Result<(), Error> {
        self.insert_many(codes, None).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_code_by_claimant(
        &self,
        campaign_id: &CampaignId,
        claimant: &VisitorId,
    ) -> Result<Option<PromoCode>, Error> {
        let code: Option<PromoCode> = self
            .find_one(
                bson::doc! { "campaign_id": campaign_id, "claimed_by": claimant },
                None,
            )
            .await?;

        Ok(code)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_available_code(
        &self,
        campaign_id: &CampaignId,
    ) -> Result<Option<PromoCode>, Error> {
        // Any unclaimed row will do; the contract promises no ordering.
        let code: Option<PromoCode> = self
            .find_one(
                bson::doc! { "campaign_id": campaign_id, "claimed_by": bson::Bson::Null },
                None,
            )
            .await?;

        Ok(code)
    }

    #[tracing::instrument(skip(self))]
    async fn claim_code(
        &self,
        code_id: &PromoCodeId,
        claimant: &VisitorId,
        claimed_at: DateTime<Utc>,
        verification_identity: Option<&str>,
    ) -> Result<bool, Error> {
        // The `claimed_by: null` predicate is the linearization point:
        // exactly one concurrent update matches the row.
        let result = self
            .update_one(
                bson::doc! { "_id": code_id, "claimed_by": bson::Bson::Null },
                bson::doc! { "$set": {
                    "claimed_by": claimant,
                    "claimed_at": bson::DateTime::from_chrono(claimed_at),
                    "verification_identity": verification_identity.map(bson::Bson::from).unwrap_or(bson::Bson::Null),
                } },
                None,
            )
            .await?;

        Ok(result.matched_count == 1)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_codes_by_campaign(
        &self,
        campaign_id: &CampaignId,
    ) -> Result<Vec<PromoCode>, Error> {
        let codes: Vec<PromoCode> = self
            .find(bson::doc! { "campaign_id": campaign_id }, None)
            .await?
            .try_collect()
            .await?;

        Ok(codes)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_codes_by_campaigns(
        &self,
        campaign_ids: &[CampaignId],
    ) -> Result<u64, Error> {
        let ids: Vec<bson::Bson> = campaign_ids.iter().map(bson::Bson::from).collect();
        let result = self
            .delete_many(bson::doc! { "campaign_id": { "$in": ids } }, None)
            .await?;

        Ok(result.deleted_count)
    }
}
