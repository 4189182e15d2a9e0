use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson;

use crate::database::MongoCampaignStore;
use crate::error::Error;
use crate::ident::CampaignId;

use super::Campaign;

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error>;

    async fn fetch_campaign_by_id(
        &self,
        campaign_id: &CampaignId,
    ) -> Result<Option<Campaign>, Error>;

    async fn fetch_campaign_by_id_and_key(
        &self,
        campaign_id: &CampaignId,
        admin_key: &str,
    ) -> Result<Option<Campaign>, Error>;

    async fn fetch_campaigns_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Campaign>, Error>;

    async fn delete_campaigns(&self, campaign_ids: &[CampaignId]) -> Result<u64, Error>;
}

#[async_trait]
impl CampaignStore for MongoCampaignStore {
    #[tracing::instrument(skip(self))]
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error> {
        self.insert_one(campaign, None).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaign_by_id(
        &self,
        campaign_id: &CampaignId,
    ) -> Result<Option<Campaign>, Error> {
        let campaign: Option<Campaign> =
            self.find_one(bson::doc! { "_id": campaign_id }, None).await?;

        Ok(campaign)
    }

    #[tracing::instrument(skip(self, admin_key))]
    async fn fetch_campaign_by_id_and_key(
        &self,
        campaign_id: &CampaignId,
        admin_key: &str,
    ) -> Result<Option<Campaign>, Error> {
        let campaign: Option<Campaign> = self
            .find_one(
                bson::doc! { "_id": campaign_id, "admin_key": admin_key },
                None,
            )
            .await?;

        Ok(campaign)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaigns_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Campaign>, Error> {
        let cutoff = bson::DateTime::from_chrono(cutoff);
        let campaigns: Vec<Campaign> = self
            .find(bson::doc! { "created_at": { "$lt": cutoff } }, None)
            .await?
            .try_collect()
            .await?;

        Ok(campaigns)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_campaigns(&self, campaign_ids: &[CampaignId]) -> Result<u64, Error> {
        let ids: Vec<bson::Bson> = campaign_ids.iter().map(bson::Bson::from).collect();
        let result = self
            .delete_many(bson::doc! { "_id": { "$in": ids } }, None)
            .await?;

        Ok(result.deleted_count)
    }
}
