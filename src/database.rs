use mongodb::{Collection, Database as MongoDb};

use crate::campaign::db::CampaignStore;
use crate::campaign::Campaign;
use crate::code::db::PromoCodeStore;
use crate::code::PromoCode;

pub type MongoCampaignStore = Collection<Campaign>;
pub type MongoPromoCodeStore = Collection<PromoCode>;

/// Seam between the managers and the datastore. Managers only ever see
/// `&dyn Database`, which is what lets the unit tests drive them with the
/// mock below.
pub trait Database: Send + Sync {
    fn campaigns(&self) -> &dyn CampaignStore;
    fn codes(&self) -> &dyn PromoCodeStore;
}

#[derive(Clone, Debug)]
pub struct MongoDatabase {
    campaigns: Collection<Campaign>,
    codes: Collection<PromoCode>,
}

impl MongoDatabase {
    pub fn new(db: MongoDb) -> MongoDatabase {
        MongoDatabase {
            campaigns: db.collection("campaigns"),
            codes: db.collection("promo_codes"),
        }
    }
}

impl Database for MongoDatabase {
    fn campaigns(&self) -> &dyn CampaignStore {
        &self.campaigns
    }

    fn codes(&self) -> &dyn PromoCodeStore {
        &self.codes
    }
}

#[cfg(test)]
pub mod test {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use crate::error::Error;
    use crate::ident::{CampaignId, PromoCodeId, VisitorId};

    use super::*;

    /// Closure-programmable database for manager tests. Every handler
    /// panics until a test installs its own, so an unexpected store call
    /// fails the test loudly.
    pub struct MockDatabase {
        pub campaigns: MockCampaignStore,
        pub codes: MockPromoCodeStore,
    }

    impl MockDatabase {
        pub fn new() -> MockDatabase {
            MockDatabase {
                campaigns: MockCampaignStore::new(),
                codes: MockPromoCodeStore::new(),
            }
        }
    }

    impl Database for MockDatabase {
        fn campaigns(&self) -> &dyn CampaignStore {
            &self.campaigns
        }

        fn codes(&self) -> &dyn PromoCodeStore {
            &self.codes
        }
    }

    pub struct MockCampaignStore {
        pub on_insert_campaign: Box<dyn Fn(&Campaign) -> Result<(), Error> + Send + Sync>,
        pub on_fetch_campaign_by_id:
            Box<dyn Fn(&CampaignId) -> Result<Option<Campaign>, Error> + Send + Sync>,
        pub on_fetch_campaign_by_id_and_key:
            Box<dyn Fn(&CampaignId, &str) -> Result<Option<Campaign>, Error> + Send + Sync>,
        pub on_fetch_campaigns_created_before:
            Box<dyn Fn(DateTime<Utc>) -> Result<Vec<Campaign>, Error> + Send + Sync>,
        pub on_delete_campaigns:
            Box<dyn Fn(&[CampaignId]) -> Result<u64, Error> + Send + Sync>,
    }

    impl MockCampaignStore {
        pub fn new() -> MockCampaignStore {
            MockCampaignStore {
                on_insert_campaign: Box::new(|_| panic!("unexpected call to insert_campaign")),
                on_fetch_campaign_by_id: Box::new(|_| {
                    panic!("unexpected call to fetch_campaign_by_id")
                }),
                on_fetch_campaign_by_id_and_key: Box::new(|_, _| {
                    panic!("unexpected call to fetch_campaign_by_id_and_key")
                }),
                on_fetch_campaigns_created_before: Box::new(|_| {
                    panic!("unexpected call to fetch_campaigns_created_before")
                }),
                on_delete_campaigns: Box::new(|_| panic!("unexpected call to delete_campaigns")),
            }
        }
    }

    #[async_trait]
    impl CampaignStore for MockCampaignStore {
        async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error> {
            (self.on_insert_campaign)(campaign)
        }

        async fn fetch_campaign_by_id(
            &self,
            campaign_id: &CampaignId,
        ) -> Result<Option<Campaign>, Error> {
            (self.on_fetch_campaign_by_id)(campaign_id)
        }

        async fn fetch_campaign_by_id_and_key(
            &self,
            campaign_id: &CampaignId,
            admin_key: &str,
        ) -> Result<Option<Campaign>, Error> {
            (self.on_fetch_campaign_by_id_and_key)(campaign_id, admin_key)
        }

        async fn fetch_campaigns_created_before(
            &self,
            cutoff: DateTime<Utc>,
        ) -> Result<Vec<Campaign>, Error> {
            (self.on_fetch_campaigns_created_before)(cutoff)
        }

        async fn delete_campaigns(&self, campaign_ids: &[CampaignId]) -> Result<u64, Error> {
            (self.on_delete_campaigns)(campaign_ids)
        }
    }

    pub struct MockPromoCodeStore {
        pub on_insert_codes: Box<dyn Fn(&[PromoCode]) -> Result<(), Error> + Send + Sync>,
        pub on_fetch_code_by_claimant: Box<
            dyn Fn(&CampaignId, &VisitorId) -> Result<Option<PromoCode>, Error> + Send + Sync,
        >,
        pub on_fetch_available_code:
            Box<dyn Fn(&CampaignId) -> Result<Option<PromoCode>, Error> + Send + Sync>,
        pub on_claim_code: Box<
            dyn Fn(&PromoCodeId, &VisitorId, DateTime<Utc>, Option<&str>) -> Result<bool, Error>
                + Send
                + Sync,
        >,
        pub on_fetch_codes_by_campaign:
            Box<dyn Fn(&CampaignId) -> Result<Vec<PromoCode>, Error> + Send + Sync>,
        pub on_delete_codes_by_campaigns:
            Box<dyn Fn(&[CampaignId]) -> Result<u64, Error> + Send + Sync>,
    }

    impl MockPromoCodeStore {
        pub fn new() -> MockPromoCodeStore {
            MockPromoCodeStore {
                on_insert_codes: Box::new(|_| panic!("unexpected call to insert_codes")),
                on_fetch_code_by_claimant: Box::new(|_, _| {
                    panic!("unexpected call to fetch_code_by_claimant")
                }),
                on_fetch_available_code: Box::new(|_| {
                    panic!("unexpected call to fetch_available_code")
                }),
                on_claim_code: Box::new(|_, _, _, _| panic!("unexpected call to claim_code")),
                on_fetch_codes_by_campaign: Box::new(|_| {
                    panic!("unexpected call to fetch_codes_by_campaign")
                }),
                on_delete_codes_by_campaigns: Box::new(|_| {
                    panic!("unexpected call to delete_codes_by_campaigns")
                }),
            }
        }
    }

    #[async_trait]
    impl PromoCodeStore for MockPromoCodeStore {
        async fn insert_codes(&self, codes: &[PromoCode]) -> Result<(), Error> {
            (self.on_insert_codes)(codes)
        }

        async fn fetch_code_by_claimant(
            &self,
            campaign_id: &CampaignId,
            claimant: &VisitorId,
        ) -> Result<Option<PromoCode>, Error> {
            (self.on_fetch_code_by_claimant)(campaign_id, claimant)
        }

        async fn fetch_available_code(
            &self,
            campaign_id: &CampaignId,
        ) -> Result<Option<PromoCode>, Error> {
            (self.on_fetch_available_code)(campaign_id)
        }

        async fn claim_code(
            &self,
            code_id: &PromoCodeId,
            claimant: &VisitorId,
            claimed_at: DateTime<Utc>,
            verification_identity: Option<&str>,
        ) -> Result<bool, Error> {
            (self.on_claim_code)(code_id, claimant, claimed_at, verification_identity)
        }

        async fn fetch_codes_by_campaign(
            &self,
            campaign_id: &CampaignId,
        ) -> Result<Vec<PromoCode>, Error> {
            (self.on_fetch_codes_by_campaign)(campaign_id)
        }

        async fn delete_codes_by_campaigns(
            &self,
            campaign_ids: &[CampaignId],
        ) -> Result<u64, Error> {
            (self.on_delete_codes_by_campaigns)(campaign_ids)
        }
    }
}
