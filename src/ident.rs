use std::fmt::{Debug, Display};
use std::str::FromStr;

use mongodb::bson::Bson;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{de::Error as _, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

const CAMPAIGN_ID_LENGTH: usize = 10;
const ADMIN_KEY_LENGTH: usize = 32;

/// Sentinel claimant recorded for administrative claims.
const ADMIN_CLAIMANT: &str = "ADMIN_CLAIM";

/// Short alphanumeric slug identifying a campaign. It appears in claim
/// links and as the first segment of the management slug, so it must never
/// contain a `-`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CampaignId(String);

impl CampaignId {
    pub fn generate() -> CampaignId {
        CampaignId(random_token(CAMPAIGN_ID_LENGTH))
    }
}

impl Display for CampaignId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.write_str(&self.0)
    }
}

impl Debug for CampaignId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        Display::fmt(self, f)
    }
}

impl FromStr for CampaignId {
    type Err = IdentParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > 64 {
            return Err(IdentParseError::InvalidLength);
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(IdentParseError::InvalidCharacter);
        }

        Ok(CampaignId(s.to_string()))
    }
}

impl Serialize for CampaignId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CampaignId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CampaignId::from_str(&s).map_err(D::Error::custom)
    }
}

// bson's blanket `From<&T>` covers the reference case for Clone types.
impl From<CampaignId> for Bson {
    fn from(id: CampaignId) -> Bson {
        id.0.into()
    }
}

/// Row id for a promo code. Never externally meaningful beyond the
/// management view.
#[derive(Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromoCodeId(Uuid);

impl PromoCodeId {
    pub fn new() -> PromoCodeId {
        PromoCodeId(Uuid::new_v4())
    }
}

impl Display for PromoCodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        Display::fmt(&self.0, f)
    }
}

impl Debug for PromoCodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        Display::fmt(self, f)
    }
}

impl FromStr for PromoCodeId {
    type Err = IdentParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s).map_err(|_| IdentParseError::InvalidUuid)?;

        Ok(PromoCodeId(uuid))
    }
}

impl From<PromoCodeId> for Bson {
    fn from(id: PromoCodeId) -> Bson {
        id.to_string().into()
    }
}

/// Privacy-preserving fingerprint of a visitor, derived from connection
/// metadata. Deterministic and stateless: the same address and user-agent
/// always produce the same id. A visitor switching devices, networks, or
/// browser sessions produces a different id; that is an accepted limitation
/// of this layer, not something it tries to fix.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorId(String);

impl VisitorId {
    pub fn derive(address: &str, user_agent: &str) -> VisitorId {
        let mut hasher = Sha256::new();
        hasher.update(address.as_bytes());
        hasher.update(b":");
        hasher.update(user_agent.as_bytes());

        VisitorId(hex::encode(hasher.finalize()))
    }

    pub fn admin() -> VisitorId {
        VisitorId(ADMIN_CLAIMANT.to_string())
    }

    pub fn is_admin(&self) -> bool {
        self.0 == ADMIN_CLAIMANT
    }
}

impl Display for VisitorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.write_str(&self.0)
    }
}

impl Debug for VisitorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        Display::fmt(self, f)
    }
}

impl From<&VisitorId> for Bson {
    fn from(id: &VisitorId) -> Bson {
        id.0.clone().into()
    }
}

pub fn generate_admin_key() -> String {
    random_token(ADMIN_KEY_LENGTH)
}

fn random_token(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[derive(Copy, Clone, Debug)]
pub enum IdentParseError {
    InvalidLength,
    InvalidCharacter,
    InvalidUuid,
}

impl Display for IdentParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visitor_id_is_deterministic() {
        let a = VisitorId::derive("203.0.113.7", "Mozilla/5.0");
        let b = VisitorId::derive("203.0.113.7", "Mozilla/5.0");

        assert_eq!(a, b);
    }

    #[test]
    fn visitor_id_changes_with_either_input() {
        let base = VisitorId::derive("203.0.113.7", "Mozilla/5.0");

        assert_ne!(base, VisitorId::derive("203.0.113.8", "Mozilla/5.0"));
        assert_ne!(base, VisitorId::derive("203.0.113.7", "curl/8.0"));
    }

    #[test]
    fn visitor_id_is_a_sha256_hex_digest() {
        let id = VisitorId::derive("127.0.0.1", "");

        assert_eq!(id.to_string().len(), 64);
        assert!(id.to_string().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_identifiers_have_expected_shape() {
        let campaign_id = CampaignId::generate();
        let admin_key = generate_admin_key();

        assert_eq!(campaign_id.to_string().len(), 10);
        assert_eq!(admin_key.len(), 32);
        assert!(admin_key.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn campaign_id_rejects_non_alphanumeric_input() {
        assert!("abc123XYZ0".parse::<CampaignId>().is_ok());
        assert!("abc-123".parse::<CampaignId>().is_err());
        assert!("".parse::<CampaignId>().is_err());
        assert!("a/b".parse::<CampaignId>().is_err());
    }

    #[test]
    fn identifiers_convert_to_bson_by_reference() {
        let campaign_id = CampaignId::generate();
        let code_id = PromoCodeId::new();
        let visitor = VisitorId::derive("203.0.113.7", "ua");

        assert_eq!(
            Bson::from(&campaign_id),
            Bson::String(campaign_id.to_string())
        );
        assert_eq!(Bson::from(&code_id), Bson::String(code_id.to_string()));
        assert_eq!(Bson::from(&visitor), Bson::String(visitor.to_string()));
    }

    #[test]
    fn admin_sentinel_is_recognized() {
        assert!(VisitorId::admin().is_admin());
        assert!(!VisitorId::derive("127.0.0.1", "ua").is_admin());
    }
}
