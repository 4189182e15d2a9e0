use chrono::{DateTime, Utc};

use crate::campaign::Campaign;
use crate::error::Error;

pub mod thread;
pub mod verify;

use thread::ThreadFetcher;

/// Everything a claim attempt brings to the gate. The human-verification
/// token has already been exchanged for a boolean at the boundary; the gate
/// trusts that result.
#[derive(Clone, Debug)]
pub struct GateContext {
    pub human_verified: bool,
    pub external_handle: Option<String>,
    pub secret_phrase: Option<String>,
}

/// Decides whether a claim attempt may proceed: expiry, then human
/// verification, then (when the campaign demands it) one engagement-proof
/// mode against the campaign's thread. Rejections never consume a code.
#[tracing::instrument(skip(fetcher, context))]
pub async fn evaluate(
    campaign: &Campaign,
    context: &GateContext,
    fetcher: &dyn ThreadFetcher,
    now: DateTime<Utc>,
) -> Result<(), Error> {
    if let Some(expires_at) = campaign.expires_at {
        if expires_at < now {
            return Err(Error::CampaignExpired {
                campaign_id: campaign.id.clone(),
                expires_at,
            });
        }
    }

    if !context.human_verified {
        return Err(Error::HumanVerificationFailed);
    }

    if campaign.require_engagement_proof {
        let url = campaign.proof_source_url.as_deref().ok_or_else(|| {
            Error::EngagementProofFailed {
                reason: "the campaign has no verification thread configured".to_string(),
            }
        })?;

        let content = fetcher.fetch_thread(url).await?;

        // Exactly one proof mode per request; a supplied handle wins over
        // a supplied phrase.
        if let Some(handle) = context.external_handle.as_deref() {
            if !content.handles.contains(handle) {
                return Err(Error::EngagementProofFailed {
                    reason: format!(
                        "username \"{}\" was not found among the thread participants",
                        handle
                    ),
                });
            }
        } else if let Some(phrase) = context.secret_phrase.as_deref() {
            if !content.text.contains(&phrase.to_lowercase()) {
                return Err(Error::EngagementProofFailed {
                    reason: format!(
                        "the phrase \"{}\" does not appear in the verification thread",
                        phrase
                    ),
                });
            }
        } else {
            return Err(Error::EngagementProofFailed {
                reason: "this campaign requires a username or a verification phrase"
                    .to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::gate::thread::test::MockThreadFetcher;
    use crate::gate::thread::ThreadContent;
    use crate::ident::{generate_admin_key, CampaignId};

    use super::*;

    fn open_campaign() -> Campaign {
        Campaign {
            id: CampaignId::generate(),
            admin_key: generate_admin_key(),
            created_at: Utc::now(),
            expires_at: None,
            require_engagement_proof: false,
            proof_source_url: None,
        }
    }

    fn proof_campaign() -> Campaign {
        Campaign {
            require_engagement_proof: true,
            proof_source_url: Some("https://www.reddit.com/r/deals/comments/x1/go/".to_string()),
            ..open_campaign()
        }
    }

    fn verified() -> GateContext {
        GateContext {
            human_verified: true,
            external_handle: None,
            secret_phrase: None,
        }
    }

    fn thread_with(handles: &[&str], text: &str) -> ThreadContent {
        ThreadContent {
            handles: handles.iter().map(|s| s.to_string()).collect(),
            text: text.to_lowercase(),
        }
    }

    #[tokio::test]
    async fn campaign_without_expiry_never_expires() {
        let fetcher = MockThreadFetcher::new();

        let outcome = evaluate(&open_campaign(), &verified(), &fetcher, Utc::now()).await;

        assert_eq!(outcome, Ok(()));
    }

    #[tokio::test]
    async fn expiry_boundary() {
        let fetcher = MockThreadFetcher::new();
        let now = Utc::now();

        let expired = Campaign {
            expires_at: Some(now - Duration::seconds(1)),
            ..open_campaign()
        };
        let outcome = evaluate(&expired, &verified(), &fetcher, now).await;
        assert_eq!(
            outcome.unwrap_err(),
            Error::CampaignExpired {
                campaign_id: expired.id.clone(),
                expires_at: now - Duration::seconds(1),
            }
        );

        let live = Campaign {
            expires_at: Some(now + Duration::hours(1)),
            ..open_campaign()
        };
        assert_eq!(evaluate(&live, &verified(), &fetcher, now).await, Ok(()));
    }

    #[tokio::test]
    async fn unverified_humans_are_rejected() {
        let fetcher = MockThreadFetcher::new();
        let context = GateContext {
            human_verified: false,
            ..verified()
        };

        let outcome = evaluate(&open_campaign(), &context, &fetcher, Utc::now()).await;

        assert_eq!(outcome.unwrap_err(), Error::HumanVerificationFailed);
    }

    #[tokio::test]
    async fn handle_must_be_a_thread_participant() {
        let fetcher =
            MockThreadFetcher::returning(thread_with(&["alice", "bob"], "count me in"));

        let context = GateContext {
            external_handle: Some("alice".to_string()),
            ..verified()
        };
        assert_eq!(
            evaluate(&proof_campaign(), &context, &fetcher, Utc::now()).await,
            Ok(())
        );

        let context = GateContext {
            external_handle: Some("mallory".to_string()),
            ..verified()
        };
        let outcome = evaluate(&proof_campaign(), &context, &fetcher, Utc::now()).await;
        assert_eq!(
            outcome.unwrap_err(),
            Error::EngagementProofFailed {
                reason: "username \"mallory\" was not found among the thread participants"
                    .to_string(),
            }
        );
    }

    #[tokio::test]
    async fn phrase_matching_is_case_insensitive() {
        let fetcher =
            MockThreadFetcher::returning(thread_with(&["alice"], "done! SparklyNarwhal42 :)"));

        let context = GateContext {
            secret_phrase: Some("sparklyNARWHAL42".to_string()),
            ..verified()
        };

        assert_eq!(
            evaluate(&proof_campaign(), &context, &fetcher, Utc::now()).await,
            Ok(())
        );
    }

    #[tokio::test]
    async fn missing_phrase_rejection_names_the_phrase() {
        let fetcher = MockThreadFetcher::returning(thread_with(&["alice"], "unrelated chatter"));

        let context = GateContext {
            secret_phrase: Some("BouncyKraken777".to_string()),
            ..verified()
        };
        let outcome = evaluate(&proof_campaign(), &context, &fetcher, Utc::now()).await;

        match outcome.unwrap_err() {
            Error::EngagementProofFailed { reason } => {
                assert!(reason.contains("BouncyKraken777"))
            }
            other => panic!("expected EngagementProofFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn proof_campaign_requires_some_proof() {
        let fetcher = MockThreadFetcher::returning(thread_with(&["alice"], "hello"));

        let outcome = evaluate(&proof_campaign(), &verified(), &fetcher, Utc::now()).await;

        assert!(matches!(
            outcome.unwrap_err(),
            Error::EngagementProofFailed { .. }
        ));
    }

    #[tokio::test]
    async fn fetch_failure_degrades_to_a_rejection() {
        let fetcher = MockThreadFetcher {
            on_fetch_thread: Box::new(|url| {
                Err(Error::EngagementProofFailed {
                    reason: format!("could not fetch the verification thread at {}", url),
                })
            }),
        };

        let context = GateContext {
            secret_phrase: Some("whatever".to_string()),
            ..verified()
        };
        let outcome = evaluate(&proof_campaign(), &context, &fetcher, Utc::now()).await;

        assert!(matches!(
            outcome.unwrap_err(),
            Error::EngagementProofFailed { .. }
        ));
    }

    #[tokio::test]
    async fn gate_skips_the_fetch_when_no_proof_is_required() {
        // MockThreadFetcher::new() panics on any fetch, so reaching Ok
        // proves no thread was fetched.
        let fetcher = MockThreadFetcher::new();
        let context = GateContext {
            external_handle: Some("alice".to_string()),
            ..verified()
        };

        let outcome = evaluate(&open_campaign(), &context, &fetcher, Utc::now()).await;

        assert_eq!(outcome, Ok(()));
    }
}
