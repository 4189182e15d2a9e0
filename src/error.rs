use std::fmt::{Debug, Display};
use std::io::Error as IoError;

use actix_web::error::{JsonPayloadError, PathError};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::{DateTime, Utc};
use derivative::Derivative;
use mongodb::bson::ser::Error as BsonError;
use mongodb::error::Error as DatabaseError;
use reqwest::Error as HttpClientError;
use serde::{Serialize, Serializer};

use crate::ident::CampaignId;

#[derive(Debug, Serialize, Derivative)]
#[derivative(PartialEq, Eq)]
#[serde(untagged)]
pub enum Error {
    // 400
    #[serde(serialize_with = "display")]
    InvalidJson(#[derivative(PartialEq = "ignore")] JsonPayloadError),
    #[serde(serialize_with = "display")]
    InvalidPath(#[derivative(PartialEq = "ignore")] PathError),
    NoCodesProvided,
    TooManyCodes {
        count: usize,
        maximum: usize,
    },
    InvalidProofSourceUrl {
        url: String,
    },
    HumanVerificationFailed,
    EngagementProofFailed {
        reason: String,
    },

    // 404
    PathDoesNotExist,
    CampaignNotFound {
        campaign_id: CampaignId,
    },
    ManagementLinkNotFound,

    // 410
    CampaignExpired {
        campaign_id: CampaignId,
        expires_at: DateTime<Utc>,
    },
    CodesExhausted {
        campaign_id: CampaignId,
    },

    // 429
    RateLimited,

    // 500
    #[serde(serialize_with = "display")]
    FailedDatabaseCall(#[derivative(PartialEq = "ignore")] DatabaseError),
    #[serde(serialize_with = "display")]
    FailedToSerializeToBson(#[derivative(PartialEq = "ignore")] BsonError),
    #[serde(serialize_with = "display")]
    FailedVerificationCall(#[derivative(PartialEq = "ignore")] HttpClientError),
    #[serde(serialize_with = "display")]
    IoError(#[derivative(PartialEq = "ignore")] IoError),
}

impl Error {
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidJson(_) => "E4001000",
            Error::InvalidPath(_) => "E4001001",
            Error::NoCodesProvided => "E4001002",
            Error::TooManyCodes { .. } => "E4001003",
            Error::InvalidProofSourceUrl { .. } => "E4001004",
            Error::HumanVerificationFailed => "E4001005",
            Error::EngagementProofFailed { .. } => "E4001006",
            Error::PathDoesNotExist => "E4041000",
            Error::CampaignNotFound { .. } => "E4041001",
            Error::ManagementLinkNotFound => "E4041002",
            Error::CampaignExpired { .. } => "E4101000",
            Error::CodesExhausted { .. } => "E4101001",
            Error::RateLimited => "E4291000",
            Error::FailedDatabaseCall(_) => "E5001000",
            Error::FailedToSerializeToBson(_) => "E5001001",
            Error::FailedVerificationCall(_) => "E5001002",
            Error::IoError(_) => "E5001003",
        }
    }

    pub fn error_message(&self) -> &'static str {
        match self {
            Error::InvalidJson(_) => "The given json could not be parsed",
            Error::InvalidPath(_) => "The given path could not be parsed",
            Error::NoCodesProvided => "No valid promo codes were provided",
            Error::TooManyCodes { .. } => "Too many promo codes were provided",
            Error::InvalidProofSourceUrl { .. } => {
                "The verification source must be a public discussion-thread url"
            }
            Error::HumanVerificationFailed => "Human verification failed",
            Error::EngagementProofFailed { .. } => {
                "The requested engagement proof could not be confirmed"
            }
            Error::PathDoesNotExist => "The requested path does not exist",
            Error::CampaignNotFound { .. } => "The requested campaign was not found",
            Error::ManagementLinkNotFound => {
                "The management link does not match a known campaign"
            }
            Error::CampaignExpired { .. } => "The requested campaign has expired",
            Error::CodesExhausted { .. } => "All promo codes have been claimed",
            Error::RateLimited => "Too many requests, try again shortly",
            Error::FailedDatabaseCall(_) => {
                "An error occurred when communicating with the database"
            }
            Error::FailedToSerializeToBson(_) => {
                "An error occurred when serializing an object to bson"
            }
            Error::FailedVerificationCall(_) => {
                "An error occurred when calling the verification service"
            }
            Error::IoError(_) => "An error occurred during an I/O operation",
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Error::InvalidPath(_) => StatusCode::BAD_REQUEST,
            Error::NoCodesProvided => StatusCode::BAD_REQUEST,
            Error::TooManyCodes { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidProofSourceUrl { .. } => StatusCode::BAD_REQUEST,
            Error::HumanVerificationFailed => StatusCode::BAD_REQUEST,
            Error::EngagementProofFailed { .. } => StatusCode::BAD_REQUEST,
            Error::PathDoesNotExist => StatusCode::NOT_FOUND,
            Error::CampaignNotFound { .. } => StatusCode::NOT_FOUND,
            Error::ManagementLinkNotFound => StatusCode::NOT_FOUND,
            Error::CampaignExpired { .. } => StatusCode::GONE,
            Error::CodesExhausted { .. } => StatusCode::GONE,
            Error::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Error::FailedDatabaseCall(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedToSerializeToBson(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedVerificationCall(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        #[derive(Serialize)]
        struct Envelope<'a> {
            error_code: &'static str,
            error_message: &'static str,
            error_meta: &'a Error,
        }

        if self.status_code().is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        HttpResponse::build(self.status_code()).json(&Envelope {
            error_code: self.error_code(),
            error_message: self.error_message(),
            error_meta: self,
        })
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        Debug::fmt(self, f)
    }
}

impl From<DatabaseError> for Error {
    fn from(error: DatabaseError) -> Error {
        Error::FailedDatabaseCall(error)
    }
}

impl From<BsonError> for Error {
    fn from(error: BsonError) -> Error {
        Error::FailedToSerializeToBson(error)
    }
}

impl From<IoError> for Error {
    fn from(error: IoError) -> Error {
        Error::IoError(error)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidJson(err) => Some(err),
            Error::InvalidPath(err) => Some(err),
            Error::FailedDatabaseCall(err) => Some(err),
            Error::FailedToSerializeToBson(err) => Some(err),
            Error::FailedVerificationCall(err) => Some(err),
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

fn display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Display,
    S: Serializer,
{
    serializer.collect_str(value)
}
