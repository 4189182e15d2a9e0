use actix_web::web::{self, Data, JsonConfig, PathConfig};
use actix_web::{App, HttpServer, ResponseError};
use mongodb::Client;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::fmt::format::FmtSpan;

mod campaign;
mod claim;
mod code;
mod config;
mod database;
mod error;
mod gate;
mod ident;
mod limit;
mod utils;

use config::Config;
use database::MongoDatabase;
use error::Error;
use gate::thread::RedditFetcher;
use gate::verify::RecaptchaVerifier;
use limit::MemoryRateLimiter;

#[actix_web::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_span_events(FmtSpan::NEW)
        .compact()
        .init();

    let config = Config::load();

    info!("connecting to db: {}", config.mongodb_uri);
    let db = Client::with_uri_str(&config.mongodb_uri)
        .await?
        .database(&config.database_name);
    let db = Data::new(MongoDatabase::new(db));

    let verifier = Data::new(RecaptchaVerifier::new(config.verification_secret.clone())?);
    let fetcher = Data::new(RedditFetcher::new()?);
    let limiter = Data::new(MemoryRateLimiter::new(config.claim_rate_limit));
    let bind_addr = config.bind_addr.clone();
    let config = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .app_data(JsonConfig::default().error_handler(|err, _req| {
                // format json errors with custom format
                Error::InvalidJson(err).into()
            }))
            .app_data(PathConfig::default().error_handler(|err, _req| {
                // format path errors with custom format
                Error::InvalidPath(err).into()
            }))
            .app_data(db.clone())
            .app_data(config.clone())
            .app_data(verifier.clone())
            .app_data(fetcher.clone())
            .app_data(limiter.clone())
            .wrap(TracingLogger::default())
            .service(campaign::endpoints::create_campaign)
            .service(campaign::endpoints::get_campaign_info)
            .service(campaign::endpoints::get_campaign_management)
            .service(campaign::endpoints::cleanup_campaigns)
            .service(claim::endpoints::claim_code)
            .service(claim::endpoints::admin_claim_code)
            .default_service(web::to(|| async { Error::PathDoesNotExist.error_response() }))
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
