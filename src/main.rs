//! LPT Défis - anonymous participation reconciliation CLI

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

use lpt_defis::{
    anonymous::{AnonymousStore, FileAnonymousStore, InMemoryAnonymousStore},
    config::{parse_payload, Args, Command},
    db::{redact_uri, MongoClient},
    logging::{self, AuditLogger},
    migration::{MigrationCoordinator, MigrationDetector, ReconciliationEngine},
    notify::{Notifier, TracingNotifier},
    persistence::{
        InMemoryParticipationRepository, MongoParticipationRepository, ParticipationRepository,
    },
    session::{JwtSessionProvider, SessionProvider, StaticSessionProvider},
    types::AnonymousParticipation,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    logging::init_tracing(&args.log_level);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let store: Arc<dyn AnonymousStore> =
        Arc::new(FileAnonymousStore::new(args.store_path.clone()));

    match &args.command {
        Command::Status => status(store.as_ref()).await,
        Command::Record {
            challenge_id,
            payload,
        } => {
            let participation =
                AnonymousParticipation::new(challenge_id.clone(), parse_payload(payload));
            let local_id = participation.local_id.clone();
            store.record(participation).await?;
            info!(
                local_id = %local_id,
                challenge_id = %challenge_id,
                "Anonymous participation recorded"
            );
            Ok(())
        }
        Command::Clear => {
            store.clear().await?;
            info!(path = %args.store_path.display(), "Anonymous participations cleared");
            Ok(())
        }
        Command::Migrate => migrate(&args, store).await,
    }
}

async fn status(store: &dyn AnonymousStore) -> anyhow::Result<()> {
    let pending = match store.list_pending().await {
        Ok(pending) => pending,
        Err(e) => {
            warn!(error = %e, "Anonymous store unreadable, treating as empty");
            Vec::new()
        }
    };

    println!("{} pending anonymous participation(s)", pending.len());
    for p in &pending {
        println!(
            "  {}  challenge={}  submitted_at={}",
            p.local_id,
            p.challenge_id,
            p.submitted_at.to_rfc3339()
        );
    }
    Ok(())
}

async fn migrate(args: &Args, store: Arc<dyn AnonymousStore>) -> anyhow::Result<()> {
    info!("======================================");
    info!("  LPT Défis - participation migration");
    info!("======================================");
    info!("Store: {}", args.store_path.display());
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });

    let (repository, store): (Arc<dyn ParticipationRepository>, Arc<dyn AnonymousStore>) =
        if args.dev_mode {
            // Migrated records only live in memory, so the file keeps them
            info!("Persistence: in-memory (dev mode), local store left untouched");
            let snapshot = match InMemoryAnonymousStore::snapshot_of(store.as_ref()).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(error = %e, "Anonymous store unreadable, treating as empty");
                    InMemoryAnonymousStore::new()
                }
            };
            (
                Arc::new(InMemoryParticipationRepository::new()),
                Arc::new(snapshot),
            )
        } else {
            info!("MongoDB: {}", redact_uri(&args.mongodb_uri));
            let mongo = MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await?;
            info!("Persistence: MongoDB database '{}'", mongo.db_name());
            (Arc::new(MongoParticipationRepository::new(&mongo).await?), store)
        };

    let session: Arc<dyn SessionProvider> = match (&args.user_id, &args.jwt_secret) {
        (Some(user_id), _) if args.dev_mode => {
            Arc::new(StaticSessionProvider::authenticated(user_id.clone()))
        }
        (_, Some(secret)) => {
            Arc::new(JwtSessionProvider::new(secret.clone(), args.token.clone())?)
        }
        (_, None) => Arc::new(JwtSessionProvider::new_dev(args.token.clone())),
    };

    let audit = match &args.audit_log {
        Some(path) => AuditLogger::open(path.clone())?,
        None => AuditLogger::disabled(),
    };

    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let detector = MigrationDetector::new(Arc::clone(&store), Arc::clone(&notifier));
    let engine = ReconciliationEngine::new(args.engine_config(), repository).with_audit(audit);
    let coordinator = MigrationCoordinator::from_parts(session, store, notifier, detector, engine);

    coordinator.start_session();
    match coordinator.run_on_session_start().await {
        Some(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        None => {
            info!("Nothing to migrate");
        }
    }

    Ok(())
}
