//! Predicate Explain CLI
//!
//! Compiles a search described in a JSON document and prints the resulting
//! predicate. If the document carries index rows, the predicate is also
//! evaluated against them and the matching record ids are listed.
//!
//! # Usage
//!
//! ```bash
//! # Explain a query file
//! predicate-explain --query search.json
//!
//! # Read the document from stdin, print the predicate as JSON
//! cat search.json | predicate-explain --json
//!
//! # Tighter chain limit, no reference-set rewrite
//! PREDICATE_MAX_CHAIN_DEPTH=2 predicate-explain -q search.json --collapse-reference-sets false
//! ```
//!
//! # Query Document
//!
//! ```json
//! {
//!   "resource_type": "Observation",
//!   "resource_types": ["Patient"],
//!   "criteria": [ ... ],
//!   "rows": [ ... ]
//! }
//! ```
//!
//! `criteria` are serialized [`Criterion`] values, `rows` serialized
//! [`IndexEntry`] values. Every type named by a chain must appear in
//! `resource_types` or in the rows.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use helios_predicate::search::ResourceTypeRegistry;
use helios_predicate::tenant::StaticIdentityProvider;
use helios_predicate::types::IndexEntry;
use helios_predicate::{
    CompilerConfig, Criterion, IdentityCache, InMemoryIndexStore, IndexStore, PredicateCompiler,
    SearchContext, ServerIdentity, TenantId,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "predicate-explain", version)]
#[command(about = "Compile a FHIR search into an index predicate and explain it")]
struct Args {
    /// JSON query document; stdin when omitted
    #[arg(long, short)]
    query: Option<PathBuf>,

    /// Base URL that makes a reference local
    #[arg(long, env = "PREDICATE_BASE_URL", default_value = "http://localhost:8080/fhir")]
    base_url: String,

    /// Tenant the rows are loaded for
    #[arg(long, env = "PREDICATE_TENANT", default_value = "default")]
    tenant: String,

    /// Print the predicate as JSON instead of text
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    config: CompilerConfig,
}

#[derive(Debug, Deserialize)]
struct QueryDocument {
    resource_type: String,
    #[serde(default)]
    resource_types: Vec<String>,
    #[serde(default)]
    criteria: Vec<Criterion>,
    #[serde(default)]
    rows: Vec<IndexEntry>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,helios_predicate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    if let Err(errors) = args.config.validate() {
        for e in &errors {
            tracing::error!("Invalid configuration: {}", e);
        }
        return Err(errors.join("; ").into());
    }

    let text = match &args.query {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let document: QueryDocument = serde_json::from_str(&text)?;

    let mut resource_types = ResourceTypeRegistry::new();
    resource_types.register(document.resource_type.as_str())?;
    for name in &document.resource_types {
        resource_types.register(name.as_str())?;
    }
    for entry in &document.rows {
        resource_types.register(entry.record.resource_type.as_str())?;
    }

    let tenant = TenantId::new(args.tenant.as_str());
    let store = Arc::new(InMemoryIndexStore::new());
    let loaded = store.load_entries(&tenant, document.rows);

    let identity = ServerIdentity::parse(&args.base_url)?;
    let cache = Arc::new(IdentityCache::new(
        Arc::new(StaticIdentityProvider::new(identity)),
        args.config.identity_cache_ttl,
    ));
    let compiler = PredicateCompiler::new(store.clone(), cache, Arc::new(resource_types))
        .with_config(args.config)?;

    // Cancel on Ctrl+C
    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling compilation");
            on_signal.cancel();
        }
    });
    let ctx = SearchContext::new(tenant).with_cancellation(token);

    tracing::info!(
        resource_type = %document.resource_type,
        criteria = document.criteria.len(),
        records = loaded,
        "Explaining search"
    );
    let predicate = compiler
        .compile(&ctx, &document.resource_type, &document.criteria)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&predicate)?);
    } else {
        println!("{}", predicate);
    }

    if loaded > 0 {
        let ids = store
            .matching_ids(&ctx, &document.resource_type, &predicate)
            .await?;
        println!();
        println!("Matching {} ({}):", document.resource_type, ids.len());
        for id in ids {
            println!("  {}", id);
        }
    }

    Ok(())
}
