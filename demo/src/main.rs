//! Castellan — Demo CLI
//!
//! Two ways to poke at a booted mode stack:
//!
//! Usage:
//!   cargo run -p demo -- scenario
//!   cargo run -p demo -- dispatch get-access-token
//!   cargo run -p demo -- dispatch log '"deploy started"' '"info"'
//!   cargo run -p demo -- dispatch db-query '"SELECT title FROM pages"'

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use castellan_access::admin::{constraints_statement, permissions_statement, roles_statement};
use castellan_contracts::{
    access::{ConstraintId, ResourceId},
    agent::{Agent, AgentKind, SubjectId},
    command::{CommandBody, CommandKind},
    error::{CastellanError, CastellanResult},
};
use castellan_modes::{
    memory::{row, InMemoryDatabase, InMemoryLogSink},
    AppContext, ModeStack, StackConfig,
};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Castellan — chain-of-responsibility dispatch and resource access control.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Castellan dispatch and access-control demo",
    long_about = "Boots the four-mode command chain (Server, Application, Session, User)\n\
                  over in-memory collaborators and either walks the document access\n\
                  scenario or routes a single command built from JSON arguments."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk the document access scenario: constrain, deny, exempt, allow.
    Scenario,
    /// Build one command from JSON arguments and route it through the chain.
    Dispatch {
        /// Command kind: log, db-query, get-registry, get-agent,
        /// get-access-token, shutdown.
        kind: String,
        /// Positional arguments, each a JSON value (bare words are taken
        /// as strings).
        args: Vec<String>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialize structured logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::Scenario => run_scenario(),
        Command::Dispatch { kind, args } => run_dispatch(&kind, &args),
    };

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

// ── Stack boot ────────────────────────────────────────────────────────────────

/// Boot the canonical four-mode stack over an in-memory database and two
/// in-memory log sinks, acting on behalf of the demo user.
fn boot(database: Arc<InMemoryDatabase>) -> CastellanResult<AppContext> {
    let mut config = StackConfig::default();
    config
        .application_environment
        .insert_registry("modules", json!(["documents", "accounts"]));
    ModeStack::boot(
        config,
        database,
        Arc::new(InMemoryLogSink::new()),
        Arc::new(InMemoryLogSink::new()),
        Agent::new("user:alice", AgentKind::User, "Alice"),
    )
}

// ── Scenario ──────────────────────────────────────────────────────────────────

/// The document walkthrough: an unconstrained document is open to everyone,
/// a write constraint closes it, and an exemption reopens it for exactly
/// one subject.
fn run_scenario() -> CastellanResult<()> {
    let database = Arc::new(InMemoryDatabase::new());
    let doc = ResourceId::new("doc-42");
    let write = ConstraintId::new("write");

    // Persisted access state, as the storage layer would return it.
    database.seed(
        constraints_statement(&doc),
        vec![row(&[("constraint_id", "write"), ("authority", "admin")])],
    );
    database.seed(
        permissions_statement(&doc),
        vec![row(&[("constraint_id", "write"), ("subject_id", "user:alice")])],
    );
    database.seed(
        roles_statement(&SubjectId::from("user:alice")),
        vec![row(&[("role", "member")]), row(&[("role", "editor")])],
    );

    let ctx = boot(database.clone())?;
    let admin = ctx.administrator();

    println!("Document access walkthrough for {}", doc);
    println!();

    // A resource nobody constrained is open to everyone.
    let memo = ResourceId::new("memo-7");
    report_check(admin.has_permission("admin", "user:bob", &memo, &write), &memo, "user:bob");

    // The constrained document admits only the exempted subject.
    report_check(admin.has_permission("admin", "user:alice", &doc, &write), &doc, "user:alice");
    report_check(admin.has_permission("admin", "user:bob", &doc, &write), &doc, "user:bob");

    // Repeated checks are served from the access cache.
    admin.has_permission("admin", "user:carol", &doc, &write);
    println!();
    println!(
        "storage queried {} time(s) for access state (served from cache after)",
        database.query_count()
    );

    // The raising wrapper names the refusing authority.
    match admin.authorize("admin", "user:bob", &doc, &write) {
        Err(CastellanError::AccessDenied { authority, .. }) => {
            println!("authorize(user:bob) refused by authority '{}'", authority);
        }
        other => {
            println!("authorize(user:bob) unexpectedly resolved: {:?}", other);
        }
    }

    // Runtime changes take effect immediately: exempt bob in the cache.
    admin.set_permission("admin", &write, &doc, "user:bob");
    report_check(admin.has_permission("admin", "user:bob", &doc, &write), &doc, "user:bob");

    // Role resolution: alice's stored roles, bob's anonymous fallback.
    println!();
    let alice = Agent::new("user:alice", AgentKind::User, "Alice");
    let bob = Agent::new("user:bob", AgentKind::User, "Bob");
    println!("roles(user:alice) = {:?}", admin.agent_roles(&alice));
    println!("roles(user:bob)   = {:?}", admin.agent_roles(&bob));

    println!();
    println!("Scenario completed.");
    Ok(())
}

fn report_check(allowed: bool, resource: &ResourceId, subject: &str) {
    let verdict = if allowed { "ALLOWED" } else { "DENIED" };
    println!("  write {} for {:<12} {}", resource, subject, verdict);
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

/// Parse `kind` and `args` into a command and route it through a freshly
/// booted stack as the demo user.
fn run_dispatch(kind: &str, args: &[String]) -> CastellanResult<()> {
    let kind: CommandKind = kind
        .parse()
        .map_err(|reason: String| CastellanError::Config { reason })?;
    let args: Vec<Value> = args.iter().map(|raw| parse_arg(raw)).collect();
    let body = CommandBody::from_args(kind, &args)?;

    let database = Arc::new(InMemoryDatabase::new());
    database.seed(
        "SELECT title FROM pages",
        vec![row(&[("title", "Home")]), row(&[("title", "About")])],
    );

    let ctx = boot(database)?;
    println!("dispatching {} as user:alice", kind);
    let result = ctx.dispatch("user:alice", body)?;

    println!();
    println!("success: {}", result.success);
    println!("value:   {}", serde_json::to_string_pretty(&result.value).unwrap_or_default());
    Ok(())
}

/// A bare word on the command line is a string; anything that parses as
/// JSON is taken verbatim.
fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("Castellan — Command Chain + Access Control");
    println!("==========================================");
    println!();
    println!("Mode stack, bottom to top:");
    println!("  Server ── Application ── Session ── User");
    println!();
    println!("Forward commands (db-query, get-registry, get-agent, get-access-token)");
    println!("enter at the Server; reverse commands (log, shutdown) enter at the User.");
    println!();
}
