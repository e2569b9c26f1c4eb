use std::collections::HashMap;
use std::io::Write as _;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::info;

use rollcall_api::{ConfirmGate, DataService, InMemoryService, Notifier};
use rollcall_core::{ActionKind, Record, SortOrder, DEFAULT_PAGE_LIMIT};
use rollcall_query::{SearchDebouncer, DEFAULT_DEBOUNCE};
use rollcall_store::QueryCache;
use rollcall_view::CollectionController;

#[derive(Parser, Debug)]
#[command(name = "rollcallctl", version, about = "Rollcall admin console harness")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Seed data file (JSON map of scope -> records); built-in sample when omitted
    #[arg(long = "seed", global = true)]
    seed: Option<PathBuf>,

    /// Answer yes to every confirmation prompt
    #[arg(long = "yes", global = true, action = ArgAction::SetTrue)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output {
    Human,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List one page of a collection
    Ls {
        /// Collection scope, e.g. "applications"
        scope: String,
        #[arg(long = "page", default_value_t = 1)]
        page: u32,
        #[arg(long = "limit", default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: u32,
        /// Free-text search (applied as an already settled value)
        #[arg(long = "search")]
        search: Option<String>,
        /// Status filter ("all" clears it)
        #[arg(long = "status")]
        status: Option<String>,
        /// Sort field
        #[arg(long = "sort")]
        sort: Option<String>,
        /// Sort descending instead of ascending
        #[arg(long = "desc", action = ArgAction::SetTrue)]
        desc: bool,
    },
    /// Aggregate counts for a collection
    Stats {
        scope: String,
    },
    /// Apply an action to one record (approve|reject|delete|mark-seen|resolve)
    Act {
        scope: String,
        id: String,
        action: String,
    },
    /// Apply an action to many records
    Bulk {
        scope: String,
        action: String,
        /// Record ids to select before running the action
        ids: Vec<String>,
    },
    /// Export the filtered collection as one large page
    Export {
        scope: String,
        #[arg(long = "search")]
        search: Option<String>,
        #[arg(long = "status")]
        status: Option<String>,
    },
    /// Type a search query keystroke by keystroke through the debouncer
    Search {
        scope: String,
        query: String,
    },
}

fn init_tracing() {
    let env = std::env::var("ROLLCALL_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("ROLLCALL_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid ROLLCALL_METRICS_ADDR; expected host:port");
        }
    }
}

fn parse_action(s: &str) -> Result<ActionKind> {
    Ok(match s {
        "approve" => ActionKind::Approve,
        "reject" => ActionKind::Reject,
        "delete" => ActionKind::Delete,
        "mark-seen" => ActionKind::MarkSeen,
        "resolve" => ActionKind::Resolve,
        other => bail!("unknown action: {other} (expected approve|reject|delete|mark-seen|resolve)"),
    })
}

/// Toast sink for a terminal: success to stdout, errors to stderr.
struct TermNotifier;

impl Notifier for TermNotifier {
    fn success(&self, message: &str) {
        println!("ok: {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("error: {}", message);
    }
}

/// Interactive y/N prompt; `--yes` swaps in `AutoConfirm` instead.
struct StdinConfirm;

impl ConfirmGate for StdinConfirm {
    fn confirm(&self, message: &str) -> bool {
        eprint!("{} [y/N] ", message);
        let _ = std::io::stderr().flush();
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_err() {
            return false;
        }
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

fn load_service(seed: Option<&PathBuf>) -> Result<Arc<InMemoryService>> {
    let svc = InMemoryService::new();
    match seed {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading seed file {}", path.display()))?;
            let scopes: HashMap<String, Vec<Record>> =
                serde_json::from_str(&raw).context("parsing seed file")?;
            for (scope, records) in scopes {
                info!(scope = %scope, count = records.len(), "seeded from file");
                svc.seed(&scope, records);
            }
        }
        None => {
            for (scope, records) in sample_data() {
                svc.seed(&scope, records);
            }
        }
    }
    Ok(Arc::new(svc))
}

fn sample_data() -> Vec<(&'static str, Vec<Record>)> {
    let statuses = ["pending", "approved", "rejected"];
    let applications = (1..=23)
        .map(|n| {
            let mut r = Record::with_status(format!("app-{:02}", n), statuses[n % 3]);
            r.fields = serde_json::json!({ "name": format!("applicant {}", n) });
            r
        })
        .collect();
    let contacts = (1..=9)
        .map(|n| {
            let mut r = Record::with_status(format!("contact-{:02}", n), if n % 2 == 0 { "seen" } else { "new" });
            r.fields = serde_json::json!({ "subject": format!("enquiry {}", n) });
            r
        })
        .collect();
    let members = (1..=14)
        .map(|n| {
            let mut r = Record::with_status(format!("member-{:02}", n), "active");
            r.fields = serde_json::json!({ "name": format!("member {}", n) });
            r
        })
        .collect();
    vec![
        ("applications", applications),
        ("contacts", contacts),
        ("members", members),
    ]
}

fn controller(
    scope: &str,
    service: Arc<InMemoryService>,
    yes: bool,
    limit: u32,
) -> CollectionController {
    let gate: Arc<dyn ConfirmGate> = if yes {
        Arc::new(rollcall_api::AutoConfirm(true))
    } else {
        Arc::new(StdinConfirm)
    };
    CollectionController::new(
        scope,
        service as Arc<dyn DataService>,
        Arc::new(QueryCache::new()),
        Arc::new(TermNotifier),
        gate,
        limit,
    )
}

fn print_rows(ctl: &CollectionController, output: Output) -> Result<()> {
    match output {
        Output::Human => {
            for r in ctl.rows() {
                let status = r.status.as_deref().unwrap_or("-");
                println!("{} • {} • {}", r.id, status, r.fields);
            }
            println!(
                "page {}/{} • {} total",
                ctl.page(),
                ctl.total_pages(),
                ctl.total_count()
            );
        }
        Output::Json => println!("{}", serde_json::to_string_pretty(ctl.rows())?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();
    let service = load_service(cli.seed.as_ref())?;

    match cli.command {
        Commands::Ls { scope, page, limit, search, status, sort, desc } => {
            let mut ctl = controller(&scope, service, cli.yes, limit);
            ctl.mount();
            if let Some(s) = &search {
                ctl.on_search_settled(s);
            }
            if let Some(s) = &status {
                ctl.on_status_filter(s);
            }
            if let Some(field) = &sort {
                let order = if desc { SortOrder::Desc } else { SortOrder::Asc };
                ctl.on_sort(field, order);
            }
            ctl.on_page(page);
            ctl.settle().await;
            if let Some(e) = ctl.last_error() {
                bail!("load failed: {e}");
            }
            print_rows(&ctl, cli.output)?;
        }
        Commands::Stats { scope } => {
            let ctl = controller(&scope, service, cli.yes, DEFAULT_PAGE_LIMIT);
            let stats = ctl.stats().await.map_err(|e| anyhow::anyhow!(e))?;
            match cli.output {
                Output::Human => {
                    println!("total: {}", stats.total);
                    for (status, count) in &stats.by_status {
                        println!("  {}: {}", status, count);
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&*stats)?),
            }
        }
        Commands::Act { scope, id, action } => {
            let action = parse_action(&action)?;
            let mut ctl = controller(&scope, service, cli.yes, DEFAULT_PAGE_LIMIT);
            ctl.mount();
            ctl.settle().await;
            let done = ctl
                .single_action(&id, action)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            if !done {
                println!("aborted");
            }
            ctl.settle().await;
        }
        Commands::Bulk { scope, action, ids } => {
            let action = parse_action(&action)?;
            let mut ctl = controller(&scope, service, cli.yes, DEFAULT_PAGE_LIMIT);
            ctl.mount();
            ctl.settle().await;
            for id in &ids {
                ctl.toggle(id, true);
            }
            match ctl.bulk_action(action).await {
                Ok(Some(outcome)) => {
                    info!(
                        attempted = outcome.attempted.len(),
                        succeeded = outcome.succeeded.len(),
                        failed = outcome.failed.len(),
                        "bulk finished"
                    );
                    if cli.output == Output::Json {
                        println!(
                            "{}",
                            serde_json::json!({
                                "action": outcome.action.as_str(),
                                "attempted": outcome.attempted,
                                "succeeded": outcome.succeeded,
                                "failed": outcome.failed.iter().map(|(id, e)| {
                                    serde_json::json!({ "id": id, "error": e.to_string() })
                                }).collect::<Vec<_>>(),
                            })
                        );
                    }
                }
                Ok(None) => println!("aborted"),
                Err(e) => bail!("bulk failed: {e}"),
            }
            ctl.settle().await;
        }
        Commands::Export { scope, search, status } => {
            let mut ctl = controller(&scope, service, cli.yes, DEFAULT_PAGE_LIMIT);
            if let Some(s) = &search {
                ctl.on_search_settled(s);
            }
            if let Some(s) = &status {
                ctl.on_status_filter(s);
            }
            // Export goes straight to the service; no mount needed.
            ctl.teardown();
            let page = ctl.export().await.map_err(|e| anyhow::anyhow!(e))?;
            match cli.output {
                Output::Human => {
                    for r in &page.items {
                        println!("{} • {}", r.id, r.status.as_deref().unwrap_or("-"));
                    }
                    println!("{} exported", page.items.len());
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&page.items)?),
            }
        }
        Commands::Search { scope, query } => {
            // Feed the query through the debouncer a keystroke at a time,
            // the way the search box does it.
            let mut ctl = controller(&scope, service, cli.yes, DEFAULT_PAGE_LIMIT);
            ctl.mount();
            ctl.settle().await;
            let (debouncer, mut settled) = SearchDebouncer::spawn(DEFAULT_DEBOUNCE);
            for i in 1..=query.chars().count() {
                let prefix: String = query.chars().take(i).collect();
                debouncer.input(prefix);
            }
            if let Some(value) = settled.recv().await {
                info!(value = %value, "search settled");
                ctl.on_search_settled(&value);
                ctl.settle().await;
            }
            print_rows(&ctl, cli.output)?;
        }
    }
    Ok(())
}
