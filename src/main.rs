use clap::{Parser, Subcommand};
use comfy_table::{modifiers, presets, ContentArrangement, Table};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use terminal_size::{terminal_size, Width};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use yansi::Paint;

use stratus::api::{client::set_silent, HttpBackend, ProvisioningBackend, SimulatedBackend};
use stratus::config;
use stratus::models::AppState;
use stratus::routes::build_router;
use stratus::schemas::SchemaRegistry;
use stratus::services::{InMemoryResourceRepository, ResourceRepository};
use stratus::utils::parse_assignment;
use stratus::wizard::{format_money, FieldValidator, Step, WizardStateMachine};

fn fail(msg: impl Display) -> ! {
    eprintln!("{}", Paint::new(msg.to_string()).red());
    process::exit(1);
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    if let Some((Width(w), _)) = terminal_size() {
        table.set_width(w.saturating_sub(4));
    }
    table
}

fn load_registry() -> SchemaRegistry {
    SchemaRegistry::builtin().unwrap_or_else(|e| fail(format!("Invalid built-in flow: {}", e)))
}

fn build_state_from_env(env_file: Option<&str>) -> AppState {
    config::load_env_file(env_file);
    let repository: Arc<dyn ResourceRepository> = Arc::new(InMemoryResourceRepository::new());
    let api_base_url = config::get_api_base_url();

    let backend: Arc<dyn ProvisioningBackend> = if api_base_url.is_empty() {
        let latency = config::get_mock_latency().unwrap_or_else(|e| fail(e));
        let fail_every = config::get_mock_fail_every().unwrap_or_else(|e| fail(e));
        Arc::new(SimulatedBackend::new(repository.clone(), latency, fail_every))
    } else {
        let client = reqwest::Client::builder()
            .user_agent(format!("Stratus/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| fail(format!("Failed to create HTTP client: {}", e)));
        Arc::new(HttpBackend::new(client, api_base_url, config::get_api_token()))
    };
    tracing::info!(backend = backend.name(), "Provisioning backend selected");

    AppState::new(load_registry(), backend, repository)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}

async fn start_server(state: AppState, host: &str, port: u16) {
    let app = build_router(state);
    let addr: SocketAddr = match format!("{}:{}", host, port).parse() {
        Ok(a) => a,
        Err(e) => fail(format!("Invalid host/port format: {}", e)),
    };
    println!(
        "{} {}",
        Paint::new("Wizard API running on").green(),
        Paint::new(format!("http://{}", addr)).cyan()
    );
    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
                fail(format!("Server error: {}", e));
            }
        }
        Err(e) => {
            eprintln!(
                "{}: {}\n{}",
                Paint::new(format!("Failed to bind to {}", addr)).red(),
                e,
                Paint::new("Stop the process using this port, or pass a different --port.").yellow()
            );
            process::exit(1);
        }
    }
}

fn print_flows(registry: &SchemaRegistry) {
    let mut table = new_table();
    table.set_header(vec!["Flow", "Title", "Configuration", "Resources & add-ons", "Lists"]);
    for schema in registry.iter() {
        let names = |step: Step| {
            schema
                .fields_for_step(step)
                .map(|f| if f.required { format!("{}*", f.name) } else { f.name.clone() })
                .collect::<Vec<_>>()
                .join(", ")
        };
        let lists = schema
            .lists
            .iter()
            .map(|l| l.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            schema.flow.clone(),
            schema.title.clone(),
            names(Step::Configuration),
            names(Step::ResourcesAndAddons),
            lists,
        ]);
    }
    println!("\n{table}\n");
    println!("{}", Paint::new("* required").dim());
}

/// `list:field=value,field=value`
fn parse_item_arg(raw: &str) -> Option<(String, Vec<(String, String)>)> {
    let (list, rest) = raw.split_once(':')?;
    let values = rest
        .split(',')
        .filter(|p| !p.trim().is_empty())
        .map(parse_assignment)
        .collect::<Option<Vec<_>>>()?;
    Some((list.trim().to_string(), values))
}

fn run_estimate(registry: &SchemaRegistry, flow: &str, sets: &[String], items: &[String]) {
    let schema = registry
        .get(flow)
        .unwrap_or_else(|| fail(format!("Unknown flow '{}'; try `stratus flows`", flow)));
    let mut machine = WizardStateMachine::with_id(schema, "cli");

    let mut values = BTreeMap::new();
    for raw in sets {
        let (k, v) = parse_assignment(raw).unwrap_or_else(|| fail(format!("Expected field=value, got '{}'", raw)));
        values.insert(k, v);
    }
    match machine.prefill(&values) {
        Ok(unknown) if !unknown.is_empty() => fail(format!("Unknown field(s): {}", unknown.join(", "))),
        Ok(_) => {}
        Err(e) => fail(e),
    }

    // The first --item for a list fills its default entry when it has one.
    let mut touched: Vec<String> = Vec::new();
    for raw in items {
        let (list, pairs) =
            parse_item_arg(raw).unwrap_or_else(|| fail(format!("Expected list:field=value,..., got '{}'", raw)));
        let existing = machine
            .draft()
            .list(&list)
            .and_then(|l| l.items().first())
            .map(|i| i.id);
        let id = match existing {
            Some(id) if !touched.contains(&list) => id,
            _ => machine.add_item(&list).unwrap_or_else(|e| fail(e)),
        };
        touched.push(list.clone());
        for (field, value) in pairs {
            if let Err(e) = machine.update_item_field(&list, id, &field, &value) {
                fail(e);
            }
        }
    }

    let errors = FieldValidator::new(machine.schema()).validate_all(machine.draft());
    if !errors.is_empty() {
        let mut table = new_table();
        table.set_header(vec!["Field", "Problem"]);
        for (field, message) in errors.iter() {
            table.add_row(vec![field.as_str(), message.as_str()]);
        }
        println!("{}", Paint::new("The draft is not valid yet:").yellow());
        println!("\n{table}\n");
    }

    let cost = machine.cost();
    let mut table = new_table();
    table.set_header(vec!["Component", "Hourly", "Monthly"]);
    for line in &cost.lines {
        table.add_row(vec![
            line.component.clone(),
            format_money(line.hourly),
            format_money(line.monthly),
        ]);
    }
    table.add_row(vec![
        "Total".to_string(),
        format_money(cost.total.hourly),
        format_money(cost.total.monthly),
    ]);
    println!("\n{table}\n");
}

fn check_config(env_file: Option<&str>) {
    config::load_env_file(env_file);
    let mut ok = true;
    let mut table = new_table();
    table.set_header(vec!["Setting", "Value"]);

    let base_url = config::get_api_base_url();
    let token = config::get_api_token();
    table.add_row(vec![
        "Backend".to_string(),
        if base_url.is_empty() { "simulated".into() } else { format!("http ({})", base_url) },
    ]);
    table.add_row(vec![
        "API_TOKEN".to_string(),
        if token.is_empty() { "(not set)".into() } else { "***".into() },
    ]);
    match config::get_mock_latency() {
        Ok(d) => table.add_row(vec!["MOCK_LATENCY_MS".to_string(), d.as_millis().to_string()]),
        Err(e) => {
            ok = false;
            table.add_row(vec!["MOCK_LATENCY_MS".to_string(), e.to_string()])
        }
    };
    match config::get_mock_fail_every() {
        Ok(n) => table.add_row(vec!["MOCK_FAIL_EVERY".to_string(), n.to_string()]),
        Err(e) => {
            ok = false;
            table.add_row(vec!["MOCK_FAIL_EVERY".to_string(), e.to_string()])
        }
    };
    match config::get_port() {
        Ok(p) => table.add_row(vec!["Listen".to_string(), format!("{}:{}", config::get_host(), p)]),
        Err(e) => {
            ok = false;
            table.add_row(vec!["PORT".to_string(), e.to_string()])
        }
    };
    if !base_url.is_empty() && token.is_empty() {
        ok = false;
        eprintln!("{}", Paint::new("API_BASE_URL is set but API_TOKEN is not").red());
    }
    println!("\n{table}\n");

    if ok {
        println!("{}", Paint::new("Configuration looks valid").green());
    } else {
        fail("Configuration appears invalid");
    }
}

#[derive(Parser)]
#[command(
    name = "stratus",
    author,
    version,
    about = "Resource creation wizards for the cloud console",
    long_about = r#"Stratus serves the console's multi-step creation wizards (Kubernetes clusters, load balancers, volumes) as a JSON API and can estimate prices from the command line.

Examples:
  stratus serve --port 8080
  stratus flows
  stratus estimate volumes --set region=eu-west-1 --set zone=eu-west-1a --set size_gb=100
  stratus estimate kubernetes --set region=us-east-1 --item node_pools:name=web,desired_count=3
"#,
    after_help = "Use `stratus <subcommand> --help` for subcommand options."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Disable colorized output
    #[arg(long, global = true)]
    no_color: bool,
    /// Disable provisioning API request/response logging
    #[arg(long, global = true)]
    silent: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the wizard API server
    Serve {
        /// Bind address (defaults to HOST or 127.0.0.1)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (defaults to PORT or 8080)
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        env_file: Option<String>,
    },
    #[command(about = "Validate configuration and show which backend would be used.")]
    CheckConfig {
        #[arg(long)]
        env_file: Option<String>,
    },
    #[command(about = "List the available creation flows and their fields.")]
    Flows,
    #[command(
        about = "Estimate the price of a configuration.",
        long_about = "Build a draft from `--set field=value` and `--item list:field=value,...` arguments, report validation problems and print the hourly and monthly cost breakdown."
    )]
    Estimate {
        flow: String,
        #[arg(long = "set")]
        sets: Vec<String>,
        #[arg(long = "item")]
        items: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.no_color {
        yansi::whenever(yansi::Condition::NEVER);
    }
    if cli.silent {
        set_silent(true);
    }

    match cli.command {
        None => {
            let state = build_state_from_env(None);
            let port = config::get_port().unwrap_or_else(|e| fail(e));
            start_server(state, &config::get_host(), port).await;
        }
        Some(Commands::Serve { host, port, env_file }) => {
            let state = build_state_from_env(env_file.as_deref());
            let host = host.unwrap_or_else(config::get_host);
            let port = match port {
                Some(p) => p,
                None => config::get_port().unwrap_or_else(|e| fail(e)),
            };
            start_server(state, &host, port).await;
        }
        Some(Commands::CheckConfig { env_file }) => check_config(env_file.as_deref()),
        Some(Commands::Flows) => print_flows(&load_registry()),
        Some(Commands::Estimate { flow, sets, items }) => run_estimate(&load_registry(), &flow, &sets, &items),
    }
}
