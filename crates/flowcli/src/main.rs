// crates/flowcli/src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flowcore::{
    CompositeDefinition, ExecutionEvent, ExecutionSettings, Node, NodeCatalog, NodeEvent, NodeSpec,
    Value,
};
use flowruntime::{build_composite, DependencyGraph, FlowRuntime, NodeRegistry, RuntimeConfig};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flow")]
#[command(about = "Composite node engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a composite definition file
    Run {
        /// Path to definition JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Input data as JSON object keyed by exposed port id
        #[arg(short, long)]
        input: Option<String>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Run independent children concurrently
        #[arg(long)]
        parallel: bool,

        /// Upper bound on children in flight when running in parallel
        #[arg(long)]
        max_concurrency: Option<usize>,
    },

    /// Validate a composite definition file
    Validate {
        /// Path to definition JSON file
        file: PathBuf,
    },

    /// List available node types
    Nodes {
        /// Only show types matching this term (name, type, category or tag)
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Create a new example definition
    Init {
        /// Output file path
        #[arg(short, long, default_value = "composite.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            input,
            verbose,
            parallel,
            max_concurrency,
        } => {
            init_logging(verbose);
            run_definition(file, input, parallel, max_concurrency).await?;
        }

        Commands::Validate { file } => {
            init_logging(false);
            validate_definition(file)?;
        }

        Commands::Nodes { search } => {
            list_nodes(search.as_deref());
        }

        Commands::Init { output } => {
            create_example_definition(output)?;
        }
    }

    Ok(())
}

/// RUST_LOG wins when set; otherwise `--verbose` picks DEBUG over INFO.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn standard_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    flownodes::register_all(&mut registry);
    registry
}

fn load_definition(file: &Path) -> Result<CompositeDefinition> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let definition = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse {}", file.display()))?;
    Ok(definition)
}

fn parse_inputs(input: Option<String>) -> Result<HashMap<String, Value>> {
    let Some(input_str) = input else {
        return Ok(HashMap::new());
    };

    let json: serde_json::Value = serde_json::from_str(&input_str)?;
    match json {
        serde_json::Value::Object(obj) => Ok(obj
            .into_iter()
            .map(|(k, v)| (k, Value::from_json(v)))
            .collect()),
        _ => Err(anyhow::anyhow!("Input must be a JSON object")),
    }
}

async fn run_definition(
    file: PathBuf,
    input: Option<String>,
    parallel: bool,
    max_concurrency: Option<usize>,
) -> Result<()> {
    println!("🚀 Loading composite from: {}", file.display());

    let mut definition = load_definition(&file)?;

    if parallel || max_concurrency.is_some() {
        let mut settings = definition.settings.clone().unwrap_or_default();
        settings.parallel = settings.parallel || parallel;
        if let Some(max) = max_concurrency {
            settings.max_concurrency = max;
        }
        definition.settings = Some(settings);
    }
    let settings = definition.settings.clone().unwrap_or_default();

    println!("📋 Composite: {}", definition.name);
    println!("   Nodes: {}", definition.nodes.len());
    println!("   Edges: {}", definition.edges.len());
    if settings.parallel {
        println!("   Mode: parallel (max {})", settings.effective_concurrency());
    } else {
        println!("   Mode: sequential");
    }
    println!();

    let inputs = parse_inputs(input)?;
    tracing::debug!(
        composite = %definition.id,
        inputs = inputs.len(),
        "Starting composite run"
    );

    let runtime = FlowRuntime::with_registry(Arc::new(standard_registry()), RuntimeConfig::default());

    // Subscribe to events for real-time output
    let mut events = runtime.subscribe_events();

    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            print_event(event);
        }
    });

    let result = runtime.execute(&definition, inputs).await?;

    // Wait for events to finish printing
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    event_task.abort();

    println!();
    println!("📊 Execution Summary:");
    println!(
        "   Completed: {}/{} nodes",
        result.completed_count(),
        result.node_results.len()
    );
    if result.failed_count() > 0 {
        println!("   Failed: {}", result.failed_count());
    }
    if result.skipped_count() > 0 {
        println!("   Skipped: {}", result.skipped_count());
    }
    println!("   Order: {}", result.execution_order.join(" → "));
    println!("   Time: {}ms", result.total_execution_time.as_millis());

    println!();
    println!("📤 Outputs:");
    for node_id in &result.execution_order {
        let Some(outputs) = result.result(node_id).and_then(|r| r.outputs.as_ref()) else {
            continue;
        };
        if outputs.is_empty() {
            continue;
        }
        println!("   Node {}:", node_id);
        for (key, value) in outputs {
            println!("     {}: {}", key, value.to_json());
        }
    }

    if let Some(error) = &result.error {
        anyhow::bail!("composite {} failed: {}", definition.id, error);
    }

    Ok(())
}

fn print_event(event: ExecutionEvent) {
    match event {
        ExecutionEvent::CompositeStarted {
            composite_id,
            total_nodes,
            ..
        } => {
            println!("▶️  Composite {} started ({} nodes)", composite_id, total_nodes);
        }
        ExecutionEvent::NodeStarted {
            node_id, node_type, ..
        } => {
            println!("  ⚡ Starting node: {} ({})", node_id, node_type);
        }
        ExecutionEvent::NodeCompleted {
            node_id,
            duration_ms,
            ..
        } => {
            println!("  ✅ Node {} completed in {}ms", node_id, duration_ms);
        }
        ExecutionEvent::NodeFailed { node_id, error, .. } => {
            println!("  ❌ Node {} failed: {}", node_id, error);
        }
        ExecutionEvent::NodeSkipped {
            node_id, reason, ..
        } => {
            println!("  ⏭️  Node {} skipped: {}", node_id, reason);
        }
        ExecutionEvent::NodeEvent { node_id, event, .. } => match event {
            NodeEvent::Info { message } => {
                println!("     ℹ️  [{}] {}", node_id, message);
            }
            NodeEvent::Warning { message } => {
                println!("     ⚠️  [{}] {}", node_id, message);
            }
            NodeEvent::Progress { percent, message } => {
                if let Some(msg) = message {
                    println!("     📊 [{}] {}% - {}", node_id, percent, msg);
                } else {
                    println!("     📊 [{}] {}%", node_id, percent);
                }
            }
            NodeEvent::Data { .. } => {}
        },
        ExecutionEvent::CompositeCompleted {
            composite_id,
            success,
            duration_ms,
            ..
        } => {
            if success {
                println!(
                    "✨ Composite {} completed successfully in {}ms",
                    composite_id, duration_ms
                );
            } else {
                println!("💥 Composite {} failed after {}ms", composite_id, duration_ms);
            }
        }
    }
}

fn validate_definition(file: PathBuf) -> Result<()> {
    println!("🔍 Validating composite: {}", file.display());

    let definition = load_definition(&file)?;
    let registry = standard_registry();

    let composite = build_composite(&definition, &registry)?;
    let report = composite.validate();
    if !report.valid {
        println!("❌ Composite is invalid:");
        for error in &report.errors {
            println!("   - {}", error);
        }
        anyhow::bail!("{} validation error(s)", report.errors.len());
    }

    let ids = composite.children().iter().map(|c| c.id().to_string());
    let order = DependencyGraph::build(ids, composite.edges())?.topological_order()?;

    println!("✅ Composite is valid:");
    println!("   Name: {}", definition.name);
    println!("   Nodes: {}", definition.nodes.len());
    println!("   Edges: {}", definition.edges.len());
    println!("   Order: {}", order.join(" → "));

    let inputs: Vec<String> = composite.input_ports().into_iter().map(|p| p.id).collect();
    if !inputs.is_empty() {
        println!("   Inputs: {}", inputs.join(", "));
    }

    Ok(())
}

fn list_nodes(search: Option<&str>) {
    println!("📦 Available Node Types:");
    println!();

    let registry = standard_registry();
    let search = search.map(str::to_lowercase);

    for node_type in registry.list_node_types() {
        let Some(node) = registry.resolve(&node_type) else {
            continue;
        };
        let metadata = node.metadata();

        if let Some(term) = &search {
            let terms = metadata.search_terms(node.name(), &node_type);
            if !terms.iter().any(|t| t.starts_with(term.as_str())) {
                continue;
            }
        }

        println!("  • {} ({})", node_type, metadata.category);
        println!("    {}", metadata.description);
    }
}

fn create_example_definition(output: PathBuf) -> Result<()> {
    let mut definition = CompositeDefinition::new("fetch-and-log", "Example HTTP Composite");
    definition.description = Some("Fetches data from an API and logs the result".to_string());
    definition.settings = Some(ExecutionSettings::sequential().with_retries(
        1,
        std::time::Duration::from_millis(250),
    ));

    let http_id = definition.add_node(
        NodeSpec::new("fetch", "http.request")
            .with_name("Fetch Data")
            .with_config("method", "GET")
            .with_position(100.0, 100.0),
    );

    let debug_id = definition.add_node(
        NodeSpec::new("log", "debug.log")
            .with_name("Log Response")
            .with_position(300.0, 100.0),
    );

    definition.connect(http_id, "body", debug_id, "message");

    let json = serde_json::to_string_pretty(&definition)?;
    std::fs::write(&output, json)?;

    println!("✨ Created example composite: {}", output.display());
    println!();
    println!("Run it with:");
    println!(
        "  flow run --file {} --input '{{\"fetch_url\": \"https://api.github.com/zen\"}}'",
        output.display()
    );

    Ok(())
}
