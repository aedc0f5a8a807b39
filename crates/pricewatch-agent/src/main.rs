//! Pricewatch agent entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use pricewatch_agent::{Agent, AgentConfig, DEFAULT_CONFIG_PATH, STORE_KEYS};

#[derive(Parser)]
#[command(
    name = "pricewatch",
    about = "Watch product prices across the web and report offers under a limit",
    version
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the watch schedule (default).
    Run {
        /// Perform a single run and exit. Also enabled by RUN_ONCE=1.
        #[arg(long)]
        once: bool,
    },

    /// Load and validate the configuration, then print the products.
    CheckConfig,
}

fn run_once_from_env() -> bool {
    std::env::var("RUN_ONCE")
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn check_config(config: &AgentConfig, path: &std::path::Path) {
    println!("Valid config: {}", path.display());
    println!("  Frequency: every {} min", config.frequency().as_secs() / 60);
    println!("  Max results per search: {}", config.websearch.max_results);
    println!(
        "  Rendering: {} (max {} page(s) per run)",
        if config.rendering.enable_js { "on" } else { "off" },
        config.rendering.max_js_pages_per_run
    );
    println!("  Products: {}", config.products.len());
    for product in &config.products {
        let ctx = config.filter_context(product);
        println!(
            "    {} (<= {:.2} PLN) stores={:?} pattern={}",
            product.name,
            product.max_price_pln,
            product.stores,
            ctx.product_pattern
                .as_ref()
                .map(|re| re.as_str())
                .unwrap_or("-")
        );
    }

    let warnings = config.warnings(STORE_KEYS);
    if !warnings.is_empty() {
        println!("  Warnings:");
        for w in warnings {
            println!("    - {w}");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = AgentConfig::load(&cli.config)?;

    match cli.command.unwrap_or(Commands::Run { once: false }) {
        Commands::Run { once } => {
            let agent = Agent::from_config(config)?;
            if once || run_once_from_env() {
                agent.run_once().await?;
            } else {
                agent.run_forever().await?;
            }
        }

        Commands::CheckConfig => check_config(&config, &cli.config),
    }

    Ok(())
}
