mod commands;
mod context;
mod output;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use ocloud_cloud::{CancellationToken, CloudError};

#[derive(Parser)]
#[command(name = "ocloud")]
#[command(about = "Inspect cloud networking resources from the terminal", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    debug: bool,

    /// Compartment OCID (overrides config and OCLOUD_COMPARTMENT_ID)
    #[arg(long, global = true)]
    compartment: Option<String>,

    /// Concurrent enrichment workers
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Networking resources
    #[command(alias = "net")]
    Network {
        #[command(subcommand)]
        command: NetworkCommands,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum NetworkCommands {
    /// Load balancers
    #[command(name = "load-balancer", visible_aliases = ["lb", "loadbalancer"])]
    LoadBalancer {
        #[command(subcommand)]
        command: LoadBalancerCommands,
    },
}

#[derive(Subcommand)]
enum LoadBalancerCommands {
    /// List load balancers in the compartment
    List(ListArgs),
    /// Show one load balancer with every detail resolved
    Get {
        /// Load balancer OCID
        ocid: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Probe every backend, including those of healthy backend sets
        #[arg(long)]
        deep: bool,
    },
    /// Find load balancers whose names, addresses or resolved details match
    Search {
        /// Name, OCID, address or resolved detail (typos tolerated)
        pattern: String,
        /// Show every column
        #[arg(short = 'A', long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct ListArgs {
    /// Resolve subnets, NSGs and certificates and show every column
    #[arg(short = 'A', long)]
    all: bool,
    /// Output as JSON
    #[arg(long)]
    json: bool,
    /// Items per page (0 shows everything)
    #[arg(short, long, default_value = "20")]
    limit: usize,
    /// Page number, starting at 1
    #[arg(short, long, default_value = "1")]
    page: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrへ。--debug はデフォルトレベルを上げるだけで、RUST_LOG が優先
    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    // Versionコマンドは設定ファイル不要
    let Commands::Network {
        command: NetworkCommands::LoadBalancer { command },
    } = cli.command
    else {
        println!("ocloud {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    };

    let mut settings = context::load_settings()?;
    if let Some(compartment) = cli.compartment {
        settings.compartment_id = Some(compartment);
    }
    if let Some(workers) = cli.workers {
        settings.workers = workers;
    }
    settings.validate()?;

    // Ctrl-C で実行中のすべての呼び出しを打ち切る
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let result = match command {
        LoadBalancerCommands::List(args) => {
            commands::load_balancer::list(
                &settings,
                &cancel,
                args.limit,
                args.page,
                args.all,
                args.json,
            )
            .await
        }
        LoadBalancerCommands::Get { ocid, json, deep } => {
            commands::load_balancer::get(&settings, &cancel, &ocid, deep, json).await
        }
        LoadBalancerCommands::Search { pattern, all, json } => {
            commands::load_balancer::search(&settings, &cancel, &pattern, all, json).await
        }
    };

    match result {
        Err(err) if is_cancelled(&err) => {
            eprintln!("{}", "Cancelled".yellow());
            std::process::exit(130);
        }
        other => other,
    }
}

fn is_cancelled(err: &anyhow::Error) -> bool {
    err.downcast_ref::<CloudError>()
        .is_some_and(CloudError::is_cancelled)
}
