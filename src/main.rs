use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use searchq::backend::{spawn_plan, BackendError, IndexClient, Stats, StreamSearchAdapter, Streamer};
use searchq::config::Config;
use searchq::output;
use searchq::query::{parse, pipeline, string_human, structural, ParserOptions, SearchType};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "searchq")]
#[command(about = "Compile code search queries and stream matches from an index service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: <config dir>/searchq/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Interpret bare patterns as regular expressions
    #[arg(long, global = true)]
    regexp: bool,

    /// Interpret repo:, file: and repohasfile: values as globs
    #[arg(long, global = true)]
    globbing: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the parse tree
    Parse {
        #[arg(trailing_var_arg = true, required = true)]
        query: Vec<String>,
    },
    /// Print the compiled plan, one Basic query per line
    Plan {
        #[arg(trailing_var_arg = true, required = true)]
        query: Vec<String>,
    },
    /// Print the query in normalized form
    Fmt {
        #[arg(trailing_var_arg = true, required = true)]
        query: Vec<String>,
    },
    /// Run the query against an index service
    Search {
        /// Backend address (host:port or URL), overrides the config
        #[arg(short, long)]
        backend: Option<String>,

        /// Use one-shot searches instead of the native stream
        #[arg(long)]
        no_stream: bool,

        /// Group matches under a file name heading
        #[arg(long)]
        heading: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        #[arg(trailing_var_arg = true, required = true)]
        query: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Commands::Search { .. } => "info",
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let mut options = config.parser.options();
    if cli.regexp {
        options.search_type = SearchType::Regexp;
    }
    if cli.globbing {
        options.globbing = true;
    }

    match cli.command {
        Commands::Parse { query } => {
            let nodes = parse(&query.join(" "), &options)?;
            println!("{}", structural(&nodes));
        }
        Commands::Plan { query } => {
            let plan = pipeline(&query.join(" "), &options)?;
            output::write_plan(&mut output::stdout(true), &plan)?;
        }
        Commands::Fmt { query } => {
            let nodes = parse(&query.join(" "), &options)?;
            println!("{}", string_human(&nodes));
        }
        Commands::Search {
            backend,
            no_stream,
            heading,
            no_color,
            query,
        } => {
            let search = SearchArgs {
                query: query.join(" "),
                backend,
                streaming: config.backend.streaming && !no_stream,
                heading,
                color: !no_color,
            };
            run_search(&config, &options, search).await?;
        }
    }

    Ok(())
}

struct SearchArgs {
    query: String,
    backend: Option<String>,
    streaming: bool,
    heading: bool,
    color: bool,
}

async fn run_search(config: &Config, options: &ParserOptions, args: SearchArgs) -> Result<()> {
    let plan = pipeline(&args.query, options)?;
    if plan.is_empty() {
        bail!("Query is empty");
    }

    let address = args.backend.unwrap_or_else(|| config.backend.address.clone());
    let client = IndexClient::new(&address, &config.backend)
        .with_context(|| format!("Failed to set up backend client for {}", address))?;

    let streamer: Arc<dyn Streamer> = if args.streaming {
        info!("Streaming {} plan entries from {}", plan.len(), client);
        Arc::new(client)
    } else {
        let adapter = StreamSearchAdapter::new(client);
        info!("Searching {} plan entries with {}", plan.len(), adapter);
        Arc::new(adapter)
    };

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, canceling search");
            interrupt.cancel();
        }
    });

    let mut stream = spawn_plan(
        streamer,
        &plan,
        &config.search,
        config.backend.event_buffer,
        cancel,
    );

    let mut out = output::stdout(args.color);
    let mut stats = Stats::default();
    while let Some(event) = stream.next().await {
        stats.add(&event.event.result.stats);
        for file in &event.event.result.files {
            output::write_file_match(&mut out, file, args.heading)?;
        }
    }

    let outcomes = stream.finish().await;
    output::write_stats(&mut output::stderr(args.color), &stats)?;

    if outcomes.iter().any(|o| matches!(o, Err(BackendError::Canceled))) {
        bail!("Search canceled");
    }
    let failures: Vec<&BackendError> = outcomes.iter().filter_map(|o| o.as_ref().err()).collect();
    if let Some(first) = failures.first() {
        if failures.len() == outcomes.len() {
            bail!("All {} plan entries failed: {}", outcomes.len(), first);
        }
        warn!("{} of {} plan entries failed", failures.len(), outcomes.len());
    }

    Ok(())
}
