use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use docsyte_mcp::config::{
    default_config_path, find_config_file, load_config, write_default_config, Config,
};
use docsyte_mcp::mcp::{render_answer, McpServer, ToolRegistry};
use docsyte_mcp::models::{ChunkParams, ChunkResult, DocsAnswer, SearchParams, SearchResult};
use docsyte_mcp::providers::{create_provider, DocsProvider};
use docsyte_mcp::utils::preview;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Docsyte MCP - Documentation search for AI assistants over the Model Context Protocol
#[derive(Parser, Debug)]
#[command(name = "docsyte-mcp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Documentation search, chunk lookup and answers backed by RAGFlow or LlamaCloud", long_about = None)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Provider request timeout in milliseconds (overrides the configuration)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Log format (overrides the configuration)
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

/// Log line format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server (stdio by default)
    Serve {
        /// Serve JSON-RPC over HTTP instead of stdio
        #[arg(long)]
        http: bool,

        /// Host to bind to in HTTP mode
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to in HTTP mode
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Search the documentation
    #[command(alias = "s")]
    Search {
        /// Search query
        query: String,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Fetch a documentation chunk by ID
    #[command(alias = "c")]
    Chunk {
        /// Chunk identifier
        chunk_id: String,
    },

    /// Answer a question from the documentation
    #[command(alias = "a")]
    Answer {
        /// Question to answer
        query: String,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// List the MCP tools and their input schemas
    Tools,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Args, Debug)]
struct FilterArgs {
    /// Filter by library/framework name
    #[arg(long, short)]
    library: Option<String>,

    /// Filter by library version
    #[arg(long)]
    version: Option<String>,

    /// Number of chunks to retrieve (1-50)
    #[arg(short, default_value_t = docsyte_mcp::models::DEFAULT_K)]
    k: u32,
}

impl FilterArgs {
    fn into_params(self, query: String) -> SearchParams {
        SearchParams {
            query,
            library: self.library,
            version: self.version,
            k: self.k,
        }
    }
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Write a configuration file with default values
    Init {
        /// Destination (default: <config dir>/docsyte/config.toml)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },

    /// Print the effective configuration with secrets redacted
    Show,
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => config.logging.level.as_str(),
        (false, 1) => "debug",
        (false, _) => "trace",
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("docsyte_mcp={}", level)));

    let json = match cli.log_format {
        Some(format) => format == LogFormat::Json,
        None => config.logging.format.eq_ignore_ascii_case("json"),
    };

    // stdout is reserved for JSON-RPC in stdio mode
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let path = cli.config.clone().or_else(find_config_file);
    let mut config = load_config(path.as_deref()).with_context(|| match &path {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })?;

    if let Some(timeout) = cli.timeout {
        anyhow::ensure!(timeout > 0, "--timeout must be greater than zero");
        config.provider.timeout_ms = timeout;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // `config init` must work even when the current configuration is broken
    if let Some(Commands::Config {
        command: ConfigCommands::Init { path, force },
    }) = &cli.command
    {
        return init_config(path.clone(), *force);
    }

    let config = resolve_config(&cli)?;
    init_tracing(&cli, &config);

    let format = resolve_format(cli.output);

    match cli.command {
        Some(Commands::Serve { http, host, port }) => {
            let mut config = config;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let provider = create_provider(&config)?;
            let server = McpServer::new(provider, &config);

            if http {
                server.run_http(&config.server.bind_addr()).await?;
            } else {
                server.run().await?;
            }
        }

        Some(Commands::Search { query, filters }) => {
            let provider = create_provider(&config)?;
            let params = filters.into_params(query);
            let results = provider.search_docs(&params).await?;
            if !cli.quiet {
                eprintln!("Found {} chunks from {}", results.len(), provider.name());
            }
            output_results(&results, format)?;
        }

        Some(Commands::Chunk { chunk_id }) => {
            let provider = create_provider(&config)?;
            let chunk = provider.get_chunk(&ChunkParams::new(chunk_id)).await?;
            output_chunk(&chunk, format)?;
        }

        Some(Commands::Answer { query, filters }) => {
            let provider = create_provider(&config)?;
            let params = filters.into_params(query);
            let answer = provider.answer_with_docs(&params).await?;
            output_answer(&params, &answer, format)?;
        }

        Some(Commands::Tools) => {
            let provider: Arc<dyn DocsProvider> = create_provider(&config)?;
            output_tools(&ToolRegistry::new(provider), format)?;
        }

        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => {
                print!("{}", config.redacted().to_toml()?);
            }
            ConfigCommands::Init { path, force } => init_config(path, force)?,
        },

        None => {
            // No command provided - show help
            println!("No command provided. Use --help for usage information.");
            println!("Common commands:");
            println!("  serve            - Run the MCP server over stdio");
            println!("  serve --http     - Run the hosted MCP server");
            println!("  search <query>   - Search the documentation");
            println!("  answer <query>   - Answer a question from the documentation");
            println!("  tools            - List MCP tools");
        }
    }

    Ok(())
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = path.unwrap_or_else(default_config_path);
    write_default_config(&path, force)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn resolve_format(format: OutputFormat) -> OutputFormat {
    if format != OutputFormat::Auto {
        return format;
    }
    if std::io::stdout().is_terminal() {
        OutputFormat::Table
    } else {
        OutputFormat::Json
    }
}

fn new_table(header: Vec<&str>) -> comfy_table::Table {
    let mut table = comfy_table::Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(header);
    table
}

fn output_results(results: &[SearchResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Auto => {
            println!("{}", serde_json::to_string_pretty(results)?);
        }
        OutputFormat::Plain => {
            for (i, result) in results.iter().enumerate() {
                println!(
                    "[{}] {} ({:.2}) {} - {}",
                    i + 1,
                    result.id,
                    result.score.unwrap_or(0.0),
                    result.library().unwrap_or("unknown"),
                    result.source().unwrap_or("unknown")
                );
                println!("  {}", preview(&result.content, 200));
                println!();
            }
        }
        OutputFormat::Table => {
            use comfy_table::{Attribute, Cell};
            let mut table = new_table(vec!["#", "Chunk", "Library", "Source", "Score", "Content"]);
            for (i, result) in results.iter().enumerate() {
                table.add_row(vec![
                    Cell::new(i + 1),
                    Cell::new(&result.id).add_attribute(Attribute::Bold),
                    Cell::new(result.library().unwrap_or("unknown")),
                    Cell::new(result.source().unwrap_or("unknown")),
                    Cell::new(format!("{:.2}", result.score.unwrap_or(0.0))),
                    Cell::new(preview(&result.content, 60)),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

fn output_chunk(chunk: &ChunkResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Auto => {
            println!("{}", serde_json::to_string_pretty(chunk)?);
        }
        OutputFormat::Plain => {
            println!("{}", chunk.content);
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["Field", "Value"]);
            table.add_row(vec!["id".to_string(), chunk.id.clone()]);
            for (key, value) in &chunk.metadata {
                let value = value
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                table.add_row(vec![key.clone(), value]);
            }
            println!("{table}");
            println!();
            println!("{}", chunk.content);
        }
    }
    Ok(())
}

fn output_answer(params: &SearchParams, answer: &DocsAnswer, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Auto => {
            println!("{}", serde_json::to_string_pretty(answer)?);
        }
        OutputFormat::Plain | OutputFormat::Table => {
            println!("{}", render_answer(params, answer));
        }
    }
    Ok(())
}

fn output_tools(tools: &ToolRegistry, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Auto => {
            println!("{}", serde_json::to_string_pretty(&tools.list())?);
        }
        OutputFormat::Plain => {
            for tool in tools.all() {
                println!("{} - {}", tool.name, tool.description);
            }
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["Tool", "Required", "Description"]);
            for tool in tools.all() {
                let required = tool.input_schema["required"]
                    .as_array()
                    .map(|fields| {
                        fields
                            .iter()
                            .filter_map(|f| f.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_default();
                table.add_row(vec![tool.name.clone(), required, tool.description.clone()]);
            }
            println!("{table}");
        }
    }
    Ok(())
}
