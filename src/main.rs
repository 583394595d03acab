use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use kitopen::config::{default_config_path, find_config_file, get_config, load_config, Config, ConfigFile};
use kitopen::search::{AuthorFilter, BatchingKind, OptionsInput, Parameters};
use kitopen::ui::{self, Spinner};
use kitopen::{views, KitOpen, Record, RecordView};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// kitopen - Export publication lists from the KITopen database
#[derive(Parser, Debug)]
#[command(name = "kitopen")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Export publication lists from the KITopen database", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (one object per line for records)
    Json,
    /// Plain text format
    Plain,
}

impl OutputFormat {
    fn resolve(self) -> Self {
        match self {
            OutputFormat::Auto if ui::is_terminal() => OutputFormat::Table,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

/// Search filters shared by `search` and `params`
#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    /// Author pattern, e.g. "KOPMANN, A*" (repeat for several authors)
    #[arg(long, short)]
    author: Vec<String>,

    /// First year of the range
    #[arg(long, short)]
    start: Option<String>,

    /// End of the range (empty for open ended)
    #[arg(long, short)]
    end: Option<String>,

    /// Predefined view name (see `kitopen views`)
    #[arg(long)]
    view: Option<String>,

    /// Comma-separated fields; extends --view, or forms a custom view on its own
    #[arg(long, value_delimiter = ',')]
    fields: Vec<String>,
}

impl FilterArgs {
    fn to_input(&self) -> Result<OptionsInput> {
        let mut input = OptionsInput::new();

        match self.author.len() {
            0 => {}
            1 => input = input.author(AuthorFilter::from(self.author[0].clone())),
            _ => input = input.author(AuthorFilter::from(self.author.clone())),
        }
        if let Some(start) = &self.start {
            input = input.start(start.clone());
        }
        if let Some(end) = &self.end {
            input = input.end(end.clone());
        }
        if let Some(view) = self.resolve_view()? {
            input = input.view(view);
        }

        Ok(input)
    }

    fn resolve_view(&self) -> Result<Option<RecordView>> {
        let base = self
            .view
            .as_deref()
            .map(|name| views().get(name))
            .transpose()
            .with_context(|| {
                format!(
                    "available views: {}",
                    views().names().collect::<Vec<_>>().join(", ")
                )
            })?;

        let view = match (base, self.fields.is_empty()) {
            (base, true) => base,
            (Some(base), false) => Some(base.extend(self.fields.iter().cloned())?),
            (None, false) => Some(RecordView::new("custom", self.fields.iter().cloned())?),
        };
        Ok(view)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search publications and stream the matching records
    #[command(visible_alias = "s")]
    Search {
        #[command(flatten)]
        filters: FilterArgs,

        /// How to split the search into requests
        #[arg(long, value_enum)]
        batching: Option<BatchingKind>,

        /// Number of batches to request ahead in the background
        #[arg(long)]
        prefetch: Option<usize>,

        /// Stop after this many records
        #[arg(long, short)]
        limit: Option<usize>,

        /// Print the parsed author list of each record (plain output only)
        #[arg(long)]
        authors: bool,
    },

    /// List the predefined record views
    Views {
        /// Show every field of each view
        #[arg(long)]
        detailed: bool,
    },

    /// Show the query parameters a search would send, without sending it
    Params {
        #[command(flatten)]
        filters: FilterArgs,

        /// Print the full request URL instead of the parameter list
        #[arg(long)]
        url: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a configuration file with the default values
    Init {
        /// Target path (defaults to the user config directory)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration from file if specified or found in default locations
    let config_path = cli.config.clone().or_else(find_config_file);
    let config = match &config_path {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config file {}", path.display()))?,
        None => get_config()?,
    };

    init_tracing(&cli, &config);
    if let Some(path) = &config_path {
        tracing::debug!("Using config file: {}", path.display());
    }

    let format = cli.output.resolve();

    match cli.command {
        Commands::Search {
            filters,
            batching,
            prefetch,
            limit,
            authors,
        } => {
            let mut config = config;
            if let Some(batching) = batching {
                config.batching = batching;
            }
            if let Some(prefetch) = prefetch {
                config.prefetch = prefetch;
            }
            run_search(config, &filters, limit, authors, format, cli.quiet).await?;
        }

        Commands::Views { detailed } => output_views(detailed, format)?,

        Commands::Params { filters, url } => {
            let client = KitOpen::new(config.clone())?;
            let params = client.parameters(filters.to_input()?)?;
            if url {
                let url = url::Url::parse_with_params(&config.search_url, params.iter())?;
                println!("{}", url);
            } else {
                output_params(&params, format)?;
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Init { path, force } => {
                let path = path
                    .or_else(default_config_path)
                    .unwrap_or_else(|| PathBuf::from("kitopen.toml"));
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                ConfigFile::create_default(&path).save()?;
                if !cli.quiet {
                    println!("Wrote {}", path.display());
                }
            }
            ConfigAction::Show => {
                let mut file = ConfigFile::create_default(config_path.unwrap_or_default());
                file.config = config;
                print!("{}", file.to_toml()?);
            }
        },
    }

    Ok(())
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kitopen={}", level)));
    let registry = tracing_subscriber::registry().with(filter);

    if cli.log_json || config.logging.is_json() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run_search(
    config: Config,
    filters: &FilterArgs,
    limit: Option<usize>,
    show_authors: bool,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let client = KitOpen::new(config)?;
    let mut result = client.search(filters.to_input()?)?;
    let view = result.options().view.clone();
    let limit = limit.unwrap_or(usize::MAX);

    let spinner = if format == OutputFormat::Table && !quiet {
        Spinner::new(&format!("Searching {} ...", result.options()))
    } else {
        Spinner::hidden()
    };

    let stdout = std::io::stdout();
    let mut collected: Vec<Record> = Vec::new();
    let mut count = 0;

    while count < limit {
        let record = match result.next().await {
            Ok(Some(record)) => record,
            Ok(None) => break,
            Err(e) => {
                spinner.finish();
                return Err(e).context("search failed");
            }
        };
        count += 1;

        match format {
            OutputFormat::Json => {
                let mut out = stdout.lock();
                writeln!(out, "{}", serde_json::to_string(&record)?)?;
            }
            OutputFormat::Plain => {
                let mut out = stdout.lock();
                writeln!(out, "{}", record)?;
                if show_authors && record.contains("author") {
                    for author in record.get_authors()? {
                        writeln!(out, "  {}, {}", author.last, author.first)?;
                    }
                }
            }
            _ => {
                spinner.set_message(format!("Received {} records", count));
                collected.push(record);
            }
        }
    }
    spinner.finish();

    if format == OutputFormat::Table {
        println!("{}", ui::records_table(&view, &collected));
    }
    if !quiet {
        eprintln!("{} records", count);
    }

    Ok(())
}

fn output_views(detailed: bool, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let listing: Vec<serde_json::Value> = views()
                .iter()
                .map(|v| serde_json::json!({ "name": v.name(), "fields": v.fields() }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        OutputFormat::Plain => {
            for view in views().iter() {
                if detailed {
                    println!("{}: {}", view.name(), view.to_table_fields());
                } else {
                    println!("{}", view);
                }
            }
        }
        _ => println!("{}", ui::views_table(views().iter(), detailed)),
    }
    Ok(())
}

fn output_params(params: &Parameters, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(params)?),
        OutputFormat::Plain => {
            for (key, value) in params {
                println!("{}={}", key, value);
            }
        }
        _ => {
            let mut table = comfy_table::Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Parameter", "Value"]);
            for (key, value) in params {
                table.add_row(vec![key.as_str(), value.as_str()]);
            }
            println!("{table}");
        }
    }
    Ok(())
}
