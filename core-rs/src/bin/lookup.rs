//! lookup - SPARQL entity lookup CLI
//!
//! Command-line interface over a `lookup.yaml` service configuration

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

use lookup_core::config::{LookupConfig, ServiceConfig, DEFAULT_CONFIG_FILE};
use lookup_core::lookup::reconciliation::{batch_results_json, parse_batch};
use lookup_core::lookup::{
    create_cache_key, query_builder, LookupCandidate, LookupProperty, LookupQuery, LookupRequest, Strictness,
};

#[derive(Parser)]
#[command(name = "lookup")]
#[command(version)]
#[command(about = "SPARQL entity lookup and reconciliation", long_about = None)]
struct Cli {
    /// Service configuration file
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrictArg {
    All,
    Should,
}

impl From<StrictArg> for Strictness {
    fn from(arg: StrictArg) -> Self {
        match arg {
            StrictArg::All => Strictness::All,
            StrictArg::Should => Strictness::Should,
        }
    }
}

#[derive(clap::Args)]
struct QueryArgs {
    /// Search token
    token: String,
    /// Restrict candidates to this type IRI
    #[arg(long = "type")]
    entity_type: Option<String>,
    /// Maximum number of candidates
    #[arg(long)]
    limit: Option<usize>,
    /// How property filters combine
    #[arg(long, value_enum)]
    strict: Option<StrictArg>,
    /// Literal property filter (IRI=value), repeatable
    #[arg(long = "property")]
    properties: Vec<String>,
    /// Linked entity filter (IRI=IRI), repeatable
    #[arg(long = "link")]
    links: Vec<String>,
    /// Preferred label language
    #[arg(long)]
    lang: Option<String>,
    /// Service name (default service when omitted)
    #[arg(long)]
    service: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up candidates for a token
    Query {
        #[command(flatten)]
        args: QueryArgs,
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// List entity types indexed by a service
    Types {
        #[arg(long)]
        service: Option<String>,
    },
    /// Answer a reconciliation batch file (JSON in, JSON out)
    Batch {
        file: PathBuf,
        #[arg(long)]
        service: Option<String>,
    },
    /// Print the SPARQL, bindings and cache key a query produces
    Explain {
        #[command(flatten)]
        args: QueryArgs,
    },
    /// List configured services
    Services,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn split_pair<'a>(flag: &str, value: &'a str) -> anyhow::Result<(&'a str, &'a str)> {
    value
        .split_once('=')
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .ok_or_else(|| anyhow!("--{} expects IRI=value, got '{}'", flag, value))
}

fn build_query(args: &QueryArgs) -> anyhow::Result<LookupQuery> {
    let mut query = LookupQuery::new(args.token.as_str());

    if let Some(limit) = args.limit {
        query = query.with_limit(limit);
    }
    if let Some(entity_type) = &args.entity_type {
        query = query.with_type(entity_type.as_str());
    }
    if let Some(strict) = args.strict {
        query = query.with_strictness(strict.into());
    }
    if let Some(lang) = &args.lang {
        query = query.with_preferred_language(lang.as_str());
    }
    for pair in &args.properties {
        let (property, value) = split_pair("property", pair)?;
        query = query.with_property(LookupProperty::data(property, value));
    }
    for pair in &args.links {
        let (property, entity) = split_pair("link", pair)?;
        query = query.with_property(LookupProperty::object(property, entity));
    }

    Ok(query)
}

fn load_config(path: &Path) -> anyhow::Result<(LookupConfig, PathBuf)> {
    let config = LookupConfig::load(path).with_context(|| format!("loading {}", path.display()))?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((config, base_dir))
}

fn service_config<'a>(config: &'a LookupConfig, name: Option<&str>) -> anyhow::Result<&'a ServiceConfig> {
    let name = name.or(config.spec.default_service.as_deref());
    match name {
        Some(name) => config
            .spec
            .services
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| anyhow!("Lookup service not found: {}", name)),
        None => config
            .spec
            .services
            .first()
            .ok_or_else(|| anyhow!("No lookup services configured")),
    }
}

fn print_candidates(candidates: &[LookupCandidate]) {
    if candidates.is_empty() {
        println!("No candidates found.");
        return;
    }

    println!(
        "{:<8} {:<6} {:<32} {:<48} {}",
        "SCORE".bold(),
        "MATCH".bold(),
        "NAME".bold(),
        "ID".bold(),
        "TYPES".bold()
    );
    for candidate in candidates {
        let types: Vec<&str> = candidate.types().iter().map(|t| t.name.as_str()).collect();
        let matched = if candidate.matched() { "yes".green() } else { "no".normal() };
        println!(
            "{:<8.2} {:<6} {:<32} {:<48} {}",
            candidate.score(),
            matched,
            candidate.name(),
            candidate.id().cyan(),
            types.join(", ")
        );
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Query { args, format } => {
            let (config, base_dir) = load_config(&cli.config)?;
            let registry = config.build_registry(&base_dir)?;

            let request = LookupRequest::new("q0", build_query(&args)?);
            let response = registry.lookup(args.service.as_deref(), &request)?;

            match format {
                OutputFormat::Table => print_candidates(&response.candidates),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
            }
        }

        Commands::Types { service } => {
            let (config, base_dir) = load_config(&cli.config)?;
            let registry = config.build_registry(&base_dir)?;

            let types = registry.available_entity_types(service.as_deref())?;
            if types.is_empty() {
                println!("No entity types found.");
            }
            for entity_type in types {
                println!("{:<32} {}", entity_type.name, entity_type.id.cyan());
            }
        }

        Commands::Batch { file, service } => {
            let (config, base_dir) = load_config(&cli.config)?;
            let registry = config.build_registry(&base_dir)?;

            let content = fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let requests = parse_batch(&content)?;

            let responses = requests
                .iter()
                .map(|request| registry.lookup(service.as_deref(), request))
                .collect::<Result<Vec<_>, _>>()?;

            println!("{}", batch_results_json(&responses)?);
        }

        Commands::Explain { args } => {
            let (config, _) = load_config(&cli.config)?;
            let service = service_config(&config, args.service.as_deref())?;

            let query = build_query(&args)?;
            let sparql = query_builder(&service.options()?).build(&query);

            println!("{} {}", "Service:".bold(), service.name);
            println!("{} {}", "Cache key:".bold(), create_cache_key(&query));
            println!("{}", "Bindings:".bold());
            for (name, value) in sparql.bindings() {
                println!("  ?{} = {}", name, value.to_ntriples());
            }
            println!("{}", "Query:".bold());
            println!("{}", sparql.as_str());
        }

        Commands::Services => {
            let (config, _) = load_config(&cli.config)?;
            let default = service_config(&config, None)?.name.clone();

            for service in &config.spec.services {
                let repository = match (&service.repository.memory, &service.repository.rdf4j) {
                    (_, Some(rdf4j)) => format!("rdf4j {}", rdf4j.url),
                    (Some(memory), None) => format!("memory ({} files)", memory.files.len()),
                    (None, None) => bail!("service '{}' has no repository", service.name),
                };
                let marker = if service.name == default { "*".green() } else { " ".normal() };
                println!(
                    "{} {:<20} {:<6} {:<40} cache: {}",
                    marker,
                    service.name.bold(),
                    format!("{:?}", service.query_engine).to_lowercase(),
                    repository,
                    service.cache_spec()?
                );
            }
        }
    }

    Ok(())
}
