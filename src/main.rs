//! cbapi command-line entry point

use anyhow::{Context, Result};
use cbapi::config::config::Config;
use cbapi::coordinator::{default_parallelism, FetchCoordinator};
use cbapi::data::data_exporter::DataExporter;
use cbapi::utils::logging::{init_tracing, level_for_verbosity};
use cbapi::{ApiClient, EntityKind, Query};
use clap::{Args, Parser, Subcommand};
use crossterm::style::Stylize;
use std::path::PathBuf;
use tracing::info;

mod table_display;

use table_display::display_results;

/// Search organizations and people and merge every result page into one table
#[derive(Parser, Debug)]
#[command(name = "cbapi")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "CBAPI_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search organizations
    #[command(alias = "orgs")]
    Organizations {
        /// Text search of the organization's domain (e.g. www.google.com)
        #[arg(long)]
        domain_name: Option<String>,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Search people
    #[command(alias = "ppl")]
    People {
        /// Social media identities, comma separated (e.g. ronconway)
        #[arg(long)]
        socials: Option<String>,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Write a commented default config file
    GenerateConfig,
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Full-text query
    #[arg(short, long)]
    query: Option<String>,

    /// Full-text search limited to names
    #[arg(short, long)]
    name: Option<String>,

    /// Location names, AND'd together (e.g. "California,San Francisco")
    #[arg(long, value_delimiter = ',')]
    locations: Vec<String>,

    /// Types, AND'd together (organizations: company, investor, school, group; people: investor)
    #[arg(long, value_delimiter = ',')]
    types: Vec<String>,

    /// Only records updated at or after this Unix timestamp (default: yesterday 00:00 UTC)
    #[arg(long)]
    since: Option<i64>,

    /// Page used for the initial request
    #[arg(long)]
    page: Option<u32>,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Maximum concurrent page fetches (default: config, then core count)
    #[arg(short, long, env = "CBAPI_WORKERS")]
    workers: Option<usize>,

    /// Rows to print
    #[arg(long, default_value = "20")]
    limit: usize,

    /// Also write the full table as CSV (default name: <entity>_<timestamp>.csv)
    #[arg(long, value_name = "FILE")]
    csv: Option<Option<PathBuf>>,

    /// Also write the full table as JSON (default name: <entity>_<timestamp>.json)
    #[arg(long, value_name = "FILE")]
    json: Option<Option<PathBuf>>,
}

impl OutputArgs {
    fn csv_path(&self, kind: EntityKind) -> Option<PathBuf> {
        export_path(&self.csv, kind, "csv")
    }

    fn json_path(&self, kind: EntityKind) -> Option<PathBuf> {
        export_path(&self.json, kind, "json")
    }
}

fn export_path(flag: &Option<Option<PathBuf>>, kind: EntityKind, extension: &str) -> Option<PathBuf> {
    flag.as_ref().map(|path| {
        path.clone()
            .unwrap_or_else(|| DataExporter::timestamped_filename(kind.endpoint(), extension))
    })
}

impl FilterArgs {
    fn into_query(self) -> Query {
        let mut query = Query::new()
            .with_locations(self.locations)
            .with_types(self.types);
        query.query = self.query;
        query.name = self.name;
        query.updated_since = self.since;
        query.page = self.page;
        query
    }
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(level_for_verbosity(cli.verbose));

    let (kind, query, output) = match cli.command {
        Command::GenerateConfig => return generate_config(),
        Command::Organizations {
            domain_name,
            filters,
            output,
        } => {
            let mut query = filters.into_query();
            query.domain_name = domain_name;
            (EntityKind::Organization, query, output)
        }
        Command::People {
            socials,
            filters,
            output,
        } => {
            let mut query = filters.into_query();
            query.socials = socials;
            (EntityKind::Person, query, output)
        }
    };

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?.with_env_overrides(|k| std::env::var(k).ok()),
        None => Config::load()?,
    };

    run_search(&config, kind, &query, &output)
}

fn run_search(config: &Config, kind: EntityKind, query: &Query, output: &OutputArgs) -> Result<()> {
    let client = ApiClient::new(&config.api).context("Could not create API client")?;

    let max_workers = output
        .workers
        .or(config.fetch.max_workers)
        .unwrap_or_else(default_parallelism);
    info!(
        "Searching {} at {} with up to {} workers",
        kind,
        client.base_url(),
        max_workers
    );

    let result = FetchCoordinator::new(&client)
        .with_max_workers(max_workers)
        .fetch(kind, query)
        .with_context(|| format!("Failed to fetch {}", kind))?;

    let table = match result {
        Some(table) => table,
        None => {
            println!("{}", format!("No {} matched the query.", kind).yellow());
            return Ok(());
        }
    };

    display_results(&table, output.limit);

    if let Some(path) = output.csv_path(kind) {
        println!("{}", DataExporter::write_csv(&table, &path)?.green());
    }
    if let Some(path) = output.json_path(kind) {
        println!("{}", DataExporter::write_json(&table, &path)?.green());
    }

    Ok(())
}

fn generate_config() -> Result<()> {
    let path = Config::get_config_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Error creating config directory {:?}", parent))?;
    }
    std::fs::write(&path, Config::create_default_with_comments())
        .with_context(|| format!("Error writing config file {:?}", path))?;

    println!("Configuration file created at: {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn output_of(args: &[&str]) -> OutputArgs {
        match Cli::try_parse_from(args).unwrap().command {
            Command::Organizations { output, .. } | Command::People { output, .. } => output,
            Command::GenerateConfig => panic!("expected a search command"),
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_env_backed_arguments() {
        let cli = Cli::command();
        let config = cli
            .get_arguments()
            .find(|arg| arg.get_id() == "config")
            .unwrap();
        assert_eq!(config.get_env(), Some(std::ffi::OsStr::new("CBAPI_CONFIG")));

        let orgs = cli.find_subcommand("organizations").unwrap();
        let workers = orgs
            .get_arguments()
            .find(|arg| arg.get_id() == "workers")
            .unwrap();
        assert_eq!(workers.get_env(), Some(std::ffi::OsStr::new("CBAPI_WORKERS")));
    }

    #[test]
    fn test_export_paths() {
        let output = output_of(&["cbapi", "orgs", "--csv", "out.csv", "--json"]);
        assert_eq!(
            output.csv_path(EntityKind::Organization),
            Some(PathBuf::from("out.csv"))
        );

        let json = output.json_path(EntityKind::Organization).unwrap();
        let json = json.to_string_lossy();
        assert!(json.starts_with("organizations_"));
        assert!(json.ends_with(".json"));

        let output = output_of(&["cbapi", "people", "--workers", "3"]);
        assert_eq!(output.workers, Some(3));
        assert_eq!(output.csv_path(EntityKind::Person), None);
        assert_eq!(output.json_path(EntityKind::Person), None);
    }
}
