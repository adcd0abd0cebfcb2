//! `biographer`: inspect, export and list versions of persisted biographies

use anyhow::{bail, Context, Result};
use bio_document::{Biography, BiographyConfig};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let version_arg = Arg::new("version")
        .long("version")
        .value_parser(value_parser!(u64))
        .help("Snapshot version to read (default: latest)");

    Command::new("biographer")
        .version(bio_document::VERSION)
        .about("Inspect and export persisted biographies")
        .disable_version_flag(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("base-dir")
                .long("base-dir")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Directory holding one sub-directory per user"),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .global(true)
                .help("User whose biography to read"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("show")
                .about("Print the section outline")
                .arg(version_arg.clone()),
        )
        .subcommand(
            Command::new("export")
                .about("Render the biography as markdown")
                .arg(version_arg.clone())
                .arg(
                    Arg::new("keep-links")
                        .long("keep-links")
                        .action(ArgAction::SetTrue)
                        .help("Keep [MEM_...] citation markers"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .help("Write to this file instead of stdout"),
                ),
        )
        .subcommand(Command::new("versions").about("List persisted versions"))
        .subcommand(
            Command::new("stats")
                .about("Print section and citation statistics as JSON")
                .arg(version_arg),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Config file first, then flags on top
fn resolve_config(matches: &ArgMatches) -> Result<BiographyConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => BiographyConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => {
            let Some(user) = matches.get_one::<String>("user") else {
                bail!("either --config or --user is required");
            };
            BiographyConfig::new(user.clone(), PathBuf::from("data/biographies"))
        }
    };
    if let Some(user) = matches.get_one::<String>("user") {
        config.user_id.clone_from(user);
    }
    if let Some(base_dir) = matches.get_one::<PathBuf>("base-dir") {
        config.base_dir.clone_from(base_dir);
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn load(config: BiographyConfig, args: &ArgMatches) -> Result<Biography> {
    let version = args.get_one::<u64>("version").copied();
    let user = config.user_id.clone();
    let biography = Biography::load_from_file(config, version)
        .await
        .with_context(|| format!("loading biography of '{user}'"))?;
    debug!(user_id = %user, version = ?version, "biography loaded");
    Ok(biography)
}

async fn run(matches: &ArgMatches) -> Result<()> {
    let config = resolve_config(matches)?;

    match matches.subcommand() {
        Some(("show", args)) => {
            let biography = load(config, args).await?;
            print!("{}", biography.get_sections());
        }
        Some(("export", args)) => {
            let biography = load(config, args).await?;
            let markdown = biography
                .export_to_markdown(false, !args.get_flag("keep-links"))
                .await?;
            match args.get_one::<PathBuf>("output") {
                Some(path) => {
                    std::fs::write(path, &markdown)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), "markdown written");
                }
                None => print!("{markdown}"),
            }
        }
        Some(("versions", _)) => {
            let biography = Biography::open(config).await?;
            for version in biography.list_versions().await? {
                println!("{version}");
            }
        }
        Some(("stats", args)) => {
            let biography = load(config, args).await?;
            println!("{}", serde_json::to_string_pretty(&biography.stats())?);
        }
        _ => unreachable!("subcommand is required"),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("json"));

    if let Err(e) = run(&matches).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
