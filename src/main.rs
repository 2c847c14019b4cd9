use anyhow::Result;
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use git_versioning::config::ConfigLocation;
use git_versioning::git::Git2Repository;
use git_versioning::overrides::{parse_definition, OverrideSource};
use git_versioning::resolver::ConfigurationResolver;
use git_versioning::{ui, BuildSession};

#[derive(clap::Parser)]
#[command(
    name = "git-versioning",
    about = "Derive the project version from the current git branch, tag or commit"
)]
struct Args {
    #[arg(short, long, default_value = ".", help = "Build root directory")]
    root: PathBuf,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(
        short = 'D',
        long = "define",
        value_name = "KEY=VALUE",
        help = "Set a user property, e.g. -D project.tag=v1.0.0"
    )]
    define: Vec<String>,

    #[arg(
        long,
        default_value = "0.0.0-SNAPSHOT",
        help = "Version declared by the project, kept when versioning is disabled"
    )]
    project_version: String,

    #[arg(short, long, help = "Also print the derived properties")]
    properties: bool,

    #[arg(short, long, help = "Print version information")]
    version: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.version {
        println!("git-versioning {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let location = match &args.config {
        Some(path) => ConfigLocation::for_file(path),
        None => ConfigLocation::for_root(&args.root),
    };

    let user_properties: HashMap<String, String> =
        args.define.iter().map(|d| parse_definition(d)).collect();
    let resolver = ConfigurationResolver::new(location, OverrideSource::from_env(user_properties));

    let repo = match Git2Repository::open(&args.root) {
        Ok(repo) => repo,
        Err(e) => {
            // Versioning may be switched off for builds outside a checkout
            if matches!(resolver.resolve(), Ok(configuration) if !configuration.enabled) {
                ui::display_version(&args.project_version);
                return Ok(());
            }
            ui::display_error(&e.to_string());
            std::process::exit(1);
        }
    };

    let session = BuildSession::new(repo, resolver);
    let resolved = match session.project_version(&args.project_version) {
        Ok(resolved) => resolved,
        Err(e) => {
            ui::display_error(&e.to_string());
            std::process::exit(1);
        }
    };

    if resolved.version != args.project_version {
        ui::display_status(&format!(
            "Project version {} replaced by {}",
            args.project_version, resolved.version
        ));
    }

    ui::display_version(&resolved.version);
    if args.properties {
        ui::display_properties(&resolved.properties);
    }

    Ok(())
}
