use std::sync::Arc;

use clap::Parser;
use elixir_xref::cli::{commands, Cli, Commands};
use elixir_xref::repo::GitRepoAdapter;
use elixir_xref::{DatabasePersistence, Settings};

fn main() {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    });

    if let Err(e) = config.resolve_project(cli.project.as_deref()) {
        eprintln!("Error resolving project: {e}");
        std::process::exit(1);
    }

    elixir_xref::logging::init(&config);

    if let Commands::Init { force } = &cli.command {
        commands::init::run_init(*force);
        return;
    }

    if let Commands::Config = &cli.command {
        commands::init::run_config(&config);
        return;
    }

    let repo = match GitRepoAdapter::open(&config.repo_path) {
        Ok(repo) => Arc::new(repo),
        Err(e) => {
            eprintln!("Error opening repository at '{}': {e}", config.repo_path.display());
            for suggestion in e.recovery_suggestions() {
                eprintln!("  - {suggestion}");
            }
            std::process::exit(1);
        }
    };

    let persistence = Arc::new(DatabasePersistence::new(config.data_path.clone()));
    let db = match persistence.load() {
        Ok(db) => Arc::new(db),
        Err(e) => {
            eprintln!("Error loading cross-reference database: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Init { .. } | Commands::Config => unreachable!("handled above"),

        Commands::Update { workers, tag, quiet } => {
            let workers = workers.unwrap_or_else(|| config.effective_workers());
            let args = commands::update::UpdateArgs { workers, tag, quiet };
            if let Err(e) = commands::update::run(args, repo, db, persistence) {
                eprintln!("Error during update: {e}");
                for suggestion in e.recovery_suggestions() {
                    eprintln!("  - {suggestion}");
                }
                std::process::exit(1);
            }
        }

        Commands::Tags => {
            if let Err(e) = commands::tags::run(repo.as_ref(), &db) {
                eprintln!("Error listing tags: {e}");
                std::process::exit(1);
            }
        }

        Commands::Query { tag, what } => {
            commands::query::run(tag, what, &db);
        }
    }
}
