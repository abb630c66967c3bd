use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use ignore::WalkBuilder;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use phpantom_reflection::{Broker, Error, ReflectConfig};

/// Reflect PHP sources without running them.
#[derive(Parser, Debug)]
#[command(name = "phpantom-reflect", version, about)]
struct Args {
    /// Files or directories to analyse.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Configuration file (defaults to phpantom-reflect.toml discovery).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print a JSON summary of every registered type.
    #[arg(long)]
    json: bool,

    /// Print the composed view of one type.
    #[arg(long, value_name = "NAME")]
    class: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("phpantom-reflect: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let config = match &args.config {
        Some(path) => ReflectConfig::load(path)?,
        None => ReflectConfig::discover()?,
    };
    let files = collect_files(&args.paths, &config);
    let mut broker = Broker::with_config(config);

    let mut failed = 0usize;
    for file in &files {
        // A failing unit leaves the rest of the registry usable.
        if let Err(e) = broker.register_file(file) {
            warn!("skipping {}: {}", file.display(), e);
            failed += 1;
        }
    }
    info!(
        "registered {} of {} files ({} types)",
        files.len() - failed,
        files.len(),
        broker.types().len()
    );

    if let Some(name) = &args.class {
        let class = broker.class(name)?;
        println!("{}", to_json(&class.summary()));
        return Ok(());
    }

    if args.json {
        let summaries: Vec<_> = broker.classes()?.iter().map(|c| c.summary()).collect();
        println!("{}", to_json(&summaries));
    } else {
        for class in broker.classes()? {
            let kind = class.kind().map_or("stub", |k| match k {
                phpantom_reflection::types::ClassLikeKind::Class => "class",
                phpantom_reflection::types::ClassLikeKind::Interface => "interface",
                phpantom_reflection::types::ClassLikeKind::Trait => "trait",
            });
            println!(
                "{kind} {} ({} methods, {:?})",
                class.name(),
                class.methods().len(),
                class.lifecycle()
            );
        }
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

/// Expand directories into the source files below them.
fn collect_files(paths: &[PathBuf], config: &ReflectConfig) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        let walker = WalkBuilder::new(path)
            .hidden(true)
            .git_ignore(true)
            .require_git(false)
            .build();
        files.extend(
            walker
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
                .map(|entry| entry.into_path())
                .filter(|p: &PathBuf| config.matches_extension(Path::new(p))),
        );
    }
    files.sort();
    files
}
