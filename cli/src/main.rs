use std::fs;
use std::path::Path;
use std::process;

use clap::Parser;
use napibridge::{Engine, EngineConfig};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

mod repl;
mod session;

use session::Session;

#[derive(Parser)]
#[command(name = "napibridge", about = "Inspect handle scopes and references of an embedded heap")]
struct Cli {
    /// Command file to run instead of the interactive prompt
    #[arg(long)]
    script: Option<String>,
    /// Engine configuration as a JSON file
    #[arg(long)]
    config: Option<String>,
    /// Print final heap statistics as JSON
    #[arg(long)]
    json: bool,
    /// Print version and exit
    #[arg(long)]
    version: bool,
}

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if cli.version {
        println!(
            "{} {}",
            "napibridge".bright_cyan().bold(),
            env!("CARGO_PKG_VERSION").bright_black()
        );
        return;
    }

    let config = match cli.config.as_deref().map(load_config).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(message) => fail(&message),
    };

    let mut session = match Session::new(Engine::new().with_config(config.clone())) {
        Ok(session) => session,
        Err(err) => fail(&err.to_string()),
    };

    match &cli.script {
        Some(path) => run_script(&mut session, path),
        None => {
            if let Err(err) = repl::run(&mut session, config) {
                fail(&format!("repl error: {err}"));
            }
        }
    }

    if cli.json {
        match serde_json::to_string_pretty(&session.stats()) {
            Ok(json) => println!("{json}"),
            Err(err) => fail(&err.to_string()),
        }
    }
}

fn load_config(path: &str) -> Result<EngineConfig, String> {
    let source = fs::read_to_string(path).map_err(|err| format!("could not read '{path}': {err}"))?;
    EngineConfig::from_json(&source).map_err(|status| format!("bad config '{path}': {status}"))
}

/// Runs every non-empty line of `path`; `#` starts a comment. Stops at the
/// first failing command.
fn run_script(session: &mut Session, path: &str) {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => fail(&format!("could not read '{}': {err}", path.yellow())),
    };
    for (index, line) in source.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match session.execute(line) {
            Ok(output) => println!("{output}"),
            Err(err) => {
                eprintln!(
                    "{} {}:{}: {err}",
                    "error:".red().bold(),
                    Path::new(path).display().to_string().cyan(),
                    index + 1
                );
                process::exit(1);
            }
        }
        repl::report_finalized(session);
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{} {message}", "error:".red().bold());
    process::exit(1);
}
