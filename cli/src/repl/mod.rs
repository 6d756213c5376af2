mod completer;
mod helper;
mod highlighter;
mod hinter;

use napibridge::{Engine, EngineConfig};
use owo_colors::OwoColorize;
use rustyline::error::ReadlineError;
use rustyline::{Config, EditMode, Editor};

use self::helper::ReplHelper;
use crate::session::Session;

pub fn run(session: &mut Session, config: EngineConfig) -> Result<(), ReadlineError> {
    let editor_config = Config::builder()
        .history_ignore_dups(true)?
        .completion_type(rustyline::CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .build();

    let mut rl: Editor<ReplHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(editor_config)?;
    rl.set_helper(Some(ReplHelper));

    println!(
        "{} {}",
        "napibridge".bright_cyan().bold(),
        env!("CARGO_PKG_VERSION").bright_black()
    );
    println!("{}", "Type help for commands, .reset for a fresh engine".bright_black());

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                match trimmed {
                    "exit" | ".exit" => break,
                    ".reset" => {
                        match Session::new(Engine::new().with_config(config.clone())) {
                            Ok(fresh) => {
                                *session = fresh;
                                println!("{}", "engine reset".green());
                            }
                            Err(err) => eprintln!("{} {err}", "error:".red().bold()),
                        }
                        continue;
                    }
                    _ => {}
                }

                match session.execute(trimmed) {
                    Ok(output) => println!("{}", output.bright_white()),
                    Err(err) => eprintln!("{} {err}", "error:".red().bold()),
                }
                report_finalized(session);
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "bye".bright_black());
                break;
            }
            Err(err) => return Err(err),
        }
    }

    Ok(())
}

/// Prints one line per external whose finalizer ran during the last command.
pub fn report_finalized(session: &Session) {
    for label in session.take_finalized() {
        println!("{} {label}", "finalized".magenta());
    }
}
