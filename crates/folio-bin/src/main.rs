//! Folio entrypoint.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use core_config::{Config, EditorSettings, load_from};
use core_events::Tick;
use core_model::{EditorModel, write_markup};
use core_paste::sanitize;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tokio::io::{AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

mod report;
mod session;

use report::{find_report, page_reports, pages_json, pages_text, paginate, stats_report};
use session::Session;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "folio", version, about = "Manuscript editing engine")]
struct Args {
    /// Configuration file (overrides discovery of `folio.toml`).
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,
    /// Manuscript to open: `.html`/`.htm` is markup, anything else plain text.
    file: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Word, character and paragraph counts.
    Stats,
    /// Page count and per-page previews.
    Pages {
        #[arg(long)]
        json: bool,
    },
    /// List case-insensitive matches with context.
    Find { query: String },
    /// Replace every match and print (or write) the resulting markup.
    Replace {
        query: String,
        replacement: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Treat FILE as clipboard markup and print the sanitized result.
    Sanitize,
    /// Read editing commands from stdin (`help` lists them).
    Session {
        /// Write markup here on `save`.
        #[arg(long)]
        save_to: Option<PathBuf>,
    },
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("folio.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, "folio.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(false)
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(_) => Some(guard),
        // Global subscriber already installed; dropping the guard shuts the writer down.
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn load_settings(path: Option<PathBuf>) -> Result<EditorSettings> {
    let config: Config = load_from(path)?;
    if let Some(source) = &config.source {
        info!(target: "runtime.startup", config = %source.display(), "config_applied");
    }
    Ok(config.settings())
}

async fn run(args: Args) -> Result<()> {
    let settings = load_settings(args.config.clone())?;
    let mut stdout = tokio::io::stdout();

    let open = || -> Result<EditorModel> {
        let model = EditorModel::open(&args.file, settings)?;
        info!(target: "runtime.startup", file = %args.file.display(), "bootstrap_complete");
        Ok(model)
    };

    let output = match &args.command {
        Command::Sanitize => {
            let raw = std::fs::read_to_string(&args.file)
                .with_context(|| format!("reading {}", args.file.display()))?;
            format!("{}\n", sanitize(&raw))
        }
        Command::Stats => stats_report(&open()?),
        Command::Pages { json } => {
            let mut model = open()?;
            paginate(&mut model);
            let pages = page_reports(&model);
            if *json {
                format!("{}\n", pages_json(&pages)?)
            } else {
                pages_text(&pages)
            }
        }
        Command::Find { query } => find_report(&open()?.text(), query),
        Command::Replace {
            query,
            replacement,
            output,
        } => {
            let mut model = open()?;
            model.set_query(query);
            let outcome = model.replace_all(replacement, Tick::ZERO);
            info!(target: "runtime", ?outcome, "replace_finished");
            let markup = model.save();
            match output {
                Some(path) => {
                    write_markup(path, &markup)?;
                    format!("{outcome:?} -> {}\n", path.display())
                }
                None => format!("{markup}\n"),
            }
        }
        Command::Session { save_to } => {
            let mut session = Session::new(open()?, save_to.clone());
            let stdin = BufReader::new(tokio::io::stdin());
            session.run(stdin, &mut stdout).await?;
            return Ok(());
        }
    };
    stdout.write_all(output.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _log_guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    let result = run(args).await;
    if let Err(err) = &result {
        warn!(target: "runtime", error = %err, "command_failed");
    }
    info!(target: "runtime", "shutdown");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_replace_with_output() {
        let args = Args::try_parse_from([
            "folio", "draft.html", "replace", "cat", "dog", "--output", "out.html",
        ])
        .unwrap();
        match args.command {
            Command::Replace {
                query,
                replacement,
                output,
            } => {
                assert_eq!(query, "cat");
                assert_eq!(replacement, "dog");
                assert_eq!(output, Some(PathBuf::from("out.html")));
            }
            other => panic!("expected Replace, got {other:?}"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let args =
            Args::try_parse_from(["folio", "a.txt", "pages", "--json", "--config", "f.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("f.toml")));
        assert!(matches!(args.command, Command::Pages { json: true }));
    }

    #[tokio::test]
    async fn replace_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.html");
        let output = dir.path().join("out.html");
        std::fs::write(&input, "<p>cat and Cat</p>").unwrap();
        let argv: [&std::ffi::OsStr; 7] = [
            "folio".as_ref(),
            input.as_os_str(),
            "replace".as_ref(),
            "cat".as_ref(),
            "dog".as_ref(),
            "-o".as_ref(),
            output.as_os_str(),
        ];
        let args = Args::try_parse_from(argv).unwrap();
        run(args).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "<p>dog and dog</p>"
        );
    }
}
