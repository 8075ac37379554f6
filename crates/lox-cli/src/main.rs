use std::env;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use lox_cli::{CheckOptions, CliError, ColorMode, OutputFormat, Report, load_config};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const LOG_ENV: &str = "LOX_LOG";

fn main() -> ExitCode {
    setup_logging();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Diagnostics) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .with(filter)
        .try_init();
}

/// Options shared by every command that reads a file.
#[derive(Debug, Default)]
struct Args {
    path: Option<PathBuf>,
    json: bool,
    types: bool,
    color: Option<ColorMode>,
    config: Option<PathBuf>,
}

fn parse_args(rest: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();
    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => args.json = true,
            "--types" => args.types = true,
            "--color" => {
                let value = iter.next().ok_or_else(|| {
                    CliError::InvalidCommand("--color expects auto, always or never".to_string())
                })?;
                let mode = ColorMode::parse(value).ok_or_else(|| {
                    CliError::InvalidCommand(format!("unknown color mode `{value}`"))
                })?;
                args.color = Some(mode);
            }
            "--config" => {
                let value = iter.next().ok_or_else(|| {
                    CliError::InvalidCommand("--config expects a path".to_string())
                })?;
                args.config = Some(PathBuf::from(value));
            }
            flag if flag.starts_with('-') => {
                return Err(CliError::InvalidCommand(format!("unknown flag `{flag}`")));
            }
            path => {
                if args.path.is_some() {
                    return Err(CliError::InvalidCommand(format!(
                        "unexpected argument `{path}`"
                    )));
                }
                args.path = Some(PathBuf::from(path));
            }
        }
    }
    Ok(args)
}

fn run() -> Result<(), CliError> {
    let mut args = env::args().skip(1);
    let Some(command) = args.next() else {
        print_help();
        return Ok(());
    };
    let rest: Vec<String> = args.collect();

    match command.as_str() {
        "-h" | "--help" | "help" => {
            print_help();
            Ok(())
        }
        "-V" | "--version" | "version" => {
            println!("lox {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "check" | "parse" | "tokens" => {
            let args = parse_args(&rest)?;
            let Some(path) = args.path.as_deref() else {
                return Err(CliError::InvalidCommand(format!("`{command}` expects a file")));
            };
            let source = std::fs::read_to_string(path)?;
            let display = path.display().to_string();
            let config = load_config(args.config.as_deref(), Path::new("."))?;
            let color = args.color.unwrap_or(config.output.color);
            let use_color = color.enabled(io::stderr().is_terminal());

            let report = match command.as_str() {
                "check" => {
                    let mut options = CheckOptions::from_config(&config, false);
                    options.use_color = use_color;
                    options.show_types |= args.types;
                    if args.json {
                        options.format = OutputFormat::Json;
                    }
                    lox_cli::check_source(&display, &source, options)?
                }
                "parse" => lox_cli::parse_source(&display, &source, use_color),
                _ => lox_cli::tokens_source(&display, &source, use_color),
            };
            emit(&report)?;
            if report.failed {
                return Err(CliError::Diagnostics);
            }
            Ok(())
        }
        other => Err(CliError::InvalidCommand(format!(
            "unknown command `{other}`, see `lox --help`"
        ))),
    }
}

fn emit(report: &Report) -> Result<(), CliError> {
    io::stdout().write_all(report.stdout.as_bytes())?;
    io::stderr().write_all(report.stderr.as_bytes())?;
    Ok(())
}

fn print_help() {
    println!(
        "lox {}\n\n\
         USAGE:\n  lox <command> <file> [options]\n\n\
         COMMANDS:\n  \
         check <file>   type-check a program and report diagnostics\n  \
         parse <file>   print the syntax tree\n  \
         tokens <file>  print one token per line\n\n\
         OPTIONS:\n  \
         --types            print the inferred type of every expression (check)\n  \
         --json             print a JSON report (check)\n  \
         --color <mode>     auto, always or never\n  \
         --config <path>    read settings from this file instead of ./lox.toml\n  \
         -h, --help         print this help\n  \
         -V, --version      print the version\n\n\
         Set {LOG_ENV} (e.g. {LOG_ENV}=debug) to enable checker logging.",
        env!("CARGO_PKG_VERSION")
    );
}
