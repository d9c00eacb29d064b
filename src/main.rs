mod report;

use scriptshift::{Direction, Options, Registry, transliterate_verbose};
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

const DEFAULT_ID: &str = "Any-Latin";
const LOG_ENV: &str = "SCRIPTSHIFT_LOG";

fn main() {
    setup_tracing();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(&config) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn run(config: &CliConfig) -> scriptshift::Result<()> {
    let registry = Registry::with_builtins(Options::default())?;
    if config.list {
        for id in registry.available_ids() {
            println!("{id}");
        }
        return Ok(());
    }

    let direction = if config.reverse { Direction::Reverse } else { Direction::Forward };
    let translit = match &config.rules {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            let id = path.file_stem().and_then(|s| s.to_str()).unwrap_or("Rules");
            registry.create_from_rules(id, &text, direction)?
        }
        None => registry.get_instance(&config.id, direction)?,
    };

    let details = transliterate_verbose(&translit, &config.input, config.incremental)?;
    report::print_run(&config.input, &details, config.color);
    Ok(())
}

struct CliConfig {
    input: String,
    id: String,
    rules: Option<PathBuf>,
    reverse: bool,
    incremental: bool,
    list: bool,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut input: Option<String> = None;
    let mut id: Option<String> = None;
    let mut rules: Option<PathBuf> = None;
    let mut reverse = false;
    let mut incremental = false;
    let mut list = false;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1).peekable();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("scriptshift {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "-r" | "--reverse" => reverse = true,
            "--incremental" => incremental = true,
            "--list" => list = true,
            "-t" | "--id" => {
                let value = args.next().ok_or_else(|| format!("error: {arg} expects a value"))?;
                id = Some(value);
            }
            "--rules" => {
                let value = args.next().ok_or_else(|| "error: --rules expects a file".to_string())?;
                rules = Some(PathBuf::from(value));
            }
            "--" => {
                let rest = args.collect::<Vec<_>>().join(" ");
                if !rest.is_empty() {
                    input = Some(rest);
                }
                break;
            }
            _ if arg.starts_with("--id=") => id = Some(arg.trim_start_matches("--id=").to_string()),
            _ if arg.starts_with("--rules=") => rules = Some(PathBuf::from(arg.trim_start_matches("--rules="))),
            _ if arg.starts_with('-') && arg.len() > 1 => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                input = Some(std::iter::once(arg).chain(args).collect::<Vec<_>>().join(" "));
                break;
            }
        }
    }

    if id.is_some() && rules.is_some() {
        return Err("error: --id and --rules are mutually exclusive".to_string());
    }
    let id = id.unwrap_or_else(|| DEFAULT_ID.to_string());

    if list {
        return Ok(CliConfig { input: String::new(), id, rules, reverse, incremental, list, color });
    }

    let input = match input {
        Some(value) => value,
        None => read_stdin_input()?,
    };
    if input.is_empty() {
        return Err(format!("error: no input provided\n\n{}", help_text()));
    }

    Ok(CliConfig { input, id, rules, reverse, incremental, list, color })
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    if buffer.ends_with('\n') {
        buffer.pop();
    }
    Ok(buffer)
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "scriptshift {version}

Rule-based transliteration CLI.

Usage:
  scriptshift [OPTIONS] [--] <input...>

Options:
  -t, --id <ID>              Transliterator ID, possibly compound.
                             Default: {default_id}
  --rules <file>             Compile rules from a file instead of using an ID.
  -r, --reverse              Use the reverse direction.
  --incremental              Type the input one character at a time and show
                             each step.
  --list                     List registered IDs and exit.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Input is read from stdin when no arguments are given.
Set {log_env} (e.g. {log_env}=debug) to control log output on stderr.

Exit codes:
  0  Success.
  1  Transliteration or compile error.
  2  Invalid arguments or missing input.
",
        version = env!("CARGO_PKG_VERSION"),
        default_id = DEFAULT_ID,
        log_env = LOG_ENV,
    )
}
