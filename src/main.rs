mod corpus;
mod debug_report;

use rockwell::{MAX_OPTIONAL, Tagger};
use std::io::{self, IsTerminal, Read};
use tracing::subscriber::SetGlobalDefaultError;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "ROCKWELL_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

fn main() {
    init_logging();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let tagger = match load_tagger(&config) {
        Ok(tagger) => tagger,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let sentences = match read_input(config.input.as_deref()).and_then(|text| corpus::parse_sentences(&text)) {
        Ok(sentences) => sentences,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    for sentence in &sentences {
        match tagger.tag_with_metrics(sentence) {
            Ok(run) => debug_report::print_run(sentence, &run, config.color),
            Err(err) => warn!(sentence = sentence.id, error = %err, "sentence skipped"),
        }
    }
}

/// Logs go to stderr so the report on stdout stays clean. The filter comes
/// from `ROCKWELL_LOG` (e.g. `rockwell=trace`).
fn init_logging() {
    if let Err(err) = try_init_logging() {
        eprintln!("warning: logging not initialised: {err}");
    }
}

fn try_init_logging() -> Result<(), SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).with_target(true).finish();
    tracing::subscriber::set_global_default(subscriber)
}

struct CliConfig {
    script: String,
    input: Option<String>,
    max_optional: usize,
    cursor_skip: bool,
    color: bool,
}

fn load_tagger(config: &CliConfig) -> Result<Tagger, String> {
    let script = std::fs::read_to_string(&config.script)
        .map_err(|err| format!("error: failed to read script '{}': {err}", config.script))?;
    Tagger::builder()
        .script(script)
        .max_optional(config.max_optional)
        .cursor_skip(config.cursor_skip)
        .build()
        .map_err(|err| format!("error: {}: {err}", config.script))
}

fn parse_args() -> Result<CliConfig, String> {
    let mut script: Option<String> = None;
    let mut input: Option<String> = None;
    let mut max_optional = MAX_OPTIONAL;
    let mut cursor_skip = true;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("rockwell {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--no-skip" => cursor_skip = false,
            "--script" | "-s" => {
                let value = args.next().ok_or_else(|| "error: --script expects a file".to_string())?;
                set_once(&mut script, value, "script")?;
            }
            "--input" | "-i" => {
                let value = args.next().ok_or_else(|| "error: --input expects a file".to_string())?;
                set_once(&mut input, value, "input")?;
            }
            "--max-optional" => {
                let value = args.next().ok_or_else(|| "error: --max-optional expects a number".to_string())?;
                max_optional = parse_max_optional(&value)?;
            }
            _ if arg.starts_with("--script=") => set_once(&mut script, arg["--script=".len()..].to_string(), "script")?,
            _ if arg.starts_with("--input=") => set_once(&mut input, arg["--input=".len()..].to_string(), "input")?,
            _ if arg.starts_with("--max-optional=") => {
                max_optional = parse_max_optional(&arg["--max-optional=".len()..])?;
            }
            _ => return Err(format!("error: unknown argument '{arg}'")),
        }
    }

    let Some(script) = script else {
        return Err(format!("error: no script provided\n\n{}", help_text()));
    };
    Ok(CliConfig { script, input, max_optional, cursor_skip, color })
}

fn set_once(slot: &mut Option<String>, value: String, what: &str) -> Result<(), String> {
    if slot.is_some() {
        return Err(format!("error: {what} provided multiple times"));
    }
    *slot = Some(value);
    Ok(())
}

fn parse_max_optional(value: &str) -> Result<usize, String> {
    value.parse().map_err(|_| format!("error: invalid --max-optional '{value}' (expected a non-negative integer)"))
}

fn read_input(path: Option<&str>) -> Result<String, String> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|err| format!("error: failed to read input '{path}': {err}")),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
            Ok(buffer)
        }
    }
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "rockwell {version}

Tag tokenized sentences with a Rockwell script.

Usage:
  rockwell --script <file> [OPTIONS]

Input is read from --input or stdin, one token per line:
  word<TAB>lemma<TAB>pos[<TAB>type]
Ambiguous tokens separate readings with '|' (VVB|NN1), optionally with one
lemma per reading. A blank line ends a sentence.

Options:
  -s, --script <file>        Rockwell script to compile (required).
  -i, --input <file>         Token file. Default: stdin.
  --max-optional <n>         Cap on consecutive quodlibet captures.
                             Default: {max_optional}
  --no-skip                  Let every token start new matches instead of
                             jumping past completed ones.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  {log_env}               Log filter (e.g. rockwell=debug). Default: {default_filter}

Exit codes:
  0  Success (sentences that fail are logged and skipped).
  2  Invalid arguments, unreadable files or a malformed script.
",
        version = env!("CARGO_PKG_VERSION"),
        max_optional = MAX_OPTIONAL,
        log_env = LOG_ENV,
        default_filter = DEFAULT_LOG_FILTER,
    )
}
