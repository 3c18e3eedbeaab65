// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use atlas_cli::{build_atlas_from_json, diff_atlases_from_json};
use atlas_core::AtlasError;
use atlas_detect::DetectorConfig;
use atlas_watch::{DeformationConfig, Watchlist, WatchlistConfig, derive_deformation, rank_watchlist};
use serde::Serialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

const DEFAULT_RUN_ID: &str = "adhoc";

struct Cli {
    command: Command,
}

enum Command {
    Build(BuildArgs),
    Diff(DiffArgs),
    Watchlist(WatchlistArgs),
    Deform(DeformArgs),
}

#[derive(Debug)]
struct BuildArgs {
    seedpack: PathBuf,
    run_id: String,
    output: Option<PathBuf>,
}

#[derive(Debug)]
struct DiffArgs {
    base: PathBuf,
    compare: PathBuf,
    label: String,
    run_id: String,
    output: Option<PathBuf>,
}

#[derive(Debug)]
struct WatchlistArgs {
    atlas: PathBuf,
    run_id: String,
    output: Option<PathBuf>,
}

#[derive(Debug)]
struct DeformArgs {
    current: PathBuf,
    previous: Option<PathBuf>,
    run_id: String,
    output_dir: Option<PathBuf>,
}

#[derive(Debug)]
enum CliError {
    Atlas(AtlasError),
    Io {
        context: String,
        source: std::io::Error,
    },
    Json {
        context: String,
        source: serde_json::Error,
    },
    InvalidInput(String),
}

impl CliError {
    fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Atlas(AtlasError::InvalidInput(_)) | Self::InvalidInput(_) => "invalid_input",
            Self::Atlas(AtlasError::NumericalIssue(_)) => "numerical_issue",
            Self::Atlas(AtlasError::Alignment(_)) => "alignment_error",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atlas(err) => write!(f, "{err}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::Json { context, source } => write!(f, "{context}: {source}"),
            Self::InvalidInput(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Atlas(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<AtlasError> for CliError {
    fn from(value: AtlasError) -> Self {
        Self::Atlas(value)
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Serialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        emit_structured_error(&err);
        process::exit(1);
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<(), CliError> {
    let Some(cli) = parse_cli_from_env()? else {
        return Ok(());
    };

    match cli.command {
        Command::Build(args) => handle_build(args),
        Command::Diff(args) => handle_diff(args),
        Command::Watchlist(args) => handle_watchlist(args),
        Command::Deform(args) => handle_deform(args),
    }
}

fn parse_cli_from_env() -> Result<Option<Cli>, CliError> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        print_root_help();
        return Ok(None);
    }

    if matches!(args[0].as_str(), "-h" | "--help") {
        print_root_help();
        return Ok(None);
    }
    if matches!(args[0].as_str(), "-V" | "--version") {
        print_version();
        return Ok(None);
    }

    let command_name = args[0].clone();
    let rest = &args[1..];

    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print_command_help(command_name.as_str())?;
        return Ok(None);
    }

    let command = match command_name.as_str() {
        "build" => Command::Build(parse_build_args(rest)?),
        "diff" => Command::Diff(parse_diff_args(rest)?),
        "watchlist" => Command::Watchlist(parse_watchlist_args(rest)?),
        "deform" => Command::Deform(parse_deform_args(rest)?),
        _ => {
            return Err(CliError::invalid_input(format!(
                "unknown command '{command_name}'; expected one of: build, diff, watchlist, deform"
            )));
        }
    };

    Ok(Some(Cli { command }))
}

fn parse_build_args(tokens: &[String]) -> Result<BuildArgs, CliError> {
    let mut seedpack = PathBuf::new();
    let mut run_id = DEFAULT_RUN_ID.to_string();
    let mut output: Option<PathBuf> = None;

    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--seedpack" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                seedpack = PathBuf::from(raw);
            }
            "--run-id" => {
                run_id = take_flag_value(flag, inline_value, tokens, &mut idx)?;
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                output = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown build option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    if seedpack.as_os_str().is_empty() {
        return Err(CliError::invalid_input("build requires --seedpack <path>"));
    }

    Ok(BuildArgs {
        seedpack,
        run_id,
        output,
    })
}

fn parse_diff_args(tokens: &[String]) -> Result<DiffArgs, CliError> {
    let mut base = PathBuf::new();
    let mut compare = PathBuf::new();
    let mut label = String::new();
    let mut run_id = DEFAULT_RUN_ID.to_string();
    let mut output: Option<PathBuf> = None;

    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--base" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                base = PathBuf::from(raw);
            }
            "--compare" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                compare = PathBuf::from(raw);
            }
            "--label" => {
                label = take_flag_value(flag, inline_value, tokens, &mut idx)?;
            }
            "--run-id" => {
                run_id = take_flag_value(flag, inline_value, tokens, &mut idx)?;
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                output = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown diff option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    if base.as_os_str().is_empty() {
        return Err(CliError::invalid_input("diff requires --base <path>"));
    }
    if compare.as_os_str().is_empty() {
        return Err(CliError::invalid_input("diff requires --compare <path>"));
    }
    if label.is_empty() {
        label = "base_vs_compare".to_string();
    }

    Ok(DiffArgs {
        base,
        compare,
        label,
        run_id,
        output,
    })
}

fn parse_watchlist_args(tokens: &[String]) -> Result<WatchlistArgs, CliError> {
    let mut atlas = PathBuf::new();
    let mut run_id = DEFAULT_RUN_ID.to_string();
    let mut output: Option<PathBuf> = None;

    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--atlas" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                atlas = PathBuf::from(raw);
            }
            "--run-id" => {
                run_id = take_flag_value(flag, inline_value, tokens, &mut idx)?;
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                output = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown watchlist option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    if atlas.as_os_str().is_empty() {
        return Err(CliError::invalid_input("watchlist requires --atlas <path>"));
    }

    Ok(WatchlistArgs {
        atlas,
        run_id,
        output,
    })
}

fn parse_deform_args(tokens: &[String]) -> Result<DeformArgs, CliError> {
    let mut current = PathBuf::new();
    let mut previous: Option<PathBuf> = None;
    let mut run_id = DEFAULT_RUN_ID.to_string();
    let mut output_dir: Option<PathBuf> = None;

    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--current" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                current = PathBuf::from(raw);
            }
            "--previous" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                previous = Some(PathBuf::from(raw));
            }
            "--run-id" => {
                run_id = take_flag_value(flag, inline_value, tokens, &mut idx)?;
            }
            "--output-dir" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                output_dir = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown deform option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    if current.as_os_str().is_empty() {
        return Err(CliError::invalid_input("deform requires --current <path>"));
    }

    Ok(DeformArgs {
        current,
        previous,
        run_id,
        output_dir,
    })
}

fn split_flag(token: &str) -> Result<(&str, Option<String>), CliError> {
    if !token.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "unexpected positional argument '{token}'; expected --flag value"
        )));
    }
    if let Some((flag, value)) = token.split_once('=') {
        return Ok((flag, Some(value.to_string())));
    }
    Ok((token, None))
}

fn take_flag_value(
    flag: &str,
    inline_value: Option<String>,
    tokens: &[String],
    idx: &mut usize,
) -> Result<String, CliError> {
    if let Some(value) = inline_value {
        return Ok(value);
    }

    *idx += 1;
    let value = tokens
        .get(*idx)
        .ok_or_else(|| CliError::invalid_input(format!("{flag} requires a value")))?;
    if value.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "{flag} requires a value, but got option '{value}'"
        )));
    }
    Ok(value.clone())
}

fn print_version() {
    println!("atlas {}", env!("CARGO_PKG_VERSION"));
}

fn print_root_help() {
    println!(
        "atlas {}\n\nUSAGE:\n  atlas <COMMAND> [OPTIONS]\n\nCOMMANDS:\n  build      Build a sealed atlas from a seedpack JSON\n  diff       Diff two aligned atlases into a delta artifact\n  watchlist  Rank one atlas's topology into a watchlist\n  deform     Derive bridge set, alerts, and report from watchlists\n\nGLOBAL OPTIONS:\n  -h, --help      Show help\n  -V, --version   Show version\n\nRun 'atlas <COMMAND> --help' for subcommand options.",
        env!("CARGO_PKG_VERSION")
    );
}

fn print_command_help(command: &str) -> Result<(), CliError> {
    match command {
        "build" => {
            println!(
                "USAGE:\n  atlas build --seedpack <path> [OPTIONS]\n\nOPTIONS:\n  --seedpack <path>   Required seedpack JSON\n  --run-id <id>       Provenance run id (default: {DEFAULT_RUN_ID})\n  --output <path>     Write atlas JSON to file instead of stdout"
            );
            Ok(())
        }
        "diff" => {
            println!(
                "USAGE:\n  atlas diff --base <path> --compare <path> [OPTIONS]\n\nOPTIONS:\n  --base <path>       Required base atlas JSON\n  --compare <path>    Required compare atlas JSON\n  --label <string>    Comparison label (default: base_vs_compare)\n  --run-id <id>       Provenance run id (default: {DEFAULT_RUN_ID})\n  --output <path>     Write delta JSON to file instead of stdout"
            );
            Ok(())
        }
        "watchlist" => {
            println!(
                "USAGE:\n  atlas watchlist --atlas <path> [OPTIONS]\n\nOPTIONS:\n  --atlas <path>      Required atlas JSON\n  --run-id <id>       Provenance run id (default: {DEFAULT_RUN_ID})\n  --output <path>     Write watchlist JSON to file instead of stdout"
            );
            Ok(())
        }
        "deform" => {
            println!(
                "USAGE:\n  atlas deform --current <path> [OPTIONS]\n\nOPTIONS:\n  --current <path>     Required current watchlist JSON\n  --previous <path>    Optional previous watchlist JSON\n  --run-id <id>        Provenance run id (default: {DEFAULT_RUN_ID})\n  --output-dir <dir>   Write bridge_set.json, alerts.json, report.json"
            );
            Ok(())
        }
        _ => Err(CliError::invalid_input(format!(
            "unknown command '{command}'; expected one of: build, diff, watchlist, deform"
        ))),
    }
}

fn read_input(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))
}

fn write_json_output<T: Serialize>(
    payload: &T,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let encoded = serde_json::to_string_pretty(payload).map_err(|source| CliError::Json {
        context: "failed to serialize JSON output".to_string(),
        source,
    })?;

    if let Some(path) = output_path {
        fs::write(path, format!("{encoded}\n"))
            .map_err(|source| CliError::io(format!("failed to write '{}'", path.display()), source))
    } else {
        println!("{encoded}");
        Ok(())
    }
}

fn handle_build(args: BuildArgs) -> Result<(), CliError> {
    let raw = read_input(args.seedpack.as_path())?;
    let atlas = build_atlas_from_json(&raw, &DetectorConfig::default(), &args.run_id)?;
    write_json_output(&atlas, args.output.as_deref())
}

fn handle_diff(args: DiffArgs) -> Result<(), CliError> {
    let base = read_input(args.base.as_path())?;
    let compare = read_input(args.compare.as_path())?;
    let delta = diff_atlases_from_json(&base, &compare, &args.label, &args.run_id)?;
    write_json_output(&delta, args.output.as_deref())
}

fn handle_watchlist(args: WatchlistArgs) -> Result<(), CliError> {
    let raw = read_input(args.atlas.as_path())?;
    let atlas = atlas_core::AtlasPack::from_json(&raw)?;
    let watchlist = rank_watchlist(&atlas, &WatchlistConfig::default(), &args.run_id)?;
    write_json_output(&watchlist, args.output.as_deref())
}

fn handle_deform(args: DeformArgs) -> Result<(), CliError> {
    let current = Watchlist::from_json(&read_input(args.current.as_path())?)?;
    let previous = match args.previous.as_deref() {
        Some(path) => Some(Watchlist::from_json(&read_input(path)?)?),
        None => None,
    };
    let bundle = derive_deformation(
        &current,
        previous.as_ref(),
        &DeformationConfig::default(),
        &args.run_id,
    )?;

    match args.output_dir.as_deref() {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(|source| {
                CliError::io(format!("failed to create '{}'", dir.display()), source)
            })?;
            write_json_output(&bundle.bridge_set, Some(&dir.join("bridge_set.json")))?;
            write_json_output(&bundle.alerts, Some(&dir.join("alerts.json")))?;
            write_json_output(&bundle.report, Some(&dir.join("report.json")))
        }
        None => write_json_output(&bundle, None),
    }
}

fn emit_structured_error(err: &CliError) {
    let envelope = ErrorEnvelope {
        error: ErrorPayload {
            code: err.code().to_string(),
            message: err.to_string(),
        },
    };

    match serde_json::to_string_pretty(&envelope) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!(
            "{{\"error\":{{\"code\":\"{}\",\"message\":\"{}\"}}}}",
            err.code(),
            err
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_build_args, parse_deform_args, parse_diff_args, parse_watchlist_args};
    use std::path::PathBuf;

    fn tokens(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn build_args_require_a_seedpack_path() {
        let err = parse_build_args(&tokens(&["--run-id", "r1"]))
            .expect_err("missing --seedpack must fail");
        assert!(err.to_string().contains("--seedpack"));
    }

    #[test]
    fn build_args_accept_inline_flag_values() {
        let args = parse_build_args(&tokens(&["--seedpack=pack.json", "--run-id=r1"]))
            .expect("build args should parse");
        assert_eq!(args.seedpack, PathBuf::from("pack.json"));
        assert_eq!(args.run_id, "r1");
        assert!(args.output.is_none());
    }

    #[test]
    fn diff_args_default_the_label() {
        let args = parse_diff_args(&tokens(&["--base", "a.json", "--compare", "b.json"]))
            .expect("diff args should parse");
        assert_eq!(args.label, "base_vs_compare");
    }

    #[test]
    fn diff_args_reject_unknown_options() {
        let err = parse_diff_args(&tokens(&["--base", "a.json", "--bogus", "x"]))
            .expect_err("unknown flag must fail");
        assert!(err.to_string().contains("unknown diff option"));
    }

    #[test]
    fn watchlist_args_require_an_atlas_path() {
        let err = parse_watchlist_args(&tokens(&[])).expect_err("missing --atlas must fail");
        assert!(err.to_string().contains("--atlas"));
    }

    #[test]
    fn deform_args_parse_optional_previous() {
        let args = parse_deform_args(&tokens(&[
            "--current",
            "cur.json",
            "--previous",
            "prev.json",
            "--output-dir",
            "out",
        ]))
        .expect("deform args should parse");
        assert_eq!(args.current, PathBuf::from("cur.json"));
        assert_eq!(args.previous, Some(PathBuf::from("prev.json")));
        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn flag_values_cannot_be_options() {
        let err = parse_build_args(&tokens(&["--seedpack", "--run-id"]))
            .expect_err("flag-as-value must fail");
        assert!(err.to_string().contains("requires a value"));
    }
}
