use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use rayon::prelude::*;

use bindery::{BindingEngine, EngineOpts, Value};

#[derive(Parser, Debug)]
#[command(name = "bindery", version)]
struct Cli {
    /// Engine options JSON.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging on stderr (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse an expression and print its tree.
    Parse(ParseArgs),
    /// Evaluate an expression against a JSON document.
    Eval(EvalArgs),
    /// Print the member paths an expression observes.
    Paths(PathsArgs),
    /// Parse every line of a file and report the ones that fail.
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
struct ParseArgs {
    expression: String,

    /// Also print the compiled program.
    #[arg(long, default_value_t = false)]
    ops: bool,

    /// Treat the input as `;`-separated binding declarations.
    #[arg(long, default_value_t = false)]
    bindings: bool,
}

#[derive(Parser, Debug)]
struct EvalArgs {
    expression: String,

    /// JSON document the expression is evaluated against. Null when omitted.
    #[arg(long)]
    data: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct PathsArgs {
    expression: String,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// File with one expression per line. Blank lines and `#` comments are skipped.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Override rayon worker threads.
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let engine = BindingEngine::with_opts(load_opts(cli.config.as_deref())?);
    match cli.cmd {
        Command::Parse(args) => cmd_parse(&engine, args),
        Command::Eval(args) => cmd_eval(&engine, args),
        Command::Paths(args) => cmd_paths(&engine, args),
        Command::Check(args) => cmd_check(&engine, args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_opts(path: Option<&Path>) -> anyhow::Result<EngineOpts> {
    let Some(path) = path else {
        return Ok(EngineOpts::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config '{}'", path.display()))?;
    EngineOpts::from_json_str(&text).with_context(|| format!("parse config '{}'", path.display()))
}

fn cmd_parse(engine: &BindingEngine, args: ParseArgs) -> anyhow::Result<()> {
    if args.bindings {
        let bindings = engine.try_parse_bindings(&args.expression, None)?;
        for binding in bindings {
            match &binding.source {
                Some(source) => println!("{} <- {source}", binding.target),
                None => println!("{} <- .", binding.target),
            }
            for (key, value) in &binding.parameters {
                println!("  {key} = {value}");
            }
        }
        return Ok(());
    }

    let node = engine.parse(&args.expression, None)?;
    println!("{node}");
    if args.ops {
        let compiled = engine
            .compile(&node, None)
            .with_context(|| format!("compile '{}'", args.expression))?;
        print!("{}", bindery::disassemble(&compiled));
    }
    Ok(())
}

fn cmd_eval(engine: &BindingEngine, args: EvalArgs) -> anyhow::Result<()> {
    let target = match &args.data {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read data '{}'", path.display()))?;
            let json: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("parse data '{}'", path.display()))?;
            bindery::value_from_json(&json)
        }
        None => Value::Null,
    };
    let value = engine
        .evaluate(&target, &args.expression)
        .with_context(|| format!("evaluate '{}'", args.expression))?;
    println!("{}", serde_json::to_string(&bindery::value_to_json(&value))?);
    Ok(())
}

fn cmd_paths(engine: &BindingEngine, args: PathsArgs) -> anyhow::Result<()> {
    let node = engine.parse(&args.expression, None)?;
    for path in engine.observed_paths(&node) {
        println!("{path}");
    }
    Ok(())
}

fn cmd_check(engine: &BindingEngine, args: CheckArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.in_path)
        .with_context(|| format!("read '{}'", args.in_path.display()))?;
    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .collect();

    let run = || -> Vec<(usize, String)> {
        lines
            .par_iter()
            .filter_map(|&(number, line)| {
                engine
                    .parse(line, None)
                    .and_then(|node| engine.compile(&node, None))
                    .err()
                    .map(|err| (number, err.to_string()))
            })
            .collect()
    };
    let failures = match args.threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .context("build rayon pool")?
            .install(run),
        None => run(),
    };

    for (number, err) in &failures {
        println!("{}:{number}: {err}", args.in_path.display());
    }
    if !failures.is_empty() {
        anyhow::bail!("{} of {} expressions failed", failures.len(), lines.len());
    }
    eprintln!("{} expressions ok", lines.len());
    Ok(())
}
