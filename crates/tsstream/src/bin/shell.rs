//! Interactive demo shell: tokenizes a line, dispatches it against one
//! in-memory series per key, and prints the reply. Exists to let a
//! developer poke at the engine without wiring up a real collaborator;
//! not a production transport.

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::collections::HashMap;
use tsstream_core::config::EngineLimits;
use tsstream_core::dispatch::{self, Command};
use tsstream_core::obs::{MetricsSink, NullSink};
use tsstream_core::reply::Reply;
use tsstream_core::testing::MemoryStream;

#[derive(Parser)]
#[command(name = "tsstream-shell", about = "Interactive REPL over an in-memory tsstream engine")]
struct Cli {
    /// Run one command non-interactively instead of starting the REPL.
    #[arg(short, long)]
    command: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    let mut series: HashMap<String, MemoryStream> = HashMap::new();
    let limits = EngineLimits::default();
    let mut metrics = NullSink;

    if let Some(line) = cli.command {
        match run_line(&line, &mut series, &limits, &mut metrics) {
            Ok(reply) => println!("{}", render(&reply)),
            Err(err) => eprintln!("(error) {err}"),
        }
        return;
    }

    let mut editor = DefaultEditor::new().expect("failed to initialise line editor");
    loop {
        match editor.readline("tsstream> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());
                match run_line(&line, &mut series, &limits, &mut metrics) {
                    Ok(reply) => println!("{}", render(&reply)),
                    Err(err) => eprintln!("(error) {err}"),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("readline error: {err}");
                break;
            }
        }
    }
}

/// The one real dispatch path in this demo: resolves a command name, runs
/// its handler, and reports the outcome to `metrics` before returning the
/// bare `Reply` to the caller — the `ExecutionTrace` each handler returns
/// alongside its reply is this crate's own business and isn't surfaced in
/// the REPL.
fn run_line(
    line: &str,
    series: &mut HashMap<String, MemoryStream>,
    limits: &EngineLimits,
    metrics: &mut impl MetricsSink,
) -> Result<Reply, String> {
    let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    let [key, command_name, args @ ..] = tokens.as_slice() else {
        return Err("expected: <key> <command> [args...]".to_string());
    };
    let command = dispatch::lookup(command_name).map_err(|e| e.to_string())?;
    if command.key_arity() != 1 {
        return Err(format!("the demo shell only supports single-key commands; '{command_name}' needs {} keys", command.key_arity()));
    }

    metrics.command_dispatched(command_name);
    let stream = series.entry(key.clone()).or_default();
    let args = args.to_vec();
    let result = match command {
        Command::Add => dispatch::add(stream, &args),
        Command::BulkAdd => dispatch::bulk_add(stream, &args),
        Command::Del => dispatch::del(stream, &args),
        Command::Size => dispatch::size(stream),
        Command::Span => dispatch::span(stream),
        Command::Exists => dispatch::exists(stream, &args),
        Command::Info => dispatch::info(stream),
        Command::Get => dispatch::get(stream, &args, limits),
        Command::Pop => dispatch::pop(stream, &args, limits),
        Command::Count => dispatch::count(stream, &args, limits),
        Command::Range => dispatch::range(stream, &args, limits),
        Command::RevRange => dispatch::revrange(stream, &args, limits),
        Command::PopRange => dispatch::poprange(stream, &args, limits),
        Command::RemRange => dispatch::remrange(stream, &args, limits),
        Command::TrimLength => dispatch::trimlength(stream, &args),
        Command::Times => dispatch::times(stream, &args),
        Command::Distinct => dispatch::distinct(stream, &args),
        Command::CountDistinct => dispatch::count_distinct(stream, &args),
        Command::BasicStats => dispatch::basic_stats(stream, &args),
        Command::Copy | Command::Merge => unreachable!("key_arity() check above excludes these"),
    };

    match result {
        Ok((reply, _trace)) => Ok(reply),
        Err(err) => {
            metrics.error_raised(err.class);
            Err(err.to_string())
        }
    }
}

fn render(reply: &Reply) -> String {
    match reply {
        Reply::Nil => "(nil)".to_string(),
        Reply::Int(n) => n.to_string(),
        Reply::Bulk(s) => s.clone(),
        Reply::Array(items) => {
            let rendered: Vec<String> = items.iter().map(render).collect();
            format!("[{}]", rendered.join(", "))
        }
    }
}
