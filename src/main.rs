//! # tdplan CLI
//!
//! ## Usage
//!
//! ```bash
//! # Best plan for a DNF condition
//! tdplan search "(c > 0 AND l > 0) OR (r > 0)"
//!
//! # Every candidate, CNF, as JSON
//! tdplan search --form cnf --all --json "(a = 1 OR b = 2) AND (c = 3)"
//!
//! # Run the best plan over a CSV file
//! tdplan search --data rows.csv "(c > 0 AND l > 0) OR (r > 0)"
//!
//! # Interactive session
//! tdplan repl
//! ```
//!
//! Logging goes to stderr. `TDPLAN_LOG` overrides `logging.level`, e.g.
//! `TDPLAN_LOG=tdplan=debug`.

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use tdplan::config::LoggingConfig;
use tdplan::{Config, Executor, NormalForm, Planner, SearchOutcome, Table};

static TRACE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Top-down plan search for boolean filter conditions
#[derive(Parser, Debug)]
#[command(name = "tdplan")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to config.toml + config.local.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search plans for one expression and exit
    Search {
        /// Filter condition, e.g. "(c > 0 AND l > 0) OR (r > 0)"
        expression: String,

        /// Normal form of the expression (dnf, cnf)
        #[arg(long)]
        form: Option<NormalForm>,

        /// Print every candidate, not only the best
        #[arg(long)]
        all: bool,

        /// Emit the search outcome as JSON
        #[arg(long)]
        json: bool,

        /// Reuse sub-plans across predicate orders
        #[arg(long)]
        memoize: bool,

        /// CSV file to run the best plan against
        #[arg(long)]
        data: Option<PathBuf>,
    },

    /// Interactive planning session
    Repl {
        /// Initial normal form (dnf, cnf)
        #[arg(long)]
        form: Option<NormalForm>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(&path.to_string_lossy())
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::load().unwrap_or_else(|e| {
            eprintln!("Using default configuration ({e})");
            Config::default()
        }),
    };

    init_tracing(&config.logging);

    match cli.command {
        Command::Search {
            expression,
            form,
            all,
            json,
            memoize,
            data,
        } => {
            let mut config = config;
            config.search.memoize |= memoize;
            let planner = Planner::new(config);
            let form = form.unwrap_or(planner.config().search.default_form);
            let parsed = tdplan::parser::parse_expression(&expression, form)?;
            let outcome = planner.plan(&parsed)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_outcome(&parsed, &outcome, all);
            }

            if let (Some(path), Some(best)) = (data, outcome.best_plan()) {
                let table = Table::load_csv(&path)
                    .with_context(|| format!("loading {}", path.display()))?;
                print_execution(&table, &parsed, best)?;
            }
            Ok(())
        }
        Command::Repl { form } => {
            let planner = Planner::new(config);
            let form = form.unwrap_or(planner.config().search.default_form);
            run_repl(&planner, form)
        }
    }
}

fn print_outcome(expression: &tdplan::BooleanExp, outcome: &SearchOutcome, all: bool) {
    println!("Expression: {expression} [{}]", expression.form());

    if outcome.is_trivial() {
        match expression.resolution().value() {
            Some(value) => println!("Expression is trivially {value}; no plan needed"),
            None => println!("Expression has no predicates; no plan needed"),
        }
        return;
    }

    if all {
        for (i, candidate) in outcome.candidates.iter().enumerate() {
            println!();
            println!(
                "Candidate {} (root: {}, cost: {})",
                i + 1,
                candidate.predicate,
                candidate.cost
            );
            print!("{}", candidate.plan);
        }
    }

    if let Some(best) = &outcome.best {
        println!();
        println!("Best plan (root: {}, cost: {})", best.predicate, best.cost);
        print!("{}", best.plan);
    }

    let stats = &outcome.stats;
    println!();
    println!(
        "{} candidates, {} expansions, terminals: {} true / {} false / {} open, memo hits: {}",
        outcome.candidates.len(),
        stats.expansions,
        stats.terminal_true,
        stats.terminal_false,
        stats.terminal_undetermined,
        stats.memo_hits
    );
}

fn print_execution(
    table: &Table,
    expression: &tdplan::BooleanExp,
    plan: &tdplan::PlanTree,
) -> Result<()> {
    let leaves = Executor::new(table).execute(plan)?;
    println!();
    println!("Execution over {} rows:", table.len());
    for leaf in leaves {
        let path = plan.path_assignments(leaf.parent, leaf.branch);
        let outcome = expression.apply_all(&path).resolution();
        let path: Vec<String> = path.iter().map(ToString::to_string).collect();
        println!(
            "  {} -> {:?}: {} rows",
            path.join(", "),
            outcome,
            leaf.rows.len()
        );
    }
    Ok(())
}

fn run_repl(planner: &Planner, mut form: NormalForm) -> Result<()> {
    println!("tdplan REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("Enter a condition to plan it. Type .help for commands.");
    println!();

    let mut editor = DefaultEditor::new()?;
    let mut show_all = false;

    loop {
        match editor.readline(&format!("tdplan({form})> ")) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);

                if let Some(command) = line.strip_prefix('.') {
                    let parts: Vec<&str> = command.split_whitespace().collect();
                    match parts.as_slice() {
                        ["quit" | "exit" | "q"] => break,
                        ["help" | "h"] => print_help(),
                        ["form", name] => match name.parse() {
                            Ok(f) => form = f,
                            Err(e) => eprintln!("Error: {e}"),
                        },
                        ["form"] => println!("{form}"),
                        ["all"] => {
                            show_all = !show_all;
                            println!("Show all candidates: {show_all}");
                        }
                        _ => println!("Unknown command: {line}. Type .help for commands"),
                    }
                    continue;
                }

                match tdplan::parser::parse_expression(line, form)
                    .and_then(|exp| planner.plan(&exp).map(|outcome| (exp, outcome)))
                {
                    Ok((exp, outcome)) => print_outcome(&exp, &outcome, show_all),
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Use .quit or Ctrl-D to exit");
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  <condition>       - Plan a condition in the current form");
    println!("  .form [dnf|cnf]   - Show or set the normal form");
    println!("  .all              - Toggle printing every candidate");
    println!("  .help             - Show this help");
    println!("  .quit             - Exit");
}

fn init_tracing(logging_config: &LoggingConfig) {
    // TDPLAN_LOG takes precedence over the configured level
    let level = env::var("TDPLAN_LOG")
        .ok()
        .unwrap_or_else(|| logging_config.level.clone());
    let json = logging_config.format == "json";

    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());
    let _ = TRACE_GUARD.set(guard);

    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let base = || {
        tracing_subscriber::fmt()
            .with_env_filter(filter.clone())
            .with_ansi(false)
            .with_writer(non_blocking.clone())
    };

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if json {
        Box::new(base().json().finish())
    } else {
        Box::new(base().compact().finish())
    };

    let _ = tracing::subscriber::set_global_default(subscriber);
}
