use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde_json::json;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use exprule::{
    RuleSet, RulesConfig, compile, context_from_json, evaluate_rules_first, export_fields,
    matches,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the expression text for a condition tree (JSON or YAML, '-' for stdin)
    Compile {
        tree: PathBuf,
    },

    /// Print the fields a condition tree reads, as a JSON array
    Fields {
        tree: PathBuf,
    },

    /// Evaluate one expression against a JSON object context
    Match {
        /// Expression text
        #[arg(short, long)]
        expr: String,

        /// Context as a JSON object; omitted means no context
        #[arg(short, long)]
        context: Option<String>,
    },

    /// Evaluate a rule file against every record of a JSON Lines input
    Check {
        /// Rule file (YAML, JSON or TOML)
        #[arg(short, long)]
        rules: PathBuf,

        /// JSON Lines input, '-' for stdin
        #[arg(short, long)]
        input: PathBuf,

        /// Number of threads (default: all cores)
        #[arg(short, long, env = "EXPRULE_THREADS")]
        threads: Option<usize>,

        /// Report only the first matching rule's value
        #[arg(long)]
        first: bool,
    },
}

pub fn run(command: &Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Compile { tree } => {
            let tree = read_tree(tree)?;
            let expression = compile(&tree).context("Compile: Invalid condition tree")?;
            writeln!(out, "{}", expression)?;
        }
        Command::Fields { tree } => {
            let tree = read_tree(tree)?;
            let fields = export_fields(&tree).context("Fields: Invalid condition tree")?;
            serde_json::to_writer(&mut *out, &fields)?;
            writeln!(out)?;
        }
        Command::Match { expr, context } => {
            let ctx = match context {
                Some(text) => {
                    let json: serde_json::Value =
                        serde_json::from_str(text).context("Match: Invalid context JSON")?;
                    context_from_json(&json).context("Match: Invalid context")?
                }
                None => None,
            };
            let hit = matches(expr, ctx.as_ref()).context("Match: Evaluation failed")?;
            writeln!(out, "{}", hit)?;
        }
        Command::Check {
            rules, input, first, ..
        } => {
            let config = RulesConfig::load(rules)
                .with_context(|| format!("Check: Failed to load rules from {:?}", rules))?;
            let set = RuleSet::compile(&config)?;
            tracing::info!(
                "Rules: {} compiled, reading fields {:?}",
                set.rules.len(),
                set.fields()
            );
            check_records(&set, input, *first, out)?;
        }
    }

    Ok(())
}

/// Evaluate each non-blank input line in parallel and write one result line
/// per record, in input order.
pub fn check_records(
    set: &RuleSet,
    input: &Path,
    first: bool,
    out: &mut impl Write,
) -> Result<()> {
    let text = read_input(input)?;
    let records: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect();

    let start = std::time::Instant::now();
    let results: Vec<serde_json::Value> = records
        .par_iter()
        .map(|(line, record)| check_record(set, *line, record, first))
        .collect();

    let mut writer = BufWriter::new(out);
    for result in &results {
        serde_json::to_writer(&mut writer, result)?;
        writeln!(writer)?;
    }
    writer.flush()?;

    tracing::info!(
        "Done! Checked {} records in {:.2}s",
        results.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn check_record(set: &RuleSet, line: usize, record: &str, first: bool) -> serde_json::Value {
    let parsed = serde_json::from_str::<serde_json::Value>(record)
        .map_err(anyhow::Error::from)
        .and_then(|json| Ok(context_from_json(&json)?));

    let ctx = match parsed {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::warn!("Input: Skipping line {}: {}", line, e);
            return json!({"line": line, "error": e.to_string()});
        }
    };

    if first {
        json!({"line": line, "value": evaluate_rules_first(set, ctx.as_ref())})
    } else {
        json!({"line": line, "matched": set.matching(ctx.as_ref())})
    }
}

/// Read a condition tree; `.yaml`/`.yml` files are YAML, anything else JSON.
pub fn read_tree(path: &Path) -> Result<serde_json::Value> {
    let text = read_input(path)?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "yaml" | "yml"));

    if is_yaml {
        serde_yaml::from_str(&text).with_context(|| format!("Input: Invalid YAML in {:?}", path))
    } else {
        serde_json::from_str(&text).with_context(|| format!("Input: Invalid JSON in {:?}", path))
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Input: Failed to read stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Input: Failed to read {:?}", path))
    }
}
