//! vibeexpr - evaluate a bound expression over rows loaded from JSON

use anyhow::{bail, Context, Result};
use clap::Parser as ClapParser;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use vibeexpr::access::{DataType, Value};
use vibeexpr::expression::{type_check_expression, Expression, InterpretedPredicate};

/// vibeexpr - three-valued expression evaluator
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file holding the bound expression tree
    #[arg(short, long)]
    expr: PathBuf,

    /// JSON file holding an array of rows
    #[arg(short, long)]
    rows: PathBuf,

    /// Input column types, comma separated (e.g. int32,varchar)
    #[arg(short, long, value_delimiter = ',', value_parser = parse_data_type)]
    schema: Option<Vec<DataType>>,

    /// Print only the rows the expression accepts; unknown rejects a row
    #[arg(short, long)]
    filter: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn parse_data_type(name: &str) -> Result<DataType, String> {
    match name.trim().to_ascii_lowercase().as_str() {
        "boolean" | "bool" => Ok(DataType::Boolean),
        "int32" | "int" => Ok(DataType::Int32),
        "int64" | "bigint" => Ok(DataType::Int64),
        "float64" | "double" => Ok(DataType::Float64),
        "varchar" | "string" => Ok(DataType::Varchar),
        "binary" => Ok(DataType::Binary),
        "null" => Ok(DataType::Null),
        other => Err(format!("unknown data type: {}", other)),
    }
}

fn load_expression(path: &Path) -> Result<Expression> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read expression file {}", path.display()))?;
    serde_json::from_str(&text).context("Failed to parse expression")
}

fn load_rows(path: &Path) -> Result<Vec<Vec<Value>>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read rows file {}", path.display()))?;
    serde_json::from_str(&text).context("Failed to parse rows")
}

/// JSON text of a row; JSON has no NaN or infinity, so such rows are refused
fn row_to_json(row: &[Value]) -> Result<String> {
    if let Some(value) = row
        .iter()
        .find(|value| matches!(value, Value::Float64(f) if !f.is_finite()))
    {
        bail!("{} cannot be written as JSON", value);
    }
    Ok(serde_json::to_string(row)?)
}

/// Evaluate the expression over every row and return the output lines
fn run(args: &Args) -> Result<Vec<String>> {
    let expr = load_expression(&args.expr)?;
    let rows = load_rows(&args.rows)?;
    info!("Evaluating {} over {} row(s)", expr, rows.len());

    let output_type = match &args.schema {
        Some(schema) => type_check_expression(&expr, schema).context("Type check failed")?,
        None => expr.data_type().context("Expression is not resolved")?,
    };
    debug!("Expression result type: {:?}", output_type);

    let mut lines = Vec::new();
    if args.filter {
        let schema = args
            .schema
            .as_deref()
            .context("--filter requires --schema")?;
        let predicate =
            InterpretedPredicate::from_bound(expr, schema).context("Invalid filter predicate")?;

        for (i, row) in rows.iter().enumerate() {
            if predicate
                .accepts(row)
                .with_context(|| format!("Failed to evaluate row {}", i))?
            {
                let line =
                    row_to_json(row).with_context(|| format!("Failed to write row {}", i))?;
                lines.push(line);
            }
        }
    } else {
        for (i, row) in rows.iter().enumerate() {
            let value = expr
                .evaluate(row)
                .with_context(|| format!("Failed to evaluate row {}", i))?;
            lines.push(format!("row {}: {}", i, value));
        }
    }

    Ok(lines)
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    for line in run(&args)? {
        println!("{}", line);
    }

    Ok(())
}
