use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use hcapi_rs::{Catalog, Client, ClientConfig, Content, OutputFormat, Query};
use hcapi_rs::storage;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "hcapi",
    version,
    about = "Query the HarvestChoice CELL5M API and save or summarize the results"
)]
struct Cli {
    /// Service base URL (overrides HCAPI_URL and .hcapirc).
    #[arg(long, global = true)]
    url: Option<String>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a query (and optionally save, extract, and print a summary).
    Query(QueryArgs),
    /// List or search indicator codes.
    Indicators(IndicatorArgs),
    /// List country and region codes.
    Countries,
    /// List colour palettes.
    Palettes,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FileFormat {
    Csv,
    Tif,
    Dta,
    Asc,
    Grd,
    Rds,
}

impl From<FileFormat> for OutputFormat {
    fn from(f: FileFormat) -> Self {
        match f {
            FileFormat::Csv => OutputFormat::Csv,
            FileFormat::Tif => OutputFormat::Tif,
            FileFormat::Dta => OutputFormat::Dta,
            FileFormat::Asc => OutputFormat::Asc,
            FileFormat::Grd => OutputFormat::Grd,
            FileFormat::Rds => OutputFormat::Rds,
        }
    }
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Indicator codes separated by comma or semicolon (e.g., cass_y,maiz_y)
    #[arg(short, long)]
    indicators: String,
    /// Country/region ISO3 codes separated by comma or semicolon (default SSA)
    #[arg(short, long, default_value = "SSA")]
    countries: String,
    /// Group-by fields separated by comma or semicolon (e.g., ADM1_NAME_ALT)
    #[arg(short, long)]
    by: Option<String>,
    /// Package the result as a file bundle in this format.
    #[arg(short, long, value_enum)]
    format: Option<FileFormat>,
    /// Fetch the rendered map instead of data.
    #[arg(long, default_value_t = false)]
    plot: bool,
    /// Extra request option as key=value (value parsed as JSON if possible). Repeatable.
    #[arg(short = 'o', long = "option")]
    options: Vec<String>,
    /// Save the result to this path (.csv/.json for tables, raw bytes otherwise).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Unpack a zip bundle into this directory.
    #[arg(long)]
    extract: Option<PathBuf>,
    /// Print the result summary to stdout (default when nothing is saved).
    #[arg(long, default_value_t = false)]
    summary: bool,
}

#[derive(Args, Debug)]
struct IndicatorArgs {
    /// Case-insensitive regex over codes and labels.
    #[arg(short, long)]
    search: Option<String>,
    /// Top-level category (e.g., Farming).
    #[arg(long)]
    category: Option<String>,
}

fn parse_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn parse_option(s: &str) -> Result<(String, Value)> {
    let (k, v) = s
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("invalid --option {s:?}, expected key=value"))?;
    let value = serde_json::from_str(v).unwrap_or_else(|_| Value::String(v.to_string()));
    Ok((k.trim().to_string(), value))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Query(args) => cmd_query(cli.url, args),
        Command::Indicators(args) => cmd_indicators(args),
        Command::Countries => {
            let catalog = Catalog::bundled()?;
            for c in catalog.countries() {
                println!("{}\t{}", c.code, c.label);
            }
            Ok(())
        }
        Command::Palettes => {
            let catalog = Catalog::bundled()?;
            for p in catalog.palettes() {
                let hex: Vec<String> = p.colors.iter().map(|c| c.to_hex()).collect();
                println!("{}\t{}", p.name, hex.join(" "));
            }
            Ok(())
        }
    }
}

fn cmd_indicators(args: IndicatorArgs) -> Result<()> {
    let catalog = Catalog::bundled()?;
    let mut rows = match &args.category {
        Some(cat) => catalog.indicators_in_category(cat),
        None => catalog.indicators().iter().collect(),
    };
    if let Some(pattern) = &args.search {
        let hits = catalog.search_indicators(pattern)?;
        rows.retain(|m| hits.iter().any(|h| h.code == m.code));
    }
    for m in rows {
        println!(
            "{}\t{}\t{}\t{}",
            m.code,
            m.label,
            m.unit.as_deref().unwrap_or("-"),
            m.category_path()
        );
    }
    Ok(())
}

fn cmd_query(url: Option<String>, args: QueryArgs) -> Result<()> {
    let config = ClientConfig::resolve(url).context("resolve configuration")?;
    let client = Client::with_config(config)?;

    let mut query = Query::new(parse_list(&args.indicators))
        .countries(parse_list(&args.countries))
        .plot(args.plot);
    if let Some(by) = &args.by {
        query = query.group_by(parse_list(by));
    }
    if let Some(f) = args.format {
        query = query.format(f.into());
    }
    for opt in &args.options {
        let (k, v) = parse_option(opt)?;
        query = query.option(k, v);
    }

    let result = client
        .query(&query)
        .with_context(|| format!("query {} at {}", args.indicators, client.base_url()))?;

    if let Some(path) = args.out.as_ref() {
        storage::save_result(&result, path)?;
        eprintln!(
            "Saved {} result to {}",
            result.meta().kind,
            path.display()
        );
    }

    if let Some(dir) = args.extract.as_ref() {
        match result.content() {
            Content::Archive(bytes) => {
                let files = storage::extract_archive(bytes, dir)?;
                eprintln!("Extracted {} file(s) to {}", files.len(), dir.display());
            }
            _ => anyhow::bail!("--extract needs a file bundle; pass --format"),
        }
    }

    if args.summary || (args.out.is_none() && args.extract.is_none()) {
        print!("{result}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_split_on_comma_and_semicolon() {
        assert_eq!(parse_list("cass_y, maiz_y;;rice_y"), vec!["cass_y", "maiz_y", "rice_y"]);
    }

    #[test]
    fn options_parse_json_or_fall_back_to_string() {
        assert_eq!(parse_option("collapse=true").unwrap(), ("collapse".into(), Value::Bool(true)));
        assert_eq!(
            parse_option("label=Lagunes").unwrap(),
            ("label".into(), Value::String("Lagunes".into()))
        );
        assert!(parse_option("novalue").is_err());
    }
}
