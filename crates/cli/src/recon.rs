//! `rrecon run | validate | options`: config-driven billback vs. PPM reconciliation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::Subcommand;

use rebate_io::load::resolve;
use rebate_io::{default_export_name, IoError};
use rebate_recon::{
    Analysis, AnalysisOutcome, AnalysisSession, ReconConfig, ReconError, Selection,
};

use crate::exit_codes::{
    io_hint, EXIT_INVALID_CONFIG, EXIT_NO_MATCHING_RECORDS, EXIT_RUNTIME, EXIT_USAGE,
    EXIT_VARIANCE,
};
use crate::CliError;

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Reconcile billback claims against PPM agreements for one selection
    #[command(after_help = "\
Examples:
  rrecon run florida.recon.toml
  rrecon run florida.recon.toml --json
  rrecon run florida.recon.toml --month February --output feb.json
  rrecon run florida.recon.toml --xlsx results.xlsx --csv results.csv
  rrecon run florida.recon.toml --xlsx    # dispute_analysis_results_<time>.xlsx")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file (overrides [output] json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write result rows as CSV (overrides [output] csv); timestamped name if no path given
        #[arg(long, value_name = "PATH")]
        csv: Option<Option<PathBuf>>,

        /// Write result rows as an Excel workbook (overrides [output] xlsx); timestamped name if no path given
        #[arg(long, value_name = "PATH")]
        xlsx: Option<Option<PathBuf>>,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Validate a config without loading any data
    #[command(after_help = "\
Examples:
  rrecon validate florida.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },

    /// List the markets, brands, years and months available in the data
    #[command(after_help = "\
Examples:
  rrecon options florida.recon.toml
  rrecon options florida.recon.toml --json")]
    Options {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

/// Per-run overrides for `[selection]`.
#[derive(clap::Args, Default)]
pub struct SelectionArgs {
    /// Market abbreviation, e.g. FL
    #[arg(long)]
    market: Option<String>,

    /// Brand + pack size, e.g. "Brand A 6pk"
    #[arg(long)]
    brand: Option<String>,

    /// Four-digit year
    #[arg(long)]
    year: Option<i32>,

    /// Month name (full or three-letter)
    #[arg(long)]
    month: Option<String>,
}

impl SelectionArgs {
    fn any(&self) -> bool {
        self.market.is_some() || self.brand.is_some() || self.year.is_some() || self.month.is_some()
    }

    /// Flags win over the config; every field must come from one or the other.
    fn resolve(self, base: Option<&Selection>) -> Result<Selection, CliError> {
        let market = self.market.or_else(|| base.map(|s| s.market.clone()));
        let brand = self.brand.or_else(|| base.map(|s| s.brand_pk.clone()));
        let year = self.year.or_else(|| base.map(|s| s.year));
        let month = self.month.or_else(|| base.map(|s| s.month.clone()));

        match (market, brand, year, month) {
            (Some(market), Some(brand), Some(year), Some(month)) => {
                Ok(Selection::new(market, brand, year, month))
            }
            _ => Err(CliError::usage("incomplete selection").with_hint(
                "set [selection] in the config or pass --market, --brand, --year and --month",
            )),
        }
    }
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run {
            config,
            json,
            output,
            csv,
            xlsx,
            selection,
        } => {
            let now = Utc::now();
            cmd_recon_run(
                config,
                json,
                ExportTargets {
                    json: output,
                    csv: export_path(csv, "csv", now),
                    xlsx: export_path(xlsx, "xlsx", now),
                },
                selection,
            )
        }
        ReconCommands::Validate { config } => cmd_recon_validate(config),
        ReconCommands::Options { config, json } => cmd_recon_options(config, json),
    }
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn io_err(err: IoError) -> CliError {
    let hint = io_hint(&err);
    CliError { code: EXIT_RUNTIME, message: err.to_string(), hint }
}

fn load_config(config_path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| recon_err(EXIT_RUNTIME, format!("cannot read config: {e}")))?;
    ReconConfig::from_toml(&config_str).map_err(|e| recon_err(EXIT_INVALID_CONFIG, e.to_string()))
}

fn config_dir(config_path: &Path) -> &Path {
    config_path.parent().unwrap_or_else(|| Path::new("."))
}

fn load_session(config: &ReconConfig, config_path: &Path) -> Result<AnalysisSession, CliError> {
    let datasets =
        rebate_io::load_datasets(&config.files, config_dir(config_path)).map_err(io_err)?;
    Ok(AnalysisSession::new(datasets, config.tolerance))
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// `--csv`/`--xlsx` given without a path write a timestamped file in the
/// working directory.
fn export_path(flag: Option<Option<PathBuf>>, ext: &str, now: DateTime<Utc>) -> Option<PathBuf> {
    flag.map(|path| path.unwrap_or_else(|| PathBuf::from(default_export_name(now, ext))))
}

#[derive(Default)]
struct ExportTargets {
    json: Option<PathBuf>,
    csv: Option<PathBuf>,
    xlsx: Option<PathBuf>,
}

impl ExportTargets {
    /// Fill unset targets from `[output]`, resolved against the config directory.
    fn with_config_defaults(self, config: &ReconConfig, base_dir: &Path) -> Self {
        let from_config = |p: &Option<String>| p.as_deref().map(|f| resolve(base_dir, f));
        Self {
            json: self.json.or_else(|| from_config(&config.output.json)),
            csv: self.csv.or_else(|| from_config(&config.output.csv)),
            xlsx: self.xlsx.or_else(|| from_config(&config.output.xlsx)),
        }
    }
}

fn cmd_recon_run(
    config_path: PathBuf,
    json_output: bool,
    targets: ExportTargets,
    selection_args: SelectionArgs,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;

    let overridden = selection_args.any();
    let selection = selection_args.resolve(config.selection.as_ref())?;
    selection.validate().map_err(|e| {
        let code = if overridden { EXIT_USAGE } else { EXIT_INVALID_CONFIG };
        recon_err(code, e.to_string())
    })?;

    let mut session = load_session(&config, &config_path)?;

    let outcome = session
        .analyze(selection.clone())
        .map_err(|e| recon_err(selection_error_code(&e, overridden), e.to_string()))?;

    let outcome = if config.manual_match.is_empty() {
        outcome
    } else if config.selection.as_ref() != Some(&selection) {
        log::warn!(
            "ignoring {} manual_match entries: they belong to the config's [selection]",
            config.manual_match.len()
        );
        outcome
    } else {
        apply_manual_matches(&mut session, &config)?
    };

    let analysis = match outcome {
        AnalysisOutcome::Completed(analysis) => analysis,
        AnalysisOutcome::NoMatchingRecords { billback, ppm } => {
            return Err(recon_err(
                EXIT_NO_MATCHING_RECORDS,
                format!(
                    "no matching records for {} / {} / {} {} ({billback} billback, {ppm} ppm)",
                    selection.market, selection.brand_pk, selection.month, selection.year
                ),
            )
            .with_hint(format!(
                "run `rrecon options {}` to list available values",
                config_path.display()
            )));
        }
    };

    let targets = targets.with_config_defaults(&config, config_dir(&config_path));
    write_exports(&analysis, &targets)?;

    if json_output {
        let json_str = serde_json::to_string_pretty(&analysis)
            .map_err(|e| recon_err(EXIT_RUNTIME, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    print_summary(&config.name, &analysis);

    let s = &analysis.stats;
    if s.mismatches > 0 || s.missing_deals > 0 {
        return Err(recon_err(
            EXIT_VARIANCE,
            format!(
                "variance found: {} price mismatches, {} missing deals",
                s.mismatches, s.missing_deals
            ),
        ));
    }

    Ok(())
}

fn selection_error_code(err: &ReconError, overridden: bool) -> u8 {
    match err {
        ReconError::InvalidSelection(_) if overridden => EXIT_USAGE,
        ReconError::InvalidSelection(_) => EXIT_INVALID_CONFIG,
        _ => EXIT_RUNTIME,
    }
}

fn apply_manual_matches(
    session: &mut AnalysisSession,
    config: &ReconConfig,
) -> Result<AnalysisOutcome, CliError> {
    for m in config.manual_matches().iter() {
        session.create_manual_match(m.billback, m.ppm).map_err(|e| {
            recon_err(
                EXIT_INVALID_CONFIG,
                format!("manual_match billback_row {} / ppm_row {}: {e}", m.billback.0, m.ppm.0),
            )
            .with_hint("rows are 0-based, count non-blank data rows only and must fall inside the selection")
        })?;
    }
    session
        .recalculate()
        .map_err(|e| recon_err(EXIT_RUNTIME, e.to_string()))
}

fn write_exports(analysis: &Analysis, targets: &ExportTargets) -> Result<(), CliError> {
    if let Some(ref path) = targets.json {
        rebate_io::json::export(analysis, path).map_err(io_err)?;
        eprintln!("wrote {}", path.display());
    }
    if let Some(ref path) = targets.csv {
        rebate_io::csv::export_results(&analysis.data, path).map_err(io_err)?;
        eprintln!("wrote {}", path.display());
    }
    if let Some(ref path) = targets.xlsx {
        rebate_io::xlsx::export_results(&analysis.data, &analysis.stats, path).map_err(io_err)?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

/// Human summary to stderr.
fn print_summary(name: &str, analysis: &Analysis) {
    let sel = &analysis.selection;
    let s = &analysis.stats;
    eprintln!(
        "{name}: {} / {} / {} {}",
        sel.market, sel.brand_pk, sel.month, sel.year
    );
    eprintln!(
        "{} records: {} perfect, {} price mismatch, {} missing deal, {} ppm only ({:.1}% matched)",
        s.total_records, s.perfect_matches, s.mismatches, s.missing_deals, s.ppm_only, s.percent_matched,
    );
    eprintln!(
        "variance: total ${:.2}, absolute ${:.2}",
        s.total_variance, s.absolute_variance
    );
    if !analysis.manual_matches.is_empty() {
        eprintln!("manual matches applied: {}", analysis.manual_matches.len());
    }
    for line in &analysis.insights.recommendations {
        eprintln!("  - {line}");
    }
}

// ---------------------------------------------------------------------------
// validate / options
// ---------------------------------------------------------------------------

fn cmd_recon_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let selection = match config.selection {
        Some(ref s) => format!("{} / {} / {} {}", s.market, s.brand_pk, s.month, s.year),
        None => "no selection".to_string(),
    };
    eprintln!(
        "valid: recon '{}' ({selection}), tolerance {}, {} manual match(es)",
        config.name,
        config.tolerance.variance,
        config.manual_match.len(),
    );
    Ok(())
}

fn cmd_recon_options(config_path: PathBuf, json_output: bool) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let session = load_session(&config, &config_path)?;
    let options = session.filter_options();

    if json_output {
        let json_str = serde_json::to_string_pretty(&options)
            .map_err(|e| recon_err(EXIT_RUNTIME, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    let years: Vec<String> = options.years.iter().map(|y| y.to_string()).collect();
    println!("markets: {}", options.markets.join(", "));
    println!("brands:  {}", options.brands_pk.join(", "));
    println!("years:   {}", years.join(", "));
    println!("months:  {}", options.months.join(", "));
    Ok(())
}
