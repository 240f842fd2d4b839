//! xmlrecon - control/target XML reconciliation reporting tool

use std::fs::File;
use std::io::{BufWriter, Write};
use std::process::ExitCode;

use clap::Parser;
use serde::Deserialize;

use xmlrecon::{
    Alteration, AlterationPipeline, DirPairSource, KnownDifference, Reconciler, ReportInputs,
    TreeDiff, write_report,
};

#[derive(Parser)]
#[command(name = "xmlrecon")]
#[command(version, about = "Compares control/target XML document pairs", long_about = None)]
#[command(after_help = "EXAMPLES:
    xmlrecon --control-dir rh1 --target-dir rh2 --ids deals.txt
    xmlrecon --control-dir rh1 --target-dir rh2 --ids deals.txt -c recon.json -o report.csv")]
struct Cli {
    /// Directory containing control documents (<id>.xml)
    #[arg(long, value_name = "DIR")]
    control_dir: String,

    /// Directory containing target documents (<id>.xml)
    #[arg(long, value_name = "DIR")]
    target_dir: String,

    /// File with one record identifier per line
    #[arg(long, value_name = "FILE")]
    ids: String,

    /// JSON configuration: ignore selectors, substitutions, reorder rules,
    /// known differences
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Report output path
    #[arg(short, long, value_name = "FILE", default_value = "differences.csv")]
    output: String,

    /// Suppress progress messages
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Config {
    /// Selectors removed from both sides before comparison, with the reason
    /// echoed in the report.
    ignore: Vec<IgnoreRule>,
    /// Joint whole-document text substitutions.
    replace: Vec<ReplaceRule>,
    /// Joint sibling reorder rules.
    sort: Vec<SortRule>,
    /// Alterations applied to the control documents only.
    control_only: Vec<AlterationRule>,
    /// Alterations applied to the target documents only.
    target_only: Vec<AlterationRule>,
    /// The known-difference catalog.
    known: Vec<KnownRule>,
}

#[derive(Deserialize)]
struct IgnoreRule {
    selector: String,
    reason: String,
}

#[derive(Deserialize)]
struct ReplaceRule {
    from: String,
    to: String,
    note: Option<String>,
}

#[derive(Deserialize)]
struct SortRule {
    container: String,
    child: String,
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum AlterationRule {
    Remove { selector: String },
    Replace { from: String, to: String, note: Option<String> },
    Sort { container: String, child: String },
}

#[derive(Deserialize)]
struct KnownRule {
    difference: String,
    reason: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let ids_text = std::fs::read_to_string(&cli.ids)
        .map_err(|e| format!("cannot read ids file '{}': {e}", cli.ids))?;
    let ids: Vec<&str> = ids_text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read config '{path}': {e}"))?;
            serde_json::from_str::<Config>(&text)
                .map_err(|e| format!("invalid config '{path}': {e}"))?
        }
        None => Config::default(),
    };

    // A bad selector anywhere in the config is a configuration error and
    // aborts the whole run before any document is touched.
    let (pipeline, inputs) = build_pipeline(&config).map_err(|e| e.to_string())?;
    let catalog: Vec<KnownDifference> = config
        .known
        .iter()
        .map(|k| KnownDifference::new(&k.difference, &k.reason))
        .collect();

    if !cli.quiet {
        eprintln!("Comparing {} records...", ids.len());
    }

    let source = DirPairSource::new(cli.control_dir.as_str(), cli.target_dir.as_str());
    let mut reconciler = Reconciler::new(source, TreeDiff, pipeline);
    let summary = reconciler
        .run(ids.iter().copied(), catalog)
        .map_err(|e| e.to_string())?;

    let file = File::create(&cli.output)
        .map_err(|e| format!("cannot create report '{}': {e}", cli.output))?;
    let mut writer = BufWriter::new(file);
    write_report(&mut writer, &summary, &inputs).map_err(|e| e.to_string())?;
    writer.flush().map_err(|e| e.to_string())?;

    if !cli.quiet {
        let missing = summary.records().iter().filter(|r| r.missing_target).count();
        eprintln!(
            "{} records, {} unaccounted differences, {} accounted, {} missing targets",
            summary.record_count(),
            summary.unknown_total(),
            summary.known_total(),
            missing,
        );
        eprintln!("Report written to {}", cli.output);
    }

    Ok(())
}

fn build_pipeline(config: &Config) -> xmlrecon::Result<(AlterationPipeline, ReportInputs)> {
    let mut pipeline = AlterationPipeline::new();
    let mut descriptions = Vec::new();

    for rule in &config.replace {
        let alteration = match &rule.note {
            Some(note) => Alteration::replace_with_note(&rule.from, &rule.to, note),
            None => Alteration::replace(&rule.from, &rule.to),
        };
        descriptions.push(alteration.describe());
        pipeline = pipeline.with_joint(alteration);
    }

    for rule in &config.sort {
        let alteration = Alteration::sort(&rule.container, &rule.child)?;
        descriptions.push(alteration.describe());
        pipeline = pipeline.with_joint(alteration);
    }

    // Ignore removals run after the other joint alterations, so selectors see
    // the substituted/reordered shape. They are listed in their own report
    // section, not with the alterations.
    for rule in &config.ignore {
        pipeline = pipeline.with_joint(Alteration::remove(&rule.selector)?);
    }

    for rule in &config.control_only {
        let alteration = build_rule(rule)?;
        descriptions.push(format!("[control only] {}", alteration.describe()));
        pipeline = pipeline.with_control(alteration);
    }

    for rule in &config.target_only {
        let alteration = build_rule(rule)?;
        descriptions.push(format!("[target only] {}", alteration.describe()));
        pipeline = pipeline.with_target(alteration);
    }

    let inputs = ReportInputs {
        ignored: config
            .ignore
            .iter()
            .map(|r| (r.selector.clone(), r.reason.clone()))
            .collect(),
        alterations: descriptions,
    };
    Ok((pipeline, inputs))
}

fn build_rule(rule: &AlterationRule) -> xmlrecon::Result<Alteration> {
    match rule {
        AlterationRule::Remove { selector } => Alteration::remove(selector),
        AlterationRule::Replace { from, to, note } => Ok(match note {
            Some(note) => Alteration::replace_with_note(from, to, note),
            None => Alteration::replace(from, to),
        }),
        AlterationRule::Sort { container, child } => Alteration::sort(container, child),
    }
}
