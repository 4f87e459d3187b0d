// UI layer: runs one command from start to finish. Each flow validates what
// it can before touching the network, shows a spinner while requests are
// in flight, and prints a short outcome.

use crate::api::ApiClient;
use crate::cli::{Cli, Commands, GetArgs, InputArgs, ModArgs};
use crate::format::FormatSpec;
use crate::ingest::Ingestor;
use crate::mutate::{mutate, Action, MutationReport};
use crate::output::{Destination, OutputSink};
use crate::record::Record;
use crate::retrieve::{retrieve, Retrieval};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::time::Duration;

/// Entry point for a parsed command line. The template is compiled first
/// so a bad one fails before any input is read or request is sent.
pub fn run(cli: Cli) -> Result<()> {
    let spec = FormatSpec::compile(&cli.format)?;
    match &cli.command {
        Commands::Get(args) => handle_get(&spec, args),
        Commands::Put(args) => handle_put(&spec, &args.input),
        Commands::Mod(args) => handle_mod(&spec, args),
    }
}

fn handle_get(spec: &FormatSpec, args: &GetArgs) -> Result<()> {
    let filters = args.filters()?;
    let api = ApiClient::from_env()?;

    let spinner = spinner("Fetching items...");
    let outcome = retrieve(&api, &filters, args.count);
    spinner.finish_and_clear();

    let outcome = outcome.context("Failed to retrieve items")?;
    if matches!(outcome, Retrieval::NoResults) {
        println!("No items found!");
        return Ok(());
    }
    let records = outcome.into_records();

    let destination = Destination::from_selector(args.output.as_deref());
    let sink = OutputSink::new(spec, args.json, destination, args.archive.clone());
    let stdout = io::stdout();
    sink.emit(&records, &mut stdout.lock(), &api)?;
    Ok(())
}

fn handle_put(spec: &FormatSpec, input: &InputArgs) -> Result<()> {
    let api = ApiClient::from_env()?;
    let records = read_input(spec, input)?;
    if records.is_empty() {
        println!("No input items, nothing to add.");
        return Ok(());
    }
    send_batch(&api, &records, Action::Add)
}

fn handle_mod(spec: &FormatSpec, args: &ModArgs) -> Result<()> {
    let action = args.flags().select()?;
    let api = ApiClient::from_env()?;
    let records = read_input(spec, &args.input)?;
    if records.is_empty() {
        println!("No input items, nothing to {}.", action.as_str());
        return Ok(());
    }
    send_batch(&api, &records, action)
}

fn read_input(spec: &FormatSpec, input: &InputArgs) -> Result<Vec<Record>> {
    let ingestor = Ingestor::new(spec, input.policy());
    let records = ingestor
        .ingest(&input.source())
        .context("Failed to read input")?;
    Ok(records)
}

fn send_batch(api: &ApiClient, records: &[Record], action: Action) -> Result<()> {
    let spinner = spinner("Sending...");
    let outcome = mutate(api, records, action);
    spinner.finish_and_clear();

    let report = outcome.context("Failed to send batch")?;
    report_outcome(&report)
}

fn report_outcome(report: &MutationReport) -> Result<()> {
    if !report.succeeded {
        anyhow::bail!(
            "The service rejected the '{}' batch of {} item(s)",
            report.action.as_str(),
            report.submitted
        );
    }
    let failed = report
        .results
        .iter()
        .filter(|result| result.as_bool() == Some(false))
        .count();
    if failed > 0 {
        eprintln!("{} of {} item(s) were not applied", failed, report.submitted);
    }
    println!("{}: {} item(s) sent", report.action.as_str(), report.submitted);
    Ok(())
}

/// Spinner on stderr; hidden automatically when stderr is not a terminal.
fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
