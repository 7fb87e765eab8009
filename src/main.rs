//! Command-line client for the periodicity service
//!
//! Run with: cargo run --features cli --bin periodicity-cli -- --dataset <key>

use periodicity_vis::config::Endpoints;
use periodicity_vis::core::units::format_duration;
use periodicity_vis::core::{
    parse_duration, parse_upload, DatasetSession, DisplayAttribute, ExactSelection,
    PeriodSuggestor, SessionEvent, SuggestorConfig,
};
use periodicity_vis::discovery::list_datasets;
use periodicity_vis::time::now_seconds;
use periodicity_vis::websocket_native::ServiceClient;
use clap::{ArgGroup, Parser};
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Seconds to wait for any one answer from the service
const RESPONSE_TIMEOUT: f64 = 30.0;
const POLL_INTERVAL: Duration = Duration::from_millis(20);
const TOP_PERIODS: usize = 5;

fn parse_attribute(text: &str) -> Result<DisplayAttribute, String> {
    DisplayAttribute::parse(text).ok_or_else(|| {
        let known: Vec<&str> = DisplayAttribute::ALL.iter().map(|a| a.label()).collect();
        format!("unknown display attribute '{text}' (expected one of: {})", known.join(", "))
    })
}

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(
    name = "periodicity-cli",
    version,
    about = "Explore the periodicity of a temporal point dataset",
    long_about = "Loads a dataset from the periodicity service (or uploads one), prints a summary \
                  and the suggested periods. Endpoints come from $PERIODICITY_WS and $PERIODICITY_HTTP."
)]
#[command(group(ArgGroup::new("source").required(true).multiple(true).args(["list", "dataset", "upload"])))]
struct CliArgs {
    /// List the datasets offered by the service
    #[arg(long)]
    list: bool,

    /// Key of the dataset to load
    #[arg(long, conflicts_with = "upload")]
    dataset: Option<String>,

    /// JSON file of {x, y, value, time} records to upload
    #[arg(long)]
    upload: Option<String>,

    /// Statistic the histograms show: count, average value or variance
    #[arg(long, value_parser = parse_attribute)]
    attribute: Option<DisplayAttribute>,

    /// Period to select exactly, e.g. "1d", "12 hours", "1.5 wk"
    #[arg(long, value_parser = parse_duration)]
    period: Option<f64>,
}

/// Feed frames into the session until `done` accepts an event or the
/// service stays silent for too long
fn pump(
    session: &mut DatasetSession<ServiceClient>,
    mut suggestor: Option<&mut PeriodSuggestor>,
    mut done: impl FnMut(&SessionEvent) -> bool,
) -> Result<(), Box<dyn Error>> {
    let deadline = now_seconds() + RESPONSE_TIMEOUT;
    loop {
        if now_seconds() > deadline {
            return Err("timed out waiting for the service".into());
        }
        let Some(frame) = session.transport().recv_timeout(POLL_INTERVAL)? else {
            continue;
        };
        let Some(event) = session.handle_frame(frame)? else {
            continue;
        };
        debug!(?event, "Session event");
        if let (SessionEvent::Supplement(data), Some(s)) = (&event, suggestor.as_deref_mut()) {
            if let Some(dataset) = session.dataset() {
                s.accept(data, dataset);
            }
        }
        if done(&event) {
            return Ok(());
        }
    }
}

fn print_summary(session: &DatasetSession<ServiceClient>) {
    let Some(ds) = session.dataset() else {
        return;
    };
    let [p0, p1] = ds.period_domain();
    let [t0, t1] = ds.temporal_domain();
    println!("dataset      {}", ds.key());
    println!("attribute    {}", ds.display_attribute().label());
    println!("points       {}", ds.datapoints().len());
    println!("periods      {} ({} .. {})", ds.period_count(), format_duration(p0, 3, true), format_duration(p1, 3, true));
    println!("time span    {}", format_duration(t1 - t0, 3, true));
    println!("bins         {}", ds.num_bins());
    println!("selected     {}", format_duration(ds.period(), 4, true));
    let lowest: Vec<String> = ds
        .lowest_entropy_periods(TOP_PERIODS)
        .into_iter()
        .map(|p| format_duration(p, 4, false))
        .collect();
    println!("low entropy  {}", lowest.join(", "));
}

fn run(args: CliArgs) -> Result<(), Box<dyn Error>> {
    let endpoints = Endpoints::from_env();

    if args.list {
        let rt = tokio::runtime::Runtime::new()?;
        let choices = rt.block_on(list_datasets(&endpoints.discovery))?;
        for choice in &choices {
            println!("{:<20} {:<30} {}", choice.key, choice.title, choice.description);
        }
        if args.dataset.is_none() && args.upload.is_none() {
            return Ok(());
        }
    }

    // Validate uploads before touching the network
    let mut session = match (&args.dataset, &args.upload) {
        (Some(key), _) => DatasetSession::start(key, ServiceClient::connect(&endpoints.dataset_url(key)))?,
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path)?;
            let batch = parse_upload(&text)?;
            info!(path = %path, points = batch.len(), "Upload validated");
            DatasetSession::start_upload("upload", &batch, ServiceClient::connect(&endpoints.upload_url()))?
        }
        (None, None) => return Ok(()),
    };

    pump(&mut session, None, |e| matches!(e, SessionEvent::Loaded))?;

    if let Some(attribute) = args.attribute {
        if session.set_display_attribute(attribute)? {
            pump(&mut session, None, |e| matches!(e, SessionEvent::Replaced(_)))?;
        }
    }

    if let Some(period) = args.period {
        match session.set_period_exact(period)? {
            ExactSelection::Immediate => {}
            ExactSelection::Pending(id) => pump(&mut session, None, |e| {
                matches!(e, SessionEvent::ExactPeriodSelected { request_id, .. } if *request_id == id)
            })?,
        }
    }

    print_summary(&session);

    let mut suggestor = PeriodSuggestor::new(SuggestorConfig::default());
    if let Some(ds) = session.dataset_mut() {
        suggestor.attach(ds);
    }
    suggestor.poll(now_seconds(), &mut session)?;
    if suggestor.is_waiting() {
        pump(&mut session, Some(&mut suggestor), |e| matches!(e, SessionEvent::Supplement(_)))?;
    }

    if suggestor.suggestions().is_empty() {
        warn!("No period suggestions");
    }
    for s in suggestor.suggestions() {
        println!(
            "suggest #{}  {:<8} {:<14} entropy {:.4} ({:+.4})  vs {:.4}",
            s.rank,
            s.label,
            format_duration(s.period, 4, false),
            s.entropy,
            s.relative_entropy,
            s.vectorstrength,
        );
    }
    if let Some(ds) = session.dataset_mut() {
        suggestor.detach(ds);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,periodicity_vis=debug"));
    fmt().with_env_filter(filter).with_target(true).init();

    let args = CliArgs::parse();

    run(args).inspect_err(|e| error!(error = %e, "periodicity-cli failed"))
}
