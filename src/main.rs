use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use wifi_level_rs::config::MonitorConfig;
use wifi_level_rs::cycle::ScanCycle;
use wifi_level_rs::permissions::{GrantAll, HostPermissions, Permissions};
use wifi_level_rs::radio::{DumpFileRadio, IwRadio, Radio};
use wifi_level_rs::recorder::SampleRecorder;
use wifi_level_rs::server;
use wifi_level_rs::types::CycleOutcome;

/// wifi-level-rs — follow one access point's signal level over time and across channels.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "wifi-level-rs",
    version,
    about = "Follow one Wi-Fi access point's signal level over time and across channels.",
    long_about = None
)]
struct Cli {
    /// TOML config file. Defaults to $WIFI_LEVEL_CONFIG, then ./wifi_level.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Wireless interface to scan with.
    #[arg(long)]
    interface: Option<String>,

    /// Time between two scans in milliseconds.
    #[arg(long = "period-ms")]
    period_ms: Option<u64>,

    /// History kept in the rolling series, in milliseconds.
    #[arg(long = "window-ms")]
    window_ms: Option<u64>,

    /// Field separator in the sample file.
    #[arg(long)]
    separator: Option<String>,

    /// Directory receiving the session's sample file.
    #[arg(long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// BSSID to follow. Without it only the list of visible access points is shown.
    #[arg(long, env = "WIFI_LEVEL_SELECT")]
    select: Option<String>,

    /// Replay a captured `iw dev <iface> scan dump` file instead of scanning.
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Only read cached scan results (no trigger, works without root).
    #[arg(long, default_value_t = false)]
    cached: bool,

    /// Serve the JSON API alongside the sampling loop.
    #[arg(long = "serve-ui", default_value_t = false)]
    serve_ui: bool,

    /// Address for the JSON API.
    #[arg(long)]
    bind: Option<String>,

    /// Stop after this many cycles.
    #[arg(long)]
    cycles: Option<u64>,
}

impl Cli {
    fn apply(&self, config: &mut MonitorConfig) {
        if let Some(v) = &self.interface {
            config.interface = v.clone();
        }
        if let Some(v) = self.period_ms {
            config.period_ms = v;
        }
        if let Some(v) = self.window_ms {
            config.display_window_ms = v;
        }
        if let Some(v) = &self.separator {
            config.separator = v.clone();
        }
        if let Some(v) = &self.output_dir {
            config.output_dir = v.clone();
        }
        if let Some(v) = &self.bind {
            config.bind = v.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = MonitorConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    println!("wifi-level-rs configuration:");
    println!(
        "  source       : {}",
        cli.replay
            .as_ref()
            .map(|p| format!("replay {}", p.display()))
            .unwrap_or_else(|| {
                let mode = if cli.cached { " (cached)" } else { "" };
                format!("iw {}{mode}", config.interface)
            })
    );
    println!("  period_ms    : {}", config.period_ms);
    println!(
        "  window_ms    : {} ({} points)",
        config.display_window_ms,
        config.series_capacity()
    );
    println!("  separator    : {:?}", config.separator);
    println!("  output_dir   : {}", config.output_dir.display());
    println!("  selection    : {}", cli.select.as_deref().unwrap_or("<none>"));
    println!("  serve_ui     : {}", cli.serve_ui);

    let radio: Box<dyn Radio>;
    let permissions: Box<dyn Permissions>;
    match &cli.replay {
        Some(path) => {
            radio = Box::new(DumpFileRadio::new(path));
            permissions = Box::new(GrantAll);
        }
        None => {
            let iw = IwRadio::new(&config.interface);
            radio = Box::new(if cli.cached { iw.cached() } else { iw });
            permissions = Box::new(HostPermissions::new(&config.interface, cli.cached));
        }
    }

    let mut cycle = ScanCycle::new(radio, &config);
    if let Some(bssid) = &cli.select {
        cycle.selection_changed(bssid.trim());
    }
    let (dir, pattern, separator) = (
        config.output_dir.clone(),
        config.file_name_pattern.clone(),
        config.separator.clone(),
    );
    cycle
        .start(permissions.as_ref(), |now| {
            SampleRecorder::open_session(&dir, &pattern, &separator, now)
        })
        .context("sampling session not started")?;

    let shared = Arc::new(Mutex::new(cycle));
    let cancel = CancellationToken::new();

    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        cancel_ctrlc.cancel();
    });

    if cli.serve_ui {
        let bind = config.bind.clone();
        let cycle = shared.clone();
        let shutdown = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = server::spawn_server(&bind, cycle, shutdown).await {
                warn!(error = %e, "API server stopped");
            }
        });
    }

    // The first trigger went out in `start`; results are read one period later.
    let mut ticker = tokio::time::interval(Duration::from_millis(config.period_ms));
    ticker.tick().await;
    let mut done = 0u64;
    let mut listed = 0usize;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let cycle = shared.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let mut guard = cycle.blocking_lock();
            guard.on_scan_results_available()
        })
        .await?;
        match outcome {
            CycleOutcome::Sampled(s) => info!(
                ssid = %s.ssid,
                channel = s.channel,
                frequency = s.frequency,
                level = s.level,
                "sample"
            ),
            CycleOutcome::CandidatesOnly => {
                let guard = shared.lock().await;
                if guard.candidates().len() != listed {
                    listed = guard.candidates().len();
                    print_candidates(guard.candidates());
                }
            }
            CycleOutcome::NoMatch => info!("selected access point not visible"),
            CycleOutcome::ScanUnavailable | CycleOutcome::Inactive => {}
        }
        done += 1;
        if cli.cycles.is_some_and(|n| done >= n) {
            break;
        }
    }

    cancel.cancel();
    let mut cycle = shared.lock().await;
    print_summary(&*cycle);
    cycle.stop();
    Ok(())
}

fn print_candidates(candidates: &[String]) {
    println!("\nVisible access points ({}):", candidates.len());
    for c in candidates {
        println!("  {c}");
    }
}

fn print_summary<R: Radio>(cycle: &ScanCycle<R>) {
    let status = cycle.status();
    println!(
        "\nSamples: {} (write failures: {}), band: {}",
        status.samples, status.write_failures, status.band
    );
    if let Some(file) = &status.sample_file {
        println!("Sample file: {file}");
    }

    let ch_w = 7usize;
    let lvl_w = 9usize;
    println!("\n{:>ch_w$}  {:>lvl_w$}", "channel", "level_dbm", ch_w = ch_w, lvl_w = lvl_w);
    println!("{:-<ch_w$}  {:-<lvl_w$}", "", "", ch_w = ch_w, lvl_w = lvl_w);
    for p in cycle.channel_table().points() {
        println!("{:>ch_w$}  {:>lvl_w$}", p.channel, p.level, ch_w = ch_w, lvl_w = lvl_w);
    }

    if !cycle.series().is_empty() {
        println!("\nLast {} samples (t+s: dBm):", cycle.series().len());
        let line: Vec<String> = cycle
            .series()
            .points()
            .map(|p| format!("{}:{}", p.elapsed_secs, p.level))
            .collect();
        println!("  {}", line.join("  "));
    }
}
