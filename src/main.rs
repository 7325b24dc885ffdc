//! Squat Coach CLI
//!
//! Replays recorded or synthetic pose streams through a squat session.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use squat_coach::{
    coach::{CoachingDispatcher, ConsoleCoach, ConsoleSink, TipAdvisor},
    config::Config,
    core::{Diagnostic, FrameReport, SquatSession, Transition},
    pose::{
        read_frames, write_frames, FeedError, FeedHandle, FeedPoll, Frame, FrameFeed, FrameReader,
        SquatSynth,
    },
    stats::{create_shared_log_with_persistence, load_persisted},
    SETUP_TIPS, VERSION,
};
use tracing_subscriber::EnvFilter;

/// Simulated latency of the offline advisor.
const ADVISOR_DELAY: Duration = Duration::from_millis(300);

/// Upper bound on frames generated by `simulate`.
const MAX_SIMULATED_FRAMES: u64 = 1_000_000;

#[derive(Parser)]
#[command(name = "squat-coach")]
#[command(version = VERSION)]
#[command(about = "Debounced squat rep detection from pose landmark streams", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSONL pose recording (one frame per line)
    Replay {
        /// Recording to replay
        #[arg(long, short)]
        input: PathBuf,

        #[command(flatten)]
        session: SessionArgs,

        /// Replay at recorded speed instead of as fast as possible
        #[arg(long)]
        pace: bool,
    },

    /// Generate synthetic squats and run them through a session
    Simulate {
        /// Number of reps to generate
        #[arg(long, default_value = "10")]
        reps: u32,

        /// Frames per second of the generated stream
        #[arg(long, default_value = "30")]
        fps: f64,

        /// Duration of one rep in milliseconds
        #[arg(long, default_value = "3000")]
        rep_duration: u64,

        /// Also write the generated frames to this JSONL file
        #[arg(long)]
        record: Option<PathBuf>,

        #[command(flatten)]
        session: SessionArgs,

        /// Emit frames in real time
        #[arg(long)]
        pace: bool,
    },

    /// Show setup tips
    Tips,

    /// Show configuration
    Config,

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show statistics of the last session
    Stats,
}

#[derive(clap::Args)]
struct SessionArgs {
    /// Ask the offline advisor for feedback on claimed reps
    #[arg(long)]
    advice: bool,

    /// Attach a console real-time coach
    #[arg(long)]
    realtime: bool,

    /// Seed for canned phrase selection
    #[arg(long)]
    seed: Option<u64>,

    /// Print the diagnostic of every frame
    #[arg(long, short)]
    verbose: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Replay {
            input,
            session,
            pace,
        } => cmd_replay(input, session, pace),
        Commands::Simulate {
            reps,
            fps,
            rep_duration,
            record,
            session,
            pace,
        } => cmd_simulate(reps, fps, rep_duration, record, session, pace),
        Commands::Tips => {
            println!("{SETUP_TIPS}");
            Ok(())
        }
        Commands::Config => cmd_config(),
        Commands::InitConfig { force } => cmd_init_config(force),
        Commands::Stats => cmd_stats(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn cmd_replay(input: PathBuf, args: SessionArgs, pace: bool) -> anyhow::Result<()> {
    let reader = FrameReader::open(&input)
        .with_context(|| format!("could not open recording {}", input.display()))?;

    println!("Replaying {}", input.display());
    run_session(args, move |handle, running| {
        let mut frames = Vec::new();
        for frame in reader {
            frames.push(frame?);
        }
        emit_frames(frames, handle, running, pace)
    })
}

fn cmd_simulate(
    reps: u32,
    fps: f64,
    rep_duration: u64,
    record: Option<PathBuf>,
    args: SessionArgs,
    pace: bool,
) -> anyhow::Result<()> {
    if !(fps > 0.0) {
        anyhow::bail!("fps must be positive");
    }

    let synth = SquatSynth::new(fps).with_rep_duration(rep_duration);
    let count = synth.frame_count(reps);
    if count > MAX_SIMULATED_FRAMES {
        anyhow::bail!(
            "{count} frames requested, at most {MAX_SIMULATED_FRAMES} can be simulated; lower --reps, --fps or --rep-duration"
        );
    }

    let frames = synth.reps(reps);
    if let Some(path) = record {
        write_frames(&path, &frames)
            .with_context(|| format!("could not write recording {}", path.display()))?;
        println!("Recorded {} frames to {}", frames.len(), path.display());
        // Sanity check the file we just wrote.
        let written = read_frames(&path)?;
        anyhow::ensure!(written.len() == frames.len(), "recording is incomplete");
    }

    println!("Simulating {reps} reps at {fps} fps");
    run_session(args, move |handle, running| emit_frames(frames, handle, running, pace))
}

/// Push frames into the feed, optionally at their recorded pace.
fn emit_frames(
    frames: Vec<Frame>,
    handle: FeedHandle,
    running: Arc<AtomicBool>,
    pace: bool,
) -> anyhow::Result<usize> {
    let mut previous: Option<u64> = None;
    let mut sent = 0;

    for frame in frames {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        if pace {
            if let Some(prev) = previous {
                let gap = frame.timestamp_ms.saturating_sub(prev);
                thread::sleep(Duration::from_millis(gap));
            }
            previous = Some(frame.timestamp_ms);
        }
        match handle.push_blocking(frame) {
            Ok(()) => sent += 1,
            Err(FeedError::Stopped) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(sent)
}

/// Run one session fed by `producer` on a separate thread.
fn run_session<P>(args: SessionArgs, producer: P) -> anyhow::Result<()>
where
    P: FnOnce(FeedHandle, Arc<AtomicBool>) -> anyhow::Result<usize> + Send + 'static,
{
    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: could not load configuration, using defaults: {e}");
        Config::default()
    });
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.coaching.advice_enabled |= args.advice;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("could not start async runtime")?;

    let log = create_shared_log_with_persistence(config.stats_path());
    let mut dispatcher = CoachingDispatcher::new(Arc::new(ConsoleSink), log.clone());
    if config.coaching.advice_enabled {
        let advisor = Arc::new(TipAdvisor::new().with_delay(ADVISOR_DELAY));
        dispatcher = dispatcher.with_advice(
            advisor,
            config.coaching.advice_timeout,
            runtime.handle().clone(),
        );
    }
    if args.realtime {
        dispatcher = dispatcher.with_realtime(Arc::new(ConsoleCoach::new()));
    }

    let mut session = SquatSession::new(&config, dispatcher);
    println!("Session ID: {}", session.id());
    println!(
        "  Thresholds: down <= {}°, up >= {}°, debounce {}ms",
        config.thresholds.down_deg,
        config.thresholds.up_deg,
        config.debounce.as_millis()
    );
    println!(
        "  Advice: {}",
        if config.coaching.advice_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    let mut feed = FrameFeed::default();
    feed.start()?;
    let handle = feed.handle();
    let producer_running = running.clone();
    let producer = thread::spawn(move || producer(handle, producer_running));

    let mut last_diagnostic_kind = None;
    while running.load(Ordering::SeqCst) {
        match feed.poll(Duration::from_millis(100), || producer.is_finished()) {
            FeedPoll::Frame(frame) => {
                let report = session.process_frame(&frame);
                print_report(&report, args.verbose, &mut last_diagnostic_kind);
            }
            FeedPoll::Idle => {}
            FeedPoll::Finished => break,
        }
    }

    let interrupted = !running.load(Ordering::SeqCst);
    feed.stop();
    let dropped = feed.drain();
    if dropped > 0 {
        tracing::warn!(dropped, "frames left unprocessed");
    }

    let sent = match producer.join() {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("frame producer panicked"),
    };

    if interrupted {
        println!();
        println!("Stopping...");
        session.stop();
        runtime.block_on(session.flush_advice());
    } else {
        runtime.block_on(session.flush_advice());
        session.stop();
    }

    println!();
    println!("Frames sent: {sent}");
    println!("Total reps: {}", session.rep_count());
    println!();
    println!("{}", log.summary());

    if let Err(e) = log.save() {
        eprintln!("Warning: could not save session statistics: {e}");
    }
    Ok(())
}

fn print_report(report: &FrameReport, verbose: bool, last_kind: &mut Option<&'static str>) {
    let stamp = format_timestamp(report.timestamp_ms);

    if verbose {
        println!("[{stamp}] {}", report.diagnostic);
    } else {
        let kind = match report.diagnostic {
            Diagnostic::BodyNotVisible(_) => "hidden",
            Diagnostic::OutOfOrder { .. } => "stale",
            Diagnostic::Inactive => "inactive",
            Diagnostic::Tracking { .. } => "tracking",
        };
        // Only announce visibility changes, not every hidden frame.
        if *last_kind != Some(kind) && kind != "tracking" {
            println!("[{stamp}] {}", report.diagnostic);
        }
        *last_kind = Some(kind);
    }

    match report.transition {
        Some(Transition::DepthReached { .. }) => {
            println!(
                "[{stamp}] Depth reached ({}°)",
                report.angle.unwrap_or_default().round()
            );
        }
        Some(Transition::RepCompleted(event)) => {
            println!("[{stamp}] Rep {} completed", event.sequence);
            if report.advice_claimed {
                println!("[{stamp}] Asking coach for advice...");
            }
        }
        None => {}
    }
}

fn format_timestamp(ms: u64) -> String {
    format!("{:02}:{:02}.{:03}", ms / 60_000, (ms / 1_000) % 60, ms % 1_000)
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load()?;
    println!("Configuration file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_init_config(force: bool) -> anyhow::Result<()> {
    let path = Config::config_path();
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    Config::default().save()?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn cmd_stats() -> anyhow::Result<()> {
    let config = Config::load()?;
    let path = config.stats_path();
    if !path.exists() {
        println!("No session statistics yet. Run `squat-coach simulate` or `squat-coach replay`.");
        return Ok(());
    }

    let persisted = load_persisted(&path)
        .with_context(|| format!("could not read {}", path.display()))?;
    println!("Last updated: {}", persisted.last_updated.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();
    println!("{}", persisted.stats.summary());
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: could not install Ctrl+C handler: {e}");
    }
}
