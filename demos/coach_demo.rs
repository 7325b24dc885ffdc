//! Demonstration of a squat coaching session.
//!
//! This example shows how to:
//! 1. Build a dispatcher with a console sink, advice and a real-time coach
//! 2. Feed synthetic frames through a session, including an occluded stretch
//! 3. Read per-frame diagnostics and rep events
//! 4. Print the session statistics
//!
//! Run with: cargo run --example coach_demo

use std::sync::Arc;
use std::time::Duration;

use squat_coach::{
    coach::{CoachingDispatcher, ConsoleCoach, ConsoleSink, TipAdvisor},
    pose::synthetic::{occluded_frame, SquatSynth},
    stats::create_shared_log,
    Config, SquatSession, SETUP_TIPS,
};

#[tokio::main]
async fn main() {
    println!("Squat Coach - Session Demo");
    println!("==========================");
    println!("{SETUP_TIPS}");

    let mut config = Config::default();
    config.seed = Some(7);
    config.coaching.advice_enabled = true;

    let log = create_shared_log();
    let dispatcher = CoachingDispatcher::new(Arc::new(ConsoleSink), log.clone())
        .with_advice(
            Arc::new(TipAdvisor::new().with_delay(Duration::from_millis(200))),
            Duration::from_secs(1),
            tokio::runtime::Handle::current(),
        )
        .with_realtime(Arc::new(ConsoleCoach::new()));
    let mut session = SquatSession::new(&config, dispatcher);

    println!("Session ID: {}", session.id());
    println!();

    // Six reps at 30 fps; the body leaves the frame during the fourth rep.
    let frames = SquatSynth::new(30.0).reps(6).into_iter().map(|frame| {
        if (9_300..=9_700).contains(&frame.timestamp_ms) {
            occluded_frame(frame.timestamp_ms)
        } else {
            frame
        }
    });

    let mut hidden = false;
    for frame in frames {
        let report = session.process_frame(&frame);

        if report.is_analyzed() == hidden {
            hidden = !report.is_analyzed();
            println!("  {} ms: {}", report.timestamp_ms, report.diagnostic);
        }
        if let Some(event) = report.rep_event() {
            println!("Rep {} at {} ms", event.sequence, event.completed_at_ms);
        }
    }

    // Let outstanding advice land before stopping.
    session.flush_advice().await;
    session.stop();

    println!();
    println!("{}", log.summary());
}
