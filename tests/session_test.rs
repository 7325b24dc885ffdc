//! End-to-end tests: pose streams through a full squat session.

use squat_coach::coach::{CoachingDispatcher, MemoryCoach, MemorySink, TipAdvisor};
use squat_coach::core::{FeedbackSource, SquatState, CANNED_PHRASES};
use squat_coach::pose::synthetic::{frame_with_knee_angle, occluded_frame, SquatSynth};
use squat_coach::pose::{read_frames, write_frames, Frame, FrameFeed};
use squat_coach::stats::{create_shared_log, create_shared_log_with_persistence, load_persisted};
use squat_coach::{Config, SquatSession};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("squat-coach-{name}-{}", uuid::Uuid::new_v4()))
}

fn seeded_config() -> Config {
    let mut config = Config::default();
    config.seed = Some(42);
    config
}

fn run(session: &mut SquatSession, frames: &[Frame]) -> Vec<u32> {
    frames
        .iter()
        .filter_map(|frame| session.process_frame(frame).rep_event())
        .map(|event| event.sequence)
        .collect()
}

#[test]
fn test_ten_reps_with_feedback_policy() {
    let sink = Arc::new(MemorySink::new());
    let dispatcher = CoachingDispatcher::new(sink.clone(), create_shared_log());
    let mut session = SquatSession::new(&seeded_config(), dispatcher);

    let frames = SquatSynth::new(30.0).reps(10);
    let reps = run(&mut session, &frames);

    assert_eq!(reps, (1..=10).collect::<Vec<_>>());
    assert_eq!(session.state(), SquatState::Up);

    let messages = sink.messages();
    let depth_cues = messages.iter().filter(|m| m.rep.is_none()).count();
    assert_eq!(depth_cues, 10);

    let rep_messages: Vec<_> = messages.iter().filter(|m| m.rep.is_some()).collect();
    assert_eq!(rep_messages.len(), 10);
    for message in rep_messages {
        let rep = message.rep.unwrap();
        if rep % 5 == 0 {
            assert_eq!(message.source, FeedbackSource::Milestone);
            assert_eq!(message.text, format!("{rep} reps! Milestone reached, keep going!"));
        } else {
            // Advice is not configured, so multiples of three get a phrase too.
            assert_eq!(message.source, FeedbackSource::Canned);
            assert!(CANNED_PHRASES
                .iter()
                .any(|p| message.text == format!("{p} Total: {rep}")));
        }
    }

    let stats = session.log().stats();
    assert_eq!(stats.reps_counted, 10);
    assert_eq!(stats.depth_reached, 10);
    assert_eq!(stats.frames_processed, frames.len() as u64);
    let mean = stats.mean_rep_interval_ms.unwrap();
    assert!((mean - 3_000.0).abs() < 50.0, "mean interval {mean}");
}

#[test]
fn test_low_and_high_frame_rates_agree() {
    for fps in [10.0, 60.0] {
        let dispatcher = CoachingDispatcher::new(Arc::new(MemorySink::new()), create_shared_log());
        let mut session = SquatSession::new(&seeded_config(), dispatcher);
        let reps = run(&mut session, &SquatSynth::new(fps).reps(4));
        assert_eq!(reps, vec![1, 2, 3, 4], "fps {fps}");
    }
}

#[test]
fn test_occlusion_at_the_bottom_still_counts() {
    let dispatcher = CoachingDispatcher::new(Arc::new(MemorySink::new()), create_shared_log());
    let mut session = SquatSession::new(&seeded_config(), dispatcher);

    let frames: Vec<Frame> = SquatSynth::new(30.0)
        .reps(1)
        .into_iter()
        .map(|frame| {
            if (1_400..=1_600).contains(&frame.timestamp_ms) {
                occluded_frame(frame.timestamp_ms)
            } else {
                frame
            }
        })
        .collect();

    assert_eq!(run(&mut session, &frames), vec![1]);
    assert!(session.log().stats().frames_blocked > 0);
}

#[test]
fn test_quick_bounce_is_not_counted_twice() {
    let dispatcher = CoachingDispatcher::new(Arc::new(MemorySink::new()), create_shared_log());
    let mut session = SquatSession::new(&seeded_config(), dispatcher);

    let frames = [
        frame_with_knee_angle(0, 170.0),
        frame_with_knee_angle(500, 90.0),
        frame_with_knee_angle(1_000, 170.0),
        // Second dip inside the debounce window of the first.
        frame_with_knee_angle(1_300, 90.0),
        frame_with_knee_angle(1_600, 170.0),
    ];

    assert_eq!(run(&mut session, &frames), vec![1]);
}

#[test]
fn test_replay_file_round_trip() {
    let dir = temp_dir("replay");
    let path = dir.join("session.jsonl");
    let frames = SquatSynth::new(15.0).reps(3);

    std::fs::create_dir_all(&dir).unwrap();
    write_frames(&path, &frames).unwrap();
    let loaded = read_frames(&path).unwrap();
    assert_eq!(loaded.len(), frames.len());

    let dispatcher = CoachingDispatcher::new(Arc::new(MemorySink::new()), create_shared_log());
    let mut session = SquatSession::new(&seeded_config(), dispatcher);
    assert_eq!(run(&mut session, &loaded), vec![1, 2, 3]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_feed_with_producer_threads() {
    let mut feed = FrameFeed::new(64);
    feed.start().unwrap();

    // Each producer emits its own slice of the stream in order.
    let frames = SquatSynth::new(30.0).reps(2);
    let (first, second) = frames.split_at(frames.len() / 2);
    let (first, second) = (first.to_vec(), second.to_vec());

    let producer = {
        let handle = feed.handle();
        thread::spawn(move || {
            for frame in first {
                handle.push_blocking(frame).unwrap();
            }
            let tail = handle.clone();
            thread::spawn(move || {
                for frame in second {
                    tail.push_blocking(frame).unwrap();
                }
            })
            .join()
            .unwrap();
        })
    };

    let dispatcher = CoachingDispatcher::new(Arc::new(MemorySink::new()), create_shared_log());
    let mut session = SquatSession::new(&seeded_config(), dispatcher);
    let mut reps = Vec::new();
    let mut received = 0;
    while received < frames.len() {
        let frame = feed.recv_timeout(Duration::from_secs(5)).unwrap();
        received += 1;
        if let Some(event) = session.process_frame(&frame).rep_event() {
            reps.push(event.sequence);
        }
    }
    producer.join().unwrap();
    feed.stop();

    assert_eq!(reps, vec![1, 2]);
    assert_eq!(session.log().stats().frames_stale, 0);
}

#[tokio::test]
async fn test_advice_claims_multiples_of_three() {
    let sink = Arc::new(MemorySink::new());
    let dispatcher = CoachingDispatcher::new(sink.clone(), create_shared_log()).with_advice(
        Arc::new(TipAdvisor::new()),
        Duration::from_secs(1),
        tokio::runtime::Handle::current(),
    );
    let mut config = seeded_config();
    config.coaching.advice_enabled = true;
    let mut session = SquatSession::new(&config, dispatcher);

    let frames = SquatSynth::new(30.0).reps(6);
    let claimed: Vec<u32> = frames
        .iter()
        .map(|frame| session.process_frame(frame))
        .filter(|report| report.advice_claimed)
        .filter_map(|report| report.rep_event())
        .map(|event| event.sequence)
        .collect();
    assert_eq!(claimed, vec![3, 6]);

    session.flush_advice().await;
    session.stop();

    let advice: Vec<_> = sink
        .messages()
        .into_iter()
        .filter(|m| m.source == FeedbackSource::AiCoach)
        .collect();
    assert_eq!(advice.len(), 2);
    for message in advice {
        let rep = message.rep.unwrap();
        assert!(message.text.starts_with(&format!("Rep {rep}: ")));
    }
}

#[tokio::test]
async fn test_stop_leaves_no_advice_in_flight() {
    let sink = Arc::new(MemorySink::new());
    let dispatcher = CoachingDispatcher::new(sink.clone(), create_shared_log()).with_advice(
        Arc::new(TipAdvisor::new().with_delay(Duration::from_millis(500))),
        Duration::from_secs(5),
        tokio::runtime::Handle::current(),
    );
    let mut config = seeded_config();
    config.coaching.advice_enabled = true;
    let mut session = SquatSession::new(&config, dispatcher);

    run(&mut session, &SquatSynth::new(30.0).reps(3));
    session.stop();
    tokio::task::yield_now().await;

    assert_eq!(session.dispatcher().outstanding(), 0);
    assert_eq!(session.log().stats().advice_discarded, 1);
    assert!(sink.messages().iter().all(|m| m.source != FeedbackSource::AiCoach));
}

#[test]
fn test_realtime_coach_replaces_depth_cue() {
    let sink = Arc::new(MemorySink::new());
    let coach = Arc::new(MemoryCoach::new(true));
    let dispatcher =
        CoachingDispatcher::new(sink.clone(), create_shared_log()).with_realtime(coach.clone());
    let mut session = SquatSession::new(&seeded_config(), dispatcher);

    run(&mut session, &SquatSynth::new(30.0).reps(2));

    assert!(sink.messages().iter().all(|m| m.rep.is_some()));
    assert_eq!(sink.len(), 2);
    assert!(!coach.updates().is_empty());
}

#[test]
fn test_stopped_session_ignores_frames() {
    let dispatcher = CoachingDispatcher::new(Arc::new(MemorySink::new()), create_shared_log());
    let mut session = SquatSession::new(&seeded_config(), dispatcher);
    let frames = SquatSynth::new(30.0).reps(2);
    let (first, rest) = frames.split_at(frames.len() / 2);

    assert_eq!(run(&mut session, first), vec![1]);
    session.stop();
    assert!(run(&mut session, rest).is_empty());
    assert_eq!(session.rep_count(), 1);
}

#[test]
fn test_session_stats_persist() {
    let dir = temp_dir("stats");
    let path = dir.join("last_session.json");
    let log = create_shared_log_with_persistence(path.clone());
    let dispatcher = CoachingDispatcher::new(Arc::new(MemorySink::new()), log.clone());
    let mut session = SquatSession::new(&seeded_config(), dispatcher);

    run(&mut session, &SquatSynth::new(30.0).reps(3));
    log.save().unwrap();

    let persisted = load_persisted(&path).unwrap();
    assert_eq!(persisted.stats.reps_counted, 3);
    assert!(persisted.stats.summary().contains('3'));

    let _ = std::fs::remove_dir_all(&dir);
}
