use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::emitter::{AFTER_SET_PLAY_RATE, BEFORE_SET_PLAY_RATE, BEFORE_SET_TIME, ENDED, PAUSED, PLAY};

type Log = Rc<RefCell<Vec<String>>>;

struct Recorder {
    log: Log,
}

impl Recorder {
    fn push(&self, hook: &str, params: &ControllerParams<'_>) {
        self.log.borrow_mut().push(format!("{hook}:{}", params.action.id));
    }
}

impl ActionController for Recorder {
    fn enter(&mut self, params: &ControllerParams<'_>) {
        self.push("enter", params);
    }
    fn leave(&mut self, params: &ControllerParams<'_>) {
        self.push("leave", params);
    }
    fn start(&mut self, params: &ControllerParams<'_>) {
        self.push("start", params);
    }
    fn stop(&mut self, params: &ControllerParams<'_>) {
        self.push("stop", params);
    }
}

fn action(id: &str, start: f64, end: f64) -> TimelineAction {
    TimelineAction::new(id, start, end, "clip").unwrap()
}

fn engine_with(actions: Vec<TimelineAction>) -> (TimelineEngine, Log) {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let mut engine = TimelineEngine::new();
    engine.register_controller("clip", Box::new(Recorder { log: Rc::clone(&log) }));
    let mut track = TimelineTrack::new("t1", "Track 1");
    track.actions = actions;
    engine.load_tracks(vec![track]).unwrap();
    log.borrow_mut().clear();
    (engine, log)
}

fn event_log(engine: &mut TimelineEngine, names: &str) -> Log {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    for name in names.split_whitespace() {
        let sink = Rc::clone(&log);
        let tag = name.to_owned();
        engine
            .on(name, move |_| {
                sink.borrow_mut().push(tag.clone());
                true
            })
            .unwrap();
    }
    log
}

fn drain(log: &Log) -> Vec<String> {
    log.borrow_mut().drain(..).collect()
}

#[test]
fn set_time_enters_and_leaves_actions() {
    let (mut engine, log) = engine_with(vec![action("a", 0.0, 2.0), action("b", 1.0, 3.0), action("c", 5.0, 6.0)]);

    assert!(engine.set_time(1.5, false));
    assert_eq!(engine.active_action_ids(), ["a", "b"]);
    assert_eq!(drain(&log), ["enter:b"], "a was already active at load time");

    assert!(engine.set_time(2.5, false));
    assert_eq!(engine.active_action_ids(), ["b"]);
    assert_eq!(drain(&log), ["leave:a"]);

    assert!(engine.set_time(0.5, false));
    assert_eq!(engine.active_action_ids(), ["a"]);
    assert_eq!(drain(&log), ["leave:b", "enter:a"]);
}

#[test]
fn load_tracks_enters_at_current_time() {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let mut engine = TimelineEngine::new();
    engine.register_controller("clip", Box::new(Recorder { log: Rc::clone(&log) }));
    engine.load_tracks(vec![TimelineTrack::new("t", "T").with_action(action("a", 0.0, 1.0))]).unwrap();
    assert_eq!(drain(&log), ["enter:a"]);

    engine.load_tracks(vec![TimelineTrack::new("t", "T").with_action(action("b", 0.0, 1.0))]).unwrap();
    assert_eq!(drain(&log), ["leave:a", "enter:b"]);
}

#[test]
fn before_set_time_can_veto() {
    let (mut engine, _) = engine_with(vec![action("a", 0.0, 2.0)]);
    engine.on(BEFORE_SET_TIME, |_| false).unwrap();
    assert!(!engine.set_time(1.0, false));
    assert!((engine.time()).abs() < f64::EPSILON);
    assert!(engine.set_time(1.0, true), "tick updates bypass the veto");
}

#[test]
fn set_play_rate_validates_and_emits() {
    let mut engine = TimelineEngine::new();
    let events = event_log(&mut engine, "beforeSetPlayRate afterSetPlayRate");

    assert!(!engine.set_play_rate(0.0));
    assert!(!engine.set_play_rate(-1.0));
    assert!(drain(&events).is_empty());

    assert!(engine.set_play_rate(2.0));
    assert!((engine.play_rate() - 2.0).abs() < f64::EPSILON);
    assert_eq!(drain(&events), [BEFORE_SET_PLAY_RATE, AFTER_SET_PLAY_RATE]);

    engine.on(BEFORE_SET_PLAY_RATE, |_| false).unwrap();
    assert!(!engine.set_play_rate(4.0));
    assert!((engine.play_rate() - 2.0).abs() < f64::EPSILON);
}

#[test]
fn play_until_to_time_then_end() {
    let (mut engine, _) = engine_with(vec![action("a", 0.0, 5.0)]);
    let events = event_log(&mut engine, "play paused ended");
    assert!(engine.set_play_rate(2.0));

    assert!(engine.play(PlayOptions { to_time: Some(1.0), auto_end: false }));
    assert!(engine.is_playing());
    assert!(engine.tick(0.0));
    assert!((engine.time()).abs() < f64::EPSILON);

    assert!(engine.tick(250.0));
    assert!((engine.time() - 0.5).abs() < 1e-9);

    assert!(!engine.tick(600.0));
    assert!((engine.time() - 1.0).abs() < 1e-9);
    assert!(engine.is_paused());
    assert_eq!(drain(&events), [PLAY, PAUSED, ENDED]);
}

#[test]
fn tick_caps_elapsed_time() {
    let (mut engine, _) = engine_with(vec![action("a", 0.0, 10.0)]);
    assert!(engine.play(PlayOptions::default()));
    engine.tick(0.0);
    engine.tick(5_000.0);
    assert!((engine.time() - 1.0).abs() < 1e-9);
}

#[test]
fn auto_end_after_last_action_leaves() {
    let (mut engine, _) = engine_with(vec![action("a", 0.0, 1.0)]);
    let events = event_log(&mut engine, "ended");

    assert!(engine.play(PlayOptions { to_time: None, auto_end: true }));
    assert!(engine.tick(0.0));
    assert!(engine.tick(1_000.0));
    assert_eq!(engine.active_action_ids(), ["a"]);
    assert!(!engine.tick(1_500.0));
    assert!(engine.active_action_ids().is_empty());
    assert_eq!(drain(&events), [ENDED]);
}

#[test]
fn set_time_rejects_non_finite() {
    let (mut engine, log) = engine_with(vec![action("a", 0.0, 2.0)]);
    assert!(engine.set_time(1.0, false));
    drain(&log);

    for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        assert!(!engine.set_time(bad, false));
        assert!(!engine.set_time(bad, true));
    }
    assert!((engine.time() - 1.0).abs() < f64::EPSILON);
    assert_eq!(engine.active_action_ids(), ["a"]);
    assert!(drain(&log).is_empty());
}

#[test]
fn play_rejects_non_finite_target() {
    let (mut engine, _) = engine_with(vec![action("a", 0.0, 10.0)]);
    let events = event_log(&mut engine, PLAY);
    assert!(!engine.play(PlayOptions { to_time: Some(f64::NAN), auto_end: false }));
    assert!(!engine.play(PlayOptions { to_time: Some(f64::INFINITY), auto_end: false }));
    assert!(engine.is_paused());
    assert!(drain(&events).is_empty());
}

#[test]
fn play_refuses_when_playing_or_target_behind() {
    let (mut engine, _) = engine_with(vec![action("a", 0.0, 10.0)]);
    engine.set_time(3.0, false);
    assert!(!engine.play(PlayOptions { to_time: Some(3.0), auto_end: false }));
    assert!(!engine.play(PlayOptions { to_time: Some(1.0), auto_end: false }));
    assert!(engine.play(PlayOptions::default()));
    assert!(!engine.play(PlayOptions::default()));
}

#[test]
fn play_and_pause_start_and_stop_active_actions() {
    let (mut engine, log) = engine_with(vec![action("a", 0.0, 2.0), action("b", 3.0, 4.0)]);
    engine.set_time(1.0, false);
    drain(&log);

    engine.play(PlayOptions::default());
    engine.pause();
    assert_eq!(drain(&log), ["start:a", "stop:a"]);
    assert!(!engine.tick(100.0), "paused engine does not advance");
    assert!((engine.time() - 1.0).abs() < f64::EPSILON);
}

#[test]
fn disabled_actions_never_enter() {
    let mut disabled = action("a", 0.0, 2.0);
    disabled.disabled = true;
    let (mut engine, log) = engine_with(vec![disabled, action("b", 0.0, 2.0)]);
    assert_eq!(engine.active_action_ids(), ["b"]);
    engine.set_time(1.0, false);
    assert_eq!(engine.active_action_ids(), ["b"]);
    assert!(drain(&log).is_empty());
}

#[test]
fn load_tracks_rejects_invalid_input_and_keeps_previous() {
    let (mut engine, _) = engine_with(vec![action("a", 0.0, 2.0)]);

    let dup = TimelineTrack::new("t", "T")
        .with_action(action("x", 0.0, 1.0))
        .with_action(action("x", 1.0, 2.0));
    assert_eq!(engine.load_tracks(vec![dup]), Err(EngineError::DuplicateAction("x".into())));

    let mut inverted = action("y", 0.0, 1.0);
    inverted.start = 4.0;
    let bad = TimelineTrack::new("t", "T").with_action(inverted);
    assert!(matches!(
        engine.load_tracks(vec![bad]),
        Err(EngineError::InvalidAction(ActionError::InvertedRange { .. }))
    ));

    assert!(engine.action("a").is_some());
    assert!(engine.action("x").is_none());
}

#[test]
fn load_tracks_pauses_playback() {
    let (mut engine, _) = engine_with(vec![action("a", 0.0, 2.0)]);
    let events = event_log(&mut engine, "paused");
    engine.play(PlayOptions::default());
    engine.load_tracks(Vec::new()).unwrap();
    assert!(engine.is_paused());
    assert_eq!(drain(&events), [PAUSED]);
}

#[test]
fn selected_actions_pair_with_tracks() {
    let mut selected = action("a", 0.0, 2.0);
    selected.selected = true;
    let (mut engine, _) = engine_with(vec![selected, action("b", 0.0, 2.0)]);
    engine.set_time(1.0, false);

    let picked = engine.selected_actions();
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].0.id, "a");
    assert_eq!(picked[0].1.id, "t1");
    assert_eq!(engine.action_track("b").map(|t| t.name.as_str()), Some("Track 1"));
    assert!((engine.duration() - 2.0).abs() < f64::EPSILON);
}
