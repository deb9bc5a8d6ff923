// src/scanner/core.rs
use chrono::{DateTime, Local};
use log::{debug, info, warn};

use crate::ai::connector::ClassificationResult;
use crate::capture::frame::Frame;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    /// The next observed frame will be classified.
    pub armed: bool,
    /// A classification request is outstanding.
    pub in_flight: bool,
    pub last_result: Option<Completed>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed {
    pub result: ClassificationResult,
    pub received_at: DateTime<Local>,
}

/// What the display layer is allowed to see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub scanning: bool,
    pub last_result: Option<Completed>,
}

#[derive(Debug)]
pub enum Event {
    Arm,
    FrameObserved(Frame),
    Classified(Completed),
}

#[derive(Debug)]
pub enum Effect {
    Classify(Frame),
}

impl State {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            scanning: self.armed || self.in_flight,
            last_result: self.last_result.clone(),
        }
    }
}

pub fn init() -> State {
    State::default()
}

pub fn transition(state: State, event: Event) -> (State, Vec<Effect>) {
    match event {
        Event::Arm if state.in_flight => {
            debug!("Arm ignored, a classification is already in flight");
            (state, vec![])
        }
        Event::Arm => {
            info!("Scan armed, waiting for the next frame");
            (State { armed: true, ..state }, vec![])
        }
        Event::FrameObserved(frame) if state.armed && !state.in_flight => {
            info!("Dispatching {:?} for classification", frame);
            (
                State {
                    armed: false,
                    in_flight: true,
                    ..state
                },
                vec![Effect::Classify(frame)],
            )
        }
        // Not armed: the frame is dropped here.
        Event::FrameObserved(_) => (state, vec![]),
        Event::Classified(completed) if state.in_flight => {
            info!(
                "Result received: {} ({} points)",
                completed.result.label, completed.result.score
            );
            (
                State {
                    armed: false,
                    in_flight: false,
                    last_result: Some(completed),
                },
                vec![],
            )
        }
        Event::Classified(completed) => {
            warn!("Discarding result with nothing in flight: {}", completed.result.label);
            (state, vec![])
        }
    }
}
