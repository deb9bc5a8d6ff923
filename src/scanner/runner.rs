// src/scanner/runner.rs
use anyhow::{anyhow, Result};
use chrono::Local;
use log::{debug, error, info};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use super::core::{self, Completed, Effect, Event, Snapshot};
use crate::ai::connector::{ClassificationResult, ImageClassifier};
use crate::capture::frame::Frame;

enum Message {
    Event(Event),
    Shutdown,
}

/// Cheap sender side of the scanner, for threads that feed it.
#[derive(Clone)]
pub struct ScannerHandle {
    sender: Sender<Message>,
}

impl ScannerHandle {
    pub fn arm(&self) -> Result<()> {
        self.send(Event::Arm)
    }

    pub fn submit_frame(&self, frame: Frame) -> Result<()> {
        self.send(Event::FrameObserved(frame))
    }

    fn send(&self, event: Event) -> Result<()> {
        self.sender
            .send(Message::Event(event))
            .map_err(|_| anyhow!("Scanner is not running"))
    }
}

/// Owns the scan state on a dedicated thread. Frame and result events
/// are reduced one at a time; classification runs off that thread.
pub struct Scanner {
    handle: ScannerHandle,
    snapshot: Arc<Mutex<Snapshot>>,
    worker: Option<JoinHandle<()>>,
}

impl Scanner {
    pub fn start<R>(classifier: Arc<dyn ImageClassifier>, render: R) -> Result<Self>
    where
        R: Fn(&Snapshot) + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let snapshot = Arc::new(Mutex::new(Snapshot::default()));

        let worker = {
            let sender = sender.clone();
            let snapshot = Arc::clone(&snapshot);
            thread::Builder::new()
                .name("scanner".to_string())
                .spawn(move || run_loop(receiver, sender, classifier, snapshot, render))?
        };

        info!("Scanner started");
        Ok(Self {
            handle: ScannerHandle { sender },
            snapshot,
            worker: Some(worker),
        })
    }

    pub fn handle(&self) -> ScannerHandle {
        self.handle.clone()
    }

    pub fn arm(&self) -> Result<()> {
        self.handle.arm()
    }

    pub fn submit_frame(&self, frame: Frame) -> Result<()> {
        self.handle.submit_frame(frame)
    }

    /// Latest published view of the scan state.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Stop the event loop. A request still in flight is abandoned, not cancelled.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.handle.sender.send(Message::Shutdown);
            if worker.join().is_err() {
                error!("Scanner thread panicked");
            }
            info!("Scanner stopped");
        }
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop<R>(
    receiver: Receiver<Message>,
    sender: Sender<Message>,
    classifier: Arc<dyn ImageClassifier>,
    published: Arc<Mutex<Snapshot>>,
    render: R,
) where
    R: Fn(&Snapshot),
{
    let mut state = core::init();

    while let Ok(message) = receiver.recv() {
        let event = match message {
            Message::Event(event) => event,
            Message::Shutdown => break,
        };

        let (next, effects) = core::transition(state, event);
        state = next;

        let view = state.snapshot();
        let changed = {
            let mut current = published.lock().unwrap_or_else(|e| e.into_inner());
            if *current != view {
                *current = view.clone();
                true
            } else {
                false
            }
        };
        if changed {
            render(&view);
        }

        for effect in effects {
            run_effect(effect, &classifier, sender.clone());
        }
    }
}

fn run_effect(effect: Effect, classifier: &Arc<dyn ImageClassifier>, sender: Sender<Message>) {
    match effect {
        Effect::Classify(frame) => {
            let classifier = Arc::clone(classifier);
            let worker_sender = sender.clone();
            let spawned = thread::Builder::new()
                .name("classify".to_string())
                .spawn(move || {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| classifier.classify(frame)))
                        .unwrap_or_else(|_| {
                            error!("Classifier panicked, reporting an error result");
                            ClassificationResult::error()
                        });
                    deliver(&worker_sender, result);
                });
            // every dispatch must produce a result, or scanning never clears
            if let Err(e) = spawned {
                error!("Failed to start classification: {}", e);
                deliver(&sender, ClassificationResult::error());
            }
        }
    }
}

fn deliver(sender: &Sender<Message>, result: ClassificationResult) {
    let completed = Completed {
        result,
        received_at: Local::now(),
    };
    if sender.send(Message::Event(Event::Classified(completed))).is_err() {
        debug!("Scanner stopped before the result arrived");
    }
}
