// src/capture/pipeline.rs
use anyhow::Result;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::feed::FrameSource;
use super::latest::LatestFrame;
use crate::scanner::runner::ScannerHandle;

const ANALYZER_POLL: Duration = Duration::from_millis(100);

/// Feed thread pushing frames at a fixed rate into a keep-latest slot,
/// plus an analyzer thread handing each latest frame to the scanner.
pub struct CameraPipeline {
    running: Arc<AtomicBool>,
    feed: Option<JoinHandle<()>>,
    analyzer: Option<JoinHandle<()>>,
}

impl CameraPipeline {
    pub fn start(
        mut source: Box<dyn FrameSource>,
        interval: Duration,
        scanner: ScannerHandle,
    ) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let latest = Arc::new(LatestFrame::new());

        let feed = {
            let running = Arc::clone(&running);
            let latest = Arc::clone(&latest);
            thread::Builder::new().name("feed".to_string()).spawn(move || {
                let mut dropped = 0u64;
                while running.load(Ordering::SeqCst) {
                    let started = Instant::now();
                    match source.next_frame() {
                        Ok(frame) => {
                            if latest.publish(frame) {
                                dropped += 1;
                            }
                        }
                        Err(e) => {
                            error!("Frame source failed: {}", e);
                            break;
                        }
                    }
                    if let Some(rest) = interval.checked_sub(started.elapsed()) {
                        thread::sleep(rest);
                    }
                }
                debug!("Feed stopped, {} unread frame(s) replaced", dropped);
            })?
        };

        let analyzer = {
            let running = Arc::clone(&running);
            thread::Builder::new().name("analyzer".to_string()).spawn(move || {
                while running.load(Ordering::SeqCst) {
                    if let Some(frame) = latest.take(ANALYZER_POLL) {
                        if scanner.submit_frame(frame).is_err() {
                            warn!("Scanner gone, analyzer exiting");
                            break;
                        }
                    }
                }
            })?
        };

        info!("Camera pipeline started, one frame every {:?}", interval);
        Ok(Self {
            running,
            feed: Some(feed),
            analyzer: Some(analyzer),
        })
    }

    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        for worker in [self.feed.take(), self.analyzer.take()].into_iter().flatten() {
            if worker.join().is_err() {
                error!("Pipeline thread panicked");
            }
        }
    }
}

impl Drop for CameraPipeline {
    fn drop(&mut self) {
        self.halt();
    }
}
