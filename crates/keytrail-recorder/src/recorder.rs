//! Threaded recorder
//!
//! One thread runs the event source and forwards raw events over a bounded
//! channel; a second thread owns the [`EventTranslator`] and is the only
//! writer of the log. Both stop on a shared flag.

use crate::events::{RawEvent, Stamped};
use crate::translator::{EventTranslator, TranslatorConfig};
use anyhow::{anyhow, Result};
pub use crossbeam_channel::{Receiver, Sender};
use crossbeam_channel::{bounded, RecvTimeoutError, SendError};
use keytrail_core::{ActionLog, Clock, SystemClock, WindowService};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How often blocked threads re-check the stop flag
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Sending half handed to an event source. Each event is stamped with
/// the recorder clock when it is sent.
pub struct EventSink {
    tx: Sender<Stamped>,
    clock: Arc<dyn Clock>,
}

impl EventSink {
    /// Fails once the translator has gone away
    pub fn send(&self, event: RawEvent) -> std::result::Result<(), SendError<RawEvent>> {
        let stamped = Stamped {
            at: self.clock.now(),
            event,
        };
        self.tx
            .send(stamped)
            .map_err(|SendError(stamped)| SendError(stamped.event))
    }
}

/// Producer of raw input events
pub trait EventSource: Send + 'static {
    /// Push events into `sink` until `stop` is set or the input ends
    fn listen(&mut self, sink: &EventSink, stop: &AtomicBool) -> Result<()>;
}

/// Forward events pushed by another component
impl EventSource for Receiver<RawEvent> {
    fn listen(&mut self, sink: &EventSink, stop: &AtomicBool) -> Result<()> {
        while !stop.load(Ordering::Acquire) {
            match self.recv_timeout(POLL_INTERVAL) {
                Ok(event) => {
                    if sink.send(event).is_err() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        Ok(())
    }
}

/// A fixed script of events, delivered as fast as the channel accepts them
impl EventSource for Vec<RawEvent> {
    fn listen(&mut self, sink: &EventSink, stop: &AtomicBool) -> Result<()> {
        for event in self.drain(..) {
            if stop.load(Ordering::Acquire) || sink.send(event).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Recorder configuration
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub translator: TranslatorConfig,
    /// Raw events buffered between the source and the translator
    pub max_buffer: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            translator: TranslatorConfig::default(),
            max_buffer: 10000,
        }
    }
}

/// Recording handle - owns the recording session
pub struct RecordingHandle {
    stop: Arc<AtomicBool>,
    seen: Arc<AtomicUsize>,
    listener: Option<thread::JoinHandle<()>>,
    translator: Option<thread::JoinHandle<ActionLog>>,
}

impl RecordingHandle {
    /// Stop recording and return the finalized log. Safe to call from any
    /// thread; no event handled after this returns is part of the log.
    pub fn stop(mut self) -> Result<ActionLog> {
        self.stop.store(true, Ordering::Release);
        self.join()
    }

    /// Block until the recording ends on its own (stop hotkey, or the
    /// event source running dry) and return the log
    pub fn wait(mut self) -> Result<ActionLog> {
        let log = self.join_translator()?;
        self.stop.store(true, Ordering::Release);
        self.join_listener();
        Ok(log)
    }

    /// Raise the stop flag without waiting. Events the translator takes
    /// from the queue after this are dropped.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        !self.stop.load(Ordering::Acquire)
    }

    /// Raw events handed to the translator so far
    pub fn events_seen(&self) -> usize {
        self.seen.load(Ordering::Relaxed)
    }

    fn join(&mut self) -> Result<ActionLog> {
        let log = self.join_translator()?;
        self.join_listener();
        Ok(log)
    }

    fn join_translator(&mut self) -> Result<ActionLog> {
        self.translator
            .take()
            .ok_or_else(|| anyhow!("recording already finished"))?
            .join()
            .map_err(|_| anyhow!("translator thread panicked"))
    }

    fn join_listener(&mut self) {
        if let Some(listener) = self.listener.take() {
            if listener.join().is_err() {
                tracing::warn!("event source thread panicked");
            }
        }
    }
}

impl Drop for RecordingHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

/// The recorder
pub struct Recorder {
    config: RecorderConfig,
    clock: Arc<dyn Clock>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::with_config(RecorderConfig::default())
    }

    pub fn with_config(config: RecorderConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Start listening without blocking the caller
    pub fn start<S, W>(&self, source: S, windows: W) -> Result<RecordingHandle>
    where
        S: EventSource,
        W: WindowService + Send + 'static,
    {
        let (tx, rx) = bounded::<Stamped>(self.config.max_buffer);
        let stop = Arc::new(AtomicBool::new(false));
        let seen = Arc::new(AtomicUsize::new(0));

        let mut translator = EventTranslator::new(self.config.translator.clone(), windows)
            .with_clock(self.clock.clone());
        translator.start();

        // Thread 1: event source
        let sink = EventSink {
            tx,
            clock: self.clock.clone(),
        };
        let stop1 = stop.clone();
        let mut source = source;
        let listener = thread::Builder::new()
            .name("keytrail-source".into())
            .spawn(move || {
                if let Err(e) = source.listen(&sink, &stop1) {
                    tracing::warn!("event source failed: {:#}", e);
                }
            })?;

        // Thread 2: translator, sole owner of the log
        let stop2 = stop.clone();
        let seen2 = seen.clone();
        let translator = thread::Builder::new()
            .name("keytrail-translator".into())
            .spawn(move || run_translator(translator, rx, stop2, seen2))?;

        Ok(RecordingHandle {
            stop,
            seen,
            listener: Some(listener),
            translator: Some(translator),
        })
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

fn run_translator(
    mut translator: EventTranslator,
    rx: Receiver<Stamped>,
    stop: Arc<AtomicBool>,
    seen: Arc<AtomicUsize>,
) -> ActionLog {
    loop {
        let stamped = match rx.recv_timeout(POLL_INTERVAL) {
            Ok(stamped) => stamped,
            Err(RecvTimeoutError::Timeout) => {
                if stop.load(Ordering::Acquire) {
                    break;
                }
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::debug!("event source closed");
                break;
            }
        };

        if stop.load(Ordering::Acquire) {
            break;
        }
        seen.fetch_add(1, Ordering::Relaxed);
        translator.dispatch_at(stamped.event, stamped.at);

        if translator.is_stopped() {
            break;
        }
    }

    stop.store(true, Ordering::Release);
    translator.stop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use keytrail_core::{Key, ManualClock};

    #[test]
    fn sink_stamps_events_when_sent() {
        let clock = ManualClock::new();
        let (tx, rx) = bounded(4);
        let sink = EventSink {
            tx,
            clock: Arc::new(clock.clone()),
        };
        let t0 = clock.now();

        sink.send(RawEvent::key(Key::Char('a'), 38)).unwrap();
        clock.advance(Duration::from_secs(3));
        sink.send(RawEvent::ScrollUp).unwrap();
        // Late delivery does not move the stamps
        clock.advance(Duration::from_secs(60));

        let first = rx.recv().unwrap();
        let second = rx.recv().unwrap();
        assert_eq!(first.at, t0);
        assert_eq!(first.event, RawEvent::key(Key::Char('a'), 38));
        assert_eq!(second.at, t0 + Duration::from_secs(3));
        assert_eq!(second.event, RawEvent::ScrollUp);
    }

    #[test]
    fn send_hands_the_event_back_once_disconnected() {
        let (tx, rx) = bounded(1);
        let sink = EventSink {
            tx,
            clock: Arc::new(SystemClock),
        };
        drop(rx);
        let err = sink.send(RawEvent::ScrollDown).unwrap_err();
        assert_eq!(err.into_inner(), RawEvent::ScrollDown);
    }
}
