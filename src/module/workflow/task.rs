//! Background loops of the workflow.
//!
//! Both loops stop on their own once the run state leaves the state they belong to.
//! They re-check it at least once per poll interval, even while waiting out a frame
//! period or a blink step.

use std::io;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::state::{RunState, StateReader};
use super::Event;
use crate::module::device::display::RenderSurface;
use crate::module::device::indicator::IndicatorBank;
use crate::module::util::common::lock;
use crate::module::vision::camera::FrameSource;

/// Sleep for `total`, waking every `poll` to check that the state is still `expected`.
///
/// Returns `false` as soon as it is not.
pub fn pause_while(state: &StateReader, expected: RunState, total: Duration, poll: Duration) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if state.get() != expected {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(poll.min(deadline - now));
    }
}

/// Everything the preview loop needs.
pub struct Preview {
    pub state: StateReader,
    pub session: u64,
    pub camera: Arc<Mutex<Box<dyn FrameSource>>>,
    pub screen: Arc<Mutex<Box<dyn RenderSurface>>>,
    pub events: Sender<Event>,
    pub frame_interval: Duration,
    pub poll: Duration,
}

/// Copy camera frames to the screen while the state is Live.
///
/// A camera error ends the loop and is reported to the workflow as
/// [`Event::PreviewFailed`]; the loop never changes the run state itself.
pub fn spawn_preview(task: Preview) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("preview".to_string())
        .spawn(move || {
            log::debug!("Preview task {} started", task.session);
            while task.state.get() == RunState::Live {
                let frame = lock(&task.camera).poll_frame();
                match frame {
                    Ok(frame) => {
                        if let Err(e) = lock(&task.screen).display(&frame) {
                            log::warn!("Preview frame not shown: {}", e);
                        }
                    }
                    Err(e) => {
                        log::error!("Camera loop error: {}", e);
                        let report = Event::PreviewFailed {
                            session: task.session,
                            reason: e.to_string(),
                        };
                        if task.events.send(report).is_err() {
                            log::warn!("Camera failure not delivered, workflow is gone");
                        }
                        break;
                    }
                }
                if !pause_while(&task.state, RunState::Live, task.frame_interval, task.poll) {
                    break;
                }
            }
            log::debug!("Preview task {} exited", task.session);
        })
}

/// Everything the blink loop needs.
pub struct Blink {
    pub state: StateReader,
    pub indicators: Arc<Mutex<IndicatorBank>>,
    pub interval: Duration,
    pub poll: Duration,
}

/// Walk the indicators round-robin while the state is Processing.
pub fn spawn_blink(task: Blink) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("blink".to_string())
        .spawn(move || {
            log::debug!("Blink task started");
            while task.state.get() == RunState::Processing {
                lock(&task.indicators).blink_cycle();
                if !pause_while(&task.state, RunState::Processing, task.interval, task.poll) {
                    break;
                }
            }
            log::debug!("Blink task exited");
        })
}

/// Wait for a task that was told to stop.
///
/// Past `overdue` a warning is logged, but the wait goes on: nothing may touch the
/// task's devices while it is still running.
pub fn join(handle: JoinHandle<()>, name: &str, overdue: Duration) {
    let deadline = Instant::now() + overdue;
    while !handle.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    if !handle.is_finished() {
        log::warn!("{} task still running after {:?}, waiting for it", name, overdue);
    }
    if handle.join().is_err() {
        log::error!("{} task panicked", name);
    }
}

#[cfg(test)]
mod tests {
    use super::super::state::StateWriter;
    use super::*;
    use crate::module::device::indicator::probe;

    #[test]
    fn pause_runs_full_length_when_state_holds() {
        let writer = StateWriter::new();
        let started = Instant::now();
        assert!(pause_while(
            &writer.reader(),
            RunState::Idle,
            Duration::from_millis(30),
            Duration::from_millis(5)
        ));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn pause_ends_early_on_state_change() {
        let writer = StateWriter::new();
        writer.set(RunState::Live);
        let reader = writer.reader();
        let sleeper = thread::spawn(move || {
            pause_while(
                &reader,
                RunState::Live,
                Duration::from_secs(10),
                Duration::from_millis(5),
            )
        });
        thread::sleep(Duration::from_millis(20));
        let changed = Instant::now();
        writer.set(RunState::Idle);
        assert!(!sleeper.join().unwrap());
        assert!(changed.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn blink_runs_only_while_processing() {
        let writer = StateWriter::new();
        writer.set(RunState::Processing);
        let (bank, lamps) = probe::bank();
        let indicators = Arc::new(Mutex::new(bank));
        let handle = spawn_blink(Blink {
            state: writer.reader(),
            indicators: Arc::clone(&indicators),
            interval: Duration::from_millis(10),
            poll: Duration::from_millis(2),
        })
        .unwrap();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(probe::lit(&lamps).len(), 1);
        writer.set(RunState::Idle);
        join(handle, "blink", Duration::from_millis(500));
        // Exactly one lamp from the last step stays lit until the workflow clears it.
        assert_eq!(probe::lit(&lamps).len(), 1);
    }

    #[test]
    fn join_waits_past_overdue() {
        let handle = thread::spawn(|| thread::sleep(Duration::from_millis(40)));
        let started = Instant::now();
        join(handle, "slow", Duration::from_millis(5));
        assert!(started.elapsed() >= Duration::from_millis(40));
    }
}
