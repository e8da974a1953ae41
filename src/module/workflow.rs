//! Provide the capture / classify / indicate workflow.
//!
//! One control thread consumes [`Event`]s and is the only writer of the run state:
//!
//! ```text
//!   Idle --Start--> Live --Start--> Idle
//!                    |
//!                 Capture
//!                    v
//!               Processing --classifier answered / failed--> Idle
//! ```
//!
//! The preview task lives only while Live, the blink task only while Processing. Each
//! is joined before the transition that stopped it goes on.

pub mod state;
pub mod task;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::module::define;
use crate::module::device::button::Button;
use crate::module::device::display::RenderSurface;
use crate::module::device::indicator::IndicatorBank;
use crate::module::message::{self, MessageStyle};
use crate::module::util::common::lock;
use crate::module::util::conf::Config;
use crate::module::util::init::WastecamProperty;
use crate::module::util::path;
use crate::module::vision::camera::FrameSource;
use crate::module::vision::classifier::Classifier;
use crate::module::vision::Category;
use crate::BoxError;

use state::{RunState, StateWriter};

/// Inputs of the control thread.
#[derive(Debug)]
pub enum Event {
    /// A debounced button press and when it happened.
    Pressed { button: Button, at: Instant },
    /// The preview task of live session `session` lost the camera.
    PreviewFailed { session: u64, reason: String },
    /// Interrupt received.
    Shutdown,
}

/// Whether the control loop goes on after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Hardware and classifier handed to the workflow.
pub struct Devices {
    pub camera: Box<dyn FrameSource>,
    pub screen: Box<dyn RenderSurface>,
    pub indicators: IndicatorBank,
    pub classifier: Arc<dyn Classifier>,
}

/// The appliance state machine.
pub struct Workflow {
    conf: Config,
    img_dir: String,
    style: MessageStyle,
    state: StateWriter,
    camera: Arc<Mutex<Box<dyn FrameSource>>>,
    screen: Arc<Mutex<Box<dyn RenderSurface>>>,
    indicators: Arc<Mutex<IndicatorBank>>,
    classifier: Arc<dyn Classifier>,
    events: Sender<Event>,
    preview: Option<JoinHandle<()>>,
    blink: Option<JoinHandle<()>>,
    classifier_task: Option<JoinHandle<()>>,
    // Image of a timed-out classification, removed once its helper is joined.
    leftover: Option<PathBuf>,
    session: u64,
    // Presses stamped inside the last processing window are dropped.
    busy: Option<(Instant, Instant)>,
}

impl Workflow {
    /// `events` is where the preview task reports camera failures; it must feed the
    /// receiver given to [`Workflow::run`].
    pub fn new(
        property: &WastecamProperty,
        devices: Devices,
        events: Sender<Event>,
    ) -> Result<Self, BoxError> {
        let mut indicators = devices.indicators;
        indicators.all_off();
        Ok(Self {
            conf: property.conf.clone(),
            img_dir: property.path.dir.img.clone(),
            style: MessageStyle::from_conf(&property.conf.message)?,
            state: StateWriter::new(),
            camera: Arc::new(Mutex::new(devices.camera)),
            screen: Arc::new(Mutex::new(devices.screen)),
            indicators: Arc::new(Mutex::new(indicators)),
            classifier: devices.classifier,
            events,
            preview: None,
            blink: None,
            classifier_task: None,
            leftover: None,
            session: 0,
            busy: None,
        })
    }

    /// Handle events until shutdown, then leave the hardware dark.
    pub fn run(mut self, events: Receiver<Event>) {
        log::info!("Ready. Press the start button to begin the camera feed.");
        loop {
            match events.recv() {
                Ok(event) => {
                    if self.handle(event) == Flow::Exit {
                        break;
                    }
                }
                Err(_) => {
                    log::warn!("All event sources are gone");
                    break;
                }
            }
        }
        self.shutdown();
    }

    /// Handle one event on the control thread.
    pub fn handle(&mut self, event: Event) -> Flow {
        match event {
            Event::Pressed { button, at } => {
                if self.pressed_while_busy(at) {
                    log::info!("{:?} button pressed while classifying. Ignored.", button);
                    return Flow::Continue;
                }
                match button {
                    Button::Start => self.on_start(),
                    Button::Capture => self.on_capture(),
                }
            }
            Event::PreviewFailed { session, reason } => self.on_preview_failed(session, &reason),
            Event::Shutdown => {
                log::info!("Program stopped.");
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    /// Stop whatever runs and switch everything off.
    pub fn shutdown(&mut self) {
        self.state.set(RunState::Idle);
        self.join_preview();
        self.join_blink();
        self.join_classifier();
        self.release_camera();
        self.lamps_off();
        self.clear_screen();
        log::info!("All indicators off.");
    }

    pub fn state(&self) -> RunState {
        self.state.get()
    }

    pub fn preview_alive(&self) -> bool {
        self.preview.as_ref().map_or(false, |h| !h.is_finished())
    }

    pub fn blink_alive(&self) -> bool {
        self.blink.as_ref().map_or(false, |h| !h.is_finished())
    }

    fn pressed_while_busy(&self, at: Instant) -> bool {
        matches!(self.busy, Some((from, to)) if from <= at && at <= to)
    }

    fn on_start(&mut self) {
        match self.state.get() {
            RunState::Idle => self.go_live(),
            RunState::Live => self.go_idle(),
            RunState::Processing => log::info!("Start button pressed while classifying. Ignored."),
        }
    }

    fn go_live(&mut self) {
        log::info!("Start button pressed. Starting camera feed...");
        self.lamps_off();
        self.show(define::message::STARTING, self.conf.timing.instruction_dwell());

        if let Err(e) = self.open_camera() {
            log::error!("Error: {}. Check your camera connection and configuration.", e);
            self.release_camera();
            self.show(define::message::CAMERA_FAILED, self.conf.timing.error_dwell());
            return;
        }

        self.session += 1;
        self.state.set(RunState::Live);
        let preview = task::Preview {
            state: self.state.reader(),
            session: self.session,
            camera: Arc::clone(&self.camera),
            screen: Arc::clone(&self.screen),
            events: self.events.clone(),
            frame_interval: Duration::from_millis(self.conf.camera.frame_interval_ms),
            poll: self.conf.timing.poll_interval(),
        };
        match task::spawn_preview(preview) {
            Ok(handle) => self.preview = Some(handle),
            Err(e) => {
                log::error!("Can't start the preview task: {}", e);
                self.state.set(RunState::Idle);
                self.release_camera();
                self.show(define::message::CAMERA_FAILED, self.conf.timing.error_dwell());
            }
        }
    }

    fn go_idle(&mut self) {
        log::info!("Start button pressed. Camera is already running. Stopping it...");
        self.state.set(RunState::Idle);
        self.lamps_off();
        self.join_preview();
        self.release_camera();
        self.clear_screen();
    }

    fn on_preview_failed(&mut self, session: u64, reason: &str) {
        if self.state.get() != RunState::Live || session != self.session {
            log::debug!("Stale camera failure of session {} ignored: {}", session, reason);
            return;
        }
        log::error!("Camera failed while live: {}. Returning to idle.", reason);
        self.state.set(RunState::Idle);
        self.join_preview();
        self.release_camera();
        self.lamps_off();
        self.show(define::message::CAMERA_FAILED, self.conf.timing.error_dwell());
        self.clear_screen();
    }

    fn on_capture(&mut self) {
        if self.state.get() != RunState::Live {
            log::info!("Capture button pressed. Cannot capture. Camera is not running.");
            return;
        }
        log::info!("Capture button pressed. Capturing image...");
        let begun = Instant::now();
        self.state.set(RunState::Processing);
        self.join_preview();
        // Blink takes over from the preview for the whole of Processing.
        self.start_blink();

        let image = match self.capture() {
            Ok(image) => image,
            Err(e) => {
                log::error!("Failed to capture image: {}", e);
                self.state.set(RunState::Idle);
                self.busy = Some((begun, Instant::now()));
                self.join_blink();
                self.release_camera();
                self.lamps_off();
                self.show(define::message::CAPTURE_FAILED, self.conf.timing.error_dwell());
                return;
            }
        };
        self.release_camera();
        log::info!("Image saved as {}", image.display());

        self.show(define::message::CAPTURED, self.conf.timing.captured_dwell());

        let verdict = self.classify(&image);

        self.state.set(RunState::Idle);
        self.busy = Some((begun, Instant::now()));
        self.join_blink();
        self.lamps_off();
        self.indicate(verdict, &image);
    }

    fn capture(&self) -> Result<PathBuf, BoxError> {
        let path = path::unique_capture_path(
            &self.img_dir,
            &self.conf.system.image_prefix,
            define::path::IMG_EXT,
        );
        if let Err(e) = lock(&self.camera).capture_still(&path) {
            discard(&path);
            return Err(e);
        }
        Ok(path)
    }

    /// Ask the classifier, giving up after the configured timeout.
    ///
    /// A helper that timed out keeps its handle and is joined before the next call,
    /// so two classifications never overlap. Its late answer is dropped.
    fn classify(&mut self, image: &Path) -> Result<u8, BoxError> {
        self.join_classifier();
        let (tx, rx) = mpsc::channel();
        let classifier = Arc::clone(&self.classifier);
        let path = image.to_path_buf();
        let handle = thread::Builder::new()
            .name("classifier".to_string())
            .spawn(move || {
                let _ = tx.send(classifier.classify(&path));
            })?;
        self.classifier_task = Some(handle);
        let timeout = self.conf.timing.classify_timeout();
        let verdict = match rx.recv_timeout(timeout) {
            Ok(verdict) => verdict,
            Err(RecvTimeoutError::Timeout) => {
                return Err(format!("no answer within {:?}", timeout).into())
            }
            Err(RecvTimeoutError::Disconnected) => Err("classifier ended without an answer".into()),
        };
        self.join_classifier();
        verdict
    }

    fn indicate(&mut self, verdict: Result<u8, BoxError>, image: &Path) {
        match verdict {
            Ok(n) => match Category::from_u8(n) {
                Some(category) => {
                    log::info!("{} classified as {}", image.display(), category.name());
                    lock(&self.indicators).set(category);
                    let text = define::message::RESULT.replace("{}", category.name());
                    self.show(&text, self.conf.timing.result_dwell());
                }
                None => {
                    log::warn!("Unknown waste type number: {}. No indicator will be turned on.", n);
                    self.show(define::message::UNKNOWN_CATEGORY, self.conf.timing.error_dwell());
                }
            },
            Err(e) => {
                log::error!("Classification failed: {}", e);
                if self.classifier_task.is_some() {
                    // Still being read by the helper that timed out.
                    self.leftover = Some(image.to_path_buf());
                } else {
                    discard(image);
                }
                self.show(define::message::CLASSIFY_FAILED, self.conf.timing.error_dwell());
            }
        }
    }

    fn start_blink(&mut self) {
        let blink = task::Blink {
            state: self.state.reader(),
            indicators: Arc::clone(&self.indicators),
            interval: self.conf.timing.blink_interval(),
            poll: self.conf.timing.poll_interval(),
        };
        match task::spawn_blink(blink) {
            Ok(handle) => self.blink = Some(handle),
            Err(e) => log::warn!("Classifying without blinking: {}", e),
        }
    }

    fn join_preview(&mut self) {
        if let Some(handle) = self.preview.take() {
            task::join(handle, "preview", self.conf.timing.task_join_timeout());
        }
    }

    fn join_blink(&mut self) {
        if let Some(handle) = self.blink.take() {
            task::join(handle, "blink", self.conf.timing.task_join_timeout());
        }
    }

    fn join_classifier(&mut self) {
        if let Some(handle) = self.classifier_task.take() {
            task::join(handle, "classifier", self.conf.timing.task_join_timeout());
        }
        if let Some(image) = self.leftover.take() {
            discard(&image);
        }
    }

    fn open_camera(&self) -> Result<(), BoxError> {
        let c = &self.conf.camera;
        let mut camera = lock(&self.camera);
        camera.open()?;
        camera.configure(c.width, c.height, &c.format)?;
        camera.start()
    }

    fn release_camera(&self) {
        let mut camera = lock(&self.camera);
        if let Err(e) = camera.stop() {
            log::warn!("Camera did not stop cleanly: {}", e);
        }
        camera.close();
    }

    fn lamps_off(&self) {
        lock(&self.indicators).all_off();
    }

    /// Show `text` and keep it up for `dwell`.
    fn show(&self, text: &str, dwell: Duration) {
        {
            let mut screen = lock(&self.screen);
            let (width, height) = screen.size();
            let image = message::compose(text, width, height, &self.style);
            if let Err(e) = screen.display(&image) {
                log::warn!("Message {:?} not shown: {}", text, e);
            }
        }
        thread::sleep(dwell);
    }

    fn clear_screen(&self) {
        if let Err(e) = lock(&self.screen).clear() {
            log::warn!("Screen not cleared: {}", e);
        }
    }
}

fn discard(path: &Path) {
    if path.exists() {
        match fs::remove_file(path) {
            Ok(()) => log::info!("Removed {}", path.display()),
            Err(e) => log::warn!("Can't remove {}: {}", path.display(), e),
        }
    }
}
