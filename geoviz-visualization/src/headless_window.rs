//! Scripted window system without a display.
//!
//! Each poll or wait hands out the next queued batch of events. Waiting on
//! an empty queue closes the window, since nothing could ever wake it.

use std::collections::{HashSet, VecDeque};

use geoviz_core::{Error, Result};
use geoviz_gpu::{share_backend, HeadlessBackend, HeadlessRecorder, SharedBackend};

use crate::window::{InputEvent, WindowConfig, WindowHandle, WindowSystem};

/// Window created by [`HeadlessWindowSystem`]
#[derive(Debug)]
pub struct HeadlessWindow {
    id: u64,
    size: (u32, u32),
    should_close: bool,
    title: String,
}

impl HeadlessWindow {
    pub fn title(&self) -> &str {
        &self.title
    }
}

impl WindowHandle for HeadlessWindow {
    fn framebuffer_size(&self) -> (u32, u32) {
        self.size
    }

    fn set_should_close(&mut self, value: bool) {
        self.should_close = value;
    }

    fn should_close(&self) -> bool {
        self.should_close
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Default)]
pub struct HeadlessWindowSystem {
    batches: VecDeque<Vec<InputEvent>>,
    poll_limit: Option<usize>,
    polls: usize,
    fail_window: bool,
    fail_backend: bool,
    failing_programs: Vec<&'static str>,
    failing_frames: usize,
    live_windows: HashSet<u64>,
    recorder: Option<HeadlessRecorder>,
    error_callback: Option<Box<dyn FnMut(&str)>>,
    next_id: u64,
}

impl HeadlessWindowSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the window after `limit` polls or waits
    pub fn with_poll_limit(mut self, limit: usize) -> Self {
        self.poll_limit = Some(limit);
        self
    }

    /// Make the next `create_window` fail
    pub fn fail_window(mut self) -> Self {
        self.fail_window = true;
        self
    }

    /// Make the next `create_backend` fail
    pub fn fail_backend(mut self) -> Self {
        self.fail_backend = true;
        self
    }

    /// Backends created from now on reject this program label
    pub fn with_failing_program(mut self, label: &'static str) -> Self {
        self.failing_programs.push(label);
        self
    }

    /// The next backend fails its first `count` frames
    pub fn with_failing_frames(mut self, count: usize) -> Self {
        self.failing_frames = count;
        self
    }

    /// Windows created and not yet destroyed
    pub fn live_windows(&self) -> usize {
        self.live_windows.len()
    }

    /// Queue a batch holding a single event
    pub fn push_event(&mut self, event: InputEvent) {
        self.batches.push_back(vec![event]);
    }

    /// Queue events delivered together by one poll or wait
    pub fn push_batch(&mut self, events: Vec<InputEvent>) {
        self.batches.push_back(events);
    }

    pub fn pending_batches(&self) -> usize {
        self.batches.len()
    }

    /// Number of polls and waits served so far
    pub fn polls(&self) -> usize {
        self.polls
    }

    /// Log of the most recently created backend
    pub fn recorder(&self) -> Option<HeadlessRecorder> {
        self.recorder.clone()
    }

    fn report_error(&mut self, message: &str) {
        if let Some(callback) = self.error_callback.as_mut() {
            callback(message);
        }
    }

    fn next_batch(&mut self, window: &mut dyn WindowHandle, block: bool) -> Vec<InputEvent> {
        self.polls += 1;
        if self.poll_limit.is_some_and(|limit| self.polls > limit) {
            window.set_should_close(true);
            return Vec::new();
        }
        match self.batches.pop_front() {
            Some(batch) => batch,
            None => {
                if block {
                    window.set_should_close(true);
                }
                Vec::new()
            }
        }
    }
}

impl WindowSystem for HeadlessWindowSystem {
    fn create_window(&mut self, config: &WindowConfig) -> Result<Box<dyn WindowHandle>> {
        if std::mem::take(&mut self.fail_window) {
            self.report_error("window creation refused");
            return Err(Error::Initialization("failed to create window".to_string()));
        }
        self.next_id += 1;
        self.live_windows.insert(self.next_id);
        Ok(Box::new(HeadlessWindow {
            id: self.next_id,
            size: (config.width, config.height),
            should_close: false,
            title: config.title.clone(),
        }))
    }

    fn destroy_window(&mut self, window: Box<dyn WindowHandle>) {
        if !self.live_windows.remove(&window.id()) {
            self.report_error("destroying an unknown window");
        }
    }

    fn create_backend(&mut self, window: &dyn WindowHandle) -> Result<SharedBackend> {
        if std::mem::take(&mut self.fail_backend) {
            self.report_error("no graphics adapter");
            return Err(Error::Initialization("failed to create graphics backend".to_string()));
        }
        let (width, height) = window.framebuffer_size();
        let backend = self
            .failing_programs
            .iter()
            .fold(HeadlessBackend::new(width, height), |backend, label| {
                backend.with_failing_program(*label)
            })
            .with_failing_frames(std::mem::take(&mut self.failing_frames));
        self.recorder = Some(backend.recorder());
        Ok(share_backend(backend))
    }

    fn poll_events(&mut self, window: &mut dyn WindowHandle) -> Vec<InputEvent> {
        self.next_batch(window, false)
    }

    fn wait_events(&mut self, window: &mut dyn WindowHandle) -> Vec<InputEvent> {
        self.next_batch(window, true)
    }

    fn set_error_callback(&mut self, callback: Box<dyn FnMut(&str)>) {
        self.error_callback = Some(callback);
    }
}
