#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Closing,
}

/// Tracks whether the window should keep drawing. Once closing, it never
/// goes back to running.
#[derive(Debug)]
pub struct FrameLoop {
    state: LoopState,
    frames: u64,
    close_after: Option<u64>,
}

impl FrameLoop {
    pub fn new(close_after: Option<u64>) -> Self {
        let state = match close_after {
            Some(0) => LoopState::Closing,
            _ => LoopState::Running,
        };
        FrameLoop {
            state,
            frames: 0,
            close_after,
        }
    }

    pub fn request_close(&mut self) {
        self.state = LoopState::Closing;
    }

    pub fn frame_presented(&mut self) {
        self.frames += 1;
        if let Some(limit) = self.close_after {
            if self.frames >= limit {
                self.request_close();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}
