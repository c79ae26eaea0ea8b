/// Per-capture focus and exposure convergence state machine.
///
/// Advanced only on the controller worker as per-frame metadata arrives.
///
/// State transitions:
/// ```text
/// idle → waiting_focus_lock → capture_requested → releasing_focus → idle
///              ↓                      ↑
///          precapture → waiting_precapture_ready
/// ```
///
/// Devices without autofocus skip convergence entirely:
/// `idle → capture_requested → releasing_focus → idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusCaptureState {
    Idle,
    WaitingFocusLock,
    Precapture,
    WaitingPrecaptureReady,
    CaptureRequested,
    ReleasingFocus,
}

impl FocusCaptureState {
    pub fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }

    /// True while waiting on 3A convergence (before the still is submitted).
    pub fn is_converging(self) -> bool {
        matches!(
            self,
            Self::WaitingFocusLock | Self::Precapture | Self::WaitingPrecaptureReady
        )
    }

    /// True from capture intent until the result is delivered.
    pub fn is_in_flight(self) -> bool {
        !self.is_idle()
    }
}

/// Controller run lifecycle.
///
/// State transitions:
/// ```text
/// stopped → opening → previewing → stopped
///                          ↓
///                     restarting → previewing / stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Opening,
    Previewing,
    Restarting,
}

impl RunState {
    pub fn is_stopped(self) -> bool {
        matches!(self, Self::Stopped)
    }

    pub fn is_previewing(self) -> bool {
        matches!(self, Self::Previewing)
    }
}
