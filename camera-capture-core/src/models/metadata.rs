/// Per-frame autofocus state reported by the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfState {
    Inactive,
    PassiveScan,
    PassiveFocused,
    PassiveUnfocused,
    ActiveScan,
    FocusedLocked,
    NotFocusedLocked,
}

impl AfState {
    /// A lock sweep has finished, focused or not. Either outcome lets a
    /// still capture proceed.
    pub fn is_locked(self) -> bool {
        matches!(self, Self::FocusedLocked | Self::NotFocusedLocked)
    }
}

/// Per-frame auto-exposure state reported by the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeState {
    Inactive,
    Searching,
    Converged,
    Locked,
    FlashRequired,
    Precapture,
}

/// Metadata attached to one completed frame of any request.
///
/// Either 3A field may be absent; early frames from some pipelines carry
/// no state at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameMetadata {
    pub frame_number: u64,
    pub af_state: Option<AfState>,
    pub ae_state: Option<AeState>,
}

impl FrameMetadata {
    pub fn new(frame_number: u64) -> Self {
        Self {
            frame_number,
            af_state: None,
            ae_state: None,
        }
    }

    pub fn with_af(mut self, af_state: AfState) -> Self {
        self.af_state = Some(af_state);
        self
    }

    pub fn with_ae(mut self, ae_state: AeState) -> Self {
        self.ae_state = Some(ae_state);
        self
    }
}

/// Running counters maintained by the controller worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureDiagnostics {
    pub frames_processed: u64,
    pub stills_completed: u64,
    pub session_rebuilds: u64,
    pub device_restarts: u64,
}
