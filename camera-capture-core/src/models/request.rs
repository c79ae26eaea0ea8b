use super::config::Orientation;
use super::geometry::SensorRect;

/// Hardware template a request is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTemplate {
    Preview,
    StillCapture,
}

/// Auto-exposure operating mode. Always produced together with a
/// [`FlashUnitMode`] so the pair stays consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeMode {
    On,
    OnAutoFlash,
    OnAlwaysFlash,
}

/// Physical flash unit drive mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashUnitMode {
    Off,
    Torch,
}

/// Autofocus operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfMode {
    Off,
    ContinuousPicture,
}

/// One-shot autofocus trigger carried by a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfTrigger {
    Idle,
    Start,
    Cancel,
}

/// One-shot auto-exposure precapture trigger carried by a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecaptureTrigger {
    Idle,
    Start,
}

/// Role a target surface plays in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetRole {
    Preview,
    Still,
    Stream,
}

/// Opaque identifier of a host-provided renderable sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

/// A renderable sink registered with the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSurface {
    pub role: TargetRole,
    pub id: SurfaceId,
}

impl TargetSurface {
    pub const fn new(role: TargetRole, id: SurfaceId) -> Self {
        Self { role, id }
    }
}

/// Monotonic identifier for a submitted one-shot request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

/// Role-keyed set of registered target surfaces, at most one per role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetSet {
    preview: Option<TargetSurface>,
    still: Option<TargetSurface>,
    stream: Option<TargetSurface>,
}

impl TargetSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_roles(
        preview: Option<SurfaceId>,
        still: Option<SurfaceId>,
        stream: Option<SurfaceId>,
    ) -> Self {
        Self {
            preview: preview.map(|id| TargetSurface::new(TargetRole::Preview, id)),
            still: still.map(|id| TargetSurface::new(TargetRole::Still, id)),
            stream: stream.map(|id| TargetSurface::new(TargetRole::Stream, id)),
        }
    }

    /// Register or replace the surface for its role. Returns the surface
    /// that was displaced, if any.
    pub fn set(&mut self, surface: TargetSurface) -> Option<TargetSurface> {
        self.slot_mut(surface.role).replace(surface)
    }

    pub fn remove(&mut self, role: TargetRole) -> Option<TargetSurface> {
        self.slot_mut(role).take()
    }

    pub fn get(&self, role: TargetRole) -> Option<TargetSurface> {
        match role {
            TargetRole::Preview => self.preview,
            TargetRole::Still => self.still,
            TargetRole::Stream => self.stream,
        }
    }

    pub fn has(&self, role: TargetRole) -> bool {
        self.get(role).is_some()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.preview.is_none() && self.still.is_none() && self.stream.is_none()
    }

    /// All registered surfaces in preview, still, stream order.
    pub fn surfaces(&self) -> Vec<TargetSurface> {
        [self.preview, self.still, self.stream]
            .into_iter()
            .flatten()
            .collect()
    }

    /// Roles fed by the repeating request (everything except the still sink).
    pub fn repeating_roles(&self) -> Vec<TargetRole> {
        [self.preview, self.stream]
            .into_iter()
            .flatten()
            .map(|surface| surface.role)
            .collect()
    }

    fn slot_mut(&mut self, role: TargetRole) -> &mut Option<TargetSurface> {
        match role {
            TargetRole::Preview => &mut self.preview,
            TargetRole::Still => &mut self.still,
            TargetRole::Stream => &mut self.stream,
        }
    }
}

/// Fully-resolved request value handed to the hardware binding.
///
/// Built fresh for every submission by the pure request builders; a
/// trigger only ever appears on the one-shot request that carries it.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub template: RequestTemplate,
    pub targets: Vec<TargetRole>,
    pub ae_mode: AeMode,
    pub flash: FlashUnitMode,
    pub af_mode: AfMode,
    pub af_trigger: AfTrigger,
    pub precapture_trigger: PrecaptureTrigger,
    pub crop_region: SensorRect,
    pub orientation: Orientation,
}
