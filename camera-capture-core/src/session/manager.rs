//! Target-surface registry and hardware session lifecycle.

use log::{debug, warn};

use crate::models::error::CameraError;
use crate::models::request::{TargetRole, TargetSet, TargetSurface};
use crate::traits::backend::{CameraDevice, CameraSession, SessionEvents};

/// Session lifecycle subscribers, notified in declaration order.
///
/// Preview comes first so that on focus release the repeating stream is
/// restored before still capture delivers its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SubscriberId {
    Preview,
    StillCapture,
}

/// Owns the role-to-surface map and the configured hardware session.
///
/// Session configuration is asynchronous: `create_session` starts a
/// configure cycle and the handle arrives later via `install_session`.
/// Each cycle gets a fresh generation; events tagged with an older
/// generation belong to a torn-down session and are discarded.
pub(crate) struct CaptureSessionManager {
    targets: TargetSet,
    session: Option<Box<dyn CameraSession>>,
    subscribers: [SubscriberId; 2],
    generation: u64,
    configuring: bool,
}

impl CaptureSessionManager {
    pub fn new() -> Self {
        Self {
            targets: TargetSet::new(),
            session: None,
            subscribers: [SubscriberId::Preview, SubscriberId::StillCapture],
            generation: 0,
            configuring: false,
        }
    }

    pub fn subscribers(&self) -> [SubscriberId; 2] {
        self.subscribers
    }

    pub fn targets(&self) -> &TargetSet {
        &self.targets
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_configuring(&self) -> bool {
        self.configuring
    }

    /// Registers or replaces the surface for its role. With a live session
    /// this tears the session down and starts a configure cycle against
    /// the updated set. Returns true when a recreate was started.
    pub fn set_target(
        &mut self,
        surface: TargetSurface,
        device: Option<&mut dyn CameraDevice>,
        make_events: impl FnOnce(u64) -> SessionEvents,
    ) -> Result<bool, CameraError> {
        let replaced = self.targets.set(surface);
        if replaced.is_some() {
            debug!("replaced {:?} target surface", surface.role);
        }
        self.recreate_if_live(device, make_events)
    }

    /// Removes the surface for `role`, recreating the session over the
    /// remaining targets when one is live.
    pub fn remove_target(
        &mut self,
        role: TargetRole,
        device: Option<&mut dyn CameraDevice>,
        make_events: impl FnOnce(u64) -> SessionEvents,
    ) -> Result<bool, CameraError> {
        if self.targets.remove(role).is_none() {
            return Ok(false);
        }
        self.recreate_if_live(device, make_events)
    }

    /// Replaces the whole target set in a single configure cycle.
    pub fn apply_target_set(
        &mut self,
        targets: TargetSet,
        device: Option<&mut dyn CameraDevice>,
        make_events: impl FnOnce(u64) -> SessionEvents,
    ) -> Result<bool, CameraError> {
        self.targets = targets;
        self.recreate_if_live(device, make_events)
    }

    /// Starts configuring a session over the current target set.
    pub fn create_session(
        &mut self,
        device: &mut dyn CameraDevice,
        make_events: impl FnOnce(u64) -> SessionEvents,
    ) -> Result<(), CameraError> {
        if self.targets.is_empty() {
            return Err(CameraError::InvalidState(
                "no target surfaces registered".into(),
            ));
        }

        self.generation += 1;
        self.configuring = true;
        let events = make_events(self.generation);
        let surfaces = self.targets.surfaces();

        device.create_session(&surfaces, events).map_err(|e| {
            self.configuring = false;
            e
        })?;
        debug!(
            "session configure started over {} target(s), generation {}",
            surfaces.len(),
            self.generation
        );
        Ok(())
    }

    /// Installs a session delivered by the hardware. A handle for a stale
    /// generation is closed and dropped.
    pub fn install_session(
        &mut self,
        mut session: Box<dyn CameraSession>,
        generation: u64,
    ) -> bool {
        if generation != self.generation {
            warn!(
                "discarding configured session for stale generation {}",
                generation
            );
            session.close();
            return false;
        }
        self.configuring = false;
        self.session = Some(session);
        true
    }

    /// Records a configure failure. Returns false for stale generations.
    pub fn configure_failed(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.configuring = false;
        self.close_session();
        true
    }

    /// Aborts in-flight work and tears the session down. Teardown faults
    /// are logged, never propagated. Bumps the generation so queued events
    /// from the dead session cannot land.
    pub fn close_session(&mut self) {
        self.generation += 1;
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.stop_repeating() {
                warn!("stop repeating failed during teardown: {}", e);
            }
            if let Err(e) = session.abort_captures() {
                warn!("abort captures failed during teardown: {}", e);
            }
            session.close();
        }
    }

    /// Empties the target set, tearing down any live session. Used before
    /// a device switch.
    pub fn clear_targets(&mut self) {
        self.close_session();
        self.targets.clear();
    }

    /// Split borrow for notification dispatch.
    pub fn active_parts(&mut self) -> (Option<&mut dyn CameraSession>, &TargetSet) {
        let session: Option<&mut dyn CameraSession> = match self.session.as_mut() {
            Some(session) => Some(&mut **session),
            None => None,
        };
        (session, &self.targets)
    }

    fn recreate_if_live(
        &mut self,
        device: Option<&mut dyn CameraDevice>,
        make_events: impl FnOnce(u64) -> SessionEvents,
    ) -> Result<bool, CameraError> {
        // A configure in flight counts as live: its session would be built
        // over the surfaces registered before this update.
        if self.session.is_none() && !self.configuring {
            return Ok(false);
        }
        self.configuring = false;
        self.close_session();
        if self.targets.is_empty() {
            return Ok(false);
        }
        let Some(device) = device else {
            return Ok(false);
        };
        self.create_session(device, make_events)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::request::SurfaceId;
    use crate::session::controller::ControlMessage;
    use crate::test_support::FakeBackend;
    use crate::traits::backend::{CameraBackend, DeviceEvents};
    use crossbeam_channel::{unbounded, Receiver, Sender};

    fn preview_surface() -> TargetSurface {
        TargetSurface::new(TargetRole::Preview, SurfaceId(1))
    }

    fn still_surface() -> TargetSurface {
        TargetSurface::new(TargetRole::Still, SurfaceId(2))
    }

    fn events_from(tx: &Sender<ControlMessage>) -> impl FnOnce(u64) -> SessionEvents {
        let tx = tx.clone();
        move |generation| SessionEvents { tx, generation }
    }

    struct Rig {
        manager: CaptureSessionManager,
        device: Box<dyn CameraDevice>,
        backend: FakeBackend,
        tx: Sender<ControlMessage>,
        rx: Receiver<ControlMessage>,
    }

    impl Rig {
        fn new() -> Self {
            Self::with_backend(FakeBackend::new())
        }

        fn with_backend(mut backend: FakeBackend) -> Self {
            let (tx, rx) = unbounded();
            let device = backend
                .open(
                    "cam0",
                    DeviceEvents {
                        tx: tx.clone(),
                        generation: 1,
                    },
                )
                .unwrap();
            Self {
                manager: CaptureSessionManager::new(),
                device,
                backend,
                tx,
                rx,
            }
        }

        /// Feeds queued configure outcomes back into the manager, the way
        /// the controller worker does.
        fn pump(&mut self) {
            while let Ok(message) = self.rx.try_recv() {
                match message {
                    ControlMessage::SessionConfigured {
                        generation,
                        session,
                    } => {
                        self.manager.install_session(session, generation);
                    }
                    ControlMessage::SessionConfigureFailed { generation } => {
                        self.manager.configure_failed(generation);
                    }
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn set_target_before_any_session_only_registers() {
        let mut rig = Rig::new();
        let events = events_from(&rig.tx);

        let recreated = rig
            .manager
            .set_target(preview_surface(), Some(rig.device.as_mut()), events)
            .unwrap();

        assert!(!recreated);
        assert!(rig.manager.targets().has(TargetRole::Preview));
        assert!(rig.backend.create_calls().lock().is_empty());
    }

    #[test]
    fn create_session_requires_at_least_one_target() {
        let mut rig = Rig::new();
        let events = events_from(&rig.tx);

        let result = rig.manager.create_session(rig.device.as_mut(), events);
        assert_eq!(
            result,
            Err(CameraError::InvalidState(
                "no target surfaces registered".into()
            ))
        );
    }

    #[test]
    fn configure_then_install_makes_session_live() {
        let mut rig = Rig::new();
        let events = events_from(&rig.tx);
        rig.manager
            .set_target(preview_surface(), Some(rig.device.as_mut()), events)
            .unwrap();

        let events = events_from(&rig.tx);
        rig.manager
            .create_session(rig.device.as_mut(), events)
            .unwrap();
        assert!(rig.manager.is_configuring());

        rig.pump();
        assert!(rig.manager.has_session());
        assert!(!rig.manager.is_configuring());
        assert_eq!(rig.backend.create_calls().lock()[0], vec![preview_surface()]);
    }

    #[test]
    fn replacing_a_target_tears_down_and_recreates_once() {
        let mut rig = Rig::new();
        let events = events_from(&rig.tx);
        rig.manager
            .set_target(preview_surface(), Some(rig.device.as_mut()), events)
            .unwrap();
        let events = events_from(&rig.tx);
        rig.manager
            .create_session(rig.device.as_mut(), events)
            .unwrap();
        rig.pump();

        let events = events_from(&rig.tx);
        let recreated = rig
            .manager
            .set_target(still_surface(), Some(rig.device.as_mut()), events)
            .unwrap();
        rig.pump();

        assert!(recreated);
        assert!(rig.manager.has_session());

        // Old session was aborted and closed exactly once.
        let log = rig.backend.session_log();
        let log = log.lock();
        assert_eq!(log.stop_repeating_calls, 1);
        assert_eq!(log.abort_calls, 1);
        assert_eq!(log.close_calls, 1);

        // Exactly one recreate, over both surfaces.
        let creates = rig.backend.create_calls();
        let creates = creates.lock();
        assert_eq!(creates.len(), 2);
        assert_eq!(creates[1], vec![preview_surface(), still_surface()]);
    }

    #[test]
    fn stale_configured_session_is_closed_and_dropped() {
        let mut rig = Rig::new();
        let events = events_from(&rig.tx);
        rig.manager
            .set_target(preview_surface(), Some(rig.device.as_mut()), events)
            .unwrap();
        let events = events_from(&rig.tx);
        rig.manager
            .create_session(rig.device.as_mut(), events)
            .unwrap();

        // Teardown races ahead of the configured event.
        rig.manager.close_session();
        rig.pump();

        assert!(!rig.manager.has_session());
        assert_eq!(rig.backend.session_log().lock().close_calls, 1);
    }

    #[test]
    fn configure_failure_clears_configuring_flag() {
        let mut backend = FakeBackend::new();
        backend.fail_configure = true;
        let mut rig = Rig::with_backend(backend);

        let events = events_from(&rig.tx);
        rig.manager
            .set_target(preview_surface(), Some(rig.device.as_mut()), events)
            .unwrap();
        let events = events_from(&rig.tx);
        rig.manager
            .create_session(rig.device.as_mut(), events)
            .unwrap();
        rig.pump();

        assert!(!rig.manager.has_session());
        assert!(!rig.manager.is_configuring());
    }

    #[test]
    fn removing_last_target_closes_without_recreate() {
        let mut rig = Rig::new();
        let events = events_from(&rig.tx);
        rig.manager
            .set_target(preview_surface(), Some(rig.device.as_mut()), events)
            .unwrap();
        let events = events_from(&rig.tx);
        rig.manager
            .create_session(rig.device.as_mut(), events)
            .unwrap();
        rig.pump();

        let events = events_from(&rig.tx);
        let recreated = rig
            .manager
            .remove_target(TargetRole::Preview, Some(rig.device.as_mut()), events)
            .unwrap();

        assert!(!recreated);
        assert!(!rig.manager.has_session());
        assert_eq!(rig.backend.create_calls().lock().len(), 1);
    }

    #[test]
    fn target_update_while_configuring_invalidates_pending_session() {
        let mut rig = Rig::new();
        let events = events_from(&rig.tx);
        rig.manager
            .set_target(preview_surface(), Some(rig.device.as_mut()), events)
            .unwrap();
        let events = events_from(&rig.tx);
        rig.manager
            .create_session(rig.device.as_mut(), events)
            .unwrap();

        // Update lands before the first configure resolves.
        let events = events_from(&rig.tx);
        let recreated = rig
            .manager
            .set_target(still_surface(), Some(rig.device.as_mut()), events)
            .unwrap();
        rig.pump();

        assert!(recreated);
        assert!(rig.manager.has_session());

        // The first configured session arrived stale and was closed; only
        // the second survives.
        assert_eq!(rig.backend.session_log().lock().close_calls, 1);
        assert_eq!(rig.backend.create_calls().lock().len(), 2);
    }

    #[test]
    fn apply_target_set_swaps_all_roles_in_one_cycle() {
        let mut rig = Rig::new();
        let events = events_from(&rig.tx);
        rig.manager
            .set_target(preview_surface(), Some(rig.device.as_mut()), events)
            .unwrap();
        let events = events_from(&rig.tx);
        rig.manager
            .create_session(rig.device.as_mut(), events)
            .unwrap();
        rig.pump();

        let replacement = TargetSet::from_roles(Some(SurfaceId(7)), Some(SurfaceId(8)), None);
        let events = events_from(&rig.tx);
        let recreated = rig
            .manager
            .apply_target_set(replacement, Some(rig.device.as_mut()), events)
            .unwrap();
        rig.pump();

        assert!(recreated);
        let creates = rig.backend.create_calls();
        let creates = creates.lock();
        assert_eq!(creates.len(), 2);
        assert_eq!(
            creates[1],
            vec![
                TargetSurface::new(TargetRole::Preview, SurfaceId(7)),
                TargetSurface::new(TargetRole::Still, SurfaceId(8)),
            ]
        );
    }
}
