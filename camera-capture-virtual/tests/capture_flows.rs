//! End-to-end capture flows over the virtual backend.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};

use camera_capture_core::storage::photo_writer;
use camera_capture_core::{
    AeMode, CameraController, CameraDelegate, CameraError, CaptureFailureKind, ControllerOptions,
    FlashMode, FlashUnitMode, FocusCaptureState, PhotoCaptureResult, RunState, SensorRect,
    SurfaceId,
};
use camera_capture_virtual::{
    AeBehavior, VirtualCameraBackend, VirtualDeviceHandle, VirtualDeviceProfile,
};

const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug)]
enum DelegateEvent {
    Run(RunState),
    Focus(FocusCaptureState),
    Error(String),
    Photo(PathBuf),
}

struct ChannelDelegate {
    events: Sender<DelegateEvent>,
}

impl CameraDelegate for ChannelDelegate {
    fn on_run_state_changed(&self, state: RunState) {
        let _ = self.events.send(DelegateEvent::Run(state));
    }

    fn on_focus_state_changed(&self, state: FocusCaptureState) {
        let _ = self.events.send(DelegateEvent::Focus(state));
    }

    fn on_error(&self, error: &CameraError) {
        let _ = self.events.send(DelegateEvent::Error(error.code().to_string()));
    }

    fn on_photo_captured(&self, result: &PhotoCaptureResult) {
        let _ = self
            .events
            .send(DelegateEvent::Photo(result.destination.clone()));
    }
}

struct TestBench {
    controller: CameraController,
    handle: VirtualDeviceHandle,
    events: Receiver<DelegateEvent>,
}

fn bench_with(profile: VirtualDeviceProfile) -> TestBench {
    let _ = env_logger::builder().is_test(true).try_init();
    let characteristics = profile.characteristics.clone();
    let mut backend = VirtualCameraBackend::new();
    let handle = backend.add_device("cam0", profile);
    let controller =
        CameraController::new(Box::new(backend), ControllerOptions::default()).unwrap();

    let (tx, events) = unbounded();
    controller.set_delegate(Arc::new(ChannelDelegate { events: tx }));
    controller.select_device("cam0", characteristics);
    controller.set_targets(Some(SurfaceId(1)), Some(SurfaceId(2)), None);

    TestBench {
        controller,
        handle,
        events,
    }
}

fn bench() -> TestBench {
    bench_with(VirtualDeviceProfile::fast())
}

fn start(bench: &TestBench) {
    let (tx, rx) = unbounded();
    bench.controller.start(move |result| {
        let _ = tx.send(result);
    });
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), Ok(()));
    wait_for_run(&bench.events, RunState::Previewing);
}

fn wait_for_run(events: &Receiver<DelegateEvent>, want: RunState) {
    let deadline = Instant::now() + WAIT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(remaining) {
            Ok(DelegateEvent::Run(state)) if state == want => return,
            Ok(_) => continue,
            Err(_) => panic!("timed out waiting for run state {:?}", want),
        }
    }
}

/// Collects broadcast focus states until the machine settles back to idle.
fn focus_states_until_idle(events: &Receiver<DelegateEvent>) -> Vec<FocusCaptureState> {
    let deadline = Instant::now() + WAIT;
    let mut states = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(remaining) {
            Ok(DelegateEvent::Focus(state)) => {
                let done = state == FocusCaptureState::Idle;
                states.push(state);
                if done {
                    return states;
                }
            }
            Ok(_) => continue,
            Err(_) => panic!("timed out waiting for the capture to settle"),
        }
    }
}

fn capture(
    controller: &CameraController,
    destination: &PathBuf,
) -> Receiver<Result<PhotoCaptureResult, CameraError>> {
    let (tx, rx) = unbounded();
    controller.capture_photo(destination, move |result| {
        let _ = tx.send(result);
    });
    rx
}

fn poll_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + WAIT;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(5));
    }
}

fn temp_file_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("camera_capture_virtual_{}", name))
}

fn remove_artifacts(destination: &PathBuf) {
    fs::remove_file(destination).ok();
    fs::remove_file(photo_writer::sidecar_path(destination)).ok();
}

#[test]
fn captures_a_photo_end_to_end() {
    let bench = bench();
    start(&bench);

    let destination = temp_file_path("end_to_end.jpg");
    remove_artifacts(&destination);

    let rx = capture(&bench.controller, &destination);
    let result = rx.recv_timeout(WAIT).unwrap().unwrap();
    assert_eq!(result.destination, destination);

    let bytes = fs::read(&destination).unwrap();
    assert_eq!(&bytes[..2], [0xFF, 0xD8]);
    assert_eq!(&bytes[bytes.len() - 2..], [0xFF, 0xD9]);

    let metadata = photo_writer::read_metadata(&destination).unwrap();
    assert_eq!(metadata.width, 4032);
    assert_eq!(metadata.height, 3024);
    assert_eq!(metadata.byte_size, bytes.len() as u64);

    let states = focus_states_until_idle(&bench.events);
    assert_eq!(states.first(), Some(&FocusCaptureState::WaitingFocusLock));
    assert!(states.contains(&FocusCaptureState::CaptureRequested));
    assert_eq!(states.last(), Some(&FocusCaptureState::Idle));
    // Converged exposure skips the precapture leg entirely.
    assert!(!states.contains(&FocusCaptureState::Precapture));

    let diagnostics = bench.controller.diagnostics();
    assert_eq!(diagnostics.stills_completed, 1);
    assert!(diagnostics.frames_processed > 0);

    remove_artifacts(&destination);
}

#[test]
fn precapture_runs_when_exposure_needs_it() {
    let profile = VirtualDeviceProfile {
        ae: AeBehavior::RequiresPrecapture { frames: 2 },
        ..VirtualDeviceProfile::fast()
    };
    let bench = bench_with(profile);
    start(&bench);

    let destination = temp_file_path("precapture.jpg");
    remove_artifacts(&destination);

    let rx = capture(&bench.controller, &destination);
    assert!(rx.recv_timeout(WAIT).unwrap().is_ok());

    let states = focus_states_until_idle(&bench.events);
    let precapture = states
        .iter()
        .position(|s| *s == FocusCaptureState::Precapture)
        .expect("precapture must run");
    let ready = states
        .iter()
        .position(|s| *s == FocusCaptureState::WaitingPrecaptureReady)
        .expect("precapture must be awaited");
    let requested = states
        .iter()
        .position(|s| *s == FocusCaptureState::CaptureRequested)
        .expect("still must be requested");
    assert!(precapture < ready && ready < requested);

    remove_artifacts(&destination);
}

#[test]
fn unfocused_lock_still_captures() {
    let profile = VirtualDeviceProfile {
        af_succeeds: false,
        ..VirtualDeviceProfile::fast()
    };
    let bench = bench_with(profile);
    start(&bench);

    let destination = temp_file_path("unfocused_lock.jpg");
    remove_artifacts(&destination);

    // A sweep that fails to focus still ends the wait; the shot is taken
    // with whatever focus the lens settled on.
    let rx = capture(&bench.controller, &destination);
    assert!(rx.recv_timeout(WAIT).unwrap().is_ok());

    remove_artifacts(&destination);
}

#[test]
fn capture_without_still_target_fails_fast() {
    let bench = bench();
    bench
        .controller
        .set_targets(Some(SurfaceId(1)), None, None);
    start(&bench);

    let destination = temp_file_path("no_still_target.jpg");
    let rx = capture(&bench.controller, &destination);

    assert!(matches!(
        rx.recv_timeout(WAIT).unwrap(),
        Err(CameraError::InvalidState(_))
    ));
}

#[test]
fn overlapping_captures_are_rejected() {
    let profile = VirtualDeviceProfile {
        // Focus never locks within the test window.
        af_lock_frames: 10_000,
        ..VirtualDeviceProfile::fast()
    };
    let bench = bench_with(profile);
    start(&bench);

    let first = temp_file_path("overlap_first.jpg");
    let second = temp_file_path("overlap_second.jpg");
    remove_artifacts(&first);
    remove_artifacts(&second);
    let first_rx = capture(&bench.controller, &first);
    let second_rx = capture(&bench.controller, &second);

    assert!(matches!(
        second_rx.recv_timeout(WAIT).unwrap(),
        Err(CameraError::InvalidState(_))
    ));

    // Stopping resolves the stuck capture as aborted.
    bench.controller.stop();
    assert!(matches!(
        first_rx.recv_timeout(WAIT).unwrap(),
        Err(CameraError::CaptureFailure(CaptureFailureKind::Aborted))
    ));
    wait_for_run(&bench.events, RunState::Stopped);
}

#[test]
fn disconnect_recovers_into_preview() {
    let bench = bench();
    start(&bench);

    bench.handle.disconnect();
    wait_for_run(&bench.events, RunState::Restarting);
    wait_for_run(&bench.events, RunState::Previewing);

    assert_eq!(bench.controller.diagnostics().device_restarts, 1);
    // Frames flow again in the new open cycle.
    poll_until(|| bench.handle.frames_emitted() > 0);
}

#[test]
fn failed_still_reports_hardware_error_and_preview_survives() {
    let bench = bench();
    start(&bench);
    bench.handle.fail_next_capture();

    let destination = temp_file_path("failed_still.jpg");
    remove_artifacts(&destination);

    let rx = capture(&bench.controller, &destination);
    let error = rx.recv_timeout(WAIT).unwrap().unwrap_err();
    assert!(matches!(
        error,
        CameraError::CaptureFailure(CaptureFailureKind::Hardware(_))
    ));
    assert!(!destination.exists());

    // The pipeline settled back to idle; a retry succeeds.
    let retry = temp_file_path("failed_still_retry.jpg");
    remove_artifacts(&retry);
    let rx = capture(&bench.controller, &retry);
    assert!(rx.recv_timeout(WAIT).unwrap().is_ok());

    remove_artifacts(&destination);
    remove_artifacts(&retry);
}

#[test]
fn zoom_changes_flow_into_the_repeating_request() {
    let bench = bench();
    start(&bench);
    poll_until(|| bench.handle.last_repeating().is_some());

    bench.controller.set_zoom(0.5);
    poll_until(|| {
        bench
            .handle
            .last_repeating()
            .map_or(false, |request| request.crop_region.width() < 4032)
    });

    // Zoom zero restores the native crop exactly.
    bench.controller.set_zoom(0.0);
    let native = SensorRect::new(0, 0, 4032, 3024);
    poll_until(|| {
        bench
            .handle
            .last_repeating()
            .map_or(false, |request| request.crop_region == native)
    });
}

#[test]
fn always_flash_drives_the_torch_in_preview() {
    let bench = bench();
    start(&bench);
    poll_until(|| bench.handle.last_repeating().is_some());

    bench.controller.set_flash_mode(FlashMode::Always);
    poll_until(|| {
        bench
            .handle
            .last_repeating()
            .map_or(false, |request| request.flash == FlashUnitMode::Torch)
    });
    assert_eq!(
        bench.handle.last_repeating().unwrap().ae_mode,
        AeMode::On
    );
}

#[test]
fn flash_mode_is_ignored_without_a_flash_unit() {
    let mut profile = VirtualDeviceProfile::fast();
    profile.characteristics.has_flash = false;
    let bench = bench_with(profile);
    start(&bench);
    poll_until(|| bench.handle.last_repeating().is_some());

    bench.controller.set_flash_mode(FlashMode::Always);
    thread::sleep(Duration::from_millis(50));

    let request = bench.handle.last_repeating().unwrap();
    assert_eq!(request.ae_mode, AeMode::On);
    assert_eq!(request.flash, FlashUnitMode::Off);
}
