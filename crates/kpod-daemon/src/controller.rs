//! Knob controller: turns KPod input into rig tuning.
//!
//! One controller owns the state of one device. Reports are handled strictly
//! one at a time; each rig exchange completes before the next report is read.

use std::time::Duration;

use kpod_core::{
    BeepLevel, EncoderScale, KnobState, LedAux, RawReport, Tone, decode, frequency_utterance,
};
use kpod_hid::{HidResult, KPod, Transport};
use kpod_rig::Rig;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::announce::Announcer;

/// Button that speaks the current frequency.
const BUTTON_ANNOUNCE: u8 = 1;
/// Button that cycles the step multiplier.
const BUTTON_STEP: u8 = 5;

const BEEP_DURATION: u8 = 5;

const STATUS_LEDS: LedAux = LedAux {
    led1: true,
    led2: true,
    led3: false,
    led4: false,
    rocker_led: false,
    aux1: false,
    aux2: false,
    aux3: false,
};

/// Device settings applied when a KPod is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceSettings {
    pub scale: EncoderScale,
    pub mute: bool,
}

/// State machine for one attached KPod.
pub struct KnobController<R, T, A> {
    rig: R,
    kpod: KPod<T>,
    announcer: A,
    settings: DeviceSettings,
    state: KnobState,
}

fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

impl<R: Rig, T: Transport, A: Announcer> KnobController<R, T, A> {
    /// Create a controller for a freshly opened device.
    pub fn new(rig: R, kpod: KPod<T>, announcer: A, settings: DeviceSettings) -> Self {
        Self { rig, kpod, announcer, settings, state: KnobState::default() }
    }

    /// Current knob state.
    pub fn state(&self) -> &KnobState {
        &self.state
    }

    /// Initialise a newly attached device and take the first rig reading.
    ///
    /// A failed rig read is logged and leaves the default frequency in place.
    ///
    /// # Errors
    /// Returns an error if any device command fails.
    pub async fn on_device_added(&mut self) -> HidResult<()> {
        let id = self.kpod.identify().await?;
        let version = self.kpod.version().await?;
        info!(id = %id, version = %version, "KPod added");

        self.kpod.beep(Tone::Hz500, BeepLevel::High, BEEP_DURATION).await?;
        self.kpod.led_aux(STATUS_LEDS).await?;
        self.kpod.configure(self.settings.scale, self.settings.mute).await?;

        match self.rig.get_frequency().await {
            Ok(hz) => {
                self.state.frequency = hz;
                self.state.mark_synced(now());
                info!(hz, "Initial rig frequency");
            }
            Err(e) => warn!(error = %e, "Initial rig sync failed"),
        }
        Ok(())
    }

    /// Release the device.
    pub fn on_device_removed(&self) {
        info!(frequency = self.state.frequency, step = self.state.step.factor(), "KPod removed");
    }

    /// Poll the device once and handle any update report it returns.
    ///
    /// # Errors
    /// Returns an error if the device stops answering.
    pub async fn poll(&mut self) -> HidResult<()> {
        if let Some(report) = self.kpod.poll().await? {
            self.on_update_report(&report).await?;
        }
        Ok(())
    }

    /// Poll the device every `interval` until `shutdown` yields.
    ///
    /// Shutdown also abandons a poll in flight, including one blocked on a
    /// silent rig.
    ///
    /// # Errors
    /// Returns the device error that ended the session.
    pub async fn run(&mut self, interval: Duration, shutdown: &mut mpsc::Receiver<()>) -> HidResult<()> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.recv() => return Ok(()),
            }
            tokio::select! {
                result = self.poll() => result?,
                _ = shutdown.recv() => return Ok(()),
            }
        }
    }

    /// Handle one update report.
    ///
    /// # Errors
    /// Returns an error if a feedback command to the device fails. Rig
    /// failures are logged, never returned.
    pub async fn on_update_report(&mut self, report: &RawReport) -> HidResult<()> {
        let event = decode(report);
        debug!(
            ticks = event.rotation_delta,
            button = event.button,
            hold = event.hold,
            rocker = ?event.rocker,
            "Update report"
        );

        if self.state.sync_due(now()) {
            match self.rig.get_frequency().await {
                Ok(hz) => {
                    self.state.frequency = hz;
                    self.state.mark_synced(now());
                }
                Err(e) => {
                    warn!(error = %e, "Rig resync failed, dropping report");
                    return Ok(());
                }
            }
        }

        if let Some(hz) = self.state.apply_rotation(&event) {
            match self.rig.set_frequency(hz).await {
                Ok(()) => self.state.mark_synced(now()),
                Err(e) => warn!(hz, error = %e, "Failed to set rig frequency"),
            }
        }

        match event.button {
            BUTTON_ANNOUNCE => {
                self.announcer.announce(&frequency_utterance(self.state.frequency));
            }
            BUTTON_STEP => {
                let step = self.state.press_step(event.hold);
                info!(step = step.factor(), "Step multiplier changed");
                self.kpod.beep(Tone::for_step(step), BeepLevel::High, BEEP_DURATION).await?;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use assert_matches::assert_matches;
    use kpod_core::StepMultiplier;
    use kpod_core::report::REPORT_LEN;
    use kpod_hid::HidError;
    use kpod_rig::{RigError, RigResult};

    use super::*;

    #[derive(Default)]
    struct FakeRig {
        frequency: i64,
        fail_get: bool,
        fail_set: bool,
        silent: bool,
        gets: usize,
        sets: Vec<i64>,
    }

    impl Rig for FakeRig {
        async fn get_frequency(&mut self) -> RigResult<i64> {
            self.gets += 1;
            if self.silent {
                std::future::pending::<()>().await;
            }
            if self.fail_get {
                return Err(RigError::ConnectionClosed);
            }
            Ok(self.frequency)
        }

        async fn set_frequency(&mut self, hz: i64) -> RigResult<()> {
            self.sets.push(hz);
            if self.fail_set {
                return Err(RigError::ReturnCode { command: format!("+F{hz}"), code: 1 });
            }
            self.frequency = hz;
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeTransport {
        sent: Vec<[u8; REPORT_LEN]>,
        polls: VecDeque<RawReport>,
        unplugged: bool,
    }

    impl Transport for FakeTransport {
        async fn transact(&mut self, packet: &[u8; REPORT_LEN]) -> HidResult<RawReport> {
            self.sent.push(*packet);
            if self.unplugged {
                return Err(HidError::Timeout);
            }
            Ok(match packet[0] {
                0x3d => [b'=', b'K', b'P', b'O', b'D', 0, 0, 0],
                0x76 => [b'v', 0x69, 0x00, 0, 0, 0, 0, 0],
                b'u' => self.polls.pop_front().unwrap_or([0; REPORT_LEN]),
                op => [op, 0, 0, 0, 0, 0, 0, 0],
            })
        }
    }

    #[derive(Default)]
    struct FakeAnnouncer {
        spoken: RefCell<Vec<String>>,
    }

    impl Announcer for FakeAnnouncer {
        fn announce(&self, text: &str) {
            self.spoken.borrow_mut().push(text.to_string());
        }
    }

    type TestController = KnobController<FakeRig, FakeTransport, FakeAnnouncer>;

    fn controller(rig: FakeRig) -> TestController {
        let settings = DeviceSettings { scale: EncoderScale::Counts200, mute: true };
        KnobController::new(rig, KPod::new(FakeTransport::default()), FakeAnnouncer::default(), settings)
    }

    async fn attached(frequency: i64) -> TestController {
        let mut controller = controller(FakeRig { frequency, ..FakeRig::default() });
        controller.on_device_added().await.unwrap();
        controller.kpod.transport_mut().sent.clear();
        controller
    }

    fn report(delta: i16, controls: u8) -> RawReport {
        let [lo, hi] = delta.to_le_bytes();
        [b'u', lo, hi, controls, 0, 0, 0, 0]
    }

    fn beeps(controller: &mut TestController) -> Vec<u8> {
        controller
            .kpod
            .transport_mut()
            .sent
            .iter()
            .filter(|p| p[0] == 0x5a)
            .map(|p| p[1])
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_sequence() {
        let mut controller = controller(FakeRig { frequency: 14_074_000, ..FakeRig::default() });
        controller.on_device_added().await.unwrap();

        let sent = &controller.kpod.transport_mut().sent;
        assert_eq!(sent.len(), 5);
        assert_eq!(sent[0][0], 0x3d);
        assert_eq!(sent[1][0], 0x76);
        assert_eq!(sent[2][..4], [0x5a, 3, 2, 5]);
        assert_eq!(sent[3][..2], [0x4f, 0x18]);
        assert_eq!(sent[4][..2], [0x43, 0x01]);

        assert_eq!(controller.rig.gets, 1);
        assert_eq!(controller.state().frequency, 14_074_000);
        assert!(controller.state().last_sync.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_survives_rig_failure() {
        let mut controller = controller(FakeRig { frequency: 7_000_000, fail_get: true, ..FakeRig::default() });
        controller.on_device_added().await.unwrap();

        assert_eq!(controller.state().frequency, 0);
        assert!(controller.state().last_sync.is_none());
        assert_eq!(controller.kpod.transport_mut().sent.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_sets_exact_frequency() {
        let mut controller = attached(14_074_000).await;
        controller.on_update_report(&report(3, 0)).await.unwrap();

        assert_eq!(controller.rig.sets, vec![14_074_003]);
        assert_eq!(controller.state().frequency, 14_074_003);
        // Attached less than a second ago: no resync
        assert_eq!(controller.rig.gets, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resync_only_after_interval() {
        let mut controller = attached(14_074_000).await;

        tokio::time::advance(Duration::from_millis(600)).await;
        controller.on_update_report(&report(0, 0)).await.unwrap();
        assert_eq!(controller.rig.gets, 1);

        tokio::time::advance(Duration::from_millis(600)).await;
        controller.rig.frequency = 14_080_000;
        controller.on_update_report(&report(0, 0)).await.unwrap();
        assert_eq!(controller.rig.gets, 2);
        assert_eq!(controller.state().frequency, 14_080_000);

        controller.on_update_report(&report(1, 0)).await.unwrap();
        assert_eq!(controller.rig.gets, 2);
        assert_eq!(controller.rig.sets, vec![14_080_001]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_set_defers_resync() {
        let mut controller = attached(14_074_000).await;

        tokio::time::advance(Duration::from_millis(900)).await;
        controller.on_update_report(&report(1, 0)).await.unwrap();
        tokio::time::advance(Duration::from_millis(900)).await;
        controller.on_update_report(&report(1, 0)).await.unwrap();

        assert_eq!(controller.rig.gets, 1);
        assert_eq!(controller.rig.sets, vec![14_074_001, 14_074_002]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_resync_drops_event() {
        let mut controller = controller(FakeRig { fail_get: true, ..FakeRig::default() });
        controller.on_device_added().await.unwrap();
        controller.kpod.transport_mut().sent.clear();

        controller.on_update_report(&report(5, 0x05)).await.unwrap();

        assert_eq!(controller.rig.gets, 2);
        assert!(controller.rig.sets.is_empty());
        assert_eq!(controller.state().frequency, 0);
        assert_eq!(controller.state().step, StepMultiplier::X1);
        assert!(controller.kpod.transport_mut().sent.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_set_keeps_local_frequency() {
        let mut controller = attached(3_573_000).await;
        controller.rig.fail_set = true;

        controller.on_update_report(&report(-4, 0)).await.unwrap();
        controller.on_update_report(&report(-4, 0)).await.unwrap();

        assert_eq!(controller.rig.sets, vec![3_572_996, 3_572_992]);
        assert_eq!(controller.state().frequency, 3_572_992);
        assert_eq!(controller.rig.frequency, 3_573_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_cycle_with_feedback() {
        let mut controller = attached(14_000_000).await;

        let mut steps = Vec::new();
        for _ in 0..4 {
            controller.on_update_report(&report(0, 0x05)).await.unwrap();
            steps.push(controller.state().step.factor());
        }
        assert_eq!(steps, vec![10, 100, 1000, 1000]);

        // Hold resets in one step
        controller.on_update_report(&report(0, 0x15)).await.unwrap();
        assert_eq!(controller.state().step, StepMultiplier::X1);

        // Tone ids: 1000 Hz, 1500 Hz, 2000 Hz, 2000 Hz, 500 Hz
        assert_eq!(beeps(&mut controller), vec![0, 1, 2, 2, 3]);
        let levels: Vec<u8> =
            controller.kpod.transport_mut().sent.iter().map(|p| p[2]).collect();
        assert!(levels.iter().all(|&level| level == 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_multiplier_scales_rotation() {
        let mut controller = attached(14_000_000).await;
        controller.on_update_report(&report(0, 0x05)).await.unwrap();
        controller.on_update_report(&report(0, 0x05)).await.unwrap();
        controller.on_update_report(&report(-2, 0)).await.unwrap();

        assert_eq!(controller.state().step, StepMultiplier::X100);
        assert_eq!(controller.rig.sets, vec![13_999_800]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_and_step_in_one_report() {
        let mut controller = attached(14_000_000).await;
        controller.on_update_report(&report(2, 0x05)).await.unwrap();

        // Rotation uses the multiplier in effect before the button press
        assert_eq!(controller.rig.sets, vec![14_000_002]);
        assert_eq!(controller.state().step, StepMultiplier::X10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_announce_button() {
        let mut controller = attached(146_520_000).await;
        controller.on_update_report(&report(0, 0x01)).await.unwrap();

        assert_eq!(*controller.announcer.spoken.borrow(), vec!["146.520".to_string()]);
        assert!(controller.kpod.transport_mut().sent.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_buttons_have_no_effect() {
        let mut controller = attached(7_074_000).await;
        // Buttons 2, 3, 7, 15, then button 2 with the rocker right and no button with it left
        for controls in [0x02, 0x03, 0x07, 0x0f, 0x22, 0x40] {
            controller.on_update_report(&report(0, controls)).await.unwrap();
        }

        assert!(controller.kpod.transport_mut().sent.is_empty());
        assert!(controller.announcer.spoken.borrow().is_empty());
        assert!(controller.rig.sets.is_empty());
        assert_eq!(controller.state().step, StepMultiplier::X1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_dispatches_update_reports() {
        let mut controller = attached(14_000_000).await;
        controller.kpod.transport_mut().polls.push_back(report(7, 0));

        controller.poll().await.unwrap();
        controller.poll().await.unwrap();

        assert_eq!(controller.rig.sets, vec![14_000_007]);
        assert_eq!(controller.kpod.transport_mut().sent.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown_during_blocked_exchange() {
        let mut controller = attached(14_000_000).await;
        controller.rig.silent = true;
        tokio::time::advance(Duration::from_millis(1500)).await;
        controller.kpod.transport_mut().polls.push_back(report(1, 0));

        let (tx, mut rx) = mpsc::channel(1);
        let stop = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            tx.send(()).await.unwrap();
        };
        let (result, ()) = tokio::time::timeout(
            Duration::from_secs(5),
            async { tokio::join!(controller.run(Duration::from_millis(5), &mut rx), stop) },
        )
        .await
        .expect("shutdown did not interrupt the blocked poll");

        result.unwrap();
        // Stuck in the resync before the rotation could be sent
        assert_eq!(controller.rig.gets, 2);
        assert!(controller.rig.sets.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_polls_until_device_error() {
        let mut controller = attached(14_000_000).await;
        controller.kpod.transport_mut().polls.push_back(report(2, 0));

        let (_tx, mut rx) = mpsc::channel(1);
        {
            let run = controller.run(Duration::from_millis(5), &mut rx);
            tokio::pin!(run);
            // Let a few empty polls go by, then pull the plug
            tokio::select! {
                _ = &mut run => panic!("run ended early"),
                () = tokio::time::sleep(Duration::from_millis(50)) => {}
            }
        }
        controller.kpod.transport_mut().unplugged = true;

        let result = controller.run(Duration::from_millis(5), &mut rx).await;
        assert_matches!(result, Err(HidError::Timeout));
        assert_eq!(controller.rig.sets, vec![14_000_002]);
    }
}
