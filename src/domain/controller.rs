//! Peripheral Controller
//!
//! Drives registration of the GATT application and the advertisement with
//! the host stack, then serves row reads and writes until interrupted.
//!
//! ```text
//! Idle ─► RegisteringApp ─ok─► RegisteringAd ─ok─► Running ─interrupt─► ShuttingDown ─► Stopped
//!               │                    │                                        ▲
//!               └──────err───────────┴──────────────err──────────────► Stopped
//! ```
//!
//! All events, including host callbacks, arrive on one channel and are
//! handled one at a time, so the display and row state have a single owner.

use crate::domain::advertisement::LedAdvertisement;
use crate::domain::display::MatrixDisplay;
use crate::domain::models::{
    ControllerEvent, ControllerState, EventReceiver, EventSender, Registration, RegistrationError,
};
use crate::domain::profile::LedApplication;
use tracing::{debug, error, info, warn};

/// The host's service and advertising managers
///
/// Both calls return immediately. The outcome is posted to `events` later as
/// exactly one `ApplicationRegistered` or `AdvertisementRegistered` event.
pub trait HostStack {
    fn register_application(&mut self, application: &LedApplication, events: EventSender);
    fn register_advertisement(&mut self, advertisement: &LedAdvertisement, events: EventSender);
}

pub struct PeripheralController<H, D> {
    host: H,
    display: D,
    application: LedApplication,
    advertisement: LedAdvertisement,
    events: EventSender,
    state: ControllerState,
    trace: Vec<ControllerState>,
    registrations: Vec<Registration>,
    failure: Option<RegistrationError>,
}

impl<H: HostStack, D: MatrixDisplay> PeripheralController<H, D> {
    pub fn new(
        host: H,
        display: D,
        application: LedApplication,
        advertisement: LedAdvertisement,
        events: EventSender,
    ) -> Self {
        Self {
            host,
            display,
            application,
            advertisement,
            events,
            state: ControllerState::Idle,
            trace: vec![ControllerState::Idle],
            registrations: Vec::new(),
            failure: None,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Every state entered so far, in order
    pub fn trace(&self) -> &[ControllerState] {
        &self.trace
    }

    pub fn application(&self) -> &LedApplication {
        &self.application
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Start registration and serve events until the controller stops.
    ///
    /// Returns the registration failure that ended the session, if any.
    pub async fn run(&mut self, mut events: EventReceiver) -> Result<(), RegistrationError> {
        if self.state == ControllerState::Idle {
            self.start();
        }
        while self.state != ControllerState::Stopped {
            match events.recv().await {
                Some(event) => self.handle_event(event),
                None => {
                    warn!("Event channel closed");
                    self.shutdown();
                }
            }
        }
        match self.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Ask the host stack to register the GATT application
    pub fn start(&mut self) {
        if self.state != ControllerState::Idle {
            warn!("Controller already started ({:?})", self.state);
            return;
        }
        self.transition(ControllerState::RegisteringApp);
        info!(
            service = %self.application.service().uuid(),
            "Registering GATT application"
        );
        self.host
            .register_application(&self.application, self.events.clone());
    }

    pub fn handle_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::ApplicationRegistered(result) => {
                self.on_application_registered(result)
            }
            ControllerEvent::AdvertisementRegistered(result) => {
                self.on_advertisement_registered(result)
            }
            ControllerEvent::ReadRow {
                row,
                options,
                reply,
            } => {
                let value = self.application.read_row(row, &options);
                if reply.send(value).is_err() {
                    debug!(row, "Read requester went away");
                }
            }
            ControllerEvent::WriteRow {
                row,
                value,
                options,
                reply,
            } => {
                let accepted = self
                    .application
                    .write_row(row, &value, &options, &mut self.display);
                if reply.send(accepted).is_err() {
                    debug!(row, "Write requester went away");
                }
            }
            ControllerEvent::Interrupt => {
                info!("Interrupt received");
                self.shutdown();
            }
        }
    }

    fn on_application_registered(&mut self, result: Result<Registration, RegistrationError>) {
        if self.state != ControllerState::RegisteringApp {
            warn!("Ignoring application registration result in {:?}", self.state);
            return;
        }
        match result {
            Ok(registration) => {
                info!("GATT application registered");
                self.registrations.push(registration);
                self.transition(ControllerState::RegisteringAd);
                self.host
                    .register_advertisement(&self.advertisement, self.events.clone());
            }
            Err(e) => self.fail(e),
        }
    }

    fn on_advertisement_registered(&mut self, result: Result<Registration, RegistrationError>) {
        if self.state != ControllerState::RegisteringAd {
            warn!(
                "Ignoring advertisement registration result in {:?}",
                self.state
            );
            return;
        }
        match result {
            Ok(registration) => {
                info!("Advertisement registered");
                self.registrations.push(registration);
                self.transition(ControllerState::Running);
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, error: RegistrationError) {
        error!("{}", error);
        self.failure = Some(error);
        self.registrations.clear();
        self.transition(ControllerState::Stopped);
    }

    /// Blank the matrix and release the registrations
    fn shutdown(&mut self) {
        if matches!(
            self.state,
            ControllerState::ShuttingDown | ControllerState::Stopped
        ) {
            return;
        }
        self.transition(ControllerState::ShuttingDown);
        if let Err(e) = self
            .display
            .clear()
            .and_then(|_| self.display.write_display())
        {
            error!("Failed to clear display on shutdown: {}", e);
        }
        self.registrations.clear();
        self.transition(ControllerState::Stopped);
        info!("Peripheral stopped");
    }

    fn transition(&mut self, next: ControllerState) {
        debug!("Controller state {:?} -> {:?}", self.state, next);
        self.state = next;
        self.trace.push(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::display::test_support::RecordingDisplay;
    use crate::domain::models::event_channel;
    use crate::domain::pixel::PixelColor::{self, *};
    use crate::domain::pixel::MATRIX_SIZE;
    use crate::domain::profile::RequestOptions;
    use tokio::sync::oneshot;
    use ControllerState::*;

    /// Host stack that answers every registration immediately
    #[derive(Default)]
    struct ScriptedHost {
        app_failure: Option<String>,
        ad_failure: Option<String>,
        app_calls: usize,
        ad_calls: usize,
    }

    impl HostStack for ScriptedHost {
        fn register_application(&mut self, application: &LedApplication, events: EventSender) {
            assert_eq!(application.services().len(), 1);
            self.app_calls += 1;
            let result = match &self.app_failure {
                Some(msg) => Err(RegistrationError::Application(msg.clone())),
                None => Ok(Registration::detached()),
            };
            events
                .send(ControllerEvent::ApplicationRegistered(result))
                .unwrap();
        }

        fn register_advertisement(
            &mut self,
            advertisement: &LedAdvertisement,
            events: EventSender,
        ) {
            assert!(advertisement.include_tx_power());
            self.ad_calls += 1;
            let result = match &self.ad_failure {
                Some(msg) => Err(RegistrationError::Advertisement(msg.clone())),
                None => Ok(Registration::detached()),
            };
            events
                .send(ControllerEvent::AdvertisementRegistered(result))
                .unwrap();
        }
    }

    /// Host stack that never answers
    struct SilentHost;

    impl HostStack for SilentHost {
        fn register_application(&mut self, _: &LedApplication, _: EventSender) {}
        fn register_advertisement(&mut self, _: &LedAdvertisement, _: EventSender) {}
    }

    fn controller<H: HostStack>(
        host: H,
    ) -> (
        PeripheralController<H, RecordingDisplay>,
        EventSender,
        EventReceiver,
    ) {
        let (tx, rx) = event_channel();
        let application = LedApplication::new().unwrap();
        let advertisement = LedAdvertisement::new(application.service());
        let controller = PeripheralController::new(
            host,
            RecordingDisplay::default(),
            application,
            advertisement,
            tx.clone(),
        );
        (controller, tx, rx)
    }

    fn write(tx: &EventSender, row: usize, value: &[u8]) -> oneshot::Receiver<bool> {
        let (reply, rx) = oneshot::channel();
        tx.send(ControllerEvent::WriteRow {
            row,
            value: value.to_vec(),
            options: RequestOptions::default(),
            reply,
        })
        .unwrap();
        rx
    }

    fn read(tx: &EventSender, row: usize) -> oneshot::Receiver<Option<Vec<u8>>> {
        let (reply, rx) = oneshot::channel();
        tx.send(ControllerEvent::ReadRow {
            row,
            options: RequestOptions::default(),
            reply,
        })
        .unwrap();
        rx
    }

    #[tokio::test]
    async fn test_registration_reaches_running_then_stops() {
        let (mut controller, tx, rx) = controller(ScriptedHost::default());

        let (result, (written, readback)) = tokio::join!(controller.run(rx), async {
            let written = write(&tx, 3, &[0xA5, 0x3C, 0x00]);
            let readback = read(&tx, 3);
            tx.send(ControllerEvent::Interrupt).unwrap();
            (written, readback)
        });

        assert_eq!(result, Ok(()));
        assert_eq!(
            controller.trace(),
            &[Idle, RegisteringApp, RegisteringAd, Running, ShuttingDown, Stopped]
        );
        assert!(written.await.unwrap());
        assert_eq!(readback.await.unwrap(), Some(vec![0xA5, 0x3C]));
        assert_eq!(controller.host.app_calls, 1);
        assert_eq!(controller.host.ad_calls, 1);
    }

    #[tokio::test]
    async fn test_application_failure_never_runs() {
        let host = ScriptedHost {
            app_failure: Some("org.bluez.Error.Failed".to_string()),
            ..Default::default()
        };
        let (mut controller, _tx, rx) = controller(host);

        let result = controller.run(rx).await;

        assert_eq!(
            result,
            Err(RegistrationError::Application(
                "org.bluez.Error.Failed".to_string()
            ))
        );
        assert_eq!(controller.trace(), &[Idle, RegisteringApp, Stopped]);
        assert!(!controller.trace().contains(&Running));
        assert_eq!(controller.host.ad_calls, 0);
        assert!(controller.display().flushed.is_empty());
    }

    #[tokio::test]
    async fn test_advertisement_failure_stops() {
        let host = ScriptedHost {
            ad_failure: Some("Maximum advertisements reached".to_string()),
            ..Default::default()
        };
        let (mut controller, _tx, rx) = controller(host);

        let result = controller.run(rx).await;

        assert!(matches!(result, Err(RegistrationError::Advertisement(_))));
        assert_eq!(
            controller.trace(),
            &[Idle, RegisteringApp, RegisteringAd, Stopped]
        );
    }

    #[tokio::test]
    async fn test_shutdown_clears_display_once() {
        let (mut controller, tx, rx) = controller(ScriptedHost::default());

        let (result, replies) = tokio::join!(controller.run(rx), async {
            let replies: Vec<_> = (0..MATRIX_SIZE)
                .map(|row| write(&tx, row, &[0xFF, 0xFF]))
                .collect();
            tx.send(ControllerEvent::Interrupt).unwrap();
            tx.send(ControllerEvent::Interrupt).unwrap();
            replies
        });

        result.unwrap();
        for reply in replies {
            assert!(reply.await.unwrap());
        }
        let display = controller.display();
        assert_eq!(display.flushed.len(), MATRIX_SIZE + 1);
        assert_eq!(display.flushed[MATRIX_SIZE - 1], [[Yellow; MATRIX_SIZE]; MATRIX_SIZE]);
        assert_eq!(display.clears, 1);
        let last = display.last_frame().unwrap();
        assert!(last.iter().flatten().all(|c| *c == PixelColor::Off));
        assert_eq!(
            controller.trace().iter().filter(|s| **s == ShuttingDown).count(),
            1
        );
    }

    #[test]
    fn test_requests_served_while_registering() {
        let (mut controller, _tx, _rx) = controller(SilentHost);
        controller.start();
        assert_eq!(controller.state(), RegisteringApp);

        let (reply, mut rx) = oneshot::channel();
        controller.handle_event(ControllerEvent::WriteRow {
            row: 0,
            value: vec![0x80],
            options: RequestOptions::default(),
            reply,
        });

        assert_eq!(rx.try_recv(), Ok(true));
        assert_eq!(controller.display().buffer[0][0], Green);
        assert_eq!(controller.state(), RegisteringApp);
    }

    #[test]
    fn test_stray_registration_results_ignored() {
        let (mut controller, _tx, _rx) = controller(SilentHost);
        controller.start();

        controller.handle_event(ControllerEvent::AdvertisementRegistered(Ok(
            Registration::detached(),
        )));
        assert_eq!(controller.state(), RegisteringApp);

        controller.handle_event(ControllerEvent::ApplicationRegistered(Ok(
            Registration::detached(),
        )));
        assert_eq!(controller.state(), RegisteringAd);

        controller.handle_event(ControllerEvent::ApplicationRegistered(Err(
            RegistrationError::Application("late".to_string()),
        )));
        assert_eq!(controller.state(), RegisteringAd);
    }

    #[test]
    fn test_interrupt_while_registering_blanks_display() {
        let (mut controller, _tx, _rx) = controller(SilentHost);
        controller.start();

        controller.handle_event(ControllerEvent::Interrupt);

        assert_eq!(controller.trace(), &[Idle, RegisteringApp, ShuttingDown, Stopped]);
        assert_eq!(controller.display().flushed.len(), 1);
    }

    #[test]
    fn test_unknown_row_rejected() {
        let (mut controller, _tx, _rx) = controller(SilentHost);

        let (reply, mut rx) = oneshot::channel();
        controller.handle_event(ControllerEvent::ReadRow {
            row: 9,
            options: RequestOptions::default(),
            reply,
        });

        assert_eq!(rx.try_recv(), Ok(None));
    }
}
