use crate::domain::profile::RequestOptions;
use std::fmt;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Lifecycle of the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    RegisteringApp,
    RegisteringAd,
    Running,
    ShuttingDown,
    Stopped,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("failed to register application: {0}")]
    Application(String),
    #[error("failed to register advertisement: {0}")]
    Advertisement(String),
}

/// Keeps a host-side registration alive; dropping it unregisters.
pub struct Registration {
    _handle: Option<Box<dyn Send>>,
}

impl Registration {
    pub fn new(handle: impl Send + 'static) -> Self {
        Self {
            _handle: Some(Box::new(handle)),
        }
    }

    /// A registration with nothing to release
    pub fn detached() -> Self {
        Self { _handle: None }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("held", &self._handle.is_some())
            .finish()
    }
}

/// Everything the controller loop reacts to
#[derive(Debug)]
pub enum ControllerEvent {
    ApplicationRegistered(Result<Registration, RegistrationError>),
    AdvertisementRegistered(Result<Registration, RegistrationError>),
    ReadRow {
        row: usize,
        options: RequestOptions,
        reply: oneshot::Sender<Option<Vec<u8>>>,
    },
    WriteRow {
        row: usize,
        value: Vec<u8>,
        options: RequestOptions,
        reply: oneshot::Sender<bool>,
    },
    Interrupt,
}

pub type EventSender = mpsc::UnboundedSender<ControllerEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ControllerEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
