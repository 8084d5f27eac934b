//! BlueZ Host Stack
//!
//! Registers the GATT application and the LE advertisement with bluetoothd.
//! Characteristic callbacks run on bluer's tasks; they only forward the
//! request to the controller and wait for its reply.

use crate::domain::advertisement::{AdvertisementType, LedAdvertisement};
use crate::domain::controller::HostStack;
use crate::domain::models::{ControllerEvent, EventSender, Registration, RegistrationError};
use crate::domain::profile::{CharacteristicDescriptor, LedApplication, RequestOptions};
use bluer::adv::{Advertisement, Feature, Type};
use bluer::gatt::local::{
    Application, Characteristic, CharacteristicRead, CharacteristicWrite,
    CharacteristicWriteMethod, ReqError, Service,
};
use bluer::{Adapter, Session};
use futures::FutureExt;
use std::collections::BTreeSet;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

pub struct BluezHost {
    _session: Session,
    adapter: Adapter,
}

impl BluezHost {
    /// Connect to bluetoothd and power on `adapter_name`, or the default adapter
    pub async fn new(adapter_name: Option<&str>) -> bluer::Result<Self> {
        let session = Session::new().await?;
        let adapter = match adapter_name {
            Some(name) => session.adapter(name)?,
            None => session.default_adapter().await?,
        };
        adapter.set_powered(true).await?;
        info!(
            "Using Bluetooth adapter {} ({})",
            adapter.name(),
            adapter.address().await?
        );
        Ok(Self {
            _session: session,
            adapter,
        })
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }
}

impl HostStack for BluezHost {
    fn register_application(&mut self, application: &LedApplication, events: EventSender) {
        let app = gatt_application(application, &events);
        let adapter = self.adapter.clone();
        tokio::spawn(async move {
            let result = adapter
                .serve_gatt_application(app)
                .await
                .map(Registration::new)
                .map_err(|e| RegistrationError::Application(e.to_string()));
            if events
                .send(ControllerEvent::ApplicationRegistered(result))
                .is_err()
            {
                warn!("Controller gone before application registration finished");
            }
        });
    }

    fn register_advertisement(&mut self, advertisement: &LedAdvertisement, events: EventSender) {
        let le_advertisement = le_advertisement(advertisement);
        let adapter = self.adapter.clone();
        tokio::spawn(async move {
            let result = adapter
                .advertise(le_advertisement)
                .await
                .map(Registration::new)
                .map_err(|e| RegistrationError::Advertisement(e.to_string()));
            if events
                .send(ControllerEvent::AdvertisementRegistered(result))
                .is_err()
            {
                warn!("Controller gone before advertisement registration finished");
            }
        });
    }
}

fn gatt_application(application: &LedApplication, events: &EventSender) -> Application {
    let services = application
        .services()
        .into_iter()
        .map(|service| Service {
            uuid: service.uuid,
            primary: service.primary,
            characteristics: service
                .characteristics
                .iter()
                .map(|chrc| row_characteristic(chrc, events))
                .collect(),
            ..Default::default()
        })
        .collect();

    Application {
        services,
        ..Default::default()
    }
}

fn row_characteristic(
    descriptor: &CharacteristicDescriptor,
    events: &EventSender,
) -> Characteristic {
    let row = descriptor.row;
    let read_events = events.clone();
    let write_events = events.clone();

    let read = descriptor.flags.read.then(|| CharacteristicRead {
        read: true,
        fun: Box::new(move |req| {
            let events = read_events.clone();
            let options = RequestOptions {
                device: Some(req.device_address.to_string()),
                offset: req.offset,
                mtu: Some(req.mtu),
            };
            async move {
                let (reply, response) = oneshot::channel();
                events
                    .send(ControllerEvent::ReadRow {
                        row,
                        options,
                        reply,
                    })
                    .map_err(|_| ReqError::Failed)?;
                match response.await {
                    Ok(Some(value)) => Ok(value),
                    _ => Err(ReqError::Failed),
                }
            }
            .boxed()
        }),
        ..Default::default()
    });

    let write = descriptor.flags.write.then(|| CharacteristicWrite {
        write: true,
        method: CharacteristicWriteMethod::Fun(Box::new(move |value, req| {
            let events = write_events.clone();
            let options = RequestOptions {
                device: Some(req.device_address.to_string()),
                offset: req.offset,
                mtu: Some(req.mtu),
            };
            async move {
                let (reply, response) = oneshot::channel();
                events
                    .send(ControllerEvent::WriteRow {
                        row,
                        value,
                        options,
                        reply,
                    })
                    .map_err(|_| ReqError::Failed)?;
                match response.await {
                    Ok(true) => Ok(()),
                    _ => Err(ReqError::Failed),
                }
            }
            .boxed()
        })),
        ..Default::default()
    });

    debug!(row, uuid = %descriptor.uuid, "Exporting row characteristic");
    Characteristic {
        uuid: descriptor.uuid,
        read,
        write,
        ..Default::default()
    }
}

fn le_advertisement(advertisement: &LedAdvertisement) -> Advertisement {
    let mut system_includes = BTreeSet::new();
    if advertisement.include_tx_power() {
        system_includes.insert(Feature::TxPower);
    }

    Advertisement {
        advertisement_type: match advertisement.advertisement_type() {
            AdvertisementType::Broadcast => Type::Broadcast,
            AdvertisementType::Peripheral => Type::Peripheral,
        },
        service_uuids: advertisement.service_uuids().iter().copied().collect(),
        system_includes,
        local_name: advertisement.local_name().map(str::to_owned),
        ..Default::default()
    }
}
