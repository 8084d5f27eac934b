use crate::domain::profile::LedService;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertisementType {
    Broadcast,
    Peripheral,
}

impl AdvertisementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Broadcast => "broadcast",
            Self::Peripheral => "peripheral",
        }
    }
}

/// LE advertisement announcing the LED service to nearby centrals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedAdvertisement {
    advertisement_type: AdvertisementType,
    service_uuids: Vec<Uuid>,
    include_tx_power: bool,
    local_name: Option<String>,
}

impl LedAdvertisement {
    pub fn new(service: &LedService) -> Self {
        Self {
            advertisement_type: AdvertisementType::Peripheral,
            service_uuids: vec![service.uuid()],
            include_tx_power: true,
            local_name: None,
        }
    }

    pub fn with_local_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = Some(name.into());
        self
    }

    pub fn advertisement_type(&self) -> AdvertisementType {
        self.advertisement_type
    }

    pub fn service_uuids(&self) -> &[Uuid] {
        &self.service_uuids
    }

    pub fn include_tx_power(&self) -> bool {
        self.include_tx_power
    }

    pub fn local_name(&self) -> Option<&str> {
        self.local_name.as_deref()
    }
}
