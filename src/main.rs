use anyhow::Context;
use led_matrix_peripheral::domain::advertisement::LedAdvertisement;
use led_matrix_peripheral::domain::controller::PeripheralController;
use led_matrix_peripheral::domain::display::{setup_display, MatrixDisplay};
use led_matrix_peripheral::domain::models::{event_channel, ControllerEvent};
use led_matrix_peripheral::domain::profile::LedApplication;
use led_matrix_peripheral::domain::settings::{DisplayBackend, Settings, SettingsService};
use led_matrix_peripheral::infrastructure::bluetooth::BluezHost;
use led_matrix_peripheral::infrastructure::display::{ConsoleMatrix, Ht16k33Matrix};
use led_matrix_peripheral::infrastructure::logging::init_logger;
use linux_embedded_hal::I2cdev;
use tracing::{info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let settings = SettingsService::new()?;
    let _logging = init_logger(&settings.get().log_settings)?;
    info!(
        "Starting LED matrix peripheral (settings: {})",
        settings.path().display()
    );

    let settings = settings.get().clone();
    match settings.display.backend {
        DisplayBackend::Ht16k33 => {
            let i2c = I2cdev::new(&settings.display.i2c_bus)
                .with_context(|| format!("Failed to open {}", settings.display.i2c_bus))?;
            let display = Ht16k33Matrix::new(i2c, settings.display.i2c_address)
                .with_brightness(settings.display.brightness)?;
            serve(&settings, display).await
        }
        DisplayBackend::Console => serve(&settings, ConsoleMatrix::new()).await,
    }
}

async fn serve<D: MatrixDisplay>(settings: &Settings, mut display: D) -> anyhow::Result<()> {
    setup_display(&mut display).context("Failed to initialize display")?;

    let application = LedApplication::new()?;
    let mut advertisement = LedAdvertisement::new(application.service());
    if let Some(name) = &settings.local_name {
        advertisement = advertisement.with_local_name(name.as_str());
    }

    let host = BluezHost::new(settings.adapter_name.as_deref())
        .await
        .context("Failed to open Bluetooth adapter")?;

    let (events, receiver) = event_channel();
    let interrupt = events.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = interrupt.send(ControllerEvent::Interrupt);
            }
            Err(e) => warn!("Failed to listen for interrupt: {}", e),
        }
    });

    let mut controller =
        PeripheralController::new(host, display, application, advertisement, events);
    controller.run(receiver).await?;

    info!("Exiting");
    Ok(())
}
