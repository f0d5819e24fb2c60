//! ESP32 lock firmware: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                  │
//! │                                                          │
//! │  SppTransport / UartTransport   LogEventSink  Esp32Clock │
//! │  (Transport)                    (EventSink)   (ClockPort)│
//! │                                                          │
//! │  ──────────────── Port Trait Boundary ─────────────────  │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │       LockController (classify · dispatch)         │  │
//! │  │       LineChannel · LockActuator<PinDriver>        │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │                                                          │
//! │  Watchdog fed once per loop iteration                    │
//! └──────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use embedded_hal::digital::OutputPin;
use esp_idf_svc::bt::{BtClassic, BtDriver};
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyIOPin, PinDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::uart::{config::Config as UartConfig, UartDriver};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info};

use esplock::adapters::log_sink::LogEventSink;
use esplock::adapters::spp::SppTransport;
use esplock::adapters::time::Esp32Clock;
use esplock::adapters::uart::UartTransport;
use esplock::app::service::LockController;
use esplock::channel::{LineChannel, Transport};
use esplock::config::{ChannelKind, LockConfig};
use esplock::drivers::lock::LockActuator;
use esplock::drivers::watchdog::Watchdog;
use esplock::pins;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  ESP32 lock v{}                   ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Config ─────────────────────────────────────────────
    let config = LockConfig::default();
    config.validate()?;
    info!("Config: {}", serde_json::to_string(&config)?);

    // ── 3. Lock output (locked before anything else runs) ─────
    let peripherals = Peripherals::take()?;
    let pin = PinDriver::output(peripherals.pins.gpio23)?;
    let actuator = LockActuator::new(pin)?;
    info!("Lock output on GPIO{} (active-high)", pins::LOCK_GPIO);

    let watchdog = Watchdog::new(config.loop_interval_ms);

    // ── 4. Command channel + loop ─────────────────────────────
    match config.channel {
        ChannelKind::Bluetooth => {
            // Bluedroid needs an initialised NVS partition.
            let nvs = EspDefaultNvsPartition::take()?;
            match BtDriver::<BtClassic>::new(peripherals.modem, Some(nvs)) {
                Ok(bt) => {
                    info!("Bluetooth Classic controller up");
                    run(config, actuator, SppTransport::new(bt), watchdog)
                }
                Err(e) => {
                    error!("Bluetooth init failed: {}", e);
                    idle(config.loop_interval_ms, actuator, watchdog)
                }
            }
        }
        ChannelKind::Uart => {
            let uart_config = UartConfig::default().baudrate(Hertz(config.uart_baud));
            let driver = UartDriver::new(
                peripherals.uart2,
                peripherals.pins.gpio17,
                peripherals.pins.gpio16,
                Option::<AnyIOPin>::None,
                Option::<AnyIOPin>::None,
                &uart_config,
            )?;
            info!(
                "UART2 on TX=GPIO{} RX=GPIO{} @ {} baud",
                pins::UART_TX_GPIO,
                pins::UART_RX_GPIO,
                config.uart_baud
            );
            run(config, actuator, UartTransport::new(driver), watchdog)
        }
    }
}

/// Start the channel and dispatch forever.
///
/// A channel that fails to start is not retried; the loop keeps feeding the
/// watchdog with the lock held low.
fn run<P: OutputPin, T: Transport>(
    config: LockConfig,
    actuator: LockActuator<P>,
    transport: T,
    mut watchdog: Watchdog,
) -> Result<()> {
    let loop_interval_ms = config.loop_interval_ms;
    let mut controller = LockController::new(config, actuator);
    let mut channel = LineChannel::new(transport);
    let mut sink = LogEventSink::new();
    let clock = Esp32Clock::new();
    let mut delay = FreeRtos;

    if !controller.start(&mut channel, &mut sink) {
        error!("Command channel unavailable; lock stays closed");
    }

    info!("Entering main loop");
    loop {
        controller.poll(&mut channel, &clock, &mut delay, &mut sink);
        if watchdog.feed() {
            info!(
                "ALIVE | {} loops, {:?}, state {:?}",
                watchdog.feed_count(),
                controller.stats(),
                controller.state()
            );
        }
        FreeRtos::delay_ms(loop_interval_ms);
    }
}

/// No command channel at all: hold the lock LOW and keep the watchdog fed.
fn idle<P: OutputPin>(
    loop_interval_ms: u32,
    _actuator: LockActuator<P>,
    mut watchdog: Watchdog,
) -> Result<()> {
    error!("Command channel unavailable; lock stays closed");
    loop {
        watchdog.feed();
        FreeRtos::delay_ms(loop_interval_ms);
    }
}
