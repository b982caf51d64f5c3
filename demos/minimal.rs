//! Minimal scan loop on an RP235x board.
//!
//! Wiring (mirrors the manufacturer's reference wiring):
//!
//!   board  | YDLIDAR X4
//!   -------+-----------
//!   GND    | GND
//!   PIN_13 | M_SCTR (motor enable)
//!   UART TX| Rx
//!   UART RX| Tx
//!
//! Run with `cargo run --example minimal --release` on a flashable target.

#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::uart::{Config, DataBits, Parity, StopBits, Uart, UartTx};
use {defmt_rtt as _, panic_probe as _};

use ydlidar_x4::{Driver, DriverConfig, Transport};

struct UartTransport<'a>(UartTx<'a, embassy_rp::uart::Blocking>);

impl Transport for UartTransport<'_> {
    fn write(&mut self, bytes: &[u8]) -> usize {
        match self.0.blocking_write(bytes) {
            Ok(()) => bytes.len(),
            Err(_) => 0,
        }
    }
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    let mut cfg = Config::default();
    cfg.baudrate = 128_000;
    cfg.data_bits = DataBits::Eight;
    cfg.parity = Parity::None;
    cfg.stop_bits = StopBits::One;
    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, cfg);
    let (tx, mut rx) = uart.split();

    let motor_enable = Output::new(p.PIN_13, Level::Low);

    let mut driver: Driver<_, _, 512> = Driver::new(
        UartTransport(tx),
        Some(motor_enable),
        DriverConfig::default(),
    )
    .expect("default queue capacity fits the 512-byte buffer");

    driver.start().ok();

    let mut buf = [0u8; 128];
    loop {
        match rx.read(&mut buf) {
            Ok(n) if n > 0 => driver.receive(&buf[..n]),
            _ => {}
        }
        driver.run(
            |packet| {
                // Handle angle/range data here.
                let _ = packet;
            },
            None,
        );
    }
}
