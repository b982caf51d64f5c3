//! Scans only while a button is held, printing packet-rate and queue
//! high-water-mark stats once a second - same wiring as `minimal`, plus a
//! button on PIN_14.
//!
//! Run with `cargo run --example scan_while_button_pressed --release`.

#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::uart::{Config, DataBits, Parity, StopBits, Uart, UartTx};
use embassy_time::{Duration, Instant};
use {defmt_rtt as _, panic_probe as _};

use ydlidar_x4::{Driver, DriverConfig, ParserState, Transport};

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
    let button = Input::new(p.PIN_14, Pull::Up);

    let mut driver: Driver<_, _, 512> = Driver::new(
        UartTransport(tx),
        Some(motor_enable),
        DriverConfig::default(),
    )
    .expect("default queue capacity fits the 512-byte buffer");

    driver.stop().ok();

    let mut packet_count: u32 = 0;
    let mut last_packet_count: u32 = 0;
    let mut last_report = Instant::now();
    let mut buf = [0u8; 128];

    loop {
        if let Ok(n) = rx.read(&mut buf) {
            if n > 0 {
                driver.receive(&buf[..n]);
            }
        }
        driver.run(|_packet| packet_count += 1, None);

        if Instant::now().saturating_duration_since(last_report) > Duration::from_secs(1) {
            last_report = Instant::now();

            let scanning = driver.parser_state() != ParserState::End
                && driver.parser_state() != ParserState::Stop;
            if button.is_low() {
                if !scanning {
                    driver.start().ok();
                }
            } else if scanning {
                driver.stop().ok();
            }

            // Report pkg count, delta, and queue high-water mark.
            let _delta = packet_count - last_packet_count;
            let _high_water = driver.max_observed_queue_size();
            last_packet_count = packet_count;
        }
    }
}
