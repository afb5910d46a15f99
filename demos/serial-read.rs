use chrono::{DateTime, Utc};
use env_logger::Builder as LoggerBuilder;
use std::{env, thread, time::Duration};

use slt5006::{Measurement, StatusCode};

pub fn main() {
    let mut logger_builder = LoggerBuilder::new();
    if env::var("RUST_LOG").is_ok() {
        let rust_log_var = &env::var("RUST_LOG").unwrap();
        println!("Parsing RUST_LOG={}", rust_log_var);
        logger_builder.parse_filters(rust_log_var);
    }
    logger_builder.init();

    let tty_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyUSB0".to_owned());
    let cycle_time = Duration::from_millis(1000);

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Reading {
        ts: DateTime<Utc>,
        measurement: Measurement,
    }

    let mut sensor = slt5006::serial::open(&tty_path).unwrap();
    if sensor.init() == StatusCode::NoResponse {
        log::warn!("Sensor did not answer the version check");
    }

    loop {
        if sensor.read_measurement() {
            let reading = Reading {
                ts: Utc::now(),
                measurement: sensor.measurement(),
            };
            log::info!("{:?}", reading);
        } else {
            log::warn!("Measurement failed: {}", sensor.status());
        }
        thread::sleep(cycle_time);
    }
}
