//! Basic boiler example.
//!
//! Demonstrates connecting to an EMS bus through a serial adapter, reading
//! boiler telemetry, dumping a whole message to stdout and raising the hot
//! water temperature.
//!
//! # Requirements
//!
//! - An EMS bus adapter connected via USB or a UART
//! - The serial port path adjusted for your system (e.g., `/dev/ttyUSB0`
//!   on Linux, `COM3` on Windows)
//!
//! # Usage
//!
//! ```sh
//! cargo run -p emsbus --example basic_boiler
//! ```

use std::sync::Arc;
use std::time::Duration;

use emsbus::{EmsBuilder, Field, MessageId};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Adjust this to match your system's serial port.
    let serial_port = "/dev/ttyUSB0";

    println!("Connecting to EMS bus on {}...", serial_port);

    let client = EmsBuilder::new()
        .serial_port(serial_port)
        .base_timeout(Duration::from_millis(500))
        .retry_factor(6)
        .debug_sink(Arc::new(|line: &str| println!("{line}")))
        .build()
        .await?;

    // The room controller clock answers quickly; use it to check the bus.
    let second = client.probe().await?;
    println!("Bus alive (controller clock at :{second:02})");

    let flow = client.get_float(Field::CurImpTemp).await?;
    let pressure = client.get_float(Field::SysPress).await?;
    let burning = client.get_bit(Field::BurnGas).await?;
    println!("Flow: {flow:.1} °C, pressure: {pressure:.1} bar, burner on: {burning}");

    let starts = client.get_ulong(Field::BurnStarts).await?;
    println!("Burner starts: {starts}");

    // Every field of the DHW monitor, through the debug sink.
    client.print_message(MessageId::UbaMonitorDhw).await?;

    println!("Setting hot water to 55 °C...");
    client.set_temperature_dhw(55).await?;

    client.close().await?;
    println!("Done.");
    Ok(())
}
