//! End-to-end checks through the public facade against a simulated bus.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use emsbus::{
    EmsBuilder, EmsClient, Error, Field, HeatingCircuit, HolidayDate, MessageId, PrintFormat,
    Value,
};
use emsbus_test_harness::MockBus;

type Lines = Arc<Mutex<Vec<String>>>;

fn boiler() -> MockBus {
    let bus = MockBus::new(0x0B);
    for message in emsbus::supported_messages() {
        bus.load_message(
            message.destination(),
            message.msg_type,
            &vec![0u8; message.payload_len as usize],
        );
    }
    let mut slow = vec![0u8; 25];
    slow[10..13].copy_from_slice(&[0x00, 0x30, 0x39]);
    bus.load_message(0x08, 0x19, &slow);
    bus
}

async fn client(bus: &MockBus, format: PrintFormat) -> (EmsClient, Lines) {
    let lines: Lines = Arc::default();
    let captured = lines.clone();
    let client = EmsBuilder::new()
        .base_timeout(Duration::from_millis(100))
        .print_format(format)
        .debug_sink(Arc::new(move |line: &str| {
            captured.lock().unwrap().push(line.to_string())
        }))
        .build_with_transport(Box::new(bus.clone()))
        .await
        .unwrap();
    (client, lines)
}

#[test]
fn catalog_is_complete() {
    let messages = emsbus::supported_messages();
    assert_eq!(messages.len(), 27);
    assert!(messages.iter().all(|m| m.wire_len() == m.payload_len as usize + 6));
}

#[tokio::test(start_paused = true)]
async fn counters_read_through_facade() {
    let bus = boiler();
    let (client, _) = client(&bus, PrintFormat::Standard).await;

    assert_eq!(client.get_ulong(Field::BurnStarts).await.unwrap(), 12345);
    let datagram = client.read_message(MessageId::UbaMonitorSlow).await.unwrap();
    assert_eq!(datagram.value("BurnStarts"), Some(Value::ULong(12345)));
}

#[tokio::test(start_paused = true)]
async fn holiday_written_and_printed() {
    let bus = boiler();
    let (client, lines) = client(&bus, PrintFormat::Xml).await;

    client
        .set_holiday_mode_hc(
            HeatingCircuit::Hc2,
            HolidayDate::new(24, 12, 26),
            HolidayDate::new(2, 1, 27),
        )
        .await
        .unwrap();

    let program = bus.message(0x10, 0x49).unwrap();
    assert_eq!(&program[87..93], &[24, 12, 26, 2, 1, 27]);
    let lines = lines.lock().unwrap();
    assert!(lines.iter().any(|l| l == "<StartHoliDay>24</StartHoliDay>"));
}

#[tokio::test(start_paused = true)]
async fn out_of_range_rejected_before_bus() {
    let bus = boiler();
    let (client, lines) = client(&bus, PrintFormat::Standard).await;

    let result = client.set_temperature_dhw(90).await;
    assert!(matches!(result, Err(Error::Validation(_))));
    assert!(bus.sent_data().is_empty());
    assert!(lines.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn disconnected_bus_fails_fast() {
    let bus = boiler();
    let (client, _) = client(&bus, PrintFormat::Standard).await;
    bus.set_connected(false);

    let result = client.get_byte(Field::Second).await;
    assert!(matches!(result, Err(Error::NotConnected)));
}
