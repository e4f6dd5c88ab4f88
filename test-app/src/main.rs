// emsbus test application -- CLI tool for exercising an EMS bus through a
// serial adapter, or a simulated boiler with --mock.
//
// Usage:
//   emsbus-test-app --port /dev/ttyUSB0 probe
//   emsbus-test-app list
//   emsbus-test-app list --fields
//   emsbus-test-app --mock print UBAMonitorFast
//   emsbus-test-app --mock --format xml get UBAMonitorFast CurImpTemp
//   emsbus-test-app --mock schedule hc1
//   emsbus-test-app --port /dev/ttyUSB0 set temperature-hc --hc 1 --mode 1 --raw 42
//   emsbus-test-app --port /dev/ttyUSB0 set holiday --hc 1 --start 24.12.26 --end 02.01.27
//   emsbus-test-app --port /dev/ttyUSB0 set switch-point hc1:2 5 1 5 7 30

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use emsbus::protocol::catalog::{SWITCH_POINTS, message_by_name};
use emsbus::protocol::codec::{UNDEFINED_SWITCH_POINT, encode_switch_point};
use emsbus::{
    ACTION_OFF, ACTION_ON, EmsBuilder, EmsClient, HeatingCircuit, HolidayDate, MessageDescriptor,
    MessageId, PrintFormat, ProgramSlot, SwitchProgram, format_field_line,
};
use emsbus_test_harness::MockBus;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// emsbus test application -- reads and writes boiler settings from the
/// command line.
#[derive(Parser)]
#[command(name = "emsbus-test-app", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyUSB0, COM3).
    /// Required for all bus commands unless --mock is used.
    #[arg(long)]
    port: Option<String>,

    /// Serial speed.
    #[arg(long, default_value_t = 9600)]
    baud: u32,

    /// Use a simulated boiler instead of a real bus.
    #[arg(long)]
    mock: bool,

    /// Style of printed values: standard, xml, no-unit.
    #[arg(long, default_value = "standard")]
    format: PrintFormat,

    /// Per-attempt response window in milliseconds.
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Number of response windows a call may retry for.
    #[arg(long, default_value_t = 4)]
    retry_factor: u32,

    /// Bus address to poll for and send from (hex, e.g. 0x0B).
    #[arg(long, value_parser = parse_hex_u8, default_value = "0x0B")]
    own_addr: u8,

    /// Number of heating circuits installed (1-4).
    #[arg(long, default_value_t = 2)]
    circuits: u8,

    #[command(subcommand)]
    command: Command,
}

/// Parse a hex string like "0x0B" or "0B" into a u8.
fn parse_hex_u8(s: &str) -> std::result::Result<u8, String> {
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u8::from_str_radix(s, 16).map_err(|e| format!("invalid hex byte: {e}"))
}

/// Parse a circuit number 1-4.
fn parse_circuit(s: &str) -> std::result::Result<HeatingCircuit, String> {
    let s = s.trim_start_matches(['h', 'H', 'c', 'C']);
    s.parse::<u8>()
        .ok()
        .and_then(HeatingCircuit::from_number)
        .ok_or_else(|| format!("invalid heating circuit '{s}', expected 1-4"))
}

/// Parse a program name: dhw, pump-dhw, hcN or hcN:2 for the second
/// program of circuit N.
fn parse_program(s: &str) -> std::result::Result<SwitchProgram, String> {
    match s.to_ascii_lowercase().as_str() {
        "dhw" => Ok(SwitchProgram::Dhw),
        "pump-dhw" | "pumpdhw" => Ok(SwitchProgram::PumpDhw),
        other => {
            let (circuit, slot) = match other.split_once(':') {
                Some((circuit, "1")) => (circuit, ProgramSlot::First),
                Some((circuit, "2")) => (circuit, ProgramSlot::Second),
                Some(_) => return Err(format!("invalid program slot in '{s}', expected 1 or 2")),
                None => (other, ProgramSlot::First),
            };
            if !circuit.starts_with("hc") {
                return Err(format!(
                    "unknown program '{s}'. Expected: dhw, pump-dhw, hc1..hc4, hcN:2"
                ));
            }
            Ok(SwitchProgram::Heating(parse_circuit(circuit)?, slot))
        }
    }
}

/// Parse a date like "24.12.26" (day.month.two-digit-year).
fn parse_date(s: &str) -> std::result::Result<HolidayDate, String> {
    let parts: Vec<&str> = s.split('.').collect();
    let [day, month, year] = parts.as_slice() else {
        return Err(format!("invalid date '{s}', expected DD.MM.YY"));
    };
    let field = |v: &str| {
        v.parse::<u8>()
            .map_err(|e| format!("invalid date '{s}': {e}"))
    };
    Ok(HolidayDate::new(field(*day)?, field(*month)?, field(*year)?))
}

#[derive(Subcommand)]
enum Command {
    /// List every known message (no bus access).
    List {
        /// Also list the fields of each message.
        #[arg(long)]
        fields: bool,
    },

    /// Read a whole message and print every field.
    Print {
        /// Message name (e.g. UBAMonitorFast, WorkingModeHC1).
        message: String,
    },

    /// Read a message and print one of its fields.
    Get {
        /// Message name.
        message: String,
        /// Field name within the message (e.g. CurImpTemp).
        field: String,
    },

    /// Check that the bus answers.
    Probe,

    /// Print the switch points of a weekly program.
    Schedule {
        /// Program: dhw, pump-dhw, hc1..hc4, or hcN:2.
        #[arg(value_parser = parse_program)]
        program: SwitchProgram,

        /// Also print unused slots.
        #[arg(long)]
        all: bool,
    },

    /// Write a setting.
    Set {
        #[command(subcommand)]
        action: SetAction,
    },
}

#[derive(Subcommand)]
enum SetAction {
    /// Working mode of a heating circuit (0 = night, 1 = day, 2 = auto).
    WorkModeHc {
        #[arg(long, value_parser = parse_circuit)]
        hc: HeatingCircuit,
        mode: u8,
    },

    /// Target temperature of a heating circuit, in half degrees.
    TemperatureHc {
        #[arg(long, value_parser = parse_circuit)]
        hc: HeatingCircuit,
        /// 0 = night, 1 = day, 2 = holiday.
        #[arg(long)]
        mode: u8,
        /// Half degrees, 12-58 (6-29 °C).
        #[arg(long)]
        raw: u8,
    },

    /// Hot water temperature, 40-80 °C.
    TemperatureDhw { temp: u8 },

    /// Start or cancel a one-time hot water charge.
    OneTimeDhw {
        #[arg(value_enum)]
        state: OnOff,
    },

    /// One entry of a weekly program.
    SwitchPoint {
        /// Program: dhw, pump-dhw, hc1..hc4, or hcN:2.
        #[arg(value_parser = parse_program)]
        program: SwitchProgram,
        /// Slot 0-41.
        index: usize,
        /// 0 = off, 1 = on, 7 = clear the slot.
        action: u8,
        /// Weekday, 0 = Monday.
        day: u8,
        hour: u8,
        /// Multiple of ten.
        minute: u8,
    },

    /// Holiday date range of a heating circuit.
    Holiday {
        #[arg(long, value_parser = parse_circuit)]
        hc: HeatingCircuit,
        /// First day, DD.MM.YY.
        #[arg(long, value_parser = parse_date)]
        start: HolidayDate,
        /// Last day, DD.MM.YY.
        #[arg(long, value_parser = parse_date)]
        end: HolidayDate,
        /// Set the at-home holiday range instead.
        #[arg(long)]
        home: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OnOff {
    On,
    Off,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

fn lookup_message(name: &str) -> Result<&'static MessageDescriptor> {
    message_by_name(name).with_context(|| {
        format!("unknown message '{name}'. Use `emsbus-test-app list` to see all messages.")
    })
}

/// A simulated boiler with a room controller, answering on `own`'s polls.
fn mock_boiler(own: u8) -> MockBus {
    let bus = MockBus::new(own);

    let mut free_program = vec![0u8; 99];
    for point in free_program[..SWITCH_POINTS * 2].chunks_exact_mut(2) {
        point.copy_from_slice(&UNDEFINED_SWITCH_POINT);
    }

    for message in emsbus::supported_messages() {
        let len = message.payload_len as usize;
        let payload = if len == free_program.len() || len == SWITCH_POINTS * 2 {
            free_program[..len].to_vec()
        } else {
            vec![0u8; len]
        };
        bus.load_message(message.destination(), message.msg_type, &payload);
    }

    let load = |id: MessageId, values: &[(usize, u8)]| {
        let message = id.descriptor();
        let mut payload = bus
            .message(message.destination(), message.msg_type)
            .unwrap_or_else(|| vec![0u8; message.payload_len as usize]);
        for &(at, value) in values {
            payload[at] = value;
        }
        bus.load_message(message.destination(), message.msg_type, &payload);
    };

    load(MessageId::RcDatetime, &[(0, 26), (1, 10), (2, 16), (3, 9), (4, 30), (5, 12)]);
    load(MessageId::UbaWorkingTime, &[(0, 0x03), (1, 0x1A), (2, 0x4C)]);
    load(
        MessageId::UbaMonitorFast,
        &[
            (0, 60),
            (1, 0x01),
            (2, 0xE5),
            (3, 70),
            (4, 65),
            (7, 0b0010_0001),
            (13, 0x01),
            (14, 0x90),
            (16, 0x32),
            (17, 16),
            (18, b'-'),
            (19, b'H'),
        ],
    );
    load(
        MessageId::UbaMonitorSlow,
        &[(1, 0x5A), (2, 0x01), (3, 0xEA), (9, 80), (11, 0x30), (12, 0x39), (14, 0xA1), (15, 0x22)],
    );
    load(MessageId::UbaParameterDhw, &[(2, 55), (8, 70)]);
    load(MessageId::UbaMonitorDhw, &[(1, 0x02), (2, 0x08), (5, 0b0000_0001)]);
    load(MessageId::WorkingModeDhw, &[(2, 2), (3, 2), (4, 255), (5, 7), (6, 2)]);
    load(
        MessageId::WorkingModeHc1,
        &[(1, 30), (2, 42), (3, 24), (7, 2), (22, 18), (25, 2), (39, 0xFB)],
    );
    load(MessageId::MonitorHc1, &[(1, 0b0000_0010), (2, 42)]);
    load(MessageId::MonitorMm10, &[(0, 45), (1, 0x01), (2, 0xA4), (3, 35)]);

    // Weekdays on at 06:00 and off at 22:00.
    let mut schedule = Vec::new();
    for day in 0..5u8 {
        let index = day as usize * 2;
        let on = encode_switch_point(ACTION_ON, day, 6, 0);
        let off = encode_switch_point(ACTION_OFF, day, 22, 0);
        schedule.extend([
            (index * 2, on[0]),
            (index * 2 + 1, on[1]),
            (index * 2 + 2, off[0]),
            (index * 2 + 3, off[1]),
        ]);
    }
    load(MessageId::Program1Hc1, &schedule);

    bus
}

// ---------------------------------------------------------------------------
// Client construction
// ---------------------------------------------------------------------------

async fn create_client(cli: &Cli) -> Result<EmsClient> {
    let builder = EmsBuilder::new()
        .baud_rate(cli.baud)
        .own_address(cli.own_addr)
        .base_timeout(Duration::from_millis(cli.timeout_ms))
        .retry_factor(cli.retry_factor)
        .max_heating_circuits(cli.circuits)
        .print_format(cli.format)
        .debug_sink(Arc::new(|line: &str| println!("{line}")));

    if cli.mock {
        tracing::info!(own = format_args!("0x{:02X}", cli.own_addr), "Using simulated bus");
        return builder
            .build_with_transport(Box::new(mock_boiler(cli.own_addr)))
            .await
            .context("failed to build client on simulated bus");
    }

    let Some(port) = cli.port.as_deref() else {
        bail!("--port is required unless --mock is used");
    };
    builder
        .serial_port(port)
        .build()
        .await
        .with_context(|| format!("failed to open EMS bus on {port}"))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_list(fields: bool) -> Result<()> {
    println!(
        "{:<18} {:>6} {:>8} {:>8} {:>7}",
        "Message", "Type", "Device", "Payload", "Fields"
    );
    println!("{}", "-".repeat(51));
    for message in emsbus::supported_messages() {
        println!(
            "{:<18} {:>6} {:>8} {:>8} {:>7}",
            message.name,
            format!("0x{:02X}", message.msg_type),
            format!("0x{:02X}", message.destination()),
            message.payload_len,
            message.fields.len()
        );
        if fields {
            let mut last = "";
            for field in message.fields {
                // Switch points share a name; list them once.
                if field.name == last {
                    continue;
                }
                last = field.name;
                println!("    {:<22} @{:<3} {:?}", field.name, field.offset, field.kind);
            }
        }
    }
    Ok(())
}

async fn cmd_get(client: &EmsClient, message: &str, field: &str) -> Result<()> {
    let descriptor = lookup_message(message)?;
    let Some(field) = descriptor.field_by_name(field) else {
        bail!("message {} has no field '{field}'", descriptor.name);
    };
    let datagram = client.read_message(descriptor.id).await?;
    let value = field.decode(&datagram.buffer);
    println!(
        "{}",
        format_field_line(field.name, &value.to_string(), field.unit, client.print_format())
    );
    Ok(())
}

async fn cmd_probe(client: &EmsClient) -> Result<()> {
    let second = client.probe().await.context("bus did not answer")?;
    println!("Bus OK (room controller clock at :{second:02})");
    Ok(())
}

async fn cmd_schedule(client: &EmsClient, program: SwitchProgram, all: bool) -> Result<()> {
    for index in 0..SWITCH_POINTS {
        let point = client.get_switch_point(program, index).await?;
        if point.is_undefined() {
            if all {
                println!("{:02} --", point.index);
            }
            continue;
        }
        let day = DAYS.get(point.day as usize).copied().unwrap_or("???");
        let action = if point.action == ACTION_ON { "on" } else { "off" };
        println!(
            "{:02} {} {:02}:{:02} {}",
            point.index, day, point.hour, point.minute, action
        );
    }
    Ok(())
}

async fn cmd_set(client: &EmsClient, action: &SetAction) -> Result<()> {
    match action {
        SetAction::WorkModeHc { hc, mode } => client.set_work_mode_hc(*hc, *mode).await?,
        SetAction::TemperatureHc { hc, mode, raw } => {
            client.set_temperature_hc(*hc, *mode, *raw).await?
        }
        SetAction::TemperatureDhw { temp } => client.set_temperature_dhw(*temp).await?,
        SetAction::OneTimeDhw { state } => {
            client.set_one_time_dhw(matches!(state, OnOff::On)).await?
        }
        SetAction::SwitchPoint {
            program,
            index,
            action,
            day,
            hour,
            minute,
        } => {
            client
                .set_program_switch_point(*program, *index, *action, *day, *hour, *minute)
                .await?
        }
        SetAction::Holiday {
            hc,
            start,
            end,
            home,
        } => {
            if *home {
                client.set_home_holiday_mode_hc(*hc, *start, *end).await?
            } else {
                client.set_holiday_mode_hc(*hc, *start, *end).await?
            }
        }
    }
    println!("OK");
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // The `list` command does not require a bus connection.
    if let Command::List { fields } = &cli.command {
        return cmd_list(*fields);
    }

    let client = create_client(&cli).await?;

    let result = match &cli.command {
        Command::List { .. } => unreachable!("list handled above"),
        Command::Print { message } => match lookup_message(message) {
            Ok(descriptor) => client
                .print_message(descriptor.id)
                .await
                .map(|_| ())
                .map_err(Into::into),
            Err(e) => Err(e),
        },
        Command::Get { message, field } => cmd_get(&client, message, field).await,
        Command::Probe => cmd_probe(&client).await,
        Command::Schedule { program, all } => cmd_schedule(&client, *program, *all).await,
        Command::Set { action } => cmd_set(&client, action).await,
    };

    client.close().await.ok();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_address() {
        assert_eq!(parse_hex_u8("0x0B"), Ok(0x0B));
        assert_eq!(parse_hex_u8("21"), Ok(0x21));
        assert!(parse_hex_u8("zz").is_err());
    }

    #[test]
    fn circuit_names() {
        assert_eq!(parse_circuit("2"), Ok(HeatingCircuit::Hc2));
        assert_eq!(parse_circuit("hc4"), Ok(HeatingCircuit::Hc4));
        assert!(parse_circuit("5").is_err());
    }

    #[test]
    fn program_names() {
        assert_eq!(parse_program("dhw"), Ok(SwitchProgram::Dhw));
        assert_eq!(parse_program("Pump-DHW"), Ok(SwitchProgram::PumpDhw));
        assert_eq!(
            parse_program("hc1"),
            Ok(SwitchProgram::Heating(HeatingCircuit::Hc1, ProgramSlot::First))
        );
        assert_eq!(
            parse_program("hc3:2"),
            Ok(SwitchProgram::Heating(HeatingCircuit::Hc3, ProgramSlot::Second))
        );
        assert!(parse_program("hc3:3").is_err());
        assert!(parse_program("boiler").is_err());
    }

    #[test]
    fn holiday_dates() {
        assert_eq!(parse_date("24.12.26"), Ok(HolidayDate::new(24, 12, 26)));
        assert!(parse_date("24.12").is_err());
        assert!(parse_date("a.b.c").is_err());
    }

    #[test]
    fn cli_parses_set_commands() {
        let cli = Cli::try_parse_from([
            "emsbus-test-app",
            "--mock",
            "--format",
            "xml",
            "set",
            "holiday",
            "--hc",
            "1",
            "--start",
            "24.12.26",
            "--end",
            "02.01.27",
        ])
        .unwrap();
        assert!(cli.mock);
        assert_eq!(cli.format, PrintFormat::Xml);
        assert!(matches!(
            cli.command,
            Command::Set {
                action: SetAction::Holiday { home: false, .. }
            }
        ));
    }

    #[tokio::test]
    async fn mock_boiler_answers() {
        let bus = mock_boiler(0x0B);
        let client = EmsBuilder::new()
            .build_with_transport(Box::new(bus))
            .await
            .unwrap();

        assert_eq!(client.probe().await.unwrap(), 12);
        let program = SwitchProgram::Heating(HeatingCircuit::Hc1, ProgramSlot::First);
        let first = client.get_switch_point(program, 0).await.unwrap();
        assert_eq!((first.action, first.day, first.hour), (ACTION_ON, 0, 6));
        let free = client.get_switch_point(program, 10).await.unwrap();
        assert!(free.is_undefined());
    }
}
