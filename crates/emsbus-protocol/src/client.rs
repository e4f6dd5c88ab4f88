//! EmsClient -- named, validated operations on an EMS bus.
//!
//! The client ties the [`catalog`](crate::catalog) and
//! [`commands`](crate::commands) to the protocol [`Engine`]. Each call
//! validates its arguments first, then takes the engine lock for the whole
//! operation, so composite writes such as holiday ranges are never
//! interleaved with other callers' traffic.
//!
//! Every set operation echoes what it did to the configured
//! [`DebugSink`]: the message header, then either the written value or the
//! error tag, then the message tail.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use emsbus_core::error::{Error, Result};
use emsbus_core::{
    DebugSink, EncodeKind, HeatingCircuit, PrintFormat, SwitchPoint, Value, format_error_tag,
    format_field_line, format_message_tag,
};

use crate::catalog::{Datagram, Field, MessageDescriptor, MessageId, SwitchProgram};
use crate::codec::FieldDescriptor;
use crate::commands::{self, FieldWrite, HolidayDate};
use crate::engine::Engine;

/// A connected EMS bus client.
///
/// Constructed via [`EmsBuilder`](crate::builder::EmsBuilder).
pub struct EmsClient {
    engine: Mutex<Engine>,
    max_heating_circuits: u8,
    print_format: PrintFormat,
    sink: Option<Arc<dyn DebugSink>>,
}

impl EmsClient {
    pub(crate) fn new(
        engine: Engine,
        max_heating_circuits: u8,
        print_format: PrintFormat,
        sink: Option<Arc<dyn DebugSink>>,
    ) -> Self {
        EmsClient {
            engine: Mutex::new(engine),
            max_heating_circuits,
            print_format,
            sink,
        }
    }

    /// Number of heating circuits set operations accept.
    pub fn max_heating_circuits(&self) -> u8 {
        self.max_heating_circuits
    }

    pub fn print_format(&self) -> PrintFormat {
        self.print_format
    }

    /// Close the underlying transport.
    pub async fn close(&self) -> Result<()> {
        self.engine.lock().await.close().await
    }

    // -----------------------------------------------------------------------
    // Debug output
    // -----------------------------------------------------------------------

    fn emit(&self, line: impl FnOnce(PrintFormat) -> String) {
        if let Some(sink) = &self.sink {
            sink.write_line(&line(self.print_format));
        }
    }

    fn emit_block<T>(&self, message: &str, result: &Result<T>, body: impl FnOnce(&T, PrintFormat) -> Vec<String>) {
        let Some(sink) = &self.sink else {
            return;
        };
        let format = self.print_format;
        sink.write_line(&format_message_tag(message, true, format));
        match result {
            Ok(value) => {
                for line in body(value, format) {
                    sink.write_line(&line);
                }
            }
            Err(_) => sink.write_line(&format_error_tag(format)),
        }
        sink.write_line(&format_message_tag(message, false, format));
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    async fn read_field(
        &self,
        message: &'static MessageDescriptor,
        field: &'static FieldDescriptor,
    ) -> Result<Value> {
        let mut buf = vec![0u8; message.wire_len()];
        self.engine
            .lock()
            .await
            .read(
                message.destination(),
                message.msg_type,
                field.payload_offset() as u8,
                field.width(),
                &mut buf,
            )
            .await?;
        Ok(field.decode(&buf))
    }

    /// Read a single value.
    pub async fn get_value(&self, field: Field) -> Result<Value> {
        let (message, descriptor) = field.resolve();
        debug!(msg = message.name, field = descriptor.name, "get value");
        self.read_field(message, descriptor).await
    }

    fn check_kind(field: Field, want: &str, ok: fn(EncodeKind) -> bool) -> Result<()> {
        let (message, descriptor) = field.resolve();
        if ok(descriptor.kind) {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "{}.{} is {:?}, not a {want} field",
                message.name, descriptor.name, descriptor.kind
            )))
        }
    }

    /// Read a byte field.
    pub async fn get_byte(&self, field: Field) -> Result<u8> {
        Self::check_kind(field, "byte", |k| matches!(k, EncodeKind::Byte))?;
        let value = self.get_value(field).await?;
        value
            .as_byte()
            .ok_or_else(|| Error::Validation(format!("{value:?} is not a byte")))
    }

    /// Read a single-bit flag.
    pub async fn get_bit(&self, field: Field) -> Result<bool> {
        Self::check_kind(field, "bit", |k| matches!(k, EncodeKind::Bit { .. }))?;
        let value = self.get_value(field).await?;
        value
            .as_bit()
            .ok_or_else(|| Error::Validation(format!("{value:?} is not a bit")))
    }

    /// Read a 24-bit counter.
    pub async fn get_ulong(&self, field: Field) -> Result<u32> {
        Self::check_kind(field, "counter", |k| matches!(k, EncodeKind::UnsignedLong24))?;
        let value = self.get_value(field).await?;
        value
            .as_ulong()
            .ok_or_else(|| Error::Validation(format!("{value:?} is not a counter")))
    }

    /// Read a scaled fixed-point value.
    pub async fn get_float(&self, field: Field) -> Result<f32> {
        Self::check_kind(field, "scaled", |k| matches!(k, EncodeKind::ScaledFloat { .. }))?;
        let value = self.get_value(field).await?;
        value
            .as_float()
            .ok_or_else(|| Error::Validation(format!("{value:?} is not a scaled value")))
    }

    /// Read one switch point of a weekly program.
    pub async fn get_switch_point(&self, program: SwitchProgram, index: usize) -> Result<SwitchPoint> {
        let (message, field) = program
            .switch_point(index)
            .ok_or_else(|| Error::Validation(format!("switch point index {index} out of range")))?;
        let value = self.read_field(message, field).await?;
        value
            .as_switch_point()
            .ok_or_else(|| Error::Validation(format!("{value:?} is not a switch point")))
    }

    /// Read and decode a whole message.
    pub async fn read_message(&self, id: MessageId) -> Result<Datagram> {
        let message = id.descriptor();
        debug!(msg = message.name, "read message");
        let mut buffer = vec![0u8; message.wire_len()];
        self.engine
            .lock()
            .await
            .read(
                message.destination(),
                message.msg_type,
                0,
                message.payload_len as usize,
                &mut buffer,
            )
            .await?;
        Ok(Datagram { message, buffer })
    }

    /// Read a whole message and print every field to the debug sink.
    pub async fn print_message(&self, id: MessageId) -> Result<Datagram> {
        let result = self.read_message(id).await;
        self.emit_block(id.descriptor().name, &result, |datagram, format| {
            datagram
                .values()
                .map(|(f, v)| format_field_line(f.name, &v.to_string(), f.unit, format))
                .collect()
        });
        result
    }

    /// Read a single value and print it to the debug sink.
    pub async fn print_field(&self, field: Field) -> Result<Value> {
        let (message, descriptor) = field.resolve();
        let result = self.get_value(field).await;
        self.emit_block(message.name, &result, |value, format| {
            vec![format_field_line(
                descriptor.name,
                &value.to_string(),
                descriptor.unit,
                format,
            )]
        });
        result
    }

    /// Check that the bus answers by reading the room controller's clock
    /// seconds.
    pub async fn probe(&self) -> Result<u8> {
        self.get_byte(Field::Second).await
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    async fn apply(&self, engine: &mut Engine, write: &FieldWrite) -> Result<()> {
        let message = write.message;
        let result = engine
            .write(
                message.destination(),
                message.msg_type,
                write.payload_offset(),
                write.value,
            )
            .await;
        self.emit(|format| format_message_tag(message.name, true, format));
        match &result {
            Ok(()) => self.emit(|format| {
                format_field_line(write.field.name, &write.value_text(), write.field.unit, format)
            }),
            Err(_) => self.emit(format_error_tag),
        }
        self.emit(|format| format_message_tag(message.name, false, format));
        result
    }

    /// Run writes in order under one engine lock, stopping at the first
    /// failure.
    async fn run(&self, writes: &[FieldWrite]) -> Result<()> {
        let mut engine = self.engine.lock().await;
        for write in writes {
            self.apply(&mut engine, write).await?;
        }
        Ok(())
    }

    /// Working mode of a circuit: 0 night, 1 day, 2 automatic.
    pub async fn set_work_mode_hc(&self, hc: HeatingCircuit, mode: u8) -> Result<()> {
        let write = commands::work_mode_hc(hc, self.max_heating_circuits, mode)?;
        self.run(&[write]).await
    }

    /// Set temperature for mode 0 (night), 1 (day) or 2 (holiday), in half
    /// degrees.
    pub async fn set_temperature_hc(&self, hc: HeatingCircuit, mode: u8, raw: u8) -> Result<()> {
        let write = commands::temperature_hc(hc, self.max_heating_circuits, mode, raw)?;
        self.run(&[write]).await
    }

    pub async fn set_program_hc(&self, hc: HeatingCircuit, program: u8) -> Result<()> {
        let write = commands::program_hc(hc, self.max_heating_circuits, program)?;
        self.run(&[write]).await
    }

    pub async fn set_sw_threshold_temp_hc(&self, hc: HeatingCircuit, temp: u8) -> Result<()> {
        let write = commands::sw_threshold_temp_hc(hc, self.max_heating_circuits, temp)?;
        self.run(&[write]).await
    }

    pub async fn set_night_setback_mode_hc(&self, hc: HeatingCircuit, mode: u8) -> Result<()> {
        let write = commands::night_setback_mode_hc(hc, self.max_heating_circuits, mode)?;
        self.run(&[write]).await
    }

    pub async fn set_night_threshold_out_temp_hc(&self, hc: HeatingCircuit, temp: i8) -> Result<()> {
        let write = commands::night_threshold_out_temp_hc(hc, self.max_heating_circuits, temp)?;
        self.run(&[write]).await
    }

    pub async fn set_room_temp_offset_hc(&self, hc: HeatingCircuit, raw: i8) -> Result<()> {
        let write = commands::room_temp_offset_hc(hc, self.max_heating_circuits, raw)?;
        self.run(&[write]).await
    }

    pub async fn set_pause_mode_hc(&self, hc: HeatingCircuit, hours: u8) -> Result<()> {
        let write = commands::pause_mode_hc(hc, self.max_heating_circuits, hours)?;
        self.run(&[write]).await
    }

    pub async fn set_party_mode_hc(&self, hc: HeatingCircuit, hours: u8) -> Result<()> {
        let write = commands::party_mode_hc(hc, self.max_heating_circuits, hours)?;
        self.run(&[write]).await
    }

    /// Store an away-from-home holiday range.
    ///
    /// Six writes; a failure part way leaves the earlier ones in place.
    pub async fn set_holiday_mode_hc(
        &self,
        hc: HeatingCircuit,
        start: HolidayDate,
        end: HolidayDate,
    ) -> Result<()> {
        let writes = commands::holiday_mode_hc(hc, self.max_heating_circuits, start, end)?;
        self.run(&writes).await
    }

    /// Store an at-home holiday range. Same semantics as
    /// [`set_holiday_mode_hc`](Self::set_holiday_mode_hc).
    pub async fn set_home_holiday_mode_hc(
        &self,
        hc: HeatingCircuit,
        start: HolidayDate,
        end: HolidayDate,
    ) -> Result<()> {
        let writes = commands::home_holiday_mode_hc(hc, self.max_heating_circuits, start, end)?;
        self.run(&writes).await
    }

    pub async fn set_work_mode_dhw(&self, mode: u8) -> Result<()> {
        self.run(&[commands::work_mode_dhw(mode)?]).await
    }

    pub async fn set_work_mode_pump_dhw(&self, mode: u8) -> Result<()> {
        self.run(&[commands::work_mode_pump_dhw(mode)?]).await
    }

    /// Hot water temperature in °C, 40..=80.
    pub async fn set_temperature_dhw(&self, temp: u8) -> Result<()> {
        self.run(&[commands::temperature_dhw(temp)?]).await
    }

    pub async fn set_temperature_td_dhw(&self, temp: u8) -> Result<()> {
        self.run(&[commands::temperature_td_dhw(temp)?]).await
    }

    pub async fn set_program_dhw(&self, program: u8) -> Result<()> {
        self.run(&[commands::program_dhw(program)?]).await
    }

    pub async fn set_program_pump_dhw(&self, program: u8) -> Result<()> {
        self.run(&[commands::program_pump_dhw(program)?]).await
    }

    /// Start or cancel a one-time hot water charge.
    pub async fn set_one_time_dhw(&self, on: bool) -> Result<()> {
        self.run(&[commands::one_time_dhw(on)]).await
    }

    pub async fn set_work_mode_td_dhw(&self, mode: u8) -> Result<()> {
        self.run(&[commands::work_mode_td_dhw(mode)?]).await
    }

    pub async fn set_day_td_dhw(&self, day: u8) -> Result<()> {
        self.run(&[commands::day_td_dhw(day)?]).await
    }

    pub async fn set_hour_td_dhw(&self, hour: u8) -> Result<()> {
        self.run(&[commands::hour_td_dhw(hour)?]).await
    }

    /// Store one switch point of a weekly program. Both bytes must be
    /// written for the call to succeed.
    pub async fn set_program_switch_point(
        &self,
        program: SwitchProgram,
        index: usize,
        action: u8,
        day: u8,
        hour: u8,
        minute: u8,
    ) -> Result<()> {
        let writes = commands::program_switch_point(
            program,
            self.max_heating_circuits,
            index,
            action,
            day,
            hour,
            minute,
        )?;
        self.run(&writes).await
    }
}
