//! EMS write command builders.
//!
//! Each function validates its arguments against the documented range of
//! the target setting and resolves it to one or more [`FieldWrite`]s:
//! which message, which field, which byte. Nothing here touches the bus, so
//! an out-of-range argument is rejected with [`Error::Validation`] before
//! any traffic happens.
//!
//! Executing the writes is up to [`EmsClient`](crate::client::EmsClient).

use std::fmt::Display;
use std::ops::RangeInclusive;

use emsbus_core::error::{Error, Result};
use emsbus_core::{ACTION_OFF, ACTION_ON, ACTION_UNDEFINED, EncodeKind, HeatingCircuit};

use crate::catalog::{Field, MessageDescriptor, SWITCH_POINTS, SwitchProgram};
use crate::codec::{FieldDescriptor, encode_switch_point};

/// Value written to FlagsDHW to start a one-time hot water charge.
pub const ONE_TIME_DHW_ON: u8 = 39;
/// Value written to FlagsDHW to cancel a one-time hot water charge.
pub const ONE_TIME_DHW_OFF: u8 = 7;

/// One byte to store in a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldWrite {
    pub message: &'static MessageDescriptor,
    pub field: &'static FieldDescriptor,
    /// Added to the field's offset, for multi-byte fields.
    pub extra_offset: u8,
    pub value: u8,
}

impl FieldWrite {
    fn new(field: Field, value: u8) -> Self {
        let (message, field) = field.resolve();
        FieldWrite {
            message,
            field,
            extra_offset: 0,
            value,
        }
    }

    fn at(
        message: &'static MessageDescriptor,
        field: &'static FieldDescriptor,
        extra_offset: u8,
        value: u8,
    ) -> Self {
        FieldWrite {
            message,
            field,
            extra_offset,
            value,
        }
    }

    /// Offset of the written byte within the message payload.
    pub fn payload_offset(&self) -> u8 {
        self.field.payload_offset() as u8 + self.extra_offset
    }

    /// The written value as printed: unsigned for byte fields, signed
    /// otherwise.
    pub fn value_text(&self) -> String {
        match self.field.kind {
            EncodeKind::Byte => self.value.to_string(),
            _ => (self.value as i8).to_string(),
        }
    }
}

/// A holiday start or end date. `year` is the two-digit year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HolidayDate {
    pub day: u8,
    pub month: u8,
    pub year: u8,
}

impl HolidayDate {
    pub fn new(day: u8, month: u8, year: u8) -> Self {
        HolidayDate { day, month, year }
    }

    fn validate(&self) -> Result<()> {
        check_range("holiday day", self.day, 1..=31)?;
        check_range("holiday month", self.month, 1..=12)?;
        Ok(())
    }
}

fn check_range<T: PartialOrd + Display>(what: &str, value: T, range: RangeInclusive<T>) -> Result<T> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(Error::Validation(format!(
            "{what} {value} out of range {}..={}",
            range.start(),
            range.end()
        )))
    }
}

fn check_one_of(what: &str, value: u8, allowed: &[u8]) -> Result<u8> {
    if allowed.contains(&value) {
        Ok(value)
    } else {
        Err(Error::Validation(format!(
            "{what} {value} not one of {allowed:?}"
        )))
    }
}

fn check_circuit(hc: HeatingCircuit, max_circuits: u8) -> Result<HeatingCircuit> {
    if hc.number() <= max_circuits {
        Ok(hc)
    } else {
        Err(Error::Validation(format!(
            "heating circuit {} not configured (max {max_circuits})",
            hc.number()
        )))
    }
}

// ---------------------------------------------------------------------------
// Heating circuits
// ---------------------------------------------------------------------------

/// Working mode of a circuit: 0 night, 1 day, 2 automatic.
pub fn work_mode_hc(hc: HeatingCircuit, max_circuits: u8, mode: u8) -> Result<FieldWrite> {
    let hc = check_circuit(hc, max_circuits)?;
    let mode = check_range("working mode", mode, 0..=2)?;
    Ok(FieldWrite::new(Field::WorkModeHc(hc), mode))
}

/// Set temperature of a circuit for one mode: 0 night, 1 day, 2 holiday.
///
/// `raw` is in half degrees, 12..=58 (6.0 to 29.0 °C).
pub fn temperature_hc(hc: HeatingCircuit, max_circuits: u8, mode: u8, raw: u8) -> Result<FieldWrite> {
    let hc = check_circuit(hc, max_circuits)?;
    let field = match check_range("temperature mode", mode, 0..=2)? {
        0 => Field::SelNightTempHc(hc),
        1 => Field::SelDayTempHc(hc),
        _ => Field::SelHoliTempHc(hc),
    };
    let raw = check_range("temperature (half degrees)", raw, 12..=58)?;
    Ok(FieldWrite::new(field, raw))
}

/// Select one of the predefined weekly programs (0 user, 1..=10).
pub fn program_hc(hc: HeatingCircuit, max_circuits: u8, program: u8) -> Result<FieldWrite> {
    let hc = check_circuit(hc, max_circuits)?;
    let program = check_range("program", program, 0..=10)?;
    Ok(FieldWrite::new(Field::ProgramNameHc(hc), program))
}

/// Outside temperature above which the circuit switches to summer mode.
pub fn sw_threshold_temp_hc(hc: HeatingCircuit, max_circuits: u8, temp: u8) -> Result<FieldWrite> {
    let hc = check_circuit(hc, max_circuits)?;
    let temp = check_range("summer threshold temperature", temp, 10..=30)?;
    Ok(FieldWrite::new(Field::SwThresTempHc(hc), temp))
}

/// Night setback mode: 0 shutdown, 1 reduced, 2 room setback, 3 outdoor setback.
pub fn night_setback_mode_hc(hc: HeatingCircuit, max_circuits: u8, mode: u8) -> Result<FieldWrite> {
    let hc = check_circuit(hc, max_circuits)?;
    let mode = check_range("night setback mode", mode, 0..=3)?;
    Ok(FieldWrite::new(Field::NightSetbackHc(hc), mode))
}

/// Outside temperature below which night setback is suspended.
pub fn night_threshold_out_temp_hc(
    hc: HeatingCircuit,
    max_circuits: u8,
    temp: i8,
) -> Result<FieldWrite> {
    let hc = check_circuit(hc, max_circuits)?;
    let temp = check_range("night threshold temperature", temp, -20..=10)?;
    Ok(FieldWrite::new(Field::NightOutTempHc(hc), temp as u8))
}

/// Room temperature offset in half degrees.
pub fn room_temp_offset_hc(hc: HeatingCircuit, max_circuits: u8, raw: i8) -> Result<FieldWrite> {
    let hc = check_circuit(hc, max_circuits)?;
    let raw = check_range("room temperature offset (half degrees)", raw, -10..=10)?;
    Ok(FieldWrite::new(Field::RoomTempOffHc(hc), raw as u8))
}

/// Pause the circuit for `hours`.
pub fn pause_mode_hc(hc: HeatingCircuit, max_circuits: u8, hours: u8) -> Result<FieldWrite> {
    let hc = check_circuit(hc, max_circuits)?;
    Ok(FieldWrite::new(Field::PauseTimeHc(hc), hours))
}

/// Keep day mode for `hours`.
pub fn party_mode_hc(hc: HeatingCircuit, max_circuits: u8, hours: u8) -> Result<FieldWrite> {
    let hc = check_circuit(hc, max_circuits)?;
    Ok(FieldWrite::new(Field::PartyTimeHc(hc), hours))
}

/// Away-from-home holiday range: six writes, start then end.
pub fn holiday_mode_hc(
    hc: HeatingCircuit,
    max_circuits: u8,
    start: HolidayDate,
    end: HolidayDate,
) -> Result<[FieldWrite; 6]> {
    let hc = check_circuit(hc, max_circuits)?;
    start.validate()?;
    end.validate()?;
    Ok([
        FieldWrite::new(Field::StartHolidayDayHc(hc), start.day),
        FieldWrite::new(Field::StartHolidayMonthHc(hc), start.month),
        FieldWrite::new(Field::StartHolidayYearHc(hc), start.year),
        FieldWrite::new(Field::EndHolidayDayHc(hc), end.day),
        FieldWrite::new(Field::EndHolidayMonthHc(hc), end.month),
        FieldWrite::new(Field::EndHolidayYearHc(hc), end.year),
    ])
}

/// At-home holiday range: six writes, start then end.
pub fn home_holiday_mode_hc(
    hc: HeatingCircuit,
    max_circuits: u8,
    start: HolidayDate,
    end: HolidayDate,
) -> Result<[FieldWrite; 6]> {
    let hc = check_circuit(hc, max_circuits)?;
    start.validate()?;
    end.validate()?;
    Ok([
        FieldWrite::new(Field::StartHomeHolidayDayHc(hc), start.day),
        FieldWrite::new(Field::StartHomeHolidayMonthHc(hc), start.month),
        FieldWrite::new(Field::StartHomeHolidayYearHc(hc), start.year),
        FieldWrite::new(Field::EndHomeHolidayDayHc(hc), end.day),
        FieldWrite::new(Field::EndHomeHolidayMonthHc(hc), end.month),
        FieldWrite::new(Field::EndHomeHolidayYearHc(hc), end.year),
    ])
}

// ---------------------------------------------------------------------------
// Hot water
// ---------------------------------------------------------------------------

/// Hot water working mode: 0 off, 1 on, 2 automatic.
pub fn work_mode_dhw(mode: u8) -> Result<FieldWrite> {
    let mode = check_range("hot water working mode", mode, 0..=2)?;
    Ok(FieldWrite::new(Field::WorkModeDhw, mode))
}

/// Circulation pump working mode: 0 off, 1 on, 2 automatic.
pub fn work_mode_pump_dhw(mode: u8) -> Result<FieldWrite> {
    let mode = check_range("circulation pump working mode", mode, 0..=2)?;
    Ok(FieldWrite::new(Field::WorkModePumpDhw, mode))
}

/// Hot water set temperature in °C.
pub fn temperature_dhw(temp: u8) -> Result<FieldWrite> {
    let temp = check_range("hot water temperature", temp, 40..=80)?;
    Ok(FieldWrite::new(Field::SelTempDhw, temp))
}

/// Thermal disinfection temperature in °C.
pub fn temperature_td_dhw(temp: u8) -> Result<FieldWrite> {
    let temp = check_range("thermal disinfection temperature", temp, 40..=80)?;
    Ok(FieldWrite::new(Field::SelTempTdDhw, temp))
}

/// Hot water program source: 0 follows the heating circuits, 255 own program.
pub fn program_dhw(program: u8) -> Result<FieldWrite> {
    let program = check_one_of("hot water program", program, &[0, 255])?;
    Ok(FieldWrite::new(Field::ProgDhw, program))
}

/// Circulation pump program source: 0 follows the heating circuits, 255 own program.
pub fn program_pump_dhw(program: u8) -> Result<FieldWrite> {
    let program = check_one_of("circulation pump program", program, &[0, 255])?;
    Ok(FieldWrite::new(Field::ProgPumpDhw, program))
}

pub fn one_time_dhw(on: bool) -> FieldWrite {
    let value = if on { ONE_TIME_DHW_ON } else { ONE_TIME_DHW_OFF };
    FieldWrite::new(Field::OneTimeDhwFlags, value)
}

/// Thermal disinfection: 0 off, 255 on.
pub fn work_mode_td_dhw(mode: u8) -> Result<FieldWrite> {
    let mode = check_one_of("thermal disinfection mode", mode, &[0, 255])?;
    Ok(FieldWrite::new(Field::WorkModeTdDhw, mode))
}

/// Thermal disinfection day: 0 Monday to 6 Sunday, 7 every day.
pub fn day_td_dhw(day: u8) -> Result<FieldWrite> {
    let day = check_range("thermal disinfection day", day, 0..=7)?;
    Ok(FieldWrite::new(Field::DayTdDhw, day))
}

pub fn hour_td_dhw(hour: u8) -> Result<FieldWrite> {
    let hour = check_range("thermal disinfection hour", hour, 0..=23)?;
    Ok(FieldWrite::new(Field::HourTdDhw, hour))
}

// ---------------------------------------------------------------------------
// Switching programs
// ---------------------------------------------------------------------------

/// Store one switch point: two writes, first byte then second.
///
/// An `action` of [`ACTION_UNDEFINED`] clears the point; day, hour and
/// minute are still validated but not stored.
pub fn program_switch_point(
    program: SwitchProgram,
    max_circuits: u8,
    index: usize,
    action: u8,
    day: u8,
    hour: u8,
    minute: u8,
) -> Result<[FieldWrite; 2]> {
    if let Some(hc) = program.circuit() {
        check_circuit(hc, max_circuits)?;
    }
    let index = check_range("switch point index", index, 0..=SWITCH_POINTS - 1)?;
    check_one_of("switch point action", action, &[ACTION_OFF, ACTION_ON, ACTION_UNDEFINED])?;
    check_range("switch point day", day, 0..=6)?;
    check_range("switch point hour", hour, 0..=23)?;
    check_range("switch point minute", minute, 0..=59)?;
    if minute % 10 != 0 {
        return Err(Error::Validation(format!(
            "switch point minute {minute} not a multiple of 10"
        )));
    }

    let (message, field) = program.switch_point(index).ok_or_else(|| {
        Error::Validation(format!("switch point index {index} out of range"))
    })?;
    let bytes = encode_switch_point(action, day, hour, minute);
    Ok([
        FieldWrite::at(message, field, 0, bytes[0]),
        FieldWrite::at(message, field, 1, bytes[1]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MessageId, ProgramSlot};
    use HeatingCircuit::*;

    fn target(w: &FieldWrite) -> (&'static str, &'static str, u8, u8) {
        (w.message.name, w.field.name, w.payload_offset(), w.value)
    }

    fn is_validation<T: std::fmt::Debug>(r: Result<T>) -> bool {
        matches!(r, Err(Error::Validation(_)))
    }

    // ---------------------------------------------------------------
    // Heating circuits
    // ---------------------------------------------------------------

    #[test]
    fn work_mode_targets_circuit_message() {
        let w = work_mode_hc(Hc2, 2, 1).unwrap();
        assert_eq!(target(&w), ("WorkingModeHC2", "WorkModeHC", 7, 1));
        assert_eq!(w.message.msg_type, 0x47);
    }

    #[test]
    fn work_mode_rejects_bad_mode() {
        assert!(is_validation(work_mode_hc(Hc1, 2, 3)));
    }

    #[test]
    fn circuit_above_configured_maximum_rejected() {
        assert!(is_validation(work_mode_hc(Hc3, 2, 1)));
        assert!(work_mode_hc(Hc3, 3, 1).is_ok());
    }

    #[test]
    fn temperature_mode_selects_field() {
        let night = temperature_hc(Hc1, 2, 0, 30).unwrap();
        let day = temperature_hc(Hc1, 2, 1, 30).unwrap();
        let holiday = temperature_hc(Hc1, 2, 2, 30).unwrap();
        assert_eq!(target(&night), ("WorkingModeHC1", "SelNightTempHC", 1, 30));
        assert_eq!(target(&day), ("WorkingModeHC1", "SelDayTempHC", 2, 30));
        assert_eq!(target(&holiday), ("WorkingModeHC1", "SelHoliTempHC", 3, 30));
    }

    #[test]
    fn temperature_bounds() {
        assert!(temperature_hc(Hc1, 2, 1, 12).is_ok());
        assert!(temperature_hc(Hc1, 2, 1, 58).is_ok());
        assert!(is_validation(temperature_hc(Hc1, 2, 1, 11)));
        assert!(is_validation(temperature_hc(Hc1, 2, 1, 59)));
        assert!(is_validation(temperature_hc(Hc1, 2, 3, 30)));
    }

    #[test]
    fn program_name_lives_in_first_program() {
        let w = program_hc(Hc2, 2, 10).unwrap();
        assert_eq!(target(&w), ("Program1HC2", "ProgramName", 84, 10));
        assert!(is_validation(program_hc(Hc2, 2, 11)));
    }

    #[test]
    fn threshold_and_setback_bounds() {
        assert!(sw_threshold_temp_hc(Hc1, 2, 10).is_ok());
        assert!(is_validation(sw_threshold_temp_hc(Hc1, 2, 9)));
        assert!(is_validation(sw_threshold_temp_hc(Hc1, 2, 31)));
        assert!(night_setback_mode_hc(Hc1, 2, 3).is_ok());
        assert!(is_validation(night_setback_mode_hc(Hc1, 2, 4)));
    }

    #[test]
    fn signed_settings_are_stored_twos_complement() {
        let w = night_threshold_out_temp_hc(Hc1, 2, -5).unwrap();
        assert_eq!(target(&w), ("WorkingModeHC1", "NightOutTempHC", 39, 0xFB));
        assert_eq!(w.value_text(), "-5");
        assert!(is_validation(night_threshold_out_temp_hc(Hc1, 2, -21)));
        assert!(is_validation(night_threshold_out_temp_hc(Hc1, 2, 11)));

        let w = room_temp_offset_hc(Hc1, 2, -10).unwrap();
        assert_eq!(target(&w), ("WorkingModeHC1", "RoomTempOffHC", 6, 0xF6));
        assert!(is_validation(room_temp_offset_hc(Hc1, 2, 11)));
    }

    #[test]
    fn pause_and_party_only_check_circuit() {
        let w = pause_mode_hc(Hc1, 2, 255).unwrap();
        assert_eq!(target(&w), ("Program1HC1", "PauseTime", 85, 255));
        let w = party_mode_hc(Hc1, 2, 4).unwrap();
        assert_eq!(target(&w), ("Program1HC1", "PartyTime", 86, 4));
        assert!(is_validation(party_mode_hc(Hc4, 2, 4)));
    }

    #[test]
    fn holiday_writes_six_fields_in_order() {
        let writes = holiday_mode_hc(
            Hc1,
            2,
            HolidayDate::new(24, 12, 26),
            HolidayDate::new(2, 1, 27),
        )
        .unwrap();
        let targets: Vec<_> = writes.iter().map(|w| (w.field.name, w.payload_offset(), w.value)).collect();
        assert_eq!(
            targets,
            vec![
                ("StartHoliDay", 87, 24),
                ("StartHoliMonth", 88, 12),
                ("StartHoliYear", 89, 26),
                ("EndHoliDay", 90, 2),
                ("EndHoliMonth", 91, 1),
                ("EndHoliYear", 92, 27),
            ]
        );
    }

    #[test]
    fn home_holiday_uses_home_fields() {
        let writes = home_holiday_mode_hc(
            Hc2,
            2,
            HolidayDate::new(1, 8, 26),
            HolidayDate::new(15, 8, 26),
        )
        .unwrap();
        assert!(writes.iter().all(|w| w.message.id == MessageId::Program1Hc2));
        assert_eq!(writes[0].field.name, "StartHHolDay");
        assert_eq!(writes[0].payload_offset(), 93);
        assert_eq!(writes[5].field.name, "EndHHoliYear");
        assert_eq!(writes[5].payload_offset(), 98);
    }

    #[test]
    fn holiday_dates_validated() {
        let ok = HolidayDate::new(1, 1, 26);
        assert!(is_validation(holiday_mode_hc(Hc1, 2, HolidayDate::new(0, 1, 26), ok)));
        assert!(is_validation(holiday_mode_hc(Hc1, 2, HolidayDate::new(32, 1, 26), ok)));
        assert!(is_validation(holiday_mode_hc(Hc1, 2, ok, HolidayDate::new(1, 13, 26))));
        assert!(is_validation(home_holiday_mode_hc(Hc1, 2, ok, HolidayDate::new(1, 0, 26))));
        assert!(holiday_mode_hc(Hc1, 2, HolidayDate::new(31, 12, 99), ok).is_ok());
    }

    // ---------------------------------------------------------------
    // Hot water
    // ---------------------------------------------------------------

    #[test]
    fn dhw_temperatures() {
        let w = temperature_dhw(55).unwrap();
        assert_eq!(target(&w), ("UBAParameterDHW", "SelTempDHW", 2, 55));
        assert_eq!(w.message.destination(), 0x08);
        let w = temperature_td_dhw(70).unwrap();
        assert_eq!(target(&w), ("UBAParameterDHW", "SelTempTDDHW", 8, 70));
        assert!(is_validation(temperature_dhw(39)));
        assert!(is_validation(temperature_td_dhw(81)));
    }

    #[test]
    fn dhw_working_modes() {
        let w = work_mode_dhw(2).unwrap();
        assert_eq!(target(&w), ("WorkingModeDHW", "WorkModeDHW", 2, 2));
        let w = work_mode_pump_dhw(0).unwrap();
        assert_eq!(target(&w), ("WorkingModeDHW", "WorkModePumpDHW", 3, 0));
        assert!(is_validation(work_mode_dhw(3)));
        assert!(is_validation(work_mode_pump_dhw(3)));
    }

    #[test]
    fn dhw_program_sources_accept_only_two_values() {
        assert_eq!(program_dhw(255).unwrap().value, 255);
        assert_eq!(program_pump_dhw(0).unwrap().field.name, "ProgPumpDHW");
        assert!(is_validation(program_dhw(1)));
        assert!(is_validation(program_pump_dhw(254)));
    }

    #[test]
    fn one_time_charge_values() {
        let on = one_time_dhw(true);
        assert_eq!(target(&on), ("FlagsDHW", "OneTimeDHW", 0, 39));
        assert_eq!(one_time_dhw(false).value, 7);
    }

    #[test]
    fn thermal_disinfection_schedule() {
        assert_eq!(work_mode_td_dhw(255).unwrap().value, 255);
        assert!(is_validation(work_mode_td_dhw(1)));
        assert_eq!(target(&day_td_dhw(7).unwrap()), ("WorkingModeDHW", "DayTDDHW", 5, 7));
        assert!(is_validation(day_td_dhw(8)));
        assert_eq!(target(&hour_td_dhw(23).unwrap()), ("WorkingModeDHW", "HourTDDHW", 6, 23));
        assert!(is_validation(hour_td_dhw(24)));
    }

    #[test]
    fn byte_values_print_unsigned() {
        assert_eq!(program_dhw(255).unwrap().value_text(), "255");
    }

    // ---------------------------------------------------------------
    // Switch points
    // ---------------------------------------------------------------

    #[test]
    fn switch_point_writes_both_bytes() {
        let program = SwitchProgram::Heating(Hc1, ProgramSlot::Second);
        let writes = program_switch_point(program, 2, 3, ACTION_ON, 2, 6, 30).unwrap();
        assert_eq!(writes[0].message.name, "Program2HC1");
        assert_eq!(writes[0].payload_offset(), 6);
        assert_eq!(writes[1].payload_offset(), 7);
        assert_eq!(
            [writes[0].value, writes[1].value],
            encode_switch_point(ACTION_ON, 2, 6, 30)
        );
    }

    #[test]
    fn undefined_switch_point_writes_sentinel() {
        let writes = program_switch_point(SwitchProgram::Dhw, 2, 41, ACTION_UNDEFINED, 0, 0, 0).unwrap();
        assert_eq!(writes[0].payload_offset(), 82);
        assert_eq!([writes[0].value, writes[1].value], [0xE7, 0x90]);
    }

    #[test]
    fn switch_point_validation() {
        let p = SwitchProgram::PumpDhw;
        assert!(is_validation(program_switch_point(p, 2, 42, ACTION_ON, 0, 0, 0)));
        assert!(is_validation(program_switch_point(p, 2, 0, 2, 0, 0, 0)));
        assert!(is_validation(program_switch_point(p, 2, 0, ACTION_ON, 7, 0, 0)));
        assert!(is_validation(program_switch_point(p, 2, 0, ACTION_ON, 0, 24, 0)));
        assert!(is_validation(program_switch_point(p, 2, 0, ACTION_ON, 0, 0, 60)));
        assert!(is_validation(program_switch_point(p, 2, 0, ACTION_ON, 0, 0, 15)));
        let hc3 = SwitchProgram::Heating(Hc3, ProgramSlot::First);
        assert!(is_validation(program_switch_point(hc3, 2, 0, ACTION_ON, 0, 0, 0)));
    }
}
