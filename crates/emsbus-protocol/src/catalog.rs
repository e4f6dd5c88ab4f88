//! Datagram catalog.
//!
//! Every message this library understands is described once, here, by a
//! [`MessageDescriptor`]: which device answers it, its message type id, how
//! long its payload is and which fields it carries. The tables are `static`
//! and never change at runtime; the protocol engine only ever sees message
//! types, offsets and lengths taken from them.
//!
//! | Message          | Type   | Device | Payload |
//! |------------------|--------|--------|---------|
//! | RCDatetime       | `0x06` | RC35   | 8       |
//! | UBAWorkingTime   | `0x14` | UBA    | 3       |
//! | UBAMonitorFast   | `0x18` | UBA    | 27      |
//! | UBAMonitorSlow   | `0x19` | UBA    | 25      |
//! | UBAParameterDHW  | `0x33` | UBA    | 11      |
//! | UBAMonitorDHW    | `0x34` | UBA    | 16      |
//! | FlagsDHW         | `0x35` | UBA    | 1       |
//! | WorkingModeDHW   | `0x37` | RC35   | 10      |
//! | ProgramDHW       | `0x38` | RC35   | 99      |
//! | ProgramPumpDHW   | `0x39` | RC35   | 99      |
//! | WorkingModeHC1-4 | `0x3D` + 10·n | RC35 | 42 |
//! | MonitorHC1-4     | `0x3E` + 10·n | RC35 | 16 |
//! | Program1HC1-4    | `0x3F` + 10·n | RC35 | 99 |
//! | Program2HC1-4    | `0x42` + 10·n | RC35 | 84 |
//! | MonitorMM10      | `0xAB` | MM10   | 8       |
//!
//! Single values are addressed with [`Field`], which resolves to a
//! `(message, field)` pair without any string lookups.

use emsbus_core::{Device, HeatingCircuit, Unit, Value};

use crate::codec::FieldDescriptor;
use crate::frame::FRAME_OVERHEAD;

/// Number of switch points in a weekly program.
pub const SWITCH_POINTS: usize = 42;

/// Static description of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageDescriptor {
    pub id: MessageId,
    /// Message name as printed in diagnostics.
    pub name: &'static str,
    /// Device that owns the message.
    pub device: Device,
    /// Message type id on the wire.
    pub msg_type: u8,
    /// Payload length in bytes.
    pub payload_len: u8,
    pub fields: &'static [FieldDescriptor],
}

impl MessageDescriptor {
    const fn new(
        id: MessageId,
        name: &'static str,
        device: Device,
        msg_type: u8,
        payload_len: u8,
        fields: &'static [FieldDescriptor],
    ) -> Self {
        MessageDescriptor {
            id,
            name,
            device,
            msg_type,
            payload_len,
            fields,
        }
    }

    /// Bus address requests for this message go to.
    pub fn destination(&self) -> u8 {
        self.device.address()
    }

    /// Length on the wire: header, payload, CRC and break.
    pub fn wire_len(&self) -> usize {
        self.payload_len as usize + FRAME_OVERHEAD
    }

    /// Find a field by name, ignoring ASCII case.
    pub fn field_by_name(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

/// Logical id of every catalogued message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    RcDatetime,
    UbaWorkingTime,
    UbaMonitorFast,
    UbaMonitorSlow,
    UbaParameterDhw,
    UbaMonitorDhw,
    FlagsDhw,
    WorkingModeDhw,
    ProgramDhw,
    ProgramPumpDhw,
    WorkingModeHc1,
    MonitorHc1,
    Program1Hc1,
    Program2Hc1,
    WorkingModeHc2,
    MonitorHc2,
    Program1Hc2,
    Program2Hc2,
    WorkingModeHc3,
    MonitorHc3,
    Program1Hc3,
    Program2Hc3,
    WorkingModeHc4,
    MonitorHc4,
    Program1Hc4,
    Program2Hc4,
    MonitorMm10,
}

/// Position of the first heating circuit message in [`MessageId`] order.
const FIRST_HC_MESSAGE: usize = MessageId::WorkingModeHc1 as usize;

/// Messages per heating circuit.
const HC_MESSAGES: usize = 4;

impl MessageId {
    /// Descriptor of this message.
    pub fn descriptor(self) -> &'static MessageDescriptor {
        &CATALOG[self as usize]
    }

    fn for_circuit(hc: HeatingCircuit, slot: usize) -> MessageId {
        CATALOG[FIRST_HC_MESSAGE + hc.index() * HC_MESSAGES + slot].id
    }

    pub fn working_mode_hc(hc: HeatingCircuit) -> MessageId {
        Self::for_circuit(hc, 0)
    }

    pub fn monitor_hc(hc: HeatingCircuit) -> MessageId {
        Self::for_circuit(hc, 1)
    }

    pub fn program_1_hc(hc: HeatingCircuit) -> MessageId {
        Self::for_circuit(hc, 2)
    }

    pub fn program_2_hc(hc: HeatingCircuit) -> MessageId {
        Self::for_circuit(hc, 3)
    }
}

/// All catalogued messages, in [`MessageId`] order.
pub fn messages() -> &'static [MessageDescriptor] {
    &CATALOG
}

/// Descriptor of a message.
pub fn message(id: MessageId) -> &'static MessageDescriptor {
    id.descriptor()
}

/// Find a message by name, ignoring ASCII case.
pub fn message_by_name(name: &str) -> Option<&'static MessageDescriptor> {
    CATALOG.iter().find(|m| m.name.eq_ignore_ascii_case(name))
}

// ---------------------------------------------------------------------------
// Field tables
// ---------------------------------------------------------------------------

static RC_DATETIME_FIELDS: [FieldDescriptor; 6] = [
    FieldDescriptor::byte("Year", Unit::None, 4),
    FieldDescriptor::byte("Month", Unit::None, 5),
    FieldDescriptor::byte("Day", Unit::None, 7),
    FieldDescriptor::byte("Hour", Unit::None, 6),
    FieldDescriptor::byte("Minute", Unit::None, 8),
    FieldDescriptor::byte("Second", Unit::None, 9),
];

static UBA_WORKING_TIME_FIELDS: [FieldDescriptor; 1] =
    [FieldDescriptor::ulong("UBAWorkMin", Unit::Minutes, 4)];

static UBA_MONITOR_FAST_FIELDS: [FieldDescriptor; 16] = [
    FieldDescriptor::byte("SelImpTemp", Unit::Celsius, 4),
    FieldDescriptor::scaled("CurImpTemp", Unit::Celsius, 5, 2, 10),
    FieldDescriptor::byte("SelBurnPow", Unit::Percent, 7),
    FieldDescriptor::byte("CurBurnPow", Unit::Percent, 8),
    FieldDescriptor::bit("BurnGas", 11, 0),
    FieldDescriptor::bit("FanWork", 11, 2),
    FieldDescriptor::bit("IgnWork", 11, 3),
    FieldDescriptor::bit("HeatPmp", 11, 5),
    FieldDescriptor::bit("Way3ValveDHW", 11, 6),
    FieldDescriptor::bit("CircDHW", 11, 7),
    FieldDescriptor::scaled("RetTemp", Unit::Celsius, 17, 2, 10),
    FieldDescriptor::scaled("FlameCurr", Unit::MilliAmpere, 19, 2, 10),
    FieldDescriptor::scaled("SysPress", Unit::Bar, 21, 1, 10),
    FieldDescriptor::byte("SrvCode1", Unit::None, 22),
    FieldDescriptor::byte("SrvCode2", Unit::None, 23),
    FieldDescriptor::scaled("ErrCode", Unit::None, 24, 2, 1),
];

static UBA_MONITOR_SLOW_FIELDS: [FieldDescriptor; 6] = [
    FieldDescriptor::scaled("ExtTemp", Unit::Celsius, 4, 2, 10),
    FieldDescriptor::scaled("BoilTemp", Unit::Celsius, 6, 2, 10),
    FieldDescriptor::byte("PumpMod", Unit::Percent, 13),
    FieldDescriptor::ulong("BurnStarts", Unit::Times, 14),
    FieldDescriptor::ulong("BurnWorkMin", Unit::Minutes, 17),
    FieldDescriptor::ulong("BurnWorkMinH", Unit::Minutes, 23),
];

static UBA_PARAMETER_DHW_FIELDS: [FieldDescriptor; 2] = [
    FieldDescriptor::byte("SelTempDHW", Unit::Celsius, 6),
    FieldDescriptor::byte("SelTempTDDHW", Unit::Celsius, 12),
];

static UBA_MONITOR_DHW_FIELDS: [FieldDescriptor; 7] = [
    FieldDescriptor::scaled("CurTempDHW", Unit::Celsius, 5, 2, 10),
    FieldDescriptor::bit("DayModeDHW", 9, 0),
    FieldDescriptor::bit("OneTimeDHW", 9, 1),
    FieldDescriptor::bit("DesDHW", 9, 2),
    FieldDescriptor::bit("PrepareDHW", 9, 3),
    FieldDescriptor::ulong("BurnWorkMinDHW", Unit::Minutes, 14),
    FieldDescriptor::ulong("BurnStartsDHW", Unit::Times, 17),
];

static FLAGS_DHW_FIELDS: [FieldDescriptor; 1] =
    [FieldDescriptor::byte("OneTimeDHW", Unit::None, 4)];

static WORKING_MODE_DHW_FIELDS: [FieldDescriptor; 7] = [
    FieldDescriptor::byte("ProgDHW", Unit::None, 4),
    FieldDescriptor::byte("ProgPumpDHW", Unit::None, 5),
    FieldDescriptor::byte("WorkModeDHW", Unit::None, 6),
    FieldDescriptor::byte("WorkModePumpDHW", Unit::None, 7),
    FieldDescriptor::byte("WorkModeTDDHW", Unit::YesNo, 8),
    FieldDescriptor::byte("DayTDDHW", Unit::None, 9),
    FieldDescriptor::byte("HourTDDHW", Unit::None, 10),
];

static WORKING_MODE_HC_FIELDS: [FieldDescriptor; 9] = [
    FieldDescriptor::scaled("SelNightTempHC", Unit::Celsius, 5, 1, 2),
    FieldDescriptor::scaled("SelDayTempHC", Unit::Celsius, 6, 1, 2),
    FieldDescriptor::scaled("SelHoliTempHC", Unit::Celsius, 7, 1, 2),
    FieldDescriptor::scaled("RoomTempInfHC", Unit::Celsius, 8, 1, 2),
    FieldDescriptor::scaled("RoomTempOffHC", Unit::Celsius, 10, 1, 2),
    FieldDescriptor::byte("WorkModeHC", Unit::None, 11),
    FieldDescriptor::byte("SWThresTempHC", Unit::Celsius, 26),
    FieldDescriptor::byte("NightSetbackHC", Unit::None, 29),
    FieldDescriptor::scaled("NightOutTempHC", Unit::Celsius, 43, 1, 1),
];

static MONITOR_HC_FIELDS: [FieldDescriptor; 5] = [
    FieldDescriptor::bit("HoliModHC", 4, 5),
    FieldDescriptor::bit("SummerModHC", 5, 0),
    FieldDescriptor::bit("DayModHC", 5, 1),
    FieldDescriptor::bit("PauseModHC", 5, 7),
    FieldDescriptor::scaled("SelRoomTempHC", Unit::Celsius, 6, 1, 2),
];

/// Byte fields stored after the switch points of a full program.
const PROGRAM_SETTINGS: [FieldDescriptor; 15] = [
    FieldDescriptor::byte("ProgramName", Unit::None, 88),
    FieldDescriptor::byte("PauseTime", Unit::None, 89),
    FieldDescriptor::byte("PartyTime", Unit::None, 90),
    FieldDescriptor::byte("StartHoliDay", Unit::None, 91),
    FieldDescriptor::byte("StartHoliMonth", Unit::None, 92),
    FieldDescriptor::byte("StartHoliYear", Unit::None, 93),
    FieldDescriptor::byte("EndHoliDay", Unit::None, 94),
    FieldDescriptor::byte("EndHoliMonth", Unit::None, 95),
    FieldDescriptor::byte("EndHoliYear", Unit::None, 96),
    FieldDescriptor::byte("StartHHolDay", Unit::None, 97),
    FieldDescriptor::byte("StartHHoliMonth", Unit::None, 98),
    FieldDescriptor::byte("StartHHoliYear", Unit::None, 99),
    FieldDescriptor::byte("EndHHoliDay", Unit::None, 100),
    FieldDescriptor::byte("EndHHoliMonth", Unit::None, 101),
    FieldDescriptor::byte("EndHHoliYear", Unit::None, 102),
];

const PROGRAM_FIELD_COUNT: usize = SWITCH_POINTS + PROGRAM_SETTINGS.len();

const fn switch_points<const N: usize>() -> [FieldDescriptor; N] {
    let mut fields = [FieldDescriptor::switch_point(4); N];
    let mut i = 0;
    while i < SWITCH_POINTS && i < N {
        fields[i] = FieldDescriptor::switch_point(4 + 2 * i as u8);
        i += 1;
    }
    fields
}

const fn full_program() -> [FieldDescriptor; PROGRAM_FIELD_COUNT] {
    let mut fields = switch_points::<PROGRAM_FIELD_COUNT>();
    let mut i = 0;
    while i < PROGRAM_SETTINGS.len() {
        fields[SWITCH_POINTS + i] = PROGRAM_SETTINGS[i];
        i += 1;
    }
    fields
}

static PROGRAM_FIELDS: [FieldDescriptor; PROGRAM_FIELD_COUNT] = full_program();

static PROGRAM_2_FIELDS: [FieldDescriptor; SWITCH_POINTS] = switch_points::<SWITCH_POINTS>();

static MONITOR_MM10_FIELDS: [FieldDescriptor; 3] = [
    FieldDescriptor::byte("SelImpTempMM10", Unit::Celsius, 4),
    FieldDescriptor::scaled("CurImpTempMM10", Unit::Celsius, 5, 2, 10),
    FieldDescriptor::byte("ModMM10", Unit::Percent, 7),
];

// ---------------------------------------------------------------------------
// Message table
// ---------------------------------------------------------------------------

use MessageId as M;

static CATALOG: [MessageDescriptor; 27] = [
    MessageDescriptor::new(M::RcDatetime, "RCDatetime", Device::Rc35, 0x06, 8, &RC_DATETIME_FIELDS),
    MessageDescriptor::new(M::UbaWorkingTime, "UBAWorkingTime", Device::Uba, 0x14, 3, &UBA_WORKING_TIME_FIELDS),
    MessageDescriptor::new(M::UbaMonitorFast, "UBAMonitorFast", Device::Uba, 0x18, 27, &UBA_MONITOR_FAST_FIELDS),
    MessageDescriptor::new(M::UbaMonitorSlow, "UBAMonitorSlow", Device::Uba, 0x19, 25, &UBA_MONITOR_SLOW_FIELDS),
    MessageDescriptor::new(M::UbaParameterDhw, "UBAParameterDHW", Device::Uba, 0x33, 11, &UBA_PARAMETER_DHW_FIELDS),
    MessageDescriptor::new(M::UbaMonitorDhw, "UBAMonitorDHW", Device::Uba, 0x34, 16, &UBA_MONITOR_DHW_FIELDS),
    MessageDescriptor::new(M::FlagsDhw, "FlagsDHW", Device::Uba, 0x35, 1, &FLAGS_DHW_FIELDS),
    MessageDescriptor::new(M::WorkingModeDhw, "WorkingModeDHW", Device::Rc35, 0x37, 10, &WORKING_MODE_DHW_FIELDS),
    MessageDescriptor::new(M::ProgramDhw, "ProgramDHW", Device::Rc35, 0x38, 99, &PROGRAM_FIELDS),
    MessageDescriptor::new(M::ProgramPumpDhw, "ProgramPumpDHW", Device::Rc35, 0x39, 99, &PROGRAM_FIELDS),
    MessageDescriptor::new(M::WorkingModeHc1, "WorkingModeHC1", Device::Rc35, 0x3D, 42, &WORKING_MODE_HC_FIELDS),
    MessageDescriptor::new(M::MonitorHc1, "MonitorHC1", Device::Rc35, 0x3E, 16, &MONITOR_HC_FIELDS),
    MessageDescriptor::new(M::Program1Hc1, "Program1HC1", Device::Rc35, 0x3F, 99, &PROGRAM_FIELDS),
    MessageDescriptor::new(M::Program2Hc1, "Program2HC1", Device::Rc35, 0x42, 84, &PROGRAM_2_FIELDS),
    MessageDescriptor::new(M::WorkingModeHc2, "WorkingModeHC2", Device::Rc35, 0x47, 42, &WORKING_MODE_HC_FIELDS),
    MessageDescriptor::new(M::MonitorHc2, "MonitorHC2", Device::Rc35, 0x48, 16, &MONITOR_HC_FIELDS),
    MessageDescriptor::new(M::Program1Hc2, "Program1HC2", Device::Rc35, 0x49, 99, &PROGRAM_FIELDS),
    MessageDescriptor::new(M::Program2Hc2, "Program2HC2", Device::Rc35, 0x4C, 84, &PROGRAM_2_FIELDS),
    MessageDescriptor::new(M::WorkingModeHc3, "WorkingModeHC3", Device::Rc35, 0x51, 42, &WORKING_MODE_HC_FIELDS),
    MessageDescriptor::new(M::MonitorHc3, "MonitorHC3", Device::Rc35, 0x52, 16, &MONITOR_HC_FIELDS),
    MessageDescriptor::new(M::Program1Hc3, "Program1HC3", Device::Rc35, 0x53, 99, &PROGRAM_FIELDS),
    MessageDescriptor::new(M::Program2Hc3, "Program2HC3", Device::Rc35, 0x56, 84, &PROGRAM_2_FIELDS),
    MessageDescriptor::new(M::WorkingModeHc4, "WorkingModeHC4", Device::Rc35, 0x5B, 42, &WORKING_MODE_HC_FIELDS),
    MessageDescriptor::new(M::MonitorHc4, "MonitorHC4", Device::Rc35, 0x5C, 16, &MONITOR_HC_FIELDS),
    MessageDescriptor::new(M::Program1Hc4, "Program1HC4", Device::Rc35, 0x5D, 99, &PROGRAM_FIELDS),
    MessageDescriptor::new(M::Program2Hc4, "Program2HC4", Device::Rc35, 0x60, 84, &PROGRAM_2_FIELDS),
    MessageDescriptor::new(M::MonitorMm10, "MonitorMM10", Device::Mm10, 0xAB, 8, &MONITOR_MM10_FIELDS),
];

// ---------------------------------------------------------------------------
// Single-field requests
// ---------------------------------------------------------------------------

/// A single addressable value.
///
/// Circuit-scoped values carry the [`HeatingCircuit`] they belong to;
/// holiday and program settings live in the circuit's first program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    // RCDatetime
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    // UBAWorkingTime
    UbaWorkMinutes,
    // UBAMonitorFast
    SelImpTemp,
    CurImpTemp,
    SelBurnPow,
    CurBurnPow,
    BurnGas,
    FanWork,
    IgnWork,
    HeatPump,
    ThreeWayValveDhw,
    CircDhw,
    RetTemp,
    FlameCurr,
    SysPress,
    SrvCode1,
    SrvCode2,
    ErrCode,
    // UBAMonitorSlow
    ExtTemp,
    BoilTemp,
    PumpMod,
    BurnStarts,
    BurnWorkMin,
    BurnWorkMinH,
    // UBAParameterDHW
    SelTempDhw,
    SelTempTdDhw,
    // UBAMonitorDHW
    CurTempDhw,
    DayModeDhw,
    OneTimeDhw,
    DesDhw,
    PrepareDhw,
    BurnWorkMinDhw,
    BurnStartsDhw,
    // FlagsDHW
    OneTimeDhwFlags,
    // WorkingModeDHW
    ProgDhw,
    ProgPumpDhw,
    WorkModeDhw,
    WorkModePumpDhw,
    WorkModeTdDhw,
    DayTdDhw,
    HourTdDhw,
    // WorkingModeHCn
    SelNightTempHc(HeatingCircuit),
    SelDayTempHc(HeatingCircuit),
    SelHoliTempHc(HeatingCircuit),
    RoomTempInfHc(HeatingCircuit),
    RoomTempOffHc(HeatingCircuit),
    WorkModeHc(HeatingCircuit),
    SwThresTempHc(HeatingCircuit),
    NightSetbackHc(HeatingCircuit),
    NightOutTempHc(HeatingCircuit),
    // MonitorHCn
    HoliModHc(HeatingCircuit),
    SummerModHc(HeatingCircuit),
    DayModHc(HeatingCircuit),
    PauseModHc(HeatingCircuit),
    SelRoomTempHc(HeatingCircuit),
    // Program1HCn
    ProgramNameHc(HeatingCircuit),
    PauseTimeHc(HeatingCircuit),
    PartyTimeHc(HeatingCircuit),
    StartHolidayDayHc(HeatingCircuit),
    StartHolidayMonthHc(HeatingCircuit),
    StartHolidayYearHc(HeatingCircuit),
    EndHolidayDayHc(HeatingCircuit),
    EndHolidayMonthHc(HeatingCircuit),
    EndHolidayYearHc(HeatingCircuit),
    StartHomeHolidayDayHc(HeatingCircuit),
    StartHomeHolidayMonthHc(HeatingCircuit),
    StartHomeHolidayYearHc(HeatingCircuit),
    EndHomeHolidayDayHc(HeatingCircuit),
    EndHomeHolidayMonthHc(HeatingCircuit),
    EndHomeHolidayYearHc(HeatingCircuit),
    // MonitorMM10
    SelImpTempMm10,
    CurImpTempMm10,
    ModMm10,
}

impl Field {
    /// The message carrying this value and the index of its descriptor.
    fn location(self) -> (MessageId, usize) {
        use Field::*;

        let program = |hc: HeatingCircuit, i: usize| (MessageId::program_1_hc(hc), SWITCH_POINTS + i);

        match self {
            Year => (M::RcDatetime, 0),
            Month => (M::RcDatetime, 1),
            Day => (M::RcDatetime, 2),
            Hour => (M::RcDatetime, 3),
            Minute => (M::RcDatetime, 4),
            Second => (M::RcDatetime, 5),

            UbaWorkMinutes => (M::UbaWorkingTime, 0),

            SelImpTemp => (M::UbaMonitorFast, 0),
            CurImpTemp => (M::UbaMonitorFast, 1),
            SelBurnPow => (M::UbaMonitorFast, 2),
            CurBurnPow => (M::UbaMonitorFast, 3),
            BurnGas => (M::UbaMonitorFast, 4),
            FanWork => (M::UbaMonitorFast, 5),
            IgnWork => (M::UbaMonitorFast, 6),
            HeatPump => (M::UbaMonitorFast, 7),
            ThreeWayValveDhw => (M::UbaMonitorFast, 8),
            CircDhw => (M::UbaMonitorFast, 9),
            RetTemp => (M::UbaMonitorFast, 10),
            FlameCurr => (M::UbaMonitorFast, 11),
            SysPress => (M::UbaMonitorFast, 12),
            SrvCode1 => (M::UbaMonitorFast, 13),
            SrvCode2 => (M::UbaMonitorFast, 14),
            ErrCode => (M::UbaMonitorFast, 15),

            ExtTemp => (M::UbaMonitorSlow, 0),
            BoilTemp => (M::UbaMonitorSlow, 1),
            PumpMod => (M::UbaMonitorSlow, 2),
            BurnStarts => (M::UbaMonitorSlow, 3),
            BurnWorkMin => (M::UbaMonitorSlow, 4),
            BurnWorkMinH => (M::UbaMonitorSlow, 5),

            SelTempDhw => (M::UbaParameterDhw, 0),
            SelTempTdDhw => (M::UbaParameterDhw, 1),

            CurTempDhw => (M::UbaMonitorDhw, 0),
            DayModeDhw => (M::UbaMonitorDhw, 1),
            OneTimeDhw => (M::UbaMonitorDhw, 2),
            DesDhw => (M::UbaMonitorDhw, 3),
            PrepareDhw => (M::UbaMonitorDhw, 4),
            BurnWorkMinDhw => (M::UbaMonitorDhw, 5),
            BurnStartsDhw => (M::UbaMonitorDhw, 6),

            OneTimeDhwFlags => (M::FlagsDhw, 0),

            ProgDhw => (M::WorkingModeDhw, 0),
            ProgPumpDhw => (M::WorkingModeDhw, 1),
            WorkModeDhw => (M::WorkingModeDhw, 2),
            WorkModePumpDhw => (M::WorkingModeDhw, 3),
            WorkModeTdDhw => (M::WorkingModeDhw, 4),
            DayTdDhw => (M::WorkingModeDhw, 5),
            HourTdDhw => (M::WorkingModeDhw, 6),

            SelNightTempHc(hc) => (MessageId::working_mode_hc(hc), 0),
            SelDayTempHc(hc) => (MessageId::working_mode_hc(hc), 1),
            SelHoliTempHc(hc) => (MessageId::working_mode_hc(hc), 2),
            RoomTempInfHc(hc) => (MessageId::working_mode_hc(hc), 3),
            RoomTempOffHc(hc) => (MessageId::working_mode_hc(hc), 4),
            WorkModeHc(hc) => (MessageId::working_mode_hc(hc), 5),
            SwThresTempHc(hc) => (MessageId::working_mode_hc(hc), 6),
            NightSetbackHc(hc) => (MessageId::working_mode_hc(hc), 7),
            NightOutTempHc(hc) => (MessageId::working_mode_hc(hc), 8),

            HoliModHc(hc) => (MessageId::monitor_hc(hc), 0),
            SummerModHc(hc) => (MessageId::monitor_hc(hc), 1),
            DayModHc(hc) => (MessageId::monitor_hc(hc), 2),
            PauseModHc(hc) => (MessageId::monitor_hc(hc), 3),
            SelRoomTempHc(hc) => (MessageId::monitor_hc(hc), 4),

            ProgramNameHc(hc) => program(hc, 0),
            PauseTimeHc(hc) => program(hc, 1),
            PartyTimeHc(hc) => program(hc, 2),
            StartHolidayDayHc(hc) => program(hc, 3),
            StartHolidayMonthHc(hc) => program(hc, 4),
            StartHolidayYearHc(hc) => program(hc, 5),
            EndHolidayDayHc(hc) => program(hc, 6),
            EndHolidayMonthHc(hc) => program(hc, 7),
            EndHolidayYearHc(hc) => program(hc, 8),
            StartHomeHolidayDayHc(hc) => program(hc, 9),
            StartHomeHolidayMonthHc(hc) => program(hc, 10),
            StartHomeHolidayYearHc(hc) => program(hc, 11),
            EndHomeHolidayDayHc(hc) => program(hc, 12),
            EndHomeHolidayMonthHc(hc) => program(hc, 13),
            EndHomeHolidayYearHc(hc) => program(hc, 14),

            SelImpTempMm10 => (M::MonitorMm10, 0),
            CurImpTempMm10 => (M::MonitorMm10, 1),
            ModMm10 => (M::MonitorMm10, 2),
        }
    }

    /// Resolve to the message and field descriptors.
    pub fn resolve(self) -> (&'static MessageDescriptor, &'static FieldDescriptor) {
        let (id, index) = self.location();
        let message = id.descriptor();
        (message, &message.fields[index])
    }

    /// Field name as printed in diagnostics.
    pub fn name(self) -> &'static str {
        self.resolve().1.name
    }
}

// ---------------------------------------------------------------------------
// Switching programs
// ---------------------------------------------------------------------------

/// Which of a circuit's two weekly programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramSlot {
    First,
    Second,
}

/// A weekly switching program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchProgram {
    /// Hot water program.
    Dhw,
    /// Hot water circulation pump program.
    PumpDhw,
    /// One of a heating circuit's programs.
    Heating(HeatingCircuit, ProgramSlot),
}

impl SwitchProgram {
    pub fn message_id(self) -> MessageId {
        match self {
            SwitchProgram::Dhw => MessageId::ProgramDhw,
            SwitchProgram::PumpDhw => MessageId::ProgramPumpDhw,
            SwitchProgram::Heating(hc, ProgramSlot::First) => MessageId::program_1_hc(hc),
            SwitchProgram::Heating(hc, ProgramSlot::Second) => MessageId::program_2_hc(hc),
        }
    }

    /// Heating circuit the program belongs to, if any.
    pub fn circuit(self) -> Option<HeatingCircuit> {
        match self {
            SwitchProgram::Heating(hc, _) => Some(hc),
            _ => None,
        }
    }

    /// Descriptor of switch point `index`, if it exists.
    pub fn switch_point(self, index: usize) -> Option<(&'static MessageDescriptor, &'static FieldDescriptor)> {
        if index >= SWITCH_POINTS {
            return None;
        }
        let message = self.message_id().descriptor();
        Some((message, &message.fields[index]))
    }
}

// ---------------------------------------------------------------------------
// Decoded messages
// ---------------------------------------------------------------------------

/// A whole message read off the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub message: &'static MessageDescriptor,
    /// Frame-sized buffer; payload starts at offset 4.
    pub buffer: Vec<u8>,
}

impl Datagram {
    /// Every field of the message with its decoded value, in table order.
    pub fn values(&self) -> impl Iterator<Item = (&'static FieldDescriptor, Value)> + '_ {
        self.message.fields.iter().map(|f| (f, f.decode(&self.buffer)))
    }

    /// Decoded value of the field called `name`.
    pub fn value(&self, name: &str) -> Option<Value> {
        self.message
            .field_by_name(name)
            .map(|f| f.decode(&self.buffer))
    }

    /// The payload bytes.
    pub fn payload(&self) -> &[u8] {
        let start = crate::frame::HEADER_LEN;
        &self.buffer[start..start + self.message.payload_len as usize]
    }
}
