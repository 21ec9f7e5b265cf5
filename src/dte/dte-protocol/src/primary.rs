// Primary (queued) protocol function and device codes

/// Set in a function code when the payload follows as an indirect transfer
pub const INDIRECT: u16 = 0o100000;

/// Header bytes preceding the payload of every frame (count, function, device, spare)
pub const HEADER_BYTES: u16 = 8;

/// Function codes carried in the second header word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    InitialMessage,       // EM2EI: initial message to the 11
    InitialReply,         // EM2TI: reply to the initial message
    StringData,           // EMSTR
    LineCharacter,        // EMLNC
    RequestDeviceStatus,  // EMRDS
    DeviceStatus,         // EMHDS
    RequestDateTime,      // EMRDT
    DateTime,             // EMHDR
    FlushOutput,          // EMFLO
    SendAll,              // EMSNA
    DatasetConnect,       // EMDSC
    HangUpDataset,        // EMHUD
    AcknowledgeLine,      // EMACK
    Xoff,                 // EMXOF
    Xon,                  // EMXON
    LineSpeeds,           // EMHLS
    LineAllocation,       // EMHLA
    RebootInformation,    // EMRBI
    AcknowledgeAll,       // EMAKA
    DeviceOnOff,          // EMTDO
    EnableDisableLine,    // EMEDR
    LoadPrinterRam,       // EMLDR
    LoadPrinterVfu,       // EMLDV
    Unknown(u8),
}

impl Function {
    /// Decodes the low byte of a function word; the indirect flag is ignored
    pub fn from_code(code: u16) -> Function {
        match (code & 0o377) as u8 {
            0o01 => Function::InitialMessage,
            0o02 => Function::InitialReply,
            0o03 => Function::StringData,
            0o04 => Function::LineCharacter,
            0o05 => Function::RequestDeviceStatus,
            0o07 => Function::DeviceStatus,
            0o11 => Function::RequestDateTime,
            0o12 => Function::DateTime,
            0o13 => Function::FlushOutput,
            0o14 => Function::SendAll,
            0o15 => Function::DatasetConnect,
            0o16 => Function::HangUpDataset,
            0o17 => Function::AcknowledgeLine,
            0o20 => Function::Xoff,
            0o21 => Function::Xon,
            0o22 => Function::LineSpeeds,
            0o23 => Function::LineAllocation,
            0o24 => Function::RebootInformation,
            0o25 => Function::AcknowledgeAll,
            0o26 => Function::DeviceOnOff,
            0o27 => Function::EnableDisableLine,
            0o30 => Function::LoadPrinterRam,
            0o31 => Function::LoadPrinterVfu,
            other => Function::Unknown(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Function::InitialMessage => 0o01,
            Function::InitialReply => 0o02,
            Function::StringData => 0o03,
            Function::LineCharacter => 0o04,
            Function::RequestDeviceStatus => 0o05,
            Function::DeviceStatus => 0o07,
            Function::RequestDateTime => 0o11,
            Function::DateTime => 0o12,
            Function::FlushOutput => 0o13,
            Function::SendAll => 0o14,
            Function::DatasetConnect => 0o15,
            Function::HangUpDataset => 0o16,
            Function::AcknowledgeLine => 0o17,
            Function::Xoff => 0o20,
            Function::Xon => 0o21,
            Function::LineSpeeds => 0o22,
            Function::LineAllocation => 0o23,
            Function::RebootInformation => 0o24,
            Function::AcknowledgeAll => 0o25,
            Function::DeviceOnOff => 0o26,
            Function::EnableDisableLine => 0o27,
            Function::LoadPrinterRam => 0o30,
            Function::LoadPrinterVfu => 0o31,
            Function::Unknown(code) => code as u16,
        }
    }
}

/// Device codes carried in the third header word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Console,        // EMCTY
    SerialLine,     // EMDL1: DL11
    Multiplexer,    // EMDH1: DH11 #1
    AllLines,       // EMDLS: every terminal line combined
    Printer,        // EMLPT
    CardReader,     // EMCDR
    Clock,          // EMCLK
    FrontEnd,       // EMFED
    Unknown(u8),
}

impl Device {
    pub fn from_code(code: u16) -> Device {
        match (code & 0o377) as u8 {
            0o01 => Device::Console,
            0o02 => Device::SerialLine,
            0o03 => Device::Multiplexer,
            0o04 => Device::AllLines,
            0o05 => Device::Printer,
            0o06 => Device::CardReader,
            0o07 => Device::Clock,
            0o10 => Device::FrontEnd,
            other => Device::Unknown(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Device::Console => 0o01,
            Device::SerialLine => 0o02,
            Device::Multiplexer => 0o03,
            Device::AllLines => 0o04,
            Device::Printer => 0o05,
            Device::CardReader => 0o06,
            Device::Clock => 0o07,
            Device::FrontEnd => 0o10,
            Device::Unknown(code) => code as u16,
        }
    }
}
