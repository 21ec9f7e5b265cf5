// Secondary protocol command words (KLDCP bootstrap protocol)

const COMMAND_MASK: u64 = 0o7400;
const FULL_WORD: u64 = 0o777777777777;

/// Program control sub-commands, matched on the whole command word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramCommand {
    EndOfPass,  // 0o404
    Lookup,     // 0o406
    ReadWord,   // 0o407
    ReadByte,   // 0o414
    Esec,       // 0o440
    Epri,       // 0o500
    Ertm,       // 0o540
    Unknown(u64),
}

/// Clock control sub-commands, matched on the whole command word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockCommand {
    Off,   // 0o1000
    On,    // 0o1001
    Wait,  // 0o1002: wait the tick count found in the 10-to-11 argument
    Read,  // 0o1003
    Unknown(u64),
}

/// One decoded secondary protocol command word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryCommand {
    ProgramControl(ProgramCommand), // 0o400
    Clock(ClockCommand),            // 0o1000
    ReadSwitches,                   // 0o1400
    MonitorInputOff,                // 0o3000: clear DDT input mode
    ReadCharacter,                  // 0o3400: set DDT mode, read one character
    TypeOut(u8),                    // 0o4000: monitor mode character output
    MonitorInputOn,                 // 0o4400
    EnterPrimary,                   // 0o5000
    Unknown(u64),
}

impl SecondaryCommand {
    pub fn from_word(word: u64) -> SecondaryCommand {
        let word = word & FULL_WORD;
        match word & COMMAND_MASK {
            0o0400 => SecondaryCommand::ProgramControl(match word {
                0o404 => ProgramCommand::EndOfPass,
                0o406 => ProgramCommand::Lookup,
                0o407 => ProgramCommand::ReadWord,
                0o414 => ProgramCommand::ReadByte,
                0o440 => ProgramCommand::Esec,
                0o500 => ProgramCommand::Epri,
                0o540 => ProgramCommand::Ertm,
                other => ProgramCommand::Unknown(other),
            }),
            0o1000 => SecondaryCommand::Clock(match word {
                0o1000 => ClockCommand::Off,
                0o1001 => ClockCommand::On,
                0o1002 => ClockCommand::Wait,
                0o1003 => ClockCommand::Read,
                other => ClockCommand::Unknown(other),
            }),
            0o1400 => SecondaryCommand::ReadSwitches,
            0o3000 => SecondaryCommand::MonitorInputOff,
            0o3400 => SecondaryCommand::ReadCharacter,
            0o4000 => SecondaryCommand::TypeOut((word & 0o177) as u8),
            0o4400 => SecondaryCommand::MonitorInputOn,
            0o5000 => SecondaryCommand::EnterPrimary,
            _ => SecondaryCommand::Unknown(word),
        }
    }
}

/// Builds the command word that types one character in monitor mode
pub fn type_out(ch: u8) -> u64 {
    0o4000 | (ch as u64 & 0o177)
}
