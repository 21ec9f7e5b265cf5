use core::fmt;
use core::str::FromStr;

// Control characters a printable-only terminal still passes: BEL, BS, HT, LF, CR
const PRINTABLE_CONTROLS: u32 = 0x0000_2780;

/// Character conversion applied between a terminal and the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtyMode {
    UpperCase,    // UC: 7 bits, lower case folded to upper
    SevenBit,     // 7B: 7 bits
    SevenPrint,   // 7P: 7 bits, non-printing characters suppressed on output
    EightBit,     // 8B: passed through
}

impl TtyMode {
    /// Converts a character typed on the host keyboard; `None` drops it
    pub fn input(self, ch: u8) -> Option<u8> {
        match self {
            TtyMode::EightBit => Some(ch),
            TtyMode::UpperCase => Some((ch & 0o177).to_ascii_uppercase()),
            TtyMode::SevenBit | TtyMode::SevenPrint => Some(ch & 0o177),
        }
    }

    /// Converts a character on its way to the host terminal; `None` suppresses it
    pub fn output(self, ch: u8) -> Option<u8> {
        match self {
            TtyMode::EightBit => Some(ch),
            TtyMode::SevenBit => Some(ch & 0o177),
            TtyMode::UpperCase => Some((ch & 0o177).to_ascii_uppercase()),
            TtyMode::SevenPrint => {
                let ch = ch & 0o177;
                let printable = (0o40..0o177).contains(&ch)
                    || (ch < 32 && PRINTABLE_CONTROLS & (1 << ch) != 0);
                if printable {
                    Some(ch)
                } else {
                    None
                }
            }
        }
    }
}

impl Default for TtyMode {
    fn default() -> Self {
        TtyMode::SevenBit
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError(String);

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown terminal mode {:?} (expected UC, 7B, 7P or 8B)", self.0)
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for TtyMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "UC" => Ok(TtyMode::UpperCase),
            "7B" => Ok(TtyMode::SevenBit),
            "7P" => Ok(TtyMode::SevenPrint),
            "8B" => Ok(TtyMode::EightBit),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}
