// Device number of the DTE on the 10-side I/O bus
pub const DTE_DEVNUM: u32 = 0o200;

// Interrupt vector handed to the KL for this device
pub const IRQ_VECTOR: u32 = 0o142;

// 36-bit word masks
pub const FMASK: u64 = 0o777777777777;
pub const SMASK: u64 = 0o400000000000;
pub const RMASK: u64 = 0o777777;
pub const RSIGN: u64 = 0o400000;

// Ring capacities (one slot always kept empty)
pub const CHANNEL_SIZE: usize = 256;
pub const PACKET_QUEUE_SIZE: usize = 32;
pub const PACKET_WORDS: usize = 256;

// Terminal multiplexer limits
pub const MAX_LINES: usize = 64;

// Console keyboard bytes gathered into one line-character packet
pub const INPUT_BATCH: usize = 32;

pub mod cono {
    // CONO bits written by the 10-side
    pub const RING_ELEVEN: u32 = 0o020000; // Set TO11 doorbell
    pub const CLEAR_RELOAD: u32 = 0o010000; // Clear reload-11 button
    pub const SET_RELOAD: u32 = 0o004000; // Set reload-11 button
    pub const CLEAR_TEN_DOORBELL: u32 = 0o001000; // Clear TO10 doorbell
    pub const CLEAR_ELEVEN_DONE: u32 = 0o000100; // Clear TO11 done and error
    pub const CLEAR_TEN_DONE: u32 = 0o000040; // Clear TO10 done and error
    pub const LOAD_PI: u32 = 0o000020; // Load PI channel and enable bit
}

pub mod datao {
    pub const INTERRUPT_AFTER: u32 = 0o010000; // Interrupt after transfer
    pub const BYTE_COUNT: u32 = 0o007777; // Negative byte count
}

pub mod delays {
    // Ticks between a register access and the engine noticing it
    pub const DOORBELL: u64 = 200;
    pub const DATAO: u64 = 10;

    // Retry intervals for the backpressure idiom
    pub const OUTPUT_FULL: u64 = 1000;
    pub const INPUT_EMPTY: u64 = 100;
    pub const INBOUND_FULL: u64 = 100;
    pub const PRINTER: u64 = 1000;

    // First activation of the poll and clock units after reset
    pub const STARTUP: u64 = 100;
}

pub mod secondary {
    // Fixed secondary protocol cells, relative to the executive base
    pub const DTFLG: u32 = 0o444; // Operation complete flag
    pub const DTCLK: u32 = 0o445; // Clock interrupt flag
    pub const DTCI: u32 = 0o446; // Clock interrupt instruction
    pub const DTT11: u32 = 0o447; // 10 to 11 argument
    pub const DTF11: u32 = 0o450; // 10 from 11 argument
    pub const DTCMD: u32 = 0o451; // To 11 command word
    pub const DTSEQ: u32 = 0o452; // Operation sequence number
    pub const DTOPR: u32 = 0o453; // Operational DTE number
    pub const DTCHR: u32 = 0o454; // Last typed character
    pub const DTMTD: u32 = 0o455; // Monitor TTY output complete flag
    pub const DTMTI: u32 = 0o456; // Monitor TTY input flag
    pub const DTSWR: u32 = 0o457; // 10 switch register
}

pub mod primary {
    // Communication region word offsets
    pub const CMTW_PPT: u32 = 1; // Pointer to communication region
    pub const CMTW_STS: u32 = 2; // Status word
    pub const CMTW_CNT: u32 = 3; // Queue count
    pub const CMTW_KAC: u32 = 5; // Keepalive count

    // EPT cell holding the communication region pointer
    pub const EPT_COMM_POINTER: u32 = 0o145;

    // Status word bits
    pub const STS_POWER_FAIL: u64 = super::SMASK;
    pub const STS_LOAD_ELEVEN: u64 = 0o200000000000;
    pub const STS_INIT: u64 = 0o100000000000;
    pub const STS_VALID_EXAMINE: u64 = 0o040000000000;
    pub const STS_QUEUED: u64 = 0o020000000;
    pub const STS_FULL_WORD: u64 = 0o001000000;
    pub const STS_INDIRECT: u64 = super::RSIGN;
    pub const STS_TRANSFER_OUT: u64 = 0o200000;
    pub const STS_TEN_COUNT: u64 = 0o177400;
    pub const STS_ELEVEN_COUNT: u64 = 0o000377;

    // Fixed offsets of the deposit and examine regions
    pub const TO_TEN_DEPOSIT: u32 = 16;
    pub const TO_TEN_EXAMINE: u32 = TO_TEN_DEPOSIT + 16;
}

pub mod its {
    // ITS timesharing protocol cells (absolute)
    pub const DTEVER: u32 = 0o400; // Protocol version and device count
    pub const DTECHK: u32 = 0o401; // Heartbeat, pinned at -1 by the 10
    pub const DTEINP: u32 = 0o402; // Input from 10 to 11 (line, count)
    pub const DTEOUT: u32 = 0o403; // Output from 10 to 11 (line, count)
    pub const DTELSP: u32 = 0o404; // Line to set speed of
    pub const DTELPR: u32 = 0o405; // Line speed parameter
    pub const DTEOST: u32 = 0o406; // Line to start output on
    pub const DTETYI: u32 = 0o410; // Received character (line, char)
    pub const DTEODN: u32 = 0o411; // Output done (line, buffer size)
    pub const DTEHNG: u32 = 0o412; // Hangup/dialup

    // Heartbeat ticks without a reset before ITS is declared dead (15 s at 60 Hz)
    pub const HEARTBEAT_LIMIT: u64 = 15 * 60;
}
