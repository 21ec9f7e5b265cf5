use crate::constants::MAX_LINES;

/// What to do when an indirect continuation arrives that nobody asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesyncPolicy {
    /// Log the desynchronization and leave the link as it is
    Abandon,
    /// Log it and drop back to the secondary protocol
    FallBackToSecondary,
}

/// Static configuration of one DTE link
#[derive(Debug, Clone, Copy)]
pub struct LinkConfig {
    pub tty_lines: usize,           // Terminal multiplexer lines in service
    pub its_paging: bool,           // 10-side runs the ITS pager, fast path may engage
    pub exec_base: u32,             // Relocation of the fixed secondary cells
    pub poll_interval: u64,         // Ticks between poll unit activations
    pub clock_interval: u64,        // Ticks between clock unit activations
    pub desync_policy: DesyncPolicy,
}

impl LinkConfig {
    /// Clamps values that would break the engine's fixed-size state
    pub fn sanitized(mut self) -> Self {
        self.tty_lines = self.tty_lines.min(MAX_LINES);
        self.poll_interval = self.poll_interval.max(1);
        self.clock_interval = self.clock_interval.max(1);
        self
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            tty_lines: 16,
            its_paging: false,
            exec_base: 0,
            poll_interval: 1000,
            clock_interval: 16_667, // 60 Hz at one tick per microsecond
            desync_policy: DesyncPolicy::Abandon,
        }
    }
}
