use crate::constants::MAX_LINES;
use crate::ring::Channel;
use heapless::Vec;
use log::debug;

/// State of one terminal multiplexer line
#[derive(Default)]
pub struct Line {
    pub output: Channel,       // Bytes for the line, drained by the host
    pub connected: bool,       // A terminal is attached
    pub receive_enabled: bool, // Cleared by XOFF, set by XON
}

/// Terminal multiplexer as seen by the front end
pub struct Lines {
    lines: Vec<Line, MAX_LINES>,
    pub enabled: bool,  // Multiplexer enabled by the 10-side
    pub done: Channel, // Output completion records (line number + 1, zero for console)
}

impl Lines {
    pub fn new(count: usize) -> Self {
        let mut lines = Vec::new();
        for _ in 0..count.min(MAX_LINES) {
            // Count is clamped to the capacity
            let _ = lines.push(Line {
                receive_enabled: true,
                ..Line::default()
            });
        }
        Self {
            lines,
            enabled: false,
            done: Channel::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.lines.len()
    }

    pub fn get(&self, line: usize) -> Option<&Line> {
        self.lines.get(line)
    }

    pub fn get_mut(&mut self, line: usize) -> Option<&mut Line> {
        self.lines.get_mut(line)
    }

    /// Marks a terminal attached to `line`
    pub fn connect(&mut self, line: usize) -> bool {
        match self.lines.get_mut(line) {
            Some(state) => {
                state.connected = true;
                debug!("TTY line connect {}", line);
                true
            }
            None => false,
        }
    }

    /// Drops queued output and the connection of `line`
    pub fn hang_up(&mut self, line: usize) {
        if let Some(state) = self.lines.get_mut(line) {
            state.output.clear();
            state.connected = false;
        }
    }
}
