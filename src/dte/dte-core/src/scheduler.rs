use heapless::Vec;

/// Independently scheduled activities of the front end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Transfer, // Doorbell and TO10 transfer handling
    Poll,     // Dispatch, console input and queue kick
    Clock,    // Virtual clock tick service
    Printer,  // Printer drain cycle
}

const UNIT_COUNT: usize = 4;

impl Unit {
    pub const ALL: [Unit; UNIT_COUNT] = [Unit::Transfer, Unit::Poll, Unit::Clock, Unit::Printer];

    fn slot(self) -> usize {
        match self {
            Unit::Transfer => 0,
            Unit::Poll => 1,
            Unit::Clock => 2,
            Unit::Printer => 3,
        }
    }
}

/// Discrete-event virtual clock
///
/// A unit is either idle or due at one absolute tick. Activating a unit that is already
/// pending leaves its due time alone, so a retry never postpones work that is already queued.
pub struct Scheduler {
    now: u64,                      // Current virtual time in ticks
    due: [Option<u64>; UNIT_COUNT], // Absolute due tick per unit
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            now: 0,
            due: [None; UNIT_COUNT],
        }
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    /// Runs `unit` after `delay` ticks unless it is already pending
    pub fn activate(&mut self, unit: Unit, delay: u64) {
        let slot = &mut self.due[unit.slot()];
        if slot.is_none() {
            *slot = Some(self.now + delay.max(1));
        }
    }

    /// Runs `unit` after `delay` ticks, replacing any pending activation
    pub fn reactivate(&mut self, unit: Unit, delay: u64) {
        self.due[unit.slot()] = Some(self.now + delay.max(1));
    }

    pub fn cancel(&mut self, unit: Unit) {
        self.due[unit.slot()] = None;
    }

    pub fn is_active(&self, unit: Unit) -> bool {
        self.due[unit.slot()].is_some()
    }

    /// Ticks left before `unit` runs
    pub fn remaining(&self, unit: Unit) -> Option<u64> {
        self.due[unit.slot()].map(|due| due - self.now)
    }

    /// Earliest pending activation at or before `limit`
    pub fn next_due(&self, limit: u64) -> Option<u64> {
        self.due.iter().flatten().copied().filter(|&due| due <= limit).min()
    }

    /// Moves the clock to `time` and returns the units due then, clearing their activations
    pub fn expire(&mut self, time: u64) -> Vec<Unit, UNIT_COUNT> {
        self.now = time;
        let mut fired = Vec::new();
        for unit in Unit::ALL {
            let slot = &mut self.due[unit.slot()];
            if matches!(*slot, Some(due) if due <= time) {
                *slot = None;
                // Capacity matches the number of units
                let _ = fired.push(unit);
            }
        }
        fired
    }

    /// Moves the clock without firing anything
    pub fn advance_to(&mut self, time: u64) {
        self.now = self.now.max(time);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod scheduler_tests {
    use super::*;

    #[test]
    fn test_activate_keeps_earlier_due_time() {
        let mut sched = Scheduler::new();
        sched.activate(Unit::Transfer, 10);
        sched.activate(Unit::Transfer, 1000);
        assert_eq!(sched.remaining(Unit::Transfer), Some(10));
        sched.reactivate(Unit::Transfer, 1000);
        assert_eq!(sched.remaining(Unit::Transfer), Some(1000));
    }

    #[test]
    fn test_expire_fires_in_unit_order() {
        let mut sched = Scheduler::new();
        sched.activate(Unit::Printer, 5);
        sched.activate(Unit::Poll, 5);
        sched.activate(Unit::Clock, 7);
        assert_eq!(sched.next_due(100), Some(5));
        let fired = sched.expire(5);
        assert_eq!(fired.as_slice(), &[Unit::Poll, Unit::Printer]);
        assert!(!sched.is_active(Unit::Poll));
        assert_eq!(sched.remaining(Unit::Clock), Some(2));
        assert_eq!(sched.next_due(6), None);
    }
}
