//! Hierarchical timing wheel
//!
//! Level `l` has `slots` buckets, each spanning `slots^l` ticks. A timer sits
//! in the lowest level whose range covers its distance from the current tick;
//! when a higher-level bucket comes up, its timers cascade down. Levels are
//! added on demand, so arbitrarily far deadlines need no overflow list.
//!
//! The wheel is passive: the owner calls [`TimingWheel::advance`] with the
//! current time and gets back every item that came due.

use std::time::Duration;

use crate::clock::{self, Timestamp};

struct Timer<T> {
    /// Absolute deadline, in ticks since `origin`
    deadline: u64,
    item: T,
}

pub(crate) struct TimingWheel<T> {
    origin: Timestamp,
    tick_nanos: u64,
    slots: usize,
    /// Ticks processed since `origin`
    current: u64,
    levels: Vec<Vec<Vec<Timer<T>>>>,
    /// Items whose deadline had already passed when (re)placed
    due: Vec<T>,
    len: usize,
}

impl<T> TimingWheel<T> {
    pub(crate) fn new(origin: Timestamp, tick: Duration, slots: usize) -> Self {
        let slots = slots.max(2);
        Self {
            origin,
            tick_nanos: clock::nanos(tick).max(1),
            slots,
            current: 0,
            levels: vec![Self::empty_level(slots)],
            due: Vec::new(),
            len: 0,
        }
    }

    /// Fire `item` once `advance` is called with a time at or past `deadline`
    pub(crate) fn schedule(&mut self, deadline: Timestamp, item: T) {
        // Round up so a timer never fires before its deadline.
        let ticks = deadline.saturating_sub(self.origin).div_ceil(self.tick_nanos);
        self.len += 1;
        self.place(Timer {
            deadline: ticks,
            item,
        });
    }

    /// Move the wheel to `now`; returns every item that came due
    pub(crate) fn advance(&mut self, now: Timestamp) -> Vec<T> {
        let target = now.saturating_sub(self.origin) / self.tick_nanos;
        let mut expired = std::mem::take(&mut self.due);

        while self.current < target {
            self.current += 1;

            for level in (1..self.levels.len()).rev() {
                let width = self.width(level);
                if self.current % width == 0 {
                    let slot = ((self.current / width) % self.slots as u64) as usize;
                    let timers = std::mem::take(&mut self.levels[level][slot]);
                    for timer in timers {
                        self.place(timer);
                    }
                }
            }

            let slot = (self.current % self.slots as u64) as usize;
            let timers = std::mem::take(&mut self.levels[0][slot]);
            expired.extend(timers.into_iter().map(|timer| timer.item));
            expired.append(&mut self.due);
        }

        self.len -= expired.len();
        expired
    }

    /// Number of pending timers
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    pub(crate) fn levels(&self) -> usize {
        self.levels.len()
    }

    /// Drop every pending timer
    pub(crate) fn clear(&mut self) {
        self.levels = vec![Self::empty_level(self.slots)];
        self.due.clear();
        self.len = 0;
    }

    fn place(&mut self, timer: Timer<T>) {
        if timer.deadline <= self.current {
            self.due.push(timer.item);
            return;
        }

        let delta = timer.deadline - self.current;
        let mut level = 0;
        while delta >= self.width(level + 1) {
            level += 1;
        }
        while self.levels.len() <= level {
            self.levels.push(Self::empty_level(self.slots));
        }

        let slot = ((timer.deadline / self.width(level)) % self.slots as u64) as usize;
        self.levels[level][slot].push(timer);
    }

    /// Ticks spanned by one bucket of `level`
    fn width(&self, level: usize) -> u64 {
        (self.slots as u64).saturating_pow(level as u32)
    }

    fn empty_level(slots: usize) -> Vec<Vec<Timer<T>>> {
        (0..slots).map(|_| Vec::new()).collect()
    }
}
