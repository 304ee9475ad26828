// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Timer functions: setTimeout, setInterval, setImmediate, etc.
//!
//! Module execution is synchronous, so timers never fire on their own.
//! Callbacks wait in a [`TimerQueue`] until the host drains it.

use hyperbox_script::runtime::{Value, arg, native_function};
use hyperbox_script::{Error, Interpreter};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Unique identifier for a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// A queued callback
#[derive(Debug, Clone)]
struct Timer {
    id: TimerId,
    /// Requested delay in milliseconds
    delay: f64,
    /// Registration order, refreshed when an interval is re-queued
    seq: u64,
    callback: Value,
    args: Vec<Value>,
    repeat: bool,
}

#[derive(Debug, Default)]
struct TimerState {
    next_id: u64,
    next_seq: u64,
    immediates: VecDeque<Timer>,
    timers: Vec<Timer>,
    /// Interval currently running, and whether it cleared itself
    firing: Option<(TimerId, bool)>,
}

/// Pending timer callbacks for one runtime
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    state: Rc<RefCell<TimerState>>,
}

impl TimerQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a callback to run once, before any timeout
    pub fn set_immediate(&self, callback: Value, args: Vec<Value>) -> TimerId {
        let mut state = self.state.borrow_mut();
        let timer = state.make_timer(callback, args, 0.0, false);
        let id = timer.id;
        state.immediates.push_back(timer);
        id
    }

    /// Queue a timeout or interval
    pub fn set_timer(&self, callback: Value, args: Vec<Value>, delay: f64, repeat: bool) -> TimerId {
        let delay = if delay.is_finite() && delay > 0.0 { delay } else { 0.0 };
        let mut state = self.state.borrow_mut();
        let timer = state.make_timer(callback, args, delay, repeat);
        let id = timer.id;
        state.timers.push(timer);
        id
    }

    /// Cancel a queued callback. Unknown ids are ignored.
    pub fn clear(&self, id: TimerId) {
        let mut state = self.state.borrow_mut();
        state.immediates.retain(|t| t.id != id);
        state.timers.retain(|t| t.id != id);
        if let Some((firing, cleared)) = &mut state.firing {
            if *firing == id {
                *cleared = true;
            }
        }
    }

    /// Number of queued callbacks
    pub fn pending(&self) -> usize {
        let state = self.state.borrow();
        state.immediates.len() + state.timers.len()
    }

    /// Drop every queued callback
    pub fn clear_all(&self) {
        let mut state = self.state.borrow_mut();
        state.immediates.clear();
        state.timers.clear();
    }

    /// Fire every callback queued at the time of the call exactly once.
    ///
    /// Immediates run first, then timeouts and intervals ordered by delay
    /// and registration order. Intervals are re-queued for the next drain.
    /// Callbacks queued while draining wait for the next call. The first
    /// callback error stops the drain; unfired callbacks stay queued.
    pub fn run(&self, interpreter: &Interpreter) -> hyperbox_script::Result<usize> {
        let snapshot: Vec<TimerId> = {
            let state = self.state.borrow();
            let mut timers: Vec<&Timer> = state.timers.iter().collect();
            timers.sort_by(|a, b| a.delay.total_cmp(&b.delay).then(a.seq.cmp(&b.seq)));
            state
                .immediates
                .iter()
                .map(|t| t.id)
                .chain(timers.into_iter().map(|t| t.id))
                .collect()
        };

        let mut fired = 0;
        for id in snapshot {
            let Some(timer) = self.take(id) else {
                continue;
            };
            if timer.repeat {
                self.state.borrow_mut().firing = Some((id, false));
            }

            let result = interpreter.call(&timer.callback, &Value::Undefined, &timer.args);

            if timer.repeat {
                let mut state = self.state.borrow_mut();
                let cleared = matches!(state.firing.take(), Some((_, true)));
                if !cleared {
                    let seq = state.bump_seq();
                    state.timers.push(Timer { seq, ..timer });
                }
            }
            result?;
            fired += 1;
        }
        Ok(fired)
    }

    fn take(&self, id: TimerId) -> Option<Timer> {
        let mut state = self.state.borrow_mut();
        if let Some(index) = state.immediates.iter().position(|t| t.id == id) {
            return state.immediates.remove(index);
        }
        let index = state.timers.iter().position(|t| t.id == id)?;
        Some(state.timers.remove(index))
    }
}

impl TimerState {
    fn make_timer(&mut self, callback: Value, args: Vec<Value>, delay: f64, repeat: bool) -> Timer {
        self.next_id += 1;
        let seq = self.bump_seq();
        Timer {
            id: TimerId(self.next_id),
            delay,
            seq,
            callback,
            args,
            repeat,
        }
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

/// Create all timer-related global functions
pub fn create_timer_functions(queue: &TimerQueue) -> Vec<(&'static str, Value)> {
    let mut functions = Vec::new();

    let q = queue.clone();
    functions.push((
        "setTimeout",
        native_function("setTimeout", move |_, _, args| {
            let callback = callback_arg(args)?;
            let delay = arg(args, 1).to_number();
            let id = q.set_timer(callback, rest(args, 2), delay, false);
            Ok(Value::from(id.0 as f64))
        }),
    ));

    let q = queue.clone();
    functions.push((
        "setInterval",
        native_function("setInterval", move |_, _, args| {
            let callback = callback_arg(args)?;
            let delay = arg(args, 1).to_number();
            let id = q.set_timer(callback, rest(args, 2), delay, true);
            Ok(Value::from(id.0 as f64))
        }),
    ));

    let q = queue.clone();
    functions.push((
        "setImmediate",
        native_function("setImmediate", move |_, _, args| {
            let callback = callback_arg(args)?;
            let id = q.set_immediate(callback, rest(args, 1));
            Ok(Value::from(id.0 as f64))
        }),
    ));

    for name in ["clearTimeout", "clearInterval", "clearImmediate"] {
        let q = queue.clone();
        functions.push((
            name,
            native_function(name, move |_, _, args| {
                if let Value::Number(id) = arg(args, 0) {
                    q.clear(TimerId(id as u64));
                }
                Ok(Value::Undefined)
            }),
        ));
    }

    functions
}

fn callback_arg(args: &[Value]) -> hyperbox_script::Result<Value> {
    let callback = arg(args, 0);
    if !callback.is_function() {
        return Err(Error::type_error(
            "The \"callback\" argument must be of type function",
        ));
    }
    Ok(callback)
}

pub(crate) fn rest(args: &[Value], from: usize) -> Vec<Value> {
    args.get(from..).unwrap_or_default().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(log: &Rc<RefCell<Vec<String>>>, label: &str) -> Value {
        let log = Rc::clone(log);
        let label = label.to_string();
        native_function("record", move |_, _, _| {
            log.borrow_mut().push(label.clone());
            Ok(Value::Undefined)
        })
    }

    #[test]
    fn test_order_immediates_then_delay() {
        let interpreter = Interpreter::new();
        let queue = TimerQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        queue.set_timer(recorder(&log, "slow"), vec![], 50.0, false);
        queue.set_timer(recorder(&log, "fast"), vec![], 0.0, false);
        queue.set_immediate(recorder(&log, "now"), vec![]);
        queue.set_timer(recorder(&log, "fast2"), vec![], 0.0, false);

        assert_eq!(queue.run(&interpreter).unwrap(), 4);
        assert_eq!(*log.borrow(), ["now", "fast", "fast2", "slow"]);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_interval_requeues() {
        let interpreter = Interpreter::new();
        let queue = TimerQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let id = queue.set_timer(recorder(&log, "tick"), vec![], 10.0, true);
        queue.run(&interpreter).unwrap();
        queue.run(&interpreter).unwrap();
        assert_eq!(log.borrow().len(), 2);
        assert_eq!(queue.pending(), 1);

        queue.clear(id);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_cleared_timer_never_fires() {
        let interpreter = Interpreter::new();
        let queue = TimerQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let id = queue.set_timer(recorder(&log, "never"), vec![], 0.0, false);
        queue.clear(id);
        assert_eq!(queue.run(&interpreter).unwrap(), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_error_stops_drain() {
        let interpreter = Interpreter::new();
        let queue = TimerQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let failing = native_function("fail", |_, _, _| Err(Error::type_error("boom")));
        queue.set_immediate(failing, vec![]);
        queue.set_timer(recorder(&log, "later"), vec![], 0.0, false);

        assert!(queue.run(&interpreter).is_err());
        assert!(log.borrow().is_empty());
        assert_eq!(queue.pending(), 1);
    }
}
