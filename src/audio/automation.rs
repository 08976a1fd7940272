//! Gain automation scheduled against the output clock.
//!
//! A [`GainParam`] holds a list of timed events, evaluated per sample by the
//! render loop:
//!
//! - **Set**: jump to a value at a time, hold until the next event
//! - **Ramp**: linear interpolation from the previous event's (time, value)
//!   to this event's (time, value)
//!
//! Callers never block on a fade; they schedule events and return. A fade
//! that must be interrupted mid-flight is re-anchored with
//! [`GainParam::cancel_and_hold`], which pins the *live* value at the cut
//! point instead of an assumed target, so overlapping fades can never leave
//! the bus stuck mid-ramp.

/// One scheduled automation event. Times are seconds on the output clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutomationEvent {
    Set { time: f64, value: f32 },
    Ramp { time: f64, value: f32 },
}

impl AutomationEvent {
    #[inline]
    pub fn time(&self) -> f64 {
        match self {
            AutomationEvent::Set { time, .. } | AutomationEvent::Ramp { time, .. } => *time,
        }
    }

    #[inline]
    pub fn value(&self) -> f32 {
        match self {
            AutomationEvent::Set { value, .. } | AutomationEvent::Ramp { value, .. } => *value,
        }
    }
}

/// A gain stage with sample-accurate automation
#[derive(Debug, Clone)]
pub struct GainParam {
    /// Value before the first event
    initial: f32,
    /// Events ordered by time; equal times keep insertion order
    events: Vec<AutomationEvent>,
}

impl GainParam {
    pub fn new(initial: f32) -> Self {
        Self {
            initial,
            events: Vec::new(),
        }
    }

    /// Jump to `value` at `time` and hold.
    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(AutomationEvent::Set { time, value });
    }

    /// Ramp linearly from the previous event to `value`, arriving at `end_time`.
    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) {
        self.insert(AutomationEvent::Ramp {
            time: end_time,
            value,
        });
    }

    /// Drop every event at or after `time`.
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.events.retain(|event| event.time() < time);
    }

    /// Freeze the parameter at its live value at `time`.
    ///
    /// A ramp that straddles `time` is cut at its current interpolated value.
    /// Returns the held value.
    pub fn cancel_and_hold(&mut self, time: f64) -> f32 {
        let held = self.value_at(time);
        self.cancel_scheduled_values(time);
        self.set_value_at_time(held, time);
        held
    }

    /// Ramp from the live value at `now` to `target` over `duration` seconds.
    ///
    /// Convenience for the common "interrupt and fade" pattern.
    pub fn ramp_from_now(&mut self, target: f32, now: f64, duration: f64) {
        self.cancel_and_hold(now);
        if duration > 0.0 {
            self.linear_ramp_to_value_at_time(target, now + duration);
        } else {
            self.set_value_at_time(target, now);
        }
    }

    /// Evaluate the automation curve at `time`.
    pub fn value_at(&self, time: f64) -> f32 {
        let mut prev_time = f64::NEG_INFINITY;
        let mut prev_value = self.initial;

        for event in &self.events {
            if event.time() > time {
                return match event {
                    AutomationEvent::Set { .. } => prev_value,
                    AutomationEvent::Ramp { time: end, value } => {
                        // A ramp with no earlier event starts from the initial value at t=0.
                        let start = if prev_time.is_finite() {
                            prev_time
                        } else {
                            0.0_f64.min(time)
                        };
                        interpolate(start, prev_value, *end, *value, time)
                    }
                };
            }
            prev_time = event.time();
            prev_value = event.value();
        }

        prev_value
    }

    /// Value once every scheduled event has elapsed.
    pub fn final_value(&self) -> f32 {
        self.events.last().map(|e| e.value()).unwrap_or(self.initial)
    }

    /// Collapse events that can no longer influence values at or after `time`.
    ///
    /// Called from the render loop to keep evaluation cost bounded.
    pub fn prune_before(&mut self, time: f64) {
        let last_elapsed = self.events.iter().rposition(|e| e.time() <= time);
        if let Some(index) = last_elapsed {
            let anchor = self.events[index];
            self.events.drain(..index);
            self.events[0] = AutomationEvent::Set {
                time: anchor.time(),
                value: anchor.value(),
            };
        }
    }

    pub fn scheduled_events(&self) -> &[AutomationEvent] {
        &self.events
    }

    /// Forget all automation and sit at `value`.
    pub fn reset(&mut self, value: f32) {
        self.initial = value;
        self.events.clear();
    }

    fn insert(&mut self, event: AutomationEvent) {
        let index = self
            .events
            .iter()
            .position(|e| e.time() > event.time())
            .unwrap_or(self.events.len());
        self.events.insert(index, event);
    }
}

#[inline]
fn interpolate(t0: f64, v0: f32, t1: f64, v1: f32, t: f64) -> f32 {
    let span = t1 - t0;
    if span <= 0.0 {
        return v1;
    }
    let progress = ((t - t0) / span).clamp(0.0, 1.0) as f32;
    v0 + (v1 - v0) * progress
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_initial_value_without_events() {
        let param = GainParam::new(0.3);
        assert_eq!(param.value_at(0.0), 0.3);
        assert_eq!(param.value_at(100.0), 0.3);
        assert_eq!(param.final_value(), 0.3);
    }

    #[test]
    fn test_set_holds_until_next_event() {
        let mut param = GainParam::new(1.0);
        param.set_value_at_time(0.25, 1.0);
        assert_eq!(param.value_at(0.99), 1.0);
        assert_eq!(param.value_at(1.0), 0.25);
        assert_eq!(param.value_at(5.0), 0.25);
    }

    #[test]
    fn test_hold_then_ramp() {
        // The fade-in half of a 2s crossfade starting at t=10
        let mut param = GainParam::new(0.0);
        param.set_value_at_time(0.0, 10.0);
        param.set_value_at_time(0.0, 11.0);
        param.linear_ramp_to_value_at_time(0.5, 12.0);

        assert_eq!(param.value_at(10.5), 0.0);
        assert_eq!(param.value_at(11.0), 0.0);
        assert!(approx(param.value_at(11.5), 0.25));
        assert!(approx(param.value_at(12.0), 0.5));
        assert!(approx(param.value_at(20.0), 0.5));
    }

    #[test]
    fn test_cancel_and_hold_mid_ramp() {
        let mut param = GainParam::new(0.0);
        param.set_value_at_time(0.5, 0.0);
        param.linear_ramp_to_value_at_time(0.0, 1.0);

        let held = param.cancel_and_hold(0.25);
        assert!(approx(held, 0.375));
        assert!(approx(param.value_at(0.25), 0.375));
        assert!(approx(param.value_at(3.0), 0.375), "Later ramp target must be gone");

        param.linear_ramp_to_value_at_time(0.0, 0.75);
        assert!(approx(param.value_at(0.5), 0.1875));
        assert_eq!(param.value_at(0.75), 0.0);
    }

    #[test]
    fn test_overlapping_fades_reanchor_to_live_value() {
        // Fade-in scheduled, then superseded halfway through its ramp.
        let mut param = GainParam::new(0.0);
        param.set_value_at_time(0.0, 0.0);
        param.set_value_at_time(0.0, 1.0);
        param.linear_ramp_to_value_at_time(0.5, 2.0);

        param.ramp_from_now(0.0, 1.5, 0.5);
        assert!(approx(param.value_at(1.5), 0.25));
        assert!(approx(param.value_at(1.75), 0.125));
        assert_eq!(param.value_at(2.0), 0.0);
        assert_eq!(param.final_value(), 0.0, "Superseded fade must not leave the bus non-zero");
    }

    #[test]
    fn test_ramp_from_now_zero_duration_is_immediate() {
        let mut param = GainParam::new(0.7);
        param.ramp_from_now(0.0, 2.0, 0.0);
        assert_eq!(param.value_at(2.0), 0.0);
        assert_eq!(param.value_at(1.0), 0.7);
    }

    #[test]
    fn test_prune_preserves_curve() {
        let mut param = GainParam::new(0.0);
        param.set_value_at_time(1.0, 0.0);
        param.linear_ramp_to_value_at_time(0.0, 1.0);
        param.set_value_at_time(0.0, 2.0);
        param.linear_ramp_to_value_at_time(0.5, 3.0);

        let before: Vec<f32> = (0..40).map(|i| param.value_at(1.0 + i as f64 * 0.05)).collect();
        param.prune_before(1.0);
        let after: Vec<f32> = (0..40).map(|i| param.value_at(1.0 + i as f64 * 0.05)).collect();

        assert_eq!(param.scheduled_events().len(), 3);
        for (a, b) in before.iter().zip(after.iter()) {
            assert!(approx(*a, *b));
        }
    }

    #[test]
    fn test_unanchored_ramp_starts_from_initial() {
        let mut param = GainParam::new(1.0);
        param.linear_ramp_to_value_at_time(0.0, 2.0);
        assert!(approx(param.value_at(1.0), 0.5));
    }
}
