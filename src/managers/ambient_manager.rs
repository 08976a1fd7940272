// AmbientManager: Focused manager for the looping ambient bed
//
// Single Responsibility: crossfade protocol and ambient session state
// Operates on a graph the caller has already locked; all timing is scheduled
// on the graph clock, nothing here waits.

use std::sync::Arc;
use std::time::Duration;

use crate::assets::AmbientCategory;
use crate::audio::{AudioGraph, Bus, SoundBuffer, SourceId};

/// The single live ambient bed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientSession {
    pub category: AmbientCategory,
    pub source: SourceId,
    /// Graph clock time the source was started, in seconds
    pub started_at: f64,
}

/// What a crossfade scheduled
///
/// Returned so the caller can report it after releasing the graph lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientTransition {
    /// The incoming looping source
    pub source: SourceId,
    pub previous: Option<AmbientCategory>,
    /// Live bus gain the fade started from
    pub from_gain: f32,
    /// Sources released at the half point
    pub outgoing: usize,
}

/// Owns at most one ambient session and drives the ambient bus
///
/// Crossfade ordering on the ambient bus, with `half = crossfade / 2`:
///
/// ```text
/// now                 now + half             now + crossfade
///  |-- bus: live -> 0 --|-- bus: 0 -> level ---|
///  |  outgoing stopped ─┘                      |
///  new source starts at now, silent once the bus reaches 0
/// ```
///
/// Every outgoing ambient source is released by `now + half`, before the bus
/// rises again, so only the newest bed is audible after the first half.
pub struct AmbientManager {
    session: Option<AmbientSession>,
    level: f32,
}

impl AmbientManager {
    /// # Arguments
    /// * `level` - Ambient bus gain once a fade-in completes
    pub fn new(level: f32) -> Self {
        Self {
            session: None,
            level,
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn session(&self) -> Option<&AmbientSession> {
        self.session.as_ref()
    }

    pub fn current_category(&self) -> Option<AmbientCategory> {
        self.session.map(|s| s.category)
    }

    /// Whether `category` is the session category and its source is still
    /// producing samples.
    ///
    /// The cached category alone is not trusted: a source released behind
    /// the session's back does not block a restart.
    pub fn is_playing(&self, category: AmbientCategory, graph: &AudioGraph) -> bool {
        self.session
            .map(|s| s.category == category && graph.is_active(s.source))
            .unwrap_or(false)
    }

    /// Crossfade from whatever is playing to a looping `buffer`.
    ///
    /// The session is updated as soon as the fade is scheduled.
    pub fn crossfade_to(
        &mut self,
        graph: &mut AudioGraph,
        category: AmbientCategory,
        buffer: Arc<SoundBuffer>,
        crossfade: Duration,
    ) -> AmbientTransition {
        let now = graph.current_time();
        let total = crossfade.as_secs_f64();
        let half = total / 2.0;

        // Outgoing: the session source plus anything still fading from an
        // earlier stop or superseded crossfade.
        let outgoing = graph.active_sources(Bus::Ambient);

        let bus = graph.bus_mut(Bus::Ambient);
        let held = bus.cancel_and_hold(now);
        if outgoing.is_empty() {
            bus.set_value_at_time(0.0, now);
        } else {
            bus.linear_ramp_to_value_at_time(0.0, now + half);
        }
        bus.set_value_at_time(0.0, now + half);
        bus.linear_ramp_to_value_at_time(self.level, now + total);

        for source in &outgoing {
            graph.schedule_stop(*source, now + half);
        }

        let source = graph.start_source(Bus::Ambient, buffer, true);

        let previous = self.session.replace(AmbientSession {
            category,
            source,
            started_at: now,
        });

        AmbientTransition {
            source,
            previous: previous.map(|s| s.category),
            from_gain: held,
            outgoing: outgoing.len(),
        }
    }

    /// Fade the ambient bus to zero over `fade` and release the bed after.
    ///
    /// No-op (returns `None`) without an active session.
    pub fn stop(&mut self, graph: &mut AudioGraph, fade: Duration) -> Option<AmbientCategory> {
        let session = self.session.take()?;
        let now = graph.current_time();
        let end = now + fade.as_secs_f64();

        graph
            .bus_mut(Bus::Ambient)
            .ramp_from_now(0.0, now, fade.as_secs_f64());
        for source in graph.active_sources(Bus::Ambient) {
            graph.schedule_stop(source, end);
        }
        Some(session.category)
    }

    /// Release every ambient source right now and silence the bus.
    ///
    /// Already-finished sources are tolerated.
    pub fn stop_immediately(&mut self, graph: &mut AudioGraph) -> Option<AmbientCategory> {
        let session = self.session.take();
        for source in graph.active_sources(Bus::Ambient) {
            graph.stop_source(source);
        }
        if let Some(session) = &session {
            graph.stop_source(session.source);
        }
        let now = graph.current_time();
        graph.bus_mut(Bus::Ambient).ramp_from_now(0.0, now, 0.0);
        session.map(|s| s.category)
    }

    /// Forget the session without touching any graph.
    pub fn reset(&mut self) {
        self.session = None;
    }
}
