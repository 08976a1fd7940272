// CueManager: Focused manager for one-shot UI cues
//
// Single Responsibility: start cue sources on the cue bus
// Cues are fire-and-forget; the graph releases each voice when its buffer ends.

use std::sync::Arc;

use crate::audio::{AudioGraph, Bus, SoundBuffer, SourceId};

/// Starts cue voices; keeps no per-cue state
#[derive(Debug, Default)]
pub struct CueManager {
    played: u64,
}

impl CueManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `buffer` once on the cue bus. Overlapping cues are independent.
    pub fn play(&mut self, graph: &mut AudioGraph, buffer: Arc<SoundBuffer>) -> SourceId {
        self.played += 1;
        graph.start_source(Bus::Cue, buffer, false)
    }

    /// Cues started since creation
    pub fn played(&self) -> u64 {
        self.played
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{CueKind, SoundKind};
    use crate::audio::synthesize;

    #[test]
    fn test_cues_overlap_and_self_release() {
        let sr = 1_000;
        let mut graph = AudioGraph::new(sr, 1.0, 0.5, 0.3);
        let mut manager = CueManager::new();

        let click = Arc::new(synthesize(SoundKind::Cue(CueKind::Click), sr));
        let a = manager.play(&mut graph, Arc::clone(&click));
        let b = manager.play(&mut graph, click);
        assert_ne!(a, b);
        assert_eq!(graph.active_sources(Bus::Cue), vec![a, b]);
        assert_eq!(manager.played(), 2);

        // 50ms blip at 1 kHz is 50 frames
        graph.advance(50);
        assert!(graph.active_sources(Bus::Cue).is_empty());
        assert_eq!(graph.voice_count(), 0);
    }
}
