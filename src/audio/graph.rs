// AudioGraph - the render core behind every output backend
//
// Topology (mono, duplicated to every device channel on output):
//
//   ambient sources ─► ambient gain ─┐
//                                    ├─► master gain ─► device
//   cue sources ─────► cue gain ─────┘
//
// The graph owns its own sample clock. Gain automation, source starts and
// deferred stops are all expressed in that clock, so a fade scheduled by the
// control side completes on the device's timeline no matter what the calling
// thread does next. Deferred stops live inside the graph; dropping or
// clearing the graph cancels them.

use std::sync::{Arc, Mutex};

use super::automation::GainParam;
use super::buffer::SoundBuffer;

/// Graph shared between the control side and the device callback
pub type SharedGraph = Arc<Mutex<AudioGraph>>;

/// Sub-bus a source is connected to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bus {
    Ambient,
    Cue,
}

/// Handle to a source inside the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

/// A playing buffer
#[derive(Debug)]
struct Voice {
    id: SourceId,
    bus: Bus,
    buffer: Arc<SoundBuffer>,
    looping: bool,
    /// Fractional read position in buffer frames
    position: f64,
    /// Buffer frames advanced per output frame (resampling ratio)
    step: f64,
    /// Output frame at which the voice is silenced and released
    stop_frame: Option<u64>,
    finished: bool,
}

impl Voice {
    #[inline]
    fn is_live_at(&self, frame: u64) -> bool {
        !self.finished && self.stop_frame.map_or(true, |stop| frame < stop)
    }
}

/// Three-stage gain graph with a sample clock
pub struct AudioGraph {
    sample_rate: u32,
    frame_clock: u64,
    master: GainParam,
    ambient: GainParam,
    cue: GainParam,
    voices: Vec<Voice>,
    next_source_id: u64,
}

impl AudioGraph {
    /// Create a graph with fixed starting gains.
    ///
    /// # Arguments
    /// * `sample_rate` - Output rate in Hz; defines the clock resolution
    /// * `master` - Master gain (`enabled ? volume : 0`)
    /// * `ambient` - Ambient bus gain
    /// * `cue` - Cue bus gain
    pub fn new(sample_rate: u32, master: f32, ambient: f32, cue: f32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            frame_clock: 0,
            master: GainParam::new(master),
            ambient: GainParam::new(ambient),
            cue: GainParam::new(cue),
            voices: Vec::new(),
            next_source_id: 0,
        }
    }

    pub fn into_shared(self) -> SharedGraph {
        Arc::new(Mutex::new(self))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames rendered so far
    pub fn current_frame(&self) -> u64 {
        self.frame_clock
    }

    /// Output clock in seconds
    pub fn current_time(&self) -> f64 {
        self.frame_clock as f64 / self.sample_rate as f64
    }

    fn frame_at(&self, time: f64) -> u64 {
        (time.max(0.0) * self.sample_rate as f64).round() as u64
    }

    pub fn master(&self) -> &GainParam {
        &self.master
    }

    pub fn master_mut(&mut self) -> &mut GainParam {
        &mut self.master
    }

    pub fn bus(&self, bus: Bus) -> &GainParam {
        match bus {
            Bus::Ambient => &self.ambient,
            Bus::Cue => &self.cue,
        }
    }

    pub fn bus_mut(&mut self, bus: Bus) -> &mut GainParam {
        match bus {
            Bus::Ambient => &mut self.ambient,
            Bus::Cue => &mut self.cue,
        }
    }

    /// Bus gain at the current clock position
    pub fn live_bus_gain(&self, bus: Bus) -> f32 {
        self.bus(bus).value_at(self.current_time())
    }

    /// Master gain at the current clock position
    pub fn live_master_gain(&self) -> f32 {
        self.master.value_at(self.current_time())
    }

    /// Start a source immediately on `bus`.
    pub fn start_source(&mut self, bus: Bus, buffer: Arc<SoundBuffer>, looping: bool) -> SourceId {
        let id = SourceId(self.next_source_id);
        self.next_source_id += 1;
        let step = buffer.sample_rate() as f64 / self.sample_rate as f64;
        self.voices.push(Voice {
            id,
            bus,
            buffer,
            looping,
            position: 0.0,
            step,
            stop_frame: None,
            finished: false,
        });
        id
    }

    /// Silence and release a source at `time` on the output clock.
    ///
    /// An earlier stop already scheduled is kept. Returns `false` if the
    /// source has already finished, which is not an error.
    pub fn schedule_stop(&mut self, id: SourceId, time: f64) -> bool {
        let frame = self.frame_at(time);
        let now = self.frame_clock;
        match self.voices.iter_mut().find(|v| v.id == id) {
            Some(voice) if voice.is_live_at(now) => {
                voice.stop_frame = Some(voice.stop_frame.map_or(frame, |s| s.min(frame)));
                true
            }
            _ => false,
        }
    }

    /// Stop a source right now. Already-stopped sources are tolerated.
    pub fn stop_source(&mut self, id: SourceId) -> bool {
        let was_live = self.is_active(id);
        self.voices.retain(|v| v.id != id);
        was_live
    }

    /// Whether a source is still producing samples
    pub fn is_active(&self, id: SourceId) -> bool {
        let now = self.frame_clock;
        self.voices.iter().any(|v| v.id == id && v.is_live_at(now))
    }

    /// Live sources on a bus, oldest first
    pub fn active_sources(&self, bus: Bus) -> Vec<SourceId> {
        let now = self.frame_clock;
        self.voices
            .iter()
            .filter(|v| v.bus == bus && v.is_live_at(now))
            .map(|v| v.id)
            .collect()
    }

    /// Overall gain a source currently plays at (master × bus), or `None`
    /// if it is no longer live.
    pub fn source_gain(&self, id: SourceId) -> Option<f32> {
        let now = self.frame_clock;
        let voice = self.voices.iter().find(|v| v.id == id && v.is_live_at(now))?;
        Some(self.live_master_gain() * self.live_bus_gain(voice.bus))
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Drop every source, pending stop and automation.
    ///
    /// Used on disposal so nothing scheduled fires against a torn-down
    /// context. Returns the number of pending stops cancelled.
    pub fn clear(&mut self) -> usize {
        let pending = self.voices.iter().filter(|v| v.stop_frame.is_some()).count();
        self.voices.clear();
        let now = self.current_time();
        for param in [&mut self.master, &mut self.ambient, &mut self.cue] {
            let value = param.value_at(now);
            param.reset(value);
        }
        pending
    }

    /// Render interleaved output and advance the clock.
    ///
    /// # Arguments
    /// * `out` - Interleaved buffer; `out.len() / channels` frames are produced
    /// * `channels` - Device channel count; the mono mix is written to each
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let frame_count = out.len() / channels;
        let sr = self.sample_rate as f64;

        for i in 0..frame_count {
            let frame = self.frame_clock + i as u64;
            let t = frame as f64 / sr;
            let master = self.master.value_at(t);
            let ambient = self.ambient.value_at(t);
            let cue = self.cue.value_at(t);

            let mut mix = 0.0_f32;
            for voice in self.voices.iter_mut() {
                if !voice.is_live_at(frame) {
                    voice.finished = true;
                    continue;
                }

                let bus_gain = match voice.bus {
                    Bus::Ambient => ambient,
                    Bus::Cue => cue,
                };
                mix += voice.buffer.sample_at(voice.position, voice.looping) * bus_gain;

                voice.position += voice.step;
                let len = voice.buffer.len() as f64;
                if voice.position >= len {
                    if voice.looping && len > 0.0 {
                        voice.position %= len;
                    } else {
                        voice.finished = true;
                    }
                }
            }

            let sample = (mix * master).clamp(-1.0, 1.0);
            for ch in 0..channels {
                out[i * channels + ch] = sample;
            }
        }

        self.frame_clock += frame_count as u64;
        let now = self.frame_clock;
        self.voices.retain(|v| v.is_live_at(now));

        let t = self.current_time();
        self.master.prune_before(t);
        self.ambient.prune_before(t);
        self.cue.prune_before(t);
    }

    /// Render `frames` mono frames into a scratch buffer and discard them.
    pub fn advance(&mut self, frames: usize) {
        let mut scratch = vec![0.0_f32; frames];
        self.render(&mut scratch, 1);
    }
}
