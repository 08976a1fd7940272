//! CPAL-based output backend for desktop platforms (Linux, macOS, Windows)
//!
//! `cpal::Stream` is not `Send` on every platform, so each opened context
//! gets a dedicated thread that owns the stream and takes resume/close
//! commands over a channel. The device callback renders the shared graph
//! directly.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::audio::{AudioGraph, SharedGraph};
use crate::error::AudioError;

use super::{ContextState, GraphGains, OpenedOutput, OutputBackend, OutputStream};

enum StreamCommand {
    Resume(mpsc::Sender<Result<(), AudioError>>),
    Close,
}

/// Default output device via cpal
#[derive(Debug, Default)]
pub struct CpalBackend {
    _unit: (),
}

impl CpalBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputBackend for CpalBackend {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn open(&self, gains: GraphGains) -> Result<OpenedOutput, AudioError> {
        let (ready_tx, ready_rx) = mpsc::channel();
        let (command_tx, command_rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("sound-output".to_string())
            .spawn(move || run_output_thread(gains, ready_tx, command_rx))
            .map_err(|e| AudioError::InitializationFailed {
                reason: format!("Failed to spawn output thread: {}", e),
            })?;

        let (graph, sample_rate, channels) = match ready_rx.recv() {
            Ok(Ok(ready)) => ready,
            Ok(Err(err)) => {
                let _ = thread.join();
                return Err(err);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(AudioError::InitializationFailed {
                    reason: "Output thread exited before opening the device".to_string(),
                });
            }
        };

        log::info!(
            "[CpalBackend] Opened default output: {} Hz, {} channels",
            sample_rate,
            channels
        );

        Ok(OpenedOutput {
            graph,
            stream: Box::new(CpalStream {
                sample_rate,
                channels,
                state: ContextState::Suspended,
                commands: command_tx,
                thread: Some(thread),
            }),
        })
    }
}

type Ready = Result<(SharedGraph, u32, u16), AudioError>;

fn run_output_thread(
    gains: GraphGains,
    ready_tx: mpsc::Sender<Ready>,
    commands: mpsc::Receiver<StreamCommand>,
) {
    let (stream, graph, sample_rate, channels) = match build_output_stream(gains) {
        Ok(built) => built,
        Err(err) => {
            let _ = ready_tx.send(Err(err));
            return;
        }
    };
    if ready_tx
        .send(Ok((graph, sample_rate, channels)))
        .is_err()
    {
        return;
    }

    // Owns the stream until closed or the handle is dropped
    while let Ok(command) = commands.recv() {
        match command {
            StreamCommand::Resume(reply) => {
                let result = stream.play().map_err(|e| AudioError::StreamOpenFailed {
                    reason: format!("Output start failed: {}", e),
                });
                let _ = reply.send(result);
            }
            StreamCommand::Close => break,
        }
    }

    if let Err(e) = stream.pause() {
        log::debug!("[CpalBackend] Pause on close failed: {}", e);
    }
    drop(stream);
    log::debug!("[CpalBackend] Output thread exiting");
}

fn build_output_stream(
    gains: GraphGains,
) -> Result<(cpal::Stream, SharedGraph, u32, u16), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::StreamOpenFailed {
            reason: "No default output device found".to_string(),
        })?;

    let config = device
        .default_output_config()
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("Failed to get default output config: {:?}", e),
        })?;

    if config.sample_format() != cpal::SampleFormat::F32 {
        return Err(AudioError::UnsupportedSampleFormat {
            format: format!("{:?}", config.sample_format()),
        });
    }

    let stream_config: cpal::StreamConfig = config.into();
    let sample_rate = stream_config.sample_rate.0;
    let channels = stream_config.channels;
    let channels_count = channels as usize;

    let graph = AudioGraph::new(sample_rate, gains.master, gains.ambient, gains.cue).into_shared();
    let render_graph = SharedGraph::clone(&graph);

    let err_fn = |err| log::error!("[CpalBackend] Output stream error: {}", err);

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| match render_graph.lock() {
                Ok(mut graph) => graph.render(data, channels_count),
                Err(_) => data.fill(0.0),
            },
            err_fn,
            None,
        )
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("{:?}", e),
        })?;

    // Hold the device silent until the context is resumed
    if let Err(e) = stream.pause() {
        log::debug!("[CpalBackend] Initial pause not supported: {}", e);
    }

    Ok((stream, graph, sample_rate, channels))
}

/// Handle to the output thread
pub struct CpalStream {
    sample_rate: u32,
    channels: u16,
    state: ContextState,
    commands: mpsc::Sender<StreamCommand>,
    thread: Option<JoinHandle<()>>,
}

impl OutputStream for CpalStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        if self.state == ContextState::Closed {
            return Err(AudioError::ContextClosed);
        }
        let (reply_tx, reply_rx) = mpsc::channel();
        self.commands
            .send(StreamCommand::Resume(reply_tx))
            .map_err(|_| AudioError::ContextClosed)?;
        reply_rx.recv().map_err(|_| AudioError::ContextClosed)??;
        self.state = ContextState::Running;
        Ok(())
    }

    fn close(&mut self) -> Result<(), AudioError> {
        if self.state == ContextState::Closed {
            return Ok(());
        }
        self.state = ContextState::Closed;
        let _ = self.commands.send(StreamCommand::Close);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        Ok(())
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
