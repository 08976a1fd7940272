use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use ambient_audio::audio::synthesize_named;
use ambient_audio::engine::OutputBackend;
use ambient_audio::managers::PreferenceManager;
use ambient_audio::{
    AmbientCategory, DefaultFetcher, FileFetcher, JsonFileStore, KeyValueStore, MemoryStore,
    OfflineBackend, SoundConfig, SoundEngine, SoundState,
};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

const DEFAULT_PREFS_PATH: &str = "sound_prefs.json";

#[derive(Parser, Debug)]
#[command(
    name = "sound_cli",
    about = "Offline rendering, fallback synthesis and preference tooling for the ambient sound engine"
)]
struct Cli {
    /// JSON configuration file (defaults apply field by field)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory that site-relative asset URLs resolve under
    #[arg(long)]
    asset_root: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the procedural fallback buffer for a sound to a WAV file
    Synth {
        #[arg(long)]
        kind: String,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 48_000)]
        sample_rate: u32,
    },
    /// Render a scripted ambient session offline, e.g. `nature:3000,city:4000`
    Render {
        #[arg(long)]
        script: String,
        #[arg(long)]
        out: PathBuf,
        /// Print the engine events as JSON lines after rendering
        #[arg(long)]
        events: bool,
    },
    /// Play an ambient bed on the default output device
    #[cfg(feature = "device-output")]
    Play {
        #[arg(long, default_value = "default")]
        ambient: String,
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
    /// Inspect or change the persisted sound preference
    Prefs {
        /// JSON file backing the preference store
        #[arg(long)]
        store: Option<PathBuf>,
        #[command(subcommand)]
        action: PrefsAction,
    },
}

#[derive(Subcommand, Debug)]
enum PrefsAction {
    /// Print the stored preference
    Show,
    /// Store a new master volume (clamped to [0, 1])
    SetVolume { volume: f32 },
    /// Flip the enabled flag
    Toggle,
    /// Forget the stored preference and fall back to the defaults
    Reset,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli
        .config
        .as_deref()
        .map(SoundConfig::load_from_file)
        .unwrap_or_default();
    let file_fetcher = cli
        .asset_root
        .map(FileFetcher::with_root)
        .unwrap_or_default();

    match cli.command {
        Commands::Synth {
            kind,
            out,
            sample_rate,
        } => run_synth(&kind, &out, sample_rate),
        Commands::Render {
            script,
            out,
            events,
        } => run_render(config, file_fetcher, &script, &out, events),
        #[cfg(feature = "device-output")]
        Commands::Play { ambient, seconds } => run_play(config, file_fetcher, &ambient, seconds),
        Commands::Prefs { store, action } => run_prefs(config, store, action),
    }
}

fn run_synth(kind: &str, out: &Path, sample_rate: u32) -> Result<ExitCode> {
    let buffer = synthesize_named(kind, sample_rate)
        .ok_or_else(|| anyhow!("unknown sound kind '{}'", kind))?;
    write_wav(out, buffer.samples(), buffer.sample_rate(), 1)?;
    println!(
        "{} -> {} ({:.2}s)",
        kind,
        out.display(),
        buffer.duration_secs()
    );
    Ok(ExitCode::from(0))
}

/// Parse `category:millis` segments separated by commas.
fn parse_script(script: &str) -> Result<Vec<(AmbientCategory, Duration)>> {
    script
        .split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (name, millis) = segment
                .split_once(':')
                .ok_or_else(|| anyhow!("segment '{}' is not category:millis", segment))?;
            let category = AmbientCategory::from_name(name.trim())
                .ok_or_else(|| anyhow!("unknown ambient category '{}'", name))?;
            let millis: u64 = millis
                .trim()
                .parse()
                .with_context(|| format!("parsing duration in segment '{}'", segment))?;
            Ok((category, Duration::from_millis(millis)))
        })
        .collect()
}

fn run_render(
    config: SoundConfig,
    fetcher: FileFetcher,
    script: &str,
    out: &Path,
    print_events: bool,
) -> Result<ExitCode> {
    let segments = parse_script(script)?;
    if segments.is_empty() {
        bail!("render script is empty");
    }

    let backend = Arc::new(OfflineBackend::new(
        config.output.sample_rate,
        config.output.channels,
    ));
    let sample_rate = config.output.sample_rate;
    let channels = config.output.channels;
    let crossfade = config.timing.crossfade();
    let engine = SoundEngine::new(
        config,
        backend.clone(),
        Arc::new(DefaultFetcher::new(fetcher)),
        Arc::new(MemoryStore::new()),
    );
    engine.set_enabled(true);
    engine.initialize();
    if !engine.is_initialized() {
        bail!("offline output failed to initialize");
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    let mut rendered = Vec::new();
    for (category, length) in segments {
        runtime.block_on(engine.play_ambient_category(category, crossfade));
        rendered.extend(backend.render(length));
    }
    engine.dispose();

    write_wav(out, &rendered, sample_rate, channels)?;
    println!(
        "Rendered {:.2}s to {}",
        rendered.len() as f64 / (sample_rate as f64 * channels as f64),
        out.display()
    );

    if print_events {
        for event in engine.telemetry_snapshot().recent {
            println!("{}", serde_json::to_string(&event)?);
        }
    }
    Ok(ExitCode::from(0))
}

#[cfg(feature = "device-output")]
fn run_play(config: SoundConfig, fetcher: FileFetcher, ambient: &str, seconds: u64) -> Result<ExitCode> {
    use ambient_audio::engine::CpalBackend;

    let category = AmbientCategory::from_name(ambient)
        .ok_or_else(|| anyhow!("unknown ambient category '{}'", ambient))?;
    let stop_fade = config.timing.stop_fade();
    let backend: Arc<dyn OutputBackend> = Arc::new(CpalBackend::new());
    let engine = SoundEngine::new(
        config,
        backend,
        Arc::new(DefaultFetcher::new(fetcher)),
        Arc::new(MemoryStore::new()),
    );
    engine.set_enabled(true);
    engine.initialize();
    if !engine.is_initialized() {
        bail!("output device failed to initialize");
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    runtime.block_on(engine.play_ambient(category.as_str()));
    println!("Playing '{}' for {}s", category, seconds);
    std::thread::sleep(Duration::from_secs(seconds));

    engine.stop_ambient_with_fade(stop_fade);
    std::thread::sleep(stop_fade);
    engine.dispose();
    Ok(ExitCode::from(0))
}

fn run_prefs(config: SoundConfig, store: Option<PathBuf>, action: PrefsAction) -> Result<ExitCode> {
    let path = store
        .or_else(|| config.preferences.storage_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PREFS_PATH));
    let state = apply_prefs(config, &path, action)?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    log::debug!("[sound_cli] Preference file: {}", path.display());
    Ok(ExitCode::from(0))
}

fn apply_prefs(config: SoundConfig, path: &Path, action: PrefsAction) -> Result<SoundState> {
    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(path));
    if matches!(action, PrefsAction::Reset) {
        PreferenceManager::new(Arc::clone(&store), &config.preferences).clear();
    }

    // Writes go through the engine for clamping and persistence
    let backend: Arc<dyn OutputBackend> = Arc::new(OfflineBackend::new(
        config.output.sample_rate,
        config.output.channels,
    ));
    let engine = SoundEngine::new(config, backend, Arc::new(FileFetcher::new()), store);

    match action {
        PrefsAction::Show | PrefsAction::Reset => {}
        PrefsAction::SetVolume { volume } => {
            if !volume.is_finite() {
                bail!("volume must be a finite number");
            }
            engine.set_volume(volume);
        }
        PrefsAction::Toggle => {
            engine.toggle();
        }
    }

    Ok(engine.get_state())
}

fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating WAV file {}", path.display()))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .with_context(|| format!("writing samples to {}", path.display()))?;
    }
    writer
        .finalize()
        .with_context(|| format!("finalizing WAV file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let segments = parse_script("nature:3000, city:1500").unwrap();
        assert_eq!(
            segments,
            vec![
                (AmbientCategory::Nature, Duration::from_millis(3000)),
                (AmbientCategory::City, Duration::from_millis(1500)),
            ]
        );
    }

    #[test]
    fn test_synth_writes_fallback_wav() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("hover.wav");
        run_synth("hover", &out, 48_000).unwrap();

        let reader = hound::WavReader::open(&out).unwrap();
        assert_eq!(reader.spec().sample_rate, 48_000);
        assert_eq!(reader.len(), 2_400, "50ms blip at 48 kHz");

        assert!(run_synth("thunder", &dir.path().join("x.wav"), 48_000).is_err());
    }

    #[test]
    fn test_prefs_reset_restores_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let state = apply_prefs(SoundConfig::default(), &path, PrefsAction::SetVolume { volume: 0.3 })
            .unwrap();
        assert!((state.volume - 0.3).abs() < 1e-6);
        let state = apply_prefs(SoundConfig::default(), &path, PrefsAction::Toggle).unwrap();
        assert!(state.enabled);

        let state = apply_prefs(SoundConfig::default(), &path, PrefsAction::Reset).unwrap();
        assert!(!state.enabled);
        assert_eq!(state.volume, 0.7);
        let store = JsonFileStore::new(&path);
        assert_eq!(store.get("sound-preferences").unwrap(), None);
    }

    #[test]
    fn test_parse_script_rejects_bad_segments() {
        assert!(parse_script("forest:1000").is_err());
        assert!(parse_script("city").is_err());
        assert!(parse_script("city:soon").is_err());
    }
}
