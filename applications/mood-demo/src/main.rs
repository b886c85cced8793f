/// Mood Demo - drive the mood audio engine from the command line
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use crossbeam_channel::Receiver;
use mood_audio::{EngineConfig, EngineEvent, MoodEngine, MoodType, OfflineBackend};
use mood_audio_desktop::CpalBackend;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CLICK: &str = "click";
const MAX_HOLD_SECS: f64 = 3600.0;

#[derive(Parser)]
#[command(name = "mood-demo")]
#[command(about = "Play or render a sequence of story moods", long_about = None)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, global = true, env = "MOOD_AUDIO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the sequence on the default output device
    Play {
        #[command(flatten)]
        scene: SceneArgs,
    },
    /// Render the sequence to a WAV file
    Render {
        /// Output WAV path
        #[arg(short, long)]
        out: PathBuf,

        /// Render sample rate
        #[arg(long, default_value_t = 44_100, value_parser = clap::value_parser!(u32).range(8_000..=192_000))]
        sample_rate: u32,

        #[command(flatten)]
        scene: SceneArgs,
    },
}

#[derive(Args)]
struct SceneArgs {
    /// Moods to visit, in order
    #[arg(short, long, value_delimiter = ',', default_value = "calm,adventure,mystery,calm")]
    moods: Vec<MoodType>,

    /// Seconds to stay on each mood
    #[arg(long = "hold-secs", default_value = "6", value_parser = parse_hold)]
    hold: Duration,

    /// Music URL for a mood, e.g. `--track calm=https://cdn.example.com/calm.mp3`
    #[arg(long, value_parser = parse_track)]
    track: Vec<(MoodType, String)>,

    /// URL of an effect played at every mood change
    #[arg(long)]
    effect: Option<String>,
}

fn parse_hold(arg: &str) -> Result<Duration, String> {
    let secs = arg
        .parse::<f64>()
        .map_err(|e| format!("invalid number of seconds `{arg}`: {e}"))?;
    if !(0.0..=MAX_HOLD_SECS).contains(&secs) {
        return Err(format!(
            "hold time must be between 0 and {MAX_HOLD_SECS} seconds, got `{arg}`"
        ));
    }
    Ok(Duration::from_secs_f64(secs))
}

fn parse_track(arg: &str) -> Result<(MoodType, String), String> {
    let (mood, url) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected MOOD=URL, got `{arg}`"))?;
    let mood = mood.parse::<MoodType>().map_err(|e| e.to_string())?;
    Ok((mood, url.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mood_audio=info,mood_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Play { scene } => play(config, scene).await,
        Commands::Render {
            out,
            sample_rate,
            scene,
        } => render(config, scene, sample_rate, &out).await,
    }
}

async fn play(config: EngineConfig, scene: SceneArgs) -> anyhow::Result<()> {
    let engine = MoodEngine::new(CpalBackend::new(), config)?;
    let events = engine.subscribe();
    engine.init().context("opening audio output")?;
    prepare(&engine, &scene).await;

    let hold = scene.hold;
    for mood in &scene.moods {
        engine.crossfade_to_default(*mood);
        engine.play_sound_effect(CLICK);
        log_events(&events);
        tokio::time::sleep(hold).await;
    }

    engine.cleanup();
    log_events(&events);
    Ok(())
}

async fn render(
    config: EngineConfig,
    scene: SceneArgs,
    sample_rate: u32,
    out: &Path,
) -> anyhow::Result<()> {
    let backend = OfflineBackend::new(sample_rate, 2);
    let output = backend.handle();
    let engine = MoodEngine::new(backend, config)?;
    let events = engine.subscribe();
    engine.init()?;
    prepare(&engine, &scene).await;

    let hold = scene.hold;
    let mut samples = Vec::new();
    for mood in &scene.moods {
        engine.crossfade_to_default(*mood);
        engine.play_sound_effect(CLICK);
        samples.extend(output.render_for(hold));
        log_events(&events);
    }
    engine.cleanup();

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(out, spec)
        .with_context(|| format!("creating {}", out.display()))?;
    for sample in &samples {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;

    info!(
        path = %out.display(),
        seconds = samples.len() as f64 / 2.0 / f64::from(sample_rate),
        "Rendered mood sequence"
    );
    Ok(())
}

/// Load every mood in the scene plus the optional click effect
async fn prepare(engine: &MoodEngine, scene: &SceneArgs) {
    let urls: HashMap<MoodType, &str> = scene
        .track
        .iter()
        .map(|(mood, url)| (*mood, url.as_str()))
        .collect();

    let mut loaded = HashSet::new();
    for mood in &scene.moods {
        if loaded.insert(*mood) {
            engine.load_track(*mood, urls.get(mood).copied()).await;
        }
    }

    if let Some(url) = &scene.effect {
        engine.load_sound_effect(CLICK, url).await;
    }
}

fn log_events(events: &Receiver<EngineEvent>) {
    for event in events.try_iter() {
        info!(event = ?event, "Engine event");
    }
}
