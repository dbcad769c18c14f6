use std::error::Error;
use std::thread;
use std::time::Duration;

use loop_capture_core::{
    CapturePipeline, EffectKind, PipelineConfig, SimulatedEngine, DEFAULT_RING_CAPACITY,
};

const TICK: Duration = Duration::from_millis(10);
const RECORD_TICKS: u32 = 300;
const MAX_PLAYBACK_TICKS: u32 = 1_000;

fn load_config() -> Result<PipelineConfig, Box<dyn Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)?;
            log::info!("Loading config from {}", path);
            Ok(PipelineConfig::from_json_str(&json)?)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = load_config()?;
    // One tick's worth of frames per engine update.
    let frames_per_tick = config.sample_rate / 100;
    let engine = SimulatedEngine::new().with_frames_per_update(frames_per_tick);

    let mut pipeline: CapturePipeline<SimulatedEngine> = CapturePipeline::new(engine, config)?;
    pipeline.initialize()?;
    for kind in EffectKind::ALL {
        pipeline.create_effect(kind)?;
    }

    let mut scratch = vec![0.0f32; DEFAULT_RING_CAPACITY];
    let mut consumed = 0usize;

    pipeline.begin_recording()?;
    for _ in 0..RECORD_TICKS {
        pipeline.update()?;
        consumed += pipeline.drain_captured(&mut scratch);
        thread::sleep(TICK);
    }
    let recording = pipeline.end_recording()?;
    consumed += pipeline.drain_captured(&mut scratch);

    log::info!(
        "Recorded {} ({} samples, {} consumed)",
        recording.elapsed,
        recording.total_decoded_samples,
        consumed
    );
    log::info!("Diagnostics: {:?}", pipeline.diagnostics());

    pipeline.set_active_effect(1)?;
    pipeline.play_random_sound()?;
    let mut ticks = 0;
    while pipeline.is_sound_playing() && ticks < MAX_PLAYBACK_TICKS {
        pipeline.update()?;
        thread::sleep(TICK);
        ticks += 1;
    }
    log::info!("Playback finished after {} ticks", ticks);

    pipeline.destroy();
    Ok(())
}
