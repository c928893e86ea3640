use std::time::{Duration, Instant};

use rushcore::game::session::{FrameInput, Session, SessionParams};
use rushcore::telemetry::StatusPoller;
use rushcore::config;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install logger immediately, then set runtime max level from config after loading it.
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    // Startup default when config is missing or malformed.
    log::set_max_level(log::LevelFilter::Warn);

    config::load();
    let cfg = config::get();
    log::set_max_level(cfg.log_level.as_level_filter());

    let mut args = std::env::args().skip(1);
    let bpm: f32 = match args.next() {
        Some(v) => v.parse()?,
        None => 120.0,
    };
    let duration_s: f32 = match args.next() {
        Some(v) => v.parse()?,
        None => 30.0,
    };
    let seed: u32 = match args.next() {
        Some(v) => v.parse()?,
        None => 1,
    };

    let mut poller = StatusPoller::spawn(
        cfg.telemetry_url.clone(),
        Duration::from_millis(cfg.poll_interval_ms),
    );
    let slot = poller.slot();

    let params = SessionParams {
        bpm,
        beat_offset_s: 0.65,
        seed,
    };
    log::info!(
        "headless session: {bpm} BPM, seed {seed}, {duration_s}s, polling {}",
        cfg.telemetry_url
    );

    let mut session = Session::new(params, &cfg);
    session.set_playing(true);

    // Fixed-rate headless frame loop. A renderer would drive this from
    // vsync instead.
    let frame = Duration::from_micros(16_667);
    let start = Instant::now();
    let mut last = start;
    loop {
        let now = Instant::now();
        let song_time = now.duration_since(start).as_secs_f32();
        if song_time >= duration_s {
            break;
        }
        let dt = now.duration_since(last).as_secs_f32();
        last = now;

        let snapshot = slot.latest();
        let report = session.tick(FrameInput {
            dt_s: dt,
            song_time_s: song_time,
            snapshot: snapshot.as_deref(),
            fallback_pose: None,
        });
        if let Some(hud) = report.hud {
            log::debug!(
                "t={:.1}s score={} combo={} notes={}",
                hud.song_time_s,
                hud.score,
                hud.combo,
                hud.live_notes
            );
        }

        let elapsed = Instant::now().duration_since(now);
        if elapsed < frame {
            std::thread::sleep(frame - elapsed);
        }
    }
    poller.stop();

    let summary = session.summary();
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
