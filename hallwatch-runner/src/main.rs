use clap::Parser;
use crossbeam_channel::unbounded;
use log::{info, warn};

use hallwatch_config::{load_config, Config, SpringConstants, TransportMode};
use hallwatch_simulation::{SlotPool, SpringParams, SpringTuning, Viewport};
use hallwatch_sync::{SyncClient, SyncEvent, SyncSettings};

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

mod sink;
use sink::{FrameSink, StdioFrameSink};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the display configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Room to sync, overriding the configured one
    #[arg(long)]
    room: Option<String>,
}

/// Frame-time clamp, so a stalled frame (e.g. a backgrounded process)
/// cannot destabilize the springs.
const MAX_FRAME_DT: f32 = 0.05;

/// Stdin line that relays the admin early-end action instead of a scan.
const OVERRIDE_COMMAND: &str = "!end";

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            process::exit(1);
        }
    };
    info!("Using configuration from {}", args.config.display());

    let room = args.room.unwrap_or_else(|| config.server.room.clone());

    let (events_tx, events_rx) = unbounded();
    let client = match SyncClient::new(sync_settings(&config), events_tx) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to start sync client: {e}");
            process::exit(1);
        }
    };
    if let Err(e) = client.connect(&room) {
        eprintln!("Failed to connect to room {room}: {e}");
        process::exit(1);
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        if let Err(e) = ctrlc::set_handler(move || running.store(false, Ordering::SeqCst)) {
            warn!("Could not install Ctrl+C handler: {e}");
        }
    }

    // Scan codes arrive as plain lines on stdin; the capture hardware in
    // front of this (barcode wedge, numpad) is someone else's concern.
    let (scan_tx, scan_rx) = unbounded::<String>();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    let code = line.trim().to_string();
                    if !code.is_empty() && scan_tx.send(code).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    let viewport = Viewport {
        width: config.display.viewport_width,
        height: config.display.viewport_height,
    };
    let mut pool = SlotPool::new(viewport, spring_tuning(&config));
    let mut sink = StdioFrameSink::new();
    let mut connection = client.connection_state();
    let mut frame_counter: u32 = 0;
    let mut loop_helper = spin_sleep::LoopHelper::builder()
        .build_with_target_rate(config.display.framerate as f64);

    info!("Rendering at {} FPS for room {room}", config.display.framerate);

    while running.load(Ordering::SeqCst) {
        let delta = loop_helper.loop_start();
        let dt = delta.as_secs_f32().min(MAX_FRAME_DT);

        // Relay any scanned codes; the open slot shows the round-trip.
        for code in scan_rx.try_iter() {
            if code == OVERRIDE_COMMAND {
                if let Err(e) = client.override_end() {
                    warn!("override relay unavailable: {e}");
                }
                continue;
            }
            pool.set_processing(true);
            if let Err(e) = client.submit_scan(&code) {
                warn!("scan relay unavailable: {e}");
                pool.set_processing(false);
            }
        }

        // Drain sync events; this loop is the only writer of pool state.
        for event in events_rx.try_iter() {
            match event {
                SyncEvent::Snapshot { snapshot, .. } => pool.reconcile(&snapshot),
                SyncEvent::Connection(state) => {
                    connection = state;
                    pool.set_timers_frozen(state.is_lost());
                }
                SyncEvent::Scan(result) => {
                    info!(
                        "scan result: {:?} {} ({})",
                        result.action, result.name, result.message
                    );
                    pool.apply_scan(&result);
                }
            }
        }

        pool.advance(dt);

        frame_counter += 1;
        if frame_counter >= config.display.output_every {
            frame_counter = 0;
            if let Err(e) = sink.send(&pool.frame(connection.label())) {
                warn!("frame emission failed: {e}");
            }
        }

        loop_helper.loop_sleep();
    }

    info!("Shutting down");
    if let Err(e) = client.shutdown() {
        warn!("shutdown error: {e}");
    }
}

fn sync_settings(config: &Config) -> SyncSettings {
    SyncSettings {
        base_url: config.server.base_url.clone(),
        prefer_push: config.sync.transport == TransportMode::Push,
        poll_interval: Duration::from_millis(config.sync.poll_interval_ms),
        backoff_floor: Duration::from_millis(config.sync.backoff_floor_ms),
        backoff_ceiling: Duration::from_millis(config.sync.backoff_ceiling_ms),
        push_failure_threshold: config.sync.push_failure_threshold,
        poll_failure_threshold: config.sync.poll_failure_threshold,
    }
}

fn spring_tuning(config: &Config) -> SpringTuning {
    fn params(constants: &SpringConstants) -> SpringParams {
        SpringParams::new(constants.stiffness, constants.damping, constants.mass)
    }
    SpringTuning {
        position: params(&config.springs.position),
        scale: params(&config.springs.scale),
        rotation: params(&config.springs.rotation),
    }
}
