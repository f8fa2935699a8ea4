//! Tilt - motion-controlled performance in the terminal
//!
//! Tilt the device to play: vertical motion drives pitch, lateral motion drives
//! volume. Takes can be recorded and played back with their original timing.

mod app;
mod source;

use std::fs::{self, File};
use std::io::{self, stdout, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use crossterm::{
    cursor,
    event::{self, Event, KeyEventKind},
    execute, queue,
    style::Print,
    terminal::{self, disable_raw_mode, enable_raw_mode, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use app::{bar, App, HELP_TEXT};
use source::{FileSource, MotionSource, SyntheticSource};
use tilt_input::{Command, InputHandler, Mode};
use tilt_motion::{ControlPair, ControlSink};
use tilt_session::{
    Config, EngineState, MonotonicClock, SessionCommand, SessionEngine, SessionEvent,
};

/// Frame rate for UI updates
const FPS: u64 = 30;

#[derive(Parser, Debug)]
#[command(name = "tilt")]
#[command(about = "Motion-controlled pitch and volume in the terminal", long_about = None)]
struct Args {
    /// File of x,y,z accelerometer samples; a synthetic device is used when omitted
    #[arg(value_name = "SAMPLES_FILE")]
    samples: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _log_path = init_logging()?;
    let config = load_config();

    // Open the source before touching the terminal so errors print normally
    let source: Box<dyn MotionSource> = match &args.samples {
        Some(path) => Box::new(FileSource::open(path)?),
        None => Box::new(SyntheticSource::new(config.sample_rate_hz)),
    };

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let (cmd_tx, cmd_rx, evt_tx, evt_rx) = SessionEngine::create_channels();

    // Shutdown flag
    let shutdown = Arc::new(AtomicBool::new(false));

    // Latest control value as seen by the output stage
    let control = Arc::new(Mutex::new(ControlPair::default()));

    let session_handle = {
        let control = control.clone();
        let config = config.clone();
        thread::Builder::new()
            .name("tilt-session".into())
            .spawn(move || run_session_thread(config, cmd_rx, evt_tx, control))?
    };

    let sensor_handle = {
        let shutdown = shutdown.clone();
        let cmd_tx = cmd_tx.clone();
        let interval = config.sample_interval();
        thread::Builder::new()
            .name("tilt-sensor".into())
            .spawn(move || run_sensor_thread(source, interval, cmd_tx, shutdown))?
    };

    // Create engine handle for main thread
    let engine = SessionEngine::new(cmd_tx, evt_rx);

    // Run main event loop
    let result = run_app(&mut stdout, &engine, &control);

    // Cleanup: stop feeding samples, then let the session finish what is armed
    shutdown.store(true, Ordering::SeqCst);
    let _ = sensor_handle.join();
    engine.shutdown();
    let _ = session_handle.join();

    execute!(stdout, cursor::Show, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    tracing::info!("tilt exited");

    result
}

/// Log to a file under the data directory; the terminal belongs to the UI
fn init_logging() -> anyhow::Result<PathBuf> {
    let dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tilt");
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join("tilt.log");
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();

    tracing::info!(log = %path.display(), "tilt starting");
    Ok(path)
}

/// Load the user config, writing the defaults out on first run so they can be edited
fn load_config() -> Config {
    let path = Config::config_path();
    let config = Config::load();
    if !path.exists() {
        if let Err(e) = config.save() {
            tracing::warn!(path = %path.display(), error = %e, "could not write default config");
        }
    }
    tracing::debug!(?config, "config loaded");
    config
}

fn run_session_thread(
    config: Config,
    cmd_rx: Receiver<SessionCommand>,
    evt_tx: Sender<SessionEvent>,
    control: Arc<Mutex<ControlPair>>,
) {
    let sink = move |pair: ControlPair| *control.lock() = pair;
    let state = EngineState::new(config.motion(), Box::new(MonotonicClock::new()), sink);
    run_session_loop(state, &cmd_rx, &evt_tx, config.tick_interval());
    tracing::debug!("session thread stopped");
}

/// Drive the engine until `Shutdown` arrives or every sender is gone
///
/// Events produced by the final command are still delivered.
fn run_session_loop<S: ControlSink>(
    mut state: EngineState<S>,
    cmd_rx: &Receiver<SessionCommand>,
    evt_tx: &Sender<SessionEvent>,
    tick_interval: Duration,
) {
    let state_update_interval = Duration::from_millis(1000 / FPS);
    let mut next_tick = Instant::now() + tick_interval;
    let mut last_state_update = Instant::now();

    loop {
        let timeout = next_tick.saturating_duration_since(Instant::now());
        let finished = match cmd_rx.recv_timeout(timeout) {
            Ok(cmd @ SessionCommand::Shutdown) => {
                state.handle_command(cmd);
                true
            }
            Ok(cmd) => {
                state.handle_command(cmd);
                false
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                state.handle_command(SessionCommand::Shutdown);
                true
            }
        };

        let now = Instant::now();
        if !finished && now >= next_tick {
            state.on_tick();
            next_tick += tick_interval;
            // Don't try to replay ticks missed while stalled; the scheduler catches up by time
            if next_tick < now {
                next_tick = now + tick_interval;
            }
        }

        for event in state.drain_events() {
            let _ = evt_tx.try_send(event);
        }

        if finished {
            let _ = evt_tx.try_send(state.get_state());
            break;
        }

        if last_state_update.elapsed() >= state_update_interval {
            let _ = evt_tx.try_send(state.get_state());
            last_state_update = Instant::now();
        }
    }
}

fn run_sensor_thread(
    mut source: Box<dyn MotionSource>,
    interval: Duration,
    cmd_tx: Sender<SessionCommand>,
    shutdown: Arc<AtomicBool>,
) {
    let mut next = Instant::now();
    while !shutdown.load(Ordering::Relaxed) {
        let Some(sample) = source.next_sample() else {
            tracing::info!("sample source exhausted");
            break;
        };
        if cmd_tx.try_send(SessionCommand::Sample(sample)).is_err() {
            tracing::trace!("session queue full, sample dropped");
        }

        next += interval;
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        } else {
            next = now;
        }
    }
}

fn run_app(
    out: &mut impl Write,
    engine: &SessionEngine,
    control: &Mutex<ControlPair>,
) -> anyhow::Result<()> {
    let mut app = App::new();
    let mut input_handler = InputHandler::new();

    let frame_duration = Duration::from_millis(1000 / FPS);
    let mut last_frame = Instant::now();

    app.set_message("Tilt | hold the device still to calibrate, ? for help");

    loop {
        if app.should_quit || engine.is_shutdown() {
            break;
        }

        // Process session events
        while let Ok(event) = engine.event_rx.try_recv() {
            app.handle_session_event(event);
        }
        app.control = *control.lock();

        render(out, &app)?;

        // Handle input
        let timeout = frame_duration.saturating_sub(last_frame.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(cmd) = input_handler.handle_key(key) {
                        handle_command(&mut app, engine, cmd);
                    }
                    app.mode = input_handler.mode();
                    app.command_buffer = input_handler.command_buffer().to_string();
                }
            }
        }

        // Maintain frame rate
        let elapsed = last_frame.elapsed();
        if elapsed < frame_duration {
            thread::sleep(frame_duration - elapsed);
        }
        last_frame = Instant::now();
    }

    Ok(())
}

fn handle_command(app: &mut App, engine: &SessionEngine, cmd: Command) {
    match cmd {
        // Recording
        Command::ToggleRecording => engine.send(SessionCommand::ToggleRecording),
        Command::StartRecording => engine.send(SessionCommand::StartRecording),
        Command::StopRecording => engine.send(SessionCommand::StopRecording),
        Command::ClearRecording => {
            engine.send(SessionCommand::ClearRecording);
            app.set_message("recording cleared");
        }

        // Playback
        Command::TogglePlayback => engine.send(SessionCommand::TogglePlayback),
        Command::Play => engine.send(SessionCommand::Play),
        Command::StopPlayback => engine.send(SessionCommand::StopPlayback),

        Command::Stop => {
            engine.send(SessionCommand::StopRecording);
            engine.send(SessionCommand::StopPlayback);
        }

        Command::Recalibrate => {
            engine.send(SessionCommand::Recalibrate);
            app.set_message("recalibrating, hold the device still");
        }

        // UI
        Command::ToggleHelp | Command::EnterCommandMode | Command::EnterNormalMode => {}
        Command::Cancel => app.clear_message(),

        Command::Quit => app.quit(),

        Command::ExecuteCommand(input) => {
            tracing::debug!(%input, "unknown command");
            app.set_error(format!("unknown command: {input}"));
        }
    }
}

fn render(out: &mut impl Write, app: &App) -> io::Result<()> {
    let mut lines = vec![
        "TILT".to_string(),
        String::new(),
        app.status_line(),
        String::new(),
        bar("pitch", app.control.pitch),
        bar("volume", app.control.volume),
        String::new(),
    ];
    if app.mode == Mode::Help {
        lines.extend(HELP_TEXT.iter().map(|l| l.to_string()));
        lines.push(String::new());
    }
    lines.push(app.message_line());

    for (row, line) in lines.iter().enumerate() {
        queue!(
            out,
            cursor::MoveTo(0, row as u16),
            Print(line),
            terminal::Clear(ClearType::UntilNewLine)
        )?;
    }
    queue!(out, terminal::Clear(ClearType::FromCursorDown))?;
    out.flush()
}
