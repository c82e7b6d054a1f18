mod commands;

use std::fs::File;
use std::io::BufRead;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{select, Receiver};
use loopeg_audio::midi_backend::list_ports;
use loopeg_audio::{audition, MidiBackend, PlaybackFeedback, PlaybackScheduler, SoundBank, SynthBackend};
use loopeg_core::{load_project, save_project, Config, Project};
use loopeg_types::read_row;

use commands::{block_summary, parse_args, parse_command, Args, Command, HELP, USAGE};

const AUDITION_LENGTH: Duration = Duration::from_millis(600);

fn init_logging(verbose: bool) {
    use simplelog::{LevelFilter, WriteLogger};

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("loopeg")
        .join("loopeg.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = File::create(&log_path)
        .or_else(|_| File::create(std::env::temp_dir().join("loopeg.log")));

    match log_file {
        Ok(file) => {
            if WriteLogger::init(log_level, simplelog::Config::default(), file).is_err() {
                eprintln!("loopeg: logger already initialized");
            }
        }
        Err(e) => eprintln!("loopeg: cannot create log file: {}", e),
    }

    log::info!("loopeg starting (log level: {:?})", log_level);
}

fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            return ExitCode::from(2);
        }
    };
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("loopeg: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();

    let soundbank_path = args
        .soundbank
        .clone()
        .or_else(|| config.soundbank_path())
        .ok_or("no sound bank configured (use --soundbank)")?;
    let bank = SoundBank::load(&soundbank_path)?;
    let port = args.port.as_deref().or(config.midi_port());
    let backend = MidiBackend::connect(port, bank)
        .inspect_err(|_| print_ports())?
        .with_marker_callback(|marker| log::debug!(target: "playback", "block {}", marker));
    println!("MIDI output: {}", backend.port_name());
    let backend: Arc<dyn SynthBackend> = Arc::new(backend);

    let project = load_project(&args.project, config.defaults(), config.max_rows())?;
    project.rewind();
    print_rows(&project);

    let scheduler = PlaybackScheduler::new(Arc::clone(&backend), config.scheduler());
    let feedback = scheduler.feedback();
    scheduler.start(project.rows().to_vec(), Arc::new(project.tempo()))?;

    let lines = spawn_stdin_reader();
    loop {
        select! {
            recv(lines) -> line => {
                let Ok(line) = line else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => execute(command, &project, &scheduler, &args.project),
                    Err(e) => println!("{}", e),
                }
            }
            recv(feedback) -> msg => match msg {
                Ok(PlaybackFeedback::Started { rows }) => println!("playing {} rows", rows),
                Ok(PlaybackFeedback::Telemetry(summary)) => {
                    log::debug!(
                        target: "playback",
                        "lateness avg {}us p95 {}us max {}us, {} overruns",
                        summary.avg_late_us,
                        summary.p95_late_us,
                        summary.max_late_us,
                        summary.overruns
                    );
                }
                Ok(PlaybackFeedback::Stopped { error: Some(e) }) => {
                    return Err(format!("playback stopped: {}", e).into());
                }
                Ok(PlaybackFeedback::Stopped { error: None }) | Err(_) => break,
            },
        }
    }

    scheduler.stop();
    println!("stopped");
    Ok(())
}

fn execute(command: Command, project: &Project, scheduler: &PlaybackScheduler, loaded_from: &Path) {
    match command {
        Command::Quit => scheduler.stop(),
        Command::Interrupt => scheduler.interrupt(),
        Command::Mute(index) => {
            match project.edit_row(index, |row| {
                row.mute = !row.mute;
                row.mute
            }) {
                Some(true) => println!("row {} muted", index),
                Some(false) => println!("row {} playing", index),
                None => println!("no row {}", index),
            }
        }
        Command::Tempo(bpm) => match project.set_bpm(bpm) {
            Ok(()) => println!("{} BPM", bpm),
            Err(e) => println!("{}", e),
        },
        Command::Save(path) => {
            let path = path.as_deref().unwrap_or(loaded_from);
            match save_project(path, project) {
                Ok(()) => println!("saved {}", path.display()),
                Err(e) => println!("save failed: {}", e),
            }
        }
        Command::Audition(index) => {
            let Some(handle) = project.row(index) else {
                println!("no row {}", index);
                return;
            };
            let (channel, instrument, note) = {
                let row = read_row(handle);
                let note = row
                    .queue
                    .current()
                    .map_or(project.defaults().pattern.ground_note, |b| b.pattern.ground_note);
                (row.channel, row.instrument, note)
            };
            let backend = scheduler.backend();
            let result = backend
                .select_program(channel, instrument.bank, instrument.program)
                .and_then(|()| audition(backend.as_ref(), channel, note, 100, AUDITION_LENGTH));
            if let Err(e) = result {
                println!("test sound failed: {}", e);
            }
        }
        Command::CycleMode(index) => {
            let mode = project.edit_row(index, |row| {
                let cursor = row.queue.cursor();
                row.queue.get_mut(cursor).map(|block| {
                    block.pattern.mode = block.pattern.mode.next();
                    block.pattern.mode
                })
            });
            match mode {
                Some(Some(mode)) => println!("row {}: {}", index, mode.name()),
                Some(None) => println!("row {} has no blocks", index),
                None => println!("no row {}", index),
            }
        }
        Command::List => print_rows(project),
        Command::Ports => print_ports(),
        Command::Help => println!("{}", HELP),
    }
}

fn print_rows(project: &Project) {
    let bpm = project.bpm();
    println!("{} BPM, loop {:.2}s", bpm, project.loop_length(bpm));
    for (i, handle) in project.rows().iter().enumerate() {
        let row = read_row(handle);
        println!(
            "  row {:>2}  ch {:>2}  prog {:>3}/{:<3} vol {:>3}  {} blocks{}",
            i,
            row.channel,
            row.instrument.bank,
            row.instrument.program,
            row.volume,
            row.queue.len(),
            if row.mute { "  (muted)" } else { "" }
        );
        for block in row.queue.blocks() {
            let playing = if block.id == row.queue.cursor() { '>' } else { ' ' };
            println!("        {} {}", playing, block_summary(block));
        }
    }
}

fn print_ports() {
    match list_ports() {
        Ok(ports) if ports.is_empty() => println!("no MIDI output ports"),
        Ok(ports) => {
            println!("MIDI output ports:");
            for name in ports {
                println!("  {}", name);
            }
        }
        Err(e) => println!("cannot list MIDI ports: {}", e),
    }
}

/// Forward stdin lines; the channel closes at end of input.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let spawned = std::thread::Builder::new()
        .name("loopeg-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        log::error!("stdin reader: {}", e);
    }
    rx
}
