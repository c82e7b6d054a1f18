use std::path::PathBuf;

use loopeg_types::ArpBlock;

/// Command-line arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub verbose: bool,
    pub soundbank: Option<PathBuf>,
    pub port: Option<String>,
    pub project: PathBuf,
}

pub const USAGE: &str =
    "usage: loopeg-player [--verbose] [--soundbank PATH] [--port NAME] PROJECT.json";

pub fn parse_args<I>(args: I) -> Result<Args, String>
where
    I: IntoIterator<Item = String>,
{
    let mut verbose = false;
    let mut soundbank = None;
    let mut port = None;
    let mut project = None;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--verbose" | "-v" => verbose = true,
            "--soundbank" => {
                let path = args.next().ok_or("--soundbank needs a path")?;
                soundbank = Some(PathBuf::from(path));
            }
            "--port" => port = Some(args.next().ok_or("--port needs a name")?),
            flag if flag.starts_with('-') => return Err(format!("unknown option {}", flag)),
            _ if project.is_some() => return Err("only one project file may be given".into()),
            _ => project = Some(PathBuf::from(arg)),
        }
    }

    Ok(Args {
        verbose,
        soundbank,
        port,
        project: project.ok_or("missing project file")?,
    })
}

/// A line typed while the project plays.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Quit,
    Interrupt,
    /// Toggle mute on a row (0-based).
    Mute(usize),
    Tempo(f64),
    /// Save to the given path, or back to the loaded file.
    Save(Option<PathBuf>),
    /// Play the row's instrument on its ground note.
    Audition(usize),
    /// Step the mode of the row's current block.
    CycleMode(usize),
    List,
    /// MIDI output ports.
    Ports,
    Help,
}

pub const HELP: &str = "\
commands:
  q            stop and quit
  i            interrupt: silence and restart every row's current block
  m ROW        toggle mute on ROW
  b BPM        set the song tempo
  s [PATH]     save the project
  t ROW        play ROW's instrument
  o ROW        next arpeggio mode for ROW's current block
  l            list rows and blocks
  p            list MIDI output ports
  ?            this help";

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty command".into());
    };
    let arg = words.next();

    let row = |arg: Option<&str>| -> Result<usize, String> {
        let text = arg.ok_or("expected a row number")?;
        text.parse().map_err(|_| format!("'{}' is not a row number", text))
    };

    match head {
        "q" | "quit" => Ok(Command::Quit),
        "i" => Ok(Command::Interrupt),
        "m" => row(arg).map(Command::Mute),
        "t" => row(arg).map(Command::Audition),
        "o" => row(arg).map(Command::CycleMode),
        "b" => {
            let text = arg.ok_or("expected a tempo")?;
            text.parse()
                .map(Command::Tempo)
                .map_err(|_| format!("'{}' is not a tempo", text))
        }
        "s" => Ok(Command::Save(arg.map(PathBuf::from))),
        "l" => Ok(Command::List),
        "p" => Ok(Command::Ports),
        "?" | "h" | "help" => Ok(Command::Help),
        other => Err(format!("unknown command '{}' (? for help)", other)),
    }
}

/// One-line description of a block for the row listing.
pub fn block_summary(block: &ArpBlock) -> String {
    let p = &block.pattern;
    let mut text = format!("#{} {} x{} @{}", block.id, p.mode.name(), block.repetitions, p.rate);
    if let Some(chord) = p.chord() {
        text.push(' ');
        text.push_str(chord.name());
    }
    text
}
