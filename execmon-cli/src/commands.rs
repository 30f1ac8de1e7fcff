//! Line commands driving the monitor views.

use anyhow::{bail, Context, Result};
use execmon_core::{EntitySet, ViewCoordinator};
use execmon_types::{ReactorName, SourceKey, Tick, TokenKey};
use std::io::{BufRead, Write};

const HELP: &str = "\
commands:
  go <tick>                    load a tick
  next | prev                  step to the neighbouring recorded tick
  filter [pattern]             filter the token network (no pattern clears)
  regex on|off                 toggle regex filtering
  active on|off                switch filtering on or off, keeping the pattern
  highlight <reactor> <token>  focus the network on a token
  inspect <reactor> <token>    open a property inspector
  jump <tick> <reactor>        load a tick and show a reactor's timeline
  conflicts                    list conflicts at the loaded tick
  activate <index>             jump to a listed conflict
  timeline                     show the visible timeline
  visible                      show the visible network nodes
  source all|<reactor>         choose what the network follows
  help                         show this text
  quit                         exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Go(String),
    Next,
    Prev,
    Filter(String),
    Regex(bool),
    Active(bool),
    Highlight(ReactorName, TokenKey),
    Inspect(ReactorName, TokenKey),
    Jump(Tick, ReactorName),
    Conflicts,
    Activate(usize),
    Timeline,
    Visible,
    Source(SourceKey),
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            bail!("empty command");
        };
        // The pattern is everything after the command name, spaces included
        if name == "filter" {
            let pattern = line[name.len()..].trim_start();
            return Ok(Command::Filter(pattern.to_string()));
        }
        let args: Vec<&str> = words.collect();

        let command = match (name, args.as_slice()) {
            ("go", [tick]) => Command::Go(tick.to_string()),
            ("next", []) => Command::Next,
            ("prev", []) => Command::Prev,
            ("regex", ["on"]) => Command::Regex(true),
            ("regex", ["off"]) => Command::Regex(false),
            ("active", ["on"]) => Command::Active(true),
            ("active", ["off"]) => Command::Active(false),
            ("highlight", [reactor, token]) => {
                Command::Highlight(ReactorName::new(*reactor), TokenKey::new(*token))
            }
            ("inspect", [reactor, token]) => {
                Command::Inspect(ReactorName::new(*reactor), TokenKey::new(*token))
            }
            ("jump", [tick, reactor]) => {
                let tick = Tick::parse(tick).with_context(|| format!("Invalid tick '{}'", tick))?;
                Command::Jump(tick, ReactorName::new(*reactor))
            }
            ("conflicts", []) => Command::Conflicts,
            ("activate", [index]) => Command::Activate(
                index
                    .parse()
                    .with_context(|| format!("Invalid conflict index '{}'", index))?,
            ),
            ("timeline", []) => Command::Timeline,
            ("visible", []) => Command::Visible,
            ("source", ["all"]) => Command::Source(SourceKey::All),
            ("source", [reactor]) => Command::Source(SourceKey::reactor(*reactor)),
            ("help", []) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            _ => bail!("unrecognized command '{}' (try 'help')", line.trim()),
        };
        Ok(command)
    }
}

/// One-line summary of a loaded set
pub fn describe_set(set: &EntitySet, coordinator: &ViewCoordinator) -> String {
    let tick = coordinator.reader().borrow().format_tick(set.tick());
    let reactors: Vec<&str> = set.reactor_names().map(|r| r.as_str()).collect();
    format!(
        "tick {}: {} reactor(s) [{}], {} conflict(s)",
        tick,
        set.len(),
        reactors.join(", "),
        set.conflicts().count()
    )
}

/// Read commands until end of input or `quit`. Failed commands are reported
/// and the session continues.
pub fn run<R: BufRead, W: Write>(
    coordinator: &mut ViewCoordinator,
    input: R,
    out: &mut W,
) -> Result<()> {
    for line in input.lines() {
        let line = line.context("Failed to read command")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(err) => {
                writeln!(out, "error: {:#}", err)?;
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        match execute(coordinator, command) {
            Ok(report) => write!(out, "{}", report)?,
            Err(err) => {
                tracing::warn!(command = line, error = %err, "command failed");
                writeln!(out, "error: {:#}", err)?;
            }
        }
        out.flush()?;
    }
    Ok(())
}

/// Run one command and return its report
pub fn execute(coordinator: &mut ViewCoordinator, command: Command) -> Result<String> {
    let width = coordinator.config().tick_width;
    let report = match command {
        Command::Go(text) => {
            let set = coordinator.go(&text)?;
            format!("{}\n", describe_set(&set, coordinator))
        }
        step @ (Command::Next | Command::Prev) => {
            let target = {
                let reader = coordinator.reader().borrow();
                if step == Command::Next {
                    reader.next_tick()
                } else {
                    reader.previous_tick()
                }
            };
            let Some(tick) = target else {
                bail!("no recorded tick in that direction");
            };
            let set = coordinator.go_to(tick)?;
            format!("{}\n", describe_set(&set, coordinator))
        }
        Command::Filter(pattern) => {
            coordinator.set_filter(&pattern)?;
            coordinator.network().borrow().render()
        }
        Command::Regex(on) => {
            coordinator.set_use_regex(on)?;
            coordinator.network().borrow().render()
        }
        Command::Active(on) => {
            coordinator.set_filter_active(on)?;
            coordinator.network().borrow().render()
        }
        Command::Highlight(reactor, key) => {
            coordinator.highlight(&reactor, &key)?;
            coordinator.network().borrow().render()
        }
        Command::Inspect(reactor, key) => {
            coordinator.inspect(&reactor, &key)?;
            let inspectors = coordinator.inspectors().borrow();
            inspectors
                .latest()
                .map(|inspector| inspector.render(width))
                .unwrap_or_default()
        }
        Command::Jump(tick, reactor) => {
            coordinator.jump(tick, &reactor)?;
            coordinator.timeline().borrow().render(width)
        }
        Command::Conflicts => coordinator.conflicts().borrow().render(width),
        Command::Activate(index) => {
            if !coordinator.activate_conflict(index)? {
                bail!("no conflict #{}", index);
            }
            coordinator.timeline().borrow().render(width)
        }
        Command::Timeline => coordinator.timeline().borrow().render(width),
        Command::Visible => coordinator.network().borrow().render(),
        Command::Source(source) => {
            let report = format!("network follows {}\n", source);
            coordinator.select_network_source(source);
            report
        }
        Command::Help => format!("{}\n", HELP),
        Command::Quit => String::new(),
    };
    Ok(report)
}
