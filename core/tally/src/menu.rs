//! Interactive numbered menu.
//!
//! Reads choices line by line from any `BufRead` so the loop can be driven
//! by a script in tests. End of input quits. Engine refusals (nothing
//! running, already running, blank name) are printed and the loop goes on;
//! storage failures end it.

use std::io::{BufRead, Write};

use tally_core::{Clock, Result, SwitchAction, TallyError};

use crate::app::App;
use crate::render;

const MENU: &str = "\
  1) Start task
  2) Stop current task
  3) Pause current task
  4) Resume paused task
  5) Switch task
  6) History
  7) Summary
  8) Export CSV
  9) Clear all sessions
  0) Quit";

pub fn run<C: Clock, R: BufRead, W: Write>(
    app: &mut App<C>,
    mut input: R,
    mut out: W,
) -> Result<()> {
    loop {
        say(&mut out, &format!("\n{}\n{}", app.status(), MENU))?;
        let Some(choice) = prompt(&mut input, &mut out, "Choose")? else {
            return Ok(());
        };

        let result = match choice.as_str() {
            "1" => start(app, &mut input, &mut out),
            "2" => app.stop().map(Some),
            "3" => app.pause().map(Some),
            "4" => resume(app, &mut input, &mut out),
            "5" => switch(app, &mut input, &mut out),
            "6" => Ok(Some(app.history())),
            "7" => Ok(Some(app.summary(false))),
            "8" => app.export(None, true).map(Some),
            "9" => clear(app, &mut input, &mut out),
            "0" | "q" | "quit" => return Ok(()),
            other => Ok(Some(format!("Unknown choice: {}", other))),
        };

        match result {
            Ok(Some(message)) => say(&mut out, &message)?,
            Ok(None) => {}
            Err(err) if err.is_user_error() => say(&mut out, &format!("! {}", err))?,
            Err(err) => return Err(err),
        }
    }
}

fn start<C: Clock, R: BufRead, W: Write>(
    app: &mut App<C>,
    input: &mut R,
    out: &mut W,
) -> Result<Option<String>> {
    if app.is_running() {
        // Same refusal the engine gives, before asking for a name.
        return app.start("").map(Some);
    }
    let Some(name) = pick_name(input, out, &app.known_names(), "Task name or number")? else {
        return Ok(None);
    };
    app.start(&name).map(Some)
}

fn resume<C: Clock, R: BufRead, W: Write>(
    app: &mut App<C>,
    input: &mut R,
    out: &mut W,
) -> Result<Option<String>> {
    let names = app.resumable_names();
    if names.is_empty() {
        return Ok(Some("No paused tasks to resume".to_string()));
    }
    let Some(name) = pick_name(input, out, &names, "Resume which")? else {
        return Ok(None);
    };
    app.resume(Some(&name)).map(Some)
}

fn switch<C: Clock, R: BufRead, W: Write>(
    app: &mut App<C>,
    input: &mut R,
    out: &mut W,
) -> Result<Option<String>> {
    let Some(name) = pick_name(input, out, &app.known_names(), "Switch to")? else {
        return Ok(None);
    };

    let default = app.config().default_switch_action;
    let mut action = default;
    if app.is_running() {
        let label = format!("Pause or stop the current task? [{}]", default);
        match prompt(input, out, &label)? {
            None => return Ok(None),
            Some(answer) if answer.is_empty() => {}
            Some(answer) => match answer.parse::<SwitchAction>() {
                Ok(parsed) => action = parsed,
                Err(err) => return Ok(Some(err)),
            },
        }
    }

    app.switch(&name, Some(action)).map(Some)
}

fn clear<C: Clock, R: BufRead, W: Write>(
    app: &mut App<C>,
    input: &mut R,
    out: &mut W,
) -> Result<Option<String>> {
    let answer = prompt(input, out, "Delete every session? Type 'yes' to confirm")?;
    match answer.as_deref() {
        Some("yes") => app.clear().map(Some),
        _ => Ok(Some("Nothing cleared".to_string())),
    }
}

/// Shows `names` numbered and returns the chosen or typed name.
fn pick_name<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    names: &[String],
    label: &str,
) -> Result<Option<String>> {
    if !names.is_empty() {
        say(out, &render::numbered(names))?;
    }
    let Some(answer) = prompt(input, out, label)? else {
        return Ok(None);
    };
    Ok(Some(resolve_choice(&answer, names)))
}

/// A number within range picks from `names`; anything else is taken literally.
fn resolve_choice(answer: &str, names: &[String]) -> String {
    answer
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| names.get(i))
        .cloned()
        .unwrap_or_else(|| answer.to_string())
}

/// Prints `label`, reads one trimmed line. `None` at end of input.
fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, label: &str) -> Result<Option<String>> {
    write!(out, "{}: ", label)
        .and_then(|()| out.flush())
        .map_err(|e| io_error("writing prompt", e))?;

    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .map_err(|e| io_error("reading input", e))?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn say<W: Write>(out: &mut W, message: &str) -> Result<()> {
    writeln!(out, "{}", message).map_err(|e| io_error("writing output", e))
}

fn io_error(context: &str, source: std::io::Error) -> TallyError {
    TallyError::Io {
        context: context.to_string(),
        source,
    }
}
