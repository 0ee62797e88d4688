//! Line commands for interactive mode

use std::path::PathBuf;

use crate::error::{AppError, Result};

pub const HELP: &str = "\
Type a prompt and press Enter to generate. Commands:
  :negative TEXT   set the negative prompt (empty clears it)
  :width N         set width (snapped to 64, min 256)
  :height N        set height (snapped to 64, min 256)
  :steps N         set sampling steps (8-40)
  :guidance X      set guidance scale (4.0-12.0)
  :seed [TEXT]     set the seed; no value means random each time
  :lock            keep the current seed, or pick one if blank
  :random          pick a new random seed
  :image PATH      attach a PNG/JPEG reference image
  :clear-image     remove the reference image
  :strength X      reference image strength (0.1-0.95)
  :stop            cancel the running generation
  :show            print the current settings
  :help            show this help
  :quit            exit";

/// One parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Submit(String),
    Negative(String),
    Width(u32),
    Height(u32),
    Steps(u32),
    Guidance(f64),
    Seed(String),
    LockSeed,
    RandomSeed,
    Image(PathBuf),
    ClearImage,
    Strength(f64),
    Stop,
    Show,
    Help,
    Quit,
}

fn number<T: std::str::FromStr>(name: &str, arg: &str) -> Result<T> {
    let arg = arg.trim();
    arg.parse().map_err(|_| {
        AppError::InvalidRequest(format!(":{} expects a number, got '{}'", name, arg))
    })
}

fn required<'a>(name: &str, arg: &'a str) -> Result<&'a str> {
    let arg = arg.trim();
    if arg.is_empty() {
        Err(AppError::InvalidRequest(format!(":{} needs a value", name)))
    } else {
        Ok(arg)
    }
}

impl Command {
    /// Parse a line. Blank lines yield `None`; anything not starting with `:`
    /// is a prompt.
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(None);
        }

        let Some(rest) = line.trim_start().strip_prefix(':') else {
            return Ok(Some(Command::Submit(line.to_string())));
        };

        let (name, arg) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let command = match name {
            "negative" | "neg" => Command::Negative(arg.trim().to_string()),
            "width" | "w" => Command::Width(number(name, arg)?),
            "height" | "h" => Command::Height(number(name, arg)?),
            "steps" => Command::Steps(number(name, arg)?),
            "guidance" | "cfg" => Command::Guidance(number(name, arg)?),
            "seed" => Command::Seed(arg.trim().to_string()),
            "lock" => Command::LockSeed,
            "random" => Command::RandomSeed,
            "image" => Command::Image(PathBuf::from(required(name, arg)?)),
            "clear-image" => Command::ClearImage,
            "strength" => Command::Strength(number(name, arg)?),
            "stop" => Command::Stop,
            "show" => Command::Show,
            "help" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            other => {
                return Err(AppError::InvalidRequest(format!(
                    "Unknown command ':{}', try :help",
                    other
                )))
            }
        };

        Ok(Some(command))
    }
}
