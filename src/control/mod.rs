//! The control-surface command language: parses an argument vector into a
//! [`Command`], kept free of Wayland types so it can be unit tested without
//! a live display. [`protocol`] adapts this to the generated
//! `mosaic_control_v1` wire object.

pub mod protocol;

use crate::tags::Tags;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// One parsed control-surface invocation. Each variant corresponds to one
/// of the control surface's named commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetFocusedTags(Tags),
    SetViewTags(Tags),
    ToggleFocusedTags(Tags),
    ToggleViewTags(Tags),
    SpawnTagmask(Tags),
    Close,
    FocusView(Direction),
    Swap(Direction),
    Zoom,
    ToggleFloat,
    ToggleFullscreen,
    DefaultLayout(String),
    OutputLayout(String),
    SetLayoutValue { name: String, value: i32 },
    ModLayoutValue { name: String, delta: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError(pub String);

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn parse_tags(arg: &str) -> Result<Tags, CommandError> {
    let bits = arg
        .parse::<u32>()
        .map_err(|_| CommandError(format!("'{arg}' is not a valid tag bitmask")))?;
    Ok(Tags::new(bits))
}

fn parse_direction(arg: &str) -> Result<Direction, CommandError> {
    match arg {
        "next" => Ok(Direction::Next),
        "previous" => Ok(Direction::Previous),
        other => Err(CommandError(format!(
            "'{other}' is not a valid direction (expected next/previous)"
        ))),
    }
}

fn parse_int(arg: &str) -> Result<i32, CommandError> {
    arg.parse::<i32>()
        .map_err(|_| CommandError(format!("'{arg}' is not a valid integer")))
}

/// Parses a command name plus its remaining arguments into a [`Command`].
/// Unknown commands and wrong argument counts/types are reported as
/// [`CommandError`], never panic: a malformed control-surface invocation
/// must turn into a `failure` event, not a crash.
pub fn parse(args: &[String]) -> Result<Command, CommandError> {
    let Some((name, rest)) = args.split_first() else {
        return Err(CommandError("empty command".into()));
    };

    match name.as_str() {
        "set-focused-tags" => Ok(Command::SetFocusedTags(parse_tags(arg(rest, 0, name)?)?)),
        "set-view-tags" => Ok(Command::SetViewTags(parse_tags(arg(rest, 0, name)?)?)),
        "toggle-focused-tags" => Ok(Command::ToggleFocusedTags(parse_tags(arg(rest, 0, name)?)?)),
        "toggle-view-tags" => Ok(Command::ToggleViewTags(parse_tags(arg(rest, 0, name)?)?)),
        "spawn-tagmask" => Ok(Command::SpawnTagmask(parse_tags(arg(rest, 0, name)?)?)),
        "close" => Ok(Command::Close),
        "focus-view" => Ok(Command::FocusView(parse_direction(arg(rest, 0, name)?)?)),
        "swap" => Ok(Command::Swap(parse_direction(arg(rest, 0, name)?)?)),
        "zoom" => Ok(Command::Zoom),
        "toggle-float" => Ok(Command::ToggleFloat),
        "toggle-fullscreen" => Ok(Command::ToggleFullscreen),
        "default-layout" => Ok(Command::DefaultLayout(arg(rest, 0, name)?.to_string())),
        "output-layout" => Ok(Command::OutputLayout(arg(rest, 0, name)?.to_string())),
        "set-layout-value" => Ok(Command::SetLayoutValue {
            name: arg(rest, 0, name)?.to_string(),
            value: parse_int(arg(rest, 1, name)?)?,
        }),
        "mod-layout-value" => Ok(Command::ModLayoutValue {
            name: arg(rest, 0, name)?.to_string(),
            delta: parse_int(arg(rest, 1, name)?)?,
        }),
        other => Err(CommandError(format!("unknown command '{other}'"))),
    }
}

fn arg<'a>(rest: &'a [String], index: usize, command: &str) -> Result<&'a str, CommandError> {
    rest.get(index)
        .map(String::as_str)
        .ok_or_else(|| CommandError(format!("'{command}' is missing argument {index}")))
}

fn args(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_focused_tags() {
        assert_eq!(
            parse(&args(&["set-focused-tags", "4"])),
            Ok(Command::SetFocusedTags(Tags::new(4)))
        );
    }

    #[test]
    fn parses_focus_view_direction() {
        assert_eq!(
            parse(&args(&["focus-view", "next"])),
            Ok(Command::FocusView(Direction::Next))
        );
        assert!(parse(&args(&["focus-view", "sideways"])).is_err());
    }

    #[test]
    fn parses_set_layout_value() {
        assert_eq!(
            parse(&args(&["set-layout-value", "main-ratio", "7"])),
            Ok(Command::SetLayoutValue {
                name: "main-ratio".into(),
                value: 7
            })
        );
    }

    #[test]
    fn missing_argument_is_an_error_not_a_panic() {
        assert!(parse(&args(&["set-focused-tags"])).is_err());
        assert!(parse(&args(&["set-layout-value", "only-one"])).is_err());
    }

    #[test]
    fn unknown_command_is_an_error() {
        assert!(parse(&args(&["defenestrate"])).is_err());
    }

    #[test]
    fn empty_invocation_is_an_error() {
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn zero_argument_commands_ignore_trailing_noise() {
        assert_eq!(parse(&args(&["zoom"])), Ok(Command::Zoom));
        assert_eq!(parse(&args(&["close"])), Ok(Command::Close));
    }
}
