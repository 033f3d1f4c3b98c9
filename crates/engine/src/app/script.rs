use std::collections::{HashMap, VecDeque};

use thiserror::Error;

use super::input::{InputAction, InputSnapshot, KeypadKey};
use super::loop_runner::InputSource;

/// One parsed script line, expanded to per-tick snapshots on playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStep {
    /// Holds the snapshot's actions for `ticks` ticks.
    Hold { snapshot: InputSnapshot, ticks: u32 },
    /// A single tick carrying edge-triggered presses.
    Press(InputSnapshot),
    Wait { ticks: u32 },
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandParseError {
    pub reason: String,
    pub usage: String,
}

impl CommandParseError {
    pub fn new(reason: impl Into<String>, usage: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            usage: usage.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("script line {line}: {reason}. usage: {usage}")]
pub struct ScriptParseError {
    pub line: usize,
    pub reason: String,
    pub usage: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterCommandError {
    #[error("command name cannot be empty")]
    EmptyName,
    #[error("duplicate command registration: {0}")]
    Duplicate(String),
}

type ParseFn = dyn Fn(&[String]) -> Result<ScriptStep, CommandParseError>;

struct CommandSpec {
    name: String,
    help: String,
    arg_schema: String,
    parse: Box<ParseFn>,
}

pub struct ScriptCommandRegistry {
    specs: Vec<CommandSpec>,
    lookup_by_lower_name: HashMap<String, usize>,
}

impl Default for ScriptCommandRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ScriptCommandRegistry {
    pub fn empty() -> Self {
        Self {
            specs: Vec::new(),
            lookup_by_lower_name: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.insert(
            "move",
            "Hold a movement direction",
            "<forward|back|left|right> <ticks:u32>",
            parse_move_command,
        );
        registry.insert("jump", "Press jump", "", parse_jump_command);
        registry.insert("interact", "Press interact", "", parse_interact_command);
        registry.insert(
            "keypad",
            "Press a keypad button",
            "<digit:0-9|clear|ok>",
            parse_keypad_command,
        );
        registry.insert("wait", "Idle for ticks", "<ticks:u32>", parse_wait_command);
        registry.insert("quit", "Stop the run", "", parse_quit_command);
        registry
    }

    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        help: impl Into<String>,
        arg_schema: impl Into<String>,
        parse: F,
    ) -> Result<(), RegisterCommandError>
    where
        F: Fn(&[String]) -> Result<ScriptStep, CommandParseError> + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RegisterCommandError::EmptyName);
        }
        if self
            .lookup_by_lower_name
            .contains_key(&name.to_ascii_lowercase())
        {
            return Err(RegisterCommandError::Duplicate(name));
        }
        self.insert(name, help, arg_schema, parse);
        Ok(())
    }

    fn insert<F>(
        &mut self,
        name: impl Into<String>,
        help: impl Into<String>,
        arg_schema: impl Into<String>,
        parse: F,
    ) where
        F: Fn(&[String]) -> Result<ScriptStep, CommandParseError> + 'static,
    {
        let name = name.into();
        self.lookup_by_lower_name
            .insert(name.to_ascii_lowercase(), self.specs.len());
        self.specs.push(CommandSpec {
            name,
            help: help.into(),
            arg_schema: arg_schema.into(),
            parse: Box::new(parse),
        });
    }

    fn lookup(&self, input_name: &str) -> Option<&CommandSpec> {
        let index = self
            .lookup_by_lower_name
            .get(&input_name.to_ascii_lowercase())?;
        self.specs.get(*index)
    }

    /// `name schema - help` lines in registration order.
    pub fn help_lines(&self) -> Vec<String> {
        self.specs
            .iter()
            .map(|spec| {
                if spec.arg_schema.is_empty() {
                    format!("{} - {}", spec.name, spec.help)
                } else {
                    format!("{} {} - {}", spec.name, spec.arg_schema, spec.help)
                }
            })
            .collect()
    }

    pub fn parse_line(&self, raw_line: &str) -> Result<Option<ScriptStep>, CommandParseError> {
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }

        let tokens = tokenize_line(trimmed)
            .map_err(|reason| CommandParseError::new(reason, "<command> [args...]"))?;
        let Some((command_name, args)) = tokens.split_first() else {
            return Ok(None);
        };
        let spec = self.lookup(command_name).ok_or_else(|| {
            CommandParseError::new(
                format!("unknown command '{command_name}'"),
                self.known_command_names(),
            )
        })?;
        (spec.parse)(args).map(Some)
    }

    fn known_command_names(&self) -> String {
        self.specs
            .iter()
            .map(|spec| spec.name.as_str())
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// Scripted input played back one snapshot per tick.
#[derive(Debug, Clone, Default)]
pub struct InputScript {
    steps: VecDeque<ScriptStep>,
    current: Option<(InputSnapshot, u32)>,
}

impl InputScript {
    pub fn parse(text: &str) -> Result<Self, ScriptParseError> {
        Self::parse_with(&ScriptCommandRegistry::with_builtins(), text)
    }

    pub fn parse_with(
        registry: &ScriptCommandRegistry,
        text: &str,
    ) -> Result<Self, ScriptParseError> {
        let mut steps = VecDeque::new();
        for (index, raw_line) in text.lines().enumerate() {
            match registry.parse_line(raw_line) {
                Ok(Some(step)) => steps.push_back(step),
                Ok(None) => {}
                Err(error) => {
                    return Err(ScriptParseError {
                        line: index + 1,
                        reason: error.reason,
                        usage: error.usage,
                    })
                }
            }
        }
        Ok(Self {
            steps,
            current: None,
        })
    }

    pub fn from_steps(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            current: None,
        }
    }

    pub fn remaining_steps(&self) -> usize {
        self.steps.len() + usize::from(self.current.is_some())
    }
}

impl InputSource for InputScript {
    fn next_snapshot(&mut self) -> Option<InputSnapshot> {
        loop {
            if let Some((snapshot, remaining)) = self.current.as_mut() {
                if *remaining > 0 {
                    *remaining -= 1;
                    let out = *snapshot;
                    if *remaining == 0 {
                        self.current = None;
                    }
                    return Some(out);
                }
                self.current = None;
            }

            match self.steps.pop_front()? {
                ScriptStep::Hold { snapshot, ticks } => {
                    self.current = Some((snapshot.held_only(), ticks));
                }
                ScriptStep::Press(snapshot) => return Some(snapshot),
                ScriptStep::Wait { ticks } => {
                    self.current = Some((InputSnapshot::empty(), ticks));
                }
                ScriptStep::Quit => {
                    self.steps.clear();
                    return Some(InputSnapshot::empty().with_quit_requested(true));
                }
            }
        }
    }
}

pub fn tokenize_line(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut seen_token_content = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                seen_token_content = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if seen_token_content {
                    tokens.push(std::mem::take(&mut current));
                    seen_token_content = false;
                }
            }
            _ => {
                current.push(ch);
                seen_token_content = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted string".to_string());
    }
    if seen_token_content {
        tokens.push(current);
    }

    Ok(tokens)
}

fn parse_move_command(args: &[String]) -> Result<ScriptStep, CommandParseError> {
    const USAGE: &str = "move <forward|back|left|right> <ticks>";
    let [direction, ticks] = args else {
        return Err(CommandParseError::new(
            "expected <direction> <ticks>",
            USAGE,
        ));
    };
    let action = match direction.to_ascii_lowercase().as_str() {
        "forward" => InputAction::MoveForward,
        "back" => InputAction::MoveBack,
        "left" => InputAction::MoveLeft,
        "right" => InputAction::MoveRight,
        other => {
            return Err(CommandParseError::new(
                format!("unknown direction '{other}'"),
                USAGE,
            ))
        }
    };
    let ticks = parse_ticks(ticks, USAGE)?;
    Ok(ScriptStep::Hold {
        snapshot: InputSnapshot::empty().with_action_down(action, true),
        ticks,
    })
}

fn parse_jump_command(args: &[String]) -> Result<ScriptStep, CommandParseError> {
    require_no_args(args, "jump")?;
    Ok(ScriptStep::Press(
        InputSnapshot::empty().with_jump_pressed(true),
    ))
}

fn parse_interact_command(args: &[String]) -> Result<ScriptStep, CommandParseError> {
    require_no_args(args, "interact")?;
    Ok(ScriptStep::Press(
        InputSnapshot::empty().with_interact_pressed(true),
    ))
}

fn parse_keypad_command(args: &[String]) -> Result<ScriptStep, CommandParseError> {
    const USAGE: &str = "keypad <0-9|clear|ok>";
    let [button] = args else {
        return Err(CommandParseError::new(
            "expected exactly one argument <button>",
            USAGE,
        ));
    };
    let key = match button.to_ascii_lowercase().as_str() {
        "clear" => KeypadKey::Clear,
        "ok" => KeypadKey::Ok,
        other => match other.parse::<u8>() {
            Ok(digit) if digit <= 9 => KeypadKey::Digit(digit),
            _ => {
                return Err(CommandParseError::new(
                    format!("invalid keypad button '{button}'"),
                    USAGE,
                ))
            }
        },
    };
    Ok(ScriptStep::Press(
        InputSnapshot::empty().with_keypad_key(Some(key)),
    ))
}

fn parse_wait_command(args: &[String]) -> Result<ScriptStep, CommandParseError> {
    const USAGE: &str = "wait <ticks>";
    let [ticks] = args else {
        return Err(CommandParseError::new(
            "expected exactly one argument <ticks>",
            USAGE,
        ));
    };
    Ok(ScriptStep::Wait {
        ticks: parse_ticks(ticks, USAGE)?,
    })
}

fn parse_quit_command(args: &[String]) -> Result<ScriptStep, CommandParseError> {
    require_no_args(args, "quit")?;
    Ok(ScriptStep::Quit)
}

fn parse_ticks(raw: &str, usage: &str) -> Result<u32, CommandParseError> {
    raw.parse::<u32>().map_err(|_| {
        CommandParseError::new(format!("invalid tick count '{raw}' (expected u32)"), usage)
    })
}

pub fn require_no_args(args: &[String], usage: &str) -> Result<(), CommandParseError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandParseError::new("unexpected extra arguments", usage))
    }
}
