//! The clap-backed flag-parsing engine.
//!
//! [`ClapEngine`] receives groups and flags from schema trees through the
//! [`FlagRegistry`] seam and turns them into `clap` arguments. Values are
//! coerced by [`FieldValueParser`] so clap hands back typed JSON values.
//!
//! Defaults are not given to clap: the engine only reports what was present
//! on the command line and fills in the advertised defaults itself, so a
//! default instance never has to round-trip through a string.

use std::ffi::OsStr;

use clap::builder::{PossibleValue, TypedValueParser};
use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use schema_args_core::{FlagRegistry, FlagSpec, GroupId, Nargs, ParsingOptions, ValueKind};
use serde_json::Value;
use tracing::trace;

use crate::error::{ParseError, Result};

/// Coerces raw tokens with a field's [`ValueKind`].
#[derive(Debug, Clone)]
pub struct FieldValueParser {
    kind: ValueKind,
    choices: Option<Vec<String>>,
}

impl FieldValueParser {
    pub fn new(kind: ValueKind, choices: Option<Vec<String>>) -> Self {
        Self { kind, choices }
    }
}

impl TypedValueParser for FieldValueParser {
    type Value = Value;

    fn parse_ref(
        &self,
        cmd: &Command,
        arg: Option<&Arg>,
        value: &OsStr,
    ) -> std::result::Result<Value, clap::Error> {
        let Some(raw) = value.to_str() else {
            return Err(clap::Error::new(ErrorKind::InvalidUtf8).with_cmd(cmd));
        };
        self.kind.coerce(raw).map_err(|err| {
            let arg = arg
                .map(ToString::to_string)
                .unwrap_or_else(|| "...".to_string());
            clap::Error::raw(
                ErrorKind::ValueValidation,
                format!("invalid value '{raw}' for '{arg}': {err}\n"),
            )
            .with_cmd(cmd)
        })
    }

    fn possible_values(&self) -> Option<Box<dyn Iterator<Item = PossibleValue> + '_>> {
        let choices = self.choices.as_ref()?;
        Some(Box::new(
            choices.iter().map(|choice| PossibleValue::new(choice.clone())),
        ))
    }
}

/// A flag as registered, kept to read its value back after parsing.
#[derive(Debug, Clone)]
pub struct RegisteredFlag {
    pub long: String,
    pub dest: String,
    pub options: ParsingOptions,
}

#[derive(Debug, Clone)]
struct Group {
    title: String,
    description: Option<String>,
}

/// Collects clap arguments from registered schema trees.
#[derive(Debug, Default)]
pub struct ClapEngine {
    groups: Vec<Group>,
    args: Vec<Arg>,
    flags: Vec<RegisteredFlag>,
}

impl ClapEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags in registration order.
    pub fn flags(&self) -> &[RegisteredFlag] {
        &self.flags
    }

    /// Builds the clap command carrying every registered argument.
    ///
    /// Group descriptions are listed after the options since clap headings
    /// carry a title only.
    pub fn command(&self, name: &str, about: Option<&str>) -> Command {
        let mut cmd = Command::new(name.to_string())
            .args_override_self(true)
            .args(self.args.iter().cloned());
        if let Some(about) = about {
            cmd = cmd.about(about.to_string());
        }

        let described: Vec<String> = self
            .groups
            .iter()
            .filter_map(|group| {
                group
                    .description
                    .as_ref()
                    .map(|description| format!("{}:\n  {description}", group.title))
            })
            .collect();
        if !described.is_empty() {
            cmd = cmd.after_help(described.join("\n\n"));
        }
        cmd
    }

    /// Reads every flag back from `matches`, keyed by flag destination.
    ///
    /// Flags absent from the command line take their advertised default;
    /// flags with neither a value nor a default are left out.
    pub fn collect(&self, matches: &ArgMatches) -> Vec<(String, Value)> {
        let mut values = Vec::with_capacity(self.flags.len());
        for flag in &self.flags {
            let from_command_line = matches.value_source(&flag.dest) == Some(ValueSource::CommandLine);
            let value = if from_command_line {
                let mut parsed: Vec<Value> = matches
                    .get_many::<Value>(&flag.dest)
                    .map(|values| values.cloned().collect())
                    .unwrap_or_default();
                if flag.options.nargs.takes_many() {
                    Some(Value::Array(parsed))
                } else if parsed.is_empty() {
                    flag.options.missing_value.clone()
                } else {
                    Some(parsed.swap_remove(0))
                }
            } else {
                flag.options.default.clone()
            };

            trace!(dest = %flag.dest, ?value, from_command_line, "Collected flag value");
            if let Some(value) = value {
                values.push((flag.dest.clone(), value));
            }
        }
        values
    }
}

impl FlagRegistry for ClapEngine {
    type Error = ParseError;

    fn add_group(&mut self, title: &str, description: Option<&str>) -> GroupId {
        self.groups.push(Group {
            title: title.to_string(),
            description: description.map(String::from),
        });
        GroupId(self.groups.len() - 1)
    }

    fn add_flag(&mut self, group: GroupId, flag: FlagSpec) -> Result<()> {
        let long = flag.option.trim_start_matches('-').to_string();
        if long == "help" {
            return Err(ParseError::Conflict {
                option: flag.option,
                first: "help".to_string(),
                second: flag.dest,
            });
        }
        if let Some(existing) = self.flags.iter().find(|f| f.long == long) {
            return Err(ParseError::Conflict {
                option: flag.option,
                first: existing.dest.clone(),
                second: flag.dest,
            });
        }

        let heading = self
            .groups
            .get(group.0)
            .map(|g| g.title.clone())
            .unwrap_or_default();
        self.args.push(build_arg(&long, &flag, heading));
        self.flags.push(RegisteredFlag {
            long,
            dest: flag.dest,
            options: flag.options,
        });
        Ok(())
    }
}

fn build_arg(long: &str, flag: &FlagSpec, heading: String) -> Arg {
    let options = &flag.options;
    let mut arg = Arg::new(flag.dest.clone())
        .long(long.to_string())
        .action(ArgAction::Set)
        .value_name(options.kind.metavar())
        .value_parser(FieldValueParser::new(
            options.kind.clone(),
            options.choices.clone(),
        ))
        .required(options.required)
        .allow_negative_numbers(is_numeric(&options.kind))
        .help_heading(heading);

    arg = match options.nargs {
        Nargs::One => arg.num_args(1),
        Nargs::Optional => arg.num_args(0..=1),
        Nargs::ZeroOrMore => arg.num_args(0..),
        Nargs::OneOrMore => arg.num_args(1..),
    };
    if let Some(missing) = &options.missing_value {
        arg = arg.default_missing_value(render(missing));
    }

    let mut help = options.help.clone().unwrap_or_default();
    if let Some(default) = &options.default {
        if !help.is_empty() {
            help.push(' ');
        }
        help.push_str(&format!("[default: {}]", render(default)));
    }
    if !help.is_empty() {
        arg = arg.help(help);
    }
    arg
}

fn is_numeric(kind: &ValueKind) -> bool {
    match kind {
        ValueKind::Int | ValueKind::Float => true,
        ValueKind::List(item) | ValueKind::ListPerToken(item) => is_numeric(item),
        _ => false,
    }
}

/// Renders a value the way a user would type it.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}
