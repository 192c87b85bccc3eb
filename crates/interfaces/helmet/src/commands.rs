use camino::Utf8PathBuf;
use helmet_core::{SettingsKey, UnknownSettingsKey};

pub const HELP: &str = "\
Commands:
  list                    show scenarios in the project folder
  run [NAME ...]          run the named scenarios, or all of them
  cancel                  stop the running scenarios
  settings                show the current settings
  set KEY PATH            change a setting (emme_python_path, helmet_scripts_path, project_path)
  unset KEY               clear a setting
  help                    show this text
  quit                    close the application";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    List,
    Run(Vec<String>),
    Cancel,
    Settings,
    Set(SettingsKey, Option<Utf8PathBuf>),
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unbalanced quotes")]
    Unbalanced,
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error(transparent)]
    Key(#[from] UnknownSettingsKey),
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<UiCommand>, ParseError> {
    let words = split_words(line).ok_or(ParseError::Unbalanced)?;
    let Some((head, rest)) = words.split_first() else {
        return Ok(None);
    };

    let cmd = match (head.as_str(), rest) {
        ("list" | "ls", []) => UiCommand::List,
        ("run", names) => UiCommand::Run(names.to_vec()),
        ("cancel", []) => UiCommand::Cancel,
        ("settings", []) => UiCommand::Settings,
        ("set", [key, path]) => UiCommand::Set(key.parse()?, Some(Utf8PathBuf::from(path))),
        ("set", _) => return Err(ParseError::Usage("set KEY PATH")),
        ("unset", [key]) => UiCommand::Set(key.parse()?, None),
        ("unset", _) => return Err(ParseError::Usage("unset KEY")),
        ("help" | "?", _) => UiCommand::Help,
        ("quit" | "exit", []) => UiCommand::Quit,
        (other, _) => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(Some(cmd))
}

#[cfg(not(target_os = "windows"))]
fn split_words(line: &str) -> Option<Vec<String>> {
    shlex::split(line)
}

#[cfg(target_os = "windows")]
fn split_words(line: &str) -> Option<Vec<String>> {
    split_quoted(line)
}

/// Whitespace-separated words where a double-quoted span is one word, kept verbatim.
/// Backslashes are path separators on Windows, so they escape nothing.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn split_quoted(line: &str) -> Option<Vec<String>> {
    if line.matches('"').count() % 2 == 1 {
        return None;
    }
    let mut words = Vec::new();
    for (i, span) in line.split('"').enumerate() {
        if i % 2 == 1 {
            words.push(span.to_string());
        } else {
            words.extend(span.split_whitespace().map(str::to_string));
        }
    }
    Some(words)
}
