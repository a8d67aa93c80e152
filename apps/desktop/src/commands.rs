//! Parsing of console input into controller actions.
//!
//! Lines starting with `/` are commands; anything else is a chat question.

use std::path::PathBuf;

use shared::domain::MessageId;

pub const HELP_TEXT: &str = "\
Commands:
  /add <file.pdf>...   select PDF files (quote paths containing spaces)
  /remove <n>          drop the n-th selected file
  /files               list selected files
  /analyze             upload the selected files and index them
  /sources [id]        expand or collapse the sources of a reply (default: latest)
  /info                show backend model parameters
  /help                show this text
  /quit                exit
Any other input is sent as a question once analysis has completed.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(Vec<PathBuf>),
    Remove(usize),
    Files,
    Analyze,
    Ask(String),
    Sources(Option<MessageId>),
    Info,
    Help,
    Quit,
    Empty,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Ask(line.to_string()));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    match name.to_ascii_lowercase().as_str() {
        "add" | "a" => {
            let paths = split_args(args)?;
            if paths.is_empty() {
                return Err("usage: /add <file.pdf>...".to_string());
            }
            Ok(Command::Add(paths.into_iter().map(PathBuf::from).collect()))
        }
        "remove" | "rm" => {
            let position: usize = args
                .parse()
                .map_err(|_| "usage: /remove <n> (as listed by /files)".to_string())?;
            if position == 0 {
                return Err("file positions start at 1".to_string());
            }
            Ok(Command::Remove(position - 1))
        }
        "files" | "ls" => Ok(Command::Files),
        "analyze" => Ok(Command::Analyze),
        "sources" | "s" => {
            if args.is_empty() {
                return Ok(Command::Sources(None));
            }
            let id = args
                .trim_start_matches('#')
                .parse::<i64>()
                .map_err(|_| "usage: /sources [message id]".to_string())?;
            Ok(Command::Sources(Some(MessageId(id))))
        }
        "info" => Ok(Command::Info),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("unknown command '/{other}', try /help")),
    }
}

/// Whitespace-separated arguments with double-quote grouping.
fn split_args(input: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if in_quotes {
        return Err("unterminated quote".to_string());
    }
    if has_token {
        args.push(current);
    }
    Ok(args)
}
