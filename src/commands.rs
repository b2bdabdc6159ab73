//! Available commands and autocomplete logic

use crate::routes::Route;

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  /// Hidden unless running in development mode
  pub dev_only: bool,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "todos",
    aliases: &["t", "list", "home"],
    description: "Show the todo list",
    dev_only: false,
  },
  Command {
    name: "add",
    aliases: &["a", "new"],
    description: "Add a new todo",
    dev_only: false,
  },
  Command {
    name: "open",
    aliases: &["o", "go"],
    description: "Open a todo by id or path (open 5, open /todos/5)",
    dev_only: false,
  },
  Command {
    name: "refresh",
    aliases: &["r", "reload"],
    description: "Refetch the current view",
    dev_only: false,
  },
  Command {
    name: "cache",
    aliases: &["c", "devtools"],
    description: "Toggle the cache inspector",
    dev_only: true,
  },
  Command {
    name: "crash",
    aliases: &["test-error"],
    description: "Open a view that fails to render",
    dev_only: false,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit todos",
    dev_only: false,
  },
];

/// A palette input resolved to something the app can act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  Navigate(Route),
  Add,
  Refresh,
  ToggleCache,
  Quit,
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str, dev: bool) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();
  let visible = COMMANDS.iter().filter(|cmd| dev || !cmd.dev_only);

  if input_lower.is_empty() {
    return visible.collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in visible {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0)); // Highest priority
      continue;
    }

    // Exact match on alias
    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    // Prefix match on name
    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    // Prefix match on alias
    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy match (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    // Fuzzy match on alias
    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Resolve `name [arg]` to an action. The command word may be any prefix or
/// alias that autocomplete would rank first.
pub fn parse(input: &str, dev: bool) -> Option<Action> {
  let input = input.trim();
  // A bare path is shorthand for `open <path>`
  if input.starts_with('/') {
    return Some(Action::Navigate(Route::parse(input)));
  }

  let (word, arg) = match input.split_once(char::is_whitespace) {
    Some((word, arg)) => (word, arg.trim()),
    None => (input, ""),
  };
  if word.is_empty() {
    return None;
  }
  let command = get_suggestions(word, dev).into_iter().next()?;

  let action = match command.name {
    "todos" => Action::Navigate(Route::List),
    "add" => Action::Add,
    "open" if arg.is_empty() => return None,
    "open" => Action::Navigate(Route::from_arg(arg)),
    "refresh" => Action::Refresh,
    "cache" => Action::ToggleCache,
    "crash" => Action::Navigate(Route::CrashTest),
    "quit" => Action::Quit,
    _ => return None,
  };
  Some(action)
}
