//! Command system for user actions

use crate::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Command identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandId(pub String);

impl CommandId {
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // Navigation commands
    pub const NAV_ENTER: &'static str = "nav.enter";
    pub const NAV_BACK: &'static str = "nav.back";
    pub const NAV_CRUMB: &'static str = "nav.crumb";
    pub const NAV_ROOT: &'static str = "nav.root";
    pub const NAV_BREADCRUMBS: &'static str = "nav.breadcrumbs";

    // View commands
    pub const VIEW_REFRESH: &'static str = "view.refresh";
    pub const VIEW_SORT: &'static str = "view.sort";

    // Selection commands
    pub const SELECT_MENU: &'static str = "select.menu";
    pub const SELECT_TOGGLE: &'static str = "select.toggle";
    pub const SELECT_CLEAR: &'static str = "select.clear";

    // File commands
    pub const FILE_MOVE_TO: &'static str = "file.move_to";
    pub const FILE_DELETE: &'static str = "file.delete";
    pub const FILE_COPY: &'static str = "file.copy";
    pub const FILE_RENAME: &'static str = "file.rename";
    pub const FILE_COPY_LINK: &'static str = "file.copy_link";
    pub const FILE_CREATE_FOLDER: &'static str = "file.create_folder";
    pub const FILE_UPLOAD: &'static str = "file.upload";

    // Sharing commands
    pub const SHARE_OPEN: &'static str = "share.open";
    pub const SHARE_CLOSE: &'static str = "share.close";
    pub const SHARE_ADD_EMAIL: &'static str = "share.add_email";
    pub const SHARE_REMOVE_EMAIL: &'static str = "share.remove_email";
    pub const SHARE_INVITE_ROLE: &'static str = "share.invite_role";
    pub const SHARE_SEND: &'static str = "share.send";
    pub const SHARE_SET_ROLE: &'static str = "share.set_role";
    pub const SHARE_REMOVE_ACCESS: &'static str = "share.remove_access";
    pub const SHARE_GENERAL_ACCESS: &'static str = "share.general_access";

    // App commands
    pub const APP_WHOAMI: &'static str = "app.whoami";
    pub const APP_LOGIN: &'static str = "app.login";
    pub const APP_LOGOUT: &'static str = "app.logout";
    pub const APP_HELP: &'static str = "app.help";
    pub const APP_QUIT: &'static str = "app.quit";
}

/// Command with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub id: CommandId,
    pub params: CommandParams,
}

/// Command parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandParams {
    pub args: Vec<String>,
}

impl Command {
    pub fn new(id: &str) -> Self {
        Self {
            id: CommandId::new(id),
            params: CommandParams::default(),
        }
    }

    pub fn with_arg(mut self, value: &str) -> Self {
        self.params.args.push(value.to_string());
        self
    }

    /// Positional argument
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.params.args.get(index).map(String::as_str)
    }

    /// All arguments joined back with single spaces
    pub fn rest(&self, from: usize) -> Option<String> {
        let rest = self.params.args.get(from..)?;
        if rest.is_empty() {
            None
        } else {
            Some(rest.join(" "))
        }
    }

    /// Parse a shell line. `Ok(None)` for blank lines.
    ///
    /// The first word is looked up in `aliases`; a full command id such as
    /// `file.rename` is accepted as-is.
    pub fn parse(line: &str, aliases: &HashMap<String, String>) -> Result<Option<Self>, AppError> {
        let mut words = tokenize(line)?.into_iter();
        let Some(head) = words.next() else {
            return Ok(None);
        };

        let id = match aliases.get(&head) {
            Some(id) => id.clone(),
            None if aliases.values().any(|id| *id == head) => head,
            None => return Err(AppError::Command(head)),
        };

        Ok(Some(Self {
            id: CommandId(id),
            params: CommandParams {
                args: words.collect(),
            },
        }))
    }
}

/// Split a line into words. Single or double quotes group words.
/// A backslash escapes a quote, whitespace or another backslash and is
/// kept literally anywhere else, so `a\b` stays `a\b`.
pub fn tokenize(line: &str) -> Result<Vec<String>, AppError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (_, '\\') => {
                in_word = true;
                match chars.peek() {
                    Some(&next) if matches!(next, '\\' | '"' | '\'') || next.is_whitespace() => {
                        current.push(next);
                        chars.next();
                    }
                    _ => current.push('\\'),
                }
            }
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err(AppError::Command(format!("unterminated quote in {:?}", line)));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
