//! Interactive shell over the application state

use crate::view;
use app_core::{AppError, AppState, Command, CommandId, ErrorSink, LogSink, SortBy, SortOrder};
use drive_proto::{FileNode, GeneralAccess, Role, ANYONE_WITH_LINK_ID, ROOT_FOLDER_ID};
use std::io::Write as _;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Prints reported errors for the user and logs them
pub struct ConsoleSink;

impl ErrorSink for ConsoleSink {
    fn report(&self, error: &AppError) {
        LogSink.report(error);
        eprintln!("error: {}", error.user_message());
    }
}

/// What the loop does after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Redraw,
    Quit,
}

pub struct Shell<'a> {
    state: &'a AppState,
}

impl<'a> Shell<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Check the session and show My Drive
    pub async fn start(&self) {
        match self.state.refresh_session().await {
            Ok(session) if session.authenticated => {
                println!("Signed in as {}", session.display_name());
            }
            Ok(_) => println!("Not signed in. Run `login`, then restart with a session cookie."),
            Err(_) => {}
        }
        if self.state.refresh().await.is_ok() {
            self.redraw();
        }
    }

    /// Read commands from stdin until `quit` or end of input
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("{}> ", self.state.navigation.read().current().name);
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                println!();
                break;
            };
            if self.execute_line(&line).await == Flow::Quit {
                break;
            }
        }

        tracing::info!("Shell closed");
        Ok(())
    }

    /// Parse and run one line; errors are reported, never returned
    pub async fn run_line(&self, line: &str) {
        self.execute_line(line).await;
    }

    async fn execute_line(&self, line: &str) -> Flow {
        let aliases = self.state.config.read().aliases.clone();
        let cmd = match Command::parse(line, &aliases) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => return Flow::Continue,
            Err(e) => {
                self.state.errors().report(&e);
                return Flow::Continue;
            }
        };

        // Operations report their own failures
        match self.execute_command(&cmd).await {
            Ok(Flow::Redraw) => {
                self.redraw();
                Flow::Continue
            }
            Ok(flow) => flow,
            Err(e) => {
                tracing::debug!("Command {} failed: {}", cmd.id.as_str(), e);
                self.state.note_failure(&e);
                if !e.is_validation() {
                    self.redraw();
                }
                Flow::Continue
            }
        }
    }

    fn redraw(&self) {
        println!("{}", view::render_listing(self.state));
        let panel = view::render_sharing(&self.state.sharing().state().read());
        if !panel.is_empty() {
            print!("{}", panel);
        }
    }

    /// Report a usage problem that no operation saw
    fn usage(&self, message: &str) -> AppError {
        let error = AppError::Usage(message.to_string());
        self.state.errors().report(&error);
        error
    }

    fn required<'c>(&self, cmd: &'c Command, index: usize, what: &str) -> Result<&'c str, AppError> {
        cmd.arg(index)
            .ok_or_else(|| self.usage(&format!("{} needs {}", cmd.id.as_str(), what)))
    }

    fn resolve(&self, key: &str) -> Result<FileNode, AppError> {
        let found = self.state.listing.read().find(key).cloned();
        found.ok_or_else(|| {
            let error = AppError::Selection(format!("no item {:?} in this folder", key));
            self.state.errors().report(&error);
            error
        })
    }

    /// Destination folder id: a listed folder, `..` or `root`
    fn resolve_folder(&self, key: &str) -> Result<String, AppError> {
        match key {
            "root" | "/" => Ok(ROOT_FOLDER_ID.to_string()),
            ".." => {
                let parent = self.state.navigation.read().parent().map(|f| f.id.clone());
                parent.ok_or_else(|| self.usage("already at My Drive"))
            }
            _ => {
                let node = self.resolve(key)?;
                if node.is_folder() {
                    Ok(node.id)
                } else {
                    Err(self.usage(&format!("{} is not a folder", node.name)))
                }
            }
        }
    }

    /// Permission id: `link`, a 1-based position in the people list, an
    /// email, or the id itself
    fn resolve_person(&self, key: &str) -> Result<String, AppError> {
        if key.eq_ignore_ascii_case("link") {
            return Ok(ANYONE_WITH_LINK_ID.to_string());
        }

        let sharing = self.state.sharing().state().read();
        let mut people = sharing.people();
        let found = match key.parse::<usize>() {
            Ok(pos) if pos > 0 => people.nth(pos - 1),
            _ => people.find(|p| {
                p.id == key
                    || p
                        .email_address
                        .as_deref()
                        .map_or(false, |e| e.eq_ignore_ascii_case(key))
            }),
        }
        .map(|p| p.id.clone());
        drop(people);
        drop(sharing);

        found.ok_or_else(|| self.usage(&format!("no one matching {:?} has access", key)))
    }

    fn parse_role(&self, text: &str) -> Result<Role, AppError> {
        text.parse::<Role>().map_err(|e| self.usage(&e.to_string()))
    }

    async fn execute_command(&self, cmd: &Command) -> Result<Flow, AppError> {
        let state = self.state;
        tracing::debug!("Executing command: {} {:?}", cmd.id.as_str(), cmd.params.args);

        match cmd.id.as_str() {
            // ========================================
            // Navigation Commands (nav.*)
            // ========================================
            CommandId::NAV_ENTER => {
                let node = self.resolve(self.required(cmd, 0, "an item")?)?;
                state.open(&node).await?;
                Ok(if node.is_folder() { Flow::Redraw } else { Flow::Continue })
            }
            CommandId::NAV_BACK => {
                if !state.go_back().await? {
                    println!("Already at My Drive");
                    return Ok(Flow::Continue);
                }
                Ok(Flow::Redraw)
            }
            CommandId::NAV_CRUMB => {
                let index = self
                    .required(cmd, 0, "a breadcrumb number")?
                    .parse::<usize>()
                    .map_err(|_| self.usage("breadcrumb must be a number"))?;
                if !state.jump_to_breadcrumb(index).await? {
                    return Err(self.usage(&format!("no breadcrumb {}", index)));
                }
                Ok(Flow::Redraw)
            }
            CommandId::NAV_ROOT => {
                state.jump_to_breadcrumb(0).await?;
                Ok(Flow::Redraw)
            }
            CommandId::NAV_BREADCRUMBS => {
                println!("{}", view::render_breadcrumbs(&state.navigation.read()));
                Ok(Flow::Continue)
            }

            // ========================================
            // View Commands (view.*)
            // ========================================
            CommandId::VIEW_REFRESH => {
                state.refresh().await?;
                Ok(Flow::Redraw)
            }
            CommandId::VIEW_SORT => {
                let by = match self.required(cmd, 0, "a field")? {
                    "name" => SortBy::Name,
                    "size" => SortBy::Size,
                    "modified" | "date" => SortBy::Modified,
                    "type" => SortBy::Type,
                    other => return Err(self.usage(&format!("cannot sort by {:?}", other))),
                };
                let order = match cmd.arg(1) {
                    None | Some("asc") => SortOrder::Ascending,
                    Some("desc") => SortOrder::Descending,
                    Some(other) => return Err(self.usage(&format!("unknown order {:?}", other))),
                };
                state.set_sort(by, order);
                if let Err(e) = state.save_config() {
                    tracing::warn!("Failed to save configuration: {:#}", e);
                }
                Ok(Flow::Redraw)
            }

            // ========================================
            // Selection Commands (select.*)
            // ========================================
            CommandId::SELECT_MENU => {
                let node = self.resolve(self.required(cmd, 0, "an item")?)?;
                state.select_single(&node).await;
                Ok(Flow::Redraw)
            }
            CommandId::SELECT_TOGGLE => {
                self.required(cmd, 0, "at least one item")?;
                if !state.selection.read().is_menu_visible() {
                    return Err(self.usage("open the menu on an item first (menu <item>)"));
                }
                for key in &cmd.params.args {
                    let node = self.resolve(key)?;
                    state.toggle_select(&node).await;
                }
                Ok(Flow::Redraw)
            }
            CommandId::SELECT_CLEAR => {
                state.close_menu().await;
                Ok(Flow::Redraw)
            }

            // ========================================
            // File Commands (file.*)
            // ========================================
            CommandId::FILE_MOVE_TO => {
                let destination = self.resolve_folder(self.required(cmd, 0, "a destination folder")?)?;
                state.move_selected(&destination).await?;
                Ok(Flow::Redraw)
            }
            CommandId::FILE_DELETE => {
                state.delete_selected().await?;
                Ok(Flow::Redraw)
            }
            CommandId::FILE_COPY => {
                state.copy_selected().await?;
                Ok(Flow::Redraw)
            }
            CommandId::FILE_RENAME => {
                // An empty name is still sent through validation
                let name = cmd.rest(0).unwrap_or_default();
                state.rename_selected(&name).await?;
                Ok(Flow::Redraw)
            }
            CommandId::FILE_COPY_LINK => {
                let link = state.copy_link_selected().await?;
                println!("Copied {}", link);
                Ok(Flow::Redraw)
            }
            CommandId::FILE_CREATE_FOLDER => {
                let name = cmd.rest(0).unwrap_or_default();
                let created = state.create_folder(&name).await?;
                println!("Created {}", created.name);
                Ok(Flow::Redraw)
            }
            CommandId::FILE_UPLOAD => {
                let path = cmd.rest(0).ok_or_else(|| self.usage("upload needs a file path"))?;
                state.upload(Path::new(&path)).await?;
                Ok(Flow::Redraw)
            }

            // ========================================
            // Sharing Commands (share.*)
            // ========================================
            CommandId::SHARE_OPEN => {
                state.open_sharing().await?;
                Ok(Flow::Redraw)
            }
            CommandId::SHARE_CLOSE => {
                state.close_sharing();
                Ok(Flow::Redraw)
            }
            CommandId::SHARE_ADD_EMAIL => {
                self.required(cmd, 0, "an email address")?;
                for email in &cmd.params.args {
                    if !state.sharing().add_pending_email(email)? {
                        println!("{} is already queued", email);
                    }
                }
                Ok(Flow::Redraw)
            }
            CommandId::SHARE_REMOVE_EMAIL => {
                let email = self.required(cmd, 0, "an email address")?;
                if !state.sharing().remove_pending_email(email) {
                    return Err(self.usage(&format!("{} is not queued", email)));
                }
                Ok(Flow::Redraw)
            }
            CommandId::SHARE_INVITE_ROLE => {
                let role = self.parse_role(self.required(cmd, 0, "a role")?)?;
                if role == Role::Owner {
                    return Err(self.usage("ownership cannot be given by invitation"));
                }
                state.sharing().set_invite_role(role);
                Ok(Flow::Redraw)
            }
            CommandId::SHARE_SEND => {
                state.sharing().share_pending().await?;
                Ok(Flow::Redraw)
            }
            CommandId::SHARE_SET_ROLE => {
                let person = self.resolve_person(self.required(cmd, 0, "a person")?)?;
                let role = self.parse_role(self.required(cmd, 1, "a role")?)?;
                state.sharing().change_role(&person, role).await?;
                Ok(Flow::Redraw)
            }
            CommandId::SHARE_REMOVE_ACCESS => {
                let person = self.resolve_person(self.required(cmd, 0, "a person")?)?;
                state.sharing().remove_access(&person).await?;
                Ok(Flow::Redraw)
            }
            CommandId::SHARE_GENERAL_ACCESS => {
                let access = self
                    .required(cmd, 0, "restricted or anyone")?
                    .parse::<GeneralAccess>()
                    .map_err(|e| self.usage(&e.to_string()))?;
                let link_role = match cmd.arg(1) {
                    Some(text) => self.parse_role(text)?,
                    None => state.sharing().state().read().link_role(),
                };
                state.sharing().set_general_access(access, link_role).await?;
                Ok(Flow::Redraw)
            }

            // ========================================
            // App Commands (app.*)
            // ========================================
            CommandId::APP_WHOAMI => {
                let session = state.refresh_session().await?;
                match session.email() {
                    Some(email) => println!("{} <{}>", session.display_name(), email),
                    None => println!("Not signed in"),
                }
                Ok(Flow::Continue)
            }
            CommandId::APP_LOGIN => {
                let url = state.login()?;
                println!("Sign in at {}", url);
                Ok(Flow::Continue)
            }
            CommandId::APP_LOGOUT => {
                state.logout().await?;
                println!("Signed out");
                Ok(Flow::Continue)
            }
            CommandId::APP_HELP => {
                println!("{}", view::HELP);
                Ok(Flow::Continue)
            }
            CommandId::APP_QUIT => Ok(Flow::Quit),

            other => Err(self.usage(&format!("{} is not implemented", other))),
        }
    }
}
