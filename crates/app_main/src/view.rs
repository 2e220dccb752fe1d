//! Text rendering of the listing, breadcrumbs and sharing panel

use app_core::{
    format_size, AppState, BatchReport, NavigationState, SelectionState, SharingPhase,
    SharingState,
};
use chrono::Local;
use drive_proto::{FileNode, PermissionEntry};
use std::fmt::Write;

const NAME_WIDTH: usize = 40;

/// One listing row: `*  3  [D] Name ... size  modified`
pub fn format_row(index: usize, node: &FileNode, selected: bool, date_format: &str) -> String {
    let marker = if selected { '*' } else { ' ' };
    let kind = if node.is_folder() { "[D]" } else { "   " };
    let size = if node.is_folder() {
        String::new()
    } else {
        format_size(node.size)
    };
    let modified = node
        .modified_time
        .map(|t| t.with_timezone(&Local).format(date_format).to_string())
        .unwrap_or_default();

    format!(
        "{}{:>4}  {} {:<width$} {:>10}  {}",
        marker,
        index,
        kind,
        truncate(&node.name, NAME_WIDTH),
        size,
        modified,
        width = NAME_WIDTH
    )
    .trim_end()
    .to_string()
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let mut cut: String = name.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

/// Numbered trail; the current folder is marked with `>`
pub fn render_breadcrumbs(nav: &NavigationState) -> String {
    let mut out = String::new();
    for (i, crumb) in nav.stack().iter().enumerate() {
        let _ = writeln!(out, "  [{}] {}", i + 1, crumb.name);
    }
    let _ = writeln!(out, "  >   {}", nav.current().name);
    out.push_str("  (crumb 0 returns to My Drive)");
    out
}

pub fn render_listing(state: &AppState) -> String {
    let date_format = state.config.read().filer.date_format.clone();
    let nav = state.navigation.read();
    let selection = state.selection.read();
    let listing = state.listing.read();

    let mut out = String::new();
    let _ = writeln!(out, "{}", nav.path_display());

    if listing.is_loading() {
        out.push_str("  (loading...)\n");
    }
    if let Some(err) = listing.last_error() {
        let _ = writeln!(out, "  (last refresh failed: {})", err);
    }
    if listing.files().is_empty() {
        out.push_str("  (empty)\n");
    }
    for (i, node) in listing.files().iter().enumerate() {
        let _ = writeln!(
            out,
            "{}",
            format_row(i + 1, node, selection.is_selected(&node.id), &date_format)
        );
    }

    out.push_str(&render_menu(&selection));
    out
}

fn render_menu(selection: &SelectionState) -> String {
    if !selection.is_menu_visible() {
        return String::new();
    }
    let mut out = format!("-- {} selected: ", selection.len());
    if selection.single().is_some() {
        out.push_str("mv <folder> | rm | cp | rename <name> | link | share | clear");
    } else {
        out.push_str("mv <folder> | rm | cp | share | clear");
    }
    out
}

fn format_person(index: usize, entry: &PermissionEntry, me: Option<&str>) -> String {
    let mut line = format!("  {:>2}. {}", index, entry.display_name);
    if let Some(email) = &entry.email_address {
        let _ = write!(line, " <{}>", email);
    }
    let _ = write!(line, "  {}", entry.role);
    if me == Some(entry.id.as_str()) {
        line.push_str(" (you)");
    }
    line
}

fn render_report(report: &BatchReport) -> String {
    if report.is_success() {
        return format!("  Last action: {} request(s) succeeded", report.total());
    }
    let mut out = format!(
        "  Last action: {} of {} request(s) failed",
        report.failed.len(),
        report.total()
    );
    for (target, message) in &report.failed {
        let _ = write!(out, "\n    {} on {}: {}", target.subject, target.file_id, message);
    }
    out
}

pub fn render_sharing(sharing: &SharingState) -> String {
    let mut out = String::new();
    let Some(first) = sharing.items().first() else {
        return out;
    };

    let _ = write!(out, "Sharing {}", first.name);
    if sharing.items().len() > 1 {
        let _ = write!(out, " (+{} more)", sharing.items().len() - 1);
    }
    out.push('\n');

    match sharing.phase() {
        SharingPhase::Idle => {}
        SharingPhase::Loading => out.push_str("  (loading permissions...)\n"),
        SharingPhase::Error(message) => {
            let _ = writeln!(out, "  Could not load permissions: {}", message);
        }
        SharingPhase::Ready => {
            if let Some(role) = sharing.current_user_role() {
                let _ = writeln!(out, "  Your role: {}", role);
            }
            out.push_str("  People with access:\n");
            for (i, entry) in sharing.people().enumerate() {
                let _ = writeln!(
                    out,
                    "{}",
                    format_person(i + 1, entry, sharing.current_user_id())
                );
            }
            let _ = writeln!(
                out,
                "  General access: {} ({})",
                sharing.general_access(),
                sharing.link_role()
            );
        }
    }

    if !sharing.pending_emails().is_empty() {
        let _ = writeln!(
            out,
            "  Invite as {}: {}",
            sharing.invite_role(),
            sharing.pending_emails().join(", ")
        );
    }
    if let Some(report) = sharing.last_report() {
        out.push_str(&render_report(report));
        out.push('\n');
    }
    out
}

pub const HELP: &str = "\
Navigation
  cd <item>            open a folder, or a file in the browser
  back | ..            parent folder
  crumb <n>            jump to breadcrumb n (0 = My Drive)
  home                 back to My Drive
  pwd                  show breadcrumbs
View
  ls | refresh         reload the current folder
  sort <field> [asc|desc]   name, size, modified or type
Selection
  menu <item>          select one item and show the action menu
  sel <item>...        add or remove items while the menu is shown
  clear                close the menu
Files (act on the selection)
  mv <folder>          move into a listed folder, `..` or `root`
  rm | cp              delete or duplicate
  rename <name>        rename the selected item
  link                 copy its link to the clipboard
  mkdir <name>         create a folder here
  upload <path>        upload a local file here
Sharing (act on the selection)
  share | unshare      show or hide the sharing panel
  invite <email>...    queue invitees;  uninvite <email>
  as <role>            role for invitees (viewer, commenter, writer)
  send                 share with every queued address
  perm <person> <role> change someone's role
  revoke <person>      remove someone's access (`link` for the link)
  access <restricted|anyone> [role]
Session
  whoami | login | logout | help | quit
Items are addressed by number, exact name or id.";
