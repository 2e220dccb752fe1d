//! Sharing panel state
//!
//! Follows the selected items while the panel is open:
//! - Idle: panel closed, nothing held
//! - Loading: role and permission list requested together
//! - Ready: permissions, general access and link role populated
//! - Error: the load failed; the rest of the app is unaffected
//!
//! Mutations fan out over every selected item, then refetch the
//! permission list. Changing general access is the exception: the
//! `anyoneWithLink` entry is synthesized locally once the backend confirms.

use crate::validation::validate_email;
use crate::{AppError, ErrorSink};
use app_api::{ApiError, DriveApi};
use drive_proto::{FileNode, GeneralAccess, PermissionEntry, PermissionList, Role};
use futures::future::join_all;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SharingPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Error(String),
}

/// One call of a fanned-out sharing action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTarget {
    pub file_id: String,
    /// Invitee email or permission id
    pub subject: String,
}

impl BatchTarget {
    fn new(file_id: &str, subject: &str) -> Self {
        Self {
            file_id: file_id.to_string(),
            subject: subject.to_string(),
        }
    }
}

/// Per-call outcome of a fanned-out action
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: Vec<BatchTarget>,
    pub failed: Vec<(BatchTarget, String)>,
}

impl BatchReport {
    /// Pair each target with its result; also hands back the first error
    fn collect(
        targets: Vec<BatchTarget>,
        results: Vec<Result<(), ApiError>>,
    ) -> (Self, Option<ApiError>) {
        let mut report = Self::default();
        let mut first_error = None;
        for (target, result) in targets.into_iter().zip(results) {
            match result {
                Ok(()) => report.succeeded.push(target),
                Err(e) => {
                    report.failed.push((target, e.to_string()));
                    first_error.get_or_insert(e);
                }
            }
        }
        (report, first_error)
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Subjects with at least one failed call, first-seen order
    pub fn failed_subjects(&self) -> Vec<String> {
        let mut subjects: Vec<String> = Vec::new();
        for (target, _) in &self.failed {
            if !subjects.contains(&target.subject) {
                subjects.push(target.subject.clone());
            }
        }
        subjects
    }

    /// Collapse into a single error. A lone call keeps its own error.
    fn outcome(&self, first_error: Option<ApiError>) -> Result<(), AppError> {
        let Some(error) = first_error else {
            return Ok(());
        };
        if self.total() == 1 {
            return Err(error.into());
        }
        Err(AppError::PartialBatch {
            failed: self.failed.len(),
            total: self.total(),
            first: error.to_string(),
        })
    }
}

/// Everything the sharing panel shows
#[derive(Debug, Clone)]
pub struct SharingState {
    generation: u64,
    items: Vec<FileNode>,
    phase: SharingPhase,
    pending_emails: Vec<String>,
    invite_role: Role,
    permissions: Vec<PermissionEntry>,
    current_user_role: Option<Role>,
    current_user_id: Option<String>,
    general_access: GeneralAccess,
    link_role: Role,
    last_report: Option<BatchReport>,
}

impl SharingState {
    pub fn new(invite_role: Role) -> Self {
        Self {
            generation: 0,
            items: Vec::new(),
            phase: SharingPhase::Idle,
            pending_emails: Vec::new(),
            invite_role,
            permissions: Vec::new(),
            current_user_role: None,
            current_user_id: None,
            general_access: GeneralAccess::Restricted,
            link_role: Role::Viewer,
            last_report: None,
        }
    }

    pub fn phase(&self) -> &SharingPhase {
        &self.phase
    }

    pub fn is_active(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn items(&self) -> &[FileNode] {
        &self.items
    }

    pub fn pending_emails(&self) -> &[String] {
        &self.pending_emails
    }

    pub fn invite_role(&self) -> Role {
        self.invite_role
    }

    /// Full permission list, including the link entry
    pub fn permissions(&self) -> &[PermissionEntry] {
        &self.permissions
    }

    /// Named people with access; the link entry is left out
    pub fn people(&self) -> impl Iterator<Item = &PermissionEntry> {
        self.permissions.iter().filter(|p| !p.is_link_entry())
    }

    pub fn current_user_role(&self) -> Option<Role> {
        self.current_user_role
    }

    pub fn current_user_id(&self) -> Option<&str> {
        self.current_user_id.as_deref()
    }

    pub fn general_access(&self) -> GeneralAccess {
        self.general_access
    }

    pub fn link_role(&self) -> Role {
        self.link_role
    }

    pub fn last_report(&self) -> Option<&BatchReport> {
        self.last_report.as_ref()
    }

    fn same_items(&self, items: &[FileNode]) -> bool {
        self.items.len() == items.len()
            && self.items.iter().zip(items).all(|(a, b)| a.id == b.id)
    }

    /// Clear everything and start tracking `items`
    fn reset_for(&mut self, items: &[FileNode]) {
        let invite_role = self.invite_role;
        let generation = self.generation + 1;
        *self = Self::new(invite_role);
        self.generation = generation;
        self.items = items.to_vec();
        if !items.is_empty() {
            self.phase = SharingPhase::Loading;
        }
    }

    /// Apply a role + permission fetch started at `generation`.
    /// Returns false if the items changed since.
    fn finish_load(
        &mut self,
        generation: u64,
        result: Result<(Role, PermissionList), String>,
    ) -> bool {
        if generation != self.generation {
            tracing::debug!(
                "Dropping permission load for generation {} (now {})",
                generation,
                self.generation
            );
            return false;
        }

        match result {
            Ok((role, list)) => {
                let link = list.people_with_access.iter().find(|p| p.is_link_entry());
                self.general_access = if link.is_some() {
                    GeneralAccess::AnyoneWithLink
                } else {
                    GeneralAccess::Restricted
                };
                self.link_role = link.map(|p| p.role).unwrap_or(Role::Viewer);
                self.current_user_role = Some(role);
                self.current_user_id = list.current_user_id;
                self.permissions = list.people_with_access;
                self.phase = SharingPhase::Ready;
            }
            Err(message) => {
                self.permissions.clear();
                self.phase = SharingPhase::Error(message);
            }
        }
        true
    }

    /// Replace the synthetic link entry to match `access`
    fn patch_general_access(&mut self, access: GeneralAccess, link_role: Role) {
        self.permissions.retain(|p| !p.is_link_entry());
        if access == GeneralAccess::AnyoneWithLink {
            self.permissions.push(PermissionEntry::anyone_with_link(link_role));
        }
        self.general_access = access;
        self.link_role = link_role;
        self.phase = SharingPhase::Ready;
    }
}

/// Drives [`SharingState`] against the backend
pub struct SharingController {
    api: Arc<dyn DriveApi>,
    errors: Arc<dyn ErrorSink>,
    state: Arc<RwLock<SharingState>>,
}

impl SharingController {
    pub fn new(
        api: Arc<dyn DriveApi>,
        errors: Arc<dyn ErrorSink>,
        state: Arc<RwLock<SharingState>>,
    ) -> Self {
        Self { api, errors, state }
    }

    pub fn state(&self) -> &Arc<RwLock<SharingState>> {
        &self.state
    }

    fn reject(&self, error: AppError) -> AppError {
        self.errors.report(&error);
        error
    }

    /// Track a new item set. Returns true when the state was reset and
    /// needs a [`load`](Self::load).
    pub fn follow_selection(&self, items: &[FileNode]) -> bool {
        let mut state = self.state.write();
        if state.same_items(items) {
            return false;
        }
        state.reset_for(items);
        !items.is_empty()
    }

    /// Drop all sharing state
    pub fn close(&self) {
        self.follow_selection(&[]);
    }

    /// Fetch role and permissions for the first tracked item
    pub async fn load(&self) -> Result<(), AppError> {
        let (generation, file_id) = {
            let mut state = self.state.write();
            let Some(first) = state.items.first() else {
                return Ok(());
            };
            let file_id = first.id.clone();
            state.phase = SharingPhase::Loading;
            (state.generation, file_id)
        };

        tracing::debug!("Loading permissions for {}", file_id);
        let result = tokio::try_join!(self.api.user_role(&file_id), self.api.permissions(&file_id));

        match result {
            Ok(loaded) => {
                self.state.write().finish_load(generation, Ok(loaded));
                Ok(())
            }
            Err(e) => {
                let applied = self.state.write().finish_load(generation, Err(e.to_string()));
                let error = AppError::from(e);
                if applied {
                    self.errors.report(&error);
                }
                Err(error)
            }
        }
    }

    /// Item ids to act on, once the acting user is allowed to
    fn guard(&self) -> Result<Vec<String>, AppError> {
        let state = self.state.read();
        if state.items.is_empty() {
            return Err(AppError::Selection("Nothing selected to share".into()));
        }
        match state.current_user_role {
            Some(role) if role.can_manage_sharing() => {
                Ok(state.items.iter().map(|f| f.id.clone()).collect())
            }
            Some(role) => Err(AppError::NotPermitted(format!(
                "a {} cannot change sharing",
                role
            ))),
            None => Err(AppError::NotPermitted("permissions are not loaded".into())),
        }
    }

    fn begin_mutation(&self) -> Result<(u64, Vec<String>), AppError> {
        let file_ids = self.guard().map_err(|e| self.reject(e))?;
        let mut state = self.state.write();
        state.phase = SharingPhase::Loading;
        Ok((state.generation, file_ids))
    }

    /// Record the report, refetch, and surface the aggregate outcome.
    /// If the tracked items changed meanwhile, the panel is left to the
    /// new selection's own load.
    async fn finish_mutation(
        &self,
        action: &str,
        generation: u64,
        report: BatchReport,
        first_error: Option<ApiError>,
    ) -> Result<BatchReport, AppError> {
        if report.is_success() {
            tracing::info!("{}: {} request(s) succeeded", action, report.total());
        } else {
            tracing::warn!(
                "{}: {} of {} request(s) failed",
                action,
                report.failed.len(),
                report.total()
            );
        }
        let still_tracked = {
            let mut state = self.state.write();
            let current = state.generation == generation;
            if current {
                state.last_report = Some(report.clone());
            }
            current
        };

        if !still_tracked {
            tracing::debug!("Selection changed during {}; not reloading", action);
        } else if let Err(e) = self.load().await {
            tracing::debug!("Permission reload after {} failed: {}", action, e);
        }

        match report.outcome(first_error) {
            Ok(()) => Ok(report),
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Queue an invitee. Returns false if the address was already queued.
    pub fn add_pending_email(&self, input: &str) -> Result<bool, AppError> {
        let email = validate_email(input).map_err(|e| self.reject(e))?;
        let mut state = self.state.write();
        if state.pending_emails.contains(&email) {
            return Ok(false);
        }
        state.pending_emails.push(email);
        Ok(true)
    }

    pub fn remove_pending_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        let mut state = self.state.write();
        let before = state.pending_emails.len();
        state.pending_emails.retain(|e| *e != email);
        state.pending_emails.len() != before
    }

    pub fn set_invite_role(&self, role: Role) {
        self.state.write().invite_role = role;
    }

    /// Share every tracked item with every pending email.
    /// Addresses that failed for any item stay pending.
    pub async fn share_pending(&self) -> Result<BatchReport, AppError> {
        let (emails, role) = {
            let state = self.state.read();
            (state.pending_emails.clone(), state.invite_role)
        };
        if emails.is_empty() {
            return Err(self.reject(AppError::InvalidEmail(
                "no email addresses to share with".into(),
            )));
        }
        let (generation, file_ids) = self.begin_mutation()?;

        let targets: Vec<BatchTarget> = file_ids
            .iter()
            .flat_map(|id| emails.iter().map(move |email| BatchTarget::new(id, email)))
            .collect();
        tracing::info!(
            "Sharing {} item(s) with {} address(es) as {}",
            file_ids.len(),
            emails.len(),
            role
        );
        let results = join_all(
            targets
                .iter()
                .map(|t| self.api.share(&t.file_id, &t.subject, role)),
        )
        .await;
        let (report, first_error) = BatchReport::collect(targets, results);

        {
            let mut state = self.state.write();
            if state.generation == generation {
                state.pending_emails = report.failed_subjects();
            }
        }

        self.finish_mutation("Share", generation, report, first_error).await
    }

    /// Change one person's role on every tracked item
    pub async fn change_role(&self, permission_id: &str, role: Role) -> Result<BatchReport, AppError> {
        if permission_id == drive_proto::ANYONE_WITH_LINK_ID {
            return self.set_general_access(GeneralAccess::AnyoneWithLink, role).await;
        }
        let (generation, file_ids) = self.begin_mutation()?;

        let targets: Vec<BatchTarget> = file_ids
            .iter()
            .map(|id| BatchTarget::new(id, permission_id))
            .collect();
        let results = join_all(
            targets
                .iter()
                .map(|t| self.api.update_permission(&t.file_id, &t.subject, role)),
        )
        .await;

        let (report, first_error) = BatchReport::collect(targets, results);
        self.finish_mutation("Change role", generation, report, first_error).await
    }

    /// Revoke one person's access on every tracked item
    pub async fn remove_access(&self, permission_id: &str) -> Result<BatchReport, AppError> {
        if permission_id == drive_proto::ANYONE_WITH_LINK_ID {
            let link_role = self.state.read().link_role;
            return self.set_general_access(GeneralAccess::Restricted, link_role).await;
        }
        let (generation, file_ids) = self.begin_mutation()?;

        let targets: Vec<BatchTarget> = file_ids
            .iter()
            .map(|id| BatchTarget::new(id, permission_id))
            .collect();
        let results = join_all(
            targets
                .iter()
                .map(|t| self.api.remove_permission(&t.file_id, &t.subject)),
        )
        .await;

        let (report, first_error) = BatchReport::collect(targets, results);
        self.finish_mutation("Remove access", generation, report, first_error).await
    }

    /// Switch link sharing on every tracked item. On full success the
    /// link entry is patched in place; any failure refetches instead.
    pub async fn set_general_access(
        &self,
        access: GeneralAccess,
        link_role: Role,
    ) -> Result<BatchReport, AppError> {
        let (generation, file_ids) = self.begin_mutation()?;

        let targets: Vec<BatchTarget> = file_ids
            .iter()
            .map(|id| BatchTarget::new(id, access.as_str()))
            .collect();
        let results = join_all(
            targets
                .iter()
                .map(|t| self.api.set_general_access(&t.file_id, access, link_role)),
        )
        .await;
        let (report, first_error) = BatchReport::collect(targets, results);

        if !report.is_success() {
            return self
                .finish_mutation("General access", generation, report, first_error)
                .await;
        }

        let mut state = self.state.write();
        if state.generation == generation {
            state.patch_general_access(access, link_role);
            state.last_report = Some(report.clone());
        }
        tracing::info!("General access set to {} ({})", access, link_role);
        Ok(report)
    }
}
