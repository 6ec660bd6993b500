//! Change orchestrator
//!
//! Owns the approve/apply workflow for one session:
//!
//! ```text
//! Input --generate--> Review --approve--> Approved --apply--> Applied
//!   ^                   |                                        |
//!   +------reject-------+                                        |
//!   +-------------------------new_proposal-----------------------+
//! ```
//!
//! Nothing reaches the file writer without passing through `Approved`. The
//! session lock is never held across the generation await; a generation
//! epoch discards results that arrive after `cancel` or a newer request.

use crate::error::{ApplyStep, LiraError, StaleContent, WorkflowError};
use crate::workflow::{validate_transition, WorkflowStep};
use crate::writer::{BackupLocator, FileWriter};
use lira_patch::{ChangeRequest, GenerationSource, PatchGenerator};
use lira_progression::{EventKind, ProgressionState, ProgressionStore, META_LINES};
use lira_routing::{
    module_of_path, CatalogError, ContentHash, FileCatalog, FileEntry, IntentRouter, LiraModule,
    RoutingResult,
};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;
use ulid::Ulid;

/// Notified after every applied change
pub trait ProgressionObserver: Send + Sync {
    /// Called with the state persisted by `apply`
    fn on_progression_changed(&self, state: &ProgressionState);
}

/// Explicitly chosen target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Catalog path
    pub path: String,
    /// Module the path was selected through
    pub module: Option<String>,
}

/// Generated change awaiting a decision
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    /// Unique id
    pub id: Ulid,
    /// Target path
    pub file_path: String,
    /// Module credited for the change
    pub module: String,
    /// Goal as entered
    pub goal: String,
    /// Content the proposal was generated from
    pub original_content: String,
    /// Hash of `original_content`
    pub base_hash: ContentHash,
    /// Proposed content
    pub updated_content: String,
    /// What changed, when available
    pub explanation: Option<String>,
    /// Caveats for the reviewer
    pub warnings: Vec<String>,
    /// Path that produced the content
    pub source: GenerationSource,
    /// Routing decision, when the target was routed
    pub routing: Option<RoutingResult>,
}

impl Proposal {
    /// Number of lines that differ from the original, position by position
    #[must_use]
    pub fn changed_lines(&self) -> u64 {
        let before: Vec<&str> = self.original_content.lines().collect();
        let after: Vec<&str> = self.updated_content.lines().collect();
        let same = before.iter().zip(&after).filter(|(a, b)| a == b).count();
        u64::try_from(before.len().max(after.len()) - same).unwrap_or(u64::MAX)
    }

    /// Whether the proposal leaves the content unchanged
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.original_content == self.updated_content
    }
}

/// Outcome of a successful `apply`
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedChange {
    /// Proposal that was applied
    pub proposal_id: Ulid,
    /// Written path
    pub file_path: String,
    /// Backup of the previous content, if any
    pub backup: Option<BackupLocator>,
    /// Progression after the reward
    pub state: ProgressionState,
    /// Badges unlocked by this change
    pub new_badges: Vec<String>,
}

#[derive(Debug, Clone)]
struct Written {
    proposal_id: Ulid,
    backup: Option<BackupLocator>,
}

#[derive(Debug, Default)]
struct Session {
    step: WorkflowStep,
    epoch: u64,
    selection: Option<Selection>,
    proposal: Option<Proposal>,
    last_error: Option<String>,
    written: Option<Written>,
    applied: Option<AppliedChange>,
}

impl Session {
    fn written_for_current(&self) -> Option<&Written> {
        let id = self.proposal.as_ref()?.id;
        self.written.as_ref().filter(|w| w.proposal_id == id)
    }
}

/// Drives a change from request to applied file
pub struct ChangeOrchestrator {
    catalog: Arc<dyn FileCatalog>,
    writer: Arc<dyn FileWriter>,
    progression: Arc<ProgressionStore>,
    generator: Arc<PatchGenerator>,
    router: IntentRouter,
    observers: RwLock<Vec<Arc<dyn ProgressionObserver>>>,
    xp_per_change: u64,
    session: Mutex<Session>,
}

impl std::fmt::Debug for ChangeOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeOrchestrator")
            .field("generator", &self.generator)
            .field("xp_per_change", &self.xp_per_change)
            .field("observers", &self.observers.read().len())
            .field("session", &*self.session.lock())
            .finish_non_exhaustive()
    }
}

impl ChangeOrchestrator {
    /// Create an orchestrator in `Input`
    #[must_use]
    pub fn new(
        catalog: Arc<dyn FileCatalog>,
        writer: Arc<dyn FileWriter>,
        progression: Arc<ProgressionStore>,
        generator: Arc<PatchGenerator>,
    ) -> Self {
        Self {
            catalog,
            writer,
            progression,
            generator,
            router: IntentRouter::new(),
            observers: RwLock::new(Vec::new()),
            xp_per_change: crate::config::DEFAULT_XP_PER_CHANGE,
            session: Mutex::new(Session::default()),
        }
    }

    /// With XP per applied change
    #[inline]
    #[must_use]
    pub fn with_xp_per_change(mut self, xp: u64) -> Self {
        self.xp_per_change = xp;
        self
    }

    /// Register a progression observer
    pub fn subscribe(&self, observer: Arc<dyn ProgressionObserver>) {
        self.observers.write().push(observer);
    }

    /// Current workflow step
    #[must_use]
    pub fn step(&self) -> WorkflowStep {
        self.session.lock().step
    }

    /// Current proposal
    #[must_use]
    pub fn proposal(&self) -> Option<Proposal> {
        self.session.lock().proposal.clone()
    }

    /// Current selection
    #[must_use]
    pub fn selection(&self) -> Option<Selection> {
        self.session.lock().selection.clone()
    }

    /// Explanation of the last refused request
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.session.lock().last_error.clone()
    }

    /// Result of the last successful `apply`
    #[must_use]
    pub fn last_applied(&self) -> Option<AppliedChange> {
        self.session.lock().applied.clone()
    }

    /// Catalog in use
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn FileCatalog> {
        &self.catalog
    }

    /// Progression store in use
    #[inline]
    #[must_use]
    pub fn progression(&self) -> &ProgressionStore {
        &self.progression
    }

    /// Target a single file
    ///
    /// # Errors
    /// Returns error outside `Input` or if the path is not catalogued
    pub fn select_file(&self, path: &str) -> Result<FileEntry, LiraError> {
        self.select(path, None)
    }

    /// Target a module's main file
    ///
    /// # Errors
    /// Returns error outside `Input` or if the main file is not catalogued
    pub fn select_module(&self, module: &LiraModule) -> Result<FileEntry, LiraError> {
        self.select(&module.main_file(), Some(module.id.clone()))
    }

    fn select(&self, path: &str, module: Option<String>) -> Result<FileEntry, LiraError> {
        let mut session = self.session.lock();
        if session.step != WorkflowStep::Input {
            return Err(LiraError::Busy(session.step));
        }
        let file = self
            .catalog
            .get_file(path)
            .ok_or_else(|| LiraError::NoTarget(path.to_string()))?;

        tracing::debug!(path, module = ?module, "Target selected");
        session.selection = Some(Selection {
            path: path.to_string(),
            module,
        });
        Ok(file)
    }

    /// Drop the explicit target; later requests are routed
    pub fn clear_selection(&self) {
        self.session.lock().selection = None;
    }

    /// Generate a proposal for a goal: `Input -> Review`
    ///
    /// Uses the selected target, or routes the goal when nothing is selected.
    ///
    /// # Errors
    /// Returns error outside `Input`, for an empty goal, when no catalogued
    /// target exists, or when the result was superseded by `cancel` or a
    /// newer request. Refusals leave the workflow in `Input` and are
    /// recorded in [`ChangeOrchestrator::last_error`].
    pub async fn generate(&self, goal: &str, learning_mode: bool) -> Result<Proposal, LiraError> {
        let goal = goal.trim();
        let (epoch, file, module, routing) = {
            let mut session = self.session.lock();
            if session.step != WorkflowStep::Input {
                return Err(WorkflowError::IllegalTransition {
                    from: session.step,
                    to: WorkflowStep::Review,
                }
                .into());
            }
            session.epoch += 1;

            let target = if goal.is_empty() {
                Err(LiraError::EmptyGoal)
            } else {
                self.resolve_target(session.selection.as_ref(), goal)
            };
            match target {
                Ok((file, module, routing)) => {
                    session.last_error = None;
                    (session.epoch, file, module, routing)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Request refused");
                    session.last_error = Some(e.to_string());
                    return Err(e);
                }
            }
        };

        let request = ChangeRequest::for_file(&file, goal).with_learning_mode(learning_mode);
        let result = self.generator.generate(&request).await;

        let mut session = self.session.lock();
        if session.epoch != epoch || session.step != WorkflowStep::Input {
            tracing::info!(path = %file.path, "Generation result discarded");
            return Err(LiraError::Cancelled);
        }
        if !result.success {
            let e = LiraError::GenerationFailed(format!("no content for {}", file.path));
            session.last_error = Some(e.to_string());
            return Err(e);
        }
        validate_transition(session.step, WorkflowStep::Review)?;

        let proposal = Proposal {
            id: Ulid::new(),
            base_hash: file.content_hash(),
            file_path: file.path,
            module,
            goal: goal.to_string(),
            original_content: file.content,
            updated_content: result.updated_content,
            explanation: result.explanation,
            warnings: result.warnings,
            source: result.source,
            routing,
        };
        tracing::info!(
            id = %proposal.id,
            path = %proposal.file_path,
            source = %proposal.source,
            changed_lines = proposal.changed_lines(),
            "Proposal ready for review"
        );

        session.proposal = Some(proposal.clone());
        session.written = None;
        session.step = WorkflowStep::Review;
        Ok(proposal)
    }

    fn resolve_target(
        &self,
        selection: Option<&Selection>,
        goal: &str,
    ) -> Result<(FileEntry, String, Option<RoutingResult>), LiraError> {
        if let Some(selection) = selection {
            let file = self
                .catalog
                .get_file(&selection.path)
                .ok_or_else(|| LiraError::NoTarget(selection.path.clone()))?;
            let module = selection
                .module
                .clone()
                .unwrap_or_else(|| module_of_path(&file.path).to_string());
            return Ok((file, module, None));
        }

        let routing = self.router.route_in(goal, self.catalog.as_ref());
        tracing::info!(
            target = %routing.target_path,
            confidence = routing.confidence,
            ambiguous = routing.is_ambiguous(),
            "Request routed"
        );
        let file = routing
            .file
            .clone()
            .ok_or_else(|| LiraError::NoTarget(routing.target_path.clone()))?;
        let module = module_of_path(&file.path).to_string();
        Ok((file, module, Some(routing)))
    }

    /// Accept the proposal: `Review -> Approved`
    ///
    /// # Errors
    /// Returns error outside `Review`
    pub fn approve(&self) -> Result<(), LiraError> {
        let mut session = self.session.lock();
        validate_transition(session.step, WorkflowStep::Approved)?;
        session.step = WorkflowStep::Approved;
        tracing::info!("Proposal approved");
        Ok(())
    }

    /// Discard the proposal: `Review -> Input`
    ///
    /// # Errors
    /// Returns error outside `Review`
    pub fn reject(&self) -> Result<(), LiraError> {
        let mut session = self.session.lock();
        if session.step != WorkflowStep::Review {
            return Err(WorkflowError::IllegalTransition {
                from: session.step,
                to: WorkflowStep::Input,
            }
            .into());
        }
        session.proposal = None;
        session.step = WorkflowStep::Input;
        tracing::info!("Proposal rejected");
        Ok(())
    }

    /// Write the approved proposal and reward it: `Approved -> Applied`
    ///
    /// Checks that the catalogued content still matches the proposal's base,
    /// writes through the file writer, updates the catalog, records a
    /// `ChangeApplied` event and finally notifies observers. A write that
    /// already happened for this proposal is never repeated on retry.
    ///
    /// # Errors
    /// Returns error outside `Approved`, or [`LiraError::ApplyFailed`] naming
    /// the failed step; the workflow then stays `Approved`
    pub fn apply(&self) -> Result<AppliedChange, LiraError> {
        let (applied, observers) = {
            let mut session = self.session.lock();
            validate_transition(session.step, WorkflowStep::Applied)?;
            let proposal = session.proposal.clone().ok_or(WorkflowError::IllegalTransition {
                from: session.step,
                to: WorkflowStep::Applied,
            })?;
            let path = proposal.file_path.as_str();

            let already_written = session.written_for_current().map(|w| w.backup.clone());
            let backup = if let Some(backup) = already_written {
                tracing::info!(path, "Already written, skipping write");
                backup
            } else {
                self.verify_base(&proposal)?;
                let backup = self
                    .writer
                    .write(path, &proposal.updated_content)
                    .map_err(|e| LiraError::apply_failed(ApplyStep::Write, path, e))?;
                session.written = Some(Written {
                    proposal_id: proposal.id,
                    backup: backup.clone(),
                });
                backup
            };

            self.catalog
                .update_content(path, &proposal.updated_content)
                .map_err(|e| LiraError::apply_failed(ApplyStep::Catalog, path, e))?;

            let mut meta = BTreeMap::new();
            meta.insert("file".to_string(), proposal.file_path.clone());
            meta.insert("module".to_string(), proposal.module.clone());
            meta.insert(META_LINES.to_string(), proposal.changed_lines().to_string());
            let state = self
                .progression
                .apply_event(EventKind::ChangeApplied, self.xp_per_change, meta)
                .map_err(|e| LiraError::apply_failed(ApplyStep::Progression, path, e))?;

            let applied = AppliedChange {
                proposal_id: proposal.id,
                file_path: proposal.file_path.clone(),
                backup,
                new_badges: badges_awarded_with_latest(&state),
                state,
            };
            tracing::info!(
                path,
                xp = applied.state.xp,
                level = applied.state.level,
                new_badges = applied.new_badges.len(),
                "Change applied"
            );

            session.step = WorkflowStep::Applied;
            session.applied = Some(applied.clone());
            (applied, self.observers.read().clone())
        };

        for observer in observers {
            observer.on_progression_changed(&applied.state);
        }
        Ok(applied)
    }

    fn verify_base(&self, proposal: &Proposal) -> Result<(), LiraError> {
        let path = proposal.file_path.as_str();
        let current = self.catalog.get_file(path).ok_or_else(|| {
            LiraError::apply_failed(ApplyStep::Verify, path, CatalogError::NotFound(path.to_string()))
        })?;
        let actual = current.content_hash();
        if actual != proposal.base_hash {
            tracing::warn!(path, "Content changed since proposal, refusing to apply");
            return Err(LiraError::apply_failed(
                ApplyStep::Verify,
                path,
                StaleContent {
                    expected: proposal.base_hash,
                    actual,
                },
            ));
        }
        Ok(())
    }

    /// Start over after an applied change: `Applied -> Input`
    ///
    /// Clears the proposal; the selection is kept.
    ///
    /// # Errors
    /// Returns error outside `Applied`
    pub fn new_proposal(&self) -> Result<(), LiraError> {
        let mut session = self.session.lock();
        if session.step != WorkflowStep::Applied {
            return Err(WorkflowError::IllegalTransition {
                from: session.step,
                to: WorkflowStep::Input,
            }
            .into());
        }
        session.proposal = None;
        session.written = None;
        session.last_error = None;
        session.step = WorkflowStep::Input;
        Ok(())
    }

    /// Abandon the current request
    ///
    /// Any generation in flight is discarded when it completes. The workflow
    /// returns to `Input` unless the proposal was already written, in which
    /// case it stays put so `apply` can finish or `new_proposal` can follow.
    pub fn cancel(&self) -> WorkflowStep {
        let mut session = self.session.lock();
        session.epoch += 1;

        if session.step == WorkflowStep::Applied || session.written_for_current().is_some() {
            tracing::info!(step = %session.step, "Cancel ignored, change already written");
            return session.step;
        }
        session.proposal = None;
        session.step = WorkflowStep::Input;
        tracing::debug!("Request cancelled");
        session.step
    }

    /// Restore a file from a backup and refresh the catalog
    ///
    /// # Errors
    /// Returns error if the restore fails or the path is not catalogued
    pub fn rollback(&self, path: &str, backup: &BackupLocator) -> Result<(), LiraError> {
        let content = self.writer.restore(path, backup)?;
        self.catalog.update_content(path, &content)?;
        tracing::info!(path, backup = %backup, "Rolled back");
        Ok(())
    }

    /// Backups of a file, newest first
    ///
    /// # Errors
    /// Returns error if the writer cannot list backups
    pub fn list_backups(&self, path: &str) -> Result<Vec<BackupLocator>, LiraError> {
        Ok(self.writer.list_backups(path)?)
    }
}

/// Badge ids recorded directly behind the latest event
fn badges_awarded_with_latest(state: &ProgressionState) -> Vec<String> {
    let Some(latest) = state.latest() else {
        return Vec::new();
    };
    state
        .history
        .iter()
        .skip(1)
        .take_while(|e| e.kind == EventKind::BadgeAwarded && e.timestamp == latest.timestamp)
        .filter_map(|e| e.meta.get("badge").cloned())
        .collect()
}
