//! Human-in-the-loop staging of parsed changes.
//!
//! A [`ChangeStager`] is one review session over a single `ParsedChanges`:
//! every file starts `pending` and selected; the user applies files one at a
//! time, skips some, or applies everything still selected. Applies run
//! strictly one after another in document order, and a failing file never
//! stops the ones after it.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::{
    engine::{FileUpdateEngine, ProjectFiles},
    model::{ApplicationStatus, FileChange, FileStatus, FileUpdateResult, ParsedChanges},
};

/// Where the stager sends a change to be applied.
#[allow(async_fn_in_trait)]
pub trait ChangeApplier {
    async fn apply(&mut self, change: &FileChange) -> FileUpdateResult;
}

/// Applies changes through a [`FileUpdateEngine`] against a project mapping.
pub struct EngineApplier<'a, P: ProjectFiles> {
    engine: &'a mut FileUpdateEngine,
    project: &'a mut P,
}

impl<'a, P: ProjectFiles> EngineApplier<'a, P> {
    pub fn new(engine: &'a mut FileUpdateEngine, project: &'a mut P) -> Self {
        Self { engine, project }
    }
}

impl<P: ProjectFiles> ChangeApplier for EngineApplier<'_, P> {
    async fn apply(&mut self, change: &FileChange) -> FileUpdateResult {
        if let Err(e) = self.project.resolve(&change.filename) {
            warn!(filename = %change.filename, error = %format!("{e:#}"), "cannot read existing file");
            return FileUpdateResult::failed(&change.filename, e.to_string());
        }
        let current = self.project.files().clone();
        let project = &mut *self.project;
        self.engine
            .apply_file_change(&change.filename, &change.new_code, &current, |m| {
                project.set_files(m)
            })
            .await
    }
}

/// Outcome of an apply-all pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplySummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub skipped: Vec<String>,
    pub results: Vec<FileUpdateResult>,
}

impl ApplySummary {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// One-line toast text, e.g. `Applied 2 of 3 changes (1 failed)`.
    pub fn summary_line(&self) -> String {
        let ok = self.succeeded.len();
        if self.failed.is_empty() {
            format!("Applied {} change{}", ok, if ok == 1 { "" } else { "s" })
        } else {
            format!(
                "Applied {} of {} changes ({} failed)",
                ok,
                self.attempted(),
                self.failed.len()
            )
        }
    }
}

/// Read-only view for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct StagerSnapshot {
    pub description: Option<String>,
    pub statuses: Vec<FileStatus>,
    pub selected: Vec<String>,
    pub open: bool,
    pub applying: bool,
}

#[derive(Debug)]
pub struct ChangeStager {
    parsed: ParsedChanges,
    statuses: IndexMap<String, FileStatus>,
    selected: HashSet<String>,
    open: bool,
    applying: bool,
}

impl ChangeStager {
    /// Open a session: every file pending and selected.
    pub fn new(parsed: ParsedChanges) -> Self {
        let statuses = parsed
            .filenames()
            .map(|f| (f.to_string(), FileStatus::pending(f)))
            .collect();
        let selected = parsed
            .filenames()
            .map(str::to_string)
            .collect();

        Self {
            parsed,
            statuses,
            selected,
            open: true,
            applying: false,
        }
    }

    pub fn parsed(&self) -> &ParsedChanges {
        &self.parsed
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn status(&self, filename: &str) -> Option<&FileStatus> {
        self.statuses.get(filename)
    }

    pub fn is_selected(&self, filename: &str) -> bool {
        self.selected.contains(filename)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Whether "apply all" is currently offered.
    pub fn can_apply_all(&self) -> bool {
        self.open && !self.applying && !self.selected.is_empty()
    }

    /// Apply a single file's change. `None` if the filename is not staged.
    pub async fn apply_one<A: ChangeApplier>(
        &mut self,
        filename: &str,
        applier: &mut A,
    ) -> Option<FileUpdateResult> {
        let change = self.parsed.find(filename)?.clone();
        Some(self.run_one(&change, applier).await)
    }

    /// Deselect a file. Status is left alone.
    pub fn skip(&mut self, filename: &str) {
        if self.selected.remove(filename) {
            debug!(filename, "skipped");
        }
    }

    /// Re-select a previously skipped file.
    pub fn select(&mut self, filename: &str) {
        if self.statuses.contains_key(filename) {
            self.selected.insert(filename.to_string());
        }
    }

    /// Close without applying anything further.
    pub fn close(&mut self) {
        self.open = false;
    }

    /// Apply every selected change in document order, then close.
    ///
    /// Failures are collected, not propagated; later files still run.
    pub async fn apply_all<A: ChangeApplier>(&mut self, applier: &mut A) -> ApplySummary {
        let mut summary = ApplySummary::default();
        if !self.open {
            warn!("apply-all on a closed session ignored");
            return summary;
        }

        self.applying = true;
        let changes: Vec<FileChange> = self.parsed.file_changes.clone();

        for change in &changes {
            if !self.selected.contains(&change.filename) {
                summary.skipped.push(change.filename.clone());
                continue;
            }

            let res = self.run_one(change, applier).await;
            if res.success {
                summary.succeeded.push(res.filename.clone());
            } else {
                let err = res.error.clone().unwrap_or_else(|| "Unknown error".into());
                summary.failed.push((res.filename.clone(), err));
            }
            summary.results.push(res);
        }

        self.applying = false;
        self.open = false;
        info!("{}", summary.summary_line());
        summary
    }

    async fn run_one<A: ChangeApplier>(
        &mut self,
        change: &FileChange,
        applier: &mut A,
    ) -> FileUpdateResult {
        self.set_status(&change.filename, ApplicationStatus::Applying, None);
        let res = applier.apply(change).await;

        if res.success {
            self.set_status(&change.filename, ApplicationStatus::Success, None);
        } else {
            let err = res.error.clone().unwrap_or_else(|| "Unknown error".into());
            self.set_status(&change.filename, ApplicationStatus::Error, Some(err));
        }
        res
    }

    fn set_status(&mut self, filename: &str, status: ApplicationStatus, error: Option<String>) {
        if let Some(entry) = self.statuses.get_mut(filename) {
            entry.status = status;
            entry.error = error;
        }
    }

    pub fn snapshot(&self) -> StagerSnapshot {
        StagerSnapshot {
            description: self.parsed.description.clone(),
            statuses: self.statuses.values().cloned().collect(),
            selected: self
                .parsed
                .filenames()
                .filter(|f| self.selected.contains(*f))
                .map(str::to_string)
                .collect(),
            open: self.open,
            applying: self.applying,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{aggregate::parse_ai_response, model::FileMap};

    /// Records every change it sees; fails for names in `fail`.
    #[derive(Default)]
    struct Recorder {
        seen: Vec<String>,
        fail: HashSet<String>,
    }

    impl ChangeApplier for Recorder {
        async fn apply(&mut self, change: &FileChange) -> FileUpdateResult {
            self.seen.push(change.filename.clone());
            if self.fail.contains(&change.filename) {
                FileUpdateResult::failed(&change.filename, "boom")
            } else {
                FileUpdateResult::ok(&change.filename, None)
            }
        }
    }

    fn three_files() -> ParsedChanges {
        parse_ai_response(
            "file: a.js\n```js\nlet a;\n```\n\
             file: b.js\n```js\nlet b;\n```\n\
             file: c.js\n```js\nlet c;\n```\n",
        )
    }

    #[test]
    fn new_session_is_pending_and_fully_selected() {
        let stager = ChangeStager::new(three_files());
        let snap = stager.snapshot();

        assert!(snap.open);
        assert_eq!(snap.selected, vec!["a.js", "b.js", "c.js"]);
        assert!(
            snap.statuses
                .iter()
                .all(|s| s.status == ApplicationStatus::Pending)
        );
        assert!(stager.can_apply_all());
    }

    #[tokio::test]
    async fn apply_one_updates_status() {
        let mut stager = ChangeStager::new(three_files());
        let mut rec = Recorder::default();
        rec.fail.insert("b.js".into());

        let ok = stager.apply_one("a.js", &mut rec).await.unwrap();
        assert!(ok.success);
        assert_eq!(
            stager.status("a.js").unwrap().status,
            ApplicationStatus::Success
        );

        stager.apply_one("b.js", &mut rec).await.unwrap();
        let st = stager.status("b.js").unwrap();
        assert_eq!(st.status, ApplicationStatus::Error);
        assert_eq!(st.error.as_deref(), Some("boom"));

        // Session stays open after single applies.
        assert!(stager.is_open());
    }

    #[tokio::test]
    async fn apply_one_unknown_is_noop() {
        let mut stager = ChangeStager::new(three_files());
        let mut rec = Recorder::default();
        assert!(stager.apply_one("zzz.js", &mut rec).await.is_none());
        assert!(rec.seen.is_empty());
    }

    #[tokio::test]
    async fn skipped_files_never_reach_applier() {
        let mut stager = ChangeStager::new(three_files());
        stager.skip("b.js");
        stager.skip("b.js");
        assert_eq!(stager.selected_count(), 2);
        assert_eq!(
            stager.status("b.js").unwrap().status,
            ApplicationStatus::Pending
        );

        let mut rec = Recorder::default();
        let summary = stager.apply_all(&mut rec).await;

        assert_eq!(rec.seen, vec!["a.js", "c.js"]);
        assert_eq!(summary.skipped, vec!["b.js"]);
        assert!(!stager.is_open());
        assert_eq!(summary.summary_line(), "Applied 2 changes");
    }

    #[tokio::test]
    async fn failure_is_isolated() {
        let mut stager = ChangeStager::new(three_files());
        let mut rec = Recorder::default();
        rec.fail.insert("b.js".into());

        let summary = stager.apply_all(&mut rec).await;

        assert_eq!(rec.seen, vec!["a.js", "b.js", "c.js"]);
        assert_eq!(summary.succeeded, vec!["a.js", "c.js"]);
        assert_eq!(summary.failed, vec![("b.js".to_string(), "boom".to_string())]);
        assert_eq!(summary.summary_line(), "Applied 2 of 3 changes (1 failed)");
        assert_eq!(
            stager.status("b.js").unwrap().status,
            ApplicationStatus::Error
        );
        assert_eq!(
            stager.status("c.js").unwrap().status,
            ApplicationStatus::Success
        );
    }

    #[tokio::test]
    async fn closed_session_ignores_apply_all() {
        let mut stager = ChangeStager::new(three_files());
        stager.close();
        assert!(!stager.can_apply_all());

        let mut rec = Recorder::default();
        let summary = stager.apply_all(&mut rec).await;
        assert_eq!(summary.attempted(), 0);
        assert!(rec.seen.is_empty());
    }

    #[test]
    fn reselect_restores_selection() {
        let mut stager = ChangeStager::new(three_files());
        stager.skip("a.js");
        stager.select("a.js");
        stager.select("not-staged.js");
        assert_eq!(stager.snapshot().selected, vec!["a.js", "b.js", "c.js"]);
    }

    #[tokio::test]
    async fn engine_applier_writes_project() {
        let mut engine = FileUpdateEngine::new();
        let mut project: FileMap = [("a.js".to_string(), "old".to_string())]
            .into_iter()
            .collect();

        let mut stager = ChangeStager::new(three_files());
        let summary = {
            let mut applier = EngineApplier::new(&mut engine, &mut project);
            stager.apply_all(&mut applier).await
        };

        assert_eq!(summary.succeeded.len(), 3);
        assert_eq!(project["a.js"], "let a;");
        assert_eq!(project["c.js"], "let c;");
        assert_eq!(engine.get_file_backups("a.js").len(), 1);
        assert!(engine.get_file_backups("b.js").is_empty());
    }
}
