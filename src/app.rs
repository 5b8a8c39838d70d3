use camino::Utf8PathBuf;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::canvas::CanvasClient;
use crate::commands::archive::ArchiveTask;
use crate::commands::email::{EmailTask, UserRow};
use crate::commands::orientation::{OrientationRow, OrientationTask};
use crate::commands::shopping::ShoppingTask;
use crate::commands::storage::{StorageRow, StorageTask};
use crate::commands::tools::ToolUsageTask;
use crate::commands::CourseRow;
use crate::config::{ResolvedConfig, StorageSettings};
use crate::domain::{ShoppingAction, Tool};
use crate::error::CanvasError;
use crate::ledger::ProcessedLedger;
use crate::pipeline::{BatchOptions, BatchReport, BatchTask, ProgressSink, run_batch};
use crate::report::{InputRow, LoadedReport, ReportSelector, load_report};
use crate::store::Store;
use crate::summary::{Summary, summarize};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub force: bool,
    pub date: NaiveDate,
    pub input: Option<Utf8PathBuf>,
}

impl RunOptions {
    /// Dated report selector, unless `--input` names a file.
    pub fn selector(&self, name: &str) -> ReportSelector {
        match &self.input {
            Some(path) => ReportSelector::Path(path.clone()),
            None => ReportSelector::Dated {
                name: name.to_string(),
                date: self.date,
            },
        }
    }

    pub fn yearly_selector(&self, name: &str, year: i32) -> ReportSelector {
        match &self.input {
            Some(path) => ReportSelector::Path(path.clone()),
            None => ReportSelector::Yearly {
                name: name.to_string(),
                year,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub command: String,
    pub input: String,
    pub loaded: usize,
    pub invalid: usize,
    pub duplicates: usize,
    pub filtered: usize,
    pub batch: BatchReport,
    pub summary: Summary,
}

pub struct App<C: CanvasClient> {
    store: Store,
    client: C,
    config: ResolvedConfig,
}

impl<C: CanvasClient> App<C> {
    pub fn new(store: Store, client: C, config: ResolvedConfig) -> Self {
        Self {
            store,
            client,
            config,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn email(
        &self,
        options: &RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunResult, CanvasError> {
        let report = self.load::<UserRow, _>(&options.selector("users"), UserRow::is_active)?;
        let task = EmailTask::new(&self.client);
        self.execute(&task, report, None, options, sink)
    }

    pub fn shopping(
        &self,
        action: ShoppingAction,
        term: Option<&str>,
        options: &RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunResult, CanvasError> {
        let term = term.map(str::trim).filter(|term| !term.is_empty());
        let report = self.load::<CourseRow, _>(&options.selector("courses"), |row| {
            !row.is_deleted() && term.is_none_or(|term| row.term_id == term)
        })?;
        let task = ShoppingTask::new(&self.client, action, &self.config.ignored_accounts);
        self.execute(&task, report, None, options, sink)
    }

    pub fn storage(
        &self,
        increment_mb: Option<u64>,
        options: &RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunResult, CanvasError> {
        let report = self.load::<StorageRow, _>(&options.selector("storage"), |_| true)?;
        let settings = StorageSettings {
            increment_mb: increment_mb.unwrap_or(self.config.storage.increment_mb),
            threshold: self.config.storage.threshold,
        };
        let task = StorageTask::new(&self.client, settings);
        self.execute(&task, report, None, options, sink)
    }

    /// Enrolls one graduation year. Keys already in that year's ledger are
    /// skipped even when the list has been reordered since the last run.
    pub fn orientation(
        &self,
        year: i32,
        options: &RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunResult, CanvasError> {
        let settings = self.config.orientation.as_ref().ok_or_else(|| {
            CanvasError::InvalidConfig("orientation section is not configured".to_string())
        })?;
        let report = self.load::<OrientationRow, _>(
            &options.yearly_selector("orientation", year),
            |_| true,
        )?;
        let task = OrientationTask::prepare(&self.client, settings)?;
        let ledger = ProcessedLedger::open(&self.store.ledger_path(&format!("orientation_{year}")))?;
        self.execute(&task, report, Some(ledger), options, sink)
    }

    pub fn tools(
        &self,
        tool: Tool,
        options: &RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunResult, CanvasError> {
        let report =
            self.load::<CourseRow, _>(&options.selector("courses"), |row| !row.is_deleted())?;
        let task = ToolUsageTask::new(&self.client, tool);
        self.execute(&task, report, None, options, sink)
    }

    pub fn archive(
        &self,
        options: &RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunResult, CanvasError> {
        let report = self.load::<CourseRow, _>(&options.selector("courses"), |_| true)?;
        let task = ArchiveTask::new(&self.client, &self.store);
        self.execute(&task, report, None, options, sink)
    }

    fn load<R, F>(&self, selector: &ReportSelector, filter: F) -> Result<LoadedReport<R>, CanvasError>
    where
        R: InputRow,
        F: Fn(&R) -> bool,
    {
        self.store.ensure_layout()?;
        let path = selector.locate(&self.store.reports_dir())?;
        info!(report = %path, "using report");
        load_report(&path, filter)
    }

    fn execute<T: BatchTask>(
        &self,
        task: &T,
        report: LoadedReport<T::Row>,
        mut ledger: Option<ProcessedLedger>,
        options: &RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunResult, CanvasError> {
        let result_path = self.store.result_path(task.name(), &report.path);
        let batch = run_batch(
            task,
            &report.rows,
            &result_path,
            ledger.as_mut(),
            BatchOptions {
                force: options.force,
            },
            sink,
        )?;
        let summary = summarize::<T::Status>(&result_path)?;

        Ok(RunResult {
            command: task.name().to_string(),
            input: report.path.to_string(),
            loaded: report.rows.len(),
            invalid: report.invalid,
            duplicates: report.duplicates,
            filtered: report.filtered,
            batch,
            summary,
        })
    }
}
