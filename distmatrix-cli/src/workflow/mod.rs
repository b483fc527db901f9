//! Workflow state machine behind the `run` command
//!
//! One logical flow: load a file, optionally pick another worksheet, choose a
//! departure, convert it to UTC, then process. Each stage carries exactly the
//! data that is valid in it, and the transition methods below are the only
//! way to move between stages.

mod stage;

pub use stage::{LoadedFile, Stage};

use thiserror::Error;

use crate::api::{MatrixBackend, MatrixResult};
use crate::config::{IngestLimits, ProgressConfig};
use crate::error::AppError;
use crate::ingest::{SourceFile, Table, Workbook, ingest};
use crate::notify::ToastQueue;
use crate::timeconv::{DepartureSelection, UtcConversion, convert_to_utc};
use crate::upload::{ProgressSink, Submission, submit};

#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    #[error("Please upload a file first")]
    NoFile,

    #[error("Please convert the departure time to UTC first")]
    NotConverted,

    #[error("The selected worksheet has no rows to process")]
    NoRows,

    #[error("A submission is already being processed")]
    Busy,

    #[error("No submission is being processed")]
    NotProcessing,

    #[error(transparent)]
    App(#[from] AppError),
}

#[derive(Debug)]
pub struct Workflow {
    departure: DepartureSelection,
    stage: Stage,
}

impl Workflow {
    pub fn new(departure: DepartureSelection) -> Self {
        Self {
            departure,
            stage: Stage::NoFile,
        }
    }

    #[cfg(test)]
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn departure(&self) -> &DepartureSelection {
        &self.departure
    }

    pub fn table(&self) -> Option<&Table> {
        self.stage.file().map(|f| &f.table)
    }

    pub fn workbook(&self) -> Option<&Workbook> {
        self.stage.file().map(|f| &f.workbook)
    }

    pub fn conversion(&self) -> Option<&UtcConversion> {
        self.stage.conversion()
    }

    pub fn result(&self) -> Option<&MatrixResult> {
        match &self.stage {
            Stage::Completed { result, .. } => Some(result),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn error(&self) -> Option<&AppError> {
        match &self.stage {
            Stage::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self.stage, Stage::Processing { .. })
    }

    /// Whether "convert time" is currently allowed
    pub fn can_convert(&self) -> bool {
        self.stage.file().is_some() && !self.is_processing()
    }

    /// Whether "process" is currently allowed
    pub fn can_submit(&self) -> bool {
        self.submit_blocker().is_none()
    }

    /// Why processing is not allowed right now, if it isn't
    pub fn submit_blocker(&self) -> Option<WorkflowError> {
        match &self.stage {
            Stage::NoFile => Some(WorkflowError::NoFile),
            Stage::FileLoaded(_) => Some(WorkflowError::NotConverted),
            Stage::Processing { .. } => Some(WorkflowError::Busy),
            Stage::TimeConverted { file, .. }
            | Stage::Completed { file, .. }
            | Stage::Failed { file, .. } => file.table.is_empty().then_some(WorkflowError::NoRows),
        }
    }

    /// Load a new file and read its first worksheet. Any previous conversion
    /// or result is discarded; on failure the workflow is back to no file.
    pub fn load_file(
        &mut self,
        source: SourceFile,
        limits: &IngestLimits,
    ) -> Result<&Table, WorkflowError> {
        self.ensure_idle()?;
        self.stage = Stage::NoFile;

        let ingested = ingest(source, limits)?;
        self.stage = Stage::FileLoaded(LoadedFile {
            workbook: ingested.workbook,
            table: ingested.table,
        });
        log::debug!("Workflow -> {}", self.stage.name());
        self.table().ok_or(WorkflowError::NoFile)
    }

    /// Switch to another worksheet of the loaded workbook. The previous
    /// conversion or result is discarded even if the sheet can't be read.
    pub fn select_worksheet(&mut self, name: &str) -> Result<&Table, WorkflowError> {
        self.ensure_idle()?;
        let mut file = std::mem::take(&mut self.stage)
            .into_file()
            .ok_or(WorkflowError::NoFile)?;

        let outcome = file.workbook.read_sheet(name);
        if let Ok(table) = outcome.as_ref() {
            log::info!("Selected worksheet '{}' ({} rows)", name, table.len());
            file.table = table.clone();
        }
        self.stage = Stage::FileLoaded(file);

        outcome?;
        self.table().ok_or(WorkflowError::NoFile)
    }

    /// Change the departure; a loaded file goes back to needing conversion
    pub fn set_departure(&mut self, departure: DepartureSelection) -> Result<(), WorkflowError> {
        self.ensure_idle()?;
        self.departure = departure;
        if let Some(file) = std::mem::take(&mut self.stage).into_file() {
            self.stage = Stage::FileLoaded(file);
        }
        Ok(())
    }

    pub fn record_conversion(&mut self, conversion: UtcConversion) -> Result<(), WorkflowError> {
        self.ensure_idle()?;
        let file = match std::mem::take(&mut self.stage).into_file() {
            Some(file) => file,
            None => return Err(WorkflowError::NoFile),
        };
        self.stage = Stage::TimeConverted { file, conversion };
        log::debug!("Workflow -> {}", self.stage.name());
        Ok(())
    }

    /// Convert the current departure through `backend` and record the result
    pub async fn convert_time(
        &mut self,
        backend: &dyn MatrixBackend,
    ) -> Result<&UtcConversion, WorkflowError> {
        if !self.can_convert() {
            return Err(self.submit_blocker().unwrap_or(WorkflowError::NoFile));
        }
        let conversion = convert_to_utc(backend, &self.departure).await;
        self.record_conversion(conversion)?;
        self.conversion().ok_or(WorkflowError::NotConverted)
    }

    /// Move to processing and hand out the snapshot to submit
    pub fn begin_processing(&mut self) -> Result<Submission, WorkflowError> {
        if let Some(blocker) = self.submit_blocker() {
            return Err(blocker);
        }

        let (file, conversion) = match std::mem::take(&mut self.stage) {
            Stage::TimeConverted { file, conversion }
            | Stage::Completed { file, conversion, .. }
            | Stage::Failed { file, conversion, .. } => (file, conversion),
            other => {
                self.stage = other;
                return Err(WorkflowError::NotConverted);
            }
        };

        let submission = Submission {
            source: file.workbook.source().clone(),
            table: file.table.clone(),
            first_sheet: file.workbook.is_first_sheet(&file.table.sheet),
            departure: Some(self.departure.clone()),
            conversion: Some(conversion.clone()),
        };
        self.stage = Stage::Processing { file, conversion };
        log::debug!("Workflow -> {}", self.stage.name());
        Ok(submission)
    }

    pub fn finish_processing(
        &mut self,
        outcome: Result<MatrixResult, AppError>,
    ) -> Result<(), WorkflowError> {
        let (file, conversion) = match std::mem::take(&mut self.stage) {
            Stage::Processing { file, conversion } => (file, conversion),
            other => {
                self.stage = other;
                return Err(WorkflowError::NotProcessing);
            }
        };

        self.stage = match outcome {
            Ok(result) => Stage::Completed {
                file,
                conversion,
                result,
            },
            Err(error) => Stage::Failed {
                file,
                conversion,
                error,
            },
        };
        log::debug!("Workflow -> {}", self.stage.name());
        Ok(())
    }

    /// begin_processing, submit and finish_processing in one go
    pub async fn process(
        &mut self,
        backend: &dyn MatrixBackend,
        progress: &ProgressConfig,
        sink: &ProgressSink,
        toasts: &ToastQueue,
    ) -> Result<&MatrixResult, WorkflowError> {
        let submission = self.begin_processing()?;
        let outcome = submit(backend, &submission, progress, sink, toasts).await;
        self.finish_processing(outcome.clone())?;
        match outcome {
            Ok(_) => self.result().ok_or(WorkflowError::NotProcessing),
            Err(e) => Err(e.into()),
        }
    }

    fn ensure_idle(&self) -> Result<(), WorkflowError> {
        if self.is_processing() {
            Err(WorkflowError::Busy)
        } else {
            Ok(())
        }
    }
}
