use crate::api::MatrixResult;
use crate::error::AppError;
use crate::ingest::{Table, Workbook};
use crate::timeconv::UtcConversion;

/// The loaded workbook plus the rows of the selected worksheet
#[derive(Debug)]
pub struct LoadedFile {
    pub workbook: Workbook,
    pub table: Table,
}

#[derive(Debug, Default)]
pub enum Stage {
    #[default]
    NoFile,
    FileLoaded(LoadedFile),
    TimeConverted {
        file: LoadedFile,
        conversion: UtcConversion,
    },
    Processing {
        file: LoadedFile,
        conversion: UtcConversion,
    },
    Completed {
        file: LoadedFile,
        conversion: UtcConversion,
        result: MatrixResult,
    },
    Failed {
        file: LoadedFile,
        conversion: UtcConversion,
        error: AppError,
    },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::NoFile => "no file",
            Stage::FileLoaded(_) => "file loaded",
            Stage::TimeConverted { .. } => "time converted",
            Stage::Processing { .. } => "processing",
            Stage::Completed { .. } => "completed",
            Stage::Failed { .. } => "failed",
        }
    }

    pub fn file(&self) -> Option<&LoadedFile> {
        match self {
            Stage::NoFile => None,
            Stage::FileLoaded(file)
            | Stage::TimeConverted { file, .. }
            | Stage::Processing { file, .. }
            | Stage::Completed { file, .. }
            | Stage::Failed { file, .. } => Some(file),
        }
    }

    pub fn conversion(&self) -> Option<&UtcConversion> {
        match self {
            Stage::NoFile | Stage::FileLoaded(_) => None,
            Stage::TimeConverted { conversion, .. }
            | Stage::Processing { conversion, .. }
            | Stage::Completed { conversion, .. }
            | Stage::Failed { conversion, .. } => Some(conversion),
        }
    }

    /// Drop everything but the file
    pub(super) fn into_file(self) -> Option<LoadedFile> {
        match self {
            Stage::NoFile => None,
            Stage::FileLoaded(file)
            | Stage::TimeConverted { file, .. }
            | Stage::Processing { file, .. }
            | Stage::Completed { file, .. }
            | Stage::Failed { file, .. } => Some(file),
        }
    }
}
