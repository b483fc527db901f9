//! File type and size checks applied before any parsing

use crate::config::IngestLimits;
use crate::error::AppError;

/// Check a file name and size against the configured limits
pub fn validate_file(name: &str, size: u64, limits: &IngestLimits) -> Result<(), AppError> {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default();

    let accepted = !extension.is_empty()
        && limits
            .accepted_extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(&extension));

    if !accepted {
        return Err(AppError::unsupported_file(format!(
            "{} has an invalid file type. Accepted types: {}",
            name,
            limits.accepted_list()
        )));
    }

    if size > limits.max_size_bytes() {
        return Err(AppError::unsupported_file(format!(
            "{} exceeds the maximum file size of {}MB",
            name, limits.max_file_size_mb
        )));
    }

    Ok(())
}
