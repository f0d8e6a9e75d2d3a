use docvault_core::constants::DANGEROUS_EXTENSIONS;
use docvault_core::format::format_megabytes;
use docvault_core::models::{
    BatchSummary, BatchValidation, FileCheck, FileCheckStatus, UploadPolicy,
};
use docvault_core::{AppError, FileAnalysis};

use super::service::DocumentService;

impl DocumentService {
    /// The limits `create_document` and `validate_batch` enforce.
    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            allowed_mime_types: self.validator.allowed_mime_types(),
            max_file_size_bytes: self.validator.max_file_size(),
            max_file_size_human: format_megabytes(self.validator.max_file_size()),
            max_files_per_user: self.config.max_files_per_user,
            max_batch_files: self.config.max_batch_files,
            max_batch_size_bytes: self.config.max_batch_size_bytes,
            dangerous_extensions: DANGEROUS_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Security report for one file; nothing is stored or recorded.
    pub fn analyze_file(&self, content: &[u8], filename: &str) -> FileAnalysis {
        self.validator.analyze(content, filename)
    }

    /// Validate several files without storing any of them.
    ///
    /// Individual failures are reported per file. The request itself fails
    /// when it holds no files, too many files, or when the valid files
    /// together exceed the batch size limit.
    pub fn validate_batch(&self, files: &[(String, Vec<u8>)]) -> Result<BatchValidation, AppError> {
        if files.is_empty() {
            return Err(AppError::InvalidInput("No files provided".to_string()));
        }
        if files.len() > self.config.max_batch_files {
            return Err(AppError::InvalidInput(format!(
                "Too many files (max {} per request)",
                self.config.max_batch_files
            )));
        }

        let mut summary = BatchSummary {
            total: files.len(),
            ..BatchSummary::default()
        };
        let mut results = Vec::with_capacity(files.len());

        for (filename, content) in files {
            let check = match self.validator.validate(content, filename) {
                Ok(validation) => {
                    summary.valid += 1;
                    summary.total_size += validation.size;
                    FileCheck {
                        filename: validation.filename,
                        status: FileCheckStatus::Valid,
                        size: Some(validation.size),
                        mime_type: Some(validation.mime_type),
                        content_hash: Some(validation.content_hash),
                        error: None,
                    }
                }
                Err(e) => {
                    summary.invalid += 1;
                    FileCheck {
                        filename: filename.clone(),
                        status: FileCheckStatus::Invalid,
                        size: None,
                        mime_type: None,
                        content_hash: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(check);
        }

        if summary.total_size > self.config.max_batch_size_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "Total upload size too large: {} (max: {})",
                format_megabytes(summary.total_size),
                format_megabytes(self.config.max_batch_size_bytes)
            )));
        }

        tracing::debug!(
            total = summary.total,
            valid = summary.valid,
            invalid = summary.invalid,
            "Batch validated"
        );

        Ok(BatchValidation { results, summary })
    }
}
