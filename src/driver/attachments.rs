use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult, JobError};
use crate::job::{Attachment, AttachmentKind};

/// A single file ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttachment {
    pub kind: AttachmentKind,
    pub local_path: PathBuf,
    /// Path relative to the agent's working folder, `/`-separated.
    pub destination: String,
}

/// Expands attachments into individual files. Directories are walked
/// recursively and each file keeps its path relative to the directory,
/// prefixed by the attachment destination.
///
/// # Errors
///
/// Returns an error when a path does not exist or a directory cannot be read.
pub fn resolve_attachments(attachments: &[Attachment]) -> AppResult<Vec<ResolvedAttachment>> {
    let mut resolved = Vec::new();
    for attachment in attachments {
        let path = &attachment.local_path;
        if path.is_dir() {
            let mut files = Vec::new();
            collect_files(path, &mut files)?;
            files.sort();
            for file in files {
                let relative = file
                    .strip_prefix(path)
                    .map(to_slash_path)
                    .unwrap_or_else(|_| file_name(&file));
                let destination = match attachment.destination.as_deref() {
                    Some(prefix) if !prefix.is_empty() => {
                        format!("{}/{}", prefix.trim_end_matches('/'), relative)
                    }
                    Some(_) | None => relative,
                };
                resolved.push(ResolvedAttachment {
                    kind: attachment.kind,
                    local_path: file,
                    destination,
                });
            }
        } else if path.is_file() {
            let destination = attachment
                .destination
                .clone()
                .filter(|destination| !destination.is_empty())
                .unwrap_or_else(|| file_name(path));
            resolved.push(ResolvedAttachment {
                kind: attachment.kind,
                local_path: path.clone(),
                destination,
            });
        } else {
            return Err(AppError::job(JobError::AttachmentNotFound { path: path.clone() }));
        }
    }
    Ok(resolved)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> AppResult<()> {
    let read_error = |source| {
        AppError::job(JobError::ReadAttachment {
            path: dir.to_path_buf(),
            source,
        })
    };
    for entry in std::fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
