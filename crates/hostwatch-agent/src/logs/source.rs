//! Resolution of configured log sources.
//!
//! Configured file paths become named sources in configuration order, up to
//! [`MAX_LOG_SOURCES`]; anything beyond the cap is dropped with a warning
//! (truncation, not rotation). Enabling journal collection adds one extra
//! source backed by the journal subscription rather than a file.

use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::AgentError;

/// Maximum number of file sources followed at once.
pub const MAX_LOG_SOURCES: usize = 50;

/// Stream name used for the journal source. Chosen so it cannot collide
/// with a file's base name (base names never contain '/').
pub const JOURNAL_SOURCE_NAME: &str = "journal/system";

/// Where a source's lines come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOrigin {
    /// Follow a file by name across truncation, rotation and recreation.
    File(PathBuf),
    /// Subscribe to new system journal entries.
    Journal,
}

/// One resolved log source. Immutable after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSource {
    /// Stream name; the base file name for file sources.
    pub name: String,
    pub origin: LogOrigin,
}

impl LogSource {
    fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        Some(LogSource {
            name,
            origin: LogOrigin::File(path.to_path_buf()),
        })
    }
}

/// Resolves the configured paths (plus the optional journal) into the
/// active source list.
///
/// Sources keep configuration order. Duplicate base names are rejected:
/// each source's backend stream is keyed by name, so two files with the
/// same base name would interleave one stream.
pub fn resolve_sources(
    paths: &[PathBuf],
    collect_journal: bool,
) -> Result<Vec<LogSource>, AgentError> {
    if paths.len() > MAX_LOG_SOURCES {
        warn!(
            "LOGS | {} files configured, following the first {} only",
            paths.len(),
            MAX_LOG_SOURCES
        );
    }

    let mut sources: Vec<LogSource> = Vec::new();
    for path in paths.iter().take(MAX_LOG_SOURCES) {
        let Some(source) = LogSource::from_path(path) else {
            warn!("LOGS | Skipping path without a usable file name: {:?}", path);
            continue;
        };
        if sources.iter().any(|s| s.name == source.name) {
            return Err(AgentError::DuplicateLogSource(source.name));
        }
        sources.push(source);
    }

    if collect_journal {
        sources.push(LogSource {
            name: JOURNAL_SOURCE_NAME.to_string(),
            origin: LogOrigin::Journal,
        });
    }

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("/var/log/{n}"))).collect()
    }

    #[test]
    fn test_resolves_in_configuration_order() {
        let sources =
            resolve_sources(&paths(&["syslog", "auth.log", "kern.log"]), false).unwrap();
        let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["syslog", "auth.log", "kern.log"]);
        assert_eq!(
            sources[0].origin,
            LogOrigin::File(PathBuf::from("/var/log/syslog"))
        );
    }

    #[test]
    fn test_cap_truncates_excess_sources() {
        let many: Vec<PathBuf> = (0..60)
            .map(|i| PathBuf::from(format!("/var/log/app-{i}.log")))
            .collect();
        let sources = resolve_sources(&many, false).unwrap();

        assert_eq!(sources.len(), MAX_LOG_SOURCES);
        // First 50 in original order, last 10 ignored
        assert_eq!(sources[0].name, "app-0.log");
        assert_eq!(sources[49].name, "app-49.log");
    }

    #[test]
    fn test_journal_flag_adds_one_source() {
        let sources = resolve_sources(&paths(&["syslog"]), true).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[1].name, JOURNAL_SOURCE_NAME);
        assert_eq!(sources[1].origin, LogOrigin::Journal);
    }

    #[test]
    fn test_journal_name_cannot_collide_with_base_names() {
        // Base names never contain '/', the journal name always does
        let sources = resolve_sources(&paths(&["system", "journal"]), true).unwrap();
        let file_names: Vec<&str> = sources[..2].iter().map(|s| s.name.as_str()).collect();
        assert!(!file_names.contains(&JOURNAL_SOURCE_NAME));
    }

    #[test]
    fn test_duplicate_base_names_rejected() {
        let paths = vec![
            PathBuf::from("/var/log/app/service.log"),
            PathBuf::from("/opt/other/service.log"),
        ];
        let err = resolve_sources(&paths, false).unwrap_err();
        assert!(matches!(err, AgentError::DuplicateLogSource(name) if name == "service.log"));
    }

    #[test]
    fn test_path_without_file_name_is_skipped() {
        let sources = resolve_sources(&[PathBuf::from("/")], false).unwrap();
        assert!(sources.is_empty());
    }

    #[test]
    fn test_no_sources_is_valid() {
        let sources = resolve_sources(&[], false).unwrap();
        assert!(sources.is_empty());
    }
}
