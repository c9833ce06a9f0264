//! Row-count audit over the raw store: every partition's physical line
//! count is appended to one of two persistent logs, splitting files above
//! the full-page threshold from the rest. Pure observability; nothing
//! downstream consumes these logs.

use basegov_core::Stage;
use basegov_storage::{PartitionStore, StageLog};
use serde::Serialize;
use tracing::{error, info};

/// Line-count threshold separating the large-files log from the small-files
/// log, matching the portal's page size.
pub const LARGE_THRESHOLD: usize = 500;

#[derive(Debug, Clone, Serialize)]
pub struct AuditSummary {
    pub audited: usize,
    pub large: usize,
    pub small: usize,
    pub unreadable: usize,
}

/// Sweep the raw stage and append `"<name> - <n> rows"` lines to the
/// matching log. Unreadable partitions are logged and skipped.
pub async fn audit_row_counts(
    store: &PartitionStore,
    large_log: &StageLog,
    small_log: &StageLog,
) -> anyhow::Result<AuditSummary> {
    let mut summary = AuditSummary {
        audited: 0,
        large: 0,
        small: 0,
        unreadable: 0,
    };

    for name in store.list(Stage::Raw).await? {
        let bytes = match store.read(Stage::Raw, &name).await {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(%name, error = %err, "failed to read partition for audit");
                summary.unreadable += 1;
                continue;
            }
        };

        let rows = line_count(&bytes);
        summary.audited += 1;
        if rows > LARGE_THRESHOLD {
            summary.large += 1;
            large_log.append(&format!("{name} - {rows} rows"))?;
        } else {
            summary.small += 1;
            small_log.append(&format!("{name} - {rows} rows"))?;
        }
    }

    info!(
        audited = summary.audited,
        large = summary.large,
        small = summary.small,
        "row-count audit finished"
    );
    Ok(summary)
}

/// Physical text lines, header included; a final unterminated line counts.
fn line_count(bytes: &[u8]) -> usize {
    if bytes.is_empty() {
        return 0;
    }
    let newlines = bytes.iter().filter(|&&b| b == b'\n').count();
    if bytes.ends_with(b"\n") {
        newlines
    } else {
        newlines + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn line_count_handles_missing_trailing_newline() {
        assert_eq!(line_count(b""), 0);
        assert_eq!(line_count(b"a;b\n"), 1);
        assert_eq!(line_count(b"a;b\n1;2"), 2);
        assert_eq!(line_count(b"a;b\n1;2\n"), 2);
    }

    #[tokio::test]
    async fn audit_splits_partitions_across_the_two_logs() {
        let dir = tempdir().expect("tempdir");
        let store = PartitionStore::new(dir.path());

        let mut big = String::from("h\n");
        for i in 0..501 {
            big.push_str(&format!("{i}\n"));
        }
        store
            .write(Stage::Raw, "big.csv", big.as_bytes())
            .await
            .expect("write");
        store
            .write(Stage::Raw, "small.csv", b"h\n1\n2\n")
            .await
            .expect("write");

        let large_log = StageLog::open(dir.path().join("large_files.log")).expect("open");
        let small_log = StageLog::open(dir.path().join("small_files.log")).expect("open");
        let summary = audit_row_counts(&store, &large_log, &small_log)
            .await
            .expect("audit");

        assert_eq!(summary.audited, 2);
        assert_eq!(summary.large, 1);
        assert_eq!(summary.small, 1);

        let large = std::fs::read_to_string(large_log.path()).expect("read");
        assert_eq!(large, "big.csv - 502 rows\n");
        let small = std::fs::read_to_string(small_log.path()).expect("read");
        assert_eq!(small, "small.csv - 3 rows\n");
    }
}
