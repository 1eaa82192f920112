//! Lenient file reading with a bounded, fixed-delay retry.

use std::path::Path;

use backon::{ConstantBuilder, Retryable};
use tracing::warn;

use crate::config::ReadPolicy;

/// Read `path` as text, replacing invalid UTF-8 instead of failing.
///
/// Slicers sometimes still hold the output file when the hook starts, so
/// failed reads are retried `policy.attempts - 1` times with a fixed delay.
pub async fn read_lenient(path: &Path, policy: &ReadPolicy) -> std::io::Result<String> {
    let read_once = || async { tokio::fs::read(path).await };

    let bytes = read_once
        .retry(
            ConstantBuilder::default()
                .with_delay(policy.retry_delay())
                .with_max_times(policy.retries()),
        )
        .notify(|err, dur| {
            warn!(
                "Reading {} failed, retrying in {:?}: {}",
                path.display(),
                dur,
                err
            );
        })
        .await?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
