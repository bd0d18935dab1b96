// Positional merge of log lines and stats samples

use crate::error::DataError;
use crate::models::{DerivedStats, MergedRecord};
use futures_util::stream::{self, Stream, StreamExt};

/// Pairs the n-th log line with the n-th stats sample.
///
/// Each step pulls one line, then one sample. The merge ends for good as soon as either
/// side is exhausted or fails; nothing from the longer side is buffered. A failure is
/// yielded once before the end.
pub fn merge<L, S>(logs: L, stats: S) -> impl Stream<Item = Result<MergedRecord, DataError>>
where
    L: Stream<Item = Result<String, DataError>> + Unpin,
    S: Stream<Item = Result<DerivedStats, DataError>> + Unpin,
{
    stream::unfold(Some((logs, stats)), |state| async move {
        let (mut logs, mut stats) = state?;
        let line = match logs.next().await? {
            Ok(line) => line,
            Err(e) => return Some((Err(e), None)),
        };
        let sample = match stats.next().await? {
            Ok(sample) => sample,
            Err(e) => return Some((Err(e), None)),
        };
        let record = MergedRecord {
            line,
            stats: sample,
        };
        Some((Ok(record), Some((logs, stats))))
    })
}
