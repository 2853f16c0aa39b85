use crate::sink::Sink;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

/// Accumulates normalized rows and writes them to the sink in fixed-size
/// batches.
///
/// A failed batch is logged, counted as not-upserted, and dropped; later
/// batches are still attempted. Nothing is retried.
pub struct BatchLoader {
    sink: Option<Arc<dyn Sink>>,
    table: &'static str,
    batch_size: usize,
    buffer: Vec<Value>,
    upserted: u64,
}

impl BatchLoader {
    /// A `None` sink means dry-run: rows are discarded instead of written.
    pub fn new(sink: Option<Arc<dyn Sink>>, table: &'static str, batch_size: usize) -> Self {
        Self {
            sink,
            table,
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            upserted: 0,
        }
    }

    /// Appends a row, flushing when the buffer reaches the batch size.
    pub async fn accumulate(&mut self, row: Value) {
        self.buffer.push(row);
        if self.buffer.len() >= self.batch_size {
            self.flush().await;
        }
    }

    /// Sends the current buffer as one insert and clears it regardless of
    /// the outcome.
    pub async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let rows = std::mem::take(&mut self.buffer);
        let Some(sink) = &self.sink else {
            return;
        };
        match sink.insert_rows(self.table, &rows).await {
            Ok(()) => {
                self.upserted += rows.len() as u64;
                info!(table = self.table, batch = rows.len(), total = self.upserted, "batch inserted");
                println!(
                    "   ✅ Inserted batch of {} (total: {})",
                    rows.len(),
                    self.upserted
                );
            }
            Err(e) => {
                error!(table = self.table, "insert failed: {}", e);
                println!("   ❌ Insert error: {e}");
            }
        }
    }

    /// Final flush at end of source; returns the upserted total.
    pub async fn finish(mut self) -> u64 {
        self.flush().await;
        self.upserted
    }

    pub fn upserted(&self) -> u64 {
        self.upserted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use serde_json::json;

    #[tokio::test]
    async fn flushes_on_batch_size_and_at_finish() {
        let sink = Arc::new(MemorySink::new());
        let mut loader = BatchLoader::new(Some(sink.clone()), "geo_hochwasser", 2);
        for i in 0..5 {
            loader.accumulate(json!({"i": i})).await;
        }
        // Two full batches flushed, one row still buffered
        assert_eq!(sink.rows("geo_hochwasser").len(), 4);
        let upserted = loader.finish().await;
        assert_eq!(upserted, 5);
        assert_eq!(sink.rows("geo_hochwasser").len(), 5);
    }

    #[tokio::test]
    async fn failed_batch_is_dropped_but_later_batches_proceed() {
        let sink = Arc::new(MemorySink::new());
        sink.fail_next_batches(1);
        let mut loader = BatchLoader::new(Some(sink.clone()), "geo_boris", 2);
        for i in 0..5 {
            loader.accumulate(json!({"i": i})).await;
        }
        let upserted = loader.finish().await;
        // First batch of 2 lost, remaining 3 written
        assert_eq!(upserted, 3);
        assert_eq!(sink.rows("geo_boris").len(), 3);
    }

    #[tokio::test]
    async fn dry_run_discards_rows_without_counting() {
        let mut loader = BatchLoader::new(None, "geo_hochwasser", 2);
        for i in 0..5 {
            loader.accumulate(json!({"i": i})).await;
        }
        assert_eq!(loader.upserted(), 0);
        assert_eq!(loader.finish().await, 0);
    }
}
