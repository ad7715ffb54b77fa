// src/pipeline/sink.rs
// =============================================================================
// Shared output channels for results and failures.
//
// Every worker task holds a clone of the Sink and pushes records into it.
// One writer per sink drains it on a blocking thread and writes lines to
// the destination (stdout, the errors file, an in-memory buffer in tests).
// The writer stops at the sentinel, flushes and reports how many records it
// wrote.
// =============================================================================

use anyhow::Result;
use std::io::Write;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::fetch::Envelope;

// Multi-producer handle of one output channel
pub struct Sink<T> {
    sender: mpsc::UnboundedSender<Envelope<T>>,
}

// Derived Clone would require T: Clone
impl<T> Clone for Sink<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> Sink<T> {
    pub fn push(&self, item: T) {
        if self.sender.send(Envelope::Item(item)).is_err() {
            // Only happens when the writer died on an I/O error; that error
            // is reported when the pipeline closes
            warn!("output writer is gone, record dropped");
        }
    }

    // Tells the writer there is nothing more to come
    pub fn close(&self) {
        let _ = self.sender.send(Envelope::Stop);
    }
}

pub struct SinkReceiver<T> {
    receiver: mpsc::UnboundedReceiver<Envelope<T>>,
}

#[cfg(test)]
impl<T> SinkReceiver<T> {
    // Records already pushed, without waiting for more
    pub fn drain_ready(&mut self) -> Vec<T> {
        let mut items = Vec::new();
        while let Ok(envelope) = self.receiver.try_recv() {
            if let Envelope::Item(item) = envelope {
                items.push(item);
            }
        }
        items
    }
}

pub fn channel<T>() -> (Sink<T>, SinkReceiver<T>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Sink { sender }, SinkReceiver { receiver })
}

// Starts the consumer of a sink
//
// `format` renders one record as one output line (without the newline).
pub fn spawn_writer<T, F>(
    mut receiver: SinkReceiver<T>,
    mut out: Box<dyn Write + Send>,
    format: F,
) -> JoinHandle<Result<usize>>
where
    T: Send + 'static,
    F: Fn(&T) -> Result<String> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut written = 0;
        while let Some(Envelope::Item(item)) = receiver.receiver.blocking_recv() {
            writeln!(out, "{}", format(&item)?)?;
            written += 1;
        }
        out.flush()?;
        Ok(written)
    })
}


#[cfg(test)]
mod tests {
    use super::testing::SharedBuffer;
    use super::*;

    #[tokio::test]
    async fn test_writer_drains_until_sentinel() {
        let (sink, receiver) = channel::<String>();
        let buffer = SharedBuffer::default();
        let writer = spawn_writer(receiver, Box::new(buffer.clone()), |s: &String| {
            Ok(s.to_uppercase())
        });

        let producers: Vec<_> = (0..4)
            .map(|i| {
                let sink = sink.clone();
                tokio::spawn(async move { sink.push(format!("line {}", i)) })
            })
            .collect();
        for producer in producers {
            producer.await.unwrap();
        }
        sink.close();

        let written = writer.await.unwrap().unwrap();
        assert_eq!(written, 4);
        let mut lines = buffer.lines();
        lines.sort();
        assert_eq!(lines, vec!["LINE 0", "LINE 1", "LINE 2", "LINE 3"]);
    }

    #[tokio::test]
    async fn test_writer_with_no_records() {
        let (sink, receiver) = channel::<String>();
        let buffer = SharedBuffer::default();
        let writer = spawn_writer(receiver, Box::new(buffer.clone()), |s: &String| Ok(s.clone()));
        sink.close();
        assert_eq!(writer.await.unwrap().unwrap(), 0);
        assert_eq!(buffer.contents(), "");
    }
}
