//! Drives one operator over in-memory channels.

use crate::channels::{ChannelCapacity, ChannelMessage, NodeIo, channel};
use crate::error::ExecutionError;
use crate::transformation::Operator;
use crate::value::Row;

/// Feeds `inputs[i]` (followed by end of stream) to input port `i`, runs the
/// operator's processor to completion and returns the rows received on each
/// of the `outputs` output ports.
///
/// Panics if an output does not carry exactly one end-of-stream marker as its
/// last message.
pub(crate) async fn run_operator(
  operator: &dyn Operator,
  inputs: Vec<Vec<Row>>,
  outputs: usize,
) -> Result<Vec<Vec<Row>>, ExecutionError> {
  let mut io = NodeIo::new("under_test");
  let mut senders = Vec::new();
  for (port, rows) in inputs.into_iter().enumerate() {
    let (tx, rx) = channel(ChannelCapacity::Unbounded);
    for row in rows {
      assert!(tx.send(ChannelMessage::Row(row)).await);
    }
    assert!(tx.send(ChannelMessage::EndOfStream).await);
    io.add_input(port, rx);
    senders.push(tx);
  }

  let mut receivers = Vec::new();
  for port in 0..outputs {
    let (tx, rx) = channel(ChannelCapacity::Unbounded);
    io.add_output(port, tx);
    receivers.push(rx);
  }

  let mut processor = operator.processor(io)?;
  processor.process_rows().await?;
  drop(processor);

  let mut collected = Vec::new();
  for mut rx in receivers {
    let mut rows = Vec::new();
    let mut eof = 0;
    while let Some(message) = rx.recv().await {
      match message {
        ChannelMessage::Row(row) => {
          assert_eq!(eof, 0, "row received after end of stream");
          rows.push(row);
        }
        ChannelMessage::EndOfStream => eof += 1,
      }
    }
    assert_eq!(eof, 1, "expected exactly one end-of-stream marker");
    collected.push(rows);
  }
  Ok(collected)
}
