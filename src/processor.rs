//! # Stream Processing Protocol
//!
//! [`StreamProcessor`] is the run-time half of an operator: it owns the
//! node's channel endpoints for one run and drives rows through them.
//!
//! The provided [`process_rows`](StreamProcessor::process_rows) loop is:
//!
//! 1. [`get_row`](StreamProcessor::get_row) suspends until one message arrives;
//! 2. [`may_stop_process`](StreamProcessor::may_stop_process) ends the loop on
//!    end of stream;
//! 3. [`process_row`](StreamProcessor::process_row) turns the row into zero,
//!    one or several rows;
//! 4. [`emit_row`](StreamProcessor::emit_row) fans each row out, subject to
//!    [`can_emit_row`](StreamProcessor::can_emit_row);
//! 5. once stopped, [`flush`](StreamProcessor::flush) releases buffered state
//!    and [`emit_eof`](StreamProcessor::emit_eof) closes every output.
//!
//! Operators override only the steps that differ.

use crate::channels::{ChannelMessage, NodeIo};
use crate::error::ExecutionError;
use crate::value::Row;
use async_trait::async_trait;

/// Result of [`StreamProcessor::process_row`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emit {
  /// Emit one row.
  Row(Row),
  /// Emit several rows, in order.
  Rows(Vec<Row>),
  /// Emit nothing for this input.
  Nothing,
}

/// Run-time behaviour of a node.
#[async_trait]
pub trait StreamProcessor: Send {
  /// Channel endpoints of the node.
  fn io(&self) -> &NodeIo;

  /// Mutable channel endpoints of the node.
  fn io_mut(&mut self) -> &mut NodeIo;

  /// Called once before the first row is fetched.
  async fn on_start_process_rows(&mut self) -> Result<(), ExecutionError> {
    Ok(())
  }

  /// Suspends until one message arrives from upstream.
  async fn get_row(&mut self) -> Result<ChannelMessage, ExecutionError> {
    self.io_mut().recv_single().await
  }

  /// Whether `message` ends processing.
  fn may_stop_process(&self, message: &ChannelMessage) -> bool {
    message.is_end_of_stream()
  }

  /// Transforms one input row.
  fn process_row(&mut self, row: Row) -> Result<Emit, ExecutionError> {
    Ok(Emit::Row(row))
  }

  /// Gate applied to every row before it is emitted.
  fn can_emit_row(&self, _row: &Row) -> Result<bool, ExecutionError> {
    Ok(true)
  }

  /// Sends `row` to every output if the gate lets it through.
  async fn emit_row(&mut self, row: Row) -> Result<(), ExecutionError> {
    if self.can_emit_row(&row)? {
      self.io_mut().send_all(row).await?;
    }
    Ok(())
  }

  /// Emits whatever was buffered, once the input is exhausted.
  async fn flush(&mut self) -> Result<(), ExecutionError> {
    Ok(())
  }

  /// Propagates end of stream to every output.
  async fn emit_eof(&mut self) -> Result<(), ExecutionError> {
    self.io_mut().send_eof().await
  }

  /// Drives the node until its input is exhausted.
  async fn process_rows(&mut self) -> Result<(), ExecutionError> {
    self.on_start_process_rows().await?;
    loop {
      let message = self.get_row().await?;
      if self.may_stop_process(&message) {
        break;
      }
      let Some(row) = message.into_row() else {
        continue;
      };
      match self.process_row(row)? {
        Emit::Row(row) => self.emit_row(row).await?,
        Emit::Rows(rows) => {
          for row in rows {
            self.emit_row(row).await?;
          }
        }
        Emit::Nothing => {}
      }
    }
    self.flush().await?;
    self.emit_eof().await
  }
}
