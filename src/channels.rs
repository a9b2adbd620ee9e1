//! # Edge Channels
//!
//! Each graph edge becomes one channel for the duration of a run. Channels
//! carry [`ChannelMessage`]s: data rows followed by exactly one
//! [`ChannelMessage::EndOfStream`] marker.
//!
//! ## Capacity
//!
//! Channels are unbounded by default. Barrier operators (sorter, aggregator)
//! hold back their output until their whole input is drained, and a bounded
//! channel feeding a sibling branch of the same diamond could fill up and
//! stall the producer forever. Bounded channels are available through
//! [`ChannelCapacity::Bounded`] when every branch is known to drain
//! continuously; sending then becomes a suspension point.
//!
//! ## Node endpoints
//!
//! [`NodeIo`] groups the channel endpoints owned by one node for one run,
//! keyed by port index so operators that route by port (selector, split)
//! address the right downstream node.

use crate::error::ExecutionError;
use crate::value::Row;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::trace;

/// Capacity of the channels linking blocking adapter threads to node tasks.
pub const CHANNEL_BUFFER_SIZE: usize = 1024;

/// A value travelling along an edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMessage {
  /// One data row.
  Row(Row),
  /// No more rows will follow on this channel.
  EndOfStream,
}

impl ChannelMessage {
  /// Returns `true` for the end-of-stream marker.
  pub fn is_end_of_stream(&self) -> bool {
    matches!(self, ChannelMessage::EndOfStream)
  }

  /// Returns the row, if this message carries one.
  pub fn into_row(self) -> Option<Row> {
    match self {
      ChannelMessage::Row(row) => Some(row),
      ChannelMessage::EndOfStream => None,
    }
  }
}

/// Capacity of the channels created for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelCapacity {
  /// Sends never suspend.
  #[default]
  Unbounded,
  /// Sends suspend while the channel holds this many messages.
  Bounded(usize),
}

/// Sending half of an edge channel.
#[derive(Debug, Clone)]
pub enum RowSender {
  /// Bounded channel sender.
  Bounded(mpsc::Sender<ChannelMessage>),
  /// Unbounded channel sender.
  Unbounded(mpsc::UnboundedSender<ChannelMessage>),
}

/// Receiving half of an edge channel.
#[derive(Debug)]
pub enum RowReceiver {
  /// Bounded channel receiver.
  Bounded(mpsc::Receiver<ChannelMessage>),
  /// Unbounded channel receiver.
  Unbounded(mpsc::UnboundedReceiver<ChannelMessage>),
}

/// Creates one edge channel.
pub fn channel(capacity: ChannelCapacity) -> (RowSender, RowReceiver) {
  match capacity {
    ChannelCapacity::Unbounded => {
      let (tx, rx) = mpsc::unbounded_channel();
      (RowSender::Unbounded(tx), RowReceiver::Unbounded(rx))
    }
    ChannelCapacity::Bounded(size) => {
      let (tx, rx) = mpsc::channel(size.max(1));
      (RowSender::Bounded(tx), RowReceiver::Bounded(rx))
    }
  }
}

impl RowSender {
  /// Sends a message. Returns `false` if the receiver is gone.
  pub async fn send(&self, message: ChannelMessage) -> bool {
    match self {
      RowSender::Bounded(tx) => tx.send(message).await.is_ok(),
      RowSender::Unbounded(tx) => tx.send(message).is_ok(),
    }
  }
}

impl RowReceiver {
  /// Receives the next message, `None` once every sender is dropped.
  pub async fn recv(&mut self) -> Option<ChannelMessage> {
    match self {
      RowReceiver::Bounded(rx) => rx.recv().await,
      RowReceiver::Unbounded(rx) => rx.recv().await,
    }
  }

  /// Polls for the next message.
  pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<ChannelMessage>> {
    match self {
      RowReceiver::Bounded(rx) => rx.poll_recv(cx),
      RowReceiver::Unbounded(rx) => rx.poll_recv(cx),
    }
  }
}

/// Channel endpoints held by one node for one run.
#[derive(Debug, Default)]
pub struct NodeIo {
  name: String,
  inputs: BTreeMap<usize, RowReceiver>,
  outputs: BTreeMap<usize, RowSender>,
  eof_sent: bool,
}

impl NodeIo {
  /// Creates an empty set of endpoints for `name`.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Default::default()
    }
  }

  /// Name of the owning node.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Registers the receiving end of the edge entering `port`.
  pub fn add_input(&mut self, port: usize, receiver: RowReceiver) {
    trace!(node = %self.name, port, "registering input channel");
    self.inputs.insert(port, receiver);
  }

  /// Registers the sending end of the edge leaving `port`.
  pub fn add_output(&mut self, port: usize, sender: RowSender) {
    trace!(node = %self.name, port, "registering output channel");
    self.outputs.insert(port, sender);
  }

  /// Number of wired inputs.
  pub fn input_count(&self) -> usize {
    self.inputs.len()
  }

  /// Number of wired outputs.
  pub fn output_count(&self) -> usize {
    self.outputs.len()
  }

  /// Wired input ports in ascending order.
  pub fn input_ports(&self) -> Vec<usize> {
    self.inputs.keys().copied().collect()
  }

  /// Wired output ports in ascending order.
  pub fn output_ports(&self) -> Vec<usize> {
    self.outputs.keys().copied().collect()
  }

  /// Whether the end-of-stream marker was already propagated.
  pub fn is_closed(&self) -> bool {
    self.eof_sent
  }

  /// Receives from the only input of a single-input node.
  pub async fn recv_single(&mut self) -> Result<ChannelMessage, ExecutionError> {
    if self.inputs.len() != 1 {
      return Err(ExecutionError::AmbiguousInput {
        node: self.name.clone(),
        inputs: self.inputs.len(),
      });
    }
    let port = self.inputs.keys().next().copied().unwrap_or_default();
    self.recv(port).await
  }

  /// Receives from input `port`.
  ///
  /// A channel whose senders are all gone without an end-of-stream marker
  /// means the upstream task died, which is reported as an error.
  pub async fn recv(&mut self, port: usize) -> Result<ChannelMessage, ExecutionError> {
    let receiver = self
      .inputs
      .get_mut(&port)
      .ok_or_else(|| ExecutionError::ChannelClosed {
        node: self.name.clone(),
        port,
      })?;
    receiver
      .recv()
      .await
      .ok_or_else(|| ExecutionError::ChannelClosed {
        node: self.name.clone(),
        port,
      })
  }

  /// Polls input `port` without blocking the task.
  pub fn poll_recv(
    &mut self,
    port: usize,
    cx: &mut Context<'_>,
  ) -> Poll<Result<ChannelMessage, ExecutionError>> {
    let Some(receiver) = self.inputs.get_mut(&port) else {
      return Poll::Ready(Err(ExecutionError::ChannelClosed {
        node: self.name.clone(),
        port,
      }));
    };
    match receiver.poll_recv(cx) {
      Poll::Ready(Some(message)) => Poll::Ready(Ok(message)),
      Poll::Ready(None) => Poll::Ready(Err(ExecutionError::ChannelClosed {
        node: self.name.clone(),
        port,
      })),
      Poll::Pending => Poll::Pending,
    }
  }

  /// Sends `row` to every output. Each output gets its own handle on the row.
  pub async fn send_all(&self, row: Row) -> Result<(), ExecutionError> {
    self.ensure_open()?;
    for (port, sender) in &self.outputs {
      self.deliver(*port, sender, ChannelMessage::Row(row.clone())).await?;
    }
    Ok(())
  }

  /// Sends `row` to output `port` only. Rows for an unwired port are dropped.
  pub async fn send_to(&self, port: usize, row: Row) -> Result<(), ExecutionError> {
    self.ensure_open()?;
    match self.outputs.get(&port) {
      Some(sender) => self.deliver(port, sender, ChannelMessage::Row(row)).await,
      None => {
        trace!(node = %self.name, port, "dropping row for unwired output");
        Ok(())
      }
    }
  }

  /// Propagates the end-of-stream marker to every output, once.
  pub async fn send_eof(&mut self) -> Result<(), ExecutionError> {
    if self.eof_sent {
      return Ok(());
    }
    self.eof_sent = true;
    trace!(node = %self.name, outputs = self.outputs.len(), "emitting end of stream");
    for (port, sender) in &self.outputs {
      self.deliver(*port, sender, ChannelMessage::EndOfStream).await?;
    }
    Ok(())
  }

  fn ensure_open(&self) -> Result<(), ExecutionError> {
    if self.eof_sent {
      return Err(ExecutionError::EmitAfterEndOfStream(self.name.clone()));
    }
    Ok(())
  }

  async fn deliver(
    &self,
    port: usize,
    sender: &RowSender,
    message: ChannelMessage,
  ) -> Result<(), ExecutionError> {
    if sender.send(message).await {
      Ok(())
    } else {
      Err(ExecutionError::ReceiverDropped {
        node: self.name.clone(),
        port,
      })
    }
  }
}
