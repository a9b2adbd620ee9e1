//! Multi-input operators.
//!
//! Both read every input until its own end-of-stream marker and emit a single
//! end-of-stream marker once all inputs are exhausted. They differ in how they
//! pick the next input to read.

use crate::capability::Capabilities;
use crate::channels::{ChannelMessage, NodeIo};
use crate::error::ExecutionError;
use crate::processor::StreamProcessor;
use crate::transformation::Operator;
use crate::value::Row;
use async_trait::async_trait;
use futures::future::poll_fn;
use std::task::{Context, Poll};
use tracing::trace;

/// Merges all inputs into one stream.
///
/// Inputs are polled round robin, starting after the input served last, so
/// a busy input cannot starve the others. Rows of one input keep their order;
/// rows of different inputs interleave in no guaranteed order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Union;

impl Union {
  /// Creates a union.
  pub fn new() -> Self {
    Self
  }
}

impl Operator for Union {
  fn kind(&self) -> &'static str {
    "Union"
  }

  fn capabilities(&self) -> Capabilities {
    Capabilities::MANY_TO_MANY
  }

  fn processor(&self, io: NodeIo) -> Result<Box<dyn StreamProcessor>, ExecutionError> {
    Ok(Box::new(UnionProcessor {
      live: io.input_ports(),
      cursor: 0,
      io,
    }))
  }
}

struct UnionProcessor {
  io: NodeIo,
  live: Vec<usize>,
  cursor: usize,
}

impl UnionProcessor {
  /// Polls live inputs once each, starting at the cursor. Returns the
  /// position of the input that produced a message.
  fn poll_live(
    &mut self,
    cx: &mut Context<'_>,
  ) -> Poll<Result<(usize, ChannelMessage), ExecutionError>> {
    let count = self.live.len();
    for offset in 0..count {
      let position = (self.cursor + offset) % count;
      match self.io.poll_recv(self.live[position], cx) {
        Poll::Ready(Ok(message)) => {
          self.cursor = (position + 1) % count;
          return Poll::Ready(Ok((position, message)));
        }
        Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
        Poll::Pending => {}
      }
    }
    Poll::Pending
  }
}

#[async_trait]
impl StreamProcessor for UnionProcessor {
  fn io(&self) -> &NodeIo {
    &self.io
  }

  fn io_mut(&mut self) -> &mut NodeIo {
    &mut self.io
  }

  async fn get_row(&mut self) -> Result<ChannelMessage, ExecutionError> {
    while !self.live.is_empty() {
      let (position, message) = poll_fn(|cx| self.poll_live(cx)).await?;
      match message {
        ChannelMessage::Row(row) => return Ok(ChannelMessage::Row(row)),
        ChannelMessage::EndOfStream => {
          let port = self.live.remove(position);
          trace!(node = %self.io.name(), port, "input exhausted");
          // The next input slid into `position`.
          self.cursor = if self.live.is_empty() {
            0
          } else {
            position % self.live.len()
          };
        }
      }
    }
    Ok(ChannelMessage::EndOfStream)
  }
}

/// Concatenates one row of every input into a wider row.
///
/// Each round pulls one row from every input not yet exhausted, in input port
/// order, and emits their fields side by side. Inputs that run out earlier
/// simply stop contributing, so later rows get narrower.
#[derive(Debug, Clone, Copy, Default)]
pub struct Concat;

impl Concat {
  /// Creates a concat.
  pub fn new() -> Self {
    Self
  }
}

impl Operator for Concat {
  fn kind(&self) -> &'static str {
    "Concat"
  }

  fn capabilities(&self) -> Capabilities {
    Capabilities::MANY_TO_MANY
  }

  fn processor(&self, io: NodeIo) -> Result<Box<dyn StreamProcessor>, ExecutionError> {
    Ok(Box::new(ConcatProcessor {
      live: io.input_ports(),
      io,
    }))
  }
}

struct ConcatProcessor {
  io: NodeIo,
  live: Vec<usize>,
}

#[async_trait]
impl StreamProcessor for ConcatProcessor {
  fn io(&self) -> &NodeIo {
    &self.io
  }

  fn io_mut(&mut self) -> &mut NodeIo {
    &mut self.io
  }

  async fn get_row(&mut self) -> Result<ChannelMessage, ExecutionError> {
    while !self.live.is_empty() {
      let mut parts = Vec::with_capacity(self.live.len());
      let mut still_live = Vec::with_capacity(self.live.len());
      for port in std::mem::take(&mut self.live) {
        match self.io.recv(port).await? {
          ChannelMessage::Row(row) => {
            parts.push(row);
            still_live.push(port);
          }
          ChannelMessage::EndOfStream => {
            trace!(node = %self.io.name(), port, "input exhausted");
          }
        }
      }
      self.live = still_live;
      if !parts.is_empty() {
        return Ok(ChannelMessage::Row(Row::concat(&parts)));
      }
    }
    Ok(ChannelMessage::EndOfStream)
  }
}
