use super::{AdapterOptions, RowSink, TargetFactory};
use crate::error::AdapterError;
use crate::value::Row;
use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, Stdout};

/// Target adapter printing one row per line on standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdOut;

struct StdOutWriter {
  out: Stdout,
}

#[async_trait]
impl RowSink for StdOutWriter {
  async fn send(&mut self, row: Row) -> Result<(), AdapterError> {
    let line = format!("{}\n", row);
    self.out.write_all(line.as_bytes()).await?;
    Ok(())
  }

  async fn close(&mut self) -> Result<(), AdapterError> {
    self.out.flush().await?;
    Ok(())
  }
}

#[async_trait]
impl TargetFactory for StdOut {
  fn name(&self) -> &'static str {
    "stdout"
  }

  async fn open(
    &self,
    _node: &str,
    _options: &AdapterOptions,
  ) -> Result<Box<dyn RowSink>, AdapterError> {
    Ok(Box::new(StdOutWriter {
      out: tokio::io::stdout(),
    }))
  }
}
