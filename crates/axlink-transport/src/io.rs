//! Stream-contract adapters for tokio byte streams.
//!
//! Any `AsyncRead`/`AsyncWrite` byte stream satisfies the link contracts, so
//! serial ports, USB bulk endpoints or sockets wrapped by their respective
//! driver crates plug in without glue code.

use std::future::Future;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, TransportError};
use crate::traits::{StreamSink, StreamSource};

impl<T> StreamSource for T
where
    T: AsyncRead + Unpin + Send,
{
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize>> + Send {
        async move {
            let n = AsyncReadExt::read(self, buf).await?;
            if n == 0 {
                return Err(TransportError::Closed);
            }
            Ok(n)
        }
    }
}

impl<T> StreamSink for T
where
    T: AsyncWrite + Unpin + Send,
{
    fn write_all(&mut self, buf: &[u8]) -> impl Future<Output = Result<()>> + Send {
        async move {
            AsyncWriteExt::write_all(self, buf).await?;
            self.flush().await?;
            Ok(())
        }
    }
}
