//! Destinations for server-streaming responses.
//!
//! A handler that emits several messages writes them to a [`StreamSink`].
//! When served over gRPC the sink is a [`ChannelStream`] feeding the response
//! stream; in run mode it is a [`LogStream`] that writes each message to the
//! log instead.

use std::fmt::Debug;
use std::marker::PhantomData;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Status;

/// Anything a streaming handler can send its messages to.
#[async_trait]
pub trait StreamSink<T>: Send + Sync {
    async fn send(&self, item: T) -> Result<(), Status>;
}

/// Sink that logs every message. Never fails.
pub struct LogStream<T> {
    _marker: PhantomData<fn(T)>,
}

impl<T> LogStream<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for LogStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> StreamSink<T> for LogStream<T>
where
    T: Debug + Send + 'static,
{
    async fn send(&self, item: T) -> Result<(), Status> {
        tracing::info!(data = ?item, "New stream data received");
        Ok(())
    }
}

/// Sink backed by a channel whose receiving half is the gRPC response stream.
pub struct ChannelStream<T> {
    tx: mpsc::Sender<Result<T, Status>>,
}

impl<T> ChannelStream<T> {
    /// Create a sink and the stream to return from a server-streaming handler.
    pub fn channel(buffer: usize) -> (Self, ReceiverStream<Result<T, Status>>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, ReceiverStream::new(rx))
    }

    /// Send a terminal error to the client.
    pub async fn fail(&self, status: Status) -> Result<(), Status> {
        self.tx
            .send(Err(status))
            .await
            .map_err(|_| Status::cancelled("client disconnected"))
    }
}

impl<T> Clone for ChannelStream<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

#[async_trait]
impl<T> StreamSink<T> for ChannelStream<T>
where
    T: Send + 'static,
{
    async fn send(&self, item: T) -> Result<(), Status> {
        self.tx
            .send(Ok(item))
            .await
            .map_err(|_| Status::cancelled("client disconnected"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn log_stream_always_succeeds() {
        let sink = LogStream::<String>::new();
        for i in 0..3 {
            assert!(sink.send(format!("message {i}")).await.is_ok());
        }
    }

    #[tokio::test]
    async fn channel_stream_forwards_in_order() {
        let (sink, mut stream) = ChannelStream::channel(4);
        sink.send(1u32).await.unwrap();
        sink.send(2u32).await.unwrap();
        drop(sink);

        let received: Vec<u32> = {
            let mut out = Vec::new();
            while let Some(item) = stream.next().await {
                out.push(item.unwrap());
            }
            out
        };
        assert_eq!(received, [1, 2]);
    }

    #[tokio::test]
    async fn channel_stream_reports_dropped_receiver() {
        let (sink, stream) = ChannelStream::<u32>::channel(1);
        drop(stream);
        let status = sink.send(1).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::Cancelled);
    }
}
