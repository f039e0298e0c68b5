//! Push delivery for subscribed channels.

use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::error::WhitebitError;
use crate::ws::handler::HandlerCommand;
use crate::ws::messages::decode;

/// Stream of push payloads (`params`) for one channel.
///
/// Payloads arrive in the order the frames arrived on the socket. The stream
/// ends when the connection closes, when the channel is unsubscribed, or when
/// a newer subscription to the same channel replaces this one. Dropping the
/// stream unregisters it.
pub struct Subscription {
    channel: String,
    token: u64,
    inner: UnboundedReceiverStream<Value>,
    cmd_tx: mpsc::UnboundedSender<HandlerCommand>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("token", &self.token)
            .finish()
    }
}

impl Subscription {
    pub(crate) fn new(
        channel: String,
        token: u64,
        receiver: mpsc::UnboundedReceiver<Value>,
        cmd_tx: mpsc::UnboundedSender<HandlerCommand>,
    ) -> Self {
        Self {
            channel,
            token,
            inner: UnboundedReceiverStream::new(receiver),
            cmd_tx,
        }
    }

    /// Channel this subscription receives.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Wait for the next payload.
    pub async fn recv(&mut self) -> Option<Value> {
        self.inner.next().await
    }

    /// Decode every payload into `T`.
    pub fn typed<T: DeserializeOwned>(self) -> TypedSubscription<T> {
        TypedSubscription {
            inner: self,
            _marker: PhantomData,
        }
    }

    /// Hand every payload to `callback` on a spawned task.
    ///
    /// Each invocation is isolated: an `Err` or a panic is logged and the
    /// next payload is still delivered.
    pub fn for_each_callback<F, E>(mut self, mut callback: F) -> CallbackHandle
    where
        F: FnMut(Value) -> Result<(), E> + Send + 'static,
        E: std::fmt::Display,
    {
        let channel = self.channel.clone();
        let task = tokio::spawn(async move {
            while let Some(payload) = self.recv().await {
                match catch_unwind(AssertUnwindSafe(|| callback(payload))) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::warn!(channel = %self.channel, "Subscription callback failed: {}", e);
                    }
                    Err(_) => {
                        tracing::warn!(channel = %self.channel, "Subscription callback panicked");
                    }
                }
            }
            tracing::debug!(channel = %self.channel, "Subscription callback finished");
        });

        CallbackHandle { channel, task }
    }
}

impl Stream for Subscription {
    type Item = Value;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(HandlerCommand::Unsubscribe {
            channel: self.channel.clone(),
            token: Some(self.token),
        });
    }
}

/// A [`Subscription`] whose payloads are decoded into `T`.
///
/// A payload that does not match `T` yields `Err(WhitebitError::Protocol)`
/// and the stream continues.
pub struct TypedSubscription<T> {
    inner: Subscription,
    _marker: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for TypedSubscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TypedSubscription").field(&self.inner).finish()
    }
}

impl<T: DeserializeOwned> TypedSubscription<T> {
    /// Channel this subscription receives.
    pub fn channel(&self) -> &str {
        self.inner.channel()
    }

    /// Wait for the next decoded payload.
    pub async fn recv(&mut self) -> Option<Result<T, WhitebitError>> {
        self.inner.recv().await.map(decode)
    }
}

impl<T: DeserializeOwned> Stream for TypedSubscription<T> {
    type Item = Result<T, WhitebitError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner)
            .poll_next(cx)
            .map(|payload| payload.map(decode))
    }
}

/// Handle to a callback delivery task.
#[derive(Debug)]
pub struct CallbackHandle {
    channel: String,
    task: JoinHandle<()>,
}

impl CallbackHandle {
    /// Channel the callback receives.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Stop delivering to the callback.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait until the subscription ends.
    pub async fn finished(self) {
        let _ = self.task.await;
    }
}
