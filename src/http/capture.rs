//! Body capture for logging.
//!
//! # Responsibilities
//! - Relay body frames untouched while keeping a copy of the data
//! - Enforce the logging size ceiling (over-limit bodies are not kept)
//! - Signal completion exactly when the body has fully streamed
//!
//! # Design Decisions
//! - Completion is detected on the final frame via `is_end_stream`, not
//!   only on a trailing `None`: hyper stops polling a length-delimited
//!   body as soon as the declared length has been written
//! - A body that errors or is dropped early never signals completion

use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{ready, Context, Poll};

use bytes::{Bytes, BytesMut};
use hyper::body::{Body, Frame, SizeHint};

#[derive(Debug)]
enum CaptureState {
    Disabled,
    Buffering { buf: BytesMut, limit: usize },
    Overflowed,
}

/// Shared copy of a body as it streams.
#[derive(Debug, Clone)]
pub struct BodyCapture {
    state: Arc<Mutex<CaptureState>>,
}

impl BodyCapture {
    /// Keep up to `limit` bytes; a body larger than that is discarded whole.
    pub fn new(limit: usize) -> Self {
        Self::with_state(CaptureState::Buffering {
            buf: BytesMut::new(),
            limit,
        })
    }

    /// A capture that never stores anything.
    pub fn disabled() -> Self {
        Self::with_state(CaptureState::Disabled)
    }

    fn with_state(state: CaptureState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn append(&self, chunk: &[u8]) {
        let mut state = self.lock();
        if let CaptureState::Buffering { buf, limit } = &mut *state {
            if buf.len() + chunk.len() > *limit {
                *state = CaptureState::Overflowed;
            } else {
                buf.extend_from_slice(chunk);
            }
        }
    }

    /// The bytes seen so far, or `None` if disabled or over the limit.
    pub fn contents(&self) -> Option<Bytes> {
        match &*self.lock() {
            CaptureState::Buffering { buf, .. } => Some(Bytes::copy_from_slice(buf)),
            CaptureState::Disabled | CaptureState::Overflowed => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CaptureState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Callback run once with the captured contents when the body completes.
pub type OnComplete = Box<dyn FnOnce(Option<Bytes>) + Send>;

/// Body wrapper that tees data frames into a [`BodyCapture`].
pub struct CaptureBody<B> {
    inner: B,
    capture: BodyCapture,
    on_complete: Option<OnComplete>,
}

impl<B> CaptureBody<B>
where
    B: Body<Data = Bytes> + Unpin,
{
    pub fn new(inner: B, capture: BodyCapture) -> Self {
        Self {
            inner,
            capture,
            on_complete: None,
        }
    }

    /// Wrap `inner` and run `on_complete` once it has fully streamed. An
    /// already-empty body completes immediately.
    pub fn with_completion(inner: B, capture: BodyCapture, on_complete: OnComplete) -> Self {
        let mut body = Self {
            inner,
            capture,
            on_complete: Some(on_complete),
        };
        if body.inner.is_end_stream() {
            body.complete();
        }
        body
    }

    fn complete(&mut self) {
        if let Some(callback) = self.on_complete.take() {
            callback(self.capture.contents());
        }
    }
}

impl<B> Body for CaptureBody<B>
where
    B: Body<Data = Bytes> + Unpin,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let frame = ready!(Pin::new(&mut this.inner).poll_frame(cx));

        match &frame {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    this.capture.append(data);
                }
                if this.inner.is_end_stream() {
                    this.complete();
                }
            }
            // Dropping the callback releases whatever it owns without recording.
            Some(Err(_)) => this.on_complete = None,
            None => this.complete(),
        }

        Poll::Ready(frame)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
