//! Response body capture.
//!
//! [`CapturingBody`] sits between a response body and the connection
//! writing it out. Each frame is passed through untouched and in order; data
//! frames are also appended to an internal buffer. When the stream ends, or
//! the body is dropped early, the buffered bytes are handed to a completion
//! callback exactly once.

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::{Bytes, BytesMut};
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;

type OnComplete = Box<dyn FnOnce(Bytes) + Send + 'static>;

pin_project! {
    /// A body decorator that mirrors every data frame into a buffer.
    pub struct CapturingBody<B> {
        #[pin]
        inner: B,
        captured: BytesMut,
        on_complete: Option<OnComplete>,
    }

    impl<B> PinnedDrop for CapturingBody<B> {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            if let Some(on_complete) = this.on_complete.take() {
                on_complete(this.captured.split().freeze());
            }
        }
    }
}

impl<B> CapturingBody<B> {
    /// Wrap `inner`; `on_complete` receives every data byte written through.
    pub fn new(inner: B, on_complete: impl FnOnce(Bytes) + Send + 'static) -> Self {
        Self {
            inner,
            captured: BytesMut::new(),
            on_complete: Some(Box::new(on_complete)),
        }
    }
}

impl<B> Body for CapturingBody<B>
where
    B: Body<Data = Bytes>,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();

        match ready!(this.inner.poll_frame(cx)) {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    this.captured.extend_from_slice(data);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Some(Err(e)) => Poll::Ready(Some(Err(e))),
            None => {
                if let Some(on_complete) = this.on_complete.take() {
                    on_complete(this.captured.split().freeze());
                }
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
