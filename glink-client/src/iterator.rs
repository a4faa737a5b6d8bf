/// Lazy, cancellable response iterators
///
/// A `ResponseIterator` is the client end of one server-side cursor. It is a
/// three-state machine: `Open` until the server sends its terminal fragment
/// (`Exhausted`) or the consumer closes it (`Closed`); both end states are
/// absorbing. The server sends results in batches and pauses after each
/// one; the iterator asks for the next batch only when it is pulled again.

use crate::error::{ClientError, Result};
use crate::router::{describe, Delivery, RequestId};
use crate::transceiver::Shared;
use futures::stream::FusedStream;
use futures::{ready, Stream};
use glink_proto::{transaction_request::Req, transaction_response::Res, IterCloseReq, IterContinueReq, IterItem};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::time::Sleep;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IteratorState {
    /// More fragments may follow
    Open,
    /// The server sent its terminal fragment, or the iterator failed
    Exhausted,
    /// The consumer closed the iterator
    Closed,
}

/// Pull-driven stream of fragments for one iterator token
pub struct ResponseIterator {
    id: RequestId,
    state: IteratorState,
    receiver: mpsc::UnboundedReceiver<Delivery>,
    shared: Arc<Shared>,
    /// The server paused after a batch; ask for more on the next pull
    needs_continue: bool,
    deadline: Option<Pin<Box<Sleep>>>,
}

impl ResponseIterator {
    pub(crate) fn new(
        id: RequestId,
        receiver: mpsc::UnboundedReceiver<Delivery>,
        shared: Arc<Shared>,
    ) -> Self {
        Self {
            id,
            state: IteratorState::Open,
            receiver,
            shared,
            needs_continue: false,
            deadline: None,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn state(&self) -> IteratorState {
        self.state
    }

    /// Release the server cursor without waiting
    ///
    /// Sends exactly one close request the first time it is called on an
    /// open iterator; does nothing otherwise. Fragments that are buffered or
    /// still in flight are discarded.
    pub fn close(&mut self) {
        if self.state != IteratorState::Open {
            return;
        }
        self.state = IteratorState::Closed;
        self.deadline = None;

        self.shared.router.cancel(self.id);
        if let Err(e) = self
            .shared
            .send_control(self.id, Req::IterClose(IterCloseReq {}))
        {
            debug!(request_id = %self.id, error = %e, "Close request not sent");
        }

        self.receiver.close();
        let mut dropped = 0usize;
        while self.receiver.try_recv().is_ok() {
            dropped += 1;
        }
        debug!(request_id = %self.id, dropped, "Iterator closed");
    }

    /// Move to `Exhausted` on a terminal fragment or error
    fn exhaust(&mut self) {
        self.state = IteratorState::Exhausted;
        self.deadline = None;
        self.receiver.close();
    }

    fn poll_deadline(&mut self, cx: &mut Context<'_>) -> Poll<ClientError> {
        let Some(timeout) = self.shared.config.request_timeout else {
            return Poll::Pending;
        };

        let deadline = self
            .deadline
            .get_or_insert_with(|| Box::pin(tokio::time::sleep(timeout)));
        ready!(deadline.as_mut().poll(cx));

        warn!(request_id = %self.id, ?timeout, "Iterator timed out waiting for fragment");
        Poll::Ready(ClientError::Timeout(format!(
            "no fragment for iterator {} within {:?}",
            self.id, timeout
        )))
    }
}

impl Stream for ResponseIterator {
    type Item = Result<IterItem>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.state != IteratorState::Open {
                return Poll::Ready(None);
            }

            if this.needs_continue {
                this.needs_continue = false;
                trace!(request_id = %this.id, "Requesting next batch");
                if let Err(e) = this
                    .shared
                    .send_control(this.id, Req::IterContinue(IterContinueReq {}))
                {
                    this.shared.router.retire(this.id);
                    this.exhaust();
                    return Poll::Ready(Some(Err(e)));
                }
            }

            match this.receiver.poll_recv(cx) {
                Poll::Ready(Some(Ok(response))) => {
                    this.deadline = None;
                    match response.res {
                        Some(Res::IterItem(item)) => return Poll::Ready(Some(Ok(item))),
                        Some(Res::IterContinue(_)) => {
                            this.needs_continue = true;
                        }
                        Some(Res::IterDone(_)) => {
                            trace!(request_id = %this.id, "Iterator exhausted");
                            this.exhaust();
                            return Poll::Ready(None);
                        }
                        other => {
                            let err = ClientError::Protocol(format!(
                                "unexpected {} fragment on iterator {}",
                                describe(&other),
                                this.id
                            ));
                            warn!(request_id = %this.id, error = %err, "Closing iterator");
                            this.close();
                            return Poll::Ready(Some(Err(err)));
                        }
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    this.exhaust();
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    this.exhaust();
                    return Poll::Ready(Some(Err(ClientError::Transport(format!(
                        "iterator {} lost its response slot",
                        this.id
                    )))));
                }
                Poll::Pending => {
                    let err = ready!(this.poll_deadline(cx));
                    this.close();
                    return Poll::Ready(Some(Err(err)));
                }
            }
        }
    }
}

impl FusedStream for ResponseIterator {
    fn is_terminated(&self) -> bool {
        self.state != IteratorState::Open
    }
}

impl Drop for ResponseIterator {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ResponseIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseIterator")
            .field("id", &self.id)
            .field("state", &self.state)
            .finish()
    }
}

type Decoder<T> = Box<dyn Fn(IterItem) -> Result<T> + Send>;

/// Forward-only, single-pass sequence of decoded iterator results
///
/// Pulling is the only way progress is made. A sequence that is abandoned
/// before exhaustion is closed when dropped; call `close` to release the
/// server cursor earlier.
pub struct LazySequence<T> {
    inner: ResponseIterator,
    decode: Decoder<T>,
}

impl<T> LazySequence<T> {
    pub(crate) fn new(inner: ResponseIterator, decode: Decoder<T>) -> Self {
        Self { inner, decode }
    }

    pub fn state(&self) -> IteratorState {
        self.inner.state()
    }

    pub fn close(&mut self) {
        self.inner.close();
    }
}

impl<T> Stream for LazySequence<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
            None => Poll::Ready(None),
            Some(Err(e)) => Poll::Ready(Some(Err(e))),
            Some(Ok(item)) => match (this.decode)(item) {
                Ok(value) => Poll::Ready(Some(Ok(value))),
                Err(e) => {
                    this.inner.close();
                    Poll::Ready(Some(Err(e)))
                }
            },
        }
    }
}

impl<T> FusedStream for LazySequence<T> {
    fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }
}

impl<T> fmt::Debug for LazySequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySequence")
            .field("inner", &self.inner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::transceiver::Transceiver;
    use futures::StreamExt;
    use glink_proto::{
        iter_item, type_method_iter_res, GetSubtypesRes, IterContinueRes, IterDoneRes,
        OpenTypeIterReq, TransactionRequest, TransactionResponse, TypeMethodIterRes,
    };
    use std::time::Duration;
    use tonic::Status;

    struct Harness {
        transceiver: Transceiver,
        requests: mpsc::UnboundedReceiver<TransactionRequest>,
        responses: mpsc::UnboundedSender<std::result::Result<TransactionResponse, Status>>,
    }

    impl Harness {
        fn new(config: ClientConfig) -> Self {
            let (out_tx, out_rx) = mpsc::unbounded_channel();
            let (in_tx, in_rx) = mpsc::unbounded_channel();
            let inbound = futures::stream::unfold(in_rx, |mut rx| async move {
                rx.recv().await.map(|message| (message, rx))
            });
            Self {
                transceiver: Transceiver::new(out_tx, inbound, config).unwrap(),
                requests: out_rx,
                responses: in_tx,
            }
        }

        fn reply(&self, id: &[u8], res: Res) {
            self.responses
                .send(Ok(TransactionResponse::new(id.to_vec(), res)))
                .unwrap();
        }

        fn item(&self, id: &[u8], label: &str) {
            self.reply(
                id,
                Res::IterItem(IterItem {
                    item: Some(iter_item::Item::TypeMethod(TypeMethodIterRes {
                        res: Some(type_method_iter_res::Res::GetSubtypes(GetSubtypesRes {
                            subtype: Some(glink_proto::Concept::entity_type(label)),
                        })),
                    })),
                }),
            );
        }
    }

    fn open_request() -> TransactionRequest {
        TransactionRequest {
            id: Vec::new(),
            metadata: Default::default(),
            req: Some(Req::OpenTypeIter(OpenTypeIterReq {
                label: "person".to_string(),
                scope: String::new(),
                method: None,
                options: None,
            })),
        }
    }

    #[tokio::test]
    async fn test_fragments_then_exhaustion() {
        let mut harness = Harness::new(ClientConfig::default());
        let mut iterator = harness.transceiver.open_iterator(open_request()).unwrap();
        let open = harness.requests.recv().await.unwrap();

        harness.item(&open.id, "a");
        harness.item(&open.id, "b");
        harness.reply(&open.id, Res::IterDone(IterDoneRes {}));

        assert!(iterator.next().await.unwrap().is_ok());
        assert!(iterator.next().await.unwrap().is_ok());
        assert!(iterator.next().await.is_none());
        assert_eq!(iterator.state(), IteratorState::Exhausted);
        assert!(iterator.next().await.is_none());
        assert!(iterator.is_terminated());

        drop(iterator);
        assert!(harness.requests.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_continue_sent_only_when_pulled() {
        let mut harness = Harness::new(ClientConfig::default());
        let mut iterator = harness.transceiver.open_iterator(open_request()).unwrap();
        let open = harness.requests.recv().await.unwrap();

        harness.item(&open.id, "a");
        harness.reply(&open.id, Res::IterContinue(IterContinueRes {}));

        assert!(iterator.next().await.unwrap().is_ok());
        tokio::task::yield_now().await;
        assert!(harness.requests.try_recv().is_err());

        let pull = tokio::spawn(async move {
            let item = iterator.next().await;
            (item, iterator)
        });
        let cont = harness.requests.recv().await.unwrap();
        assert_eq!(cont.id, open.id);
        assert!(matches!(cont.req, Some(Req::IterContinue(_))));

        harness.item(&open.id, "b");
        let (item, _iterator) = pull.await.unwrap();
        assert!(item.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_discards() {
        let mut harness = Harness::new(ClientConfig::default());
        let mut iterator = harness.transceiver.open_iterator(open_request()).unwrap();
        let open = harness.requests.recv().await.unwrap();

        harness.item(&open.id, "a");
        harness.item(&open.id, "b");
        assert!(iterator.next().await.unwrap().is_ok());

        iterator.close();
        iterator.close();
        assert_eq!(iterator.state(), IteratorState::Closed);
        assert!(iterator.next().await.is_none());

        let close = harness.requests.recv().await.unwrap();
        assert_eq!(close.id, open.id);
        assert!(matches!(close.req, Some(Req::IterClose(_))));

        drop(iterator);
        tokio::task::yield_now().await;
        assert!(harness.requests.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dropping_open_iterator_closes_it() {
        let mut harness = Harness::new(ClientConfig::default());
        let iterator = harness.transceiver.open_iterator(open_request()).unwrap();
        let open = harness.requests.recv().await.unwrap();

        drop(iterator);
        let close = harness.requests.recv().await.unwrap();
        assert_eq!(close.id, open.id);
        assert!(matches!(close.req, Some(Req::IterClose(_))));

        harness.reply(&open.id, Res::IterDone(IterDoneRes {}));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(harness.transceiver.pending(), 0);
    }

    #[tokio::test]
    async fn test_fragment_timeout() {
        let config = ClientConfig::default().with_request_timeout(Duration::from_millis(20));
        let harness = Harness::new(config);
        let mut iterator = harness.transceiver.open_iterator(open_request()).unwrap();

        let err = iterator.next().await.unwrap().unwrap_err();
        assert!(matches!(err, ClientError::Timeout(_)));
        assert_eq!(iterator.state(), IteratorState::Closed);
    }

    #[tokio::test]
    async fn test_decode_failure_closes_sequence() {
        let mut harness = Harness::new(ClientConfig::default());
        let iterator = harness.transceiver.open_iterator(open_request()).unwrap();
        let open = harness.requests.recv().await.unwrap();
        let mut sequence: LazySequence<()> = LazySequence::new(
            iterator,
            Box::new(|_: IterItem| -> Result<()> {
                Err(ClientError::Protocol("bad item".to_string()))
            }),
        );

        harness.item(&open.id, "a");
        assert!(sequence.next().await.unwrap().is_err());
        assert_eq!(sequence.state(), IteratorState::Closed);
        assert!(sequence.next().await.is_none());
    }
}
