//! Response body wrapper that triggers settlement on flush.
//!
//! This is the linchpin of verify-first behavior: settlement must never
//! start before the response begins flushing, and the response must never
//! wait on settlement. The wrapper delegates body streaming untouched and
//! spawns the [`SettlementJob`] exactly once, when the stream reaches EOF.
//!
//! If the connection dies mid-stream the job is dropped unfired: an
//! abandoned response is not a delivered one. A body dropped after its
//! last declared byte was handed to the transport still fires.

use std::pin::Pin;
use std::task::{Context, Poll};

use actix_web::body::{BodySize, BoxBody, MessageBody};
use bytes::Bytes;

use crate::middleware::SettlementJob;

pub struct SettleOnFlush {
    inner: BoxBody,
    job: Option<SettlementJob>,
    delivered: u64,
    eof: bool,
}

impl SettleOnFlush {
    pub fn new(inner: BoxBody, job: SettlementJob) -> Self {
        Self {
            inner,
            job: Some(job),
            delivered: 0,
            eof: false,
        }
    }

    /// One-shot by construction: taking the job out guards against the
    /// hook firing more than once, however the body is polled or dropped.
    fn trigger(&mut self) {
        if let Some(job) = self.job.take() {
            tokio::spawn(job.run());
        }
    }

    fn fully_delivered(&self) -> bool {
        match self.inner.size() {
            // A zero-length body has nothing to deliver, so byte counting
            // says nothing; only a polled EOF proves the response went out.
            BodySize::Sized(n) if n > 0 => self.delivered >= n,
            _ => self.eof,
        }
    }
}

impl MessageBody for SettleOnFlush {
    type Error = Box<dyn std::error::Error>;

    fn size(&self) -> BodySize {
        self.inner.size()
    }

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.delivered += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(None) => {
                this.eof = true;
                this.trigger();
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

impl Drop for SettleOnFlush {
    fn drop(&mut self) {
        // Dispatchers that stop polling after the final chunk still settle;
        // a body abandoned mid-stream does not.
        if self.eof || self.fully_delivered() {
            self.trigger();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use futures::future::BoxFuture;
    use futures::FutureExt;
    use tokio::sync::mpsc::UnboundedReceiver;

    use tollgate::{
        EventBus, EventKind, Facilitator, LifecycleEvent, PaymentCredential, PaymentRequirement,
        SettlementOutcome, TollgateError, VerifyOutcome,
    };
    use uuid::Uuid;

    struct StubFacilitator;

    impl Facilitator for StubFacilitator {
        fn verify<'a>(
            &'a self,
            _credential: &'a PaymentCredential,
            _requirement: &'a PaymentRequirement,
        ) -> BoxFuture<'a, Result<VerifyOutcome, TollgateError>> {
            async { Ok(VerifyOutcome::valid("0xpayer")) }.boxed()
        }

        fn settle<'a>(
            &'a self,
            _credential: &'a PaymentCredential,
            _requirement: &'a PaymentRequirement,
        ) -> BoxFuture<'a, Result<SettlementOutcome, TollgateError>> {
            async { Ok(SettlementOutcome::settled("0xtx")) }.boxed()
        }
    }

    fn requirement() -> PaymentRequirement {
        PaymentRequirement {
            scheme: "exact".to_string(),
            network: "eip155:84532".to_string(),
            amount: 100,
            asset: "0xasset".to_string(),
            decimals: 6,
            pay_to: "0xpayee".to_string(),
            description: None,
        }
    }

    fn job(bus: &Arc<EventBus>) -> (SettlementJob, UnboundedReceiver<LifecycleEvent>) {
        let (_handle, rx) = bus.subscribe();
        let job = SettlementJob {
            facilitator: Arc::new(StubFacilitator),
            bus: bus.clone(),
            credential: PaymentCredential::new("blob"),
            requirement: requirement(),
            request_id: Uuid::new_v4(),
            route: "GET /weather".to_string(),
            payer: Some("0xpayer".to_string()),
        };
        (job, rx)
    }

    fn poll_once(body: &mut SettleOnFlush) -> Poll<Option<Result<Bytes, <SettleOnFlush as MessageBody>::Error>>> {
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        Pin::new(body).poll_next(&mut cx)
    }

    #[tokio::test]
    async fn settles_exactly_once_after_eof() {
        let bus = Arc::new(EventBus::new());
        let (job, mut rx) = job(&bus);
        let mut body = SettleOnFlush::new(BoxBody::new(Bytes::from_static(b"payload")), job);

        match poll_once(&mut body) {
            Poll::Ready(Some(Ok(chunk))) => assert_eq!(&chunk[..], b"payload"),
            other => panic!("expected payload chunk, got {other:?}"),
        }
        assert!(matches!(poll_once(&mut body), Poll::Ready(None)));
        // Polling past EOF and dropping must not fire again.
        assert!(matches!(poll_once(&mut body), Poll::Ready(None)));
        drop(body);

        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.kind, EventKind::SettleStarted);
        let second = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.kind, EventKind::SettleCompleted);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn abandoned_body_never_settles() {
        let bus = Arc::new(EventBus::new());
        let (job, mut rx) = job(&bus);
        let body = SettleOnFlush::new(BoxBody::new(Bytes::from_static(b"payload")), job);

        // Connection gone before anything was written.
        drop(body);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unpolled_empty_body_never_settles() {
        let bus = Arc::new(EventBus::new());
        let (job, mut rx) = job(&bus);
        let body = SettleOnFlush::new(BoxBody::new(()), job);

        // Dropped before the response head was ever written.
        drop(body);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_body_settles_once_polled_to_eof() {
        let bus = Arc::new(EventBus::new());
        let (job, mut rx) = job(&bus);
        let mut body = SettleOnFlush::new(BoxBody::new(()), job);

        assert!(matches!(poll_once(&mut body), Poll::Ready(None)));
        drop(body);

        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.kind, EventKind::SettleStarted);
    }

    #[tokio::test]
    async fn drop_after_last_byte_still_settles() {
        let bus = Arc::new(EventBus::new());
        let (job, mut rx) = job(&bus);
        let mut body = SettleOnFlush::new(BoxBody::new(Bytes::from_static(b"payload")), job);

        assert!(matches!(poll_once(&mut body), Poll::Ready(Some(Ok(_)))));
        // Dispatcher drops the body without polling the trailing None.
        drop(body);

        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.kind, EventKind::SettleStarted);
    }
}
