//! The payment gate: verify-first middleware for priced routes.
//!
//! Per request: classify, answer bare probes with 402, verify credentials
//! under a timeout, then hand control to the resource handler. Settlement
//! is never inline — the response body is wrapped so that a detached
//! settlement task starts only once the response has been flushed.

use std::sync::Arc;

use actix_web::body::{BoxBody, MessageBody};
use actix_web::middleware::Next;
use actix_web::{dev::ServiceRequest, dev::ServiceResponse, web, Error, HttpMessage, HttpResponse};
use uuid::Uuid;

use tollgate::{
    encode_requirement_header, EventBus, EventKind, Facilitator, LifecycleEvent, PaymentCredential,
    PaymentRequiredBody, PaymentRequirement, RequestContext, VerifyOutcome, REQUIREMENT_HEADER,
    X402_VERSION,
};

use crate::body::SettleOnFlush;
use crate::classify::{classify, Classification};
use crate::metrics;
use crate::state::GatewayState;

/// Inserted into request extensions once verification passes, so handlers
/// can see who paid without re-parsing anything.
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    pub request_id: Uuid,
    pub payer: Option<String>,
}

/// Deferred settlement work, carried by the response body wrapper and run
/// as a detached task once the body has been flushed.
pub struct SettlementJob {
    pub facilitator: Arc<dyn Facilitator>,
    pub bus: Arc<EventBus>,
    pub credential: PaymentCredential,
    pub requirement: PaymentRequirement,
    pub request_id: Uuid,
    pub route: String,
    pub payer: Option<String>,
}

impl SettlementJob {
    pub async fn run(self) {
        let mut started = LifecycleEvent::new(EventKind::SettleStarted, self.request_id)
            .with_detail("route", self.route.clone())
            .with_target(self.requirement.pay_to.clone());
        if let Some(payer) = &self.payer {
            started = started.with_actor(payer.clone());
        }
        self.bus.publish(started);

        match self
            .facilitator
            .settle(&self.credential, &self.requirement)
            .await
        {
            Ok(outcome) if outcome.success => {
                let reference = outcome.reference.unwrap_or_default();
                tracing::info!(
                    request_id = %self.request_id,
                    reference = %reference,
                    "payment settled"
                );
                metrics::SETTLEMENTS.with_label_values(&["settled"]).inc();
                let mut event = LifecycleEvent::new(EventKind::SettleCompleted, self.request_id)
                    .with_detail("reference", reference)
                    .with_target(self.requirement.pay_to.clone());
                if let Some(payer) = &self.payer {
                    event = event.with_actor(payer.clone());
                }
                self.bus.publish(event);
            }
            Ok(outcome) => {
                let reason = outcome
                    .failure_reason
                    .unwrap_or_else(|| "settlement failed".to_string());
                self.settlement_failed(reason, "failed");
            }
            Err(e) => {
                self.settlement_failed(e.to_string(), "error");
            }
        }
    }

    /// Failures here never reach the caller — the response is long gone.
    /// They are logged and published for observers only.
    fn settlement_failed(&self, reason: String, label: &str) {
        tracing::warn!(
            request_id = %self.request_id,
            reason = %reason,
            "settlement failed"
        );
        metrics::SETTLEMENTS.with_label_values(&[label]).inc();
        self.bus.publish(
            LifecycleEvent::new(EventKind::SettleFailed, self.request_id)
                .with_detail("reason", reason)
                .with_target(self.requirement.pay_to.clone()),
        );
    }
}

/// Build the 402 response: requirement in the `X-Payment-Required` header
/// (base64 JSON) and in the JSON body, plus a failure reason if the caller
/// did attach a credential that was rejected.
pub fn payment_required_response(
    requirement: &PaymentRequirement,
    error: Option<String>,
) -> Result<HttpResponse, Error> {
    let header =
        encode_requirement_header(requirement).map_err(actix_web::error::ErrorInternalServerError)?;
    let body = PaymentRequiredBody {
        x402_version: X402_VERSION,
        accepts: vec![requirement.clone()],
        error,
    };
    Ok(HttpResponse::PaymentRequired()
        .insert_header((REQUIREMENT_HEADER, header))
        .json(body))
}

/// The verify-first payment gate. Wrap the whole app in it; unpriced
/// routes pass through untouched.
pub async fn payment_gate(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let state = match req.app_data::<web::Data<GatewayState>>() {
        Some(state) => state.clone(),
        None => {
            return Err(actix_web::error::ErrorInternalServerError(
                "payment gate: GatewayState not registered",
            ))
        }
    };

    let (requirement, credential) =
        match classify(req.method().as_str(), req.path(), req.headers(), &state.routes) {
            Classification::NoPaymentRequired => {
                return Ok(next.call(req).await?.map_into_boxed_body());
            }
            Classification::PaymentRequired {
                requirement,
                credential,
            } => (requirement.clone(), credential),
        };

    let route = format!("{} {}", req.method(), req.path());

    let Some(credential) = credential else {
        // Bare probe: ask for payment without waking the verifier.
        if state.config.emit_bare_probe {
            state.bus.publish(
                LifecycleEvent::new(EventKind::PaymentRequired, Uuid::new_v4())
                    .with_detail("route", route.clone())
                    .with_target(requirement.pay_to.clone()),
            );
        }
        metrics::REQUESTS
            .with_label_values(&[route.as_str(), "402"])
            .inc();
        let resp = payment_required_response(&requirement, None)?;
        return Ok(req.into_response(resp));
    };

    let mut ctx = RequestContext::new(route.clone(), Some(credential.clone()));

    state.bus.publish(
        LifecycleEvent::new(EventKind::VerifyStarted, ctx.id)
            .with_detail("route", route.clone())
            .with_target(requirement.pay_to.clone()),
    );

    // The verifier runs on its own task: a dropped connection or an elapsed
    // timeout abandons the wait but never cancels a verification that may
    // already have side effects in flight.
    let verify_task = {
        let facilitator = state.facilitator.clone();
        let credential = credential.clone();
        let requirement = requirement.clone();
        tokio::spawn(async move { facilitator.verify(&credential, &requirement).await })
    };
    let verdict = tokio::time::timeout(state.config.verify_timeout, verify_task).await;

    // A verifier error and an elapsed timeout both count as rejection; the
    // reason string is what distinguishes them for observers.
    let outcome = match verdict {
        Ok(Ok(Ok(outcome))) => outcome,
        Ok(Ok(Err(e))) => VerifyOutcome::invalid(e.to_string()),
        Ok(Err(e)) => VerifyOutcome::invalid(format!("verifier panicked: {e}")),
        Err(_) => VerifyOutcome::invalid("verification timed out"),
    };

    if !outcome.valid {
        let reason = outcome
            .failure_reason
            .unwrap_or_else(|| "invalid payment".to_string());
        tracing::warn!(request_id = %ctx.id, route = %route, reason = %reason, "payment rejected");
        metrics::VERIFICATIONS.with_label_values(&["rejected"]).inc();
        metrics::REQUESTS
            .with_label_values(&[route.as_str(), "402"])
            .inc();
        state.bus.publish(
            LifecycleEvent::new(EventKind::VerifyFailed, ctx.id)
                .with_detail("route", route.clone())
                .with_detail("reason", reason.clone()),
        );
        let resp = payment_required_response(&requirement, Some(reason))?;
        return Ok(req.into_response(resp));
    }

    let payer = outcome.payer.clone();
    ctx.verified = Some(outcome);

    metrics::VERIFICATIONS.with_label_values(&["valid"]).inc();
    let mut completed = LifecycleEvent::new(EventKind::VerifyCompleted, ctx.id)
        .with_detail("route", route.clone())
        .with_target(requirement.pay_to.clone());
    if let Some(payer) = &payer {
        completed = completed.with_actor(payer.clone());
    }
    state.bus.publish(completed);

    req.extensions_mut().insert(VerifiedPayment {
        request_id: ctx.id,
        payer: payer.clone(),
    });

    let res = next.call(req).await?;
    metrics::REQUESTS
        .with_label_values(&[route.as_str(), res.status().as_str()])
        .inc();

    // Register the completion hook before releasing the response: the job
    // rides the body and fires only once the last byte has been flushed.
    let job = SettlementJob {
        facilitator: state.facilitator.clone(),
        bus: state.bus.clone(),
        credential,
        requirement,
        request_id: ctx.id,
        route,
        payer,
    };
    Ok(res
        .map_into_boxed_body()
        .map_body(|_, body| BoxBody::new(SettleOnFlush::new(body, job))))
}
