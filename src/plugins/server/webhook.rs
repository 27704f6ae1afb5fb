use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::HeaderMap};

use super::extract::Json;
use crate::{
  model::Received,
  payment::{self, Event},
  prelude::*,
  state::AppState,
};

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Body is taken raw, the signature covers the exact bytes sent.
pub async fn stripe(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<Json<Received>> {
  let Some(stripe) = &app.stripe else {
    warn!("Webhook delivery refused, no signing secret configured");
    return Err(Error::WebhookDisabled);
  };

  let signature = headers
    .get(SIGNATURE_HEADER)
    .and_then(|value| value.to_str().ok())
    .ok_or(Error::Webhook("missing signature header"))?;

  stripe.verify(&body, signature)?;

  match payment::parse(&body)? {
    Event::CheckoutCompleted { reference, email } => {
      let license =
        app.sv().license.on_payment_completed(&reference, &email).await?;
      info!("Checkout {reference} settled with license {}", license.key);
    }
    Event::Ignored { kind } => {
      debug!("Acknowledged `{kind}` webhook without action");
    }
  }

  Ok(Json(Received { received: true }))
}
