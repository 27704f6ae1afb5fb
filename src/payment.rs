//! Stripe webhook verification and event parsing

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::prelude::*;

type HmacSha256 = Hmac<Sha256>;

/// Oldest accepted signature timestamp, in seconds.
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 300;
/// Clock skew allowed for timestamps from the future.
pub const FUTURE_SKEW_SECS: i64 = 60;

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Deserialize)]
struct Envelope {
  #[serde(default)]
  id: String,
  #[serde(rename = "type")]
  kind: String,
  data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
  object: json::Value,
}

#[derive(Debug, Deserialize)]
struct CheckoutSession {
  id: String,
  customer_email: Option<String>,
  customer_details: Option<CustomerDetails>,
}

#[derive(Debug, Deserialize)]
struct CustomerDetails {
  email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
  /// A paid checkout; `reference` is the checkout session id.
  CheckoutCompleted { reference: String, email: String },
  Ignored { kind: String },
}

#[derive(Clone)]
pub struct Stripe {
  secret: String,
}

impl Stripe {
  pub fn new(secret: impl Into<String>) -> Self {
    Self { secret: secret.into() }
  }

  pub fn verify(&self, payload: &[u8], header: &str) -> Result<()> {
    self.verify_at(payload, header, Utc::now().timestamp())
  }

  /// Checks a `Stripe-Signature` header of the form `t=<unix>,v1=<hex>`.
  /// Any of several `v1` entries may match.
  pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<()> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
      if let Some(t) = part.trim().strip_prefix("t=") {
        timestamp = Some(t);
      } else if let Some(sig) = part.trim().strip_prefix("v1=") {
        signatures.push(sig);
      }
    }

    let Some(raw_timestamp) = timestamp else {
      return Err(Error::Webhook("malformed signature header"));
    };
    if signatures.is_empty() {
      return Err(Error::Webhook("malformed signature header"));
    }

    let timestamp: i64 = raw_timestamp
      .parse()
      .map_err(|_| Error::Webhook("invalid signature timestamp"))?;

    let age = now - timestamp;
    if age > TIMESTAMP_TOLERANCE_SECS {
      warn!("Webhook rejected: timestamp too old (age={age}s)");
      return Err(Error::Webhook("signature timestamp outside tolerance"));
    }
    if age < -FUTURE_SKEW_SECS {
      warn!("Webhook rejected: timestamp in the future (age={age}s)");
      return Err(Error::Webhook("signature timestamp outside tolerance"));
    }

    let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
      .map_err(|err| Error::Internal(format!("Invalid webhook secret: {err}")))?;
    mac.update(raw_timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    let matched = signatures
      .iter()
      .any(|sig| bool::from(sig.as_bytes().ct_eq(expected.as_bytes())));

    if matched {
      Ok(())
    } else {
      warn!("Webhook rejected: signature mismatch");
      Err(Error::Webhook("signature mismatch"))
    }
  }

  #[cfg(test)]
  pub fn sign(&self, payload: &[u8], timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
  }
}

/// Parses a verified webhook body.
pub fn parse(payload: &[u8]) -> Result<Event> {
  let envelope: Envelope = json::from_slice(payload)
    .map_err(|_| Error::Webhook("malformed event payload"))?;

  if envelope.kind != CHECKOUT_COMPLETED {
    debug!("Ignoring webhook event {} ({})", envelope.id, envelope.kind);
    return Ok(Event::Ignored { kind: envelope.kind });
  }

  let session: CheckoutSession = json::from_value(envelope.data.object)
    .map_err(|_| Error::Webhook("malformed checkout session"))?;

  let email = session
    .customer_details
    .and_then(|details| details.email)
    .or(session.customer_email)
    .map(|email| email.trim().to_string())
    .filter(|email| !email.is_empty());

  let Some(email) = email else {
    warn!("Checkout session {} carries no customer email", session.id);
    return Err(Error::Webhook("checkout session has no customer email"));
  };

  Ok(Event::CheckoutCompleted { reference: session.id, email })
}
