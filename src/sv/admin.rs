//! Admin session tokens
//!
//! Tokens have the form `base64url(claims).base64url(signature)` where the
//! signature is HMAC-SHA256 over the encoded claims string. Nothing is stored
//! server side; a token is good until its `exp` claim passes.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::prelude::*;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  /// Admin identity
  pub sub: String,
  pub iat: i64,
  pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
  pub valid: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user: Option<String>,
}

impl Verdict {
  pub fn valid(user: String) -> Self {
    Self { valid: true, user: Some(user) }
  }

  pub fn invalid() -> Self {
    Self { valid: false, user: None }
  }
}

#[derive(Clone)]
pub struct Authority {
  username: String,
  password: String,
  secret: Vec<u8>,
  ttl: TimeDelta,
}

impl std::fmt::Debug for Authority {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Authority")
      .field("username", &self.username)
      .field("ttl", &self.ttl)
      .finish_non_exhaustive()
  }
}

impl Authority {
  pub fn new(
    username: impl Into<String>,
    password: impl Into<String>,
    secret: impl AsRef<[u8]>,
    ttl: TimeDelta,
  ) -> Self {
    Self {
      username: username.into(),
      password: password.into(),
      secret: secret.as_ref().to_vec(),
      ttl,
    }
  }

  pub fn login(&self, username: &str, password: &str) -> Result<String> {
    self.login_at(username, password, Utc::now().timestamp())
  }

  pub fn login_at(
    &self,
    username: &str,
    password: &str,
    now: i64,
  ) -> Result<String> {
    // evaluate both so a wrong username costs the same as a wrong password
    let user_ok = username.as_bytes().ct_eq(self.username.as_bytes());
    let pass_ok = password.as_bytes().ct_eq(self.password.as_bytes());

    if !bool::from(user_ok & pass_ok) || self.password.is_empty() {
      warn!("Rejected admin login for `{username}`");
      return Err(Error::InvalidCredentials);
    }

    let claims = Claims {
      sub: self.username.clone(),
      iat: now,
      exp: now + self.ttl.num_seconds(),
    };

    info!("Admin `{}` logged in", claims.sub);
    self.sign(&claims)
  }

  pub fn verify(&self, token: &str) -> Verdict {
    self.verify_at(token, Utc::now().timestamp())
  }

  pub fn verify_at(&self, token: &str, now: i64) -> Verdict {
    match self.decode(token) {
      Some(claims) if now < claims.exp => Verdict::valid(claims.sub),
      _ => Verdict::invalid(),
    }
  }

  fn mac(&self) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(&self.secret)
      .map_err(|err| Error::Internal(format!("Invalid signing secret: {err}")))
  }

  fn sign(&self, claims: &Claims) -> Result<String> {
    let payload = json::to_vec(claims)
      .map_err(|err| Error::Internal(format!("Encode claims: {err}")))?;
    let payload = URL_SAFE_NO_PAD.encode(payload);

    let mut mac = self.mac()?;
    mac.update(payload.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{payload}.{signature}"))
  }

  fn decode(&self, token: &str) -> Option<Claims> {
    let (payload, signature) = token.trim().split_once('.')?;
    let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

    let mut mac = self.mac().ok()?;
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature).ok()?;

    let payload = URL_SAFE_NO_PAD.decode(payload).ok()?;
    json::from_slice(&payload).ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ADMIN_TOKEN_TTL_SECS;

  fn authority() -> Authority {
    Authority::new(
      "admin",
      "hunter2",
      "test-secret",
      TimeDelta::seconds(ADMIN_TOKEN_TTL_SECS),
    )
  }

  #[test]
  fn test_login_and_verify() {
    let auth = authority();
    let token = auth.login("admin", "hunter2").unwrap();

    assert_eq!(auth.verify(&token), Verdict::valid("admin".into()));
  }

  #[test]
  fn test_wrong_credentials() {
    let auth = authority();

    assert!(matches!(
      auth.login("admin", "wrong"),
      Err(Error::InvalidCredentials)
    ));
    assert!(matches!(
      auth.login("root", "hunter2"),
      Err(Error::InvalidCredentials)
    ));
    assert!(matches!(auth.login("", ""), Err(Error::InvalidCredentials)));
  }

  #[test]
  fn test_empty_password_never_logs_in() {
    let auth = Authority::new("admin", "", "secret", TimeDelta::hours(2));

    assert!(matches!(auth.login("admin", ""), Err(Error::InvalidCredentials)));
  }

  #[test]
  fn test_token_expires_after_two_hours() {
    let auth = authority();
    let issued = 1_700_000_000;
    let token = auth.login_at("admin", "hunter2", issued).unwrap();

    assert!(auth.verify_at(&token, issued + 2 * 3600 - 1).valid);
    assert_eq!(auth.verify_at(&token, issued + 2 * 3600), Verdict::invalid());
    assert_eq!(auth.verify_at(&token, issued + 3 * 3600), Verdict::invalid());
  }

  #[test]
  fn test_tampered_or_malformed_tokens() {
    let auth = authority();
    let token = auth.login("admin", "hunter2").unwrap();
    let (payload, signature) = token.split_once('.').unwrap();

    let forged_claims = Claims {
      sub: "admin".into(),
      iat: 0,
      exp: i64::MAX,
    };
    let forged_payload =
      URL_SAFE_NO_PAD.encode(json::to_vec(&forged_claims).unwrap());

    for bad in [
      String::new(),
      "garbage".to_string(),
      format!("{payload}."),
      format!(".{signature}"),
      format!("{forged_payload}.{signature}"),
      format!("{payload}.{signature}x"),
      format!("{payload}.{signature}.extra"),
    ] {
      assert_eq!(auth.verify(&bad), Verdict::invalid(), "accepted `{bad}`");
    }
  }

  #[test]
  fn test_other_secret_rejects() {
    let token = authority().login("admin", "hunter2").unwrap();
    let other = Authority::new("admin", "hunter2", "other", TimeDelta::hours(2));

    assert!(!other.verify(&token).valid);
  }
}
