//! License key generation
//!
//! Keys look like `AB3F-9K2L-00ZZ-Q7M1`: four groups of four characters drawn
//! uniformly from `[A-Z0-9]`. Nothing here guarantees uniqueness, the store
//! rejects collisions and the engine retries.

use rand::{Rng, seq::SliceRandom};

pub const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const GROUPS: usize = 4;
pub const GROUP_LEN: usize = 4;

pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> String {
  let mut key = String::with_capacity(GROUPS * (GROUP_LEN + 1));

  for group in 0..GROUPS {
    if group > 0 {
      key.push('-');
    }
    for _ in 0..GROUP_LEN {
      // ALPHABET is non-empty
      if let Some(&ch) = ALPHABET.choose(rng) {
        key.push(ch as char);
      }
    }
  }

  key
}

/// Keys are case-insensitive on input; stored keys are upper-case.
pub fn normalize(input: &str) -> String {
  input.trim().to_ascii_uppercase()
}

pub fn is_well_formed(key: &str) -> bool {
  let groups: Vec<&str> = key.split('-').collect();

  groups.len() == GROUPS
    && groups.iter().all(|group| {
      group.len() == GROUP_LEN
        && group.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    })
}

pub trait KeySource: Send + Sync {
  fn next_key(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomKeys;

impl KeySource for RandomKeys {
  fn next_key(&self) -> String {
    generate(&mut rand::thread_rng())
  }
}

#[cfg(test)]
pub mod testing {
  use std::{collections::VecDeque, sync::Mutex};

  use super::*;

  /// Hands out the given keys in order, then falls back to random ones.
  #[derive(Debug, Default)]
  pub struct Scripted {
    keys: Mutex<VecDeque<String>>,
  }

  impl Scripted {
    pub fn new<I, S>(keys: I) -> Self
    where
      I: IntoIterator<Item = S>,
      S: Into<String>,
    {
      Self { keys: Mutex::new(keys.into_iter().map(Into::into).collect()) }
    }
  }

  impl KeySource for Scripted {
    fn next_key(&self) -> String {
      self
        .keys
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| RandomKeys.next_key())
    }
  }

  /// Always returns the same key.
  #[derive(Debug, Clone)]
  pub struct Fixed(pub String);

  impl KeySource for Fixed {
    fn next_key(&self) -> String {
      self.0.clone()
    }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use rand::{SeedableRng, rngs::StdRng};

  use super::*;

  #[test]
  fn test_generated_keys_are_well_formed() {
    let mut rng = rand::thread_rng();

    for _ in 0..1000 {
      let key = generate(&mut rng);
      assert_eq!(key.len(), 19);
      assert!(is_well_formed(&key), "malformed key {key}");
    }
  }

  #[test]
  fn test_generation_is_a_function_of_the_rng() {
    let a = generate(&mut StdRng::seed_from_u64(7));
    let b = generate(&mut StdRng::seed_from_u64(7));
    let c = generate(&mut StdRng::seed_from_u64(8));

    assert_eq!(a, b);
    assert_ne!(a, c);
  }

  #[test]
  fn test_alphabet_coverage() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut seen = HashSet::new();

    for _ in 0..500 {
      seen.extend(generate(&mut rng).bytes().filter(|&b| b != b'-'));
    }

    assert_eq!(seen.len(), ALPHABET.len());
  }

  #[test]
  fn test_well_formed() {
    assert!(is_well_formed("DEMO-1234-5678-9ABC"));
    assert!(!is_well_formed("demo-1234-5678-9abc"));
    assert!(!is_well_formed("DEMO-1234-5678"));
    assert!(!is_well_formed("DEMO-1234-5678-9ABCD"));
    assert!(!is_well_formed("DEMO_1234-5678-9ABC"));
    assert!(!is_well_formed("DEMO-12É4-5678-9ABC"));
    assert!(!is_well_formed(""));
  }

  #[test]
  fn test_normalize() {
    assert_eq!(normalize("  demo-1234-5678-9abc\n"), "DEMO-1234-5678-9ABC");
  }

  #[test]
  fn test_scripted_source() {
    let keys = testing::Scripted::new(["AAAA-AAAA-AAAA-AAAA"]);

    assert_eq!(keys.next_key(), "AAAA-AAAA-AAAA-AAAA");
    assert!(is_well_formed(&keys.next_key()));
  }
}
