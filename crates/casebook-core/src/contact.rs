//! A suspect picked from an external contact provider.
//!
//! Contact lookup itself happens outside this crate; callers hand over the
//! already-resolved display name and phone number.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
  pub display_name: String,
  /// Raw number as the provider returned it, punctuation included.
  pub phone:        Option<String>,
}

impl Contact {
  pub fn new(display_name: impl Into<String>) -> Self {
    Self { display_name: display_name.into(), phone: None }
  }

  pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
    self.phone = Some(phone.into());
    self
  }

  /// The phone number reduced to digits and `+`, or `None` if nothing
  /// dialable is left.
  pub fn dialable_number(&self) -> Option<String> {
    let number: String = self
      .phone
      .as_deref()?
      .chars()
      .filter(|c| c.is_ascii_digit() || *c == '+')
      .collect();
    (!number.is_empty()).then_some(number)
  }

  /// A `tel:` URI suitable for handing to a dialer.
  pub fn dial_uri(&self) -> Option<String> {
    self.dialable_number().map(|n| format!("tel:{n}"))
  }

  /// Whether the phone number leaves anything to dial.
  pub fn has_phone(&self) -> bool { self.dialable_number().is_some() }
}
