//! Enablement rules for the crime edit form.

use crate::{contact::Contact, crime::Crime};

/// Label shown on the suspect control while no suspect is chosen.
pub const CHOOSE_SUSPECT: &str = "Choose Suspect";

/// Which form controls are active for a given record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controls {
  /// The date may only be edited once the case is solved.
  pub date_enabled:   bool,
  /// A report needs a title.
  pub report_enabled: bool,
  /// Calling needs both a named suspect and a number to dial.
  pub call_enabled:   bool,
  pub suspect_label:  String,
}

impl Controls {
  pub fn for_crime(crime: &Crime, contact: Option<&Contact>) -> Self {
    let suspect_label = if crime.has_suspect() {
      crime.suspect.clone()
    } else {
      CHOOSE_SUSPECT.to_owned()
    };

    Self {
      date_enabled: crime.is_solved,
      report_enabled: !crime.title.trim().is_empty(),
      call_enabled: crime.has_suspect() && contact.is_some_and(Contact::has_phone),
      suspect_label,
    }
  }
}
