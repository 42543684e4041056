//! Plain-text crime reports for sharing.

use crate::crime::Crime;

pub const REPORT_SUBJECT: &str = "CriminalIntent Crime Report";

const REPORT_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Z %Y";
const DISPLAY_DATE_FORMAT: &str = "%A %d %B %Y";

/// Render the shareable report for `crime`.
pub fn crime_report(crime: &Crime) -> String {
  let solved = if crime.is_solved {
    "The case is solved"
  } else {
    "The case is not solved"
  };

  let suspect = if crime.has_suspect() {
    format!("the suspect is {}.", crime.suspect)
  } else {
    "there is no suspect.".to_owned()
  };

  let date = crime.date.format(REPORT_DATE_FORMAT);
  format!(
    "{}! The crime was discovered on {date}. {solved}, and {suspect}",
    crime.title
  )
}

/// The date as shown on the edit form, e.g. `Friday 01 March 2024`.
pub fn display_date(crime: &Crime) -> String {
  crime.date.format(DISPLAY_DATE_FORMAT).to_string()
}
