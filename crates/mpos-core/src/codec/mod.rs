//! Pure text codecs used at the user-input and payment boundaries.
//!
//! - **`tags`** – The `key:value,key:value` tag mini-language: strict
//!   validation for explicit saves, lenient parsing for submission, and
//!   display formatting.
//!
//! - **`amount`** – Conversion of user-entered decimal strings into integer
//!   minor currency units (cents), truncating extra fractional digits.

pub mod amount;
pub mod tags;
