//! Types shared by every crate in the storefront checkout workspace.
mod helpers;
mod paise;
mod secret;

pub mod op;

pub use helpers::parse_boolean_flag;
pub use paise::{Paise, PaiseConversionError, DEFAULT_CURRENCY_CODE};
pub use secret::Secret;
