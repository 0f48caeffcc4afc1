//! Post-payment side effects. See [`FulfilmentDispatcher`].
mod dispatcher;
mod invoice;

pub use dispatcher::{FulfilmentConfig, FulfilmentDispatcher, FulfilmentError};
pub use invoice::Invoice;
