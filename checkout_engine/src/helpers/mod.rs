mod amount;
mod signature;

pub use amount::parse_amount;
pub use signature::{
    calculate_hmac,
    client_callback_payload,
    constant_time_eq,
    verify,
    verify_client_callback,
    verify_webhook,
    SignatureScheme,
};
