mod steps;

pub use checkout_world::{CheckoutSystem, CheckoutWorld};
