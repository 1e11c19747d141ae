pub mod gateway;

pub use gateway::{Backends, GatewayHealth, InferenceGateway, NO_SIGN_DETECTED, NO_TEXT_FOUND};
