pub mod api_client;
pub mod model_cache;

pub use api_client::{HfInferenceClient, RemoteModel};
pub use model_cache::{LoadState, ModelCache};
