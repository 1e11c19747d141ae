pub mod decoder;
pub mod landmark_client;
pub mod tesseract;

pub use decoder::{strip_data_url, Base64ImageDecoder};
pub use landmark_client::{parse_hands, HttpLandmarkSource};
pub use tesseract::{TesseractOcr, TESSERACT_NOT_FOUND};
