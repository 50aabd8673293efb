mod services;

pub use services::{discard_image, is_image, store_product_image, MAX_IMAGE_BYTES};
