use base64::Engine;
use base64::prelude::BASE64_STANDARD;

/// Every image stored in a trophy package is a PNG.
pub const IMAGE_PNG: &str = "image/png";

/// Encodes `data` as a `data:` URI, e.g. `data:image/png;base64,iVBORw0...`.
pub fn data_uri(mime_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, BASE64_STANDARD.encode(data))
}

/// Shorthand for [`data_uri`] with [`IMAGE_PNG`].
pub fn png_data_uri(data: &[u8]) -> String {
    data_uri(IMAGE_PNG, data)
}
