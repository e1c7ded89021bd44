//! Transport encoding of stored image bytes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Turns stored image bytes into something a transport layer can embed.
pub trait ImageEncoder: Send + Sync {
    fn encode(&self, bytes: &[u8]) -> String;
}

impl<E> ImageEncoder for std::sync::Arc<E>
where
    E: ImageEncoder + ?Sized,
{
    fn encode(&self, bytes: &[u8]) -> String {
        (**self).encode(bytes)
    }
}

/// Base64 `data:` URI with a fixed media type (JPEG unless configured otherwise).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUriEncoder {
    media_type: String,
}

impl DataUriEncoder {
    pub fn new(media_type: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
        }
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }
}

impl Default for DataUriEncoder {
    fn default() -> Self {
        Self::new("image/jpeg")
    }
}

impl ImageEncoder for DataUriEncoder {
    fn encode(&self, bytes: &[u8]) -> String {
        format!("data:{};base64,{}", self.media_type, STANDARD.encode(bytes))
    }
}
