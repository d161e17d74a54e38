//! Output audio encodings.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Audio container/codec the facade can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioEncoding {
    Mp3,
    Wav,
    Ogg,
    Flac,
}

/// Every encoding the facade knows about, in display order.
pub const ALL_ENCODINGS: &[AudioEncoding] = &[
    AudioEncoding::Mp3,
    AudioEncoding::Wav,
    AudioEncoding::Ogg,
    AudioEncoding::Flac,
];

impl AudioEncoding {
    /// Short lowercase format name, as used in requests and data URIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioEncoding::Mp3 => "mp3",
            AudioEncoding::Wav => "wav",
            AudioEncoding::Ogg => "ogg",
            AudioEncoding::Flac => "flac",
        }
    }

    /// MIME type placed in the `data:` URI of the response.
    pub fn mime_type(&self) -> String {
        format!("audio/{}", self.as_str())
    }

    /// Name of the encoding in the Google Cloud TTS `AudioEncoding` enum.
    pub fn google_name(&self) -> &'static str {
        match self {
            AudioEncoding::Mp3 => "MP3",
            AudioEncoding::Wav => "LINEAR16",
            AudioEncoding::Ogg => "OGG_OPUS",
            AudioEncoding::Flac => "FLAC",
        }
    }

    /// Wrap raw audio bytes in a `data:audio/<fmt>;base64,` URI.
    pub fn to_data_uri(&self, audio: &[u8]) -> String {
        use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

        format!("data:{};base64,{}", self.mime_type(), BASE64.encode(audio))
    }
}

impl fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEncoding(pub String);

impl fmt::Display for UnknownEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown audio encoding '{}'", self.0)
    }
}

impl std::error::Error for UnknownEncoding {}

impl FromStr for AudioEncoding {
    type Err = UnknownEncoding;

    /// Case-insensitive; Google enum names are accepted as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(AudioEncoding::Mp3),
            "wav" | "linear16" => Ok(AudioEncoding::Wav),
            "ogg" | "ogg_opus" => Ok(AudioEncoding::Ogg),
            "flac" => Ok(AudioEncoding::Flac),
            _ => Err(UnknownEncoding(s.to_string())),
        }
    }
}

impl Serialize for AudioEncoding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.google_name())
    }
}
