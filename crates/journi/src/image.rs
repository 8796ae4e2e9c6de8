//! Text-to-image generation through the Hugging Face inference router.

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde_json::json;

const DEFAULT_IMAGE_MODEL: &str = "black-forest-labs/FLUX.1-schnell";
const INFERENCE_BASE_URL: &str = "https://router.huggingface.co/hf-inference/models";

/// The error type for [`ImageGenerator`].
#[derive(Debug)]
pub enum Error {
    /// The request failed.
    Http(reqwest::Error),
    /// The server answered with an error status.
    Status(StatusCode),
    /// The server answered with something that is not an image.
    UnexpectedContent(String),
    /// The image could not be written to disk.
    Io(std::io::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(err) => write!(f, "request failed: {err}"),
            Error::Status(status) => write!(f, "server answered {status}"),
            Error::UnexpectedContent(content_type) => {
                write!(f, "expected an image, got `{content_type}`")
            }
            Error::Io(err) => write!(f, "failed to save image: {err}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Http(err) => Some(err),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// Generates images from text prompts and saves them as local files.
#[derive(Clone)]
pub struct ImageGenerator {
    client: Client,
    token: String,
    endpoint: String,
    output_dir: PathBuf,
    counter: Arc<AtomicUsize>,
}

impl fmt::Debug for ImageGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageGenerator")
            .field("endpoint", &self.endpoint)
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

impl ImageGenerator {
    /// Creates a generator using the default image model. Images are saved
    /// to the system temporary directory.
    pub fn new(client: Client, token: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into(),
            endpoint: format!("{INFERENCE_BASE_URL}/{DEFAULT_IMAGE_MODEL}"),
            output_dir: std::env::temp_dir(),
            counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Uses another model hosted on the inference router.
    pub fn with_model(mut self, model: &str) -> Self {
        self.endpoint = format!("{INFERENCE_BASE_URL}/{model}");
        self
    }

    /// Saves generated images into `dir`.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Generates an image for `prompt` and returns the path of the saved
    /// file.
    pub async fn generate(&self, prompt: &str) -> Result<PathBuf, Error> {
        debug!("generating image: {prompt}");
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&json!({ "inputs": prompt }))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        let Some(ext) = extension_for(&content_type) else {
            return Err(Error::UnexpectedContent(content_type));
        };

        let bytes = resp.bytes().await?;
        let path = self.next_path(ext);
        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::write(&path, &bytes).await?;
        info!("saved generated image to {}", path.display());
        Ok(path)
    }

    fn next_path(&self, ext: &str) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        self.output_dir.join(format!("journi-{millis}-{seq}.{ext}"))
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next()?.trim();
    match essence.to_ascii_lowercase().as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/png"), Some("png"));
        assert_eq!(extension_for("image/JPEG; charset=binary"), Some("jpg"));
        assert_eq!(extension_for("application/json"), None);
        assert_eq!(extension_for(""), None);
    }

    #[test]
    fn test_next_path_is_unique() {
        let generator = ImageGenerator::new(Client::new(), "token")
            .with_output_dir("/tmp/journi-test");
        let a = generator.next_path("png");
        let b = generator.next_path("png");
        assert_ne!(a, b);
        assert!(a.starts_with("/tmp/journi-test"));
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("png"));
    }

    #[test]
    fn test_debug_hides_token() {
        let generator = ImageGenerator::new(Client::new(), "hf_secret");
        assert!(!format!("{generator:?}").contains("hf_secret"));
    }
}
