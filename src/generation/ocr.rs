//! Text recognition through the tesseract CLI

use std::process::Stdio;
use std::time::Duration;

use reqwest::Client as ReqwestClient;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::error::GenerationError;
use super::{GenerationRequest, TextGenerator};

/// Downloads an image and reads the text in it
#[derive(Debug, Clone)]
pub struct OcrExtractor {
    client: ReqwestClient,
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl OcrExtractor {
    /// Extractor running `tesseract stdin stdout`
    pub fn new(timeout: Duration) -> Self {
        Self::with_command("tesseract", ["stdin", "stdout"], timeout)
    }

    /// Extractor running a custom command that reads the image on stdin
    pub fn with_command<I, S>(program: impl Into<String>, args: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            client: ReqwestClient::new(),
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout,
        }
    }

    async fn download(&self, image_url: &str) -> Result<Vec<u8>, GenerationError> {
        let response = self
            .client
            .get(image_url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn recognize(&self, image: &[u8]) -> Result<String, GenerationError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GenerationError::Ocr(format!("failed to run {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(image).await?;
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(GenerationError::Ocr(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" "))
    }
}

impl TextGenerator for OcrExtractor {
    #[instrument(skip(self, request), fields(image_url = %request.image_url))]
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let image = self.download(&request.image_url).await?;
        debug!("Downloaded {} bytes for OCR", image.len());
        self.recognize(&image).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn request(image_url: String) -> GenerationRequest {
        GenerationRequest {
            image_url,
            prompt: String::new(),
        }
    }

    #[tokio::test]
    async fn test_recognized_text_is_normalized() {
        let mut server = Server::new_async().await;
        let _image = server
            .mock("GET", "/sign.png")
            .with_status(200)
            .with_body("OPEN\n  24   HOURS\n\n")
            .create_async()
            .await;

        // `cat` echoes the downloaded bytes back in place of recognized text
        let ocr = OcrExtractor::with_command("cat", Vec::<String>::new(), Duration::from_secs(5));
        let text = ocr
            .generate(&request(format!("{}/sign.png", server.url())))
            .await
            .unwrap();

        assert_eq!(text, "OPEN 24 HOURS");
    }

    #[tokio::test]
    async fn test_download_failure() {
        let mut server = Server::new_async().await;
        let _image = server
            .mock("GET", "/gone.png")
            .with_status(404)
            .create_async()
            .await;

        let ocr = OcrExtractor::with_command("cat", Vec::<String>::new(), Duration::from_secs(5));
        let err = ocr
            .generate(&request(format!("{}/gone.png", server.url())))
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Http(_)));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let ocr = OcrExtractor::with_command(
            "definitely-not-an-ocr-binary",
            ["stdin", "stdout"],
            Duration::from_secs(5),
        );
        let err = ocr.recognize(b"data").await.unwrap_err();
        assert!(matches!(err, GenerationError::Ocr(_)));
    }
}
