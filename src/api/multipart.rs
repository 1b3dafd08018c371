//! Minimal `multipart/form-data` encoder for photo uploads.
//!
//! The backend accepts classroom photos as ordinary browser form posts; this
//! builds the same body shape with a random boundary.

use rand::{Rng, distr::Alphanumeric};

/// Incrementally built multipart body.
#[derive(Debug)]
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    /// Start an empty form with a fresh random boundary.
    pub fn new() -> Self {
        let suffix: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();
        Self {
            boundary: format!("rollcall-{suffix}"),
            body: Vec::new(),
        }
    }

    /// Append a plain text field.
    pub fn text(&mut self, name: &str, value: &str) -> &mut Self {
        self.open_part();
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Append a file field.
    pub fn file(
        &mut self,
        name: &str,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> &mut Self {
        self.open_part();
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// The `Content-Type` header value for this body.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Close the body and return the encoded bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }

    fn open_part(&mut self) {
        self.body
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}
