//! Multipart form data encoding.
//!
//! [`MultipartWriter`] writes `multipart/form-data` parts straight into an
//! in-memory buffer, in the order they are created. File parts are exposed
//! as a [`PartWriter`] implementing [`std::io::Write`], so any reader can be
//! copied in with [`std::io::copy`].
//!
//! # Example
//!
//! ```
//! use std::io::Write;
//! use courier_core::MultipartWriter;
//!
//! let mut writer = MultipartWriter::with_boundary("xyz").expect("valid boundary");
//! writer.write_field("id", "123").expect("field");
//! writer
//!     .create_form_file("upload", "notes.txt")
//!     .expect("part")
//!     .write_all(b"hello")
//!     .expect("data");
//! writer.close().expect("close");
//!
//! assert_eq!(writer.content_type(), "multipart/form-data; boundary=xyz");
//! ```

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::{BufMut, Bytes, BytesMut};

use crate::{ContentType, Error, Result};

/// Longest boundary allowed by RFC 2046.
const MAX_BOUNDARY_LEN: usize = 70;

/// Streaming `multipart/form-data` encoder.
#[derive(Debug)]
pub struct MultipartWriter {
    buf: BytesMut,
    boundary: String,
    parts: usize,
    closed: bool,
}

impl Default for MultipartWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartWriter {
    /// Create a writer with a generated boundary.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
            boundary: generate_boundary(),
            parts: 0,
            closed: false,
        }
    }

    /// Create a writer with a caller-chosen boundary.
    pub fn with_boundary(boundary: impl Into<String>) -> Result<Self> {
        let mut writer = Self::new();
        writer.set_boundary(boundary)?;
        Ok(writer)
    }

    /// Replace the boundary. Only allowed before the first part is written.
    pub fn set_boundary(&mut self, boundary: impl Into<String>) -> Result<()> {
        if self.parts > 0 || self.closed {
            return Err(Error::multipart(
                "boundary cannot change after parts are written",
            ));
        }
        let boundary = boundary.into();
        validate_boundary(&boundary)?;
        self.boundary = boundary;
        Ok(())
    }

    /// The boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The `Content-Type` header value: `multipart/form-data; boundary=<boundary>`.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Number of parts written so far.
    #[must_use]
    pub const fn part_count(&self) -> usize {
        self.parts
    }

    /// Write a plain form field.
    pub fn write_field(&mut self, name: &str, value: &str) -> Result<()> {
        let disposition = format!("form-data; name=\"{}\"", escape_quotes(name));
        self.start_part(&disposition, None)?;
        self.buf.put_slice(value.as_bytes());
        Ok(())
    }

    /// Start a file part and return a writer for its content.
    ///
    /// The part's content type is guessed from the filename extension.
    pub fn create_form_file(&mut self, name: &str, filename: &str) -> Result<PartWriter<'_>> {
        let disposition = format!(
            "form-data; name=\"{}\"; filename=\"{}\"",
            escape_quotes(name),
            escape_quotes(filename)
        );
        self.start_part(&disposition, Some(content_type_for(filename)))?;
        Ok(PartWriter { buf: &mut self.buf })
    }

    /// Write the closing boundary. The writer accepts no parts afterwards.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::multipart("multipart writer is already closed"));
        }
        if self.parts > 0 {
            self.buf.put_slice(b"\r\n");
        }
        self.buf.put_slice(b"--");
        self.buf.put_slice(self.boundary.as_bytes());
        self.buf.put_slice(b"--\r\n");
        self.closed = true;
        Ok(())
    }

    /// Returns `true` once [`close`](Self::close) succeeded.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Bytes written so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume into the encoded body.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    fn start_part(&mut self, disposition: &str, content_type: Option<&str>) -> Result<()> {
        if self.closed {
            return Err(Error::multipart("multipart writer is closed"));
        }

        // Every part after the first is preceded by the CRLF ending the previous one.
        if self.parts > 0 {
            self.buf.put_slice(b"\r\n");
        }
        self.buf.put_slice(b"--");
        self.buf.put_slice(self.boundary.as_bytes());
        self.buf.put_slice(b"\r\n");

        self.buf.put_slice(b"Content-Disposition: ");
        self.buf.put_slice(disposition.as_bytes());
        self.buf.put_slice(b"\r\n");
        if let Some(content_type) = content_type {
            self.buf.put_slice(b"Content-Type: ");
            self.buf.put_slice(content_type.as_bytes());
            self.buf.put_slice(b"\r\n");
        }
        self.buf.put_slice(b"\r\n");

        self.parts += 1;
        Ok(())
    }
}

/// Writer for the content of a single file part.
///
/// Borrowing the [`MultipartWriter`] mutably guarantees the part is complete
/// before the next one starts.
#[derive(Debug)]
pub struct PartWriter<'a> {
    buf: &'a mut BytesMut,
}

impl io::Write for PartWriter<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.put_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn validate_boundary(boundary: &str) -> Result<()> {
    if boundary.is_empty() || boundary.len() > MAX_BOUNDARY_LEN {
        return Err(Error::multipart(format!(
            "boundary must be 1 to {MAX_BOUNDARY_LEN} bytes long"
        )));
    }
    if boundary.ends_with(' ') {
        return Err(Error::multipart("boundary must not end with a space"));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || "'()+_,-./:=? ".contains(c);
    if let Some(c) = boundary.chars().find(|c| !allowed(*c)) {
        return Err(Error::multipart(format!(
            "invalid character {c:?} in boundary"
        )));
    }
    Ok(())
}

/// Generate a boundary unique within the process.
fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let sequence = COUNTER.fetch_add(1, Ordering::Relaxed);

    format!("----CourierBoundary{timestamp:x}{sequence:04x}")
}

/// Guess a part content type from a filename extension.
fn content_type_for(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "xml" => "application/xml",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        _ => ContentType::OctetStream.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn body_str(writer: &MultipartWriter) -> String {
        String::from_utf8_lossy(writer.as_bytes()).into_owned()
    }

    #[test]
    fn generated_boundaries_differ() {
        let first = MultipartWriter::new();
        let second = MultipartWriter::new();
        assert!(first.boundary().starts_with("----CourierBoundary"));
        assert_ne!(first.boundary(), second.boundary());
    }

    #[test]
    fn content_type_carries_boundary() {
        let writer = MultipartWriter::with_boundary("test-boundary").expect("boundary");
        assert_eq!(
            writer.content_type(),
            "multipart/form-data; boundary=test-boundary"
        );
    }

    #[test]
    fn fields_and_files_layout() {
        let mut writer = MultipartWriter::with_boundary("b0undary").expect("boundary");
        writer.write_field("id", "123").expect("field");
        writer
            .create_form_file("upload", "test.txt")
            .expect("part")
            .write_all(b"file content")
            .expect("copy");
        writer.close().expect("close");

        assert_eq!(
            body_str(&writer),
            "--b0undary\r\n\
             Content-Disposition: form-data; name=\"id\"\r\n\
             \r\n\
             123\r\n\
             --b0undary\r\n\
             Content-Disposition: form-data; name=\"upload\"; filename=\"test.txt\"\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             file content\r\n\
             --b0undary--\r\n"
        );
        assert_eq!(writer.part_count(), 2);
    }

    #[test]
    fn empty_form_is_just_the_closing_boundary() {
        let mut writer = MultipartWriter::with_boundary("abc").expect("boundary");
        writer.close().expect("close");
        assert_eq!(body_str(&writer), "--abc--\r\n");
    }

    #[test]
    fn names_are_escaped() {
        let mut writer = MultipartWriter::with_boundary("abc").expect("boundary");
        writer.write_field("say \"hi\"", "x").expect("field");
        assert!(body_str(&writer).contains(r#"name="say \"hi\"""#));
    }

    #[test]
    fn write_after_close_fails() {
        let mut writer = MultipartWriter::new();
        writer.close().expect("close");
        assert!(writer.is_closed());
        assert!(matches!(
            writer.write_field("late", "value"),
            Err(Error::Multipart(_))
        ));
        assert!(writer.create_form_file("late", "a.bin").is_err());
        assert!(writer.close().is_err());
    }

    #[test]
    fn boundary_is_fixed_once_parts_exist() {
        let mut writer = MultipartWriter::new();
        writer.set_boundary("early").expect("before parts");
        writer.write_field("a", "1").expect("field");
        assert!(matches!(writer.set_boundary("late"), Err(Error::Multipart(_))));
        assert_eq!(writer.boundary(), "early");
    }

    #[test]
    fn invalid_boundaries_rejected() {
        assert!(MultipartWriter::with_boundary("").is_err());
        assert!(MultipartWriter::with_boundary("a".repeat(71)).is_err());
        assert!(MultipartWriter::with_boundary("trailing ").is_err());
        assert!(MultipartWriter::with_boundary("semi;colon").is_err());
        assert!(MultipartWriter::with_boundary("ok 'boundary' (1)+_,-./:=?").is_ok());
    }

    #[test]
    fn content_type_guessing() {
        assert_eq!(content_type_for("photo.PNG"), "image/png");
        assert_eq!(content_type_for("photo.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("data.json"), "application/json");
        assert_eq!(content_type_for("archive.tar.gz"), "application/gzip");
        assert_eq!(content_type_for("README"), "application/octet-stream");
        assert_eq!(content_type_for("blob.xyz"), "application/octet-stream");
    }
}
