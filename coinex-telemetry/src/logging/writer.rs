//! Writers that mask sensitive data before it leaves the process.

use crate::masking::SensitiveDataMasker;
use std::io;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

/// A [`MakeWriter`] whose writers pass every formatted event through a
/// [`SensitiveDataMasker`].
#[derive(Debug, Clone)]
pub struct MaskingMakeWriter<M> {
    inner: M,
    masker: Arc<SensitiveDataMasker>,
}

impl<M> MaskingMakeWriter<M> {
    /// Wrap `inner` so its output is masked.
    pub fn new(inner: M, masker: Arc<SensitiveDataMasker>) -> Self {
        Self { inner, masker }
    }
}

impl<'a, M> MakeWriter<'a> for MaskingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = MaskingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        MaskingWriter::new(self.inner.make_writer(), Arc::clone(&self.masker))
    }
}

/// An [`io::Write`] adapter that masks each buffer it is handed.
///
/// The fmt layer renders one event per write, so a secret never straddles
/// two buffers.
#[derive(Debug)]
pub struct MaskingWriter<W> {
    inner: W,
    masker: Arc<SensitiveDataMasker>,
}

impl<W> MaskingWriter<W> {
    /// Wrap `inner`.
    pub fn new(inner: W, masker: Arc<SensitiveDataMasker>) -> Self {
        Self { inner, masker }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: io::Write> io::Write for MaskingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match std::str::from_utf8(buf) {
            Ok(text) => {
                let masked = self.masker.mask_string(text);
                self.inner.write_all(masked.as_bytes())?;
            }
            Err(_) => self.inner.write_all(buf)?,
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_writer_masks_secrets() {
        let mut writer = MaskingWriter::new(Vec::new(), Arc::new(SensitiveDataMasker::new()));
        let line = b"{\"message\":\"loaded\",\"secret_key\":\"hunter2hunter2\"}\n";

        let written = writer.write(line).unwrap();
        assert_eq!(written, line.len());

        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert!(!output.contains("hunter2hunter2"));
        assert!(output.contains("loaded"));
    }

    #[test]
    fn test_writer_passes_binary_through() {
        let mut writer = MaskingWriter::new(Vec::new(), Arc::new(SensitiveDataMasker::new()));
        writer.write_all(&[0xff, 0xfe, 0x00]).unwrap();
        assert_eq!(writer.into_inner(), vec![0xff, 0xfe, 0x00]);
    }
}
