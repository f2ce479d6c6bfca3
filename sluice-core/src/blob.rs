use crate::{BackendHandle, BlobBackend, Error, Result};
use std::{
    any::Any,
    fmt::{self, Debug},
};

/// Large binary object handled by a backend.
///
/// `Blob::default()` keeps the content in memory, sessions hand out backend specific blobs through
/// `Session::make_blob`.
pub struct Blob {
    backend: Box<dyn BlobBackend>,
    // Keeps the backend module loaded, must be dropped last
    handle: Option<BackendHandle>,
}

impl Blob {
    pub fn new(backend: Box<dyn BlobBackend>) -> Self {
        Self::with_handle(backend, None)
    }

    /// Blob whose backend code lives in a loaded module, `handle` keeps it loaded.
    pub fn with_handle(backend: Box<dyn BlobBackend>, handle: Option<BackendHandle>) -> Self {
        Self { backend, handle }
    }

    /// Name of the backend module kept alive by this blob, if it was loaded dynamically.
    pub fn backend_module(&self) -> Option<&str> {
        self.handle.as_ref().map(BackendHandle::name)
    }

    pub fn len(&self) -> Result<usize> {
        self.backend.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.backend.is_empty()
    }

    pub fn read(&self, offset: usize, buffer: &mut [u8]) -> Result<usize> {
        self.backend.read(offset, buffer)
    }

    pub fn read_all(&self) -> Result<Vec<u8>> {
        let mut result = vec![0; self.len()?];
        let read = self.read(0, &mut result)?;
        result.truncate(read);
        Ok(result)
    }

    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<usize> {
        self.backend.write(offset, data)
    }

    pub fn append(&mut self, data: &[u8]) -> Result<usize> {
        self.backend.append(data)
    }

    pub fn trim(&mut self, len: usize) -> Result<()> {
        self.backend.trim(len)
    }

    /// Replaces the whole content.
    pub fn replace(&mut self, data: &[u8]) -> Result<()> {
        self.trim(0)?;
        self.append(data)?;
        Ok(())
    }

    pub fn backend(&self) -> &dyn BlobBackend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn BlobBackend {
        self.backend.as_mut()
    }
}

impl Default for Blob {
    fn default() -> Self {
        Self::new(Box::new(TrivialBlobBackend::default()))
    }
}

impl Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("len", &self.len().ok())
            .finish()
    }
}

/// Blob kept entirely in memory, for backends whose native large objects are plain values.
#[derive(Debug, Default, Clone)]
pub struct TrivialBlobBackend {
    data: Vec<u8>,
}

impl TrivialBlobBackend {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl BlobBackend for TrivialBlobBackend {
    fn len(&self) -> Result<usize> {
        Ok(self.data.len())
    }

    fn read(&self, offset: usize, buffer: &mut [u8]) -> Result<usize> {
        if offset > self.data.len() {
            return Err(Error::msg(format!(
                "Cannot read from offset {} of a blob of {} bytes",
                offset,
                self.data.len()
            )));
        }
        let len = buffer.len().min(self.data.len() - offset);
        buffer[..len].copy_from_slice(&self.data[offset..offset + len]);
        Ok(len)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<usize> {
        if offset > self.data.len() {
            return Err(Error::msg(format!(
                "Cannot write at offset {} past the end of a blob of {} bytes",
                offset,
                self.data.len()
            )));
        }
        let overlap = data.len().min(self.data.len() - offset);
        self.data[offset..offset + overlap].copy_from_slice(&data[..overlap]);
        self.data.extend_from_slice(&data[overlap..]);
        Ok(data.len())
    }

    fn append(&mut self, data: &[u8]) -> Result<usize> {
        self.data.extend_from_slice(data);
        Ok(data.len())
    }

    fn trim(&mut self, len: usize) -> Result<()> {
        if len > self.data.len() {
            return Err(Error::msg("Cannot trim a blob to a size larger than its content"));
        }
        self.data.truncate(len);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trivial_blob() {
        let mut blob = Blob::default();
        assert!(blob.is_empty().expect("in memory"));
        blob.append(b"hello").expect("append");
        blob.write(3, b"p me").expect("overlapping write");
        assert_eq!(blob.read_all().expect("read"), b"help me");
        let mut buffer = [0; 3];
        assert_eq!(blob.read(5, &mut buffer).expect("tail read"), 2);
        assert_eq!(&buffer[..2], b"me");
        assert!(blob.write(10, b"x").is_err());
        blob.trim(4).expect("shrink");
        assert_eq!(blob.read_all().expect("read"), b"help");
        assert!(blob.trim(5).is_err());
    }
}
