//! Text clipboard used by copy and paste.
//!
//! [`ClipboardBuffer`] prefers a platform clipboard and keeps an in-memory
//! copy of everything it writes, which it serves whenever the platform
//! clipboard is missing, fails or comes back empty.

use thiserror::Error;

/// Errors that can occur when talking to a clipboard.
#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to read clipboard: {0}")]
    Read(String),
    #[error("Failed to write clipboard: {0}")]
    Write(String),
}

/// Result type for clipboard operations.
pub type ClipboardResult<T> = Result<T, ClipboardError>;

/// A text clipboard.
pub trait ClipboardProvider {
    fn read_text(&mut self) -> ClipboardResult<String>;
    fn write_text(&mut self, text: &str) -> ClipboardResult<()>;
}

impl<P: ClipboardProvider + ?Sized> ClipboardProvider for Box<P> {
    fn read_text(&mut self) -> ClipboardResult<String> {
        (**self).read_text()
    }

    fn write_text(&mut self, text: &str) -> ClipboardResult<()> {
        (**self).write_text(text)
    }
}

/// Process-local clipboard.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    text: Option<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardProvider for MemoryClipboard {
    fn read_text(&mut self) -> ClipboardResult<String> {
        Ok(self.text.clone().unwrap_or_default())
    }

    fn write_text(&mut self, text: &str) -> ClipboardResult<()> {
        self.text = Some(text.to_string());
        Ok(())
    }
}

/// The OS clipboard.
#[cfg(not(target_arch = "wasm32"))]
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

#[cfg(not(target_arch = "wasm32"))]
impl SystemClipboard {
    pub fn new() -> ClipboardResult<Self> {
        arboard::Clipboard::new()
            .map(|inner| Self { inner })
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl ClipboardProvider for SystemClipboard {
    fn read_text(&mut self) -> ClipboardResult<String> {
        self.inner
            .get_text()
            .map_err(|e| ClipboardError::Read(e.to_string()))
    }

    fn write_text(&mut self, text: &str) -> ClipboardResult<()> {
        self.inner
            .set_text(text.to_string())
            .map_err(|e| ClipboardError::Write(e.to_string()))
    }
}

/// Platform clipboard with an in-memory fallback.
#[derive(Default)]
pub struct ClipboardBuffer {
    provider: Option<Box<dyn ClipboardProvider>>,
    fallback: Option<String>,
}

impl std::fmt::Debug for ClipboardBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipboardBuffer")
            .field("provider", &self.provider.is_some())
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl ClipboardBuffer {
    /// In-memory only.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(provider: impl ClipboardProvider + 'static) -> Self {
        Self {
            provider: Some(Box::new(provider)),
            fallback: None,
        }
    }

    /// Use the OS clipboard when one can be opened.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn system() -> Self {
        match SystemClipboard::new() {
            Ok(clipboard) => Self::with_provider(clipboard),
            Err(e) => {
                log::debug!("{}, using in-memory clipboard", e);
                Self::new()
            }
        }
    }

    pub fn write(&mut self, text: &str) {
        self.fallback = Some(text.to_string());
        if let Some(provider) = self.provider.as_mut() {
            if let Err(e) = provider.write_text(text) {
                log::debug!("{}, kept in memory", e);
            }
        }
    }

    /// Current text, or None when nothing was copied.
    pub fn read(&mut self) -> Option<String> {
        if let Some(provider) = self.provider.as_mut() {
            match provider.read_text() {
                Ok(text) if !text.is_empty() => return Some(text),
                Ok(_) => {}
                Err(e) => log::debug!("{}, reading in-memory copy", e),
            }
        }
        self.fallback.clone().filter(|text| !text.is_empty())
    }
}
