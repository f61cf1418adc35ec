//! Sorties : writer boxé + capture en mémoire pour tests/REPL.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Where `PRINT` writes.
pub type Output = Box<dyn Write + Send>;

/// Petit writer qui **capture** la sortie dans une String.
#[derive(Debug, Default, Clone)]
pub struct Captured(Arc<Mutex<String>>);

impl Captured {
    /// Récupère le buffer (copie).
    pub fn get(&self) -> String {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Captured text split into lines.
    pub fn lines(&self) -> Vec<String> {
        self.get().lines().map(str::to_owned).collect()
    }

    /// Réinitialise le buffer.
    pub fn clear(&self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push_str(&s);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
