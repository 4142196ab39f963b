use crate::constants;
use rand::Rng;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// The inclusive range exchange codes are drawn from.
///
/// Codes double as TCP ports, so the range defaults to the dynamic/private
/// port range `49152..=65535`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeRange(RangeInclusive<u16>);

impl CodeRange {
    /// Creates a range from `start` to `end`, both included. The bounds are
    /// swapped if given in reverse.
    pub fn new(start: u16, end: u16) -> CodeRange {
        if start <= end {
            CodeRange(start..=end)
        } else {
            CodeRange(end..=start)
        }
    }

    pub fn start(&self) -> u16 {
        *self.0.start()
    }

    pub fn end(&self) -> u16 {
        *self.0.end()
    }

    pub fn contains(&self, code: u16) -> bool {
        self.0.contains(&code)
    }
}

impl Default for CodeRange {
    fn default() -> Self {
        CodeRange::new(constants::DYNAMIC_PORT_START, constants::DYNAMIC_PORT_END)
    }
}

/// Maps exchange codes to the files offered under them.
///
/// Meant to be shared behind an [`Arc`](std::sync::Arc); each registration
/// is a single locked read-modify-write, so concurrent uploads never receive
/// the same code while both entries exist.
#[derive(Debug)]
pub struct Registry {
    codes: CodeRange,
    max_attempts: usize,
    entries: Mutex<HashMap<u16, PathBuf>>,
}

impl Registry {
    pub fn new(codes: CodeRange) -> Registry {
        Registry {
            codes,
            max_attempts: constants::MAX_CODE_ATTEMPTS,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn codes(&self) -> &CodeRange {
        &self.codes
    }

    /// Offers `path` under a random free code and returns the code.
    pub fn register<P: Into<PathBuf>>(&self, path: P) -> crate::Result<u16> {
        let path = path.into();
        let mut entries = self.lock()?;
        let mut rng = rand::thread_rng();

        for _ in 0..self.max_attempts {
            let code = rng.gen_range(self.codes.0.clone());

            if let Entry::Vacant(entry) = entries.entry(code) {
                let path = entry.insert(path);
                log::debug!("registered code {} for {}", code, path.display());
                return Ok(code);
            }
        }

        Err(crate::Error::CodesExhausted {
            attempts: self.max_attempts,
        })
    }

    pub fn lookup(&self, code: u16) -> crate::Result<Option<PathBuf>> {
        Ok(self.lock()?.get(&code).cloned())
    }

    /// Removes the mapping for `code`, returning the path it offered.
    pub fn release(&self, code: u16) -> crate::Result<Option<PathBuf>> {
        let released = self.lock()?.remove(&code);
        if released.is_some() {
            log::debug!("released code {}", code);
        }
        Ok(released)
    }

    pub fn len(&self) -> crate::Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> crate::Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> crate::Result<MutexGuard<'_, HashMap<u16, PathBuf>>> {
        self.entries
            .lock()
            .map_err(|err| crate::Error::LockFailure(err.to_string().into()))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new(CodeRange::default())
    }
}
