use super::Error;
use crate::error;
use std::collections::HashMap;

type Result<T> = std::result::Result<T, Error>;

/// ## Word dictionary
///
/// Maps a word name to its ordered token list. Definitions are
/// overwritten on redefinition and removed only by `clear`. Inline
/// macro bodies live in a separate table with the same shape.

#[derive(Default)]
pub struct Dictionary {
    defs: HashMap<String, Vec<String>>,
    inlines: HashMap<String, Vec<String>>,
}

impl Dictionary {
    pub fn new() -> Dictionary {
        Dictionary::default()
    }

    pub fn define(&mut self, name: &str, tokens: Vec<String>) -> Result<()> {
        if self.inlines.contains_key(name) {
            return Err(
                error!(NameError; &format!("\"{}\" IS ALREADY DEFINED AS INLINE", name)),
            );
        }
        self.defs.insert(name.to_string(), tokens);
        Ok(())
    }

    pub fn define_inline(&mut self, name: &str, tokens: Vec<String>) -> Result<()> {
        if self.defs.contains_key(name) {
            return Err(
                error!(NameError; &format!("\"{}\" IS ALREADY DEFINED AS WORD", name)),
            );
        }
        self.inlines.insert(name.to_string(), tokens);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.defs.get(name).map(|tokens| tokens.as_slice())
    }

    pub fn get_inline(&self, name: &str) -> Option<&[String]> {
        self.inlines.get(name).map(|tokens| tokens.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.defs.keys().map(|name| name.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn clear(&mut self) {
        self.defs.clear();
        self.inlines.clear();
    }
}
