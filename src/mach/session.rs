use super::{Cell, Compiler, Runtime};
use crate::error;
use crate::lang::{lex, Dictionary, Error, SourceLoader};
use std::path::{Path, PathBuf};

type Result<T> = std::result::Result<T, Error>;

/// Words every session starts with.
const PRELUDE: &str = include_str!("../../lib/core.fs");

/// How many tokens a definition may have and still be pasted into its
/// callers instead of becoming a subroutine.
const INLINE_LIMIT: usize = 4;

/// ## Session
///
/// Owns one dictionary and one machine. Lines entered interactively
/// and files loaded with `use` accumulate in the dictionary; every
/// evaluation compiles the whole dictionary from `main` down and runs
/// the result on the persistent machine, so the data stack carries
/// over between lines.

pub struct Session {
    dictionary: Dictionary,
    globals: Vec<String>,
    loader: Loader,
    runtime: Runtime,
}

impl Session {
    pub fn new() -> Result<Session> {
        let mut session = Session {
            dictionary: Dictionary::new(),
            globals: Vec::new(),
            loader: Loader::new(),
            runtime: Runtime::new(),
        };
        session.parse(PRELUDE, "core.fs")?;
        Ok(session)
    }

    pub fn runtime(&mut self) -> &mut Runtime {
        &mut self.runtime
    }

    /// Lexes source text into the dictionary without running anything.
    pub fn parse(&mut self, source: &str, origin: &str) -> Result<()> {
        lex(
            &mut self.dictionary,
            &mut self.globals,
            &mut self.loader,
            source,
            origin,
        )
    }

    /// Loads and lexes a file, URL, or library name.
    pub fn parse_file(&mut self, name: &str) -> Result<()> {
        let source = self.loader.load(name)?;
        self.parse(&source, name)
    }

    /// Compiles the dictionary from `main` down into an instruction
    /// stream.
    pub fn compile_main(&self) -> Result<String> {
        Compiler::new(&self.dictionary, &self.globals)
            .inline_limit(INLINE_LIMIT)
            .compile()
    }

    /// Runs the compiled program on the session machine and returns
    /// its exit status.
    pub fn run_main(&mut self) -> Result<Cell> {
        let code = self.compile_main()?;
        self.runtime.run(&code)
    }

    /// Evaluates one interactive line by wrapping it as `main`.
    pub fn eval(&mut self, line: &str) -> Result<Cell> {
        self.parse(&format!(": main {} ;", line), "repl")?;
        self.run_main()
    }

    /// Renders one definition in source form, or None for words the
    /// dictionary does not know.
    pub fn definition(&self, word: &str) -> Option<String> {
        if self.globals.iter().any(|g| g == word) {
            return Some(format!("variable {}", word));
        }
        if let Some(tokens) = self.dictionary.get_inline(word) {
            return Some(format!(": inline {} {} ;", word, tokens.join(" ")));
        }
        self.dictionary
            .get(word)
            .map(|tokens| format!(": {} {} ;", word, tokens.join(" ")))
    }

    /// Renders every definition, globals first.
    pub fn definitions(&self) -> Vec<String> {
        let mut result: Vec<String> = self
            .globals
            .iter()
            .map(|name| format!("variable {}", name))
            .collect();
        for name in self.dictionary.names() {
            if let Some(rendered) = self.definition(name) {
                result.push(rendered);
            }
        }
        result
    }
}

/// ## Source loader
///
/// Resolves the names given to `use` and to the command line. URLs
/// are fetched over HTTP, existing paths are read directly, and bare
/// names are searched for in the library directory with `.fs` assumed
/// when the name has no extension.

pub struct Loader {
    library: Option<PathBuf>,
}

impl Loader {
    fn new() -> Loader {
        Loader {
            library: library_path(),
        }
    }

    fn fetch(&self, url: &str) -> Result<String> {
        let response = reqwest::blocking::get(url)
            .map_err(|error| error!(HostError; &error.to_string()))?;
        response
            .text()
            .map_err(|error| error!(HostError; &error.to_string()))
    }

    fn search_library(&self, name: &str) -> Option<PathBuf> {
        let library = self.library.as_deref()?;
        let want_ext = match Path::new(name).extension() {
            Some(ext) => ext.to_os_string(),
            None => "fs".into(),
        };
        let entries = std::fs::read_dir(library).ok()?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension() != Some(want_ext.as_os_str()) {
                continue;
            }
            match path.file_name().and_then(|f| f.to_str()) {
                Some(file_name) if file_name.contains(name) => return Some(path),
                _ => {}
            }
        }
        None
    }
}

impl SourceLoader for Loader {
    fn load(&mut self, name: &str) -> Result<String> {
        if name.starts_with("http://") || name.starts_with("https://") {
            return self.fetch(name);
        }
        let path = if Path::new(name).is_file() {
            PathBuf::from(name)
        } else {
            match self.search_library(name) {
                Some(path) => path,
                None => {
                    return Err(error!(HostError; &format!("FILE \"{}\" NOT FOUND", name)));
                }
            }
        };
        std::fs::read_to_string(path).map_err(|error| error!(HostError; &error.to_string()))
    }
}

/// The library directory is `forth/lib` under the user configuration
/// directory.
fn library_path() -> Option<PathBuf> {
    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) => PathBuf::from(dir),
        None => Path::new(&std::env::var_os("HOME")?).join(".config"),
    };
    Some(base.join("forth").join("lib"))
}
