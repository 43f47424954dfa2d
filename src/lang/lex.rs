use super::{sugar, token, Dictionary, Error};
use crate::error;

type Result<T> = std::result::Result<T, Error>;

/// Resolves `use` directives to source text. File and network access
/// stay outside the lexer.
pub trait SourceLoader {
    fn load(&mut self, name: &str) -> Result<String>;
}

/// Lexes `source` into `dictionary`, dispatching meta-directives as
/// they are seen. `origin` names the source in error messages.
pub fn lex(
    dictionary: &mut Dictionary,
    globals: &mut Vec<String>,
    loader: &mut dyn SourceLoader,
    source: &str,
    origin: &str,
) -> Result<()> {
    let mut lexer = Lexer {
        dictionary,
        globals,
        loader,
        registers: Default::default(),
    };
    lexer.run(source, origin)
}

#[derive(PartialEq, Clone, Copy)]
enum State {
    Top,
    Def,
    DefLineComment,
    DefParenComment,
    LineComment,
    ParenComment,
    Meta,
    StrOpen,
    StrBody,
    ParenStrOpen,
    ParenStrBody,
}

struct Lexer<'a> {
    dictionary: &'a mut Dictionary,
    globals: &'a mut Vec<String>,
    loader: &'a mut dyn SourceLoader,
    registers: [Vec<String>; 4],
}

impl<'a> Lexer<'a> {
    fn run(&mut self, source: &str, origin: &str) -> Result<()> {
        let chars: Vec<char> = source.chars().collect();
        let mut state = State::Top;
        let mut counter = 0;
        let mut word = String::new();
        let mut def: Vec<String> = Vec::new();
        let mut buffer = String::new();
        let mut line = 1;
        let mut pos = 0;

        for index in 0..chars.len() {
            let ch = chars[index];
            let next = chars.get(index + 1).copied();
            pos += 1;
            match state {
                State::Top => match ch {
                    ':' => {
                        state = State::Def;
                        def = Vec::new();
                    }
                    '\\' => state = State::LineComment,
                    '(' => state = State::ParenComment,
                    '\r' | '\t' | ' ' => {}
                    '\n' => {
                        line += 1;
                        pos = 0;
                    }
                    _ => {
                        state = State::Meta;
                        buffer.push(ch);
                    }
                },
                State::Def => match ch {
                    '(' => state = State::DefParenComment,
                    '\\' => state = State::DefLineComment,
                    ';' => {
                        if !buffer.is_empty() {
                            self.push_token(&mut counter, &mut word, &mut def, &mut buffer)?;
                        }
                        self.close_definition(&word, def, origin)
                            .map_err(|e| at(e, line, pos))?;
                        def = Vec::new();
                        counter = 0;
                        state = State::Top;
                    }
                    '\n' | '\r' | '\t' | ' ' => {
                        if ch == '\n' {
                            line += 1;
                            pos = 0;
                        }
                        if !buffer.is_empty() {
                            self.push_token(&mut counter, &mut word, &mut def, &mut buffer)
                                .map_err(|e| at(e, line, pos))?;
                        }
                    }
                    '.' | 'a' | 'g' => {
                        if next.is_none() {
                            continue;
                        }
                        if buffer.is_empty() && next == Some('"') {
                            buffer.push(ch);
                            state = State::StrOpen;
                        } else if buffer.is_empty() && next == Some('(') {
                            buffer.push(ch);
                            state = State::ParenStrOpen;
                        } else {
                            buffer.push(ch);
                        }
                    }
                    _ => buffer.push(ch),
                },
                State::DefLineComment => {
                    if ch == '\n' {
                        state = State::Def;
                        line += 1;
                        pos = 0;
                    }
                }
                State::DefParenComment => {
                    if ch == ')' {
                        state = State::Def;
                    }
                }
                State::LineComment => {
                    if ch == '\n' {
                        state = State::Top;
                        line += 1;
                        pos = 0;
                    }
                }
                State::ParenComment => {
                    if ch == ')' {
                        state = State::Top;
                    }
                }
                State::Meta => {
                    if ch == '\n' {
                        state = State::Top;
                        pos = 0;
                        if buffer == "__END__" {
                            return Ok(());
                        }
                        let meta = std::mem::take(&mut buffer);
                        self.handle_meta(&meta).map_err(|e| at(e, line, pos))?;
                        line += 1;
                    } else if ch != '\r' {
                        buffer.push(ch);
                    }
                }
                State::StrOpen => {
                    buffer.push(ch);
                    state = State::StrBody;
                }
                State::StrBody => {
                    if next.is_none() && ch != '"' {
                        continue;
                    }
                    buffer.push(ch);
                    if ch == '\\' && next == Some('"') {
                        buffer.pop();
                        state = State::StrOpen;
                    } else if ch == '"' {
                        def.push(std::mem::take(&mut buffer));
                        state = State::Def;
                    }
                }
                State::ParenStrOpen => {
                    buffer.push(ch);
                    state = State::ParenStrBody;
                }
                State::ParenStrBody => {
                    if next.is_none() && ch != ')' {
                        continue;
                    }
                    buffer.push(ch);
                    if ch == '\\' && next == Some(')') {
                        buffer.pop();
                        state = State::ParenStrOpen;
                    } else if ch == ')' {
                        def.push(std::mem::take(&mut buffer));
                        state = State::Def;
                    }
                }
            }
        }

        if state != State::Top {
            let cause = match state {
                State::Def | State::DefLineComment | State::DefParenComment => {
                    "WORD DEFINITION IS NOT CLOSED"
                }
                State::StrOpen | State::StrBody => "MISSING '\"'",
                State::ParenComment | State::ParenStrOpen | State::ParenStrBody => "MISSING ')'",
                State::Meta => "DIRECTIVE IS NOT TERMINATED",
                _ => "UNCLOSED CONSTRUCT",
            };
            return Err(
                error!(SyntaxError, line, ..pos; &format!("{}: {}", origin, cause)),
            );
        }

        Ok(())
    }

    /// Flushes one buffered token into the open definition, expanding
    /// inline macros at their call site.
    fn push_token(
        &mut self,
        counter: &mut usize,
        word: &mut String,
        def: &mut Vec<String>,
        buffer: &mut String,
    ) -> Result<()> {
        let tok = std::mem::take(buffer);
        if *counter == 0 {
            *word = tok;
        } else if let Some(inline) = self.dictionary.get_inline(&tok).map(|t| t.to_vec()) {
            self.expand_inline(&inline, def)?;
        } else {
            def.push(tok);
        }
        *counter += 1;
        Ok(())
    }

    fn expand_inline(&mut self, inline: &[String], def: &mut Vec<String>) -> Result<()> {
        let argc = match inline.first().map(|s| s.as_str()) {
            Some("@1@") => 1,
            Some("@2@") => 2,
            Some("@3@") => 3,
            Some("@4@") => 4,
            _ => 0,
        };
        for index in 0..argc {
            self.capture_register(def, index)?;
        }
        for value in inline {
            match value.as_str() {
                "#1#" => def.extend(self.registers[0].iter().cloned()),
                "#2#" => def.extend(self.registers[1].iter().cloned()),
                "#3#" => def.extend(self.registers[2].iter().cloned()),
                "#4#" => def.extend(self.registers[3].iter().cloned()),
                "@1@" | "@2@" | "@3@" | "@4@" => {}
                _ => {
                    if token::is_string(value) {
                        let mut s = value.clone();
                        for (index, marker) in
                            ["#1#", "#2#", "#3#", "#4#"].iter().enumerate()
                        {
                            if s.contains(marker) {
                                s = s.replace(marker, &self.registers[index].join(" "));
                            }
                        }
                        def.push(s);
                    } else {
                        def.push(value.clone());
                    }
                }
            }
        }
        for register in self.registers.iter_mut() {
            register.clear();
        }
        Ok(())
    }

    /// Pops one token, or one bracketed `[ ... ]` group, off the open
    /// definition into a macro register.
    fn capture_register(&mut self, def: &mut Vec<String>, index: usize) -> Result<()> {
        let word = match def.pop() {
            Some(word) => word,
            None => {
                return Err(
                    error!(StructuralError; &format!("INLINE ARGUMENT {} IS MISSING", index + 1)),
                )
            }
        };
        if word == "]" {
            let mut count = 1;
            loop {
                let word = match def.pop() {
                    Some(word) => word,
                    None => {
                        return Err(error!(StructuralError; "UNBALANCED '[' AND ']' IN BLOCK"))
                    }
                };
                if word == "[" {
                    count -= 1;
                    if count == 0 {
                        break;
                    }
                } else if word == "]" {
                    count += 1;
                }
                self.registers[index].push(word);
            }
            self.registers[index].reverse();
        } else {
            self.registers[index].push(word);
        }
        Ok(())
    }

    fn close_definition(&mut self, word: &str, def: Vec<String>, origin: &str) -> Result<()> {
        match word {
            "class" => {
                let generated = sugar::class_source(self.dictionary, &def)?;
                self.run(&generated, origin)
            }
            "inline" => {
                if def.is_empty() {
                    return Err(error!(StructuralError; "INLINE DEFINITION HAS NO NAME"));
                }
                let name = def[0].clone();
                self.dictionary.define_inline(&name, def[1..].to_vec())
            }
            _ => self.dictionary.define(word, def),
        }
    }

    fn handle_meta(&mut self, meta: &str) -> Result<()> {
        let mut parts = meta.split_whitespace();
        let cmd = parts.next().unwrap_or("");
        match cmd {
            "use" => {
                let name = match parts.next() {
                    Some(name) => name.to_string(),
                    None => return Err(error!(SyntaxError; "USE NEEDS A FILENAME")),
                };
                let source = self.loader.load(&name)?;
                self.run(&source, &name)
            }
            "variable" => {
                let name = match parts.next() {
                    Some(name) => name,
                    None => return Err(error!(SyntaxError; "VARIABLE NEEDS A NAME")),
                };
                if !self.globals.iter().any(|g| g == name) {
                    self.globals.push(name.to_string());
                }
                Ok(())
            }
            _ => Err(error!(SyntaxError; &format!("UNKNOWN DIRECTIVE \"{}\"", cmd))),
        }
    }
}

/// Errors from nested sources already carry their own position.
fn at(error: Error, line: usize, pos: usize) -> Error {
    if error.line_number().is_some() {
        return error;
    }
    error.in_line_number(line).in_column(pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoLoader;

    impl SourceLoader for NoLoader {
        fn load(&mut self, name: &str) -> Result<String> {
            Err(error!(HostError; &format!("NO SOURCE \"{}\"", name)))
        }
    }

    fn lex_str(source: &str) -> (Dictionary, Vec<String>) {
        let mut dictionary = Dictionary::new();
        let mut globals = Vec::new();
        lex(&mut dictionary, &mut globals, &mut NoLoader, source, "test").unwrap();
        (dictionary, globals)
    }

    #[test]
    fn test_definition() {
        let (dictionary, _) = lex_str(": add2 2 + ;\n");
        assert_eq!(dictionary.get("add2").unwrap(), &["2", "+"]);
    }

    #[test]
    fn test_semicolon_glued_to_token() {
        let (dictionary, _) = lex_str(": add2 2 +;\n");
        assert_eq!(dictionary.get("add2").unwrap(), &["2", "+"]);
    }

    #[test]
    fn test_comments() {
        let (dictionary, _) = lex_str(
            "\\ a line comment\n( a paren comment )\n: f ( inside ) 1 \\ eol\n 2 ;\n",
        );
        assert_eq!(dictionary.get("f").unwrap(), &["1", "2"]);
    }

    #[test]
    fn test_string_tokens() {
        let (dictionary, _) = lex_str(": f .\" hi\" a\" yo\" g( zz) ;\n");
        assert_eq!(
            dictionary.get("f").unwrap(),
            &[".\" hi\"", "a\" yo\"", "g( zz)"]
        );
    }

    #[test]
    fn test_string_escape() {
        let (dictionary, _) = lex_str(": f .\" say \\\"hi\\\"\" ;\n");
        assert_eq!(dictionary.get("f").unwrap(), &[".\" say \"hi\"\""]);
    }

    #[test]
    fn test_variable_directive() {
        let (_, globals) = lex_str("variable counter\nvariable counter\n");
        assert_eq!(globals, vec!["counter".to_string()]);
    }

    #[test]
    fn test_end_sentinel() {
        let (dictionary, _) = lex_str(": a 1 ;\n__END__\n: b 2 ;\n");
        assert!(dictionary.contains("a"));
        assert!(!dictionary.contains("b"));
    }

    #[test]
    fn test_unterminated_definition() {
        let mut dictionary = Dictionary::new();
        let mut globals = Vec::new();
        let result = lex(
            &mut dictionary,
            &mut globals,
            &mut NoLoader,
            ": f 1 2",
            "test",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unterminated_string() {
        let mut dictionary = Dictionary::new();
        let mut globals = Vec::new();
        let result = lex(
            &mut dictionary,
            &mut globals,
            &mut NoLoader,
            ": f .\" oops ;\n",
            "test",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_inline_single_word() {
        let (dictionary, _) = lex_str(
            ": inline twice @1@ #1# #1# ;\n: f 5 twice ;\n",
        );
        assert_eq!(dictionary.get("f").unwrap(), &["5", "5"]);
    }

    #[test]
    fn test_inline_block_argument() {
        let (dictionary, _) = lex_str(
            ": inline twice @1@ #1# #1# ;\n: f [ 1 + ] twice ;\n",
        );
        assert_eq!(dictionary.get("f").unwrap(), &["1", "+", "1", "+"]);
    }

    #[test]
    fn test_inline_in_string() {
        let (dictionary, _) = lex_str(
            ": inline greet @1@ .\" hello #1#\" ;\n: f world greet ;\n",
        );
        assert_eq!(dictionary.get("f").unwrap(), &[".\" hello world\""]);
    }
}
