use super::{Labels, Op};
use crate::error;
use crate::lang::{is_float, is_numeric, is_string, Dictionary, Error};
use std::collections::BTreeMap;

type Result<T> = std::result::Result<T, Error>;

/// ## Compiler
///
/// Compiles the entry word `main` against a dictionary into the
/// textual instruction stream the loader understands. Words short
/// enough to fit the inline limit are expanded at the call site;
/// longer words become memoized `SUB name .. END` subroutines emitted
/// once and invoked with `CALL`. The entry word itself is always
/// expanded.
///
/// A token resolves in this order: string literal, integer literal,
/// float literal, active local, declared global, primitive,
/// dictionary word, `&name` reference, control keyword. Anything
/// left over is a name error.

pub struct Compiler<'a> {
    dictionary: &'a Dictionary,
    globals: &'a [String],
    inline_limit: usize,
    labels: Labels,
    funcs: BTreeMap<String, Vec<Op>>,
    scopes: Vec<Vec<String>>,
    pending: Vec<String>,
    cases: Vec<usize>,
    dos: Vec<String>,
    whiles: Vec<String>,
    leaves: Vec<String>,
}

impl<'a> Compiler<'a> {
    pub fn new(dictionary: &'a Dictionary, globals: &'a [String]) -> Compiler<'a> {
        Compiler {
            dictionary,
            globals,
            inline_limit: 4,
            labels: Labels::new(),
            funcs: BTreeMap::new(),
            scopes: Vec::new(),
            pending: Vec::new(),
            cases: Vec::new(),
            dos: Vec::new(),
            whiles: Vec::new(),
            leaves: Vec::new(),
        }
    }

    /// Words whose definition has more tokens than this become
    /// subroutines. Anything at or below it is expanded inline.
    pub fn inline_limit(mut self, limit: usize) -> Compiler<'a> {
        self.inline_limit = limit;
        self
    }

    /// Compiles `main` and every word it reaches. The result is the
    /// complete program text: subroutines first, then the entry
    /// marker, then the entry body closed by `L 0` and `STP`.
    pub fn compile(mut self) -> Result<String> {
        let mut result = Vec::new();
        self.compile_word("main", &mut result)?;
        if !self.pending.is_empty()
            || !self.cases.is_empty()
            || !self.dos.is_empty()
            || !self.whiles.is_empty()
            || !self.leaves.is_empty()
        {
            return Err(error!(StructuralError; "A CONTROL STRUCTURE IS NOT CLOSED"));
        }
        result.push(Op::L(0));
        result.push(Op::Stp);

        let mut out = String::new();
        for ops in self.funcs.values() {
            for op in ops {
                out.push_str(&op.to_string());
                out.push(';');
            }
        }
        out.push_str("MAIN;");
        for op in &result {
            out.push_str(&op.to_string());
            out.push(';');
        }
        Ok(out)
    }

    fn compile_tokens(&mut self, word: &str, tokens: &[String], result: &mut Vec<Op>) -> Result<()> {
        let mut open_scopes = 0;
        let mut i = 0;
        while i < tokens.len() {
            match tokens[i].as_str() {
                "{" => {
                    i = self.open_scope(tokens, i + 1, result)?;
                    open_scopes += 1;
                }
                "[" => {
                    i = self.compile_block(tokens, i + 1, result)?;
                }
                "to" => {
                    let name = match tokens.get(i + 1) {
                        Some(name) => name,
                        None => return Err(error!(StructuralError; "\"to\" NEEDS A NAME")),
                    };
                    if self.globals.iter().any(|g| g == name) {
                        self.ensure_gdef(name);
                        result.push(Op::Gset(name.as_str().into()));
                    } else if self.in_scope(name) {
                        result.push(Op::Lset(name.as_str().into(), 0));
                    } else {
                        return Err(error!(NameError; &format!(
                            "UNABLE TO ASSIGN \"{}\": NOT A LOCAL OR GLOBAL",
                            name
                        )));
                    }
                    i += 1;
                }
                "char" => {
                    let text = match tokens.get(i + 1) {
                        Some(text) => text,
                        None => return Err(error!(StructuralError; "\"char\" NEEDS A CHARACTER")),
                    };
                    let mut chars = text.chars();
                    let ch = match chars.next() {
                        Some(ch) if chars.next().is_none() => ch,
                        _ => {
                            return Err(error!(SyntaxError; &format!(
                                "\"{}\" IS NOT A SINGLE CHARACTER",
                                text
                            )))
                        }
                    };
                    result.push(Op::L(ch as i64));
                    i += 1;
                }
                "done" => {
                    if open_scopes == 0 {
                        return Err(error!(StructuralError; "\"done\" WITHOUT LOCAL DECLARATION"));
                    }
                    open_scopes -= 1;
                    self.scopes.pop();
                    result.push(Op::Lclr);
                }
                token if token == word => {
                    result.push(Op::Call(word.into()));
                }
                token => {
                    self.compile_word(token, result)?;
                }
            }
            i += 1;
        }

        for _ in 0..open_scopes {
            self.scopes.pop();
            result.push(Op::Lclr);
        }
        Ok(())
    }

    /// `{ a b c }` opens a frame and binds right to left, so the
    /// rightmost name takes the top of the stack.
    fn open_scope(&mut self, tokens: &[String], mut i: usize, result: &mut Vec<Op>) -> Result<usize> {
        result.push(Op::Lctx);
        let mut names = Vec::new();
        while i < tokens.len() && tokens[i] != "}" {
            names.push(tokens[i].clone());
            i += 1;
        }
        if i == tokens.len() {
            return Err(error!(StructuralError; "LOCAL DECLARATION IS NOT CLOSED"));
        }
        for name in names.iter().rev() {
            result.push(Op::Ldef(name.as_str().into(), 0));
        }
        self.scopes.push(names);
        Ok(i)
    }

    /// `[ .. ]` compiles its body as an anonymous subroutine and
    /// leaves the subroutine address on the stack for `exec`.
    fn compile_block(&mut self, tokens: &[String], mut i: usize, result: &mut Vec<Op>) -> Result<usize> {
        let name = self.labels.block();
        let mut body = Vec::new();
        let mut depth = 0;
        loop {
            let token = match tokens.get(i) {
                Some(token) => token,
                None => return Err(error!(StructuralError; "BLOCK IS NOT CLOSED")),
            };
            if token == "[" {
                depth += 1;
            } else if token == "]" {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            body.push(token.clone());
            i += 1;
        }

        let mut sub = vec![Op::Sub(name.as_str().into())];
        self.compile_tokens(&name, &body, &mut sub)?;
        sub.push(Op::End);
        self.funcs.insert(name.clone(), sub);
        result.push(Op::Ref(name.as_str().into()));
        Ok(i)
    }

    fn compile_word(&mut self, word: &str, result: &mut Vec<Op>) -> Result<()> {
        let dictionary = self.dictionary;
        if is_string(word) {
            for token in lower_string(word) {
                self.compile_word(&token, result)?;
            }
        } else if is_numeric(word) {
            match word.parse() {
                Ok(n) => result.push(Op::L(n)),
                Err(_) => {
                    return Err(error!(SyntaxError; &format!("\"{}\" IS OUT OF RANGE", word)))
                }
            }
        } else if is_float(word) {
            match word.parse() {
                Ok(x) => result.push(Op::Lf(x)),
                Err(_) => {
                    return Err(error!(SyntaxError; &format!("\"{}\" IS OUT OF RANGE", word)))
                }
            }
        } else if self.in_scope(word) {
            result.push(Op::Lcl(word.into(), 0));
        } else if self.globals.iter().any(|g| g == word) {
            self.ensure_gdef(word);
            result.push(Op::Gbl(word.into()));
        } else if let Some(op) = primitive(word) {
            result.push(op);
        } else if let Some(def) = dictionary.get(word) {
            if word != "main" && def.len() > self.inline_limit {
                self.memoize(word, def)?;
                result.push(Op::Call(word.into()));
            } else {
                self.compile_tokens(word, def, result)?;
            }
        } else if let Some(name) = word.strip_prefix('&') {
            let def = match dictionary.get(name) {
                Some(def) => def,
                None => {
                    return Err(error!(NameError; &format!(
                        "UNABLE TO REFERENCE \"{}\": UNKNOWN WORD",
                        name
                    )))
                }
            };
            self.memoize(name, def)?;
            result.push(Op::Ref(name.into()));
        } else {
            self.compile_control(word, result)?;
        }
        Ok(())
    }

    /// Compiles a word into a subroutine exactly once. A placeholder
    /// entry keeps mutually recursive words from re-entering.
    fn memoize(&mut self, word: &str, def: &[String]) -> Result<()> {
        if self.funcs.contains_key(word) {
            return Ok(());
        }
        self.funcs.insert(word.to_string(), Vec::new());
        let mut sub = vec![Op::Sub(word.into())];
        self.compile_tokens(word, def, &mut sub)?;
        sub.push(Op::End);
        self.funcs.insert(word.to_string(), sub);
        Ok(())
    }

    fn compile_control(&mut self, word: &str, result: &mut Vec<Op>) -> Result<()> {
        match word {
            "case" => {
                self.cases.push(0);
            }
            "if" | "of" | "?of" => {
                if word == "of" {
                    result.push(Op::Ovr);
                    result.push(Op::Eqi);
                }
                let label = self.labels.jump();
                result.push(Op::Jin(label.as_str().into()));
                self.pending.push(label);
                if word != "if" {
                    match self.cases.last_mut() {
                        Some(count) => *count += 1,
                        None => {
                            return Err(error!(StructuralError; &format!(
                                "\"{}\" OUTSIDE OF CASE",
                                word
                            )))
                        }
                    }
                }
            }
            "else" | "endof" => {
                let label = self.labels.jump();
                result.push(Op::Jmp(label.as_str().into()));
                result.push(Op::Nop(self.close_pending(word)?.into()));
                self.pending.push(label);
            }
            "then" => {
                result.push(Op::Nop(self.close_pending(word)?.into()));
            }
            "endcase" => {
                let count = match self.cases.pop() {
                    Some(count) => count,
                    None => return Err(error!(StructuralError; "\"endcase\" WITHOUT CASE")),
                };
                for _ in 0..count {
                    result.push(Op::Nop(self.close_pending(word)?.into()));
                }
            }
            "begin" => {
                let label = self.labels.jump();
                result.push(Op::Nop(label.as_str().into()));
                self.pending.push(label);
            }
            "do" | "?do" => {
                result.push(Op::Ttr);
                if word == "?do" {
                    result.push(Op::Trf);
                    result.push(Op::Eqi);
                    result.push(Op::Not);
                    let exit = self.labels.jump();
                    result.push(Op::Jin(exit.as_str().into()));
                    self.dos.push(exit);
                }
                let label = self.labels.jump();
                result.push(Op::Nop(label.as_str().into()));
                self.pending.push(label);
            }
            "while" => {
                let label = self.labels.jump();
                result.push(Op::Jin(label.as_str().into()));
                self.whiles.push(label);
            }
            "loop" | "+loop" | "-loop" => {
                result.push(Op::Fr);
                match word {
                    "loop" => result.push(Op::Inc),
                    "+loop" => result.push(Op::Adi),
                    _ => {
                        result.push(Op::Swp);
                        result.push(Op::Sbi);
                    }
                }
                result.push(Op::Rf);
                result.push(Op::Swp);
                result.push(Op::Dup);
                result.push(Op::Tr);
                if word == "-loop" {
                    result.push(Op::Lsi);
                } else {
                    result.push(Op::Gri);
                }
                result.push(Op::Not);
                result.push(Op::Jin(self.close_pending(word)?.into()));
                if let Some(label) = self.leaves.pop() {
                    result.push(Op::Nop(label.as_str().into()));
                }
                if let Some(label) = self.dos.pop() {
                    result.push(Op::Nop(label.as_str().into()));
                }
                result.push(Op::Tfr);
                result.push(Op::Drp);
                result.push(Op::Drp);
            }
            "leave" => {
                let label = self.labels.jump();
                result.push(Op::Jmp(label.as_str().into()));
                self.leaves.push(label);
            }
            "until" => {
                result.push(Op::Jin(self.close_pending(word)?.into()));
                if let Some(label) = self.leaves.pop() {
                    result.push(Op::Nop(label.as_str().into()));
                }
            }
            "again" | "repeat" => {
                result.push(Op::Jmp(self.close_pending(word)?.into()));
                if let Some(label) = self.leaves.pop() {
                    result.push(Op::Nop(label.as_str().into()));
                }
                if word == "repeat" {
                    if let Some(label) = self.whiles.pop() {
                        result.push(Op::Nop(label.as_str().into()));
                    }
                }
            }
            _ => {
                return Err(error!(NameError; &format!("WORD \"{}\" IS UNKNOWN", word)));
            }
        }
        Ok(())
    }

    fn close_pending(&mut self, word: &str) -> Result<String> {
        match self.pending.pop() {
            Some(label) => Ok(label),
            None => Err(error!(StructuralError; &format!(
                "\"{}\" WITHOUT AN OPEN CONTROL STRUCTURE",
                word
            ))),
        }
    }

    fn in_scope(&self, name: &str) -> bool {
        self.scopes
            .iter()
            .any(|scope| scope.iter().any(|n| n == name))
    }

    fn ensure_gdef(&mut self, name: &str) {
        if !self.funcs.contains_key(name) {
            self.funcs
                .insert(name.to_string(), vec![Op::Gdef(name.into())]);
        }
    }
}

/// Rewrites a captured string token into plain tokens. `."` emits
/// character by character when short and through `print` when long,
/// `a"` builds a heap string with `sv:fromS`, `g"` leaves the raw
/// stack form: a zero terminator, the code points reversed, and the
/// length on top.
fn lower_string(word: &str) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    let body = &chars[3..chars.len() - 1];
    let mut tokens = Vec::new();
    match chars[0] {
        '.' => {
            if body.len() > 9 {
                lower_stack_string(body, &mut tokens);
                tokens.push("print".to_string());
            } else {
                for ch in body {
                    tokens.push((*ch as i64).to_string());
                    tokens.push("emit".to_string());
                }
            }
        }
        'a' => {
            lower_stack_string(body, &mut tokens);
            tokens.push("sv:fromS".to_string());
        }
        _ => {
            lower_stack_string(body, &mut tokens);
        }
    }
    tokens
}

fn lower_stack_string(body: &[char], tokens: &mut Vec<String>) {
    tokens.push("0".to_string());
    for ch in body.iter().rev() {
        tokens.push((*ch as i64).to_string());
    }
    tokens.push(body.len().to_string());
}

/// Maps a primitive word straight to its instruction.
fn primitive(word: &str) -> Option<Op> {
    let op = match word {
        "!" => Op::Str,
        "@" => Op::Lv,
        "." => Op::Pri,
        "emit" => Op::Pra,
        "key" => Op::Rdi,
        "=" => Op::Eqi,
        "xor" => Op::Xor,
        "<" => Op::Lsi,
        ">" => Op::Gri,
        "-" => Op::Sbi,
        "+" => Op::Adi,
        "/" => Op::Dvi,
        "*" => Op::Mli,
        "f+" => Op::Adf,
        "f-" => Op::Sbf,
        "f*" => Op::Mlf,
        "f/" => Op::Dvf,
        "f." => Op::Prf,
        "f<" => Op::Lsf,
        "f>" => Op::Grf,
        "not" => Op::Not,
        "and" => Op::And,
        "or" => Op::Or,
        "quit" => Op::Stp,
        "dup" => Op::Dup,
        "2dup" => Op::Tdp,
        "?dup" => Op::Qdp,
        "over" => Op::Ovr,
        "2over" => Op::Tvr,
        "drop" => Op::Drp,
        "swap" => Op::Swp,
        "2swap" => Op::Twp,
        "sys" => Op::Sys,
        "rot" => Op::Rot,
        "exec" => Op::Exc,
        "pick" => Op::Pck,
        "-rot" => Op::Nrt,
        ">r" => Op::Tr,
        "r>" => Op::Fr,
        "r@" => Op::Rf,
        "2>r" => Op::Ttr,
        "2r>" => Op::Tfr,
        "2r@" => Op::Trf,
        "inc" => Op::Inc,
        "dec" => Op::Dec,
        _ => return None,
    };
    Some(op)
}
