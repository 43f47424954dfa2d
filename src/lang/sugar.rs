//! Class definitions desugar into ordinary word definitions. The
//! generated source is fed back through the lexer, so every accessor
//! ends up in the dictionary like any hand-written word.

use super::{Dictionary, Error};
use crate::error;
use std::fmt::Write;

type Result<T> = std::result::Result<T, Error>;

/// Expands `: class name [extends base] (size field)+ ;` into word
/// definitions: one offset accessor per field plus `name:init`,
/// `name:sizeof`, `name:allot`, `name:new` and `name:[]`.
pub fn class_source(dictionary: &Dictionary, def: &[String]) -> Result<String> {
    if def.len() < 3 {
        return Err(error!(StructuralError; "A CLASS MUST HAVE AT LEAST ONE PROPERTY"));
    }

    let clazz = def[0].as_str();

    if def[1] == "extends" {
        let base = def[2].as_str();
        if dictionary.get(&format!("{}:sizeof", base)).is_none() {
            return Err(error!(NameError; &format!("NO BASE CLASS \"{}\" FOUND", base)));
        }
        let mut source = extended_source(dictionary, clazz, base);
        if def.len() > 3 {
            source.push_str(&member_source(dictionary, clazz, base, &def[3..])?);
        }
        return Ok(source);
    }

    member_source(dictionary, clazz, "", &def[1..])
}

/// Re-exports every `base:*` word under the derived class name.
fn extended_source(dictionary: &Dictionary, clazz: &str, base: &str) -> String {
    let prefix = format!("{}:", base);
    let mut source = String::new();
    for name in dictionary.names() {
        if let Some(after) = name.strip_prefix(&prefix) {
            let _ = writeln!(source, ": {}:{} {} ;", clazz, after, name);
        }
    }
    source
}

fn member_source(
    dictionary: &Dictionary,
    clazz: &str,
    base: &str,
    values: &[String],
) -> Result<String> {
    if values.len() % 2 != 0 {
        return Err(
            error!(StructuralError; &format!("CLASS \"{}\" HAS A PROPERTY WITHOUT A SIZE", clazz)),
        );
    }

    let mut offset: i64 = 0;
    if !base.is_empty() {
        if let Some(tokens) = dictionary.get(&format!("{}:sizeof", base)) {
            offset = match tokens[0].parse() {
                Ok(size) => size,
                Err(_) => {
                    return Err(error!(SyntaxError; &format!("BAD SIZEOF IN BASE \"{}\"", base)))
                }
            };
        }
    }

    let mut source = String::new();
    let mut names = Vec::new();
    let mut sizes = Vec::new();

    for pair in values.chunks(2) {
        let name = pair[1].as_str();
        let size: i64 = match pair[0].parse() {
            Ok(size) => size,
            Err(_) => {
                return Err(
                    error!(SyntaxError; &format!("BAD SIZE \"{}\" AT MEMBER \"{}\"", pair[0], name)),
                )
            }
        };
        if size < 1 {
            return Err(error!(StructuralError; &format!(
                "MEMBER SIZE MUST BE GREATER THAN 0; SIZE WAS {} AT MEMBER \"{}\"",
                size, name
            )));
        }
        names.push(name);
        sizes.push(size);

        if offset == 0 {
            let _ = writeln!(source, ": {}:{} ;", clazz, name);
        } else if offset == 1 {
            let _ = writeln!(source, ": {}:{} 1+ ;", clazz, name);
        } else {
            let _ = writeln!(source, ": {}:{} {} + ;", clazz, name, offset);
        }
        offset += size;
    }

    let _ = write!(source, ": {}:init", clazz);
    for (name, size) in names.iter().zip(&sizes) {
        if *size > 1 {
            let _ = write!(source, " dup {} 0 rot {}:{} memset", size, clazz, name);
        } else {
            let _ = write!(source, " dup 0 swap {}:{} !", clazz, name);
        }
    }
    if !base.is_empty() {
        let _ = write!(source, " {}:init", base);
    }
    source.push_str(" ;\n");

    let _ = writeln!(source, ": {}:sizeof {} ;", clazz, offset);
    let _ = writeln!(source, ": {}:allot {}:sizeof * allot ;", clazz, clazz);
    let _ = writeln!(source, ": {}:new 1 {}:allot {}:init ;", clazz, clazz, clazz);
    let _ = writeln!(source, ": {}:[] swap {}:sizeof * + ;", clazz, clazz);
    Ok(source)
}
