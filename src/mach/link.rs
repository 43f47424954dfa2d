use super::Op;
use crate::error;
use crate::lang::Error;
use std::collections::HashMap;
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

/// ## Program loader
///
/// Parses the textual instruction stream into cells. The stream is
/// `;`-separated and shaped `(SUB name ... END)* MAIN ... STP`.
/// Label markers and subroutine heads index into a label table used
/// by the branch instructions. Local names are interned into slot
/// numbers in order of first appearance.

#[derive(Debug)]
pub struct Program {
    cells: Vec<Op>,
    labels: HashMap<Rc<str>, usize>,
    num_locals: usize,
    pos_main: usize,
}

impl Program {
    pub fn parse(code: &str) -> Result<Program> {
        let mut cells: Vec<Op> = Vec::new();
        let mut labels: HashMap<Rc<str>, usize> = HashMap::new();
        let mut locals: Vec<Rc<str>> = Vec::new();
        let mut pos_main: Option<usize> = None;

        let mut intern = |locals: &mut Vec<Rc<str>>, name: &str| -> (Rc<str>, usize) {
            for (slot, known) in locals.iter().enumerate() {
                if known.as_ref() == name {
                    return (Rc::clone(known), slot);
                }
            }
            let name: Rc<str> = name.into();
            locals.push(Rc::clone(&name));
            (name, locals.len() - 1)
        };

        for instr in code.split(';') {
            if instr.is_empty() {
                continue;
            }
            let pos = cells.len();
            let mut tokens = instr.split(' ');
            let head = match tokens.next() {
                Some(head) => head,
                None => continue,
            };
            let arg = tokens.next();

            if let Some(id) = head.strip_prefix('#') {
                let id: Rc<str> = id.into();
                if labels.insert(Rc::clone(&id), pos).is_some() {
                    return Err(error!(SyntaxError; &format!("DUPLICATE LABEL \"#{}\"", id)));
                }
                cells.push(Op::Nop(id));
                continue;
            }

            let op = match head {
                "L" => {
                    let arg = arg.ok_or_else(|| missing_arg(instr))?;
                    match arg.parse() {
                        Ok(n) => Op::L(n),
                        Err(_) => {
                            return Err(
                                error!(SyntaxError; &format!("BAD INTEGER LITERAL \"{}\"", arg)),
                            )
                        }
                    }
                }
                "LF" => {
                    let arg = arg.ok_or_else(|| missing_arg(instr))?;
                    match arg.parse() {
                        Ok(x) => Op::Lf(x),
                        Err(_) => {
                            return Err(
                                error!(SyntaxError; &format!("BAD FLOAT LITERAL \"{}\"", arg)),
                            )
                        }
                    }
                }
                "JMP" => Op::Jmp(label_arg(arg.ok_or_else(|| missing_arg(instr))?)),
                "JIN" => Op::Jin(label_arg(arg.ok_or_else(|| missing_arg(instr))?)),
                "CALL" => Op::Call(arg.ok_or_else(|| missing_arg(instr))?.into()),
                "REF" => Op::Ref(arg.ok_or_else(|| missing_arg(instr))?.into()),
                "SUB" => {
                    let name: Rc<str> = arg.ok_or_else(|| missing_arg(instr))?.into();
                    if labels.insert(Rc::clone(&name), pos).is_some() {
                        return Err(
                            error!(SyntaxError; &format!("DUPLICATE SUBROUTINE \"{}\"", name)),
                        );
                    }
                    Op::Sub(name)
                }
                "GDEF" => Op::Gdef(arg.ok_or_else(|| missing_arg(instr))?.into()),
                "GSET" => Op::Gset(arg.ok_or_else(|| missing_arg(instr))?.into()),
                "GBL" => Op::Gbl(arg.ok_or_else(|| missing_arg(instr))?.into()),
                "LDEF" => {
                    let (name, slot) = intern(&mut locals, arg.ok_or_else(|| missing_arg(instr))?);
                    Op::Ldef(name, slot)
                }
                "LSET" => {
                    let (name, slot) = intern(&mut locals, arg.ok_or_else(|| missing_arg(instr))?);
                    Op::Lset(name, slot)
                }
                "LCL" => {
                    let (name, slot) = intern(&mut locals, arg.ok_or_else(|| missing_arg(instr))?);
                    Op::Lcl(name, slot)
                }
                "MAIN" => {
                    pos_main = Some(pos);
                    Op::Main
                }
                "END" => Op::End,
                "EXC" => Op::Exc,
                "STP" => Op::Stp,
                "LCTX" => Op::Lctx,
                "LCLR" => Op::Lclr,
                "STR" => Op::Str,
                "LV" => Op::Lv,
                "SYS" => Op::Sys,
                "PRI" => Op::Pri,
                "PRA" => Op::Pra,
                "PRF" => Op::Prf,
                "RDI" => Op::Rdi,
                "DUP" => Op::Dup,
                "TDP" => Op::Tdp,
                "QDP" => Op::Qdp,
                "OVR" => Op::Ovr,
                "TVR" => Op::Tvr,
                "DRP" => Op::Drp,
                "SWP" => Op::Swp,
                "TWP" => Op::Twp,
                "ROT" => Op::Rot,
                "NRT" => Op::Nrt,
                "PCK" => Op::Pck,
                "TR" => Op::Tr,
                "FR" => Op::Fr,
                "RF" => Op::Rf,
                "TTR" => Op::Ttr,
                "TFR" => Op::Tfr,
                "TRF" => Op::Trf,
                "ADI" => Op::Adi,
                "SBI" => Op::Sbi,
                "MLI" => Op::Mli,
                "DVI" => Op::Dvi,
                "INC" => Op::Inc,
                "DEC" => Op::Dec,
                "ADF" => Op::Adf,
                "SBF" => Op::Sbf,
                "MLF" => Op::Mlf,
                "DVF" => Op::Dvf,
                "EQI" => Op::Eqi,
                "LSI" => Op::Lsi,
                "GRI" => Op::Gri,
                "LSF" => Op::Lsf,
                "GRF" => Op::Grf,
                "NOT" => Op::Not,
                "AND" => Op::And,
                "OR" => Op::Or,
                "XOR" => Op::Xor,
                _ => {
                    return Err(error!(SyntaxError; &format!("UNKNOWN INSTRUCTION \"{}\"", instr)))
                }
            };
            cells.push(op);
        }

        let pos_main = match pos_main {
            Some(pos) => pos,
            None => return Err(error!(StructuralError; "PROGRAM HAS NO ENTRY POINT")),
        };

        Ok(Program {
            cells,
            labels,
            num_locals: locals.len(),
            pos_main,
        })
    }

    pub fn cell(&self, pos: usize) -> Option<&Op> {
        self.cells.get(pos)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    pub fn num_locals(&self) -> usize {
        self.num_locals
    }

    pub fn pos_main(&self) -> usize {
        self.pos_main
    }
}

/// Branch arguments reference markers as `#id`. The prefix is not
/// part of the label table key.
fn label_arg(arg: &str) -> Rc<str> {
    arg.strip_prefix('#').unwrap_or(arg).into()
}

fn missing_arg(instr: &str) -> Error {
    error!(SyntaxError; &format!("INSTRUCTION \"{}\" NEEDS AN ARGUMENT", instr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_program() {
        let program = Program::parse("MAIN;L 2;L 3;ADI;PRI;L 0;STP;").unwrap();
        assert_eq!(program.pos_main(), 0);
        assert_eq!(program.len(), 7);
        assert_eq!(program.cell(3), Some(&Op::Adi));
    }

    #[test]
    fn test_subroutines_and_labels_are_indexed() {
        let program =
            Program::parse("SUB add2;L 2;ADI;END;MAIN;#0 NOP;L 1;CALL add2;JMP #0;L 0;STP;")
                .unwrap();
        assert_eq!(program.label("add2"), Some(0));
        assert_eq!(program.label("0"), Some(5));
        assert_eq!(program.pos_main(), 4);
    }

    #[test]
    fn test_locals_share_slots_by_name() {
        let program = Program::parse("MAIN;LCTX;LDEF a;LDEF b;LCL a;LSET b;LCLR;L 0;STP;").unwrap();
        assert_eq!(program.num_locals(), 2);
        assert_eq!(program.cell(2), Some(&Op::Ldef("a".into(), 0)));
        assert_eq!(program.cell(5), Some(&Op::Lset("b".into(), 1)));
    }

    #[test]
    fn test_duplicate_label_is_rejected() {
        let result = Program::parse("MAIN;#1 NOP;#1 NOP;L 0;STP;");
        assert_eq!(result.unwrap_err().code(), 1);
    }

    #[test]
    fn test_unknown_instruction_is_rejected() {
        let result = Program::parse("MAIN;BOGUS;L 0;STP;");
        assert_eq!(result.unwrap_err().code(), 1);
    }

    #[test]
    fn test_missing_entry_point_is_rejected() {
        let result = Program::parse("L 0;STP;");
        assert_eq!(result.unwrap_err().code(), 3);
    }
}
