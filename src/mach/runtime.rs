use super::{cell_to_f64, f64_to_cell, Cell, Op, Program, Stack};
use crate::error;
use crate::lang::Error;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::io::{Read, Write};
use std::path::Path;
use std::process::Command;

type Result<T> = std::result::Result<T, Error>;

/// Local frames the machine may nest before it faults.
const MAX_FRAMES: usize = 100;

pub type Sysfunc = Box<dyn FnMut(&mut Runtime, Cell) -> Result<()>>;

#[derive(Clone, Copy, Default)]
struct Local {
    active: bool,
    data: Cell,
}

enum Flow {
    Next,
    Goto(usize),
    Halt,
}

/// ## Virtual machine
///
/// Executes a loaded `Program` cell by cell, starting right after the
/// entry marker. The data stack survives across runs so an
/// interactive session can leave values for the next line; the
/// return stack and local frames are reset by `prepare`.
///
/// Host access goes through `SYS`. Calls 0 through 17 are built in;
/// anything above that is handed to the optional `sysfunc` hook.

pub struct Runtime {
    globals: HashMap<String, Cell>,
    mem: Vec<Cell>,
    stack: Stack<Cell>,
    rstack: Stack<Cell>,
    lstack: Vec<Local>,
    ln: isize,
    num_locals: usize,
    out: Box<dyn Write>,
    sysfunc: Option<Sysfunc>,
    args: Vec<String>,
    trace: bool,
    exit_status: Cell,
    program: Option<Program>,
    pc: usize,
}

impl Default for Runtime {
    fn default() -> Runtime {
        Runtime::new()
    }
}

impl Runtime {
    pub fn new() -> Runtime {
        Runtime {
            globals: HashMap::new(),
            mem: Vec::new(),
            stack: Stack::new("STACK"),
            rstack: Stack::new("RETURN STACK"),
            lstack: Vec::new(),
            ln: -1,
            num_locals: 0,
            out: Box::new(std::io::stdout()),
            sysfunc: None,
            args: Vec::new(),
            trace: false,
            exit_status: 0,
            program: None,
            pc: 0,
        }
    }

    pub fn set_output(&mut self, out: Box<dyn Write>) {
        self.out = out;
    }

    pub fn set_sysfunc(&mut self, sysfunc: Sysfunc) {
        self.sysfunc = Some(sysfunc);
    }

    pub fn set_args(&mut self, args: Vec<String>) {
        self.args = args;
    }

    pub fn trace(&self) -> bool {
        self.trace
    }

    pub fn exit_status(&self) -> Cell {
        self.exit_status
    }

    pub fn push(&mut self, value: Cell) -> Result<()> {
        self.stack.push(value)
    }

    pub fn pop(&mut self) -> Result<Cell> {
        self.stack.pop()
    }

    pub fn fpush(&mut self, value: f64) -> Result<()> {
        self.push(f64_to_cell(value))
    }

    pub fn fpop(&mut self) -> Result<f64> {
        Ok(cell_to_f64(self.pop()?))
    }

    /// Parses and runs a program to completion, returning its exit
    /// status.
    pub fn run(&mut self, code: &str) -> Result<Cell> {
        self.prepare(code)?;
        loop {
            if self.step()? {
                return Ok(self.exit_status);
            }
        }
    }

    /// Loads a program and points the machine at its entry. Must be
    /// called before `step`.
    pub fn prepare(&mut self, code: &str) -> Result<()> {
        let program = Program::parse(code)?;
        self.num_locals = program.num_locals();
        self.lstack = vec![Local::default(); self.num_locals * MAX_FRAMES];
        self.ln = -1;
        self.rstack.clear();
        self.pc = program.pos_main() + 1;
        self.program = Some(program);
        Ok(())
    }

    /// Executes one instruction. Returns true once the program has
    /// halted.
    pub fn step(&mut self) -> Result<bool> {
        let program = match self.program.take() {
            Some(program) => program,
            None => return Err(error!(RuntimeFault; "NO PROGRAM IS LOADED")),
        };
        let result = self.step_in(&program);
        self.program = Some(program);
        result
    }

    fn step_in(&mut self, program: &Program) -> Result<bool> {
        let op = match program.cell(self.pc) {
            Some(op) => op.clone(),
            None => return Err(error!(RuntimeFault; "PROGRAM RAN PAST ITS END")),
        };
        match self.exec(program, &op)? {
            Flow::Next => {
                self.pc += 1;
                Ok(false)
            }
            Flow::Goto(pos) => {
                self.pc = pos;
                Ok(false)
            }
            Flow::Halt => Ok(true),
        }
    }

    fn exec(&mut self, program: &Program, op: &Op) -> Result<Flow> {
        use Op::*;
        match op {
            Nop(_) | Sub(_) | Main => {}
            L(n) => self.push(*n)?,
            Lf(x) => self.fpush(*x)?,

            Jmp(label) => return Ok(Flow::Goto(self.target(program, label)?)),
            Jin(label) => {
                if self.pop()? == 0 {
                    return Ok(Flow::Goto(self.target(program, label)?));
                }
            }
            Call(name) => {
                self.rstack.push(self.pc as Cell)?;
                return Ok(Flow::Goto(self.target(program, name)? + 1));
            }
            End => {
                let pos = self.return_address()?;
                return Ok(Flow::Goto(pos + 1));
            }
            Ref(name) => {
                let pos = self.target(program, name)?;
                self.push(pos as Cell)?;
            }
            Exc => {
                let pos = self.pop()?;
                self.rstack.push(self.pc as Cell)?;
                let pos = usize::try_from(pos)
                    .map_err(|_| error!(RuntimeFault; "BAD EXEC ADDRESS"))?;
                return Ok(Flow::Goto(pos + 1));
            }
            Stp => {
                self.exit_status = self.pop()?;
                return Ok(Flow::Halt);
            }

            Gdef(name) => {
                self.globals.insert(name.to_string(), 0);
            }
            Gset(name) => {
                let value = self.pop()?;
                self.globals.insert(name.to_string(), value);
            }
            Gbl(name) => {
                let value = *self.globals.get(name.as_ref()).unwrap_or(&0);
                self.push(value)?;
            }

            Lctx => {
                self.ln += 1;
                if self.ln as usize >= MAX_FRAMES {
                    return Err(error!(RuntimeFault; "LOCAL FRAMES EXHAUSTED"));
                }
                let base = self.ln as usize * self.num_locals;
                for local in &mut self.lstack[base..base + self.num_locals] {
                    local.active = false;
                }
            }
            Ldef(name, slot) => self.local_define(name, *slot)?,
            Lset(name, slot) => self.local_assign(name, *slot)?,
            Lcl(name, slot) => self.local_fetch(name, *slot)?,
            Lclr => {
                if self.ln < 0 {
                    return Err(error!(RuntimeFault; "NO LOCAL FRAME IS OPEN"));
                }
                self.ln -= 1;
            }

            Str => {
                let (value, addr) = self.stack.pop_2()?;
                self.store(addr, value)?;
            }
            Lv => {
                let addr = self.pop()?;
                let value = self.load(addr)?;
                self.push(value)?;
            }
            Sys => return self.sys().map(|_| Flow::Next),

            Pri => {
                let value = self.pop()?;
                write!(self.out, "{}", value).map_err(host)?;
            }
            Pra => {
                let value = self.pop()?;
                let ch = char::from_u32(value as u32).unwrap_or(char::REPLACEMENT_CHARACTER);
                write!(self.out, "{}", ch).map_err(host)?;
            }
            Prf => {
                let value = self.fpop()?;
                write!(self.out, "{:.6}", value).map_err(host)?;
            }
            Rdi => {
                let mut line = String::new();
                std::io::stdin().read_line(&mut line).map_err(host)?;
                let value = line.trim().parse().unwrap_or(0);
                self.push(value)?;
            }

            Dup => {
                let value = *self.stack.last()?;
                self.push(value)?;
            }
            Tdp => {
                let (a, b) = self.stack.pop_2()?;
                self.push(a)?;
                self.push(b)?;
                self.push(a)?;
                self.push(b)?;
            }
            Qdp => {
                let value = *self.stack.last()?;
                if value != 0 {
                    self.push(value)?;
                }
            }
            Ovr => {
                let (a, b) = self.stack.pop_2()?;
                self.push(a)?;
                self.push(b)?;
                self.push(a)?;
            }
            Tvr => {
                let (c, d) = self.stack.pop_2()?;
                let (a, b) = self.stack.pop_2()?;
                self.push(a)?;
                self.push(b)?;
                self.push(c)?;
                self.push(d)?;
                self.push(a)?;
                self.push(b)?;
            }
            Drp => {
                self.pop()?;
            }
            Swp => {
                let (a, b) = self.stack.pop_2()?;
                self.push(b)?;
                self.push(a)?;
            }
            Twp => {
                let (c, d) = self.stack.pop_2()?;
                let (a, b) = self.stack.pop_2()?;
                self.push(c)?;
                self.push(d)?;
                self.push(a)?;
                self.push(b)?;
            }
            Rot => {
                let c = self.pop()?;
                let (a, b) = self.stack.pop_2()?;
                self.push(b)?;
                self.push(c)?;
                self.push(a)?;
            }
            Nrt => {
                let c = self.pop()?;
                let (a, b) = self.stack.pop_2()?;
                self.push(c)?;
                self.push(a)?;
                self.push(b)?;
            }
            Pck => {
                let idx = self.pop()?;
                let value = usize::try_from(idx)
                    .ok()
                    .and_then(|idx| self.stack.len().checked_sub(idx + 1))
                    .and_then(|pos| self.stack.get(pos))
                    .copied();
                match value {
                    Some(value) => self.push(value)?,
                    None => return Err(error!(RuntimeFault; "PICK OUT OF RANGE")),
                }
            }

            Tr => {
                let value = self.pop()?;
                self.rstack.push(value)?;
            }
            Fr => {
                let value = self.rstack.pop()?;
                self.push(value)?;
            }
            Rf => {
                let value = *self.rstack.last()?;
                self.push(value)?;
            }
            Ttr => {
                let (a, b) = self.stack.pop_2()?;
                self.rstack.push(a)?;
                self.rstack.push(b)?;
            }
            Tfr => {
                let (a, b) = self.rstack.pop_2()?;
                self.push(a)?;
                self.push(b)?;
            }
            Trf => {
                let (a, b) = self.rstack.pop_2()?;
                self.rstack.push(a)?;
                self.rstack.push(b)?;
                self.push(a)?;
                self.push(b)?;
            }

            Adi => {
                let (a, b) = self.stack.pop_2()?;
                self.push(a.wrapping_add(b))?;
            }
            Sbi => {
                let (a, b) = self.stack.pop_2()?;
                self.push(a.wrapping_sub(b))?;
            }
            Mli => {
                let (a, b) = self.stack.pop_2()?;
                self.push(a.wrapping_mul(b))?;
            }
            Dvi => {
                let (a, b) = self.stack.pop_2()?;
                if b == 0 {
                    return Err(error!(RuntimeFault; "DIVISION BY ZERO"));
                }
                self.push(a.wrapping_div(b))?;
            }
            Inc => {
                let value = self.pop()?;
                self.push(value.wrapping_add(1))?;
            }
            Dec => {
                let value = self.pop()?;
                self.push(value.wrapping_sub(1))?;
            }

            Adf => {
                let a = self.fpop()?;
                let b = self.fpop()?;
                self.fpush(b + a)?;
            }
            Sbf => {
                let a = self.fpop()?;
                let b = self.fpop()?;
                self.fpush(b - a)?;
            }
            Mlf => {
                let a = self.fpop()?;
                let b = self.fpop()?;
                self.fpush(b * a)?;
            }
            Dvf => {
                let a = self.fpop()?;
                let b = self.fpop()?;
                self.fpush(b / a)?;
            }

            Eqi => {
                let (a, b) = self.stack.pop_2()?;
                self.push((a == b) as Cell)?;
            }
            Lsi => {
                let (a, b) = self.stack.pop_2()?;
                self.push((a < b) as Cell)?;
            }
            Gri => {
                let (a, b) = self.stack.pop_2()?;
                self.push((a > b) as Cell)?;
            }
            Lsf => {
                let a = self.fpop()?;
                let b = self.fpop()?;
                self.push((b < a) as Cell)?;
            }
            Grf => {
                let a = self.fpop()?;
                let b = self.fpop()?;
                self.push((b > a) as Cell)?;
            }
            Not => {
                let value = self.pop()?;
                self.push((value == 0) as Cell)?;
            }
            And => {
                let (a, b) = self.stack.pop_2()?;
                self.push((a != 0 && b != 0) as Cell)?;
            }
            Or => {
                let (a, b) = self.stack.pop_2()?;
                self.push((a != 0 || b != 0) as Cell)?;
            }
            Xor => {
                let (a, b) = self.stack.pop_2()?;
                self.push(a ^ b)?;
            }
        }
        Ok(Flow::Next)
    }

    fn target(&self, program: &Program, name: &str) -> Result<usize> {
        program
            .label(name)
            .ok_or_else(|| error!(RuntimeFault; &format!("UNDEFINED LABEL \"{}\"", name)))
    }

    fn return_address(&mut self) -> Result<usize> {
        let pos = self.rstack.pop()?;
        usize::try_from(pos).map_err(|_| error!(RuntimeFault; "BAD RETURN ADDRESS"))
    }

    fn load(&self, addr: Cell) -> Result<Cell> {
        usize::try_from(addr)
            .ok()
            .and_then(|addr| self.mem.get(addr))
            .copied()
            .ok_or_else(|| error!(RuntimeFault; &format!("MEMORY ACCESS AT {} OUT OF BOUNDS", addr)))
    }

    fn store(&mut self, addr: Cell, value: Cell) -> Result<()> {
        match usize::try_from(addr).ok().and_then(|addr| self.mem.get_mut(addr)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(error!(RuntimeFault; &format!("MEMORY ACCESS AT {} OUT OF BOUNDS", addr))),
        }
    }

    fn local_define(&mut self, name: &str, slot: usize) -> Result<()> {
        let value = self.pop()?;
        if self.ln < 0 {
            return Err(error!(RuntimeFault; "NO LOCAL FRAME IS OPEN"));
        }
        let index = self.ln as usize * self.num_locals + slot;
        match self.lstack.get_mut(index) {
            Some(local) => {
                local.data = value;
                local.active = true;
                Ok(())
            }
            None => Err(error!(RuntimeFault; &format!("LOCAL \"{}\" HAS NO SLOT", name))),
        }
    }

    fn local_assign(&mut self, name: &str, slot: usize) -> Result<()> {
        let value = self.pop()?;
        let mut level = self.ln;
        while level >= 0 {
            let index = level as usize * self.num_locals + slot;
            if let Some(local) = self.lstack.get_mut(index) {
                if local.active {
                    local.data = value;
                    return Ok(());
                }
            }
            level -= 1;
        }
        Err(error!(RuntimeFault; &format!("LOCAL \"{}\" IS NOT BOUND", name)))
    }

    fn local_fetch(&mut self, name: &str, slot: usize) -> Result<()> {
        let mut level = self.ln;
        while level >= 0 {
            let index = level as usize * self.num_locals + slot;
            let local = self.lstack.get(index).copied();
            if let Some(local) = local {
                if local.active {
                    return self.push(local.data);
                }
            }
            level -= 1;
        }
        Err(error!(RuntimeFault; &format!("LOCAL \"{}\" IS NOT BOUND", name)))
    }

    /// Reads a heap string: the cell at the popped address is the
    /// length, the next cell points at the character data.
    fn get_string(&mut self) -> Result<String> {
        let addr = self.pop()?;
        let length = self.load(addr)?;
        let data = self.load(addr.wrapping_add(1))?;
        let mut bytes = Vec::new();
        for i in 0..length {
            bytes.push(self.load(data.wrapping_add(i))? as u8);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Pushes a string in stack form: zero terminator, bytes in
    /// reverse, length on top.
    fn string_to_stack(&mut self, bytes: &[u8]) -> Result<()> {
        self.push(0)?;
        for byte in bytes.iter().rev() {
            self.push(*byte as Cell)?;
        }
        self.push(bytes.len() as Cell)
    }

    fn sys(&mut self) -> Result<()> {
        let call = self.pop()?;
        match call {
            0 => {
                let depth = self.stack.len() as Cell;
                self.push(depth)?;
            }
            1 => {
                let (n, m) = self.stack.pop_2()?;
                if m == 0 {
                    return Err(error!(RuntimeFault; "DIVISION BY ZERO"));
                }
                self.push(n.wrapping_rem(m))?;
            }
            2 => {
                let value = self.fpop()?;
                self.fpush(value.sqrt())?;
            }
            3 => {
                let value = self.pop()?;
                self.fpush(value as f64)?;
            }
            4 => {
                let value = self.fpop()?;
                self.push(value as Cell)?;
            }
            5 => {
                let name = self.get_string()?;
                let content = std::fs::read(&name).map_err(host)?;
                self.string_to_stack(&content)?;
            }
            6 => {
                let name = self.get_string()?;
                let content = std::fs::read(&name).map_err(host)?;
                self.mem = content
                    .chunks_exact(8)
                    .map(|chunk| {
                        let mut raw = [0u8; 8];
                        raw.copy_from_slice(chunk);
                        Cell::from_le_bytes(raw)
                    })
                    .collect();
            }
            7 => {
                let name = self.get_string()?;
                let mut bytes = Vec::with_capacity(self.mem.len() * 8);
                for cell in &self.mem {
                    bytes.extend_from_slice(&cell.to_le_bytes());
                }
                std::fs::write(&name, bytes).map_err(host)?;
            }
            8 => {
                let nbytes = self.pop()?;
                let nbytes = usize::try_from(nbytes).unwrap_or(0);
                let mut buf = vec![0u8; nbytes];
                match std::io::stdin().read(&mut buf) {
                    Ok(n) => self.string_to_stack(&buf[..n])?,
                    Err(_) => self.string_to_stack(b"")?,
                }
            }
            9 => {
                self.trace = self.pop()? != 0;
            }
            10 => {
                let size = self.pop()?;
                let size = usize::try_from(size)
                    .map_err(|_| error!(RuntimeFault; "NEGATIVE MEMORY SIZE"))?;
                self.mem.resize(size, 0);
            }
            11 => {
                let size = self.mem.len() as Cell;
                self.push(size)?;
            }
            12 => {
                let one = self.get_string()?;
                let two = self.get_string()?;
                self.push((one == two) as Cell)?;
            }
            13 => {
                let command = self.get_string()?;
                Command::new("sh")
                    .arg("-c")
                    .arg(command)
                    .status()
                    .map_err(host)?;
            }
            14 => {
                let command = self.get_string()?;
                Command::new(command).status().map_err(host)?;
            }
            15 => {
                let name = self.get_string()?;
                self.push(Path::new(&name).is_file() as Cell)?;
            }
            16 => {
                let argc = self.args.len() as Cell;
                self.push(argc)?;
            }
            17 => {
                let index = self.pop()?;
                let arg = usize::try_from(index)
                    .ok()
                    .and_then(|index| self.args.get(index))
                    .cloned();
                match arg {
                    Some(arg) => self.string_to_stack(arg.as_bytes())?,
                    None => return Err(error!(RuntimeFault; "ARGV INDEX OUT OF RANGE")),
                }
            }
            _ => {
                let mut sysfunc = match self.sysfunc.take() {
                    Some(sysfunc) => sysfunc,
                    None => {
                        return Err(
                            error!(HostError; &format!("UNKNOWN SYS CALL \"{}\"", call)),
                        )
                    }
                };
                let result = sysfunc(self, call);
                self.sysfunc = Some(sysfunc);
                result?;
            }
        }
        Ok(())
    }
}

fn host(error: std::io::Error) -> Error {
    error!(HostError; &error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture() -> (Runtime, Rc<RefCell<Vec<u8>>>) {
        let buf = Rc::new(RefCell::new(Vec::new()));
        let mut runtime = Runtime::new();
        runtime.set_output(Box::new(SharedBuf(Rc::clone(&buf))));
        (runtime, buf)
    }

    fn output(buf: &Rc<RefCell<Vec<u8>>>) -> String {
        String::from_utf8(buf.borrow().clone()).unwrap()
    }

    #[test]
    fn test_arithmetic_and_print() {
        let (mut runtime, buf) = capture();
        let status = runtime.run("MAIN;L 2;L 3;ADI;PRI;L 0;STP;").unwrap();
        assert_eq!(status, 0);
        assert_eq!(output(&buf), "5");
    }

    #[test]
    fn test_subtraction_order() {
        let (mut runtime, buf) = capture();
        runtime.run("MAIN;L 10;L 3;SBI;PRI;L 0;STP;").unwrap();
        assert_eq!(output(&buf), "7");
    }

    #[test]
    fn test_call_and_return() {
        let (mut runtime, buf) = capture();
        runtime
            .run("SUB add2;L 2;ADI;END;MAIN;L 1;CALL add2;CALL add2;PRI;L 0;STP;")
            .unwrap();
        assert_eq!(output(&buf), "5");
    }

    #[test]
    fn test_counted_loop() {
        let (mut runtime, buf) = capture();
        runtime
            .run(concat!(
                "MAIN;L 5;L 0;TTR;#0 NOP;RF;PRI;",
                "FR;INC;RF;SWP;DUP;TR;GRI;NOT;JIN #0;",
                "TFR;DRP;DRP;L 0;STP;"
            ))
            .unwrap();
        assert_eq!(output(&buf), "01234");
    }

    #[test]
    fn test_locals_shadowing() {
        let (mut runtime, buf) = capture();
        runtime
            .run(concat!(
                "MAIN;L 1;L 2;",
                "LCTX;LDEF b;LDEF a;",
                "LCTX;L 9;LDEF a;LCL a;PRI;LCLR;",
                "LCL a;PRI;LCL b;PRI;LCLR;L 0;STP;"
            ))
            .unwrap();
        assert_eq!(output(&buf), "912");
    }

    #[test]
    fn test_ref_and_exec() {
        let (mut runtime, buf) = capture();
        runtime
            .run("SUB b0;L 7;PRI;END;MAIN;REF b0;EXC;L 0;STP;")
            .unwrap();
        assert_eq!(output(&buf), "7");
    }

    #[test]
    fn test_globals_default_to_zero() {
        let (mut runtime, buf) = capture();
        runtime
            .run("MAIN;GBL tally;PRI;L 8;GSET tally;GBL tally;PRI;L 0;STP;")
            .unwrap();
        assert_eq!(output(&buf), "08");
    }

    #[test]
    fn test_memory_store_and_load() {
        let (mut runtime, buf) = capture();
        runtime
            .run("MAIN;L 4;L 10;SYS;L 42;L 2;STR;L 2;LV;PRI;L 0;STP;")
            .unwrap();
        assert_eq!(output(&buf), "42");
    }

    #[test]
    fn test_float_bits_survive_the_stack() {
        let (mut runtime, buf) = capture();
        runtime
            .run("MAIN;LF 1.5;LF 0.25;ADF;PRF;L 0;STP;")
            .unwrap();
        assert_eq!(output(&buf), "1.750000");
    }

    #[test]
    fn test_exit_status() {
        let (mut runtime, _) = capture();
        let status = runtime.run("MAIN;L 3;STP;").unwrap();
        assert_eq!(status, 3);
    }

    #[test]
    fn test_underflow_is_a_fault_not_a_crash() {
        let (mut runtime, _) = capture();
        let error = runtime.run("MAIN;ADI;L 0;STP;").unwrap_err();
        assert_eq!(error.code(), 4);
    }

    #[test]
    fn test_division_by_zero_is_a_fault() {
        let (mut runtime, _) = capture();
        let error = runtime.run("MAIN;L 1;L 0;DVI;L 0;STP;").unwrap_err();
        assert_eq!(error.code(), 4);
    }

    #[test]
    fn test_undefined_label_is_a_fault() {
        let (mut runtime, _) = capture();
        let error = runtime.run("MAIN;JMP #9;L 0;STP;").unwrap_err();
        assert_eq!(error.code(), 4);
    }

    #[test]
    fn test_stack_survives_across_runs() {
        let (mut runtime, buf) = capture();
        runtime.run("MAIN;L 6;L 7;MLI;L 0;STP;").unwrap();
        runtime.run("MAIN;PRI;L 0;STP;").unwrap();
        assert_eq!(output(&buf), "42");
    }

    #[test]
    fn test_step_mode() {
        let (mut runtime, buf) = capture();
        runtime.prepare("MAIN;L 1;PRI;L 0;STP;").unwrap();
        let mut steps = 0;
        while !runtime.step().unwrap() {
            steps += 1;
        }
        assert_eq!(steps, 3);
        assert_eq!(output(&buf), "1");
    }

    #[test]
    fn test_sysfunc_escape_hatch() {
        let (mut runtime, buf) = capture();
        runtime.set_sysfunc(Box::new(|runtime, call| {
            runtime.push(call * 2)?;
            Ok(())
        }));
        runtime.run("MAIN;L 50;SYS;PRI;L 0;STP;").unwrap();
        assert_eq!(output(&buf), "100");
    }

    #[test]
    fn test_unknown_sys_call_without_hook() {
        let (mut runtime, _) = capture();
        let error = runtime.run("MAIN;L 99;SYS;L 0;STP;").unwrap_err();
        assert_eq!(error.code(), 5);
    }

    #[test]
    fn test_string_compare_through_memory() {
        let (mut runtime, buf) = capture();
        // Build "ab" at address 2: length, data pointer, bytes.
        runtime
            .run(concat!(
                "MAIN;L 8;L 10;SYS;",
                "L 2;L 2;STR;L 4;L 3;STR;",
                "L 97;L 4;STR;L 98;L 5;STR;",
                "L 2;L 2;L 12;SYS;PRI;L 0;STP;"
            ))
            .unwrap();
        assert_eq!(output(&buf), "1");
    }
}
