use std::rc::Rc;

/// ## Virtual machine instruction set
///
/// The machine has two stacks and no registers; every operation works
/// on the data stack, with the return stack reserved for call frames
/// and loop counters.
///
/// For example: `2 3 + .` compiles to `[L(2), L(3), Adi, Pri]`.
///
/// The textual form of an instruction is its mnemonic followed by an
/// optional argument, for example `L 2` or `CALL fib`. Label markers
/// render as `#3 NOP` and are jump targets for `JMP #3` and `JIN #3`.

#[derive(Clone, PartialEq)]
pub enum Op {
    // *** Literals
    /// Push an integer literal.
    L(i64),
    /// Push a float literal, stored bit for bit in one cell.
    Lf(f64),

    // *** Branch control
    /// Label marker. Executes as a no-op.
    Nop(Rc<str>),
    /// Unconditional branch to a label.
    Jmp(Rc<str>),
    /// Pop; branch to the label if zero.
    Jin(Rc<str>),
    /// Push the return address, branch to a subroutine label.
    Call(Rc<str>),
    /// Head of a memoized subroutine. Executes as a no-op.
    Sub(Rc<str>),
    /// Pop the return stack and branch back.
    End,
    /// Push a subroutine address for later `Exc`.
    Ref(Rc<str>),
    /// Pop an address off the data stack and call it.
    Exc,
    /// Marks the program entry. Execution starts after this cell.
    Main,
    /// Pop the exit status and halt.
    Stp,

    // *** Globals
    Gdef(Rc<str>),
    Gset(Rc<str>),
    Gbl(Rc<str>),

    // *** Locals
    /// Open a local frame.
    Lctx,
    /// Pop into a local slot of the current frame.
    Ldef(Rc<str>, usize),
    /// Pop into the nearest active binding of the slot.
    Lset(Rc<str>, usize),
    /// Push the nearest active binding of the slot.
    Lcl(Rc<str>, usize),
    /// Close the current local frame.
    Lclr,

    // *** Memory
    /// Store: pop address, pop value, write.
    Str,
    /// Load: pop address, push the cell at it.
    Lv,
    /// Host call. Pops the call number, then its operands.
    Sys,

    // *** Input/output
    Pri,
    Pra,
    Prf,
    Rdi,

    // *** Data stack
    Dup,
    Tdp,
    Qdp,
    Ovr,
    Tvr,
    Drp,
    Swp,
    Twp,
    Rot,
    Nrt,
    Pck,

    // *** Return stack
    Tr,
    Fr,
    Rf,
    Ttr,
    Tfr,
    Trf,

    // *** Integer arithmetic
    Adi,
    Sbi,
    Mli,
    Dvi,
    Inc,
    Dec,

    // *** Float arithmetic
    Adf,
    Sbf,
    Mlf,
    Dvf,

    // *** Comparison and logic
    Eqi,
    Lsi,
    Gri,
    Lsf,
    Grf,
    Not,
    And,
    Or,
    Xor,
}

impl std::fmt::Debug for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string())
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Op::*;
        match self {
            L(n) => write!(f, "L {}", n),
            Lf(x) => write!(f, "LF {}", x),

            Nop(l) => write!(f, "#{} NOP", l),
            Jmp(l) => write!(f, "JMP #{}", l),
            Jin(l) => write!(f, "JIN #{}", l),
            Call(s) => write!(f, "CALL {}", s),
            Sub(s) => write!(f, "SUB {}", s),
            End => write!(f, "END"),
            Ref(s) => write!(f, "REF {}", s),
            Exc => write!(f, "EXC"),
            Main => write!(f, "MAIN"),
            Stp => write!(f, "STP"),

            Gdef(s) => write!(f, "GDEF {}", s),
            Gset(s) => write!(f, "GSET {}", s),
            Gbl(s) => write!(f, "GBL {}", s),

            Lctx => write!(f, "LCTX"),
            Ldef(s, _) => write!(f, "LDEF {}", s),
            Lset(s, _) => write!(f, "LSET {}", s),
            Lcl(s, _) => write!(f, "LCL {}", s),
            Lclr => write!(f, "LCLR"),

            Str => write!(f, "STR"),
            Lv => write!(f, "LV"),
            Sys => write!(f, "SYS"),

            Pri => write!(f, "PRI"),
            Pra => write!(f, "PRA"),
            Prf => write!(f, "PRF"),
            Rdi => write!(f, "RDI"),

            Dup => write!(f, "DUP"),
            Tdp => write!(f, "TDP"),
            Qdp => write!(f, "QDP"),
            Ovr => write!(f, "OVR"),
            Tvr => write!(f, "TVR"),
            Drp => write!(f, "DRP"),
            Swp => write!(f, "SWP"),
            Twp => write!(f, "TWP"),
            Rot => write!(f, "ROT"),
            Nrt => write!(f, "NRT"),
            Pck => write!(f, "PCK"),

            Tr => write!(f, "TR"),
            Fr => write!(f, "FR"),
            Rf => write!(f, "RF"),
            Ttr => write!(f, "TTR"),
            Tfr => write!(f, "TFR"),
            Trf => write!(f, "TRF"),

            Adi => write!(f, "ADI"),
            Sbi => write!(f, "SBI"),
            Mli => write!(f, "MLI"),
            Dvi => write!(f, "DVI"),
            Inc => write!(f, "INC"),
            Dec => write!(f, "DEC"),

            Adf => write!(f, "ADF"),
            Sbf => write!(f, "SBF"),
            Mlf => write!(f, "MLF"),
            Dvf => write!(f, "DVF"),

            Eqi => write!(f, "EQI"),
            Lsi => write!(f, "LSI"),
            Gri => write!(f, "GRI"),
            Lsf => write!(f, "LSF"),
            Grf => write!(f, "GRF"),
            Not => write!(f, "NOT"),
            And => write!(f, "AND"),
            Or => write!(f, "OR"),
            Xor => write!(f, "XOR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_text() {
        assert_eq!(Op::L(-7).to_string(), "L -7");
        assert_eq!(Op::Nop("3".into()).to_string(), "#3 NOP");
        assert_eq!(Op::Jin("3".into()).to_string(), "JIN #3");
        assert_eq!(Op::Call("fib".into()).to_string(), "CALL fib");
        assert_eq!(Op::Ldef("n".into(), 0).to_string(), "LDEF n");
        assert_eq!(Op::Stp.to_string(), "STP");
    }

    #[test]
    fn test_float_wire_text_round_trips() {
        let value = 0.1f64 + 0.2f64;
        let text = Op::Lf(value).to_string();
        let parsed: f64 = text[3..].parse().unwrap();
        assert_eq!(parsed.to_bits(), value.to_bits());
    }
}
