use forth::lang::Error;
use forth::mach::{Cell, Session};
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// Drives a `Session` like the console does, with output captured
/// instead of written to the terminal.
pub struct Console {
    session: Session,
    buf: Rc<RefCell<Vec<u8>>>,
}

struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Console {
    pub fn new() -> Console {
        let mut session = Session::new().unwrap();
        let buf = Rc::new(RefCell::new(Vec::new()));
        session
            .runtime()
            .set_output(Box::new(SharedBuf(Rc::clone(&buf))));
        Console { session, buf }
    }

    pub fn parse(&mut self, source: &str) {
        self.session.parse(source, "test").unwrap();
    }

    pub fn enter(&mut self, line: &str) -> String {
        self.session.eval(line).unwrap();
        self.take()
    }

    pub fn status(&mut self, line: &str) -> Cell {
        self.session.eval(line).unwrap()
    }

    pub fn err(&mut self, line: &str) -> Error {
        self.session.eval(line).unwrap_err()
    }

    pub fn session(&mut self) -> &mut Session {
        &mut self.session
    }

    fn take(&mut self) -> String {
        let bytes = std::mem::take(&mut *self.buf.borrow_mut());
        String::from_utf8(bytes).unwrap()
    }
}
