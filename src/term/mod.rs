/*!
## Terminal Module

The interactive console. A line that is not a command is wrapped as
`main`, compiled against everything defined so far, and run on the
session machine. Console commands:

```text
: name .. ;    define a word
% [name]       show one definition, or all of them
# filename     load a source file
exit           leave
```

*/

extern crate ansi_term;
extern crate linefeed;
use crate::mach::Session;
use ansi_term::Style;
use linefeed::{Interface, ReadResult};

pub fn main() {
    if let Err(error) = main_loop() {
        eprintln!("{}", error);
    }
}

fn main_loop() -> std::io::Result<()> {
    let mut session = match Session::new() {
        Ok(session) => session,
        Err(error) => {
            eprintln!("{}", Style::new().bold().paint(error.to_string()));
            std::process::exit(1);
        }
    };
    let args: Vec<String> = std::env::args().collect();
    session.runtime().set_args(args.clone());

    if let Some(file) = args.get(1).filter(|a| !a.starts_with('-')) {
        let file = file.clone();
        let status = match session.parse_file(&file).and_then(|_| session.run_main()) {
            Ok(status) => status,
            Err(error) => {
                eprintln!("{}", Style::new().bold().paint(error.to_string()));
                std::process::exit(1);
            }
        };
        println!();
        std::process::exit(status as i32);
    }

    let interface = Interface::new("forth")?;
    interface.set_prompt("forth> ")?;

    loop {
        let line = match interface.read_line()? {
            ReadResult::Input(line) => line,
            ReadResult::Signal(_) | ReadResult::Eof => break,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "exit" {
            break;
        }
        interface.add_history_unique(line.clone());

        let result = if trimmed.starts_with(':') {
            session.parse(trimmed, "repl")
        } else if let Some(name) = trimmed.strip_prefix('%') {
            show(&session, name.trim());
            continue;
        } else if let Some(name) = trimmed.strip_prefix('#') {
            session.parse_file(name.trim())
        } else {
            evaluate(&mut session, trimmed)
        };

        if let Err(error) = result {
            println!("{}", Style::new().bold().paint(error.to_string()));
        }
    }
    Ok(())
}

fn evaluate(session: &mut Session, line: &str) -> Result<(), crate::lang::Error> {
    session.parse(&format!(": main {} ;", line), "repl")?;
    let code = session.compile_main()?;
    if session.runtime().trace() {
        println!("{}", code);
    }
    session.runtime().run(&code)?;
    println!();
    Ok(())
}

fn show(session: &Session, name: &str) {
    if name.is_empty() {
        for rendered in session.definitions() {
            println!("{}", rendered);
        }
        return;
    }
    match session.definition(name) {
        Some(rendered) => println!("{}", rendered),
        None => println!("UNKNOWN WORD \"{}\"", name),
    }
}
