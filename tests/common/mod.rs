#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Cursor, Write};
use std::rc::Rc;

use rox::error::Diagnostics;
use rox::lox::{with_stack, Lox};

/// Output sink shared between a session and the test inspecting it.
#[derive(Clone, Default)]
pub struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A session whose `input()` reads from `input` and whose output is captured.
pub fn session(input: &str) -> (Lox, SharedBuf) {
    let out = SharedBuf::default();
    let lox = Lox::with_io(
        Box::new(out.clone()),
        Box::new(Cursor::new(input.as_bytes().to_vec())),
    );
    (lox, out)
}

/// Run `source` in a fresh session on a session-sized stack; returns printed
/// output and the outcome.
pub fn run(source: &str) -> (String, Result<(), Diagnostics>) {
    let source = source.to_owned();
    with_stack(move || {
        let (mut lox, out) = session("");
        let result = lox.run(&source);
        (out.contents(), result)
    })
    .unwrap()
}

/// Run a program expected to succeed and return what it printed.
pub fn output_of(source: &str) -> String {
    let (out, result) = run(source);
    if let Err(diagnostics) = result {
        panic!("program failed:\n{}", diagnostics);
    }
    out
}

/// Run a program expected to fail and return its diagnostics.
pub fn errors_of(source: &str) -> Diagnostics {
    match run(source) {
        (_, Err(diagnostics)) => diagnostics,
        (out, Ok(())) => panic!("program succeeded, printing:\n{}", out),
    }
}

/// Bare messages of every diagnostic, in report order.
pub fn messages(diagnostics: &Diagnostics) -> Vec<String> {
    diagnostics.iter().map(|e| e.message()).collect()
}
