use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use basalt::Basalt;

/// A `Write` handle backed by a shared buffer, so the interpreter's output
/// can be read back after the run completes instead of going to real stdout.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("interpreter output to be valid UTF-8")
    }
}

/// Runs `source` through a fresh interpreter and returns everything it
/// wrote via `echo`/`print`.
pub fn run(source: &str) -> String {
    let buffer = SharedBuffer::default();
    let mut basalt = Basalt::new(Box::new(buffer.clone()));
    basalt.run_source(source);
    buffer.contents()
}

/// Declares an integration test that runs an inline program and checks its
/// captured output line by line.
#[macro_export]
macro_rules! basalt_test {
    ($name:ident, $source:expr, [$($expected:expr),* $(,)?]) => {
        #[test]
        fn $name() {
            let expected: Vec<&str> = vec![$($expected),*];
            let expected = if expected.is_empty() { String::new() } else { format!("{}\n", expected.join("\n")) };
            let actual = $crate::common::run($source);
            assert_eq!(expected, actual);
        }
    };
}
