//! Where the relay login and password come from.

use std::io::{self, BufRead, Write};

use batchmail_common::tracing::debug;

/// Environment variable consulted before prompting for the password.
pub const PASSWORD_ENV: &str = "BATCHMAIL_PASSWORD";

/// Login name of the current user, from `USER`, `LOGNAME` or `USERNAME`.
pub fn login_name() -> Option<String> {
    ["USER", "LOGNAME", "USERNAME"]
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|value| !value.is_empty()))
}

/// Returns the relay password.
///
/// `BATCHMAIL_PASSWORD` is used when set. Otherwise the password is read from
/// the terminal with echo turned off, or as a plain line when stdin is not a
/// terminal.
///
/// # Errors
///
/// Returns an error if the terminal cannot be configured or read.
pub fn resolve_password() -> io::Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        debug!("Using password from {PASSWORD_ENV}");
        return Ok(password);
    }

    prompt("Password: ")
}

fn prompt(message: &str) -> io::Result<String> {
    let mut stderr = io::stderr();
    stderr.write_all(message.as_bytes())?;
    stderr.flush()?;

    let line = {
        #[cfg(unix)]
        let _echo = terminal::EchoOff::new()?;
        read_line(&mut io::stdin().lock())?
    };

    Ok(line)
}

fn read_line(reader: &mut impl BufRead) -> io::Result<String> {
    let mut line = String::new();
    reader.read_line(&mut line)?;

    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    Ok(line)
}

#[cfg(unix)]
mod terminal {
    use std::{io, mem::MaybeUninit};

    /// Disables echo on stdin until dropped. Does nothing when stdin is not
    /// a terminal.
    pub struct EchoOff {
        original: Option<libc::termios>,
    }

    impl EchoOff {
        pub fn new() -> io::Result<Self> {
            // SAFETY: isatty only inspects the descriptor.
            if unsafe { libc::isatty(libc::STDIN_FILENO) } != 1 {
                return Ok(Self { original: None });
            }

            let mut original = MaybeUninit::<libc::termios>::uninit();
            // SAFETY: `original` is valid for writes of a termios.
            if unsafe { libc::tcgetattr(libc::STDIN_FILENO, original.as_mut_ptr()) } != 0 {
                return Err(io::Error::last_os_error());
            }
            // SAFETY: tcgetattr succeeded and filled the struct.
            let original = unsafe { original.assume_init() };

            let mut hidden = original;
            hidden.c_lflag &= !libc::ECHO;
            hidden.c_lflag |= libc::ECHONL;

            // SAFETY: `hidden` is a fully initialised termios.
            if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &hidden) } != 0 {
                return Err(io::Error::last_os_error());
            }

            Ok(Self {
                original: Some(original),
            })
        }
    }

    impl Drop for EchoOff {
        fn drop(&mut self) {
            if let Some(original) = &self.original {
                // SAFETY: restores the attributes read in `new`.
                unsafe {
                    libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, original);
                }
            }
        }
    }
}
