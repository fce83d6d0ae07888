//! Import log files
//!
//! One import writes two files into the log directory:
//! `import_<stamp>.log` with every line prefixed `OK:` or `ERR:`, and
//! `import_errors_<stamp>.log` with the rejected lines only. When logs for
//! the same stamp already exist, a `_<n>` suffix keeps them apart.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

pub struct ImportLog {
    all: BufWriter<File>,
    errors: BufWriter<File>,
    all_path: PathBuf,
    errors_path: PathBuf,
}

impl ImportLog {
    /// Create both log files in `dir`, named after the current local time
    pub fn create(dir: &Path) -> std::io::Result<Self> {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        Self::create_with_stamp(dir, &stamp)
    }

    fn create_with_stamp(dir: &Path, stamp: &str) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;

        let mut sequence = 0u32;
        loop {
            let name = match sequence {
                0 => stamp.to_string(),
                n => format!("{}_{}", stamp, n),
            };
            let all_path = dir.join(format!("import_{}.log", name));
            let errors_path = dir.join(format!("import_errors_{}.log", name));

            // The main log claims the name; its error log follows it
            let all = match OpenOptions::new().write(true).create_new(true).open(&all_path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    sequence += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            let errors = File::create(&errors_path)?;

            return Ok(Self {
                all: BufWriter::new(all),
                errors: BufWriter::new(errors),
                all_path,
                errors_path,
            });
        }
    }

    pub fn accepted(&mut self, line: &str) -> std::io::Result<()> {
        writeln!(self.all, "OK: {}", line)
    }

    pub fn rejected(&mut self, reason: &str, line: &str) -> std::io::Result<()> {
        writeln!(self.all, "ERR: {} | {}", reason, line)?;
        writeln!(self.errors, "ERR: {} | {}", reason, line)
    }

    /// Flush both files and return their paths (all lines, errors only)
    pub fn finish(mut self) -> std::io::Result<(PathBuf, PathBuf)> {
        self.all.flush()?;
        self.errors.flush()?;
        Ok((self.all_path, self.errors_path))
    }
}
