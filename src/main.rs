#[macro_use]
extern crate log;

use std::env::consts::{ARCH, FAMILY, OS};
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::sync::{Arc, Mutex};

use anyhow::Error;
use clap::Parser;
use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, Config, ConfigBuilder, TermLogger, TerminalMode, WriteLogger};

use crate::program::{Cli, Program};

mod fa;
mod program;

/// Name of the log file written in the working directory.
const LOG_NAME: &str = "fa_downloader.log";

/// A buffered log file writer that flushes every few lines.
struct BufferedFileWriter {
    inner: Arc<Mutex<BufWriter<std::fs::File>>>,
    line_count: Arc<Mutex<usize>>,
}

impl BufferedFileWriter {
    fn new() -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(LOG_NAME)?;
        let buffered_writer = BufWriter::with_capacity(64 * 1024, file);

        Ok(Self {
            inner: Arc::new(Mutex::new(buffered_writer)),
            line_count: Arc::new(Mutex::new(0)),
        })
    }
}

impl Write for BufferedFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut writer = self.inner.lock().map_err(|_| io::Error::other("Failed to acquire lock"))?;
        let size = writer.write(buf)?;

        if let Ok(mut count) = self.line_count.lock()
            && buf.contains(&b'\n')
        {
            *count += buf.iter().filter(|&&b| b == b'\n').count();
            if *count % 50 == 0 {
                writer.flush()?;
            }
        }

        Ok(size)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut writer = self.inner.lock().map_err(|_| io::Error::other("Failed to acquire lock"))?;
        writer.flush()
    }
}

impl Drop for BufferedFileWriter {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.inner.lock() {
            let _ = writer.flush();
        }
    }
}

fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    initialize_logger(if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info });
    log_system_information();

    let program = Program::new(cli);
    if let Err(err) = program.run() {
        error!("{:#}", err);
        log::logger().flush();
        std::process::exit(1);
    }
    log::logger().flush();
    Ok(())
}

/// Initializes the terminal logger and the trace-level file logger.
fn initialize_logger(terminal_level: LevelFilter) {
    let mut config = ConfigBuilder::new();
    config.add_filter_allow_str("fa_downloader");

    let buffered_file_writer = match BufferedFileWriter::new() {
        Ok(writer) => writer,
        Err(e) => {
            eprintln!("Failed to open {}: {}. Logging will only output to terminal.", LOG_NAME, e);
            let _ = TermLogger::init(terminal_level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto);
            return;
        }
    };

    if let Err(e) = CombinedLogger::init(vec![
        TermLogger::new(terminal_level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::max(), config.build(), buffered_file_writer),
    ]) {
        eprintln!("Failed to initialize combined logger: {}. Falling back to terminal-only logging.", e);
        let _ = TermLogger::init(terminal_level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto);
    }
}

/// Logs information about the system being used.
fn log_system_information() {
    trace!("Printing system information out into log for debug purposes...");
    trace!("ARCH:           \"{}\"", ARCH);
    trace!("FAMILY:         \"{}\"", FAMILY);
    trace!("OS:             \"{}\"", OS);
}
