//! userkern - boot the kernel and run one root program
//!
//! Usage: userkern [--config FILE] [--store FILE] IMAGE [ARGS...]
//!
//! Logging is controlled by RUST_LOG (e.g. RUST_LOG=debug).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use userkern::console_log;
use userkern::kernel::{ExitStatus, Kernel, KernelConfig, StdioConsole};
use userkern::programs;
use userkern::vfs::MemoryStore;

struct Options {
    config: Option<PathBuf>,
    store: Option<PathBuf>,
    image: String,
    args: Vec<String>,
}

fn usage() -> String {
    "usage: userkern [--config FILE] [--store FILE] IMAGE [ARGS...]".to_string()
}

fn parse_args() -> Result<Options, String> {
    let mut args = std::env::args().skip(1);
    let mut config = None;
    let mut store = None;

    let image = loop {
        match args.next() {
            Some(flag) if flag == "--config" => {
                config = Some(args.next().ok_or("--config needs a file")?.into());
            }
            Some(flag) if flag == "--store" => {
                store = Some(args.next().ok_or("--store needs a file")?.into());
            }
            Some(flag) if flag == "-h" || flag == "--help" => return Err(usage()),
            Some(image) => break image,
            None => return Err(usage()),
        }
    };

    Ok(Options {
        config,
        store,
        image,
        args: args.collect(),
    })
}

fn run(opts: Options) -> Result<u8, Box<dyn std::error::Error>> {
    let config = match &opts.config {
        Some(path) => KernelConfig::load(path)?,
        None => KernelConfig::default(),
    };

    let store = match &opts.store {
        Some(path) if path.exists() => MemoryStore::load(path)?,
        _ => MemoryStore::new(),
    };
    let store = Arc::new(store);

    let kernel = Kernel::new(config, store.clone(), Arc::new(StdioConsole))?;
    programs::install(&kernel);

    let status = kernel.run(&opts.image, &opts.args)?;
    log::info!("root finished: {:?}", status);

    if let Some(path) = &opts.store {
        store.save(path)?;
    }

    Ok(match status {
        Some(ExitStatus::Exited(code)) => code as u8,
        Some(ExitStatus::Abnormal) => 134,
        // Halted
        None => 0,
    })
}

fn main() -> ExitCode {
    env_logger::init();

    let opts = match parse_args() {
        Ok(opts) => opts,
        Err(msg) => {
            console_log!("{}", msg);
            return ExitCode::from(2);
        }
    };

    match run(opts) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            console_log!("userkern: {}", e);
            ExitCode::FAILURE
        }
    }
}
