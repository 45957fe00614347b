use clap::Parser;
use log::{error, info};

use tradereplay::args::*;
use tradereplay::errors::*;
use tradereplay::*;

// Rust doesn't trap a unix signal appropriately occasionally: https://github.com/rust-lang/rust/issues/46016
fn reset_signal_pipe_handler() -> Result<()> {
    #[cfg(target_family = "unix")]
    {
        use nix::sys::signal;

        unsafe {
            signal::signal(signal::Signal::SIGPIPE, signal::SigHandler::SigDfl)
                .chain_err(|| "Internal error: cannot trap signal")?;
        }
    }

    Ok(())
}

fn main() {
    if let Err(ref e) = reset_signal_pipe_handler().and_then(|_| run()) {
        let mut s = e.to_string();

        for e in e.iter().skip(1) {
            s.push_str(&format!("\n\tcaused by: {}", e));
        }

        // with `RUST_BACKTRACE=1`.
        if let Some(backtrace) = e.backtrace() {
            s.push_str(&format!("\n\tbacktrace:\n{:?}", backtrace));
        }

        error!("{}", s);

        ::std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let opts = Opts::parse();
    let history_file = &opts.history_file();
    let replayer = Replayer::new(opts.replay_config());

    stderrlog::new()
        .module(module_path!())
        .show_level(false)
        .quiet(opts.quiet)
        .verbosity(opts.verbose + 2) // Progress is shown by default
        .timestamp(opts.ts.unwrap_or(stderrlog::Timestamp::Off))
        .init()
        .chain_err(|| "Internal error: cannot initialize logging")?;

    match opts.subcmd {
        SubCommand::Run { .. } => {
            let records = load(history_file)?;
            info!(
                "{}: replaying {} trades with {}",
                history_file.to_string_lossy(),
                records.len(),
                replayer.config.program.to_string_lossy()
            );
            replayer.replay(&records)?;
            info!("{} trades replayed.", records.len());
            Ok(())
        }
        SubCommand::Plan { .. } => {
            let records = load(history_file)?;
            replayer
                .plan(&records)?
                .iter()
                .for_each(|inv| println!("{}", inv));
            Ok(())
        }
        SubCommand::Check { .. } => {
            let records = load(history_file)?;
            let plan = replayer.plan(&records)?;
            println!("{} trades processed correctly.", plan.len());
            Ok(())
        }
        SubCommand::Trades { name_substring } => {
            let records = load(history_file)?;
            println!(
                fmt_trade!(),
                "LINE", "SYMBOL", "DATE", "KIND", "QUANTITY", "PRICE"
            );
            history::matching(&records, name_substring.as_deref())
                .for_each(|r| println!("{}", r));
            Ok(())
        }
    }
}
