use std::process::ExitCode;

fn main() -> ExitCode {
    let result = packetsim::core::main::run_packetsim(std::env::args_os().collect());
    log::logger().flush();

    if let Err(e) = result {
        // log the full error, its context, and its backtrace if enabled
        if log::log_enabled!(log::Level::Error) {
            for line in format!("{e:?}").split('\n') {
                log::error!("{}", line);
            }
            log::logger().flush();

            // print the short error
            eprintln!("** packetsim did not complete successfully: {e}");
            eprintln!("** See the log for details");
        } else {
            eprintln!("{e:?}");
        }
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
