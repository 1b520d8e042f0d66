fn main() {
    habitledger::logging::init_tracing();
    if let Err(err) = habitledger::cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
