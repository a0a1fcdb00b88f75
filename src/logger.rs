pub fn init_logger(verbose: bool, quiet: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else if quiet {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new().filter_level(level).format_timestamp(None).init();
}
