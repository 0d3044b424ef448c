fn main() {
    if let Err(error) = metapath_cli::run() {
        // run() installs the subscriber right after argument parsing.
        tracing::error!(error = format!("{error:#}"), "metapath execution failed");
        std::process::exit(1);
    }
}
