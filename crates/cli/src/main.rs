fn main() {
    if let Err(e) = surface_cli::run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
