fn main() {
    if let Err(e) = intervistai::cli::main() {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
}
