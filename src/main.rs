fn main() {
    if let Err(e) = labelgeom::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
