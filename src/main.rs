fn main() {
    if let Err(err) = foodshare_ingest::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
