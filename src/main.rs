fn main() {
    if let Err(err) = galv_tvn::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
