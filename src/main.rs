fn main() {
    if let Err(e) = dosewatch_lib::run() {
        eprintln!("dosewatch: {e}");
        std::process::exit(1);
    }
}
