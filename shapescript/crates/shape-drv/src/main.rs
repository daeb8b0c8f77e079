fn main() {
    if let Err(err) = shape_drv::main() {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}
