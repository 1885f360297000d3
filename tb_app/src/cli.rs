/// Config file path from the first command-line argument
pub fn config_path(default: &str) -> String {
    config_path_from(std::env::args().skip(1), default)
}

fn config_path_from<I: Iterator<Item = String>>(mut args: I, default: &str) -> String {
    args.next().filter(|arg| !arg.is_empty()).unwrap_or_else(|| default.to_string())
}
