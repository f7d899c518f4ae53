use std::process;

use braid::ui::output;

fn main() {
    if let Err(err) = braid::cli::run() {
        output::error(format!("{err:#}"));
        process::exit(1);
    }
}
