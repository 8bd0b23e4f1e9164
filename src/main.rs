use std::{env, process};

use basalt::stdout_driver;

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut basalt = stdout_driver();

    match args.len() {
        n if n > 2 => {
            println!("Usage: basalt [script]");
            process::exit(64);
        }
        2 => basalt.run_file(&args[1]),
        _ => basalt.run_prompt(),
    };
}
