// src/main.rs

use kvsync::{cli, logging};

#[tokio::main]
async fn main() {
    let args = cli::parse();

    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("kvsync error: {err:?}");
        std::process::exit(1);
    }

    let code = kvsync::run(args).await;
    std::process::exit(code);
}
