//! CLI entry point: `loadcycle <file1.json> [<file2.json> …]`.
//!
//! Each file is run independently; a failure in one is printed but does
//! not stop the remaining files from running, and the process always
//! exits 0 — preserved from the source tool's own CLI contract.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        println!("Inform the file to be executed: {} filename.json", args[0]);
        return;
    }

    for filename in &args[1..] {
        if let Err(e) = loadcycle::orchestrator::run(filename).await {
            println!("{e}");
        }
    }
}
