#[tokio::main]
async fn main() {
    if let Err(e) = colloquy::run().await {
        eprintln!("colloquy failed to start: {e}");
        std::process::exit(1);
    }
}
