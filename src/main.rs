#[tokio::main]
async fn main() {
    if let Err(e) = sqlpad_lib::run().await {
        eprintln!("sqlpad: {}", e);
        std::process::exit(1);
    }
}
