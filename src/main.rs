#[tokio::main]
async fn main() {
    if let Err(err) = lonestar_ledger::run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
