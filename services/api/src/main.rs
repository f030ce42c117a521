use citation_agent_api::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("status service error: {err}");
        std::process::exit(1);
    }
}
