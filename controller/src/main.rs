mod host;
mod http;
mod remote;
mod sensor;
mod storage;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
