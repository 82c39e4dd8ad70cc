use ember::Server;

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let mut server = Server::bind("0.0.0.0:8080")?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    server.run()
}
