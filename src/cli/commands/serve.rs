//! Web server command.

use console::style;

use crate::config::Settings;

const DEFAULT_PORT: u16 = 8211;

/// Start the web server.
pub async fn cmd_serve(settings: Settings, bind: &str) -> anyhow::Result<()> {
    let (host, port) = parse_bind_address(bind)?;

    println!(
        "{} Archive: {}",
        style("→").cyan(),
        settings.archive_dir.display()
    );
    println!(
        "{} Starting threadvault server at http://{}:{}",
        style("→").cyan(),
        host,
        port
    );
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, &host, port).await
}

/// Parse a bind address that can be:
/// - Just a port: "8211" -> 127.0.0.1:8211
/// - Just a host: "0.0.0.0" -> 0.0.0.0:8211
/// - Host and port: "0.0.0.0:8211" -> 0.0.0.0:8211
fn parse_bind_address(bind: &str) -> anyhow::Result<(String, u16)> {
    if let Ok(port) = bind.parse::<u16>() {
        return Ok(("127.0.0.1".to_string(), port));
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return Ok((host.to_string(), port));
        }
        anyhow::bail!("Invalid port in bind address: {}", bind);
    }

    Ok((bind.to_string(), DEFAULT_PORT))
}
