use capturesrv::capture::parse_body_limit;
use capturesrv::{CaptureServer, CaptureServerTrait, ServerConfig, decrypt, encrypt};
use color_eyre::eyre::{Result, WrapErr, bail, eyre};
use std::net::{IpAddr, SocketAddr};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 3000;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("capturesrv=info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("capturesrv");

    match args.get(1).map(|s| s.to_lowercase()).as_deref() {
        Some("serve") | None => {
            let config = serve_config(args.get(2..).unwrap_or_default())?;
            info!(
                address = %config.bind_addr,
                max_body_size = ?config.max_body_size,
                max_connections = config.max_connections,
                "Starting capture server"
            );

            let server = CaptureServer::new(config);
            server.run().await.wrap_err("Failed to run capture server")?;
        }
        Some("decrypt") => {
            let [passphrase, ciphertext] = positional::<2>(&args, program)?;
            let plaintext = decrypt(passphrase, ciphertext).wrap_err("Failed to decrypt")?;
            println!("{plaintext}");
        }
        Some("encrypt") => {
            let [passphrase, plaintext] = positional::<2>(&args, program)?;
            println!("{}", encrypt(passphrase, plaintext.as_bytes()));
        }
        Some(_) => usage(program),
    }

    Ok(())
}

fn serve_config(args: &[String]) -> Result<ServerConfig> {
    let mut host: IpAddr = [127, 0, 0, 1].into();
    let mut port = DEFAULT_PORT;
    let mut config = ServerConfig::default();

    let mut args = args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--max-body-size" => {
                let value = args.next().ok_or_else(|| eyre!("--max-body-size needs a value"))?;
                config = config.with_max_body_size(parse_body_limit(value)?);
            }
            "--bind" => {
                let value = args.next().ok_or_else(|| eyre!("--bind needs an address"))?;
                host = value
                    .parse()
                    .wrap_err_with(|| format!("Invalid bind address: {value}"))?;
            }
            value if value.starts_with("--") => bail!("Unknown option: {value}"),
            value => {
                port = value
                    .parse()
                    .wrap_err_with(|| format!("Invalid port: {value}"))?;
            }
        }
    }

    config.bind_addr = SocketAddr::new(host, port);
    Ok(config)
}

fn positional<'a, const N: usize>(args: &'a [String], program: &str) -> Result<[&'a str; N]> {
    match args.get(2..) {
        Some(rest) if rest.len() == N => {
            let mut out = [""; N];
            for (slot, arg) in out.iter_mut().zip(rest) {
                *slot = arg.as_str();
            }
            Ok(out)
        }
        _ => usage(program),
    }
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} <command> [args]");
    eprintln!("  serve [port] [--max-body-size <size>] [--bind <addr>]");
    eprintln!("      Start the capture server (default: 127.0.0.1:{DEFAULT_PORT}, 1GiB ceiling)");
    eprintln!("      size: bytes, or a count with KiB/MiB/GiB suffix, or 'unbounded'");
    eprintln!("  decrypt <passphrase> <base64>    Decrypt an AES-256-CBC ciphertext");
    eprintln!("  encrypt <passphrase> <plaintext> Encrypt to base64 ciphertext");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {program} serve 3000                         # Start on port 3000");
    eprintln!("  {program} serve 8080 --max-body-size 16MiB   # Smaller capture ceiling");
    eprintln!("  {program} decrypt MySecretKey DNTXPKEjAadeLnKNveSP5Q==");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_positional_borrows_from_args() {
        let args = args(&["capturesrv", "decrypt", "MySecretKey", "DNTXPKEjAadeLnKNveSP5Q=="]);
        let [passphrase, ciphertext] = positional::<2>(&args, "capturesrv").unwrap();

        assert_eq!(passphrase, "MySecretKey");
        assert_eq!(decrypt(passphrase, ciphertext).unwrap(), "eazeazeza");
    }

    #[test]
    fn test_serve_config_from_args() {
        let config = serve_config(&args(&["8080", "--max-body-size", "16MiB", "--bind", "0.0.0.0"])).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.max_body_size, Some(16 * 1024 * 1024));
    }

    #[test]
    fn test_serve_config_defaults() {
        let config = serve_config(&[]).unwrap();

        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)));
        assert!(serve_config(&args(&["--verbose"])).is_err());
    }
}
