use anyhow::bail;
use clap::Parser;
use core::time::Duration;

/// Runtime configuration for the `quartet-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is loaded first), with defaults suitable for local use.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "quartet-server",
    version,
    about = "A gRPC server for the calculator, blog and greet services"
)]
pub struct CliArgs {
    /// Address to listen on (TCP or Unix socket path; use --uds for Unix socket).
    ///
    /// Example: "0.0.0.0:50051" or "/tmp/quartet.sock"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub server_addr: String,

    /// Listen on a Unix socket instead of TCP. If set, `SERVER_ADDR` must be a file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,

    /// Outbound messages buffered per streaming call before the handler has
    /// to wait for the caller to read.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 8)]
    pub stream_buffer_size: usize,

    /// Seconds to let in-flight calls finish after a shutdown signal before
    /// they are cancelled.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,

    /// Deadline in milliseconds for calls that arrive without a
    /// `grpc-timeout`. Zero leaves such calls unbounded.
    ///
    /// Environment variable: `DEFAULT_DEADLINE_MS`
    #[arg(long, env = "DEFAULT_DEADLINE_MS", default_value_t = 0)]
    pub default_deadline_ms: u64,

    /// Pause in milliseconds between greetings, and the length of each work
    /// step of `GreetWithDeadLine`.
    ///
    /// Environment variable: `GREET_INTERVAL_MS`
    #[arg(long, env = "GREET_INTERVAL_MS", default_value_t = 1000)]
    pub greet_interval_ms: u64,

    /// Number of greetings sent by `GreetManyTimes`.
    ///
    /// Environment variable: `GREET_REPEAT`
    #[arg(long, env = "GREET_REPEAT", default_value_t = 10)]
    pub greet_repeat: u32,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub uds: bool,
    pub stream_buffer_size: usize,
    pub shutdown_timeout: Duration,
    pub default_deadline: Option<Duration>,
    pub greet_interval: Duration,
    pub greet_repeat: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:50051".to_string(),
            uds: false,
            stream_buffer_size: 8,
            shutdown_timeout: Duration::from_secs(3),
            default_deadline: None,
            greet_interval: Duration::from_secs(1),
            greet_repeat: 10,
        }
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        if args.server_addr.is_empty() {
            bail!("SERVER_ADDR must not be empty");
        }

        Ok(Self {
            server_addr: args.server_addr,
            uds: args.uds,
            stream_buffer_size: args.stream_buffer_size,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
            default_deadline: (args.default_deadline_ms > 0)
                .then(|| Duration::from_millis(args.default_deadline_ms)),
            greet_interval: Duration::from_millis(args.greet_interval_ms),
            greet_repeat: args.greet_repeat,
        })
    }
}
