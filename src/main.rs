use clap::Parser;
use tracing_subscriber::EnvFilter;

use inkhide::{
    cli::{Cli, Commands},
    handler::{handle_algorithms, handle_capacity, handle_hide, handle_recover, handle_simulate},
};

/// 程序的主入口点
///
/// 负责初始化日志、解析命令行参数，并根据指定的子命令
/// 将执行分派到相应的处理函数
fn main() -> anyhow::Result<()> {
    // 日志写到 stderr，默认只显示警告，可用 RUST_LOG 调整
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Hide(args) => handle_hide(args),
        Commands::Recover(args) => handle_recover(args),
        Commands::Simulate(args) => handle_simulate(args),
        Commands::Capacity(args) => handle_capacity(args),
        Commands::Algorithms => handle_algorithms(),
    }
}
