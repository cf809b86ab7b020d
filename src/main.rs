//! rswebstack 命令行入口：检测单个页面的技术栈并输出报告

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use rswebstack::{
    ConfigManager, GlobalConfig, JsonReporter, RswebstackError, TechDetector, TextReporter,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "rswebstack")]
#[command(author, version, about = "检测网站使用的CMS、前端框架、统计分析、CDN、服务器与部署平台")]
struct Args {
    /// 待检测的URL（省略时从标准输入读取）
    url: Option<String>,

    /// 单次请求超时（秒）
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// 最大重试次数
    #[arg(long, default_value_t = 3)]
    retries: u32,

    /// 退避系数（秒）
    #[arg(long, default_value_t = 0.3)]
    backoff: f64,

    /// 自定义User-Agent
    #[arg(long)]
    user_agent: Option<String>,

    /// 以JSON格式输出
    #[arg(long)]
    json: bool,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// 未指定URL时提示用户输入
async fn prompt_url() -> Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"Enter the website URL: ").await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("读取标准输入失败")?;
    Ok(line.trim().to_string())
}

fn build_config(args: &Args) -> GlobalConfig {
    let mut builder = ConfigManager::custom()
        .http_timeout(Duration::from_secs(args.timeout))
        .max_retries(args.retries)
        .backoff_factor(args.backoff)
        .verbose(args.verbose);
    if let Some(user_agent) = &args.user_agent {
        builder = builder.user_agent(user_agent.clone());
    }
    builder.build()
}

async fn run(args: Args, config: GlobalConfig) -> Result<()> {
    let url = match args.url {
        Some(url) => url,
        None => prompt_url().await?,
    };

    let detector = TechDetector::new(config)?;
    let stack = detector.detect_url(&url).await?;

    if args.json {
        println!("{}", JsonReporter::render(&stack)?);
    } else {
        print!("{}", TextReporter::render(url.trim(), &stack));
    }
    info!("检测结束：{}", url.trim());
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let config = build_config(&args);
    init_logging(config.verbose);

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<RswebstackError>() {
                Some(inner) if inner.is_fatal() => error!("检测终止：{}", inner),
                _ => error!("运行失败：{:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}
