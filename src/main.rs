//! LearnIT Agent 主入口

use std::io::Write;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use learnit_agent::core::agent::{TurnOrchestrator, TurnOutcome};
use learnit_agent::infra::config::{Config, ConfigLoader};
use learnit_agent::infra::logging::{self, LogLevel};
use learnit_agent::service::{build_orchestrator, build_provider, AgentService};

// 命令行参数解析结构体
#[derive(Parser, Debug)]
#[command(name = "learnit-agent")]
#[command(version)]
#[command(about = "LearnIT 강의 추천 대화 에이전트", long_about = None)]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = "learnit.toml")]
    config: String,

    /// 是否启用 verbose 模式（显示 DEBUG 日志）
    #[arg(short, long)]
    verbose: bool,

    /// 子命令
    #[command(subcommand)]
    command: Option<Commands>,
}

// 子命令枚举
#[derive(Subcommand, Debug)]
enum Commands {
    /// 启动 HTTP 服务
    Serve,
    /// 终端对话
    Chat {
        /// 会话 ID（默认随机生成）
        #[arg(long)]
        session: Option<String>,
    },
    /// 检查配置文件是否有效
    Check,
}

// 主函数
#[tokio::main]
async fn main() {
    // 加载 .env 文件
    dotenv::dotenv().ok();

    let args = Args::parse();

    let config = match ConfigLoader::new().load(&args.config).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("配置加载失败: {}", e);
            std::process::exit(1);
        }
    };

    let mut logging_config = config.logging_config();
    if args.verbose {
        logging_config.level = LogLevel::Debug;
    }
    logging::init(&logging_config);

    info!(version = env!("CARGO_PKG_VERSION"), "LearnIT Agent 启动");

    let code = match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_service(config).await,
        Commands::Chat { session } => run_chat(config, session).await,
        Commands::Check => check_config(&args.config, &config),
    };
    std::process::exit(code);
}

// 启动 HTTP 服务
async fn run_service(config: Config) -> i32 {
    let service = match AgentService::new(config) {
        Ok(service) => service,
        Err(e) => {
            error!(error = %e, "服务初始化失败");
            return 1;
        }
    };

    match service.start().await {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "服务运行出错");
            1
        }
    }
}

// 终端对话
async fn run_chat(config: Config, session: Option<String>) -> i32 {
    let orchestrator = match build_provider(&config).and_then(|provider| build_orchestrator(&config, provider)) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!(error = %e, "初始化失败");
            return 1;
        }
    };
    let session_id = session.unwrap_or_else(|| format!("cli-{}", uuid::Uuid::new_v4().simple()));

    println!("LearnIT 강의 추천 에이전트 (종료: exit / e)");
    chat_loop(&orchestrator, &session_id).await;
    0
}

async fn chat_loop(orchestrator: &TurnOrchestrator, session_id: &str) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("Chat> ");
        let _ = std::io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "读取输入失败");
                break;
            }
        };

        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message, "exit" | "e") {
            break;
        }

        match orchestrator.run_turn(session_id, message).await {
            Ok(outcome) => print_outcome(&outcome),
            Err(e) => println!("[오류] {}", e),
        }
    }
}

fn print_outcome(outcome: &TurnOutcome) {
    println!("{}", outcome.display_reply());

    for item in outcome.items().unwrap_or_default() {
        let field = |key: &str| match item.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "-".to_string(),
            Some(other) => other.to_string(),
        };
        println!("  - {} | {} | {}", field("title"), field("price"), field("detailUrl"));
    }
}

// 检查配置
fn check_config(path: &str, config: &Config) -> i32 {
    println!("配置文件: {}", path);
    println!("  course_api_base_url = {}", config.catalog.api_base_url);
    println!("  course_web_base_url = {}", config.catalog.web_base_url);
    println!("  model               = {}", config.ai.model);
    println!("  max_tool_rounds     = {}", config.agent.max_tool_rounds);
    println!("  server              = {}:{}", config.server.host, config.server.port);

    match build_provider(config) {
        Ok(_) => {
            println!("配置有效");
            0
        }
        Err(e) => {
            println!("配置无效: {}", e);
            1
        }
    }
}
