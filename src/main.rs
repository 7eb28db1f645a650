use anyhow::{Context, Result};
use push_relay::{
    cli::{Cli, Commands},
    config::{self, ServerConfig},
    logging, PushRelayServer, TriggerContext,
};
use std::fs;
use std::process;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载 .env 文件（如果存在）
    let _ = dotenvy::dotenv();

    // 解析命令行参数
    let cli = Cli::parse();

    // 处理子命令
    if let Some(command) = &cli.command {
        match command {
            Commands::GenerateConfig { path } => {
                return generate_config(path);
            }
            Commands::ValidateConfig { path } => {
                return validate_config(path);
            }
            Commands::ShowConfig => {
                return show_config(&cli);
            }
            Commands::Trigger {
                collection,
                document_id,
                file,
            } => {
                return run_trigger(&cli, collection, document_id, file.as_deref()).await;
            }
        }
    }

    // 快速读取 config.toml 的 [logging] 段（不加载完整配置）
    let early_log = config::load_early_logging_config(cli.config_file.as_deref());

    // 合并日志配置（优先级：CLI > config.toml > 默认值）
    let log_level = cli
        .get_log_level()
        .or(early_log.level)
        .unwrap_or_else(|| "info".to_string());
    let log_format = cli.get_log_format().or(early_log.format);
    let log_file = cli.log_file.as_deref().or(early_log.file.as_deref());

    let _log_guard = logging::init_logging(&log_level, log_format.as_deref(), log_file, cli.quiet)?;

    tracing::info!("🚀 push-relay starting...");

    // 加载配置（按优先级：命令行 > 环境变量 > 配置文件 > 默认值）
    let config = ServerConfig::load(&cli).context("加载配置失败")?;

    if cli.dev {
        tracing::info!("🔧 开发模式已启用");
    }

    // 显示配置信息
    tracing::info!("📊 Server Configuration:");
    tracing::info!("  - Bind: {}", config.bind_address());
    tracing::info!(
        "  - FCM Project: {}",
        config.fcm.project_id.as_deref().unwrap_or("(from service account)")
    );
    tracing::info!("  - FCM Validate Only: {}", config.fcm.validate_only);
    tracing::info!("  - Users Collection: {}", config.firestore.users_collection);
    tracing::info!("  - Announcement Topic: {}", config.delivery.announcement_topic);
    tracing::info!("  - Metrics: {}", config.enable_metrics);
    tracing::info!("  - Log Level: {}", config.log_level);
    tracing::info!(
        "  - Log Format: {:?}",
        log_format.as_deref().unwrap_or("compact")
    );
    if let Some(f) = log_file {
        tracing::info!("  - Log File: {}", f);
    }

    let server = match PushRelayServer::new(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("❌ 服务初始化失败: {}", e);
            tracing::error!("💡 请检查 FCM 凭据与 Firestore 配置后重试");
            process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        tracing::error!("❌ 服务运行失败: {}", e);
        process::exit(1);
    }

    Ok(())
}

/// 生成默认配置文件
fn generate_config(path: &str) -> Result<()> {
    fs::write(path, config::DEFAULT_CONFIG_TOML)
        .with_context(|| format!("无法写入配置文件: {}", path))?;

    println!("✅ 配置文件已生成: {}", path);
    Ok(())
}

/// 验证配置文件
fn validate_config(path: &str) -> Result<()> {
    let config = ServerConfig::from_toml_file(path)
        .with_context(|| format!("配置文件验证失败: {}", path))?;
    config
        .validate()
        .with_context(|| format!("配置文件验证失败: {}", path))?;

    println!("✅ 配置文件有效: {}", path);
    println!("📊 配置摘要:");
    println!("  - Bind: {}", config.bind_address());
    println!("  - FCM Project: {:?}", config.fcm.project_id);
    println!("  - Users Collection: {}", config.firestore.users_collection);
    println!("  - Announcement Topic: {}", config.delivery.announcement_topic);

    Ok(())
}

/// 显示最终配置（合并后的配置）
fn show_config(cli: &Cli) -> Result<()> {
    let _guard = logging::init_logging("info", None, None, false)?;

    let config = ServerConfig::load(cli).context("加载配置失败")?;

    println!("📊 最终配置（合并后的配置）:");
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}

/// 用文件中的快照执行一次触发器，结果打印到 stdout
async fn run_trigger(
    cli: &Cli,
    collection: &str,
    document_id: &str,
    file: Option<&str>,
) -> Result<()> {
    let log_level = cli.get_log_level().unwrap_or_else(|| "info".to_string());
    let _guard = logging::init_logging(&log_level, cli.get_log_format().as_deref(), None, cli.quiet)?;

    let config = ServerConfig::load(cli).context("加载配置失败")?;
    let server = PushRelayServer::new(config).context("服务初始化失败")?;

    let snapshot = match file {
        Some(path) => {
            let content =
                fs::read(path).with_context(|| format!("无法读取快照文件: {}", path))?;
            push_relay::http::routes::trigger::parse_snapshot(&content)
                .with_context(|| format!("快照文件格式错误: {}", path))?
        }
        None => None,
    };

    let result = server
        .dispatcher()
        .dispatch(TriggerContext::new(collection, document_id), snapshot)
        .await
        .context("触发失败")?;

    println!("{}", serde_json::to_string_pretty(&result.to_json())?);
    Ok(())
}
