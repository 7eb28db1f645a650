use clap::{Parser, Subcommand};

impl Cli {
    /// 解析命令行参数
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

/// push-relay - 把 Firestore 新建文档转成 FCM 推送
#[derive(Parser, Debug, Default)]
#[command(name = "push-relay")]
#[command(version)]
#[command(about = "Firestore 触发器推送服务", long_about = None)]
pub struct Cli {
    /// 配置文件路径
    #[arg(long, value_name = "FILE", help = "指定配置文件路径")]
    pub config_file: Option<String>,

    /// 监听地址
    #[arg(long, value_name = "ADDRESS", help = "服务监听地址")]
    pub host: Option<String>,

    /// 监听端口
    #[arg(long, value_name = "PORT", help = "HTTP 端口")]
    pub port: Option<u16>,

    /// Firebase 项目 ID
    #[arg(long, value_name = "ID", help = "Firebase 项目 ID")]
    pub project_id: Option<String>,

    /// service account JSON 路径
    #[arg(long, value_name = "FILE", help = "Google service account JSON 文件")]
    pub service_account: Option<String>,

    /// 触发器共享密钥
    #[arg(long, value_name = "SECRET", help = "触发请求需携带的 X-Trigger-Secret")]
    pub trigger_secret: Option<String>,

    /// 只校验消息，不实际投递
    #[arg(long, help = "FCM validate_only 模式")]
    pub validate_only: bool,

    /// 关闭监控指标
    #[arg(long, help = "关闭 Prometheus 监控指标")]
    pub disable_metrics: bool,

    /// 日志级别
    #[arg(
        long,
        value_name = "LEVEL",
        help = "日志级别: trace, debug, info, warn, error"
    )]
    pub log_level: Option<String>,

    /// 日志格式
    #[arg(long, value_name = "FORMAT", help = "日志格式: pretty, json, compact")]
    pub log_format: Option<String>,

    /// 日志文件路径
    #[arg(long, value_name = "PATH", help = "日志输出文件路径")]
    pub log_file: Option<String>,

    /// 详细输出（可重复使用：-v, -vv, -vvv）
    #[arg(short, action = clap::ArgAction::Count, help = "详细输出级别")]
    pub verbose: u8,

    /// 静默模式
    #[arg(long, short = 'q', help = "静默模式（只输出错误）")]
    pub quiet: bool,

    /// 开发模式（等同于 --log-level debug --log-format pretty）
    #[arg(long, help = "启用开发模式")]
    pub dev: bool,

    /// 子命令
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 生成默认配置文件
    GenerateConfig {
        /// 输出文件路径
        #[arg(value_name = "PATH", default_value = "config.toml")]
        path: String,
    },
    /// 验证配置文件
    ValidateConfig {
        /// 配置文件路径
        #[arg(value_name = "PATH", default_value = "config.toml")]
        path: String,
    },
    /// 显示最终配置（合并后的配置）
    ShowConfig,
    /// 用 JSON 文件中的快照执行一次触发器
    Trigger {
        /// 集合名（notifications / announcements）
        #[arg(value_name = "COLLECTION")]
        collection: String,
        /// 文档 ID
        #[arg(value_name = "DOCUMENT_ID")]
        document_id: String,
        /// 快照 JSON 文件（省略时视为文档不存在）
        #[arg(value_name = "FILE")]
        file: Option<String>,
    },
}

impl Cli {
    /// 获取日志级别（考虑 verbose 和 quiet）
    pub fn get_log_level(&self) -> Option<String> {
        if self.quiet {
            return Some("error".to_string());
        }

        if self.dev {
            return Some("debug".to_string());
        }

        if let Some(level) = &self.log_level {
            return Some(level.clone());
        }

        match self.verbose {
            0 => None,
            1 => Some("info".to_string()),
            2 => Some("debug".to_string()),
            _ => Some("trace".to_string()),
        }
    }

    /// 获取日志格式
    pub fn get_log_format(&self) -> Option<String> {
        if self.dev {
            return Some("pretty".to_string());
        }
        self.log_format.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_subcommand() {
        let cli = <Cli as Parser>::parse_from([
            "push-relay",
            "trigger",
            "notifications",
            "abc",
            "snapshot.json",
        ]);
        match cli.command {
            Some(Commands::Trigger { collection, document_id, file }) => {
                assert_eq!(collection, "notifications");
                assert_eq!(document_id, "abc");
                assert_eq!(file.as_deref(), Some("snapshot.json"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_log_level_precedence() {
        let cli = <Cli as Parser>::parse_from(["push-relay", "-vv", "--log-level", "warn"]);
        assert_eq!(cli.get_log_level().as_deref(), Some("warn"));

        let cli = <Cli as Parser>::parse_from(["push-relay", "-vv"]);
        assert_eq!(cli.get_log_level().as_deref(), Some("debug"));

        let cli = <Cli as Parser>::parse_from(["push-relay", "--quiet", "--dev"]);
        assert_eq!(cli.get_log_level().as_deref(), Some("error"));
        assert_eq!(cli.get_log_format().as_deref(), Some("pretty"));
    }
}
