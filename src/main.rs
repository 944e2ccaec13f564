//! LingoDiff 命令行入口
//!
//! 提供三个子命令：`translate` 执行一次批量翻译运行（Ctrl-C 协作式取消），
//! `models` 列出当前凭据可用的模型，`init-config` 生成示例配置文件。

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use lingodiff::document::load_entry_pair;
use lingodiff::translation::pipeline::{BatchOrchestrator, TranslateMode};
use lingodiff::translation::provider::GenerativeClient;
use lingodiff::translation::storage::CheckpointWriter;
use lingodiff::translation::{Settings, TranslationError};

#[derive(Parser)]
#[command(name = "lingodiff", version, about = "保持 JSON locale 文件同步并批量 AI 翻译")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// 配置文件路径（默认按标准路径查找）
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// 翻译缺失或全部条目，并把进度逐批次写回目标文件
    Translate {
        /// 基准（源语言）JSON 文件
        #[arg(long)]
        base: PathBuf,
        /// 目标（译文）JSON 文件，检查点也写到这里
        #[arg(long)]
        target: PathBuf,
        /// 翻译模式
        #[arg(long, value_enum, default_value_t = ModeArg::Missing)]
        mode: ModeArg,
        /// 覆盖配置中的批次大小
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// 列出当前凭据可用的模型
    Models {
        /// 指定服务商（默认与翻译时的选择一致：Gemini 优先）
        #[arg(long, value_enum)]
        provider: Option<ProviderArg>,
    },
    /// 生成示例配置文件
    InitConfig {
        /// 输出路径
        #[arg(default_value = "lingodiff.toml")]
        path: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Missing,
    All,
}

impl From<ModeArg> for TranslateMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Missing => TranslateMode::Missing,
            ModeArg::All => TranslateMode::All,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderArg {
    Gemini,
    Openai,
}

#[tokio::main]
async fn main() {
    // 默认只显示告警以上的日志，进度另行输出；RUST_LOG 可放开
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("错误: {}", err);
            std::process::exit(2);
        }
    };

    let result = match cli.command {
        Command::Translate {
            base,
            target,
            mode,
            batch_size,
        } => run_translate(settings, base, target, mode.into(), batch_size).await,
        Command::Models { provider } => run_models(settings, provider).await,
        Command::InitConfig { path } => run_init_config(&path),
    };

    if let Err(err) = result {
        eprintln!("错误: {}", err);
        std::process::exit(1);
    }
}

async fn run_translate(
    mut settings: Settings,
    base: PathBuf,
    target: PathBuf,
    mode: TranslateMode,
    batch_size: Option<usize>,
) -> Result<(), TranslationError> {
    if let Some(size) = batch_size {
        settings.batch_size = size;
    }

    let profile = settings.resolve_provider()?;
    let entries = load_entry_pair(&base, &target)?;
    println!(
        "已载入 {} 个条目（{} → {}），模型 {}",
        entries.len(),
        base.display(),
        target.display(),
        profile.model
    );

    let client = GenerativeClient::new(profile);
    let mut orchestrator =
        BatchOrchestrator::new(client, settings, CheckpointWriter::new(&target));

    // Ctrl-C 置取消标志；在途批次完成后运行才退出，已保存进度不丢失
    let cancel = orchestrator.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n收到中断信号，将在当前批次结束后停止...");
            cancel.cancel();
        }
    });

    let mut progress = orchestrator.progress_updates();
    let printer = tokio::spawn(async move {
        while let Some(update) = progress.recv().await {
            println!("[{:3}%] {}", update.percent, update.status);
        }
    });

    let run_result = orchestrator.run(entries, mode).await;
    // 释放编排器以关闭进度通道，打印任务随之退出
    drop(orchestrator);
    let _ = printer.await;
    let outcome = run_result?;

    println!(
        "本次运行翻译 {} 条，目标文件已更新: {}",
        outcome.translated,
        target.display()
    );
    if outcome.cancelled {
        println!("运行被取消，已完成批次的进度均已保存。");
    }
    if let Some(err) = outcome.error {
        return Err(err);
    }
    Ok(())
}

async fn run_models(
    settings: Settings,
    provider: Option<ProviderArg>,
) -> Result<(), TranslationError> {
    // 指定服务商时屏蔽另一方的密钥，复用同一套凭据校验
    let settings = match provider {
        Some(ProviderArg::Gemini) => Settings {
            openai_api_key: None,
            ..settings
        },
        Some(ProviderArg::Openai) => Settings {
            gemini_api_key: None,
            ..settings
        },
        None => settings,
    };

    let profile = settings.resolve_provider()?;
    let kind = profile.kind;
    let client = GenerativeClient::new(profile);

    println!("{} 可用模型:", kind);
    for model in client.list_models().await {
        println!("  {}", model);
    }
    Ok(())
}

fn run_init_config(path: &std::path::Path) -> Result<(), TranslationError> {
    if path.exists() {
        return Err(TranslationError::ConfigError(format!(
            "{} 已存在，不会覆盖",
            path.display()
        )));
    }
    Settings::generate_example(path)?;
    println!("已生成示例配置文件: {}", path.display());
    Ok(())
}
