//! AEX - 智能体交换平台
//!
//! 入口：初始化日志与编排器。命令行参数作为一次任务执行；无参数时逐行读取标准输入，每行一个任务。
//! 退出前落盘向量缓存。

use std::path::PathBuf;

use aex::core::{create_exchange_builder, ExchangeOrchestrator};
use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    aex::observability::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let config_path = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => {
            let path = PathBuf::from(args.remove(i + 1));
            args.remove(i);
            Some(path)
        }
        _ => None,
    };

    let orchestrator = create_exchange_builder(config_path).build().await;

    let outcome = if args.is_empty() {
        run_stdin(&orchestrator).await
    } else {
        run_one(&orchestrator, &args.join(" ")).await
    };

    let flushed = orchestrator
        .shutdown()
        .await
        .context("Failed to flush embedding cache");
    outcome?;
    flushed
}

async fn run_one(orchestrator: &ExchangeOrchestrator, task: &str) -> anyhow::Result<()> {
    let outcome = orchestrator
        .run_task(task)
        .await
        .context("Task could not be routed")?;

    let caps: Vec<&str> = outcome
        .task
        .required_capabilities()
        .iter()
        .map(|s| s.as_str())
        .collect();
    println!("所需能力 ({}): {}", outcome.method.as_str(), caps.join(", "));
    match &outcome.selected {
        Some(best) => println!("选中 Hub: {} ({:.2})", best.hub.name, best.score),
        None => println!("没有可用的 Hub"),
    }
    match outcome.result {
        Some(result) => println!("\n{}", result),
        None => println!("任务执行失败或没有结果"),
    }
    Ok(())
}

async fn run_stdin(orchestrator: &ExchangeOrchestrator) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let task = line.trim();
        if task.is_empty() {
            continue;
        }
        if matches!(task, "quit" | "exit" | "q") {
            break;
        }
        run_one(orchestrator, task).await?;
    }
    Ok(())
}
