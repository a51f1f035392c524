//! Innsight - ReAct 问答入口
//!
//! 用法：`innsight-agent 当前的房态情况如何`；
//! 模型自主决定先检索表结构还是直接查库，过程日志逐步输出。

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use innsight::config::load_config;
use innsight::core::{build_gateway, build_llm, build_retriever};
use innsight::react::{AgentEvent, AgentToolbox, ReActController};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();

    let cfg = load_config(None).context("配置加载失败")?;

    let question: String = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let question = if question.trim().is_empty() {
        "当前的房态情况如何".to_string()
    } else {
        question
    };

    let llm = build_llm(&cfg);
    let retriever = build_retriever(&cfg).await.context("检索器初始化失败")?;
    let gateway = build_gateway(&cfg).await.context("数据库初始化失败")?;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let controller = ReActController::new(
        llm.clone(),
        AgentToolbox::new(gateway, retriever),
        cfg.app.hotel_id,
        cfg.app.user_id,
    )
    .with_event_tx(tx);

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event(&event);
        }
    });

    tracing::info!("====== 开始运行 Agent ======");
    let run = controller.run(&question).await?;
    drop(controller);
    printer.await?;
    tracing::info!("====== 运行结束 ======");

    println!("\n=== 最终回答 ===");
    println!("{}", run.answer);

    let (prompt, completion, total) = llm.token_usage();
    tracing::info!(prompt, completion, total, "token 用量");
    Ok(())
}

fn print_event(event: &AgentEvent) {
    match event {
        AgentEvent::Thinking { step, max_steps } => {
            tracing::debug!(step, max_steps, "模型思考中")
        }
        AgentEvent::ModelText { text } => println!("[AI 回答]: {}", text),
        AgentEvent::ToolCall { tool, args } => println!("[调用工具] {}: {}", tool, args),
        AgentEvent::Observation { tool, preview } => {
            println!("[工具返回] {}: {}...", tool, preview)
        }
        AgentEvent::Reprompt { reason } => println!("[纠偏] {}", reason),
        AgentEvent::Done => {}
    }
}
