//! Innsight - 流水线问答入口
//!
//! 用法：`innsight 八月十八号酒店收入多少`；
//! 运行期间逐步打印检索 / 生成 / 执行 / 判定进度，最后输出自然语言回答。

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use innsight::config::load_config;
use innsight::core::{build_gateway, build_llm, build_retriever};
use innsight::pipeline::{AnswerSynthesizer, PipelineController, PipelineEvent, SqlGenerator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();

    let cfg = load_config(None).context("配置加载失败")?;

    let question: String = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let question = if question.trim().is_empty() {
        "八月十八号酒店收入多少".to_string()
    } else {
        question
    };

    let llm = build_llm(&cfg);
    let retriever = build_retriever(&cfg).await.context("检索器初始化失败")?;
    let gateway = build_gateway(&cfg).await.context("数据库初始化失败")?;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let controller = PipelineController::new(
        retriever,
        SqlGenerator::new(llm.clone(), cfg.app.hotel_id, cfg.app.user_id),
        gateway,
        AnswerSynthesizer::new(llm.clone()),
    )
    .with_event_tx(tx);

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event(&event);
        }
    });

    let state = controller.run(&question).await?;
    drop(controller);
    printer.await?;

    println!("\n=== 最终回答 ===");
    println!("{}", state.answer);

    let (prompt, completion, total) = llm.token_usage();
    tracing::info!(prompt, completion, total, "token 用量");
    Ok(())
}

fn print_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::Retrieving => println!("--- 正在检索表结构 ---"),
        PipelineEvent::ContextReady { tables, qa_examples } => {
            println!("命中表结构 {} 张，问答示例 {} 条", tables, qa_examples)
        }
        PipelineEvent::Generating { attempt } => {
            if *attempt == 0 {
                println!("--- 正在生成 SQL ---");
            } else {
                println!("--- 正在生成 SQL（第 {} 次修正）---", attempt);
            }
        }
        PipelineEvent::SqlReady { sql } => println!("{}", sql),
        PipelineEvent::Executing => println!("--- 正在执行 SQL ---"),
        PipelineEvent::RowsReady { count } => println!("查询到 {} 行", count),
        PipelineEvent::ExecutionFailed { error } => println!("!!! SQL 执行报错: {}", error),
        PipelineEvent::Decided { outcome } => match *outcome {
            "retry" => println!("!!! 检测到 SQL 错误，尝试自动修复 !!!"),
            "give_up" => println!("--- 放弃修正，转入答案整理 ---"),
            _ => {}
        },
        PipelineEvent::Answering { .. } => println!("--- 正在整理最终答案 ---"),
        PipelineEvent::Done => {}
    }
}
