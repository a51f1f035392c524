//! 流水线控制器：有界重试的显式状态机
//!
//! RETRIEVE -> GENERATE -> EXECUTE -> DECIDE -> {GENERATE | ANSWER} -> DONE。
//! 判定规则：无错误即成功；策略拦截直接放弃（不计重试）；
//! 其余执行失败累计 retry_times，满 MAX_SQL_RETRIES 即放弃。
//! 放弃不等于报错：两条放弃路径最终都走答案总结，向用户输出自然语言。

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::core::AgentError;
use crate::db::{QueryOutcome, SqlGateway, POLICY_VIOLATION_REASON};
use crate::pipeline::events::PipelineEvent;
use crate::pipeline::generator::SqlGenerator;
use crate::pipeline::state::{ConversationState, Decision, PipelineStep};
use crate::pipeline::synthesizer::AnswerSynthesizer;
use crate::retrieval::ContextRetriever;

/// SQL 重试预算：执行失败累计到该值即放弃
pub const MAX_SQL_RETRIES: u32 = 3;

/// 流水线控制器：组合四个组件，驱动一次完整问答
pub struct PipelineController {
    retriever: Arc<ContextRetriever>,
    generator: SqlGenerator,
    gateway: Arc<SqlGateway>,
    synthesizer: AnswerSynthesizer,
    event_tx: Option<UnboundedSender<PipelineEvent>>,
}

impl PipelineController {
    pub fn new(
        retriever: Arc<ContextRetriever>,
        generator: SqlGenerator,
        gateway: Arc<SqlGateway>,
        synthesizer: AnswerSynthesizer,
    ) -> Self {
        Self {
            retriever,
            generator,
            gateway,
            synthesizer,
            event_tx: None,
        }
    }

    /// 设置事件推送通道（CLI 据此打印每步进度）
    pub fn with_event_tx(mut self, tx: UnboundedSender<PipelineEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }

    /// 驱动状态机直到 DONE，返回完整状态（answer 字段即最终回答）
    pub async fn run(&self, question: &str) -> Result<ConversationState, AgentError> {
        let mut state = ConversationState::new(question);
        let mut step = PipelineStep::Retrieve;

        loop {
            match step {
                PipelineStep::Retrieve => {
                    self.emit(PipelineEvent::Retrieving);
                    let bundle = self.retriever.retrieve(&state.question).await;
                    let tables = bundle.schema_context.matches("表名：").count();
                    self.emit(PipelineEvent::ContextReady {
                        tables,
                        qa_examples: bundle.qa_examples.len(),
                    });
                    state.schema_context = bundle.schema_context;
                    state.qa_examples.extend(bundle.qa_examples);
                    step = PipelineStep::Generate;
                }
                PipelineStep::Generate => {
                    // 消费挂起的错误：追加进累积错误历史，供本次生成参考
                    if let Some(err) = state.error.take() {
                        state.error_prompt.push_str(&format!(
                            "第{}次生成的 SQL 执行报错了: \n报错内容：{} \n",
                            state.retry_times, err
                        ));
                    }
                    self.emit(PipelineEvent::Generating {
                        attempt: state.retry_times,
                    });
                    let sql = self
                        .generator
                        .generate(
                            &state.question,
                            &state.schema_context,
                            &state.qa_examples,
                            &state.error_prompt,
                        )
                        .await?;
                    self.emit(PipelineEvent::SqlReady { sql: sql.clone() });
                    state.sql_query = sql;
                    step = PipelineStep::Execute;
                }
                PipelineStep::Execute => {
                    self.emit(PipelineEvent::Executing);
                    match self.gateway.execute(&state.sql_query).await {
                        QueryOutcome::Rows(rows) => {
                            self.emit(PipelineEvent::RowsReady { count: rows.len() });
                            state.sql_result = Some(rows);
                            state.error = None;
                        }
                        QueryOutcome::PolicyViolation => {
                            state.sql_result = None;
                            state.error = Some(POLICY_VIOLATION_REASON.to_string());
                        }
                        QueryOutcome::ExecutionError(msg) => {
                            self.emit(PipelineEvent::ExecutionFailed { error: msg.clone() });
                            state.sql_result = None;
                            state.error = Some(msg);
                        }
                    }
                    step = PipelineStep::Decide;
                }
                PipelineStep::Decide => {
                    let decision = decide(&mut state);
                    self.emit(PipelineEvent::Decided {
                        outcome: decision.as_str(),
                    });
                    step = match decision {
                        Decision::Retry => PipelineStep::Generate,
                        Decision::Success | Decision::GiveUp => PipelineStep::Answer,
                    };
                }
                PipelineStep::Answer => {
                    self.emit(PipelineEvent::Answering {
                        enriched: AnswerSynthesizer::enriched(&state),
                    });
                    state.answer = self.synthesizer.summarize(&state).await?;
                    step = PipelineStep::Done;
                }
                PipelineStep::Done => {
                    self.emit(PipelineEvent::Done);
                    return Ok(state);
                }
            }
        }
    }
}

/// 执行后的判定；执行失败（策略拦截除外）在这里计数
fn decide(state: &mut ConversationState) -> Decision {
    let Some(error) = state.error.as_deref() else {
        return Decision::Success;
    };
    if error == POLICY_VIOLATION_REASON {
        // 硬停：策略拦截不计入重试，直接转入总结
        return Decision::GiveUp;
    }
    state.retry_times += 1;
    if state.retry_times >= MAX_SQL_RETRIES {
        tracing::warn!(retry_times = state.retry_times, "重试预算耗尽，放弃修正");
        Decision::GiveUp
    } else {
        tracing::info!(retry_times = state.retry_times, "检测到 SQL 错误，尝试自动修复");
        Decision::Retry
    }
}
