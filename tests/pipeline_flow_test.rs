//! 流水线集成测试：四种典型走向（成功 / 策略拦截 / 修正后成功 / 预算耗尽）

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use innsight::config::RetrievalSection;
    use innsight::db::{QueryBackend, SqlGateway, SqlRow, POLICY_VIOLATION_REASON};
    use innsight::llm::MockLlmClient;
    use innsight::pipeline::{
        AnswerSynthesizer, PipelineController, PipelineEvent, SqlGenerator,
    };
    use innsight::retrieval::{ContextRetriever, Document, SemanticIndex};

    /// 零命中索引
    struct EmptyIndex;

    #[async_trait]
    impl SemanticIndex for EmptyIndex {
        async fn search(&self, _query: &str, _k: usize) -> Result<Vec<(Document, f32)>, String> {
            Ok(Vec::new())
        }
    }

    /// 脚本化后端：按序弹出预设结果，并统计被调用次数
    struct ScriptedBackend {
        calls: AtomicUsize,
        script: Mutex<VecDeque<Result<Vec<SqlRow>, String>>>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<Vec<SqlRow>, String>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(script.into_iter().collect()),
            })
        }
    }

    #[async_trait]
    impl QueryBackend for ScriptedBackend {
        async fn fetch_rows(&self, _sql: &str) -> Result<Vec<SqlRow>, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn rows(n: usize) -> Vec<SqlRow> {
        (0..n)
            .map(|i| {
                let mut row = BTreeMap::new();
                row.insert("id".to_string(), serde_json::json!(i as i64));
                row
            })
            .collect()
    }

    fn retriever() -> Arc<ContextRetriever> {
        Arc::new(ContextRetriever::new(
            Arc::new(EmptyIndex),
            Arc::new(EmptyIndex),
            RetrievalSection::default(),
        ))
    }

    /// 组装控制器：llm 脚本与后端脚本各自按序消费
    fn controller(
        llm_script: Vec<&str>,
        backend: Arc<ScriptedBackend>,
    ) -> (
        PipelineController,
        tokio::sync::mpsc::UnboundedReceiver<PipelineEvent>,
    ) {
        let llm = Arc::new(MockLlmClient::with_responses(llm_script));
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let controller = PipelineController::new(
            retriever(),
            SqlGenerator::new(llm.clone(), 100795, 1384),
            Arc::new(SqlGateway::new(backend)),
            AnswerSynthesizer::new(llm),
        )
        .with_event_tx(tx);
        (controller, rx)
    }

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<PipelineEvent>) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    #[tokio::test]
    async fn scenario_success_first_try() {
        let backend = ScriptedBackend::new(vec![Ok(rows(3))]);
        let (controller, mut rx) = controller(
            vec!["SELECT * FROM tb_order LIMIT 3", "共查询到 3 条订单记录"],
            backend.clone(),
        );

        let state = controller.run("最近三笔订单").await.unwrap();

        assert_eq!(state.retry_times, 0);
        assert_eq!(state.answer, "共查询到 3 条订单记录");
        assert_eq!(state.sql_result.as_ref().unwrap().len(), 3);
        assert!(state.error.is_none());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        // 成功路径的总结应附带 SQL 与表结构
        let enriched = drain(&mut rx).iter().any(|ev| {
            matches!(ev, PipelineEvent::Answering { enriched: true })
        });
        assert!(enriched);
    }

    #[tokio::test]
    async fn scenario_policy_violation_hard_stop() {
        let backend = ScriptedBackend::new(vec![]);
        let (controller, mut rx) = controller(
            vec!["DROP TABLE tb_order", "抱歉，系统只允许查询，不能修改数据"],
            backend.clone(),
        );

        let state = controller.run("把订单表删了").await.unwrap();

        // 后端从未被触达，重试计数不动，仍然产出自然语言回答
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(state.retry_times, 0);
        assert_eq!(state.error.as_deref(), Some(POLICY_VIOLATION_REASON));
        assert!(state.answer.contains("不能修改"));

        let gave_up = drain(&mut rx).iter().any(|ev| {
            matches!(ev, PipelineEvent::Decided { outcome: "give_up" })
        });
        assert!(gave_up);
    }

    #[tokio::test]
    async fn scenario_two_failures_then_success() {
        let backend = ScriptedBackend::new(vec![
            Err("Unknown column 'amout' in 'field list'".to_string()),
            Err("You have an error in your SQL syntax".to_string()),
            Ok(rows(1)),
        ]);
        let (controller, mut rx) = controller(
            vec![
                "SELECT amout FROM tb_bill",
                "SELECT SUM(income FROM tb_bill",
                "SELECT SUM(income) AS total FROM tb_bill",
                "昨日收入合计 3200 元",
            ],
            backend.clone(),
        );

        let state = controller.run("昨日收入多少").await.unwrap();

        assert_eq!(state.retry_times, 2);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert_eq!(state.answer, "昨日收入合计 3200 元");

        // 两条错误按序累积，内容不被覆盖
        assert_eq!(state.error_prompt.matches("生成的 SQL 执行报错了").count(), 2);
        let first = state.error_prompt.find("第1次").unwrap();
        let second = state.error_prompt.find("第2次").unwrap();
        assert!(first < second);
        assert!(state.error_prompt.contains("Unknown column"));
        assert!(state.error_prompt.contains("SQL syntax"));

        let enriched = drain(&mut rx).iter().any(|ev| {
            matches!(ev, PipelineEvent::Answering { enriched: true })
        });
        assert!(enriched);
    }

    #[tokio::test]
    async fn scenario_budget_exhausted_gives_up() {
        let backend = ScriptedBackend::new(vec![
            Err("error 1".to_string()),
            Err("error 2".to_string()),
            Err("error 3".to_string()),
        ]);
        let (controller, mut rx) = controller(
            vec![
                "SELECT bad_1",
                "SELECT bad_2",
                "SELECT bad_3",
                "抱歉，多次尝试后仍未能查询成功",
            ],
            backend.clone(),
        );

        let state = controller.run("查不动的问题").await.unwrap();

        assert_eq!(state.retry_times, 3);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert!(!state.answer.is_empty());
        assert!(state.sql_result.is_none());
        // 第三条错误未被下一次生成消费，留在现场供总结使用
        assert_eq!(state.error.as_deref(), Some("error 3"));
        // 两次重试对应两条累积错误
        assert_eq!(state.error_prompt.matches("生成的 SQL 执行报错了").count(), 2);

        // 预算耗尽时总结不附带 SQL 与表结构
        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|ev| matches!(ev, PipelineEvent::Answering { enriched: false })));
        assert!(events
            .iter()
            .any(|ev| matches!(ev, PipelineEvent::Decided { outcome: "give_up" })));
    }

    #[tokio::test]
    async fn zero_hits_still_produce_answer() {
        let backend = ScriptedBackend::new(vec![Ok(Vec::new())]);
        let (controller, _rx) = controller(
            vec!["SELECT 1", "没有查询到相关数据"],
            backend.clone(),
        );

        let state = controller.run("毫无命中的问题").await.unwrap();

        assert!(state.schema_context.is_empty());
        assert!(state.qa_examples.is_empty());
        assert!(!state.answer.is_empty());
    }
}
