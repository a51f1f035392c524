//! ReAct 集成测试：工具往返、策略拦截、未知工具、步数上限

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use innsight::config::RetrievalSection;
    use innsight::core::AgentError;
    use innsight::db::{QueryBackend, SqlGateway, SqlRow};
    use innsight::llm::{MockLlmClient, Role};
    use innsight::react::{AgentToolbox, ReActController, MAX_AGENT_STEPS};
    use innsight::retrieval::{ContextRetriever, Document, SemanticIndex};

    /// 固定命中列表的索引替身
    struct FixedIndex {
        hits: Vec<(Document, f32)>,
    }

    #[async_trait]
    impl SemanticIndex for FixedIndex {
        async fn search(&self, _query: &str, k: usize) -> Result<Vec<(Document, f32)>, String> {
            Ok(self.hits.iter().take(k).cloned().collect())
        }
    }

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

    fn schema_doc(table: &str) -> (Document, f32) {
        let mut metadata = HashMap::new();
        metadata.insert("table_name".to_string(), table.to_string());
        metadata.insert(
            "table_structure".to_string(),
            format!("CREATE TABLE {} (id BIGINT)", table),
        );
        (
            Document {
                body: format!("{} 的描述", table),
                metadata,
            },
            0.4,
        )
    }

    fn controller(
        llm_script: Vec<String>,
        backend: Arc<ScriptedBackend>,
    ) -> ReActController {
        let retriever = Arc::new(ContextRetriever::new(
            Arc::new(FixedIndex { hits: vec![] }),
            Arc::new(FixedIndex {
                hits: vec![schema_doc("tb_room")],
            }),
            RetrievalSection::default(),
        ));
        let llm = Arc::new(MockLlmClient::with_responses(llm_script));
        ReActController::new(
            llm,
            AgentToolbox::new(Arc::new(SqlGateway::new(backend)), retriever),
            100795,
            1384,
        )
    }

    fn tool_json(tool: &str, args: serde_json::Value) -> String {
        serde_json::json!({ "tool": tool, "args": args }).to_string()
    }

    #[tokio::test]
    async fn retrieve_then_query_then_answer() {
        let mut row = BTreeMap::new();
        row.insert("state".to_string(), serde_json::json!(2));
        let backend = ScriptedBackend::new(vec![Ok(vec![row])]);

        let run = controller(
            vec![
                tool_json("search_context", serde_json::json!({"query": "房态"})),
                tool_json(
                    "execute_query",
                    serde_json::json!({"query": "SELECT state FROM tb_room"}),
                ),
                "当前共有 1 间房在住。".to_string(),
            ],
            backend.clone(),
        )
        .run("当前的房态情况如何")
        .await
        .unwrap();

        assert_eq!(run.answer, "当前共有 1 间房在住。");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        // system + user + 两轮 (assistant + observation) + 最终 assistant
        assert_eq!(run.transcript.len(), 7);
        assert_eq!(run.transcript[0].role, Role::System);
        assert!(run.transcript[3].content.starts_with("Observation from search_context:"));
        assert!(run.transcript[3].content.contains("tb_room"));
        assert!(run.transcript[5].content.starts_with("Observation from execute_query:"));
        assert!(run.transcript[5].content.contains("\"code\":0"));
    }

    #[tokio::test]
    async fn write_statement_is_blocked_inside_tool() {
        let backend = ScriptedBackend::new(vec![]);
        let run = controller(
            vec![
                tool_json(
                    "execute_query",
                    serde_json::json!({"query": "DELETE FROM tb_order"}),
                ),
                "该操作不被允许，我只能执行查询。".to_string(),
            ],
            backend.clone(),
        )
        .run("删掉所有订单")
        .await
        .unwrap();

        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        let observation = run
            .transcript
            .iter()
            .find(|m| m.content.starts_with("Observation from execute_query:"))
            .unwrap();
        assert!(observation.content.contains("\"code\":-2"));
        assert!(observation.content.contains("不允许篡改数据"));
        assert!(run.answer.contains("不被允许"));
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected_before_dispatch() {
        let backend = ScriptedBackend::new(vec![]);
        let run = controller(
            vec![
                tool_json("drop_database", serde_json::json!({})),
                "我没有这个能力。".to_string(),
            ],
            backend.clone(),
        )
        .run("格式化数据库")
        .await
        .unwrap();

        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        let observation = run
            .transcript
            .iter()
            .find(|m| m.content.starts_with("Observation from drop_database:"))
            .unwrap();
        assert!(observation.content.contains("未知工具"));
        assert_eq!(run.answer, "我没有这个能力。");
    }

    #[tokio::test]
    async fn step_cap_is_fatal() {
        let backend = ScriptedBackend::new(vec![]);
        let endless: Vec<String> = (0..MAX_AGENT_STEPS)
            .map(|_| tool_json("search_context", serde_json::json!({"query": "房态"})))
            .collect();

        let err = controller(endless, backend)
            .run("一直循环的问题")
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::ToolLoopExhausted(n) if n == MAX_AGENT_STEPS));
    }

    #[tokio::test]
    async fn broken_json_triggers_reprompt_then_answer() {
        let backend = ScriptedBackend::new(vec![]);
        let run = controller(
            vec![
                "{\"tool\": \"execute_query\", \"args\": ".to_string(),
                "直接回答：今天没有新订单。".to_string(),
            ],
            backend,
        )
        .run("今天有新订单吗")
        .await
        .unwrap();

        assert_eq!(run.answer, "直接回答：今天没有新订单。");
        assert!(run
            .transcript
            .iter()
            .any(|m| m.content.contains("JSON 格式错误")));
    }
}
