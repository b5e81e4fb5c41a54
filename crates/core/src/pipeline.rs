use crate::batch::{classify, CompanyDescriptor, ExclusionPolicy};
use crate::config::Settings;
use crate::context;
use crate::domain::company::ResolvedCompany;
use crate::domain::persona::{PersonaId, PersonaTemplate};
use crate::domain::profile::UserProfile;
use crate::domain::prompt::PromptContext;
use crate::domain::record::EnrichedRecord;
use crate::enrich::enrich;
use crate::llm::{self, CompletionGateway, GatewayError};
use crate::resolve::IdentifierResolver;
use crate::store::{self, FetchOutcome, RecordStore};
use crate::time::kst::today_kst;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const EMPTY_MESSAGE_REPLY: &str = "메시지를 입력해주세요.";
pub const GATEWAY_FAILURE_REPLY: &str = "API 호출 중 오류가 발생했습니다.";
pub const EMPTY_BATCH_REPLY: &str = "분석할 종목 목록을 입력해주세요.";
const DEFAULT_BATCH_INSTRUCTION: &str = "위 종목들을 정해진 형식에 맞춰 분석해줘.";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub persona: Option<PersonaId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub companies: Vec<CompanyDescriptor>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degradation {
    InputValidation,
    ResolutionMiss,
    SoftFetchFailure(String),
    GatewayFailure(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub reply: String,
    #[serde(flatten)]
    pub data: EnrichedRecord,
    #[serde(skip)]
    pub degradations: Vec<Degradation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReply {
    pub reply: String,
    #[serde(skip)]
    pub degradations: Vec<Degradation>,
}

pub struct Pipeline {
    resolver: IdentifierResolver,
    store: Arc<dyn RecordStore>,
    gateway: Arc<dyn CompletionGateway>,
    model: String,
    default_persona: PersonaId,
    timeout: Duration,
    exclusion: ExclusionPolicy,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn RecordStore>,
        gateway: Arc<dyn CompletionGateway>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            resolver: IdentifierResolver::default(),
            store,
            gateway,
            model: model.into(),
            default_persona: PersonaId::default(),
            timeout: DEFAULT_TIMEOUT,
            exclusion: ExclusionPolicy::default(),
        }
    }

    /// Wires the configured record backend and gateway.
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let store = store::from_settings(settings).await?;
        let gateway = llm::gateway_from_settings(settings)?;
        let model = llm::model_for(settings, gateway.as_ref());

        let mut pipeline = Self::new(store, gateway, model).with_timeout(settings.llm_timeout);
        if let Some(p) = settings.default_persona.as_deref().filter(|s| !s.trim().is_empty()) {
            pipeline = pipeline.with_default_persona(p.parse()?);
        }

        tracing::info!(
            backend = pipeline.store.backend_name(),
            provider = %pipeline.gateway.provider(),
            model = %pipeline.model,
            persona = pipeline.default_persona.as_str(),
            persona_version = PersonaTemplate::get(pipeline.default_persona).version,
            "pipeline ready"
        );
        Ok(pipeline)
    }

    pub fn with_default_persona(mut self, persona: PersonaId) -> Self {
        self.default_persona = persona;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn answer(&self, req: ChatRequest, profile: UserProfile) -> ChatReply {
        self.answer_at(req, profile, today_kst()).await
    }

    /// [`Pipeline::answer`] with the trailing-return reference date supplied by the caller.
    pub async fn answer_at(&self, req: ChatRequest, profile: UserProfile, today: NaiveDate) -> ChatReply {
        if req.message.trim().is_empty() {
            return ChatReply {
                reply: EMPTY_MESSAGE_REPLY.to_string(),
                data: EnrichedRecord::default(),
                degradations: vec![Degradation::InputValidation],
            };
        }

        let mut degradations = Vec::new();
        let company = self.resolver.resolve(&req.message);
        let record = match &company {
            Some(company) => self.lookup(company, today, &mut degradations).await,
            None => {
                tracing::debug!("no company identifier in message");
                degradations.push(Degradation::ResolutionMiss);
                None
            }
        };

        let persona = req.persona.unwrap_or(self.default_persona);
        let ctx = context::assemble(
            persona,
            profile,
            company.as_ref(),
            record.as_ref(),
            &req.message,
        );

        let reply = self.complete(ctx, &mut degradations).await;
        ChatReply {
            reply,
            data: record.unwrap_or_default(),
            degradations,
        }
    }

    pub async fn summarize_batch(&self, req: BatchRequest, profile: UserProfile) -> BatchReply {
        if req.companies.is_empty() {
            return BatchReply {
                reply: EMPTY_BATCH_REPLY.to_string(),
                degradations: vec![Degradation::InputValidation],
            };
        }

        let classification = classify(req.companies, &self.exclusion);
        tracing::info!(
            total = classification.len(),
            excluded = classification.excluded().count(),
            "batch classified"
        );

        let instruction = req
            .message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_BATCH_INSTRUCTION);
        let ctx = context::assemble_batch(profile, &classification, instruction);

        let mut degradations = Vec::new();
        let reply = self.complete(ctx, &mut degradations).await;
        BatchReply {
            reply,
            degradations,
        }
    }

    async fn lookup(
        &self,
        company: &ResolvedCompany,
        today: NaiveDate,
        degradations: &mut Vec<Degradation>,
    ) -> Option<EnrichedRecord> {
        match self.store.fetch(&company.key).await {
            Ok(FetchOutcome::Found(record)) => Some(enrich(&record, today)),
            Ok(FetchOutcome::NotFound) => {
                tracing::warn!(key = %company.key, backend = self.store.backend_name(), "company not found in record store");
                degradations.push(Degradation::SoftFetchFailure(format!("{} not found", company.key)));
                None
            }
            Err(err) => {
                tracing::warn!(key = %company.key, backend = self.store.backend_name(), error = %err, "record fetch failed; continuing without data");
                degradations.push(Degradation::SoftFetchFailure(err.to_string()));
                None
            }
        }
    }

    async fn complete(&self, ctx: PromptContext, degradations: &mut Vec<Degradation>) -> String {
        let call = self.gateway.complete(&self.model, ctx);
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(res) => res,
            Err(_) => Err(GatewayError::Timeout(self.timeout)),
        };

        match result {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(provider = %self.gateway.provider(), model = %self.model, error = %err, "completion failed");
                degradations.push(Degradation::GatewayFailure(err.to_string()));
                GATEWAY_FAILURE_REPLY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::company::CompanyKey;
    use crate::domain::prompt::Role;
    use crate::domain::record::FinancialRecord;
    use crate::llm::Provider;
    use crate::store::StoreError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum StoreBehavior {
        Found(FinancialRecord),
        NotFound,
        Fail,
    }

    struct FakeStore {
        behavior: StoreBehavior,
        calls: AtomicUsize,
        keys: Mutex<Vec<CompanyKey>>,
    }

    impl FakeStore {
        fn new(behavior: StoreBehavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
                keys: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl RecordStore for FakeStore {
        fn backend_name(&self) -> &'static str {
            "fake"
        }

        async fn fetch(&self, key: &CompanyKey) -> Result<FetchOutcome, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.keys.lock().unwrap().push(key.clone());
            match &self.behavior {
                StoreBehavior::Found(r) => Ok(FetchOutcome::Found(r.clone())),
                StoreBehavior::NotFound => Ok(FetchOutcome::NotFound),
                StoreBehavior::Fail => Err(StoreError::Http {
                    status: 503,
                    body: "unavailable".into(),
                }),
            }
        }
    }

    enum GatewayBehavior {
        Reply(&'static str),
        Fail,
        Hang,
    }

    struct FakeGateway {
        behavior: GatewayBehavior,
        calls: AtomicUsize,
        contexts: Mutex<Vec<PromptContext>>,
    }

    impl FakeGateway {
        fn new(behavior: GatewayBehavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
                contexts: Mutex::new(Vec::new()),
            })
        }

        fn last_context(&self) -> PromptContext {
            self.contexts.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl CompletionGateway for FakeGateway {
        fn provider(&self) -> Provider {
            Provider::OpenAI
        }

        fn default_model(&self) -> &str {
            "fake-model"
        }

        async fn complete(&self, _model: &str, context: PromptContext) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.contexts.lock().unwrap().push(context);
            match self.behavior {
                GatewayBehavior::Reply(s) => Ok(s.to_string()),
                GatewayBehavior::Fail => Err(GatewayError::Http {
                    provider: Provider::OpenAI,
                    status: 500,
                    body: "boom".into(),
                }),
                GatewayBehavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok("late".into())
                }
            }
        }
    }

    fn pipeline(store: Arc<FakeStore>, gateway: Arc<FakeGateway>) -> Pipeline {
        Pipeline::new(store, gateway, "fake-model")
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
    }

    fn chat(message: &str) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            persona: None,
        }
    }

    fn assert_persona_first_user_last(ctx: &PromptContext, message: &str) {
        let segments = ctx.segments();
        assert!(segments.len() >= 2);
        assert_eq!(segments[0].role, Role::System);
        assert!(segments[0].content.contains("사용자 투자 성향"));
        let last = segments.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content, message);
    }

    #[tokio::test]
    async fn store_and_gateway_failure_still_replies() {
        let store = FakeStore::new(StoreBehavior::Fail);
        let gateway = FakeGateway::new(GatewayBehavior::Fail);
        let p = pipeline(store.clone(), gateway.clone());

        let out = p.answer_at(chat("삼성전자 어때?"), UserProfile::Balanced, today()).await;

        assert_eq!(out.reply, GATEWAY_FAILURE_REPLY);
        assert_eq!(out.data, EnrichedRecord::default());
        assert_eq!(store.keys.lock().unwrap()[0].as_str(), "005930.KS");
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(out.degradations[0], Degradation::SoftFetchFailure(_)));
        assert!(matches!(out.degradations[1], Degradation::GatewayFailure(_)));
        assert_persona_first_user_last(&gateway.last_context(), "삼성전자 어때?");

        let body = serde_json::to_value(&out).unwrap();
        assert_eq!(body["reply"], GATEWAY_FAILURE_REPLY);
        assert_eq!(body["per"], json!(null));
        assert_eq!(body["max_loss_3y"], json!(null));
        assert!(body.get("degradations").is_none());
    }

    #[tokio::test]
    async fn bare_numeric_code_defaults_to_primary_market() {
        let store = FakeStore::new(StoreBehavior::NotFound);
        let gateway = FakeGateway::new(GatewayBehavior::Reply("ok"));
        let p = pipeline(store.clone(), gateway.clone());

        let out = p.answer_at(chat("123456"), UserProfile::Balanced, today()).await;

        assert_eq!(out.reply, "ok");
        assert_eq!(store.keys.lock().unwrap()[0].as_str(), "123456.KS");
        let ctx = gateway.last_context();
        assert!(ctx.segments()[1].content.contains("123456.KS"));
        assert!(ctx.segments()[1].content.contains("재무 데이터를 불러오지 못했습니다"));
    }

    #[tokio::test]
    async fn blank_message_makes_no_calls() {
        let store = FakeStore::new(StoreBehavior::NotFound);
        let gateway = FakeGateway::new(GatewayBehavior::Reply("ok"));
        let p = pipeline(store.clone(), gateway.clone());

        for msg in ["", "   \n\t"] {
            let out = p.answer_at(chat(msg), UserProfile::Aggressive, today()).await;
            assert_eq!(out.reply, EMPTY_MESSAGE_REPLY);
            assert_eq!(out.data, EnrichedRecord::default());
            assert_eq!(out.degradations, vec![Degradation::InputValidation]);
        }
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn found_record_is_enriched_into_reply() {
        let record = FinancialRecord {
            symbol: Some("005930.KS".into()),
            name: Some("삼성전자".into()),
            per: Some(13.2),
            roe: Some(0.15),
            ..FinancialRecord::empty()
        };
        let store = FakeStore::new(StoreBehavior::Found(record));
        let gateway = FakeGateway::new(GatewayBehavior::Reply("분석 결과"));
        let p = pipeline(store, gateway.clone()).with_default_persona(PersonaId::EducationalExplainer);

        let out = p.answer_at(chat("삼성전자 어때?"), UserProfile::Conservative, today()).await;

        assert_eq!(out.reply, "분석 결과");
        assert_eq!(out.data.roe, Some(15.0));
        assert_eq!(out.data.name.as_deref(), Some("삼성전자"));
        assert!(out.degradations.is_empty());

        let ctx = gateway.last_context();
        assert_persona_first_user_last(&ctx, "삼성전자 어때?");
        assert!(ctx.segments()[0].content.contains("안정형"));
        assert!(ctx.segments()[0].content.contains("📘 [개념 설명]"));
        assert!(ctx.segments().iter().any(|s| s.content.contains("[지표 해석]")));
    }

    #[tokio::test]
    async fn unresolved_message_skips_store() {
        let store = FakeStore::new(StoreBehavior::NotFound);
        let gateway = FakeGateway::new(GatewayBehavior::Reply("일반 답변"));
        let p = pipeline(store.clone(), gateway.clone());

        let out = p.answer_at(chat("요즘 시장 어때?"), UserProfile::Balanced, today()).await;

        assert_eq!(out.reply, "일반 답변");
        assert_eq!(out.degradations, vec![Degradation::ResolutionMiss]);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        let ctx = gateway.last_context();
        assert_eq!(ctx.segments().len(), 2);
        assert_persona_first_user_last(&ctx, "요즘 시장 어때?");
    }

    #[tokio::test]
    async fn gateway_timeout_is_a_soft_failure() {
        let store = FakeStore::new(StoreBehavior::NotFound);
        let gateway = FakeGateway::new(GatewayBehavior::Hang);
        let p = pipeline(store, gateway).with_timeout(Duration::from_millis(20));

        let out = p.answer_at(chat("카카오"), UserProfile::Balanced, today()).await;
        assert_eq!(out.reply, GATEWAY_FAILURE_REPLY);
        assert!(out
            .degradations
            .iter()
            .any(|d| matches!(d, Degradation::GatewayFailure(m) if m.contains("timed out"))));
    }

    #[tokio::test]
    async fn batch_enumerates_every_company() {
        let store = FakeStore::new(StoreBehavior::NotFound);
        let gateway = FakeGateway::new(GatewayBehavior::Reply("표"));
        let p = pipeline(store.clone(), gateway.clone());

        let companies: Vec<CompanyDescriptor> = serde_json::from_value(json!([
            {"name": "삼성전자", "main_products": "반도체"},
            {"name": "부실기업", "distressed": true},
            {"name": "카카오"},
        ]))
        .unwrap();
        let out = p
            .summarize_batch(
                BatchRequest {
                    companies,
                    message: None,
                },
                UserProfile::Balanced,
            )
            .await;

        assert_eq!(out.reply, "표");
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        let ctx = gateway.last_context();
        assert_eq!(ctx.segments().len(), 3);
        assert!(ctx.segments()[0].content.contains("📦 [제품 설명]"));
        let listing = &ctx.segments()[1].content;
        assert!(listing.contains("총 3개"));
        for name in ["1. 삼성전자", "2. 부실기업 [제외]", "3. 카카오"] {
            assert!(listing.contains(name), "{name}");
        }
        assert_eq!(ctx.segments()[2].content, DEFAULT_BATCH_INSTRUCTION);
    }

    #[tokio::test]
    async fn empty_batch_makes_no_calls() {
        let store = FakeStore::new(StoreBehavior::NotFound);
        let gateway = FakeGateway::new(GatewayBehavior::Reply("표"));
        let p = pipeline(store, gateway.clone());

        let out = p.summarize_batch(BatchRequest::default(), UserProfile::Balanced).await;
        assert_eq!(out.reply, EMPTY_BATCH_REPLY);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }
}
