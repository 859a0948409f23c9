use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::runtime::Runtime;

use parapet_auth::decode;
use parapet_client::{
    ApiError, AuthApi, InMemoryCredentialStore, PermissionCheckRequest, PermissionCheckResponse,
    PermissionRefreshResponse, TokenRefreshResponse,
};
use parapet_engine::{
    AccessPatternEvent, AccessPatternRecorder, AuthEngine, CheckRequest, EngineConfig,
    PermissionLevel,
};

/// Allows everything immediately; isolates engine overhead from transport.
struct InstantAllow;

#[async_trait::async_trait]
impl AuthApi for InstantAllow {
    async fn check_permission(
        &self,
        _token: &str,
        _request: &PermissionCheckRequest,
    ) -> Result<PermissionCheckResponse, ApiError> {
        Ok(PermissionCheckResponse {
            allowed: true,
            ai_analysis: None,
        })
    }

    async fn refresh_permissions(
        &self,
        _token: &str,
    ) -> Result<PermissionRefreshResponse, ApiError> {
        Ok(PermissionRefreshResponse {
            permissions: vec![],
            ai_predictions: Default::default(),
            risk_profile: None,
        })
    }

    async fn log_access_pattern(
        &self,
        _token: &str,
        _event: &AccessPatternEvent,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn refresh_token(&self, _refresh: &str) -> Result<TokenRefreshResponse, ApiError> {
        Err(ApiError::Network("not under benchmark".to_string()))
    }

    async fn logout(&self, _token: &str, _refresh: &str) -> Result<(), ApiError> {
        Ok(())
    }
}

fn mint_token(level: &str) -> String {
    use base64::Engine;
    let now = Utc::now().timestamp();
    let payload = serde_json::json!({
        "user_id": "0191d5a8-5cb7-7d22-9bcd-3cf1e04c0f2b",
        "username": "bench",
        "email": "bench@example.com",
        "roles": ["analyst"],
        "permission_level": level,
        "is_staff": false,
        "is_superuser": false,
        "risk_profile": {
            "baseline": {"request_count": 100, "failure_count": 2, "success_rate": 0.98},
            "ai_risk_score": 0.2,
            "calculated_at": "2025-05-30T08:00:00Z",
        },
        "iat": now - 60,
        "exp": now + 3600,
    });
    let body = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .encode(serde_json::to_vec(&payload).unwrap());
    format!("h.{body}.s")
}

fn engine_for(rt: &Runtime, level: &str) -> AuthEngine {
    rt.block_on(async {
        let engine = AuthEngine::with_backends(
            EngineConfig::default(),
            Arc::new(InstantAllow),
            Arc::new(InMemoryCredentialStore::new()),
        );
        engine.login(mint_token(level), None).await.unwrap();
        engine
    })
}

fn bench_decision_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("decision_paths");
    group.sample_size(1000);

    // Denied locally: the request requires a level the session does not hold,
    // so no remote call happens.
    group.bench_function("local_denial", |b| {
        let rt = Runtime::new().unwrap();
        let engine = engine_for(&rt, "standard");
        b.iter(|| {
            let decision = rt.block_on(
                engine.check(
                    CheckRequest::new("finance_data", "view")
                        .with_required_level(PermissionLevel::EXECUTIVE_MAX),
                ),
            );
            black_box(decision)
        });
    });

    // Repeated identical operation: everything after the first iteration is
    // served from the verdict cache.
    group.bench_function("cached_verdict", |b| {
        let rt = Runtime::new().unwrap();
        let engine = engine_for(&rt, "management");
        rt.block_on(engine.check(CheckRequest::new("reports", "view")));
        b.iter(|| {
            let decision = rt.block_on(engine.check(CheckRequest::new("reports", "view")));
            black_box(decision)
        });
    });

    // Cache bypassed: every iteration walks the full remote path against the
    // in-process responder.
    group.bench_function("remote_verdict", |b| {
        let rt = Runtime::new().unwrap();
        let engine = engine_for(&rt, "management");
        b.iter(|| {
            let decision = rt.block_on(
                engine.check(CheckRequest::new("reports", "view").without_cache()),
            );
            black_box(decision)
        });
    });

    group.finish();
}

fn bench_token_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("token_decode");
    group.sample_size(1000);

    let token = mint_token("management");
    group.bench_function("decode_claims", |b| {
        b.iter(|| decode(black_box(&token)).unwrap());
    });

    group.finish();
}

fn bench_pattern_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern_analysis");
    group.throughput(Throughput::Elements(1));

    group.bench_function("record_event", |b| {
        let (recorder, _queue) = AccessPatternRecorder::new(100, 256);
        b.iter(|| {
            recorder.record(AccessPatternEvent::new(
                Utc::now(),
                "reports",
                "view",
                true,
                black_box(0.2),
            ));
        });
    });

    for buffer_size in [10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::new("summarize_window", buffer_size),
            buffer_size,
            |b, &size| {
                let (recorder, _queue) = AccessPatternRecorder::new(size, 256);
                for i in 0..size {
                    recorder.record(AccessPatternEvent::new(
                        Utc::now(),
                        "reports",
                        "view",
                        i % 7 != 0,
                        (i % 10) as f64 / 10.0,
                    ));
                }
                b.iter(|| black_box(recorder.summarize(Duration::minutes(5))));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_decision_paths,
    bench_token_decode,
    bench_pattern_analysis
);
criterion_main!(benches);
