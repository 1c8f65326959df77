//! REST API for the packing engine.
//!
//! Exposes container creation, single steps, full runs, item generation,
//! annealing and the strategy benchmark over HTTP. Uses Axum as the web
//! framework and supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::ops::ControlFlow;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

use crate::annealing::{
    AnnealingRecord, OptimizationResult, optimize_cooperative, optimize_with_progress,
};
use crate::benchmark::{StrategyBenchmark, benchmark_strategies_cooperative};
use crate::config::{ApiConfig, EngineConfig};
use crate::error::{ValidationError, validate_dimensions_3d, validate_ratio};
use crate::generator::{GeneratorConfig, generate_items};
use crate::model::{Item, Rotation};
use crate::packer::{
    PackEvent, PackingConfig, PackingState, SpaceHeuristic, Strategy, run_to_completion,
    run_to_completion_with_progress, step,
};
use crate::space::{Space, SpaceIdSequence, create_container};
use crate::types::{Dimensions, Vec3};

#[derive(Clone)]
struct ApiState {
    engine: EngineConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>ems_pack API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Short item form: original dimensions plus an optional rotation index.
#[derive(Deserialize, Clone, ToSchema)]
#[schema(example = json!({ "id": 1, "dims": [2000.0, 1000.0, 1000.0], "rotation": 0 }))]
pub struct ItemRequest {
    pub id: usize,
    #[schema(value_type = [f64; 3], example = json!([2000.0, 1000.0, 1000.0]))]
    pub dims: (f64, f64, f64),
    #[serde(default)]
    #[schema(nullable = true, minimum = 0, maximum = 5)]
    pub rotation: Option<u8>,
}

impl ItemRequest {
    fn into_item(self) -> Result<Item, ValidationError> {
        let item = Item::new(self.id, self.dims)?;
        match self.rotation {
            Some(index) => Ok(item.rotated(Rotation::try_from(index)?)),
            None => Ok(item),
        }
    }
}

/// Accepts both full items (as returned by `/generate` or `/optimize`) and
/// the short request form.
#[derive(Deserialize, Clone, ToSchema)]
#[serde(untagged)]
pub enum ItemInput {
    Full(Item),
    Short(ItemRequest),
}

impl ItemInput {
    fn into_item(self) -> Result<Item, ValidationError> {
        match self {
            ItemInput::Full(item) => item.validated(),
            ItemInput::Short(request) => request.into_item(),
        }
    }
}

fn into_items(inputs: Vec<ItemInput>) -> Result<Vec<Item>, ValidationError> {
    inputs.into_iter().map(ItemInput::into_item).collect()
}

#[derive(Deserialize, ToSchema)]
#[schema(example = json!({ "dims": [5870.0, 2330.0, 2200.0] }))]
pub struct ContainerRequest {
    #[serde(default)]
    #[schema(value_type = Option<[f64; 3]>, nullable = true)]
    pub dims: Option<(f64, f64, f64)>,
}

#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "items": [
            { "id": 1, "dims": [2000.0, 1000.0, 1000.0] },
            { "id": 2, "dims": [1000.0, 1000.0, 1000.0] }
        ],
        "container": [5870.0, 2330.0, 2200.0],
        "strategy": "first_fit_decreasing",
        "support_threshold": 0.6,
        "heuristic": "lowest_smallest"
    })
)]
pub struct PackRequest {
    pub items: Vec<ItemInput>,
    #[serde(default)]
    #[schema(value_type = Option<[f64; 3]>, nullable = true)]
    pub container: Option<(f64, f64, f64)>,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    #[schema(nullable = true)]
    pub support_threshold: Option<f64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub heuristic: Option<SpaceHeuristic>,
}

/// Single placement step on a caller-held state.
#[derive(Deserialize, ToSchema)]
pub struct StepRequest {
    pub state: PackingState,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    #[schema(nullable = true)]
    pub support_threshold: Option<f64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub heuristic: Option<SpaceHeuristic>,
}

#[derive(Deserialize, Default, ToSchema)]
#[schema(example = json!({ "item_count": 20, "min_side": 300.0, "seed": 7 }))]
pub struct GenerateRequest {
    #[serde(default)]
    #[schema(value_type = Option<[f64; 3]>, nullable = true)]
    pub container: Option<(f64, f64, f64)>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub item_count: Option<usize>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub min_side: Option<f64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub seed: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct OptimizeRequest {
    pub items: Vec<ItemInput>,
    #[serde(default)]
    #[schema(value_type = Option<[f64; 3]>, nullable = true)]
    pub container: Option<(f64, f64, f64)>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub iterations: Option<usize>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub support_threshold: Option<f64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub seed: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct BenchmarkRequest {
    pub items: Vec<ItemInput>,
    #[serde(default)]
    #[schema(value_type = Option<[f64; 3]>, nullable = true)]
    pub container: Option<(f64, f64, f64)>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub support_threshold: Option<f64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub heuristic: Option<SpaceHeuristic>,
}

/// Final state of a run plus its headline numbers.
#[derive(Serialize, ToSchema)]
pub struct PackResponse {
    pub utilization_percent: f64,
    pub packed_volume: f64,
    pub container_volume: f64,
    pub is_complete: bool,
    pub state: PackingState,
}

impl PackResponse {
    fn from_state(state: PackingState) -> Self {
        Self {
            utilization_percent: state.utilization_percent(),
            packed_volume: state.packed_volume(),
            container_volume: state.container_volume(),
            is_complete: state.is_complete(),
            state,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct GenerateResponse {
    pub container: Vec3,
    pub items: Vec<Item>,
}

#[derive(Serialize, ToSchema)]
pub struct BenchmarkResponse {
    pub results: Vec<StrategyBenchmark>,
}

/// Messages on the `/optimize_stream` channel.
#[derive(Serialize)]
#[serde(tag = "type")]
enum OptimizeEvent {
    Record(AnnealingRecord),
    Finished {
        items: Vec<Item>,
        best_utilization_percent: f64,
    },
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(err: ValidationError) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        err.to_string(),
    )
}

fn parse_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(value)| value)
        .map_err(json_deserialize_error)
}

fn resolve_container(
    dims: Option<(f64, f64, f64)>,
    engine: &EngineConfig,
) -> Result<Dimensions, ValidationError> {
    match dims {
        Some(dims) => {
            validate_dimensions_3d(dims, "Container")?;
            Ok(Vec3::from(dims))
        }
        None => Ok(engine.container()),
    }
}

fn resolve_threshold(threshold: Option<f64>, engine: &EngineConfig) -> Result<f64, ValidationError> {
    let threshold = threshold.unwrap_or(engine.packing_config().support_ratio);
    validate_ratio(threshold, "Support threshold")?;
    Ok(threshold)
}

fn resolve_heuristic(heuristic: Option<SpaceHeuristic>, engine: &EngineConfig) -> SpaceHeuristic {
    heuristic.unwrap_or(engine.packing_config().heuristic)
}

fn seeded_rng(seed: Option<u64>, engine: &EngineConfig) -> StdRng {
    match seed.or(engine.seed()) {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Validated input of a full packing run.
struct RunInput {
    items: Vec<Item>,
    container: Dimensions,
    strategy: Strategy,
    threshold: f64,
    heuristic: SpaceHeuristic,
}

impl PackRequest {
    fn into_run(self, engine: &EngineConfig) -> Result<RunInput, ValidationError> {
        Ok(RunInput {
            items: into_items(self.items)?,
            container: resolve_container(self.container, engine)?,
            strategy: self.strategy,
            threshold: resolve_threshold(self.support_threshold, engine)?,
            heuristic: resolve_heuristic(self.heuristic, engine),
        })
    }
}

/// Validated input of an annealing run.
struct AnnealInput {
    items: Vec<Item>,
    container: Dimensions,
    iterations: usize,
    threshold: f64,
    rng: StdRng,
}

impl OptimizeRequest {
    fn into_anneal(self, engine: &EngineConfig) -> Result<AnnealInput, ValidationError> {
        let iterations = self
            .iterations
            .unwrap_or(engine.generator_config().optimizer_iterations);
        if iterations == 0 {
            return Err(ValidationError::InvalidConfiguration(
                "iterations must be at least 1".to_string(),
            ));
        }
        if iterations > GeneratorConfig::MAX_OPTIMIZER_ITERATIONS {
            return Err(ValidationError::InvalidConfiguration(format!(
                "iterations must be at most {}",
                GeneratorConfig::MAX_OPTIMIZER_ITERATIONS
            )));
        }
        Ok(AnnealInput {
            items: into_items(self.items)?,
            container: resolve_container(self.container, engine)?,
            iterations,
            threshold: resolve_threshold(self.support_threshold, engine)?,
            rng: seeded_rng(self.seed, engine),
        })
    }
}

impl BenchmarkRequest {
    fn into_parts(
        self,
        engine: &EngineConfig,
    ) -> Result<(Vec<Item>, Dimensions, PackingConfig), ValidationError> {
        let config = PackingConfig::builder()
            .support_ratio(resolve_threshold(self.support_threshold, engine)?)
            .heuristic(resolve_heuristic(self.heuristic, engine))
            .build();
        Ok((
            into_items(self.items)?,
            resolve_container(self.container, engine)?,
            config,
        ))
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_container,
        handle_step,
        handle_pack,
        handle_pack_stream,
        handle_generate,
        handle_optimize,
        handle_optimize_stream,
        handle_benchmark
    ),
    components(
        schemas(
            ContainerRequest,
            StepRequest,
            PackRequest,
            GenerateRequest,
            OptimizeRequest,
            BenchmarkRequest,
            ItemInput,
            ItemRequest,
            PackResponse,
            GenerateResponse,
            BenchmarkResponse,
            ErrorResponse,
            Space,
            PackingState,
            PackEvent,
            Item,
            AnnealingRecord,
            OptimizationResult,
            StrategyBenchmark,
            Strategy,
            SpaceHeuristic
        )
    ),
    tags(
        (name = "packing", description = "Single-container packing with empty maximal spaces"),
        (name = "optimization", description = "Item generation, annealing and strategy comparison")
    )
)]
struct ApiDoc;

fn router(engine: EngineConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/container", post(handle_container))
        .route("/step", post(handle_step))
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        .route("/generate", post(handle_generate))
        .route("/optimize", post(handle_optimize))
        .route("/optimize_stream", post(handle_optimize_stream))
        .route("/benchmark", post(handle_benchmark))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(ApiState { engine })
}

/// Starts the API server.
///
/// Configures CORS for cross-origin requests. Blocks until the server is
/// terminated.
pub async fn start_api_server(config: ApiConfig, engine: EngineConfig) {
    let app = router(engine);

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("❌ Could not bind API server to {}: {}", addr, err);
            return;
        }
    };

    info!(
        "🚀 Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        info!("💡 Local access: http://localhost:{}", config.port());
    }
    info!("📦 API Endpoints: POST /container /step /pack /pack_stream /generate /optimize /optimize_stream /benchmark");
    info!("📑 Documentation: GET /docs, GET /docs/openapi.json");

    if let Err(err) = axum::serve(listener, app).await {
        error!("❌ API server terminated with an error: {err}");
    }
}

/// Handler for POST /container: the root free space of a container.
#[utoipa::path(
    post,
    path = "/container",
    request_body = ContainerRequest,
    responses(
        (status = 200, description = "Root space covering the whole container", body = Space),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid dimensions", body = ErrorResponse)
    ),
    tag = "packing"
)]
async fn handle_container(
    State(state): State<ApiState>,
    payload: Result<Json<ContainerRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    match resolve_container(request.dims, &state.engine) {
        Ok(dims) => {
            let root = create_container(dims, &mut SpaceIdSequence::new());
            (StatusCode::OK, Json(root)).into_response()
        }
        Err(err) => validation_error(err),
    }
}

/// Handler for POST /step.
///
/// Applies one placement attempt to the submitted state and returns the
/// successor. The submitted state is not stored.
#[utoipa::path(
    post,
    path = "/step",
    request_body = StepRequest,
    responses(
        (status = 200, description = "State after one placement attempt", body = PackingState),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "packing"
)]
async fn handle_step(
    State(state): State<ApiState>,
    payload: Result<Json<StepRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let threshold = match resolve_threshold(request.support_threshold, &state.engine) {
        Ok(threshold) => threshold,
        Err(err) => return validation_error(err),
    };
    let current = match request.state.validated() {
        Ok(current) => current,
        Err(err) => return validation_error(err),
    };
    let heuristic = resolve_heuristic(request.heuristic, &state.engine);
    let next = step(&current, request.strategy, threshold, Some(heuristic));
    (StatusCode::OK, Json(next)).into_response()
}

/// Handler for POST /pack endpoint.
///
/// Packs all items into one container and returns the final state.
///
/// # Parameters
/// * `payload` - JSON payload with items, optional container and run settings
///
/// # Returns
/// JSON response with the final packing state and utilization
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Completed packing run", body = PackResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "packing"
)]
async fn handle_pack(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Response {
    let run = match parse_json(payload)
        .and_then(|request| request.into_run(&state.engine).map_err(validation_error))
    {
        Ok(run) => run,
        Err(response) => return response,
    };

    info!(
        "📥 New pack request: {} items, strategy {}",
        run.items.len(),
        run.strategy.label()
    );
    let final_state = run_to_completion(
        run.strategy,
        run.items,
        run.container,
        run.threshold,
        Some(run.heuristic),
    );
    info!(
        "📦 Result: {} packed, {} unpacked, {:.2}% utilization",
        final_state.packed.len(),
        final_state.unpacked.len(),
        final_state.utilization_percent()
    );

    (StatusCode::OK, Json(PackResponse::from_state(final_state))).into_response()
}

/// Handler for POST /pack_stream endpoint (SSE).
///
/// Streams `PackEvent`s as Server-Sent Events so a client can animate the
/// run step by step.
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Streams pack events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "packing"
)]
async fn handle_pack_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Response {
    let run = match parse_json(payload)
        .and_then(|request| request.into_run(&state.engine).map_err(validation_error))
    {
        Ok(run) => run,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let _ = run_to_completion_with_progress(
            run.strategy,
            run.items,
            run.container,
            run.threshold,
            Some(run.heuristic),
            |evt| forward_json(&tx, evt),
        );
    });

    sse_response(rx)
}

/// Handler for POST /generate: synthetic items that tile the container.
#[utoipa::path(
    post,
    path = "/generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Generated items", body = GenerateResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid generator settings", body = ErrorResponse)
    ),
    tag = "optimization"
)]
async fn handle_generate(
    State(state): State<ApiState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let container = match resolve_container(request.container, &state.engine) {
        Ok(container) => container,
        Err(err) => return validation_error(err),
    };

    let defaults = state.engine.generator_config();
    let config = GeneratorConfig {
        item_count: request.item_count.unwrap_or(defaults.item_count),
        min_side: request.min_side.unwrap_or(defaults.min_side),
        ..defaults
    };
    if let Err(err) = config.validate() {
        return validation_error(err);
    }

    let mut rng = seeded_rng(request.seed, &state.engine);
    let items = generate_items(container, &config, &mut rng);
    info!("🎲 Generated {} items", items.len());

    (StatusCode::OK, Json(GenerateResponse { container, items })).into_response()
}

/// Handler for POST /optimize: simulated annealing over order and rotation.
#[utoipa::path(
    post,
    path = "/optimize",
    request_body = OptimizeRequest,
    responses(
        (status = 200, description = "Best item order found and the annealing log", body = OptimizationResult),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "optimization"
)]
async fn handle_optimize(
    State(state): State<ApiState>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Response {
    let AnnealInput {
        items,
        container,
        iterations,
        threshold,
        mut rng,
    } = match parse_json(payload)
        .and_then(|request| request.into_anneal(&state.engine).map_err(validation_error))
    {
        Ok(input) => input,
        Err(response) => return response,
    };

    info!(
        "🔥 Annealing {} items for {} iterations",
        items.len(),
        iterations
    );
    let result = optimize_cooperative(
        items,
        container,
        iterations,
        threshold,
        &state.engine.annealing_config(),
        &mut rng,
        |_| ControlFlow::Continue(()),
    )
    .await;

    (StatusCode::OK, Json(result)).into_response()
}

/// Handler for POST /optimize_stream (SSE).
///
/// Streams one message per annealing iteration, then a final message with
/// the best item order.
#[utoipa::path(
    post,
    path = "/optimize_stream",
    request_body = OptimizeRequest,
    responses(
        (
            status = 200,
            description = "Streams annealing records in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "optimization"
)]
async fn handle_optimize_stream(
    State(state): State<ApiState>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Response {
    let AnnealInput {
        items,
        container,
        iterations,
        threshold,
        mut rng,
    } = match parse_json(payload)
        .and_then(|request| request.into_anneal(&state.engine).map_err(validation_error))
    {
        Ok(input) => input,
        Err(response) => return response,
    };

    let annealing = state.engine.annealing_config();
    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let result = optimize_with_progress(
            items,
            container,
            iterations,
            threshold,
            &annealing,
            &mut rng,
            |record| forward_json(&tx, &OptimizeEvent::Record(*record)),
        );
        if !tx.is_closed() {
            let _ = forward_json(
                &tx,
                &OptimizeEvent::Finished {
                    items: result.items,
                    best_utilization_percent: result.best_utilization_percent,
                },
            );
        }
    });

    sse_response(rx)
}

/// Handler for POST /benchmark: every strategy on the same item set.
#[utoipa::path(
    post,
    path = "/benchmark",
    request_body = BenchmarkRequest,
    responses(
        (status = 200, description = "One result per strategy", body = BenchmarkResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "optimization"
)]
async fn handle_benchmark(
    State(state): State<ApiState>,
    payload: Result<Json<BenchmarkRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let (items, container, config) = match request.into_parts(&state.engine) {
        Ok(parts) => parts,
        Err(err) => return validation_error(err),
    };
    let results = benchmark_strategies_cooperative(&items, container, &config).await;

    (StatusCode::OK, Json(BenchmarkResponse { results })).into_response()
}

/// Sends one SSE payload from a blocking worker.
///
/// Breaks once the receiver is gone, i.e. the client disconnected, so the
/// producing run stops instead of computing into a closed channel.
fn forward_json<T: Serialize>(tx: &mpsc::Sender<String>, event: &T) -> ControlFlow<()> {
    let Ok(json) = serde_json::to_string(event) else {
        return ControlFlow::Continue(());
    };
    if tx.blocking_send(json).is_err() {
        info!("📴 Stream client disconnected, stopping run");
        return ControlFlow::Break(());
    }
    ControlFlow::Continue(())
}

fn sse_response(rx: mpsc::Receiver<String>) -> Response {
    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
