use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use kanjislots_core::{
    derive_hash_hex, Board, Evaluation, GameState, MachineConfig, ProvablyFairRng, RevealOutcome,
    SlotError, SymbolCatalog,
};
use kanjislots_shared::{
    ApiError, CreateSessionRequest, ErrorBody, EvaluationDto, PatternDto, RevealDto, RevealRequest,
    RevealResponse, SessionResponse, SpinLogEntry, SpinResponse, VerifyResponse,
};

const MAX_CLIENT_SEED_LEN: usize = 128;
const MAX_SESSIONS: usize = 10_000;
const MAX_HISTORY: usize = 1_000;
/// Slack after the slowest reveal before the server lands the rest itself.
pub const SETTLE_GRACE: Duration = Duration::from_secs(5);

pub struct AppState {
    config: MachineConfig,
    server_seed: String,
    server_seed_hash: String,
    max_sessions: usize,
    max_history: usize,
    sessions: Mutex<Sessions>,
}

#[derive(Default)]
struct Sessions {
    next_id: u64,
    by_id: HashMap<u64, Session>,
}

impl Sessions {
    /// Stores `session`, evicting the least recently used ones beyond `max`.
    fn insert(&mut self, session: Session, max: usize) -> u64 {
        while self.by_id.len() >= max.max(1) {
            let idle = self
                .by_id
                .iter()
                .min_by_key(|(&id, s)| (s.last_seen, id))
                .map(|(&id, _)| id);
            let Some(idle) = idle else { break };
            self.by_id.remove(&idle);
            info!(id = idle, "evicted idle session");
        }
        self.next_id += 1;
        let id = self.next_id;
        self.by_id.insert(id, session);
        id
    }

    /// Looks up `id`, landing any reveals that are overdue.
    fn touch(&mut self, id: u64) -> Result<&mut Session, ApiError> {
        let session = self.by_id.get_mut(&id).ok_or(ApiError::NotFound(id))?;
        let now = Instant::now();
        session.last_seen = now;
        session.settle_overdue(id, now);
        Ok(session)
    }
}

struct Session {
    game: GameState,
    client_seed: String,
    nonce: u64,
    history: VecDeque<SpinLogEntry>,
    /// When the running spin is settled without the client.
    settle_at: Option<Instant>,
    last_seen: Instant,
}

impl Session {
    // A client that stops reporting reveals must not leave the spin armed.
    fn settle_overdue(&mut self, id: u64, now: Instant) {
        let Some(deadline) = self.settle_at else { return };
        if now < deadline {
            return;
        }
        self.settle_at = None;
        let spin_id = self.game.spin_id();
        let pending: Vec<usize> = (0..self.game.board().len())
            .filter(|&cell| !self.game.is_revealed(cell))
            .collect();
        for cell in pending {
            match self.game.complete_reveal(spin_id, cell) {
                Ok(RevealOutcome::Pending { .. }) => {}
                Ok(RevealOutcome::Evaluated(evaluation)) => {
                    info!(id, spin_id, payout = evaluation.payout, "overdue spin settled");
                    self.record_payout(spin_id, evaluation.payout);
                }
                Err(err) => {
                    warn!(id, spin_id, %err, "could not land overdue reveal");
                    break;
                }
            }
        }
    }

    fn record_payout(&mut self, spin_id: u64, payout: u64) {
        if let Some(entry) = self.history.iter_mut().rev().find(|e| e.spin_id == spin_id) {
            entry.payout = Some(payout);
        }
    }
}

impl AppState {
    pub fn new(config: MachineConfig, server_seed: impl Into<String>) -> anyhow::Result<Self> {
        config.validate()?;
        let server_seed = server_seed.into();
        Ok(Self {
            server_seed_hash: derive_hash_hex(server_seed.as_bytes()),
            server_seed,
            config,
            max_sessions: MAX_SESSIONS,
            max_history: MAX_HISTORY,
            sessions: Mutex::new(Sessions::default()),
        })
    }

    pub fn with_limits(mut self, max_sessions: usize, max_history: usize) -> Self {
        self.max_sessions = max_sessions;
        self.max_history = max_history;
        self
    }

    pub fn server_seed_hash(&self) -> &str {
        &self.server_seed_hash
    }
}

/// Error response: the shared `ApiError` rendered as JSON.
pub struct AppError(pub ApiError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        AppError(err)
    }
}

impl From<SlotError> for AppError {
    fn from(err: SlotError) -> Self {
        let api = match err {
            SlotError::InsufficientCredits { credits, cost } => {
                ApiError::InsufficientCredits { credits, cost }
            }
            SlotError::CellOutOfRange { .. } => ApiError::Invalid(err.to_string()),
            SlotError::SpinInProgress { .. }
            | SlotError::NoSpinInProgress
            | SlotError::StaleSpin { .. }
            | SlotError::AlreadyRevealed(_) => ApiError::Conflict(err.to_string()),
            SlotError::InvalidConfiguration(msg) => {
                warn!(%msg, "engine configuration error");
                ApiError::Internal
            }
        };
        AppError(api)
    }
}

type AppResult<T> = Result<Json<T>, AppError>;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/verify", get(route_verify))
        .route("/sessions", post(route_create_session))
        .route("/sessions/:id", get(route_get_session))
        .route("/sessions/:id/spin", post(route_spin))
        .route("/sessions/:id/reveal", post(route_reveal))
        .route("/sessions/:id/history", get(route_history))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn route_verify(State(state): State<Arc<AppState>>) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        server_seed_hash: state.server_seed_hash.clone(),
    })
}

async fn route_create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> AppResult<SessionResponse> {
    if req.client_seed.is_empty() || req.client_seed.len() > MAX_CLIENT_SEED_LEN {
        return Err(ApiError::Invalid(format!(
            "client_seed must be 1..={MAX_CLIENT_SEED_LEN} bytes"
        ))
        .into());
    }
    let game = GameState::new(state.config.clone())?;
    let session = Session {
        game,
        client_seed: req.client_seed,
        nonce: 0,
        history: VecDeque::new(),
        settle_at: None,
        last_seen: Instant::now(),
    };
    let mut sessions = state.sessions.lock().await;
    let id = sessions.insert(session, state.max_sessions);
    let session = sessions.touch(id)?;
    info!(id, "session created");
    Ok(Json(session_response(id, session, &state)))
}

async fn route_get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> AppResult<SessionResponse> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.touch(id)?;
    Ok(Json(session_response(id, session, &state)))
}

async fn route_spin(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> AppResult<SpinResponse> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.touch(id)?;

    let nonce = session.nonce + 1;
    let mut rng = ProvablyFairRng::new(&state.server_seed, &session.client_seed, nonce);
    let effects = session.game.spin(&mut rng).map_err(|err| {
        debug!(id, %err, "spin refused");
        err
    })?;
    // the nonce only advances for spins that happened
    session.nonce = nonce;
    let slowest = effects.reveals.iter().map(|plan| plan.duration).max().unwrap_or_default();
    session.settle_at = Some(Instant::now() + slowest + SETTLE_GRACE);

    let catalog = session.game.catalog();
    let board = board_ids(&effects.board, catalog);
    session.history.push_back(SpinLogEntry {
        spin_id: effects.spin_id,
        ts: chrono::Utc::now(),
        client_seed: session.client_seed.clone(),
        nonce,
        server_seed_hash: state.server_seed_hash.clone(),
        board: board.clone(),
        cost: effects.cost,
        payout: None,
    });
    while session.history.len() > state.max_history {
        session.history.pop_front();
    }

    let reveals = effects
        .reveals
        .iter()
        .map(|plan| RevealDto {
            cell: plan.cell,
            symbol: symbol_id(catalog, plan.symbol),
            glyph: catalog.glyph(plan.symbol).to_string(),
            duration_ms: plan.duration.as_millis() as u64,
        })
        .collect();

    info!(id, spin_id = effects.spin_id, nonce, "spin started");
    Ok(Json(SpinResponse {
        spin_id: effects.spin_id,
        server_seed_hash: state.server_seed_hash.clone(),
        nonce,
        credits: effects.credits,
        board,
        reveals,
    }))
}

async fn route_reveal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(req): Json<RevealRequest>,
) -> AppResult<RevealResponse> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.touch(id)?;

    match session.game.complete_reveal(req.spin_id, req.cell)? {
        RevealOutcome::Pending { remaining } => Ok(Json(RevealResponse {
            remaining,
            evaluation: None,
        })),
        RevealOutcome::Evaluated(evaluation) => {
            session.settle_at = None;
            session.record_payout(req.spin_id, evaluation.payout);
            let credits = session.game.credits();
            info!(id, spin_id = req.spin_id, payout = evaluation.payout, credits, "spin evaluated");
            Ok(Json(RevealResponse {
                remaining: 0,
                evaluation: Some(evaluation_dto(&evaluation, session.game.catalog(), credits)),
            }))
        }
    }
}

async fn route_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> AppResult<Vec<SpinLogEntry>> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.touch(id)?;
    Ok(Json(session.history.iter().cloned().collect()))
}

fn session_response(id: u64, session: &Session, state: &AppState) -> SessionResponse {
    let game = &session.game;
    let catalog = game.catalog();
    SessionResponse {
        id,
        credits: game.credits(),
        spin_cost: game.config().spin_cost,
        width: game.board().width(),
        height: game.board().height(),
        board: board_ids(game.board(), catalog),
        glyphs: game
            .board()
            .cells()
            .iter()
            .map(|&s| catalog.glyph(s).to_string())
            .collect(),
        spinning: game.is_spinning(),
        outstanding: game.outstanding(),
        server_seed_hash: state.server_seed_hash.clone(),
        nonce: session.nonce,
    }
}

fn symbol_id(catalog: &SymbolCatalog, symbol: u8) -> String {
    catalog
        .get(symbol)
        .map(|s| s.id.clone())
        .unwrap_or_else(|| "?".to_string())
}

fn board_ids(board: &Board, catalog: &SymbolCatalog) -> Vec<String> {
    board.ids(catalog).into_iter().map(str::to_string).collect()
}

fn evaluation_dto(evaluation: &Evaluation, catalog: &SymbolCatalog, credits: u64) -> EvaluationDto {
    EvaluationDto {
        payout: evaluation.payout,
        winning_cells: evaluation.winning_cells.clone(),
        patterns: evaluation
            .patterns
            .iter()
            .map(|scored| PatternDto {
                key: scored.key.to_string(),
                symbol: symbol_id(catalog, scored.pattern.symbol),
                cells: scored.pattern.cells.clone(),
                payout: scored.payout,
            })
            .collect(),
        credits,
    }
}
