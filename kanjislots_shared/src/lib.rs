use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateSessionRequest {
    pub client_seed: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionResponse {
    pub id: u64,
    pub credits: u64,
    pub spin_cost: u64,
    pub width: usize,
    pub height: usize,
    /// Symbol ids, row-major.
    pub board: Vec<String>,
    pub glyphs: Vec<String>,
    pub spinning: bool,
    pub outstanding: usize,
    pub server_seed_hash: String,
    pub nonce: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RevealDto {
    pub cell: usize,
    pub symbol: String,
    pub glyph: String,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpinResponse {
    pub spin_id: u64,
    pub server_seed_hash: String,
    pub nonce: u64,
    pub credits: u64,
    pub board: Vec<String>,
    pub reveals: Vec<RevealDto>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RevealRequest {
    pub spin_id: u64,
    pub cell: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PatternDto {
    /// Paytable key, e.g. `line4` or `square2`.
    pub key: String,
    pub symbol: String,
    pub cells: Vec<usize>,
    pub payout: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EvaluationDto {
    pub payout: u64,
    pub winning_cells: Vec<usize>,
    pub patterns: Vec<PatternDto>,
    pub credits: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RevealResponse {
    pub remaining: usize,
    /// Present on the reveal that completed the spin.
    pub evaluation: Option<EvaluationDto>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VerifyResponse {
    pub server_seed_hash: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpinLogEntry {
    pub spin_id: u64,
    pub ts: DateTime<Utc>,
    pub client_seed: String,
    pub nonce: u64,
    pub server_seed_hash: String,
    pub board: Vec<String>,
    pub cost: u64,
    /// Filled in once the spin has been evaluated.
    pub payout: Option<u64>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("session {0} not found")]
    NotFound(u64),
    #[error("insufficient credits: have {credits}, need {cost}")]
    InsufficientCredits { credits: u64, cost: u64 },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Invalid(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::InsufficientCredits { .. } => 402,
            ApiError::Conflict(_) => 409,
            ApiError::Internal => 500,
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::NotFound(3).status_code(), 404);
        assert_eq!(
            ApiError::InsufficientCredits { credits: 0, cost: 10 }.status_code(),
            402
        );
        assert_eq!(ApiError::Conflict("x".into()).status_code(), 409);
    }

    #[test]
    fn test_reveal_response_shape() {
        let pending = RevealResponse {
            remaining: 3,
            evaluation: None,
        };
        let json = serde_json::to_value(&pending).unwrap();
        assert_eq!(json["remaining"], 3);
        assert!(json["evaluation"].is_null());
    }
}
