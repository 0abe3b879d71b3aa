//! Candidate resolution against the player directory
//!
//! Parses the submitted profile URL, queries the directory by name and
//! classifies the result: a strong (or sole) candidate is accepted without
//! human confirmation, anything else becomes an ambiguity or a failure.

use std::sync::Arc;

use crate::models::PlayerCandidate;
use crate::services::profile_url::{self, ProfileUrlError};
use crate::services::sportmonks_client::{DirectoryPlayer, PlayerDirectory};

/// A candidate at or above this normalized similarity counts as a name match
const STRONG_MATCH_THRESHOLD: f64 = 0.90;

/// A strong candidate must lead the runner-up by this margin to be
/// "clearly dominant" when several candidates match strongly
const DOMINANCE_MARGIN: f64 = 0.15;

/// At most this many candidates are stored and offered for confirmation
pub const MAX_STORED_CANDIDATES: usize = 5;

/// Outcome of one resolution step
#[derive(Debug, Clone)]
pub enum ResolutionOutcome {
    /// Exactly one acceptable identity; no confirmation needed
    Resolved {
        sportmonks_id: i64,
        display_name: String,
    },
    /// Several plausible identities; a human has to pick
    Ambiguous { candidates: Vec<PlayerCandidate> },
    /// Definitive failure: unsupported link kind or no search hits.
    /// Not worth retrying.
    Unmatched { reason: String },
    /// Transient directory error; the attempt is consumed but the target
    /// stays retryable
    Errored { reason: String },
}

/// Resolves a profile URL to ranked player candidates
pub struct CandidateResolver {
    directory: Arc<dyn PlayerDirectory>,
}

impl CandidateResolver {
    pub fn new(directory: Arc<dyn PlayerDirectory>) -> Self {
        Self { directory }
    }

    /// Resolve one source URL to an outcome. Never returns an error; every
    /// failure mode is a routed outcome.
    pub async fn resolve(&self, source_url: &str) -> ResolutionOutcome {
        let profile = match profile_url::parse_player_profile(source_url) {
            Ok(profile) => profile,
            Err(ProfileUrlError::UnsupportedKind(kind)) => {
                return ResolutionOutcome::Unmatched {
                    reason: format!("unsupported link kind: {}", kind),
                }
            }
            Err(ProfileUrlError::Invalid) => {
                return ResolutionOutcome::Unmatched {
                    reason: "not a player profile link".to_string(),
                }
            }
        };

        let hits = match self.directory.search_players(&profile.queried_name).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(
                    url = %source_url,
                    query = %profile.queried_name,
                    error = %e,
                    "Player directory search failed"
                );
                return ResolutionOutcome::Errored {
                    reason: format!("player search failed: {}", e),
                };
            }
        };

        if hits.is_empty() {
            return ResolutionOutcome::Unmatched {
                reason: format!("no candidates found for '{}'", profile.queried_name),
            };
        }

        let candidates = rank_candidates(&profile.queried_name, hits);

        // A single hit is strong evidence on its own, regardless of how
        // well the name matches
        if candidates.len() == 1 {
            let only = &candidates[0];
            return ResolutionOutcome::Resolved {
                sportmonks_id: only.sportmonks_id,
                display_name: only.display_name.clone(),
            };
        }

        if let Some(winner) = strong_winner(&candidates) {
            return ResolutionOutcome::Resolved {
                sportmonks_id: winner.sportmonks_id,
                display_name: winner.display_name.clone(),
            };
        }

        ResolutionOutcome::Ambiguous {
            candidates: candidates
                .into_iter()
                .take(MAX_STORED_CANDIDATES)
                .collect(),
        }
    }
}

/// Score and order search hits by similarity to the queried name, best first
fn rank_candidates(queried_name: &str, hits: Vec<DirectoryPlayer>) -> Vec<PlayerCandidate> {
    let query_key = name_key(queried_name);

    let mut candidates: Vec<PlayerCandidate> = hits
        .into_iter()
        .map(|hit| {
            let similarity = strsim::normalized_levenshtein(&query_key, &name_key(&hit.display_name));
            PlayerCandidate {
                sportmonks_id: hit.id,
                display_name: hit.display_name,
                club_name: hit.club_name,
                similarity,
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    candidates
}

/// The strong-candidate policy for multi-hit results: the leader must match
/// the queried name and either be the only strong match or clearly lead
/// the runner-up
fn strong_winner(candidates: &[PlayerCandidate]) -> Option<&PlayerCandidate> {
    let leader = candidates.first()?;
    if leader.similarity < STRONG_MATCH_THRESHOLD {
        return None;
    }

    let runner_up = match candidates.get(1) {
        Some(runner_up) => runner_up,
        None => return Some(leader),
    };
    let sole_strong = runner_up.similarity < STRONG_MATCH_THRESHOLD;
    let dominant = leader.similarity - runner_up.similarity >= DOMINANCE_MARGIN;

    if sole_strong || dominant {
        Some(leader)
    } else {
        None
    }
}

/// Normalize a name for comparison: lowercase, diacritics folded,
/// whitespace collapsed
fn name_key(name: &str) -> String {
    let mut folded = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            'ß' => folded.push_str("ss"),
            other => folded.push(fold_diacritic(other)),
        }
    }
    let folded = folded.to_lowercase();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fold the Latin diacritics that show up in footballer names. Characters
/// outside the table pass through unchanged.
fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' | 'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' | 'Ø' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ý' | 'ÿ' | 'Ý' => 'y',
        'ñ' | 'Ñ' => 'n',
        'ç' | 'Ç' => 'c',
        'š' | 'Š' => 's',
        'ž' | 'Ž' => 'z',
        'ć' | 'č' | 'Ć' | 'Č' => 'c',
        'đ' | 'Đ' => 'd',
        'ł' | 'Ł' => 'l',
        other => other,
    }
}
