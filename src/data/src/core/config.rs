// Copyright © narimato 2024-present
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Default play TTL, overridable via `PLAY_TTL_SECONDS`.
pub const DEFAULT_PLAY_TTL_SECONDS: i64 = 86_400;

/// Default global-ranking replay window, overridable via `ELO_WINDOW`.
pub const DEFAULT_ELO_WINDOW: usize = 500;

/// Default ELO K-factor, overridable via `ELO_K`.
pub const DEFAULT_ELO_K: f64 = 32.0;

/// Default maximum nesting depth of child sub-sessions.
pub const DEFAULT_MAX_HIERARCHY_DEPTH: u32 = 2;

/// Settings governing engine behavior, constructed once per service and
/// passed to operations explicitly.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a play accepts input after creation, in seconds.
    pub play_ttl_seconds: i64,

    /// Maximum number of completed plays replayed per global-ranking run.
    pub elo_window: usize,

    /// ELO K-factor.
    pub elo_k: f64,

    /// Maximum nesting depth of child sub-sessions. Depth 2 means parents
    /// rank their children, and children never fork sessions of their own.
    pub max_hierarchy_depth: u32,

    /// When set, a comparison left unresolved for this many seconds may be
    /// resolved with a random winner. Disabled by default.
    pub vote_timeout_seconds: Option<i64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            play_ttl_seconds: DEFAULT_PLAY_TTL_SECONDS,
            elo_window: DEFAULT_ELO_WINDOW,
            elo_k: DEFAULT_ELO_K,
            max_hierarchy_depth: DEFAULT_MAX_HIERARCHY_DEPTH,
            vote_timeout_seconds: None,
        }
    }
}
