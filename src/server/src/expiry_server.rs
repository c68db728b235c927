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

use data::core::errors::Value;
use database::database::Database;
use tracing::{info, instrument};
use utils::clock::Clock;

/// Deletes every play whose TTL has elapsed. Returns how many were removed.
///
/// Expiry itself needs no sweep: inputs on an expired play are rejected by
/// timestamp alone. This reclaims storage.
#[instrument(level = "debug", skip(database, clock))]
pub async fn expire_plays(database: &impl Database, clock: &Clock) -> Value<usize> {
    let expired = database.expired_plays(clock.now()).await?;
    let count = expired.len();
    for play_id in expired {
        database.delete_play(play_id).await?;
    }
    if count > 0 {
        info!(count, "Deleted expired plays");
    }
    Ok(count)
}
