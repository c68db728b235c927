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

use data::core::errors::{EngineError, Value};
use data::core::primitives::PlayId;
use data::plays::play::Play;
use database::database::Database;

/// Looks up a play by id. The full play state is the GetPlay response.
pub async fn fetch_play(database: &impl Database, play_id: PlayId) -> Value<Play> {
    database.fetch_play(play_id).await?.ok_or(EngineError::PlayNotFound(play_id))
}
