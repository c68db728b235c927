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

/// Rounds to the nearest integer, resolving exact .5 ties toward the even
/// neighbor so that repeated rounding does not drift in one direction.
pub fn round_half_to_even(value: f64) -> i64 {
    let floor = value.floor();
    let fraction = value - floor;
    let low = floor as i64;
    if fraction > 0.5 {
        low + 1
    } else if fraction < 0.5 {
        low
    } else if low % 2 == 0 {
        low
    } else {
        low + 1
    }
}

/// Rounds `value` to `places` decimal places.
pub fn round_to_places(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
