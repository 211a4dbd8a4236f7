// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

pub mod interface;
pub mod messaging;
pub mod supervisor;
pub mod touch_aggregator;
pub mod weight;

use crate::weight::supervisor::SourceSelection;
use crate::weight::weight::CalibrationState;

/// What the rest of an application needs from a scale. Front ends are
/// written against this so that they can run on a fake.
pub trait WeighingSystem {
    type Error;

    async fn start_monitoring(&mut self) -> Result<SourceSelection, Self::Error>;

    async fn stop_monitoring(&mut self);

    async fn calibrate(&mut self) -> Result<CalibrationState, Self::Error>;

    async fn get_instantaneous_weight_grams(&mut self) -> Result<f32, Self::Error>;
}
