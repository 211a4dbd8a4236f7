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
//! Pressure acquisition and calibration engine that turns trackpad contact
//! pressure into a weight in grams.
//!
//! [`WeighingManager`] is the entry point. It owns a high fidelity
//! multitouch source and a force-touch fallback, chooses between them at
//! start, aggregates contacts, applies the zero point and noise gate, and
//! re-zeroes automatically at the start of each weighing session when asked
//! to. Samples and state changes are published on a pub-sub channel and to
//! registered listeners.

pub mod application;
pub mod config;
pub mod error;
pub mod session_monitor;
pub mod storage;
pub mod time;
pub mod weight;

pub use application::{SourceSet, WeighingManager};
pub use config::ScaleConfig;
pub use error::{AcquisitionError, SignalError, TimingError, WeighingError};
pub use weight::messaging::{WeightEvents, WeightSample};
pub use weight::supervisor::{SourceSelection, SupervisorState};
pub use weight::weight::CalibrationState;
pub use weight::WeighingSystem;
