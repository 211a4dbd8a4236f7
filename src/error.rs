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

use crate::weight::supervisor::RunId;
use thiserror::Error;

/// Failures when taking hold of a pressure source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    /// The source cannot be created or is not the expected hardware. The
    /// supervisor recovers from this by falling back.
    #[error("pressure device unavailable")]
    DeviceUnavailable,
    /// Neither pressure source can be used on this host.
    #[error("no pressure source is supported on this platform")]
    PlatformUnsupported,
}

/// Problems with an individual raw pressure value.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SignalError {
    #[error("non-finite pressure value {0}")]
    NonFinite(f32),
}

/// Timer expiries that drive internal transitions rather than report faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimingError {
    #[error("no high fidelity frames before grace timer expired (run {0:?})")]
    GraceTimeout(RunId),
}

/// Errors surfaced by the weighing manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WeighingError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    #[error("maximum number of weight event subscribers reached")]
    MaximumSubscribersReached,
    #[error("auto-tare could not be applied")]
    AutoTareFailed,
}
